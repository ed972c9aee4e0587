//! End-to-end tests for the compile/render pipeline.

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use serde_json::{json, Value};

use crate::error::Error;
use crate::{Engine, Options};

fn render(template: &str, scope: Value) -> crate::Result<String> {
    Engine::new().render(template, &Options::default(), &scope)
}

fn render_ok(template: &str, scope: Value) -> String {
    render(template, scope).unwrap()
}

#[test]
fn tag_free_input_is_byte_identical() {
    let input = "no tags here\n\ttabs, \x01 control bytes, unicode: é\n";
    assert_eq!(render_ok(input, json!({})), input);
}

#[test]
fn doubled_start_tag_renders_literally() {
    assert_eq!(render_ok("100<%% of it", json!({})), "100<% of it");
    // The escape opens no instruction, so the tag body syntax never applies.
    assert_eq!(render_ok("<%%= x %>", json!({})), "<%= x %>");
}

#[test]
fn escaped_interpolation() {
    assert_eq!(render_ok(r#"<%= "<b>" %>"#, json!({})), "&lt;b&gt;");
    assert_eq!(
        render_ok("<%= name %>", json!({"name": "a<b>'c\"&"})),
        "a&lt;b&gt;&#39;c&quot;&amp;"
    );
}

#[test]
fn raw_interpolation() {
    assert_eq!(render_ok(r#"<%- "<b>" %>"#, json!({})), "<b>");
}

#[test]
fn filter_pipeline_folds_left() {
    assert_eq!(render_ok("<%= 3 | plus 2 | times 10 %>", json!({})), "50");
    assert_eq!(
        render_ok("<%=: name | upcase | truncate 3 %>", json!({"name": "template"})),
        "TEM"
    );
}

#[test]
fn filtered_output_is_escaped_filtered_raw_is_not() {
    let scope = json!({"tags": ["<a>", "<b>"]});
    assert_eq!(
        render_ok("<%=: tags | join %>", scope.clone()),
        "&lt;a&gt;, &lt;b&gt;"
    );
    assert_eq!(render_ok("<%-: tags | join %>", scope), "<a>, <b>");
}

#[test]
fn negative_index_renders_nothing() {
    let scope = json!({"xs": ["first", "second"]});
    assert_eq!(render_ok("<%= xs[-1] %>", scope.clone()), "");
    assert_eq!(render_ok("<%= xs[0] %>", scope), "first");
}

#[test]
fn comments_produce_no_output() {
    assert_eq!(render_ok("a<%# ignored %>b", json!({})), "ab");
}

#[test]
fn empty_instruction_is_a_no_op() {
    assert_eq!(render_ok("a<% %>b<%   %>c", json!({})), "abc");
    assert_eq!(render_ok("a<%: ignored %>b", json!({})), "ab");
}

#[test]
fn conditionals_gate_fragments() {
    let template = "<% if user.admin %>admin<% else if user.name %>\
                    <%= user.name %><% else %>guest<% end %>";
    assert_eq!(render_ok(template, json!({"user": {"admin": true}})), "admin");
    assert_eq!(
        render_ok(template, json!({"user": {"admin": false, "name": "ann"}})),
        "ann"
    );
    assert_eq!(
        render_ok(template, json!({"user": {"admin": false, "name": ""}})),
        "guest"
    );
}

#[test]
fn loops_repeat_fragments() {
    let template = "<% for n in nums %>[<%= n %>]<% end %>";
    assert_eq!(render_ok(template, json!({"nums": [1, 2, 3]})), "[1][2][3]");
    assert_eq!(render_ok(template, json!({"nums": []})), "");
    assert_eq!(render_ok(template, json!({"nums": null})), "");
}

#[test]
fn loop_variable_shadows_and_unbinds() {
    let template = "<% let n = 'outer' %><% for n in nums %><%= n %><% end %><%= n %>";
    assert_eq!(render_ok(template, json!({"nums": ["a"]})), "aouter");
}

#[test]
fn let_binds_locals() {
    assert_eq!(
        render_ok("<% let total = a + b %><%= total %>", json!({"a": 2, "b": 3})),
        "5"
    );
}

#[test]
fn custom_tag_pair() {
    let options = Options::default().with_tags("{{", "}}");
    let out = Engine::new()
        .render("x{{= n }}y", &options, &json!({"n": 7}))
        .unwrap();
    assert_eq!(out, "x7y");
}

#[test]
fn unterminated_tag_fails_compilation() {
    let err = render("ok\n<%= oops", json!({})).unwrap_err();
    match err {
        Error::Parse { end, line, .. } => {
            assert_eq!(end, "%>");
            assert_eq!(line, 2);
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn undefined_identifier_fails_at_render_time() {
    let err = render("<%= missing %>", json!({})).unwrap_err();
    match err {
        Error::Eval { message, line, .. } => {
            assert!(message.contains("`missing` is not defined"));
            assert_eq!(line, Some(1));
        }
        other => panic!("expected an eval error, got {other:?}"),
    }
}

#[test]
fn unsupported_statement_fails_at_render_time_only() {
    // Compilation succeeds; the failure surfaces when the fragment runs.
    let engine = Engine::new();
    let options = Options::default();
    let err = engine
        .render("<% launch missiles %>", &options, &json!({}))
        .unwrap_err();
    assert!(matches!(err, Error::Eval { .. }));

    // Behind a false conditional the fragment never runs.
    let out = engine
        .render("<% if nope %><% launch missiles %><% end %>ok", &options, &json!({"nope": false}))
        .unwrap();
    assert_eq!(out, "ok");
}

#[test]
fn malformed_include_raises_at_render_time() {
    let err = render("<% include %>", json!({})).unwrap_err();
    match err {
        Error::IncludeSyntax { directive, .. } => assert_eq!(directive, "include"),
        other => panic!("expected an include syntax error, got {other:?}"),
    }
}

#[test]
fn unclosed_block_raises_at_its_opening_line() {
    let err = render("text\n<% if a %>\nmore", json!({"a": true})).unwrap_err();
    match err {
        Error::Eval { message, line, .. } => {
            assert!(message.contains("unclosed `if`"));
            assert_eq!(line, Some(2));
        }
        other => panic!("expected an eval error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// File-backed tests: includes, caching, debug diagnostics.
// ---------------------------------------------------------------------------

fn write(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn includes_resolve_relative_to_the_including_file() {
    let dir = tempfile::tempdir().unwrap();
    let pages = dir.path().join("pages");
    write(&pages, "a.html", "A[<% include b %>]");
    write(&pages, "b.html", "B[<% include sub/c %>]");
    write(&pages.join("sub"), "c.html", "C[<% include d %>]");
    // `d` is included from sub/c.html, so it resolves inside sub/.
    write(&pages.join("sub"), "d.html", "D");

    let out = Engine::new()
        .render_file(pages.join("a.html"), &Options::default(), &json!({}))
        .unwrap();
    assert_eq!(out, "A[B[C[D]]]");
}

#[test]
fn include_arguments_bind_self() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "page.html", "<% include card (user) %>");
    write(dir.path(), "card.html", "<%= self.name %> (<%= self.age %>)");

    let out = Engine::new()
        .render_file(
            dir.path().join("page.html"),
            &Options::default(),
            &json!({"user": {"name": "ann", "age": 30}}),
        )
        .unwrap();
    assert_eq!(out, "ann (30)");
}

#[test]
fn include_without_arguments_binds_empty_self() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "page.html", "<% include card %>");
    write(dir.path(), "card.html", "<%= self | json %>");

    let out = Engine::new()
        .render_file(dir.path().join("page.html"), &Options::default(), &json!({}))
        .unwrap();
    assert_eq!(out, "{}");
}

#[test]
fn included_template_sees_the_outer_scope() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "page.html", "<% include footer %>");
    write(dir.path(), "footer.html", "© <%= year %>");

    let out = Engine::new()
        .render_file(
            dir.path().join("page.html"),
            &Options::default(),
            &json!({"year": 2026}),
        )
        .unwrap();
    assert_eq!(out, "© 2026");
}

#[test]
fn string_render_resolves_includes_from_the_filename_option() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "nav.html", "NAV");

    let options = Options::default().with_filename(dir.path().join("virtual.html"));
    let out = Engine::new()
        .render("[<% include nav %>]", &options, &json!({}))
        .unwrap();
    assert_eq!(out, "[NAV]");
}

#[test]
fn custom_resolver_overrides_path_mapping() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "real.html", "RESOLVED");
    let root = dir.path().to_path_buf();

    let options = Options::default()
        .with_filename(dir.path().join("page.html"))
        .with_resolver(Rc::new(move |_target, _base| root.join("real.html")));
    let out = Engine::new()
        .render("<% include anything %>", &options, &json!({}))
        .unwrap();
    assert_eq!(out, "RESOLVED");
}

#[test]
fn cached_template_ignores_file_modification() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "t.html", "v1 <%= n %>");

    let engine = Engine::new();
    let cached = Options::default().with_cache(true);

    assert_eq!(engine.render_file(&path, &cached, &json!({"n": 1})).unwrap(), "v1 1");
    fs::write(&path, "v2 <%= n %>").unwrap();
    // Still the first compilation.
    assert_eq!(engine.render_file(&path, &cached, &json!({"n": 1})).unwrap(), "v1 1");

    // A fresh engine, or caching disabled, sees the new content.
    assert_eq!(
        Engine::new().render_file(&path, &cached, &json!({"n": 1})).unwrap(),
        "v2 1"
    );
    assert_eq!(
        engine
            .render_file(&path, &Options::default(), &json!({"n": 1}))
            .unwrap(),
        "v2 1"
    );
}

#[test]
fn caching_does_not_change_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "t.html", "<% for x in xs %><%= x %>;<% end %>");
    let scope = json!({"xs": ["a", "b"]});

    let engine = Engine::new();
    let cached = engine
        .render_file(&path, &Options::default().with_cache(true), &scope)
        .unwrap();
    let recached = engine
        .render_file(&path, &Options::default().with_cache(true), &scope)
        .unwrap();
    let uncached = engine.render_file(&path, &Options::default(), &scope).unwrap();
    assert_eq!(cached, "a;b;");
    assert_eq!(cached, recached);
    assert_eq!(cached, uncached);
}

#[test]
fn missing_template_file_is_an_io_error() {
    let err = Engine::new()
        .render_file("/no/such/template.html", &Options::default(), &json!({}))
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn missing_include_file_fails_compilation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "page.html", "<% include ghost %>");
    let err = Engine::new()
        .render_file(&path, &Options::default(), &json!({}))
        .unwrap_err();
    match err {
        Error::Io { path, .. } => assert!(path.ends_with("ghost.html")),
        other => panic!("expected an io error, got {other:?}"),
    }
}

#[test]
fn debug_mode_returns_a_source_context_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "page.html",
        "line one\nline two\nline three\n<%= missing %>\nline five\nline six\n",
    );

    let engine = Engine::new();

    // Non-debug: the failure propagates.
    let err = engine
        .render_file(&path, &Options::default(), &json!({}))
        .unwrap_err();
    assert!(matches!(err, Error::Eval { line: Some(4), .. }));

    // Debug: the failure becomes the output.
    let report = engine
        .render_file(&path, &Options::default().with_debug(true), &json!({}))
        .unwrap();
    assert!(report.contains("`missing` is not defined"));
    assert!(report.contains("> 4 | <%= missing %>"));
    assert!(report.contains("  2 | line two"));
    assert!(report.contains("  6 | line six"));
    assert!(!report.contains("line one"));
}

#[test]
fn debug_report_points_into_the_included_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "page.html", "before\n<% include broken %>\nafter\n");
    write(dir.path(), "broken.html", "fine\n<%= nope %>\n");

    let report = Engine::new()
        .render_file(&path, &Options::default().with_debug(true), &json!({}))
        .unwrap();
    assert!(report.contains("broken.html"));
    assert!(report.contains("> 2 | <%= nope %>"));
}

#[test]
fn debug_mode_without_a_known_position_propagates_the_error() {
    // String render with no filename: there is no source to report against.
    let err = Engine::new()
        .render("<%= missing %>", &Options::default().with_debug(true), &json!({}))
        .unwrap_err();
    assert!(matches!(err, Error::Eval { .. }));
}

#[test]
fn debug_report_replaces_the_whole_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "page.html", "kept output<%= missing %>");
    let report = Engine::new()
        .render_file(&path, &Options::default().with_debug(true), &json!({}))
        .unwrap();
    // The partial buffer is discarded, not prepended.
    assert!(!report.starts_with("kept output"));
}
