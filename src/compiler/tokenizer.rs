//! Splits template text into literal and instruction blocks.
//!
//! The scanner walks the source looking for the start tag (default `<%`).
//! Text between tags becomes [`Block::Literal`]; tag bodies become
//! [`Block::Instruction`] carrying their 1-based source line. A start tag
//! immediately followed by its own last character (`<%%` for the default
//! pair) emits the tag itself as literal text, letting templates contain
//! literal tag markers.
//!
//! A start tag with no matching end tag is the one fatal compile-time
//! failure in the pipeline.

use std::path::Path;

use crate::error::{Error, Result};

/// One span of template source, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Verbatim text, appended to the output untouched.
    Literal(String),
    /// The body between a tag pair, with the line its body starts on.
    Instruction { body: String, line: u32 },
}

/// Tokenizes `source` into blocks. `file` is only used in the unterminated
/// tag error.
pub fn tokenize(
    source: &str,
    start_tag: &str,
    end_tag: &str,
    file: Option<&Path>,
) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut offset = 0;
    let mut line: u32 = 1;

    // Escape marker: the start tag's own last character doubled.
    let escape_char = start_tag.chars().next_back();

    while offset < source.len() {
        let Some(rel) = source[offset..].find(start_tag) else {
            break;
        };
        let tag_at = offset + rel;
        let body_at = tag_at + start_tag.len();

        if escape_char.is_some_and(|c| source[body_at..].starts_with(c)) {
            // `<%%`: everything up to and including the start tag is literal,
            // and the doubled character is skipped.
            let span = &source[offset..body_at];
            blocks.push(Block::Literal(span.to_string()));
            line += count_newlines(span);
            offset = body_at + escape_char.map_or(0, char::len_utf8);
            continue;
        }

        line += count_newlines(&source[offset..tag_at]);
        let Some(end_rel) = source[body_at..].find(end_tag) else {
            return Err(Error::Parse {
                end: end_tag.to_string(),
                file: file.map(Path::to_path_buf),
                line,
            });
        };

        if tag_at > offset {
            blocks.push(Block::Literal(source[offset..tag_at].to_string()));
        }

        let body = &source[body_at..body_at + end_rel];
        blocks.push(Block::Instruction {
            body: body.to_string(),
            line,
        });
        line += count_newlines(body);

        offset = body_at + end_rel + end_tag.len();
    }

    if offset < source.len() {
        blocks.push(Block::Literal(source[offset..].to_string()));
    }

    Ok(blocks)
}

fn count_newlines(span: &str) -> u32 {
    span.bytes().filter(|b| *b == b'\n').count() as u32
}
