//! The compiler pipeline.
//!
//! Compilation is three stages:
//! - [`tokenizer`]: raw text into literal/instruction blocks with line
//!   numbers.
//! - [`instruction`]: sigil classification of each block into a typed
//!   fragment, parsing embedded expressions with [`expr`].
//! - [`assembler`]: the linear fragments folded into one executable
//!   program, with control flow nested and include directives resolved
//!   into nested templates.
//!
//! Include resolution recurses through the owning [`Engine`](crate::Engine)
//! so nested templates share its cache policy.

pub mod assembler;
pub mod expr;
pub mod instruction;
pub mod tokenizer;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::trace;

use crate::error::Result;
use crate::options::{default_resolve, Options};
use crate::render::{Op, Pos, Template};
use crate::Engine;

use assembler::Assembler;
use instruction::{classify, InstructionKind};
use tokenizer::Block;

/// Compiles template text into an executable program. `file` names the
/// source for include resolution and failure positions; string renders
/// without a configured filename pass `None`.
pub(crate) fn compile(
    engine: &Engine,
    source: &str,
    file: Option<Rc<PathBuf>>,
    options: &Options,
) -> Result<Template> {
    let blocks = tokenizer::tokenize(
        source,
        &options.start,
        &options.end,
        file.as_deref().map(PathBuf::as_path),
    )?;

    let mut assembler = Assembler::new();
    for block in blocks {
        match block {
            Block::Literal(text) => assembler.push_op(Op::Literal(text)),
            Block::Instruction { body, line } => {
                let pos = Pos {
                    file: file.clone(),
                    line,
                };
                match classify(&body) {
                    InstructionKind::Escape(expr) => assembler.push_op(Op::Output {
                        expr,
                        chain: Vec::new(),
                        escape: true,
                        pos,
                    }),
                    InstructionKind::EscapeFiltered(expr, chain) => assembler.push_op(Op::Output {
                        expr,
                        chain,
                        escape: true,
                        pos,
                    }),
                    InstructionKind::Raw(expr) => assembler.push_op(Op::Output {
                        expr,
                        chain: Vec::new(),
                        escape: false,
                        pos,
                    }),
                    InstructionKind::RawFiltered(expr, chain) => assembler.push_op(Op::Output {
                        expr,
                        chain,
                        escape: false,
                        pos,
                    }),
                    InstructionKind::Comment => {}
                    InstructionKind::Include { target, args } => {
                        let op = compile_include(engine, &target, args, pos, &file, options)?;
                        assembler.push_op(op);
                    }
                    InstructionKind::CodeStatement(statement) => {
                        assembler.statement(statement, pos);
                    }
                }
            }
        }
    }

    Ok(Template {
        program: assembler.finish(),
        debug: options.debug,
    })
}

/// Resolves an include target against the including file's directory and
/// compiles it through the engine. There is no cycle detection: a template
/// that includes itself recurses here until the stack runs out.
fn compile_include(
    engine: &Engine,
    target: &str,
    args: Option<instruction::ExprSlot>,
    pos: Pos,
    file: &Option<Rc<PathBuf>>,
    options: &Options,
) -> Result<Op> {
    let base_dir = file
        .as_deref()
        .and_then(|f| f.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let resolved = match &options.resolver {
        Some(resolver) => resolver(target, &base_dir),
        None => default_resolve(target, &base_dir),
    };
    trace!(target, resolved = %resolved.display(), "resolved include");

    let template = engine.compile_at(&resolved, options)?;
    Ok(Op::Include {
        template,
        args,
        pos,
    })
}
