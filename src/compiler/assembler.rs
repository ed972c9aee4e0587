//! Folds the linear fragment sequence into an executable program.
//!
//! Output and literal fragments pass straight through. Control-flow
//! statements nest: `if`/`else if`/`else`/`end` collapse into one
//! conditional op, `for`/`end` into one loop op. The assembler keeps a
//! frame stack; `end` pops a frame and emits the finished op into the
//! enclosing body.
//!
//! Unbalanced control flow is not a compile failure. A stray `else`,
//! `else if`, or `end` becomes a raising fragment at its own position, and
//! a block still open at the end of input is replaced by a raising fragment
//! at the line that opened it.

use std::mem;

use super::instruction::{ExprSlot, Statement};
use crate::render::{Op, Pos, RaiseKind};

pub struct Assembler {
    stack: Vec<Frame>,
}

struct Frame {
    kind: FrameKind,
    ops: Vec<Op>,
}

/// Where the innermost frame stands relative to an `if`.
enum IfState {
    /// Collecting a conditional arm; `else`/`else if` may follow.
    OpenArm,
    /// Collecting the `else` arm; only `end` may follow.
    InElse,
    /// The innermost frame is not a conditional.
    NotIf,
}

enum FrameKind {
    Root,
    If {
        /// Completed arms, in source order.
        arms: Vec<(ExprSlot, Vec<Op>)>,
        /// Condition of the arm currently collecting into `ops`;
        /// `None` once the `else` arm has started.
        current: Option<ExprSlot>,
        pos: Pos,
    },
    For {
        var: String,
        items: ExprSlot,
        pos: Pos,
    },
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            stack: vec![Frame {
                kind: FrameKind::Root,
                ops: Vec::new(),
            }],
        }
    }

    /// Appends a finished op to the innermost open body.
    pub fn push_op(&mut self, op: Op) {
        self.top().ops.push(op);
    }

    fn top(&mut self) -> &mut Frame {
        self.stack.last_mut().expect("assembler root frame")
    }

    fn raise(&mut self, message: impl Into<String>, pos: Pos) {
        self.push_op(Op::Raise {
            kind: RaiseKind::Eval(message.into()),
            pos,
        });
    }

    /// Feeds one control-flow statement.
    pub fn statement(&mut self, statement: Statement, pos: Pos) {
        match statement {
            Statement::Empty => {}
            Statement::If(cond) => self.stack.push(Frame {
                kind: FrameKind::If {
                    arms: Vec::new(),
                    current: Some(cond),
                    pos,
                },
                ops: Vec::new(),
            }),
            Statement::ElseIf(cond) => match self.if_state() {
                IfState::OpenArm => self.seal_arm(Some(cond)),
                IfState::InElse => self.raise("`else if` after `else`", pos),
                IfState::NotIf => self.raise("`else if` outside of `if`", pos),
            },
            Statement::Else => match self.if_state() {
                IfState::OpenArm => self.seal_arm(None),
                IfState::InElse => self.raise("duplicate `else`", pos),
                IfState::NotIf => self.raise("`else` outside of `if`", pos),
            },
            Statement::End => match self.stack.len() {
                1 => self.raise("unexpected `end`", pos),
                _ => {
                    let frame = self.stack.pop().expect("checked depth");
                    let op = close_frame(frame);
                    self.push_op(op);
                }
            },
            Statement::For { var, items } => self.stack.push(Frame {
                kind: FrameKind::For { var, items, pos },
                ops: Vec::new(),
            }),
            Statement::Let { name, expr } => self.push_op(Op::Let { name, expr, pos }),
            Statement::BadInclude(directive) => self.push_op(Op::Raise {
                kind: RaiseKind::IncludeSyntax(directive),
                pos,
            }),
            Statement::Invalid(text) => {
                self.raise(format!("unsupported statement `{text}`"), pos);
            }
        }
    }

    fn if_state(&self) -> IfState {
        match &self.stack.last().expect("assembler root frame").kind {
            FrameKind::If {
                current: Some(_), ..
            } => IfState::OpenArm,
            FrameKind::If { current: None, .. } => IfState::InElse,
            _ => IfState::NotIf,
        }
    }

    /// Moves the collecting arm of the innermost `if` into its arm list and
    /// starts the next one (`Some` condition) or the else arm (`None`).
    fn seal_arm(&mut self, next: Option<ExprSlot>) {
        let frame = self.top();
        let body = mem::take(&mut frame.ops);
        if let FrameKind::If { arms, current, .. } = &mut frame.kind {
            let cond = current.take().expect("sealing requires an open arm");
            arms.push((cond, body));
            *current = next;
        }
    }

    /// Closes the program. Frames still open become raising fragments at
    /// the line that opened them.
    pub fn finish(mut self) -> Vec<Op> {
        while self.stack.len() > 1 {
            let frame = self.stack.pop().expect("checked depth");
            let (what, pos) = match &frame.kind {
                FrameKind::If { pos, .. } => ("if", pos.clone()),
                FrameKind::For { pos, .. } => ("for", pos.clone()),
                FrameKind::Root => unreachable!("root is never above the bottom"),
            };
            self.push_op(Op::Raise {
                kind: RaiseKind::Eval(format!("unclosed `{what}` block")),
                pos,
            });
        }
        self.stack.pop().map(|frame| frame.ops).unwrap_or_default()
    }
}

fn close_frame(frame: Frame) -> Op {
    let ops = frame.ops;
    match frame.kind {
        FrameKind::If {
            mut arms,
            current,
            pos,
        } => match current {
            Some(cond) => {
                arms.push((cond, ops));
                Op::If {
                    arms,
                    alt: None,
                    pos,
                }
            }
            None => Op::If {
                arms,
                alt: Some(ops),
                pos,
            },
        },
        FrameKind::For { var, items, pos } => Op::For {
            var,
            items,
            body: ops,
            pos,
        },
        FrameKind::Root => unreachable!("root frame is never closed by `end`"),
    }
}
