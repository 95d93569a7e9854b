//! Non-local transfers of control awaiting their target.

use nova_hir::body::{ExprId, StmtId};
use nova_types::Span;

use crate::liveness::Liveness;

/// The construct a `break`, `continue` or `yield` leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpTarget {
    Stmt(StmtId),
    /// A switch expression.
    Expr(ExprId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpKind {
    Break,
    Continue,
    Yield,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitKind {
    Jump { kind: JumpKind, target: JumpTarget },
    Return,
    Thrown,
}

impl ExitKind {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            ExitKind::Jump {
                kind: JumpKind::Break,
                ..
            } => "break",
            ExitKind::Jump {
                kind: JumpKind::Continue,
                ..
            } => "continue",
            ExitKind::Jump {
                kind: JumpKind::Yield,
                ..
            } => "yield",
            ExitKind::Return => "return",
            ExitKind::Thrown => "thrown exception",
        }
    }
}

/// One in-flight exit with the analysis state captured where it left.
#[derive(Debug, Clone)]
pub(crate) struct PendingExit<S> {
    pub(crate) kind: ExitKind,
    pub(crate) span: Span,
    pub(crate) state: S,
}

/// Exits recorded inside the construct currently being walked, in source
/// order.
#[derive(Debug, Clone)]
pub(crate) struct ExitQueue<S> {
    exits: Vec<PendingExit<S>>,
}

impl<S> Default for ExitQueue<S> {
    fn default() -> Self {
        Self { exits: Vec::new() }
    }
}

impl<S> ExitQueue<S> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, kind: ExitKind, span: Span, state: S) {
        self.exits.push(PendingExit { kind, span, state });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.exits.is_empty()
    }

    pub(crate) fn append(&mut self, other: ExitQueue<S>) {
        self.exits.extend(other.exits);
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&PendingExit<S>) -> bool) {
        self.exits.retain(keep);
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut PendingExit<S>> {
        self.exits.iter_mut()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = PendingExit<S>> {
        std::mem::take(&mut self.exits).into_iter()
    }

    /// Takes every exit of `kind` aimed at `target` out of the queue. The
    /// remaining exits are appended to `outer`, which becomes the queue.
    ///
    /// Returns the captured states of the resolved exits, in source order.
    pub(crate) fn resolve(
        &mut self,
        kind: JumpKind,
        target: JumpTarget,
        outer: ExitQueue<S>,
    ) -> Vec<S> {
        let exits = std::mem::replace(self, outer).exits;
        let mut resolved = Vec::new();
        for exit in exits {
            if exit.kind == (ExitKind::Jump { kind, target }) {
                resolved.push(exit.state);
            } else {
                self.exits.push(exit);
            }
        }
        resolved
    }

    /// [`ExitQueue::resolve`] for analyses that only care whether any exit
    /// reached the target.
    pub(crate) fn resolve_liveness(
        &mut self,
        kind: JumpKind,
        target: JumpTarget,
        outer: ExitQueue<S>,
    ) -> Liveness {
        Liveness::from(!self.resolve(kind, target, outer).is_empty())
    }
}
