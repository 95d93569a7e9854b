use nova_types::Span;
use thiserror::Error;

/// An internal invariant of the input tree or of an analysis was violated.
///
/// User-facing problems are reported as diagnostics; these errors mean the
/// tree handed to the analyses was malformed and no result is produced for it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("{kind} at {span:?} left its enclosing construct without being resolved")]
    UnresolvedExit { kind: &'static str, span: Span },
    #[error("jump at {span:?} names a target that cannot receive it")]
    ForeignJumpTarget { span: Span },
    #[error("expected a {expected} node at {span:?}")]
    MissingNode { expected: &'static str, span: Span },
}
