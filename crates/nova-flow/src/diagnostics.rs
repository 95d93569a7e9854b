use std::collections::HashSet;

use nova_types::{Diagnostic, Span};
use serde::{Deserialize, Serialize};

/// The construct a captured variable is referenced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureContext {
    Lambda,
    Guard,
    InnerClass,
}

impl CaptureContext {
    fn describe(self) -> &'static str {
        match self {
            CaptureContext::Lambda => "a lambda expression",
            CaptureContext::Guard => "a guard",
            CaptureContext::InnerClass => "an inner class",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowDiagnosticKind {
    UnreachableCode,
    InitializerCannotComplete,
    MissingReturn,
    SwitchStatementNotExhaustive,
    SwitchExpressionNotExhaustive,
    RuleCompletesNormally,
    SwitchExpressionCompletesNormally,
    PossibleFallThrough,
    FinallyCannotComplete,
    UnreportedException,
    UnreportedExceptionDefaultConstructor,
    UnreportedExceptionImplicitClose,
    ExceptionAlreadyCaught,
    ExceptionNeverThrown,
    UnreachableCatch,
    UseBeforeAssignment,
    UnassignedInDefaultConstructor,
    FinalReassigned,
    FinalAssignedInLoop,
    FinalParameterAssigned,
    MultiCatchParameterAssigned,
    UnusedResource,
    CaptureNotEffectivelyFinal(CaptureContext),
    CapturedVariableAssigned(CaptureContext),
    ResourceNotEffectivelyFinal,
}

impl FlowDiagnosticKind {
    /// Stable diagnostic code.
    pub fn code(self) -> &'static str {
        match self {
            FlowDiagnosticKind::UnreachableCode => "FLOW_UNREACHABLE",
            FlowDiagnosticKind::InitializerCannotComplete => "FLOW_INITIALIZER_COMPLETION",
            FlowDiagnosticKind::MissingReturn => "FLOW_MISSING_RETURN",
            FlowDiagnosticKind::SwitchStatementNotExhaustive => "FLOW_SWITCH_STMT_NOT_EXHAUSTIVE",
            FlowDiagnosticKind::SwitchExpressionNotExhaustive => "FLOW_SWITCH_EXPR_NOT_EXHAUSTIVE",
            FlowDiagnosticKind::RuleCompletesNormally => "FLOW_RULE_COMPLETES_NORMALLY",
            FlowDiagnosticKind::SwitchExpressionCompletesNormally => {
                "FLOW_SWITCH_EXPR_COMPLETES_NORMALLY"
            }
            FlowDiagnosticKind::PossibleFallThrough => "FLOW_FALLTHROUGH",
            FlowDiagnosticKind::FinallyCannotComplete => "FLOW_FINALLY_CANNOT_COMPLETE",
            FlowDiagnosticKind::UnreportedException => "FLOW_UNREPORTED_EXCEPTION",
            FlowDiagnosticKind::UnreportedExceptionDefaultConstructor => {
                "FLOW_UNREPORTED_EXCEPTION_DEFAULT_CTOR"
            }
            FlowDiagnosticKind::UnreportedExceptionImplicitClose => {
                "FLOW_UNREPORTED_EXCEPTION_IMPLICIT_CLOSE"
            }
            FlowDiagnosticKind::ExceptionAlreadyCaught => "FLOW_EXCEPTION_ALREADY_CAUGHT",
            FlowDiagnosticKind::ExceptionNeverThrown => "FLOW_EXCEPTION_NEVER_THROWN",
            FlowDiagnosticKind::UnreachableCatch => "FLOW_UNREACHABLE_CATCH",
            FlowDiagnosticKind::UseBeforeAssignment => "FLOW_UNASSIGNED",
            FlowDiagnosticKind::UnassignedInDefaultConstructor => "FLOW_UNASSIGNED_DEFAULT_CTOR",
            FlowDiagnosticKind::FinalReassigned => "FLOW_FINAL_REASSIGNED",
            FlowDiagnosticKind::FinalAssignedInLoop => "FLOW_FINAL_ASSIGNED_IN_LOOP",
            FlowDiagnosticKind::FinalParameterAssigned => "FLOW_FINAL_PARAM_ASSIGNED",
            FlowDiagnosticKind::MultiCatchParameterAssigned => "FLOW_MULTICATCH_PARAM_ASSIGNED",
            FlowDiagnosticKind::UnusedResource => "FLOW_UNUSED_RESOURCE",
            FlowDiagnosticKind::CaptureNotEffectivelyFinal(_) => {
                "FLOW_CAPTURE_NOT_EFFECTIVELY_FINAL"
            }
            FlowDiagnosticKind::CapturedVariableAssigned(_) => "FLOW_CAPTURED_VAR_ASSIGNED",
            FlowDiagnosticKind::ResourceNotEffectivelyFinal => {
                "FLOW_RESOURCE_NOT_EFFECTIVELY_FINAL"
            }
        }
    }

    pub fn is_warning(self) -> bool {
        matches!(
            self,
            FlowDiagnosticKind::PossibleFallThrough
                | FlowDiagnosticKind::FinallyCannotComplete
                | FlowDiagnosticKind::UnreachableCatch
                | FlowDiagnosticKind::UnusedResource
        )
    }
}

/// Reporting of final-variable assignments found by the speculative
/// re-walk of a loop body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeculativeDiagnostics {
    #[default]
    Report,
    Discard,
}

/// Optional warnings, named after the `-Xlint` categories they mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowLints {
    pub fallthrough: bool,
    pub finally: bool,
    pub try_resources: bool,
    pub unreachable_catch: bool,
}

impl Default for FlowLints {
    fn default() -> Self {
        Self {
            fallthrough: false,
            finally: false,
            try_resources: false,
            unreachable_catch: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Emit errors for unreachable statements.
    pub report_unreachable: bool,
    pub lint: FlowLints,
    pub speculative_loop_diagnostics: SpeculativeDiagnostics,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            report_unreachable: true,
            lint: FlowLints::default(),
            speculative_loop_diagnostics: SpeculativeDiagnostics::default(),
        }
    }
}

pub(crate) fn diagnostic(
    kind: FlowDiagnosticKind,
    span: Option<Span>,
    message: String,
) -> Diagnostic {
    if kind.is_warning() {
        Diagnostic::warning(kind.code(), message, span)
    } else {
        Diagnostic::error(kind.code(), message, span)
    }
}

pub(crate) fn capture_message(kind: FlowDiagnosticKind, name: &str) -> String {
    match kind {
        FlowDiagnosticKind::CaptureNotEffectivelyFinal(ctx) => format!(
            "local variables referenced from {} must be final or effectively final (`{name}`)",
            ctx.describe()
        ),
        FlowDiagnosticKind::CapturedVariableAssigned(ctx) => format!(
            "local variable `{name}` is captured by {} and may not be assigned there",
            ctx.describe()
        ),
        _ => format!("`{name}`"),
    }
}

/// How reported diagnostics are treated while a handler is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Emit,
    Discard,
}

/// Buffers diagnostics raised during analysis.
///
/// Probing entry points push a [`Handler::Discard`] so that exploratory runs
/// leave no trace in the final output. The positions of all reported errors
/// are remembered even when discarded, since leftover pending exits are
/// validated against them.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    handlers: Vec<Handler>,
    error_count: usize,
    error_spans: HashSet<Span>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_handler(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    pub fn pop_handler(&mut self) {
        let popped = self.handlers.pop();
        debug_assert!(popped.is_some(), "unbalanced diagnostic handler stack");
    }

    pub fn is_discarding(&self) -> bool {
        self.handlers.last() == Some(&Handler::Discard)
    }

    pub fn report(&mut self, diag: Diagnostic) {
        if diag.is_error() {
            if let Some(span) = diag.span {
                self.error_spans.insert(span);
            }
        }
        if self.is_discarding() {
            return;
        }
        if diag.is_error() {
            self.error_count += 1;
        }
        self.diagnostics.push(diag);
    }

    /// Errors emitted so far; discarded ones do not count.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_error_at(&self, span: Span) -> bool {
        self.error_spans.contains(&span)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
