//! Flow analysis over attributed method bodies: reachability, checked
//! exceptions, definite (un)assignment, and capture legality.
//!
//! [`analyze`] runs the four analyses over every class of a compilation
//! unit, in that order. The remaining entry points are queries used while
//! attributing lambdas and statements; they never leave diagnostics behind
//! unless asked to.

mod alive;
mod assign;
mod bits;
mod capture;
mod diagnostics;
mod error;
mod exceptions;
mod liveness;
mod pending;
mod slots;
mod walker;

use std::collections::{HashMap, HashSet};

use nova_hir::body::{Body, ClassDeclId, ExprId, ExprKind, MethodDeclId, StmtId, StmtKind, VarId};
use nova_types::{Diagnostic, Type, TypeEnv};

use crate::alive::{AliveAnalyzer, AliveMode};
use crate::assign::{AssignAnalyzer, AssignMode};
use crate::capture::CaptureAnalyzer;
use crate::exceptions::{ExceptionAnalyzer, ExceptionMode};
use crate::walker::Ctx;

pub use crate::diagnostics::{
    CaptureContext, DiagnosticSink, FlowConfig, FlowDiagnosticKind, FlowLints, Handler,
    SpeculativeDiagnostics,
};
pub use crate::error::FlowError;
pub use crate::liveness::Liveness;
pub use crate::pending::{JumpKind, JumpTarget};

/// Facts derived by the analyses, for lowering and inference.
#[derive(Debug, Default, Clone)]
pub struct FlowAnnotations {
    pub(crate) method_completes_normally: HashMap<MethodDeclId, bool>,
    /// Keyed by the initializer's block.
    pub(crate) initializer_completes_normally: HashMap<StmtId, bool>,
    pub(crate) lambda_completes_normally: HashMap<ExprId, bool>,
    /// Keyed by the `try` statement.
    pub(crate) finally_completes_normally: HashMap<StmtId, bool>,
    pub(crate) case_completes_normally: HashMap<(JumpTarget, usize), bool>,
    pub(crate) effectively_final: HashSet<VarId>,
    pub(crate) anonymous_ctor_thrown: HashMap<ClassDeclId, Vec<Type>>,
    pub(crate) record_fields_to_assign: HashSet<VarId>,
    pub(crate) lambda_thrown: HashMap<ExprId, Vec<Type>>,
}

impl FlowAnnotations {
    pub fn method_completes_normally(&self, method: MethodDeclId) -> Option<bool> {
        self.method_completes_normally.get(&method).copied()
    }

    pub fn initializer_completes_normally(&self, block: StmtId) -> Option<bool> {
        self.initializer_completes_normally.get(&block).copied()
    }

    pub fn lambda_completes_normally(&self, lambda: ExprId) -> Option<bool> {
        self.lambda_completes_normally.get(&lambda).copied()
    }

    pub fn finally_completes_normally(&self, try_stmt: StmtId) -> Option<bool> {
        self.finally_completes_normally.get(&try_stmt).copied()
    }

    /// Whether the statements of case `index` of a switch can complete
    /// normally.
    pub fn case_completes_normally(&self, switch: JumpTarget, index: usize) -> Option<bool> {
        self.case_completes_normally.get(&(switch, index)).copied()
    }

    /// Non-final locals that are never assigned once definitely assigned.
    pub fn is_effectively_final(&self, var: VarId) -> bool {
        self.effectively_final.contains(&var)
    }

    /// The throws clause inferred for an anonymous class's constructor.
    pub fn anonymous_ctor_thrown(&self, class: ClassDeclId) -> Option<&[Type]> {
        self.anonymous_ctor_thrown.get(&class).map(Vec::as_slice)
    }

    /// Record fields a compact constructor leaves to be assigned from its
    /// parameters.
    pub fn is_record_field_to_assign(&self, field: VarId) -> bool {
        self.record_fields_to_assign.contains(&field)
    }

    /// Checked exceptions thrown by a lambda body and not handled inside it.
    pub fn lambda_thrown(&self, lambda: ExprId) -> Option<&[Type]> {
        self.lambda_thrown.get(&lambda).map(Vec::as_slice)
    }
}

#[derive(Debug)]
pub struct FlowAnalysisResult {
    pub diagnostics: Vec<Diagnostic>,
    pub annotations: FlowAnnotations,
}

/// Outcome of [`analyze_lambda`].
#[derive(Debug, Clone)]
pub struct LambdaCompletion {
    pub completes_normally: bool,
    /// Empty unless the analysis was speculative.
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs every analysis over every top-level class of `body`.
pub fn analyze(
    body: &Body,
    env: &dyn TypeEnv,
    config: FlowConfig,
) -> Result<FlowAnalysisResult, FlowError> {
    let _span = tracing::debug_span!("flow_analyze", classes = body.roots().len()).entered();
    let mut sink = DiagnosticSink::new();
    let mut annotations = FlowAnnotations::default();

    for &root in body.roots() {
        tracing::debug!(target = "nova.flow", class = ?root, "analyzing class");

        let mut alive = AliveAnalyzer::new(
            Ctx::new(body, env, &config, &mut sink, &mut annotations),
            AliveMode::Unit,
        );
        alive.analyze_class(root);
        alive.finish()?;
        tracing::debug!(
            target = "nova.flow",
            phase = "alive",
            errors = sink.error_count(),
            "flow phase finished"
        );

        let mut assign = AssignAnalyzer::new(
            Ctx::new(body, env, &config, &mut sink, &mut annotations),
            AssignMode::Unit,
        );
        assign.analyze_class(root);
        assign.finish()?;
        tracing::debug!(
            target = "nova.flow",
            phase = "assign",
            errors = sink.error_count(),
            "flow phase finished"
        );

        let mut exceptions = ExceptionAnalyzer::new(
            Ctx::new(body, env, &config, &mut sink, &mut annotations),
            ExceptionMode::Unit,
        );
        exceptions.analyze_class(root);
        exceptions.finish()?;
        tracing::debug!(
            target = "nova.flow",
            phase = "exceptions",
            errors = sink.error_count(),
            "flow phase finished"
        );

        let mut capture =
            CaptureAnalyzer::new(Ctx::new(body, env, &config, &mut sink, &mut annotations));
        capture.analyze_class(root);
        capture.finish()?;
        tracing::debug!(
            target = "nova.flow",
            phase = "capture",
            errors = sink.error_count(),
            "flow phase finished"
        );
    }

    Ok(FlowAnalysisResult {
        diagnostics: sink.into_diagnostics(),
        annotations,
    })
}

fn expect_lambda(body: &Body, lambda: ExprId) -> Result<(), FlowError> {
    let expr = body.expr(lambda);
    match expr.kind {
        ExprKind::Lambda { .. } => Ok(()),
        _ => Err(FlowError::MissingNode {
            expected: "lambda",
            span: expr.span,
        }),
    }
}

/// Reachability of a single lambda body, out of context.
///
/// Diagnostics are discarded unless `speculative` is set, in which case they
/// are returned.
pub fn analyze_lambda(
    body: &Body,
    env: &dyn TypeEnv,
    lambda: ExprId,
    speculative: bool,
) -> Result<LambdaCompletion, FlowError> {
    let _span = tracing::debug_span!("flow_analyze_lambda", speculative).entered();
    expect_lambda(body, lambda)?;
    let config = FlowConfig::default();
    let mut sink = DiagnosticSink::new();
    let mut annotations = FlowAnnotations::default();
    if !speculative {
        sink.push_handler(Handler::Discard);
    }

    let mut alive = AliveAnalyzer::new(
        Ctx::new(body, env, &config, &mut sink, &mut annotations),
        AliveMode::Lambda,
    );
    let completes_normally = alive.analyze_lambda(lambda);
    alive.finish()?;

    if !speculative {
        sink.pop_handler();
    }
    Ok(LambdaCompletion {
        completes_normally,
        diagnostics: sink.into_diagnostics(),
    })
}

/// The checked exceptions a lambda body throws, for a lambda whose target
/// type is not known yet.
pub fn analyze_lambda_thrown_types(
    body: &Body,
    env: &dyn TypeEnv,
    lambda: ExprId,
) -> Result<Vec<Type>, FlowError> {
    let _span = tracing::debug_span!("flow_lambda_thrown_types").entered();
    expect_lambda(body, lambda)?;
    let config = FlowConfig::default();
    let mut sink = DiagnosticSink::new();
    let mut annotations = FlowAnnotations::default();
    sink.push_handler(Handler::Discard);

    // Effectively-final locals are needed for precise rethrow.
    let mut assign = AssignAnalyzer::new(
        Ctx::new(body, env, &config, &mut sink, &mut annotations),
        AssignMode::Lambda,
    );
    assign.analyze_lambda(lambda);
    assign.finish()?;

    let mut exceptions = ExceptionAnalyzer::new(
        Ctx::new(body, env, &config, &mut sink, &mut annotations),
        ExceptionMode::LambdaInference,
    );
    let thrown = exceptions.infer_lambda_thrown(lambda);
    exceptions.finish()?;

    sink.pop_handler();
    tracing::debug!(target = "nova.flow", thrown = thrown.len(), "inferred lambda thrown types");
    Ok(thrown)
}

/// Whether control can reach the end of `stmt`. Nested classes and lambdas
/// are not looked into.
pub fn alive_after(body: &Body, env: &dyn TypeEnv, stmt: StmtId) -> Result<bool, FlowError> {
    let _span = tracing::debug_span!("flow_alive_after").entered();
    let config = FlowConfig::default();
    let mut sink = DiagnosticSink::new();
    let mut annotations = FlowAnnotations::default();
    sink.push_handler(Handler::Discard);

    let mut alive = AliveAnalyzer::new(
        Ctx::new(body, env, &config, &mut sink, &mut annotations),
        AliveMode::Snippet,
    );
    let completes = alive.analyze_snippet(stmt);
    alive.finish()?;
    sink.pop_handler();
    Ok(completes)
}

/// Whether the body `stmt` of `loop_stmt` contains a reachable `break` that
/// leaves it.
pub fn breaks_out_of(
    body: &Body,
    env: &dyn TypeEnv,
    loop_stmt: StmtId,
    stmt: StmtId,
) -> Result<bool, FlowError> {
    let _span = tracing::debug_span!("flow_breaks_out_of").entered();
    let node = body.stmt(loop_stmt);
    if !matches!(
        node.kind,
        StmtKind::While { .. }
            | StmtKind::DoWhile { .. }
            | StmtKind::For { .. }
            | StmtKind::ForEach { .. }
            | StmtKind::Labeled { .. }
    ) {
        return Err(FlowError::MissingNode {
            expected: "loop",
            span: node.span,
        });
    }
    let config = FlowConfig::default();
    let mut sink = DiagnosticSink::new();
    let mut annotations = FlowAnnotations::default();
    sink.push_handler(Handler::Discard);

    let mut alive = AliveAnalyzer::new(
        Ctx::new(body, env, &config, &mut sink, &mut annotations),
        AliveMode::Unit,
    )
    .probing_breaks();
    alive.analyze_snippet(stmt);
    let breaks_out = alive.breaks_out();
    alive.finish()?;
    sink.pop_handler();
    Ok(breaks_out)
}
