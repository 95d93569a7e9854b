//! Pieces shared by every analysis walk: the analysis context, lexical
//! frames, and operand enumeration for expressions without control-flow
//! significance.

use nova_hir::body::{Body, ClassDeclId, ClassDeclKind, ExprId, ExprKind, VarId};
use nova_types::{Span, Type, TypeEnv};

use crate::diagnostics::{diagnostic, DiagnosticSink, FlowConfig, FlowDiagnosticKind};
use crate::error::FlowError;
use crate::FlowAnnotations;

/// Everything an analysis reads or writes besides its own dataflow state.
pub(crate) struct Ctx<'a> {
    pub(crate) body: &'a Body,
    pub(crate) env: &'a dyn TypeEnv,
    pub(crate) config: &'a FlowConfig,
    pub(crate) sink: &'a mut DiagnosticSink,
    pub(crate) annotations: &'a mut FlowAnnotations,
    fault: Option<FlowError>,
}

impl<'a> Ctx<'a> {
    pub(crate) fn new(
        body: &'a Body,
        env: &'a dyn TypeEnv,
        config: &'a FlowConfig,
        sink: &'a mut DiagnosticSink,
        annotations: &'a mut FlowAnnotations,
    ) -> Self {
        Self {
            body,
            env,
            config,
            sink,
            annotations,
            fault: None,
        }
    }

    /// A context for a nested check sharing this one's sink and annotations.
    pub(crate) fn reborrow(&mut self) -> Ctx<'_> {
        Ctx {
            body: self.body,
            env: self.env,
            config: self.config,
            sink: &mut *self.sink,
            annotations: &mut *self.annotations,
            fault: None,
        }
    }

    pub(crate) fn report(&mut self, kind: FlowDiagnosticKind, span: Span, message: String) {
        self.sink.report(diagnostic(kind, Some(span), message));
    }

    /// Records an invariant violation; only the first one is kept.
    pub(crate) fn fail(&mut self, err: FlowError) {
        if self.fault.is_none() {
            tracing::debug!(target = "nova.flow", error = %err, "flow analysis aborted");
            self.fault = Some(err);
        }
    }

    pub(crate) fn failed(&self) -> bool {
        self.fault.is_some()
    }

    pub(crate) fn finish(self) -> Result<(), FlowError> {
        match self.fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub(crate) fn var_name(&self, var: VarId) -> &'a str {
        self.body.var(var).name.as_str()
    }

    pub(crate) fn type_name(&self, ty: &Type) -> String {
        type_name(self.env, ty)
    }
}

pub(crate) fn type_name(env: &dyn TypeEnv, ty: &Type) -> String {
    match ty {
        Type::Class(class) => env
            .class(class.def)
            .map_or_else(|| "<unknown>".to_string(), |def| def.name.clone()),
        Type::TypeVar(id) => env
            .type_param(*id)
            .map_or_else(|| "<unknown>".to_string(), |param| param.name.clone()),
        Type::Intersection(parts) => parts
            .iter()
            .map(|p| type_name(env, p))
            .collect::<Vec<_>>()
            .join(" & "),
        Type::Array(elem) => format!("{}[]", type_name(env, elem)),
        Type::Named(name) => name.clone(),
        Type::Primitive(p) => format!("{p:?}").to_lowercase(),
        Type::Void => "void".to_string(),
        Type::Null => "null".to_string(),
        Type::Unknown | Type::Error => "<error>".to_string(),
    }
}

/// Lambdas whose target type could not be attributed are not analyzed.
pub(crate) fn is_stuck(body: &Body, expr: ExprId) -> bool {
    let expr = body.expr(expr);
    matches!(expr.kind, ExprKind::Lambda { .. }) && expr.ty.is_erroneous()
}

/// Direct sub-expressions in evaluation order.
///
/// Lambda bodies, switch-expression cases, patterns and anonymous class
/// bodies are not operands; each analysis handles those itself.
pub(crate) fn operands(kind: &ExprKind) -> Vec<ExprId> {
    match kind {
        ExprKind::Literal(_)
        | ExprKind::Ident(_)
        | ExprKind::EnumConstant { .. }
        | ExprKind::This
        | ExprKind::Lambda { .. }
        | ExprKind::Missing => Vec::new(),
        ExprKind::Select { receiver, .. } => vec![*receiver],
        ExprKind::Assign { target, value } | ExprKind::CompoundAssign { target, value, .. } => {
            vec![*target, *value]
        }
        ExprKind::Unary { expr, .. }
        | ExprKind::Cast { expr }
        | ExprKind::InstanceOf { expr, .. } => {
            vec![*expr]
        }
        ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
        ExprKind::Conditional {
            condition,
            then_expr,
            else_expr,
        } => vec![*condition, *then_expr, *else_expr],
        ExprKind::Call { receiver, args, .. } => receiver.iter().chain(args).copied().collect(),
        ExprKind::New { args, .. } => args.clone(),
        ExprKind::NewArray { dims, init } => dims
            .iter()
            .chain(init.iter().flatten())
            .copied()
            .collect(),
        ExprKind::ArrayAccess { array, index } => vec![*array, *index],
        ExprKind::SwitchExpr(switch) => vec![switch.selector],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Block,
    Method,
    Lambda,
    Guard,
    Class(ClassDeclId),
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// References from inside this frame to locals of enclosing frames are
    /// captures.
    captures: bool,
    locals: Vec<VarId>,
}

/// The lexical frames enclosing the node being walked, innermost last.
#[derive(Debug, Default)]
pub(crate) struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, body: &Body, kind: FrameKind) {
        let captures = match kind {
            FrameKind::Lambda | FrameKind::Guard => true,
            FrameKind::Class(class) => {
                let local = matches!(
                    body.class(class).kind,
                    ClassDeclKind::Local | ClassDeclKind::Anonymous
                );
                local
                    || self
                        .innermost_capture()
                        .is_some_and(|(_, kind)| matches!(kind, FrameKind::Class(_)))
            }
            FrameKind::Block | FrameKind::Method => false,
        };
        self.frames.push(Frame {
            kind,
            captures,
            locals: Vec::new(),
        });
    }

    pub(crate) fn pop(&mut self) {
        let popped = self.frames.pop();
        debug_assert!(popped.is_some(), "unbalanced frame stack");
    }

    pub(crate) fn declare(&mut self, var: VarId) {
        if let Some(frame) = self.frames.last_mut() {
            frame.locals.push(var);
        }
    }

    /// Depth of the frame declaring `var`.
    fn owner(&self, var: VarId) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|frame| frame.locals.contains(&var))
    }

    /// Depth and kind of the innermost capturing construct.
    pub(crate) fn innermost_capture(&self) -> Option<(usize, FrameKind)> {
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find(|(_, frame)| frame.captures)
            .map(|(depth, frame)| (depth, frame.kind))
    }

    /// The capturing construct `var` is referenced across, if any: a local
    /// declared outside the innermost capturing frame.
    pub(crate) fn captured_across(&self, var: VarId) -> Option<FrameKind> {
        let (depth, kind) = self.innermost_capture()?;
        match self.owner(var) {
            Some(owner) if owner >= depth => None,
            _ => Some(kind),
        }
    }
}
