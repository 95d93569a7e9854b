//! Capture legality.
//!
//! Locals referenced from a lambda body, a pattern guard or a local or
//! anonymous class, but declared outside it, must be final or effectively
//! final, and may not be assigned from inside it.

use nova_hir::body::{
    CaseLabel, ClassDeclId, ExprId, ExprKind, LambdaBody, Member, MethodDeclId, Pattern,
    Resource, StmtId, StmtKind, Switch, VarId,
};
use nova_types::Span;

use crate::diagnostics::{capture_message, CaptureContext, FlowDiagnosticKind};
use crate::error::FlowError;
use crate::walker::{is_stuck, operands, Ctx, FrameKind, FrameStack};

fn capture_context(kind: FrameKind) -> Option<CaptureContext> {
    match kind {
        FrameKind::Lambda => Some(CaptureContext::Lambda),
        FrameKind::Guard => Some(CaptureContext::Guard),
        FrameKind::Class(_) => Some(CaptureContext::InnerClass),
        FrameKind::Block | FrameKind::Method => None,
    }
}

pub(crate) struct CaptureAnalyzer<'a> {
    cx: Ctx<'a>,
    frames: FrameStack,
}

impl<'a> CaptureAnalyzer<'a> {
    pub(crate) fn new(cx: Ctx<'a>) -> Self {
        Self {
            cx,
            frames: FrameStack::new(),
        }
    }

    pub(crate) fn analyze_class(&mut self, class: ClassDeclId) {
        self.frames = FrameStack::new();
        self.visit_class(class);
    }

    pub(crate) fn finish(self) -> Result<(), FlowError> {
        self.cx.finish()
    }

    fn is_effectively_final(&self, var: VarId) -> bool {
        self.cx.body.var(var).is_final || self.cx.annotations.effectively_final.contains(&var)
    }

    /// The construct a reference to `var` crosses, for locals only.
    fn crossed(&self, var: VarId) -> Option<CaptureContext> {
        if !self.cx.body.var(var).is_local() {
            return None;
        }
        self.frames.captured_across(var).and_then(capture_context)
    }

    fn check_effectively_final(&mut self, span: Span, var: VarId) {
        if self.is_effectively_final(var) {
            return;
        }
        if let Some(ctx) = self.crossed(var) {
            let kind = FlowDiagnosticKind::CaptureNotEffectivelyFinal(ctx);
            let message = capture_message(kind, self.cx.var_name(var));
            self.cx.report(kind, span, message);
        }
    }

    fn let_init(&mut self, target: ExprId) {
        let body = self.cx.body;
        let Some(var) = body.assigned_var(target) else {
            return;
        };
        let span = body.expr(target).span;
        // A compound assignment already reported the read at this position.
        if self.cx.sink.has_error_at(span) {
            return;
        }
        if let Some(ctx) = self.crossed(var) {
            let kind = FlowDiagnosticKind::CapturedVariableAssigned(ctx);
            let message = capture_message(kind, self.cx.var_name(var));
            self.cx.report(kind, span, message);
        }
    }

    fn visit_class(&mut self, class: ClassDeclId) {
        if self.cx.failed() {
            return;
        }
        let body = self.cx.body;
        self.frames.push(body, FrameKind::Class(class));
        for member in &body.class(class).members {
            match member {
                Member::Field { init, .. } => {
                    if let Some(init) = init {
                        self.scan_expr(*init);
                    }
                }
                Member::Initializer { body: block, .. } => self.scan_stmt(*block),
                Member::Method(method) => self.visit_method(*method),
                Member::Class(nested) => self.visit_class(*nested),
            }
        }
        self.frames.pop();
    }

    fn visit_method(&mut self, method: MethodDeclId) {
        let body = self.cx.body;
        let decl = body.method(method);
        self.frames.push(body, FrameKind::Method);
        for &param in &decl.params {
            self.frames.declare(param);
        }
        if let Some(block) = decl.body {
            self.scan_stmt(block);
        }
        self.frames.pop();
    }

    fn scan_stmts(&mut self, stmts: &[StmtId]) {
        for &stmt in stmts {
            self.scan_stmt(stmt);
        }
    }

    fn scan_stmt(&mut self, stmt: StmtId) {
        if self.cx.failed() {
            return;
        }
        let body = self.cx.body;
        match &body.stmt(stmt).kind {
            StmtKind::Block(stmts) => {
                self.frames.push(body, FrameKind::Block);
                self.scan_stmts(stmts);
                self.frames.pop();
            }
            StmtKind::LocalVar { var, init } => {
                if let Some(init) = init {
                    self.scan_expr(*init);
                }
                self.frames.declare(*var);
            }
            StmtKind::LocalClass(class) => self.visit_class(*class),
            StmtKind::Expr(expr) | StmtKind::Throw(expr) => self.scan_expr(*expr),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.scan_expr(*condition);
                self.scan_stmt(*then_branch);
                if let Some(else_branch) = else_branch {
                    self.scan_stmt(*else_branch);
                }
            }
            StmtKind::While { condition, body: loop_body }
            | StmtKind::DoWhile { body: loop_body, condition } => {
                self.scan_expr(*condition);
                self.scan_stmt(*loop_body);
            }
            StmtKind::For {
                init,
                condition,
                update,
                body: loop_body,
            } => {
                self.frames.push(body, FrameKind::Block);
                self.scan_stmts(init);
                if let Some(condition) = condition {
                    self.scan_expr(*condition);
                }
                self.scan_stmt(*loop_body);
                self.scan_stmts(update);
                self.frames.pop();
            }
            StmtKind::ForEach {
                var,
                iterable,
                body: loop_body,
            } => {
                self.scan_expr(*iterable);
                self.frames.push(body, FrameKind::Block);
                self.frames.declare(*var);
                self.scan_stmt(*loop_body);
                self.frames.pop();
            }
            StmtKind::Labeled { body: labeled, .. } => self.scan_stmt(*labeled),
            StmtKind::Switch(switch) => self.scan_switch(switch),
            StmtKind::Try {
                resources,
                body: try_body,
                catches,
                finally,
            } => {
                self.check_resources(resources);
                self.frames.push(body, FrameKind::Block);
                for resource in resources {
                    match resource {
                        Resource::Var { var, init } => {
                            self.scan_expr(*init);
                            self.frames.declare(*var);
                        }
                        Resource::Expr(expr) => self.scan_expr(*expr),
                    }
                }
                self.scan_stmt(*try_body);
                self.frames.pop();
                for catch in catches {
                    self.frames.push(body, FrameKind::Block);
                    self.frames.declare(catch.param);
                    self.scan_stmt(catch.body);
                    self.frames.pop();
                }
                if let Some(finally) = finally {
                    self.scan_stmt(*finally);
                }
            }
            StmtKind::Synchronized { lock, body: block } => {
                self.scan_expr(*lock);
                self.scan_stmt(*block);
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.scan_expr(*value);
                }
            }
            StmtKind::Yield { value, .. } => self.scan_expr(*value),
            StmtKind::Assert { condition, detail } => {
                self.scan_expr(*condition);
                if let Some(detail) = detail {
                    self.scan_expr(*detail);
                }
            }
            StmtKind::Break { .. } | StmtKind::Continue { .. } | StmtKind::Empty => {}
        }
    }

    /// Expression resources are closed after the body, so the variable they
    /// name must not change in between.
    fn check_resources(&mut self, resources: &[Resource]) {
        let body = self.cx.body;
        for resource in resources {
            let Resource::Expr(expr) = resource else {
                continue;
            };
            let Some(var) = body.assigned_var(*expr) else {
                continue;
            };
            if !self.is_effectively_final(var) {
                self.cx.report(
                    FlowDiagnosticKind::ResourceNotEffectivelyFinal,
                    body.expr(*expr).span,
                    format!(
                        "variable `{}` used as a try-with-resources resource is neither final nor effectively final",
                        self.cx.var_name(var)
                    ),
                );
            }
        }
    }

    fn scan_switch(&mut self, switch: &Switch) {
        let body = self.cx.body;
        self.scan_expr(switch.selector);
        for case in &switch.cases {
            self.frames.push(body, FrameKind::Block);
            for label in &case.labels {
                match label {
                    CaseLabel::Default => {}
                    CaseLabel::Expr(expr) => self.scan_expr(*expr),
                    CaseLabel::Pattern { pattern, .. } => self.scan_pattern(pattern),
                }
            }
            self.scan_stmts(&case.stats);
            self.frames.pop();
        }
    }

    fn scan_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Binding { var } => self.frames.declare(*var),
            Pattern::Guarded { pattern, guard } => {
                self.scan_pattern(pattern);
                self.frames.push(self.cx.body, FrameKind::Guard);
                self.scan_expr(*guard);
                self.frames.pop();
            }
        }
    }

    fn scan_expr(&mut self, expr: ExprId) {
        if self.cx.failed() {
            return;
        }
        let body = self.cx.body;
        let data = body.expr(expr);
        match &data.kind {
            ExprKind::Ident(var) => self.check_effectively_final(data.span, *var),
            ExprKind::Assign { target, value } => {
                if !matches!(body.expr(*target).kind, ExprKind::Ident(_)) {
                    self.scan_expr(*target);
                }
                self.scan_expr(*value);
                self.let_init(*target);
            }
            ExprKind::CompoundAssign { target, value, .. } => {
                self.scan_expr(*target);
                self.scan_expr(*value);
                self.let_init(*target);
            }
            ExprKind::Unary { op, expr: operand } => {
                self.scan_expr(*operand);
                if op.is_increment() {
                    self.let_init(*operand);
                }
            }
            ExprKind::Lambda {
                params,
                body: lambda_body,
                ..
            } => {
                if is_stuck(body, expr) {
                    return;
                }
                self.frames.push(body, FrameKind::Lambda);
                for &param in params {
                    self.frames.declare(param);
                }
                match lambda_body {
                    LambdaBody::Expr(value) => self.scan_expr(*value),
                    LambdaBody::Block(block) => self.scan_stmt(*block),
                }
                self.frames.pop();
            }
            ExprKind::New { args, body: class, .. } => {
                for &arg in args {
                    self.scan_expr(arg);
                }
                if let Some(class) = class {
                    self.visit_class(*class);
                }
            }
            ExprKind::SwitchExpr(switch) => self.scan_switch(switch),
            ExprKind::InstanceOf { expr: operand, pattern } => {
                self.scan_expr(*operand);
                if let Some(pattern) = pattern {
                    self.scan_pattern(pattern);
                }
            }
            kind @ (ExprKind::Literal(_)
            | ExprKind::EnumConstant { .. }
            | ExprKind::This
            | ExprKind::Select { .. }
            | ExprKind::Binary { .. }
            | ExprKind::Conditional { .. }
            | ExprKind::Call { .. }
            | ExprKind::NewArray { .. }
            | ExprKind::ArrayAccess { .. }
            | ExprKind::Cast { .. }
            | ExprKind::Missing) => {
                for operand in operands(kind) {
                    self.scan_expr(operand);
                }
            }
        }
    }
}
