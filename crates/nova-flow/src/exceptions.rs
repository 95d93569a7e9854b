//! Checked exceptions.
//!
//! Every checked exception thrown by a statement must be caught by an
//! enclosing `try` or declared in the enclosing method's `throws` clause.
//! Uncaught throws travel outwards as pending exits and are reported when
//! the enclosing method, initializer or lambda is done.

use std::collections::HashMap;

use nova_hir::body::{
    CaseLabel, CatchClause, ClassDeclId, ExprId, ExprKind, LambdaBody, Member, MethodDeclId,
    Pattern, Resource, StmtId, StmtKind, Switch, VarId,
};
use nova_types::{
    diff, incl, intersect, intersects, is_checked, is_handled, is_subclass, lookup_method, subset,
    union, upper_bounds, ClassId, Span, Type,
};

use crate::alive::finally_completes;
use crate::diagnostics::FlowDiagnosticKind;
use crate::error::FlowError;
use crate::pending::{ExitKind, ExitQueue, JumpKind, JumpTarget};
use crate::walker::{is_stuck, operands, Ctx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExceptionMode {
    /// Whole classes; uncaught exceptions are reported.
    Unit,
    /// Collects what a lambda body throws, treating everything as caught.
    /// Classes and nested lambdas are skipped.
    LambdaInference,
}

/// Where an uncaught exception surfaces, for choosing the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThrowSite {
    Plain,
    /// The implicit `super(...)` of a synthesized constructor.
    DefaultConstructor,
    /// The implicit `close()` of a resource variable.
    ImplicitClose(VarId),
}

#[derive(Debug, Clone)]
struct Uncaught {
    ty: Type,
    site: ThrowSite,
}

pub(crate) struct ExceptionAnalyzer<'a> {
    cx: Ctx<'a>,
    mode: ExceptionMode,
    /// Exceptions thrown so far in the current `try` body, method or lambda.
    thrown: Vec<Type>,
    /// Exceptions handled by enclosing `catch` clauses or `throws` clauses.
    caught: Vec<Type>,
    /// `None` for jumps and returns.
    pending: ExitQueue<Option<Uncaught>>,
    /// Types a catch parameter may rethrow precisely, while its block is
    /// walked.
    precise_rethrow: HashMap<VarId, Vec<Type>>,
    in_generated_ctor: bool,
    in_lambda: bool,
    inferred: Option<Vec<Type>>,
}

impl<'a> ExceptionAnalyzer<'a> {
    pub(crate) fn new(cx: Ctx<'a>, mode: ExceptionMode) -> Self {
        Self {
            cx,
            mode,
            thrown: Vec::new(),
            caught: Vec::new(),
            pending: ExitQueue::new(),
            precise_rethrow: HashMap::new(),
            in_generated_ctor: false,
            in_lambda: false,
            inferred: None,
        }
    }

    pub(crate) fn analyze_class(&mut self, class: ClassDeclId) {
        self.thrown.clear();
        self.caught.clear();
        self.pending = ExitQueue::new();
        self.visit_class(class);
    }

    /// The checked exceptions a lambda's body may throw.
    pub(crate) fn infer_lambda_thrown(&mut self, lambda: ExprId) -> Vec<Type> {
        self.inferred = None;
        self.scan_expr(lambda);
        let env = self.cx.env;
        self.inferred
            .take()
            .unwrap_or_default()
            .into_iter()
            .filter(|ty| is_checked(env, ty))
            .collect()
    }

    pub(crate) fn finish(self) -> Result<(), FlowError> {
        self.cx.finish()
    }

    fn mark_thrown(&mut self, span: Span, ty: &Type, site: ThrowSite) {
        let env = self.cx.env;
        if !is_checked(env, ty) {
            return;
        }
        if !is_handled(env, ty, &self.caught) {
            let site = if self.in_generated_ctor {
                ThrowSite::DefaultConstructor
            } else {
                site
            };
            self.pending.push(
                ExitKind::Thrown,
                span,
                Some(Uncaught {
                    ty: ty.clone(),
                    site,
                }),
            );
        }
        self.thrown = incl(env, ty, &self.thrown);
    }

    fn record_exit(&mut self, kind: ExitKind, span: Span) {
        self.pending.push(kind, span, None);
    }

    /// Reports every pending uncaught exception and empties the queue.
    fn error_uncaught(&mut self) {
        for exit in self.pending.drain().collect::<Vec<_>>() {
            let Some(uncaught) = exit.state else {
                if !self.cx.sink.has_error_at(exit.span) {
                    self.cx.fail(FlowError::UnresolvedExit {
                        kind: exit.kind.describe(),
                        span: exit.span,
                    });
                }
                continue;
            };
            let name = self.cx.type_name(&uncaught.ty);
            let (kind, message) = match uncaught.site {
                ThrowSite::DefaultConstructor => (
                    FlowDiagnosticKind::UnreportedExceptionDefaultConstructor,
                    format!("unreported exception {name} in default constructor"),
                ),
                ThrowSite::ImplicitClose(var) => (
                    FlowDiagnosticKind::UnreportedExceptionImplicitClose,
                    format!(
                        "unreported exception {name}; must be caught or declared to be thrown; \
                         thrown from implicit call to close() on resource variable `{}`",
                        self.cx.var_name(var)
                    ),
                ),
                ThrowSite::Plain => (
                    FlowDiagnosticKind::UnreportedException,
                    format!("unreported exception {name}; must be caught or declared to be thrown"),
                ),
            };
            self.cx.report(kind, exit.span, message);
        }
    }

    /// Keeps only the thrown exits; returns are resolved by the method or
    /// lambda being left.
    fn keep_thrown_exits(&mut self) {
        for exit in self.pending.drain().collect::<Vec<_>>() {
            if exit.state.is_some() {
                self.pending.push(exit.kind, exit.span, exit.state);
            } else if exit.kind != ExitKind::Return && !self.cx.sink.has_error_at(exit.span) {
                self.cx.fail(FlowError::UnresolvedExit {
                    kind: exit.kind.describe(),
                    span: exit.span,
                });
            }
        }
    }

    fn resolve(&mut self, kind: JumpKind, target: JumpTarget, outer: ExitQueue<Option<Uncaught>>) {
        self.pending.resolve(kind, target, outer);
    }

    // === Declarations ===

    fn visit_class(&mut self, class: ClassDeclId) {
        if self.mode == ExceptionMode::LambdaInference || self.cx.failed() {
            return;
        }
        let body = self.cx.body;
        let decl = body.class(class);
        let anonymous = decl.is_anonymous();

        let pending_prev = std::mem::take(&mut self.pending);
        let caught_prev = self.caught.clone();
        let mut thrown_prev = std::mem::take(&mut self.thrown);
        let generated_prev = std::mem::replace(&mut self.in_generated_ctor, false);
        if !anonymous {
            self.caught.clear();
        }

        for member in decl.members.iter().filter(|m| m.is_static(body)) {
            self.scan_member(member);
            self.error_uncaught();
        }

        // Instance initializers run as part of every initial constructor, so
        // they may throw what all of those declare.
        if !anonymous {
            let mut initial = decl
                .methods()
                .map(|m| body.method(m))
                .filter(|m| m.is_initial_constructor());
            if let Some(first) = initial.next() {
                let env = self.cx.env;
                self.caught = initial.fold(first.thrown.clone(), |acc, m| {
                    intersect(env, &m.thrown, &acc)
                });
            }
        }

        for member in &decl.members {
            if matches!(member, Member::Method(_)) || member.is_static(body) {
                continue;
            }
            self.scan_member(member);
            self.error_uncaught();
        }

        // What an anonymous class's initializers throw becomes its
        // constructor's throws clause and propagates to the creation site.
        if anonymous {
            for method in decl.methods().filter(|m| body.method(*m).is_constructor()) {
                self.visit_method(method);
                self.cx
                    .annotations
                    .anonymous_ctor_thrown
                    .insert(class, self.thrown.clone());
                thrown_prev = union(self.cx.env, &self.thrown, &thrown_prev);
            }
        }

        for method in decl.methods() {
            if anonymous && body.method(method).is_constructor() {
                continue;
            }
            self.visit_method(method);
            self.error_uncaught();
        }

        self.thrown = thrown_prev;
        self.in_generated_ctor = generated_prev;
        self.caught = caught_prev;
        self.pending = pending_prev;
    }

    fn scan_member(&mut self, member: &Member) {
        match member {
            Member::Field { init, .. } => {
                if let Some(init) = init {
                    self.scan_expr(*init);
                }
            }
            Member::Initializer { body, .. } => self.scan_stmt(*body),
            Member::Class(class) => self.visit_class(*class),
            Member::Method(_) => {}
        }
    }

    fn visit_method(&mut self, method: MethodDeclId) {
        let decl = self.cx.body.method(method);
        let Some(block) = decl.body else {
            return;
        };
        let caught_prev = self.caught.clone();

        self.caught = if decl.is_initial_constructor() {
            union(self.cx.env, &self.caught, &decl.thrown)
        } else {
            decl.thrown.clone()
        };
        let generated_prev =
            std::mem::replace(&mut self.in_generated_ctor, decl.is_generated_constructor());

        self.scan_stmt(block);
        self.keep_thrown_exits();

        self.in_generated_ctor = generated_prev;
        self.caught = caught_prev;
    }

    // === Statements ===

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
        let data = body.stmt(stmt);
        match &data.kind {
            StmtKind::Block(stmts) => self.scan_stmts(stmts),
            StmtKind::LocalVar { init, .. } => {
                if let Some(init) = init {
                    self.scan_expr(*init);
                }
            }
            StmtKind::LocalClass(class) => self.visit_class(*class),
            StmtKind::Expr(expr) => self.scan_expr(*expr),
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
            StmtKind::While { condition, body: loop_body } => {
                let target = JumpTarget::Stmt(stmt);
                let prev = std::mem::take(&mut self.pending);
                self.scan_expr(*condition);
                self.scan_stmt(*loop_body);
                self.resolve_loop(target, prev);
            }
            StmtKind::DoWhile { body: loop_body, condition } => {
                let target = JumpTarget::Stmt(stmt);
                let prev = std::mem::take(&mut self.pending);
                self.scan_stmt(*loop_body);
                self.resolve_continues(target);
                self.scan_expr(*condition);
                self.resolve(JumpKind::Break, target, prev);
            }
            StmtKind::For {
                init,
                condition,
                update,
                body: loop_body,
            } => {
                let target = JumpTarget::Stmt(stmt);
                self.scan_stmts(init);
                let prev = std::mem::take(&mut self.pending);
                if let Some(condition) = condition {
                    self.scan_expr(*condition);
                }
                self.scan_stmt(*loop_body);
                self.resolve_continues(target);
                self.scan_stmts(update);
                self.resolve(JumpKind::Break, target, prev);
            }
            StmtKind::ForEach {
                iterable,
                body: loop_body,
                ..
            } => {
                let target = JumpTarget::Stmt(stmt);
                self.scan_expr(*iterable);
                let prev = std::mem::take(&mut self.pending);
                self.scan_stmt(*loop_body);
                self.resolve_loop(target, prev);
            }
            StmtKind::Labeled { body: labeled, .. } => {
                let prev = std::mem::take(&mut self.pending);
                self.scan_stmt(*labeled);
                self.resolve(JumpKind::Break, JumpTarget::Stmt(stmt), prev);
            }
            StmtKind::Switch(switch) => {
                self.visit_switch(JumpTarget::Stmt(stmt), JumpKind::Break, switch);
            }
            StmtKind::Try {
                resources,
                body: try_body,
                catches,
                finally,
            } => self.visit_try(stmt, resources, *try_body, catches, *finally),
            StmtKind::Synchronized { lock, body: block } => {
                self.scan_expr(*lock);
                self.scan_stmt(*block);
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.scan_expr(*value);
                }
                self.record_exit(ExitKind::Return, data.span);
            }
            StmtKind::Throw(expr) => self.visit_throw(*expr, data.span),
            StmtKind::Break { target, .. } => self.record_exit(
                ExitKind::Jump {
                    kind: JumpKind::Break,
                    target: JumpTarget::Stmt(*target),
                },
                data.span,
            ),
            StmtKind::Continue { target, .. } => self.record_exit(
                ExitKind::Jump {
                    kind: JumpKind::Continue,
                    target: JumpTarget::Stmt(*target),
                },
                data.span,
            ),
            StmtKind::Yield { value, target } => {
                self.scan_expr(*value);
                self.record_exit(
                    ExitKind::Jump {
                        kind: JumpKind::Yield,
                        target: JumpTarget::Expr(*target),
                    },
                    data.span,
                );
            }
            StmtKind::Assert { condition, detail } => {
                self.scan_expr(*condition);
                if let Some(detail) = detail {
                    self.scan_expr(*detail);
                }
            }
            StmtKind::Empty => {}
        }
    }

    fn resolve_continues(&mut self, target: JumpTarget) {
        self.pending.resolve(JumpKind::Continue, target, ExitQueue::new());
    }

    fn resolve_loop(&mut self, target: JumpTarget, prev: ExitQueue<Option<Uncaught>>) {
        self.resolve_continues(target);
        self.resolve(JumpKind::Break, target, prev);
    }

    fn visit_switch(&mut self, target: JumpTarget, exit: JumpKind, switch: &Switch) {
        let prev = std::mem::take(&mut self.pending);
        self.scan_expr(switch.selector);
        for case in &switch.cases {
            for label in &case.labels {
                match label {
                    CaseLabel::Default => {}
                    CaseLabel::Expr(expr) => self.scan_expr(*expr),
                    CaseLabel::Pattern { pattern, .. } => self.scan_pattern(pattern),
                }
            }
            self.scan_stmts(&case.stats);
        }
        self.resolve(exit, target, prev);
    }

    fn scan_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Binding { .. } => {}
            Pattern::Guarded { pattern, guard } => {
                self.scan_pattern(pattern);
                self.scan_expr(*guard);
            }
        }
    }

    fn visit_throw(&mut self, expr: ExprId, span: Span) {
        self.scan_expr(expr);
        let body = self.cx.body;
        let thrown = body.expr(expr);
        if let ExprKind::Ident(var) = thrown.kind {
            let decl = body.var(var);
            let effectively_final =
                decl.is_final || self.cx.annotations.effectively_final.contains(&var);
            if effectively_final {
                if let Some(precise) = self.precise_rethrow.get(&var).cloned() {
                    for ty in &precise {
                        self.mark_thrown(span, ty, ThrowSite::Plain);
                    }
                    return;
                }
            }
        }
        self.mark_thrown(span, &thrown.ty, ThrowSite::Plain);
    }

    fn visit_try(
        &mut self,
        stmt: StmtId,
        resources: &[Resource],
        try_body: StmtId,
        catches: &[CatchClause],
        finally: Option<StmtId>,
    ) {
        let env = self.cx.env;
        let body = self.cx.body;

        let caught_prev = self.caught.clone();
        let thrown_prev = std::mem::take(&mut self.thrown);
        for catch in catches {
            for caught in &catch.types {
                self.caught = incl(env, &caught.ty, &self.caught);
            }
        }
        let pending_prev = std::mem::take(&mut self.pending);

        for resource in resources {
            match resource {
                Resource::Var { init, .. } => self.scan_expr(*init),
                Resource::Expr(expr) => self.scan_expr(*expr),
            }
        }
        for resource in resources {
            let (span, ty, site) = match resource {
                Resource::Var { var, .. } => {
                    let decl = body.var(*var);
                    (decl.span, &decl.ty, ThrowSite::ImplicitClose(*var))
                }
                Resource::Expr(expr) => {
                    let data = body.expr(*expr);
                    (data.span, &data.ty, ThrowSite::Plain)
                }
            };
            for thrown in close_thrown(self.cx.env, ty) {
                self.mark_thrown(span, &thrown, site);
            }
        }
        self.scan_stmt(try_body);

        let wk = env.well_known();
        let thrown_in_try = union(
            env,
            &self.thrown,
            &[
                Type::class(wk.runtime_exception, vec![]),
                Type::class(wk.error, vec![]),
            ],
        );
        self.thrown = thrown_prev.clone();
        self.caught = caught_prev;

        let mut caught_in_try: Vec<Type> = Vec::new();
        for catch in catches {
            let rethrown = diff(env, &thrown_in_try, &caught_in_try);
            let mut ctypes = Vec::new();
            for caught in &catch.types {
                let ty = &caught.ty;
                if matches!(ty, Type::Unknown) {
                    continue;
                }
                ctypes.push(ty.clone());
                if ty.class_id() == Some(wk.object) {
                    continue;
                }
                let span = catch.span_of(caught);
                self.check_caught_type(span, ty, &thrown_in_try, &caught_in_try);
                caught_in_try = incl(env, ty, &caught_in_try);
            }
            self.precise_rethrow
                .insert(catch.param, intersect(env, &ctypes, &rethrown));
            self.scan_stmt(catch.body);
            self.precise_rethrow.remove(&catch.param);
        }

        let uncaught = diff(env, &thrown_in_try, &caught_in_try);
        match finally {
            Some(finally) => {
                let saved_thrown = std::mem::take(&mut self.thrown);
                let exits = std::mem::replace(&mut self.pending, pending_prev);
                self.scan_stmt(finally);
                if finally_completes(&mut self.cx, stmt, finally) {
                    self.thrown = union(env, &union(env, &self.thrown, &uncaught), &saved_thrown);
                    self.pending.append(exits);
                } else {
                    // An abrupt finally swallows everything the try threw.
                    self.thrown = union(env, &self.thrown, &thrown_prev);
                }
            }
            None => {
                self.thrown = union(env, &self.thrown, &uncaught);
                let exits = std::mem::replace(&mut self.pending, pending_prev);
                self.pending.append(exits);
            }
        }
    }

    fn check_caught_type(
        &mut self,
        span: Span,
        exc: &Type,
        thrown_in_try: &[Type],
        caught_in_try: &[Type],
    ) {
        let env = self.cx.env;
        let wk = env.well_known();
        let is_root =
            matches!(exc.class_id(), Some(id) if id == wk.exception || id == wk.throwable);
        let name = self.cx.type_name(exc);
        if subset(env, exc, caught_in_try) {
            self.cx.report(
                FlowDiagnosticKind::ExceptionAlreadyCaught,
                span,
                format!("exception {name} has already been caught"),
            );
        } else if is_checked(env, exc) && !is_root && !intersects(env, exc, thrown_in_try) {
            self.cx.report(
                FlowDiagnosticKind::ExceptionNeverThrown,
                span,
                format!("exception {name} is never thrown in body of corresponding try statement"),
            );
        } else if self.cx.config.lint.unreachable_catch && !is_root {
            let catchable = intersect(env, std::slice::from_ref(exc), thrown_in_try);
            if diff(env, &catchable, caught_in_try).is_empty() {
                let names = catchable
                    .iter()
                    .map(|t| self.cx.type_name(t))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.cx.report(
                    FlowDiagnosticKind::UnreachableCatch,
                    span,
                    format!("unreachable catch clause; thrown types {names} have already been caught"),
                );
            }
        }
    }

    // === Expressions ===

    fn scan_expr(&mut self, expr: ExprId) {
        if self.cx.failed() {
            return;
        }
        let body = self.cx.body;
        let data = body.expr(expr);
        match &data.kind {
            ExprKind::Lambda {
                body: lambda_body,
                descriptor_thrown,
                ..
            } => self.visit_lambda(expr, lambda_body, descriptor_thrown),
            ExprKind::SwitchExpr(switch) => {
                self.visit_switch(JumpTarget::Expr(expr), JumpKind::Yield, switch);
            }
            ExprKind::Call { thrown, .. } => {
                for operand in operands(&data.kind) {
                    self.scan_expr(operand);
                }
                for ty in thrown {
                    self.mark_thrown(data.span, ty, ThrowSite::Plain);
                }
            }
            ExprKind::New {
                args,
                ctor_thrown,
                body: class,
            } => {
                for &arg in args {
                    self.scan_expr(arg);
                }
                for ty in ctor_thrown {
                    self.mark_thrown(data.span, ty, ThrowSite::Plain);
                }
                if let Some(class) = class {
                    let caught_prev = self.caught.clone();
                    for ty in ctor_thrown {
                        self.caught = incl(self.cx.env, ty, &self.caught);
                    }
                    self.visit_class(*class);
                    self.caught = caught_prev;
                }
            }
            ExprKind::InstanceOf { expr: operand, pattern } => {
                self.scan_expr(*operand);
                if let Some(pattern) = pattern {
                    self.scan_pattern(pattern);
                }
            }
            kind @ (ExprKind::Literal(_)
            | ExprKind::Ident(_)
            | ExprKind::EnumConstant { .. }
            | ExprKind::This
            | ExprKind::Select { .. }
            | ExprKind::Assign { .. }
            | ExprKind::CompoundAssign { .. }
            | ExprKind::Unary { .. }
            | ExprKind::Binary { .. }
            | ExprKind::Conditional { .. }
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

    fn scan_lambda_body(&mut self, lambda_body: &LambdaBody) {
        match lambda_body {
            LambdaBody::Expr(expr) => self.scan_expr(*expr),
            LambdaBody::Block(block) => self.scan_stmt(*block),
        }
    }

    fn visit_lambda(&mut self, expr: ExprId, lambda_body: &LambdaBody, descriptor_thrown: &[Type]) {
        if is_stuck(self.cx.body, expr) {
            return;
        }
        let caught_prev = std::mem::take(&mut self.caught);
        let thrown_prev = std::mem::take(&mut self.thrown);
        let pending_prev = std::mem::take(&mut self.pending);
        let generated_prev = std::mem::replace(&mut self.in_generated_ctor, false);

        match self.mode {
            ExceptionMode::LambdaInference => {
                if !self.in_lambda {
                    self.in_lambda = true;
                    self.caught = vec![Type::class(self.cx.env.well_known().throwable, vec![])];
                    self.scan_lambda_body(lambda_body);
                    self.inferred = Some(self.thrown.clone());
                    self.in_lambda = false;
                }
            }
            ExceptionMode::Unit => {
                self.caught = descriptor_thrown.to_vec();
                self.scan_lambda_body(lambda_body);
                self.keep_thrown_exits();
                self.error_uncaught();
                self.cx
                    .annotations
                    .lambda_thrown
                    .insert(expr, self.thrown.clone());
            }
        }

        self.in_generated_ctor = generated_prev;
        self.pending = pending_prev;
        self.thrown = thrown_prev;
        self.caught = caught_prev;
    }
}

/// Checked exceptions thrown by the implicit `close()` of a resource of type
/// `ty`: one lookup per `AutoCloseable` component of the type.
fn close_thrown(env: &dyn nova_types::TypeEnv, ty: &Type) -> Vec<Type> {
    let auto_closeable = env.well_known().auto_closeable;
    let mut components = Vec::new();
    closeable_components(env, ty, &mut components);
    let mut thrown = Vec::new();
    for class in components {
        if !is_subclass(env, class, auto_closeable) {
            continue;
        }
        if let Some(close) = lookup_method(env, class, "close", 0) {
            thrown.extend(close.thrown.iter().cloned());
        }
    }
    thrown
}

fn closeable_components(env: &dyn nova_types::TypeEnv, ty: &Type, out: &mut Vec<ClassId>) {
    match ty {
        Type::Class(class) => out.push(class.def),
        Type::Intersection(parts) => {
            for part in parts {
                closeable_components(env, part, out);
            }
        }
        Type::TypeVar(id) => {
            for bound in upper_bounds(env, *id) {
                closeable_components(env, &bound, out);
            }
        }
        _ => {}
    }
}
