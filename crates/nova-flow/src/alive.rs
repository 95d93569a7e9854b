//! Reachability.
//!
//! Every statement must be reachable; a method with a non-void result must
//! not complete normally; initializers must complete normally. The pass also
//! records the completion facts later passes rely on: per method, lambda,
//! `finally` block and switch case.

use std::collections::HashSet;

use nova_core::Name;
use nova_hir::body::{
    CaseKind, CaseLabel, ClassDeclId, ExprId, ExprKind, LambdaBody, Member, MethodDeclId,
    Pattern, Resource, StmtId, StmtKind, Switch,
};
use nova_types::{direct_supertypes, upper_bounds, ClassId, Span, Type};

use crate::diagnostics::{FlowDiagnosticKind, Handler};
use crate::error::FlowError;
use crate::liveness::Liveness;
use crate::pending::{ExitKind, ExitQueue, JumpKind, JumpTarget};
use crate::walker::{is_stuck, operands, Ctx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AliveMode {
    /// Whole classes.
    Unit,
    /// A single lambda analyzed out of context. `return` values are not
    /// visited; classes and nested lambdas are skipped.
    Lambda,
    /// A statement snippet checked for completion; classes and lambdas are
    /// skipped.
    Snippet,
}

/// Loops and labeled statements entered so far, for detecting `break`s that
/// leave a snippet.
#[derive(Debug, Default)]
struct BreakWatch {
    seen: HashSet<StmtId>,
    breaks_out: bool,
}

/// A member of the set of switch labels known to be covered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Covered {
    Class(ClassId),
    Constant(ClassId, Name),
}

pub(crate) struct AliveAnalyzer<'a> {
    cx: Ctx<'a>,
    mode: AliveMode,
    alive: Liveness,
    pending: ExitQueue<()>,
    in_lambda: bool,
    watch: Option<BreakWatch>,
}

pub(crate) fn end_of(span: Span) -> Span {
    Span::new(span.end.saturating_sub(1), span.end)
}

/// Runs a throwaway snippet walk with its diagnostics discarded.
pub(crate) fn completes_quietly(
    cx: &mut Ctx<'_>,
    walk: impl FnOnce(&mut AliveAnalyzer<'_>) -> bool,
) -> bool {
    cx.sink.push_handler(Handler::Discard);
    let mut alive = AliveAnalyzer::new(cx.reborrow(), AliveMode::Snippet);
    let completes = walk(&mut alive);
    let outcome = alive.finish();
    cx.sink.pop_handler();
    if let Err(err) = outcome {
        cx.fail(err);
    }
    completes
}

/// Whether the `finally` block of `try_stmt` can complete normally, from the
/// reachability pass when it has run.
pub(crate) fn finally_completes(cx: &mut Ctx<'_>, try_stmt: StmtId, finally: StmtId) -> bool {
    match cx.annotations.finally_completes_normally.get(&try_stmt) {
        Some(&completes) => completes,
        None => completes_quietly(cx, |alive| alive.analyze_snippet(finally)),
    }
}

impl<'a> AliveAnalyzer<'a> {
    pub(crate) fn new(cx: Ctx<'a>, mode: AliveMode) -> Self {
        Self {
            cx,
            mode,
            alive: Liveness::Alive,
            pending: ExitQueue::new(),
            in_lambda: false,
            watch: None,
        }
    }

    /// Enables `break` probing; see [`AliveAnalyzer::breaks_out`].
    pub(crate) fn probing_breaks(mut self) -> Self {
        self.watch = Some(BreakWatch::default());
        self
    }

    pub(crate) fn analyze_class(&mut self, class: ClassDeclId) {
        self.alive = Liveness::Alive;
        self.pending = ExitQueue::new();
        self.scan_class(class);
    }

    /// Walks a lambda in isolation and returns whether its body can complete
    /// normally.
    pub(crate) fn analyze_lambda(&mut self, lambda: ExprId) -> bool {
        self.alive = Liveness::Alive;
        self.pending = ExitQueue::new();
        self.scan_expr(lambda);
        self.cx
            .annotations
            .lambda_completes_normally
            .get(&lambda)
            .copied()
            .unwrap_or(true)
    }

    /// Walks a snippet and returns whether control can reach its end.
    pub(crate) fn analyze_snippet(&mut self, stmt: StmtId) -> bool {
        self.alive = Liveness::Alive;
        self.pending = ExitQueue::new();
        self.scan_stmt(stmt);
        self.alive != Liveness::Dead
    }

    /// Completion of a case's statements, without reachability checks
    /// between them.
    pub(crate) fn analyze_case_stats(&mut self, stats: &[StmtId]) -> bool {
        self.alive = Liveness::Alive;
        self.pending = ExitQueue::new();
        for &stmt in stats {
            self.scan_stmt(stmt);
        }
        self.alive != Liveness::Dead
    }

    pub(crate) fn breaks_out(&self) -> bool {
        self.watch.as_ref().is_some_and(|watch| watch.breaks_out)
    }

    pub(crate) fn finish(self) -> Result<(), FlowError> {
        self.cx.finish()
    }

    fn mark_dead(&mut self) {
        self.alive = Liveness::Dead;
    }

    fn record_exit(&mut self, kind: ExitKind, span: Span) {
        self.pending.push(kind, span, ());
        self.mark_dead();
    }

    fn clear_pending_exits(&mut self, in_method: bool) {
        for exit in self.pending.drain().collect::<Vec<_>>() {
            let accepted = (in_method && exit.kind == ExitKind::Return)
                || self.cx.sink.has_error_at(exit.span);
            if !accepted {
                self.cx.fail(FlowError::UnresolvedExit {
                    kind: exit.kind.describe(),
                    span: exit.span,
                });
            }
        }
    }

    /// Reports a statement reached while dead and recovers.
    fn check_reachable(&mut self, span: Span, is_skip: bool) {
        if self.alive == Liveness::Dead {
            if self.cx.config.report_unreachable {
                self.cx.report(
                    FlowDiagnosticKind::UnreachableCode,
                    span,
                    "unreachable statement".to_string(),
                );
            }
            if !is_skip {
                self.alive = Liveness::Recovery;
            }
        }
    }

    // === Declarations ===

    fn scan_class(&mut self, class: ClassDeclId) {
        if self.mode != AliveMode::Unit || self.cx.failed() {
            return;
        }
        let body = self.cx.body;
        let decl = body.class(class);
        let alive_prev = self.alive;
        let pending_prev = std::mem::take(&mut self.pending);

        for is_static in [true, false] {
            for member in &decl.members {
                if matches!(member, Member::Method(_)) || member.is_static(body) != is_static {
                    continue;
                }
                self.scan_def(member);
                self.clear_pending_exits(false);
            }
        }
        for method in decl.methods() {
            self.scan_method(method);
        }

        self.pending = pending_prev;
        self.alive = alive_prev;
    }

    fn scan_def(&mut self, member: &Member) {
        let body = self.cx.body;
        match member {
            Member::Field { var, init } => {
                self.check_reachable(body.var(*var).span, false);
                if let Some(init) = init {
                    self.scan_expr(*init);
                }
            }
            Member::Initializer { body: block, .. } => {
                self.scan_stat(*block);
                let completes = self.alive != Liveness::Dead;
                self.cx
                    .annotations
                    .initializer_completes_normally
                    .insert(*block, completes);
                if !completes {
                    self.cx.report(
                        FlowDiagnosticKind::InitializerCannotComplete,
                        body.stmt(*block).span,
                        "initializer must be able to complete normally".to_string(),
                    );
                }
            }
            Member::Class(class) => {
                self.check_reachable(body.class(*class).span, false);
                self.scan_class(*class);
            }
            Member::Method(_) => {}
        }
    }

    fn scan_method(&mut self, method: MethodDeclId) {
        let body = self.cx.body;
        let decl = body.method(method);
        let Some(block) = decl.body else {
            return;
        };
        debug_assert!(self.pending.is_empty());

        self.alive = Liveness::Alive;
        self.scan_stat(block);
        let completes = self.alive != Liveness::Dead;
        self.cx
            .annotations
            .method_completes_normally
            .insert(method, completes);

        if self.alive == Liveness::Alive && !decl.return_type.is_void() && !decl.is_constructor() {
            self.cx.report(
                FlowDiagnosticKind::MissingReturn,
                end_of(body.stmt(block).span),
                "missing return statement".to_string(),
            );
        }
        self.clear_pending_exits(true);
    }

    // === Statements ===

    fn scan_stat(&mut self, stmt: StmtId) {
        let data = self.cx.body.stmt(stmt);
        self.check_reachable(data.span, matches!(data.kind, StmtKind::Empty));
        self.scan_stmt(stmt);
    }

    fn scan_stats(&mut self, stmts: &[StmtId]) {
        for &stmt in stmts {
            self.scan_stat(stmt);
        }
    }

    fn see(&mut self, stmt: StmtId) {
        if let Some(watch) = &mut self.watch {
            watch.seen.insert(stmt);
        }
    }

    fn scan_stmt(&mut self, stmt: StmtId) {
        if self.cx.failed() {
            return;
        }
        let body = self.cx.body;
        let data = body.stmt(stmt);
        match &data.kind {
            StmtKind::Block(stmts) => self.scan_stats(stmts),
            StmtKind::LocalVar { init, .. } => {
                if let Some(init) = init {
                    self.scan_expr(*init);
                }
            }
            StmtKind::LocalClass(class) => self.scan_class(*class),
            StmtKind::Expr(expr) => self.scan_expr(*expr),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.scan_expr(*condition);
                self.scan_stat(*then_branch);
                match else_branch {
                    Some(else_branch) => {
                        let alive_after_then = self.alive;
                        self.alive = Liveness::Alive;
                        self.scan_stat(*else_branch);
                        self.alive = self.alive.or(alive_after_then);
                    }
                    None => self.alive = Liveness::Alive,
                }
            }
            StmtKind::DoWhile {
                body: loop_body,
                condition,
            } => {
                self.see(stmt);
                let prev = std::mem::take(&mut self.pending);
                self.scan_stat(*loop_body);
                self.alive = self.alive.or(self.resolve_continues(stmt));
                self.scan_expr(*condition);
                self.alive = self
                    .alive
                    .and(Liveness::from(!body.expr(*condition).is_true()));
                let breaks = self
                    .pending
                    .resolve_liveness(JumpKind::Break, JumpTarget::Stmt(stmt), prev);
                self.alive = self.alive.or(breaks);
            }
            StmtKind::While {
                condition,
                body: loop_body,
            } => {
                self.see(stmt);
                let prev = std::mem::take(&mut self.pending);
                self.scan_expr(*condition);
                let cond = body.expr(*condition);
                self.alive = Liveness::from(!cond.is_false());
                self.scan_stat(*loop_body);
                self.alive = self.alive.or(self.resolve_continues(stmt));
                let breaks = self
                    .pending
                    .resolve_liveness(JumpKind::Break, JumpTarget::Stmt(stmt), prev);
                self.alive = breaks.or(Liveness::from(!cond.is_true()));
            }
            StmtKind::For {
                init,
                condition,
                update,
                body: loop_body,
            } => {
                self.see(stmt);
                self.scan_stats(init);
                let prev = std::mem::take(&mut self.pending);
                match condition {
                    Some(condition) => {
                        self.scan_expr(*condition);
                        self.alive = Liveness::from(!body.expr(*condition).is_false());
                    }
                    None => self.alive = Liveness::Alive,
                }
                self.scan_stat(*loop_body);
                self.alive = self.alive.or(self.resolve_continues(stmt));
                for &step in update {
                    self.scan_stmt(step);
                }
                let breaks = self
                    .pending
                    .resolve_liveness(JumpKind::Break, JumpTarget::Stmt(stmt), prev);
                let exits_normally = condition.is_some_and(|c| !body.expr(c).is_true());
                self.alive = breaks.or(Liveness::from(exits_normally));
            }
            StmtKind::ForEach {
                iterable,
                body: loop_body,
                ..
            } => {
                self.see(stmt);
                self.scan_expr(*iterable);
                let prev = std::mem::take(&mut self.pending);
                self.scan_stat(*loop_body);
                self.alive = self.alive.or(self.resolve_continues(stmt));
                self.pending
                    .resolve(JumpKind::Break, JumpTarget::Stmt(stmt), prev);
                self.alive = Liveness::Alive;
            }
            StmtKind::Labeled { body: inner, .. } => {
                self.see(stmt);
                let prev = std::mem::take(&mut self.pending);
                self.scan_stat(*inner);
                let breaks = self
                    .pending
                    .resolve_liveness(JumpKind::Break, JumpTarget::Stmt(stmt), prev);
                self.alive = self.alive.or(breaks);
            }
            StmtKind::Switch(switch) => self.visit_switch(stmt, switch),
            StmtKind::Try {
                resources,
                body: try_body,
                catches,
                finally,
            } => {
                let prev = std::mem::take(&mut self.pending);
                for resource in resources {
                    match resource {
                        Resource::Var { init, .. } => self.scan_expr(*init),
                        Resource::Expr(expr) => self.scan_expr(*expr),
                    }
                }
                self.scan_stat(*try_body);
                let mut alive_end = self.alive;
                for catch in catches {
                    self.alive = Liveness::Alive;
                    self.scan_stat(catch.body);
                    alive_end = alive_end.or(self.alive);
                }
                match finally {
                    Some(finally) => {
                        let exits = std::mem::replace(&mut self.pending, prev);
                        self.alive = Liveness::Alive;
                        self.scan_stat(*finally);
                        let completes = self.alive != Liveness::Dead;
                        self.cx
                            .annotations
                            .finally_completes_normally
                            .insert(stmt, completes);
                        if completes {
                            self.pending.append(exits);
                            self.alive = alive_end;
                        } else if self.cx.config.lint.finally {
                            self.cx.report(
                                FlowDiagnosticKind::FinallyCannotComplete,
                                end_of(body.stmt(*finally).span),
                                "finally clause cannot complete normally".to_string(),
                            );
                        }
                    }
                    None => {
                        self.alive = alive_end;
                        let exits = std::mem::replace(&mut self.pending, prev);
                        self.pending.append(exits);
                    }
                }
            }
            StmtKind::Synchronized { lock, body: inner } => {
                self.scan_expr(*lock);
                self.scan_stat(*inner);
            }
            StmtKind::Return(value) => {
                if self.mode != AliveMode::Lambda {
                    if let Some(value) = value {
                        self.scan_expr(*value);
                    }
                }
                self.record_exit(ExitKind::Return, data.span);
            }
            StmtKind::Throw(expr) => {
                self.scan_expr(*expr);
                self.mark_dead();
            }
            StmtKind::Break { target, .. } => {
                self.check_jump_target(JumpKind::Break, JumpTarget::Stmt(*target), data.span);
                if let Some(watch) = &mut self.watch {
                    watch.breaks_out |=
                        self.alive == Liveness::Alive && !watch.seen.contains(target);
                }
                self.record_exit(
                    ExitKind::Jump {
                        kind: JumpKind::Break,
                        target: JumpTarget::Stmt(*target),
                    },
                    data.span,
                );
            }
            StmtKind::Continue { target, .. } => {
                self.check_jump_target(JumpKind::Continue, JumpTarget::Stmt(*target), data.span);
                self.record_exit(
                    ExitKind::Jump {
                        kind: JumpKind::Continue,
                        target: JumpTarget::Stmt(*target),
                    },
                    data.span,
                );
            }
            StmtKind::Yield { value, target } => {
                self.check_jump_target(JumpKind::Yield, JumpTarget::Expr(*target), data.span);
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

    fn resolve_continues(&mut self, stmt: StmtId) -> Liveness {
        self.pending
            .resolve_liveness(JumpKind::Continue, JumpTarget::Stmt(stmt), ExitQueue::new())
    }

    fn check_jump_target(&mut self, kind: JumpKind, target: JumpTarget, span: Span) {
        let body = self.cx.body;
        let valid = match (kind, target) {
            (JumpKind::Break, JumpTarget::Stmt(target)) => matches!(
                body.stmt(target).kind,
                StmtKind::While { .. }
                    | StmtKind::DoWhile { .. }
                    | StmtKind::For { .. }
                    | StmtKind::ForEach { .. }
                    | StmtKind::Labeled { .. }
                    | StmtKind::Switch(_)
            ),
            (JumpKind::Continue, JumpTarget::Stmt(target)) => matches!(
                body.stmt(target).kind,
                StmtKind::While { .. }
                    | StmtKind::DoWhile { .. }
                    | StmtKind::For { .. }
                    | StmtKind::ForEach { .. }
            ),
            (JumpKind::Yield, JumpTarget::Expr(target)) => {
                matches!(body.expr(target).kind, ExprKind::SwitchExpr(_))
            }
            _ => false,
        };
        if !valid {
            self.cx.fail(FlowError::ForeignJumpTarget { span });
        }
    }

    // === Switches ===

    fn scan_label(&mut self, label: &CaseLabel, covered: &mut HashSet<Covered>) {
        match label {
            CaseLabel::Default => {}
            CaseLabel::Expr(expr) => {
                self.scan_expr(*expr);
                if let ExprKind::EnumConstant { class, name } = &self.cx.body.expr(*expr).kind {
                    covered.insert(Covered::Constant(*class, name.clone()));
                }
            }
            CaseLabel::Pattern { pattern, .. } => {
                self.scan_pattern(pattern);
                let unguarded = match pattern {
                    Pattern::Binding { .. } => true,
                    Pattern::Guarded { guard, .. } => self.cx.body.expr(*guard).is_true(),
                };
                if unguarded {
                    let ty = &self.cx.body.var(pattern.binding()).ty;
                    if let Some(class) = ty.class_id() {
                        covered.insert(Covered::Class(class));
                    }
                }
            }
        }
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

    fn record_case_completion(&mut self, switch: JumpTarget, index: usize) {
        let completes = self.alive != Liveness::Dead;
        self.cx
            .annotations
            .case_completes_normally
            .insert((switch, index), completes);
    }

    fn visit_switch(&mut self, stmt: StmtId, switch: &Switch) {
        let body = self.cx.body;
        let span = body.stmt(stmt).span;
        let target = JumpTarget::Stmt(stmt);
        let prev = std::mem::take(&mut self.pending);
        self.scan_expr(switch.selector);

        let exhaustive_required =
            switch.pattern_switch || switch.cases.iter().any(|c| c.has_null_label(body));
        let mut covered = HashSet::new();
        for (idx, case) in switch.cases.iter().enumerate() {
            self.alive = Liveness::Alive;
            for label in &case.labels {
                self.scan_label(label, &mut covered);
            }
            self.scan_stats(&case.stats);
            self.record_case_completion(target, idx);
            if self.alive != Liveness::Dead && case.kind == CaseKind::Rule {
                self.record_exit(
                    ExitKind::Jump {
                        kind: JumpKind::Break,
                        target,
                    },
                    span,
                );
            }
            if self.alive == Liveness::Alive
                && self.cx.config.lint.fallthrough
                && case.kind == CaseKind::Statement
                && !case.stats.is_empty()
            {
                if let Some(next) = switch.cases.get(idx + 1) {
                    self.cx.report(
                        FlowDiagnosticKind::PossibleFallThrough,
                        next.span,
                        "possible fall-through into case".to_string(),
                    );
                }
            }
        }

        let selector_ty = &body.expr(switch.selector).ty;
        if !switch.has_total_pattern
            && exhaustive_required
            && !selector_ty.is_erroneous()
            && !self.is_exhaustive(selector_ty, &mut covered)
        {
            self.cx.report(
                FlowDiagnosticKind::SwitchStatementNotExhaustive,
                span,
                "the switch statement does not cover all possible input values".to_string(),
            );
        }
        if !switch.has_total_pattern {
            self.alive = Liveness::Alive;
        }
        let breaks = self.pending.resolve_liveness(JumpKind::Break, target, prev);
        self.alive = self.alive.or(breaks);
    }

    fn visit_switch_expr(&mut self, expr: ExprId, switch: &Switch) {
        let body = self.cx.body;
        let span = body.expr(expr).span;
        let target = JumpTarget::Expr(expr);
        let prev = std::mem::take(&mut self.pending);
        self.scan_expr(switch.selector);

        let mut covered = HashSet::new();
        let prev_alive = self.alive;
        for (idx, case) in switch.cases.iter().enumerate() {
            self.alive = Liveness::Alive;
            for label in &case.labels {
                self.scan_label(label, &mut covered);
            }
            self.scan_stats(&case.stats);
            self.record_case_completion(target, idx);
            if self.alive == Liveness::Alive {
                if case.kind == CaseKind::Rule {
                    let end = case
                        .stats
                        .last()
                        .map_or(case.span, |last| body.stmt(*last).span);
                    self.cx.report(
                        FlowDiagnosticKind::RuleCompletesNormally,
                        end_of(end),
                        "switch rule completes without providing a value".to_string(),
                    );
                } else if idx + 1 == switch.cases.len() {
                    self.cx.report(
                        FlowDiagnosticKind::SwitchExpressionCompletesNormally,
                        end_of(span),
                        "switch expression completes without providing a value".to_string(),
                    );
                }
            }
        }

        let selector_ty = &body.expr(switch.selector).ty;
        if !switch.has_total_pattern
            && !selector_ty.is_erroneous()
            && !self.is_exhaustive(selector_ty, &mut covered)
        {
            self.cx.report(
                FlowDiagnosticKind::SwitchExpressionNotExhaustive,
                span,
                "the switch expression does not cover all possible input values".to_string(),
            );
        }
        let yields = self.pending.resolve_liveness(JumpKind::Yield, target, prev);
        self.alive = prev_alive.or(yields);
    }

    /// Closes `covered` under "all constants of an enum" and "all permitted
    /// subclasses of a sealed abstract type".
    fn transitive_covers(&self, covered: &mut HashSet<Covered>) {
        let env = self.cx.env;
        let mut todo: Vec<Covered> = covered.iter().cloned().collect();
        while let Some(next) = todo.pop() {
            match next {
                Covered::Constant(class, _) => {
                    let Some(def) = env.class(class) else {
                        continue;
                    };
                    let has_all = def.enum_constants.iter().all(|constant| {
                        covered.contains(&Covered::Constant(class, Name::from(constant.as_str())))
                    });
                    if has_all && covered.insert(Covered::Class(class)) {
                        todo.push(Covered::Class(class));
                    }
                }
                Covered::Class(class) => {
                    for sup in direct_supertypes(env, class) {
                        let Some(def) = env.class(sup) else {
                            continue;
                        };
                        if !(def.is_abstract || def.is_interface()) || !def.is_sealed {
                            continue;
                        }
                        let has_all = def
                            .permitted_subclasses
                            .iter()
                            .all(|sub| covered.contains(&Covered::Class(*sub)));
                        if has_all && covered.insert(Covered::Class(sup)) {
                            todo.push(Covered::Class(sup));
                        }
                    }
                }
            }
        }
    }

    fn is_exhaustive(&self, selector: &Type, covered: &mut HashSet<Covered>) -> bool {
        self.transitive_covers(covered);
        self.is_covered(selector, covered)
    }

    fn is_covered(&self, ty: &Type, covered: &HashSet<Covered>) -> bool {
        match ty {
            Type::Class(class) => covered.contains(&Covered::Class(class.def)),
            Type::Intersection(parts) => parts.iter().any(|part| self.is_covered(part, covered)),
            Type::TypeVar(id) => upper_bounds(self.cx.env, *id)
                .iter()
                .any(|bound| self.is_covered(bound, covered)),
            _ => false,
        }
    }

    // === Expressions ===

    fn scan_expr(&mut self, expr: ExprId) {
        if self.cx.failed() {
            return;
        }
        let body = self.cx.body;
        match &body.expr(expr).kind {
            ExprKind::Lambda { body: lambda_body, .. } => self.visit_lambda(expr, lambda_body),
            ExprKind::SwitchExpr(switch) => self.visit_switch_expr(expr, switch),
            ExprKind::New { args, body: class, .. } => {
                for &arg in args {
                    self.scan_expr(arg);
                }
                if let Some(class) = class {
                    self.scan_class(*class);
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

    fn visit_lambda(&mut self, expr: ExprId, lambda_body: &LambdaBody) {
        if is_stuck(self.cx.body, expr) {
            return;
        }
        match self.mode {
            AliveMode::Snippet => return,
            AliveMode::Lambda if self.in_lambda || matches!(lambda_body, LambdaBody::Expr(_)) => {
                return
            }
            AliveMode::Lambda | AliveMode::Unit => {}
        }

        let prev_pending = std::mem::take(&mut self.pending);
        let prev_alive = self.alive;
        let prev_in_lambda = std::mem::replace(&mut self.in_lambda, true);
        self.alive = Liveness::Alive;
        match lambda_body {
            LambdaBody::Expr(body) => self.scan_expr(*body),
            LambdaBody::Block(block) => self.scan_stat(*block),
        }
        let completes = self.alive != Liveness::Dead;
        self.cx
            .annotations
            .lambda_completes_normally
            .insert(expr, completes);

        self.in_lambda = prev_in_lambda;
        self.pending = prev_pending;
        self.alive = prev_alive;
    }
}
