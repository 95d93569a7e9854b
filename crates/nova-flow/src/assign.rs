//! Definite assignment and definite unassignment.
//!
//! Every tracked variable owns one address in two bit sets: `inits` holds
//! the definitely assigned addresses and `uninits` the definitely unassigned
//! ones. While a boolean expression is being walked the state may be split
//! into a when-true and a when-false half; such expressions hand back an
//! [`Outcome::Cond`] and the caller decides whether to merge it.
//!
//! The pass also decides which locals are effectively final.

use std::collections::HashSet;

use nova_hir::body::{
    BinaryOp, CaseKind, CaseLabel, ClassDeclId, ExprId, ExprKind, LambdaBody, Member,
    MethodDeclId, Pattern, Resource, StmtId, StmtKind, Switch, UnaryOp, VarId,
};
use nova_types::Span;

use crate::alive::{completes_quietly, end_of, finally_completes};
use crate::bits::Bits;
use crate::diagnostics::{FlowDiagnosticKind, Handler, SpeculativeDiagnostics};
use crate::error::FlowError;
use crate::pending::{ExitKind, ExitQueue, JumpKind, JumpTarget};
use crate::slots::SlotArena;
use crate::walker::{is_stuck, Ctx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignMode {
    /// Whole classes.
    Unit,
    /// One lambda out of context: only variables declared inside it are
    /// tracked, classes and nested lambdas are skipped.
    Lambda,
}

/// Whether the current loop body is being re-walked with the assumption that
/// the back edge was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowKind {
    Normal,
    Speculative,
}

impl FlowKind {
    fn reassigned(self) -> FlowDiagnosticKind {
        match self {
            FlowKind::Normal => FlowDiagnosticKind::FinalReassigned,
            FlowKind::Speculative => FlowDiagnosticKind::FinalAssignedInLoop,
        }
    }
}

/// Assignment state after a boolean expression, split on its value.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CondBits {
    inits_when_true: Bits,
    inits_when_false: Bits,
    uninits_when_true: Bits,
    uninits_when_false: Bits,
}

impl CondBits {
    fn split(inits: &Bits, uninits: &Bits) -> Self {
        Self {
            inits_when_true: inits.clone(),
            inits_when_false: inits.clone(),
            uninits_when_true: uninits.clone(),
            uninits_when_false: uninits.clone(),
        }
    }

    fn merge(&self) -> (Bits, Bits) {
        (
            self.inits_when_false.and(&self.inits_when_true),
            self.uninits_when_false.and(&self.uninits_when_true),
        )
    }

    fn and_with(&mut self, other: &CondBits) {
        self.inits_when_true.and_set(&other.inits_when_true);
        self.inits_when_false.and_set(&other.inits_when_false);
        self.uninits_when_true.and_set(&other.uninits_when_true);
        self.uninits_when_false.and_set(&other.uninits_when_false);
    }

    fn negate(self) -> Self {
        Self {
            inits_when_true: self.inits_when_false,
            inits_when_false: self.inits_when_true,
            uninits_when_true: self.uninits_when_false,
            uninits_when_false: self.uninits_when_true,
        }
    }
}

#[derive(Debug)]
enum Outcome {
    /// `inits`/`uninits` hold the state after the expression.
    Plain,
    /// The state is split; `inits`/`uninits` are stale.
    Cond(CondBits),
}

/// State carried by a pending exit.
#[derive(Debug, Clone)]
enum Snapshot {
    Plain { inits: Bits, uninits: Bits },
    /// A `yield` of a boolean switch expression.
    Cond(CondBits),
}

pub(crate) struct AssignAnalyzer<'a> {
    cx: Ctx<'a>,
    mode: AssignMode,
    inits: Bits,
    uninits: Bits,
    /// Addresses unassigned everywhere in the innermost enclosing `try` body.
    uninits_try: Bits,
    slots: SlotArena,
    /// Lowest address tracked in the current class or method.
    firstadr: usize,
    /// Lowest address a `return` marks assigned.
    returnadr: usize,
    classes: Vec<ClassDeclId>,
    is_initial_constructor: bool,
    flow_kind: FlowKind,
    pending: ExitQueue<Snapshot>,
    /// Resource variables not yet referenced in their `try` body.
    unrefd_resources: Vec<VarId>,
    /// Lambda mode: variables declared inside the analyzed lambda.
    enclosed: HashSet<VarId>,
    in_lambda: bool,
}

impl<'a> AssignAnalyzer<'a> {
    pub(crate) fn new(cx: Ctx<'a>, mode: AssignMode) -> Self {
        Self {
            cx,
            mode,
            inits: Bits::new(),
            uninits: Bits::new(),
            uninits_try: Bits::new(),
            slots: SlotArena::new(),
            firstadr: 0,
            returnadr: 0,
            classes: Vec::new(),
            is_initial_constructor: false,
            flow_kind: FlowKind::Normal,
            pending: ExitQueue::new(),
            unrefd_resources: Vec::new(),
            enclosed: HashSet::new(),
            in_lambda: false,
        }
    }

    fn reset(&mut self) {
        self.inits = Bits::new();
        self.uninits = Bits::new();
        self.uninits_try = Bits::new();
        self.slots = SlotArena::new();
        self.firstadr = 0;
        self.returnadr = 0;
        self.pending = ExitQueue::new();
        self.classes.clear();
        self.unrefd_resources.clear();
    }

    pub(crate) fn analyze_class(&mut self, class: ClassDeclId) {
        self.reset();
        self.visit_class(class);
    }

    pub(crate) fn analyze_lambda(&mut self, lambda: ExprId) {
        self.reset();
        self.scan_expr(lambda);
    }

    pub(crate) fn finish(self) -> Result<(), FlowError> {
        self.cx.finish()
    }

    // === Variables ===

    fn is_final_uninitialized_field(&self, var: VarId) -> bool {
        let decl = self.cx.body.var(var);
        decl.is_field()
            && decl.is_final
            && !decl.has_initializer
            && decl.owner.is_some_and(|owner| self.classes.contains(&owner))
    }

    fn trackable(&self, var: VarId) -> bool {
        let decl = self.cx.body.var(var);
        match self.mode {
            AssignMode::Unit => decl.is_local() || self.is_final_uninitialized_field(var),
            AssignMode::Lambda => decl.is_local() && self.enclosed.contains(&var),
        }
    }

    fn new_var(&mut self, var: VarId) {
        if !self.cx.body.var(var).is_final {
            self.cx.annotations.effectively_final.insert(var);
        }
        let adr = self.slots.alloc(var);
        self.inits.excl(adr);
        self.uninits.incl(adr);
    }

    fn init_param(&mut self, var: VarId) {
        if let Some(adr) = self.slots.address_of(var) {
            self.inits.incl(adr);
            self.uninits.excl(adr);
        }
    }

    fn uninit(&mut self, adr: usize) {
        if !self.inits.is_member(adr) {
            self.uninits_try.excl(adr);
        }
        self.uninits.excl(adr);
    }

    fn let_init(&mut self, span: Span, var: VarId) {
        let decl = self.cx.body.var(var);
        let tracked = self
            .slots
            .address_of(var)
            .filter(|&adr| adr >= self.firstadr && self.trackable(var));
        let Some(adr) = tracked else {
            if decl.is_final {
                self.report_reassigned(FlowDiagnosticKind::FinalReassigned, span, var);
            }
            return;
        };

        if self.cx.annotations.effectively_final.contains(&var) {
            if self.uninits.is_member(adr) {
                self.uninit(adr);
            } else {
                self.cx.annotations.effectively_final.remove(&var);
            }
        } else if decl.is_final {
            if decl.is_multi_catch() {
                let message = format!("multi-catch parameter {} may not be assigned", decl.name);
                self.cx
                    .report(FlowDiagnosticKind::MultiCatchParameterAssigned, span, message);
            } else if decl.is_parameter() {
                let message = format!("final parameter {} may not be assigned", decl.name);
                self.cx
                    .report(FlowDiagnosticKind::FinalParameterAssigned, span, message);
            } else if !self.uninits.is_member(adr) {
                self.report_reassigned(self.flow_kind.reassigned(), span, var);
            } else {
                self.uninit(adr);
            }
        }
        self.inits.incl(adr);
    }

    fn report_reassigned(&mut self, kind: FlowDiagnosticKind, span: Span, var: VarId) {
        let name = self.cx.var_name(var);
        let message = match kind {
            FlowDiagnosticKind::FinalAssignedInLoop => {
                format!("variable {name} might be assigned in loop")
            }
            _ => format!("variable {name} might already have been assigned"),
        };
        self.cx.report(kind, span, message);
    }

    fn let_init_expr(&mut self, target: ExprId) {
        if let Some(var) = self.cx.body.assigned_var(target) {
            self.let_init(self.cx.body.expr(target).span, var);
        }
    }

    fn check_init(&mut self, span: Span, var: VarId) {
        self.check_init_as(span, var, FlowDiagnosticKind::UseBeforeAssignment);
    }

    fn check_init_as(&mut self, span: Span, var: VarId, kind: FlowDiagnosticKind) {
        let Some(adr) = self.slots.address_of(var) else {
            return;
        };
        let decl = self.cx.body.var(var);
        if (adr >= self.firstadr || decl.is_local())
            && self.trackable(var)
            && !self.inits.is_member(adr)
        {
            let message = match kind {
                FlowDiagnosticKind::UnassignedInDefaultConstructor => {
                    format!("variable {} not initialized in the default constructor", decl.name)
                }
                _ => format!("variable {} might not have been initialized", decl.name),
            };
            self.cx.report(kind, span, message);
            self.inits.incl(adr);
        }
    }

    fn referenced(&mut self, var: VarId) {
        self.unrefd_resources.retain(|&v| v != var);
    }

    // === Exits ===

    fn mark_dead(&mut self) {
        let next = self.slots.next();
        if self.is_initial_constructor {
            for adr in self.returnadr..next {
                let keep_unassigned = self.slots.var_at(adr).is_some_and(|var| {
                    self.is_final_uninitialized_field(var) && self.cx.body.var(var).is_static
                });
                if !keep_unassigned {
                    self.inits.incl(adr);
                }
            }
        } else {
            self.inits.incl_range(self.returnadr, next);
        }
        self.uninits.incl_range(self.returnadr, next);
    }

    fn plain_snapshot(&self) -> Snapshot {
        Snapshot::Plain {
            inits: self.inits.clone(),
            uninits: self.uninits.clone(),
        }
    }

    fn record_exit(&mut self, kind: ExitKind, span: Span, state: Snapshot) {
        self.pending.push(kind, span, state);
        self.mark_dead();
    }

    fn join_exit(&mut self, state: Snapshot) {
        let (inits, uninits) = match state {
            Snapshot::Plain { inits, uninits } => (inits, uninits),
            Snapshot::Cond(cond) => cond.merge(),
        };
        self.inits.and_set(&inits);
        self.uninits.and_set(&uninits);
    }

    fn resolve_into_state(
        &mut self,
        kind: JumpKind,
        target: JumpTarget,
        outer: ExitQueue<Snapshot>,
    ) {
        for state in self.pending.resolve(kind, target, outer) {
            self.join_exit(state);
        }
    }

    fn resolve_continues(&mut self, stmt: StmtId) {
        self.resolve_into_state(JumpKind::Continue, JumpTarget::Stmt(stmt), ExitQueue::new());
    }

    fn resolve_breaks(&mut self, stmt: StmtId, outer: ExitQueue<Snapshot>) {
        self.resolve_into_state(JumpKind::Break, JumpTarget::Stmt(stmt), outer);
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
            if in_method && self.is_initial_constructor {
                if let Snapshot::Plain { inits, .. } = exit.state {
                    self.inits = inits;
                }
                for adr in self.firstadr..self.slots.next() {
                    if let Some(var) = self.slots.var_at(adr) {
                        self.check_init(exit.span, var);
                    }
                }
            }
        }
    }

    // === Completion checks ===

    fn method_completes(&mut self, method: MethodDeclId, block: StmtId) -> bool {
        match self.cx.annotations.method_completes_normally.get(&method) {
            Some(&completes) => completes,
            None => completes_quietly(&mut self.cx, |alive| alive.analyze_snippet(block)),
        }
    }

    fn case_completes(&mut self, switch: JumpTarget, index: usize, stats: &[StmtId]) -> bool {
        match self.cx.annotations.case_completes_normally.get(&(switch, index)) {
            Some(&completes) => completes,
            None => completes_quietly(&mut self.cx, |alive| alive.analyze_case_stats(stats)),
        }
    }

    // === Loops ===

    fn loop_done(&self, prev_errors: usize, uninits_entry: &Bits, uninits_exit: &Bits) -> bool {
        if self.cx.sink.error_count() != prev_errors || self.flow_kind == FlowKind::Speculative {
            return true;
        }
        let mut changed = uninits_entry.clone();
        changed.diff_set(uninits_exit);
        changed.next_bit(self.firstadr).is_none()
    }

    fn enter_speculative(&mut self, discarding: &mut bool) {
        tracing::trace!(target = "nova.flow", "re-walking loop body with stabilized entry state");
        self.flow_kind = FlowKind::Speculative;
        if self.cx.config.speculative_loop_diagnostics == SpeculativeDiagnostics::Discard
            && !*discarding
        {
            self.cx.sink.push_handler(Handler::Discard);
            *discarding = true;
        }
    }

    fn leave_loop(&mut self, prev_kind: FlowKind, discarding: bool) {
        self.flow_kind = prev_kind;
        if discarding {
            self.cx.sink.pop_handler();
        }
    }

    fn uninits_entry(&self) -> Bits {
        let mut entry = self.uninits.clone();
        entry.exclude_from(self.slots.next());
        entry
    }

    // === Declarations ===

    fn visit_class(&mut self, class: ClassDeclId) {
        if self.mode == AssignMode::Lambda || self.cx.failed() {
            return;
        }
        let body = self.cx.body;
        let decl = body.class(class);
        let firstadr_prev = self.firstadr;
        let mark = self.slots.next();
        let pending_prev = std::mem::take(&mut self.pending);
        if !decl.is_anonymous() {
            self.firstadr = self.slots.next();
        }
        self.classes.push(class);

        for is_static in [true, false] {
            for member in &decl.members {
                if let Member::Field { var, .. } = member {
                    if body.var(*var).is_static == is_static && self.trackable(*var) {
                        self.new_var(*var);
                    }
                }
            }
            for member in &decl.members {
                if matches!(member, Member::Method(_)) || member.is_static(body) != is_static {
                    continue;
                }
                match member {
                    Member::Field { var, init } => {
                        self.visit_var_def(*var, *init, body.var(*var).span)
                    }
                    Member::Initializer { body: block, .. } => self.scan_stmt(*block),
                    Member::Class(nested) => self.visit_class(*nested),
                    Member::Method(_) => {}
                }
                self.clear_pending_exits(false);
            }
        }
        for method in decl.methods() {
            self.visit_method(method);
        }

        self.classes.pop();
        self.pending = pending_prev;
        self.slots.truncate(mark);
        self.firstadr = firstadr_prev;
    }

    fn visit_method(&mut self, method: MethodDeclId) {
        let body = self.cx.body;
        let decl = body.method(method);
        let Some(block) = decl.body else {
            return;
        };
        let inits_prev = self.inits.clone();
        let uninits_prev = self.uninits.clone();
        let mark = self.slots.next();
        let firstadr_prev = self.firstadr;
        let returnadr_prev = self.returnadr;
        let initial_prev = self.is_initial_constructor;
        debug_assert!(self.pending.is_empty());

        self.is_initial_constructor = decl.is_initial_constructor();
        if !self.is_initial_constructor {
            self.firstadr = self.slots.next();
        }
        for &param in &decl.params {
            self.visit_var_def(param, None, body.var(param).span);
            self.init_param(param);
        }
        self.scan_stmt(block);

        if self.is_initial_constructor {
            self.check_fields_after_constructor(method, block);
        }
        self.clear_pending_exits(true);

        self.inits = inits_prev;
        self.uninits = uninits_prev;
        self.slots.truncate(mark);
        self.firstadr = firstadr_prev;
        self.returnadr = returnadr_prev;
        self.is_initial_constructor = initial_prev;
    }

    fn check_fields_after_constructor(&mut self, method: MethodDeclId, block: StmtId) {
        let body = self.cx.body;
        let decl = body.method(method);
        let Some(&class) = self.classes.last() else {
            return;
        };
        let generated = decl.is_generated_constructor();
        let compact = decl.is_compact_constructor();
        let body_end = end_of(body.stmt(block).span);

        for adr in self.firstadr..self.slots.next() {
            let Some(var) = self.slots.var_at(adr) else {
                continue;
            };
            let field = body.var(var);
            if field.owner != Some(class) {
                continue;
            }
            if generated && !compact {
                self.check_init_as(
                    field.span,
                    var,
                    FlowDiagnosticKind::UnassignedInDefaultConstructor,
                );
            } else if compact {
                let is_record_field =
                    field.is_field() && !field.is_static && body.class(class).is_record;
                if !is_record_field {
                    self.check_init(field.span, var);
                    continue;
                }
                let unassigned = !self.inits.is_member(adr) && self.uninits.is_member(adr);
                if unassigned && self.method_completes(method, block) {
                    self.cx.annotations.record_fields_to_assign.insert(var);
                } else {
                    self.check_init(body_end, var);
                }
            } else {
                self.check_init(body_end, var);
            }
        }
    }

    fn visit_var_def(&mut self, var: VarId, init: Option<ExprId>, span: Span) {
        if self.mode == AssignMode::Lambda {
            self.enclosed.insert(var);
        }
        let track = self.trackable(var);
        if track && self.cx.body.var(var).is_local() {
            self.new_var(var);
        }
        if let Some(init) = init {
            self.scan_expr(init);
            if track {
                self.let_init(span, var);
            }
        }
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
            StmtKind::Block(stmts) => {
                let mark = self.slots.next();
                self.scan_stmts(stmts);
                self.slots.truncate(mark);
            }
            StmtKind::LocalVar { var, init } => {
                self.visit_var_def(*var, *init, body.var(*var).span)
            }
            StmtKind::LocalClass(class) => self.visit_class(*class),
            StmtKind::Expr(expr) => self.scan_expr(*expr),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.scan_cond(*condition);
                self.inits = cond.inits_when_true;
                self.uninits = cond.uninits_when_true;
                self.scan_stmt(*then_branch);
                match else_branch {
                    Some(else_branch) => {
                        let inits_after_then =
                            std::mem::replace(&mut self.inits, cond.inits_when_false);
                        let uninits_after_then =
                            std::mem::replace(&mut self.uninits, cond.uninits_when_false);
                        self.scan_stmt(*else_branch);
                        self.inits.and_set(&inits_after_then);
                        self.uninits.and_set(&uninits_after_then);
                    }
                    None => {
                        self.inits.and_set(&cond.inits_when_false);
                        self.uninits.and_set(&cond.uninits_when_false);
                    }
                }
            }
            StmtKind::DoWhile {
                body: loop_body,
                condition,
            } => {
                let prev_pending = std::mem::take(&mut self.pending);
                let prev_kind = std::mem::replace(&mut self.flow_kind, FlowKind::Normal);
                let prev_errors = self.cx.sink.error_count();
                let mut discarding = false;
                let mut skip = (Bits::new(), Bits::new());
                loop {
                    let mut entry = self.uninits_entry();
                    self.scan_stmt(*loop_body);
                    self.resolve_continues(stmt);
                    let cond = self.scan_cond(*condition);
                    if self.flow_kind == FlowKind::Normal {
                        skip = (cond.inits_when_false.clone(), cond.uninits_when_false.clone());
                    }
                    if self.loop_done(prev_errors, &entry, &cond.uninits_when_true) {
                        break;
                    }
                    self.inits = cond.inits_when_true;
                    entry.and_set(&cond.uninits_when_true);
                    self.uninits = entry;
                    self.enter_speculative(&mut discarding);
                }
                self.leave_loop(prev_kind, discarding);
                (self.inits, self.uninits) = skip;
                self.resolve_breaks(stmt, prev_pending);
            }
            StmtKind::While {
                condition,
                body: loop_body,
            } => {
                let prev_pending = std::mem::take(&mut self.pending);
                let prev_kind = std::mem::replace(&mut self.flow_kind, FlowKind::Normal);
                let prev_errors = self.cx.sink.error_count();
                let mut discarding = false;
                let mut skip = (Bits::new(), Bits::new());
                let mut entry = self.uninits_entry();
                loop {
                    let cond = self.scan_cond(*condition);
                    if self.flow_kind == FlowKind::Normal {
                        skip = (cond.inits_when_false.clone(), cond.uninits_when_false.clone());
                    }
                    self.inits = cond.inits_when_true;
                    self.uninits = cond.uninits_when_true;
                    self.scan_stmt(*loop_body);
                    self.resolve_continues(stmt);
                    if self.loop_done(prev_errors, &entry, &self.uninits) {
                        break;
                    }
                    entry.and_set(&self.uninits);
                    self.uninits = entry.clone();
                    self.enter_speculative(&mut discarding);
                }
                self.leave_loop(prev_kind, discarding);
                (self.inits, self.uninits) = skip;
                self.resolve_breaks(stmt, prev_pending);
            }
            StmtKind::For {
                init,
                condition,
                update,
                body: loop_body,
            } => {
                let prev_pending = std::mem::take(&mut self.pending);
                let prev_kind = std::mem::replace(&mut self.flow_kind, FlowKind::Normal);
                let mark = self.slots.next();
                self.scan_stmts(init);
                let prev_errors = self.cx.sink.error_count();
                let mut discarding = false;
                let mut skip = (Bits::new(), Bits::new());
                loop {
                    let mut entry = self.uninits_entry();
                    match condition {
                        Some(condition) => {
                            let cond = self.scan_cond(*condition);
                            if self.flow_kind == FlowKind::Normal {
                                skip = (
                                    cond.inits_when_false.clone(),
                                    cond.uninits_when_false.clone(),
                                );
                            }
                            self.inits = cond.inits_when_true;
                            self.uninits = cond.uninits_when_true;
                        }
                        None if self.flow_kind == FlowKind::Normal => {
                            let next = self.slots.next();
                            let mut inits = self.inits.clone();
                            inits.incl_range(self.firstadr, next);
                            let mut uninits = self.uninits.clone();
                            uninits.incl_range(self.firstadr, next);
                            skip = (inits, uninits);
                        }
                        None => {}
                    }
                    self.scan_stmt(*loop_body);
                    self.resolve_continues(stmt);
                    self.scan_stmts(update);
                    if self.loop_done(prev_errors, &entry, &self.uninits) {
                        break;
                    }
                    entry.and_set(&self.uninits);
                    self.uninits = entry;
                    self.enter_speculative(&mut discarding);
                }
                self.leave_loop(prev_kind, discarding);
                (self.inits, self.uninits) = skip;
                self.resolve_breaks(stmt, prev_pending);
                self.slots.truncate(mark);
            }
            StmtKind::ForEach {
                var,
                iterable,
                body: loop_body,
            } => {
                self.visit_var_def(*var, None, body.var(*var).span);
                let prev_pending = std::mem::take(&mut self.pending);
                let prev_kind = std::mem::replace(&mut self.flow_kind, FlowKind::Normal);
                let mark = self.slots.next();
                self.scan_expr(*iterable);
                let inits_start = self.inits.clone();
                let uninits_start = self.uninits.clone();
                self.let_init(data.span, *var);
                let prev_errors = self.cx.sink.error_count();
                let mut discarding = false;
                loop {
                    let mut entry = self.uninits_entry();
                    self.scan_stmt(*loop_body);
                    self.resolve_continues(stmt);
                    if self.loop_done(prev_errors, &entry, &self.uninits) {
                        break;
                    }
                    entry.and_set(&self.uninits);
                    self.uninits = entry;
                    self.enter_speculative(&mut discarding);
                }
                self.leave_loop(prev_kind, discarding);
                self.inits = inits_start;
                self.uninits = uninits_start.and(&self.uninits);
                self.resolve_breaks(stmt, prev_pending);
                self.slots.truncate(mark);
            }
            StmtKind::Labeled { body: inner, .. } => {
                let prev_pending = std::mem::take(&mut self.pending);
                self.scan_stmt(*inner);
                self.resolve_breaks(stmt, prev_pending);
            }
            StmtKind::Switch(switch) => {
                self.visit_switch(JumpTarget::Stmt(stmt), data.span, switch, false);
            }
            StmtKind::Try {
                resources,
                body: try_body,
                catches,
                finally,
            } => {
                let uninits_try_prev = self.uninits_try.clone();
                let prev_pending = std::mem::take(&mut self.pending);
                let inits_try = self.inits.clone();
                self.uninits_try = self.uninits.clone();
                let mut resource_vars = Vec::new();
                for resource in resources {
                    match resource {
                        Resource::Var { var, init } => {
                            self.visit_var_def(*var, Some(*init), body.var(*var).span);
                            self.unrefd_resources.push(*var);
                            resource_vars.push(*var);
                        }
                        Resource::Expr(expr) => self.scan_expr(*expr),
                    }
                }
                self.scan_stmt(*try_body);
                self.uninits_try.and_set(&self.uninits);
                let mut inits_end = self.inits.clone();
                let mut uninits_end = self.uninits.clone();
                let mark_catch = self.slots.next();

                if self.cx.config.lint.try_resources {
                    for var in resource_vars {
                        if self.unrefd_resources.contains(&var) {
                            let message = format!(
                                "auto-closeable resource {} is never referenced in body of corresponding try statement",
                                self.cx.var_name(var)
                            );
                            let span = body.var(var).span;
                            self.cx.report(FlowDiagnosticKind::UnusedResource, span, message);
                            self.referenced(var);
                        }
                    }
                }

                let inits_catch_prev = inits_try.clone();
                let uninits_catch_prev = self.uninits_try.clone();
                for catch in catches {
                    self.inits = inits_catch_prev.clone();
                    self.uninits = uninits_catch_prev.clone();
                    self.visit_var_def(catch.param, None, body.var(catch.param).span);
                    self.init_param(catch.param);
                    self.scan_stmt(catch.body);
                    inits_end.and_set(&self.inits);
                    uninits_end.and_set(&self.uninits);
                    self.slots.truncate(mark_catch);
                }

                match finally {
                    Some(finally) => {
                        self.inits = inits_try;
                        self.uninits = self.uninits_try.clone();
                        let mut exits = std::mem::replace(&mut self.pending, prev_pending);
                        self.scan_stmt(*finally);
                        if finally_completes(&mut self.cx, stmt, *finally) {
                            self.uninits.and_set(&uninits_end);
                            for mut exit in exits.drain().collect::<Vec<_>>() {
                                if let Snapshot::Plain { inits, uninits } = &mut exit.state {
                                    inits.or_set(&self.inits);
                                    uninits.and_set(&self.uninits);
                                }
                                self.pending.push(exit.kind, exit.span, exit.state);
                            }
                            self.inits.or_set(&inits_end);
                        }
                    }
                    None => {
                        self.inits = inits_end;
                        self.uninits = uninits_end;
                        let exits = std::mem::replace(&mut self.pending, prev_pending);
                        self.pending.append(exits);
                    }
                }
                self.uninits_try
                    .and_set(&uninits_try_prev)
                    .and_set(&self.uninits);
            }
            StmtKind::Synchronized { lock, body: inner } => {
                self.scan_expr(*lock);
                self.scan_stmt(*inner);
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.scan_expr(*value);
                }
                let state = self.plain_snapshot();
                self.record_exit(ExitKind::Return, data.span, state);
            }
            StmtKind::Throw(expr) => {
                self.scan_expr(*expr);
                self.mark_dead();
            }
            StmtKind::Break { target, .. } => {
                let state = self.plain_snapshot();
                let kind = ExitKind::Jump {
                    kind: JumpKind::Break,
                    target: JumpTarget::Stmt(*target),
                };
                self.record_exit(kind, data.span, state);
            }
            StmtKind::Continue { target, .. } => {
                let state = self.plain_snapshot();
                let kind = ExitKind::Jump {
                    kind: JumpKind::Continue,
                    target: JumpTarget::Stmt(*target),
                };
                self.record_exit(kind, data.span, state);
            }
            StmtKind::Yield { value, target } => {
                let kind = ExitKind::Jump {
                    kind: JumpKind::Yield,
                    target: JumpTarget::Expr(*target),
                };
                if body.expr(*target).ty.is_boolean() {
                    let cond = self.scan_cond(*value);
                    (self.inits, self.uninits) = cond.merge();
                    self.record_exit(kind, data.span, Snapshot::Cond(cond));
                } else {
                    self.scan_expr(*value);
                    let state = self.plain_snapshot();
                    self.record_exit(kind, data.span, state);
                }
            }
            StmtKind::Assert { condition, detail } => {
                let inits_exit = self.inits.clone();
                let mut uninits_exit = self.uninits.clone();
                let cond = self.scan_cond(*condition);
                uninits_exit.and_set(&cond.uninits_when_true);
                if let Some(detail) = detail {
                    self.inits = cond.inits_when_false;
                    self.uninits = cond.uninits_when_false;
                    self.scan_expr(*detail);
                }
                self.inits = inits_exit;
                self.uninits = uninits_exit;
            }
            StmtKind::Empty => {}
        }
    }

    // === Switches ===

    fn scan_label(&mut self, label: &CaseLabel) {
        match label {
            CaseLabel::Default => {}
            CaseLabel::Expr(expr) => {
                if let Outcome::Cond(cond) = self.visit_expr(*expr) {
                    self.inits = cond.inits_when_true;
                    self.uninits = cond.uninits_when_true;
                }
            }
            CaseLabel::Pattern { pattern, .. } => self.scan_pattern(pattern),
        }
    }

    /// Binds the pattern's variable; a guard leaves the state it has when
    /// true.
    fn scan_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Binding { var } => {
                self.visit_var_def(*var, None, self.cx.body.var(*var).span);
                self.init_param(*var);
            }
            Pattern::Guarded { pattern, guard } => {
                self.scan_pattern(pattern);
                if let Outcome::Cond(cond) = self.visit_expr(*guard) {
                    self.inits = cond.inits_when_true;
                    self.uninits = cond.uninits_when_true;
                }
            }
        }
    }

    fn add_vars(&self, stats: &[StmtId], inits: &mut Bits, uninits: &mut Bits) {
        for &stmt in stats {
            if let StmtKind::LocalVar { var, .. } = self.cx.body.stmt(stmt).kind {
                if let Some(adr) = self.slots.address_of(var) {
                    inits.excl(adr);
                    uninits.incl(adr);
                }
            }
        }
    }

    fn visit_switch(
        &mut self,
        target: JumpTarget,
        span: Span,
        switch: &Switch,
        boolean: bool,
    ) -> Outcome {
        let body = self.cx.body;
        let is_expr = matches!(target, JumpTarget::Expr(_));
        let prev_pending = std::mem::take(&mut self.pending);
        let mark = self.slots.next();
        self.scan_expr(switch.selector);
        let mut inits_switch = self.inits.clone();
        let mut uninits_switch = self.uninits.clone();

        let mut idx = 0;
        while idx < switch.cases.len() {
            self.inits = inits_switch.clone();
            self.uninits.and_set(&uninits_switch);
            for label in &switch.cases[idx].labels {
                self.scan_label(label);
            }
            // `case T t: case null: stats` runs the null case's statements
            // with the pattern's bindings.
            let joins_null = switch.cases[idx].stats.is_empty()
                && switch.cases.get(idx + 1).is_some_and(|next| match next.labels.as_slice() {
                    [CaseLabel::Expr(expr)] => body.expr(*expr).is_null_literal(),
                    _ => false,
                });
            if joins_null {
                idx += 1;
            }
            let case = &switch.cases[idx];
            self.scan_stmts(&case.stats);
            if case.kind == CaseKind::Rule && self.case_completes(target, idx, &case.stats) {
                let kind = ExitKind::Jump {
                    kind: if is_expr { JumpKind::Yield } else { JumpKind::Break },
                    target,
                };
                let state = self.plain_snapshot();
                self.record_exit(kind, span, state);
            }
            self.add_vars(&case.stats, &mut inits_switch, &mut uninits_switch);
            idx += 1;
        }

        if !switch.has_total_pattern {
            if is_expr {
                self.mark_dead();
            } else {
                self.inits = inits_switch;
                self.uninits.and_set(&uninits_switch);
            }
        }

        let outcome = if is_expr {
            self.resolve_yields(target, prev_pending, boolean)
        } else {
            self.resolve_into_state(JumpKind::Break, target, prev_pending);
            Outcome::Plain
        };
        self.slots.truncate(mark);
        outcome
    }

    fn resolve_yields(
        &mut self,
        target: JumpTarget,
        outer: ExitQueue<Snapshot>,
        boolean: bool,
    ) -> Outcome {
        let states = self.pending.resolve(JumpKind::Yield, target, outer);
        if !boolean {
            for state in states {
                self.join_exit(state);
            }
            return Outcome::Plain;
        }
        let mut result: Option<CondBits> = None;
        for state in states {
            let cond = result.get_or_insert_with(|| CondBits::split(&self.inits, &self.uninits));
            match state {
                Snapshot::Cond(exit) => cond.and_with(&exit),
                Snapshot::Plain { inits, uninits } => {
                    cond.and_with(&CondBits::split(&inits, &uninits))
                }
            }
        }
        match result {
            Some(cond) => Outcome::Cond(cond),
            None => Outcome::Plain,
        }
    }

    // === Expressions ===

    fn scan_expr(&mut self, expr: ExprId) {
        if let Outcome::Cond(cond) = self.visit_expr(expr) {
            (self.inits, self.uninits) = cond.merge();
        }
    }

    fn scan_exprs(&mut self, exprs: &[ExprId]) {
        for &expr in exprs {
            self.scan_expr(expr);
        }
    }

    /// Walks a boolean expression and returns its split state. Constant
    /// conditions are not walked: the impossible branch assigns everything.
    fn scan_cond(&mut self, expr: ExprId) -> CondBits {
        let data = self.cx.body.expr(expr);
        let next = self.slots.next();
        if data.is_false() {
            let mut cond = CondBits::split(&self.inits, &self.uninits);
            cond.inits_when_true.incl_range(self.firstadr, next);
            cond.uninits_when_true.incl_range(self.firstadr, next);
            return cond;
        }
        if data.is_true() {
            let mut cond = CondBits::split(&self.inits, &self.uninits);
            cond.inits_when_false.incl_range(self.firstadr, next);
            cond.uninits_when_false.incl_range(self.firstadr, next);
            return cond;
        }
        match self.visit_expr(expr) {
            Outcome::Cond(cond) => cond,
            Outcome::Plain => CondBits::split(&self.inits, &self.uninits),
        }
    }

    fn visit_expr(&mut self, expr: ExprId) -> Outcome {
        if self.cx.failed() {
            return Outcome::Plain;
        }
        let body = self.cx.body;
        let data = body.expr(expr);
        match &data.kind {
            ExprKind::Literal(_)
            | ExprKind::EnumConstant { .. }
            | ExprKind::This
            | ExprKind::Missing => {}
            ExprKind::Ident(var) => {
                self.check_init(data.span, *var);
                self.referenced(*var);
            }
            ExprKind::Select {
                receiver, field, ..
            } => {
                self.scan_expr(*receiver);
                if let Some(field) = field {
                    if matches!(body.expr(*receiver).kind, ExprKind::This) {
                        self.check_init(data.span, *field);
                    }
                }
            }
            ExprKind::Assign { target, value } => {
                if body.ident_or_this_field(*target).is_none() {
                    self.scan_expr(*target);
                }
                self.scan_expr(*value);
                self.let_init_expr(*target);
            }
            ExprKind::CompoundAssign { target, value, .. } => {
                self.scan_expr(*target);
                self.scan_expr(*value);
                self.let_init_expr(*target);
            }
            ExprKind::Unary { op, expr: operand } => match op {
                UnaryOp::Not => return Outcome::Cond(self.scan_cond(*operand).negate()),
                op if op.is_increment() => {
                    self.scan_expr(*operand);
                    self.let_init_expr(*operand);
                }
                _ => self.scan_expr(*operand),
            },
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinaryOp::AndAnd => {
                    let left = self.scan_cond(*lhs);
                    self.inits = left.inits_when_true;
                    self.uninits = left.uninits_when_true;
                    let mut right = self.scan_cond(*rhs);
                    right.inits_when_false.and_set(&left.inits_when_false);
                    right.uninits_when_false.and_set(&left.uninits_when_false);
                    return Outcome::Cond(right);
                }
                BinaryOp::OrOr => {
                    let left = self.scan_cond(*lhs);
                    self.inits = left.inits_when_false;
                    self.uninits = left.uninits_when_false;
                    let mut right = self.scan_cond(*rhs);
                    right.inits_when_true.and_set(&left.inits_when_true);
                    right.uninits_when_true.and_set(&left.uninits_when_true);
                    return Outcome::Cond(right);
                }
                _ => {
                    self.scan_expr(*lhs);
                    self.scan_expr(*rhs);
                }
            },
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                let cond = self.scan_cond(*condition);
                self.inits = cond.inits_when_true;
                self.uninits = cond.uninits_when_true;
                if body.expr(*then_expr).ty.is_boolean() && body.expr(*else_expr).ty.is_boolean() {
                    let after_then = self.scan_cond(*then_expr);
                    self.inits = cond.inits_when_false;
                    self.uninits = cond.uninits_when_false;
                    let mut after_else = self.scan_cond(*else_expr);
                    after_else.and_with(&after_then);
                    return Outcome::Cond(after_else);
                }
                self.scan_expr(*then_expr);
                let inits_after_then = std::mem::replace(&mut self.inits, cond.inits_when_false);
                let uninits_after_then =
                    std::mem::replace(&mut self.uninits, cond.uninits_when_false);
                self.scan_expr(*else_expr);
                self.inits.and_set(&inits_after_then);
                self.uninits.and_set(&uninits_after_then);
            }
            ExprKind::Call { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    self.scan_expr(*receiver);
                }
                self.scan_exprs(args);
            }
            ExprKind::New { args, body: class, .. } => {
                self.scan_exprs(args);
                if let Some(class) = class {
                    self.visit_class(*class);
                }
            }
            ExprKind::NewArray { dims, init } => {
                self.scan_exprs(dims);
                if let Some(init) = init {
                    self.scan_exprs(init);
                }
            }
            ExprKind::ArrayAccess { array, index } => {
                self.scan_expr(*array);
                self.scan_expr(*index);
            }
            ExprKind::Cast { expr: operand } => self.scan_expr(*operand),
            ExprKind::InstanceOf {
                expr: operand,
                pattern,
            } => {
                self.scan_expr(*operand);
                if let Some(pattern) = pattern {
                    self.scan_pattern(pattern);
                }
            }
            ExprKind::Lambda {
                params,
                body: lambda_body,
                ..
            } => self.visit_lambda(expr, params, lambda_body),
            ExprKind::SwitchExpr(switch) => {
                let boolean = data.ty.is_boolean();
                return self.visit_switch(JumpTarget::Expr(expr), data.span, switch, boolean);
            }
        }
        Outcome::Plain
    }

    fn visit_lambda(&mut self, expr: ExprId, params: &[VarId], lambda_body: &LambdaBody) {
        if is_stuck(self.cx.body, expr) {
            return;
        }
        if self.mode == AssignMode::Lambda {
            if self.in_lambda {
                return;
            }
            self.in_lambda = true;
        }
        let inits_prev = self.inits.clone();
        let uninits_prev = self.uninits.clone();
        let returnadr_prev = self.returnadr;
        let mark = self.slots.next();
        let pending_prev = std::mem::take(&mut self.pending);
        self.returnadr = self.slots.next();

        for &param in params {
            self.visit_var_def(param, None, self.cx.body.var(param).span);
            self.init_param(param);
        }
        match lambda_body {
            LambdaBody::Expr(expr) => self.scan_expr(*expr),
            LambdaBody::Block(block) => self.scan_stmt(*block),
        }

        self.returnadr = returnadr_prev;
        self.inits = inits_prev;
        self.uninits = uninits_prev;
        self.pending = pending_prev;
        self.slots.truncate(mark);
        if self.mode == AssignMode::Lambda {
            self.in_lambda = false;
        }
    }
}
