//! Attributed, arena-allocated IR for flow analysis.
//!
//! A [`Body`] holds every class, method, statement, expression and variable
//! of one compilation unit. Nodes refer to each other through typed index
//! handles; jump statements carry the handle of the statement (or switch
//! expression) they leave, so resolving a pending exit is a handle compare.
//!
//! Everything here is produced by attribution: types are resolved, constant
//! expressions are folded into [`Expr::constant`], and switch totality is
//! already decided.

use std::fmt;

use nova_core::Name;
use nova_types::{ClassId, Span, Type};

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn from_raw(raw: u32) -> Self {
                $name(raw)
            }

            #[must_use]
            pub fn idx(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl<T> std::ops::Index<$name> for Arena<T> {
            type Output = T;

            fn index(&self, index: $name) -> &Self::Output {
                &self.data[index.idx()]
            }
        }

        impl<T> std::ops::IndexMut<$name> for Arena<T> {
            fn index_mut(&mut self, index: $name) -> &mut Self::Output {
                &mut self.data[index.idx()]
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena<T> {
    data: Vec<T>,
}

impl<T> Arena<T> {
    pub fn alloc(&mut self, value: T) -> u32 {
        let idx = self.data.len() as u32;
        self.data.push(value);
        idx
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (i as u32, v))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena { data: Vec::new() }
    }
}

arena_id!(StmtId);
arena_id!(ExprId);
arena_id!(VarId);
arena_id!(ClassDeclId);
arena_id!(MethodDeclId);

// === Variables ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Local,
    Param,
    LambdaParam,
    /// A catch parameter; `multi` for `catch (A | B e)`.
    CatchParam { multi: bool },
    /// A variable declared in a try-with-resources header.
    Resource,
    /// A pattern binding.
    Binding,
    Field,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
    pub name: Name,
    pub ty: Type,
    pub kind: VarKind,
    pub is_final: bool,
    pub is_static: bool,
    /// Fields only: declared with an initializer expression.
    pub has_initializer: bool,
    /// Fields only: the declaring class.
    pub owner: Option<ClassDeclId>,
    pub span: Span,
}

impl VarDecl {
    pub fn is_field(&self) -> bool {
        self.kind == VarKind::Field
    }

    /// Locals of any kind: owned by a method, lambda or initializer.
    pub fn is_local(&self) -> bool {
        !self.is_field()
    }

    pub fn is_parameter(&self) -> bool {
        matches!(
            self.kind,
            VarKind::Param | VarKind::LambdaParam | VarKind::CatchParam { .. }
        )
    }

    pub fn is_multi_catch(&self) -> bool {
        matches!(self.kind, VarKind::CatchParam { multi: true })
    }

    pub fn is_resource(&self) -> bool {
        self.kind == VarKind::Resource
    }
}

// === Statements ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    LocalVar {
        var: VarId,
        init: Option<ExprId>,
    },
    LocalClass(ClassDeclId),
    Expr(ExprId),
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        condition: ExprId,
    },
    For {
        init: Vec<StmtId>,
        condition: Option<ExprId>,
        update: Vec<StmtId>,
        body: StmtId,
    },
    ForEach {
        var: VarId,
        iterable: ExprId,
        body: StmtId,
    },
    Labeled {
        label: Name,
        body: StmtId,
    },
    Switch(Switch),
    Try {
        resources: Vec<Resource>,
        body: StmtId,
        catches: Vec<CatchClause>,
        finally: Option<StmtId>,
    },
    Synchronized {
        lock: ExprId,
        body: StmtId,
    },
    Return(Option<ExprId>),
    Throw(ExprId),
    /// `target` is the loop, switch or labeled statement being left.
    Break {
        label: Option<Name>,
        target: StmtId,
    },
    /// `target` is the loop being continued.
    Continue {
        label: Option<Name>,
        target: StmtId,
    },
    /// `target` is the enclosing switch expression.
    Yield {
        value: ExprId,
        target: ExprId,
    },
    Assert {
        condition: ExprId,
        detail: Option<ExprId>,
    },
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Var { var: VarId, init: ExprId },
    Expr(ExprId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchClause {
    pub param: VarId,
    /// The caught types; more than one for a multi-catch.
    pub types: Vec<CaughtType>,
    pub body: StmtId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtType {
    pub ty: Type,
    pub span: Span,
}

impl CatchClause {
    /// Where a problem with one caught type is reported: at the alternative
    /// itself in a multi-catch, at the clause otherwise.
    pub fn span_of(&self, caught: &CaughtType) -> Span {
        if self.types.len() > 1 {
            caught.span
        } else {
            self.span
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub selector: ExprId,
    pub cases: Vec<Case>,
    /// A `default` label or an unconditional pattern is present.
    pub has_total_pattern: bool,
    /// At least one label is a pattern.
    pub pattern_switch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    /// `case L: stats`
    Statement,
    /// `case L -> body`
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub labels: Vec<CaseLabel>,
    pub kind: CaseKind,
    pub stats: Vec<StmtId>,
    pub span: Span,
}

impl Case {
    pub fn has_null_label(&self, body: &Body) -> bool {
        self.labels.iter().any(|label| match label {
            CaseLabel::Expr(expr) => body.expr(*expr).is_null_literal(),
            _ => false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseLabel {
    Default,
    /// A constant expression, enum constant or `null`.
    Expr(ExprId),
    Pattern {
        pattern: Pattern,
        /// Matches every value of the selector type.
        unconditional: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Binding { var: VarId },
    Guarded { pattern: Box<Pattern>, guard: ExprId },
}

impl Pattern {
    /// The binding introduced by the innermost type pattern.
    pub fn binding(&self) -> VarId {
        match self {
            Pattern::Binding { var } => *var,
            Pattern::Guarded { pattern, .. } => pattern.binding(),
        }
    }
}

// === Expressions ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Char(char),
    String(String),
    Null,
}

/// A folded compile-time constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Bool(bool),
    Int(i64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn is_increment(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LambdaBody {
    Expr(ExprId),
    Block(StmtId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub constant: Option<Constant>,
    pub span: Span,
}

impl Expr {
    /// Constant `true`.
    pub fn is_true(&self) -> bool {
        self.constant == Some(Constant::Bool(true))
    }

    /// Constant `false`.
    pub fn is_false(&self) -> bool {
        self.constant == Some(Constant::Bool(false))
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(Literal::Null))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Literal(Literal),
    /// A simple name resolving to a local or a field.
    Ident(VarId),
    EnumConstant {
        class: ClassId,
        name: Name,
    },
    This,
    /// `receiver.name`; `field` is set when the member resolves to a field.
    Select {
        receiver: ExprId,
        name: Name,
        field: Option<VarId>,
    },
    Assign {
        target: ExprId,
        value: ExprId,
    },
    CompoundAssign {
        op: BinaryOp,
        target: ExprId,
        value: ExprId,
    },
    Unary {
        op: UnaryOp,
        expr: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Conditional {
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    /// A method invocation; `thrown` is the resolved method's throws clause.
    Call {
        receiver: Option<ExprId>,
        name: Name,
        args: Vec<ExprId>,
        thrown: Vec<Type>,
    },
    /// Instance creation; `body` is the anonymous class, if any.
    New {
        args: Vec<ExprId>,
        ctor_thrown: Vec<Type>,
        body: Option<ClassDeclId>,
    },
    NewArray {
        dims: Vec<ExprId>,
        init: Option<Vec<ExprId>>,
    },
    ArrayAccess {
        array: ExprId,
        index: ExprId,
    },
    Cast {
        expr: ExprId,
    },
    InstanceOf {
        expr: ExprId,
        pattern: Option<Pattern>,
    },
    /// `descriptor_thrown` is the throws clause of the target's functional
    /// descriptor.
    Lambda {
        params: Vec<VarId>,
        body: LambdaBody,
        descriptor_thrown: Vec<Type>,
    },
    SwitchExpr(Switch),
    /// Placeholder for source that failed to parse or attribute.
    Missing,
}

// === Declarations ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassDeclKind {
    TopLevel,
    Member,
    Local,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Field { var: VarId, init: Option<ExprId> },
    Initializer { is_static: bool, body: StmtId },
    Method(MethodDeclId),
    Class(ClassDeclId),
}

impl Member {
    pub fn is_static(&self, body: &Body) -> bool {
        match self {
            Member::Field { var, .. } => body.var(*var).is_static,
            Member::Initializer { is_static, .. } => *is_static,
            Member::Class(class) => body.class(*class).is_static,
            Member::Method(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    /// `None` for anonymous classes.
    pub name: Option<Name>,
    pub kind: ClassDeclKind,
    pub class: Option<ClassId>,
    pub is_record: bool,
    /// A `static` member class; always false for local and anonymous ones.
    pub is_static: bool,
    pub members: Vec<Member>,
    pub span: Span,
}

impl ClassDecl {
    pub fn is_anonymous(&self) -> bool {
        self.kind == ClassDeclKind::Anonymous
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodDeclId> + '_ {
        self.members.iter().filter_map(|m| match m {
            Member::Method(id) => Some(*id),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Constructor {
        /// Does not start with an explicit `this(...)` call.
        initial: bool,
        /// Synthesized default constructor.
        generated: bool,
        /// Compact canonical record constructor.
        compact: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: Name,
    pub kind: MethodKind,
    pub params: Vec<VarId>,
    pub return_type: Type,
    pub thrown: Vec<Type>,
    /// `None` for abstract and native methods.
    pub body: Option<StmtId>,
    pub span: Span,
}

impl MethodDecl {
    pub fn is_constructor(&self) -> bool {
        matches!(self.kind, MethodKind::Constructor { .. })
    }

    pub fn is_initial_constructor(&self) -> bool {
        matches!(self.kind, MethodKind::Constructor { initial: true, .. })
    }

    pub fn is_generated_constructor(&self) -> bool {
        matches!(self.kind, MethodKind::Constructor { generated: true, .. })
    }

    pub fn is_compact_constructor(&self) -> bool {
        matches!(self.kind, MethodKind::Constructor { compact: true, .. })
    }
}

// === Body ===

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body {
    pub stmts: Arena<Stmt>,
    pub exprs: Arena<Expr>,
    pub vars: Arena<VarDecl>,
    pub classes: Arena<ClassDecl>,
    pub methods: Arena<MethodDecl>,
    /// Top-level classes, in source order.
    pub roots: Vec<ClassDeclId>,
}

impl Body {
    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    #[must_use]
    pub fn var(&self, id: VarId) -> &VarDecl {
        &self.vars[id]
    }

    #[must_use]
    pub fn class(&self, id: ClassDeclId) -> &ClassDecl {
        &self.classes[id]
    }

    #[must_use]
    pub fn method(&self, id: MethodDeclId) -> &MethodDecl {
        &self.methods[id]
    }

    pub fn roots(&self) -> &[ClassDeclId] {
        &self.roots
    }

    /// The variable an expression names, looking through `this.` qualifiers.
    pub fn ident_or_this_field(&self, id: ExprId) -> Option<VarId> {
        match &self.expr(id).kind {
            ExprKind::Ident(var) => Some(*var),
            ExprKind::Select {
                receiver,
                field: Some(var),
                ..
            } if matches!(self.expr(*receiver).kind, ExprKind::This) => Some(*var),
            _ => None,
        }
    }

    /// The variable an assignment target writes, for names and field selects.
    pub fn assigned_var(&self, id: ExprId) -> Option<VarId> {
        match &self.expr(id).kind {
            ExprKind::Ident(var) => Some(*var),
            ExprKind::Select { field, .. } => *field,
            _ => None,
        }
    }
}

// === Builder ===

/// Incremental construction of a [`Body`].
///
/// Spans default to a monotonically increasing one-byte span per node so that
/// allocation order is also source order; use the `*_at` variants to pin a
/// span. Jump targets that enclose the jump are allocated with
/// [`BodyBuilder::reserve_stmt`] / [`BodyBuilder::reserve_expr`] and filled in
/// once their children exist.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    body: Body,
    next_pos: usize,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_span(&mut self) -> Span {
        let start = self.next_pos;
        self.next_pos += 1;
        Span::new(start, start + 1)
    }

    // --- variables ---

    pub fn var(&mut self, decl: VarDecl) -> VarId {
        VarId::from_raw(self.body.vars.alloc(decl))
    }

    fn new_var(&mut self, name: &str, ty: Type, kind: VarKind, is_final: bool) -> VarId {
        let span = self.next_span();
        self.var(VarDecl {
            name: Name::from(name),
            ty,
            kind,
            is_final,
            is_static: false,
            has_initializer: false,
            owner: None,
            span,
        })
    }

    pub fn local(&mut self, name: &str, ty: Type) -> VarId {
        self.new_var(name, ty, VarKind::Local, false)
    }

    pub fn final_local(&mut self, name: &str, ty: Type) -> VarId {
        self.new_var(name, ty, VarKind::Local, true)
    }

    pub fn param(&mut self, name: &str, ty: Type) -> VarId {
        self.new_var(name, ty, VarKind::Param, false)
    }

    pub fn final_param(&mut self, name: &str, ty: Type) -> VarId {
        self.new_var(name, ty, VarKind::Param, true)
    }

    pub fn lambda_param(&mut self, name: &str, ty: Type) -> VarId {
        self.new_var(name, ty, VarKind::LambdaParam, false)
    }

    pub fn catch_param(&mut self, name: &str, ty: Type) -> VarId {
        self.new_var(name, ty, VarKind::CatchParam { multi: false }, false)
    }

    /// Multi-catch parameters are implicitly final.
    pub fn multi_catch_param(&mut self, name: &str, ty: Type) -> VarId {
        self.new_var(name, ty, VarKind::CatchParam { multi: true }, true)
    }

    /// Resource variables are implicitly final.
    pub fn resource(&mut self, name: &str, ty: Type) -> VarId {
        self.new_var(name, ty, VarKind::Resource, true)
    }

    pub fn binding(&mut self, name: &str, ty: Type) -> VarId {
        self.new_var(name, ty, VarKind::Binding, false)
    }

    /// A field of `owner`; `has_initializer` marks `T f = ...;`.
    pub fn field(
        &mut self,
        owner: ClassDeclId,
        name: &str,
        ty: Type,
        is_final: bool,
        is_static: bool,
        has_initializer: bool,
    ) -> VarId {
        let span = self.next_span();
        self.var(VarDecl {
            name: Name::from(name),
            ty,
            kind: VarKind::Field,
            is_final,
            is_static,
            has_initializer,
            owner: Some(owner),
            span,
        })
    }

    // --- expressions ---

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.typed_expr(kind, Type::Unknown)
    }

    pub fn typed_expr(&mut self, kind: ExprKind, ty: Type) -> ExprId {
        let span = self.next_span();
        self.expr_at(kind, ty, span)
    }

    pub fn expr_at(&mut self, kind: ExprKind, ty: Type, span: Span) -> ExprId {
        let constant = match &kind {
            ExprKind::Literal(Literal::Bool(v)) => Some(Constant::Bool(*v)),
            ExprKind::Literal(Literal::Int(v)) => Some(Constant::Int(*v)),
            ExprKind::Literal(Literal::String(v)) => Some(Constant::String(v.clone())),
            _ => None,
        };
        ExprId::from_raw(self.body.exprs.alloc(Expr {
            kind,
            ty,
            constant,
            span,
        }))
    }

    /// Records a folded constant on an already built expression.
    pub fn set_constant(&mut self, expr: ExprId, constant: Constant) {
        self.body.exprs[expr].constant = Some(constant);
    }

    pub fn reserve_expr(&mut self) -> ExprId {
        self.typed_expr(ExprKind::Missing, Type::Unknown)
    }

    pub fn define_expr(&mut self, id: ExprId, kind: ExprKind, ty: Type) {
        let slot = &mut self.body.exprs[id];
        slot.kind = kind;
        slot.ty = ty;
    }

    pub fn bool_lit(&mut self, value: bool) -> ExprId {
        self.typed_expr(ExprKind::Literal(Literal::Bool(value)), Type::boolean())
    }

    pub fn int_lit(&mut self, value: i64) -> ExprId {
        self.typed_expr(ExprKind::Literal(Literal::Int(value)), Type::int())
    }

    pub fn null_lit(&mut self) -> ExprId {
        self.typed_expr(ExprKind::Literal(Literal::Null), Type::Null)
    }

    pub fn ident(&mut self, var: VarId) -> ExprId {
        let ty = self.body.vars[var].ty.clone();
        self.typed_expr(ExprKind::Ident(var), ty)
    }

    /// `this.field`
    pub fn this_field(&mut self, field: VarId) -> ExprId {
        let this = self.expr(ExprKind::This);
        let decl = &self.body.vars[field];
        let (name, ty) = (decl.name.clone(), decl.ty.clone());
        self.typed_expr(
            ExprKind::Select {
                receiver: this,
                name,
                field: Some(field),
            },
            ty,
        )
    }

    /// `target = value` for a named variable.
    pub fn assign(&mut self, var: VarId, value: ExprId) -> ExprId {
        let target = self.ident(var);
        let ty = self.body.vars[var].ty.clone();
        self.typed_expr(ExprKind::Assign { target, value }, ty)
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId, ty: Type) -> ExprId {
        self.typed_expr(ExprKind::Binary { op, lhs, rhs }, ty)
    }

    pub fn call(&mut self, name: &str, args: Vec<ExprId>, thrown: Vec<Type>) -> ExprId {
        self.typed_expr(
            ExprKind::Call {
                receiver: None,
                name: Name::from(name),
                args,
                thrown,
            },
            Type::Void,
        )
    }

    // --- statements ---

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        let span = self.next_span();
        self.stmt_at(kind, span)
    }

    pub fn stmt_at(&mut self, kind: StmtKind, span: Span) -> StmtId {
        StmtId::from_raw(self.body.stmts.alloc(Stmt { kind, span }))
    }

    pub fn reserve_stmt(&mut self) -> StmtId {
        self.stmt(StmtKind::Empty)
    }

    pub fn define_stmt(&mut self, id: StmtId, kind: StmtKind) {
        self.body.stmts[id].kind = kind;
    }

    pub fn block(&mut self, stmts: Vec<StmtId>) -> StmtId {
        self.stmt(StmtKind::Block(stmts))
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn local_var(&mut self, var: VarId, init: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::LocalVar { var, init })
    }

    /// `var = value;`
    pub fn assign_stmt(&mut self, var: VarId, value: ExprId) -> StmtId {
        let assign = self.assign(var, value);
        self.expr_stmt(assign)
    }

    pub fn case(&mut self, labels: Vec<CaseLabel>, kind: CaseKind, stats: Vec<StmtId>) -> Case {
        let span = self.next_span();
        Case {
            labels,
            kind,
            stats,
            span,
        }
    }

    /// Assembles a switch, deriving its totality flags from the labels.
    pub fn switch(&self, selector: ExprId, cases: Vec<Case>) -> Switch {
        let labels = || cases.iter().flat_map(|c| c.labels.iter());
        let pattern_switch = labels().any(|l| matches!(l, CaseLabel::Pattern { .. }));
        let has_total_pattern = labels().any(|l| match l {
            CaseLabel::Default => true,
            CaseLabel::Pattern {
                pattern: Pattern::Binding { .. },
                unconditional,
            } => *unconditional,
            _ => false,
        });
        Switch {
            selector,
            cases,
            has_total_pattern,
            pattern_switch,
        }
    }

    /// Each caught type gets a span of its own after the clause's.
    pub fn catch_clause(&mut self, param: VarId, types: Vec<Type>, body: StmtId) -> CatchClause {
        let span = self.next_span();
        let types = types
            .into_iter()
            .map(|ty| CaughtType {
                ty,
                span: self.next_span(),
            })
            .collect();
        CatchClause {
            param,
            types,
            body,
            span,
        }
    }

    // --- declarations ---

    /// Reserves a class; members are attached with [`BodyBuilder::define_class`].
    pub fn class(
        &mut self,
        name: Option<&str>,
        kind: ClassDeclKind,
        class: Option<ClassId>,
    ) -> ClassDeclId {
        let span = self.next_span();
        ClassDeclId::from_raw(self.body.classes.alloc(ClassDecl {
            name: name.map(Name::from),
            kind,
            class,
            is_record: false,
            is_static: false,
            members: Vec::new(),
            span,
        }))
    }

    pub fn set_record(&mut self, class: ClassDeclId) {
        self.body.classes[class].is_record = true;
    }

    pub fn set_static(&mut self, class: ClassDeclId) {
        self.body.classes[class].is_static = true;
    }

    pub fn define_class(&mut self, class: ClassDeclId, members: Vec<Member>) {
        self.body.classes[class].members = members;
    }

    pub fn method(&mut self, decl: MethodDecl) -> MethodDeclId {
        MethodDeclId::from_raw(self.body.methods.alloc(decl))
    }

    /// A method with the given kind and body; parameters and throws are
    /// optional extras set by the caller through [`BodyBuilder::method`].
    pub fn simple_method(
        &mut self,
        name: &str,
        kind: MethodKind,
        params: Vec<VarId>,
        return_type: Type,
        thrown: Vec<Type>,
        body: Option<StmtId>,
    ) -> MethodDeclId {
        let span = self.next_span();
        self.method(MethodDecl {
            name: Name::from(name),
            kind,
            params,
            return_type,
            thrown,
            body,
            span,
        })
    }

    pub fn add_root(&mut self, class: ClassDeclId) {
        self.body.roots.push(class);
    }

    #[must_use]
    pub fn finish(self) -> Body {
        self.body
    }
}
