use nova_flow::{FlowConfig, SpeculativeDiagnostics};
use nova_hir::body::{BinaryOp, Body, ExprKind, LambdaBody, Member, MethodKind, StmtKind, VarId};
use nova_types::{Type, TypeStore};
use pretty_assertions::assert_eq;

use super::{codes, run, run_with, Unit};

/// `int x; if (flag) x = 1; [else x = 2;] return x;`
fn conditionally_assigned(with_else: bool) -> (Body, VarId, nova_hir::body::ExprId) {
    let mut u = Unit::new();
    let flag = u.b.param("flag", Type::boolean());
    let x = u.b.local("x", Type::int());
    let decl = u.b.local_var(x, None);
    let cond = u.b.ident(flag);
    let one = u.b.int_lit(1);
    let then_branch = u.b.assign_stmt(x, one);
    let else_branch = with_else.then(|| {
        let two = u.b.int_lit(2);
        u.b.assign_stmt(x, two)
    });
    let branch = u.b.stmt(StmtKind::If {
        condition: cond,
        then_branch,
        else_branch,
    });
    let read = u.b.ident(x);
    let ret = u.b.stmt(StmtKind::Return(Some(read)));
    let block = u.b.block(vec![decl, branch, ret]);
    u.method(vec![flag], Type::int(), vec![], block);
    (u.finish(), x, read)
}

#[test]
fn use_after_one_armed_if_is_unassigned() {
    let env = TypeStore::with_minimal_jdk();
    let (body, _, read) = conditionally_assigned(false);
    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_UNASSIGNED"]);
    assert_eq!(result.diagnostics[0].span, Some(body.expr(read).span));
    assert_eq!(
        result.diagnostics[0].message,
        "variable x might not have been initialized"
    );
}

#[test]
fn assignment_on_both_arms_definitely_assigns() {
    let env = TypeStore::with_minimal_jdk();
    let (body, x, _) = conditionally_assigned(true);
    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), Vec::<&str>::new());
    assert!(result.annotations.is_effectively_final(x));
}

/// `int x; if (flag OP (x = 1) == 1) return x; return 0;`
fn short_circuit(op: BinaryOp) -> Body {
    let mut u = Unit::new();
    let flag = u.b.param("flag", Type::boolean());
    let x = u.b.local("x", Type::int());
    let decl = u.b.local_var(x, None);
    let lhs = u.b.ident(flag);
    let one = u.b.int_lit(1);
    let assign = u.b.assign(x, one);
    let one = u.b.int_lit(1);
    let compare = u.b.binary(BinaryOp::Eq, assign, one, Type::boolean());
    let cond = u.b.binary(op, lhs, compare, Type::boolean());
    let read = u.b.ident(x);
    let ret = u.b.stmt(StmtKind::Return(Some(read)));
    let branch = u.b.stmt(StmtKind::If {
        condition: cond,
        then_branch: ret,
        else_branch: None,
    });
    let zero = u.b.int_lit(0);
    let fallback = u.b.stmt(StmtKind::Return(Some(zero)));
    let block = u.b.block(vec![decl, branch, fallback]);
    u.method(vec![flag], Type::int(), vec![], block);
    u.finish()
}

#[test]
fn conditional_and_assigns_its_right_operand_when_true() {
    let env = TypeStore::with_minimal_jdk();
    let result = run(&short_circuit(BinaryOp::AndAnd), &env);
    assert_eq!(codes(&result.diagnostics), Vec::<&str>::new());
}

#[test]
fn conditional_or_may_skip_its_right_operand_when_true() {
    let env = TypeStore::with_minimal_jdk();
    let result = run(&short_circuit(BinaryOp::OrOr), &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_UNASSIGNED"]);
}

/// `final int x; if (flag && (x = 1) > 0) {} else {} return x;`
#[test]
fn conditional_and_leaves_its_right_operand_unassigned_after_the_statement() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let flag = u.b.param("flag", Type::boolean());
    let x = u.b.final_local("x", Type::int());
    let decl = u.b.local_var(x, None);
    let lhs = u.b.ident(flag);
    let one = u.b.int_lit(1);
    let assign = u.b.assign(x, one);
    let zero = u.b.int_lit(0);
    let compare = u.b.binary(BinaryOp::Greater, assign, zero, Type::boolean());
    let cond = u.b.binary(BinaryOp::AndAnd, lhs, compare, Type::boolean());
    let then_branch = u.b.block(vec![]);
    let else_branch = u.b.block(vec![]);
    let branch = u.b.stmt(StmtKind::If {
        condition: cond,
        then_branch,
        else_branch: Some(else_branch),
    });
    let read = u.b.ident(x);
    let ret = u.b.stmt(StmtKind::Return(Some(read)));
    let block = u.b.block(vec![decl, branch, ret]);
    u.method(vec![flag], Type::int(), vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_UNASSIGNED"]);
    assert_eq!(result.diagnostics[0].span, Some(body.expr(read).span));
}

/// `int x; do { [x = 1;] if (flag) continue; x = 2; } while (x > 0);`
fn continue_in_do_while(assign_before_continue: bool) -> (Body, nova_hir::body::ExprId) {
    let mut u = Unit::new();
    let flag = u.b.param("flag", Type::boolean());
    let x = u.b.local("x", Type::int());
    let decl = u.b.local_var(x, None);
    let lp = u.b.reserve_stmt();
    let mut stmts = Vec::new();
    if assign_before_continue {
        let one = u.b.int_lit(1);
        stmts.push(u.b.assign_stmt(x, one));
    }
    let cond = u.b.ident(flag);
    let cont = u.b.stmt(StmtKind::Continue {
        label: None,
        target: lp,
    });
    stmts.push(u.b.stmt(StmtKind::If {
        condition: cond,
        then_branch: cont,
        else_branch: None,
    }));
    let two = u.b.int_lit(2);
    stmts.push(u.b.assign_stmt(x, two));
    let loop_body = u.b.block(stmts);
    let read = u.b.ident(x);
    let zero = u.b.int_lit(0);
    let condition = u.b.binary(BinaryOp::Greater, read, zero, Type::boolean());
    u.b.define_stmt(
        lp,
        StmtKind::DoWhile {
            body: loop_body,
            condition,
        },
    );
    let block = u.b.block(vec![decl, lp]);
    u.method(vec![flag], Type::Void, vec![], block);
    (u.finish(), read)
}

#[test]
fn assignment_before_continue_reaches_the_next_iteration() {
    let env = TypeStore::with_minimal_jdk();
    let (body, _) = continue_in_do_while(true);
    assert_eq!(codes(&run(&body, &env).diagnostics), Vec::<&str>::new());
}

#[test]
fn continue_skipping_the_assignment_leaves_the_condition_unassigned() {
    let env = TypeStore::with_minimal_jdk();
    let (body, read) = continue_in_do_while(false);
    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_UNASSIGNED"]);
    assert_eq!(result.diagnostics[0].span, Some(body.expr(read).span));
}

/// `int z; Runnable task = () -> { int y = z; };` with the lambda left untyped.
#[test]
fn erroneous_lambda_body_is_not_analyzed() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let z = u.b.local("z", Type::int());
    let decl = u.b.local_var(z, None);
    let y = u.b.local("y", Type::int());
    let read = u.b.ident(z);
    let inner = u.b.local_var(y, Some(read));
    let lambda_block = u.b.block(vec![inner]);
    let lambda = u.b.typed_expr(
        ExprKind::Lambda {
            params: vec![],
            body: LambdaBody::Block(lambda_block),
            descriptor_thrown: vec![],
        },
        Type::Error,
    );
    let task = u.b.local("task", Type::Error);
    let holder = u.b.local_var(task, Some(lambda));
    let block = u.b.block(vec![decl, holder]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    assert_eq!(codes(&run(&body, &env).diagnostics), Vec::<&str>::new());
}

/// `final int x; while (flag) { x = 1; }`
fn final_assigned_in_loop() -> Body {
    let mut u = Unit::new();
    let flag = u.b.param("flag", Type::boolean());
    let x = u.b.final_local("x", Type::int());
    let decl = u.b.local_var(x, None);
    let one = u.b.int_lit(1);
    let assign = u.b.assign_stmt(x, one);
    let loop_body = u.b.block(vec![assign]);
    let cond = u.b.ident(flag);
    let lp = u.b.stmt(StmtKind::While {
        condition: cond,
        body: loop_body,
    });
    let block = u.b.block(vec![decl, lp]);
    u.method(vec![flag], Type::Void, vec![], block);
    u.finish()
}

#[test]
fn final_assigned_in_loop_body_is_found_on_the_second_pass() {
    let env = TypeStore::with_minimal_jdk();
    let result = run(&final_assigned_in_loop(), &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_FINAL_ASSIGNED_IN_LOOP"]);
    assert_eq!(
        result.diagnostics[0].message,
        "variable x might be assigned in loop"
    );
}

#[test]
fn speculative_loop_diagnostics_can_be_discarded() {
    let env = TypeStore::with_minimal_jdk();
    let config = FlowConfig {
        speculative_loop_diagnostics: SpeculativeDiagnostics::Discard,
        ..FlowConfig::default()
    };
    let result = run_with(&final_assigned_in_loop(), &env, config);
    assert_eq!(codes(&result.diagnostics), Vec::<&str>::new());
}

#[test]
fn final_local_assigned_twice() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let x = u.b.final_local("x", Type::int());
    let one = u.b.int_lit(1);
    let decl = u.b.local_var(x, Some(one));
    let two = u.b.int_lit(2);
    let again = u.b.assign_stmt(x, two);
    let block = u.b.block(vec![decl, again]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    assert_eq!(
        codes(&run(&body, &env).diagnostics),
        vec!["FLOW_FINAL_REASSIGNED"]
    );
}

#[test]
fn final_parameter_may_not_be_assigned() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let p = u.b.final_param("p", Type::int());
    let one = u.b.int_lit(1);
    let assign = u.b.assign_stmt(p, one);
    let block = u.b.block(vec![assign]);
    u.method(vec![p], Type::Void, vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_FINAL_PARAM_ASSIGNED"]);
    assert_eq!(
        result.diagnostics[0].message,
        "final parameter p may not be assigned"
    );
}

#[test]
fn reassigned_local_is_not_effectively_final() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let x = u.b.local("x", Type::int());
    let zero = u.b.int_lit(0);
    let decl = u.b.local_var(x, Some(zero));
    let one = u.b.int_lit(1);
    let again = u.b.assign_stmt(x, one);
    let y = u.b.local("y", Type::int());
    let two = u.b.int_lit(2);
    let other = u.b.local_var(y, Some(two));
    let block = u.b.block(vec![decl, again, other]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), Vec::<&str>::new());
    assert!(!result.annotations.is_effectively_final(x));
    assert!(result.annotations.is_effectively_final(y));
}

fn constructor() -> MethodKind {
    MethodKind::Constructor {
        initial: true,
        generated: false,
        compact: false,
    }
}

#[test]
fn blank_final_field_must_be_assigned_by_the_constructor() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let f = u.b.field(u.class, "f", Type::int(), true, false, false);
    u.member(Member::Field { var: f, init: None });
    let ctor_body = u.b.block(vec![]);
    u.method_of_kind(constructor(), vec![], Type::Void, vec![], ctor_body);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_UNASSIGNED"]);
    assert_eq!(result.diagnostics[0].span, Some(body.stmt(ctor_body).span));

    let mut u = Unit::new();
    let f = u.b.field(u.class, "f", Type::int(), true, false, false);
    u.member(Member::Field { var: f, init: None });
    let target = u.b.this_field(f);
    let one = u.b.int_lit(1);
    let assign = u.b.expr(nova_hir::body::ExprKind::Assign { target, value: one });
    let assign = u.b.expr_stmt(assign);
    let ctor_body = u.b.block(vec![assign]);
    u.method_of_kind(constructor(), vec![], Type::Void, vec![], ctor_body);
    let body = u.finish();

    assert_eq!(codes(&run(&body, &env).diagnostics), Vec::<&str>::new());
}
