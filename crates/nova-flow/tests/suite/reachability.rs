use nova_core::Name;
use nova_flow::{alive_after, analyze_lambda, breaks_out_of, FlowError};
use nova_hir::body::{CaseKind, CaseLabel, ExprKind, LambdaBody, Pattern, StmtKind};
use nova_types::{ClassDef, ClassKind, Type, TypeStore};
use pretty_assertions::assert_eq;

use super::{class_type, codes, run, Unit};

#[test]
fn statement_after_return_is_unreachable() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let ret = u.b.stmt(StmtKind::Return(None));
    let call = u.b.call("after", vec![], vec![]);
    let after = u.b.expr_stmt(call);
    let block = u.b.block(vec![ret, after]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_UNREACHABLE"]);
    assert_eq!(result.diagnostics[0].span, Some(body.stmt(after).span));
}

#[test]
fn only_the_first_dead_statement_is_reported() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let ret = u.b.stmt(StmtKind::Return(None));
    let first = u.b.call("first", vec![], vec![]);
    let first = u.b.expr_stmt(first);
    let second = u.b.call("second", vec![], vec![]);
    let second = u.b.expr_stmt(second);
    let block = u.b.block(vec![ret, first, second]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_UNREACHABLE"]);
    assert_eq!(result.diagnostics[0].span, Some(body.stmt(first).span));
}

#[test]
fn missing_return_is_reported_at_the_closing_brace() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let block = u.b.block(vec![]);
    let method = u.method(vec![], Type::int(), vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_MISSING_RETURN"]);
    assert_eq!(result.diagnostics[0].span, Some(body.stmt(block).span));
    assert_eq!(result.annotations.method_completes_normally(method), Some(true));
}

#[test]
fn infinite_loop_needs_no_return_but_kills_what_follows() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let cond = u.b.bool_lit(true);
    let loop_body = u.b.block(vec![]);
    let lp = u.b.stmt(StmtKind::While {
        condition: cond,
        body: loop_body,
    });
    let zero = u.b.int_lit(0);
    let ret = u.b.stmt(StmtKind::Return(Some(zero)));
    let block = u.b.block(vec![lp, ret]);
    let method = u.method(vec![], Type::int(), vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_UNREACHABLE"]);
    assert_eq!(result.diagnostics[0].span, Some(body.stmt(ret).span));
    assert_eq!(result.annotations.method_completes_normally(method), Some(false));
}

#[test]
fn break_revives_the_code_after_an_infinite_loop() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let lp = u.b.reserve_stmt();
    let brk = u.b.stmt(StmtKind::Break {
        label: None,
        target: lp,
    });
    let loop_body = u.b.block(vec![brk]);
    let cond = u.b.bool_lit(true);
    u.b.define_stmt(
        lp,
        StmtKind::While {
            condition: cond,
            body: loop_body,
        },
    );
    let zero = u.b.int_lit(0);
    let ret = u.b.stmt(StmtKind::Return(Some(zero)));
    let block = u.b.block(vec![lp, ret]);
    u.method(vec![], Type::int(), vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), Vec::<&str>::new());
}

#[test]
fn initializer_that_cannot_complete_is_an_error() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let exc = class_type(&env, "IllegalStateException");
    let thrown = u.b.typed_expr(
        ExprKind::New {
            args: vec![],
            ctor_thrown: vec![],
            body: None,
        },
        exc,
    );
    let throw = u.b.stmt(StmtKind::Throw(thrown));
    let init = u.b.block(vec![throw]);
    u.member(nova_hir::body::Member::Initializer {
        is_static: false,
        body: init,
    });
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_INITIALIZER_COMPLETION"]);
    assert_eq!(result.annotations.initializer_completes_normally(init), Some(false));
}

/// `Shape` is sealed and abstract, permitting `Circle` and `Square`.
fn sealed_shapes() -> (TypeStore, Type, Type, Type) {
    let mut env = TypeStore::with_minimal_jdk();
    let circle = env.intern_class_id("Circle");
    let square = env.intern_class_id("Square");
    let shape = env.add_class(ClassDef {
        is_abstract: true,
        is_sealed: true,
        permitted_subclasses: vec![circle, square],
        ..ClassDef::class("Shape", None)
    });
    let shape_ty = Type::class(shape, vec![]);
    env.define_class(circle, ClassDef::class("Circle", Some(shape_ty.clone())));
    env.define_class(square, ClassDef::class("Square", Some(shape_ty.clone())));
    (
        env,
        shape_ty,
        Type::class(circle, vec![]),
        Type::class(square, vec![]),
    )
}

fn shape_switch(cover_square: bool) -> (nova_hir::body::Body, nova_hir::body::StmtId) {
    let (_, shape, circle, square) = sealed_shapes();
    let mut u = Unit::new();
    let s = u.b.param("s", shape);
    let selector = u.b.ident(s);

    let mut cases = Vec::new();
    let c = u.b.binding("c", circle);
    let on_circle = u.b.block(vec![]);
    cases.push(u.b.case(
        vec![CaseLabel::Pattern {
            pattern: Pattern::Binding { var: c },
            unconditional: false,
        }],
        CaseKind::Rule,
        vec![on_circle],
    ));
    if cover_square {
        let q = u.b.binding("q", square);
        let on_square = u.b.block(vec![]);
        cases.push(u.b.case(
            vec![CaseLabel::Pattern {
                pattern: Pattern::Binding { var: q },
                unconditional: false,
            }],
            CaseKind::Rule,
            vec![on_square],
        ));
    }
    let switch = u.b.switch(selector, cases);
    let stmt = u.b.stmt(StmtKind::Switch(switch));
    let block = u.b.block(vec![stmt]);
    u.method(vec![s], Type::Void, vec![], block);
    (u.finish(), stmt)
}

#[test]
fn covering_every_permitted_subclass_is_exhaustive() {
    let (env, ..) = sealed_shapes();
    let (body, _) = shape_switch(true);
    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), Vec::<&str>::new());
}

#[test]
fn missing_permitted_subclass_makes_pattern_switch_inexhaustive() {
    let (env, ..) = sealed_shapes();
    let (body, stmt) = shape_switch(false);
    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_SWITCH_STMT_NOT_EXHAUSTIVE"]);
    assert_eq!(result.diagnostics[0].span, Some(body.stmt(stmt).span));
}

#[test]
fn reanalysis_reports_the_same_diagnostics() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let ret = u.b.stmt(StmtKind::Return(None));
    let call = u.b.call("after", vec![], vec![]);
    let after = u.b.expr_stmt(call);
    let inner = u.b.block(vec![ret, after]);
    u.method(vec![], Type::Void, vec![], inner);
    let missing = u.b.block(vec![]);
    u.method(vec![], Type::int(), vec![], missing);
    let body = u.finish();

    let first = run(&body, &env);
    let second = run(&body, &env);
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(
        codes(&first.diagnostics),
        vec!["FLOW_UNREACHABLE", "FLOW_MISSING_RETURN"]
    );
}

#[test]
fn alive_after_follows_both_branches() {
    let env = TypeStore::with_minimal_jdk();
    let mut b = nova_hir::body::BodyBuilder::new();
    let flag = b.param("flag", Type::boolean());

    let ret = b.stmt(StmtKind::Return(None));
    let always = b.block(vec![ret]);

    let cond = b.ident(flag);
    let ret = b.stmt(StmtKind::Return(None));
    let guarded = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: ret,
        else_branch: None,
    });
    let sometimes = b.block(vec![guarded]);
    let body = b.finish();

    assert_eq!(alive_after(&body, &env, always), Ok(false));
    assert_eq!(alive_after(&body, &env, sometimes), Ok(true));
}

#[test]
fn breaks_out_of_sees_only_breaks_leaving_the_loop() {
    let env = TypeStore::with_minimal_jdk();
    let mut b = nova_hir::body::BodyBuilder::new();
    let flag = b.param("flag", Type::boolean());

    // while (flag) { if (flag) break; }
    let outer = b.reserve_stmt();
    let brk = b.stmt(StmtKind::Break {
        label: None,
        target: outer,
    });
    let cond = b.ident(flag);
    let guarded = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: brk,
        else_branch: None,
    });
    let outer_body = b.block(vec![guarded]);
    let cond = b.ident(flag);
    b.define_stmt(
        outer,
        StmtKind::While {
            condition: cond,
            body: outer_body,
        },
    );

    // while (flag) { while (flag) { break; } }
    let other = b.reserve_stmt();
    let inner = b.reserve_stmt();
    let brk = b.stmt(StmtKind::Break {
        label: None,
        target: inner,
    });
    let inner_body = b.block(vec![brk]);
    let cond = b.ident(flag);
    b.define_stmt(
        inner,
        StmtKind::While {
            condition: cond,
            body: inner_body,
        },
    );
    let other_body = b.block(vec![inner]);
    let cond = b.ident(flag);
    b.define_stmt(
        other,
        StmtKind::While {
            condition: cond,
            body: other_body,
        },
    );
    let body = b.finish();

    assert_eq!(breaks_out_of(&body, &env, outer, outer_body), Ok(true));
    assert_eq!(breaks_out_of(&body, &env, other, other_body), Ok(false));
    assert!(matches!(
        breaks_out_of(&body, &env, outer_body, outer_body),
        Err(FlowError::MissingNode { expected: "loop", .. })
    ));
}

#[test]
fn lambda_completion_is_checked_without_diagnostics() {
    let env = TypeStore::with_minimal_jdk();
    let runnable = class_type(&env, "Runnable");
    let mut b = nova_hir::body::BodyBuilder::new();

    let cond = b.bool_lit(true);
    let spin = b.block(vec![]);
    let lp = b.stmt(StmtKind::While {
        condition: cond,
        body: spin,
    });
    let looping = b.block(vec![lp]);
    let looping = b.typed_expr(
        ExprKind::Lambda {
            params: vec![],
            body: LambdaBody::Block(looping),
            descriptor_thrown: vec![],
        },
        runnable.clone(),
    );

    let ret = b.stmt(StmtKind::Return(None));
    let call = b.call("dead", vec![], vec![]);
    let dead = b.expr_stmt(call);
    let broken = b.block(vec![ret, dead]);
    let broken = b.typed_expr(
        ExprKind::Lambda {
            params: vec![],
            body: LambdaBody::Block(broken),
            descriptor_thrown: vec![],
        },
        runnable.clone(),
    );

    let call = b.call("work", vec![], vec![]);
    let work = b.expr_stmt(call);
    let plain = b.block(vec![work]);
    let plain = b.typed_expr(
        ExprKind::Lambda {
            params: vec![],
            body: LambdaBody::Block(plain),
            descriptor_thrown: vec![],
        },
        runnable,
    );
    let not_a_lambda = b.int_lit(1);
    let body = b.finish();

    let quiet = analyze_lambda(&body, &env, looping, false).unwrap();
    assert!(!quiet.completes_normally);
    assert!(quiet.diagnostics.is_empty());

    assert!(analyze_lambda(&body, &env, broken, false).unwrap().diagnostics.is_empty());
    let speculative = analyze_lambda(&body, &env, broken, true).unwrap();
    assert_eq!(codes(&speculative.diagnostics), vec!["FLOW_UNREACHABLE"]);
    assert_eq!(speculative.diagnostics[0].span, Some(body.stmt(dead).span));

    assert!(analyze_lambda(&body, &env, plain, false).unwrap().completes_normally);
    assert!(matches!(
        analyze_lambda(&body, &env, not_a_lambda, false),
        Err(FlowError::MissingNode { expected: "lambda", .. })
    ));
}

/// `return switch (c) { case RED -> { yield 1; } [case GREEN -> { yield 2; }] };`
fn color_switch(cover_green: bool) -> (nova_hir::body::Body, TypeStore, nova_hir::body::ExprId) {
    let mut env = TypeStore::with_minimal_jdk();
    let object = class_type(&env, "Object");
    let color = env.add_class(ClassDef {
        kind: ClassKind::Enum,
        enum_constants: vec!["RED".to_string(), "GREEN".to_string()],
        ..ClassDef::class("Color", Some(object))
    });
    let color_ty = Type::class(color, vec![]);

    let mut u = Unit::new();
    let c = u.b.param("c", color_ty.clone());
    let selector = u.b.ident(c);
    let switch_expr = u.b.reserve_expr();
    let mut cases = Vec::new();
    let constants: &[(&str, i64)] = if cover_green {
        &[("RED", 1), ("GREEN", 2)]
    } else {
        &[("RED", 1)]
    };
    for &(name, value) in constants {
        let label = u.b.typed_expr(
            ExprKind::EnumConstant {
                class: color,
                name: Name::from(name),
            },
            color_ty.clone(),
        );
        let value = u.b.int_lit(value);
        let yielded = u.b.stmt(StmtKind::Yield {
            value,
            target: switch_expr,
        });
        let arm = u.b.block(vec![yielded]);
        cases.push(u.b.case(vec![CaseLabel::Expr(label)], CaseKind::Rule, vec![arm]));
    }
    let switch = u.b.switch(selector, cases);
    u.b.define_expr(switch_expr, ExprKind::SwitchExpr(switch), Type::int());
    let ret = u.b.stmt(StmtKind::Return(Some(switch_expr)));
    let block = u.b.block(vec![ret]);
    u.method(vec![c], Type::int(), vec![], block);
    (u.finish(), env, switch_expr)
}

#[test]
fn switch_expression_over_every_enum_constant_is_exhaustive() {
    let (body, env, _) = color_switch(true);
    assert_eq!(codes(&run(&body, &env).diagnostics), Vec::<&str>::new());

    let (body, env, switch_expr) = color_switch(false);
    let result = run(&body, &env);
    assert_eq!(
        codes(&result.diagnostics),
        vec!["FLOW_SWITCH_EXPR_NOT_EXHAUSTIVE"]
    );
    assert_eq!(result.diagnostics[0].span, Some(body.expr(switch_expr).span));
}

/// `Shape` is a sealed interface permitting `A`, `B` and `C`.
fn sealed_interface() -> (TypeStore, Type, Vec<Type>) {
    let mut env = TypeStore::with_minimal_jdk();
    let subclasses: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|name| env.intern_class_id(name))
        .collect();
    let shape = env.add_class(ClassDef {
        kind: ClassKind::Interface,
        is_abstract: true,
        is_sealed: true,
        permitted_subclasses: subclasses.clone(),
        ..ClassDef::class("Shape", None)
    });
    let shape_ty = Type::class(shape, vec![]);
    for (&id, name) in subclasses.iter().zip(["A", "B", "C"]) {
        env.define_class(
            id,
            ClassDef {
                interfaces: vec![shape_ty.clone()],
                ..ClassDef::class(name, None)
            },
        );
    }
    let subclass_types = subclasses.into_iter().map(|id| Type::class(id, vec![])).collect();
    (env, shape_ty, subclass_types)
}

/// `return switch (s) { case A a -> { yield 0; } ... [default -> { yield 9; }] };`
fn sealed_switch_expr(
    covered: usize,
    with_default: bool,
) -> (nova_hir::body::Body, TypeStore, nova_hir::body::ExprId) {
    let (env, shape, subclasses) = sealed_interface();
    let mut u = Unit::new();
    let s = u.b.param("s", shape);
    let selector = u.b.ident(s);
    let switch_expr = u.b.reserve_expr();
    let mut cases = Vec::new();
    for (value, ty) in subclasses.into_iter().take(covered).enumerate() {
        let var = u.b.binding("v", ty);
        let value = u.b.int_lit(value as i64);
        let yielded = u.b.stmt(StmtKind::Yield {
            value,
            target: switch_expr,
        });
        let arm = u.b.block(vec![yielded]);
        cases.push(u.b.case(
            vec![CaseLabel::Pattern {
                pattern: Pattern::Binding { var },
                unconditional: false,
            }],
            CaseKind::Rule,
            vec![arm],
        ));
    }
    if with_default {
        let value = u.b.int_lit(9);
        let yielded = u.b.stmt(StmtKind::Yield {
            value,
            target: switch_expr,
        });
        let arm = u.b.block(vec![yielded]);
        cases.push(u.b.case(vec![CaseLabel::Default], CaseKind::Rule, vec![arm]));
    }
    let switch = u.b.switch(selector, cases);
    u.b.define_expr(switch_expr, ExprKind::SwitchExpr(switch), Type::int());
    let ret = u.b.stmt(StmtKind::Return(Some(switch_expr)));
    let block = u.b.block(vec![ret]);
    u.method(vec![s], Type::int(), vec![], block);
    (u.finish(), env, switch_expr)
}

#[test]
fn switch_expression_missing_a_sealed_subclass_is_inexhaustive() {
    let (body, env, switch_expr) = sealed_switch_expr(2, false);
    let result = run(&body, &env);
    assert_eq!(
        codes(&result.diagnostics),
        vec!["FLOW_SWITCH_EXPR_NOT_EXHAUSTIVE"]
    );
    assert_eq!(result.diagnostics[0].span, Some(body.expr(switch_expr).span));
}

#[test]
fn switch_expression_over_a_sealed_interface_is_completed_by_the_last_subclass() {
    let (body, env, _) = sealed_switch_expr(3, false);
    assert_eq!(codes(&run(&body, &env).diagnostics), Vec::<&str>::new());
}

#[test]
fn default_completes_a_switch_expression_over_a_sealed_interface() {
    let (body, env, _) = sealed_switch_expr(2, true);
    assert_eq!(codes(&run(&body, &env).diagnostics), Vec::<&str>::new());
}
