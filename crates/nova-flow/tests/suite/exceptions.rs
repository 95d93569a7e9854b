use nova_flow::analyze_lambda_thrown_types;
use nova_hir::body::{BodyBuilder, ExprKind, LambdaBody, MethodKind, Resource, StmtKind};
use nova_types::{Severity, Type, TypeStore};
use pretty_assertions::{assert_eq, assert_ne};

use super::{class_type, codes, run, Unit};

#[test]
fn checked_exception_must_be_caught_or_declared() {
    let env = TypeStore::with_minimal_jdk();
    let io = class_type(&env, "IOException");
    let mut u = Unit::new();
    let call = u.b.call("read", vec![], vec![io.clone()]);
    let stmt = u.b.expr_stmt(call);
    let block = u.b.block(vec![stmt]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_UNREPORTED_EXCEPTION"]);
    assert_eq!(result.diagnostics[0].span, Some(body.expr(call).span));
    assert!(result.diagnostics[0].message.contains("java.io.IOException"));

    let mut u = Unit::new();
    let call = u.b.call("read", vec![], vec![io.clone()]);
    let stmt = u.b.expr_stmt(call);
    let block = u.b.block(vec![stmt]);
    u.method(vec![], Type::Void, vec![io], block);
    let body = u.finish();
    assert_eq!(codes(&run(&body, &env).diagnostics), Vec::<&str>::new());
}

#[test]
fn unchecked_exceptions_need_no_handler() {
    let env = TypeStore::with_minimal_jdk();
    let ise = class_type(&env, "IllegalStateException");
    let mut u = Unit::new();
    let call = u.b.call("check", vec![], vec![ise]);
    let stmt = u.b.expr_stmt(call);
    let block = u.b.block(vec![stmt]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    assert_eq!(codes(&run(&body, &env).diagnostics), Vec::<&str>::new());
}

#[test]
fn subclass_caught_after_its_superclass_is_an_error() {
    let env = TypeStore::with_minimal_jdk();
    let io = class_type(&env, "IOException");
    let fnf = class_type(&env, "FileNotFoundException");
    let mut u = Unit::new();

    let call = u.b.call("open", vec![], vec![fnf.clone()]);
    let stmt = u.b.expr_stmt(call);
    let try_body = u.b.block(vec![stmt]);
    let e1 = u.b.catch_param("e", io.clone());
    let handler1 = u.b.block(vec![]);
    let first = u.b.catch_clause(e1, vec![io], handler1);
    let e2 = u.b.catch_param("e", fnf.clone());
    let handler2 = u.b.block(vec![]);
    let second = u.b.catch_clause(e2, vec![fnf], handler2);
    let second_span = second.span;
    let try_stmt = u.b.stmt(StmtKind::Try {
        resources: vec![],
        body: try_body,
        catches: vec![first, second],
        finally: None,
    });
    let block = u.b.block(vec![try_stmt]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_EXCEPTION_ALREADY_CAUGHT"]);
    assert_eq!(result.diagnostics[0].span, Some(second_span));
}

/// `catch (IOException e) {} catch (IllegalStateException | FileNotFoundException e) {}`
#[test]
fn multi_catch_alternative_is_reported_at_its_own_position() {
    let env = TypeStore::with_minimal_jdk();
    let io = class_type(&env, "IOException");
    let fnf = class_type(&env, "FileNotFoundException");
    let ise = class_type(&env, "IllegalStateException");
    let mut u = Unit::new();

    let call = u.b.call("open", vec![], vec![fnf.clone()]);
    let stmt = u.b.expr_stmt(call);
    let try_body = u.b.block(vec![stmt]);
    let e1 = u.b.catch_param("e", io.clone());
    let handler1 = u.b.block(vec![]);
    let first = u.b.catch_clause(e1, vec![io], handler1);
    let e2 = u.b.multi_catch_param("e", class_type(&env, "Exception"));
    let handler2 = u.b.block(vec![]);
    let second = u.b.catch_clause(e2, vec![ise, fnf], handler2);
    let (clause_span, alternative_span) = (second.span, second.types[1].span);
    let try_stmt = u.b.stmt(StmtKind::Try {
        resources: vec![],
        body: try_body,
        catches: vec![first, second],
        finally: None,
    });
    let block = u.b.block(vec![try_stmt]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_EXCEPTION_ALREADY_CAUGHT"]);
    assert_eq!(result.diagnostics[0].span, Some(alternative_span));
    assert_ne!(alternative_span, clause_span);
}

#[test]
fn catching_an_exception_the_body_cannot_throw_is_an_error() {
    let env = TypeStore::with_minimal_jdk();
    let io = class_type(&env, "IOException");
    let mut u = Unit::new();
    let try_body = u.b.block(vec![]);
    let e = u.b.catch_param("e", io.clone());
    let handler = u.b.block(vec![]);
    let catch = u.b.catch_clause(e, vec![io], handler);
    let try_stmt = u.b.stmt(StmtKind::Try {
        resources: vec![],
        body: try_body,
        catches: vec![catch],
        finally: None,
    });
    let block = u.b.block(vec![try_stmt]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    assert_eq!(
        codes(&run(&body, &env).diagnostics),
        vec!["FLOW_EXCEPTION_NEVER_THROWN"]
    );
}

#[test]
fn catch_left_with_nothing_to_catch_is_a_warning() {
    let env = TypeStore::with_minimal_jdk();
    let io = class_type(&env, "IOException");
    let fnf = class_type(&env, "FileNotFoundException");
    let mut u = Unit::new();

    let call = u.b.call("open", vec![], vec![fnf.clone()]);
    let stmt = u.b.expr_stmt(call);
    let try_body = u.b.block(vec![stmt]);
    let e1 = u.b.catch_param("e", fnf.clone());
    let handler1 = u.b.block(vec![]);
    let first = u.b.catch_clause(e1, vec![fnf], handler1);
    let e2 = u.b.catch_param("e", io.clone());
    let handler2 = u.b.block(vec![]);
    let second = u.b.catch_clause(e2, vec![io], handler2);
    let try_stmt = u.b.stmt(StmtKind::Try {
        resources: vec![],
        body: try_body,
        catches: vec![first, second],
        finally: None,
    });
    let block = u.b.block(vec![try_stmt]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_UNREACHABLE_CATCH"]);
    assert_eq!(result.diagnostics[0].severity, Severity::Warning);
}

#[test]
fn effectively_final_catch_parameter_rethrows_precisely() {
    let env = TypeStore::with_minimal_jdk();
    let exception = class_type(&env, "Exception");
    let fnf = class_type(&env, "FileNotFoundException");
    let mut u = Unit::new();

    let call = u.b.call("open", vec![], vec![fnf.clone()]);
    let stmt = u.b.expr_stmt(call);
    let try_body = u.b.block(vec![stmt]);
    let e = u.b.catch_param("e", exception.clone());
    let rethrown = u.b.ident(e);
    let throw = u.b.stmt(StmtKind::Throw(rethrown));
    let handler = u.b.block(vec![throw]);
    let catch = u.b.catch_clause(e, vec![exception], handler);
    let try_stmt = u.b.stmt(StmtKind::Try {
        resources: vec![],
        body: try_body,
        catches: vec![catch],
        finally: None,
    });
    let block = u.b.block(vec![try_stmt]);
    u.method(vec![], Type::Void, vec![fnf], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(codes(&result.diagnostics), Vec::<&str>::new());
    assert!(result.annotations.is_effectively_final(e));
}

#[test]
fn implicit_close_of_a_resource_throws() {
    let env = TypeStore::with_minimal_jdk();
    let closeable = class_type(&env, "java.io.Closeable");
    let mut u = Unit::new();

    let r = u.b.resource("r", closeable);
    let open = u.b.call("open", vec![], vec![]);
    let try_body = u.b.block(vec![]);
    let try_stmt = u.b.stmt(StmtKind::Try {
        resources: vec![Resource::Var { var: r, init: open }],
        body: try_body,
        catches: vec![],
        finally: None,
    });
    let block = u.b.block(vec![try_stmt]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    let result = run(&body, &env);
    assert_eq!(
        codes(&result.diagnostics),
        vec!["FLOW_UNREPORTED_EXCEPTION_IMPLICIT_CLOSE"]
    );
    assert_eq!(result.diagnostics[0].span, Some(body.var(r).span));
    assert!(result.diagnostics[0].message.contains("`r`"));
}

#[test]
fn generated_constructor_reports_its_implicit_super_call() {
    let env = TypeStore::with_minimal_jdk();
    let io = class_type(&env, "IOException");
    let mut u = Unit::new();
    let call = u.b.call("super", vec![], vec![io]);
    let stmt = u.b.expr_stmt(call);
    let block = u.b.block(vec![stmt]);
    u.method_of_kind(
        MethodKind::Constructor {
            initial: true,
            generated: true,
            compact: false,
        },
        vec![],
        Type::Void,
        vec![],
        block,
    );
    let body = u.finish();

    assert_eq!(
        codes(&run(&body, &env).diagnostics),
        vec!["FLOW_UNREPORTED_EXCEPTION_DEFAULT_CTOR"]
    );
}

#[test]
fn lambda_body_may_throw_what_its_descriptor_declares() {
    let env = TypeStore::with_minimal_jdk();
    let io = class_type(&env, "IOException");
    let runnable = class_type(&env, "Runnable");

    let cases: [(Vec<Type>, Vec<&str>); 2] = [
        (vec![], vec!["FLOW_UNREPORTED_EXCEPTION"]),
        (vec![io.clone()], vec![]),
    ];
    for (declared, expected) in cases {
        let mut u = Unit::new();
        let call = u.b.call("read", vec![], vec![io.clone()]);
        let stmt = u.b.expr_stmt(call);
        let lambda_body = u.b.block(vec![stmt]);
        let lambda = u.b.typed_expr(
            ExprKind::Lambda {
                params: vec![],
                body: LambdaBody::Block(lambda_body),
                descriptor_thrown: declared,
            },
            runnable.clone(),
        );
        let task = u.b.local("task", runnable.clone());
        let decl = u.b.local_var(task, Some(lambda));
        let block = u.b.block(vec![decl]);
        u.method(vec![], Type::Void, vec![], block);
        let body = u.finish();

        let result = run(&body, &env);
        assert_eq!(codes(&result.diagnostics), expected);
        assert_eq!(result.annotations.lambda_thrown(lambda), Some(&[io.clone()][..]));
    }
}

#[test]
fn lambda_thrown_types_exclude_what_the_body_catches() {
    let env = TypeStore::with_minimal_jdk();
    let io = class_type(&env, "IOException");
    let interrupted = class_type(&env, "InterruptedException");
    let runnable = class_type(&env, "Runnable");
    let mut b = BodyBuilder::new();

    // () -> { try { read(); } catch (IOException e) {} sleep(); }
    let read = b.call("read", vec![], vec![io.clone()]);
    let read = b.expr_stmt(read);
    let try_body = b.block(vec![read]);
    let e = b.catch_param("e", io.clone());
    let handler = b.block(vec![]);
    let catch = b.catch_clause(e, vec![io], handler);
    let try_stmt = b.stmt(StmtKind::Try {
        resources: vec![],
        body: try_body,
        catches: vec![catch],
        finally: None,
    });
    let sleep = b.call("sleep", vec![], vec![interrupted.clone()]);
    let sleep = b.expr_stmt(sleep);
    let lambda_body = b.block(vec![try_stmt, sleep]);
    let lambda = b.typed_expr(
        ExprKind::Lambda {
            params: vec![],
            body: LambdaBody::Block(lambda_body),
            descriptor_thrown: vec![],
        },
        runnable,
    );
    let body = b.finish();

    assert_eq!(
        analyze_lambda_thrown_types(&body, &env, lambda),
        Ok(vec![interrupted])
    );
}
