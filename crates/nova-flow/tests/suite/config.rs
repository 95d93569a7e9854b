use nova_flow::{FlowConfig, FlowLints, SpeculativeDiagnostics};
use nova_hir::body::{CaseKind, CaseLabel, StmtKind};
use nova_types::{Severity, Type, TypeStore};
use pretty_assertions::assert_eq;
use serde::Deserialize;

use super::{codes, run, run_with, Unit};

#[derive(Debug, Deserialize)]
struct Settings {
    #[serde(default)]
    flow: FlowConfig,
}

#[test]
fn defaults_match_the_compiler() {
    let config = FlowConfig::default();
    assert!(config.report_unreachable);
    assert_eq!(config.speculative_loop_diagnostics, SpeculativeDiagnostics::Report);
    assert_eq!(
        config.lint,
        FlowLints {
            fallthrough: false,
            finally: false,
            try_resources: false,
            unreachable_catch: true,
        }
    );
}

#[test]
fn flow_table_overrides_only_what_it_names() {
    let settings: Settings = toml::from_str(
        r#"
            [flow]
            report_unreachable = false
            speculative_loop_diagnostics = "discard"

            [flow.lint]
            fallthrough = true
        "#,
    )
    .unwrap();
    let config = settings.flow;
    assert!(!config.report_unreachable);
    assert_eq!(config.speculative_loop_diagnostics, SpeculativeDiagnostics::Discard);
    assert!(config.lint.fallthrough);
    assert!(config.lint.unreachable_catch);
    assert!(!config.lint.finally);
}

#[test]
fn missing_flow_table_means_defaults() {
    let settings: Settings = toml::from_str("").unwrap();
    assert_eq!(settings.flow, FlowConfig::default());
}

#[test]
fn unknown_speculative_mode_is_rejected() {
    let err = toml::from_str::<Settings>("[flow]\nspeculative_loop_diagnostics = \"sometimes\"\n")
        .unwrap_err();
    assert!(err.to_string().contains("sometimes"), "{err}");
}

/// `switch (n) { case 1: first(); case 2: second(); }`
fn falls_through() -> (nova_hir::body::Body, nova_hir::body::Case) {
    let mut u = Unit::new();
    let n = u.b.param("n", Type::int());
    let selector = u.b.ident(n);
    let one = u.b.int_lit(1);
    let first = u.b.call("first", vec![], vec![]);
    let first = u.b.expr_stmt(first);
    let case_one = u.b.case(vec![CaseLabel::Expr(one)], CaseKind::Statement, vec![first]);
    let two = u.b.int_lit(2);
    let second = u.b.call("second", vec![], vec![]);
    let second = u.b.expr_stmt(second);
    let case_two = u.b.case(vec![CaseLabel::Expr(two)], CaseKind::Statement, vec![second]);
    let switch = u.b.switch(selector, vec![case_one, case_two.clone()]);
    let stmt = u.b.stmt(StmtKind::Switch(switch));
    let block = u.b.block(vec![stmt]);
    u.method(vec![n], Type::Void, vec![], block);
    (u.finish(), case_two)
}

#[test]
fn fallthrough_lint_is_opt_in() {
    let env = TypeStore::with_minimal_jdk();
    let (body, second) = falls_through();
    assert_eq!(codes(&run(&body, &env).diagnostics), Vec::<&str>::new());

    let config = FlowConfig {
        lint: FlowLints {
            fallthrough: true,
            ..FlowLints::default()
        },
        ..FlowConfig::default()
    };
    let result = run_with(&body, &env, config);
    assert_eq!(codes(&result.diagnostics), vec!["FLOW_FALLTHROUGH"]);
    assert_eq!(result.diagnostics[0].severity, Severity::Warning);
    assert_eq!(result.diagnostics[0].span, Some(second.span));
}

#[test]
fn unreachable_statements_can_be_silenced() {
    let env = TypeStore::with_minimal_jdk();
    let mut u = Unit::new();
    let ret = u.b.stmt(StmtKind::Return(None));
    let call = u.b.call("after", vec![], vec![]);
    let after = u.b.expr_stmt(call);
    let block = u.b.block(vec![ret, after]);
    u.method(vec![], Type::Void, vec![], block);
    let body = u.finish();

    let config = FlowConfig {
        report_unreachable: false,
        ..FlowConfig::default()
    };
    assert_eq!(codes(&run_with(&body, &env, config).diagnostics), Vec::<&str>::new());
}
