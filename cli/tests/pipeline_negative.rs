use godel_cli::diagnostics::render;
use godel_cli::driver::{DriverError, Mode, Session};
use godel_kernel::parser::{ParseErrorKind, Span};
use godel_kernel::TypeError;
use insta::assert_snapshot;

fn run(source: &str) -> (String, Option<DriverError>) {
    let mut session = Session::new();
    let transcript = session.run_source(source, Mode::Eval);
    (transcript.render(), transcript.error)
}

#[test]
fn stops_at_first_ill_typed_form() {
    let (out, err) = run("(def one (nat 1))\n(if one zero zero)\n(def never zero)");
    assert_snapshot!(out, @r#"
    one : nat
    error: type error: type mismatch: cannot unify nat with bool
    "#);
    assert!(matches!(err, Some(DriverError::Type { error: TypeError::Mismatch { .. }, .. })));
}

#[test]
fn definitions_are_not_generalized() {
    let (out, err) = run("(def id (lam 0))\n(app id true)");
    assert_snapshot!(out, @r#"
    id : (-> A A)
    error: type error: type mismatch: cannot unify A with bool
    "#);
    assert_eq!(err.map(|e| e.span()), Some(Span { start: 17, end: 30 }));
}

#[test]
fn oversized_numeral_literals_are_rejected() {
    let (out, _) = run("(nat 4000000000)");
    assert_snapshot!(out, @"error: parse error: integer literal out of range: 4000000000 at 5..15");
}

#[test]
fn occurs_check_is_reported() {
    let (out, _) = run("(def omega (lam (app 0 0)))");
    assert!(out.starts_with("error: type error: occurs check:"), "{}", out);
}

#[test]
fn undeclared_constant_is_reported() {
    let (out, err) = run("(app missing zero)");
    assert_snapshot!(out, @"error: type error: unbound free identifier: missing");
    assert_eq!(err.map(|e| e.span()), Some(Span { start: 0, end: 18 }));
}

#[test]
fn dangling_index_is_reported() {
    let (out, _) = run("(lam 1)");
    assert_snapshot!(out, @"error: type error: bound index 1 out of range at depth 1");
}

#[test]
fn reader_errors_carry_spans() {
    let (_, err) = run("(def two (nat 2))\n(pear two two)");
    match err {
        Some(DriverError::Parse(parse)) => {
            assert_eq!(parse.kind, ParseErrorKind::UnknownForm("pear".to_string()));
            assert_eq!(parse.span, Span { start: 19, end: 23 });
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn rendered_report_points_into_source() {
    let source = "(def flag true)\n(succ flag)\n";
    let (_, err) = run(source);
    let err = err.expect("succ of a boolean is rejected");
    let report = render(&err, "flag.gt", source, false);
    assert!(report.contains("flag.gt"), "{}", report);
    assert!(report.contains("type mismatch: cannot unify bool with nat"), "{}", report);
    assert!(report.contains("(succ flag)"), "{}", report);
}
