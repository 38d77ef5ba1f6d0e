use godel_cli::driver::{Mode, Session};
use insta::assert_snapshot;

const ARITH: &str = include_str!("programs/arith.gt");
const PAIRS: &str = include_str!("programs/pairs.gt");
const AXIOMS: &str = include_str!("programs/axioms.gt");

fn run(source: &str, mode: Mode) -> String {
    let mut session = Session::new();
    let transcript = session.run_source(source, mode);
    transcript.render()
}

#[test]
fn arith_check() {
    assert_snapshot!(run(ARITH, Mode::Check), @r#"
    add : (-> nat nat nat)
    double : (-> nat nat)
    pred : (-> nat nat)
    mul : (-> nat nat nat)
    (app add (nat 2) (nat 3)) : nat
    (app double (nat 4)) : nat
    (app pred (nat 7)) : nat
    (app mul (nat 3) (nat 4)) : nat
    "#);
}

#[test]
fn arith_eval() {
    assert_snapshot!(run(ARITH, Mode::Eval), @r#"
    add : (-> nat nat nat)
    double : (-> nat nat)
    pred : (-> nat nat)
    mul : (-> nat nat nat)
    (nat 5) : nat
    (nat 8) : nat
    (nat 6) : nat
    (nat 12) : nat
    "#);
}

#[test]
fn pairs_eval() {
    assert_snapshot!(run(PAIRS, Mode::Eval), @r#"
    id : (-> A A)
    swap : (-> (* A B) (* B A))
    not : (-> bool bool)
    even : (-> nat bool)
    (pair true (nat 1)) : (* bool nat)
    true : bool
    (pair false true) : (* bool bool)
    "#);
}

#[test]
fn axioms_check_but_do_not_evaluate() {
    assert_snapshot!(run(AXIOMS, Mode::Check), @r#"
    axiom oracle : (-> nat bool)
    ask : (-> nat bool)
    (app ask (nat 2)) : bool
    "#);
    assert_snapshot!(run(AXIOMS, Mode::Eval), @r#"
    axiom oracle : (-> nat bool)
    ask : (-> nat bool)
    error: evaluation error: constant oracle has no definition
    "#);
}

#[test]
fn definitions_are_inlined_before_evaluation() {
    let mut session = Session::new();
    let transcript = session.run_source(ARITH, Mode::Check);
    assert!(transcript.is_ok());

    // mul refers to add; the stored body no longer does
    let mul = session
        .definition(&"mul".into())
        .expect("mul is defined")
        .to_string();
    assert!(!mul.contains("add"), "{}", mul);
    assert!(mul.contains("(rec 0 (lam (lam (succ 0))) 1)"), "{}", mul);
}

#[test]
fn large_numerals_run_through_the_pipeline() {
    let mut session = Session::new();
    let transcript = session.run_source("(rec zero (lam (lam (succ (succ 0)))) (nat 100000))", Mode::Eval);
    assert_snapshot!(transcript.render(), @"(nat 200000) : nat");
}

#[test]
fn sessions_accumulate_across_sources() {
    let mut session = Session::new();
    assert!(session.run_source(ARITH, Mode::Check).is_ok());
    let transcript = session.run_source("(app double (app add (nat 1) (nat 2)))", Mode::Eval);
    assert_snapshot!(transcript.render(), @"(nat 6) : nat");
}
