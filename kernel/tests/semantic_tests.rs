//! End-to-end behaviour of the kernel: reading, type reconstruction,
//! unification and evaluation working together.

use godel_kernel::parser::{parse_term, parse_type};
use godel_kernel::{
    evaluate, type_check, unify, Context, Ident, Subst, Term, Type, TypeError, UnifyError,
};
use insta::assert_snapshot;
use std::rc::Rc;

fn infer_closed(src: &str) -> Rc<Type> {
    let term = parse_term(src).expect("Failed to parse");
    type_check(&term, &Context::new()).expect("Type check failed").0
}

fn eval_src(src: &str) -> String {
    let term = parse_term(src).expect("Failed to parse");
    type_check(&term, &Context::new()).expect("Type check failed");
    evaluate(&term).to_string()
}

// =============================================================================
// TYPE RECONSTRUCTION
// =============================================================================

#[test]
fn identity_infers_arrow_from_fresh_variable() {
    let ty = infer_closed("(lam 0)");
    let x = match &*ty {
        Type::Fun(dom, _) => match &**dom {
            Type::Var(x) => x.clone(),
            other => panic!("expected a type variable, got {}", other),
        },
        other => panic!("expected a function type, got {}", other),
    };
    assert!(x.is_fresh());
    assert_eq!(ty, Type::fun(Type::var(x.clone()), Type::var(x)));
    assert_snapshot!(ty.to_string(), @"(-> ?0 ?0)");
}

#[test]
fn const_combinator_keeps_parameters_apart() {
    assert_snapshot!(infer_closed("(lam (lam 1))").to_string(), @"(-> ?0 ?1 ?0)");
}

#[test]
fn composition_type() {
    // \f. \g. \x. f (g x)
    let ty = infer_closed("(lam (lam (lam (app 2 (app 1 0)))))");
    let general = parse_type("(-> (-> B C) (-> A B) A C)").expect("Failed to parse");
    assert!(ty.instance_of(&general).is_some());
    assert!(general.instance_of(&ty).is_some());
}

#[test]
fn doubling_function_type() {
    let ty = infer_closed("(lam (rec zero (lam (lam (succ (succ 0)))) 0))");
    assert_eq!(ty, Type::fun(Type::nat(), Type::nat()));
}

#[test]
fn substitution_is_returned_alongside_type() {
    let term = parse_term("(lam (if 0 (nat 1) zero))").expect("Failed to parse");
    let (ty, s) = type_check(&term, &Context::new()).expect("Type check failed");
    assert_eq!(ty, Type::fun(Type::bool(), Type::nat()));
    assert!(!s.is_empty());
    assert_eq!(s.apply(&ty), ty);
}

#[test]
fn free_constants_use_context_types() {
    let ctx = Context::new()
        .with_free(Ident::new("is_zero"), parse_type("(-> nat bool)").expect("type"))
        .with_free(Ident::new("two"), Type::nat());
    let term = parse_term("(pair (app is_zero two) (lam (app is_zero 0)))").expect("term");
    let (ty, _) = type_check(&term, &ctx).expect("Type check failed");
    assert_snapshot!(ty.to_string(), @"(* bool (-> nat bool))");
}

#[test]
fn open_term_checks_under_matching_context() {
    let ctx = Context::new().push(Type::nat()).push(Type::bool());
    let term = parse_term("(if 0 1 zero)").expect("term");
    let (ty, _) = type_check(&term, &ctx).expect("Type check failed");
    assert_eq!(ty, Type::nat());
}

#[test]
fn resolved_context_is_an_instance_of_the_original() {
    let x = Type::var("X");
    let ctx = Context::new().push(x.clone());
    let term = parse_term("(succ 0)").expect("term");
    let (_, s) = type_check(&term, &ctx).expect("Type check failed");
    assert_eq!(s.apply(&x), Type::nat());
    assert!(ctx.apply(&s).is_instance_of(&ctx, &s));
}

// =============================================================================
// UNIFICATION
// =============================================================================

#[test]
fn unify_function_codomain_with_bool() {
    let s = unify(vec![(
        parse_type("(-> nat X)").expect("type"),
        parse_type("(-> nat bool)").expect("type"),
    )])
    .expect("unifiable");
    assert_eq!(s, Subst::singleton(Ident::new("X"), Type::bool()));
}

#[test]
fn unify_nat_with_bool_fails() {
    let err = unify(vec![(Type::nat(), Type::bool())]).unwrap_err();
    assert_eq!(
        err,
        UnifyError::Mismatch {
            left: Type::nat(),
            right: Type::bool()
        }
    );
    assert_snapshot!(err.to_string(), @"cannot unify nat with bool");
}

#[test]
fn unify_occurs_check() {
    let x = Type::var("X");
    let err = unify(vec![(x.clone(), Type::fun(x, Type::nat()))]).unwrap_err();
    assert!(matches!(&err, UnifyError::OccursCheck { var, .. } if *var == Ident::new("X")));
    assert_snapshot!(err.to_string(), @"occurs check: X occurs in (-> X nat)");
}

#[test]
fn most_general_unifier_factors_other_solutions() {
    let problem = vec![(
        parse_type("(-> X (* Y Y))").expect("type"),
        parse_type("(-> (* Z nat) W)").expect("type"),
    )];
    let mgu = unify(problem.clone()).expect("unifiable");

    let specific: Subst = vec![
        (Ident::new("X"), parse_type("(* bool nat)").expect("type")),
        (Ident::new("Z"), Type::bool()),
        (Ident::new("Y"), Type::bool()),
        (Ident::new("W"), parse_type("(* bool bool)").expect("type")),
    ]
    .into_iter()
    .collect();
    for (l, r) in &problem {
        assert_eq!(specific.apply(l), specific.apply(r));
    }
    let witness = specific.refines(&mgu).expect("every solution factors through the mgu");
    for name in ["X", "Y", "Z", "W"] {
        let v = Type::var(name);
        assert_eq!(mgu.compose(&witness).apply(&v), specific.apply(&v));
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

#[test]
fn identity_applied_to_zero_evaluates_to_zero() {
    let term = Term::app(Term::abs(Term::bvar(0)), Term::zero());
    assert_eq!(evaluate(&term), Term::zero());
}

#[test]
fn recursor_step_receives_predecessor_first() {
    // rec zero (\p. \acc. succ p) 2 = succ 1
    let term = Term::rec(
        Term::zero(),
        Term::abs(Term::abs(Term::succ(Term::bvar(1)))),
        Term::succ(Term::succ(Term::zero())),
    );
    assert_eq!(evaluate(&term), Term::numeral(2));
}

#[test]
fn recursor_doubles_two() {
    let term = Term::rec(
        Term::zero(),
        Term::abs(Term::abs(Term::succ(Term::succ(Term::bvar(0))))),
        Term::succ(Term::succ(Term::zero())),
    );
    assert_eq!(
        evaluate(&term),
        Term::succ(Term::succ(Term::succ(Term::succ(Term::zero()))))
    );
}

#[test]
fn addition_via_recursor() {
    // add = \m. \n. rec n (\p. \acc. succ acc) m
    let add = "(lam (lam (rec 0 (lam (lam (succ 0))) 1)))";
    assert_snapshot!(eval_src(&format!("(app {} (nat 3) (nat 4))", add)), @"(nat 7)");
}

#[test]
fn predecessor_via_recursor() {
    let pred = "(lam (rec zero (lam (lam 1)) 0))";
    assert_snapshot!(eval_src(&format!("(app {} (nat 5))", pred)), @"(nat 4)");
    assert_snapshot!(eval_src(&format!("(app {} zero)", pred)), @"zero");
}

#[test]
fn is_even_via_recursor() {
    let even = "(lam (rec true (lam (lam (if 0 false true))) 0))";
    assert_snapshot!(eval_src(&format!("(app {} (nat 6))", even)), @"true");
    assert_snapshot!(eval_src(&format!("(app {} (nat 3))", even)), @"false");
}

#[test]
fn higher_order_iteration() {
    // iterate f n x = rec x (\p. \acc. f acc) n ; apply succ-succ three times to 1
    let src = "(app (lam (lam (lam (rec 0 (lam (lam (app 4 0))) 1)))) (lam (succ (succ 0))) (nat 3) (nat 1))";
    assert_snapshot!(eval_src(src), @"(nat 7)");
}

#[test]
fn evaluation_preserves_inferred_type() {
    let src = "(app (lam (pair (snd 0) (fst 0))) (pair (nat 2) false))";
    let term = parse_term(src).expect("term");
    let (ty, _) = type_check(&term, &Context::new()).expect("Type check failed");
    let value = evaluate(&term);
    let (value_ty, _) = type_check(&value, &Context::new()).expect("values type check");
    assert_eq!(ty, value_ty);
    assert_snapshot!(value.to_string(), @"(pair false (nat 2))");
}

#[test]
fn definitions_inline_through_free_substitution() {
    use godel_kernel::FreeSubst;

    let double = parse_term("(lam (rec zero (lam (lam (succ (succ 0)))) 0))").expect("term");
    let ctx = Context::new().with_free(Ident::new("double"), Type::fun(Type::nat(), Type::nat()));
    let term = parse_term("(lam (app double (app double 0)))").expect("term");
    let (ty, _) = type_check(&term, &ctx).expect("Type check failed");
    assert_eq!(ty, Type::fun(Type::nat(), Type::nat()));

    let defs: FreeSubst = vec![(Ident::new("double"), double)].into_iter().collect();
    let inlined = Term::app(term.subst_free_many(&defs), Term::numeral(3));
    assert!(inlined.closed());
    assert_eq!(evaluate(&inlined), Term::numeral(12));
}

#[test]
fn malformed_terms_are_reported_before_evaluation() {
    let err = type_check(&Term::bvar(0), &Context::new()).unwrap_err();
    assert_eq!(err, TypeError::BoundOutOfRange { index: 0, depth: 0 });
    assert!(!Term::bvar(0).closed());
}

// =============================================================================
// LARGE NUMERALS
// =============================================================================

#[test]
fn large_numerals_check_and_evaluate() {
    let literal = parse_term("(nat 100000)").expect("term");
    assert_eq!(type_check(&literal, &Context::new()).expect("well typed").0, Type::nat());
    assert_eq!(evaluate(&literal).as_numeral(), Some(100_000));

    let doubled = parse_term("(rec zero (lam (lam (succ (succ 0)))) (nat 100000))").expect("term");
    assert_eq!(type_check(&doubled, &Context::new()).expect("well typed").0, Type::nat());
    assert_eq!(evaluate(&doubled).as_numeral(), Some(200_000));

    // the step returns its predecessor argument plus one
    let counted = parse_term("(rec zero (lam (lam (succ 1))) (nat 100000))").expect("term");
    assert_eq!(evaluate(&counted).as_numeral(), Some(100_000));
}
