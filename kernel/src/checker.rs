use crate::context::Context;
use crate::ident::{Ident, NameSupply};
use crate::term::Term;
use crate::types::{Subst, Type};
use crate::unify::{unify_with_rigid, UnifyError};
use std::collections::BTreeSet;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("occurs check: {var} occurs in {ty}")]
    OccursCheck { var: Ident, ty: Rc<Type> },
    #[error("type mismatch: cannot unify {left} with {right}")]
    Mismatch { left: Rc<Type>, right: Rc<Type> },
    #[error("unbound free identifier: {0}")]
    UnboundFree(Ident),
    #[error("bound index {index} out of range at depth {depth}")]
    BoundOutOfRange { index: usize, depth: usize },
}

impl From<UnifyError> for TypeError {
    fn from(err: UnifyError) -> Self {
        match err {
            UnifyError::OccursCheck { var, ty } => TypeError::OccursCheck { var, ty },
            UnifyError::Mismatch { left, right } => TypeError::Mismatch { left, right },
        }
    }
}

/// Type reconstruction by structural recursion, solving equalities with the
/// unifier as each rule demands them.
///
/// Every `(s, ty)` pair returned by `infer` satisfies `s.apply(&ty) == ty`.
///
/// Declared constants are monomorphic: the type variables in their types are
/// rigid and never bound by the solution.
#[derive(Debug, Default)]
pub struct Checker {
    supply: NameSupply,
    rigid: BTreeSet<Ident>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> Rc<Type> {
        Rc::new(Type::Var(self.supply.fresh()))
    }

    fn unify(&self, left: &Rc<Type>, right: &Rc<Type>) -> Result<Subst, TypeError> {
        Ok(unify_with_rigid(vec![(left.clone(), right.clone())], &self.rigid)?)
    }

    pub fn infer(&mut self, ctx: &Context, term: &Term) -> Result<(Subst, Rc<Type>), TypeError> {
        self.rigid = ctx.declared_vars();
        self.supply.avoid(&ctx.vars());
        self.infer_term(ctx, term)
    }

    fn infer_term(&mut self, ctx: &Context, term: &Term) -> Result<(Subst, Rc<Type>), TypeError> {
        match term {
            Term::BVar(idx) => match ctx.get(*idx) {
                Some(ty) => Ok((Subst::new(), ty)),
                None => Err(TypeError::BoundOutOfRange {
                    index: *idx,
                    depth: ctx.depth(),
                }),
            },
            Term::FVar(name) => match ctx.lookup_free(name) {
                Some(ty) => Ok((Subst::new(), ty)),
                None => Err(TypeError::UnboundFree(name.clone())),
            },
            Term::Abs(body) => {
                let param = self.fresh();
                let (s, body_ty) = self.infer_term(&ctx.push(param.clone()), body)?;
                Ok((s.clone(), Type::fun(s.apply(&param), body_ty)))
            }
            Term::App(f, a) => {
                let (s1, f_ty) = self.infer_term(ctx, f)?;
                let (s2, a_ty) = self.infer_term(&ctx.apply(&s1), a)?;
                let result = self.fresh();
                let s3 = self.unify(&s2.apply(&f_ty), &Type::fun(a_ty, result.clone()))?;
                Ok((s1.compose(&s2).compose(&s3), s3.apply(&result)))
            }
            Term::Pair(a, b) => {
                let (s1, a_ty) = self.infer_term(ctx, a)?;
                let (s2, b_ty) = self.infer_term(&ctx.apply(&s1), b)?;
                Ok((s1.compose(&s2), Type::pair(s2.apply(&a_ty), b_ty)))
            }
            Term::Fst(p) | Term::Snd(p) => {
                let (s1, p_ty) = self.infer_term(ctx, p)?;
                let (left, right) = (self.fresh(), self.fresh());
                let s2 = self.unify(&p_ty, &Type::pair(left.clone(), right.clone()))?;
                let projected = if matches!(term, Term::Fst(_)) { left } else { right };
                Ok((s1.compose(&s2), s2.apply(&projected)))
            }
            Term::True | Term::False => Ok((Subst::new(), Type::bool())),
            Term::If(c, t, e) => {
                let (s1, c_ty) = self.infer_term(ctx, c)?;
                let s = s1.compose(&self.unify(&c_ty, &Type::bool())?);
                let (s2, t_ty) = self.infer_term(&ctx.apply(&s), t)?;
                let s = s.compose(&s2);
                let (s3, e_ty) = self.infer_term(&ctx.apply(&s), e)?;
                let s = s.compose(&s3);
                let s4 = self.unify(&s3.apply(&t_ty), &e_ty)?;
                Ok((s.compose(&s4), s4.apply(&e_ty)))
            }
            Term::Zero => Ok((Subst::new(), Type::nat())),
            Term::Succ(_) => {
                // succ^n e : nat exactly when e : nat
                let (base, _) = term.peel_succ();
                let (s1, e_ty) = self.infer_term(ctx, base)?;
                let s2 = self.unify(&e_ty, &Type::nat())?;
                Ok((s1.compose(&s2), Type::nat()))
            }
            Term::Rec(base, step, scrutinee) => {
                // base : A, step : Nat -> A -> A, scrutinee : Nat; result A
                let (s, base_ty) = self.infer_term(ctx, base)?;
                let (s1, step_ty) = self.infer_term(&ctx.apply(&s), step)?;
                let s = s.compose(&s1);
                let acc = s1.apply(&base_ty);
                let s2 = self.unify(&step_ty, &Type::fun(Type::nat(), Type::fun(acc.clone(), acc.clone())))?;
                let s = s.compose(&s2);
                let acc = s2.apply(&acc);
                let (s3, n_ty) = self.infer_term(&ctx.apply(&s), scrutinee)?;
                let s = s.compose(&s3);
                let acc = s3.apply(&acc);
                let s4 = self.unify(&n_ty, &Type::nat())?;
                Ok((s.compose(&s4), s4.apply(&acc)))
            }
        }
    }

    /// Infer a type for `term` and equate it with `expected`.
    pub fn check(&mut self, ctx: &Context, term: &Term, expected: &Rc<Type>) -> Result<Subst, TypeError> {
        let (s1, ty) = self.infer(ctx, term)?;
        let s2 = self.unify(&ty, &s1.apply(expected))?;
        Ok(s1.compose(&s2))
    }
}

/// Reconstruct the type of `term` under `ctx`.
///
/// Returns the inferred type (with the solving substitution already applied)
/// together with that substitution.
pub fn type_check(term: &Term, ctx: &Context) -> Result<(Rc<Type>, Subst), TypeError> {
    debug!(%term, depth = ctx.depth(), "type_check");
    let mut checker = Checker::new();
    let (s, ty) = checker.infer(ctx, term)?;
    debug!(ty = %ty, bindings = s.len(), "type_check done");
    Ok((ty, s))
}
