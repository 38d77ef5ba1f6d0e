use crate::ident::Ident;
use crate::term::Term;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

/// Shapes the evaluator cannot reduce. Type checking rules all of them out,
/// so seeing one means a caller skipped the checker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("cannot evaluate open term: bound index {0} has no binder")]
    OpenTerm(usize),
    #[error("constant {0} has no definition")]
    UnresolvedConstant(Ident),
    #[error("expected a function, got {0}")]
    NotAFunction(Rc<Term>),
    #[error("expected a boolean, got {0}")]
    NotABool(Rc<Term>),
    #[error("expected a numeral, got {0}")]
    NotANat(Rc<Term>),
    #[error("expected a pair, got {0}")]
    NotAPair(Rc<Term>),
}

/// Call-by-value evaluation of a closed term to a value.
pub fn try_evaluate(term: &Rc<Term>) -> Result<Rc<Term>, EvalError> {
    if let Some(index) = first_escaping_index(term, 0) {
        return Err(EvalError::OpenTerm(index));
    }
    let value = Machine::default().eval(term)?;
    debug!(%value, "evaluated");
    Ok(value)
}

/// Evaluate a closed, well-typed term.
///
/// # Panics
///
/// Panics if `term` is open or ill-typed; both are ruled out by `type_check`.
pub fn evaluate(term: &Rc<Term>) -> Rc<Term> {
    match try_evaluate(term) {
        Ok(value) => value,
        Err(err) => panic!("evaluate called on a term that does not type check: {}", err),
    }
}

fn first_escaping_index(term: &Term, depth: usize) -> Option<usize> {
    match term {
        Term::BVar(n) if *n >= depth => Some(*n - depth),
        Term::BVar(_) | Term::FVar(_) | Term::True | Term::False | Term::Zero => None,
        Term::Abs(body) => first_escaping_index(body, depth + 1),
        Term::Succ(_) => first_escaping_index(term.peel_succ().0, depth),
        Term::Fst(e) | Term::Snd(e) => first_escaping_index(e, depth),
        Term::App(a, b) | Term::Pair(a, b) => {
            first_escaping_index(a, depth).or_else(|| first_escaping_index(b, depth))
        }
        Term::If(a, b, c) | Term::Rec(a, b, c) => first_escaping_index(a, depth)
            .or_else(|| first_escaping_index(b, depth))
            .or_else(|| first_escaping_index(c, depth)),
    }
}

/// Evaluator state: the values currently substituted into the term being
/// reduced. A subterm that is one of them is returned without another walk,
/// which keeps numerals passed around by `rec` from being re-evaluated.
#[derive(Debug, Default)]
struct Machine {
    values: Vec<Rc<Term>>,
}

impl Machine {
    fn is_value(&self, t: &Rc<Term>) -> bool {
        self.values.iter().any(|v| Rc::ptr_eq(v, t))
    }

    fn eval(&mut self, t: &Rc<Term>) -> Result<Rc<Term>, EvalError> {
        if self.is_value(t) {
            return Ok(t.clone());
        }
        match &**t {
            Term::FVar(x) => Err(EvalError::UnresolvedConstant(x.clone())),
            Term::BVar(n) => Err(EvalError::OpenTerm(*n)),
            Term::Abs(_) | Term::True | Term::False | Term::Zero => Ok(t.clone()),
            Term::App(f, a) => {
                let f = self.eval(f)?;
                let a = self.eval(a)?;
                self.apply(f, &a)
            }
            Term::Pair(a, b) => {
                let a = self.eval(a)?;
                Ok(Term::pair(a, self.eval(b)?))
            }
            Term::Fst(p) => {
                let p = self.eval(p)?;
                match &*p {
                    Term::Pair(a, _) => Ok(a.clone()),
                    _ => Err(EvalError::NotAPair(p.clone())),
                }
            }
            Term::Snd(p) => {
                let p = self.eval(p)?;
                match &*p {
                    Term::Pair(_, b) => Ok(b.clone()),
                    _ => Err(EvalError::NotAPair(p.clone())),
                }
            }
            Term::If(c, then_branch, else_branch) => {
                let c = self.eval(c)?;
                match &*c {
                    Term::True => self.eval(then_branch),
                    Term::False => self.eval(else_branch),
                    _ => Err(EvalError::NotABool(c.clone())),
                }
            }
            Term::Succ(_) => self.eval_succ(t),
            Term::Rec(base, step, scrutinee) => {
                let n = self.eval(scrutinee)?;
                let Some(count) = n.as_numeral() else {
                    return Err(EvalError::NotANat(n));
                };
                // rec b s 0 = b; rec b s (k+1) = s k (rec b s k), unrolled bottom-up
                let step = self.eval(step)?;
                let mut acc = self.eval(base)?;
                let mut pred = Term::zero();
                for _ in 0..count {
                    self.values.push(pred.clone());
                    let partial = self.apply(step.clone(), &pred);
                    let next = partial.and_then(|partial| self.apply(partial, &acc));
                    self.values.pop();
                    acc = next?;
                    pred = Term::succ(pred);
                }
                Ok(acc)
            }
        }
    }

    /// Walk a `Succ` chain with a loop, stopping at the first node already
    /// known to be a value.
    fn eval_succ(&mut self, t: &Rc<Term>) -> Result<Rc<Term>, EvalError> {
        let mut count = 0;
        let mut cur = t;
        while let Term::Succ(inner) = &**cur {
            if self.is_value(inner) {
                return Ok(t.clone());
            }
            count += 1;
            cur = inner;
        }
        if let Term::Zero = **cur {
            return Ok(t.clone());
        }
        let mut value = self.eval(cur)?;
        for _ in 0..count {
            value = Term::succ(value);
        }
        Ok(value)
    }

    fn apply(&mut self, f: Rc<Term>, arg: &Rc<Term>) -> Result<Rc<Term>, EvalError> {
        match &*f {
            Term::Abs(body) => {
                // values are closed, so the argument is shared without shifting
                let reduct = if self.is_value(body) {
                    body.clone()
                } else {
                    body.subst_closed(0, arg, &|u| self.is_value(u))
                };
                self.values.push(arg.clone());
                let result = self.eval(&reduct);
                self.values.pop();
                result
            }
            _ => Err(EvalError::NotAFunction(f.clone())),
        }
    }
}
