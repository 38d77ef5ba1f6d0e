//! First-order unification over simple types.
//!
//! The engine is an explicit worklist loop. Termination rests on the measure
//! `(distinct variables, total size)` of the worklist, compared
//! lexicographically: eliminating a variable removes it from the worklist
//! entirely, while discarding or decomposing a constraint keeps the variable
//! set and strictly shrinks the total size. `Unifier::step` exposes single
//! transitions so the decrease can be observed.
//!
//! Variables marked rigid are never bound. They only unify with themselves
//! or with a flexible variable, which is then bound to them.

use crate::ident::Ident;
use crate::types::{Subst, Type};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnifyError {
    #[error("occurs check: {var} occurs in {ty}")]
    OccursCheck { var: Ident, ty: Rc<Type> },
    #[error("cannot unify {left} with {right}")]
    Mismatch { left: Rc<Type>, right: Rc<Type> },
}

/// Two types that must become equal.
pub type Constraint = (Rc<Type>, Rc<Type>);

/// Termination measure of a worklist, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Measure {
    pub vars: usize,
    pub size: usize,
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.vars, self.size)
    }
}

pub fn measure<'a>(constraints: impl IntoIterator<Item = &'a Constraint>) -> Measure {
    let mut vars = BTreeSet::new();
    let mut size = 0;
    for (t, u) in constraints {
        t.collect_vars(&mut vars);
        u.collect_vars(&mut vars);
        size += t.size() + u.size();
    }
    Measure {
        vars: vars.len(),
        size,
    }
}

/// What a single transition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Both sides were already identical
    Discarded,
    /// A variable was bound and substituted away
    Eliminated,
    /// Matching constructors were split into their components
    Decomposed,
}

#[derive(Debug, Clone)]
pub struct Unifier {
    // Stored reversed: the next constraint to solve is at the end.
    worklist: Vec<Constraint>,
    rigid: BTreeSet<Ident>,
    solution: Subst,
    steps: usize,
}

impl Unifier {
    pub fn new(problem: Vec<Constraint>) -> Self {
        Self::with_rigid(problem, BTreeSet::new())
    }

    pub fn with_rigid(problem: Vec<Constraint>, rigid: BTreeSet<Ident>) -> Self {
        let mut worklist = problem;
        worklist.reverse();
        Unifier {
            worklist,
            rigid,
            solution: Subst::new(),
            steps: 0,
        }
    }

    fn is_flexible(&self, x: &Ident) -> bool {
        !self.rigid.contains(x)
    }

    pub fn is_done(&self) -> bool {
        self.worklist.is_empty()
    }

    pub fn measure(&self) -> Measure {
        measure(&self.worklist)
    }

    pub fn remaining(&self) -> usize {
        self.worklist.len()
    }

    /// Substitution accumulated so far.
    pub fn solution(&self) -> &Subst {
        &self.solution
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Perform one transition. Returns `Ok(None)` once the worklist is empty.
    pub fn step(&mut self) -> Result<Option<Step>, UnifyError> {
        #[cfg(debug_assertions)]
        let before = self.measure();

        let Some((t, u)) = self.worklist.pop() else {
            return Ok(None);
        };
        self.steps += 1;
        trace!(step = self.steps, "unify {} = {}", t, u);

        let step = match (&*t, &*u) {
            (Type::Var(x), Type::Var(y)) if x == y => Step::Discarded,
            (Type::Nat, Type::Nat) | (Type::Bool, Type::Bool) => Step::Discarded,
            (Type::Var(x), _) if self.is_flexible(x) => self.eliminate(x, &u)?,
            (_, Type::Var(x)) if self.is_flexible(x) => self.eliminate(x, &t)?,
            (Type::Fun(a, b), Type::Fun(c, d)) | (Type::Pair(a, b), Type::Pair(c, d)) => {
                self.worklist.push((b.clone(), d.clone()));
                self.worklist.push((a.clone(), c.clone()));
                Step::Decomposed
            }
            _ => {
                return Err(UnifyError::Mismatch {
                    left: t.clone(),
                    right: u.clone(),
                })
            }
        };

        #[cfg(debug_assertions)]
        {
            let after = self.measure();
            debug_assert!(after < before, "measure did not decrease: {} -> {}", before, after);
        }

        Ok(Some(step))
    }

    fn eliminate(&mut self, x: &Ident, ty: &Rc<Type>) -> Result<Step, UnifyError> {
        if ty.occurs(x) {
            return Err(UnifyError::OccursCheck {
                var: x.clone(),
                ty: ty.clone(),
            });
        }
        for (l, r) in self.worklist.iter_mut() {
            *l = l.subst(x, ty);
            *r = r.subst(x, ty);
        }
        self.solution = self.solution.add_left(x.clone(), ty.clone());
        Ok(Step::Eliminated)
    }

    /// Run to completion, yielding the most general unifier.
    pub fn run(mut self) -> Result<Subst, UnifyError> {
        while self.step()?.is_some() {}
        Ok(self.solution)
    }
}

/// Solve every constraint in `problem` simultaneously.
pub fn unify(problem: Vec<Constraint>) -> Result<Subst, UnifyError> {
    unify_with_rigid(problem, &BTreeSet::new())
}

/// As `unify`, but the variables in `rigid` are treated as constants.
pub fn unify_with_rigid(problem: Vec<Constraint>, rigid: &BTreeSet<Ident>) -> Result<Subst, UnifyError> {
    let initial = measure(&problem);
    debug!(constraints = problem.len(), rigid = rigid.len(), measure = %initial, "unify");
    let result = Unifier::with_rigid(problem, rigid.clone()).run();
    if let Err(err) = &result {
        debug!(%err, "unification failed");
    }
    result
}
