use crate::ident::Ident;
use crate::types::{Subst, Type};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Typing environment: a stack of bound-variable types plus the types of
/// declared free constants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    // Most recently pushed slot is last; de Bruijn index 0 reads from the end.
    bound: Vec<Rc<Type>>,
    free: BTreeMap<Ident, Rc<Type>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a binder whose variable has type `ty`.
    pub fn push(&self, ty: Rc<Type>) -> Self {
        let mut bound = self.bound.clone();
        bound.push(ty);
        Context {
            bound,
            free: self.free.clone(),
        }
    }

    /// Declare (or redeclare) a free constant.
    pub fn with_free(&self, name: Ident, ty: Rc<Type>) -> Self {
        let mut free = self.free.clone();
        free.insert(name, ty);
        Context {
            bound: self.bound.clone(),
            free,
        }
    }

    pub fn declare(&mut self, name: Ident, ty: Rc<Type>) {
        self.free.insert(name, ty);
    }

    pub fn get(&self, idx: usize) -> Option<Rc<Type>> {
        // de Bruijn index: 0 is the most recently pushed
        if idx < self.bound.len() {
            Some(self.bound[self.bound.len() - 1 - idx].clone())
        } else {
            None
        }
    }

    pub fn lookup_free(&self, name: &Ident) -> Option<Rc<Type>> {
        self.free.get(name).cloned()
    }

    /// Number of enclosing binders.
    pub fn depth(&self) -> usize {
        self.bound.len()
    }

    pub fn free_bindings(&self) -> impl Iterator<Item = (&Ident, &Rc<Type>)> {
        self.free.iter()
    }

    /// Type variables mentioned by declared constants. Declarations are
    /// never refined, so these stand for fixed unknown types.
    pub fn declared_vars(&self) -> BTreeSet<Ident> {
        let mut out = BTreeSet::new();
        for ty in self.free.values() {
            ty.collect_vars(&mut out);
        }
        out
    }

    /// Every type variable in the context, bound slots included.
    pub fn vars(&self) -> BTreeSet<Ident> {
        let mut out = self.declared_vars();
        for ty in &self.bound {
            ty.collect_vars(&mut out);
        }
        out
    }

    /// Apply `f` to every bound slot and every free binding.
    pub fn map_types(&self, mut f: impl FnMut(&Rc<Type>) -> Rc<Type>) -> Self {
        Context {
            bound: self.bound.iter().map(&mut f).collect(),
            free: self.free.iter().map(|(x, t)| (x.clone(), f(t))).collect(),
        }
    }

    /// Apply a resolved substitution to the bound slots. Free constants are
    /// monomorphic declarations and keep their types.
    pub fn apply(&self, s: &Subst) -> Self {
        Context {
            bound: self.bound.iter().map(|t| s.apply(t)).collect(),
            free: self.free.clone(),
        }
    }

    /// Is `self` an instance of `general` under `s`?
    ///
    /// Every bound slot of `general` must become the matching slot of `self`
    /// under `s`, and every free binding of `general` must appear unchanged.
    pub fn is_instance_of(&self, general: &Context, s: &Subst) -> bool {
        self.bound.len() == general.bound.len()
            && general
                .bound
                .iter()
                .zip(&self.bound)
                .all(|(g, h)| s.apply(g) == *h)
            && general
                .free
                .iter()
                .all(|(x, t)| self.free.get(x) == Some(t))
    }
}
