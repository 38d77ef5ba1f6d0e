use crate::ident::Ident;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// Simple types of System T.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Nat,
    Bool,
    /// Type variable, resolved by unification
    Var(Ident),
    /// Function type: a -> b
    Fun(Rc<Type>, Rc<Type>),
    /// Product type: a * b
    Pair(Rc<Type>, Rc<Type>),
}

impl Type {
    pub fn nat() -> Rc<Self> {
        Rc::new(Type::Nat)
    }

    pub fn bool() -> Rc<Self> {
        Rc::new(Type::Bool)
    }

    pub fn var(id: impl Into<Ident>) -> Rc<Self> {
        Rc::new(Type::Var(id.into()))
    }

    pub fn fun(dom: Rc<Type>, cod: Rc<Type>) -> Rc<Self> {
        Rc::new(Type::Fun(dom, cod))
    }

    pub fn pair(fst: Rc<Type>, snd: Rc<Type>) -> Rc<Self> {
        Rc::new(Type::Pair(fst, snd))
    }

    /// Replace type variable `x` by `a` throughout `self`.
    pub fn subst(&self, x: &Ident, a: &Rc<Type>) -> Rc<Type> {
        match self {
            Type::Nat => Type::nat(),
            Type::Bool => Type::bool(),
            Type::Var(y) => {
                if y == x {
                    a.clone()
                } else {
                    Type::var(y.clone())
                }
            }
            Type::Fun(d, c) => Type::fun(d.subst(x, a), c.subst(x, a)),
            Type::Pair(l, r) => Type::pair(l.subst(x, a), r.subst(x, a)),
        }
    }

    /// Does type variable `x` occur anywhere in `self`?
    pub fn occurs(&self, x: &Ident) -> bool {
        match self {
            Type::Nat | Type::Bool => false,
            Type::Var(y) => y == x,
            Type::Fun(a, b) | Type::Pair(a, b) => a.occurs(x) || b.occurs(x),
        }
    }

    pub fn vars(&self) -> BTreeSet<Ident> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    pub fn collect_vars(&self, out: &mut BTreeSet<Ident>) {
        match self {
            Type::Nat | Type::Bool => {}
            Type::Var(x) => {
                out.insert(x.clone());
            }
            Type::Fun(a, b) | Type::Pair(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
        }
    }

    /// Number of constructor nodes.
    pub fn size(&self) -> usize {
        match self {
            Type::Nat | Type::Bool | Type::Var(_) => 1,
            Type::Fun(a, b) | Type::Pair(a, b) => 1 + a.size() + b.size(),
        }
    }

    /// One-way matching: find `s` with `s.apply(general) == self`.
    ///
    /// Decides `general ⊑ self`, i.e. whether `self` is an instance of `general`.
    pub fn instance_of(self: &Rc<Self>, general: &Type) -> Option<Subst> {
        let mut found = BTreeMap::new();
        if match_type(general, self, &|_: &Ident| None, &mut found) {
            Some(Subst { map: found })
        } else {
            None
        }
    }
}

/// Match `pattern` against `target`, extending `found`.
///
/// Variables for which `rigid` returns a type are not bindable; they only
/// match targets equal to that type.
fn match_type(
    pattern: &Type,
    target: &Rc<Type>,
    rigid: &dyn Fn(&Ident) -> Option<Rc<Type>>,
    found: &mut BTreeMap<Ident, Rc<Type>>,
) -> bool {
    match (pattern, &**target) {
        (Type::Var(x), _) => {
            if let Some(fixed) = rigid(x) {
                return fixed == *target;
            }
            match found.get(x) {
                Some(bound) => bound == target,
                None => {
                    found.insert(x.clone(), target.clone());
                    true
                }
            }
        }
        (Type::Nat, Type::Nat) | (Type::Bool, Type::Bool) => true,
        (Type::Fun(pd, pc), Type::Fun(td, tc)) | (Type::Pair(pd, pc), Type::Pair(td, tc)) => {
            match_type(pd, td, rigid, found) && match_type(pc, tc, rigid, found)
        }
        _ => false,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Nat => write!(f, "nat"),
            Type::Bool => write!(f, "bool"),
            Type::Var(x) => write!(f, "{}", x),
            Type::Fun(a, b) => {
                write!(f, "(-> {}", a)?;
                let mut cod = b;
                while let Type::Fun(next_dom, next_cod) = &**cod {
                    write!(f, " {}", next_dom)?;
                    cod = next_cod;
                }
                write!(f, " {})", cod)
            }
            Type::Pair(a, b) => write!(f, "(* {} {})", a, b),
        }
    }
}

/// Finite map from type variables to types, applied simultaneously.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subst {
    map: BTreeMap<Ident, Rc<Type>>,
}

impl Subst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(x: Ident, t: Rc<Type>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(x, t);
        Subst { map }
    }

    pub fn get(&self, x: &Ident) -> Option<&Rc<Type>> {
        self.map.get(x)
    }

    pub fn contains(&self, x: &Ident) -> bool {
        self.map.contains_key(x)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ident, &Rc<Type>)> {
        self.map.iter()
    }

    /// Apply every binding in one traversal; unmapped variables are kept.
    pub fn apply(&self, t: &Type) -> Rc<Type> {
        match t {
            Type::Nat => Type::nat(),
            Type::Bool => Type::bool(),
            Type::Var(x) => match self.map.get(x) {
                Some(a) => a.clone(),
                None => Type::var(x.clone()),
            },
            Type::Fun(a, b) => Type::fun(self.apply(a), self.apply(b)),
            Type::Pair(a, b) => Type::pair(self.apply(a), self.apply(b)),
        }
    }

    /// `self` followed by `then`: `r.compose(s).apply(t) == s.apply(&r.apply(t))`.
    ///
    /// Where both maps bind a variable, the binding from `self` wins.
    pub fn compose(&self, then: &Subst) -> Subst {
        let mut map: BTreeMap<Ident, Rc<Type>> = self
            .map
            .iter()
            .map(|(x, t)| (x.clone(), then.apply(t)))
            .collect();
        for (x, t) in &then.map {
            map.entry(x.clone()).or_insert_with(|| t.clone());
        }
        Subst { map }
    }

    /// Insert `x := t`, substituting `t` for `x` through the existing entries.
    pub fn add_left(&self, x: Ident, t: Rc<Type>) -> Subst {
        debug_assert!(!t.occurs(&x), "binding {} would be cyclic", x);
        let mut map: BTreeMap<Ident, Rc<Type>> = self
            .map
            .iter()
            .map(|(y, u)| (y.clone(), u.subst(&x, &t)))
            .collect();
        map.entry(x).or_insert(t);
        Subst { map }
    }

    /// Insert `x := self(t)`, leaving existing entries untouched.
    pub fn add_right(&self, x: Ident, t: Rc<Type>) -> Subst {
        let t = self.apply(&t);
        debug_assert!(!t.occurs(&x), "binding {} would be cyclic", x);
        let mut map = self.map.clone();
        map.insert(x, t);
        Subst { map }
    }

    /// Find `u` with `general.compose(&u)` agreeing with `self` on every variable.
    ///
    /// A witness exists exactly when `self` is a refinement of `general`.
    pub fn refines(&self, general: &Subst) -> Option<Subst> {
        let rigid = |y: &Ident| -> Option<Rc<Type>> {
            if general.contains(y) {
                None
            } else {
                Some(self.map.get(y).cloned().unwrap_or_else(|| Type::var(y.clone())))
            }
        };
        let mut found: BTreeMap<Ident, Rc<Type>> = self
            .map
            .iter()
            .filter(|(y, _)| !general.contains(y))
            .map(|(y, t)| (y.clone(), t.clone()))
            .collect();
        for (x, pattern) in &general.map {
            let target = self.map.get(x).cloned().unwrap_or_else(|| Type::var(x.clone()));
            if !match_type(pattern, &target, &rigid, &mut found) {
                return None;
            }
        }
        Some(Subst { map: found })
    }
}

impl FromIterator<(Ident, Rc<Type>)> for Subst {
    fn from_iter<I: IntoIterator<Item = (Ident, Rc<Type>)>>(iter: I) -> Self {
        Subst {
            map: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Subst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (x, t)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} := {}", x, t)?;
        }
        write!(f, "}}")
    }
}
