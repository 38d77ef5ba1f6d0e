use crate::ident::Ident;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// The terms of System T.
///
/// Bound variables are de Bruijn indices; free constants are named. The two
/// are kept apart because their substitution rules differ: indices are
/// renumbered when a binder disappears, names are only looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Declared free constant
    FVar(Ident),
    /// Bound variable (de Bruijn index)
    BVar(usize),
    /// Lambda abstraction: \. body
    Abs(Rc<Term>),
    /// Application: (f a)
    App(Rc<Term>, Rc<Term>),
    Pair(Rc<Term>, Rc<Term>),
    Fst(Rc<Term>),
    Snd(Rc<Term>),
    True,
    False,
    /// Conditional: if c then t else e
    If(Rc<Term>, Rc<Term>, Rc<Term>),
    Zero,
    Succ(Rc<Term>),
    /// Primitive recursor: rec base step scrutinee
    Rec(Rc<Term>, Rc<Term>, Rc<Term>),
}

// Helper constructors for convenience
impl Term {
    pub fn fvar(id: impl Into<Ident>) -> Rc<Self> {
        Rc::new(Term::FVar(id.into()))
    }

    pub fn bvar(n: usize) -> Rc<Self> {
        Rc::new(Term::BVar(n))
    }

    pub fn abs(body: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Abs(body))
    }

    pub fn app(f: Rc<Term>, a: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::App(f, a))
    }

    pub fn pair(a: Rc<Term>, b: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Pair(a, b))
    }

    pub fn fst(p: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Fst(p))
    }

    pub fn snd(p: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Snd(p))
    }

    pub fn tt() -> Rc<Self> {
        Rc::new(Term::True)
    }

    pub fn ff() -> Rc<Self> {
        Rc::new(Term::False)
    }

    pub fn ite(c: Rc<Term>, t: Rc<Term>, e: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::If(c, t, e))
    }

    pub fn zero() -> Rc<Self> {
        Rc::new(Term::Zero)
    }

    pub fn succ(e: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Succ(e))
    }

    pub fn rec(base: Rc<Term>, step: Rc<Term>, scrutinee: Rc<Term>) -> Rc<Self> {
        Rc::new(Term::Rec(base, step, scrutinee))
    }

    /// `Succ^n(Zero)`
    pub fn numeral(n: u64) -> Rc<Self> {
        let mut t = Term::zero();
        for _ in 0..n {
            t = Term::succ(t);
        }
        t
    }

    /// Read back a literal numeral, if `self` is one.
    pub fn as_numeral(&self) -> Option<u64> {
        let mut n = 0;
        let mut cur = self;
        loop {
            match cur {
                Term::Zero => return Some(n),
                Term::Succ(inner) => {
                    n += 1;
                    cur = &**inner;
                }
                _ => return None,
            }
        }
    }

    /// Shift indices in a term by `d` at or above cutoff `c`.
    pub fn shift_by(&self, c: usize, d: usize) -> Rc<Term> {
        match self {
            Term::BVar(k) => {
                if *k < c {
                    Term::bvar(*k)
                } else {
                    Term::bvar(k + d)
                }
            }
            Term::FVar(x) => Term::fvar(x.clone()),
            Term::Abs(body) => Term::abs(body.shift_by(c + 1, d)),
            Term::App(f, a) => Term::app(f.shift_by(c, d), a.shift_by(c, d)),
            Term::Pair(a, b) => Term::pair(a.shift_by(c, d), b.shift_by(c, d)),
            Term::Fst(p) => Term::fst(p.shift_by(c, d)),
            Term::Snd(p) => Term::snd(p.shift_by(c, d)),
            Term::True => Term::tt(),
            Term::False => Term::ff(),
            Term::If(b, t, e) => Term::ite(b.shift_by(c, d), t.shift_by(c, d), e.shift_by(c, d)),
            Term::Zero => Term::zero(),
            Term::Succ(_) => self.map_succ_chain(&|_| false, |base| base.shift_by(c, d)),
            Term::Rec(b, s, n) => Term::rec(b.shift_by(c, d), s.shift_by(c, d), n.shift_by(c, d)),
        }
    }

    /// Make room for a binder inserted at depth `n`.
    pub fn shift(&self, n: usize) -> Rc<Term> {
        self.shift_by(n, 1)
    }

    /// Substitute `s` for variable `k`, removing the binder at depth `k`.
    ///
    /// Indices above `k` drop by one; indices below it are untouched.
    pub fn subst(&self, k: usize, s: &Rc<Term>) -> Rc<Term> {
        match self {
            Term::BVar(i) => {
                if *i == k {
                    s.clone()
                } else if *i > k {
                    Term::bvar(i - 1)
                } else {
                    Term::bvar(*i)
                }
            }
            Term::FVar(x) => Term::fvar(x.clone()),
            Term::Abs(body) => Term::abs(body.subst(k + 1, &s.shift(0))),
            Term::App(f, a) => Term::app(f.subst(k, s), a.subst(k, s)),
            Term::Pair(a, b) => Term::pair(a.subst(k, s), b.subst(k, s)),
            Term::Fst(p) => Term::fst(p.subst(k, s)),
            Term::Snd(p) => Term::snd(p.subst(k, s)),
            Term::True => Term::tt(),
            Term::False => Term::ff(),
            Term::If(b, t, e) => Term::ite(b.subst(k, s), t.subst(k, s), e.subst(k, s)),
            Term::Zero => Term::zero(),
            Term::Succ(_) => self.map_succ_chain(&|_| false, |base| base.subst(k, s)),
            Term::Rec(b, st, n) => Term::rec(b.subst(k, s), st.subst(k, s), n.subst(k, s)),
        }
    }

    /// `subst` for a closed replacement. Nothing in `s` can be captured, so it
    /// is shared as is instead of being shifted under each binder.
    ///
    /// Subterms for which `shared` holds are kept without being visited; it
    /// must only hold for closed subterms.
    pub fn subst_closed(
        &self,
        k: usize,
        s: &Rc<Term>,
        shared: &dyn Fn(&Rc<Term>) -> bool,
    ) -> Rc<Term> {
        let descend = |child: &Rc<Term>, k: usize| {
            if shared(child) {
                child.clone()
            } else {
                child.subst_closed(k, s, shared)
            }
        };
        match self {
            Term::BVar(i) => {
                if *i == k {
                    s.clone()
                } else if *i > k {
                    Term::bvar(i - 1)
                } else {
                    Term::bvar(*i)
                }
            }
            Term::Abs(body) => Term::abs(descend(body, k + 1)),
            Term::Succ(_) => self.map_succ_chain(shared, |base| base.subst_closed(k, s, shared)),
            _ => self.map_children(|child| descend(child, k)),
        }
    }

    /// Apply many bound-index replacements in one traversal.
    pub fn subst_bound_many(&self, s: &BoundSubst) -> Rc<Term> {
        match self {
            Term::BVar(i) => match s.map.get(i) {
                Some(a) => a.clone(),
                None => Term::bvar(s.renumber(*i)),
            },
            Term::Abs(body) => Term::abs(body.subst_bound_many(&s.lift())),
            Term::Succ(_) => self.map_succ_chain(&|_| false, |base| base.subst_bound_many(s)),
            _ => self.map_children(|child| child.subst_bound_many(s)),
        }
    }

    /// Replace free constants in one traversal; unmapped names are kept.
    pub fn subst_free_many(&self, s: &FreeSubst) -> Rc<Term> {
        match self {
            Term::FVar(x) => match s.map.get(x) {
                Some(a) => a.clone(),
                None => Term::fvar(x.clone()),
            },
            Term::Abs(body) => Term::abs(body.subst_free_many(&s.lift())),
            Term::Succ(_) => self.map_succ_chain(&|_| false, |base| base.subst_free_many(s)),
            _ => self.map_children(|child| child.subst_free_many(s)),
        }
    }

    /// Rebuild a binder-free node from its transformed children.
    fn map_children(&self, mut f: impl FnMut(&Rc<Term>) -> Rc<Term>) -> Rc<Term> {
        match self {
            Term::FVar(x) => Term::fvar(x.clone()),
            Term::BVar(i) => Term::bvar(*i),
            Term::Abs(_) => unreachable!("binders are handled by the caller"),
            Term::App(g, a) => Term::app(f(g), f(a)),
            Term::Pair(a, b) => Term::pair(f(a), f(b)),
            Term::Fst(p) => Term::fst(f(p)),
            Term::Snd(p) => Term::snd(f(p)),
            Term::True => Term::tt(),
            Term::False => Term::ff(),
            Term::If(c, t, e) => Term::ite(f(c), f(t), f(e)),
            Term::Zero => Term::zero(),
            Term::Succ(e) => Term::succ(f(e)),
            Term::Rec(b, s, n) => Term::rec(f(b), f(s), f(n)),
        }
    }

    /// Strip a chain of `Succ` nodes, returning the first term that is not
    /// a successor and the number of nodes removed.
    pub fn peel_succ(&self) -> (&Term, usize) {
        let mut count = 0;
        let mut cur = self;
        while let Term::Succ(inner) = cur {
            count += 1;
            cur = &**inner;
        }
        (cur, count)
    }

    /// Rebuild a `Succ` chain around `f` applied to its innermost term.
    ///
    /// The chain is walked with a loop. If it ends in `Zero`, or reaches a
    /// node for which `shared` holds, nothing below changes and the existing
    /// nodes are reused.
    fn map_succ_chain(
        &self,
        shared: &dyn Fn(&Rc<Term>) -> bool,
        f: impl FnOnce(&Rc<Term>) -> Rc<Term>,
    ) -> Rc<Term> {
        let Term::Succ(first) = self else {
            unreachable!("only called on successors");
        };
        let mut count = 1;
        let mut cur = first;
        loop {
            if shared(cur) {
                return Term::succ(first.clone());
            }
            match &**cur {
                Term::Zero => return Term::succ(first.clone()),
                Term::Succ(inner) => {
                    count += 1;
                    cur = inner;
                }
                _ => break,
            }
        }
        let mut out = f(cur);
        for _ in 0..count {
            out = Term::succ(out);
        }
        out
    }

    /// Every bound index refers to one of `depth` enclosing binders.
    pub fn closed_at(&self, depth: usize) -> bool {
        match self {
            Term::BVar(n) => *n < depth,
            Term::Abs(body) => body.closed_at(depth + 1),
            Term::FVar(_) | Term::True | Term::False | Term::Zero => true,
            Term::Succ(_) => self.peel_succ().0.closed_at(depth),
            Term::Fst(e) | Term::Snd(e) => e.closed_at(depth),
            Term::App(a, b) | Term::Pair(a, b) => a.closed_at(depth) && b.closed_at(depth),
            Term::If(a, b, c) | Term::Rec(a, b, c) => {
                a.closed_at(depth) && b.closed_at(depth) && c.closed_at(depth)
            }
        }
    }

    pub fn closed(&self) -> bool {
        self.closed_at(0)
    }
}

impl Drop for Term {
    // Unlink `Succ` chains node by node; the derived drop would recurse once
    // per successor.
    fn drop(&mut self) {
        let Term::Succ(inner) = self else {
            return;
        };
        let mut next = std::mem::replace(inner, Rc::new(Term::Zero));
        while let Ok(mut node) = Rc::try_unwrap(next) {
            match &mut node {
                Term::Succ(inner) => next = std::mem::replace(inner, Rc::new(Term::Zero)),
                _ => break,
            }
        }
    }
}

/// Simultaneous replacement of bound indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundSubst {
    map: BTreeMap<usize, Rc<Term>>,
}

impl BoundSubst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(n: usize, a: Rc<Term>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(n, a);
        BoundSubst { map }
    }

    pub fn insert(&mut self, n: usize, a: Rc<Term>) {
        self.map.insert(n, a);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The map as seen from under one more binder: every key moves up by
    /// one and every replacement is shifted past the new binder.
    pub fn lift(&self) -> BoundSubst {
        BoundSubst {
            map: self
                .map
                .iter()
                .map(|(k, a)| (k + 1, a.shift(0)))
                .collect(),
        }
    }

    /// New index of an unmapped variable once every mapped binder is gone.
    fn renumber(&self, i: usize) -> usize {
        debug_assert!(!self.map.contains_key(&i), "index {} is being replaced", i);
        i - self.map.range(..i).count()
    }
}

impl FromIterator<(usize, Rc<Term>)> for BoundSubst {
    fn from_iter<I: IntoIterator<Item = (usize, Rc<Term>)>>(iter: I) -> Self {
        BoundSubst {
            map: iter.into_iter().collect(),
        }
    }
}

/// Simultaneous replacement of free constants, e.g. inlining definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeSubst {
    map: BTreeMap<Ident, Rc<Term>>,
}

impl FreeSubst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, x: Ident, a: Rc<Term>) {
        self.map.insert(x, a);
    }

    pub fn get(&self, x: &Ident) -> Option<&Rc<Term>> {
        self.map.get(x)
    }

    pub fn remove(&mut self, x: &Ident) -> Option<Rc<Term>> {
        self.map.remove(x)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Names are unaffected by binders; only the replacements shift.
    pub fn lift(&self) -> FreeSubst {
        FreeSubst {
            map: self
                .map
                .iter()
                .map(|(x, a)| (x.clone(), a.shift(0)))
                .collect(),
        }
    }
}

impl FromIterator<(Ident, Rc<Term>)> for FreeSubst {
    fn from_iter<I: IntoIterator<Item = (Ident, Rc<Term>)>>(iter: I) -> Self {
        FreeSubst {
            map: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::FVar(x) => write!(f, "{}", x),
            Term::BVar(n) => write!(f, "{}", n),
            Term::Abs(body) => write!(f, "(lam {})", body),
            Term::App(..) => {
                let mut args = Vec::new();
                let mut head = self;
                while let Term::App(g, a) = head {
                    args.push(a);
                    head = &**g;
                }
                write!(f, "(app {}", head)?;
                for a in args.iter().rev() {
                    write!(f, " {}", a)?;
                }
                write!(f, ")")
            }
            Term::Pair(a, b) => write!(f, "(pair {} {})", a, b),
            Term::Fst(p) => write!(f, "(fst {})", p),
            Term::Snd(p) => write!(f, "(snd {})", p),
            Term::True => write!(f, "true"),
            Term::False => write!(f, "false"),
            Term::If(c, t, e) => write!(f, "(if {} {} {})", c, t, e),
            Term::Zero => write!(f, "zero"),
            Term::Succ(_) => {
                if let Some(n) = self.as_numeral() {
                    return write!(f, "(nat {})", n);
                }
                let (base, count) = self.peel_succ();
                for _ in 0..count {
                    write!(f, "(succ ")?;
                }
                write!(f, "{}", base)?;
                for _ in 0..count {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Term::Rec(b, s, n) => write!(f, "(rec {} {} {})", b, s, n),
        }
    }
}
