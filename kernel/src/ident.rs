use std::fmt;
use std::rc::Rc;

/// A label naming either a declared free constant or a type variable.
///
/// User-written names and machine-generated names live in disjoint halves of
/// the enum, so a fresh variable can never capture something the user wrote.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ident {
    /// Name from source text.
    Named(Rc<str>),
    /// Generated by a `NameSupply`.
    Fresh(u32),
}

impl Ident {
    pub fn new(name: impl AsRef<str>) -> Self {
        Ident::Named(Rc::from(name.as_ref()))
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Ident::Fresh(_))
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ident::Named(name) => write!(f, "{}", name),
            Ident::Fresh(n) => write!(f, "?{}", n),
        }
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::new(name)
    }
}

/// Source of fresh identifiers, one counter per type-checking session.
#[derive(Debug, Clone, Default)]
pub struct NameSupply {
    next: u32,
}

impl NameSupply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> Ident {
        let id = Ident::Fresh(self.next);
        self.next += 1;
        id
    }

    /// Never hand out a fresh name that already occurs in `seen`.
    pub fn avoid<'a>(&mut self, seen: impl IntoIterator<Item = &'a Ident>) {
        for id in seen {
            if let Ident::Fresh(n) = id {
                self.next = self.next.max(n + 1);
            }
        }
    }

    /// Number of identifiers handed out so far.
    pub fn issued(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_are_distinct_from_user_names() {
        let mut supply = NameSupply::new();
        let a = supply.fresh();
        let b = supply.fresh();
        assert_ne!(a, b);
        assert_ne!(a, Ident::new("?0"));
        assert_eq!(a.to_string(), "?0");
        assert_eq!(supply.issued(), 2);
    }

    #[test]
    fn avoid_skips_past_existing_fresh_names() {
        let mut supply = NameSupply::new();
        supply.avoid(&[Ident::Fresh(4), Ident::new("X"), Ident::Fresh(1)]);
        assert_eq!(supply.fresh(), Ident::Fresh(5));
        supply.avoid(&[Ident::Fresh(0)]);
        assert_eq!(supply.fresh(), Ident::Fresh(6));
    }

    #[test]
    fn named_idents_compare_by_text() {
        assert_eq!(Ident::new("x"), Ident::from("x"));
        assert!(!Ident::new("x").is_fresh());
    }
}
