pub mod checker;
pub mod context;
pub mod eval;
pub mod ident;
pub mod parser;
pub mod term;
pub mod types;
pub mod unify;

pub use checker::{type_check, Checker, TypeError};
pub use context::Context;
pub use eval::{evaluate, try_evaluate, EvalError};
pub use ident::{Ident, NameSupply};
pub use term::{BoundSubst, FreeSubst, Term};
pub use types::{Subst, Type};
pub use unify::{unify, unify_with_rigid, Constraint, Measure, Unifier, UnifyError};
