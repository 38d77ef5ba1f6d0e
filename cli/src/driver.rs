use anyhow::Context as _;
use godel_kernel::parser::{Form, ParseError, Parser, Span};
use godel_kernel::{
    try_evaluate, type_check, Context, EvalError, FreeSubst, Ident, Subst, Term, Type, TypeError,
};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info};

use crate::diagnostics;

/// What to do with top-level expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Report types only
    Check,
    /// Report types and values
    Eval,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("type error: {error}")]
    Type { error: TypeError, span: Span },
    #[error("evaluation error: {error}")]
    Eval { error: EvalError, span: Span },
}

impl DriverError {
    pub fn span(&self) -> Span {
        match self {
            DriverError::Parse(err) => err.span,
            DriverError::Type { span, .. } | DriverError::Eval { span, .. } => *span,
        }
    }
}

/// The result of processing one top-level form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Defined { name: Ident, ty: Rc<Type> },
    Declared { name: Ident, ty: Rc<Type> },
    Typed { term: Rc<Term>, ty: Rc<Type> },
    Evaluated { value: Rc<Term>, ty: Rc<Type> },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Defined { name, ty } => write!(f, "{} : {}", name, ty),
            Outcome::Declared { name, ty } => write!(f, "axiom {} : {}", name, ty),
            Outcome::Typed { term, ty } => write!(f, "{} : {}", term, ty),
            Outcome::Evaluated { value, ty } => write!(f, "{} : {}", value, ty),
        }
    }
}

/// Everything a run over one source text produced. Processing stops at the
/// first error.
#[derive(Debug, Default)]
pub struct Transcript {
    pub outcomes: Vec<Outcome>,
    pub error: Option<DriverError>,
}

impl Transcript {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// One line per outcome, then the error if there was one.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self.outcomes.iter().map(|o| o.to_string()).collect();
        if let Some(err) = &self.error {
            lines.push(format!("error: {}", err));
        }
        lines.join("\n")
    }
}

/// Declarations and definitions accumulated across forms.
///
/// Definitions are stored with every earlier definition already inlined,
/// so expanding an expression takes a single parallel substitution.
#[derive(Debug, Default)]
pub struct Session {
    ctx: Context,
    defs: FreeSubst,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn definition(&self, name: &Ident) -> Option<&Rc<Term>> {
        self.defs.get(name)
    }

    fn infer(&self, term: &Term, span: Span) -> Result<Rc<Type>, DriverError> {
        match type_check(term, &self.ctx) {
            Ok((ty, _)) => Ok(tidy(&ty)),
            Err(error) => Err(DriverError::Type { error, span }),
        }
    }

    pub fn process_form(&mut self, form: Form, mode: Mode) -> Result<Outcome, DriverError> {
        match form {
            Form::Def { name, term, span } => {
                let ty = self.infer(&term, span)?;
                info!(%name, %ty, "define");
                self.ctx.declare(name.clone(), ty.clone());
                self.defs.insert(name.clone(), term.subst_free_many(&self.defs));
                Ok(Outcome::Defined { name, ty })
            }
            Form::Axiom { name, ty, .. } => {
                info!(%name, %ty, "axiom");
                self.ctx.declare(name.clone(), ty.clone());
                self.defs.remove(&name);
                Ok(Outcome::Declared { name, ty })
            }
            Form::Expr { term, span } => {
                let ty = self.infer(&term, span)?;
                match mode {
                    Mode::Check => Ok(Outcome::Typed { term, ty }),
                    Mode::Eval => {
                        let expanded = term.subst_free_many(&self.defs);
                        debug!(%expanded, "evaluate");
                        let value = try_evaluate(&expanded).map_err(|error| DriverError::Eval { error, span })?;
                        Ok(Outcome::Evaluated { value, ty })
                    }
                }
            }
        }
    }

    /// Read and process every form of `source` in order.
    pub fn run_source(&mut self, source: &str, mode: Mode) -> Transcript {
        let mut transcript = Transcript::default();
        let mut parser = Parser::new(source);
        loop {
            match parser.is_at_end() {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => {
                    transcript.error = Some(err.into());
                    break;
                }
            }
            let result = parser
                .parse_form()
                .map_err(DriverError::from)
                .and_then(|form| self.process_form(form, mode));
            match result {
                Ok(outcome) => transcript.outcomes.push(outcome),
                Err(err) => {
                    transcript.error = Some(err);
                    break;
                }
            }
        }
        transcript
    }

    /// Type of a single expression under the current declarations.
    pub fn type_of(&self, source: &str) -> Result<Rc<Type>, DriverError> {
        let term = godel_kernel::parser::parse_term(source)?;
        self.infer(
            &term,
            Span {
                start: 0,
                end: source.len(),
            },
        )
    }
}

/// Rename machine-generated type variables to `A`, `B`, ... in order of
/// creation, skipping names the type already uses.
pub fn tidy(ty: &Rc<Type>) -> Rc<Type> {
    let vars = ty.vars();
    let taken: BTreeSet<Ident> = vars.iter().filter(|x| !x.is_fresh()).cloned().collect();
    let mut names = (0..)
        .map(letter_name)
        .map(Ident::new)
        .filter(|x| !taken.contains(x));
    let renaming: Subst = vars
        .into_iter()
        .filter(Ident::is_fresh)
        .zip(&mut names)
        .map(|(x, name)| (x, Type::var(name)))
        .collect();
    renaming.apply(ty)
}

fn letter_name(i: usize) -> String {
    let letter = (b'A' + (i % 26) as u8) as char;
    if i < 26 {
        letter.to_string()
    } else {
        format!("{}{}", letter, i / 26)
    }
}

/// Check or evaluate a source file, printing outcomes to stdout and a
/// rendered diagnostic to stderr. Returns whether every form succeeded.
pub fn run_file(path: &Path, mode: Mode) -> anyhow::Result<bool> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path.display().to_string();
    let mut session = Session::new();
    let transcript = session.run_source(&source, mode);
    for outcome in &transcript.outcomes {
        println!("{}", outcome);
    }
    if let Some(err) = &transcript.error {
        eprint!("{}", diagnostics::render(err, &filename, &source, true));
    }
    Ok(transcript.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tidy_renames_fresh_variables_in_order() {
        let ty = Type::fun(Type::var(Ident::Fresh(7)), Type::fun(Type::var(Ident::Fresh(3)), Type::var(Ident::Fresh(7))));
        assert_eq!(tidy(&ty).to_string(), "(-> B A B)");
    }

    #[test]
    fn tidy_avoids_user_names() {
        let ty = Type::fun(Type::var("A"), Type::var(Ident::Fresh(0)));
        assert_eq!(tidy(&ty).to_string(), "(-> A B)");
    }

    #[test]
    fn letter_names_wrap_with_suffix() {
        assert_eq!(letter_name(0), "A");
        assert_eq!(letter_name(25), "Z");
        assert_eq!(letter_name(27), "B1");
    }

    #[test]
    fn axiom_shadows_previous_definition() {
        let mut session = Session::new();
        let transcript = session.run_source("(def one (nat 1))\n(axiom one nat)", Mode::Eval);
        assert!(transcript.is_ok());
        assert!(session.definition(&Ident::new("one")).is_none());
        assert_eq!(session.context().lookup_free(&Ident::new("one")), Some(Type::nat()));
    }

    #[test]
    fn errors_carry_the_form_span() {
        let mut session = Session::new();
        let source = "(def ok zero)\n(succ true)";
        let transcript = session.run_source(source, Mode::Check);
        let err = transcript.error.expect("second form is ill typed");
        assert_eq!(err.span(), Span { start: 14, end: 25 });
        assert_eq!(transcript.outcomes.len(), 1);
    }
}
