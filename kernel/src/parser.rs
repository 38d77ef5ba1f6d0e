//! S-expression reader for types, terms and top-level forms.

use crate::ident::Ident;
use crate::term::Term;
use crate::types::Type;
use std::iter::Peekable;
use std::rc::Rc;
use std::str::CharIndices;
use thiserror::Error;

/// Largest literal accepted by `(nat k)`; numerals are unary, so each one
/// allocates `k` nodes.
pub const MAX_NUMERAL: u64 = 1 << 20;

/// Byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected ')'")]
    UnexpectedRParen,
    #[error("expected {0}")]
    Expected(&'static str),
    #[error("unknown form '{0}'")]
    UnknownForm(String),
    #[error("integer literal out of range: {0}")]
    IntOutOfRange(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at {}..{}", span.start, span.end)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    fn new(kind: ParseErrorKind, span: Span) -> Self {
        ParseError { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Symbol(String),
    Int(u64),
}

struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn next_token(&mut self) -> Option<Result<(Token, Span), ParseError>> {
        self.skip_trivia();
        let (start, c) = self.chars.next()?;
        let single = Span { start, end: start + c.len_utf8() };
        match c {
            '(' => Some(Ok((Token::LParen, single))),
            ')' => Some(Ok((Token::RParen, single))),
            c if c.is_ascii_digit() => {
                let end = self.take_while(|c| c.is_ascii_digit(), single.end);
                let text = &self.input[start..end];
                let span = Span { start, end };
                Some(match text.parse() {
                    Ok(n) => Ok((Token::Int(n), span)),
                    Err(_) => Err(ParseError::new(ParseErrorKind::IntOutOfRange(text.to_string()), span)),
                })
            }
            c if c.is_control() => Some(Err(ParseError::new(ParseErrorKind::UnexpectedChar(c), single))),
            _ => {
                let end = self.take_while(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | ';'), single.end);
                Some(Ok((Token::Symbol(self.input[start..end].to_string()), Span { start, end })))
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool, mut end: usize) -> usize {
        while let Some(&(i, c)) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            self.chars.next();
            end = i + c.len_utf8();
        }
        end
    }

    fn skip_trivia(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else if c == ';' {
                while let Some(&(_, c)) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.chars.next();
                }
            } else {
                break;
            }
        }
    }
}

/// A top-level form of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Form {
    /// `(def name term)`
    Def { name: Ident, term: Rc<Term>, span: Span },
    /// `(axiom name type)`
    Axiom { name: Ident, ty: Rc<Type>, span: Span },
    /// Any other term, to be checked and evaluated
    Expr { term: Rc<Term>, span: Span },
}

impl Form {
    pub fn span(&self) -> Span {
        match self {
            Form::Def { span, .. } | Form::Axiom { span, .. } | Form::Expr { span, .. } => *span,
        }
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<(Token, Span)>,
    last_end: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(input),
            peeked: None,
            last_end: 0,
        }
    }

    fn eof_error(&self) -> ParseError {
        let at = self.lexer.input.len();
        ParseError::new(ParseErrorKind::UnexpectedEof, Span { start: at, end: at })
    }

    fn next(&mut self) -> Result<(Token, Span), ParseError> {
        let next = match self.peeked.take() {
            Some(tok) => tok,
            None => match self.lexer.next_token() {
                Some(tok) => tok?,
                None => return Err(self.eof_error()),
            },
        };
        self.last_end = next.1.end;
        Ok(next)
    }

    fn peek(&mut self) -> Result<Option<&(Token, Span)>, ParseError> {
        if self.peeked.is_none() {
            match self.lexer.next_token() {
                Some(tok) => self.peeked = Some(tok?),
                None => return Ok(None),
            }
        }
        Ok(self.peeked.as_ref())
    }

    pub fn is_at_end(&mut self) -> Result<bool, ParseError> {
        Ok(self.peek()?.is_none())
    }

    fn at_rparen(&mut self) -> Result<bool, ParseError> {
        Ok(matches!(self.peek()?, Some((Token::RParen, _))))
    }

    pub fn parse_term(&mut self) -> Result<Rc<Term>, ParseError> {
        let (tok, span) = self.next()?;
        match tok {
            Token::Int(n) => match usize::try_from(n) {
                Ok(idx) => Ok(Term::bvar(idx)),
                Err(_) => Err(ParseError::new(ParseErrorKind::IntOutOfRange(n.to_string()), span)),
            },
            Token::Symbol(s) => Ok(match s.as_str() {
                "true" => Term::tt(),
                "false" => Term::ff(),
                "zero" => Term::zero(),
                _ => Term::fvar(Ident::new(s)),
            }),
            Token::RParen => Err(ParseError::new(ParseErrorKind::UnexpectedRParen, span)),
            Token::LParen => {
                let (head, head_span) = self.expect_symbol()?;
                self.parse_compound_term(head, head_span)
            }
        }
    }

    /// The rest of `(head ...)` once the opening paren and head are consumed.
    fn parse_compound_term(&mut self, head: String, head_span: Span) -> Result<Rc<Term>, ParseError> {
        let term = match head.as_str() {
            "lam" => Term::abs(self.parse_term()?),
            "app" => {
                let mut acc = self.parse_term()?;
                acc = Term::app(acc, self.parse_term()?);
                while !self.at_rparen()? {
                    acc = Term::app(acc, self.parse_term()?);
                }
                acc
            }
            "pair" => {
                let a = self.parse_term()?;
                Term::pair(a, self.parse_term()?)
            }
            "fst" => Term::fst(self.parse_term()?),
            "snd" => Term::snd(self.parse_term()?),
            "if" => {
                let c = self.parse_term()?;
                let t = self.parse_term()?;
                Term::ite(c, t, self.parse_term()?)
            }
            "succ" => Term::succ(self.parse_term()?),
            "nat" => {
                let (n, span) = self.expect_int()?;
                if n > MAX_NUMERAL {
                    return Err(ParseError::new(ParseErrorKind::IntOutOfRange(n.to_string()), span));
                }
                Term::numeral(n)
            }
            "rec" => {
                let base = self.parse_term()?;
                let step = self.parse_term()?;
                Term::rec(base, step, self.parse_term()?)
            }
            _ => return Err(ParseError::new(ParseErrorKind::UnknownForm(head), head_span)),
        };
        self.expect_rparen()?;
        Ok(term)
    }

    pub fn parse_type(&mut self) -> Result<Rc<Type>, ParseError> {
        let (tok, span) = self.next()?;
        match tok {
            Token::Symbol(s) => Ok(match s.as_str() {
                "nat" => Type::nat(),
                "bool" => Type::bool(),
                _ => Type::var(Ident::new(s)),
            }),
            Token::Int(_) => Err(ParseError::new(ParseErrorKind::Expected("type"), span)),
            Token::RParen => Err(ParseError::new(ParseErrorKind::UnexpectedRParen, span)),
            Token::LParen => {
                let (head, head_span) = self.expect_symbol()?;
                let ty = match head.as_str() {
                    "->" => {
                        let mut parts = vec![self.parse_type()?, self.parse_type()?];
                        while !self.at_rparen()? {
                            parts.push(self.parse_type()?);
                        }
                        let mut parts = parts.into_iter().rev();
                        let mut acc = parts.next().ok_or_else(|| self.eof_error())?;
                        for dom in parts {
                            acc = Type::fun(dom, acc);
                        }
                        acc
                    }
                    "*" => {
                        let a = self.parse_type()?;
                        Type::pair(a, self.parse_type()?)
                    }
                    _ => return Err(ParseError::new(ParseErrorKind::UnknownForm(head), head_span)),
                };
                self.expect_rparen()?;
                Ok(ty)
            }
        }
    }

    /// Read one top-level form, recognising `def` and `axiom`.
    pub fn parse_form(&mut self) -> Result<Form, ParseError> {
        let (is_list, start) = match self.peek()? {
            Some((tok, span)) => (*tok == Token::LParen, span.start),
            None => return Err(self.eof_error()),
        };
        if !is_list {
            let term = self.parse_term()?;
            return Ok(Form::Expr { term, span: Span { start, end: self.last_end } });
        }
        self.next()?;
        let (head, head_span) = self.expect_symbol()?;
        let form = match head.as_str() {
            "def" => {
                let name = Ident::new(self.expect_symbol()?.0);
                let term = self.parse_term()?;
                self.expect_rparen()?;
                Form::Def { name, term, span: Span { start, end: self.last_end } }
            }
            "axiom" => {
                let name = Ident::new(self.expect_symbol()?.0);
                let ty = self.parse_type()?;
                self.expect_rparen()?;
                Form::Axiom { name, ty, span: Span { start, end: self.last_end } }
            }
            _ => {
                let term = self.parse_compound_term(head, head_span)?;
                Form::Expr { term, span: Span { start, end: self.last_end } }
            }
        };
        Ok(form)
    }

    pub fn parse_program(&mut self) -> Result<Vec<Form>, ParseError> {
        let mut forms = Vec::new();
        while !self.is_at_end()? {
            forms.push(self.parse_form()?);
        }
        Ok(forms)
    }

    fn expect_symbol(&mut self) -> Result<(String, Span), ParseError> {
        match self.next()? {
            (Token::Symbol(s), span) => Ok((s, span)),
            (_, span) => Err(ParseError::new(ParseErrorKind::Expected("symbol"), span)),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        match self.next()? {
            (Token::RParen, _) => Ok(()),
            (_, span) => Err(ParseError::new(ParseErrorKind::Expected(")"), span)),
        }
    }

    fn expect_int(&mut self) -> Result<(u64, Span), ParseError> {
        match self.next()? {
            (Token::Int(n), span) => Ok((n, span)),
            (_, span) => Err(ParseError::new(ParseErrorKind::Expected("integer"), span)),
        }
    }

    /// Fail unless every token has been consumed.
    pub fn expect_end(&mut self) -> Result<(), ParseError> {
        match self.peek()? {
            None => Ok(()),
            Some((_, span)) => Err(ParseError::new(ParseErrorKind::Expected("end of input"), *span)),
        }
    }
}

/// Read exactly one term from `input`.
pub fn parse_term(input: &str) -> Result<Rc<Term>, ParseError> {
    let mut parser = Parser::new(input);
    let term = parser.parse_term()?;
    parser.expect_end()?;
    Ok(term)
}

/// Read exactly one type from `input`.
pub fn parse_type(input: &str) -> Result<Rc<Type>, ParseError> {
    let mut parser = Parser::new(input);
    let ty = parser.parse_type()?;
    parser.expect_end()?;
    Ok(ty)
}
