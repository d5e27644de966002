//! Test title expressions and their resolution against the symbol table.
//!
//! A title is either plain text or a template literal whose `${...}`
//! substitutions refer to named constants (`${Module.Member}`,
//! `${Module["Member"]}` or `${Name}`). Resolution is total: a reference the
//! symbol table cannot answer is re-emitted in its original `${...}` form.

use std::fmt;

use tracing::warn;

use crate::symbols::SymbolTable;

/// A title argument as written in source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TitleExpression {
    /// A string literal (or a template literal without substitutions).
    Text(String),
    /// A template literal: literal fragments interleaved with references.
    Template(Vec<TitlePart>),
}

/// One piece of a template title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TitlePart {
    /// Cooked literal text between substitutions.
    Literal(String),
    /// A `${...}` substitution.
    Reference(Reference),
}

/// A `${...}` substitution inside a template title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    /// What the substitution points at.
    pub target: RefTarget,
    /// The expression text between `${` and `}`, trimmed.
    pub source: String,
}

/// The symbolic target of a substitution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefTarget {
    /// `Symbol.Member` or `Symbol["Member"]`.
    Member {
        /// Symbol (enum or object) name.
        symbol: String,
        /// Member name.
        member: String,
    },
    /// A bare identifier.
    Bare(String),
    /// Any other expression; never resolvable.
    Opaque,
}

impl Reference {
    /// `${Symbol.Member}` reference.
    #[must_use]
    pub fn member(symbol: &str, member: &str) -> Self {
        Self {
            target: RefTarget::Member {
                symbol: symbol.to_owned(),
                member: member.to_owned(),
            },
            source: format!("{symbol}.{member}"),
        }
    }

    /// `${Name}` reference.
    #[must_use]
    pub fn bare(name: &str) -> Self {
        Self {
            target: RefTarget::Bare(name.to_owned()),
            source: name.to_owned(),
        }
    }

    /// A reference to an arbitrary expression.
    #[must_use]
    pub fn opaque(source: &str) -> Self {
        Self {
            target: RefTarget::Opaque,
            source: source.to_owned(),
        }
    }

    fn lookup<'a>(&self, symbols: &'a SymbolTable) -> Option<&'a str> {
        match &self.target {
            RefTarget::Member { symbol, member } => symbols.member(symbol, member),
            RefTarget::Bare(name) => symbols.bare(name),
            RefTarget::Opaque => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}}}", self.source)
    }
}

impl TitleExpression {
    /// Resolve the title to display text.
    ///
    /// Never fails: unresolved references are kept verbatim as `${source}`.
    #[must_use]
    pub fn resolve(&self, symbols: &SymbolTable) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TitlePart::Literal(text) => out.push_str(text),
                        TitlePart::Reference(reference) => match reference.lookup(symbols) {
                            Some(value) => out.push_str(value),
                            None => {
                                if reference.target != RefTarget::Opaque {
                                    warn!(reference = %reference, "unresolved symbol in title");
                                }
                                out.push_str(&reference.to_string());
                            }
                        },
                    }
                }
                out
            }
        }
    }
}

/// Extract the case code from a resolved title: the leading run of ASCII
/// digits, provided it is followed by optional whitespace and a hyphen.
///
/// `"42 - Login works"` → `Some("42")`; `"Login works"` → `None`.
#[must_use]
pub fn case_code(title: &str) -> Option<&str> {
    let digits = title.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    title[digits..]
        .trim_start()
        .starts_with('-')
        .then(|| &title[..digits])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
