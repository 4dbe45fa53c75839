use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::types::{Type, parse_type};

/// Whether an identifier names a bindable variable or a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentKind {
    Variable,
    Constant,
}

/// One typing convention: identifiers whose first character lies in
/// `first..=last` get `kind` and `ty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convention {
    pub first: char,
    pub last: char,
    pub kind: IdentKind,
    pub ty: Type,
}

impl Convention {
    #[must_use]
    pub const fn covers(&self, ch: char) -> bool {
        self.first <= ch && ch <= self.last
    }
}

/// Maps identifier names to their kind and type.
///
/// Conventions are keyed on the first character of the name, so `x`, `x1`
/// and `x'` are typed alike. Conventions added later take precedence.
///
/// # Examples
/// ```
/// use lambdacalc::{types::Type, typer::{IdentKind, IdentifierTyper}};
///
/// let typer: IdentifierTyper = "x-z: var e; P-Q: const <e,t>".parse().unwrap();
/// assert_eq!(typer.lookup("y'"), Some((IdentKind::Variable, &Type::E)));
/// assert_eq!(typer.lookup("a"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierTyper {
    conventions: Vec<Convention>,
}

impl IdentifierTyper {
    /// A typer with no conventions at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            conventions: Vec::new(),
        }
    }

    /// Adds a convention for names starting with a character in
    /// `first..=last`; it overrides any earlier convention.
    pub fn add(&mut self, first: char, last: char, kind: IdentKind, ty: Type) {
        self.conventions.push(Convention {
            first,
            last,
            kind,
            ty,
        });
    }

    #[must_use]
    pub fn with(mut self, first: char, last: char, kind: IdentKind, ty: Type) -> Self {
        self.add(first, last, kind, ty);
        self
    }

    #[must_use]
    pub fn conventions(&self) -> &[Convention] {
        &self.conventions
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<(IdentKind, &Type)> {
        let first = name.chars().next()?;
        self.conventions
            .iter()
            .rev()
            .find(|convention| convention.covers(first))
            .map(|convention| (convention.kind, &convention.ty))
    }
}

impl Default for IdentifierTyper {
    fn default() -> Self {
        let pred = Type::predicate(Type::E);
        let relation = Type::predicate(Type::Product(vec![Type::E, Type::E]));
        Self::empty()
            .with('a', 'e', IdentKind::Constant, Type::E)
            .with('p', 'q', IdentKind::Variable, Type::T)
            .with('u', 'z', IdentKind::Variable, Type::E)
            .with('A', 'Q', IdentKind::Constant, pred.clone())
            .with('R', 'S', IdentKind::Constant, relation)
            .with('X', 'Z', IdentKind::Variable, pred)
    }
}

/// Malformed textual typing conventions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TyperConfigError {
    #[error("Missing ':' in convention '{0}'")]
    MissingColon(String),
    #[error("Invalid character range '{range}' in convention '{entry}'")]
    InvalidRange { entry: String, range: String },
    #[error("Expected 'var' or 'const' in convention '{0}'")]
    InvalidKind(String),
    #[error("Invalid type in convention '{entry}': {message}")]
    InvalidType { entry: String, message: String },
}

fn parse_range(range: &str) -> Option<(char, char)> {
    let chars: Vec<char> = range.chars().filter(|ch| !ch.is_whitespace()).collect();
    match chars.as_slice() {
        [single] if single.is_alphabetic() => Some((*single, *single)),
        [first, '-', last] if first.is_alphabetic() && last.is_alphabetic() && first <= last => {
            Some((*first, *last))
        }
        _ => None,
    }
}

impl FromStr for IdentifierTyper {
    type Err = TyperConfigError;

    /// Parses conventions such as `x-z: var e; P-Q: const <e,t>`.
    ///
    /// Entries are separated by `;` or newlines; blank entries and lines
    /// starting with `#` are skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut typer = Self::empty();
        for entry in s.split([';', '\n']).map(str::trim) {
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }
            let (range, rest) = entry
                .split_once(':')
                .ok_or_else(|| TyperConfigError::MissingColon(entry.to_string()))?;
            let (first, last) =
                parse_range(range).ok_or_else(|| TyperConfigError::InvalidRange {
                    entry: entry.to_string(),
                    range: range.trim().to_string(),
                })?;
            let (kind, ty) = rest
                .trim_start()
                .split_once(char::is_whitespace)
                .unwrap_or((rest.trim(), ""));
            let kind = match kind {
                "var" => IdentKind::Variable,
                "const" => IdentKind::Constant,
                _ => return Err(TyperConfigError::InvalidKind(entry.to_string())),
            };
            let ty = parse_type(ty).map_err(|e| TyperConfigError::InvalidType {
                entry: entry.to_string(),
                message: e.to_string(),
            })?;
            typer.add(first, last, kind, ty);
        }
        Ok(typer)
    }
}

impl fmt::Display for IdentifierTyper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, convention) in self.conventions.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            if convention.first == convention.last {
                write!(f, "{}", convention.first)?;
            } else {
                write!(f, "{}-{}", convention.first, convention.last)?;
            }
            let kind = match convention.kind {
                IdentKind::Variable => "var",
                IdentKind::Constant => "const",
            };
            write!(f, ": {kind} {}", convention.ty)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_conventions() {
        let typer = IdentifierTyper::default();
        assert_eq!(typer.lookup("x"), Some((IdentKind::Variable, &Type::E)));
        assert_eq!(typer.lookup("a"), Some((IdentKind::Constant, &Type::E)));
        assert_eq!(typer.lookup("p"), Some((IdentKind::Variable, &Type::T)));
        assert_eq!(
            typer.lookup("P"),
            Some((IdentKind::Constant, &Type::predicate(Type::E)))
        );
        assert_eq!(
            typer.lookup("X"),
            Some((IdentKind::Variable, &Type::predicate(Type::E)))
        );
        assert_eq!(typer.lookup("f"), None);
        assert_eq!(typer.lookup(""), None);
    }

    #[test]
    fn test_suffixes_do_not_change_type() {
        let typer = IdentifierTyper::default();
        assert_eq!(typer.lookup("y'"), typer.lookup("y"));
        assert_eq!(typer.lookup("x12"), typer.lookup("x"));
    }

    #[test]
    fn test_later_conventions_override() {
        let typer = IdentifierTyper::default().with('x', 'x', IdentKind::Constant, Type::T);
        assert_eq!(typer.lookup("x"), Some((IdentKind::Constant, &Type::T)));
        assert_eq!(typer.lookup("y"), Some((IdentKind::Variable, &Type::E)));
    }

    #[test]
    fn test_parse_conventions() {
        let typer: IdentifierTyper = "x-z: var e; P-Q: const <e,t>\n# relations\nR: const <e,<e,t>>"
            .parse()
            .unwrap();
        assert_eq!(typer.conventions().len(), 3);
        assert_eq!(
            typer.lookup("R"),
            Some((
                IdentKind::Constant,
                &Type::function(Type::E, Type::predicate(Type::E))
            ))
        );
        assert_eq!(typer.lookup("a"), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "x-z var e".parse::<IdentifierTyper>(),
            Err(TyperConfigError::MissingColon(_))
        ));
        assert!(matches!(
            "z-x: var e".parse::<IdentifierTyper>(),
            Err(TyperConfigError::InvalidRange { .. })
        ));
        assert!(matches!(
            "x: variable e".parse::<IdentifierTyper>(),
            Err(TyperConfigError::InvalidKind(_))
        ));
        assert!(matches!(
            "x: varx e".parse::<IdentifierTyper>(),
            Err(TyperConfigError::InvalidKind(_))
        ));
        assert!(matches!(
            "x: var".parse::<IdentifierTyper>(),
            Err(TyperConfigError::InvalidType { .. })
        ));
        assert!(matches!(
            "x: bound e".parse::<IdentifierTyper>(),
            Err(TyperConfigError::InvalidKind(_))
        ));
        assert!(matches!(
            "x: var <e,".parse::<IdentifierTyper>(),
            Err(TyperConfigError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_display_parses_back() {
        let typer = IdentifierTyper::default();
        let printed = typer.to_string();
        assert_eq!(printed.parse::<IdentifierTyper>().unwrap(), typer);
    }
}
