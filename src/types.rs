use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use thiserror::Error;

use crate::{expr::Notation, parser::SyntaxError};

/// Semantic type of an expression.
///
/// - `Atomic(c)`: a basic type such as `e` (entities) or `t` (truth values)
/// - `Var(c)`: a polymorphic type variable, written `'a`
/// - `Composite(d, r)`: functions from `d` to `r`, written `<d,r>`
/// - `Product(ts)`: tuples, written `e×e` (or `e*e`)
///
/// # Examples
/// ```
/// use lambdacalc::types::Type;
///
/// let pred: Type = "<e,t>".parse().unwrap();
/// assert_eq!(pred, Type::function(Type::E, Type::T));
/// assert_eq!(pred.to_string(), "<e,t>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Atomic(char),
    Var(char),
    Composite(Box<Type>, Box<Type>),
    Product(Vec<Type>),
}

/// Errors raised while computing or aligning types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Two types that must agree cannot be aligned.
    #[error("Type mismatch: expected {expected}, found {found}")]
    Mismatch { expected: Type, found: Type },
    /// Aligning would bind a type variable to a type containing itself.
    #[error("Cannot construct infinite type: '{var} = {ty}")]
    InfiniteType { var: char, ty: Type },
    /// The type of an expression cannot be determined.
    #[error("Cannot evaluate the type of {expr}: {reason}")]
    Evaluation { expr: String, reason: String },
}

impl TypeError {
    #[must_use]
    pub const fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. } | Self::InfiniteType { .. })
    }
}

impl Type {
    pub const E: Self = Self::Atomic('e');
    pub const T: Self = Self::Atomic('t');
    pub const S: Self = Self::Atomic('s');

    #[must_use]
    pub fn function(domain: Self, range: Self) -> Self {
        Self::Composite(Box::new(domain), Box::new(range))
    }

    /// The characteristic-function type `<a,t>` of sets of `a`.
    #[must_use]
    pub fn predicate(domain: Self) -> Self {
        Self::function(domain, Self::T)
    }

    #[must_use]
    pub const fn domain(&self) -> Option<&Self> {
        match self {
            Self::Composite(domain, _) => Some(domain),
            _ => None,
        }
    }

    #[must_use]
    pub const fn range(&self) -> Option<&Self> {
        match self {
            Self::Composite(_, range) => Some(range),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains_var(&self, var: char) -> bool {
        match self {
            Self::Atomic(_) => false,
            Self::Var(v) => *v == var,
            Self::Composite(domain, range) => domain.contains_var(var) || range.contains_var(var),
            Self::Product(types) => types.iter().any(|ty| ty.contains_var(var)),
        }
    }

    #[must_use]
    pub fn is_polymorphic(&self) -> bool {
        match self {
            Self::Atomic(_) => false,
            Self::Var(_) => true,
            Self::Composite(domain, range) => domain.is_polymorphic() || range.is_polymorphic(),
            Self::Product(types) => types.iter().any(Self::is_polymorphic),
        }
    }

    /// Type variables occurring in the type.
    #[must_use]
    pub fn type_variables(&self) -> BTreeSet<char> {
        let mut vars = BTreeSet::new();
        self.collect_type_variables(&mut vars);
        vars
    }

    fn collect_type_variables(&self, vars: &mut BTreeSet<char>) {
        match self {
            Self::Atomic(_) => {}
            Self::Var(v) => {
                vars.insert(*v);
            }
            Self::Composite(domain, range) => {
                domain.collect_type_variables(vars);
                range.collect_type_variables(vars);
            }
            Self::Product(types) => {
                for ty in types {
                    ty.collect_type_variables(vars);
                }
            }
        }
    }

    /// Renaming that moves the type variables `self` shares with `other` to
    /// letters occurring in neither type.
    ///
    /// # Examples
    /// ```
    /// use lambdacalc::types::Type;
    ///
    /// let id: Type = "<'a,'a>".parse().unwrap();
    /// let renaming = id.rename_apart(&id);
    /// assert_eq!(renaming.apply(&id).to_string(), "<'b,'b>");
    /// ```
    #[must_use]
    pub fn rename_apart(&self, other: &Self) -> TypeSubstitution {
        let own = self.type_variables();
        let theirs = other.type_variables();
        let mut taken: BTreeSet<char> = own.union(&theirs).copied().collect();
        let mut renaming = TypeSubstitution::new();
        for var in own.intersection(&theirs) {
            let Some(fresh) = ('a'..='z').chain('A'..='Z').find(|c| !taken.contains(c)) else {
                break;
            };
            taken.insert(fresh);
            renaming.0.insert(*var, Self::Var(fresh));
        }
        renaming
    }

    /// Aligns two types that may contain type variables on either side.
    ///
    /// On success the returned substitution makes both types equal.
    ///
    /// # Errors
    /// Returns `TypeError::Mismatch` (with `self` as the expected type) if
    /// the types conflict, or `TypeError::InfiniteType` if a variable would
    /// have to contain itself.
    ///
    /// # Examples
    /// ```
    /// use lambdacalc::types::Type;
    ///
    /// let poly: Type = "<'a,t>".parse().unwrap();
    /// let pred: Type = "<e,t>".parse().unwrap();
    /// let subst = poly.align(&pred).unwrap();
    /// assert_eq!(subst.apply(&poly), pred);
    /// ```
    pub fn align(&self, other: &Self) -> Result<TypeSubstitution, TypeError> {
        let mut subst = TypeSubstitution::new();
        match unify(self, other, &mut subst) {
            Ok(()) => Ok(subst),
            Err(UnifyFailure::Clash) => Err(TypeError::Mismatch {
                expected: self.clone(),
                found: other.clone(),
            }),
            Err(UnifyFailure::Occurs(var, ty)) => Err(TypeError::InfiniteType { var, ty }),
        }
    }

    /// Type of applying a function of type `self` to an argument of type
    /// `argument`, together with the alignment used.
    ///
    /// Type variables of the argument are independent of the function's:
    /// shared ones are first renamed apart (see [`Type::rename_apart`]), so
    /// the alignment may mention the new names.
    ///
    /// # Errors
    /// Returns `TypeError::Evaluation` if `self` is not a function type and
    /// propagates alignment failures of the domain.
    pub fn apply_to(
        &self,
        argument: &Self,
        function: &dyn fmt::Display,
    ) -> Result<(Self, TypeSubstitution), TypeError> {
        let Self::Composite(domain, range) = self else {
            return Err(TypeError::Evaluation {
                expr: function.to_string(),
                reason: format!("type {self} is not a function type"),
            });
        };
        let renaming = argument.rename_apart(self);
        let subst = domain.align(&renaming.apply(argument))?;
        Ok((subst.apply(range), subst))
    }

    #[must_use]
    pub const fn display(&self, notation: Notation) -> NotatedType<'_> {
        NotatedType { ty: self, notation }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, notation: Notation) -> fmt::Result {
        match self {
            Self::Atomic(c) => write!(f, "{c}"),
            Self::Var(c) => write!(f, "'{c}"),
            Self::Composite(domain, range) => {
                write!(f, "<")?;
                domain.write(f, notation)?;
                write!(f, ",")?;
                range.write(f, notation)?;
                write!(f, ">")
            }
            Self::Product(types) => {
                let times = match notation {
                    Notation::Unicode => "×",
                    Notation::Ascii => "*",
                };
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{times}")?;
                    }
                    if matches!(ty, Self::Product(_)) {
                        write!(f, "(")?;
                        ty.write(f, notation)?;
                        write!(f, ")")?;
                    } else {
                        ty.write(f, notation)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, Notation::Unicode)
    }
}

/// A type printed in a chosen notation.
pub struct NotatedType<'a> {
    ty: &'a Type,
    notation: Notation,
}

impl fmt::Display for NotatedType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ty.write(f, self.notation)
    }
}

/// Mapping from type variables to types, as produced by [`Type::align`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSubstitution(BTreeMap<char, Type>);

impl TypeSubstitution {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, var: char) -> Option<&Type> {
        self.0.get(&var)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &Type)> {
        self.0.iter().map(|(var, ty)| (*var, ty))
    }

    #[must_use]
    pub fn apply(&self, ty: &Type) -> Type {
        match ty {
            Type::Atomic(_) => ty.clone(),
            Type::Var(v) => self.0.get(v).cloned().unwrap_or_else(|| ty.clone()),
            Type::Composite(domain, range) => Type::function(self.apply(domain), self.apply(range)),
            Type::Product(types) => Type::Product(types.iter().map(|ty| self.apply(ty)).collect()),
        }
    }

    /// Substitution equivalent to applying `other` first, then `self`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        let mut result: BTreeMap<char, Type> = other
            .0
            .iter()
            .map(|(var, ty)| (*var, self.apply(ty)))
            .collect();
        for (var, ty) in &self.0 {
            result.entry(*var).or_insert_with(|| ty.clone());
        }
        Self(result)
    }

    // Keeps the substitution idempotent: existing bindings see the new one.
    fn bind(&mut self, var: char, ty: Type) {
        let single = Self(BTreeMap::from([(var, ty.clone())]));
        for bound in self.0.values_mut() {
            *bound = single.apply(bound);
        }
        self.0.insert(var, ty);
    }
}

enum UnifyFailure {
    Clash,
    Occurs(char, Type),
}

fn unify(left: &Type, right: &Type, subst: &mut TypeSubstitution) -> Result<(), UnifyFailure> {
    let left = subst.apply(left);
    let right = subst.apply(right);
    match (&left, &right) {
        (Type::Var(a), Type::Var(b)) if a == b => Ok(()),
        (Type::Var(var), ty) | (ty, Type::Var(var)) => {
            if ty.contains_var(*var) {
                return Err(UnifyFailure::Occurs(*var, ty.clone()));
            }
            subst.bind(*var, ty.clone());
            Ok(())
        }
        (Type::Atomic(a), Type::Atomic(b)) if a == b => Ok(()),
        (Type::Composite(d1, r1), Type::Composite(d2, r2)) => {
            unify(d1, d2, subst)?;
            unify(r1, r2, subst)
        }
        (Type::Product(xs), Type::Product(ys)) if xs.len() == ys.len() => {
            for (x, y) in xs.iter().zip(ys) {
                unify(x, y, subst)?;
            }
            Ok(())
        }
        _ => Err(UnifyFailure::Clash),
    }
}

/// Parse a type such as `<e,<e,t>>`, `<et>`, `e×e` or `<'a,t>`.
///
/// # Errors
/// Returns a `SyntaxError` pointing at the offending character.
pub fn parse_type(input: &str) -> Result<Type, SyntaxError> {
    let mut parser = TypeParser::new(input);
    let ty = parser.parse_product()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(ty),
        Some(ch) => Err(parser.unexpected("end of type", ch)),
    }
}

impl FromStr for Type {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type(s)
    }
}

struct TypeParser {
    chars: Vec<char>,
    position: usize,
}

impl TypeParser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str, found: char) -> SyntaxError {
        SyntaxError::UnexpectedToken {
            expected: expected.to_string(),
            found: format!("'{found}'"),
            position: self.position,
        }
    }

    fn end_of_input(&self, expected: &str) -> SyntaxError {
        SyntaxError::UnexpectedToken {
            expected: expected.to_string(),
            found: "end of input".to_string(),
            position: self.position,
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SyntaxError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.unexpected(&format!("'{expected}'"), ch)),
            None => Err(self.end_of_input(&format!("'{expected}'"))),
        }
    }

    fn parse_product(&mut self) -> Result<Type, SyntaxError> {
        let first = self.parse_primary()?;
        let mut factors = vec![first];
        loop {
            self.skip_whitespace();
            if matches!(self.peek(), Some('×' | '*')) {
                self.advance();
                factors.push(self.parse_primary()?);
            } else {
                break;
            }
        }
        if factors.len() == 1 {
            Ok(factors.remove(0))
        } else {
            Ok(Type::Product(factors))
        }
    }

    fn parse_primary(&mut self) -> Result<Type, SyntaxError> {
        const EXPECTED: &str = "type";
        self.skip_whitespace();
        match self.peek() {
            Some('<') => {
                self.advance();
                let domain = self.parse_product()?;
                self.skip_whitespace();
                if self.peek() == Some(',') {
                    self.advance();
                }
                let range = self.parse_product()?;
                self.expect('>')?;
                Ok(Type::function(domain, range))
            }
            Some('(') => {
                self.advance();
                let ty = self.parse_product()?;
                self.expect(')')?;
                Ok(ty)
            }
            Some('\'') => {
                self.advance();
                match self.peek() {
                    Some(ch) if ch.is_ascii_lowercase() => {
                        self.advance();
                        Ok(Type::Var(ch))
                    }
                    Some(ch) => Err(self.unexpected("type variable name", ch)),
                    None => Err(self.end_of_input("type variable name")),
                }
            }
            Some(ch) if ch.is_ascii_lowercase() => {
                self.advance();
                Ok(Type::Atomic(ch))
            }
            Some(ch) => Err(self.unexpected(EXPECTED, ch)),
            None => Err(self.end_of_input(EXPECTED)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ty(s: &str) -> Type {
        parse_type(s).unwrap()
    }

    #[test]
    fn test_parse_atomic_and_variables() {
        assert_eq!(ty("e"), Type::E);
        assert_eq!(ty(" t "), Type::T);
        assert_eq!(ty("'a"), Type::Var('a'));
    }

    #[test]
    fn test_parse_composite() {
        assert_eq!(ty("<e,t>"), Type::predicate(Type::E));
        assert_eq!(
            ty("<e,<e,t>>"),
            Type::function(Type::E, Type::predicate(Type::E))
        );
        assert_eq!(
            ty("< <e, t> , t >"),
            Type::function(Type::predicate(Type::E), Type::T)
        );
    }

    #[test]
    fn test_parse_composite_without_commas() {
        assert_eq!(ty("<et>"), ty("<e,t>"));
        assert_eq!(ty("<e<et>>"), ty("<e,<e,t>>"));
        assert_eq!(ty("<<et>t>"), ty("<<e,t>,t>"));
    }

    #[test]
    fn test_parse_products() {
        assert_eq!(ty("e×e"), Type::Product(vec![Type::E, Type::E]));
        assert_eq!(ty("e*e*t"), Type::Product(vec![Type::E, Type::E, Type::T]));
        assert_eq!(
            ty("<e*e,t>"),
            Type::predicate(Type::Product(vec![Type::E, Type::E]))
        );
        assert_eq!(
            ty("(e*e)*e"),
            Type::Product(vec![Type::Product(vec![Type::E, Type::E]), Type::E])
        );
    }

    #[test]
    fn test_parse_errors_carry_positions() {
        let err = parse_type("<e,t").unwrap_err();
        assert_eq!(err.position(), 4);

        let err = parse_type("<e,T>").unwrap_err();
        assert_eq!(err.position(), 3);

        let err = parse_type("e t").unwrap_err();
        assert_eq!(err.position(), 2);

        assert!(parse_type("").is_err());
        assert!(parse_type("'").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ty("<e,<e,t>>").to_string(), "<e,<e,t>>");
        assert_eq!(ty("<e*e,t>").to_string(), "<e×e,t>");
        assert_eq!(ty("<e×e,t>").display(Notation::Ascii).to_string(), "<e*e,t>");
        assert_eq!(ty("<'a,t>").to_string(), "<'a,t>");
        assert_eq!(ty("(e*e)*e").to_string(), "(e×e)×e");
    }

    #[test]
    fn test_display_parses_back() {
        for input in ["<e,t>", "<<e,t>,<<e,t>,t>>", "<e×e,t>", "(e×e)×e", "<'a,<'b,'a>>"] {
            let parsed = ty(input);
            assert_eq!(ty(&parsed.to_string()), parsed);
            assert_eq!(ty(&parsed.display(Notation::Ascii).to_string()), parsed);
        }
    }

    #[test]
    fn test_align_concrete_types() {
        assert!(ty("<e,t>").align(&ty("<e,t>")).unwrap().is_empty());
        let err = ty("<e,t>").align(&ty("<e,e>")).unwrap_err();
        assert_eq!(
            err,
            TypeError::Mismatch {
                expected: ty("<e,t>"),
                found: ty("<e,e>"),
            }
        );
        assert!(ty("e×e").align(&ty("e×e×e")).is_err());
    }

    #[test]
    fn test_align_type_variables() {
        let subst = ty("<'a,t>").align(&ty("<<e,t>,t>")).unwrap();
        assert_eq!(subst.get('a'), Some(&ty("<e,t>")));

        // Variables on both sides
        let subst = ty("<'a,e>").align(&ty("<t,'b>")).unwrap();
        assert_eq!(subst.get('a'), Some(&Type::T));
        assert_eq!(subst.get('b'), Some(&Type::E));

        // Consistent use of the same variable
        let subst = ty("<'a,'a>").align(&ty("<e,e>")).unwrap();
        assert_eq!(subst.apply(&Type::Var('a')), Type::E);
        assert!(ty("<'a,'a>").align(&ty("<e,t>")).is_err());
    }

    #[test]
    fn test_align_is_idempotent() {
        let subst = ty("<'a,<'b,'a>>").align(&ty("<'b,<e,'c>>")).unwrap();
        for (_, bound) in subst.iter() {
            assert_eq!(subst.apply(bound), *bound);
        }
        assert_eq!(
            subst.apply(&ty("<'a,<'b,'a>>")),
            subst.apply(&ty("<'b,<e,'c>>"))
        );
    }

    #[test]
    fn test_align_occurs_check() {
        let err = ty("'a").align(&ty("<'a,t>")).unwrap_err();
        assert!(matches!(err, TypeError::InfiniteType { var: 'a', .. }));
        assert!(err.is_mismatch());
    }

    #[test]
    fn test_apply_to() {
        let (result, subst) = ty("<'a,'a>")
            .apply_to(&Type::E, &"id")
            .unwrap();
        assert_eq!(result, Type::E);
        assert_eq!(subst.get('a'), Some(&Type::E));

        let err = Type::E.apply_to(&Type::E, &"j").unwrap_err();
        assert!(matches!(err, TypeError::Evaluation { .. }));
        assert!(!err.is_mismatch());
    }

    #[test]
    fn test_apply_to_renames_argument_apart() {
        let id = ty("<'a,'a>");
        let (result, _) = id.apply_to(&id, &"id").unwrap();
        assert_eq!(result, ty("<'b,'b>"));

        let (result, _) = ty("<<'a,t>,'a>").apply_to(&ty("<'a,t>"), &"f").unwrap();
        assert_eq!(result, ty("'b"));

        let renaming = ty("<'a,'b>").rename_apart(&ty("<'b,e>"));
        assert_eq!(renaming.get('a'), None);
        assert_eq!(renaming.get('b'), Some(&ty("'c")));
        assert!(ty("<e,t>").rename_apart(&id).is_empty());
    }

    #[test]
    fn test_compose() {
        let first = ty("'a").align(&ty("'b")).unwrap();
        let second = ty("'b").align(&Type::E).unwrap();
        let composed = second.compose(&first);
        assert_eq!(composed.apply(&ty("'a")), Type::E);
        assert_eq!(composed.apply(&ty("'b")), Type::E);
    }
}
