use std::{collections::BTreeSet, fmt};

use crate::{
    engine::{self, EvaluationError, Step},
    types::{Type, TypeError, TypeSubstitution},
};

/// Symbol set used when printing types and expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Notation {
    /// λ ∀ ∃ ι ¬ ∧ ∨ → ↔ ⊆ ⊂ ×
    #[default]
    Unicode,
    /// L A E I ~ & | -> <-> <= < *
    Ascii,
}

/// A typed name: a variable or a constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    pub name: String,
    pub ty: Type,
}

impl Identifier {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    #[must_use]
    pub fn instantiate(&self, subst: &TypeSubstitution) -> Self {
        Self::new(self.name.clone(), subst.apply(&self.ty))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Variable-binding operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Binder {
    Lambda,
    ForAll,
    Exists,
    Iota,
}

impl Binder {
    #[must_use]
    pub const fn symbol(self, notation: Notation) -> &'static str {
        match (self, notation) {
            (Self::Lambda, Notation::Unicode) => "λ",
            (Self::ForAll, Notation::Unicode) => "∀",
            (Self::Exists, Notation::Unicode) => "∃",
            (Self::Iota, Notation::Unicode) => "ι",
            (Self::Lambda, Notation::Ascii) => "L",
            (Self::ForAll, Notation::Ascii) => "A",
            (Self::Exists, Notation::Ascii) => "E",
            (Self::Iota, Notation::Ascii) => "I",
        }
    }

    #[must_use]
    pub const fn from_ascii(letter: char) -> Option<Self> {
        match letter {
            'L' => Some(Self::Lambda),
            'A' => Some(Self::ForAll),
            'E' => Some(Self::Exists),
            'I' => Some(Self::Iota),
            _ => None,
        }
    }
}

/// Binary truth-functional connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Connective {
    And,
    Or,
    If,
    Iff,
}

impl Connective {
    #[must_use]
    pub const fn symbol(self, notation: Notation) -> &'static str {
        match (self, notation) {
            (Self::And, Notation::Unicode) => "∧",
            (Self::Or, Notation::Unicode) => "∨",
            (Self::If, Notation::Unicode) => "→",
            (Self::Iff, Notation::Unicode) => "↔",
            (Self::And, Notation::Ascii) => "&",
            (Self::Or, Notation::Ascii) => "|",
            (Self::If, Notation::Ascii) => "->",
            (Self::Iff, Notation::Ascii) => "<->",
        }
    }

    const fn precedence(self) -> u8 {
        match self {
            Self::Iff => 1,
            Self::If => 2,
            Self::Or => 3,
            Self::And => 4,
        }
    }
}

/// Relations between sets, i.e. between `<a,t>` characteristic functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetRelation {
    Subset,
    ProperSubset,
}

impl SetRelation {
    #[must_use]
    pub const fn symbol(self, notation: Notation) -> &'static str {
        match (self, notation) {
            (Self::Subset, Notation::Unicode) => "⊆",
            (Self::ProperSubset, Notation::Unicode) => "⊂",
            (Self::Subset, Notation::Ascii) => "<=",
            (Self::ProperSubset, Notation::Ascii) => "<",
        }
    }
}

/// Typed lambda-calculus expression.
///
/// Expressions are immutable trees; every operation returns a new tree.
/// Bound variables are named, so equality (`==`) is literal: `λx.P(x)` and
/// `λy.P(y)` differ but are [alpha-equivalent](Expr::alpha_equivalent).
///
/// # Examples
/// ```
/// use lambdacalc::{parse, types::Type};
///
/// let expr = parse("Lx.P(x) & Q(x)").unwrap();
/// assert_eq!(expr.to_string(), "λx.P(x) ∧ Q(x)");
/// assert_eq!(expr.get_type().unwrap(), Type::predicate(Type::E));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Var(Identifier),
    Const(Identifier),
    Binder {
        binder: Binder,
        var: Identifier,
        body: Box<Expr>,
    },
    /// Function application; a multi-argument call has an `ArgList` argument.
    App(Box<Expr>, Box<Expr>),
    ArgList(Vec<Expr>),
    Not(Box<Expr>),
    Connective(Connective, Box<Expr>, Box<Expr>),
    Equality(Box<Expr>, Box<Expr>),
    SetRelation(SetRelation, Box<Expr>, Box<Expr>),
}

impl Expr {
    #[must_use]
    pub fn var(name: impl Into<String>, ty: Type) -> Self {
        Self::Var(Identifier::new(name, ty))
    }

    #[must_use]
    pub fn constant(name: impl Into<String>, ty: Type) -> Self {
        Self::Const(Identifier::new(name, ty))
    }

    #[must_use]
    pub fn binder(binder: Binder, var: Identifier, body: Self) -> Self {
        Self::Binder {
            binder,
            var,
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn lambda(var: Identifier, body: Self) -> Self {
        Self::binder(Binder::Lambda, var, body)
    }

    #[must_use]
    pub fn app(function: Self, argument: Self) -> Self {
        Self::App(Box::new(function), Box::new(argument))
    }

    #[must_use]
    pub fn not(operand: Self) -> Self {
        Self::Not(Box::new(operand))
    }

    #[must_use]
    pub fn connective(connective: Connective, left: Self, right: Self) -> Self {
        Self::Connective(connective, Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::connective(Connective::And, left, right)
    }

    #[must_use]
    pub fn equality(left: Self, right: Self) -> Self {
        Self::Equality(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn set_relation(relation: SetRelation, left: Self, right: Self) -> Self {
        Self::SetRelation(relation, Box::new(left), Box::new(right))
    }

    /// Immediate subexpressions, left to right.
    #[must_use]
    pub fn children(&self) -> Vec<&Self> {
        match self {
            Self::Var(_) | Self::Const(_) => Vec::new(),
            Self::Binder { body, .. } | Self::Not(body) => vec![body.as_ref()],
            Self::App(left, right)
            | Self::Connective(_, left, right)
            | Self::Equality(left, right)
            | Self::SetRelation(_, left, right) => vec![left.as_ref(), right.as_ref()],
            Self::ArgList(items) => items.iter().collect(),
        }
    }

    /// Rebuilds this node with `f` applied to each immediate subexpression.
    #[must_use]
    pub fn map_children(&self, mut f: impl FnMut(&Self) -> Self) -> Self {
        match self {
            Self::Var(_) | Self::Const(_) => self.clone(),
            Self::Binder { binder, var, body } => Self::binder(*binder, var.clone(), f(body)),
            Self::App(function, argument) => Self::app(f(function), f(argument)),
            Self::ArgList(items) => Self::ArgList(items.iter().map(&mut f).collect()),
            Self::Not(operand) => Self::not(f(operand)),
            Self::Connective(connective, left, right) => {
                Self::connective(*connective, f(left), f(right))
            }
            Self::Equality(left, right) => Self::equality(f(left), f(right)),
            Self::SetRelation(relation, left, right) => {
                Self::set_relation(*relation, f(left), f(right))
            }
        }
    }

    /// Computes the type of the expression.
    ///
    /// # Errors
    /// Returns `TypeError::Mismatch` when operands have the wrong types and
    /// `TypeError::Evaluation` when something that is not a function is
    /// applied or a set relation compares non-sets.
    pub fn get_type(&self) -> Result<Type, TypeError> {
        match self {
            Self::Var(id) | Self::Const(id) => Ok(id.ty.clone()),
            Self::Binder {
                binder: Binder::Lambda,
                var,
                body,
            } => Ok(Type::function(var.ty.clone(), body.get_type()?)),
            Self::Binder {
                binder: Binder::ForAll | Binder::Exists,
                body,
                ..
            } => {
                expect_truth_value(body)?;
                Ok(Type::T)
            }
            Self::Binder {
                binder: Binder::Iota,
                var,
                body,
            } => {
                expect_truth_value(body)?;
                Ok(var.ty.clone())
            }
            Self::App(function, argument) => {
                let (ty, _) = function
                    .get_type()?
                    .apply_to(&argument.get_type()?, function)?;
                Ok(ty)
            }
            Self::ArgList(items) => Ok(Type::Product(
                items.iter().map(Self::get_type).collect::<Result<_, _>>()?,
            )),
            Self::Not(operand) => {
                expect_truth_value(operand)?;
                Ok(Type::T)
            }
            Self::Connective(_, left, right) => {
                expect_truth_value(left)?;
                expect_truth_value(right)?;
                Ok(Type::T)
            }
            Self::Equality(left, right) => {
                left.get_type()?.align(&right.get_type()?)?;
                Ok(Type::T)
            }
            Self::SetRelation(_, left, right) => {
                let left_type = left.get_type()?;
                let subst = left_type.align(&right.get_type()?)?;
                let set_type = subst.apply(&left_type);
                match set_type.range() {
                    Some(range) if Type::T.align(range).is_ok() => Ok(Type::T),
                    _ => Err(TypeError::Evaluation {
                        expr: self.to_string(),
                        reason: format!("type {set_type} is not a set type"),
                    }),
                }
            }
        }
    }

    /// Whether `self` and `other` differ only in the names of bound
    /// variables.
    #[must_use]
    pub fn alpha_equivalent(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }

    /// Whether `self` and `other` have the same operator and binder
    /// structure. Identifiers are ignored, so `P(a)` matches `Q(b)`.
    #[must_use]
    pub fn operator_equivalent(&self, other: &Self) -> bool {
        self.shape_key() == other.shape_key()
    }

    /// Whether `self` and `other` are alpha-equivalent once the operands of
    /// ∧ and ∨ are regrouped and reordered and the sides of ↔ and = are
    /// swapped.
    #[must_use]
    pub fn ac_equivalent(&self, other: &Self) -> bool {
        self.canonical().ac_key() == other.canonical().ac_key()
    }

    /// Alpha-normal form: every bound variable is renamed after its binding
    /// depth, so alpha-equivalent expressions have equal canonical forms.
    #[must_use]
    pub fn canonical(&self) -> Self {
        self.canonical_in(&mut Vec::new())
    }

    fn canonical_in(&self, scope: &mut Vec<(String, String)>) -> Self {
        match self {
            Self::Var(id) => scope
                .iter()
                .rev()
                .find(|(name, _)| *name == id.name)
                .map_or_else(
                    || self.clone(),
                    |(_, renamed)| Self::var(renamed.clone(), id.ty.clone()),
                ),
            Self::Binder { binder, var, body } => {
                let renamed = format!("#{}", scope.len());
                scope.push((var.name.clone(), renamed.clone()));
                let body = body.canonical_in(scope);
                scope.pop();
                Self::binder(*binder, Identifier::new(renamed, var.ty.clone()), body)
            }
            _ => self.map_children(|child| child.canonical_in(scope)),
        }
    }

    fn ac_key(&self) -> String {
        match self {
            Self::Var(id) => format!("var {}:{}", id.name, id.ty),
            Self::Const(id) => format!("const {}:{}", id.name, id.ty),
            Self::Binder { binder, var, body } => {
                format!("{binder:?} {}:{}({})", var.name, var.ty, body.ac_key())
            }
            Self::App(function, argument) => {
                format!("app({},{})", function.ac_key(), argument.ac_key())
            }
            Self::ArgList(items) => {
                let keys: Vec<String> = items.iter().map(Self::ac_key).collect();
                format!("tuple({})", keys.join(","))
            }
            Self::Not(operand) => format!("not({})", operand.ac_key()),
            Self::Connective(connective @ (Connective::And | Connective::Or), ..) => {
                let mut keys = Vec::new();
                self.collect_operands(*connective, &mut keys);
                keys.sort();
                format!("{connective:?}({})", keys.join(","))
            }
            Self::Connective(Connective::Iff, left, right) => {
                format!("Iff({})", sorted_pair(left, right))
            }
            Self::Connective(Connective::If, left, right) => {
                format!("If({},{})", left.ac_key(), right.ac_key())
            }
            Self::Equality(left, right) => format!("eq({})", sorted_pair(left, right)),
            Self::SetRelation(relation, left, right) => {
                format!(
                    "{relation:?}({},{})",
                    left.ac_key(),
                    right.ac_key()
                )
            }
        }
    }

    fn shape_key(&self) -> String {
        match self {
            Self::Var(_) | Self::Const(_) => "_".to_owned(),
            Self::Binder { binder, body, .. } => format!("{binder:?}({})", body.shape_key()),
            Self::App(function, argument) => {
                format!("app({},{})", function.shape_key(), argument.shape_key())
            }
            Self::ArgList(items) => {
                let keys: Vec<String> = items.iter().map(Self::shape_key).collect();
                format!("tuple({})", keys.join(","))
            }
            Self::Not(operand) => format!("not({})", operand.shape_key()),
            Self::Connective(connective, left, right) => {
                format!("{connective:?}({},{})", left.shape_key(), right.shape_key())
            }
            Self::Equality(left, right) => format!("eq({},{})", left.shape_key(), right.shape_key()),
            Self::SetRelation(relation, left, right) => {
                format!("{relation:?}({},{})", left.shape_key(), right.shape_key())
            }
        }
    }

    // Flattens a chain of one associative connective.
    fn collect_operands(&self, connective: Connective, keys: &mut Vec<String>) {
        match self {
            Self::Connective(inner, left, right) if *inner == connective => {
                left.collect_operands(connective, keys);
                right.collect_operands(connective, keys);
            }
            _ => keys.push(self.ac_key()),
        }
    }

    /// Variables occurring free in the expression.
    #[must_use]
    pub fn free_variables(&self) -> BTreeSet<&Identifier> {
        let mut free = BTreeSet::new();
        self.collect_free(&mut Vec::new(), &mut free);
        free
    }

    fn collect_free<'a>(&'a self, bound: &mut Vec<&'a str>, free: &mut BTreeSet<&'a Identifier>) {
        match self {
            Self::Var(id) => {
                if !bound.contains(&id.name.as_str()) {
                    free.insert(id);
                }
            }
            Self::Binder { var, body, .. } => {
                bound.push(&var.name);
                body.collect_free(bound, free);
                bound.pop();
            }
            _ => {
                for child in self.children() {
                    child.collect_free(bound, free);
                }
            }
        }
    }

    /// Whether a variable called `name` occurs free.
    #[must_use]
    pub fn has_free(&self, name: &str) -> bool {
        self.free_variables().iter().any(|id| id.name == name)
    }

    /// Every identifier name in the expression, bound, free or constant.
    #[must_use]
    pub fn names(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Self::Var(id) | Self::Const(id) => {
                names.insert(&id.name);
            }
            Self::Binder { var, body, .. } => {
                names.insert(&var.name);
                body.collect_names(names);
            }
            _ => {
                for child in self.children() {
                    child.collect_names(names);
                }
            }
        }
    }

    /// Applies a type substitution to every identifier in the expression.
    #[must_use]
    pub fn instantiate(&self, subst: &TypeSubstitution) -> Self {
        if subst.is_empty() {
            return self.clone();
        }
        match self {
            Self::Var(id) => Self::Var(id.instantiate(subst)),
            Self::Const(id) => Self::Const(id.instantiate(subst)),
            Self::Binder { binder, var, body } => {
                Self::binder(*binder, var.instantiate(subst), body.instantiate(subst))
            }
            _ => self.map_children(|child| child.instantiate(subst)),
        }
    }

    /// Performs one step of lambda conversion; see [`engine::reduce_once`].
    ///
    /// # Errors
    /// Returns an error if the redex to be reduced is ill-typed.
    pub fn reduce_one_step(&self) -> Result<Option<Step>, EvaluationError> {
        engine::reduce_once(self)
    }

    #[must_use]
    pub const fn display(&self, notation: Notation) -> NotatedExpr<'_> {
        NotatedExpr {
            expr: self,
            notation,
        }
    }

    const fn precedence(&self) -> u8 {
        match self {
            Self::Binder { .. } => 0,
            Self::Connective(connective, ..) => connective.precedence(),
            Self::Equality(..) | Self::SetRelation(..) => 5,
            Self::Not(_) => 6,
            Self::Var(_) | Self::Const(_) | Self::App(..) | Self::ArgList(_) => 7,
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, notation: Notation, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "(")?;
            self.write(f, notation, 0)?;
            return write!(f, ")");
        }
        match self {
            Self::Var(id) | Self::Const(id) => f.write_str(&id.name),
            Self::Binder { binder, var, body } => {
                write!(f, "{}{}.", binder.symbol(notation), var.name)?;
                body.write(f, notation, 0)
            }
            Self::App(function, argument) => {
                if matches!(**function, Self::Var(_) | Self::Const(_) | Self::App(..)) {
                    function.write(f, notation, 7)?;
                } else {
                    write!(f, "[")?;
                    function.write(f, notation, 0)?;
                    write!(f, "]")?;
                }
                match argument.as_ref() {
                    Self::ArgList(items) => write_list(f, items, notation),
                    argument => {
                        write!(f, "(")?;
                        argument.write(f, notation, 0)?;
                        write!(f, ")")
                    }
                }
            }
            Self::ArgList(items) => write_list(f, items, notation),
            Self::Not(operand) => {
                let symbol = match notation {
                    Notation::Unicode => "¬",
                    Notation::Ascii => "~",
                };
                f.write_str(symbol)?;
                operand.write(f, notation, 6)
            }
            Self::Connective(connective, left, right) => {
                let (left_min, right_min) = match connective {
                    // ↔ groups to the left, → to the right
                    Connective::Iff => (1, 2),
                    Connective::If => (3, 2),
                    Connective::Or => (3, 4),
                    Connective::And => (4, 5),
                };
                left.write(f, notation, left_min)?;
                write!(f, " {} ", connective.symbol(notation))?;
                right.write(f, notation, right_min)
            }
            Self::Equality(left, right) => {
                left.write(f, notation, 6)?;
                write!(f, " = ")?;
                right.write(f, notation, 6)
            }
            Self::SetRelation(relation, left, right) => {
                left.write(f, notation, 6)?;
                write!(f, " {} ", relation.symbol(notation))?;
                right.write(f, notation, 6)
            }
        }
    }
}

fn expect_truth_value(expr: &Expr) -> Result<(), TypeError> {
    Type::T.align(&expr.get_type()?).map(|_| ())
}

fn sorted_pair(left: &Expr, right: &Expr) -> String {
    let mut keys = [left.ac_key(), right.ac_key()];
    keys.sort();
    keys.join(",")
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr], notation: Notation) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        item.write(f, notation, 0)?;
    }
    write!(f, ")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, Notation::Unicode, 0)
    }
}

/// An expression printed in a chosen notation.
pub struct NotatedExpr<'a> {
    expr: &'a Expr,
    notation: Notation,
}

impl fmt::Display for NotatedExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.write(f, self.notation, 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, Parser};

    fn parse(input: &str) -> Expr {
        Parser::parse(input, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_display_unicode_and_ascii() {
        let expr = parse("Lx.Ey.R(x,y) & ~P(y)");
        assert_eq!(expr.to_string(), "λx.∃y.R(x,y) ∧ ¬P(y)");
        assert_eq!(
            expr.display(Notation::Ascii).to_string(),
            "Lx.Ey.R(x,y) & ~P(y)"
        );
    }

    #[test]
    fn test_display_parenthesizes() {
        assert_eq!(parse("(p | q) & p").to_string(), "(p ∨ q) ∧ p");
        assert_eq!(parse("p | q & p").to_string(), "p ∨ q ∧ p");
        assert_eq!(parse("(p -> q) -> p").to_string(), "(p → q) → p");
        assert_eq!(parse("p -> (q -> p)").to_string(), "p → q → p");
        assert_eq!(parse("~(p & q)").to_string(), "¬(p ∧ q)");
        assert_eq!(parse("p & (Lx.P(x))(a) = b").to_string(), "p ∧ [λx.P(x)](a) = b");
        assert_eq!(parse("p & Ax.P(x)").to_string(), "p ∧ (∀x.P(x))");
    }

    #[test]
    fn test_lambda_type() {
        assert_eq!(parse("Lx.P(x)").get_type().unwrap(), Type::predicate(Type::E));
        assert_eq!(
            parse("LX.Lx.X(x)").get_type().unwrap(),
            Type::function(Type::predicate(Type::E), Type::predicate(Type::E))
        );
    }

    #[test]
    fn test_quantifier_types() {
        assert_eq!(parse("Ax.P(x)").get_type().unwrap(), Type::T);
        assert_eq!(parse("Ix.P(x)").get_type().unwrap(), Type::E);
        let err = parse("Ex.x").get_type().unwrap_err();
        assert_eq!(
            err,
            TypeError::Mismatch {
                expected: Type::T,
                found: Type::E,
            }
        );
    }

    #[test]
    fn test_application_types() {
        assert_eq!(parse("P(a)").get_type().unwrap(), Type::T);
        assert_eq!(parse("R(a,b)").get_type().unwrap(), Type::T);
        assert!(matches!(
            parse("P(a,b)").get_type(),
            Err(TypeError::Mismatch { .. })
        ));
        assert!(matches!(
            parse("a(b)").get_type(),
            Err(TypeError::Evaluation { .. })
        ));
        assert!(matches!(
            parse("P(P)").get_type(),
            Err(TypeError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_connective_and_relation_types() {
        assert_eq!(parse("p & ~q -> p <-> q").get_type().unwrap(), Type::T);
        assert!(parse("p & a").get_type().is_err());
        assert_eq!(parse("a = x").get_type().unwrap(), Type::T);
        assert!(parse("a = P").get_type().is_err());
        assert_eq!(parse("P <= Q").get_type().unwrap(), Type::T);
        assert!(matches!(
            parse("a <= b").get_type(),
            Err(TypeError::Evaluation { .. })
        ));
    }

    #[test]
    fn test_polymorphic_application_type() {
        let id = Expr::constant("id", "<'a,'a>".parse().unwrap());
        let applied = Expr::app(id.clone(), parse("P"));
        assert_eq!(applied.get_type().unwrap(), Type::predicate(Type::E));
        let applied = Expr::app(id.clone(), parse("a"));
        assert_eq!(applied.get_type().unwrap(), Type::E);
        // The argument's 'a is not the function's 'a
        let applied = Expr::app(id.clone(), id);
        assert_eq!(applied.get_type().unwrap(), "<'b,'b>".parse::<Type>().unwrap());
    }

    #[test]
    fn test_alpha_equivalence() {
        assert!(parse("Lx.P(x)").alpha_equivalent(&parse("Ly.P(y)")));
        assert!(parse("Lx.Ly.R(x,y)").alpha_equivalent(&parse("Ly.Lx.R(y,x)")));
        assert!(!parse("Lx.Ly.R(x,y)").alpha_equivalent(&parse("Lx.Ly.R(y,x)")));
        // Free variables are not renamed
        assert!(!parse("P(x)").alpha_equivalent(&parse("P(y)")));
        assert!(!parse("Lx.R(x,y)").alpha_equivalent(&parse("Lz.R(z,x)")));
        // Binder kinds matter
        assert!(!parse("Ax.P(x)").alpha_equivalent(&parse("Ex.P(x)")));
        // Shadowing
        assert!(parse("Lx.Lx.P(x)").alpha_equivalent(&parse("Ly.Lx.P(x)")));
        assert!(!parse("Lx.Lx.P(x)").alpha_equivalent(&parse("Lx.Ly.P(x)")));
    }

    #[test]
    fn test_operator_equivalence() {
        assert!(parse("P(a)").operator_equivalent(&parse("P(b)")));
        assert!(parse("R(x,y)").operator_equivalent(&parse("R(y,x)")));
        assert!(parse("P(x) & Q(y)").operator_equivalent(&parse("P(y) & Q(x)")));
        assert!(parse("Lx.P(x) -> q").operator_equivalent(&parse("Ly.Q(a) -> p")));
        assert!(!parse("P(a)").operator_equivalent(&parse("P(a) & q")));
        assert!(!parse("Ax.P(x)").operator_equivalent(&parse("Ex.P(x)")));
        assert!(!parse("p & q").operator_equivalent(&parse("p | q")));
        assert!(!parse("[Lx.P(x)](a)").operator_equivalent(&parse("P(a)")));
    }

    #[test]
    fn test_ac_equivalence() {
        assert!(parse("P(a) & Q(b)").ac_equivalent(&parse("Q(b) & P(a)")));
        assert!(parse("(p & q) & P(a)").ac_equivalent(&parse("p & (P(a) & q)")));
        assert!(parse("Lx.P(x) | Q(x)").ac_equivalent(&parse("Ly.Q(y) | P(y)")));
        assert!(parse("a = b").ac_equivalent(&parse("b = a")));
        assert!(parse("p <-> q").ac_equivalent(&parse("q <-> p")));
        assert!(!parse("p -> q").ac_equivalent(&parse("q -> p")));
        assert!(!parse("p & q").ac_equivalent(&parse("p | q")));
        assert!(!parse("(p & q) | p").ac_equivalent(&parse("p & (q | p)")));
        // Identifiers still count
        assert!(!parse("P(a)").ac_equivalent(&parse("P(b)")));
    }

    #[test]
    fn test_free_variables() {
        let expr = parse("Lx.R(x,y) & Ez.P(z) & P(a)");
        let free: Vec<&str> = expr
            .free_variables()
            .iter()
            .map(|id| id.name.as_str())
            .collect();
        assert_eq!(free, vec!["y"]);
        assert!(expr.has_free("y"));
        assert!(!expr.has_free("x"));
        assert!(!expr.has_free("a"));
    }

    #[test]
    fn test_names() {
        let binding = parse("Lx.R(x,y) & P(a)");
        let names = binding.names();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["P", "R", "a", "x", "y"]);
    }

    #[test]
    fn test_instantiate() {
        let subst = Type::Var('a').align(&Type::E).unwrap();
        let expr = Expr::constant("f", "<'a,t>".parse().unwrap());
        assert_eq!(
            expr.instantiate(&subst),
            Expr::constant("f", Type::predicate(Type::E))
        );
    }
}
