use std::{collections::BTreeSet, fmt};

use log::debug;
use thiserror::Error;

use crate::{
    expr::{Expr, Identifier},
    types::{Type, TypeError},
};

/// Semantic composition rules for the nodes of a syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    FunctionApplication,
    PredicateModification,
    NonBranching,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FunctionApplication => "Function Application",
            Self::PredicateModification => "Predicate Modification",
            Self::NonBranching => "Non-Branching Nodes",
        })
    }
}

/// The meaning of a node and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub rule: Rule,
    pub meaning: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error("No composition rule applies to {left} and {right}")]
    NoRule { left: String, right: String },
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error("Cannot compose a node with {0} children")]
    Arity(usize),
}

/// Combines the meanings of two sister nodes.
///
/// Function Application is tried first, with either sister as the function;
/// then Predicate Modification, which conjoins two predicates of the same
/// type `<a,t>` into `λx.[L(x) ∧ R(x)]`.
///
/// The result is not reduced.
///
/// # Errors
/// Returns `CompositionError::Type` if a sister is ill-typed and
/// `CompositionError::NoRule` if no rule fits the two types.
///
/// # Examples
/// ```
/// use lambdacalc::{composition::{Rule, compose}, parse};
///
/// let composed = compose(&parse("P").unwrap(), &parse("Q").unwrap()).unwrap();
/// assert_eq!(composed.rule, Rule::PredicateModification);
/// assert_eq!(composed.meaning.to_string(), "λx.P(x) ∧ Q(x)");
/// ```
pub fn compose(left: &Expr, right: &Expr) -> Result<Composed, CompositionError> {
    let left_type = left.get_type()?;
    let right_type = right.get_type()?;

    if applies_to(&left_type, &right_type) {
        debug!("{left} + {right}: function application");
        return Ok(Composed {
            rule: Rule::FunctionApplication,
            meaning: Expr::app(left.clone(), right.clone()),
        });
    }
    if applies_to(&right_type, &left_type) {
        debug!("{left} + {right}: function application, right to left");
        return Ok(Composed {
            rule: Rule::FunctionApplication,
            meaning: Expr::app(right.clone(), left.clone()),
        });
    }

    if let (Some(left_domain), Some(right_domain)) =
        (predicate_domain(&left_type), predicate_domain(&right_type))
    {
        if let Ok(subst) = left_domain.align(right_domain) {
            let mut used: BTreeSet<&str> = left.names();
            used.extend(right.names());
            let var = Identifier::new(fresh_name(&used), subst.apply(left_domain));
            debug!("{left} + {right}: predicate modification over {}", var.name);
            let conjunction = Expr::and(
                Expr::app(left.clone(), Expr::Var(var.clone())),
                Expr::app(right.clone(), Expr::Var(var.clone())),
            );
            return Ok(Composed {
                rule: Rule::PredicateModification,
                meaning: Expr::lambda(var, conjunction),
            });
        }
    }

    Err(CompositionError::NoRule {
        left: left.to_string(),
        right: right.to_string(),
    })
}

fn applies_to(function: &Type, argument: &Type) -> bool {
    let argument = argument.rename_apart(function).apply(argument);
    function
        .domain()
        .is_some_and(|domain| domain.align(&argument).is_ok())
}

fn predicate_domain(ty: &Type) -> Option<&Type> {
    match ty {
        Type::Composite(domain, range) if Type::T.align(range).is_ok() => Some(domain),
        _ => None,
    }
}

fn fresh_name(used: &BTreeSet<&str>) -> String {
    let mut name = String::from("x");
    while used.contains(name.as_str()) {
        name.push('\'');
    }
    name
}

/// A syntax tree whose leaves carry lexical meanings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tree {
    Leaf(Expr),
    Branch(Vec<Tree>),
}

impl Tree {
    #[must_use]
    pub const fn leaf(meaning: Expr) -> Self {
        Self::Leaf(meaning)
    }

    #[must_use]
    pub const fn branch(children: Vec<Self>) -> Self {
        Self::Branch(children)
    }

    /// Computes the meaning of the tree bottom-up.
    ///
    /// # Errors
    /// Fails on ill-typed leaves, on branches with no or more than two
    /// children, and on sisters no rule can combine.
    ///
    /// # Examples
    /// ```
    /// use lambdacalc::{composition::Tree, parse};
    ///
    /// let tree = Tree::branch(vec![
    ///     Tree::leaf(parse("a").unwrap()),
    ///     Tree::branch(vec![Tree::leaf(parse("P").unwrap())]),
    /// ]);
    /// assert_eq!(tree.interpret().unwrap().meaning.to_string(), "P(a)");
    /// ```
    pub fn interpret(&self) -> Result<Composed, CompositionError> {
        match self {
            Self::Leaf(meaning) => {
                meaning.get_type()?;
                Ok(Composed {
                    rule: Rule::NonBranching,
                    meaning: meaning.clone(),
                })
            }
            Self::Branch(children) => match children.as_slice() {
                [only] => Ok(Composed {
                    rule: Rule::NonBranching,
                    meaning: only.interpret()?.meaning,
                }),
                [left, right] => compose(&left.interpret()?.meaning, &right.interpret()?.meaning),
                _ => Err(CompositionError::Arity(children.len())),
            },
        }
    }
}
