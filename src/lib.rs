pub mod composition;
pub mod engine;
pub mod exercise;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod typer;
pub mod types;

use anyhow::Result;
// Re-export main types and functions for convenient use
pub use composition::{CompositionError, Rule, Tree, compose};
pub use engine::{
    EvaluationError, Step, StepKind, derivation, evaluate, reduce_once, rewrite_leftmost_redex,
    substitute,
};
pub use exercise::{ConversionExercise, Feedback};
pub use expr::{Binder, Connective, Expr, Identifier, Notation, SetRelation};
pub use lexer::{Lexer, Token};
pub use parser::{ParseOptions, Parser, SyntaxError};
pub use typer::{IdentKind, IdentifierTyper};
pub use types::{Type, TypeError, parse_type};

/// Parse an expression with the given options.
///
/// # Errors
/// Returns `SyntaxError` if the input cannot be tokenized or parsed.
pub fn parse_expression(input: &str, options: &ParseOptions) -> Result<Expr, SyntaxError> {
    Parser::parse(input, options)
}

/// Parse an expression with ASCII binders, single-letter identifiers and the
/// default typing conventions.
///
/// # Errors
/// Returns `SyntaxError` if the input cannot be tokenized or parsed.
///
/// # Examples
/// ```
/// use lambdacalc::parse;
///
/// let expr = parse("Lx.P(x)").unwrap();
/// assert_eq!(expr, parse("λx.P(x)").unwrap());
///
/// // Brackets around a function and tuples of arguments
/// let expr = parse("[Lx.Ly.R(x,y)](a)(b)").unwrap();
/// let expr = parse("(λx.∃y.R(x,y) ∧ ¬P(y))(a)").unwrap();
/// ```
pub fn parse(input: &str) -> Result<Expr, SyntaxError> {
    parse_expression(input, &ParseOptions::default())
}

/// Parse an expression and reduce it as far as possible.
///
/// # Errors
/// Returns an error if parsing fails, a redex is ill-typed or reduction
/// exceeds the step limit.
///
/// # Examples
/// ```
/// use lambdacalc::parse_and_reduce;
///
/// let result = parse_and_reduce("(Lx.Ly.R(x,y))(y)", 100).unwrap();
/// assert_eq!(result.to_string(), "λy'.R(y,y')");
/// ```
pub fn parse_and_reduce(input: &str, max_steps: usize) -> Result<Expr> {
    let expr = parse(input)?;
    let result = evaluate(&expr, max_steps)?;
    Ok(result)
}
