use std::collections::BTreeSet;

use log::{debug, trace};
use thiserror::Error;

use crate::{
    expr::{Binder, Expr, Identifier, Notation},
    types::TypeError,
};

/// The kind of rewrite performed by one conversion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Bound variables were renamed so that a following beta reduction
    /// captures nothing.
    AlphaVariant,
    BetaReduction,
}

/// One step of lambda conversion together with its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub result: Expr,
}

/// Errors that can occur during lambda conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// Evaluation exceeded the maximum number of reduction steps.
    /// Contains the limit that was exceeded.
    #[error("Reduction limit of {0} steps exceeded")]
    ReductionLimitExceeded(usize),
    /// The function and argument of a redex do not fit together.
    #[error("Ill-typed redex: {0}")]
    Type(#[from] TypeError),
}

/// Replaces the free occurrences of `var` in `target` with `replacement`.
///
/// No capture checking is done: a binder inside `target` that binds a free
/// variable of `replacement` will capture it. Substitution stops below any
/// binder that rebinds `var`.
///
/// # Examples
/// ```
/// use lambdacalc::{engine::substitute, expr::{Expr, Identifier}, parse, types::Type};
///
/// let x = Identifier::new("x", Type::E);
/// let target = parse("P(x) & Lx.Q(x)").unwrap();
/// let result = substitute(&x, &parse("a").unwrap(), &target);
/// assert_eq!(result, parse("P(a) & Lx.Q(x)").unwrap());
/// ```
#[must_use]
pub fn substitute(var: &Identifier, replacement: &Expr, target: &Expr) -> Expr {
    match target {
        Expr::Var(id) if id.name == var.name => replacement.clone(),
        Expr::Binder { var: bound, .. } if bound.name == var.name => target.clone(),
        _ => target.map_children(|child| substitute(var, replacement, child)),
    }
}

/// Finds the leftmost-outermost redex `(λx.φ)(a)` and replaces it with
/// `rewrite(x, φ, a)`.
///
/// Returns `Ok(None)` when the expression contains no redex.
///
/// # Errors
/// Propagates the first error returned by `rewrite`.
pub fn rewrite_leftmost_redex<E, F>(expr: &Expr, rewrite: &mut F) -> Result<Option<Expr>, E>
where
    F: FnMut(&Identifier, &Expr, &Expr) -> Result<Expr, E>,
{
    if let Expr::App(function, argument) = expr {
        if let Expr::Binder {
            binder: Binder::Lambda,
            var,
            body,
        } = function.as_ref()
        {
            return rewrite(var, body.as_ref(), argument.as_ref()).map(Some);
        }
    }

    for (index, child) in expr.children().into_iter().enumerate() {
        if let Some(rewritten) = rewrite_leftmost_redex(child, rewrite)? {
            let mut rewritten = Some(rewritten);
            let mut position = 0;
            return Ok(Some(expr.map_children(|child| {
                let replaced = if position == index {
                    rewritten.take()
                } else {
                    None
                };
                position += 1;
                replaced.unwrap_or_else(|| child.clone())
            })));
        }
    }
    Ok(None)
}

/// Performs one step of lambda conversion using normal order evaluation
/// (leftmost-outermost redex first).
///
/// If reducing the redex `(λx.φ)(a)` would let a binder inside `φ` capture a
/// free variable of `a`, the step renames those binders instead and is an
/// [`StepKind::AlphaVariant`]; the next step then performs the beta
/// reduction. Polymorphic types in `φ` are specialised to the argument.
///
/// # Returns
/// * `Some(step)` - The rewrite performed and its result
/// * `None` - Expression contains no redex
///
/// # Errors
/// Returns `EvaluationError::Type` if the argument does not fit the lambda.
///
/// # Examples
/// ```
/// use lambdacalc::{engine::{StepKind, reduce_once}, parse};
///
/// let step = reduce_once(&parse("(Lx.P(x))(a)").unwrap()).unwrap().unwrap();
/// assert_eq!(step.kind, StepKind::BetaReduction);
/// assert_eq!(step.result.to_string(), "P(a)");
///
/// assert_eq!(reduce_once(&parse("P(a)").unwrap()).unwrap(), None);
/// ```
pub fn reduce_once(expr: &Expr) -> Result<Option<Step>, EvaluationError> {
    let mut kind = StepKind::BetaReduction;
    let mut reduce_redex = |var: &Identifier,
                            body: &Expr,
                            argument: &Expr|
     -> Result<Expr, EvaluationError> {
        let lambda = Expr::lambda(var.clone(), body.clone());
        let lambda_type = lambda.get_type()?;
        let renaming = argument.get_type()?.rename_apart(&lambda_type);
        let renamed_argument = argument.instantiate(&renaming);
        let (_, subst) = lambda_type.apply_to(&renamed_argument.get_type()?, &lambda)?;

        let mut used: BTreeSet<String> = body
            .names()
            .into_iter()
            .chain(argument.names())
            .map(str::to_string)
            .collect();
        used.insert(var.name.clone());

        let renamed = rename_capturing(body, var, argument, &mut used);
        if renamed != *body {
            kind = StepKind::AlphaVariant;
            return Ok(Expr::app(
                Expr::lambda(var.clone(), renamed),
                argument.clone(),
            ));
        }

        let reduced = substitute(
            &var.instantiate(&subst),
            &renamed_argument.instantiate(&subst),
            &body.instantiate(&subst),
        );
        trace!("β: [{lambda}]({argument}) ⇒ {reduced}");
        Ok(reduced)
    };
    let result = rewrite_leftmost_redex(expr, &mut reduce_redex)?;
    Ok(result.map(|result| Step { kind, result }))
}

// Renames every binder in `expr` that binds a free variable of `argument`
// while having `var` free beneath it.
fn rename_capturing(
    expr: &Expr,
    var: &Identifier,
    argument: &Expr,
    used: &mut BTreeSet<String>,
) -> Expr {
    match expr {
        Expr::Binder { var: bound, .. } if bound.name == var.name => expr.clone(),
        Expr::Binder {
            binder,
            var: bound,
            body,
        } => {
            let body = rename_capturing(body, var, argument, used);
            if argument.has_free(&bound.name) && body.has_free(&var.name) {
                let fresh = fresh_variable(bound, used);
                debug!(
                    "Renaming {} to {} to avoid capture by {}",
                    bound.name,
                    fresh.name,
                    binder.symbol(Notation::Unicode)
                );
                let body = substitute(bound, &Expr::Var(fresh.clone()), &body);
                Expr::binder(*binder, fresh, body)
            } else {
                Expr::binder(*binder, bound.clone(), body)
            }
        }
        _ => expr.map_children(|child| rename_capturing(child, var, argument, used)),
    }
}

// Primes the name until it is unused.
fn fresh_variable(var: &Identifier, used: &mut BTreeSet<String>) -> Identifier {
    let mut name = var.name.clone();
    while used.contains(&name) {
        name.push('\'');
    }
    used.insert(name.clone());
    Identifier::new(name, var.ty.clone())
}

/// Every step from `expr` down to an expression without redexes.
///
/// # Errors
/// * `ReductionLimitExceeded` - More than `max_steps` steps would be needed
/// * `Type` - A redex along the way is ill-typed
pub fn derivation(expr: &Expr, max_steps: usize) -> Result<Vec<Step>, EvaluationError> {
    let mut steps: Vec<Step> = Vec::new();
    let mut current = expr.clone();

    while let Some(step) = reduce_once(&current)? {
        if steps.len() == max_steps {
            return Err(EvaluationError::ReductionLimitExceeded(max_steps));
        }
        trace!("step {}: {:?} ⇒ {}", steps.len() + 1, step.kind, step.result);
        current = step.result.clone();
        steps.push(step);
    }

    Ok(steps)
}

/// Reduces `expr` until no redex is left.
///
/// # Errors
/// * `ReductionLimitExceeded` - Expression needs more than `max_steps` steps
/// * `Type` - A redex along the way is ill-typed
///
/// # Examples
/// ```
/// use lambdacalc::{engine::evaluate, parse};
///
/// let expr = parse("(LX.X(a))(Ly.P(y) & Q(y))").unwrap();
/// let result = evaluate(&expr, 100).unwrap();
/// assert_eq!(result.to_string(), "P(a) ∧ Q(a)");
/// ```
pub fn evaluate(expr: &Expr, max_steps: usize) -> Result<Expr, EvaluationError> {
    let mut steps = derivation(expr, max_steps)?;
    Ok(steps
        .pop()
        .map_or_else(|| expr.clone(), |step| step.result))
}
