use std::{collections::BTreeSet, convert::Infallible, fmt};

use log::debug;

use crate::{
    engine::{EvaluationError, Step, StepKind, derivation, reduce_once, rewrite_leftmost_redex, substitute},
    expr::{Expr, Identifier},
    parser::{ParseOptions, Parser, SyntaxError},
    types::TypeError,
};

/// Response to one answer in a [`ConversionExercise`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Correct { kind: StepKind },
    /// Right up to the grouping and order of ∧/∨ operands or the sides of
    /// ↔ and =.
    CorrectUpToOrdering { kind: StepKind },
    /// The answer is a later step; `skipped` steps were left out.
    NotSoFast { skipped: usize },
    Unchanged,
    /// The argument was substituted where an alpha variant was needed first.
    VariableCaptured,
    WrongVariable { name: String },
    LambdaNotRemoved,
    IllTyped(TypeError),
    Incorrect,
    Finished,
}

impl Feedback {
    /// Whether the answer was accepted and the exercise moved on.
    #[must_use]
    pub const fn is_correct(&self) -> bool {
        matches!(self, Self::Correct { .. } | Self::CorrectUpToOrdering { .. })
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correct {
                kind: StepKind::AlphaVariant,
            } => write!(f, "Correct: the bound variables no longer capture the argument."),
            Self::Correct {
                kind: StepKind::BetaReduction,
            } => write!(f, "Correct."),
            Self::CorrectUpToOrdering { .. } => {
                write!(f, "Correct, up to the order of conjuncts or disjuncts.")
            }
            Self::NotSoFast { skipped } => {
                write!(f, "Not so fast: that skips {skipped} step(s). Do one step at a time.")
            }
            Self::Unchanged => write!(f, "The expression has not changed."),
            Self::VariableCaptured => write!(
                f,
                "A free variable of the argument was captured. Rename a bound variable first."
            ),
            Self::WrongVariable { name } => write!(
                f,
                "The argument was substituted for {name} instead of the lambda variable."
            ),
            Self::LambdaNotRemoved => {
                write!(f, "The lambda and its argument should be gone after substituting.")
            }
            Self::IllTyped(err) => write!(f, "The answer is not well-typed: {err}"),
            Self::Incorrect => write!(f, "That is not the next step."),
            Self::Finished => write!(f, "The exercise is already finished."),
        }
    }
}

/// A lambda-conversion exercise: the student reduces an expression one step
/// at a time and each answer is checked against the precomputed steps.
///
/// # Examples
/// ```
/// use lambdacalc::{exercise::{ConversionExercise, Feedback}, parse};
///
/// let mut exercise = ConversionExercise::new(parse("(Lx.P(x))(a)").unwrap(), 100).unwrap();
/// assert_eq!(exercise.check_str("P(b)").unwrap(), Feedback::Incorrect);
/// assert!(exercise.check_str("P(a)").unwrap().is_correct());
/// assert!(exercise.is_finished());
/// ```
#[derive(Debug, Clone)]
pub struct ConversionExercise {
    start: Expr,
    steps: Vec<Step>,
    done: usize,
    options: ParseOptions,
}

impl ConversionExercise {
    /// # Errors
    /// Fails if `expr` needs more than `max_steps` steps or contains an
    /// ill-typed redex.
    pub fn new(expr: Expr, max_steps: usize) -> Result<Self, EvaluationError> {
        let steps = derivation(&expr, max_steps)?;
        debug!("exercise {expr} has {} steps", steps.len());
        Ok(Self {
            start: expr,
            steps,
            done: 0,
            options: ParseOptions::default(),
        })
    }

    /// Options used by [`check_str`](Self::check_str).
    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn start(&self) -> &Expr {
        &self.start
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The expression the next answer should be one step away from.
    #[must_use]
    pub fn current(&self) -> &Expr {
        self.done
            .checked_sub(1)
            .map_or(&self.start, |last| &self.steps[last].result)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.done == self.steps.len()
    }

    /// Parses `input` with the exercise's options and checks it.
    ///
    /// # Errors
    /// Returns the `SyntaxError` if the answer cannot be parsed.
    pub fn check_str(&mut self, input: &str) -> Result<Feedback, SyntaxError> {
        let answer = Parser::parse(input, &self.options)?;
        Ok(self.check(&answer))
    }

    /// Checks `answer` against the next step, advancing on a correct answer.
    pub fn check(&mut self, answer: &Expr) -> Feedback {
        let feedback = self.diagnose(answer);
        match &feedback {
            Feedback::Correct {
                kind: StepKind::BetaReduction,
            }
            | Feedback::CorrectUpToOrdering {
                kind: StepKind::BetaReduction,
            } if self.steps[self.done].kind == StepKind::AlphaVariant => self.done += 2,
            Feedback::Correct { .. } | Feedback::CorrectUpToOrdering { .. } => self.done += 1,
            _ => {}
        }
        debug!("answer {answer}: {feedback:?}");
        feedback
    }

    fn diagnose(&self, answer: &Expr) -> Feedback {
        let Some(next) = self.steps.get(self.done) else {
            return Feedback::Finished;
        };
        if let Err(err) = answer.get_type() {
            return Feedback::IllTyped(err);
        }

        match next.kind {
            StepKind::AlphaVariant => {
                if answer.ac_equivalent(&next.result) && !needs_alpha(answer) {
                    let kind = StepKind::AlphaVariant;
                    return if answer.alpha_equivalent(&next.result) {
                        Feedback::Correct { kind }
                    } else {
                        Feedback::CorrectUpToOrdering { kind }
                    };
                }
                // A capture-avoiding beta reduction may skip the renaming
                if let Some(beta) = self.steps.get(self.done + 1) {
                    if let Some(feedback) = compare(answer, &beta.result) {
                        return feedback;
                    }
                }
            }
            StepKind::BetaReduction => {
                if let Some(feedback) = compare(answer, &next.result) {
                    return feedback;
                }
            }
        }

        let current = self.current();
        if answer.ac_equivalent(current) {
            return Feedback::Unchanged;
        }
        let ahead = self.done + usize::from(next.kind == StepKind::AlphaVariant) + 1;
        if let Some(index) = (ahead..self.steps.len())
            .find(|&index| compare(answer, &self.steps[index].result).is_some())
        {
            return Feedback::NotSoFast {
                skipped: index - self.done,
            };
        }

        if next.kind == StepKind::AlphaVariant {
            let captured = rewrite_redex(current, |var, body, argument| {
                substitute(var, argument, body)
            });
            if matches_candidate(answer, captured.as_ref()) {
                return Feedback::VariableCaptured;
            }
        }

        let lambda_kept = rewrite_redex(current, |var, body, argument| {
            Expr::lambda(var.clone(), substitute(var, argument, body))
        });
        let applied_kept = rewrite_redex(current, |var, body, argument| {
            Expr::app(
                Expr::lambda(var.clone(), substitute(var, argument, body)),
                argument.clone(),
            )
        });
        if matches_candidate(answer, lambda_kept.as_ref())
            || matches_candidate(answer, applied_kept.as_ref())
        {
            return Feedback::LambdaNotRemoved;
        }

        if let Some((var, body, _)) = leftmost_redex(current) {
            let mut names = BTreeSet::new();
            variable_names(&body, &mut names);
            names.remove(&var.name);
            for name in names {
                let wrong = rewrite_redex(current, |_, body, argument| {
                    replace_variable(&name, argument, body)
                });
                if matches_candidate(answer, wrong.as_ref()) {
                    return Feedback::WrongVariable { name };
                }
            }
        }

        Feedback::Incorrect
    }
}

fn compare(answer: &Expr, expected: &Expr) -> Option<Feedback> {
    if answer.alpha_equivalent(expected) {
        Some(Feedback::Correct {
            kind: StepKind::BetaReduction,
        })
    } else if answer.ac_equivalent(expected) {
        Some(Feedback::CorrectUpToOrdering {
            kind: StepKind::BetaReduction,
        })
    } else {
        None
    }
}

fn matches_candidate(answer: &Expr, candidate: Option<&Expr>) -> bool {
    candidate.is_some_and(|candidate| answer.alpha_equivalent(candidate))
}

fn needs_alpha(expr: &Expr) -> bool {
    matches!(
        reduce_once(expr),
        Ok(Some(Step {
            kind: StepKind::AlphaVariant,
            ..
        }))
    )
}

fn rewrite_redex(
    expr: &Expr,
    mut rewrite: impl FnMut(&Identifier, &Expr, &Expr) -> Expr,
) -> Option<Expr> {
    rewrite_leftmost_redex(expr, &mut |var: &Identifier, body: &Expr, argument: &Expr| {
        Ok::<_, Infallible>(rewrite(var, body, argument))
    })
    .unwrap_or_else(|never| match never {})
}

fn leftmost_redex(expr: &Expr) -> Option<(Identifier, Expr, Expr)> {
    let mut redex = None;
    rewrite_redex(expr, |var, body, argument| {
        redex = Some((var.clone(), body.clone(), argument.clone()));
        body.clone()
    });
    redex
}

fn variable_names(expr: &Expr, names: &mut BTreeSet<String>) {
    if let Expr::Var(id) = expr {
        names.insert(id.name.clone());
    }
    for child in expr.children() {
        variable_names(child, names);
    }
}

// Replaces every occurrence of the variable, bound or not.
fn replace_variable(name: &str, replacement: &Expr, target: &Expr) -> Expr {
    match target {
        Expr::Var(id) if id.name == name => replacement.clone(),
        _ => target.map_children(|child| replace_variable(name, replacement, child)),
    }
}
