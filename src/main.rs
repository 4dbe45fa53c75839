use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use lambdacalc::{
    IdentifierTyper, Notation, ParseOptions, StepKind, SyntaxError, derivation, parse_expression,
    parse_type,
};
use log::LevelFilter;

/// Types and lambda-converts expressions of the typed lambda calculus.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Arguments {
    #[command(subcommand)]
    command: Command,

    /// Show debug logging; repeat for a trace of every step.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a type such as `<e,<e,t>>` and print it back.
    ParseType {
        ty: String,
        #[command(flatten)]
        output: Output,
    },
    /// Print an expression and its type.
    #[command(visible_alias = "t")]
    Type {
        expr: String,
        #[command(flatten)]
        options: Options,
    },
    /// Show every conversion step of an expression.
    #[command(visible_alias = "r")]
    Reduce {
        expr: String,
        #[command(flatten)]
        options: Options,
        /// Give up after this many steps.
        #[arg(long, default_value_t = 1000)]
        max_steps: usize,
    },
}

#[derive(Debug, Args)]
struct Output {
    /// Print with L, A, E, I, ~, &, | instead of Unicode symbols.
    #[arg(long, action = ArgAction::SetTrue)]
    ascii_output: bool,
}

impl Output {
    const fn notation(&self) -> Notation {
        if self.ascii_output {
            Notation::Ascii
        } else {
            Notation::Unicode
        }
    }
}

#[derive(Debug, Args)]
struct Options {
    /// Only accept λ ∀ ∃ ι as binders, not the letters L A E I.
    #[arg(long, action = ArgAction::SetTrue)]
    unicode_only: bool,

    /// Let identifiers span several letters, as in `loves(john)`.
    #[arg(long, action = ArgAction::SetTrue)]
    multi_letter: bool,

    /// Typing conventions replacing the defaults, e.g. "x-z: var e; P: const <e,t>".
    #[arg(long)]
    conventions: Option<String>,

    #[command(flatten)]
    output: Output,
}

impl Options {
    fn parse_options(&self) -> Result<ParseOptions> {
        let mut options = ParseOptions::default()
            .with_ascii(!self.unicode_only)
            .with_single_letter_identifiers(!self.multi_letter);
        if let Some(conventions) = &self.conventions {
            let typer: IdentifierTyper = conventions
                .parse()
                .context("invalid typing conventions")?;
            options = options.with_typer(typer);
        }
        Ok(options)
    }
}

// Points at the offending character of the line above it.
fn caret(err: &SyntaxError) -> String {
    format!("{}^", " ".repeat(err.position()))
}

fn with_caret<T>(input: &str, result: Result<T, SyntaxError>) -> Result<T> {
    result.map_err(|err| {
        eprintln!("{input}");
        eprintln!("{}", caret(&err));
        err.into()
    })
}

fn main() -> Result<()> {
    let arguments = Arguments::parse();

    let level = match arguments.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match arguments.command {
        Command::ParseType { ty, output } => {
            let parsed = with_caret(&ty, parse_type(&ty))?;
            println!("{}", parsed.display(output.notation()));
        }
        Command::Type { expr, options } => {
            let parse_options = options.parse_options()?;
            let parsed = with_caret(&expr, parse_expression(&expr, &parse_options))?;
            let notation = options.output.notation();
            let ty = parsed.get_type()?;
            println!("{} : {}", parsed.display(notation), ty.display(notation));
        }
        Command::Reduce {
            expr,
            options,
            max_steps,
        } => {
            let parse_options = options.parse_options()?;
            let parsed = with_caret(&expr, parse_expression(&expr, &parse_options))?;
            let notation = options.output.notation();
            println!("   {}", parsed.display(notation));
            for step in derivation(&parsed, max_steps)? {
                let marker = match step.kind {
                    StepKind::AlphaVariant => 'α',
                    StepKind::BetaReduction => 'β',
                };
                println!("{marker}  {}", step.result.display(notation));
            }
        }
    }

    Ok(())
}
