use thiserror::Error;

use crate::{
    expr::{Binder, Connective, Expr, Identifier, SetRelation},
    lexer::{Lexeme, Lexer, Token},
    typer::{IdentKind, IdentifierTyper},
};

/// How expressions are read.
///
/// - `ascii`: accept the letters `L`, `A`, `E`, `I` as λ, ∀, ∃, ι when they
///   start a binder such as `Lx.`. Unicode symbols are always accepted.
/// - `single_letter_identifiers`: every letter starts a new identifier, so
///   `Lxy.` binds `x` and `y`.
/// - `typer`: conventions giving each identifier its kind and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub ascii: bool,
    pub single_letter_identifiers: bool,
    pub typer: IdentifierTyper,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            ascii: true,
            single_letter_identifiers: true,
            typer: IdentifierTyper::default(),
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub const fn with_ascii(mut self, ascii: bool) -> Self {
        self.ascii = ascii;
        self
    }

    #[must_use]
    pub const fn with_single_letter_identifiers(mut self, single_letter: bool) -> Self {
        self.single_letter_identifiers = single_letter;
        self
    }

    #[must_use]
    pub fn with_typer(mut self, typer: IdentifierTyper) -> Self {
        self.typer = typer;
        self
    }
}

/// Errors raised while reading types and expressions. Every variant carries
/// the character position the problem was found at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },
    #[error("Expected {expected} but found {found} at position {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("No typing convention for identifier '{name}' at position {position}")]
    UnknownIdentifier { name: String, position: usize },
    #[error("Cannot bind constant '{name}' at position {position}")]
    BoundConstant { name: String, position: usize },
    #[error("Empty expression at position {position}")]
    EmptyExpression { position: usize },
}

impl SyntaxError {
    /// Character position for placing a caret under the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        match self {
            Self::UnexpectedCharacter { position, .. }
            | Self::UnexpectedToken { position, .. }
            | Self::UnknownIdentifier { position, .. }
            | Self::BoundConstant { position, .. }
            | Self::EmptyExpression { position } => *position,
        }
    }
}

pub struct Parser<'options> {
    tokens: Vec<Lexeme>,
    current: usize,
    options: &'options ParseOptions,
}

impl<'options> Parser<'options> {
    #[must_use]
    pub fn new(mut tokens: Vec<Lexeme>, options: &'options ParseOptions) -> Self {
        if !matches!(tokens.last(), Some(Lexeme { token: Token::Eof, .. })) {
            let position = tokens.last().map_or(0, |lexeme| lexeme.position + 1);
            tokens.push(Lexeme {
                token: Token::Eof,
                position,
            });
        }
        Self {
            tokens,
            current: 0,
            options,
        }
    }

    /// Parse an expression from a string.
    ///
    /// # Errors
    /// Returns a `SyntaxError` if the input cannot be tokenized or parsed, or
    /// if an identifier has no typing convention.
    pub fn parse(input: &str, options: &ParseOptions) -> Result<Expr, SyntaxError> {
        let tokens = Lexer::new(input, options.single_letter_identifiers).tokenize()?;
        let mut parser = Parser::new(tokens, options);
        if parser.is_at_end() {
            return Err(SyntaxError::EmptyExpression {
                position: parser.position(),
            });
        }
        let expr = parser.parse_expression()?;
        if !parser.is_at_end() {
            return Err(parser.unexpected("end of input"));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_equivalence()
    }

    fn parse_equivalence(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_implication()?;
        while self.eat(&Token::Iff) {
            let right = self.parse_implication()?;
            expr = Expr::connective(Connective::Iff, expr, right);
        }
        Ok(expr)
    }

    fn parse_implication(&mut self) -> Result<Expr, SyntaxError> {
        let antecedent = self.parse_disjunction()?;
        if self.eat(&Token::If) {
            // Right-associative: p → q → r = p → (q → r)
            let consequent = self.parse_implication()?;
            return Ok(Expr::connective(Connective::If, antecedent, consequent));
        }
        Ok(antecedent)
    }

    fn parse_disjunction(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_conjunction()?;
        while self.eat(&Token::Or) {
            let right = self.parse_conjunction()?;
            expr = Expr::connective(Connective::Or, expr, right);
        }
        Ok(expr)
    }

    fn parse_conjunction(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_relation()?;
        while self.eat(&Token::And) {
            let right = self.parse_relation()?;
            expr = Expr::connective(Connective::And, expr, right);
        }
        Ok(expr)
    }

    fn parse_relation(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_unary()?;
        let relation = match self.peek() {
            Token::Equals => None,
            Token::Subset => Some(SetRelation::Subset),
            Token::ProperSubset => Some(SetRelation::ProperSubset),
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_unary()?;
        Ok(match relation {
            None => Expr::equality(left, right),
            Some(relation) => Expr::set_relation(relation, left, right),
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat(&Token::Not) {
            let operand = self.parse_unary()?;
            return Ok(Expr::not(operand));
        }
        if let Some((binder, fused)) = self.binder_ahead() {
            return self.parse_binder(binder, fused);
        }
        self.parse_application()
    }

    /// Detects a binder at the current token. In ASCII mode the binder
    /// letter may be fused with the first variable (`Lx` in multi-letter
    /// mode), which is returned alongside.
    fn binder_ahead(&self) -> Option<(Binder, Option<String>)> {
        match self.peek() {
            Token::Lambda => Some((Binder::Lambda, None)),
            Token::ForAll => Some((Binder::ForAll, None)),
            Token::Exists => Some((Binder::Exists, None)),
            Token::Iota => Some((Binder::Iota, None)),
            Token::Ident(name) if self.options.ascii => {
                let mut chars = name.chars();
                let binder = Binder::from_ascii(chars.next()?)?;
                let rest = chars.as_str();

                // A binder is followed by its variables and then '.'
                let mut offset = 1;
                while matches!(self.peek_at(offset), Token::Ident(_)) {
                    offset += 1;
                }
                if !matches!(self.peek_at(offset), Token::Dot) {
                    return None;
                }
                if rest.is_empty() {
                    (offset > 1).then_some((binder, None))
                } else if rest.starts_with(char::is_alphabetic) {
                    Some((binder, Some(rest.to_string())))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn parse_binder(&mut self, binder: Binder, fused: Option<String>) -> Result<Expr, SyntaxError> {
        let start = self.position();
        self.advance(); // consume binder symbol

        let mut vars = Vec::new();
        if let Some(name) = fused {
            vars.push(self.bound_variable(&name, start + 1)?);
        }
        while let Token::Ident(name) = self.peek() {
            let name = name.clone();
            let position = self.position();
            self.advance();
            vars.push(self.bound_variable(&name, position)?);
        }
        if vars.is_empty() {
            return Err(self.unexpected("variable"));
        }
        if !self.eat(&Token::Dot) {
            return Err(self.unexpected("'.'"));
        }

        let body = self.parse_expression()?;
        Ok(vars
            .into_iter()
            .rev()
            .fold(body, |body, var| Expr::binder(binder, var, body)))
    }

    fn parse_application(&mut self) -> Result<Expr, SyntaxError> {
        // Postfix, left-associative: f(a)(b) = (f(a))(b)
        let mut expr = self.parse_atom()?;
        while self.eat(&Token::LParen) {
            let mut args = self.parse_list(&Token::RParen, "')'")?;
            let arg = if args.len() == 1 {
                args.remove(0)
            } else {
                Expr::ArgList(args)
            };
            expr = Expr::app(expr, arg);
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                let position = self.position();
                self.advance();
                self.identifier(&name, position)
            }
            Token::LParen => {
                self.advance();
                let mut items = self.parse_list(&Token::RParen, "')'")?;
                if items.len() == 1 {
                    Ok(items.remove(0))
                } else {
                    Ok(Expr::ArgList(items))
                }
            }
            Token::LBracket => {
                self.advance();
                let expr = self.parse_expression()?;
                if !self.eat(&Token::RBracket) {
                    return Err(self.unexpected("']'"));
                }
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_list(&mut self, close: &Token, expected: &str) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = vec![self.parse_expression()?];
        while self.eat(&Token::Comma) {
            items.push(self.parse_expression()?);
        }
        if !self.eat(close) {
            return Err(self.unexpected(&format!("',' or {expected}")));
        }
        Ok(items)
    }

    fn identifier(&self, name: &str, position: usize) -> Result<Expr, SyntaxError> {
        match self.options.typer.lookup(name) {
            Some((IdentKind::Variable, ty)) => Ok(Expr::Var(Identifier::new(name, ty.clone()))),
            Some((IdentKind::Constant, ty)) => Ok(Expr::Const(Identifier::new(name, ty.clone()))),
            None => Err(SyntaxError::UnknownIdentifier {
                name: name.to_string(),
                position,
            }),
        }
    }

    fn bound_variable(&self, name: &str, position: usize) -> Result<Identifier, SyntaxError> {
        match self.identifier(name, position)? {
            Expr::Var(var) => Ok(var),
            _ => Err(SyntaxError::BoundConstant {
                name: name.to_string(),
                position,
            }),
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.peek().to_string(),
            position: self.position(),
        }
    }

    fn lexeme_at(&self, offset: usize) -> &Lexeme {
        let index = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn peek(&self) -> &Token {
        &self.lexeme_at(0).token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.lexeme_at(offset).token
    }

    fn position(&self) -> usize {
        self.lexeme_at(0).position
    }

    fn advance(&mut self) {
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn parse(input: &str) -> Expr {
        Parser::parse(input, &ParseOptions::default()).unwrap()
    }

    fn parse_err(input: &str) -> SyntaxError {
        Parser::parse(input, &ParseOptions::default()).unwrap_err()
    }

    fn x() -> Identifier {
        Identifier::new("x", Type::E)
    }

    fn p_of(arg: Expr) -> Expr {
        Expr::app(Expr::constant("P", Type::predicate(Type::E)), arg)
    }

    #[test]
    fn test_identifiers_are_typed() {
        assert_eq!(parse("x"), Expr::var("x", Type::E));
        assert_eq!(parse("a"), Expr::constant("a", Type::E));
        assert_eq!(parse("x'"), Expr::var("x'", Type::E));
    }

    #[test]
    fn test_ascii_and_unicode_lambda() {
        let expected = Expr::lambda(x(), p_of(Expr::Var(x())));
        assert_eq!(parse("Lx.P(x)"), expected);
        assert_eq!(parse("λx.P(x)"), expected);
        assert_eq!(parse("\\x.P(x)"), expected);
        assert_eq!(parse("  L x . P ( x ) "), expected);
    }

    #[test]
    fn test_quantifiers() {
        let body = p_of(Expr::Var(x()));
        assert_eq!(parse("Ax.P(x)"), Expr::binder(Binder::ForAll, x(), body.clone()));
        assert_eq!(parse("∃x.P(x)"), Expr::binder(Binder::Exists, x(), body.clone()));
        assert_eq!(parse("Ix.P(x)"), Expr::binder(Binder::Iota, x(), body));
    }

    #[test]
    fn test_binder_letters_are_identifiers_elsewhere() {
        // `A` applied to an argument is the constant A
        assert_eq!(
            parse("A(x)"),
            Expr::app(Expr::constant("A", Type::predicate(Type::E)), Expr::Var(x()))
        );
        // Without ASCII binders `Lx.` is not a lambda
        let options = ParseOptions::default().with_ascii(false);
        assert!(Parser::parse("Lx.P(x)", &options).is_err());
        assert!(Parser::parse("λx.P(x)", &options).is_ok());
    }

    #[test]
    fn test_multiple_variables() {
        let y = Identifier::new("y", Type::E);
        let body = Expr::app(
            Expr::constant("R", Type::predicate(Type::Product(vec![Type::E, Type::E]))),
            Expr::ArgList(vec![Expr::Var(x()), Expr::Var(y.clone())]),
        );
        let expected = Expr::lambda(x(), Expr::lambda(y, body));
        assert_eq!(parse("Lxy.R(x,y)"), expected);
        assert_eq!(parse("λx y.R(x, y)"), expected);
        assert_eq!(parse("Lx.Ly.R(x,y)"), expected);
    }

    #[test]
    fn test_multi_letter_identifiers() {
        let typer: IdentifierTyper = "x-z: var e; j: const e; l-m: const <e,<e,t>>"
            .parse()
            .unwrap();
        let options = ParseOptions::default()
            .with_single_letter_identifiers(false)
            .with_typer(typer);
        let expr = Parser::parse("Lx.loves(x)(john)", &options).unwrap();
        let loves = Expr::constant("loves", Type::function(Type::E, Type::predicate(Type::E)));
        let expected = Expr::lambda(
            x(),
            Expr::app(
                Expr::app(loves, Expr::Var(x())),
                Expr::constant("john", Type::E),
            ),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_body_extends_right() {
        let expr = parse("Lx.P(x) & Q(x)");
        let Expr::Binder { body, .. } = expr else {
            panic!("expected a lambda");
        };
        assert!(matches!(*body, Expr::Connective(Connective::And, ..)));
    }

    #[test]
    fn test_connective_precedence() {
        // p ∨ q ∧ ¬p = p ∨ (q ∧ (¬p))
        let p = || Expr::var("p", Type::T);
        let q = || Expr::var("q", Type::T);
        assert_eq!(
            parse("p | q & ~p"),
            Expr::connective(
                Connective::Or,
                p(),
                Expr::connective(Connective::And, q(), Expr::not(p()))
            )
        );
        // → is right-associative, ↔ binds loosest
        assert_eq!(
            parse("p -> q -> p <-> q"),
            Expr::connective(
                Connective::Iff,
                Expr::connective(
                    Connective::If,
                    p(),
                    Expr::connective(Connective::If, q(), p())
                ),
                q()
            )
        );
        // ∧ is left-associative
        assert_eq!(
            parse("p & q & p"),
            Expr::connective(
                Connective::And,
                Expr::connective(Connective::And, p(), q()),
                p()
            )
        );
    }

    #[test]
    fn test_relations() {
        assert_eq!(
            parse("x = a"),
            Expr::equality(Expr::Var(x()), Expr::constant("a", Type::E))
        );
        let pred = Type::predicate(Type::E);
        assert_eq!(
            parse("P <= Q"),
            Expr::set_relation(
                SetRelation::Subset,
                Expr::constant("P", pred.clone()),
                Expr::constant("Q", pred)
            )
        );
        assert!(matches!(
            parse("P ⊂ Q"),
            Expr::SetRelation(SetRelation::ProperSubset, ..)
        ));
    }

    #[test]
    fn test_application_forms() {
        let lambda = Expr::lambda(x(), p_of(Expr::Var(x())));
        let expected = Expr::app(lambda, Expr::constant("a", Type::E));
        assert_eq!(parse("[Lx.P(x)](a)"), expected);
        assert_eq!(parse("(λx.P(x))(a)"), expected);
        assert_eq!(parse("P((a))"), p_of(Expr::constant("a", Type::E)));
    }

    #[test]
    fn test_tuples() {
        let a = || Expr::constant("a", Type::E);
        assert_eq!(parse("(a, a)"), Expr::ArgList(vec![a(), a()]));
        assert_eq!(parse("R((a, a))"), parse("R(a,a)"));
    }

    #[test]
    fn test_error_positions() {
        assert_eq!(parse_err(""), SyntaxError::EmptyExpression { position: 0 });
        assert_eq!(parse_err("P(x").position(), 3);
        assert_eq!(parse_err("P(x) &").position(), 6);
        assert_eq!(parse_err("λ.x").position(), 1);
        assert_eq!(parse_err("P(x) Q(x)").position(), 5);
    }

    #[test]
    fn test_unknown_identifier() {
        assert_eq!(
            parse_err("P(f)"),
            SyntaxError::UnknownIdentifier {
                name: "f".to_string(),
                position: 2,
            }
        );
    }

    #[test]
    fn test_bound_constant() {
        assert_eq!(
            parse_err("La.P(a)"),
            SyntaxError::BoundConstant {
                name: "a".to_string(),
                position: 1,
            }
        );
        assert!(matches!(
            parse_err("λP.P(x)"),
            SyntaxError::BoundConstant { .. }
        ));
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            parse_err("P(x) $"),
            SyntaxError::UnexpectedCharacter { ch: '$', position: 5 }
        );
    }
}
