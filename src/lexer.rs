use std::fmt;

use crate::parser::SyntaxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// λ, \
    Lambda,
    /// ∀
    ForAll,
    /// ∃
    Exists,
    /// ι
    Iota,
    /// .
    Dot,
    /// ,
    Comma,
    /// (
    LParen,
    /// )
    RParen,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// ¬, ~
    Not,
    /// ∧, &
    And,
    /// ∨, |
    Or,
    /// →, ->
    If,
    /// ↔, <->
    Iff,
    /// =
    Equals,
    /// ⊆, <=
    Subset,
    /// ⊂, <
    ProperSubset,
    /// Identifier names
    Ident(String),
    /// End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Lambda => "'λ'",
            Self::ForAll => "'∀'",
            Self::Exists => "'∃'",
            Self::Iota => "'ι'",
            Self::Dot => "'.'",
            Self::Comma => "','",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::Not => "'¬'",
            Self::And => "'∧'",
            Self::Or => "'∨'",
            Self::If => "'→'",
            Self::Iff => "'↔'",
            Self::Equals => "'='",
            Self::Subset => "'⊆'",
            Self::ProperSubset => "'⊂'",
            Self::Ident(name) => return write!(f, "identifier '{name}'"),
            Self::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// A token together with the character position it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub token: Token,
    pub position: usize,
}

pub struct Lexer<'input> {
    chars: std::str::Chars<'input>,
    current_char: Option<char>,
    position: usize,
    single_letter_identifiers: bool,
}

impl<'input> Lexer<'input> {
    #[must_use]
    pub fn new(input: &'input str, single_letter_identifiers: bool) -> Self {
        let mut chars = input.chars();
        let current_char = chars.next();
        Lexer {
            chars,
            current_char,
            position: 0,
            single_letter_identifiers,
        }
    }

    /// Tokenizes the input string into a vector of lexemes ending in
    /// `Token::Eof`.
    ///
    /// # Errors
    /// Returns `SyntaxError::UnexpectedCharacter` at the first character that
    /// starts no token.
    pub fn tokenize(&mut self) -> Result<Vec<Lexeme>, SyntaxError> {
        let mut lexemes = Vec::new();

        while let Some(ch) = self.current_char {
            let position = self.position;
            let token = match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                    continue;
                }
                'λ' | '\\' => self.single(Token::Lambda),
                '∀' => self.single(Token::ForAll),
                '∃' => self.single(Token::Exists),
                'ι' => self.single(Token::Iota),
                '.' => self.single(Token::Dot),
                ',' => self.single(Token::Comma),
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                '¬' | '~' => self.single(Token::Not),
                '∧' | '&' => self.single(Token::And),
                '∨' | '|' => self.single(Token::Or),
                '→' => self.single(Token::If),
                '↔' => self.single(Token::Iff),
                '=' => self.single(Token::Equals),
                '⊆' => self.single(Token::Subset),
                '⊂' => self.single(Token::ProperSubset),
                '-' => {
                    self.advance();
                    self.expect('>')?;
                    Token::If
                }
                '<' => {
                    self.advance();
                    match self.current_char {
                        Some('-') => {
                            self.advance();
                            self.expect('>')?;
                            Token::Iff
                        }
                        Some('=') => self.single(Token::Subset),
                        _ => Token::ProperSubset,
                    }
                }
                ch if ch.is_alphabetic() => Token::Ident(self.read_identifier()),
                _ => return Err(SyntaxError::UnexpectedCharacter { ch, position }),
            };
            lexemes.push(Lexeme { token, position });
        }

        lexemes.push(Lexeme {
            token: Token::Eof,
            position: self.position,
        });
        Ok(lexemes)
    }

    fn advance(&mut self) {
        if self.current_char.is_some() {
            self.position += 1;
        }
        self.current_char = self.chars.next();
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn expect(&mut self, expected: char) -> Result<(), SyntaxError> {
        match self.current_char {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(SyntaxError::UnexpectedCharacter {
                ch,
                position: self.position,
            }),
            None => Err(SyntaxError::UnexpectedToken {
                expected: format!("'{expected}'"),
                found: Token::Eof.to_string(),
                position: self.position,
            }),
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        if let Some(first) = self.current_char {
            ident.push(first);
            self.advance();
        }
        while let Some(ch) = self.current_char {
            let continues = if self.single_letter_identifiers {
                ch.is_ascii_digit()
            } else {
                (ch.is_alphanumeric() && !is_reserved_letter(ch)) || ch == '_'
            };
            if continues {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        while self.current_char == Some('\'') {
            ident.push('\'');
            self.advance();
        }
        ident
    }
}

// Greek letters that double as operators.
const fn is_reserved_letter(ch: char) -> bool {
    matches!(ch, 'λ' | 'ι')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tokens(input: &str, single_letter: bool) -> Vec<Token> {
        Lexer::new(input, single_letter)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|lexeme| lexeme.token)
            .collect()
    }

    fn ident(name: &str) -> Token {
        Token::Ident(name.to_string())
    }

    #[test]
    fn test_tokenize_binders() {
        assert_eq!(
            tokens("λ\\∀∃ι", true),
            vec![
                Token::Lambda,
                Token::Lambda,
                Token::ForAll,
                Token::Exists,
                Token::Iota,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_tokenize_connectives() {
        let unicode = tokens("¬ ∧ ∨ → ↔ = ⊆ ⊂", true);
        let ascii = tokens("~ & | -> <-> = <= <", true);
        let expected = vec![
            Token::Not,
            Token::And,
            Token::Or,
            Token::If,
            Token::Iff,
            Token::Equals,
            Token::Subset,
            Token::ProperSubset,
            Token::Eof,
        ];
        assert_eq!(unicode, expected);
        assert_eq!(ascii, expected);
    }

    #[test]
    fn test_tokenize_punctuation() {
        assert_eq!(
            tokens("().,[]", true),
            vec![
                Token::LParen,
                Token::RParen,
                Token::Dot,
                Token::Comma,
                Token::LBracket,
                Token::RBracket,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_single_letter_identifiers() {
        assert_eq!(
            tokens("Pxy x1 y'", true),
            vec![
                ident("P"),
                ident("x"),
                ident("y"),
                ident("x1"),
                ident("y'"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_multi_letter_identifiers() {
        assert_eq!(
            tokens("loves(john_1, x')", false),
            vec![
                ident("loves"),
                Token::LParen,
                ident("john_1"),
                Token::Comma,
                ident("x'"),
                Token::RParen,
                Token::Eof
            ]
        );
        // λ and ι never continue an identifier
        assert_eq!(
            tokens("xλy", false),
            vec![ident("x"), Token::Lambda, ident("y"), Token::Eof]
        );
    }

    #[test]
    fn test_positions_count_characters() {
        let lexemes = Lexer::new("λx.P(x) ∧ q", true).tokenize().unwrap();
        let positions: Vec<usize> = lexemes.iter().map(|lexeme| lexeme.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4, 5, 6, 8, 10, 11]);
    }

    #[test]
    fn test_tokenize_error() {
        let err = Lexer::new("P(x) # Q", true).tokenize().unwrap_err();
        assert_eq!(err, SyntaxError::UnexpectedCharacter { ch: '#', position: 5 });

        let err = Lexer::new("p -x", true).tokenize().unwrap_err();
        assert_eq!(err.position(), 3);

        let err = Lexer::new("p <-", true).tokenize().unwrap_err();
        assert_eq!(err.position(), 4);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(tokens("", true), vec![Token::Eof]);
        assert_eq!(tokens("  \n\t", true), vec![Token::Eof]);
    }
}
