//! Formula tokenizer
//!
//! Converts expression text like "=ROUND(A1 / A2, 3) * 100" into a sequence
//! of tokens for the parser.

use std::iter::Peekable;
use std::str::Chars;

/// Lexical unit of a formula
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A numeric literal (e.g., 123, 45.67, .5, 1.5e10)
    Number(f64),
    /// A string literal (e.g., "Pass" or 'Fail')
    Text(String),
    /// Function name, cell identifier or constant (TRUE, FALSE)
    Identifier(String),
    /// `+ - * / ^` and the comparisons `= <> >= <= < >`
    Operator(String),
    OpenParen,
    CloseParen,
    /// Function argument separator
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenizeError {
    pub message: String,
    pub position: usize,
}

impl TokenizeError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tokenize error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for TokenizeError {}

pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer; a single leading '=' is dropped
    pub fn new(formula: &'a str) -> Self {
        let formula = formula.strip_prefix('=').unwrap_or(formula);
        Self {
            chars: formula.chars().peekable(),
            position: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, TokenizeError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, TokenizeError> {
        self.skip_whitespace();

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '"' | '\'' => self.read_string()?,

            '(' => {
                self.advance();
                Token::OpenParen
            }
            ')' => {
                self.advance();
                Token::CloseParen
            }
            ',' => {
                self.advance();
                Token::Comma
            }

            // Minus is always an operator here; the parser handles unary minus
            '+' | '-' | '*' | '/' | '^' | '=' => {
                self.advance();
                Token::Operator(c.to_string())
            }

            '<' => self.read_less_than_operator(),
            '>' => self.read_greater_than_operator(),

            c if c.is_ascii_digit() || c == '.' => self.read_number()?,

            c if c.is_alphabetic() || c == '_' => self.read_identifier(),

            c => {
                return Err(TokenizeError::new(
                    format!("Unexpected character: '{}'", c),
                    self.position,
                ));
            }
        };

        Ok(Some(token))
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read a string literal (double or single quoted, doubled quote escapes)
    fn read_string(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        let Some(quote) = self.advance() else {
            return Err(TokenizeError::new("Expected string literal", start_pos));
        };
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(TokenizeError::new("Unterminated string literal", start_pos));
                }
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        value.push(quote);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => value.push(c),
            }
        }

        Ok(Token::Text(value))
    }

    /// Push consecutive ASCII digits onto `buf`
    fn read_digits(&mut self, buf: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// `12`, `4.5`, `.5` or `1.5e-3`
    fn read_number(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        let mut num_str = String::new();

        self.read_digits(&mut num_str);

        if self.peek() == Some('.') {
            num_str.push('.');
            self.advance();
            self.read_digits(&mut num_str);
        }

        if let Some(e @ ('e' | 'E')) = self.peek() {
            num_str.push(e);
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                num_str.push(sign);
                self.advance();
            }
            self.read_digits(&mut num_str);
        }

        num_str
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| TokenizeError::new(format!("Invalid number: {}", num_str), start_pos))
    }

    /// Read an identifier; dots are allowed for names like STDEV.S
    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        Token::Identifier(ident)
    }

    fn read_less_than_operator(&mut self) -> Token {
        self.advance();

        match self.peek() {
            Some('=') => {
                self.advance();
                Token::Operator("<=".to_string())
            }
            Some('>') => {
                self.advance();
                Token::Operator("<>".to_string())
            }
            _ => Token::Operator("<".to_string()),
        }
    }

    fn read_greater_than_operator(&mut self) -> Token {
        self.advance();

        match self.peek() {
            Some('=') => {
                self.advance();
                Token::Operator(">=".to_string())
            }
            _ => Token::Operator(">".to_string()),
        }
    }
}

/// Split formula text into tokens
pub fn tokenize(formula: &str) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(formula).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(tokenize("42").unwrap(), vec![Token::Number(42.0)]);
        assert_eq!(tokenize("3.567").unwrap(), vec![Token::Number(3.567)]);
        assert_eq!(tokenize(".5").unwrap(), vec![Token::Number(0.5)]);
        assert_eq!(tokenize("2E-5").unwrap(), vec![Token::Number(2e-5)]);
    }

    #[test]
    fn test_tokenize_string_escaped_quotes() {
        let tokens = tokenize("\"say \"\"hi\"\"\"").unwrap();
        assert_eq!(tokens, vec![Token::Text("say \"hi\"".to_string())]);
    }

    #[test]
    fn test_tokenize_cell_arithmetic() {
        let tokens = tokenize("=A1 / A10").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("A1".to_string()),
                Token::Operator("/".to_string()),
                Token::Identifier("A10".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_only_first_equals_is_stripped() {
        let tokens = tokenize("==1").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Operator("=".to_string()), Token::Number(1.0)]
        );
    }

    #[test]
    fn test_tokenize_dotted_function_name() {
        let tokens = tokenize("STDEV.S(1, 2)").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("STDEV.S".to_string()),
                Token::OpenParen,
                Token::Number(1.0),
                Token::Comma,
                Token::Number(2.0),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_comparison_operators() {
        let tokens = tokenize("1 <= 2 <> 3 >= 4").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(1.0),
                Token::Operator("<=".to_string()),
                Token::Number(2.0),
                Token::Operator("<>".to_string()),
                Token::Number(3.0),
                Token::Operator(">=".to_string()),
                Token::Number(4.0),
            ]
        );
    }

    #[test]
    fn test_tokenize_whitespace_only() {
        assert_eq!(tokenize("   ").unwrap(), vec![]);
    }

    #[test]
    fn test_tokenize_error_unterminated_string() {
        let err = tokenize("\"hello").unwrap_err();
        assert!(err.message.contains("Unterminated"));
    }

    #[test]
    fn test_tokenize_error_unexpected_char() {
        let err = tokenize("A1 # 2").unwrap_err();
        assert!(err.message.contains("Unexpected"));
        assert_eq!(err.position, 3);
    }

    #[test]
    fn test_tokenize_lone_dot_is_invalid_number() {
        assert!(tokenize(".").is_err());
    }
}
