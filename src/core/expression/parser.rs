//! Recursive-descent parser producing an expression tree.
//!
//! Precedence, loosest first: comparison, `+ -`, `* /`, unary sign, `^`.

use super::tokenizer::Token;

/// Deepest nesting of parentheses, signs and powers a formula may use
pub const MAX_NESTING: usize = 64;

/// Parsed formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal
    Number(f64),
    /// A string literal
    Text(String),
    /// A named value: a cell identifier before substitution, or TRUE/FALSE
    Reference(String),
    /// `NAME(args..)`
    FunctionCall { name: String, args: Vec<Expr> },
    BinaryOp {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Leading sign
    UnaryOp { op: String, operand: Box<Expr> },
}

impl Expr {
    /// Visit every reference name in the tree, depth first
    pub fn for_each_reference<F: FnMut(&str)>(&self, f: &mut F) {
        match self {
            Expr::Reference(name) => f(name),
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    arg.for_each_reference(f);
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                left.for_each_reference(f);
                right.for_each_reference(f);
            }
            Expr::UnaryOp { operand, .. } => operand.for_each_reference(f),
            Expr::Number(_) | Expr::Text(_) => {}
        }
    }

    /// Visit every function call as (name, argument count), depth first
    pub fn for_each_call<F: FnMut(&str, usize)>(&self, f: &mut F) {
        match self {
            Expr::FunctionCall { name, args } => {
                f(name, args.len());
                for arg in args {
                    arg.for_each_call(f);
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                left.for_each_call(f);
                right.for_each_call(f);
            }
            Expr::UnaryOp { operand, .. } => operand.for_each_call(f),
            Expr::Number(_) | Expr::Text(_) | Expr::Reference(_) => {}
        }
    }
}

/// Error during parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for ParseError {}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    /// Consume every token; trailing input is an error
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::new("Empty expression", 0));
        }
        let expr = self.expression()?;

        if !self.is_at_end() {
            return Err(ParseError::new(
                format!("Unexpected token after expression: {:?}", self.peek()),
                self.position,
            ));
        }

        Ok(expr)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_any_operator(&mut self, ops: &[&str]) -> Option<String> {
        if let Some(Token::Operator(s)) = self.peek() {
            if ops.contains(&s.as_str()) {
                let op = s.clone();
                self.advance();
                return Some(op);
            }
        }
        None
    }

    fn binary(left: Expr, op: String, right: Expr) -> Expr {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.comparison()
    }

    /// Comparison: term (( "=" | "<>" | "<" | ">" | "<=" | ">=" ) term)*
    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;

        while let Some(op) = self.match_any_operator(&["=", "<>", "<", ">", "<=", ">="]) {
            let right = self.term()?;
            left = Self::binary(left, op, right);
        }

        Ok(left)
    }

    /// Term: factor (( "+" | "-" ) factor)*
    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.factor()?;

        while let Some(op) = self.match_any_operator(&["+", "-"]) {
            let right = self.factor()?;
            left = Self::binary(left, op, right);
        }

        Ok(left)
    }

    /// Factor: unary (( "*" | "/" ) unary)*
    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;

        while let Some(op) = self.match_any_operator(&["*", "/"]) {
            let right = self.unary()?;
            left = Self::binary(left, op, right);
        }

        Ok(left)
    }

    /// Every nested construct passes through here, so this is where
    /// recursion depth is bounded.
    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                format!("Expression nesting exceeds {} levels", MAX_NESTING),
                self.position,
            ));
        }
        self.depth += 1;
        let expr = self.signed();
        self.depth -= 1;
        expr
    }

    /// Unary: ( "-" | "+" ) unary | power
    fn signed(&mut self) -> Result<Expr, ParseError> {
        if let Some(op) = self.match_any_operator(&["-", "+"]) {
            let operand = self.unary()?;
            Ok(Expr::UnaryOp {
                op,
                operand: Box::new(operand),
            })
        } else {
            self.power()
        }
    }

    /// Power: call ( "^" unary )?   (right-associative, binds tighter than
    /// unary minus so -2^2 = -4)
    fn power(&mut self) -> Result<Expr, ParseError> {
        let left = self.call()?;

        if let Some(op) = self.match_any_operator(&["^"]) {
            let right = self.unary()?;
            Ok(Self::binary(left, op, right))
        } else {
            Ok(left)
        }
    }

    /// Call: primary ( "(" arguments? ")" )?
    fn call(&mut self) -> Result<Expr, ParseError> {
        let expr = self.primary()?;

        if !self.match_token(&Token::OpenParen) {
            return Ok(expr);
        }

        let Expr::Reference(name) = expr else {
            return Err(ParseError::new(
                "Only named functions can be called",
                self.position,
            ));
        };

        let args = self.arguments()?;
        if !self.match_token(&Token::CloseParen) {
            return Err(ParseError::new(
                "Expected ')' after function arguments",
                self.position,
            ));
        }

        Ok(Expr::FunctionCall { name, args })
    }

    /// Arguments: ( expr ( "," expr )* )?
    fn arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();

        if let Some(Token::CloseParen) = self.peek() {
            return Ok(args);
        }

        args.push(self.expression()?);
        while self.match_token(&Token::Comma) {
            args.push(self.expression()?);
        }

        Ok(args)
    }

    /// Primary: NUMBER | STRING | IDENTIFIER | "(" expr ")"
    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().cloned();

        match token {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Some(Token::Text(s)) => {
                self.advance();
                Ok(Expr::Text(s))
            }
            Some(Token::Identifier(name)) => {
                self.advance();
                Ok(Expr::Reference(name))
            }
            Some(Token::OpenParen) => {
                self.advance();
                let expr = self.expression()?;
                if !self.match_token(&Token::CloseParen) {
                    return Err(ParseError::new(
                        "Expected ')' after expression",
                        self.position,
                    ));
                }
                Ok(expr)
            }
            Some(token) => Err(ParseError::new(
                format!("Unexpected token: {:?}", token),
                self.position,
            )),
            None => Err(ParseError::new(
                "Unexpected end of expression",
                self.position,
            )),
        }
    }
}

pub fn parse(tokens: Vec<Token>) -> Result<Expr, ParseError> {
    Parser::new(tokens).parse()
}
