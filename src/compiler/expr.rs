//! Expression trees for phenotype text.
//!
//! The accepted language is the one the grammars emit: numeric literals, the
//! row variable `k`, `+ - * /`, unary signs, parentheses, the table helpers
//! (`getVariable`, `MyDrv`, `MySum`, `MyAvg`) and a set of `Math.` functions.

use std::fmt;
use thiserror::Error;

/// Deepest expression tree [`Expr::parse`] accepts. Evaluation recurses once
/// per level.
pub const MAX_DEPTH: usize = 200;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at column {column}")]
pub struct ParseError {
    pub column: usize,
    pub message: String,
}

impl ParseError {
    fn new(column: usize, message: impl Into<String>) -> Self {
        Self {
            column,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }

    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

/// Functions callable from a phenotype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `getVariable(var, row)`
    GetVariable,
    /// `MyDrv(from, to, var)`
    Drv,
    /// `MySum(from, to, var)`
    Sum,
    /// `MyAvg(from, to, var)`
    Avg,
    Exp,
    Log,
    Sqrt,
    Abs,
    Pow,
    Sin,
    Cos,
    Tan,
    Min,
    Max,
    Floor,
    Ceil,
}

impl Function {
    /// Resolves a call name. The `Math.` prefix is optional.
    pub fn lookup(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("Math.").unwrap_or(name);
        let f = match bare {
            "getVariable" => Function::GetVariable,
            "MyDrv" => Function::Drv,
            "MySum" => Function::Sum,
            "MyAvg" => Function::Avg,
            "exp" => Function::Exp,
            "log" => Function::Log,
            "sqrt" => Function::Sqrt,
            "abs" => Function::Abs,
            "pow" => Function::Pow,
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "min" => Function::Min,
            "max" => Function::Max,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            _ => return None,
        };
        Some(f)
    }

    pub fn arity(self) -> usize {
        match self {
            Function::GetVariable | Function::Pow | Function::Min | Function::Max => 2,
            Function::Drv | Function::Sum | Function::Avg => 3,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::GetVariable => "getVariable",
            Function::Drv => "MyDrv",
            Function::Sum => "MySum",
            Function::Avg => "MyAvg",
            Function::Exp => "Math.exp",
            Function::Log => "Math.log",
            Function::Sqrt => "Math.sqrt",
            Function::Abs => "Math.abs",
            Function::Pow => "Math.pow",
            Function::Sin => "Math.sin",
            Function::Cos => "Math.cos",
            Function::Tan => "Math.tan",
            Function::Min => "Math.min",
            Function::Max => "Math.max",
            Function::Floor => "Math.floor",
            Function::Ceil => "Math.ceil",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// The current row index `k`.
    Row,
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.expression()?;
        if let Some(t) = parser.peek() {
            return Err(ParseError::new(t.column, format!("unexpected '{}'", t.kind)));
        }
        // long operator chains nest without parentheses
        if expr.depth() > MAX_DEPTH {
            return Err(ParseError::new(
                1,
                format!("expression is deeper than {} levels", MAX_DEPTH),
            ));
        }
        Ok(expr)
    }

    /// Number of levels in the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((expr, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            match expr {
                Expr::Number(_) | Expr::Row => {}
                Expr::Neg(e) => pending.push((e, depth + 1)),
                Expr::Binary { lhs, rhs, .. } => {
                    pending.push((lhs, depth + 1));
                    pending.push((rhs, depth + 1));
                }
                Expr::Call { args, .. } => pending.extend(args.iter().map(|a| (a, depth + 1))),
            }
        }
        deepest
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Row => f.write_str("k"),
            Expr::Neg(e) => write!(f, "-({})", e),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Call { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Op(BinaryOp),
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::Ident(s) => f.write_str(s),
            TokenKind::Op(op) => write!(f, "{}", op.symbol()),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::Comma => f.write_str(","),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    column: usize,
}

fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;
        let kind = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => TokenKind::Op(BinaryOp::Add),
            '-' => TokenKind::Op(BinaryOp::Sub),
            '*' => TokenKind::Op(BinaryOp::Mul),
            '/' => TokenKind::Op(BinaryOp::Div),
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent, only when followed by digits
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                // literal suffixes `d` and `f`
                let literal: String = chars[start..i].iter().collect();
                if i < chars.len() && matches!(chars[i], 'd' | 'D' | 'f' | 'F') {
                    i += 1;
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ParseError::new(column, format!("malformed number '{}'", literal)))?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    column,
                });
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(chars[start..i].iter().collect()),
                    column,
                });
                continue;
            }
            other => {
                return Err(ParseError::new(column, format!("unexpected character '{}'", other)))
            }
        };
        tokens.push(Token { kind, column });
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Open parentheses, calls and signs around the current position.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn end_column(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.column + 1)
    }

    fn nested<T>(
        &mut self,
        column: usize,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new(
                column,
                format!("expression nests deeper than {} levels", MAX_DEPTH),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        match self.advance() {
            Some(t) if t.kind == kind => Ok(()),
            Some(t) => Err(ParseError::new(
                t.column,
                format!("expected '{}', found '{}'", kind, t.kind),
            )),
            None => Err(ParseError::new(self.end_column(), format!("expected '{}'", kind))),
        }
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        while let Some(TokenKind::Op(op @ (BinaryOp::Add | BinaryOp::Sub))) =
            self.peek().map(|t| t.kind.clone())
        {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        while let Some(TokenKind::Op(op @ (BinaryOp::Mul | BinaryOp::Div))) =
            self.peek().map(|t| t.kind.clone())
        {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().map(|t| (t.kind.clone(), t.column)) {
            Some((TokenKind::Op(BinaryOp::Sub), column)) => {
                self.pos += 1;
                let operand = self.nested(column, Self::unary)?;
                Ok(Expr::Neg(Box::new(operand)))
            }
            Some((TokenKind::Op(BinaryOp::Add), column)) => {
                self.pos += 1;
                self.nested(column, Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self
            .advance()
            .ok_or_else(|| ParseError::new(self.end_column(), "unexpected end of expression"))?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::LParen => {
                let inner = self.nested(token.column, Self::expression)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) if name == "k" => Ok(Expr::Row),
            TokenKind::Ident(name) => {
                let func = Function::lookup(&name).ok_or_else(|| {
                    ParseError::new(token.column, format!("cannot find symbol '{}'", name))
                })?;
                let args = self.nested(token.column, Self::arguments)?;
                if args.len() != func.arity() {
                    return Err(ParseError::new(
                        token.column,
                        format!(
                            "{} takes {} arguments, {} given",
                            func.name(),
                            func.arity(),
                            args.len()
                        ),
                    ));
                }
                Ok(Expr::Call { func, args })
            }
            other => Err(ParseError::new(token.column, format!("unexpected '{}'", other))),
        }
    }

    // arguments := '(' (expression (',' expression)*)? ')'
    fn arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::with_capacity(3);
        if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            args.push(self.expression()?);
            while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                self.pos += 1;
                args.push(self.expression()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn test_precedence() {
        let e = Expr::parse("1 + 2 * 3").unwrap();
        assert_eq!(
            e,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: num(1.0),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: num(2.0),
                    rhs: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_left_associative_subtraction() {
        let e = Expr::parse("k-1-2").unwrap();
        assert_eq!(e.to_string(), "((k - 1) - 2)");
    }

    #[test]
    fn test_calls_and_math_prefix() {
        let e = Expr::parse("Math.exp(getVariable(0,k-1)) / MyAvg(k-3, k, 1)").unwrap();
        assert_eq!(e.to_string(), "(Math.exp(getVariable(0, (k - 1))) / MyAvg((k - 3), k, 1))");
        assert!(Expr::parse("sqrt(2)").is_ok());
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(Expr::parse(".5").unwrap(), Expr::Number(0.5));
        assert_eq!(Expr::parse("1e-3").unwrap(), Expr::Number(0.001));
        assert_eq!(Expr::parse("2.0d").unwrap(), Expr::Number(2.0));
        assert!(Expr::parse("1.2.3").is_err());
    }

    #[test]
    fn test_unary_minus() {
        let e = Expr::parse("-getVariable(0,k)*2").unwrap();
        assert_eq!(e.to_string(), "(-(getVariable(0, k)) * 2)");
        assert_eq!(Expr::parse("--1").unwrap().to_string(), "-(-(1))");
    }

    #[test]
    fn test_errors_carry_column() {
        let err = Expr::parse("1 + foo(2)").unwrap_err();
        assert_eq!(err.column, 5);
        assert!(err.message.contains("foo"));

        let err = Expr::parse("getVariable(1)").unwrap_err();
        assert!(err.message.contains("takes 2 arguments"));

        assert!(Expr::parse("(1 + 2").is_err());
        assert!(Expr::parse("1 2").is_err());
        assert!(Expr::parse("").is_err());
        assert!(Expr::parse("1 ; 2").is_err());
    }

    #[test]
    fn test_nesting_is_bounded() {
        let nested = |levels: usize| format!("{}1{}", "(".repeat(levels), ")".repeat(levels));
        assert_eq!(Expr::parse(&nested(MAX_DEPTH - 1)).unwrap(), Expr::Number(1.0));

        let err = Expr::parse(&nested(1000)).unwrap_err();
        assert!(err.message.contains("deeper than"));
        assert!(Expr::parse(&"-".repeat(1000)).is_err());
        let calls = format!("{}k{}", "Math.abs(".repeat(1000), ")".repeat(1000));
        assert!(Expr::parse(&calls).is_err());
    }

    #[test]
    fn test_long_chains_are_bounded() {
        let chain = |terms: usize| vec!["1"; terms].join(" + ");
        let e = Expr::parse(&chain(MAX_DEPTH)).unwrap();
        assert_eq!(e.depth(), MAX_DEPTH);
        assert!(Expr::parse(&chain(5000)).is_err());
    }
}
