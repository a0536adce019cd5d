use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConsoleError;
use crate::resource::{NumericArray, ResourceRegistry};

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(NumericArray),
}

impl Value {
    /// Scalars become 1×1 arrays.
    pub fn into_array(self) -> NumericArray {
        match self {
            Value::Scalar(v) => NumericArray::new(1, 1, vec![v]),
            Value::Array(a) => a,
        }
    }

    fn as_index(&self) -> Result<usize, ConsoleError> {
        match self {
            Value::Scalar(v) if v.is_finite() && *v >= 0.0 => Ok(*v as usize),
            _ => Err(ConsoleError::Type("a non-negative integer index")),
        }
    }

    fn as_array(&self) -> Result<&NumericArray, ConsoleError> {
        match self {
            Value::Array(a) => Ok(a),
            Value::Scalar(_) => Err(ConsoleError::Type("an array")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(v) => write!(f, "{v}"),
            Value::Array(a) => {
                write!(f, "array({})", a.summary())?;
                let preview: Vec<String> = a.values.iter().take(8).map(|v| format!("{v:.4}")).collect();
                write!(f, " [{}{}]", preview.join(", "), if a.len() > 8 { ", …" } else { "" })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
    Assign,
    End,
}

fn tokenize(src: &str) -> Result<Vec<(usize, Token)>, ConsoleError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        match c {
            ' ' | '\t' | ';' => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent, e.g. 1e-3
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
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| ConsoleError::Parse {
                    pos: start,
                    msg: format!("invalid number '{text}'"),
                })?;
                tokens.push((start, Token::Number(value)));
            }
            c if c.is_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push((start, Token::Ident(chars[start..i].iter().collect())));
            }
            '`' => {
                i += 1;
                let name_start = i;
                while i < chars.len() && chars[i] != '`' {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(ConsoleError::Parse {
                        pos: start,
                        msg: "unterminated `name`".into(),
                    });
                }
                tokens.push((start, Token::Ident(chars[name_start..i].iter().collect())));
                i += 1;
            }
            '+' | '-' | '*' | '/' | '^' => {
                tokens.push((start, Token::Op(c)));
                i += 1;
            }
            '(' => {
                tokens.push((start, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((start, Token::RParen));
                i += 1;
            }
            ',' => {
                tokens.push((start, Token::Comma));
                i += 1;
            }
            '=' => {
                tokens.push((start, Token::Assign));
                i += 1;
            }
            other => {
                return Err(ConsoleError::Parse {
                    pos: start,
                    msg: format!("unexpected character '{other}'"),
                })
            }
        }
    }
    tokens.push((chars.len(), Token::End));
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Name(String),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// A console line: optional assignment target plus expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub target: Option<String>,
    pub expr: Expr,
}

/// Deepest expression tree the parser builds. Nesting and operator chains
/// both count.
pub const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].1
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].0
    }

    fn next(&mut self) -> Token {
        let tok = self.tokens[self.pos].1.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, msg: impl Into<String>) -> ConsoleError {
        ConsoleError::Parse {
            pos: self.offset(),
            msg: msg.into(),
        }
    }

    fn descend(&mut self) -> Result<(), ConsoleError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(format!("expression nested deeper than {MAX_DEPTH}")));
        }
        Ok(())
    }

    fn expect(&mut self, want: Token, what: &str) -> Result<(), ConsoleError> {
        if *self.peek() == want {
            self.next();
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn statement(&mut self) -> Result<Statement, ConsoleError> {
        let target = match (&self.tokens[self.pos].1, self.tokens.get(self.pos + 1)) {
            (Token::Ident(name), Some((_, Token::Assign))) => {
                let name = name.clone();
                self.pos += 2;
                Some(name)
            }
            _ => None,
        };
        let expr = self.expr()?;
        if *self.peek() != Token::End {
            return Err(self.error("unexpected input after expression"));
        }
        Ok(Statement { target, expr })
    }

    fn expr(&mut self) -> Result<Expr, ConsoleError> {
        let start = self.depth;
        let mut lhs = self.term()?;
        while let Token::Op(op @ ('+' | '-')) = *self.peek() {
            self.next();
            self.descend()?;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.depth = start;
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ConsoleError> {
        let start = self.depth;
        let mut lhs = self.unary()?;
        while let Token::Op(op @ ('*' | '/')) = *self.peek() {
            self.next();
            self.descend()?;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.depth = start;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ConsoleError> {
        let start = self.depth;
        self.descend()?;
        let expr = if *self.peek() == Token::Op('-') {
            self.next();
            Expr::Neg(Box::new(self.unary()?))
        } else {
            self.power()?
        };
        self.depth = start;
        Ok(expr)
    }

    // right-associative, binds tighter than unary minus on its left
    fn power(&mut self) -> Result<Expr, ConsoleError> {
        let base = self.atom()?;
        if *self.peek() == Token::Op('^') {
            self.next();
            let exp = self.unary()?;
            return Ok(Expr::Binary('^', Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ConsoleError> {
        match self.next() {
            Token::Number(v) => Ok(Expr::Number(v)),
            Token::Ident(name) => {
                if *self.peek() != Token::LParen {
                    return Ok(Expr::Name(name));
                }
                self.next();
                let mut args = Vec::new();
                if *self.peek() != Token::RParen {
                    loop {
                        args.push(self.expr()?);
                        if *self.peek() == Token::Comma {
                            self.next();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RParen, "')'")?;
                Ok(Expr::Call(name, args))
            }
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::End => Err(self.error("unexpected end of input")),
            other => Err(self.error(format!("unexpected {other:?}"))),
        }
    }
}

/// Parse one console line.
pub fn parse(src: &str) -> Result<Statement, ConsoleError> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
        depth: 0,
    };
    parser.statement()
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Names visible to an expression: local bindings (e.g. `_data`) shadow
/// resource aliases.
pub struct Env<'a> {
    registry: &'a ResourceRegistry,
    locals: BTreeMap<String, Value>,
}

impl<'a> Env<'a> {
    pub fn new(registry: &'a ResourceRegistry) -> Self {
        Self {
            registry,
            locals: BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }

    fn lookup(&self, name: &str) -> Result<Value, ConsoleError> {
        if let Some(v) = self.locals.get(name) {
            return Ok(v.clone());
        }
        if let Some(r) = self.registry.get(name) {
            return Ok(Value::Array(r.to_array()));
        }
        match name {
            "pi" => Ok(Value::Scalar(std::f64::consts::PI)),
            "e" => Ok(Value::Scalar(std::f64::consts::E)),
            "nan" => Ok(Value::Scalar(f64::NAN)),
            "inf" => Ok(Value::Scalar(f64::INFINITY)),
            _ => Err(ConsoleError::UnknownName(name.to_string())),
        }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, ConsoleError> {
        match expr {
            Expr::Number(v) => Ok(Value::Scalar(*v)),
            Expr::Name(name) => self.lookup(name),
            Expr::Neg(inner) => Ok(map_value(self.eval(inner)?, |v| -v)),
            Expr::Binary(op, lhs, rhs) => {
                let f: fn(f64, f64) -> f64 = match op {
                    '+' => |a, b| a + b,
                    '-' => |a, b| a - b,
                    '*' => |a, b| a * b,
                    '/' => |a, b| a / b,
                    _ => f64::powf,
                };
                broadcast(self.eval(lhs)?, self.eval(rhs)?, f)
            }
            Expr::Call(name, args) => {
                let values = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<Result<Vec<_>, _>>()?;
                call(name, values)
            }
        }
    }
}

fn map_value(value: Value, f: impl Fn(f64) -> f64) -> Value {
    match value {
        Value::Scalar(v) => Value::Scalar(f(v)),
        Value::Array(a) => Value::Array(a.map(f)),
    }
}

fn broadcast(lhs: Value, rhs: Value, f: fn(f64, f64) -> f64) -> Result<Value, ConsoleError> {
    match (lhs, rhs) {
        (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(a, b))),
        (Value::Array(a), Value::Scalar(b)) => Ok(Value::Array(a.map(|x| f(x, b)))),
        (Value::Scalar(a), Value::Array(b)) => Ok(Value::Array(b.map(|x| f(a, x)))),
        (Value::Array(a), Value::Array(b)) => {
            if a.shape() != b.shape() {
                return Err(ConsoleError::Shape {
                    left: a.shape(),
                    right: b.shape(),
                });
            }
            let values = a.values.iter().zip(&b.values).map(|(&x, &y)| f(x, y)).collect();
            Ok(Value::Array(NumericArray { values, ..a }))
        }
    }
}

fn check_arity(name: &str, args: &[Value], expected: usize) -> Result<(), ConsoleError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ConsoleError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn reduce(value: &Value, f: impl Fn(&[f64]) -> f64) -> f64 {
    match value {
        Value::Scalar(v) => f(&[*v]),
        Value::Array(a) => f(&a.values),
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Names of the built-in functions, for `help`.
pub const FUNCTIONS: &[&str] = &[
    "abs", "sqrt", "exp", "ln", "log10", "sin", "cos", "mean", "min", "max", "sum", "std", "len",
    "col", "row", "slice", "transpose",
];

fn call(name: &str, args: Vec<Value>) -> Result<Value, ConsoleError> {
    let elementwise: Option<fn(f64) -> f64> = match name {
        "abs" => Some(f64::abs),
        "sqrt" => Some(f64::sqrt),
        "exp" => Some(f64::exp),
        "ln" => Some(f64::ln),
        "log10" => Some(f64::log10),
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        _ => None,
    };
    if let Some(f) = elementwise {
        check_arity(name, &args, 1)?;
        return Ok(args.into_iter().next().map(|v| map_value(v, f)).unwrap_or(Value::Scalar(f64::NAN)));
    }

    match name {
        "mean" | "min" | "max" | "sum" | "std" => {
            check_arity(name, &args, 1)?;
            let v = &args[0];
            let out = match name {
                "mean" => reduce(v, mean),
                "min" => reduce(v, |xs| xs.iter().copied().fold(f64::INFINITY, f64::min)),
                "max" => reduce(v, |xs| xs.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
                "sum" => reduce(v, |xs| xs.iter().sum()),
                _ => reduce(v, |xs| {
                    let m = mean(xs);
                    (xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64).sqrt()
                }),
            };
            Ok(Value::Scalar(out))
        }
        "len" => {
            check_arity(name, &args, 1)?;
            Ok(Value::Scalar(match &args[0] {
                Value::Scalar(_) => 1.0,
                Value::Array(a) => a.rows as f64,
            }))
        }
        "transpose" => {
            check_arity(name, &args, 1)?;
            Ok(Value::Array(args[0].as_array()?.transpose()))
        }
        "col" => {
            check_arity(name, &args, 2)?;
            let a = args[0].as_array()?;
            let j = args[1].as_index()?;
            if j >= a.cols {
                return Err(ConsoleError::Index { index: j, len: a.cols });
            }
            let out = NumericArray::column(a.column_values(j))
                .with_sample_rate(a.sample_rate)
                .with_labels(vec![a.column_name(j)]);
            Ok(Value::Array(out))
        }
        "row" => {
            check_arity(name, &args, 2)?;
            let a = args[0].as_array()?;
            let i = args[1].as_index()?;
            if i >= a.rows {
                return Err(ConsoleError::Index { index: i, len: a.rows });
            }
            let values = a.values[i * a.cols..(i + 1) * a.cols].to_vec();
            Ok(Value::Array(NumericArray::column(values)))
        }
        "slice" => {
            check_arity(name, &args, 3)?;
            let a = args[0].as_array()?;
            let start = args[1].as_index()?;
            let end = args[2].as_index()?.min(a.rows);
            if start > end {
                return Err(ConsoleError::Index { index: start, len: end });
            }
            let values = a.values[start * a.cols..end * a.cols].to_vec();
            Ok(Value::Array(NumericArray {
                rows: end - start,
                values,
                ..a.clone()
            }))
        }
        other => Err(ConsoleError::UnknownFunction(other.to_string())),
    }
}
