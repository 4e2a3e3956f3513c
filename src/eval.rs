//! `$expression` evaluation.
//!
//! A small interpreted expression language: source text is tokenized, parsed
//! into an [`Expr`] tree once at construction, then evaluated against
//! `{data, scope}` on every bind. The only free variables are `data` and
//! `this` (the scope); everything else is a literal, an operator, a member
//! access or a method call.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! conditional := or ("?" conditional ":" conditional)?
//! or          := and (("||" | "??") and)*
//! and         := equality ("&&" equality)*
//! equality    := relational (("==" | "!=" | "===" | "!==") relational)*
//! relational  := additive (("<" | "<=" | ">" | ">=") additive)*
//! additive    := multiplicative (("+" | "-") multiplicative)*
//! multiplicative := unary (("*" | "/" | "%") unary)*
//! unary       := ("!" | "-" | "+") unary | postfix
//! postfix     := primary ("." name | "[" conditional "]" | "." name "(" args ")")*
//! primary     := number | string | true | false | null | undefined
//!              | data | this | "[" args "]" | "(" conditional ")"
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::scope::Scope;
use crate::value::{display_value, format_number, number_value, BindValue};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("cannot read property '{property}' of {of}")]
    NullAccess { property: String, of: String },

    #[error("'{0}' is not a method of the binding scope")]
    UnknownScopeMethod(String),

    #[error("'{method}' is not a function on {of}")]
    NotAFunction { method: String, of: String },

    #[error("{method}() {message}")]
    Range { method: String, message: String },
}

// ═══════════════════════════════════════════════════════════════════════════════
// AST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Undefined,
    Data,
    This,
    Array(Vec<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    And,
    Or,
    Coalesce,
}

impl Expr {
    pub fn parse(source: &str) -> Result<Expr, EvalError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.conditional()?;
        match parser.peek() {
            None => Ok(expr),
            Some(token) => Err(parser.error_at(token.position, "unexpected trailing input")),
        }
    }

    pub fn evaluate(&self, data: &Value, scope: &Scope) -> Result<BindValue, EvalError> {
        let context = Context { data, scope };
        context.eval(self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEXER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    position: usize,
}

/// Longest operators first so that `===` wins over `==`.
const PUNCTUATION: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "??", "(", ")", "[", "]", ".", ",", "?",
    ":", "!", "+", "-", "*", "/", "%", "<", ">",
];

fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).map_or(false, char::is_ascii_digit)) {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                i += 1;
                if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let number = text.parse::<f64>().map_err(|_| EvalError::Syntax {
                position: start,
                message: format!("invalid number '{}'", text),
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(number),
                position: start,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            let mut text = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => {
                        return Err(EvalError::Syntax {
                            position: start,
                            message: "unterminated string literal".to_string(),
                        })
                    }
                    Some(&ch) if ch == quote => {
                        i += 1;
                        break;
                    }
                    Some('\\') => {
                        let escaped = chars.get(i + 1).copied().ok_or(EvalError::Syntax {
                            position: i,
                            message: "unterminated escape".to_string(),
                        })?;
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            other => other,
                        });
                        i += 2;
                    }
                    Some(&ch) => {
                        text.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token {
                kind: TokenKind::Str(text),
                position: start,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(chars[start..i].iter().collect()),
                position: start,
            });
            continue;
        }

        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        match PUNCTUATION.iter().find(|p| rest.starts_with(**p)) {
            Some(punct) => {
                tokens.push(Token {
                    kind: TokenKind::Punct(*punct),
                    position: start,
                });
                i += punct.chars().count();
            }
            None => {
                return Err(EvalError::Syntax {
                    position: start,
                    message: format!("unexpected character '{}'", c),
                })
            }
        }
    }
    Ok(tokens)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn end_position(&self) -> usize {
        self.tokens.last().map_or(0, |t| t.position + 1)
    }

    fn error_at(&self, position: usize, message: &str) -> EvalError {
        EvalError::Syntax {
            position,
            message: message.to_string(),
        }
    }

    fn eat(&mut self, punct: &str) -> bool {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Punct(p),
                ..
            }) if *p == punct => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), EvalError> {
        if self.eat(punct) {
            return Ok(());
        }
        let position = self.peek().map_or(self.end_position(), |t| t.position);
        Err(self.error_at(position, &format!("expected '{}'", punct)))
    }

    fn binary_level(
        &mut self,
        operators: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        let mut left = next(self)?;
        'outer: loop {
            for (punct, op) in operators {
                if self.eat(punct) {
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn conditional(&mut self) -> Result<Expr, EvalError> {
        let test = self.or()?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.conditional()?;
        self.expect(":")?;
        let alternate = self.conditional()?;
        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[("||", BinaryOp::Or), ("??", BinaryOp::Coalesce)], Self::and)
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[("&&", BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNe),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::Ne),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[("+", BinaryOp::Add), ("-", BinaryOp::Sub)], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = if self.eat("!") {
            UnaryOp::Not
        } else if self.eat("-") {
            UnaryOp::Negate
        } else if self.eat("+") {
            UnaryOp::Plus
        } else {
            return self.postfix();
        };
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(".") {
                let name = self.identifier()?;
                if self.eat("(") {
                    let args = self.arguments(")")?;
                    expr = Expr::Call {
                        target: Box::new(expr),
                        method: name,
                        args,
                    };
                } else {
                    expr = Expr::Member(Box::new(expr), name);
                }
            } else if self.eat("[") {
                let index = self.conditional()?;
                self.expect("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if let Some(Token {
                kind: TokenKind::Punct("("),
                position,
            }) = self.peek()
            {
                return Err(self.error_at(*position, "only methods can be called"));
            } else {
                return Ok(expr);
            }
        }
    }

    fn identifier(&mut self) -> Result<String, EvalError> {
        match self.peek().cloned() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => {
                self.pos += 1;
                Ok(name)
            }
            Some(token) => Err(self.error_at(token.position, "expected property name")),
            None => Err(self.error_at(self.end_position(), "expected property name")),
        }
    }

    fn arguments(&mut self, close: &str) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.eat(close) {
            return Ok(args);
        }
        loop {
            args.push(self.conditional()?);
            if self.eat(close) {
                return Ok(args);
            }
            self.expect(",")?;
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_at(self.end_position(), "unexpected end of expression"));
        };
        self.pos += 1;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(number_value(n).into_json().unwrap_or(Value::Null))),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                "undefined" => Ok(Expr::Undefined),
                "data" => Ok(Expr::Data),
                "this" => Ok(Expr::This),
                _ => Err(self.error_at(
                    token.position,
                    &format!("unknown identifier '{}' (use 'data.' or 'this.')", name),
                )),
            },
            TokenKind::Punct("(") => {
                let inner = self.conditional()?;
                self.expect(")")?;
                Ok(inner)
            }
            TokenKind::Punct("[") => Ok(Expr::Array(self.arguments("]")?)),
            TokenKind::Punct(p) => Err(self.error_at(token.position, &format!("unexpected '{}'", p))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION
// ═══════════════════════════════════════════════════════════════════════════════

struct Context<'a> {
    data: &'a Value,
    scope: &'a Scope,
}

impl Context<'_> {
    fn eval(&self, expr: &Expr) -> Result<BindValue, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(BindValue::Value(value.clone())),
            Expr::Undefined => Ok(BindValue::Undefined),
            Expr::Data => Ok(BindValue::Value(self.data.clone())),
            Expr::This => Ok(BindValue::Value(self.scope.properties())),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?.into_json().unwrap_or(Value::Null));
                }
                Ok(BindValue::Value(Value::Array(values)))
            }
            Expr::Member(target, name) => {
                if let Expr::This = target.as_ref() {
                    return Ok(self.scope.property(name).into());
                }
                member(&self.eval(target)?, name)
            }
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let key = self.eval(index)?;
                member(&target, &key.to_display_string())
            }
            Expr::Call {
                target,
                method,
                args,
            } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                if let Expr::This = target.as_ref() {
                    return self.call_scope_method(method, values);
                }
                call_method(self.eval(target)?, method, &values)
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => BindValue::from(!value.is_truthy()),
                    UnaryOp::Negate => number_value(-value.to_number()),
                    UnaryOp::Plus => number_value(value.to_number()),
                })
            }
            Expr::Binary(op, left, right) => self.binary(*op, left, right),
            Expr::Conditional(test, consequent, alternate) => {
                if self.eval(test)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
        }
    }

    /// `this.name(arg)` calls the scope method with `arg` as its data; with no
    /// argument the current data is passed.
    fn call_scope_method(&self, name: &str, args: Vec<BindValue>) -> Result<BindValue, EvalError> {
        let method = self
            .scope
            .method(name)
            .ok_or_else(|| EvalError::UnknownScopeMethod(name.to_string()))?;
        match args.into_iter().next() {
            Some(arg) => {
                let arg = arg.into_json().unwrap_or(Value::Null);
                Ok(method(&arg, self.scope))
            }
            None => Ok(method(self.data, self.scope)),
        }
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<BindValue, EvalError> {
        let lhs = self.eval(left)?;
        match op {
            BinaryOp::And => {
                return if lhs.is_truthy() { self.eval(right) } else { Ok(lhs) };
            }
            BinaryOp::Or => {
                return if lhs.is_truthy() { Ok(lhs) } else { self.eval(right) };
            }
            BinaryOp::Coalesce => {
                return if lhs.is_nullish() { self.eval(right) } else { Ok(lhs) };
            }
            _ => {}
        }
        let rhs = self.eval(right)?;
        Ok(match op {
            BinaryOp::Add => {
                if is_stringish(&lhs) || is_stringish(&rhs) {
                    BindValue::from(format!("{}{}", lhs.to_display_string(), rhs.to_display_string()))
                } else {
                    number_value(lhs.to_number() + rhs.to_number())
                }
            }
            BinaryOp::Sub => number_value(lhs.to_number() - rhs.to_number()),
            BinaryOp::Mul => number_value(lhs.to_number() * rhs.to_number()),
            BinaryOp::Div => number_value(lhs.to_number() / rhs.to_number()),
            BinaryOp::Rem => number_value(lhs.to_number() % rhs.to_number()),
            BinaryOp::Lt => BindValue::from(compare(&lhs, &rhs, |o| o.is_lt())),
            BinaryOp::Le => BindValue::from(compare(&lhs, &rhs, |o| o.is_le())),
            BinaryOp::Gt => BindValue::from(compare(&lhs, &rhs, |o| o.is_gt())),
            BinaryOp::Ge => BindValue::from(compare(&lhs, &rhs, |o| o.is_ge())),
            BinaryOp::Eq => BindValue::from(loose_equals(&lhs, &rhs)),
            BinaryOp::Ne => BindValue::from(!loose_equals(&lhs, &rhs)),
            BinaryOp::StrictEq => BindValue::from(lhs == rhs),
            BinaryOp::StrictNe => BindValue::from(lhs != rhs),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Coalesce => unreachable!("short-circuit ops handled above"),
        })
    }
}

fn is_stringish(value: &BindValue) -> bool {
    matches!(
        value.as_value(),
        Some(Value::String(_)) | Some(Value::Array(_)) | Some(Value::Object(_))
    )
}

fn compare(lhs: &BindValue, rhs: &BindValue, test: fn(std::cmp::Ordering) -> bool) -> bool {
    if let (Some(a), Some(b)) = (lhs.as_str(), rhs.as_str()) {
        return test(a.cmp(b));
    }
    lhs.to_number()
        .partial_cmp(&rhs.to_number())
        .map_or(false, test)
}

fn loose_equals(lhs: &BindValue, rhs: &BindValue) -> bool {
    if lhs.is_nullish() || rhs.is_nullish() {
        return lhs.is_nullish() && rhs.is_nullish();
    }
    match (lhs.as_value(), rhs.as_value()) {
        (Some(Value::String(a)), Some(Value::String(b))) => a == b,
        (Some(Value::Array(_) | Value::Object(_)), _) | (_, Some(Value::Array(_) | Value::Object(_))) => {
            lhs == rhs
        }
        (Some(_), Some(_)) => lhs.to_number() == rhs.to_number(),
        _ => lhs.loose_eq(rhs),
    }
}

/// Read `name` from a value. Reading from undefined or null is an error; a
/// missing property is undefined.
pub fn member(target: &BindValue, name: &str) -> Result<BindValue, EvalError> {
    let value = match target {
        BindValue::Undefined => {
            return Err(EvalError::NullAccess {
                property: name.to_string(),
                of: "undefined".to_string(),
            })
        }
        BindValue::Nodes(nodes) => {
            return Ok(match name {
                "length" => BindValue::from(nodes.len() as i64),
                _ => BindValue::Undefined,
            })
        }
        BindValue::Value(value) => value,
    };
    Ok(match value {
        Value::Null => {
            return Err(EvalError::NullAccess {
                property: name.to_string(),
                of: "null".to_string(),
            })
        }
        Value::Object(map) => map.get(name).into(),
        Value::Array(items) => match name {
            "length" => BindValue::from(items.len() as i64),
            _ => name
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .into(),
        },
        Value::String(s) => match name {
            "length" => BindValue::from(s.chars().count() as i64),
            _ => name
                .parse::<usize>()
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| c.to_string())
                .into(),
        },
        Value::Bool(_) | Value::Number(_) => BindValue::Undefined,
    })
}

/// Follow a dot-separated path from `root`. Every segment is looked up even
/// when an intermediate value is absent, which makes such paths fail.
pub fn lookup_path<S: AsRef<str>>(root: &Value, segments: &[S]) -> Result<BindValue, EvalError> {
    let mut current = BindValue::Value(root.clone());
    for segment in segments {
        current = member(&current, segment.as_ref())?;
    }
    Ok(current)
}

/// Largest `digits` argument `toFixed` accepts.
const MAX_FIXED_DIGITS: f64 = 100.0;

fn call_method(target: BindValue, method: &str, args: &[BindValue]) -> Result<BindValue, EvalError> {
    let arg_string = |i: usize| args.get(i).map(BindValue::to_display_string);
    let not_a_function = |of: &str| EvalError::NotAFunction {
        method: method.to_string(),
        of: of.to_string(),
    };

    if target.is_nullish() {
        return Err(EvalError::NullAccess {
            property: method.to_string(),
            of: target.to_display_string(),
        });
    }
    if method == "toString" {
        return Ok(BindValue::from(target.to_display_string()));
    }

    match target.as_value() {
        Some(Value::String(s)) => match method {
            "toUpperCase" => Ok(BindValue::from(s.to_uppercase())),
            "toLowerCase" => Ok(BindValue::from(s.to_lowercase())),
            "trim" => Ok(BindValue::from(s.trim())),
            "includes" => Ok(BindValue::from(s.contains(arg_string(0).unwrap_or_default().as_str()))),
            "startsWith" => Ok(BindValue::from(s.starts_with(arg_string(0).unwrap_or_default().as_str()))),
            "endsWith" => Ok(BindValue::from(s.ends_with(arg_string(0).unwrap_or_default().as_str()))),
            _ => Err(not_a_function("string")),
        },
        Some(Value::Array(items)) => match method {
            "join" => {
                let separator = arg_string(0).unwrap_or_else(|| ",".to_string());
                let joined = items
                    .iter()
                    .map(|item| match item {
                        Value::Null => String::new(),
                        other => display_value(other),
                    })
                    .collect::<Vec<_>>()
                    .join(&separator);
                Ok(BindValue::from(joined))
            }
            "includes" => {
                let needle = args.first().cloned().unwrap_or_default();
                Ok(BindValue::from(
                    items.iter().any(|item| BindValue::from(item) == needle),
                ))
            }
            _ => Err(not_a_function("array")),
        },
        Some(Value::Number(n)) => match method {
            "toFixed" => {
                let digits = args.first().map_or(0.0, BindValue::to_number);
                let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
                if !(0.0..=MAX_FIXED_DIGITS).contains(&digits) {
                    return Err(EvalError::Range {
                        method: method.to_string(),
                        message: format!("digits argument must be between 0 and {}", MAX_FIXED_DIGITS),
                    });
                }
                let f = n.as_f64().unwrap_or(f64::NAN);
                // digits are ignored from 1e21 up
                Ok(BindValue::from(if f.is_finite() && f.abs() < 1e21 {
                    format!("{:.*}", digits as usize, f)
                } else {
                    format_number(f)
                }))
            }
            _ => Err(not_a_function("number")),
        },
        _ => Err(not_a_function("value")),
    }
}
