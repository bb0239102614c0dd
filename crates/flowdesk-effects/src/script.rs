//! Sandboxed script evaluation.
//!
//! Scripts are a small assignment language over the variable bag:
//!
//! ```text
//! # comments start with '#' or '//'
//! vars.total = number(vars.price) * number(vars.qty)
//! greeting = "Olá, " + upper(vars.nome)
//! vars.message = greeting; return vars
//! ```
//!
//! There are no loops, no I/O and no host access. Evaluation is bounded by
//! an operation budget, a wall-clock timeout and a maximum value length.
//! Any failure discards the whole run; the caller's bag is never partially
//! updated.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;

use flowdesk_core::config::ScriptConfig;
use flowdesk_core::error::{FlowdeskError, Result};
use flowdesk_core::traits::ScriptEval;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("{func} expects {expected} argument(s), got {got}")]
    Arity {
        func: String,
        expected: usize,
        got: usize,
    },

    #[error("not a number: {0:?}")]
    NotANumber(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("operation budget of {0} exhausted")]
    BudgetExhausted(usize),

    #[error("value of {len} bytes exceeds limit of {max}")]
    ValueTooLarge { len: usize, max: usize },

    #[error("deadline exceeded")]
    Deadline,
}

impl From<ScriptError> for FlowdeskError {
    fn from(e: ScriptError) -> Self {
        FlowdeskError::Script(e.to_string())
    }
}

// ── Lexer ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Dot,
    Comma,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Semi,
}

fn tokenize(src: &str, line: usize) -> std::result::Result<Vec<Token>, ScriptError> {
    let err = |message: String| ScriptError::Parse { line, message };
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' => i += 1,
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Assign);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semi);
                i += 1;
            }
            '"' | '\'' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(err("unterminated string".into())),
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            let escaped = chars.get(i + 1).ok_or_else(|| err("dangling escape".into()))?;
                            s.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => *other,
                            });
                            i += 2;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| err(format!("bad number {:?}", text)))?;
                tokens.push(Token::Num(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(err(format!("unexpected character {:?}", other))),
        }
    }
    Ok(tokens)
}

// ── Parser ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Str(String),
    Num(f64),
    Var(String),
    Local(String),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
enum Target {
    Var(String),
    Local(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    Assign(Target, Expr),
    Return,
}

/// Deepest nesting of parentheses, calls and unary minus in one statement.
const MAX_DEPTH: usize = 64;
/// Longest statement, in tokens. Bounds left-nested operator chains.
const MAX_STATEMENT_TOKENS: usize = 1024;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
    depth: usize,
}

impl Parser {
    fn err(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, want: Token) -> std::result::Result<(), ScriptError> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(self.err(format!("expected {:?}, found {:?}", want, t))),
            None => Err(self.err(format!("expected {:?}", want))),
        }
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> std::result::Result<T, ScriptError>,
    ) -> std::result::Result<T, ScriptError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.err(format!("expression nested deeper than {}", MAX_DEPTH)));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn statement(&mut self) -> std::result::Result<Stmt, ScriptError> {
        let keyword = match self.peek() {
            Some(Token::Ident(word)) => Some(word.clone()),
            _ => None,
        };
        match keyword.as_deref() {
            // `return` or `return vars`
            Some("return") => return Ok(Stmt::Return),
            Some("let" | "const" | "var") => self.pos += 1,
            _ => {}
        }

        let target = match self.next() {
            Some(Token::Ident(name)) if name == "vars" && self.peek() == Some(&Token::Dot) => {
                self.pos += 1;
                match self.next() {
                    Some(Token::Ident(key)) => Target::Var(key),
                    _ => return Err(self.err("expected a name after 'vars.'")),
                }
            }
            Some(Token::Ident(name)) => Target::Local(name),
            _ => return Err(self.err("expected an assignment")),
        };
        self.expect(Token::Assign)?;
        let value = self.expr()?;
        if let Some(t) = self.peek() {
            return Err(self.err(format!("unexpected {:?}", t)));
        }
        Ok(Stmt::Assign(target, value))
    }

    fn expr(&mut self) -> std::result::Result<Expr, ScriptError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> std::result::Result<Expr, ScriptError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> std::result::Result<Expr, ScriptError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            let inner = self.nested(Self::unary)?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> std::result::Result<Expr, ScriptError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::LParen) => {
                let inner = self.nested(Self::expr)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if name == "vars" && self.peek() == Some(&Token::Dot) {
                    self.pos += 1;
                    return match self.next() {
                        Some(Token::Ident(key)) => Ok(Expr::Var(key)),
                        _ => Err(self.err("expected a name after 'vars.'")),
                    };
                }
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.nested(Self::expr)?);
                            if self.peek() == Some(&Token::Comma) {
                                self.pos += 1;
                                continue;
                            }
                            break;
                        }
                    }
                    self.expect(Token::RParen)?;
                    return Ok(Expr::Call(name, args));
                }
                Ok(Expr::Local(name))
            }
            Some(t) => Err(self.err(format!("unexpected {:?}", t))),
            None => Err(self.err("unexpected end of statement")),
        }
    }
}

/// Split on newlines and `;` tokens, drop comments and blank statements.
fn parse(script: &str) -> std::result::Result<Vec<Stmt>, ScriptError> {
    let mut program = Vec::new();
    for (idx, raw_line) in script.lines().enumerate() {
        let line = idx + 1;
        let tokens = tokenize(strip_comment(raw_line), line)?;
        for piece in tokens.split(|t| *t == Token::Semi) {
            if piece.is_empty() {
                continue;
            }
            if piece.len() > MAX_STATEMENT_TOKENS {
                return Err(ScriptError::Parse {
                    line,
                    message: format!("statement longer than {} tokens", MAX_STATEMENT_TOKENS),
                });
            }
            let mut parser = Parser {
                tokens: piece.to_vec(),
                pos: 0,
                line,
                depth: 0,
            };
            program.push(parser.statement()?);
        }
    }
    Ok(program)
}

/// Cut a trailing `#` or `//` comment that is not inside a string.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev = '\0';
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q && prev != '\\' => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' => return &line[..i],
            None if c == '/' && prev == '/' => return &line[..i - 1],
            None => {}
        }
        prev = c;
    }
    line
}

// ── Evaluation ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Num(f64),
}

impl Value {
    fn into_string(self) -> String {
        match self {
            Value::Str(s) => s,
            Value::Num(n) => format_number(n),
        }
    }

    fn as_number(&self) -> std::result::Result<f64, ScriptError> {
        match self {
            Value::Num(n) => Ok(*n),
            Value::Str(s) => {
                let t = s.trim();
                if t.is_empty() {
                    return Ok(0.0);
                }
                t.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| ScriptError::NotANumber(s.clone()))
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

struct Machine<'a> {
    vars: HashMap<String, String>,
    locals: HashMap<String, Value>,
    limits: &'a ScriptConfig,
    ops: usize,
    deadline: Instant,
}

impl Machine<'_> {
    fn tick(&mut self) -> std::result::Result<(), ScriptError> {
        self.ops += 1;
        if self.ops > self.limits.max_ops {
            return Err(ScriptError::BudgetExhausted(self.limits.max_ops));
        }
        if self.ops % 256 == 0 && Instant::now() > self.deadline {
            return Err(ScriptError::Deadline);
        }
        Ok(())
    }

    fn bounded(&self, value: Value) -> std::result::Result<Value, ScriptError> {
        if let Value::Str(s) = &value {
            if s.len() > self.limits.max_value_len {
                return Err(ScriptError::ValueTooLarge {
                    len: s.len(),
                    max: self.limits.max_value_len,
                });
            }
        }
        Ok(value)
    }

    fn run(mut self, program: &[Stmt]) -> std::result::Result<HashMap<String, String>, ScriptError> {
        for stmt in program {
            self.tick()?;
            match stmt {
                Stmt::Return => break,
                Stmt::Assign(target, expr) => {
                    let value = self.eval(expr)?;
                    match target {
                        Target::Var(key) => {
                            self.vars.insert(key.clone(), value.into_string());
                        }
                        Target::Local(name) => {
                            self.locals.insert(name.clone(), value);
                        }
                    }
                }
            }
        }
        Ok(self.vars)
    }

    fn eval(&mut self, expr: &Expr) -> std::result::Result<Value, ScriptError> {
        self.tick()?;
        let value = match expr {
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Num(n) => Value::Num(*n),
            Expr::Var(key) => Value::Str(self.vars.get(key).cloned().unwrap_or_default()),
            Expr::Local(name) => match self.locals.get(name) {
                Some(v) => v.clone(),
                None => match self.vars.get(name) {
                    Some(v) => Value::Str(v.clone()),
                    None => return Err(ScriptError::UnknownVariable(name.clone())),
                },
            },
            Expr::Neg(inner) => Value::Num(-self.eval(inner)?.as_number()?),
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                binary(*op, l, r)?
            }
            Expr::Call(name, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                call(name, values)?
            }
        };
        self.bounded(value)
    }
}

fn binary(op: BinOp, l: Value, r: Value) -> std::result::Result<Value, ScriptError> {
    let result = match op {
        BinOp::Add => {
            return Ok(match (l, r) {
                (Value::Num(a), Value::Num(b)) => Value::Num(a + b),
                (a, b) => Value::Str(a.into_string() + &b.into_string()),
            });
        }
        BinOp::Sub => l.as_number()? - r.as_number()?,
        BinOp::Mul => l.as_number()? * r.as_number()?,
        BinOp::Div | BinOp::Rem => {
            let (a, b) = (l.as_number()?, r.as_number()?);
            if b == 0.0 {
                return Err(ScriptError::DivisionByZero);
            }
            if op == BinOp::Div {
                a / b
            } else {
                a % b
            }
        }
    };
    Ok(Value::Num(result))
}

fn call(name: &str, args: Vec<Value>) -> std::result::Result<Value, ScriptError> {
    let lower = name.to_ascii_lowercase();
    let arity = |expected: usize| -> std::result::Result<(), ScriptError> {
        if args.len() != expected {
            return Err(ScriptError::Arity {
                func: name.to_string(),
                expected,
                got: args.len(),
            });
        }
        Ok(())
    };

    match lower.as_str() {
        "number" => {
            arity(1)?;
            Ok(Value::Num(args[0].as_number()?))
        }
        "string" => {
            arity(1)?;
            Ok(Value::Str(args[0].clone().into_string()))
        }
        "upper" => {
            arity(1)?;
            Ok(Value::Str(args[0].clone().into_string().to_uppercase()))
        }
        "lower" => {
            arity(1)?;
            Ok(Value::Str(args[0].clone().into_string().to_lowercase()))
        }
        "trim" => {
            arity(1)?;
            Ok(Value::Str(args[0].clone().into_string().trim().to_string()))
        }
        "len" => {
            arity(1)?;
            Ok(Value::Num(args[0].clone().into_string().chars().count() as f64))
        }
        "round" => {
            arity(1)?;
            Ok(Value::Num(args[0].as_number()?.round()))
        }
        "concat" => Ok(Value::Str(
            args.into_iter().map(Value::into_string).collect::<String>(),
        )),
        _ => Err(ScriptError::UnknownFunction(name.to_string())),
    }
}

/// Evaluate `script` against `variables` synchronously.
pub fn evaluate(
    variables: HashMap<String, String>,
    script: &str,
    limits: &ScriptConfig,
) -> std::result::Result<HashMap<String, String>, ScriptError> {
    let program = parse(script)?;
    let machine = Machine {
        vars: variables,
        locals: HashMap::new(),
        limits,
        ops: 0,
        deadline: Instant::now() + Duration::from_millis(limits.timeout_ms),
    };
    machine.run(&program)
}

/// `ScriptEval` backed by the sandbox above, run off the async workers.
pub struct SandboxScript {
    limits: ScriptConfig,
}

impl SandboxScript {
    pub fn new(limits: ScriptConfig) -> Self {
        Self { limits }
    }
}

impl ScriptEval for SandboxScript {
    fn run(
        &self,
        variables: HashMap<String, String>,
        script: String,
    ) -> BoxFuture<'_, Result<HashMap<String, String>>> {
        Box::pin(async move {
            let limits = self.limits.clone();
            let timeout_ms = limits.timeout_ms;
            let task = tokio::task::spawn_blocking(move || evaluate(variables, &script, &limits));

            match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
                Err(_) => Err(FlowdeskError::ScriptTimeout { timeout_ms }),
                Ok(Err(join)) => Err(FlowdeskError::Script(join.to_string())),
                Ok(Ok(Err(ScriptError::Deadline))) => Err(FlowdeskError::ScriptTimeout { timeout_ms }),
                Ok(Ok(result)) => {
                    let bag = result?;
                    debug!(vars = bag.len(), "Script finished");
                    Ok(bag)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(vars: &[(&str, &str)], script: &str) -> std::result::Result<HashMap<String, String>, ScriptError> {
        let bag = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        evaluate(bag, script, &ScriptConfig::default())
    }

    #[test]
    fn test_arithmetic_and_concat() {
        let out = run(
            &[("price", "10.5"), ("qty", "2"), ("nome", "ana")],
            r#"
            # totals
            vars.total = number(vars.price) * number(vars.qty)
            vars.label = "Cliente: " + upper(vars.nome) // inline comment
            vars.joined = vars.qty + vars.qty; return vars
            "#,
        )
        .unwrap();
        assert_eq!(out["total"], "21");
        assert_eq!(out["label"], "Cliente: ANA");
        assert_eq!(out["joined"], "22");
        assert_eq!(out["price"], "10.5");
    }

    #[test]
    fn test_locals_are_not_exported() {
        let out = run(&[], "let tmp = 2 * (3 + 4); vars.x = tmp - 1").unwrap();
        assert_eq!(out.get("tmp"), None);
        assert_eq!(out["x"], "13");
    }

    #[test]
    fn test_missing_var_reads_empty() {
        let out = run(&[], "vars.y = vars.nothing + \"!\"").unwrap();
        assert_eq!(out["y"], "!");
    }

    #[test]
    fn test_return_stops() {
        let out = run(&[], "vars.a = 1\nreturn vars\nvars.b = 2").unwrap();
        assert!(out.contains_key("a"));
        assert!(!out.contains_key("b"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(run(&[], "vars.x = 1 +"), Err(ScriptError::Parse { line: 1, .. })));
        assert!(matches!(run(&[], "vars.x = fetch(\"http://x\")"), Err(ScriptError::UnknownFunction(_))));
        assert!(matches!(run(&[], "vars.x = 1 / 0"), Err(ScriptError::DivisionByZero)));
        assert!(matches!(run(&[("a", "abc")], "vars.x = number(vars.a)"), Err(ScriptError::NotANumber(_))));
        assert!(matches!(run(&[], "vars.x = ghost"), Err(ScriptError::UnknownVariable(_))));
        assert!(matches!(run(&[], "require('fs')"), Err(ScriptError::Parse { .. })));
    }

    #[test]
    fn test_budget_and_size_limits() {
        let limits = ScriptConfig {
            max_ops: 5,
            ..ScriptConfig::default()
        };
        let err = evaluate(HashMap::new(), "vars.a = 1 + 2 + 3 + 4 + 5", &limits).unwrap_err();
        assert_eq!(err, ScriptError::BudgetExhausted(5));

        let limits = ScriptConfig {
            max_value_len: 8,
            ..ScriptConfig::default()
        };
        let err = evaluate(HashMap::new(), "vars.a = \"abcdef\" + \"ghijk\"", &limits).unwrap_err();
        assert!(matches!(err, ScriptError::ValueTooLarge { len: 11, max: 8 }));
    }

    #[test]
    fn test_comment_inside_string_kept() {
        let out = run(&[], "vars.url = \"http://x/#frag\"").unwrap();
        assert_eq!(out["url"], "http://x/#frag");
    }

    #[test]
    fn test_semicolon_inside_string_kept() {
        let out = run(&[], "vars.msg = \"Olá; tudo bem\"; vars.n = 'a;b'").unwrap();
        assert_eq!(out["msg"], "Olá; tudo bem");
        assert_eq!(out["n"], "a;b");
    }

    #[test]
    fn test_nesting_is_bounded() {
        let ok = format!("vars.x = {}1{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert_eq!(run(&[], &ok).unwrap()["x"], "1");

        let parens = format!("vars.x = {}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(run(&[], &parens), Err(ScriptError::Parse { line: 1, .. })));

        let minus = format!("vars.x = {}1", "-".repeat(MAX_DEPTH + 1));
        assert!(matches!(run(&[], &minus), Err(ScriptError::Parse { .. })));

        let calls = format!("vars.x = {}1{}", "trim(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(run(&[], &calls), Err(ScriptError::Parse { .. })));
    }

    #[test]
    fn test_long_operator_chain_is_rejected() {
        let chain = format!("vars.x = 1{}", " + 1".repeat(100_000));
        assert!(matches!(run(&[], &chain), Err(ScriptError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_deeply_nested_script_fails_without_crashing() {
        let sandbox = SandboxScript::new(ScriptConfig::default());
        let script = format!("vars.x = {}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let err = sandbox.run(HashMap::new(), script).await.unwrap_err();
        assert!(matches!(err, FlowdeskError::Script(_)));
    }

    #[tokio::test]
    async fn test_sandbox_failure_is_script_error() {
        let sandbox = SandboxScript::new(ScriptConfig::default());
        let err = sandbox
            .run(HashMap::new(), "vars.x = nope(".into())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowdeskError::Script(_)));

        let ok = sandbox
            .run(HashMap::from([("n".into(), "4".into())]), "vars.n = number(vars.n) + 1".into())
            .await
            .unwrap();
        assert_eq!(ok["n"], "5");
    }
}
