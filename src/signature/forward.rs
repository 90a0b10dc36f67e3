// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Parsed representation of a unit's entry point body.
//!
//! Unit manifests may carry the source of the entry point body. It is never
//! executed; it is tokenized and parsed into a small statement/expression IR
//! so the extractor can answer two questions:
//!
//! * which delegate does the body call first (in execution order)?
//! * which output fields does it construct in its `return Prediction(...)`
//!   statements?
//!
//! The accepted language is a Python-flavoured subset: assignments (plain,
//! annotated, augmented, chained, tuple targets), expression statements,
//! `return`, indented `if`/`elif`/`else`/`for`/`while`/`with`/`try`/
//! `except`/`finally` blocks, calls with positional, keyword, `*` and `**`
//! arguments, attribute access, subscripts, literals and bracketed
//! expressions spanning several lines.
//!
//! # Examples
//!
//! ```
//! use the_switchboard::signature::ForwardBody;
//!
//! let body = ForwardBody::parse(r#"
//! summary = self.summarizer(**kwargs)
//! tags = self.tagger(blog_post=summary.summary)
//! return Prediction(summary=summary.summary, tags=tags.tags)
//! "#).unwrap();
//!
//! assert_eq!(body.first_delegate_call(), Some("summarizer"));
//! assert_eq!(body.returned_fields(), vec!["summary", "tags"]);
//! ```

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ForwardParseError {
    pub line: usize,
    pub message: String,
}

impl ForwardParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    Literal(String),
    Attribute { value: Box<Expr>, attr: String },
    Call { func: Box<Expr>, args: Vec<Arg> },
    Subscript { value: Box<Expr>, index: Box<Expr> },
    Collection(Vec<Expr>),
    Await(Box<Expr>),
    Unary(Box<Expr>),
    BinOp(Box<Expr>, Box<Expr>),
    Opaque,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Positional(Expr),
    Keyword(String, Expr),
    Star(Expr),
    DoubleStar(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { targets: Vec<Expr>, value: Expr },
    Expr(Expr),
    Return(Option<Expr>),
    Block {
        keyword: String,
        header: Option<Expr>,
        body: Vec<Stmt>,
    },
    Pass,
    Other,
}

/// Delegate method names that are not delegates themselves.
const NON_DELEGATE_ATTRS: &[&str] = &["__init__", "forward", "aforward"];
/// Methods that invoke a delegate through an explicit call, e.g. `self.predict.acall(...)`.
const DELEGATE_CALL_METHODS: &[&str] = &["__call__", "acall", "forward", "aforward"];
/// Blocks whose first body is searched for the first delegate call.
const FIRST_BRANCH_BLOCKS: &[&str] = &["if", "for", "while", "with", "try"];

#[derive(Debug, Clone, PartialEq)]
pub struct ForwardBody {
    statements: Vec<Stmt>,
}

impl ForwardBody {
    pub fn parse(source: &str) -> Result<Self, ForwardParseError> {
        let tokens = tokenize(source)?;
        let lines = logical_lines(tokens);
        if lines.is_empty() {
            return Ok(Self { statements: vec![] });
        }

        let base = lines[0].indent;
        let mut pos = 0;
        let mut statements = parse_block(&lines, &mut pos, base)?;
        if pos < lines.len() {
            return Err(ForwardParseError::new(
                lines[pos].number,
                "unindent does not match the body's indentation",
            ));
        }

        // A full `def forward(self, ...):` is accepted too; analyse its body.
        if let [Stmt::Block { keyword, body, .. }] = statements.as_slice() {
            if keyword == "def" {
                statements = body.clone();
            }
        }

        Ok(Self { statements })
    }

    pub fn statements(&self) -> &[Stmt] {
        &self.statements
    }

    /// Name of the first delegate attribute called, in execution order.
    ///
    /// Inside control-flow blocks only the first branch is considered.
    pub fn first_delegate_call(&self) -> Option<&str> {
        first_call_in(&self.statements)
    }

    /// Field names of every `return Prediction(field=...)` in the body,
    /// in first-seen order without duplicates.
    pub fn returned_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        collect_returned_fields(&self.statements, &mut fields);
        fields
    }
}

fn first_call_in(statements: &[Stmt]) -> Option<&str> {
    statements.iter().find_map(|stmt| match stmt {
        Stmt::Assign { value, .. } => delegate_call(value),
        Stmt::Expr(expr) => delegate_call(expr),
        Stmt::Return(Some(expr)) => delegate_call(expr),
        Stmt::Block { keyword, body, .. } if FIRST_BRANCH_BLOCKS.contains(&keyword.as_str()) => {
            first_call_in(body)
        }
        _ => None,
    })
}

fn delegate_call(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Call { func, .. } => match func.as_ref() {
            Expr::Attribute { value, attr } if is_self(value) => {
                (!NON_DELEGATE_ATTRS.contains(&attr.as_str())).then_some(attr.as_str())
            }
            Expr::Attribute { value, attr } if DELEGATE_CALL_METHODS.contains(&attr.as_str()) => {
                match value.as_ref() {
                    Expr::Attribute { value: owner, attr: delegate } if is_self(owner) => {
                        Some(delegate.as_str())
                    }
                    _ => None,
                }
            }
            _ => None,
        },
        Expr::Attribute { value, .. } => match value.as_ref() {
            call @ Expr::Call { .. } => delegate_call(call),
            _ => None,
        },
        Expr::Await(inner) => delegate_call(inner),
        _ => None,
    }
}

fn is_self(expr: &Expr) -> bool {
    matches!(expr, Expr::Name(name) if name == "self")
}

fn collect_returned_fields(statements: &[Stmt], fields: &mut Vec<String>) {
    for stmt in statements {
        match stmt {
            Stmt::Return(Some(Expr::Call { func, args })) if is_prediction(func) => {
                for arg in args {
                    if let Arg::Keyword(name, _) = arg {
                        if !fields.contains(name) {
                            fields.push(name.clone());
                        }
                    }
                }
            }
            Stmt::Block { keyword, body, .. } if keyword != "def" && keyword != "class" => {
                collect_returned_fields(body, fields)
            }
            _ => {}
        }
    }
}

fn is_prediction(func: &Expr) -> bool {
    match func {
        Expr::Name(name) => name == "Prediction",
        Expr::Attribute { attr, .. } => attr == "Prediction",
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Number(String),
    Str(String),
    Op(&'static str),
    Indent(usize),
    Newline,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
}

const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "**", "//", "==", "!=", "<=", ">=", "->", "+=", "-=",
    "*=", "/=", "%=", "&=", "|=", "^=", "@=", ":=", "<<", ">>", "+", "-", "*", "/", "%", "@",
    "<", ">", "=", ".", ",", ":", ";", "(", ")", "[", "]", "{", "}", "&", "|", "^", "~", "!",
];

const STRING_PREFIXES: &[&str] = &["r", "b", "f", "u", "rb", "br", "fr", "rf"];

fn tokenize(source: &str) -> Result<Vec<Spanned>, ForwardParseError> {
    let chars: Vec<char> = source.chars().filter(|c| *c != '\r').collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;
    let mut depth = 0usize;
    let mut at_line_start = true;

    while i < chars.len() {
        if at_line_start && depth == 0 {
            let mut col = 0;
            let mut j = i;
            while j < chars.len() && (chars[j] == ' ' || chars[j] == '\t') {
                col += if chars[j] == '\t' { 4 } else { 1 };
                j += 1;
            }
            if j >= chars.len() {
                break;
            }
            match chars[j] {
                '\n' => {
                    i = j + 1;
                    line += 1;
                    continue;
                }
                '#' => {
                    while j < chars.len() && chars[j] != '\n' {
                        j += 1;
                    }
                    i = j;
                    continue;
                }
                _ => {
                    tokens.push(Spanned {
                        token: Token::Indent(col),
                        line,
                    });
                    i = j;
                    at_line_start = false;
                    continue;
                }
            }
        }

        let c = chars[i];
        match c {
            '\n' => {
                if depth == 0 {
                    tokens.push(Spanned {
                        token: Token::Newline,
                        line,
                    });
                    at_line_start = true;
                }
                line += 1;
                i += 1;
            }
            ' ' | '\t' => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                i += 2;
                line += 1;
            }
            '\'' | '"' => {
                let start_line = line;
                let (text, next, lines) = lex_string(&chars, i, line)?;
                tokens.push(Spanned {
                    token: Token::Str(text),
                    line: start_line,
                });
                i = next;
                line += lines;
            }
            c if c.is_ascii_digit()
                || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '.' || chars[i] == '_')
                {
                    i += 1;
                }
                tokens.push(Spanned {
                    token: Token::Number(chars[start..i].iter().collect()),
                    line,
                });
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let quote_follows = matches!(chars.get(i), Some('\'') | Some('"'));
                if quote_follows && STRING_PREFIXES.contains(&ident.to_lowercase().as_str()) {
                    let start_line = line;
                    let (text, next, lines) = lex_string(&chars, i, line)?;
                    tokens.push(Spanned {
                        token: Token::Str(text),
                        line: start_line,
                    });
                    i = next;
                    line += lines;
                } else {
                    tokens.push(Spanned {
                        token: Token::Name(ident),
                        line,
                    });
                }
            }
            _ => {
                let op = OPERATORS
                    .iter()
                    .find(|op| {
                        op.chars()
                            .enumerate()
                            .all(|(k, oc)| chars.get(i + k) == Some(&oc))
                    })
                    .ok_or_else(|| {
                        ForwardParseError::new(line, format!("unexpected character '{}'", c))
                    })?;
                match *op {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => {
                        depth = depth.checked_sub(1).ok_or_else(|| {
                            ForwardParseError::new(line, format!("unmatched '{}'", op))
                        })?
                    }
                    _ => {}
                }
                tokens.push(Spanned {
                    token: Token::Op(*op),
                    line,
                });
                i += op.len();
            }
        }
    }

    if depth > 0 {
        return Err(ForwardParseError::new(line, "unclosed bracket at end of body"));
    }
    if !matches!(
        tokens.last(),
        None | Some(Spanned {
            token: Token::Newline,
            ..
        })
    ) {
        tokens.push(Spanned {
            token: Token::Newline,
            line,
        });
    }
    Ok(tokens)
}

/// Lex a string literal starting at the opening quote.
/// Returns (contents, index after the literal, newlines consumed).
fn lex_string(
    chars: &[char],
    start: usize,
    line: usize,
) -> Result<(String, usize, usize), ForwardParseError> {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut i = start + if triple { 3 } else { 1 };
    let mut text = String::new();
    let mut newlines = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            if let Some(next) = chars.get(i + 1) {
                if *next == '\n' {
                    newlines += 1;
                }
                text.push(c);
                text.push(*next);
                i += 2;
                continue;
            }
        }
        if c == quote {
            if !triple {
                return Ok((text, i + 1, newlines));
            }
            if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                return Ok((text, i + 3, newlines));
            }
        }
        if c == '\n' {
            if !triple {
                return Err(ForwardParseError::new(line, "unterminated string literal"));
            }
            newlines += 1;
        }
        text.push(c);
        i += 1;
    }

    Err(ForwardParseError::new(line, "unterminated string literal"))
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

struct Line {
    indent: usize,
    number: usize,
    tokens: Vec<Token>,
}

fn logical_lines(tokens: Vec<Spanned>) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current: Option<Line> = None;

    for spanned in tokens {
        match spanned.token {
            Token::Indent(indent) => {
                current = Some(Line {
                    indent,
                    number: spanned.line,
                    tokens: Vec::new(),
                })
            }
            Token::Newline => {
                if let Some(line) = current.take() {
                    if !line.tokens.is_empty() {
                        lines.push(line);
                    }
                }
            }
            token => {
                if let Some(line) = current.as_mut() {
                    line.tokens.push(token);
                }
            }
        }
    }
    lines
}

const BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "with", "try", "except", "finally", "def", "class",
    "match", "case",
];

fn parse_block(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Vec<Stmt>, ForwardParseError> {
    let mut statements = Vec::new();
    while *pos < lines.len() {
        let line = &lines[*pos];
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            return Err(ForwardParseError::new(line.number, "unexpected indent"));
        }
        *pos += 1;
        statements.extend(parse_line(line, lines, pos)?);
    }
    Ok(statements)
}

fn parse_line(line: &Line, lines: &[Line], pos: &mut usize) -> Result<Vec<Stmt>, ForwardParseError> {
    let mut tokens = line.tokens.as_slice();
    if matches!(tokens.first(), Some(Token::Name(n)) if n == "async") {
        tokens = &tokens[1..];
    }

    let keyword = match tokens.first() {
        Some(Token::Name(name)) if BLOCK_KEYWORDS.contains(&name.as_str()) => Some(name.clone()),
        _ => None,
    };

    let Some(keyword) = keyword else {
        return parse_simple_statements(tokens, line.number);
    };

    // `match` and `case` are soft keywords; only treat them as blocks when the
    // line ends in a block colon.
    let colon = block_colon(tokens).ok_or_else(|| {
        ForwardParseError::new(line.number, format!("expected ':' after '{}'", keyword))
    });
    let colon = match (colon, keyword.as_str()) {
        (Ok(colon), _) => colon,
        (Err(_), "match" | "case") => return parse_simple_statements(tokens, line.number),
        (Err(e), _) => return Err(e),
    };

    let header = match keyword.as_str() {
        "def" | "class" => None,
        _ if colon > 1 => {
            let mut parser = TokenParser::new(&tokens[1..colon], line.number);
            let expr = parser.parse_expr_list()?;
            parser.expect_end()?;
            Some(expr)
        }
        _ => None,
    };

    let inline = &tokens[colon + 1..];
    let body = if !inline.is_empty() {
        parse_simple_statements(inline, line.number)?
    } else {
        match lines.get(*pos) {
            Some(next) if next.indent > line.indent => parse_block(lines, pos, next.indent)?,
            _ => {
                return Err(ForwardParseError::new(
                    line.number,
                    format!("expected an indented block after '{}'", keyword),
                ))
            }
        }
    };

    Ok(vec![Stmt::Block {
        keyword,
        header,
        body,
    }])
}

/// Index of the first `:` at bracket depth zero.
fn block_colon(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0i32;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Op("(") | Token::Op("[") | Token::Op("{") => depth += 1,
            Token::Op(")") | Token::Op("]") | Token::Op("}") => depth -= 1,
            Token::Op(":") if depth == 0 => return Some(i),
            Token::Name(n) if n == "lambda" && depth == 0 => return None,
            _ => {}
        }
    }
    None
}

fn parse_simple_statements(tokens: &[Token], line: usize) -> Result<Vec<Stmt>, ForwardParseError> {
    let mut statements = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Op("(") | Token::Op("[") | Token::Op("{") => depth += 1,
            Token::Op(")") | Token::Op("]") | Token::Op("}") => depth -= 1,
            Token::Op(";") if depth == 0 => {
                if i > start {
                    statements.push(parse_simple(&tokens[start..i], line)?);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        statements.push(parse_simple(&tokens[start..], line)?);
    }
    Ok(statements)
}

const AUGMENTED_OPS: &[&str] = &[
    "+=", "-=", "*=", "/=", "//=", "%=", "**=", "&=", "|=", "^=", ">>=", "<<=", "@=",
];

fn parse_simple(tokens: &[Token], line: usize) -> Result<Stmt, ForwardParseError> {
    let mut parser = TokenParser::new(tokens, line);

    if let Some(Token::Name(keyword)) = parser.peek() {
        match keyword.as_str() {
            "return" => {
                parser.advance();
                if parser.at_end() {
                    return Ok(Stmt::Return(None));
                }
                let value = parser.parse_expr_list()?;
                parser.expect_end()?;
                return Ok(Stmt::Return(Some(value)));
            }
            "pass" | "break" | "continue" => return Ok(Stmt::Pass),
            "raise" | "del" | "assert" | "import" | "from" | "global" | "nonlocal" => {
                return Ok(Stmt::Other)
            }
            _ => {}
        }
    }

    let first = parser.parse_expr_list()?;
    match parser.peek() {
        None => Ok(Stmt::Expr(first)),
        Some(Token::Op("=")) => {
            let mut targets = vec![first];
            let mut value;
            loop {
                parser.advance();
                value = parser.parse_expr_list()?;
                if parser.peek() == Some(&Token::Op("=")) {
                    targets.push(value);
                } else {
                    break;
                }
            }
            parser.expect_end()?;
            Ok(Stmt::Assign { targets, value })
        }
        Some(Token::Op(":")) => {
            parser.advance();
            parser.parse_expr()?;
            if parser.peek() == Some(&Token::Op("=")) {
                parser.advance();
                let value = parser.parse_expr_list()?;
                parser.expect_end()?;
                Ok(Stmt::Assign {
                    targets: vec![first],
                    value,
                })
            } else {
                parser.expect_end()?;
                Ok(Stmt::Other)
            }
        }
        Some(Token::Op(op)) if AUGMENTED_OPS.contains(op) => {
            parser.advance();
            let value = parser.parse_expr_list()?;
            parser.expect_end()?;
            Ok(Stmt::Assign {
                targets: vec![first],
                value,
            })
        }
        Some(other) => Err(ForwardParseError::new(
            line,
            format!("unexpected token {:?}", other),
        )),
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

const BINARY_OPS: &[&str] = &[
    "+", "-", "*", "/", "//", "%", "**", "@", "==", "!=", "<", ">", "<=", ">=", "&", "|", "^",
    "<<", ">>", ":=",
];
const BINARY_KEYWORDS: &[&str] = &["and", "or", "in", "is", "if", "else", "for", "as"];
const UNARY_OPS: &[&str] = &["-", "+", "~", "*", "**"];
const LITERAL_KEYWORDS: &[&str] = &["True", "False", "None"];

struct TokenParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
}

impl<'a> TokenParser<'a> {
    fn new(tokens: &'a [Token], line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn error(&self, message: impl Into<String>) -> ForwardParseError {
        ForwardParseError::new(self.line, message)
    }

    fn expect_end(&self) -> Result<(), ForwardParseError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("unexpected trailing token {:?}", token))),
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ForwardParseError> {
        match self.advance() {
            Some(Token::Op(found)) if *found == op => Ok(()),
            other => Err(self.error(format!("expected '{}', found {:?}", op, other))),
        }
    }

    /// `a, b, c` becomes a collection; a single expression is returned as is.
    fn parse_expr_list(&mut self) -> Result<Expr, ForwardParseError> {
        let first = self.parse_expr()?;
        if self.peek() != Some(&Token::Op(",")) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.peek() == Some(&Token::Op(",")) {
            self.advance();
            if self.at_end() || matches!(self.peek(), Some(Token::Op("=")) | Some(Token::Op(":"))) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(Expr::Collection(items))
    }

    fn parse_expr(&mut self) -> Result<Expr, ForwardParseError> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Op(op)) if BINARY_OPS.contains(op) => {
                    self.advance();
                }
                Some(Token::Name(kw)) if BINARY_KEYWORDS.contains(&kw.as_str()) => {
                    self.advance();
                }
                Some(Token::Name(kw)) if kw == "not" => {
                    self.advance();
                    if matches!(self.peek(), Some(Token::Name(n)) if n == "in") {
                        self.advance();
                    }
                }
                _ => break,
            }
            let right = self.parse_unary()?;
            left = Expr::BinOp(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ForwardParseError> {
        match self.peek() {
            Some(Token::Name(kw)) if kw == "await" => {
                self.advance();
                Ok(Expr::Await(Box::new(self.parse_unary()?)))
            }
            Some(Token::Name(kw)) if kw == "not" || kw == "yield" => {
                self.advance();
                if matches!(self.peek(), Some(Token::Name(n)) if n == "from") {
                    self.advance();
                }
                if self.at_end() || matches!(self.peek(), Some(Token::Op(")"))) {
                    return Ok(Expr::Opaque);
                }
                Ok(Expr::Unary(Box::new(self.parse_unary()?)))
            }
            Some(Token::Name(kw)) if kw == "lambda" => {
                self.advance();
                while let Some(token) = self.advance() {
                    if *token == Token::Op(":") {
                        self.parse_expr()?;
                        return Ok(Expr::Opaque);
                    }
                }
                Err(self.error("lambda without ':'"))
            }
            Some(Token::Op(op)) if UNARY_OPS.contains(op) => {
                self.advance();
                Ok(Expr::Unary(Box::new(self.parse_unary()?)))
            }
            _ => {
                let atom = self.parse_atom()?;
                self.parse_postfix(atom)
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, ForwardParseError> {
        match self.advance() {
            Some(Token::Name(name)) if LITERAL_KEYWORDS.contains(&name.as_str()) => {
                Ok(Expr::Literal(name.clone()))
            }
            Some(Token::Name(name)) => Ok(Expr::Name(name.clone())),
            Some(Token::Number(n)) => Ok(Expr::Literal(n.clone())),
            Some(Token::Str(s)) => {
                let mut text = s.clone();
                while let Some(Token::Str(next)) = self.peek() {
                    text.push_str(next);
                    self.advance();
                }
                Ok(Expr::Literal(text))
            }
            Some(Token::Op("...")) => Ok(Expr::Literal("...".to_string())),
            Some(Token::Op("(")) => {
                let (mut items, trailing_comma) = self.parse_items(")")?;
                if items.len() == 1 && !trailing_comma {
                    Ok(items.remove(0))
                } else {
                    Ok(Expr::Collection(items))
                }
            }
            Some(Token::Op("[")) => Ok(Expr::Collection(self.parse_items("]")?.0)),
            Some(Token::Op("{")) => Ok(Expr::Collection(self.parse_items("}")?.0)),
            other => Err(self.error(format!("unexpected token {:?}", other))),
        }
    }

    /// Items up to the closing bracket. `:` separates like `,` so dict
    /// literals and slices flatten into the item list.
    fn parse_items(&mut self, close: &'static str) -> Result<(Vec<Expr>, bool), ForwardParseError> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            match self.peek() {
                None => return Err(self.error(format!("expected '{}'", close))),
                Some(Token::Op(op)) if *op == close => {
                    self.advance();
                    return Ok((items, trailing_comma));
                }
                Some(Token::Op(",")) => {
                    self.advance();
                    trailing_comma = true;
                }
                Some(Token::Op(":")) => {
                    self.advance();
                }
                _ => {
                    items.push(self.parse_expr()?);
                    trailing_comma = false;
                }
            }
        }
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ForwardParseError> {
        loop {
            match self.peek() {
                Some(Token::Op(".")) => {
                    self.advance();
                    match self.advance() {
                        Some(Token::Name(attr)) => {
                            expr = Expr::Attribute {
                                value: Box::new(expr),
                                attr: attr.clone(),
                            }
                        }
                        other => {
                            return Err(self.error(format!(
                                "expected attribute name, found {:?}",
                                other
                            )))
                        }
                    }
                }
                Some(Token::Op("(")) => {
                    self.advance();
                    let args = self.parse_args()?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                    };
                }
                Some(Token::Op("[")) => {
                    self.advance();
                    let (items, _) = self.parse_items("]")?;
                    expr = Expr::Subscript {
                        value: Box::new(expr),
                        index: Box::new(Expr::Collection(items)),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, ForwardParseError> {
        let mut args = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("expected ')'")),
                Some(Token::Op(")")) => {
                    self.advance();
                    return Ok(args);
                }
                Some(Token::Op(",")) => {
                    self.advance();
                }
                Some(Token::Op("*")) => {
                    self.advance();
                    args.push(Arg::Star(self.parse_expr()?));
                }
                Some(Token::Op("**")) => {
                    self.advance();
                    args.push(Arg::DoubleStar(self.parse_expr()?));
                }
                Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::Op("=")) => {
                    let name = name.clone();
                    self.advance();
                    self.expect_op("=")?;
                    args.push(Arg::Keyword(name, self.parse_expr()?));
                }
                _ => args.push(Arg::Positional(self.parse_expr()?)),
            }
        }
    }
}
