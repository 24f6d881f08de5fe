//! DOT interchange format.
//!
//! [`write_dot`] emits a canonical `digraph`: nodes then edges, each sorted by
//! id, every id and value double-quoted. [`parse_dot`] accepts the subset of
//! DOT that graph tooling commonly produces: `graph`/`digraph`, node and edge
//! statements (including chains), `node`/`edge`/`graph` default attribute
//! statements, and comments. Subgraphs and ports are rejected.
//!
//! Reserved attributes: `label` and `pos` on nodes; `id`, `label`, and `dir`
//! on edges. Every other attribute keeps its JSON type: quoted values are
//! strings, bare numerals and `true`/`false`/`null` are scalars, and
//! HTML-style `<...>` values holding JSON are decoded as JSON.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::Value;

use crate::error::DotError;
use crate::types::{Edge, Graph, Node, Position};

// ── Writer ─────────────────────────────────────────────────────────

pub fn write_dot(graph: &Graph) -> String {
    let mut out = String::from("digraph {\n");
    for node in graph.nodes() {
        let mut attrs = vec![("label".to_string(), quote(&node.label))];
        if let Some(pos) = node.position {
            attrs.push(("pos".to_string(), quote(&format!("{},{}", pos.x, pos.y))));
        }
        attrs.extend(encode_attributes(&node.attributes));
        let _ = writeln!(out, "  {} [{}];", quote(&node.id), attr_list(&attrs));
    }
    for edge in graph.edges() {
        let mut attrs = vec![
            ("id".to_string(), quote(&edge.id)),
            ("label".to_string(), quote(&edge.label)),
        ];
        if !edge.directed {
            attrs.push(("dir".to_string(), quote("none")));
        }
        attrs.extend(encode_attributes(&edge.attributes));
        let _ = writeln!(
            out,
            "  {} -> {} [{}];",
            quote(&edge.from),
            quote(&edge.to),
            attr_list(&attrs)
        );
    }
    out.push_str("}\n");
    out
}

fn encode_attributes(
    attributes: &BTreeMap<String, Value>,
) -> impl Iterator<Item = (String, String)> + '_ {
    attributes.iter().map(|(k, v)| (k.clone(), encode_value(v)))
}

/// Strings are quoted. Booleans, null, and plain decimals are written bare.
/// Anything else is JSON inside an HTML-style `<...>` id, with angle
/// brackets escaped so the delimiters stay balanced.
fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Bool(_) | Value::Null => value.to_string(),
        Value::Number(n) => {
            let text = n.to_string();
            if is_numeral(&text) { text } else { embed_json(&text) }
        }
        Value::Array(_) | Value::Object(_) => embed_json(&value.to_string()),
    }
}

fn embed_json(json: &str) -> String {
    format!("<{}>", json.replace('<', "\\u003c").replace('>', "\\u003e"))
}

fn is_numeral(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|&c| c == '.').count() <= 1
}

fn attr_list(attrs: &[(String, String)]) -> String {
    attrs
        .iter()
        .map(|(k, v)| format!("{}={v}", quote(k)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ── Lexer ──────────────────────────────────────────────────────────

/// How an id was spelled in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdKind {
    Bare,
    Quoted,
    Html,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Id { text: String, kind: IdKind },
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Equals,
    Colon,
    EdgeOp { directed: bool },
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
    column: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> DotError {
        DotError::Syntax {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, DotError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let (line, column) = (self.line, self.column);
            let Some(c) = self.peek(0) else {
                tokens.push(Token {
                    tok: Tok::Eof,
                    line,
                    column,
                });
                return Ok(tokens);
            };
            let tok = match c {
                '{' | '}' | '[' | ']' | ';' | ',' | '=' | ':' => {
                    self.bump();
                    match c {
                        '{' => Tok::LBrace,
                        '}' => Tok::RBrace,
                        '[' => Tok::LBracket,
                        ']' => Tok::RBracket,
                        ';' => Tok::Semi,
                        ',' => Tok::Comma,
                        '=' => Tok::Equals,
                        _ => Tok::Colon,
                    }
                }
                '-' if self.peek(1) == Some('>') => {
                    self.bump();
                    self.bump();
                    Tok::EdgeOp { directed: true }
                }
                '-' if self.peek(1) == Some('-') => {
                    self.bump();
                    self.bump();
                    Tok::EdgeOp { directed: false }
                }
                '"' => self.quoted()?,
                '<' => self.html()?,
                c if c == '-' || c == '.' || c.is_ascii_digit() => self.numeral(),
                c if c == '_' || c.is_alphabetic() || !c.is_ascii() => self.identifier(),
                other => return Err(self.error(format!("unexpected character {other:?}"))),
            };
            tokens.push(Token { tok, line, column });
        }
    }

    fn skip_trivia(&mut self) -> Result<(), DotError> {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => self.skip_line(),
                (Some('#'), _) if self.column == 1 => self.skip_line(),
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(0), self.peek(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => return Err(self.error("unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn quoted(&mut self) -> Result<Tok, DotError> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('"') => text.push('"'),
                    Some('\\') => text.push('\\'),
                    Some('n') => text.push('\n'),
                    Some('\n') => {}
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
        Ok(Tok::Id {
            text,
            kind: IdKind::Quoted,
        })
    }

    fn html(&mut self) -> Result<Tok, DotError> {
        self.bump();
        let mut depth = 1usize;
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('<') => {
                    depth += 1;
                    text.push('<');
                }
                Some('>') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    text.push('>');
                }
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated HTML string")),
            }
        }
        Ok(Tok::Id {
            text,
            kind: IdKind::Html,
        })
    }

    fn numeral(&mut self) -> Tok {
        let mut text = String::new();
        if self.peek(0) == Some('-') {
            text.push('-');
            self.bump();
        }
        while let Some(c) = self.peek(0) {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Tok::Id {
            text,
            kind: IdKind::Bare,
        }
    }

    fn identifier(&mut self) -> Tok {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if c == '_' || c.is_alphanumeric() || !c.is_ascii() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Tok::Id {
            text,
            kind: IdKind::Bare,
        }
    }
}

// ── Parser ─────────────────────────────────────────────────────────

/// An attribute value as written, before it is given a type.
#[derive(Debug, Clone)]
struct RawValue {
    text: String,
    kind: IdKind,
}

impl RawValue {
    /// Quoted ids are strings. Bare ids that read as JSON scalars and
    /// HTML-style ids holding JSON keep their JSON type.
    fn into_value(self) -> Value {
        let typed = match self.kind {
            IdKind::Quoted => None,
            IdKind::Bare => serde_json::from_str::<Value>(&self.text)
                .ok()
                .filter(|v| matches!(v, Value::Number(_) | Value::Bool(_) | Value::Null)),
            IdKind::Html => serde_json::from_str::<Value>(&self.text)
                .ok()
                .filter(|v| !v.is_string()),
        };
        typed.unwrap_or(Value::String(self.text))
    }
}

type Attrs = Vec<(String, RawValue)>;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
    node_defaults: Attrs,
    edge_defaults: Attrs,
}

/// Parse DOT text into a [`Graph`].
pub fn parse_dot(input: &str) -> Result<Graph, DotError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        nodes: BTreeMap::new(),
        edges: Vec::new(),
        node_defaults: Vec::new(),
        edge_defaults: Vec::new(),
    };
    parser.graph()?;
    Ok(Graph::from_parts(parser.nodes.into_values(), parser.edges)?)
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].tok
    }

    fn next(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> DotError {
        let token = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        DotError::Syntax {
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    fn keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Id { text, kind: IdKind::Bare } if text.eq_ignore_ascii_case(word))
    }

    fn expect(&mut self, expected: &Tok, what: &str) -> Result<(), DotError> {
        if self.peek() == expected {
            self.next();
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn id(&mut self) -> Result<String, DotError> {
        self.raw().map(|raw| raw.text)
    }

    fn raw(&mut self) -> Result<RawValue, DotError> {
        match self.next() {
            Tok::Id { text, kind } => Ok(RawValue { text, kind }),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error("expected identifier"))
            }
        }
    }

    fn graph(&mut self) -> Result<(), DotError> {
        if self.keyword("strict") {
            self.next();
        }
        if self.keyword("digraph") || self.keyword("graph") {
            self.next();
        } else {
            return Err(self.error("expected `graph` or `digraph`"));
        }
        if matches!(self.peek(), Tok::Id { .. }) {
            self.next();
        }
        self.expect(&Tok::LBrace, "`{`")?;
        while *self.peek() != Tok::RBrace {
            if *self.peek() == Tok::Eof {
                return Err(self.error("unexpected end of input, expected `}`"));
            }
            self.statement()?;
            if *self.peek() == Tok::Semi {
                self.next();
            }
        }
        self.next();
        if *self.peek() != Tok::Eof {
            return Err(self.error("trailing content after graph"));
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<(), DotError> {
        if self.keyword("subgraph") || *self.peek() == Tok::LBrace {
            return Err(DotError::Unsupported("subgraphs".into()));
        }
        for (word, target) in [("graph", 0), ("node", 1), ("edge", 2)] {
            if self.keyword(word) {
                self.next();
                let attrs = self.attr_lists()?;
                match target {
                    1 => self.node_defaults.extend(attrs),
                    2 => self.edge_defaults.extend(attrs),
                    _ => {}
                }
                return Ok(());
            }
        }

        let first = self.id()?;
        match self.peek().clone() {
            Tok::Equals => {
                // Graph attribute assignment; carries nothing we keep.
                self.next();
                self.id()?;
                Ok(())
            }
            Tok::Colon => Err(DotError::Unsupported("node ports".into())),
            Tok::EdgeOp { .. } => self.edge_statement(first),
            _ => {
                let attrs = self.attr_lists()?;
                self.declare_node(&first, &attrs);
                Ok(())
            }
        }
    }

    fn edge_statement(&mut self, first: String) -> Result<(), DotError> {
        let mut chain = vec![(first, true)];
        while let Tok::EdgeOp { directed } = *self.peek() {
            self.next();
            let target = self.id()?;
            if *self.peek() == Tok::Colon {
                return Err(DotError::Unsupported("node ports".into()));
            }
            chain.push((target, directed));
        }
        let attrs = self.attr_lists()?;

        for (id, _) in &chain {
            if !self.nodes.contains_key(id) {
                self.declare_node(id, &[]);
            }
        }

        let mut merged = self.edge_defaults.clone();
        merged.extend(attrs);
        for pair in chain.windows(2) {
            let (from, _) = &pair[0];
            let (to, directed) = &pair[1];
            let mut edge = Edge::new("", from.clone(), to.clone(), "");
            edge.directed = *directed;
            for (key, value) in &merged {
                match key.as_str() {
                    "id" => edge.id.clone_from(&value.text),
                    "label" => edge.label.clone_from(&value.text),
                    "dir" if value.text == "none" => edge.directed = false,
                    "dir" if value.text == "forward" => edge.directed = true,
                    _ => {
                        edge.attributes.insert(key.clone(), value.clone().into_value());
                    }
                }
            }
            self.edges.push(edge);
        }
        Ok(())
    }

    fn declare_node(&mut self, id: &str, attrs: &[(String, RawValue)]) {
        let defaults = if self.nodes.contains_key(id) {
            Vec::new()
        } else {
            self.node_defaults.clone()
        };
        let node = self
            .nodes
            .entry(id.to_string())
            .or_insert_with(|| Node::new(id, id));
        for (key, value) in defaults.iter().chain(attrs) {
            match key.as_str() {
                "label" => node.label.clone_from(&value.text),
                "pos" => match parse_pos(&value.text) {
                    Some(pos) => node.position = Some(pos),
                    None => {
                        node.attributes.insert(key.clone(), value.clone().into_value());
                    }
                },
                _ => {
                    node.attributes.insert(key.clone(), value.clone().into_value());
                }
            }
        }
    }

    fn attr_lists(&mut self) -> Result<Attrs, DotError> {
        let mut attrs = Vec::new();
        while *self.peek() == Tok::LBracket {
            self.next();
            while *self.peek() != Tok::RBracket {
                let key = self.id()?;
                self.expect(&Tok::Equals, "`=`")?;
                let value = self.raw()?;
                attrs.push((key, value));
                if matches!(self.peek(), Tok::Comma | Tok::Semi) {
                    self.next();
                }
            }
            self.next();
        }
        Ok(attrs)
    }
}

fn parse_pos(text: &str) -> Option<Position> {
    let (x, y) = text.trim_end_matches('!').split_once(',')?;
    Some(Position {
        x: x.trim().parse().ok()?,
        y: y.trim().parse().ok()?,
    })
}
