//! The authored messages format: JSON with comments.
//!
//! The value grammar is JSON restricted to objects, arrays and string
//! leaves. `//` line comments and `/* */` block comments immediately before
//! an object member or array element attach to that member's path; they are
//! kept out-of-band in a side map so the value tree stays plain. One
//! optional block comment before the root object is the header block, one
//! `name: text` line per top-level section.

use std::{
    collections::BTreeMap,
    io::{BufRead, Write},
};

use crate::{
    comment::{CommentStyle, RawComment, parse_header},
    error::Error,
    message::Message,
    traits::Parser,
    types::{KeyPath, Node, Object},
};

/// A parsed authored messages file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceFile {
    /// Top-level section name -> description, from the header block.
    pub header: BTreeMap<String, String>,

    /// The message tree.
    pub root: Object,

    /// Comments attached to entries, keyed by the entry's path.
    pub comments: BTreeMap<KeyPath, RawComment>,
}

impl Parser for SourceFile {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        parse_source(&text)
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut out = String::new();
        if !self.header.is_empty() {
            out.push_str("/*\n");
            for (name, text) in &self.header {
                out.push_str(name);
                out.push_str(": ");
                out.push_str(text);
                out.push('\n');
            }
            out.push_str("*/\n");
        }
        write_object(&self.root, &KeyPath::root(), &self.comments, 0, &mut out)?;
        out.push('\n');
        writer.write_all(out.as_bytes())?;
        Ok(())
    }
}

fn parse_source(text: &str) -> Result<SourceFile, Error> {
    let mut scanner = Scanner::new(text);

    let leading = scanner.collect_comments()?;
    let header = match leading.fragments() {
        [] => BTreeMap::new(),
        [(CommentStyle::Block, text)] => parse_header(text)?,
        _ => {
            return Err(scanner.err("only a single block comment may precede the root object"));
        }
    };

    scanner.skip_whitespace();
    scanner.expect('{')?;
    let mut comments = BTreeMap::new();
    let root = scanner.parse_object(&KeyPath::root(), &mut comments)?;

    let trailing = scanner.collect_comments()?;
    if !trailing.is_empty() {
        return Err(scanner.err("comment does not precede an entry"));
    }
    scanner.skip_whitespace();
    if !scanner.at_end() {
        return Err(scanner.err("unexpected content after the root object"));
    }

    Ok(SourceFile {
        header,
        root,
        comments,
    })
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Scanner {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn err(&self, message: impl std::fmt::Display) -> Error {
        Error::syntax(format!("line {}: {}", self.line, message))
    }

    fn expect(&mut self, expected: char) -> Result<(), Error> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.err(format!("expected `{}`, found `{}`", expected, c))),
            None => Err(self.err(format!("expected `{}`, found end of input", expected))),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Skips whitespace and accumulates any comment fragments found.
    fn collect_comments(&mut self) -> Result<RawComment, Error> {
        let mut raw = RawComment::new();
        loop {
            self.skip_whitespace();
            match (self.peek(), self.peek_at(1)) {
                (Some('/'), Some('/')) => {
                    self.bump();
                    self.bump();
                    let mut text = String::new();
                    while self.peek().is_some_and(|c| c != '\n') {
                        text.push(self.bump().unwrap_or_default());
                    }
                    raw.push(CommentStyle::Line, text);
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    let mut text = String::new();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => text.push(self.bump().unwrap_or_default()),
                            (None, _) => return Err(self.err("unterminated block comment")),
                        }
                    }
                    raw.push(CommentStyle::Block, text);
                }
                _ => return Ok(raw),
            }
        }
    }

    /// Parses the members of an object whose `{` has been consumed.
    fn parse_object(
        &mut self,
        path: &KeyPath,
        comments: &mut BTreeMap<KeyPath, RawComment>,
    ) -> Result<Object, Error> {
        let mut object = Object::new();
        loop {
            let pending = self.collect_comments()?;
            self.skip_whitespace();
            match self.peek() {
                Some('}') => {
                    if !pending.is_empty() {
                        return Err(self.err("comment does not precede an entry"));
                    }
                    self.bump();
                    return Ok(object);
                }
                Some('"') => {
                    let key = self.parse_string()?;
                    if key.is_empty()
                        || !key.chars().all(|c| c.is_alphanumeric() || c == '_')
                    {
                        return Err(self.err(format!("invalid key `{}`", key)));
                    }
                    if object.contains_key(&key) {
                        return Err(self.err(format!("duplicate key `{}`", key)));
                    }
                    let child_path = path.join(&key);
                    if !pending.is_empty() {
                        comments.insert(child_path.clone(), pending);
                    }

                    self.skip_whitespace();
                    self.expect(':')?;
                    self.skip_whitespace();
                    let value = self.parse_value(&child_path, comments)?;
                    object.insert(key, value);

                    self.skip_whitespace();
                    match self.peek() {
                        Some(',') => {
                            self.bump();
                        }
                        Some('}') | Some('/') => {}
                        _ => return Err(self.err("expected `,` or `}` after a value")),
                    }
                }
                Some(c) => return Err(self.err(format!("expected a key, found `{}`", c))),
                None => return Err(self.err("unterminated object")),
            }
        }
    }

    /// Parses the elements of an array whose `[` has been consumed.
    fn parse_array(
        &mut self,
        path: &KeyPath,
        comments: &mut BTreeMap<KeyPath, RawComment>,
    ) -> Result<Vec<Node>, Error> {
        let mut items = Vec::new();
        loop {
            let pending = self.collect_comments()?;
            self.skip_whitespace();
            match self.peek() {
                Some(']') => {
                    if !pending.is_empty() {
                        return Err(self.err("comment does not precede an entry"));
                    }
                    self.bump();
                    return Ok(items);
                }
                Some(_) => {
                    let child_path = path.join_index(items.len());
                    if !pending.is_empty() {
                        comments.insert(child_path.clone(), pending);
                    }
                    items.push(self.parse_value(&child_path, comments)?);

                    self.skip_whitespace();
                    match self.peek() {
                        Some(',') => {
                            self.bump();
                        }
                        Some(']') | Some('/') => {}
                        _ => return Err(self.err("expected `,` or `]` after a value")),
                    }
                }
                None => return Err(self.err("unterminated array")),
            }
        }
    }

    fn parse_value(
        &mut self,
        path: &KeyPath,
        comments: &mut BTreeMap<KeyPath, RawComment>,
    ) -> Result<Node, Error> {
        match self.peek() {
            Some('{') => {
                self.bump();
                Ok(Node::Object(self.parse_object(path, comments)?))
            }
            Some('[') => {
                self.bump();
                Ok(Node::Array(self.parse_array(path, comments)?))
            }
            Some('"') => {
                let line = self.line;
                let text = self.parse_string()?;
                let message = Message::from_source_text(&text)
                    .map_err(|e| e.at(path))
                    .map_err(|e| Error::syntax(format!("line {}: {}", line, e)))?;
                Ok(Node::Leaf(message))
            }
            Some(c) => Err(self.err(format!(
                "expected an object, array or string, found `{}`",
                c
            ))),
            None => Err(self.err("expected a value, found end of input")),
        }
    }

    /// Parses a JSON string literal, opening quote included.
    fn parse_string(&mut self) -> Result<String, Error> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => out.push(self.parse_escape()?),
                Some('\n') | None => return Err(self.err("unterminated string")),
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, Error> {
        match self.bump() {
            Some('"') => Ok('"'),
            Some('\\') => Ok('\\'),
            Some('/') => Ok('/'),
            Some('b') => Ok('\u{0008}'),
            Some('f') => Ok('\u{000c}'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('u') => {
                let unit = self.parse_hex_unit()?;
                if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate: a low surrogate escape must follow.
                    if self.bump() != Some('\\') || self.bump() != Some('u') {
                        return Err(self.err("unpaired surrogate escape"));
                    }
                    let low = self.parse_hex_unit()?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(self.err("unpaired surrogate escape"));
                    }
                    let value = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(value).ok_or_else(|| self.err("invalid unicode escape"))
                } else {
                    char::from_u32(unit).ok_or_else(|| self.err("invalid unicode escape"))
                }
            }
            Some(c) => Err(self.err(format!("invalid escape `\\{}`", c))),
            None => Err(self.err("unterminated string")),
        }
    }

    fn parse_hex_unit(&mut self) -> Result<u32, Error> {
        let mut value = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.err("invalid unicode escape"))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }
}

fn write_object(
    object: &Object,
    path: &KeyPath,
    comments: &BTreeMap<KeyPath, RawComment>,
    indent: usize,
    out: &mut String,
) -> Result<(), Error> {
    if object.is_empty() {
        out.push_str("{}");
        return Ok(());
    }
    out.push_str("{\n");
    let last = object.len() - 1;
    for (index, (key, node)) in object.iter().enumerate() {
        let child_path = path.join(key);
        write_comment(comments.get(&child_path), indent + 1, out);
        push_indent(indent + 1, out);
        push_json_string(key, out);
        out.push_str(": ");
        write_node(node, &child_path, comments, indent + 1, out)?;
        if index < last {
            out.push(',');
        }
        out.push('\n');
    }
    push_indent(indent, out);
    out.push('}');
    Ok(())
}

fn write_node(
    node: &Node,
    path: &KeyPath,
    comments: &BTreeMap<KeyPath, RawComment>,
    indent: usize,
    out: &mut String,
) -> Result<(), Error> {
    match node {
        Node::Leaf(message) => {
            let text = message.to_source_text().map_err(|e| e.at(path))?;
            push_json_string(&text, out);
        }
        Node::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return Ok(());
            }
            out.push_str("[\n");
            let last = items.len() - 1;
            for (index, item) in items.iter().enumerate() {
                let child_path = path.join_index(index);
                write_comment(comments.get(&child_path), indent + 1, out);
                push_indent(indent + 1, out);
                write_node(item, &child_path, comments, indent + 1, out)?;
                if index < last {
                    out.push(',');
                }
                out.push('\n');
            }
            push_indent(indent, out);
            out.push(']');
        }
        Node::Object(object) => write_object(object, path, comments, indent, out)?,
    }
    Ok(())
}

fn write_comment(raw: Option<&RawComment>, indent: usize, out: &mut String) {
    let Some(raw) = raw else { return };
    for (style, text) in raw.fragments() {
        push_indent(indent, out);
        match style {
            CommentStyle::Line => {
                out.push_str("//");
                out.push_str(text);
            }
            CommentStyle::Block => {
                out.push_str("/*");
                out.push_str(text);
                out.push_str("*/");
            }
        }
        out.push('\n');
    }
}

fn push_indent(indent: usize, out: &mut String) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}

fn push_json_string(text: &str, out: &mut String) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
