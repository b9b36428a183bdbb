//! PHP tokenizer
//!
//! Produces a flat token stream over the whole file, inline HTML included.
//! Comments and whitespace are dropped; every token keeps its byte span so
//! the transformer can rewrite the original text in place.

use super::ast::Span;

/// Cast operators `(int)`, `(string)`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
    Unset,
}

/// One piece of an interpolated string as seen by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum RawPart {
    /// Literal text, escapes already decoded
    Text(String),
    /// `$name` (also `$name[...]` / `$name->prop`, which only read `$name`)
    Var { name: String, span: Span },
    /// `{$ expr }` or `${ expr }`: source range of the embedded expression
    Expr { span: Span, dynamic_name: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    InlineHtml(String),
    OpenTag,
    OpenTagWithEcho,
    CloseTag,
    /// `$name`, stored without the dollar
    Variable(String),
    /// Identifier or qualified name (`foo`, `Foo\Bar`, `\strlen`)
    Name(String),
    Int(String),
    Float(String),
    /// String without interpolation, value decoded
    ConstString(String),
    /// Double-quoted string or heredoc with interpolation
    Template(Vec<RawPart>),
    /// Backtick shell command
    ShellExec(Vec<RawPart>),
    Cast(CastKind),
    Sym(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

const SYMBOLS_3: &[&str] = &[
    "...", "<=>", "===", "!==", "<<=", ">>=", "**=", "??=", "?->",
];
const SYMBOLS_2: &[&str] = &[
    "++", "--", "->", "=>", "::", "==", "!=", "<>", "<=", ">=", "&&", "||", "??", "+=", "-=",
    "*=", "/=", ".=", "%=", "&=", "|=", "^=", "<<", ">>", "**", "#[",
];
const SYMBOLS_1: &[&str] = &[
    "+", "-", "*", "/", "%", "=", "<", ">", "!", ".", "(", ")", "[", "]", "{", "}", ",", ";",
    "?", ":", "&", "|", "^", "~", "@", "$", "\\",
];

/// Tokenize a whole PHP file
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(src, 0).run()
}

/// Tokenize an expression embedded in a string (`{$a->b}`), starting in PHP mode.
///
/// Spans stay relative to the enclosing file.
pub fn tokenize_embedded(src: &str, span: Span) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(&src[..span.end], span.start);
    lexer.lex_php()?;
    lexer.tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(span.end, span.end),
    });
    Ok(lexer.tokens)
}

/// 1-based line and column of a byte offset
pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(src.len());
    let before = &src.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    (line, offset - line_start + 1)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos,
            tokens: Vec::new(),
        }
    }

    fn error<T>(&self, message: impl Into<String>, offset: usize) -> Result<T, LexError> {
        Err(LexError {
            message: message.into(),
            offset,
        })
    }

    fn at(&self, index: usize) -> u8 {
        self.bytes.get(index).copied().unwrap_or(0)
    }

    fn peek(&self, ahead: usize) -> u8 {
        self.at(self.pos + ahead)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn starts_with_ci(&self, s: &str) -> bool {
        let end = self.pos + s.len();
        end <= self.bytes.len() && self.bytes[self.pos..end].eq_ignore_ascii_case(s.as_bytes())
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, self.pos),
        });
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while self.pos < self.bytes.len() {
            self.lex_inline_html();
            if self.pos >= self.bytes.len() {
                break;
            }
            self.lex_php()?;
        }
        let end = self.bytes.len();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(end, end),
        });
        Ok(self.tokens)
    }

    /// Consume HTML up to and including the next open tag
    fn lex_inline_html(&mut self) {
        let start = self.pos;
        let mut tag = None;
        while self.pos < self.bytes.len() {
            if self.peek(0) == b'<' && self.peek(1) == b'?' {
                if self.starts_with("<?=") {
                    tag = Some(TokenKind::OpenTagWithEcho);
                    break;
                }
                let after = self.pos + 5;
                if self.starts_with_ci("<?php")
                    && (after == self.bytes.len() || self.at(after).is_ascii_whitespace())
                {
                    tag = Some(TokenKind::OpenTag);
                    break;
                }
            }
            self.pos += 1;
        }
        if self.pos > start {
            let text = self.src[start..self.pos].to_string();
            self.push(TokenKind::InlineHtml(text), start);
        }
        let Some(tag) = tag else { return };
        let tag_start = self.pos;
        if tag == TokenKind::OpenTagWithEcho {
            self.pos += 3;
        } else {
            self.pos += 5;
            // The open tag owns exactly one following newline or blank
            if self.peek(0) == b'\r' && self.peek(1) == b'\n' {
                self.pos += 2;
            } else if self.pos < self.bytes.len() {
                self.pos += 1;
            }
        }
        self.push(tag, tag_start);
    }

    /// Lex PHP code until a close tag or end of input
    fn lex_php(&mut self) -> Result<(), LexError> {
        loop {
            self.skip_trivia()?;
            if self.pos >= self.bytes.len() {
                return Ok(());
            }
            if self.starts_with("?>") {
                let start = self.pos;
                self.pos += 2;
                if self.peek(0) == b'\n' {
                    self.pos += 1;
                } else if self.peek(0) == b'\r' && self.peek(1) == b'\n' {
                    self.pos += 2;
                }
                self.push(TokenKind::CloseTag, start);
                return Ok(());
            }
            self.lex_token()?;
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        while self.pos < self.bytes.len() {
            let b = self.peek(0);
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if (b == b'#' && self.peek(1) != b'[') || (b == b'/' && self.peek(1) == b'/') {
                // Line comments stop before `?>`
                while self.pos < self.bytes.len()
                    && self.peek(0) != b'\n'
                    && !self.starts_with("?>")
                {
                    self.pos += 1;
                }
            } else if b == b'/' && self.peek(1) == b'*' {
                let start = self.pos;
                match self.src[self.pos + 2..].find("*/") {
                    Some(end) => self.pos += 2 + end + 2,
                    None => return self.error("unterminated comment", start),
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn lex_token(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let b = self.peek(0);

        if b == b'$' && is_ident_start(self.peek(1)) {
            self.pos += 1;
            let name = self.read_ident();
            self.push(TokenKind::Variable(name), start);
            return Ok(());
        }
        if is_ident_start(b) || (b == b'\\' && is_ident_start(self.peek(1))) {
            let name = self.read_name();
            let halt = name.eq_ignore_ascii_case("__halt_compiler");
            self.push(TokenKind::Name(name), start);
            if halt {
                return self.lex_halt_compiler_tail();
            }
            return Ok(());
        }
        if b.is_ascii_digit() || (b == b'.' && self.peek(1).is_ascii_digit()) {
            self.lex_number();
            return Ok(());
        }
        match b {
            b'\'' => return self.lex_single_quoted(),
            b'"' => return self.lex_double_quoted(),
            b'`' => return self.lex_backtick(),
            _ => {}
        }
        if self.starts_with("<<<") {
            return self.lex_heredoc();
        }
        if b == b'(' {
            if let Some((kind, len)) = self.try_cast() {
                self.pos += len;
                self.push(TokenKind::Cast(kind), start);
                return Ok(());
            }
        }
        for table in [SYMBOLS_3, SYMBOLS_2, SYMBOLS_1] {
            if let Some(sym) = table.iter().find(|s| self.starts_with(s)) {
                self.pos += sym.len();
                self.push(TokenKind::Sym(sym), start);
                return Ok(());
            }
        }
        let ch = self.src[self.pos..].chars().next().unwrap_or('?');
        self.error(format!("unexpected character `{}`", ch), start)
    }

    /// `__halt_compiler();` ends the token stream: the rest is raw data
    fn lex_halt_compiler_tail(&mut self) -> Result<(), LexError> {
        for sym in ["(", ")"] {
            self.skip_trivia()?;
            if !self.starts_with(sym) {
                return self.error("expected `();` after __halt_compiler", self.pos);
            }
            let start = self.pos;
            self.pos += 1;
            self.push(TokenKind::Sym(sym), start);
        }
        self.skip_trivia()?;
        let start = self.pos;
        if self.starts_with(";") {
            self.pos += 1;
            self.push(TokenKind::Sym(";"), start);
        } else if self.starts_with("?>") {
            self.pos += 2;
            self.push(TokenKind::CloseTag, start);
        } else {
            return self.error("expected `;` after __halt_compiler()", start);
        }
        self.pos = self.bytes.len();
        Ok(())
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_ident_char(self.peek(0)) {
            self.pos += 1;
        }
        self.src[start..self.pos].to_string()
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        if self.peek(0) == b'\\' {
            self.pos += 1;
        }
        loop {
            while self.pos < self.bytes.len() && is_ident_char(self.peek(0)) {
                self.pos += 1;
            }
            if self.peek(0) == b'\\' && is_ident_start(self.peek(1)) {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        let radix_prefix = self.peek(0) == b'0'
            && matches!(self.peek(1), b'x' | b'X' | b'b' | b'B' | b'o' | b'O');
        if radix_prefix {
            self.pos += 2;
            while self.peek(0).is_ascii_hexdigit() || self.peek(0) == b'_' {
                self.pos += 1;
            }
            let text = self.src[start..self.pos].to_string();
            self.push(TokenKind::Int(text), start);
            return;
        }
        let mut is_float = false;
        self.eat_digits();
        if self.peek(0) == b'.' && self.peek(1).is_ascii_digit() {
            is_float = true;
            self.pos += 1;
            self.eat_digits();
        }
        if matches!(self.peek(0), b'e' | b'E') {
            let sign = matches!(self.peek(1), b'+' | b'-') as usize;
            if self.peek(1 + sign).is_ascii_digit() {
                is_float = true;
                self.pos += 1 + sign;
                self.eat_digits();
            }
        }
        let text = self.src[start..self.pos].to_string();
        let kind = if is_float {
            TokenKind::Float(text)
        } else {
            TokenKind::Int(text)
        };
        self.push(kind, start);
    }

    fn eat_digits(&mut self) {
        while self.peek(0).is_ascii_digit()
            || (self.peek(0) == b'_' && self.peek(1).is_ascii_digit())
        {
            self.pos += 1;
        }
    }

    /// Recognise `( type )` and return the cast with its byte length
    fn try_cast(&self) -> Option<(CastKind, usize)> {
        let rest = &self.src[self.pos + 1..];
        let close = rest.find(')')?;
        if close > 16 {
            return None;
        }
        let word = rest[..close].trim_matches(|c| c == ' ' || c == '\t');
        if word.is_empty() || !word.bytes().all(|b| b.is_ascii_alphabetic()) {
            return None;
        }
        let kind = match word.to_ascii_lowercase().as_str() {
            "int" | "integer" => CastKind::Int,
            "float" | "double" | "real" => CastKind::Float,
            "string" | "binary" => CastKind::String,
            "bool" | "boolean" => CastKind::Bool,
            "array" => CastKind::Array,
            "object" => CastKind::Object,
            "unset" => CastKind::Unset,
            _ => return None,
        };
        Some((kind, close + 2))
    }

    fn lex_single_quoted(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = Vec::new();
        loop {
            if self.pos >= self.bytes.len() {
                return self.error("unterminated string", start);
            }
            match self.peek(0) {
                b'\'' => {
                    self.pos += 1;
                    break;
                }
                b'\\' if matches!(self.peek(1), b'\\' | b'\'') => {
                    value.push(self.peek(1));
                    self.pos += 2;
                }
                b => {
                    value.push(b);
                    self.pos += 1;
                }
            }
        }
        let value = String::from_utf8_lossy(&value).into_owned();
        self.push(TokenKind::ConstString(value), start);
        Ok(())
    }

    fn lex_double_quoted(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let (parts, end) = self.scan_parts(start + 1, self.bytes.len(), Some(b'"'))?;
        self.pos = end + 1;
        self.push(template_or_const(parts), start);
        Ok(())
    }

    fn lex_backtick(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let (parts, end) = self.scan_parts(start + 1, self.bytes.len(), Some(b'`'))?;
        self.pos = end + 1;
        self.push(TokenKind::ShellExec(parts), start);
        Ok(())
    }

    fn lex_heredoc(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 3;
        while matches!(self.peek(0), b' ' | b'\t') {
            self.pos += 1;
        }
        let quote = match self.peek(0) {
            q @ (b'\'' | b'"') => {
                self.pos += 1;
                Some(q)
            }
            _ => None,
        };
        if !is_ident_start(self.peek(0)) {
            return self.error("invalid heredoc label", start);
        }
        let label = self.read_ident();
        if let Some(q) = quote {
            if self.peek(0) != q {
                return self.error("unterminated heredoc label", start);
            }
            self.pos += 1;
        }
        if self.peek(0) == b'\r' {
            self.pos += 1;
        }
        if self.peek(0) != b'\n' {
            return self.error("heredoc label must end the line", start);
        }
        self.pos += 1;
        let body_start = self.pos;

        // Closing label: first line whose trimmed start is the label
        let mut line_start = body_start;
        let (body_end, indent, label_end) = loop {
            if line_start >= self.bytes.len() {
                return self.error("unterminated heredoc", start);
            }
            let mut i = line_start;
            while matches!(self.at(i), b' ' | b'\t') {
                i += 1;
            }
            let candidate_end = i + label.len();
            if self.bytes[i..].starts_with(label.as_bytes())
                && !is_ident_char(self.at(candidate_end))
            {
                let mut body_end = line_start.saturating_sub(1).max(body_start);
                if body_end > body_start && self.at(body_end - 1) == b'\r' {
                    body_end -= 1;
                }
                break (body_end, i - line_start, candidate_end);
            }
            match self.src[line_start..].find('\n') {
                Some(nl) => line_start += nl + 1,
                None => return self.error("unterminated heredoc", start),
            }
        };

        let kind = if quote == Some(b'\'') {
            TokenKind::ConstString(dedent(&self.src[body_start..body_end], indent))
        } else {
            let (parts, _) = self.scan_parts(body_start, body_end, None)?;
            match template_or_const(parts) {
                TokenKind::ConstString(text) => TokenKind::ConstString(dedent(&text, indent)),
                other => other,
            }
        };
        self.pos = label_end;
        self.push(kind, start);
        Ok(())
    }

    /// Scan interpolated string content from `from` until `quote` (or `limit`).
    ///
    /// Returns the parts and the offset of the terminating quote.
    fn scan_parts(
        &self,
        from: usize,
        limit: usize,
        quote: Option<u8>,
    ) -> Result<(Vec<RawPart>, usize), LexError> {
        let mut parts = Vec::new();
        let mut text: Vec<u8> = Vec::new();
        let mut i = from;

        fn flush(text: &mut Vec<u8>, parts: &mut Vec<RawPart>) {
            if !text.is_empty() {
                parts.push(RawPart::Text(String::from_utf8_lossy(text).into_owned()));
                text.clear();
            }
        }

        loop {
            if i >= limit {
                if quote.is_some() {
                    return self.error("unterminated string", from.saturating_sub(1));
                }
                break;
            }
            let b = self.at(i);
            if Some(b) == quote {
                break;
            }
            match b {
                b'\\' => {
                    i = decode_escape(self.bytes, i, quote, &mut text);
                }
                b'$' if is_ident_start(self.at(i + 1)) => {
                    flush(&mut text, &mut parts);
                    let name_start = i + 1;
                    let mut j = name_start;
                    while is_ident_char(self.at(j)) {
                        j += 1;
                    }
                    parts.push(RawPart::Var {
                        name: self.src[name_start..j].to_string(),
                        span: Span::new(i, j),
                    });
                    i = self.skip_simple_suffix(j, limit, &mut parts);
                }
                b'$' if self.at(i + 1) == b'{' => {
                    flush(&mut text, &mut parts);
                    let inner = i + 2;
                    let close = self.matching_brace(inner, limit)?;
                    let body = self.src[inner..close].trim();
                    if !body.is_empty() && body.bytes().all(is_ident_char) {
                        parts.push(RawPart::Var {
                            name: body.to_string(),
                            span: Span::new(i, close + 1),
                        });
                    } else {
                        parts.push(RawPart::Expr {
                            span: Span::new(inner, close),
                            dynamic_name: true,
                        });
                    }
                    i = close + 1;
                }
                b'{' if self.at(i + 1) == b'$' => {
                    flush(&mut text, &mut parts);
                    let inner = i + 1;
                    let close = self.matching_brace(inner, limit)?;
                    parts.push(RawPart::Expr {
                        span: Span::new(inner, close),
                        dynamic_name: false,
                    });
                    i = close + 1;
                }
                _ => {
                    text.push(b);
                    i += 1;
                }
            }
        }
        flush(&mut text, &mut parts);
        Ok((parts, i))
    }

    /// Skip `[key]` or `->prop` after a simple interpolated variable
    fn skip_simple_suffix(&self, mut i: usize, limit: usize, parts: &mut Vec<RawPart>) -> usize {
        if self.at(i) == b'[' {
            let Some(close) = self.src[i..limit].find(']').map(|p| i + p) else {
                return i;
            };
            let key = &self.src[i + 1..close];
            if let Some(name) = key.strip_prefix('$') {
                parts.push(RawPart::Var {
                    name: name.to_string(),
                    span: Span::new(i + 1, close),
                });
            }
            i = close + 1;
        } else if self.at(i) == b'-' && self.at(i + 1) == b'>' && is_ident_start(self.at(i + 2)) {
            i += 2;
            while is_ident_char(self.at(i)) {
                i += 1;
            }
        } else if self.at(i) == b'?'
            && self.at(i + 1) == b'-'
            && self.at(i + 2) == b'>'
            && is_ident_start(self.at(i + 3))
        {
            i += 3;
            while is_ident_char(self.at(i)) {
                i += 1;
            }
        }
        i
    }

    /// Offset of the `}` closing the brace group whose content starts at `from`
    fn matching_brace(&self, from: usize, limit: usize) -> Result<usize, LexError> {
        let mut depth = 0usize;
        let mut i = from;
        while i < limit {
            match self.at(i) {
                b'{' => depth += 1,
                b'}' if depth == 0 => return Ok(i),
                b'}' => depth -= 1,
                q @ (b'\'' | b'"') => {
                    i += 1;
                    while i < limit && self.at(i) != q {
                        if self.at(i) == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        self.error("unterminated interpolation", from)
    }
}

fn template_or_const(parts: Vec<RawPart>) -> TokenKind {
    if parts.iter().all(|p| matches!(p, RawPart::Text(_))) {
        let text = parts
            .into_iter()
            .filter_map(|p| match p {
                RawPart::Text(t) => Some(t),
                _ => None,
            })
            .collect();
        TokenKind::ConstString(text)
    } else {
        TokenKind::Template(parts)
    }
}

/// Decode one backslash escape at `i`, returning the offset after it
fn decode_escape(bytes: &[u8], i: usize, quote: Option<u8>, out: &mut Vec<u8>) -> usize {
    let next = bytes.get(i + 1).copied().unwrap_or(0);
    let simple = match next {
        b'n' => Some(b'\n'),
        b't' => Some(b'\t'),
        b'r' => Some(b'\r'),
        b'v' => Some(0x0b),
        b'e' => Some(0x1b),
        b'f' => Some(0x0c),
        b'\\' => Some(b'\\'),
        b'$' => Some(b'$'),
        q if Some(q) == quote => Some(q),
        _ => None,
    };
    if let Some(b) = simple {
        out.push(b);
        return i + 2;
    }
    if (b'0'..=b'7').contains(&next) {
        let mut j = i + 1;
        let mut value: u32 = 0;
        while j < i + 4 && bytes.get(j).is_some_and(|b| (b'0'..=b'7').contains(b)) {
            value = value * 8 + u32::from(bytes[j] - b'0');
            j += 1;
        }
        out.push((value & 0xff) as u8);
        return j;
    }
    if next == b'x' && bytes.get(i + 2).is_some_and(|b| b.is_ascii_hexdigit()) {
        let mut j = i + 2;
        let mut value: u32 = 0;
        while j < i + 4 && bytes.get(j).is_some_and(|b| b.is_ascii_hexdigit()) {
            value = value * 16 + (bytes[j] as char).to_digit(16).unwrap_or(0);
            j += 1;
        }
        out.push(value as u8);
        return j;
    }
    if next == b'u' && bytes.get(i + 2) == Some(&b'{') {
        if let Some(close) = bytes[i + 3..].iter().position(|&b| b == b'}') {
            let hex = String::from_utf8_lossy(&bytes[i + 3..i + 3 + close]);
            if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                return i + 3 + close + 1;
            }
        }
    }
    out.push(b'\\');
    i + 1
}

/// Remove up to `indent` leading blanks from every line
fn dedent(text: &str, indent: usize) -> String {
    if indent == 0 {
        return text.to_string();
    }
    text.split('\n')
        .map(|line| {
            let strip = line
                .bytes()
                .take(indent)
                .take_while(|b| matches!(b, b' ' | b'\t'))
                .count();
            &line[strip..]
        })
        .collect::<Vec<_>>()
        .join("\n")
}
