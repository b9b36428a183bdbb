//! Recursive-descent statement parser with a Pratt expression core

use super::ast::*;
use super::lexer::{self, LexError, RawPart, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            message: err.message,
            offset: err.offset,
        }
    }
}

type PResult<T> = Result<T, ParseError>;

// Binding powers; higher binds tighter
const BP_INCLUDE: u8 = 0;
const BP_PRINT: u8 = 8;
const BP_ASSIGN_RHS: u8 = 10;
const BP_TERNARY: u8 = 12;
const BP_NOT: u8 = 38;
const BP_INSTANCEOF: (u8, u8) = (40, 41);
const BP_UNARY: u8 = 42;
const BP_CLONE: u8 = 46;

/// Parse a whole PHP file
pub fn parse(src: &str) -> Result<Program, ParseError> {
    let tokens = lexer::tokenize(src)?;
    let mut parser = Parser::new(src, tokens);
    let mut stmts = Vec::new();
    while !parser.at_eof() {
        stmts.push(parser.statement()?);
    }
    Ok(Program { stmts })
}

fn parse_embedded(src: &str, span: Span) -> PResult<Expr> {
    let tokens = lexer::tokenize_embedded(src, span)?;
    let mut parser = Parser::new(src, tokens);
    let expr = parser.expr()?;
    if !parser.at_eof() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8, u8)> {
    let op = match kind {
        TokenKind::Sym(sym) => match *sym {
            "??" => (BinaryOp::Coalesce, 15, 14),
            "||" => (BinaryOp::Or, 16, 17),
            "&&" => (BinaryOp::And, 18, 19),
            "|" => (BinaryOp::BitOr, 20, 21),
            "^" => (BinaryOp::BitXor, 22, 23),
            "&" => (BinaryOp::BitAnd, 24, 25),
            "==" => (BinaryOp::Equal, 26, 27),
            "!=" | "<>" => (BinaryOp::NotEqual, 26, 27),
            "===" => (BinaryOp::Identical, 26, 27),
            "!==" => (BinaryOp::NotIdentical, 26, 27),
            "<=>" => (BinaryOp::Spaceship, 26, 27),
            "<" => (BinaryOp::Less, 28, 29),
            "<=" => (BinaryOp::LessEqual, 28, 29),
            ">" => (BinaryOp::Greater, 28, 29),
            ">=" => (BinaryOp::GreaterEqual, 28, 29),
            "." => (BinaryOp::Concat, 30, 31),
            "<<" => (BinaryOp::ShiftLeft, 32, 33),
            ">>" => (BinaryOp::ShiftRight, 32, 33),
            "+" => (BinaryOp::Add, 34, 35),
            "-" => (BinaryOp::Sub, 34, 35),
            "*" => (BinaryOp::Mul, 36, 37),
            "/" => (BinaryOp::Div, 36, 37),
            "%" => (BinaryOp::Mod, 36, 37),
            "**" => (BinaryOp::Pow, 45, 44),
            _ => return None,
        },
        TokenKind::Name(name) => match name.to_ascii_lowercase().as_str() {
            "or" => (BinaryOp::Or, 2, 3),
            "xor" => (BinaryOp::LogicalXor, 4, 5),
            "and" => (BinaryOp::And, 6, 7),
            _ => return None,
        },
        _ => return None,
    };
    Some(op)
}

/// `None` inside means plain `=`
fn assign_op(kind: &TokenKind) -> Option<Option<BinaryOp>> {
    let TokenKind::Sym(sym) = kind else {
        return None;
    };
    let op = match *sym {
        "=" => None,
        "+=" => Some(BinaryOp::Add),
        "-=" => Some(BinaryOp::Sub),
        "*=" => Some(BinaryOp::Mul),
        "/=" => Some(BinaryOp::Div),
        "%=" => Some(BinaryOp::Mod),
        "**=" => Some(BinaryOp::Pow),
        ".=" => Some(BinaryOp::Concat),
        "&=" => Some(BinaryOp::BitAnd),
        "|=" => Some(BinaryOp::BitOr),
        "^=" => Some(BinaryOp::BitXor),
        "<<=" => Some(BinaryOp::ShiftLeft),
        ">>=" => Some(BinaryOp::ShiftRight),
        "??=" => Some(BinaryOp::Coalesce),
        _ => return None,
    };
    Some(op)
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Variable(_)
            | ExprKind::DynamicVariable(_)
            | ExprKind::Index { .. }
            | ExprKind::PropertyFetch { .. }
            | ExprKind::StaticPropertyFetch { .. }
            | ExprKind::List(_)
            | ExprKind::Array(_)
    )
}

const MEMBER_MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "abstract",
    "final",
    "readonly",
    "var",
];

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            src,
            tokens,
            pos: 0,
        }
    }

    // ---- token helpers ----

    fn nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    fn peek(&self) -> &Token {
        self.nth(0)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        token
    }

    fn prev_end(&self) -> usize {
        match self.pos.checked_sub(1) {
            Some(i) => self.tokens[i].span.end,
            None => 0,
        }
    }

    fn nth_is_sym(&self, n: usize, sym: &str) -> bool {
        matches!(self.nth(n).kind, TokenKind::Sym(s) if s == sym)
    }

    fn is_sym(&self, sym: &str) -> bool {
        self.nth_is_sym(0, sym)
    }

    fn eat_sym(&mut self, sym: &str) -> bool {
        if self.is_sym(sym) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, sym: &str) -> PResult<Span> {
        if self.is_sym(sym) {
            Ok(self.bump().span)
        } else {
            Err(self.expected(&format!("`{}`", sym)))
        }
    }

    fn nth_is_kw(&self, n: usize, kw: &str) -> bool {
        matches!(&self.nth(n).kind, TokenKind::Name(name) if name.eq_ignore_ascii_case(kw))
    }

    fn is_kw(&self, kw: &str) -> bool {
        self.nth_is_kw(0, kw)
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.is_kw(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, kw: &str) -> PResult<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.expected(&format!("`{}`", kw)))
        }
    }

    fn expect_name(&mut self) -> PResult<String> {
        match &self.peek().kind {
            TokenKind::Name(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.expected("a name")),
        }
    }

    fn expect_variable(&mut self) -> PResult<String> {
        match &self.peek().kind {
            TokenKind::Variable(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.expected("a variable")),
        }
    }

    fn describe(&self, token: &Token) -> String {
        match token.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::InlineHtml(_) => "inline HTML".to_string(),
            _ => {
                let text = &self.src[token.span.start..token.span.end];
                let text: String = text.chars().take(24).collect();
                format!("`{}`", text.trim_end())
            }
        }
    }

    fn unexpected(&self) -> ParseError {
        self.unexpected_token(self.peek())
    }

    fn unexpected_token(&self, token: &Token) -> ParseError {
        ParseError {
            message: format!("unexpected {}", self.describe(token)),
            offset: token.span.start,
        }
    }

    fn expected(&self, what: &str) -> ParseError {
        ParseError {
            message: format!("expected {}, found {}", what, self.describe(self.peek())),
            offset: self.peek().span.start,
        }
    }

    fn at_statement_end(&self) -> bool {
        self.is_sym(";") || matches!(self.peek().kind, TokenKind::CloseTag | TokenKind::Eof)
    }

    /// `;`, or a close tag standing in for one
    fn end_statement(&mut self) -> PResult<()> {
        if self.eat_sym(";") {
            return Ok(());
        }
        if matches!(self.peek().kind, TokenKind::CloseTag) {
            self.bump();
            return Ok(());
        }
        Err(self.expected("`;`"))
    }

    fn skip_attributes(&mut self) -> PResult<()> {
        while self.eat_sym("#[") {
            let mut depth = 1usize;
            while depth > 0 {
                let token = self.bump();
                match token.kind {
                    TokenKind::Sym("[") | TokenKind::Sym("#[") => depth += 1,
                    TokenKind::Sym("]") => depth -= 1,
                    TokenKind::Eof => return Err(self.unexpected_token(&token)),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn skip_braces(&mut self) -> PResult<()> {
        self.expect_sym("{")?;
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.bump();
            match token.kind {
                TokenKind::Sym("{") => depth += 1,
                TokenKind::Sym("}") => depth -= 1,
                TokenKind::Eof => return Err(self.unexpected_token(&token)),
                _ => {}
            }
        }
        Ok(())
    }

    /// Type declarations are parsed and discarded
    fn skip_type(&mut self) -> PResult<()> {
        loop {
            self.eat_sym("?");
            if self.eat_sym("(") {
                self.skip_type()?;
                self.expect_sym(")")?;
            } else {
                self.expect_name()?;
            }
            if self.eat_sym("|") {
                continue;
            }
            let intersection = self.is_sym("&")
                && matches!(self.nth(1).kind, TokenKind::Name(_) | TokenKind::Sym("("));
            if intersection {
                self.bump();
                continue;
            }
            return Ok(());
        }
    }

    fn return_type(&mut self) -> PResult<()> {
        if self.eat_sym(":") {
            self.skip_type()?;
        }
        Ok(())
    }

    // ---- statements ----

    fn statement(&mut self) -> PResult<Stmt> {
        let start = self.peek().span.start;
        let kind = self.statement_kind()?;
        let end = self.prev_end().max(start);
        Ok(Stmt {
            kind,
            span: Span::new(start, end),
        })
    }

    fn statement_kind(&mut self) -> PResult<StmtKind> {
        match self.peek().kind.clone() {
            TokenKind::InlineHtml(text) => {
                self.bump();
                return Ok(StmtKind::InlineHtml(text));
            }
            TokenKind::OpenTag | TokenKind::CloseTag => {
                self.bump();
                return Ok(StmtKind::Nop);
            }
            TokenKind::OpenTagWithEcho => {
                self.bump();
                let exprs = self.expr_list()?;
                self.end_statement()?;
                return Ok(StmtKind::Echo(exprs));
            }
            TokenKind::Sym("{") => {
                self.bump();
                return Ok(StmtKind::Block(self.stmts_until_sym("}")?));
            }
            TokenKind::Sym(";") => {
                self.bump();
                return Ok(StmtKind::Nop);
            }
            TokenKind::Sym("#[") => {
                self.skip_attributes()?;
                return self.statement_kind();
            }
            TokenKind::Name(name) => {
                if let Some(kind) = self.keyword_statement(&name.to_ascii_lowercase())? {
                    return Ok(kind);
                }
            }
            _ => {}
        }
        let expr = self.expr()?;
        self.end_statement()?;
        Ok(StmtKind::Expr(expr))
    }

    fn keyword_statement(&mut self, word: &str) -> PResult<Option<StmtKind>> {
        let next_is_name = matches!(self.nth(1).kind, TokenKind::Name(_));
        let kind = match word {
            "if" => self.if_stmt()?,
            "while" => {
                self.bump();
                let cond = self.paren_expr()?;
                let body = self.control_body("endwhile")?;
                StmtKind::While { cond, body }
            }
            "do" => {
                self.bump();
                let body = self.stmt_as_block()?;
                self.expect_kw("while")?;
                let cond = self.paren_expr()?;
                self.end_statement()?;
                StmtKind::DoWhile { body, cond }
            }
            "for" => self.for_stmt()?,
            "foreach" => self.foreach_stmt()?,
            "switch" => self.switch_stmt()?,
            "break" | "continue" | "return" => {
                self.bump();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.end_statement()?;
                match word {
                    "break" => StmtKind::Break(value),
                    "continue" => StmtKind::Continue(value),
                    _ => StmtKind::Return(value),
                }
            }
            "echo" => {
                self.bump();
                let exprs = self.expr_list()?;
                self.end_statement()?;
                StmtKind::Echo(exprs)
            }
            "global" => {
                self.bump();
                let vars = self.expr_list()?;
                self.end_statement()?;
                StmtKind::Global(vars)
            }
            "static" if matches!(self.nth(1).kind, TokenKind::Variable(_)) => {
                self.bump();
                let mut vars = Vec::new();
                loop {
                    let name = self.expect_variable()?;
                    let default = if self.eat_sym("=") {
                        Some(self.expr()?)
                    } else {
                        None
                    };
                    vars.push(StaticVar { name, default });
                    if !self.eat_sym(",") {
                        break;
                    }
                }
                self.end_statement()?;
                StmtKind::StaticVars(vars)
            }
            "unset" if self.nth_is_sym(1, "(") => {
                self.bump();
                self.bump();
                let mut targets = Vec::new();
                while !self.is_sym(")") {
                    targets.push(self.expr()?);
                    if !self.eat_sym(",") {
                        break;
                    }
                }
                self.expect_sym(")")?;
                self.end_statement()?;
                StmtKind::Unset(targets)
            }
            "function"
                if next_is_name
                    || (self.nth_is_sym(1, "&") && matches!(self.nth(2).kind, TokenKind::Name(_))) =>
            {
                self.bump();
                StmtKind::Function(Box::new(self.function_decl()?))
            }
            "abstract" | "final" | "readonly" if (1..=3).any(|k| self.nth_is_kw(k, "class")) => {
                StmtKind::ClassLike(Box::new(self.class_decl()?))
            }
            "class" | "interface" | "trait" if next_is_name => {
                StmtKind::ClassLike(Box::new(self.class_decl()?))
            }
            "enum"
                if next_is_name
                    && (self.nth_is_sym(2, "{")
                        || self.nth_is_sym(2, ":")
                        || self.nth_is_kw(2, "implements")) =>
            {
                StmtKind::ClassLike(Box::new(self.class_decl()?))
            }
            "try" => self.try_stmt()?,
            "namespace" if next_is_name || self.nth_is_sym(1, "{") => {
                self.bump();
                let name = if matches!(self.peek().kind, TokenKind::Name(_)) {
                    Some(self.expect_name()?)
                } else {
                    None
                };
                let body = if self.is_sym("{") {
                    Some(self.block()?)
                } else {
                    self.end_statement()?;
                    None
                };
                StmtKind::Namespace { name, body }
            }
            "use" => {
                self.bump();
                let mut names = Vec::new();
                while !self.at_statement_end() {
                    let token = self.bump();
                    match token.kind {
                        TokenKind::Name(name) => names.push(name),
                        TokenKind::Sym(_) => {}
                        _ => return Err(self.unexpected_token(&token)),
                    }
                }
                self.end_statement()?;
                StmtKind::Use(names)
            }
            "const" => {
                self.bump();
                let items = self.const_items()?;
                self.end_statement()?;
                StmtKind::Const(items)
            }
            "declare" => self.declare_stmt()?,
            "goto" => {
                self.bump();
                let label = self.expect_name()?;
                self.end_statement()?;
                StmtKind::Goto(label)
            }
            "__halt_compiler" => {
                self.bump();
                self.expect_sym("(")?;
                self.expect_sym(")")?;
                self.end_statement()?;
                self.pos = self.tokens.len() - 1;
                StmtKind::HaltCompiler
            }
            _ if self.nth_is_sym(1, ":") && !matches!(word, "default" | "case" | "else") => {
                let label = self.expect_name()?;
                self.bump();
                StmtKind::Label(label)
            }
            _ => return Ok(None),
        };
        Ok(Some(kind))
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect_sym("{")?;
        self.stmts_until_sym("}")
    }

    fn stmts_until_sym(&mut self, close: &str) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.eat_sym(close) {
            if self.at_eof() {
                return Err(self.expected(&format!("`{}`", close)));
            }
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn stmts_until_kw(&mut self, keywords: &[&str]) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !keywords.iter().any(|kw| self.is_kw(kw)) {
            if self.at_eof() {
                return Err(self.expected(&format!("`{}`", keywords[keywords.len() - 1])));
            }
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn stmt_as_block(&mut self) -> PResult<Vec<Stmt>> {
        let stmt = self.statement()?;
        Ok(match stmt.kind {
            StmtKind::Block(body) => body,
            _ => vec![stmt],
        })
    }

    /// Single statement, or the `: ... endX;` alternative syntax
    fn control_body(&mut self, end_kw: &str) -> PResult<Vec<Stmt>> {
        if self.eat_sym(":") {
            let body = self.stmts_until_kw(&[end_kw])?;
            self.expect_kw(end_kw)?;
            self.end_statement()?;
            Ok(body)
        } else {
            self.stmt_as_block()
        }
    }

    fn paren_expr(&mut self) -> PResult<Expr> {
        self.expect_sym("(")?;
        let expr = self.expr()?;
        self.expect_sym(")")?;
        Ok(expr)
    }

    fn if_stmt(&mut self) -> PResult<StmtKind> {
        self.bump();
        let cond = self.paren_expr()?;
        let mut elseifs = Vec::new();
        let mut otherwise = None;

        if self.eat_sym(":") {
            const ENDS: &[&str] = &["elseif", "else", "endif"];
            let then = self.stmts_until_kw(ENDS)?;
            loop {
                if self.eat_kw("elseif") {
                    let cond = self.paren_expr()?;
                    self.expect_sym(":")?;
                    elseifs.push((cond, self.stmts_until_kw(ENDS)?));
                } else if self.eat_kw("else") {
                    self.expect_sym(":")?;
                    otherwise = Some(self.stmts_until_kw(&["endif"])?);
                } else {
                    break;
                }
            }
            self.expect_kw("endif")?;
            self.end_statement()?;
            return Ok(StmtKind::If {
                cond,
                then,
                elseifs,
                otherwise,
            });
        }

        let then = self.stmt_as_block()?;
        loop {
            if self.eat_kw("elseif") {
                let cond = self.paren_expr()?;
                elseifs.push((cond, self.stmt_as_block()?));
            } else if self.eat_kw("else") {
                otherwise = Some(self.stmt_as_block()?);
                break;
            } else {
                break;
            }
        }
        Ok(StmtKind::If {
            cond,
            then,
            elseifs,
            otherwise,
        })
    }

    fn for_stmt(&mut self) -> PResult<StmtKind> {
        self.bump();
        self.expect_sym("(")?;
        let init = self.expr_list_until(";")?;
        self.expect_sym(";")?;
        let cond = self.expr_list_until(";")?;
        self.expect_sym(";")?;
        let step = self.expr_list_until(")")?;
        self.expect_sym(")")?;
        let body = self.control_body("endfor")?;
        Ok(StmtKind::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn foreach_stmt(&mut self) -> PResult<StmtKind> {
        self.bump();
        self.expect_sym("(")?;
        let subject = self.expr()?;
        self.expect_kw("as")?;
        let first = self.foreach_target()?;
        let (key, value) = if self.eat_sym("=>") {
            (Some(first), self.foreach_target()?)
        } else {
            (None, first)
        };
        self.expect_sym(")")?;
        let body = self.control_body("endforeach")?;
        Ok(StmtKind::Foreach {
            subject,
            key,
            value,
            body,
        })
    }

    fn foreach_target(&mut self) -> PResult<Expr> {
        self.eat_sym("&");
        self.expr()
    }

    fn switch_stmt(&mut self) -> PResult<StmtKind> {
        self.bump();
        let subject = self.paren_expr()?;
        let alt = self.eat_sym(":");
        if !alt {
            self.expect_sym("{")?;
        }
        let mut cases = Vec::new();
        loop {
            while matches!(
                self.peek().kind,
                TokenKind::Sym(";") | TokenKind::CloseTag | TokenKind::OpenTag
            ) {
                self.bump();
            }
            if alt && self.eat_kw("endswitch") {
                self.end_statement()?;
                break;
            }
            if !alt && self.eat_sym("}") {
                break;
            }
            let test = if self.eat_kw("case") {
                Some(self.expr()?)
            } else if self.eat_kw("default") {
                None
            } else {
                return Err(self.expected("`case` or `default`"));
            };
            if !self.eat_sym(":") {
                self.expect_sym(";")?;
            }
            let mut body = Vec::new();
            while !(self.is_kw("case")
                || self.is_kw("default")
                || (alt && self.is_kw("endswitch"))
                || (!alt && self.is_sym("}")))
            {
                if self.at_eof() {
                    return Err(self.unexpected());
                }
                body.push(self.statement()?);
            }
            cases.push(SwitchCase { test, body });
        }
        Ok(StmtKind::Switch { subject, cases })
    }

    fn try_stmt(&mut self) -> PResult<StmtKind> {
        self.bump();
        let body = self.block()?;
        let mut catches = Vec::new();
        while self.eat_kw("catch") {
            self.expect_sym("(")?;
            let mut types = vec![self.expect_name()?];
            while self.eat_sym("|") {
                types.push(self.expect_name()?);
            }
            let var = if matches!(self.peek().kind, TokenKind::Variable(_)) {
                Some(self.expect_variable()?)
            } else {
                None
            };
            self.expect_sym(")")?;
            let body = self.block()?;
            catches.push(CatchClause { types, var, body });
        }
        let finally = if self.eat_kw("finally") {
            Some(self.block()?)
        } else {
            None
        };
        if catches.is_empty() && finally.is_none() {
            return Err(self.expected("`catch` or `finally`"));
        }
        Ok(StmtKind::Try {
            body,
            catches,
            finally,
        })
    }

    fn declare_stmt(&mut self) -> PResult<StmtKind> {
        self.bump();
        self.expect_sym("(")?;
        let mut directives = Vec::new();
        loop {
            let name = self.expect_name()?;
            self.expect_sym("=")?;
            directives.push((name, self.expr()?));
            if !self.eat_sym(",") {
                break;
            }
        }
        self.expect_sym(")")?;
        let body = if self.eat_sym(":") {
            let body = self.stmts_until_kw(&["enddeclare"])?;
            self.expect_kw("enddeclare")?;
            self.end_statement()?;
            Some(body)
        } else if self.is_sym("{") {
            Some(self.block()?)
        } else {
            self.end_statement()?;
            None
        };
        Ok(StmtKind::Declare { directives, body })
    }

    fn const_items(&mut self) -> PResult<Vec<ConstItem>> {
        let mut items = Vec::new();
        loop {
            let start = self.peek().span.start;
            let name = self.expect_name()?;
            self.expect_sym("=")?;
            let value = self.expr()?;
            items.push(ConstItem {
                name,
                value,
                span: Span::new(start, self.prev_end()),
            });
            if !self.eat_sym(",") {
                break;
            }
        }
        Ok(items)
    }

    /// After `function`: `&? name (params) : type { body }`
    fn function_decl(&mut self) -> PResult<FunctionDecl> {
        let by_ref = self.eat_sym("&");
        let name = self.expect_name()?;
        let params = self.params()?;
        self.return_type()?;
        let body = if self.is_sym("{") {
            Some(self.block()?)
        } else {
            self.end_statement()?;
            None
        };
        Ok(FunctionDecl {
            name,
            by_ref,
            params,
            body,
        })
    }

    fn params(&mut self) -> PResult<Vec<Param>> {
        self.expect_sym("(")?;
        let mut params = Vec::new();
        while !self.is_sym(")") {
            self.skip_attributes()?;
            while MEMBER_MODIFIERS.iter().any(|m| self.is_kw(m)) {
                self.bump();
                // asymmetric visibility: `private(set)`
                if self.is_sym("(") && self.nth_is_kw(1, "set") {
                    self.bump();
                    self.bump();
                    self.expect_sym(")")?;
                }
            }
            let untyped = matches!(self.peek().kind, TokenKind::Variable(_))
                || self.is_sym("&")
                || self.is_sym("...");
            if !untyped {
                self.skip_type()?;
            }
            let by_ref = self.eat_sym("&");
            let variadic = self.eat_sym("...");
            let name = self.expect_variable()?;
            let default = if self.eat_sym("=") {
                Some(self.expr()?)
            } else {
                None
            };
            if self.is_sym("{") {
                self.skip_braces()?;
            }
            params.push(Param {
                name,
                default,
                by_ref,
                variadic,
            });
            if !self.eat_sym(",") {
                break;
            }
        }
        self.expect_sym(")")?;
        Ok(params)
    }

    fn name_list(&mut self) -> PResult<Vec<String>> {
        let mut names = vec![self.expect_name()?];
        while self.eat_sym(",") {
            names.push(self.expect_name()?);
        }
        Ok(names)
    }

    fn class_decl(&mut self) -> PResult<ClassDecl> {
        while self.eat_kw("abstract") || self.eat_kw("final") || self.eat_kw("readonly") {}
        let keyword = self.expect_name()?.to_ascii_lowercase();
        let kind = match keyword.as_str() {
            "class" => ClassKind::Class,
            "interface" => ClassKind::Interface,
            "trait" => ClassKind::Trait,
            "enum" => ClassKind::Enum,
            _ => return Err(self.expected("a class declaration")),
        };
        let name = self.expect_name()?;
        if kind == ClassKind::Enum && self.eat_sym(":") {
            self.skip_type()?;
        }
        if self.eat_kw("extends") {
            self.name_list()?;
        }
        if self.eat_kw("implements") {
            self.name_list()?;
        }
        let members = self.class_body()?;
        Ok(ClassDecl {
            kind,
            name: Some(name),
            args: Vec::new(),
            members,
        })
    }

    fn class_body(&mut self) -> PResult<Vec<ClassMember>> {
        self.expect_sym("{")?;
        let mut members = Vec::new();
        loop {
            if self.eat_sym("}") {
                break;
            }
            if self.at_eof() {
                return Err(self.expected("`}`"));
            }
            if self.is_sym("#[") {
                self.skip_attributes()?;
                continue;
            }
            if self.eat_sym(";") {
                continue;
            }
            if self.eat_kw("use") {
                let names = self.name_list()?;
                if self.is_sym("{") {
                    self.skip_braces()?;
                } else {
                    self.end_statement()?;
                }
                members.push(ClassMember::TraitUse(names));
                continue;
            }
            if self.eat_kw("case") {
                let name = self.expect_name()?;
                let value = if self.eat_sym("=") {
                    Some(self.expr()?)
                } else {
                    None
                };
                self.end_statement()?;
                members.push(ClassMember::EnumCase { name, value });
                continue;
            }
            while MEMBER_MODIFIERS.iter().any(|m| self.is_kw(m)) {
                self.bump();
                if self.is_sym("(") && self.nth_is_kw(1, "set") {
                    self.bump();
                    self.bump();
                    self.expect_sym(")")?;
                }
            }
            if self.eat_kw("const") {
                // typed class constants: `const string NAME = ...`
                if matches!(self.nth(1).kind, TokenKind::Name(_)) || self.nth_is_sym(1, "|") {
                    self.skip_type()?;
                }
                let items = self.const_items()?;
                self.end_statement()?;
                members.push(ClassMember::Const(items));
                continue;
            }
            if self.eat_kw("function") {
                members.push(ClassMember::Method(self.function_decl()?));
                continue;
            }
            if !matches!(self.peek().kind, TokenKind::Variable(_)) {
                self.skip_type()?;
            }
            loop {
                let name = self.expect_variable()?;
                let default = if self.eat_sym("=") {
                    Some(self.expr()?)
                } else {
                    None
                };
                members.push(ClassMember::Property { name, default });
                if self.is_sym("{") {
                    // property hooks
                    self.skip_braces()?;
                    break;
                }
                if !self.eat_sym(",") {
                    self.end_statement()?;
                    break;
                }
            }
        }
        Ok(members)
    }

    // ---- expressions ----

    fn expr(&mut self) -> PResult<Expr> {
        self.expr_bp(0)
    }

    fn expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.expr()?];
        while self.eat_sym(",") {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    fn expr_list_until(&mut self, close: &str) -> PResult<Vec<Expr>> {
        if self.is_sym(close) {
            return Ok(Vec::new());
        }
        self.expr_list()
    }

    fn at_expr_end(&self) -> bool {
        [";", ")", ",", "]", "}"].iter().any(|s| self.is_sym(s))
            || matches!(self.peek().kind, TokenKind::CloseTag | TokenKind::Eof)
    }

    fn expr_bp(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut left = self.prefix()?;
        loop {
            let start = left.span.start;
            let kind = &self.peek().kind;

            let is_postfix = matches!(
                kind,
                TokenKind::Sym("[" | "(" | "->" | "?->" | "::" | "++" | "--")
            );
            if is_postfix {
                left = self.postfix(left)?;
                continue;
            }

            if let Some(op) = assign_op(kind) {
                if !is_assignable(&left) {
                    break;
                }
                self.bump();
                let by_ref = op.is_none() && self.eat_sym("&");
                let value = self.expr_bp(BP_ASSIGN_RHS)?;
                let span = Span::new(start, value.span.end);
                left = Expr::new(
                    ExprKind::Assign {
                        target: Box::new(left),
                        op,
                        by_ref,
                        value: Box::new(value),
                    },
                    span,
                );
                continue;
            }

            if matches!(kind, TokenKind::Sym("?")) {
                if BP_TERNARY < min_bp {
                    break;
                }
                self.bump();
                let then = if self.eat_sym(":") {
                    None
                } else {
                    let then = self.expr()?;
                    self.expect_sym(":")?;
                    Some(Box::new(then))
                };
                let otherwise = self.expr_bp(BP_TERNARY + 1)?;
                let span = Span::new(start, otherwise.span.end);
                left = Expr::new(
                    ExprKind::Ternary {
                        cond: Box::new(left),
                        then,
                        otherwise: Box::new(otherwise),
                    },
                    span,
                );
                continue;
            }

            if matches!(kind, TokenKind::Name(n) if n.eq_ignore_ascii_case("instanceof")) {
                if BP_INSTANCEOF.0 < min_bp {
                    break;
                }
                self.bump();
                let class = self.expr_bp(BP_INSTANCEOF.1)?;
                let span = Span::new(start, class.span.end);
                left = Expr::new(
                    ExprKind::Instanceof {
                        expr: Box::new(left),
                        class: Box::new(class),
                    },
                    span,
                );
                continue;
            }

            let Some((op, l_bp, r_bp)) = binary_op(kind) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.bump();
            let right = self.expr_bp(r_bp)?;
            let span = Span::new(start, right.span.end);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn unary(&mut self, op: UnaryOp, bp: u8) -> PResult<ExprKind> {
        Ok(ExprKind::Unary {
            op,
            operand: Box::new(self.expr_bp(bp)?),
        })
    }

    fn prefix(&mut self) -> PResult<Expr> {
        let token = self.bump();
        let start = token.span.start;
        let kind = match token.kind {
            TokenKind::Variable(name) => ExprKind::Variable(name),
            TokenKind::Int(value) => ExprKind::Int(value),
            TokenKind::Float(value) => ExprKind::Float(value),
            TokenKind::ConstString(value) => ExprKind::String(value),
            TokenKind::Template(parts) => ExprKind::Template(self.template_parts(parts)?),
            TokenKind::ShellExec(parts) => ExprKind::ShellExec(self.template_parts(parts)?),
            TokenKind::Cast(kind) => ExprKind::Cast {
                kind,
                expr: Box::new(self.expr_bp(BP_UNARY)?),
            },
            TokenKind::Sym("(") => {
                let mut inner = self.expr()?;
                let close = self.expect_sym(")")?;
                inner.span = Span::new(start, close.end);
                return Ok(inner);
            }
            TokenKind::Sym("[") => ExprKind::Array(self.array_items("]")?),
            TokenKind::Sym("$") => {
                let inner = if self.eat_sym("{") {
                    let inner = self.expr()?;
                    self.expect_sym("}")?;
                    inner
                } else {
                    self.simple_variable()?
                };
                ExprKind::DynamicVariable(Box::new(inner))
            }
            TokenKind::Sym("!") => self.unary(UnaryOp::Not, BP_NOT)?,
            TokenKind::Sym("-") => self.unary(UnaryOp::Neg, BP_UNARY)?,
            TokenKind::Sym("+") => self.unary(UnaryOp::Plus, BP_UNARY)?,
            TokenKind::Sym("~") => self.unary(UnaryOp::BitNot, BP_UNARY)?,
            TokenKind::Sym("@") => self.unary(UnaryOp::Silence, BP_UNARY)?,
            TokenKind::Sym("++") => self.unary(UnaryOp::PreInc, BP_UNARY)?,
            TokenKind::Sym("--") => self.unary(UnaryOp::PreDec, BP_UNARY)?,
            TokenKind::Sym("#[") => {
                self.pos -= 1;
                self.skip_attributes()?;
                return self.prefix();
            }
            TokenKind::Name(name) => self.name_expr(name)?,
            _ => return Err(self.unexpected_token(&token)),
        };
        Ok(Expr::new(kind, Span::new(start, self.prev_end())))
    }

    /// Operand of `$`: `$$a` or `$$$a`
    fn simple_variable(&mut self) -> PResult<Expr> {
        let token = self.bump();
        match token.kind {
            TokenKind::Variable(name) => Ok(Expr::new(ExprKind::Variable(name), token.span)),
            TokenKind::Sym("$") => {
                let inner = self.simple_variable()?;
                let span = Span::new(token.span.start, inner.span.end);
                Ok(Expr::new(ExprKind::DynamicVariable(Box::new(inner)), span))
            }
            _ => Err(self.unexpected_token(&token)),
        }
    }

    fn name_expr(&mut self, name: String) -> PResult<ExprKind> {
        let lower = name.to_ascii_lowercase();
        let kind = match lower.as_str() {
            "include" | "include_once" | "require" | "require_once" => {
                let kind = IncludeKind::from_keyword(&lower).unwrap_or(IncludeKind::Include);
                ExprKind::Include {
                    kind,
                    target: Box::new(self.expr_bp(BP_INCLUDE)?),
                }
            }
            "new" => self.new_expr()?,
            "clone" => ExprKind::Clone(Box::new(self.expr_bp(BP_CLONE)?)),
            "print" => ExprKind::Print(Box::new(self.expr_bp(BP_PRINT)?)),
            "throw" => ExprKind::Throw(Box::new(self.expr_bp(0)?)),
            "yield" => {
                if self.eat_kw("from") {
                    ExprKind::YieldFrom(Box::new(self.expr_bp(BP_PRINT)?))
                } else if self.at_expr_end() {
                    ExprKind::Yield {
                        key: None,
                        value: None,
                    }
                } else {
                    let first = self.expr_bp(BP_PRINT)?;
                    if self.eat_sym("=>") {
                        let value = self.expr_bp(BP_PRINT)?;
                        ExprKind::Yield {
                            key: Some(Box::new(first)),
                            value: Some(Box::new(value)),
                        }
                    } else {
                        ExprKind::Yield {
                            key: None,
                            value: Some(Box::new(first)),
                        }
                    }
                }
            }
            "isset" if self.is_sym("(") => {
                self.bump();
                let mut exprs = Vec::new();
                while !self.is_sym(")") {
                    exprs.push(self.expr()?);
                    if !self.eat_sym(",") {
                        break;
                    }
                }
                self.expect_sym(")")?;
                ExprKind::Isset(exprs)
            }
            "empty" if self.is_sym("(") => ExprKind::Empty(Box::new(self.paren_expr()?)),
            "eval" if self.is_sym("(") => ExprKind::Eval(Box::new(self.paren_expr()?)),
            "exit" | "die" => {
                if self.eat_sym("(") {
                    if self.eat_sym(")") {
                        ExprKind::Exit(None)
                    } else {
                        let code = self.expr()?;
                        self.expect_sym(")")?;
                        ExprKind::Exit(Some(Box::new(code)))
                    }
                } else {
                    ExprKind::Exit(None)
                }
            }
            "list" if self.is_sym("(") => {
                self.bump();
                ExprKind::List(self.array_items(")")?)
            }
            "array" if self.is_sym("(") => {
                self.bump();
                ExprKind::Array(self.array_items(")")?)
            }
            "function" if self.is_sym("(") || self.is_sym("&") => self.closure(false)?,
            "fn" if self.is_sym("(") || self.is_sym("&") => self.arrow_function(false)?,
            "static" if self.is_kw("function") => {
                self.bump();
                self.closure(true)?
            }
            "static" if self.is_kw("fn") => {
                self.bump();
                self.arrow_function(true)?
            }
            "match" if self.is_sym("(") => self.match_expr()?,
            _ => ExprKind::Name(name),
        };
        Ok(kind)
    }

    fn new_expr(&mut self) -> PResult<ExprKind> {
        self.skip_attributes()?;
        if self.is_kw("class") {
            let start = self.bump().span.start;
            let args = if self.is_sym("(") {
                self.args()?
            } else {
                Vec::new()
            };
            if self.eat_kw("extends") {
                self.expect_name()?;
            }
            if self.eat_kw("implements") {
                self.name_list()?;
            }
            let members = self.class_body()?;
            let decl = ClassDecl {
                kind: ClassKind::Class,
                name: None,
                args,
                members,
            };
            let class = Expr::new(
                ExprKind::AnonymousClass(Box::new(decl)),
                Span::new(start, self.prev_end()),
            );
            return Ok(ExprKind::New {
                class: Box::new(class),
                args: Vec::new(),
            });
        }

        let class = match self.peek().kind.clone() {
            TokenKind::Sym("(") => {
                let start = self.bump().span.start;
                let mut inner = self.expr()?;
                let close = self.expect_sym(")")?;
                inner.span = Span::new(start, close.end);
                inner
            }
            TokenKind::Name(name) => {
                let span = self.bump().span;
                Expr::new(ExprKind::Name(name), span)
            }
            TokenKind::Variable(_) | TokenKind::Sym("$") => self.class_reference()?,
            _ => return Err(self.expected("a class name")),
        };
        let args = if self.is_sym("(") {
            self.args()?
        } else {
            Vec::new()
        };
        Ok(ExprKind::New {
            class: Box::new(class),
            args,
        })
    }

    /// Variable class reference after `new`: no calls allowed
    fn class_reference(&mut self) -> PResult<Expr> {
        let mut expr = if self.eat_sym("$") {
            let inner = self.simple_variable()?;
            let span = inner.span;
            Expr::new(ExprKind::DynamicVariable(Box::new(inner)), span)
        } else {
            self.simple_variable()?
        };
        loop {
            let start = expr.span.start;
            let kind = if self.eat_sym("[") {
                let index = self.expr()?;
                self.expect_sym("]")?;
                ExprKind::Index {
                    base: Box::new(expr),
                    index: Some(Box::new(index)),
                }
            } else if self.is_sym("->") || self.is_sym("?->") {
                let nullsafe = self.bump().kind == TokenKind::Sym("?->");
                let property = self.member_name()?;
                ExprKind::PropertyFetch {
                    object: Box::new(expr),
                    property: Box::new(property),
                    nullsafe,
                }
            } else if self.is_sym("::") && matches!(self.nth(1).kind, TokenKind::Variable(_)) {
                self.bump();
                let property = self.simple_variable()?;
                ExprKind::StaticPropertyFetch {
                    class: Box::new(expr),
                    property: Box::new(property),
                }
            } else {
                return Ok(expr);
            };
            expr = Expr::new(kind, Span::new(start, self.prev_end()));
        }
    }

    fn member_name(&mut self) -> PResult<Expr> {
        match self.peek().kind.clone() {
            TokenKind::Name(name) => {
                let span = self.bump().span;
                Ok(Expr::new(ExprKind::Name(name), span))
            }
            TokenKind::Variable(_) | TokenKind::Sym("$") => {
                if self.is_sym("$") {
                    let start = self.bump().span.start;
                    let inner = self.simple_variable()?;
                    let span = Span::new(start, inner.span.end);
                    Ok(Expr::new(ExprKind::DynamicVariable(Box::new(inner)), span))
                } else {
                    self.simple_variable()
                }
            }
            TokenKind::Sym("{") => {
                self.bump();
                let expr = self.expr()?;
                self.expect_sym("}")?;
                Ok(expr)
            }
            _ => Err(self.expected("a member name")),
        }
    }

    fn postfix(&mut self, left: Expr) -> PResult<Expr> {
        let start = left.span.start;
        let token = self.bump();
        let kind = match token.kind {
            TokenKind::Sym("[") => {
                let index = if self.is_sym("]") {
                    None
                } else {
                    Some(Box::new(self.expr()?))
                };
                self.expect_sym("]")?;
                ExprKind::Index {
                    base: Box::new(left),
                    index,
                }
            }
            TokenKind::Sym("(") => {
                self.pos -= 1;
                let args = self.args()?;
                ExprKind::Call {
                    callee: Box::new(left),
                    args,
                }
            }
            TokenKind::Sym(arrow @ ("->" | "?->")) => {
                let nullsafe = arrow == "?->";
                let member = self.member_name()?;
                if self.is_sym("(") {
                    ExprKind::MethodCall {
                        object: Box::new(left),
                        method: Box::new(member),
                        args: self.args()?,
                        nullsafe,
                    }
                } else {
                    ExprKind::PropertyFetch {
                        object: Box::new(left),
                        property: Box::new(member),
                        nullsafe,
                    }
                }
            }
            TokenKind::Sym("::") => match self.peek().kind.clone() {
                TokenKind::Variable(_) | TokenKind::Sym("$") => {
                    let member = self.member_name()?;
                    if self.is_sym("(") {
                        ExprKind::StaticCall {
                            class: Box::new(left),
                            method: Box::new(member),
                            args: self.args()?,
                        }
                    } else {
                        ExprKind::StaticPropertyFetch {
                            class: Box::new(left),
                            property: Box::new(member),
                        }
                    }
                }
                TokenKind::Name(name) => {
                    let span = self.bump().span;
                    if self.is_sym("(") {
                        ExprKind::StaticCall {
                            class: Box::new(left),
                            method: Box::new(Expr::new(ExprKind::Name(name), span)),
                            args: self.args()?,
                        }
                    } else {
                        ExprKind::ClassConstFetch {
                            class: Box::new(left),
                            name,
                        }
                    }
                }
                TokenKind::Sym("{") => {
                    let method = self.member_name()?;
                    ExprKind::StaticCall {
                        class: Box::new(left),
                        method: Box::new(method),
                        args: self.args()?,
                    }
                }
                _ => return Err(self.expected("a static member")),
            },
            TokenKind::Sym("++") => ExprKind::Unary {
                op: UnaryOp::PostInc,
                operand: Box::new(left),
            },
            TokenKind::Sym("--") => ExprKind::Unary {
                op: UnaryOp::PostDec,
                operand: Box::new(left),
            },
            _ => return Err(self.unexpected_token(&token)),
        };
        Ok(Expr::new(kind, Span::new(start, self.prev_end())))
    }

    fn args(&mut self) -> PResult<Vec<Arg>> {
        self.expect_sym("(")?;
        let mut args = Vec::new();
        // first-class callable syntax `f(...)`
        if self.is_sym("...") && self.nth_is_sym(1, ")") {
            self.bump();
            self.bump();
            return Ok(args);
        }
        while !self.is_sym(")") {
            let unpack = self.eat_sym("...");
            let named = matches!(self.peek().kind, TokenKind::Name(_)) && self.nth_is_sym(1, ":");
            let name = if named {
                let name = self.expect_name()?;
                self.bump();
                Some(name)
            } else {
                None
            };
            let value = self.expr()?;
            args.push(Arg {
                name,
                value,
                unpack,
            });
            if !self.eat_sym(",") {
                break;
            }
        }
        self.expect_sym(")")?;
        Ok(args)
    }

    fn array_items(&mut self, close: &str) -> PResult<Vec<ArrayItem>> {
        let mut items = Vec::new();
        loop {
            if self.eat_sym(close) {
                break;
            }
            if self.eat_sym(",") {
                items.push(ArrayItem {
                    key: None,
                    value: None,
                    by_ref: false,
                    unpack: false,
                });
                continue;
            }
            items.push(self.array_item()?);
            if !self.eat_sym(",") {
                self.expect_sym(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn array_item(&mut self) -> PResult<ArrayItem> {
        if self.eat_sym("...") {
            return Ok(ArrayItem {
                key: None,
                value: Some(self.expr()?),
                by_ref: false,
                unpack: true,
            });
        }
        if self.eat_sym("&") {
            return Ok(ArrayItem {
                key: None,
                value: Some(self.expr()?),
                by_ref: true,
                unpack: false,
            });
        }
        let first = self.expr()?;
        if self.eat_sym("=>") {
            let by_ref = self.eat_sym("&");
            let value = self.expr()?;
            return Ok(ArrayItem {
                key: Some(first),
                value: Some(value),
                by_ref,
                unpack: false,
            });
        }
        Ok(ArrayItem {
            key: None,
            value: Some(first),
            by_ref: false,
            unpack: false,
        })
    }

    /// After `function`
    fn closure(&mut self, is_static: bool) -> PResult<ExprKind> {
        let by_ref = self.eat_sym("&");
        let params = self.params()?;
        let mut uses = Vec::new();
        if self.eat_kw("use") {
            self.expect_sym("(")?;
            while !self.is_sym(")") {
                let start = self.peek().span.start;
                let by_ref = self.eat_sym("&");
                let name = self.expect_variable()?;
                uses.push(ClosureUse {
                    name,
                    by_ref,
                    span: Span::new(start, self.prev_end()),
                });
                if !self.eat_sym(",") {
                    break;
                }
            }
            self.expect_sym(")")?;
        }
        self.return_type()?;
        let body = self.block()?;
        Ok(ExprKind::Closure(Box::new(Closure {
            is_static,
            by_ref,
            params,
            uses,
            body,
        })))
    }

    /// After `fn`
    fn arrow_function(&mut self, is_static: bool) -> PResult<ExprKind> {
        self.eat_sym("&");
        let params = self.params()?;
        self.return_type()?;
        self.expect_sym("=>")?;
        let body = self.expr_bp(0)?;
        Ok(ExprKind::ArrowFunction {
            is_static,
            params,
            body: Box::new(body),
        })
    }

    fn match_expr(&mut self) -> PResult<ExprKind> {
        let subject = self.paren_expr()?;
        self.expect_sym("{")?;
        let mut arms = Vec::new();
        while !self.eat_sym("}") {
            let conditions = if self.is_kw("default")
                && (self.nth_is_sym(1, "=>") || self.nth_is_sym(1, ","))
            {
                self.bump();
                self.eat_sym(",");
                None
            } else {
                let mut conditions = vec![self.expr()?];
                while self.eat_sym(",") {
                    if self.is_sym("=>") {
                        break;
                    }
                    conditions.push(self.expr()?);
                }
                Some(conditions)
            };
            self.expect_sym("=>")?;
            let body = self.expr()?;
            arms.push(MatchArm { conditions, body });
            if !self.eat_sym(",") {
                self.expect_sym("}")?;
                break;
            }
        }
        Ok(ExprKind::Match {
            subject: Box::new(subject),
            arms,
        })
    }

    fn template_parts(&mut self, parts: Vec<RawPart>) -> PResult<Vec<TemplatePart>> {
        parts
            .into_iter()
            .map(|part| {
                Ok(match part {
                    RawPart::Text(text) => TemplatePart::Text(text),
                    RawPart::Var { name, span } => {
                        TemplatePart::Expr(Expr::new(ExprKind::Variable(name), span))
                    }
                    RawPart::Expr { span, dynamic_name } => {
                        let inner = parse_embedded(self.src, span)?;
                        if dynamic_name {
                            TemplatePart::Expr(Expr::new(
                                ExprKind::DynamicVariable(Box::new(inner)),
                                span,
                            ))
                        } else {
                            TemplatePart::Expr(inner)
                        }
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
