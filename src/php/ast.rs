//! PHP syntax tree
//!
//! Closed enums for statements and expressions; every node carries the byte
//! span it was parsed from. Only the shape the transformer needs is kept:
//! type hints, attributes and modifiers are parsed and dropped.

pub use super::lexer::CastKind;

/// Half-open byte range into the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Echo(Vec<Expr>),
    InlineHtml(String),
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        elseifs: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<Expr>,
        cond: Vec<Expr>,
        step: Vec<Expr>,
        body: Vec<Stmt>,
    },
    Foreach {
        subject: Expr,
        key: Option<Expr>,
        value: Expr,
        body: Vec<Stmt>,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
    },
    Break(Option<Expr>),
    Continue(Option<Expr>),
    Return(Option<Expr>),
    Global(Vec<Expr>),
    StaticVars(Vec<StaticVar>),
    Unset(Vec<Expr>),
    Function(Box<FunctionDecl>),
    ClassLike(Box<ClassDecl>),
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Namespace {
        name: Option<String>,
        body: Option<Vec<Stmt>>,
    },
    Use(Vec<String>),
    /// Top-level `const A = 1, B = 2;`
    Const(Vec<ConstItem>),
    Declare {
        directives: Vec<(String, Expr)>,
        body: Option<Vec<Stmt>>,
    },
    Goto(String),
    Label(String),
    HaltCompiler,
    /// Empty statement, or a close tag acting as `;`
    Nop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticVar {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub types: Vec<String>,
    pub var: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstItem {
    pub name: String,
    pub value: Expr,
    /// Span of `NAME = value`
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub by_ref: bool,
    pub variadic: bool,
}

/// Named function or method
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub by_ref: bool,
    pub params: Vec<Param>,
    /// `None` for abstract and interface methods
    pub body: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
    Enum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub kind: ClassKind,
    /// `None` for anonymous classes
    pub name: Option<String>,
    /// Constructor arguments of `new class(...)`
    pub args: Vec<Arg>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Method(FunctionDecl),
    Property {
        name: String,
        default: Option<Expr>,
    },
    Const(Vec<ConstItem>),
    EnumCase {
        name: String,
        value: Option<Expr>,
    },
    TraitUse(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
}

impl IncludeKind {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "include" => Some(Self::Include),
            "include_once" => Some(Self::IncludeOnce),
            "require" => Some(Self::Require),
            "require_once" => Some(Self::RequireOnce),
            _ => None,
        }
    }

    /// Missing target is fatal
    pub fn required(self) -> bool {
        matches!(self, Self::Require | Self::RequireOnce)
    }

    /// Executes at most once per request
    pub fn once(self) -> bool {
        matches!(self, Self::IncludeOnce | Self::RequireOnce)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::IncludeOnce => "include_once",
            Self::Require => "require",
            Self::RequireOnce => "require_once",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    And,
    Or,
    LogicalXor,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Spaceship,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    Silence,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
    pub unpack: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    /// `None` for skipped slots in `list(, $b)`
    pub value: Option<Expr>,
    pub by_ref: bool,
    pub unpack: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureUse {
    pub name: String,
    pub by_ref: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub is_static: bool,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub uses: Vec<ClosureUse>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    /// `None` for `default`
    pub conditions: Option<Vec<Expr>>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `$name`, without the dollar
    Variable(String),
    /// `$$name`, `${expr}`
    DynamicVariable(Box<Expr>),
    Int(String),
    Float(String),
    /// String literal with no interpolation, decoded
    String(String),
    Template(Vec<TemplatePart>),
    ShellExec(Vec<TemplatePart>),
    /// Constant or function name, including `true`, `null`, `__DIR__`
    Name(String),
    Array(Vec<ArrayItem>),
    List(Vec<ArrayItem>),
    Assign {
        target: Box<Expr>,
        /// `None` for plain `=`
        op: Option<BinaryOp>,
        by_ref: bool,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Cast {
        kind: CastKind,
        expr: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Option<Box<Expr>>,
        otherwise: Box<Expr>,
    },
    Instanceof {
        expr: Box<Expr>,
        class: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
    },
    New {
        class: Box<Expr>,
        args: Vec<Arg>,
    },
    AnonymousClass(Box<ClassDecl>),
    PropertyFetch {
        object: Box<Expr>,
        property: Box<Expr>,
        nullsafe: bool,
    },
    MethodCall {
        object: Box<Expr>,
        method: Box<Expr>,
        args: Vec<Arg>,
        nullsafe: bool,
    },
    StaticPropertyFetch {
        class: Box<Expr>,
        property: Box<Expr>,
    },
    ClassConstFetch {
        class: Box<Expr>,
        name: String,
    },
    StaticCall {
        class: Box<Expr>,
        method: Box<Expr>,
        args: Vec<Arg>,
    },
    Index {
        base: Box<Expr>,
        index: Option<Box<Expr>>,
    },
    Closure(Box<Closure>),
    ArrowFunction {
        is_static: bool,
        params: Vec<Param>,
        body: Box<Expr>,
    },
    Match {
        subject: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    Include {
        kind: IncludeKind,
        target: Box<Expr>,
    },
    Isset(Vec<Expr>),
    Empty(Box<Expr>),
    Exit(Option<Box<Expr>>),
    Eval(Box<Expr>),
    Print(Box<Expr>),
    Clone(Box<Expr>),
    Yield {
        key: Option<Box<Expr>>,
        value: Option<Box<Expr>>,
    },
    YieldFrom(Box<Expr>),
    Throw(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}
