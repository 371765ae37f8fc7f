//! Syntax tree consumed by the step-function analysis.
//!
//! The tree is a closed set of enums covering the declarations, statements and
//! expressions the analysis understands. Syntax the analysis does not care about
//! is lowered to [`ExprKind::Opaque`] so every match over these types stays
//! exhaustive.

use std::path::PathBuf;

/// Byte range of a node inside its source file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A parsed source file reduced to what the recognizer needs.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    pub imports: Vec<Import>,
    pub decls: Vec<FuncDecl>,
}

impl SourceFile {
    /// Verbatim source text of `span`, cut to `max_len` bytes with a trailing `...`.
    pub fn excerpt(&self, span: Span, max_len: usize) -> String {
        let end = span.end.min(self.source.len());
        let start = span.start.min(end);

        if end - start > max_len {
            let cut = floor_char_boundary(&self.source, start + max_len);
            return format!("{}...", &self.source[start..cut.max(start)]);
        }
        self.source
            .get(start..end)
            .map(str::to_string)
            .unwrap_or_default()
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    /// Explicit local name (`alias "path"`), including `.` and `_`.
    pub name: Option<String>,
    pub path: String,
}

/// A function or method declaration.
#[derive(Clone, Debug)]
pub struct FuncDecl {
    pub name: String,
    /// Receiver field list; `None` for plain functions.
    pub receiver: Option<Vec<Field>>,
    pub params: Vec<Field>,
    pub results: Vec<Field>,
    pub body: Option<Vec<Stmt>>,
    pub span: Span,
}

/// One entry of a parameter, result or receiver list. A field may declare
/// several names sharing one type (`a, b int`) or none at all.
#[derive(Clone, Debug)]
pub struct Field {
    pub names: Vec<String>,
    pub ty: Expr,
    pub variadic: bool,
}

impl Field {
    pub fn new(names: Vec<String>, ty: Expr) -> Self {
        Self {
            names,
            ty,
            variadic: false,
        }
    }

    pub fn first_name(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }
}

#[derive(Clone, Debug)]
pub struct FuncLit {
    pub params: Vec<Field>,
    pub results: Vec<Field>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Ident(String),
    Selector {
        operand: Box<Expr>,
        field: String,
    },
    Call {
        function: Box<Expr>,
        args: Vec<Expr>,
    },
    CompositeLit {
        ty: Option<Box<Expr>>,
        elements: Vec<Expr>,
    },
    /// `key: value` element of a composite literal.
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Pointer type or dereference.
    Star(Box<Expr>),
    Paren(Box<Expr>),
    Index {
        operand: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        operand: Box<Expr>,
    },
    TypeAssert {
        operand: Box<Expr>,
        ty: Option<Box<Expr>>,
    },
    FuncLit(Box<FuncLit>),
    BasicLit(String),
    /// Any syntax without analysis meaning (map/chan/func types, ...).
    Opaque,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `&`
    Addr,
    /// `!`
    Not,
    /// `^`
    Xor,
    /// `-`
    Neg,
    /// `+`
    Plus,
    /// `<-`
    Recv,
}

impl UnaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "&" => Some(Self::Addr),
            "!" => Some(Self::Not),
            "^" => Some(Self::Xor),
            "-" => Some(Self::Neg),
            "+" => Some(Self::Plus),
            "<-" => Some(Self::Recv),
            _ => None,
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Ident(name.into()), Span::default())
    }

    pub fn opaque(span: Span) -> Self {
        Self::new(ExprKind::Opaque, span)
    }

    /// Splits `x.sel` or `sel` into its qualifier and name.
    ///
    /// Returns `("", "")` for anything else, and `("", sel)` when the operand
    /// of a selector is not a plain identifier.
    pub fn selector_parts(&self) -> (&str, &str) {
        match &self.kind {
            ExprKind::Selector { operand, field } => match &operand.kind {
                ExprKind::Ident(x) => (x.as_str(), field.as_str()),
                _ => ("", field.as_str()),
            },
            ExprKind::Ident(name) => ("", name.as_str()),
            _ => ("", ""),
        }
    }

    /// Like [`Expr::selector_parts`], but looks through a single pointer star.
    pub fn type_parts(&self) -> (&str, &str) {
        match &self.kind {
            ExprKind::Star(inner) => inner.selector_parts(),
            ExprKind::Selector { .. } => self.selector_parts(),
            _ => ("", ""),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

#[derive(Clone, Debug)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub values: Vec<Expr>,
}

#[derive(Clone, Debug)]
pub enum Decl {
    Const(Vec<ValueSpec>),
    Var(Vec<ValueSpec>),
    Type(Vec<String>),
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Decl(Decl),
    Expr(Expr),
    Assign {
        lhs: Vec<Expr>,
        rhs: Vec<Expr>,
    },
    Return(Vec<Expr>),
    Branch(BranchKind),
    If {
        cond: Expr,
        body: Vec<Stmt>,
        alternative: Option<Box<Stmt>>,
    },
    /// Expression switch; `body` holds [`Stmt::CaseClause`] entries.
    Switch {
        body: Vec<Stmt>,
    },
    TypeSwitch {
        body: Vec<Stmt>,
    },
    CaseClause {
        list: Vec<Expr>,
        body: Vec<Stmt>,
    },
    For {
        body: Vec<Stmt>,
    },
    Range {
        body: Vec<Stmt>,
    },
    /// `body` holds [`Stmt::CommClause`] entries.
    Select {
        body: Vec<Stmt>,
    },
    CommClause {
        comm: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    Labeled {
        label: String,
        stmt: Box<Stmt>,
    },
    Defer(Expr),
    Go(Expr),
    Send {
        channel: Expr,
        value: Expr,
    },
    IncDec(Expr),
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(source: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from("test.go"),
            source: source.to_string(),
            imports: vec![],
            decls: vec![],
        }
    }

    #[test]
    fn test_excerpt_short_span_is_verbatim() {
        let f = file("if a && b {}");
        assert_eq!(f.excerpt(Span::new(3, 9), 30), "a && b");
    }

    #[test]
    fn test_excerpt_long_span_is_cut() {
        let f = file("abcdefghijklmnop");
        assert_eq!(f.excerpt(Span::new(0, 16), 4), "abcd...");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let f = file("ééééé");
        assert_eq!(f.excerpt(Span::new(0, 10), 3), "é...");
    }

    #[test]
    fn test_selector_parts() {
        let sel = Expr::new(
            ExprKind::Selector {
                operand: Box::new(Expr::ident("smachine")),
                field: "StateUpdate".into(),
            },
            Span::default(),
        );
        assert_eq!(sel.selector_parts(), ("smachine", "StateUpdate"));
        assert_eq!(Expr::ident("x").selector_parts(), ("", "x"));
        assert_eq!(Expr::opaque(Span::default()).selector_parts(), ("", ""));
    }

    #[test]
    fn test_type_parts_looks_through_pointer() {
        let ptr = Expr::new(ExprKind::Star(Box::new(Expr::ident("MySM"))), Span::default());
        assert_eq!(ptr.type_parts(), ("", "MySM"));
        assert_eq!(Expr::ident("MySM").type_parts(), ("", ""));
    }
}
