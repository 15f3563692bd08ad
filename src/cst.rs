//! Concrete-parse-tree contract.
//!
//! The textual grammar is tokenized and parsed by an external collaborator;
//! this module defines the node types that collaborator produces and the
//! semantic builder consumes. Nothing in this crate reads source text.

use crate::types::Precision;

/// Source position attached to every node, carried into diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub fn new(line: u32, col: u32) -> Span {
        Span { line, col }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Root of one parsed shader program.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderTree {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Vertex,
    Fragment,
}

/// A type clause as written: a name plus qualifiers, unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    pub name: String,
    pub precision: Option<Precision>,
    pub is_const: bool,
    pub array_len: Option<ExprNode>,
    pub span: Span,
}

impl TypeNode {
    pub fn named(name: &str, span: Span) -> TypeNode {
        TypeNode {
            name: name.to_string(),
            precision: None,
            is_const: false,
            array_len: None,
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Uniform {
        ty: TypeNode,
        name: String,
        binding: u32,
        span: Span,
    },
    Property {
        ty: TypeNode,
        name: String,
        span: Span,
    },
    Output {
        ty: TypeNode,
        name: String,
        span: Span,
    },
    Global(DeclNode),
    Function {
        name: String,
        ret: TypeNode,
        params: Vec<ParamNode>,
        body: Vec<StmtNode>,
        span: Span,
    },
    Stage {
        kind: StageKind,
        params: Vec<StageParamNode>,
        body: Vec<StmtNode>,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamNode {
    pub ty: TypeNode,
    pub name: String,
    pub span: Span,
}

/// Stage parameter: an attribute (vertex stage) or varying (fragment stage).
/// `location` is an explicit layout id, -1 meaning unspecified. `available`
/// conditionally removes the parameter at generation time.
#[derive(Debug, Clone, PartialEq)]
pub struct StageParamNode {
    pub ty: TypeNode,
    pub name: String,
    pub location: i32,
    pub available: Option<ExprNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclNode {
    pub ty: TypeNode,
    pub name: String,
    pub init: Option<ExprNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtNode {
    Block(Vec<StmtNode>, Span),
    If {
        cond: ExprNode,
        then: Box<StmtNode>,
        otherwise: Option<Box<StmtNode>>,
        span: Span,
    },
    Loop {
        index: String,
        from: ExprNode,
        to: ExprNode,
        body: Box<StmtNode>,
        span: Span,
    },
    Decl(DeclNode),
    Return(Option<ExprNode>, Span),
    Expr(ExprNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub kind: ExprKindNode,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKindNode {
    Bool(bool),
    Int(i64),
    Float(f64),
    Ident(String),
    Member(Box<ExprNode>, String),
    Index(Box<ExprNode>, Box<ExprNode>),
    Unary(String, Box<ExprNode>),
    Binary(String, Box<ExprNode>, Box<ExprNode>),
    Ternary(Box<ExprNode>, Box<ExprNode>, Box<ExprNode>),
    Assign(Box<ExprNode>, Box<ExprNode>),
    Call(String, Vec<ExprNode>),
    ArrayLit(Vec<ExprNode>),
}

impl ExprNode {
    pub fn new(kind: ExprKindNode, span: Span) -> ExprNode {
        ExprNode { kind, span }
    }
}
