//! Resolved AST.
//!
//! Nodes reference identifiers by handle into the shader's scope arena and
//! carry resolved signature keys, so type queries are pure lookups and code
//! generation never re-resolves names.

use crate::error::Result;
use crate::scope::{IdentId, ScopeArena, ScopeId};
use crate::stdlib::{swizzle_type, FunctionKey, STDLIB};
use crate::types::{BaseType, Type};
use crate::{bail_type, bail_sig};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    BoolLiteral(bool),
    IntLiteral(i64),
    FloatLiteral(f64),
    Ref(IdentId),
    Member {
        recv: Box<Expression>,
        name: String,
    },
    Index {
        recv: Box<Expression>,
        index: Box<Expression>,
    },
    Unary {
        key: FunctionKey,
        operand: Box<Expression>,
    },
    /// Comparison and logical binaries.
    Condition {
        key: FunctionKey,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// Arithmetic and bitwise binaries.
    Binary {
        key: FunctionKey,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Ternary {
        cond: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },
    Assign {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    Call {
        key: FunctionKey,
        args: Vec<Expression>,
    },
    ArrayLiteral(Vec<Expression>),
    /// Backend text splice; used by the generator to bind dialect
    /// built-in names.
    Raw {
        text: String,
        ty: BaseType,
    },
    Void,
}

impl Expression {
    /// Pure type query. Resolution already happened at build time, so this
    /// only consults the arenas and the signature tables.
    pub fn type_of(&self, ctx: &ShaderContext) -> Result<Type> {
        match self {
            Expression::BoolLiteral(_) => Ok(Type::simple(BaseType::Boolean)),
            Expression::IntLiteral(_) => Ok(Type::simple(BaseType::Int)),
            Expression::FloatLiteral(_) => Ok(Type::simple(BaseType::Float)),

            Expression::Ref(id) => Ok(ctx.scopes.ident(*id).ty.clone()),

            Expression::Member { recv, name } => {
                let recv_ty = recv.type_of(ctx)?;
                match swizzle_type(recv_ty.base, name) {
                    Some(base) => Ok(Type::simple(base)),
                    None => bail_type!("no member '{}' on {}", name, recv_ty.base),
                }
            }

            Expression::Index { recv, .. } => {
                let recv_ty = recv.type_of(ctx)?;
                if recv_ty.is_array() {
                    return Ok(Type::simple(recv_ty.base));
                }
                if let Some(scalar) = recv_ty.base.component_scalar() {
                    return Ok(Type::simple(scalar));
                }
                match recv_ty.base {
                    BaseType::Matrix2 => Ok(Type::simple(BaseType::Vector2)),
                    BaseType::Matrix3 => Ok(Type::simple(BaseType::Vector3)),
                    BaseType::Matrix4 => Ok(Type::simple(BaseType::Vector4)),
                    other => bail_type!("{} is not indexable", other),
                }
            }

            Expression::Unary { key, .. }
            | Expression::Condition { key, .. }
            | Expression::Binary { key, .. }
            | Expression::Call { key, .. } => ctx.signature_return(key),

            Expression::Ternary { then, .. } => then.type_of(ctx),

            Expression::Assign { value, .. } => value.type_of(ctx),

            Expression::ArrayLiteral(elems) => match elems.first() {
                Some(first) => {
                    let elem_ty = first.type_of(ctx)?;
                    Ok(Type {
                        base: elem_ty.base,
                        is_const: false,
                        precision: None,
                        array_len: Some(Box::new(Expression::IntLiteral(elems.len() as i64))),
                    })
                }
                None => bail_type!("empty array literal has no type"),
            },

            Expression::Raw { ty, .. } => Ok(Type::simple(*ty)),

            Expression::Void => Ok(Type::simple(BaseType::Void)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Block(Vec<Statement>),
    If {
        cond: Expression,
        then: Box<Statement>,
        otherwise: Option<Box<Statement>>,
    },
    /// Fixed-bound loop over `[from, to)`. Not a runtime construct: the
    /// generator unrolls it, substituting `index` with each literal value.
    Loop {
        index: IdentId,
        from: Expression,
        to: Expression,
        body: Box<Statement>,
    },
    Declare {
        ident: IdentId,
        init: Option<Expression>,
    },
    DeclareArray {
        ident: IdentId,
        init: Option<Expression>,
    },
    Return(Option<Expression>),
    Expr(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
}

impl FunctionSignature {
    pub fn key(&self) -> FunctionKey {
        FunctionKey::new(
            self.name.clone(),
            self.params.iter().map(|t| t.base).collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserFunction {
    pub sig: FunctionSignature,
    pub param_idents: Vec<IdentId>,
    pub scope: ScopeId,
    pub body: Vec<Statement>,
}

/// Stage input: attribute (vertex) or varying (fragment). `location` is an
/// explicit layout id, -1 meaning auto; `available` decides at generation
/// time whether the parameter is emitted at all.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderParameter {
    pub ident: IdentId,
    pub location: i32,
    pub available: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderFunction {
    pub scope: ScopeId,
    pub params: Vec<ShaderParameter>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub ident: IdentId,
    pub binding: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub ident: IdentId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSignature {
    pub ident: IdentId,
}

/// Read-only view the type queries and the generator work against.
pub struct ShaderContext<'a> {
    pub scopes: &'a ScopeArena,
    pub functions: &'a HashMap<FunctionKey, FunctionSignature>,
}

impl ShaderContext<'_> {
    /// Return type of an exact signature: user functions first, then the
    /// built-in table.
    pub fn signature_return(&self, key: &FunctionKey) -> Result<Type> {
        if let Some(sig) = self.functions.get(key) {
            return Ok(sig.ret.clone());
        }
        if let Some(def) = STDLIB.resolve(key) {
            return Ok(Type::simple(def.ret));
        }
        bail_sig!("{}", key)
    }
}

/// The root compilation artifact: built once by the semantic builder,
/// immutable afterwards, read by any number of concurrent generation calls.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    pub scopes: ScopeArena,
    pub globals: Vec<Statement>,
    pub functions: Vec<UserFunction>,
    pub signatures: HashMap<FunctionKey, FunctionSignature>,
    pub vertex: Option<ShaderFunction>,
    pub fragment: Option<ShaderFunction>,
    pub output: Option<OutputSignature>,
    pub uniforms: Vec<Option<Uniform>>,
    pub properties: Vec<Property>,
}

impl CompiledShader {
    pub fn context(&self) -> ShaderContext<'_> {
        ShaderContext {
            scopes: &self.scopes,
            functions: &self.signatures,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| self.scopes.ident(p.ident).name == name)
    }

    /// Declared uniforms in binding order, holes skipped.
    pub fn uniforms(&self) -> impl Iterator<Item = &Uniform> {
        self.uniforms.iter().flatten()
    }
}
