//! Semantic builder: concrete parse tree in, resolved AST out.
//!
//! Performs name resolution against the scope arena and type checking by
//! exact-signature lookup as it walks the tree. Every failure is terminal
//! and carries the offending name or signature plus its source span.

use crate::ast::{
    CompiledShader, Expression, FunctionSignature, OutputSignature, Property, ShaderContext,
    ShaderFunction, ShaderParameter, Statement, Uniform, UserFunction,
};
use crate::cst::{
    DeclNode, ExprKindNode, ExprNode, Item, ShaderTree, Span, StageKind, StageParamNode, StmtNode,
    TypeNode,
};
use crate::error::Result;
use crate::scope::{ScopeArena, ScopeId};
use crate::simplify::{simplify, Bindings};
use crate::stdlib::{swizzle_type, FunctionKey, STDLIB};
use crate::types::{BaseType, Type};
use crate::{bail_dup_at, bail_sig_at, bail_type_at, bail_undef_at};
use log::{debug, trace};
use std::collections::HashMap;

/// Name of the vertex-stage output position, pre-declared in the root
/// scope; the generator binds it to the dialect's built-in.
pub const VERTEX_POSITION: &str = "out_Position";

/// Name of the fragment-stage input coordinate, pre-declared read-only.
pub const FRAGMENT_COORD: &str = "in_FragCoord";

const CONDITION_OPS: [&str; 8] = ["==", "!=", "<", "<=", ">", ">=", "&&", "||"];

pub struct ShaderBuilder {
    scopes: ScopeArena,
    signatures: HashMap<FunctionKey, FunctionSignature>,
    functions: Vec<UserFunction>,
    globals: Vec<Statement>,
    vertex: Option<ShaderFunction>,
    fragment: Option<ShaderFunction>,
    fragment_scope: Option<ScopeId>,
    output: Option<OutputSignature>,
    uniforms: Vec<Option<Uniform>>,
    properties: Vec<Property>,
}

impl ShaderBuilder {
    fn new() -> Self {
        let mut scopes = ScopeArena::new();
        let root = ScopeArena::root();
        scopes.declare(root, VERTEX_POSITION, Type::simple(BaseType::Vector4));
        scopes.declare(root, FRAGMENT_COORD, Type::constant(BaseType::Vector4));

        ShaderBuilder {
            scopes,
            signatures: HashMap::new(),
            functions: Vec::new(),
            globals: Vec::new(),
            vertex: None,
            fragment: None,
            fragment_scope: None,
            output: None,
            uniforms: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Build a resolved shader from one parse tree.
    pub fn build(tree: &ShaderTree) -> Result<CompiledShader> {
        let mut builder = ShaderBuilder::new();
        for item in &tree.items {
            builder.build_item(item)?;
        }

        debug!(
            "built shader: {} globals, {} functions, {} uniforms, {} properties",
            builder.globals.len(),
            builder.functions.len(),
            builder.uniforms.iter().flatten().count(),
            builder.properties.len()
        );

        Ok(CompiledShader {
            scopes: builder.scopes,
            globals: builder.globals,
            functions: builder.functions,
            signatures: builder.signatures,
            vertex: builder.vertex,
            fragment: builder.fragment,
            output: builder.output,
            uniforms: builder.uniforms,
            properties: builder.properties,
        })
    }

    fn ctx(&self) -> ShaderContext<'_> {
        ShaderContext {
            scopes: &self.scopes,
            functions: &self.signatures,
        }
    }

    fn expr_type_at(&self, expr: &Expression, span: Span) -> Result<Type> {
        expr.type_of(&self.ctx()).map_err(|e| e.with_span(span))
    }

    fn build_item(&mut self, item: &Item) -> Result<()> {
        let root = ScopeArena::root();
        match item {
            Item::Uniform {
                ty,
                name,
                binding,
                span,
            } => {
                let ty = self.resolve_type(root, ty)?;
                let Some(ident) = self.scopes.declare(root, name, ty) else {
                    bail_dup_at!(*span, "{}", name);
                };
                let slot = *binding as usize;
                if self.uniforms.len() <= slot {
                    self.uniforms.resize(slot + 1, None);
                }
                if self.uniforms[slot].is_some() {
                    bail_dup_at!(*span, "uniform binding {} ('{}')", binding, name);
                }
                self.uniforms[slot] = Some(Uniform {
                    ident,
                    binding: slot,
                });
                Ok(())
            }

            Item::Property { ty, name, span } => {
                let ty = self.resolve_type(root, ty)?;
                let Some(ident) = self.scopes.declare(root, name, ty) else {
                    bail_dup_at!(*span, "{}", name);
                };
                self.properties.push(Property { ident });
                Ok(())
            }

            Item::Output { ty, name, span } => {
                if self.output.is_some() {
                    bail_dup_at!(*span, "output signature '{}'", name);
                }
                let ty = self.resolve_type(root, ty)?;
                let Some(ident) = self.scopes.declare(root, name, ty) else {
                    bail_dup_at!(*span, "{}", name);
                };
                self.output = Some(OutputSignature { ident });
                Ok(())
            }

            Item::Global(decl) => {
                let stmt = self.build_decl(root, decl)?;
                self.globals.push(stmt);
                Ok(())
            }

            Item::Function {
                name,
                ret,
                params,
                body,
                span,
            } => self.build_function(name, ret, params, body, *span),

            Item::Stage {
                kind,
                params,
                body,
                span,
            } => self.build_stage(*kind, params, body, *span),
        }
    }

    fn build_function(
        &mut self,
        name: &str,
        ret: &TypeNode,
        params: &[crate::cst::ParamNode],
        body: &[StmtNode],
        span: Span,
    ) -> Result<()> {
        let root = ScopeArena::root();
        let ret_ty = self.resolve_type(root, ret)?;
        let scope = self.scopes.push(root);

        let mut param_types = Vec::new();
        let mut param_idents = Vec::new();
        for p in params {
            let ty = self.resolve_type(scope, &p.ty)?;
            param_types.push(ty.clone());
            let Some(ident) = self.scopes.declare(scope, &p.name, ty) else {
                bail_dup_at!(p.span, "{}", p.name);
            };
            param_idents.push(ident);
        }

        let sig = FunctionSignature {
            name: name.to_string(),
            params: param_types,
            ret: ret_ty.clone(),
        };
        let key = sig.key();
        if self.signatures.contains_key(&key) || STDLIB.resolve(&key).is_some() {
            bail_dup_at!(span, "{}", key);
        }

        // The signature is registered only after the body builds, so a
        // function cannot resolve itself: recursion is not supported.
        let mut statements = Vec::new();
        for stmt in body {
            statements.push(self.build_stmt(scope, stmt, &ret_ty)?);
        }

        self.signatures.insert(key, sig.clone());
        self.functions.push(UserFunction {
            sig,
            param_idents,
            scope,
            body: statements,
        });
        Ok(())
    }

    fn build_stage(
        &mut self,
        kind: StageKind,
        params: &[StageParamNode],
        body: &[StmtNode],
        span: Span,
    ) -> Result<()> {
        let root = ScopeArena::root();
        let scope = match kind {
            StageKind::Fragment => {
                if self.fragment.is_some() {
                    bail_dup_at!(span, "fragment stage");
                }
                self.scopes.push(root)
            }
            StageKind::Vertex => {
                if self.vertex.is_some() {
                    bail_dup_at!(span, "vertex stage");
                }
                // The vertex scope chains on top of the fragment scope so
                // varyings declared there resolve in vertex code.
                let Some(fragment_scope) = self.fragment_scope else {
                    bail_type_at!(span, "vertex stage requires a fragment stage to be declared first");
                };
                self.scopes.push(fragment_scope)
            }
        };

        let mut parameters = Vec::new();
        for p in params {
            let ty = self.resolve_type(scope, &p.ty)?;
            let Some(ident) = self.scopes.declare(scope, &p.name, ty) else {
                bail_dup_at!(p.span, "{}", p.name);
            };
            let available = match &p.available {
                Some(node) => {
                    let expr = self.build_expr(scope, node)?;
                    let ty = self.expr_type_at(&expr, node.span)?;
                    if ty.base != BaseType::Boolean {
                        bail_type_at!(
                            node.span,
                            "availability of '{}' must be boolean, found {}",
                            p.name,
                            ty.base
                        );
                    }
                    expr
                }
                None => Expression::BoolLiteral(true),
            };
            parameters.push(ShaderParameter {
                ident,
                location: p.location,
                available,
            });
        }

        let void = Type::simple(BaseType::Void);
        let mut statements = Vec::new();
        for stmt in body {
            statements.push(self.build_stmt(scope, stmt, &void)?);
        }

        let stage = ShaderFunction {
            scope,
            params: parameters,
            body: statements,
        };
        match kind {
            StageKind::Fragment => {
                self.fragment_scope = Some(scope);
                self.fragment = Some(stage);
            }
            StageKind::Vertex => self.vertex = Some(stage),
        }
        Ok(())
    }

    fn resolve_type(&mut self, scope: ScopeId, node: &TypeNode) -> Result<Type> {
        let Some(base) = BaseType::from_name(&node.name) else {
            bail_type_at!(node.span, "unknown type '{}'", node.name);
        };

        let array_len = match &node.array_len {
            Some(len_node) => {
                let expr = self.build_expr(scope, len_node)?;
                let ty = self.expr_type_at(&expr, len_node.span)?;
                if ty.base != BaseType::Int {
                    bail_type_at!(len_node.span, "array length must be int, found {}", ty.base);
                }
                match simplify(&expr, &Bindings::new()) {
                    Expression::IntLiteral(n) if n >= 0 => {
                        Some(Box::new(Expression::IntLiteral(n)))
                    }
                    Expression::IntLiteral(n) => {
                        bail_type_at!(len_node.span, "array length must be non-negative, found {}", n)
                    }
                    _ => bail_type_at!(len_node.span, "array length must be a compile-time constant"),
                }
            }
            None => None,
        };

        Ok(Type {
            base,
            is_const: node.is_const,
            precision: node.precision,
            array_len,
        })
    }

    fn build_decl(&mut self, scope: ScopeId, decl: &DeclNode) -> Result<Statement> {
        let ty = self.resolve_type(scope, &decl.ty)?;

        // The initializer builds before the name is declared, so a
        // declaration cannot reference itself.
        let init = match &decl.init {
            Some(node) => {
                let expr = self.build_expr(scope, node)?;
                let init_ty = self.expr_type_at(&expr, node.span)?;
                if init_ty.base != ty.base || init_ty.is_array() != ty.is_array() {
                    bail_type_at!(
                        node.span,
                        "cannot initialize '{}': expected {}, found {}",
                        decl.name,
                        ty,
                        init_ty
                    );
                }
                if ty.is_array() && init_ty.folded_len() != ty.folded_len() {
                    bail_type_at!(
                        node.span,
                        "array initializer for '{}' has wrong length",
                        decl.name
                    );
                }
                Some(expr)
            }
            None => None,
        };

        let is_array = ty.is_array();
        let Some(ident) = self.scopes.declare(scope, &decl.name, ty) else {
            bail_dup_at!(decl.span, "{}", decl.name);
        };

        Ok(if is_array {
            Statement::DeclareArray { ident, init }
        } else {
            Statement::Declare { ident, init }
        })
    }

    fn build_stmt(&mut self, scope: ScopeId, node: &StmtNode, ret: &Type) -> Result<Statement> {
        match node {
            StmtNode::Block(stmts, _) => {
                let inner = self.scopes.push(scope);
                let mut out = Vec::new();
                for s in stmts {
                    out.push(self.build_stmt(inner, s, ret)?);
                }
                Ok(Statement::Block(out))
            }

            StmtNode::If {
                cond,
                then,
                otherwise,
                span,
            } => {
                let cond_expr = self.build_expr(scope, cond)?;
                let cond_ty = self.expr_type_at(&cond_expr, cond.span)?;
                if cond_ty.base != BaseType::Boolean {
                    bail_type_at!(*span, "if condition must be boolean, found {}", cond_ty.base);
                }
                let then = Box::new(self.build_stmt(scope, then, ret)?);
                let otherwise = match otherwise {
                    Some(s) => Some(Box::new(self.build_stmt(scope, s, ret)?)),
                    None => None,
                };
                Ok(Statement::If {
                    cond: cond_expr,
                    then,
                    otherwise,
                })
            }

            StmtNode::Loop {
                index,
                from,
                to,
                body,
                span,
            } => {
                let from = self.build_loop_bound(scope, from)?;
                let to = self.build_loop_bound(scope, to)?;

                let inner = self.scopes.push(scope);
                let Some(ident) = self.scopes.declare(inner, index, Type::constant(BaseType::Int))
                else {
                    bail_dup_at!(*span, "{}", index);
                };
                let body = Box::new(self.build_stmt(inner, body, ret)?);
                Ok(Statement::Loop {
                    index: ident,
                    from,
                    to,
                    body,
                })
            }

            StmtNode::Decl(decl) => self.build_decl(scope, decl),

            StmtNode::Return(value, span) => {
                let value = match value {
                    Some(node) => Some(self.build_expr(scope, node)?),
                    None => None,
                };
                match (&value, ret.base) {
                    (None, BaseType::Void) => {}
                    (None, expected) => {
                        bail_type_at!(*span, "expected a return value of type {}", expected)
                    }
                    (Some(_), BaseType::Void) => {
                        bail_type_at!(*span, "cannot return a value here")
                    }
                    (Some(expr), expected) => {
                        let ty = self.expr_type_at(expr, *span)?;
                        if ty.base != expected {
                            bail_type_at!(*span, "return type mismatch: expected {}, found {}", expected, ty.base);
                        }
                    }
                }
                Ok(Statement::Return(value))
            }

            StmtNode::Expr(node) => Ok(Statement::Expr(self.build_expr(scope, node)?)),
        }
    }

    /// Loop bounds must reduce to integer literals at build time.
    fn build_loop_bound(&mut self, scope: ScopeId, node: &ExprNode) -> Result<Expression> {
        let expr = self.build_expr(scope, node)?;
        let ty = self.expr_type_at(&expr, node.span)?;
        if ty.base != BaseType::Int {
            bail_type_at!(node.span, "loop bound must be int, found {}", ty.base);
        }
        match simplify(&expr, &Bindings::new()) {
            lit @ Expression::IntLiteral(_) => Ok(lit),
            _ => bail_type_at!(node.span, "loop bound must be a compile-time constant"),
        }
    }

    fn build_expr(&mut self, scope: ScopeId, node: &ExprNode) -> Result<Expression> {
        let span = node.span;
        match &node.kind {
            ExprKindNode::Bool(b) => Ok(Expression::BoolLiteral(*b)),
            ExprKindNode::Int(n) => Ok(Expression::IntLiteral(*n)),
            ExprKindNode::Float(f) => Ok(Expression::FloatLiteral(*f)),

            ExprKindNode::Ident(name) => match self.scopes.lookup(scope, name) {
                Some(id) => {
                    trace!("resolved '{}' in scope {:?}", name, scope);
                    Ok(Expression::Ref(id))
                }
                None => bail_undef_at!(span, "{}", name),
            },

            ExprKindNode::Member(recv, name) => {
                let recv = self.build_expr(scope, recv)?;
                let recv_ty = self.expr_type_at(&recv, span)?;
                if swizzle_type(recv_ty.base, name).is_none() {
                    bail_type_at!(span, "no member '{}' on {}", name, recv_ty.base);
                }
                Ok(Expression::Member {
                    recv: Box::new(recv),
                    name: name.clone(),
                })
            }

            ExprKindNode::Index(recv, index) => {
                let recv = self.build_expr(scope, recv)?;
                let index = self.build_expr(scope, index)?;
                let index_ty = self.expr_type_at(&index, span)?;
                if index_ty.base != BaseType::Int {
                    bail_type_at!(span, "index must be int, found {}", index_ty.base);
                }
                let expr = Expression::Index {
                    recv: Box::new(recv),
                    index: Box::new(index),
                };
                // Validates that the receiver is indexable at all.
                self.expr_type_at(&expr, span)?;
                Ok(expr)
            }

            ExprKindNode::Unary(op, operand) => {
                let operand = self.build_expr(scope, operand)?;
                let operand_ty = self.expr_type_at(&operand, span)?;
                let key = FunctionKey::new(op.clone(), vec![operand_ty.base]);
                if STDLIB.resolve(&key).is_none() {
                    bail_sig_at!(span, "{}", key);
                }
                Ok(Expression::Unary {
                    key,
                    operand: Box::new(operand),
                })
            }

            ExprKindNode::Binary(op, lhs, rhs) => {
                let lhs = self.build_expr(scope, lhs)?;
                let rhs = self.build_expr(scope, rhs)?;
                let lhs_ty = self.expr_type_at(&lhs, span)?;
                let rhs_ty = self.expr_type_at(&rhs, span)?;
                let key = FunctionKey::new(op.clone(), vec![lhs_ty.base, rhs_ty.base]);
                if STDLIB.resolve(&key).is_none() {
                    bail_sig_at!(span, "{}", key);
                }
                let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
                Ok(if CONDITION_OPS.contains(&op.as_str()) {
                    Expression::Condition { key, lhs, rhs }
                } else {
                    Expression::Binary { key, lhs, rhs }
                })
            }

            ExprKindNode::Ternary(cond, then, otherwise) => {
                let cond = self.build_expr(scope, cond)?;
                let cond_ty = self.expr_type_at(&cond, span)?;
                if cond_ty.base != BaseType::Boolean {
                    bail_type_at!(span, "ternary condition must be boolean, found {}", cond_ty.base);
                }
                let then = self.build_expr(scope, then)?;
                let otherwise = self.build_expr(scope, otherwise)?;
                let then_ty = self.expr_type_at(&then, span)?;
                let other_ty = self.expr_type_at(&otherwise, span)?;
                if then_ty.base != other_ty.base {
                    bail_type_at!(
                        span,
                        "ternary branches disagree: {} vs {}",
                        then_ty.base,
                        other_ty.base
                    );
                }
                Ok(Expression::Ternary {
                    cond: Box::new(cond),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                })
            }

            ExprKindNode::Assign(target, value) => {
                let target = self.build_expr(scope, target)?;
                self.check_assignable(&target, span)?;
                let value = self.build_expr(scope, value)?;
                let target_ty = self.expr_type_at(&target, span)?;
                let value_ty = self.expr_type_at(&value, span)?;
                if target_ty.base != value_ty.base {
                    bail_type_at!(
                        span,
                        "cannot assign {} to {}",
                        value_ty.base,
                        target_ty.base
                    );
                }
                Ok(Expression::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                })
            }

            ExprKindNode::Call(name, args) => {
                let mut built = Vec::new();
                let mut params = Vec::new();
                for arg in args {
                    let expr = self.build_expr(scope, arg)?;
                    params.push(self.expr_type_at(&expr, arg.span)?.base);
                    built.push(expr);
                }
                let key = FunctionKey::new(name.clone(), params);
                if !self.signatures.contains_key(&key) && STDLIB.resolve(&key).is_none() {
                    bail_sig_at!(span, "{}", key);
                }
                Ok(Expression::Call { key, args: built })
            }

            ExprKindNode::ArrayLit(elems) => {
                if elems.is_empty() {
                    bail_type_at!(span, "array literal cannot be empty");
                }
                let mut built = Vec::new();
                for e in elems {
                    built.push(self.build_expr(scope, e)?);
                }
                let first = self.expr_type_at(&built[0], span)?;
                for (expr, node) in built.iter().zip(elems) {
                    let ty = self.expr_type_at(expr, node.span)?;
                    if ty.base != first.base {
                        bail_type_at!(
                            node.span,
                            "array literal elements disagree: {} vs {}",
                            first.base,
                            ty.base
                        );
                    }
                }
                Ok(Expression::ArrayLiteral(built))
            }
        }
    }

    /// An assignment target must bottom out in a non-const identifier.
    fn check_assignable(&self, target: &Expression, span: Span) -> Result<()> {
        match target {
            Expression::Ref(id) => {
                let ident = self.scopes.ident(*id);
                if ident.ty.is_const {
                    bail_type_at!(span, "cannot assign to const '{}'", ident.name);
                }
                Ok(())
            }
            Expression::Member { recv, .. } | Expression::Index { recv, .. } => {
                self.check_assignable(recv, span)
            }
            _ => bail_type_at!(span, "invalid assignment target"),
        }
    }
}
