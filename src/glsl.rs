//! GLSL code generation backend.
//!
//! Walks a resolved `CompiledShader` and emits vertex and fragment source
//! text for one target dialect. A generator instance holds per-call
//! mutable state (output buffer, live identifier bindings) and must not be
//! shared across concurrent calls; the shader itself is read-only and may
//! be generated from by many threads at once.

use crate::ast::{
    CompiledShader, Expression, ShaderContext, ShaderParameter, Statement, UserFunction,
};
use crate::bail_gen;
use crate::builder::{FRAGMENT_COORD, VERTEX_POSITION};
use crate::cst::StageKind;
use crate::error::Result;
use crate::scope::ScopeArena;
use crate::simplify::{simplify, Bindings};
use crate::stdlib::{FunctionKey, Render, STDLIB};
use crate::types::{BaseType, Precision, Type};
use log::debug;
use std::collections::HashMap;
use std::fmt::Write;

/// Target GLSL profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Desktop profile, `#version 330`.
    Gl330,
    /// Embedded profile, `#version 300 es`.
    Gles300,
}

impl Dialect {
    fn version_line(self) -> &'static str {
        match self {
            Dialect::Gl330 => "#version 330",
            Dialect::Gles300 => "#version 300 es",
        }
    }
}

/// Property values supplied by the caller, one expression per declared
/// property name.
pub type PropertyBindings = HashMap<String, Expression>;

#[derive(Debug, Clone)]
pub struct GlslOutput {
    pub vertex: String,
    pub fragment: String,
}

pub struct Generator {
    dialect: Dialect,
    out: String,
    indent: usize,
    bindings: Bindings,
}

impl Generator {
    pub fn new(dialect: Dialect) -> Self {
        Generator {
            dialect,
            out: String::new(),
            indent: 0,
            bindings: Bindings::new(),
        }
    }

    /// Emit both stage texts. Fails without partial output if a property
    /// is unbound or mistyped, or the shader has no fragment stage.
    pub fn generate(
        &mut self,
        shader: &CompiledShader,
        props: &PropertyBindings,
    ) -> Result<GlslOutput> {
        if shader.fragment.is_none() {
            bail_gen!("shader has no fragment stage");
        }

        self.bindings = self.bind_all(shader, props)?;

        let vertex = match &shader.vertex {
            Some(_) => self.emit_stage(shader, StageKind::Vertex)?,
            None => String::new(),
        };
        let fragment = self.emit_stage(shader, StageKind::Fragment)?;

        Ok(GlslOutput { vertex, fragment })
    }

    /// Pre-bind the dialect built-ins and the caller's property values so
    /// ordinary identifier rendering resolves them.
    fn bind_all(&self, shader: &CompiledShader, props: &PropertyBindings) -> Result<Bindings> {
        let mut bindings = Bindings::new();
        let ctx = shader.context();
        let root = ScopeArena::root();

        for (name, builtin) in [(VERTEX_POSITION, "gl_Position"), (FRAGMENT_COORD, "gl_FragCoord")]
        {
            if let Some(id) = shader.scopes.lookup(root, name) {
                bindings.insert(
                    id,
                    Expression::Raw {
                        text: builtin.to_string(),
                        ty: BaseType::Vector4,
                    },
                );
            }
        }

        for prop in &shader.properties {
            let ident = shader.scopes.ident(prop.ident);
            let Some(value) = props.get(&ident.name) else {
                bail_gen!("no value bound for property '{}'", ident.name);
            };
            let value_ty = value.type_of(&ctx)?;
            if value_ty.base != ident.ty.base {
                bail_gen!(
                    "property '{}' expects {}, got {}",
                    ident.name,
                    ident.ty.base,
                    value_ty.base
                );
            }
            bindings.insert(prop.ident, simplify(value, &bindings));
        }

        Ok(bindings)
    }

    fn emit_stage(&mut self, shader: &CompiledShader, stage: StageKind) -> Result<String> {
        debug!("emitting {:?} stage for {:?}", stage, self.dialect);
        self.out.clear();
        self.indent = 0;

        let version = self.dialect.version_line();
        writeln!(self.out, "{}", version).unwrap();
        if self.dialect == Dialect::Gles300 {
            writeln!(self.out, "precision highp float;").unwrap();
            writeln!(self.out, "precision highp int;").unwrap();
        }
        writeln!(self.out).unwrap();

        for uniform in shader.uniforms() {
            let ident = shader.scopes.ident(uniform.ident);
            let decl = self.declare_text(&ident.ty, &ident.name);
            writeln!(self.out, "uniform {};", decl).unwrap();
        }

        self.emit_stage_io(shader, stage)?;
        writeln!(self.out).unwrap();

        let ctx = shader.context();
        for stmt in &shader.globals {
            self.emit_stmt(stmt, &ctx)?;
        }
        for func in &shader.functions {
            self.emit_function(func, &ctx)?;
        }

        let body = match stage {
            StageKind::Vertex => shader.vertex.as_ref(),
            StageKind::Fragment => shader.fragment.as_ref(),
        };
        writeln!(self.out, "void main() {{").unwrap();
        self.indent += 1;
        if let Some(stage_fn) = body {
            for stmt in &stage_fn.body {
                self.emit_stmt(stmt, &ctx)?;
            }
        }
        self.indent -= 1;
        writeln!(self.out, "}}").unwrap();

        Ok(std::mem::take(&mut self.out))
    }

    /// Stage inputs and outputs, in declaration order, honoring
    /// availability expressions.
    fn emit_stage_io(&mut self, shader: &CompiledShader, stage: StageKind) -> Result<()> {
        match stage {
            StageKind::Vertex => {
                let vertex = shader.vertex.as_ref().unwrap();
                for param in &vertex.params {
                    if !self.param_available(param) {
                        continue;
                    }
                    let ident = shader.scopes.ident(param.ident);
                    // Explicit layout locations are a desktop-profile
                    // spelling; the embedded profile binds by name.
                    let layout = match (self.dialect, param.location) {
                        (Dialect::Gl330, loc) if loc >= 0 => format!("layout(location = {}) ", loc),
                        _ => String::new(),
                    };
                    let decl = self.declare_text(&ident.ty, &ident.name);
                    writeln!(self.out, "{}in {};", layout, decl).unwrap();
                }
                // Varyings: the fragment stage's inputs are this stage's
                // outputs.
                if let Some(fragment) = &shader.fragment {
                    for param in &fragment.params {
                        if !self.param_available(param) {
                            continue;
                        }
                        let ident = shader.scopes.ident(param.ident);
                        let decl = self.declare_text(&ident.ty, &ident.name);
                        writeln!(self.out, "out {};", decl).unwrap();
                    }
                }
            }
            StageKind::Fragment => {
                let fragment = shader.fragment.as_ref().unwrap();
                for param in &fragment.params {
                    if !self.param_available(param) {
                        continue;
                    }
                    let ident = shader.scopes.ident(param.ident);
                    let decl = self.declare_text(&ident.ty, &ident.name);
                    writeln!(self.out, "in {};", decl).unwrap();
                }
                if let Some(output) = &shader.output {
                    let ident = shader.scopes.ident(output.ident);
                    let decl = self.declare_text(&ident.ty, &ident.name);
                    writeln!(self.out, "out {};", decl).unwrap();
                }
            }
        }
        Ok(())
    }

    fn param_available(&self, param: &ShaderParameter) -> bool {
        matches!(
            simplify(&param.available, &self.bindings),
            Expression::BoolLiteral(true)
        )
    }

    fn emit_function(&mut self, func: &UserFunction, ctx: &ShaderContext) -> Result<()> {
        let mut header = String::new();
        let ret = self.type_text(&func.sig.ret);
        write!(header, "{} {}(", ret, func.sig.name).unwrap();
        for (i, ident_id) in func.param_idents.iter().enumerate() {
            if i > 0 {
                write!(header, ", ").unwrap();
            }
            let ident = ctx.scopes.ident(*ident_id);
            let decl = self.declare_text(&ident.ty, &ident.name);
            write!(header, "{}", decl).unwrap();
        }
        writeln!(self.out, "{}) {{", header).unwrap();

        self.indent += 1;
        for stmt in &func.body {
            self.emit_stmt(stmt, ctx)?;
        }
        self.indent -= 1;
        writeln!(self.out, "}}").unwrap();
        writeln!(self.out).unwrap();
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Statement, ctx: &ShaderContext) -> Result<()> {
        match stmt {
            Statement::Block(stmts) => {
                let ind = self.indent_str();
                writeln!(self.out, "{}{{", ind).unwrap();
                self.indent += 1;
                for s in stmts {
                    self.emit_stmt(s, ctx)?;
                }
                self.indent -= 1;
                writeln!(self.out, "{}}}", ind).unwrap();
            }

            Statement::If {
                cond,
                then,
                otherwise,
            } => {
                // Constant conditions resolve at generation time: only the
                // live branch is emitted.
                match simplify(cond, &self.bindings) {
                    Expression::BoolLiteral(true) => self.emit_stmt(then, ctx)?,
                    Expression::BoolLiteral(false) => {
                        if let Some(otherwise) = otherwise {
                            self.emit_stmt(otherwise, ctx)?;
                        }
                    }
                    reduced => {
                        let ind = self.indent_str();
                        let cond_text = self.render_expr(&reduced, ctx)?;
                        writeln!(self.out, "{}if ({}) {{", ind, cond_text).unwrap();
                        self.indent += 1;
                        self.emit_stmt(then, ctx)?;
                        self.indent -= 1;
                        match otherwise {
                            Some(otherwise) => {
                                writeln!(self.out, "{}}} else {{", ind).unwrap();
                                self.indent += 1;
                                self.emit_stmt(otherwise, ctx)?;
                                self.indent -= 1;
                                writeln!(self.out, "{}}}", ind).unwrap();
                            }
                            None => writeln!(self.out, "{}}}", ind).unwrap(),
                        }
                    }
                }
            }

            Statement::Loop {
                index,
                from,
                to,
                body,
            } => {
                let from = match simplify(from, &self.bindings) {
                    Expression::IntLiteral(n) => n,
                    other => bail_gen!("loop start did not fold to an integer: {:?}", other),
                };
                let to = match simplify(to, &self.bindings) {
                    Expression::IntLiteral(n) => n,
                    other => bail_gen!("loop end did not fold to an integer: {:?}", other),
                };
                // Unrolled, not a runtime loop: one copy of the body per
                // index value, with the index bound to that literal. Each
                // copy gets its own brace scope so declarations in the
                // body do not collide across iterations.
                for i in from..to {
                    self.bindings.insert(*index, Expression::IntLiteral(i));
                    match body.as_ref() {
                        block @ Statement::Block(_) => self.emit_stmt(block, ctx)?,
                        other => {
                            let ind = self.indent_str();
                            writeln!(self.out, "{}{{", ind).unwrap();
                            self.indent += 1;
                            self.emit_stmt(other, ctx)?;
                            self.indent -= 1;
                            writeln!(self.out, "{}}}", ind).unwrap();
                        }
                    }
                }
                self.bindings.remove(index);
            }

            Statement::Declare { ident, init } => {
                let identifier = ctx.scopes.ident(*ident);
                let ind = self.indent_str();
                let decl = self.declare_text(&identifier.ty, &identifier.name);
                match init {
                    Some(expr) => {
                        let value = self.render_expr(expr, ctx)?;
                        writeln!(self.out, "{}{} = {};", ind, decl, value).unwrap();
                    }
                    None => writeln!(self.out, "{}{};", ind, decl).unwrap(),
                }
            }

            Statement::DeclareArray { ident, init } => {
                let identifier = ctx.scopes.ident(*ident);
                let Some(len) = identifier.ty.folded_len() else {
                    bail_gen!("array length for '{}' was not folded", identifier.name);
                };
                let ind = self.indent_str();
                let elem = glsl_type(identifier.ty.base);
                let prefix = self.qualifier_text(&identifier.ty);
                match init {
                    Some(expr) => {
                        let value = self.render_expr(expr, ctx)?;
                        writeln!(
                            self.out,
                            "{}{}{} {}[{}] = {};",
                            ind, prefix, elem, identifier.name, len, value
                        )
                        .unwrap();
                    }
                    None => {
                        writeln!(self.out, "{}{}{} {}[{}];", ind, prefix, elem, identifier.name, len)
                            .unwrap()
                    }
                }
            }

            Statement::Return(value) => {
                let ind = self.indent_str();
                match value {
                    Some(expr) => {
                        let text = self.render_expr(expr, ctx)?;
                        writeln!(self.out, "{}return {};", ind, text).unwrap();
                    }
                    None => writeln!(self.out, "{}return;", ind).unwrap(),
                }
            }

            Statement::Expr(expr) => {
                let ind = self.indent_str();
                let text = self.render_expr(expr, ctx)?;
                writeln!(self.out, "{}{};", ind, text).unwrap();
            }
        }
        Ok(())
    }

    /// Render one expression to text. Sub-expressions of infix, prefix and
    /// ternary forms are parenthesized unconditionally, so no precedence
    /// table is needed.
    fn render_expr(&self, expr: &Expression, ctx: &ShaderContext) -> Result<String> {
        match expr {
            Expression::BoolLiteral(b) => Ok(if *b { "true" } else { "false" }.to_string()),
            Expression::IntLiteral(n) => Ok(n.to_string()),
            Expression::FloatLiteral(f) => Ok(format_float(*f)),

            Expression::Ref(id) => match self.bindings.get(id) {
                Some(bound) => self.render_expr(bound, ctx),
                None => Ok(ctx.scopes.ident(*id).name.clone()),
            },

            Expression::Member { recv, name } => {
                Ok(format!("{}.{}", self.render_expr(recv, ctx)?, name))
            }

            Expression::Index { recv, index } => Ok(format!(
                "{}[{}]",
                self.render_expr(recv, ctx)?,
                self.render_expr(index, ctx)?
            )),

            Expression::Unary { key, operand } => {
                let operand = self.render_expr(operand, ctx)?;
                self.render_signature(key, &[operand], ctx)
            }

            Expression::Binary { key, lhs, rhs } | Expression::Condition { key, lhs, rhs } => {
                let lhs = self.render_expr(lhs, ctx)?;
                let rhs = self.render_expr(rhs, ctx)?;
                self.render_signature(key, &[lhs, rhs], ctx)
            }

            Expression::Ternary {
                cond,
                then,
                otherwise,
            } => Ok(format!(
                "({} ? {} : {})",
                self.render_expr(cond, ctx)?,
                self.render_expr(then, ctx)?,
                self.render_expr(otherwise, ctx)?
            )),

            Expression::Assign { target, value } => Ok(format!(
                "{} = {}",
                self.render_expr(target, ctx)?,
                self.render_expr(value, ctx)?
            )),

            Expression::Call { key, args } => {
                let mut rendered = Vec::with_capacity(args.len());
                for arg in args {
                    rendered.push(self.render_expr(arg, ctx)?);
                }
                self.render_signature(key, &rendered, ctx)
            }

            Expression::ArrayLiteral(elems) => {
                let elem_ty = elems[0].type_of(ctx)?;
                let mut rendered = Vec::with_capacity(elems.len());
                for e in elems {
                    rendered.push(self.render_expr(e, ctx)?);
                }
                Ok(format!(
                    "{}[{}]({})",
                    glsl_type(elem_ty.base),
                    elems.len(),
                    rendered.join(", ")
                ))
            }

            Expression::Raw { text, .. } => Ok(text.clone()),

            Expression::Void => Ok(String::new()),
        }
    }

    /// Render one resolved call site strictly according to the rendering
    /// registered for its exact signature.
    fn render_signature(
        &self,
        key: &FunctionKey,
        args: &[String],
        ctx: &ShaderContext,
    ) -> Result<String> {
        if ctx.functions.contains_key(key) {
            return Ok(format!("{}({})", key.name, args.join(", ")));
        }
        let Some(def) = STDLIB.resolve(key) else {
            // Resolution happened at build time; a miss here is a broken
            // compiler contract, not a user error.
            bail_gen!("no rendering registered for {}", key);
        };
        Ok(match def.render {
            Render::Infix(op) => format!("({} {} {})", args[0], op, args[1]),
            Render::Prefix(op) => format!("({}{})", op, args[0]),
            Render::Call(name) => format!("{}({})", name, args.join(", ")),
        })
    }

    fn type_text(&self, ty: &Type) -> String {
        format!("{}{}", self.qualifier_text(ty), glsl_type(ty.base))
    }

    /// Qualifiers plus type plus name, as written in a declaration.
    fn declare_text(&self, ty: &Type, name: &str) -> String {
        format!("{} {}", self.type_text(ty), name)
    }

    /// `const` and, on the embedded profile only, the precision qualifier.
    fn qualifier_text(&self, ty: &Type) -> String {
        let mut text = String::new();
        if ty.is_const {
            text.push_str("const ");
        }
        if self.dialect == Dialect::Gles300 {
            if let Some(p) = ty.precision {
                text.push_str(match p {
                    Precision::Low => "lowp ",
                    Precision::Medium => "mediump ",
                    Precision::High => "highp ",
                });
            }
        }
        text
    }

    fn indent_str(&self) -> String {
        "    ".repeat(self.indent)
    }
}

/// Dialect-independent GLSL spelling of a base type.
pub fn glsl_type(base: BaseType) -> &'static str {
    use BaseType::*;
    match base {
        Void => "void",
        Boolean => "bool",
        Int => "int",
        Float => "float",
        Vector2 => "vec2",
        Vector3 => "vec3",
        Vector4 => "vec4",
        Vector2Int => "ivec2",
        Vector3Int => "ivec3",
        Vector4Int => "ivec4",
        Vector2Boolean => "bvec2",
        Vector3Boolean => "bvec3",
        Vector4Boolean => "bvec4",
        Matrix2 => "mat2",
        Matrix3 => "mat3",
        Matrix4 => "mat4",
        Texture2 => "sampler2D",
    }
}

/// Float literals always carry a decimal point so GLSL treats them as
/// floats, not ints.
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}
