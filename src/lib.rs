//! Shader cross-compiler core.
//!
//! Turns a parsed shader program into resolved form and renders it as GLSL
//! for a chosen target dialect. The pipeline has two halves:
//!
//! 1. [`compile`] walks a [`cst::ShaderTree`] (produced by an external
//!    parser), resolves every name and signature, and returns an immutable
//!    [`CompiledShader`].
//! 2. [`generate`] renders that shader for one [`Dialect`] with a set of
//!    property values bound, producing vertex and fragment source text.
//!
//! A [`CompiledShader`] is compiled once and generated from many times,
//! typically with different property bindings per material instance.

pub mod ast;
pub mod builder;
pub mod cst;
pub mod error;
pub mod glsl;
pub mod scope;
pub mod simplify;
pub mod stdlib;
pub mod types;

pub use ast::CompiledShader;
pub use builder::ShaderBuilder;
pub use error::{CompilerError, Result};
pub use glsl::{Dialect, Generator, GlslOutput, PropertyBindings};

/// Resolve and type-check one parsed shader program.
pub fn compile(tree: &cst::ShaderTree) -> Result<CompiledShader> {
    ShaderBuilder::build(tree)
}

/// Render a compiled shader for one dialect with the given property values.
pub fn generate(
    dialect: Dialect,
    shader: &CompiledShader,
    props: &PropertyBindings,
) -> Result<GlslOutput> {
    Generator::new(dialect).generate(shader, props)
}



#[cfg(test)]
mod glsl_tests;

#[cfg(test)]
mod integration_tests;
