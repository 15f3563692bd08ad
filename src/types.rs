//! The closed set of shader types and the component algebra over them.

use crate::ast::Expression;

/// Base kind of a shader value. The set is closed; every other piece of the
/// compiler dispatches exhaustively over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Void,
    Boolean,
    Int,
    Float,
    Vector2,
    Vector3,
    Vector4,
    Vector2Int,
    Vector3Int,
    Vector4Int,
    Vector2Boolean,
    Vector3Boolean,
    Vector4Boolean,
    Matrix2,
    Matrix3,
    Matrix4,
    Texture2,
}

impl BaseType {
    /// Component count: scalars are 1, VectorN is N, MatrixN is N columns.
    pub fn component_count(self) -> usize {
        use BaseType::*;
        match self {
            Void => 0,
            Boolean | Int | Float | Texture2 => 1,
            Vector2 | Vector2Int | Vector2Boolean | Matrix2 => 2,
            Vector3 | Vector3Int | Vector3Boolean | Matrix3 => 3,
            Vector4 | Vector4Int | Vector4Boolean | Matrix4 => 4,
        }
    }

    /// Scalar flavor of a vector type, or None for non-vectors.
    pub fn component_scalar(self) -> Option<BaseType> {
        use BaseType::*;
        match self {
            Vector2 | Vector3 | Vector4 => Some(Float),
            Vector2Int | Vector3Int | Vector4Int => Some(Int),
            Vector2Boolean | Vector3Boolean | Vector4Boolean => Some(Boolean),
            _ => None,
        }
    }

    /// The n-component vector of a scalar flavor, or the scalar itself for n = 1.
    pub fn vector_of(scalar: BaseType, n: usize) -> Option<BaseType> {
        use BaseType::*;
        match (scalar, n) {
            (Float, 1) => Some(Float),
            (Float, 2) => Some(Vector2),
            (Float, 3) => Some(Vector3),
            (Float, 4) => Some(Vector4),
            (Int, 1) => Some(Int),
            (Int, 2) => Some(Vector2Int),
            (Int, 3) => Some(Vector3Int),
            (Int, 4) => Some(Vector4Int),
            (Boolean, 1) => Some(Boolean),
            (Boolean, 2) => Some(Vector2Boolean),
            (Boolean, 3) => Some(Vector3Boolean),
            (Boolean, 4) => Some(Vector4Boolean),
            _ => None,
        }
    }

    pub fn is_vector(self) -> bool {
        self.component_scalar().is_some()
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, BaseType::Matrix2 | BaseType::Matrix3 | BaseType::Matrix4)
    }

    pub fn is_scalar(self) -> bool {
        matches!(self, BaseType::Boolean | BaseType::Int | BaseType::Float)
    }

    /// Source-language spelling, as written in declarations.
    pub fn name(self) -> &'static str {
        use BaseType::*;
        match self {
            Void => "void",
            Boolean => "boolean",
            Int => "int",
            Float => "float",
            Vector2 => "vector2",
            Vector3 => "vector3",
            Vector4 => "vector4",
            Vector2Int => "vector2i",
            Vector3Int => "vector3i",
            Vector4Int => "vector4i",
            Vector2Boolean => "vector2b",
            Vector3Boolean => "vector3b",
            Vector4Boolean => "vector4b",
            Matrix2 => "matrix2",
            Matrix3 => "matrix3",
            Matrix4 => "matrix4",
            Texture2 => "texture2",
        }
    }

    pub fn from_name(name: &str) -> Option<BaseType> {
        use BaseType::*;
        Some(match name {
            "void" => Void,
            "boolean" => Boolean,
            "int" => Int,
            "float" => Float,
            "vector2" => Vector2,
            "vector3" => Vector3,
            "vector4" => Vector4,
            "vector2i" => Vector2Int,
            "vector3i" => Vector3Int,
            "vector4i" => Vector4Int,
            "vector2b" => Vector2Boolean,
            "vector3b" => Vector3Boolean,
            "vector4b" => Vector4Boolean,
            "matrix2" => Matrix2,
            "matrix3" => Matrix3,
            "matrix4" => Matrix4,
            "texture2" => Texture2,
            _ => return None,
        })
    }
}

impl std::fmt::Display for BaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Low,
    Medium,
    High,
}

/// A full type value: base kind plus the qualifiers a declaration carries.
///
/// Constness and precision do not participate in signature lookup; only the
/// base kind does. An array length, if present, must fold to a non-negative
/// integer literal before code generation (the builder enforces this).
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub base: BaseType,
    pub is_const: bool,
    pub precision: Option<Precision>,
    pub array_len: Option<Box<Expression>>,
}

impl Type {
    pub fn simple(base: BaseType) -> Type {
        Type {
            base,
            is_const: false,
            precision: None,
            array_len: None,
        }
    }

    pub fn constant(base: BaseType) -> Type {
        Type {
            is_const: true,
            ..Type::simple(base)
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_len.is_some()
    }

    /// The folded array length, if this is an array type whose length
    /// expression has been reduced to a literal.
    pub fn folded_len(&self) -> Option<i64> {
        match self.array_len.as_deref() {
            Some(Expression::IntLiteral(n)) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        write!(f, "{}", self.base)?;
        if self.is_array() {
            write!(f, "[]")?;
        }
        Ok(())
    }
}
