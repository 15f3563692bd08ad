//! Built-in function and operator signatures.
//!
//! The table is generated combinatorially at first use and shared by
//! reference afterwards; it is never mutated once built. Overload
//! resolution is a single hash lookup on the exact key, never a best-match
//! search.

use crate::types::BaseType;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Exact lookup key for functions and operators: name plus ordered
/// parameter base kinds. The return type is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionKey {
    pub name: String,
    pub params: Vec<BaseType>,
}

impl FunctionKey {
    pub fn new(name: impl Into<String>, params: Vec<BaseType>) -> FunctionKey {
        FunctionKey {
            name: name.into(),
            params,
        }
    }
}

impl std::fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")
    }
}

/// How the backend prints a use of a signature. Registered per exact key,
/// so the same logical operation can render as infix for one signature and
/// as a named call for another (scalar `<` vs vector `lessThan`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    Infix(&'static str),
    Prefix(&'static str),
    Call(&'static str),
}

#[derive(Debug, Clone)]
pub struct BuiltinDef {
    pub ret: BaseType,
    pub render: Render,
}

pub struct StdLib {
    table: HashMap<FunctionKey, BuiltinDef>,
}

/// The process-wide table. Construction is deterministic and dependency
/// free, so a shared immutable instance needs no locking.
pub static STDLIB: Lazy<StdLib> = Lazy::new(StdLib::build);

const FLOAT_VECS: [BaseType; 3] = [BaseType::Vector2, BaseType::Vector3, BaseType::Vector4];
const INT_VECS: [BaseType; 3] = [BaseType::Vector2Int, BaseType::Vector3Int, BaseType::Vector4Int];
const MATRICES: [BaseType; 3] = [BaseType::Matrix2, BaseType::Matrix3, BaseType::Matrix4];

impl StdLib {
    fn build() -> StdLib {
        let mut lib = StdLib {
            table: HashMap::new(),
        };

        lib.register_constructors();
        lib.register_conversions();
        lib.register_arithmetic();
        lib.register_comparisons();
        lib.register_logical();
        lib.register_functions();
        lib.register_texture();

        lib
    }

    pub fn resolve(&self, key: &FunctionKey) -> Option<&BuiltinDef> {
        self.table.get(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn register(&mut self, name: &str, params: Vec<BaseType>, ret: BaseType, render: Render) {
        let prev = self.table.insert(FunctionKey::new(name, params), BuiltinDef { ret, render });
        debug_assert!(prev.is_none(), "duplicate builtin registration for '{}'", name);
    }

    /// Vector constructors: for arity N, every ordered argument list over
    /// the flavor's scalar and vectors whose component counts sum to N.
    fn register_constructors(&mut self) {
        let flavors: [(BaseType, [(&str, &str); 3]); 3] = [
            (
                BaseType::Float,
                [("vector2", "vec2"), ("vector3", "vec3"), ("vector4", "vec4")],
            ),
            (
                BaseType::Int,
                [("vector2i", "ivec2"), ("vector3i", "ivec3"), ("vector4i", "ivec4")],
            ),
            (
                BaseType::Boolean,
                [("vector2b", "bvec2"), ("vector3b", "bvec3"), ("vector4b", "bvec4")],
            ),
        ];

        for (scalar, names) in flavors {
            for (i, (name, glsl)) in names.iter().enumerate() {
                let n = i + 2;
                let target = BaseType::vector_of(scalar, n).unwrap();
                let mut candidates = vec![scalar];
                for k in 2..=n {
                    candidates.push(BaseType::vector_of(scalar, k).unwrap());
                }
                for args in arg_lists(&candidates, n) {
                    self.register(name, args, target, Render::Call(glsl));
                }
            }
        }

        // Matrix constructors: from N*N scalars, from N column vectors,
        // and the identity form.
        let mat_names = [("matrix2", "mat2"), ("matrix3", "mat3"), ("matrix4", "mat4")];
        for (i, (name, glsl)) in mat_names.iter().enumerate() {
            let n = i + 2;
            let mat = MATRICES[i];
            let col = BaseType::vector_of(BaseType::Float, n).unwrap();
            self.register(name, vec![BaseType::Float; n * n], mat, Render::Call(glsl));
            self.register(name, vec![col; n], mat, Render::Call(glsl));
            self.register(name, vec![mat], mat, Render::Call(glsl));
        }
    }

    fn register_conversions(&mut self) {
        self.register("int", vec![BaseType::Float], BaseType::Int, Render::Call("int"));
        self.register("float", vec![BaseType::Int], BaseType::Float, Render::Call("float"));
    }

    fn register_arithmetic(&mut self) {
        use BaseType::*;

        // Integer scalar: arithmetic plus bitwise/shift forms.
        for op in ["+", "-", "*", "/", "%", "&", "|", "^", "<<", ">>"] {
            self.register(op, vec![Int, Int], Int, Render::Infix(op));
        }

        // Float scalar: `%` has no infix form in GLSL, it renders as mod().
        for op in ["+", "-", "*", "/"] {
            self.register(op, vec![Float, Float], Float, Render::Infix(op));
        }
        self.register("%", vec![Float, Float], Float, Render::Call("mod"));

        // Component-wise vector arithmetic plus vector/scalar forms.
        for v in FLOAT_VECS {
            for op in ["+", "-", "*", "/"] {
                self.register(op, vec![v, v], v, Render::Infix(op));
                self.register(op, vec![v, Float], v, Render::Infix(op));
                self.register(op, vec![Float, v], v, Render::Infix(op));
            }
            self.register("%", vec![v, v], v, Render::Call("mod"));
            self.register("%", vec![v, Float], v, Render::Call("mod"));
        }
        for v in INT_VECS {
            for op in ["+", "-", "*", "/", "%"] {
                self.register(op, vec![v, v], v, Render::Infix(op));
            }
            for op in ["+", "-", "*", "/"] {
                self.register(op, vec![v, Int], v, Render::Infix(op));
                self.register(op, vec![Int, v], v, Render::Infix(op));
            }
        }

        // Matrix arithmetic and the matrix multiply family.
        for (i, m) in MATRICES.iter().copied().enumerate() {
            let v = FLOAT_VECS[i];
            for op in ["+", "-", "*"] {
                self.register(op, vec![m, m], m, Render::Infix(op));
            }
            self.register("*", vec![m, v], v, Render::Infix("*"));
            self.register("*", vec![v, m], v, Render::Infix("*"));
            self.register("*", vec![m, Float], m, Render::Infix("*"));
            self.register("*", vec![Float, m], m, Render::Infix("*"));
        }

        // Unary negation across the numeric types.
        self.register("-", vec![Int], Int, Render::Prefix("-"));
        self.register("-", vec![Float], Float, Render::Prefix("-"));
        for v in FLOAT_VECS.iter().chain(INT_VECS.iter()).chain(MATRICES.iter()) {
            self.register("-", vec![*v], *v, Render::Prefix("-"));
        }
    }

    fn register_comparisons(&mut self) {
        use BaseType::*;

        for scalar in [Int, Float] {
            for op in ["==", "!=", "<", "<=", ">", ">="] {
                self.register(op, vec![scalar, scalar], Boolean, Render::Infix(op));
            }
        }
        self.register("==", vec![Boolean, Boolean], Boolean, Render::Infix("=="));
        self.register("!=", vec![Boolean, Boolean], Boolean, Render::Infix("!="));

        // Component-wise vector comparisons produce boolean vectors and
        // render as the GLSL named functions, not infix.
        let named = [
            ("==", "equal"),
            ("!=", "notEqual"),
            ("<", "lessThan"),
            ("<=", "lessThanEqual"),
            (">", "greaterThan"),
            (">=", "greaterThanEqual"),
        ];
        for (i, v) in FLOAT_VECS.iter().copied().enumerate() {
            let b = BaseType::vector_of(Boolean, i + 2).unwrap();
            for (op, func) in named {
                self.register(op, vec![v, v], b, Render::Call(func));
            }
        }
        for (i, v) in INT_VECS.iter().copied().enumerate() {
            let b = BaseType::vector_of(Boolean, i + 2).unwrap();
            for (op, func) in named {
                self.register(op, vec![v, v], b, Render::Call(func));
            }
        }
    }

    fn register_logical(&mut self) {
        use BaseType::*;
        self.register("&&", vec![Boolean, Boolean], Boolean, Render::Infix("&&"));
        self.register("||", vec![Boolean, Boolean], Boolean, Render::Infix("||"));
        self.register("!", vec![Boolean], Boolean, Render::Prefix("!"));
    }

    fn register_functions(&mut self) {
        use BaseType::*;

        for v in FLOAT_VECS {
            self.register("length", vec![v], Float, Render::Call("length"));
            self.register("dot", vec![v, v], Float, Render::Call("dot"));
        }

        for t in [Float, Int] {
            self.register("abs", vec![t], t, Render::Call("abs"));
            self.register("min", vec![t, t], t, Render::Call("min"));
            self.register("max", vec![t, t], t, Render::Call("max"));
            self.register("clamp", vec![t, t, t], t, Render::Call("clamp"));
        }
        for v in FLOAT_VECS.iter().chain(INT_VECS.iter()).copied() {
            self.register("abs", vec![v], v, Render::Call("abs"));
            self.register("min", vec![v, v], v, Render::Call("min"));
            self.register("max", vec![v, v], v, Render::Call("max"));
            self.register("clamp", vec![v, v, v], v, Render::Call("clamp"));
        }
        for v in FLOAT_VECS {
            self.register("min", vec![v, Float], v, Render::Call("min"));
            self.register("max", vec![v, Float], v, Render::Call("max"));
            self.register("clamp", vec![v, Float, Float], v, Render::Call("clamp"));
        }

        self.register("floor", vec![Float], Float, Render::Call("floor"));
        self.register("sin", vec![Float], Float, Render::Call("sin"));
        self.register("cos", vec![Float], Float, Render::Call("cos"));
        self.register("mod", vec![Float, Float], Float, Render::Call("mod"));
        self.register("mix", vec![Float, Float, Float], Float, Render::Call("mix"));
        for v in FLOAT_VECS {
            self.register("floor", vec![v], v, Render::Call("floor"));
            self.register("sin", vec![v], v, Render::Call("sin"));
            self.register("cos", vec![v], v, Render::Call("cos"));
            self.register("mod", vec![v, v], v, Render::Call("mod"));
            self.register("mod", vec![v, Float], v, Render::Call("mod"));
            self.register("mix", vec![v, v, v], v, Render::Call("mix"));
            self.register("mix", vec![v, v, Float], v, Render::Call("mix"));
        }
    }

    fn register_texture(&mut self) {
        self.register(
            "texture",
            vec![BaseType::Texture2, BaseType::Vector2],
            BaseType::Vector4,
            Render::Call("texture"),
        );
    }
}

/// All ordered argument lists over `candidates` whose component counts sum
/// to exactly `remaining`.
fn arg_lists(candidates: &[BaseType], remaining: usize) -> Vec<Vec<BaseType>> {
    let mut out = Vec::new();
    for &c in candidates {
        let n = c.component_count();
        if n == remaining {
            out.push(vec![c]);
        } else if n < remaining {
            for mut rest in arg_lists(candidates, remaining - n) {
                let mut list = Vec::with_capacity(1 + rest.len());
                list.push(c);
                list.append(&mut rest);
                out.push(list);
            }
        }
    }
    out
}

/// Resolve a member-access (swizzle) name against a vector type. The name
/// must draw all characters from one of the two parallel alphabets, each
/// selecting a component that exists on the source arity. Length-1 names
/// yield the scalar flavor; longer names yield the flavor's vector.
pub fn swizzle_type(base: BaseType, name: &str) -> Option<BaseType> {
    let scalar = base.component_scalar()?;
    let arity = base.component_count();
    if name.is_empty() || name.len() > 4 {
        return None;
    }

    let alphabet: &[char; 4] = if name.chars().all(|c| "xyzw".contains(c)) {
        &['x', 'y', 'z', 'w']
    } else if name.chars().all(|c| "rgba".contains(c)) {
        &['r', 'g', 'b', 'a']
    } else {
        return None;
    };

    for c in name.chars() {
        let idx = alphabet.iter().position(|&a| a == c)?;
        if idx >= arity {
            return None;
        }
    }

    BaseType::vector_of(scalar, name.len())
}
