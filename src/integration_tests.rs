//! End-to-end pipeline tests: parse-tree in, GLSL text for both dialects out.

use crate::ast::Expression;
use crate::builder::VERTEX_POSITION;
use crate::cst::{
    DeclNode, ExprKindNode, ExprNode, Item, ParamNode, ShaderTree, Span, StageKind, StageParamNode,
    StmtNode, TypeNode,
};
use crate::glsl::{Dialect, PropertyBindings};
use crate::stdlib::FunctionKey;
use crate::types::BaseType;
use crate::{compile, generate};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sp() -> Span {
    Span::new(1, 1)
}

fn ty(name: &str) -> TypeNode {
    TypeNode::named(name, sp())
}

fn e(kind: ExprKindNode) -> ExprNode {
    ExprNode::new(kind, sp())
}

fn float(f: f64) -> ExprNode {
    e(ExprKindNode::Float(f))
}

fn ident(name: &str) -> ExprNode {
    e(ExprKindNode::Ident(name.to_string()))
}

fn call(name: &str, args: Vec<ExprNode>) -> ExprNode {
    e(ExprKindNode::Call(name.to_string(), args))
}

fn binary(op: &str, lhs: ExprNode, rhs: ExprNode) -> ExprNode {
    e(ExprKindNode::Binary(op.to_string(), Box::new(lhs), Box::new(rhs)))
}

fn assign(target: ExprNode, value: ExprNode) -> StmtNode {
    StmtNode::Expr(e(ExprKindNode::Assign(Box::new(target), Box::new(value))))
}

fn vec3_value(x: f64, y: f64, z: f64) -> Expression {
    Expression::Call {
        key: FunctionKey::new(
            "vector3",
            vec![BaseType::Float, BaseType::Float, BaseType::Float],
        ),
        args: vec![
            Expression::FloatLiteral(x),
            Expression::FloatLiteral(y),
            Expression::FloatLiteral(z),
        ],
    }
}

/// A small but complete material shader: a transform uniform, a tint
/// property, a helper function, a varying, and both stages.
fn material_tree() -> ShaderTree {
    ShaderTree {
        items: vec![
            Item::Uniform {
                ty: ty("matrix4"),
                name: "u_mvp".to_string(),
                binding: 0,
                span: sp(),
            },
            Item::Property {
                ty: ty("vector3"),
                name: "base_color".to_string(),
                span: sp(),
            },
            Item::Output {
                ty: ty("vector4"),
                name: "out_Color".to_string(),
                span: sp(),
            },
            Item::Function {
                name: "brightness".to_string(),
                ret: ty("float"),
                params: vec![ParamNode {
                    ty: ty("vector3"),
                    name: "c".to_string(),
                    span: sp(),
                }],
                body: vec![StmtNode::Return(
                    Some(call(
                        "dot",
                        vec![
                            ident("c"),
                            call("vector3", vec![float(0.299), float(0.587), float(0.114)]),
                        ],
                    )),
                    sp(),
                )],
                span: sp(),
            },
            Item::Stage {
                kind: StageKind::Fragment,
                params: vec![StageParamNode {
                    ty: ty("vector3"),
                    name: "v_color".to_string(),
                    location: -1,
                    available: None,
                    span: sp(),
                }],
                body: vec![
                    StmtNode::Decl(DeclNode {
                        ty: ty("float"),
                        name: "b".to_string(),
                        init: Some(call("brightness", vec![ident("v_color")])),
                        span: sp(),
                    }),
                    assign(
                        ident("out_Color"),
                        call(
                            "vector4",
                            vec![binary("*", ident("v_color"), ident("b")), float(1.0)],
                        ),
                    ),
                ],
                span: sp(),
            },
            Item::Stage {
                kind: StageKind::Vertex,
                params: vec![StageParamNode {
                    ty: ty("vector3"),
                    name: "position".to_string(),
                    location: 0,
                    available: None,
                    span: sp(),
                }],
                body: vec![
                    assign(ident("v_color"), ident("base_color")),
                    assign(
                        ident(VERTEX_POSITION),
                        binary(
                            "*",
                            ident("u_mvp"),
                            call("vector4", vec![ident("position"), float(1.0)]),
                        ),
                    ),
                ],
                span: sp(),
            },
        ],
    }
}

#[test]
fn test_material_shader_desktop() {
    init_logs();
    let shader = compile(&material_tree()).unwrap();
    let mut props = PropertyBindings::new();
    props.insert("base_color".to_string(), vec3_value(0.2, 0.4, 0.8));

    let out = generate(Dialect::Gl330, &shader, &props).unwrap();

    assert!(out.vertex.starts_with("#version 330\n"), "{}", out.vertex);
    assert!(out.vertex.contains("uniform mat4 u_mvp;"), "{}", out.vertex);
    assert!(
        out.vertex.contains("layout(location = 0) in vec3 position;"),
        "{}",
        out.vertex
    );
    assert!(out.vertex.contains("out vec3 v_color;"), "{}", out.vertex);
    assert!(
        out.vertex.contains("v_color = vec3(0.2, 0.4, 0.8);"),
        "{}",
        out.vertex
    );
    assert!(
        out.vertex.contains("gl_Position = (u_mvp * vec4(position, 1.0));"),
        "{}",
        out.vertex
    );

    assert!(out.fragment.contains("in vec3 v_color;"), "{}", out.fragment);
    assert!(out.fragment.contains("out vec4 out_Color;"), "{}", out.fragment);
    assert!(
        out.fragment.contains("float brightness(vec3 c) {"),
        "{}",
        out.fragment
    );
    assert!(
        out.fragment.contains("return dot(c, vec3(0.299, 0.587, 0.114));"),
        "{}",
        out.fragment
    );
    assert!(
        out.fragment.contains("float b = brightness(v_color);"),
        "{}",
        out.fragment
    );
    assert!(
        out.fragment.contains("out_Color = vec4((v_color * b), 1.0);"),
        "{}",
        out.fragment
    );
}

#[test]
fn test_material_shader_embedded() {
    init_logs();
    let shader = compile(&material_tree()).unwrap();
    let mut props = PropertyBindings::new();
    props.insert("base_color".to_string(), vec3_value(0.2, 0.4, 0.8));

    let out = generate(Dialect::Gles300, &shader, &props).unwrap();

    assert!(out.vertex.starts_with("#version 300 es\n"), "{}", out.vertex);
    assert!(out.vertex.contains("precision highp float;"), "{}", out.vertex);
    assert!(out.fragment.contains("precision highp float;"), "{}", out.fragment);
    // No explicit layout locations on the embedded profile.
    assert!(!out.vertex.contains("layout"), "{}", out.vertex);
    assert!(out.vertex.contains("in vec3 position;"), "{}", out.vertex);
    // Everything else matches the desktop rendering.
    assert!(
        out.fragment.contains("out_Color = vec4((v_color * b), 1.0);"),
        "{}",
        out.fragment
    );
}

#[test]
fn test_rebinding_properties_without_recompiling() {
    let shader = compile(&material_tree()).unwrap();

    let mut warm = PropertyBindings::new();
    warm.insert("base_color".to_string(), vec3_value(0.9, 0.6, 0.3));
    let mut cool = PropertyBindings::new();
    cool.insert("base_color".to_string(), vec3_value(0.3, 0.6, 0.9));

    let a = generate(Dialect::Gl330, &shader, &warm).unwrap();
    let b = generate(Dialect::Gl330, &shader, &cool).unwrap();

    assert!(a.vertex.contains("vec3(0.9, 0.6, 0.3)"), "{}", a.vertex);
    assert!(b.vertex.contains("vec3(0.3, 0.6, 0.9)"), "{}", b.vertex);
    // The fragment stage never references the property, so it is identical.
    assert_eq!(a.fragment, b.fragment);
}

#[test]
fn test_one_shader_many_dialects() {
    let shader = compile(&material_tree()).unwrap();
    let mut props = PropertyBindings::new();
    props.insert("base_color".to_string(), vec3_value(1.0, 1.0, 1.0));

    let gl = generate(Dialect::Gl330, &shader, &props).unwrap();
    let es = generate(Dialect::Gles300, &shader, &props).unwrap();
    assert_ne!(gl.vertex, es.vertex);

    // Dialects differ only in the header and IO qualifiers; the bodies agree.
    let body_of = |text: &str| text[text.find("void main()").unwrap()..].to_string();
    assert_eq!(body_of(&gl.fragment), body_of(&es.fragment));
}
