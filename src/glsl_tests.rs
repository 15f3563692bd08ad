use crate::ast::Expression;
use crate::builder::{ShaderBuilder, FRAGMENT_COORD, VERTEX_POSITION};
use crate::cst::{
    DeclNode, ExprKindNode, ExprNode, Item, ShaderTree, Span, StageKind, StageParamNode, StmtNode,
    TypeNode,
};
use crate::error::CompilerError;
use crate::glsl::{Dialect, PropertyBindings};
use crate::stdlib::FunctionKey;
use crate::types::BaseType;
use crate::{compile, generate};

fn sp() -> Span {
    Span::new(1, 1)
}

fn ty(name: &str) -> TypeNode {
    TypeNode::named(name, sp())
}

fn e(kind: ExprKindNode) -> ExprNode {
    ExprNode::new(kind, sp())
}

fn int(n: i64) -> ExprNode {
    e(ExprKindNode::Int(n))
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

fn stage(kind: StageKind, params: Vec<StageParamNode>, body: Vec<StmtNode>) -> Item {
    Item::Stage {
        kind,
        params,
        body,
        span: sp(),
    }
}

fn output(name: &str) -> Item {
    Item::Output {
        ty: ty("vector4"),
        name: name.to_string(),
        span: sp(),
    }
}

fn vec4_literal() -> ExprNode {
    call(
        "vector4",
        vec![float(1.0), float(0.0), float(0.0), float(1.0)],
    )
}

fn minimal_tree(fragment_body: Vec<StmtNode>) -> ShaderTree {
    ShaderTree {
        items: vec![output("out_Color"), stage(StageKind::Fragment, vec![], fragment_body)],
    }
}

fn fragment_text(dialect: Dialect, tree: &ShaderTree) -> String {
    let shader = compile(tree).unwrap();
    generate(dialect, &shader, &PropertyBindings::new())
        .unwrap()
        .fragment
}

#[test]
fn test_version_lines() {
    let tree = minimal_tree(vec![assign(ident("out_Color"), vec4_literal())]);

    let gl = fragment_text(Dialect::Gl330, &tree);
    assert!(gl.starts_with("#version 330\n"), "{gl}");
    assert!(!gl.contains("precision highp"));

    let es = fragment_text(Dialect::Gles300, &tree);
    assert!(es.starts_with("#version 300 es\n"), "{es}");
    assert!(es.contains("precision highp float;"));
    assert!(es.contains("precision highp int;"));
}

#[test]
fn test_missing_fragment_stage_fails() {
    let shader = ShaderBuilder::build(&ShaderTree { items: vec![] }).unwrap();
    let err = generate(Dialect::Gl330, &shader, &PropertyBindings::new()).unwrap_err();
    assert!(matches!(err, CompilerError::GenerationError(..)), "{err}");
}

#[test]
fn test_vertex_absent_yields_empty_text() {
    let tree = minimal_tree(vec![assign(ident("out_Color"), vec4_literal())]);
    let shader = compile(&tree).unwrap();
    let out = generate(Dialect::Gl330, &shader, &PropertyBindings::new()).unwrap();
    assert!(out.vertex.is_empty());
    assert!(!out.fragment.is_empty());
}

fn two_stage_tree(location: i32) -> ShaderTree {
    ShaderTree {
        items: vec![
            output("out_Color"),
            stage(
                StageKind::Fragment,
                vec![StageParamNode {
                    ty: ty("vector3"),
                    name: "v_color".to_string(),
                    location: -1,
                    available: None,
                    span: sp(),
                }],
                vec![assign(
                    ident("out_Color"),
                    call("vector4", vec![ident("v_color"), float(1.0)]),
                )],
            ),
            stage(
                StageKind::Vertex,
                vec![StageParamNode {
                    ty: ty("vector3"),
                    name: "position".to_string(),
                    location,
                    available: None,
                    span: sp(),
                }],
                vec![
                    assign(ident("v_color"), ident("position")),
                    assign(
                        ident(VERTEX_POSITION),
                        call("vector4", vec![ident("position"), float(1.0)]),
                    ),
                ],
            ),
        ],
    }
}

#[test]
fn test_layout_locations_are_desktop_only() {
    let tree = two_stage_tree(0);
    let shader = compile(&tree).unwrap();

    let gl = generate(Dialect::Gl330, &shader, &PropertyBindings::new()).unwrap();
    assert!(gl.vertex.contains("layout(location = 0) in vec3 position;"), "{}", gl.vertex);

    let es = generate(Dialect::Gles300, &shader, &PropertyBindings::new()).unwrap();
    assert!(es.vertex.contains("in vec3 position;"), "{}", es.vertex);
    assert!(!es.vertex.contains("layout"), "{}", es.vertex);
}

#[test]
fn test_varyings_connect_stages() {
    let tree = two_stage_tree(-1);
    let shader = compile(&tree).unwrap();
    let out = generate(Dialect::Gl330, &shader, &PropertyBindings::new()).unwrap();

    assert!(out.vertex.contains("out vec3 v_color;"), "{}", out.vertex);
    assert!(out.fragment.contains("in vec3 v_color;"), "{}", out.fragment);
    assert!(out.fragment.contains("out vec4 out_Color;"), "{}", out.fragment);
}

#[test]
fn test_stage_builtins_render_as_gl_names() {
    let tree = two_stage_tree(-1);
    let shader = compile(&tree).unwrap();
    let out = generate(Dialect::Gl330, &shader, &PropertyBindings::new()).unwrap();
    assert!(out.vertex.contains("gl_Position = "), "{}", out.vertex);
    assert!(!out.vertex.contains(VERTEX_POSITION), "{}", out.vertex);
}

#[test]
fn test_fragment_coord_renders_as_gl_name() {
    let tree = minimal_tree(vec![
        StmtNode::Decl(DeclNode {
            ty: ty("vector2"),
            name: "p".to_string(),
            init: Some(e(ExprKindNode::Member(
                Box::new(ident(FRAGMENT_COORD)),
                "xy".to_string(),
            ))),
            span: sp(),
        }),
        assign(ident("out_Color"), vec4_literal()),
    ]);
    let text = fragment_text(Dialect::Gl330, &tree);
    assert!(text.contains("gl_FragCoord.xy"), "{text}");
}

#[test]
fn test_uniforms_emitted_in_both_stages() {
    let mut tree = two_stage_tree(-1);
    tree.items.insert(
        0,
        Item::Uniform {
            ty: ty("matrix4"),
            name: "u_transform".to_string(),
            binding: 0,
            span: sp(),
        },
    );
    let shader = compile(&tree).unwrap();
    let out = generate(Dialect::Gl330, &shader, &PropertyBindings::new()).unwrap();
    assert!(out.vertex.contains("uniform mat4 u_transform;"), "{}", out.vertex);
    assert!(out.fragment.contains("uniform mat4 u_transform;"), "{}", out.fragment);
}

#[test]
fn test_loops_are_unrolled() {
    let tree = ShaderTree {
        items: vec![
            Item::Global(DeclNode {
                ty: ty("float"),
                name: "acc".to_string(),
                init: Some(float(0.0)),
                span: sp(),
            }),
            output("out_Color"),
            stage(
                StageKind::Fragment,
                vec![],
                vec![
                    StmtNode::Loop {
                        index: "i".to_string(),
                        from: int(0),
                        to: int(3),
                        body: Box::new(assign(
                            ident("acc"),
                            binary("+", ident("acc"), call("float", vec![ident("i")])),
                        )),
                        span: sp(),
                    },
                    assign(ident("out_Color"), vec4_literal()),
                ],
            ),
        ],
    };
    let text = fragment_text(Dialect::Gl330, &tree);
    // One body copy per index value, with the index as a literal.
    assert!(text.contains("float(0)"), "{text}");
    assert!(text.contains("float(1)"), "{text}");
    assert!(text.contains("float(2)"), "{text}");
    assert!(!text.contains("float(3)"), "{text}");
    assert!(!text.contains("for"), "{text}");
}

#[test]
fn test_unrolled_declarations_get_their_own_scope() {
    let tree = minimal_tree(vec![
        StmtNode::Loop {
            index: "i".to_string(),
            from: int(0),
            to: int(2),
            body: Box::new(StmtNode::Decl(DeclNode {
                ty: ty("float"),
                name: "x".to_string(),
                init: Some(call("float", vec![ident("i")])),
                span: sp(),
            })),
            span: sp(),
        },
        assign(ident("out_Color"), vec4_literal()),
    ]);
    let text = fragment_text(Dialect::Gl330, &tree);
    // Each copy of the body is braced, so the repeated declaration of `x`
    // lands in a fresh scope.
    assert!(
        text.contains("    {\n        float x = float(0);\n    }\n"),
        "{text}"
    );
    assert!(
        text.contains("    {\n        float x = float(1);\n    }\n"),
        "{text}"
    );
}

#[test]
fn test_constant_if_keeps_only_live_branch() {
    let red = call("vector4", vec![float(1.0), float(0.0), float(0.0), float(1.0)]);
    let blue = call("vector4", vec![float(0.0), float(0.0), float(1.0), float(1.0)]);
    let tree = minimal_tree(vec![StmtNode::If {
        cond: e(ExprKindNode::Bool(true)),
        then: Box::new(assign(ident("out_Color"), red)),
        otherwise: Some(Box::new(assign(ident("out_Color"), blue))),
        span: sp(),
    }]);
    let text = fragment_text(Dialect::Gl330, &tree);
    assert!(text.contains("vec4(1.0, 0.0, 0.0, 1.0)"), "{text}");
    assert!(!text.contains("vec4(0.0, 0.0, 1.0, 1.0)"), "{text}");
    assert!(!text.contains("if"), "{text}");
}

#[test]
fn test_constant_false_if_without_else_vanishes() {
    let tree = minimal_tree(vec![
        StmtNode::If {
            cond: e(ExprKindNode::Bool(false)),
            then: Box::new(assign(ident("out_Color"), vec4_literal())),
            otherwise: None,
            span: sp(),
        },
        assign(ident("out_Color"), vec4_literal()),
    ]);
    let text = fragment_text(Dialect::Gl330, &tree);
    assert_eq!(text.matches("out_Color = ").count(), 1, "{text}");
}

fn property_tree() -> ShaderTree {
    ShaderTree {
        items: vec![
            Item::Property {
                ty: ty("vector3"),
                name: "tint".to_string(),
                span: sp(),
            },
            output("out_Color"),
            stage(
                StageKind::Fragment,
                vec![],
                vec![assign(
                    ident("out_Color"),
                    call("vector4", vec![ident("tint"), float(1.0)]),
                )],
            ),
        ],
    }
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

#[test]
fn test_property_value_substituted() {
    let shader = compile(&property_tree()).unwrap();
    let mut props = PropertyBindings::new();
    props.insert("tint".to_string(), vec3_value(1.0, 0.5, 0.25));

    let out = generate(Dialect::Gl330, &shader, &props).unwrap();
    assert!(out.fragment.contains("vec3(1.0, 0.5, 0.25)"), "{}", out.fragment);
    // Properties are not uniforms; the name itself never appears.
    assert!(!out.fragment.contains("tint"), "{}", out.fragment);
}

#[test]
fn test_unbound_property_fails() {
    let shader = compile(&property_tree()).unwrap();
    let err = generate(Dialect::Gl330, &shader, &PropertyBindings::new()).unwrap_err();
    assert!(matches!(err, CompilerError::GenerationError(..)), "{err}");
}

#[test]
fn test_mistyped_property_fails() {
    let shader = compile(&property_tree()).unwrap();
    let mut props = PropertyBindings::new();
    props.insert("tint".to_string(), Expression::FloatLiteral(1.0));
    let err = generate(Dialect::Gl330, &shader, &props).unwrap_err();
    assert!(matches!(err, CompilerError::GenerationError(..)), "{err}");
}

#[test]
fn test_unavailable_param_is_omitted() {
    let tree = ShaderTree {
        items: vec![
            output("out_Color"),
            stage(
                StageKind::Fragment,
                vec![StageParamNode {
                    ty: ty("vector3"),
                    name: "v_hidden".to_string(),
                    location: -1,
                    available: Some(e(ExprKindNode::Bool(false))),
                    span: sp(),
                }],
                vec![assign(ident("out_Color"), vec4_literal())],
            ),
        ],
    };
    let text = fragment_text(Dialect::Gl330, &tree);
    assert!(!text.contains("v_hidden"), "{text}");
}

#[test]
fn test_vector_comparison_renders_named_call() {
    let a = call("vector3", vec![float(1.0), float(2.0), float(3.0)]);
    let b = call("vector3", vec![float(4.0), float(5.0), float(6.0)]);
    let tree = minimal_tree(vec![
        StmtNode::Decl(DeclNode {
            ty: ty("vector3b"),
            name: "lt".to_string(),
            init: Some(binary("<", a, b)),
            span: sp(),
        }),
        assign(ident("out_Color"), vec4_literal()),
    ]);
    let text = fragment_text(Dialect::Gl330, &tree);
    assert!(text.contains("lessThan(vec3(1.0, 2.0, 3.0), vec3(4.0, 5.0, 6.0))"), "{text}");
}

#[test]
fn test_float_literals_keep_decimal_point() {
    let tree = minimal_tree(vec![
        StmtNode::Decl(DeclNode {
            ty: ty("float"),
            name: "x".to_string(),
            init: Some(float(2.0)),
            span: sp(),
        }),
        assign(ident("out_Color"), vec4_literal()),
    ]);
    let text = fragment_text(Dialect::Gl330, &tree);
    assert!(text.contains("float x = 2.0;"), "{text}");
}

#[test]
fn test_array_declarations_render() {
    let mut array_ty = ty("float");
    array_ty.array_len = Some(int(3));
    let tree = minimal_tree(vec![
        StmtNode::Decl(DeclNode {
            ty: array_ty,
            name: "w".to_string(),
            init: Some(e(ExprKindNode::ArrayLit(vec![
                float(0.25),
                float(0.5),
                float(0.25),
            ]))),
            span: sp(),
        }),
        assign(ident("out_Color"), vec4_literal()),
    ]);
    let text = fragment_text(Dialect::Gl330, &tree);
    assert!(text.contains("float w[3] = float[3](0.25, 0.5, 0.25);"), "{text}");
}

#[test]
fn test_generation_is_repeatable() {
    let shader = compile(&two_stage_tree(0)).unwrap();
    let first = generate(Dialect::Gl330, &shader, &PropertyBindings::new()).unwrap();
    let second = generate(Dialect::Gl330, &shader, &PropertyBindings::new()).unwrap();
    assert_eq!(first.vertex, second.vertex);
    assert_eq!(first.fragment, second.fragment);
}
