//! Constant folding / expression simplification.
//!
//! A pure recursive transform: every call either returns a reduced literal
//! or the same shape with simplified children. `Bindings` substitutes
//! identifiers with already-known expressions; the generator uses it for
//! loop-index substitution and property values, the builder for loop
//! bounds and array lengths.

use crate::ast::Expression;
use crate::scope::IdentId;
use std::collections::HashMap;

pub type Bindings = HashMap<IdentId, Expression>;

pub fn simplify(expr: &Expression, bindings: &Bindings) -> Expression {
    match expr {
        Expression::Ref(id) => match bindings.get(id) {
            Some(bound) => bound.clone(),
            None => expr.clone(),
        },

        Expression::Unary { key, operand } => {
            let operand = simplify(operand, bindings);
            if let Some(folded) = try_fold_unary(&key.name, &operand) {
                return folded;
            }
            Expression::Unary {
                key: key.clone(),
                operand: Box::new(operand),
            }
        }

        Expression::Binary { key, lhs, rhs } => {
            let lhs = simplify(lhs, bindings);
            let rhs = simplify(rhs, bindings);
            if let Some(folded) = try_fold_binary(&key.name, &lhs, &rhs) {
                return folded;
            }
            Expression::Binary {
                key: key.clone(),
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }
        }

        Expression::Condition { key, lhs, rhs } => {
            let lhs = simplify(lhs, bindings);
            let rhs = simplify(rhs, bindings);
            if let Some(folded) = try_fold_binary(&key.name, &lhs, &rhs) {
                return folded;
            }
            Expression::Condition {
                key: key.clone(),
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }
        }

        Expression::Ternary {
            cond,
            then,
            otherwise,
        } => {
            let cond = simplify(cond, bindings);
            let then = simplify(then, bindings);
            let otherwise = simplify(otherwise, bindings);
            if let Expression::BoolLiteral(b) = cond {
                return if b { then } else { otherwise };
            }
            Expression::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            }
        }

        Expression::Member { recv, name } => Expression::Member {
            recv: Box::new(simplify(recv, bindings)),
            name: name.clone(),
        },

        Expression::Index { recv, index } => Expression::Index {
            recv: Box::new(simplify(recv, bindings)),
            index: Box::new(simplify(index, bindings)),
        },

        Expression::Assign { target, value } => Expression::Assign {
            target: target.clone(),
            value: Box::new(simplify(value, bindings)),
        },

        Expression::Call { key, args } => Expression::Call {
            key: key.clone(),
            args: args.iter().map(|a| simplify(a, bindings)).collect(),
        },

        Expression::ArrayLiteral(elems) => {
            Expression::ArrayLiteral(elems.iter().map(|e| simplify(e, bindings)).collect())
        }

        Expression::BoolLiteral(_)
        | Expression::IntLiteral(_)
        | Expression::FloatLiteral(_)
        | Expression::Raw { .. }
        | Expression::Void => expr.clone(),
    }
}

fn try_fold_unary(op: &str, operand: &Expression) -> Option<Expression> {
    match (op, operand) {
        ("-", Expression::IntLiteral(n)) => n.checked_neg().map(Expression::IntLiteral),
        ("-", Expression::FloatLiteral(f)) => Some(Expression::FloatLiteral(-f)),
        ("!", Expression::BoolLiteral(b)) => Some(Expression::BoolLiteral(!b)),
        _ => None,
    }
}

fn try_fold_binary(op: &str, lhs: &Expression, rhs: &Expression) -> Option<Expression> {
    use Expression::*;

    match (lhs, rhs) {
        (IntLiteral(a), IntLiteral(b)) => {
            let (a, b) = (*a, *b);
            let arith = match op {
                "+" => Some(a.wrapping_add(b)),
                "-" => Some(a.wrapping_sub(b)),
                "*" => Some(a.wrapping_mul(b)),
                // Division and modulo by a literal zero, and the overflowing
                // MIN / -1 case, are left unfolded; the target compiler is
                // the authority there.
                "/" => a.checked_div(b),
                "%" => a.checked_rem(b),
                "&" => Some(a & b),
                "|" => Some(a | b),
                "^" => Some(a ^ b),
                "<<" if (0..64).contains(&b) => Some(a << b),
                ">>" if (0..64).contains(&b) => Some(a >> b),
                _ => None,
            };
            if let Some(n) = arith {
                return Some(IntLiteral(n));
            }
            fold_compare(op, a.partial_cmp(&b)).map(BoolLiteral)
        }

        (FloatLiteral(a), FloatLiteral(b)) => {
            let (a, b) = (*a, *b);
            let arith = match op {
                "+" => Some(a + b),
                "-" => Some(a - b),
                "*" => Some(a * b),
                "/" if b != 0.0 => Some(a / b),
                "%" if b != 0.0 => Some(a - b * (a / b).floor()),
                _ => None,
            };
            if let Some(f) = arith {
                return Some(FloatLiteral(f));
            }
            fold_compare(op, a.partial_cmp(&b)).map(BoolLiteral)
        }

        (BoolLiteral(a), BoolLiteral(b)) => match op {
            "&&" => Some(BoolLiteral(*a && *b)),
            "||" => Some(BoolLiteral(*a || *b)),
            "==" => Some(BoolLiteral(a == b)),
            "!=" => Some(BoolLiteral(a != b)),
            _ => None,
        },

        _ => None,
    }
}

fn fold_compare(op: &str, ord: Option<std::cmp::Ordering>) -> Option<bool> {
    let ord = ord?;
    match op {
        "==" => Some(ord.is_eq()),
        "!=" => Some(ord.is_ne()),
        "<" => Some(ord.is_lt()),
        "<=" => Some(ord.is_le()),
        ">" => Some(ord.is_gt()),
        ">=" => Some(ord.is_ge()),
        _ => None,
    }
}
