//! Conversion of configuration-language literals into generic [`Value`]s.

use crate::value::{Map, Value};
use hcl_edit::Span;
use hcl_edit::expr::{BinaryOperator, Expression, ObjectKey, UnaryOperator};
use hcl_edit::template::{Element, Template};

/// The expression needs an evaluation context (variables, functions, interpolation).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} expression cannot be evaluated without context")]
pub struct NotContextFree {
    pub kind: &'static str,
}

/// Convert a context-free HCL expression into a generic value.
///
/// Numbers become `f64` (precision loss beyond 2^53 is accepted). Arrays keep source
/// order; object keys are converted to their string form. Templates, heredocs, operators
/// and conditionals are evaluated when every operand is itself context-free.
pub fn coerce_expression(expr: &Expression) -> Result<Value, NotContextFree> {
    match expr {
        Expression::Null(_) => Ok(Value::Null),
        Expression::Bool(b) => Ok(Value::Bool(*b.value())),
        Expression::Number(n) => {
            let number = n.value();
            Ok(number
                .as_f64()
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(number.to_string())))
        }
        Expression::String(s) => Ok(Value::String(s.value().clone())),
        Expression::Array(array) => array
            .iter()
            .map(coerce_expression)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expression::Object(object) => {
            let mut map = Map::new();
            for (key, value) in object.iter() {
                map.insert(object_key(key)?, coerce_expression(value.expr())?);
            }
            Ok(Value::Map(map))
        }
        Expression::Parenthesis(paren) => coerce_expression(paren.inner()),
        Expression::StringTemplate(template) => render_template(template).map(Value::String),
        // `<<-` heredocs arrive already dedented by the parser.
        Expression::HeredocTemplate(heredoc) => {
            render_template(&heredoc.template).map(Value::String)
        }
        Expression::UnaryOp(op) => {
            let operand = coerce_expression(&op.expr)?;
            match (op.operator.value(), operand) {
                (UnaryOperator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOperator::Neg, operand) => Ok(Value::Number(-to_number(&operand)?)),
                _ => Err(NotContextFree { kind: "operator" }),
            }
        }
        Expression::BinaryOp(op) => {
            let lhs = coerce_expression(&op.lhs_expr)?;
            let rhs = coerce_expression(&op.rhs_expr)?;
            binary(*op.operator.value(), &lhs, &rhs)
        }
        Expression::Conditional(cond) => {
            let condition = coerce_expression(&cond.cond_expr)?;
            let on_true = coerce_expression(&cond.true_expr)?;
            let on_false = coerce_expression(&cond.false_expr)?;
            if to_bool(&condition)? {
                Ok(on_true)
            } else {
                Ok(on_false)
            }
        }
        Expression::Variable(_) => Err(NotContextFree { kind: "variable" }),
        Expression::Traversal(_) => Err(NotContextFree { kind: "traversal" }),
        Expression::FuncCall(_) => Err(NotContextFree { kind: "function call" }),
        Expression::ForExpr(_) => Err(NotContextFree { kind: "for" }),
    }
}

/// Concatenate a template whose interpolations are all context-free scalars.
fn render_template(template: &Template) -> Result<String, NotContextFree> {
    let mut out = String::new();
    let mut strip_next = false;
    for element in template.iter() {
        match element {
            Element::Literal(literal) => {
                let text = literal.value().as_str();
                if strip_next {
                    out.push_str(text.trim_start());
                } else {
                    out.push_str(text);
                }
                strip_next = false;
            }
            Element::Interpolation(interp) => {
                if interp.strip.strip_start() {
                    out.truncate(out.trim_end().len());
                }
                out.push_str(&scalar_string(&coerce_expression(&interp.expr)?)?);
                strip_next = interp.strip.strip_end();
            }
            Element::Directive(_) => return Err(NotContextFree { kind: "template directive" }),
        }
    }
    Ok(out)
}

fn binary(op: BinaryOperator, lhs: &Value, rhs: &Value) -> Result<Value, NotContextFree> {
    let value = match op {
        BinaryOperator::Eq => Value::Bool(lhs == rhs),
        BinaryOperator::NotEq => Value::Bool(lhs != rhs),
        BinaryOperator::And => Value::Bool(to_bool(lhs)? && to_bool(rhs)?),
        BinaryOperator::Or => Value::Bool(to_bool(lhs)? || to_bool(rhs)?),
        BinaryOperator::Less => Value::Bool(to_number(lhs)? < to_number(rhs)?),
        BinaryOperator::LessEq => Value::Bool(to_number(lhs)? <= to_number(rhs)?),
        BinaryOperator::Greater => Value::Bool(to_number(lhs)? > to_number(rhs)?),
        BinaryOperator::GreaterEq => Value::Bool(to_number(lhs)? >= to_number(rhs)?),
        BinaryOperator::Plus => Value::Number(to_number(lhs)? + to_number(rhs)?),
        BinaryOperator::Minus => Value::Number(to_number(lhs)? - to_number(rhs)?),
        BinaryOperator::Mul => Value::Number(to_number(lhs)? * to_number(rhs)?),
        BinaryOperator::Div | BinaryOperator::Mod => {
            let divisor = to_number(rhs)?;
            if divisor == 0.0 {
                return Err(NotContextFree { kind: "operator" });
            }
            let dividend = to_number(lhs)?;
            if op == BinaryOperator::Div {
                Value::Number(dividend / divisor)
            } else {
                Value::Number(dividend % divisor)
            }
        }
    };
    Ok(value)
}

/// Numeric operand; numeric strings convert the way the configuration language does.
fn to_number(value: &Value) -> Result<f64, NotContextFree> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| NotContextFree { kind: "operator" }),
        _ => Err(NotContextFree { kind: "operator" }),
    }
}

fn to_bool(value: &Value) -> Result<bool, NotContextFree> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        _ => Err(NotContextFree { kind: "operator" }),
    }
}

fn scalar_string(value: &Value) -> Result<String, NotContextFree> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(format_number(*n)),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::List(_) | Value::Map(_) => {
            Err(NotContextFree { kind: "template" })
        }
    }
}

fn object_key(key: &ObjectKey) -> Result<String, NotContextFree> {
    match key {
        ObjectKey::Ident(ident) => Ok(ident.value().as_str().to_string()),
        ObjectKey::Expression(expr) => match coerce_expression(expr)? {
            Value::Null => Ok("null".to_string()),
            Value::List(_) | Value::Map(_) => Err(NotContextFree { kind: "collection key" }),
            scalar => scalar_string(&scalar),
        },
    }
}

/// Verbatim source text of an expression, used when it cannot be coerced.
///
/// Expressions without a span (parsed standalone) are re-encoded instead.
pub fn raw_source(expr: &Expression, source: &str) -> String {
    match expr.span().and_then(|span| source.get(span)) {
        Some(text) => text.trim().to_string(),
        None => expr.to_string().trim().to_string(),
    }
}

/// Convert a JSON value. Never fails: every JSON value has a generic counterpart.
pub fn coerce_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(n.to_string())),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::List(items.into_iter().map(coerce_json).collect()),
        serde_json::Value::Object(obj) => Value::Map(
            obj.into_iter()
                .map(|(key, value)| (key, coerce_json(value)))
                .collect(),
        ),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
