//! Socket type lattice and runtime values.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Type of the data flowing through a socket.
///
/// `DynamicAny` is the declared type of dynamic sockets before any link
/// resolves them to something concrete. `Dropdown` is the type of enum-like
/// constant fields (mode selectors, illuminant choices); it never flows
/// through a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocketType {
    DynamicAny,
    Bool,
    Integer,
    Float,
    Vector,
    Color,
    Dropdown,
}

impl SocketType {
    /// Position in the total restrictiveness order, least restrictive first.
    /// Dynamic type inference picks the maximum over this order.
    pub fn restrictiveness(self) -> u8 {
        match self {
            SocketType::DynamicAny => 0,
            SocketType::Bool => 1,
            SocketType::Integer => 2,
            SocketType::Float => 3,
            SocketType::Vector => 4,
            SocketType::Color => 5,
            SocketType::Dropdown => 6,
        }
    }

    pub fn most_restrictive(a: SocketType, b: SocketType) -> SocketType {
        if b.restrictiveness() > a.restrictiveness() {
            b
        } else {
            a
        }
    }

    /// GLSL type name, for the types that have a shader representation.
    pub fn glsl(self) -> Option<&'static str> {
        match self {
            SocketType::Bool => Some("bool"),
            SocketType::Integer => Some("int"),
            SocketType::Float => Some("float"),
            SocketType::Vector => Some("vec3"),
            SocketType::Color => Some("vec3"),
            SocketType::DynamicAny | SocketType::Dropdown => None,
        }
    }
}

/// A runtime value, either computed by evaluation or stored as a socket's
/// literal field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    Float(f32),
    Integer(i32),
    Bool(bool),
    Vector([f32; 3]),
    Color([f32; 3]),
    Choice(String),
}

impl Value {
    pub fn socket_type(&self) -> SocketType {
        match self {
            Value::Float(_) => SocketType::Float,
            Value::Integer(_) => SocketType::Integer,
            Value::Bool(_) => SocketType::Bool,
            Value::Vector(_) => SocketType::Vector,
            Value::Color(_) => SocketType::Color,
            Value::Choice(_) => SocketType::Dropdown,
        }
    }

    /// Convert to the given socket type. Scalars splat into vectors, vectors
    /// truncate to their first component, `DynamicAny` accepts anything.
    pub fn coerce(&self, ty: SocketType) -> Result<Value> {
        use SocketType as T;
        let out = match (self, ty) {
            (v, T::DynamicAny) => v.clone(),

            (Value::Float(x), T::Float) => Value::Float(*x),
            (Value::Float(x), T::Integer) => Value::Integer(x.round() as i32),
            (Value::Float(x), T::Bool) => Value::Bool(*x != 0.0),
            (Value::Float(x), T::Vector) => Value::Vector([*x; 3]),
            (Value::Float(x), T::Color) => Value::Color([*x; 3]),

            (Value::Integer(i), T::Integer) => Value::Integer(*i),
            (Value::Integer(i), T::Float) => Value::Float(*i as f32),
            (Value::Integer(i), T::Bool) => Value::Bool(*i != 0),
            (Value::Integer(i), T::Vector) => Value::Vector([*i as f32; 3]),
            (Value::Integer(i), T::Color) => Value::Color([*i as f32; 3]),

            (Value::Bool(b), T::Bool) => Value::Bool(*b),
            (Value::Bool(b), T::Float) => Value::Float(if *b { 1.0 } else { 0.0 }),
            (Value::Bool(b), T::Integer) => Value::Integer(i32::from(*b)),
            (Value::Bool(b), T::Vector) => Value::Vector([if *b { 1.0 } else { 0.0 }; 3]),
            (Value::Bool(b), T::Color) => Value::Color([if *b { 1.0 } else { 0.0 }; 3]),

            (Value::Vector(v), T::Vector) => Value::Vector(*v),
            (Value::Vector(v), T::Color) => Value::Color(*v),
            (Value::Vector(v), T::Float) => Value::Float(v[0]),

            (Value::Color(c), T::Color) => Value::Color(*c),
            (Value::Color(c), T::Vector) => Value::Vector(*c),
            (Value::Color(c), T::Float) => Value::Float(c[0]),

            (Value::Choice(s), T::Dropdown) => Value::Choice(s.clone()),

            (v, t) => bail!("cannot coerce {:?} value to {:?}", v.socket_type(), t),
        };
        Ok(out)
    }

    pub fn as_float(&self) -> Result<f32> {
        match self.coerce(SocketType::Float)? {
            Value::Float(x) => Ok(x),
            _ => unreachable!(),
        }
    }

    pub fn as_vec3(&self) -> Result<[f32; 3]> {
        match self.coerce(SocketType::Vector)? {
            Value::Vector(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.coerce(SocketType::Bool)? {
            Value::Bool(b) => Ok(b),
            _ => unreachable!(),
        }
    }

    pub fn as_choice(&self) -> Result<&str> {
        match self {
            Value::Choice(s) => Ok(s),
            other => bail!(
                "expected a choice value, got {:?}",
                other.socket_type()
            ),
        }
    }

    /// GLSL literal expression for this value, used for unlinked inputs.
    pub fn glsl_literal(&self) -> Result<String> {
        let out = match self {
            Value::Float(x) => format_glsl_float(*x),
            Value::Integer(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Vector(v) | Value::Color(v) => format!(
                "vec3({}, {}, {})",
                format_glsl_float(v[0]),
                format_glsl_float(v[1]),
                format_glsl_float(v[2])
            ),
            Value::Choice(s) => bail!("choice value `{s}` has no shader literal"),
        };
        Ok(out)
    }
}

/// `Debug` formatting of f32 always keeps a decimal point or exponent, both
/// of which GLSL accepts.
fn format_glsl_float(x: f32) -> String {
    format!("{x:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restrictiveness_is_a_total_order() {
        let all = [
            SocketType::DynamicAny,
            SocketType::Bool,
            SocketType::Integer,
            SocketType::Float,
            SocketType::Vector,
            SocketType::Color,
            SocketType::Dropdown,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.restrictiveness(), b.restrictiveness());
            }
        }
        assert_eq!(
            SocketType::most_restrictive(SocketType::Float, SocketType::Color),
            SocketType::Color
        );
        assert_eq!(
            SocketType::most_restrictive(SocketType::Vector, SocketType::DynamicAny),
            SocketType::Vector
        );
    }

    #[test]
    fn scalar_splats_into_vector() {
        assert_eq!(
            Value::Float(0.5).coerce(SocketType::Color).unwrap(),
            Value::Color([0.5, 0.5, 0.5])
        );
    }

    #[test]
    fn vector_and_color_interchange() {
        assert_eq!(
            Value::Vector([1.0, 2.0, 3.0]).coerce(SocketType::Color).unwrap(),
            Value::Color([1.0, 2.0, 3.0])
        );
    }

    #[test]
    fn choice_does_not_coerce_to_numbers() {
        assert!(Value::Choice("d65".into()).coerce(SocketType::Float).is_err());
    }

    #[test]
    fn glsl_literals_keep_a_decimal_point() {
        assert_eq!(Value::Float(1.0).glsl_literal().unwrap(), "1.0");
        assert_eq!(
            Value::Vector([0.0, 0.812, 0.0]).glsl_literal().unwrap(),
            "vec3(0.0, 0.812, 0.0)"
        );
        assert!(Value::Choice("d65".into()).glsl_literal().is_err());
    }
}
