use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// Structural value shapes. `Any` and `Unknown` are bidirectional
/// wildcards; everything else compares by structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Shape {
    Unknown,
    Any,
    Number,
    String,
    Boolean,
    Null,
    Void,
    Array(Box<Shape>),
    Object(IndexMap<String, Shape>),
    Function {
        params: Vec<Shape>,
        ret: Box<Shape>,
    },
    Enum {
        name: String,
        members: Vec<String>,
    },
}

impl Shape {
    pub fn array_of(element: Shape) -> Shape {
        Shape::Array(Box::new(element))
    }

    pub fn function(params: Vec<Shape>, ret: Shape) -> Shape {
        Shape::Function {
            params,
            ret: Box::new(ret),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Shape::Any | Shape::Unknown)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Shape::Function { .. }) || self.is_wildcard()
    }

    /// `expected` accepts `actual`. Arrays compare by element; objects
    /// structurally: every key the expected side requires must exist and
    /// be compatible in the actual.
    pub fn compatible(expected: &Shape, actual: &Shape) -> bool {
        if expected.is_wildcard() || actual.is_wildcard() {
            return true;
        }
        match (expected, actual) {
            (Shape::Array(e), Shape::Array(a)) => Shape::compatible(e, a),
            (Shape::Object(exp), Shape::Object(act)) => exp
                .iter()
                .all(|(key, shape)| act.get(key).is_some_and(|a| Shape::compatible(shape, a))),
            (Shape::Function { .. }, Shape::Function { .. }) => true,
            (Shape::Enum { name: a, .. }, Shape::Enum { name: b, .. }) => a == b,
            _ => expected == actual,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Unknown => f.write_str("unknown"),
            Shape::Any => f.write_str("any"),
            Shape::Number => f.write_str("number"),
            Shape::String => f.write_str("string"),
            Shape::Boolean => f.write_str("boolean"),
            Shape::Null => f.write_str("null"),
            Shape::Void => f.write_str("void"),
            Shape::Array(element) => write!(f, "array of {}", element),
            Shape::Object(props) => write!(f, "object with {} propert{}", props.len(), if props.len() == 1 { "y" } else { "ies" }),
            Shape::Function { params, .. } => write!(f, "function({} parameter{})", params.len(), if params.len() == 1 { "" } else { "s" }),
            Shape::Enum { name, .. } => write!(f, "enum {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: &[(&str, Shape)]) -> Shape {
        Shape::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn wildcards_accept_everything() {
        assert!(Shape::compatible(&Shape::Any, &Shape::Number));
        assert!(Shape::compatible(&Shape::Number, &Shape::Unknown));
        assert!(Shape::compatible(&Shape::Unknown, &Shape::Any));
    }

    #[test]
    fn primitives_compare_by_equality() {
        assert!(Shape::compatible(&Shape::Number, &Shape::Number));
        assert!(!Shape::compatible(&Shape::Number, &Shape::String));
    }

    #[test]
    fn arrays_compare_by_element() {
        assert!(Shape::compatible(
            &Shape::array_of(Shape::Number),
            &Shape::array_of(Shape::Number)
        ));
        assert!(!Shape::compatible(
            &Shape::array_of(Shape::Number),
            &Shape::array_of(Shape::String)
        ));
    }

    #[test]
    fn objects_compare_structurally() {
        let expected = obj(&[("foo", Shape::String)]);
        let actual = obj(&[("foo", Shape::String), ("extra", Shape::Number)]);
        assert!(Shape::compatible(&expected, &actual));
        // Missing required key.
        assert!(!Shape::compatible(&actual, &expected));
    }

    #[test]
    fn enums_compare_by_name() {
        let a = Shape::Enum { name: "Color".into(), members: vec!["RED".into()] };
        let b = Shape::Enum { name: "Color".into(), members: vec!["RED".into(), "BLUE".into()] };
        let c = Shape::Enum { name: "Size".into(), members: vec![] };
        assert!(Shape::compatible(&a, &b));
        assert!(!Shape::compatible(&a, &c));
    }
}
