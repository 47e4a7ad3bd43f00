use phf::phf_set;

use super::Shape;

/// Identifiers that never trigger an undefined-name error. These resolve
/// at runtime in the emitted JavaScript (host globals plus the runtime
/// preamble's own helpers).
pub static BUILTIN_IDENTIFIERS: phf::Set<&'static str> = phf_set! {
    "console", "Math", "JSON", "Object", "Array", "String", "Number",
    "Boolean", "Date", "Promise", "fetch", "setTimeout", "setInterval",
    "clearTimeout", "clearInterval", "parseInt", "parseFloat", "isNaN",
    "isFinite", "encodeURI", "decodeURI", "encodeURIComponent",
    "decodeURIComponent", "Error", "TypeError", "RangeError",
    "SyntaxError", "RegExp", "Map", "Set", "WeakMap", "WeakSet", "Symbol",
    "Proxy", "Reflect", "Intl", "undefined", "null", "NaN", "Infinity",
    "globalThis", "process", "Buffer", "require", "module", "exports",
    "__dirname", "__filename", "_pipe", "_range", "_deepFreeze", "true",
    "false",
};

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_IDENTIFIERS.contains(name)
}

/// Return shapes of the built-in members user code and the emitter rely
/// on. Members not listed fall back to `Any` without a diagnostic.
pub fn member_shape(receiver: &Shape, name: &str) -> Option<Shape> {
    match receiver {
        Shape::Array(element) => Some(match name {
            "map" | "flatten" => Shape::array_of(Shape::Unknown),
            "filter" | "slice" | "concat" | "take" | "drop" | "unique" | "reverse"
            | "sort" => receiver.clone(),
            "find" | "first" | "last" | "pop" | "shift" => (**element).clone(),
            "some" | "every" | "includes" | "isEmpty" => Shape::Boolean,
            "join" => Shape::String,
            "length" | "indexOf" | "push" | "sum" | "product" | "average" | "max"
            | "min" => Shape::Number,
            "forEach" => Shape::Void,
            "reduce" => Shape::Unknown,
            _ => return None,
        }),
        Shape::String => Some(match name {
            "length" | "indexOf" | "charCodeAt" => Shape::Number,
            "toUpperCase" | "toLowerCase" | "trim" | "capitalize" | "replace"
            | "slice" | "substring" | "charAt" | "repeat" | "padStart" | "padEnd" => Shape::String,
            "split" | "toChars" | "toLines" => Shape::array_of(Shape::String),
            "includes" | "startsWith" | "endsWith" | "isEmpty" | "isBlank" => Shape::Boolean,
            _ => return None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_covers_host_globals_and_runtime_helpers() {
        assert!(is_builtin("console"));
        assert!(is_builtin("process"));
        assert!(is_builtin("_deepFreeze"));
        assert!(!is_builtin("somethingUserDefined"));
    }

    #[test]
    fn array_member_shapes() {
        let numbers = Shape::array_of(Shape::Number);
        assert_eq!(member_shape(&numbers, "map"), Some(Shape::array_of(Shape::Unknown)));
        assert_eq!(member_shape(&numbers, "filter"), Some(numbers.clone()));
        assert_eq!(member_shape(&numbers, "find"), Some(Shape::Number));
        assert_eq!(member_shape(&numbers, "some"), Some(Shape::Boolean));
        assert_eq!(member_shape(&numbers, "join"), Some(Shape::String));
        assert_eq!(member_shape(&numbers, "length"), Some(Shape::Number));
        assert_eq!(member_shape(&numbers, "nonsense"), None);
    }

    #[test]
    fn string_member_shapes() {
        assert_eq!(member_shape(&Shape::String, "length"), Some(Shape::Number));
        assert_eq!(
            member_shape(&Shape::String, "split"),
            Some(Shape::array_of(Shape::String))
        );
        assert_eq!(member_shape(&Shape::String, "isBlank"), Some(Shape::Boolean));
    }
}
