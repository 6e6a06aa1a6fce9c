// Xn Built-in Host Functions
// Flat ABI: fn(&[Value]) -> Value, errors returned as Error values.
// The registry order below is stable; the compiler resolves names to
// indices against it and the VM's GetBuiltin loads by index, so adding a
// builtin anywhere but the end is a breaking change.

mod clipboard;
mod collections;
mod convert;
mod fs;
mod json;
mod math;
mod net;
mod strings;
mod time;

use crate::vm::value::{Builtin, Value};
use std::sync::Arc;

/// Registry function type
pub type BuiltinFn = fn(&[Value]) -> Value;

/// Stable, ordered list of builtin names
pub const BUILTIN_NAMES: [&str; 31] = [
    "type",
    "len",
    "push",
    "first",
    "last",
    "pop",
    "readFile",
    "writeFile",
    "toUpperCase",
    "toLowerCase",
    "now",
    "sleep",
    "json_encode",
    "json_decode",
    "fs_remove",
    "fs_exists",
    "http_get",
    "http_serve",
    "math_random",
    "math_sqrt",
    "math_pow",
    "str_split",
    "str_contains",
    "input",
    "int",
    "float",
    "str",
    "bool",
    "typeof",
    "copy",
    "paste",
];

pub fn get_by_name(name: &str) -> Option<BuiltinFn> {
    let func: BuiltinFn = match name {
        "type" => convert::builtin_type,
        "len" => collections::len,
        "push" => collections::push,
        "first" => collections::first,
        "last" => collections::last,
        "pop" => collections::pop,
        "readFile" => fs::read_file,
        "writeFile" => fs::write_file,
        "toUpperCase" => strings::to_upper_case,
        "toLowerCase" => strings::to_lower_case,
        "now" => time::now,
        "sleep" => time::sleep,
        "json_encode" => json::json_encode,
        "json_decode" => json::json_decode,
        "fs_remove" => fs::fs_remove,
        "fs_exists" => fs::fs_exists,
        "http_get" => net::http_get,
        "http_serve" => net::http_serve,
        "math_random" => math::math_random,
        "math_sqrt" => math::math_sqrt,
        "math_pow" => math::math_pow,
        "str_split" => strings::str_split,
        "str_contains" => strings::str_contains,
        "input" => convert::input,
        "int" => convert::to_int,
        "float" => convert::to_float,
        "str" => convert::to_str,
        "bool" => convert::to_bool,
        "typeof" => convert::builtin_type,
        "copy" => clipboard::copy,
        "paste" => clipboard::paste,
        _ => return None,
    };
    Some(func)
}

/// Resolve a registry index to a builtin value
pub fn get_by_index(index: usize) -> Option<Value> {
    let name = BUILTIN_NAMES.get(index)?;
    let func = get_by_name(name)?;
    Some(Value::Builtin(Builtin::new(*name, Arc::new(func))))
}

// Fallback when std/core.xn is missing on disk
const EMBEDDED_STD: &str = include_str!("../../std/core.xn");

/// Standard-library prelude source, prepended to every program and module.
/// An on-disk std/core.xn overrides the embedded copy.
pub fn load_stdlib() -> String {
    std::fs::read_to_string("std/core.xn").unwrap_or_else(|_| EMBEDDED_STD.to_string())
}

// ==================== Argument helpers ====================

pub(crate) fn wrong_args(got: usize, want: usize) -> Value {
    Value::error(format!(
        "wrong number of arguments. got={}, want={}",
        got, want
    ))
}

pub(crate) fn get_string_arg<'a>(value: &'a Value, builtin: &str) -> Result<&'a str, Value> {
    match value {
        Value::Str(s) => Ok(s.as_str()),
        other => Err(Value::error(format!(
            "argument to `{}` must be STRING, got {}",
            builtin,
            other.type_name()
        ))),
    }
}

pub(crate) fn get_int_arg(value: &Value, builtin: &str) -> Result<i64, Value> {
    match value {
        Value::Integer(v) => Ok(*v),
        other => Err(Value::error(format!(
            "argument to `{}` must be INTEGER, got {}",
            builtin,
            other.type_name()
        ))),
    }
}

pub(crate) fn get_number_arg(value: &Value, builtin: &str) -> Result<f64, Value> {
    match value {
        Value::Integer(v) => Ok(*v as f64),
        Value::Float(v) => Ok(*v),
        other => Err(Value::error(format!(
            "argument to `{}` must be NUMBER, got {}",
            builtin,
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_is_stable() {
        // spot-check the canonical indices; these are wire-compatible
        // positions, not an implementation detail
        assert_eq!(BUILTIN_NAMES[0], "type");
        assert_eq!(BUILTIN_NAMES[1], "len");
        assert_eq!(BUILTIN_NAMES[2], "push");
        assert_eq!(BUILTIN_NAMES[17], "http_serve");
        assert_eq!(BUILTIN_NAMES[30], "paste");
    }

    #[test]
    fn test_every_name_resolves() {
        for (i, name) in BUILTIN_NAMES.iter().enumerate() {
            assert!(get_by_name(name).is_some(), "unresolved builtin {}", name);
            assert!(get_by_index(i).is_some(), "unresolved index {}", i);
        }
        assert!(get_by_index(BUILTIN_NAMES.len()).is_none());
    }

    #[test]
    fn test_len_builtin() {
        let len = get_by_name("len").unwrap();
        assert_eq!(
            len(&[Value::array(vec![Value::Integer(1), Value::Integer(2)])]),
            Value::Integer(2)
        );
        assert_eq!(len(&[Value::string("abc")]), Value::Integer(3));
        assert!(len(&[Value::Integer(1)]).is_error());
        assert!(len(&[]).is_error());
    }

    #[test]
    fn test_push_builtin_returns_new_array() {
        let push = get_by_name("push").unwrap();
        let original = Value::array(vec![Value::Integer(1)]);
        let pushed = push(&[original.clone(), Value::Integer(2)]);
        match (&original, &pushed) {
            (Value::Array(old), Value::Array(new)) => {
                assert_eq!(old.lock().len(), 1);
                assert_eq!(new.lock().len(), 2);
            }
            other => panic!("expected arrays, got {:?}", other),
        }
    }

    #[test]
    fn test_conversions() {
        let to_int = get_by_name("int").unwrap();
        let to_str = get_by_name("str").unwrap();
        assert_eq!(to_int(&[Value::string(" 42 ")]), Value::Integer(42));
        assert_eq!(to_int(&[Value::Float(3.9)]), Value::Integer(3));
        assert!(to_int(&[Value::string("nope")]).is_error());
        assert_eq!(to_str(&[Value::Integer(-7)]), Value::string("-7"));

        // str(int(s)) == s for integer strings
        let s = Value::string("-12345");
        assert_eq!(to_str(&[to_int(&[s.clone()])]), s);
    }

    #[test]
    fn test_json_roundtrip() {
        let encode = get_by_name("json_encode").unwrap();
        let decode = get_by_name("json_decode").unwrap();
        let canonical = r#"{"a":[1,2.5,"x",true,null]}"#;
        let decoded = decode(&[Value::string(canonical)]);
        assert!(!decoded.is_error());
        assert_eq!(encode(&[decoded]), Value::string(canonical));
    }

    #[test]
    fn test_math_builtins() {
        let sqrt = get_by_name("math_sqrt").unwrap();
        let pow = get_by_name("math_pow").unwrap();
        let random = get_by_name("math_random").unwrap();
        assert_eq!(sqrt(&[Value::Integer(9)]), Value::Float(3.0));
        assert_eq!(pow(&[Value::Integer(2), Value::Integer(10)]), Value::Float(1024.0));
        match random(&[Value::Integer(10)]) {
            Value::Integer(v) => assert!((0..10).contains(&v)),
            other => panic!("expected integer, got {:?}", other),
        }
        assert_eq!(random(&[Value::Integer(0)]), Value::Integer(0));
    }

    #[test]
    fn test_string_builtins() {
        let split = get_by_name("str_split").unwrap();
        let contains = get_by_name("str_contains").unwrap();
        let upper = get_by_name("toUpperCase").unwrap();

        match split(&[Value::string("a,b,c"), Value::string(",")]) {
            Value::Array(parts) => assert_eq!(parts.lock().len(), 3),
            other => panic!("expected array, got {:?}", other),
        }
        assert_eq!(
            contains(&[Value::string("monkey"), Value::string("onk")]),
            Value::Boolean(true)
        );
        assert_eq!(upper(&[Value::string("abc")]), Value::string("ABC"));
    }
}
