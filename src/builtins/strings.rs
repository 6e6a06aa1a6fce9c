// String builtins

use super::{get_string_arg, wrong_args};
use crate::vm::value::Value;

pub fn to_upper_case(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match get_string_arg(&args[0], "toUpperCase") {
        Ok(s) => Value::string(s.to_uppercase()),
        Err(e) => e,
    }
}

pub fn to_lower_case(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match get_string_arg(&args[0], "toLowerCase") {
        Ok(s) => Value::string(s.to_lowercase()),
        Err(e) => e,
    }
}

pub fn str_split(args: &[Value]) -> Value {
    if args.len() != 2 {
        return wrong_args(args.len(), 2);
    }
    let s = match get_string_arg(&args[0], "str_split") {
        Ok(s) => s,
        Err(e) => return e,
    };
    let sep = match get_string_arg(&args[1], "str_split") {
        Ok(s) => s,
        Err(e) => return e,
    };

    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        s.split(sep).map(Value::string).collect()
    };
    Value::array(parts)
}

pub fn str_contains(args: &[Value]) -> Value {
    if args.len() != 2 {
        return wrong_args(args.len(), 2);
    }
    let s = match get_string_arg(&args[0], "str_contains") {
        Ok(s) => s,
        Err(e) => return e,
    };
    let sub = match get_string_arg(&args[1], "str_contains") {
        Ok(s) => s,
        Err(e) => return e,
    };
    Value::Boolean(s.contains(sub))
}
