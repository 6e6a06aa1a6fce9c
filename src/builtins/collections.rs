// Array builtins
// `push` here returns a new array; the VM-level `arr.push` member mutates
// in place. Both paths are part of the language surface.

use super::wrong_args;
use crate::vm::value::Value;

pub fn len(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match &args[0] {
        Value::Array(arr) => Value::Integer(arr.lock().len() as i64),
        Value::Str(s) => Value::Integer(s.len() as i64),
        other => Value::error(format!(
            "argument to `len` not supported, got {}",
            other.type_name()
        )),
    }
}

pub fn push(args: &[Value]) -> Value {
    if args.len() != 2 {
        return wrong_args(args.len(), 2);
    }
    match &args[0] {
        Value::Array(arr) => {
            let mut elements = arr.lock().clone();
            elements.push(args[1].clone());
            Value::array(elements)
        }
        other => Value::error(format!(
            "argument to `push` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

pub fn first(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match &args[0] {
        Value::Array(arr) => arr.lock().first().cloned().unwrap_or(Value::Null),
        other => Value::error(format!(
            "argument to `first` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

pub fn last(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match &args[0] {
        Value::Array(arr) => arr.lock().last().cloned().unwrap_or(Value::Null),
        other => Value::error(format!(
            "argument to `last` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

/// New array without the last element; an empty array stays empty
pub fn pop(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match &args[0] {
        Value::Array(arr) => {
            let elements = arr.lock();
            if elements.is_empty() {
                Value::array(Vec::new())
            } else {
                Value::array(elements[..elements.len() - 1].to_vec())
            }
        }
        other => Value::error(format!(
            "argument to `pop` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}
