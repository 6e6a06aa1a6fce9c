// Conversion and introspection builtins

use super::wrong_args;
use crate::vm::value::Value;
use std::io::{BufRead, Write};

pub fn builtin_type(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    Value::string(args[0].type_name())
}

pub fn to_int(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match &args[0] {
        Value::Integer(v) => Value::Integer(*v),
        Value::Float(v) => Value::Integer(*v as i64),
        Value::Str(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(v) => Value::Integer(v),
                Err(e) => Value::error(format!(
                    "could not parse string '{}' as integer: {}",
                    trimmed, e
                )),
            }
        }
        _ => Value::error("cannot convert to integer"),
    }
}

pub fn to_float(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match &args[0] {
        Value::Integer(v) => Value::Float(*v as f64),
        Value::Float(v) => Value::Float(*v),
        Value::Str(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<f64>() {
                Ok(v) => Value::Float(v),
                Err(e) => Value::error(format!(
                    "could not parse string '{}' as float: {}",
                    trimmed, e
                )),
            }
        }
        _ => Value::error("cannot convert to float"),
    }
}

/// Printable form of any value
pub fn to_str(args: &[Value]) -> Value {
    if args.len() != 1 {
        return Value::Null;
    }
    Value::string(args[0].to_string())
}

pub fn to_bool(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    Value::Boolean(args[0].is_truthy())
}

/// Read one line from stdin, with an optional prompt
pub fn input(args: &[Value]) -> Value {
    if let Some(Value::Str(prompt)) = args.first() {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();
    }

    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => Value::string(line.trim_end_matches(['\n', '\r'])),
        Err(_) => Value::string(""),
    }
}
