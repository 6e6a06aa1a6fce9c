// Filesystem builtins

use super::{get_string_arg, wrong_args};
use crate::vm::value::Value;
use std::fs;
use std::path::Path;

pub fn read_file(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    let path = match get_string_arg(&args[0], "readFile") {
        Ok(s) => s,
        Err(e) => return e,
    };
    match fs::read_to_string(path) {
        Ok(content) => Value::string(content),
        Err(e) => Value::error(format!("could not read file {}: {}", path, e)),
    }
}

pub fn write_file(args: &[Value]) -> Value {
    if args.len() != 2 {
        return wrong_args(args.len(), 2);
    }
    let path = match get_string_arg(&args[0], "writeFile") {
        Ok(s) => s,
        Err(e) => return e,
    };
    let data = match get_string_arg(&args[1], "writeFile") {
        Ok(s) => s,
        Err(e) => return e,
    };
    match fs::write(path, data) {
        Ok(()) => Value::Null,
        Err(e) => Value::error(format!("could not write file {}: {}", path, e)),
    }
}

pub fn fs_remove(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    let path = match get_string_arg(&args[0], "fs_remove") {
        Ok(s) => s,
        Err(e) => return e,
    };
    match fs::remove_file(path) {
        Ok(()) => Value::Null,
        Err(e) => Value::error(e.to_string()),
    }
}

pub fn fs_exists(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    let path = match get_string_arg(&args[0], "fs_exists") {
        Ok(s) => s,
        Err(e) => return e,
    };
    Value::Boolean(Path::new(path).exists())
}
