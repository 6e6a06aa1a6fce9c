// Math builtins

use super::{get_int_arg, get_number_arg, wrong_args};
use crate::vm::value::Value;
use rand::Rng;

/// Random integer in [0, max); non-positive max yields 0
pub fn math_random(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    let max = match get_int_arg(&args[0], "math_random") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if max <= 0 {
        return Value::Integer(0);
    }
    Value::Integer(rand::thread_rng().gen_range(0..max))
}

pub fn math_sqrt(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match get_number_arg(&args[0], "math_sqrt") {
        Ok(v) => Value::Float(v.sqrt()),
        Err(e) => e,
    }
}

pub fn math_pow(args: &[Value]) -> Value {
    if args.len() != 2 {
        return wrong_args(args.len(), 2);
    }
    let base = match get_number_arg(&args[0], "math_pow") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exp = match get_number_arg(&args[1], "math_pow") {
        Ok(v) => v,
        Err(e) => return e,
    };
    Value::Float(base.powf(exp))
}
