// Time builtins
// `sleep` blocks the calling VM's thread; there is no async scheduler

use super::{get_int_arg, wrong_args};
use crate::vm::value::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub fn now(_args: &[Value]) -> Value {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    Value::Integer(millis)
}

pub fn sleep(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    let ms = match get_int_arg(&args[0], "sleep") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if ms > 0 {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
    Value::Null
}
