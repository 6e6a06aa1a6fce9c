// JSON builtins
// Bridges the value universe to serde_json; whole JSON numbers decode to
// Integer, everything else to Float.

use super::{get_string_arg, wrong_args};
use crate::vm::value::{HashMapPayload, Value};

pub fn json_encode(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match value_to_json(&args[0]) {
        Ok(json) => match serde_json::to_string(&json) {
            Ok(s) => Value::string(s),
            Err(e) => Value::error(format!("json encoding error: {}", e)),
        },
        Err(e) => e,
    }
}

pub fn json_decode(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    let s = match get_string_arg(&args[0], "json_decode") {
        Ok(s) => s,
        Err(e) => return e,
    };
    match serde_json::from_str::<serde_json::Value>(s) {
        Ok(json) => json_to_value(&json),
        Err(e) => Value::error(format!("json decoding error: {}", e)),
    }
}

fn value_to_json(value: &Value) -> Result<serde_json::Value, Value> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Boolean(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Integer(v) => Ok(serde_json::Value::from(*v)),
        Value::Float(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .ok_or_else(|| Value::error("json encoding error: non-finite number")),
        Value::Str(s) => Ok(serde_json::Value::String((**s).clone())),
        Value::Array(arr) => {
            let elements = arr.lock().clone();
            let json: Result<Vec<_>, Value> = elements.iter().map(value_to_json).collect();
            Ok(serde_json::Value::Array(json?))
        }
        Value::Hash(hash) => {
            let pairs = hash.lock().clone();
            let mut map = serde_json::Map::new();
            for pair in pairs.values() {
                map.insert(pair.key.to_string(), value_to_json(&pair.value)?);
            }
            Ok(serde_json::Value::Object(map))
        }
        other => Err(Value::error(format!(
            "json encoding error: cannot encode {}",
            other.type_name()
        ))),
    }
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Value::Integer(v)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::string(s.clone()),
        serde_json::Value::Array(arr) => {
            Value::array(arr.iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(obj) => {
            let mut pairs = HashMapPayload::default();
            for (key, val) in obj {
                let key_value = Value::string(key.clone());
                let hash_key = key_value
                    .hash_key()
                    .expect("string keys always hash");
                pairs.insert(
                    hash_key,
                    crate::vm::value::HashPair {
                        key: key_value,
                        value: json_to_value(val),
                    },
                );
            }
            Value::hash(pairs)
        }
    }
}
