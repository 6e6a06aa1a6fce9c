// Xn Runtime Values
// The tagged universe of runtime values with hashing and printing.
// Uses Arc + parking_lot for the shared, interior-mutable payloads.

use crate::code::Instructions;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// FNV-1a 64 over raw bytes; stable across runs and platforms
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Type tag for hashable keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKeyKind {
    Integer,
    Boolean,
    Str,
}

/// A (type-tag, 64-bit) map key; only Integer, Boolean and String hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: HashKeyKind,
    pub value: u64,
}

/// A hash entry keeps the original key value alongside the payload
#[derive(Debug, Clone)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

pub type HashMapPayload = FxHashMap<HashKey, HashPair>;

/// Bytecode for one function body
#[derive(Debug)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A compiled function paired with its captured free bindings. Each capture
/// is a reference-counted cell: `SetFree` writes through it, so every handle
/// to the same closure observes the mutation.
pub struct Closure {
    pub fun: Arc<CompiledFunction>,
    pub free: Vec<Arc<Mutex<Value>>>,
    /// Constants pool of the module this closure was exported from; unset
    /// for closures running against their own VM's pool.
    pub constants: Mutex<Option<Arc<Vec<Value>>>>,
}

impl Closure {
    pub fn new(fun: Arc<CompiledFunction>, free: Vec<Arc<Mutex<Value>>>) -> Self {
        Self {
            fun,
            free,
            constants: Mutex::new(None),
        }
    }
}

/// An opaque host function handle
#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    pub func: Arc<dyn Fn(&[Value]) -> Value + Send + Sync>,
}

impl Builtin {
    pub fn new(name: impl Into<String>, func: Arc<dyn Fn(&[Value]) -> Value + Send + Sync>) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

/// A user-visible error value (produced by builtins or uncaught machinery)
#[derive(Debug, Clone)]
pub struct ErrorValue {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl ErrorValue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: 0,
            col: 0,
        }
    }
}

/// Exports of an imported source file
pub struct Module {
    pub name: String,
    pub exports: Arc<Mutex<HashMapPayload>>,
}

/// Runtime values
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    Str(Arc<String>),
    Array(Arc<Mutex<Vec<Value>>>),
    Hash(Arc<Mutex<HashMapPayload>>),
    CompiledFunction(Arc<CompiledFunction>),
    Closure(Arc<Closure>),
    Builtin(Builtin),
    Error(Arc<ErrorValue>),
    Module(Arc<Module>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::Str(Arc::new(s.into()))
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Arc::new(Mutex::new(elements)))
    }

    pub fn hash(pairs: HashMapPayload) -> Value {
        Value::Hash(Arc::new(Mutex::new(pairs)))
    }

    pub fn error(message: impl Into<String>) -> Value {
        Value::Error(Arc::new(ErrorValue::new(message)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Boolean(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::Str(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::CompiledFunction(_) => "COMPILED_FUNCTION",
            Value::Closure(_) => "CLOSURE",
            Value::Builtin(_) => "BUILTIN",
            Value::Error(_) => "ERROR",
            Value::Module(_) => "MODULE",
        }
    }

    /// Null, false, 0 and 0.0 are falsy; everything else is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            _ => true,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Map key for the three hashable kinds; None otherwise
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Integer(v) => Some(HashKey {
                kind: HashKeyKind::Integer,
                value: *v as u64,
            }),
            Value::Boolean(b) => Some(HashKey {
                kind: HashKeyKind::Boolean,
                value: *b as u64,
            }),
            Value::Str(s) => Some(HashKey {
                kind: HashKeyKind::Str,
                value: fnv1a_64(s.as_bytes()),
            }),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Arc::ptr_eq(a, b),
            (Value::CompiledFunction(a), Value::CompiledFunction(b)) => Arc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Arc::ptr_eq(&a.func, &b.func),
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(arr) => {
                let items: Vec<String> = arr.lock().iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Hash(hash) => {
                let items: Vec<String> = hash
                    .lock()
                    .values()
                    .map(|pair| format!("{}: {}", pair.key, pair.value))
                    .collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Value::CompiledFunction(fun) => {
                write!(f, "CompiledFunction[{:p}]", Arc::as_ptr(fun))
            }
            Value::Closure(cl) => write!(f, "Closure[{:p}]", Arc::as_ptr(cl)),
            Value::Builtin(_) => write!(f, "builtin function"),
            Value::Error(err) => {
                if err.line != 0 {
                    write!(
                        f,
                        "runtime error: {} (at line {}, col {})",
                        err.message, err.line, err.col
                    )
                } else {
                    write!(f, "ERROR: {}", err.message)
                }
            }
            Value::Module(module) => write!(f, "module({})", module.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_vectors() {
        assert_eq!(fnv1a_64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a_64(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_string_hash_keys_stable() {
        let a1 = Value::string("hello").hash_key().unwrap();
        let a2 = Value::string("hello").hash_key().unwrap();
        let b = Value::string("world").hash_key().unwrap();
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }

    #[test]
    fn test_hash_keys_by_kind() {
        let one = Value::Integer(1).hash_key().unwrap();
        let tru = Value::Boolean(true).hash_key().unwrap();
        assert_eq!(one.value, 1);
        assert_eq!(tru.value, 1);
        assert_ne!(one, tru); // same 64-bit value, different tag

        let neg = Value::Integer(-1).hash_key().unwrap();
        assert_eq!(neg.value, u64::MAX); // bit pattern, not magnitude
    }

    #[test]
    fn test_unhashable_kinds() {
        assert!(Value::Float(1.5).hash_key().is_none());
        assert!(Value::Null.hash_key().is_none());
        assert!(Value::array(vec![]).hash_key().is_none());
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(Value::Integer(-3).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::string("hi").to_string(), "hi");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(
            Value::array(vec![Value::Integer(1), Value::string("x")]).to_string(),
            "[1, x]"
        );
        assert_eq!(Value::error("boom").to_string(), "ERROR: boom");
    }

    #[test]
    fn test_array_equality_is_identity() {
        let a = Value::array(vec![Value::Integer(1)]);
        let b = Value::array(vec![Value::Integer(1)]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
