// Xn Module Loader
// Lexes, parses, compiles and runs an imported source file in a sub-VM that
// shares the parent's module cache, then exports its global bindings as a
// module record. Modules are cached by their normalized path for the
// lifetime of the top-level VM.

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use crate::builtins;
use crate::compiler::Compiler;
use crate::error::{XnError, XnResult};
use crate::parser::Parser;
use crate::vm::value::{HashMapPayload, HashPair, Module, Value};
use crate::vm::vm::VM;

/// A cache entry; `Loading` marks a module that is mid-execution so cycles
/// surface as a clear error instead of re-entering the loader forever.
pub enum ModuleEntry {
    Loading,
    Ready(Value),
}

pub type ModuleCache = FxHashMap<String, ModuleEntry>;

impl VM {
    pub(crate) fn import_module(&mut self, raw_path: &str) -> XnResult<Value> {
        let with_suffix = if raw_path.ends_with(".xn") {
            raw_path.to_string()
        } else {
            format!("{}.xn", raw_path)
        };
        // relative paths resolve against the current working directory; the
        // canonical spelling keys the cache so aliased paths load once
        let path = std::fs::canonicalize(&with_suffix)
            .map(|p| p.display().to_string())
            .unwrap_or(with_suffix);

        {
            let cache = self.modules.lock();
            match cache.get(&path) {
                Some(ModuleEntry::Ready(module)) => return Ok(module.clone()),
                Some(ModuleEntry::Loading) => {
                    return Err(XnError::import_error(format!(
                        "circular import detected: {}",
                        path
                    )))
                }
                None => {}
            }
        }

        self.modules
            .lock()
            .insert(path.clone(), ModuleEntry::Loading);

        match self.load_module(&path) {
            Ok(module) => {
                self.modules
                    .lock()
                    .insert(path, ModuleEntry::Ready(module.clone()));
                Ok(module)
            }
            Err(e) => {
                self.modules.lock().remove(&path);
                Err(e)
            }
        }
    }

    fn load_module(&mut self, path: &str) -> XnResult<Value> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            XnError::import_error(format!("could not read module {}: {}", path, e))
        })?;
        let source = crate::normalize_source(&raw);
        let full_source = format!("{}\n{}", builtins::load_stdlib(), source);

        let (program, errors) = Parser::parse_source(&full_source, path);
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
            return Err(XnError::import_error(format!(
                "syntax errors in module {}: {}",
                path,
                messages.join("; ")
            )));
        }

        let mut compiler = Compiler::new().with_file(path);
        compiler.compile(&program).map_err(|e| {
            XnError::import_error(format!("error compiling module {}: {}", path, e.message))
        })?;
        let bytecode = compiler.bytecode();
        let symbol_table = bytecode.symbol_table.clone();

        let mut sub_vm = VM::new_module(bytecode, self.modules.clone());
        sub_vm.run().map_err(|e| {
            XnError::import_error(format!("error running module {}: {}", path, e.message))
        })?;

        // export every named global the module actually bound
        let module_constants = sub_vm.constants.clone();
        let mut exports = HashMapPayload::default();
        {
            let globals = sub_vm.globals.read();
            let mut seen = FxHashSet::default();
            for symbol in symbol_table.global_symbols() {
                if symbol.name.starts_with("__") {
                    continue; // compiler-internal loop slots
                }
                let value = globals[symbol.index].clone();
                if matches!(value, Value::Null) {
                    continue;
                }
                // the module's bytecode references its own constants pool
                attach_constants(&value, &module_constants, &mut seen);
                let key = Value::string(symbol.name.as_str());
                exports.insert(
                    key.hash_key().expect("string keys always hash"),
                    HashPair { key, value },
                );
            }
        }

        Ok(Value::Module(Arc::new(Module {
            name: module_name(path),
            exports: Arc::new(Mutex::new(exports)),
        })))
    }
}

/// Walk the export graph (hash values, array elements, closure free lists)
/// and attach the module's constants pool to each closure whose pool is
/// still unset. Cycles are cut with a pointer set.
fn attach_constants(value: &Value, constants: &Arc<Vec<Value>>, seen: &mut FxHashSet<usize>) {
    match value {
        Value::Closure(closure) => {
            if !seen.insert(Arc::as_ptr(closure) as usize) {
                return;
            }
            {
                let mut pool = closure.constants.lock();
                if pool.is_none() {
                    *pool = Some(constants.clone());
                }
            }
            let free_values: Vec<Value> =
                closure.free.iter().map(|cell| cell.lock().clone()).collect();
            for free in &free_values {
                attach_constants(free, constants, seen);
            }
        }
        Value::Array(arr) => {
            if !seen.insert(Arc::as_ptr(arr) as usize) {
                return;
            }
            let elements = arr.lock().clone();
            for element in &elements {
                attach_constants(element, constants, seen);
            }
        }
        Value::Hash(hash) => {
            if !seen.insert(Arc::as_ptr(hash) as usize) {
                return;
            }
            let values: Vec<Value> = hash.lock().values().map(|p| p.value.clone()).collect();
            for value in &values {
                attach_constants(value, constants, seen);
            }
        }
        _ => {}
    }
}

fn module_name(path: &str) -> String {
    let base = path
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(path);
    base.strip_suffix(".xn").unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name() {
        assert_eq!(module_name("utils.xn"), "utils");
        assert_eq!(module_name("lib/nested/utils.xn"), "utils");
        assert_eq!(module_name("bare"), "bare");
    }

    #[test]
    fn test_attach_constants_sets_unset_pools_only() {
        use crate::vm::value::{Closure, CompiledFunction};
        use parking_lot::Mutex;

        let fun = Arc::new(CompiledFunction {
            instructions: Vec::new(),
            num_locals: 0,
            num_parameters: 0,
        });
        let closure = Arc::new(Closure::new(fun.clone(), Vec::new()));
        let preset = Arc::new(Closure {
            fun,
            free: Vec::new(),
            constants: Mutex::new(Some(Arc::new(vec![Value::Integer(1)]))),
        });

        let pool = Arc::new(vec![Value::Integer(2)]);
        let mut seen = FxHashSet::default();
        attach_constants(&Value::Closure(closure.clone()), &pool, &mut seen);
        attach_constants(&Value::Closure(preset.clone()), &pool, &mut seen);

        assert!(Arc::ptr_eq(
            closure.constants.lock().as_ref().unwrap(),
            &pool
        ));
        assert_eq!(preset.constants.lock().as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_attach_constants_handles_cycles() {
        let arr = Arc::new(Mutex::new(Vec::new()));
        arr.lock().push(Value::Array(arr.clone())); // self-referential
        let pool = Arc::new(Vec::new());
        let mut seen = FxHashSet::default();
        attach_constants(&Value::Array(arr), &pool, &mut seen); // must terminate
    }
}
