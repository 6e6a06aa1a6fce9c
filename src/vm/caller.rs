// Xn Embedder Callback
// Lets host code (the HTTP server builtin, embedders) invoke a user closure.
// Builtins have a flat ABI with no VM handle, so the top-level VM publishes
// its shared state here before running.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::vm::loader::ModuleCache;
use crate::vm::value::{Closure, Value};
use crate::vm::vm::VM;

/// Shared state of the running top-level VM
#[derive(Clone)]
pub struct HostContext {
    pub constants: Arc<Vec<Value>>,
    pub globals: Arc<RwLock<Vec<Value>>>,
    pub modules: Arc<Mutex<ModuleCache>>,
}

static HOST_CONTEXT: RwLock<Option<HostContext>> = RwLock::new(None);

pub fn set_host_context(context: HostContext) {
    *HOST_CONTEXT.write() = Some(context);
}

pub fn host_context() -> Option<HostContext> {
    HOST_CONTEXT.read().clone()
}

/// Run a closure in a sub-VM sharing the top-level globals; returns the
/// closure's result, or an Error value on failure.
pub fn run_closure(closure: &Arc<Closure>, args: Vec<Value>) -> Value {
    let Some(context) = host_context() else {
        return Value::error("engine not initialized");
    };
    run_closure_with(&context, closure, args)
}

/// Same as `run_closure`, against an explicit context
pub fn run_closure_with(context: &HostContext, closure: &Arc<Closure>, args: Vec<Value>) -> Value {
    if args.len() != closure.fun.num_parameters {
        return Value::error(format!(
            "wrong number of arguments: want={}, got={}",
            closure.fun.num_parameters,
            args.len()
        ));
    }

    let constants = closure
        .constants
        .lock()
        .clone()
        .unwrap_or_else(|| context.constants.clone());

    let mut vm = VM::new_worker(
        closure.clone(),
        args,
        constants,
        context.globals.clone(),
        context.modules.clone(),
    );

    match vm.run() {
        Ok(()) => vm.stack_top().unwrap_or(Value::Null),
        Err(e) => Value::error(e.message),
    }
}
