// Xn Virtual Machine
// Stack-based fetch/decode/dispatch loop over call frames. Spawned workers
// share the globals array (behind one RwLock) and the module cache with the
// parent; each worker owns its stack and frames.

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use std::sync::Arc;

use crate::builtins;
use crate::code::{self, Opcode};
use crate::compiler::Bytecode;
use crate::error::{XnError, XnResult};
use crate::vm::caller::{self, HostContext};
use crate::vm::loader::ModuleCache;
use crate::vm::value::{
    Builtin, Closure, CompiledFunction, HashMapPayload, HashPair, Value,
};

pub const STACK_SIZE: usize = 2048;
pub const GLOBALS_SIZE: usize = 65536;
pub const MAX_FRAMES: usize = 1024;

/// One active function invocation
pub(crate) struct Frame {
    pub(crate) closure: Arc<Closure>,
    /// Constants pool this frame decodes against: the closure's module pool
    /// when set, the owning VM's pool otherwise
    pub(crate) constants: Arc<Vec<Value>>,
    /// Starts at -1; the run loop pre-increments before fetching
    pub(crate) ip: i64,
    pub(crate) base_pointer: usize,
}

impl Frame {
    fn new(closure: Arc<Closure>, constants: Arc<Vec<Value>>, base_pointer: usize) -> Self {
        Self {
            closure,
            constants,
            ip: -1,
            base_pointer,
        }
    }

    #[inline(always)]
    fn instructions(&self) -> &[u8] {
        &self.closure.fun.instructions
    }
}

/// The xn virtual machine
pub struct VM {
    pub(crate) constants: Arc<Vec<Value>>,
    stack: Vec<Value>,
    sp: usize,
    pub(crate) globals: Arc<RwLock<Vec<Value>>>,
    frames: Vec<Frame>,
    handlers: SmallVec<[usize; 4]>,
    pub(crate) modules: Arc<Mutex<ModuleCache>>,
    is_root: bool,
}

impl VM {
    pub fn new(bytecode: Bytecode) -> Self {
        let globals = Arc::new(RwLock::new(vec![Value::Null; GLOBALS_SIZE]));
        Self::new_with_globals(bytecode, globals)
    }

    /// Reuse an existing globals store (REPL mode)
    pub fn new_with_globals(bytecode: Bytecode, globals: Arc<RwLock<Vec<Value>>>) -> Self {
        let main_fn = CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        };
        let main_closure = Arc::new(Closure::new(Arc::new(main_fn), Vec::new()));
        let constants = Arc::new(bytecode.constants);

        Self {
            constants: constants.clone(),
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames: vec![Frame::new(main_closure, constants, 0)],
            handlers: SmallVec::new(),
            modules: Arc::new(Mutex::new(ModuleCache::default())),
            is_root: true,
        }
    }

    /// Sub-VM for an imported module: fresh globals, shared module cache
    pub(crate) fn new_module(bytecode: Bytecode, modules: Arc<Mutex<ModuleCache>>) -> Self {
        let mut vm = Self::new(bytecode);
        vm.modules = modules;
        vm.is_root = false;
        vm
    }

    /// Worker VM running one closure: shared globals and modules, own stack.
    /// The arguments are placed in the frame's local slots.
    pub(crate) fn new_worker(
        closure: Arc<Closure>,
        args: Vec<Value>,
        constants: Arc<Vec<Value>>,
        globals: Arc<RwLock<Vec<Value>>>,
        modules: Arc<Mutex<ModuleCache>>,
    ) -> Self {
        let mut stack = vec![Value::Null; STACK_SIZE];
        let num_locals = closure.fun.num_locals;
        for (slot, arg) in args.into_iter().enumerate() {
            stack[slot] = arg;
        }

        Self {
            constants: constants.clone(),
            stack,
            sp: num_locals,
            globals,
            frames: vec![Frame::new(closure, constants, 0)],
            handlers: SmallVec::new(),
            modules,
            is_root: false,
        }
    }

    /// The element most recently popped off the stack (REPL result)
    pub fn last_popped(&self) -> Value {
        self.stack[self.sp].clone()
    }

    pub fn stack_top(&self) -> Option<Value> {
        if self.sp == 0 {
            None
        } else {
            Some(self.stack[self.sp - 1].clone())
        }
    }

    pub fn globals(&self) -> Arc<RwLock<Vec<Value>>> {
        self.globals.clone()
    }

    /// Shared state handed to the embedder callback layer
    pub fn host_context(&self) -> HostContext {
        HostContext {
            constants: self.constants.clone(),
            globals: self.globals.clone(),
            modules: self.modules.clone(),
        }
    }

    // ==================== Run loop ====================

    pub fn run(&mut self) -> XnResult<()> {
        if self.is_root {
            caller::set_host_context(self.host_context());
        }

        loop {
            {
                let frame = self.current_frame();
                if frame.ip + 1 >= frame.instructions().len() as i64 {
                    break;
                }
            }
            self.current_frame_mut().ip += 1;

            let frame = self.current_frame();
            let ip = frame.ip as usize;
            let op = Opcode::from(frame.instructions()[ip]);

            match op {
                Opcode::Constant | Opcode::String => {
                    let idx = self.read_u16_operand();
                    let value = self.constant(idx)?;
                    self.push(value)?;
                }
                Opcode::Null => self.push(Value::Null)?,
                Opcode::True => self.push(Value::Boolean(true))?,
                Opcode::False => self.push(Value::Boolean(false))?,

                Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::BitAnd
                | Opcode::BitOr
                | Opcode::BitXor
                | Opcode::Lshift
                | Opcode::Rshift
                | Opcode::GreaterThan
                | Opcode::Equal
                | Opcode::NotEqual => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    let result = binary_operation(op, &left, &right)?;
                    self.push(result)?;
                }

                Opcode::Minus => {
                    let operand = self.pop()?;
                    let result = match operand {
                        Value::Integer(v) => Value::Integer(v.wrapping_neg()),
                        Value::Float(v) => Value::Float(-v),
                        other => {
                            return Err(XnError::type_error(format!(
                                "unknown operator: -{}",
                                other.type_name()
                            )))
                        }
                    };
                    self.push(result)?;
                }
                Opcode::Bang => {
                    let operand = self.pop()?;
                    self.push(Value::Boolean(!operand.is_truthy()))?;
                }
                Opcode::BitNot => {
                    let operand = self.pop()?;
                    let result = match operand {
                        Value::Integer(v) => Value::Integer(!v),
                        other => {
                            return Err(XnError::type_error(format!(
                                "unknown operator: ~{}",
                                other.type_name()
                            )))
                        }
                    };
                    self.push(result)?;
                }

                Opcode::Out => {
                    let value = self.pop()?;
                    println!("{}", value);
                }
                Opcode::Pop => {
                    self.pop()?;
                }
                Opcode::Dup => {
                    let value = self.peek()?.clone();
                    self.push(value)?;
                }

                Opcode::SetGlobal => {
                    let idx = self.read_u16_operand();
                    let value = self.pop()?;
                    self.globals.write()[idx] = value;
                }
                Opcode::GetGlobal => {
                    let idx = self.read_u16_operand();
                    let value = self.globals.read()[idx].clone();
                    self.push(value)?;
                }
                Opcode::SetLocal => {
                    let idx = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.pop()?;
                    self.stack[base + idx] = value;
                }
                Opcode::GetLocal => {
                    let idx = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack[base + idx].clone();
                    self.push(value)?;
                }
                Opcode::SetFree => {
                    let idx = self.read_u8_operand();
                    let cell = self.current_frame().closure.free[idx].clone();
                    let value = self.pop()?;
                    *cell.lock() = value;
                }
                Opcode::GetFree => {
                    let idx = self.read_u8_operand();
                    let value = self.current_frame().closure.free[idx].lock().clone();
                    self.push(value)?;
                }
                Opcode::GetBuiltin => {
                    let idx = self.read_u8_operand();
                    let value = builtins::get_by_index(idx).ok_or_else(|| {
                        XnError::runtime_error(format!("unknown builtin index {}", idx))
                    })?;
                    self.push(value)?;
                }

                Opcode::Array => {
                    let count = self.read_u16_operand();
                    let elements = self.stack[self.sp - count..self.sp].to_vec();
                    self.sp -= count;
                    self.push(Value::array(elements))?;
                }
                Opcode::Hash => {
                    let count = self.read_u16_operand();
                    let hash = self.build_hash(count)?;
                    self.push(hash)?;
                }
                Opcode::Index => {
                    let index = self.pop()?;
                    let container = self.pop()?;
                    let result = execute_index(&container, &index)?;
                    self.push(result)?;
                }
                Opcode::Member => {
                    let idx = self.read_u16_operand();
                    let name = match self.constant(idx)? {
                        Value::Str(s) => s,
                        other => {
                            return Err(XnError::runtime_error(format!(
                                "member name must be STRING, got {}",
                                other.type_name()
                            )))
                        }
                    };
                    let receiver = self.pop()?;
                    let result = member_access(&receiver, &name)?;
                    self.push(result)?;
                }

                Opcode::Jump => {
                    let target = self.jump_operand();
                    self.current_frame_mut().ip = target as i64 - 1;
                }
                Opcode::JumpNotTruthy => {
                    let target = self.read_u16_operand();
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target as i64 - 1;
                    }
                }
                Opcode::JumpTruthy => {
                    // peeks: the first truthy value stays as the result of `||`
                    let target = self.read_u16_operand();
                    let truthy = self.peek()?.is_truthy();
                    if truthy {
                        self.current_frame_mut().ip = target as i64 - 1;
                    }
                }

                Opcode::Catch => {
                    let target = self.read_u16_operand();
                    self.handlers.push(target);
                }
                Opcode::EndCatch => {
                    self.handlers.pop();
                }
                Opcode::Throw => {
                    let thrown = self.pop()?;
                    match self.handlers.pop() {
                        Some(target) => {
                            self.push(thrown)?;
                            self.current_frame_mut().ip = target as i64 - 1;
                        }
                        None => {
                            return Err(XnError::runtime_error(format!(
                                "uncaught throw: {}",
                                thrown
                            )))
                        }
                    }
                }

                Opcode::Call => {
                    let num_args = self.read_u8_operand();
                    self.execute_call(num_args)?;
                }
                Opcode::Spawn => {
                    let num_args = self.read_u8_operand();
                    self.execute_spawn(num_args)?;
                }
                Opcode::Closure => {
                    let const_idx = self.read_u16_operand();
                    let num_free = self.read_u8_operand();
                    self.build_closure(const_idx, num_free)?;
                }

                Opcode::ReturnValue => {
                    let value = self.pop()?;
                    let frame = self.frames.pop().expect("frame stack is never empty");
                    if self.frames.is_empty() {
                        self.push(value)?;
                        return Ok(());
                    }
                    self.sp = frame.base_pointer - 1;
                    self.push(value)?;
                }
                Opcode::Return => {
                    let frame = self.frames.pop().expect("frame stack is never empty");
                    if self.frames.is_empty() {
                        self.push(Value::Null)?;
                        return Ok(());
                    }
                    self.sp = frame.base_pointer - 1;
                    self.push(Value::Null)?;
                }

                Opcode::Import => {
                    let path = match self.pop()? {
                        Value::Str(s) => s,
                        other => {
                            return Err(XnError::import_error(format!(
                                "import path must be STRING, got {}",
                                other.type_name()
                            )))
                        }
                    };
                    let module = self.import_module(&path)?;
                    self.push(module)?;
                }
            }
        }

        Ok(())
    }

    // ==================== Fetch helpers ====================

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("frame stack is never empty")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack is never empty")
    }

    fn read_u16_operand(&mut self) -> usize {
        let frame = self.frames.last_mut().expect("frame stack is never empty");
        let ip = frame.ip as usize;
        let value = code::read_u16(&frame.closure.fun.instructions, ip + 1) as usize;
        frame.ip += 2;
        value
    }

    fn read_u8_operand(&mut self) -> usize {
        let frame = self.frames.last_mut().expect("frame stack is never empty");
        let ip = frame.ip as usize;
        let value = code::read_u8(&frame.closure.fun.instructions, ip + 1) as usize;
        frame.ip += 1;
        value
    }

    /// Jump targets overwrite ip, so the operand advance is skipped
    fn jump_operand(&self) -> usize {
        let frame = self.current_frame();
        code::read_u16(&frame.closure.fun.instructions, frame.ip as usize + 1) as usize
    }

    fn constant(&self, idx: usize) -> XnResult<Value> {
        self.current_frame()
            .constants
            .get(idx)
            .cloned()
            .ok_or_else(|| XnError::runtime_error(format!("undefined constant {}", idx)))
    }

    // ==================== Stack ====================

    fn push(&mut self, value: Value) -> XnResult<()> {
        if self.sp >= STACK_SIZE {
            return Err(XnError::runtime_error("stack overflow"));
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> XnResult<Value> {
        if self.sp == 0 {
            return Err(XnError::runtime_error("stack underflow"));
        }
        self.sp -= 1;
        Ok(self.stack[self.sp].clone())
    }

    fn peek(&self) -> XnResult<&Value> {
        if self.sp == 0 {
            return Err(XnError::runtime_error("stack underflow"));
        }
        Ok(&self.stack[self.sp - 1])
    }

    // ==================== Values ====================

    fn build_hash(&mut self, count: usize) -> XnResult<Value> {
        let start = self.sp - count;
        let mut pairs = HashMapPayload::default();

        let mut i = start;
        while i < self.sp {
            let key = self.stack[i].clone();
            let value = self.stack[i + 1].clone();
            let hash_key = key.hash_key().ok_or_else(|| {
                XnError::runtime_error(format!("unusable as hash key: {}", key.type_name()))
            })?;
            pairs.insert(hash_key, HashPair { key, value });
            i += 2;
        }

        self.sp = start;
        Ok(Value::hash(pairs))
    }

    fn build_closure(&mut self, const_idx: usize, num_free: usize) -> XnResult<()> {
        let function = match self.constant(const_idx)? {
            Value::CompiledFunction(fun) => fun,
            other => {
                return Err(XnError::runtime_error(format!(
                    "not a function: {}",
                    other.type_name()
                )))
            }
        };

        let mut free = Vec::with_capacity(num_free);
        for value in &self.stack[self.sp - num_free..self.sp] {
            free.push(Arc::new(Mutex::new(value.clone())));
        }
        self.sp -= num_free;

        self.push(Value::Closure(Arc::new(Closure::new(function, free))))
    }

    // ==================== Calls ====================

    fn execute_call(&mut self, num_args: usize) -> XnResult<()> {
        let callee = self.stack[self.sp - 1 - num_args].clone();
        match callee {
            Value::Closure(closure) => self.call_closure(closure, num_args),
            Value::Builtin(builtin) => self.call_builtin(&builtin, num_args),
            other => Err(XnError::type_error(format!(
                "calling non-function: {}",
                other.type_name()
            ))),
        }
    }

    fn call_closure(&mut self, closure: Arc<Closure>, num_args: usize) -> XnResult<()> {
        if num_args != closure.fun.num_parameters {
            return Err(XnError::runtime_error(format!(
                "wrong number of arguments: want={}, got={}",
                closure.fun.num_parameters, num_args
            )));
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(XnError::runtime_error("frame overflow"));
        }

        let constants = closure
            .constants
            .lock()
            .clone()
            .unwrap_or_else(|| self.constants.clone());

        let base_pointer = self.sp - num_args;
        let num_locals = closure.fun.num_locals;
        if base_pointer + num_locals >= STACK_SIZE {
            return Err(XnError::runtime_error("stack overflow"));
        }

        self.frames.push(Frame::new(closure, constants, base_pointer));
        self.sp = base_pointer + num_locals;
        Ok(())
    }

    fn call_builtin(&mut self, builtin: &Builtin, num_args: usize) -> XnResult<()> {
        let args = self.stack[self.sp - num_args..self.sp].to_vec();
        let result = (builtin.func)(&args);
        self.sp = self.sp - num_args - 1;
        self.push(result)
    }

    /// Start an independent worker sharing constants, globals and the module
    /// cache. The worker owns its stack and frames; failures are logged and
    /// never propagate to the parent.
    fn execute_spawn(&mut self, num_args: usize) -> XnResult<()> {
        let args = self.stack[self.sp - num_args..self.sp].to_vec();
        self.sp -= num_args;
        let target = self.pop()?;

        let closure = match target {
            Value::Closure(closure) => closure,
            Value::CompiledFunction(fun) => Arc::new(Closure::new(fun, Vec::new())),
            other => {
                return Err(XnError::type_error(format!(
                    "spawn target must be a function, got {}",
                    other.type_name()
                )))
            }
        };

        if args.len() != closure.fun.num_parameters {
            return Err(XnError::runtime_error(format!(
                "wrong number of arguments: want={}, got={}",
                closure.fun.num_parameters,
                args.len()
            )));
        }

        let constants = closure
            .constants
            .lock()
            .clone()
            .unwrap_or_else(|| self.constants.clone());
        let globals = self.globals.clone();
        let modules = self.modules.clone();

        std::thread::spawn(move || {
            let mut worker = VM::new_worker(closure, args, constants, globals, modules);
            if let Err(e) = worker.run() {
                eprintln!("spawned worker error: {}", e);
            }
        });

        Ok(())
    }
}

// ==================== Operations ====================

fn binary_operation(op: Opcode, left: &Value, right: &Value) -> XnResult<Value> {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => integer_operation(op, *l, *r),
        (l, r) if is_numeric(l) && is_numeric(r) => {
            float_operation(op, as_f64(l), as_f64(r), left, right)
        }
        (Value::Str(l), Value::Str(r)) if op == Opcode::Add => {
            let mut result = String::with_capacity(l.len() + r.len());
            result.push_str(l);
            result.push_str(r);
            Ok(Value::string(result))
        }
        // a non-string operand concatenates through its printable form
        (Value::Str(l), r) if op == Opcode::Add => Ok(Value::string(format!("{}{}", l, r))),
        (l, Value::Str(r)) if op == Opcode::Add => Ok(Value::string(format!("{}{}", l, r))),
        _ if op == Opcode::Equal => Ok(Value::Boolean(values_equal(left, right))),
        _ if op == Opcode::NotEqual => Ok(Value::Boolean(!values_equal(left, right))),
        _ => Err(XnError::type_error(format!(
            "unsupported types for binary operation: {} {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn integer_operation(op: Opcode, left: i64, right: i64) -> XnResult<Value> {
    let result = match op {
        Opcode::Add => Value::Integer(left.wrapping_add(right)),
        Opcode::Sub => Value::Integer(left.wrapping_sub(right)),
        Opcode::Mul => Value::Integer(left.wrapping_mul(right)),
        Opcode::Div => {
            if right == 0 {
                return Err(XnError::runtime_error("division by zero"));
            }
            Value::Integer(left.wrapping_div(right))
        }
        Opcode::Mod => {
            if right == 0 {
                return Err(XnError::runtime_error("modulo by zero"));
            }
            Value::Integer(left.wrapping_rem(right))
        }
        Opcode::BitAnd => Value::Integer(left & right),
        Opcode::BitOr => Value::Integer(left | right),
        Opcode::BitXor => Value::Integer(left ^ right),
        Opcode::Lshift => Value::Integer(left.wrapping_shl(right as u32)),
        Opcode::Rshift => Value::Integer(left.wrapping_shr(right as u32)),
        Opcode::GreaterThan => Value::Boolean(left > right),
        Opcode::Equal => Value::Boolean(left == right),
        Opcode::NotEqual => Value::Boolean(left != right),
        _ => {
            return Err(XnError::type_error(
                "unsupported types for binary operation: INTEGER INTEGER",
            ))
        }
    };
    Ok(result)
}

/// Mixed numeric operands promote to Float
fn float_operation(
    op: Opcode,
    left: f64,
    right: f64,
    left_value: &Value,
    right_value: &Value,
) -> XnResult<Value> {
    let result = match op {
        Opcode::Add => Value::Float(left + right),
        Opcode::Sub => Value::Float(left - right),
        Opcode::Mul => Value::Float(left * right),
        Opcode::Div => {
            if right == 0.0 {
                return Err(XnError::runtime_error("division by zero"));
            }
            Value::Float(left / right)
        }
        Opcode::Mod => {
            if right == 0.0 {
                return Err(XnError::runtime_error("modulo by zero"));
            }
            Value::Float(left % right)
        }
        Opcode::GreaterThan => Value::Boolean(left > right),
        Opcode::Equal => Value::Boolean(left == right),
        Opcode::NotEqual => Value::Boolean(left != right),
        _ => {
            return Err(XnError::type_error(format!(
                "unsupported types for binary operation: {} {}",
                left_value.type_name(),
                right_value.type_name()
            )))
        }
    };
    Ok(result)
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Integer(_) | Value::Float(_))
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Integer(v) => *v as f64,
        Value::Float(v) => *v,
        _ => unreachable!("checked by is_numeric"),
    }
}

/// Structural equality with Int/Float promotion; mismatched kinds are
/// unequal (match arms rely on this), reference kinds compare by identity
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(l), Value::Float(r)) | (Value::Float(r), Value::Integer(l)) => {
            *l as f64 == *r
        }
        _ => left == right,
    }
}

fn execute_index(container: &Value, index: &Value) -> XnResult<Value> {
    match (container, index) {
        (Value::Array(arr), Value::Integer(i)) => {
            let elements = arr.lock();
            if *i < 0 || *i as usize >= elements.len() {
                Ok(Value::Null)
            } else {
                Ok(elements[*i as usize].clone())
            }
        }
        (Value::Hash(hash), key) => {
            let hash_key = key.hash_key().ok_or_else(|| {
                XnError::runtime_error(format!("unusable as hash key: {}", key.type_name()))
            })?;
            Ok(hash
                .lock()
                .get(&hash_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Value::Null))
        }
        (other, _) => Err(XnError::type_error(format!(
            "index operator not supported: {}",
            other.type_name()
        ))),
    }
}

fn member_access(receiver: &Value, name: &str) -> XnResult<Value> {
    match receiver {
        Value::Hash(hash) => {
            let key = Value::string(name)
                .hash_key()
                .expect("string keys always hash");
            Ok(hash
                .lock()
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Value::Null))
        }
        Value::Array(arr) => match name {
            "len" => {
                let arr = arr.clone();
                Ok(Value::Builtin(Builtin::new(
                    "len",
                    Arc::new(move |args: &[Value]| {
                        if !args.is_empty() {
                            return builtins::wrong_args(args.len(), 0);
                        }
                        Value::Integer(arr.lock().len() as i64)
                    }),
                )))
            }
            // mutates in place, unlike the `push` host builtin
            "push" => {
                let arr = arr.clone();
                Ok(Value::Builtin(Builtin::new(
                    "push",
                    Arc::new(move |args: &[Value]| {
                        if args.len() != 1 {
                            return builtins::wrong_args(args.len(), 1);
                        }
                        arr.lock().push(args[0].clone());
                        Value::Array(arr.clone())
                    }),
                )))
            }
            other => Err(XnError::runtime_error(format!(
                "unknown member {} on ARRAY",
                other
            ))),
        },
        Value::Module(module) => {
            let key = Value::string(name)
                .hash_key()
                .expect("string keys always hash");
            Ok(module
                .exports
                .lock()
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Value::Null))
        }
        other => Err(XnError::type_error(format!(
            "member access not supported on {}",
            other.type_name()
        ))),
    }
}
