// Xn Compiler
// Single pass over the AST, emitting bytecode into the current scope's
// instruction buffer. Forward jumps are emitted with a placeholder operand
// and patched once the target is known.

use std::sync::Arc;

use crate::ast::{Expr, MatchCase, Program, Stmt};
use crate::builtins;
use crate::code::{self, Instructions, Opcode};
use crate::compiler::symbol_table::{Symbol, SymbolScope, SymbolTable};
use crate::error::{Span, XnError, XnResult};
use crate::vm::value::{CompiledFunction, Value};

/// Placeholder operand for forward jumps, rewritten by `change_operand`
const PLACEHOLDER: usize = 9999;

/// The compiler's output bundle
#[derive(Clone)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
    pub symbol_table: SymbolTable,
}

#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    #[allow(dead_code)]
    position: usize,
}

/// Per-loop record of the continue target and pending exit jumps
struct LoopContext {
    continue_target: usize,
    break_positions: Vec<usize>,
    continue_positions: Vec<usize>,
}

/// One function's instruction buffer
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
    loops: Vec<LoopContext>,
}

impl CompilationScope {
    fn new() -> Self {
        Self {
            instructions: Instructions::new(),
            last_instruction: None,
            previous_instruction: None,
            loops: Vec::new(),
        }
    }
}

/// The xn bytecode compiler
pub struct Compiler {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
    scope_index: usize,
    file: String,
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (i, name) in builtins::BUILTIN_NAMES.iter().enumerate() {
            symbol_table.define_builtin(i, name);
        }

        Self {
            constants: Vec::new(),
            symbol_table,
            scopes: vec![CompilationScope::new()],
            scope_index: 0,
            file: "<script>".to_string(),
        }
    }

    /// Resume with state from a previous compile (REPL mode)
    pub fn new_with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::new()],
            scope_index: 0,
            file: "<repl>".to_string(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn compile(&mut self, program: &Program) -> XnResult<()> {
        for stmt in &program.statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.scopes[0].instructions.clone(),
            constants: self.constants.clone(),
            symbol_table: self.symbol_table.clone(),
        }
    }

    /// Hand back the REPL-persistent state
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    // ==================== Scopes ====================

    fn current_scope(&self) -> &CompilationScope {
        &self.scopes[self.scope_index]
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        &mut self.scopes[self.scope_index]
    }

    fn current_len(&self) -> usize {
        self.current_scope().instructions.len()
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::new());
        self.scope_index += 1;
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_enclosed(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("scope stack is never empty");
        self.scope_index -= 1;
        let table = std::mem::take(&mut self.symbol_table);
        self.symbol_table = table
            .into_outer()
            .expect("function scope always has an enclosing scope");
        scope.instructions
    }

    fn enter_block_scope(&mut self) {
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_block(outer);
    }

    fn leave_block_scope(&mut self) {
        let table = std::mem::take(&mut self.symbol_table);
        self.symbol_table = table
            .into_outer()
            .expect("block scope always has an enclosing scope");
    }

    // ==================== Emission ====================

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let ins = code::make(op, operands);
        let position = self.current_len();
        let scope = self.current_scope_mut();
        scope.instructions.extend(ins);
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction {
            opcode: op,
            position,
        });
        position
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        matches!(
            self.current_scope().last_instruction,
            Some(EmittedInstruction { opcode, .. }) if opcode == op
        )
    }

    /// Rewrite the operand bytes of a previously emitted instruction
    fn change_operand(&mut self, position: usize, operand: usize) {
        let op = Opcode::from(self.current_scope().instructions[position]);
        let new_instruction = code::make(op, &[operand]);
        let scope = self.current_scope_mut();
        scope.instructions[position..position + new_instruction.len()]
            .copy_from_slice(&new_instruction);
    }

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    fn string_constant(&mut self, s: &str) -> usize {
        self.add_constant(Value::string(s))
    }

    fn error(&self, message: impl Into<String>, span: Span) -> XnError {
        XnError::compile_error(message, span, &self.file)
    }

    // ==================== Symbols ====================

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
            SymbolScope::Free => self.emit(Opcode::GetFree, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index]),
        };
    }

    fn store_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::SetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::SetLocal, &[symbol.index]),
            SymbolScope::Free => self.emit(Opcode::SetFree, &[symbol.index]),
            SymbolScope::Builtin => unreachable!("stores to builtins are rejected before emission"),
        };
    }

    // ==================== Loops ====================

    fn push_loop(&mut self, continue_target: usize) {
        self.current_scope_mut().loops.push(LoopContext {
            continue_target,
            break_positions: Vec::new(),
            continue_positions: Vec::new(),
        });
    }

    fn set_continue_target(&mut self, target: usize) {
        if let Some(ctx) = self.current_scope_mut().loops.last_mut() {
            ctx.continue_target = target;
        }
    }

    /// Pop the innermost loop, patching breaks to `after` and continues to
    /// the recorded continue target.
    fn patch_loop_exits(&mut self, after: usize) {
        let ctx = self
            .current_scope_mut()
            .loops
            .pop()
            .expect("patch_loop_exits is only called with an active loop");
        for position in ctx.break_positions {
            self.change_operand(position, after);
        }
        for position in ctx.continue_positions {
            self.change_operand(position, ctx.continue_target);
        }
    }

    // ==================== Statements ====================

    fn compile_stmt(&mut self, stmt: &Stmt) -> XnResult<()> {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.compile_expr(expr)?;
                self.emit(Opcode::Pop, &[]);
            }
            Stmt::Out { value, .. } => {
                self.compile_expr(value)?;
                self.emit(Opcode::Out, &[]);
            }
            Stmt::Return { value, .. } => {
                self.compile_expr(value)?;
                self.emit(Opcode::ReturnValue, &[]);
            }
            Stmt::Throw { value, .. } => {
                self.compile_expr(value)?;
                self.emit(Opcode::Throw, &[]);
            }
            Stmt::Set {
                name,
                value,
                is_const,
                ..
            } => {
                self.compile_expr(value)?;
                let symbol = if *is_const {
                    self.symbol_table.define_const(name)
                } else {
                    self.symbol_table.define(name)
                };
                self.store_symbol(&symbol);
            }
            Stmt::Assign { name, value, span } => {
                self.compile_expr(value)?;
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| self.error(format!("undefined variable {}", name), *span))?;
                if symbol.is_const {
                    return Err(self.error(format!("cannot assign to constant {}", name), *span));
                }
                if symbol.scope == SymbolScope::Builtin {
                    return Err(self.error(format!("cannot assign to builtin {}", name), *span));
                }
                self.store_symbol(&symbol);
            }
            Stmt::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                self.compile_if(condition, consequence, alternative.as_deref())?;
            }
            Stmt::While {
                condition, body, ..
            } => {
                self.compile_while(condition, body)?;
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                self.compile_for(init, condition, update, body)?;
            }
            Stmt::ForIn {
                variable,
                iterable,
                body,
                ..
            } => {
                self.compile_for_in(variable, iterable, body)?;
            }
            Stmt::Break { span } => {
                if self.current_scope().loops.is_empty() {
                    return Err(self.error("break outside of loop", *span));
                }
                let position = self.emit(Opcode::Jump, &[PLACEHOLDER]);
                self.current_scope_mut()
                    .loops
                    .last_mut()
                    .expect("checked above")
                    .break_positions
                    .push(position);
            }
            Stmt::Continue { span } => {
                if self.current_scope().loops.is_empty() {
                    return Err(self.error("continue outside of loop", *span));
                }
                let position = self.emit(Opcode::Jump, &[PLACEHOLDER]);
                self.current_scope_mut()
                    .loops
                    .last_mut()
                    .expect("checked above")
                    .continue_positions
                    .push(position);
            }
            Stmt::Spawn { call, span } => {
                let (callee, args) = match call {
                    Expr::Call { callee, args, .. } => (callee, args),
                    _ => return Err(self.error("spawn requires a function call", *span)),
                };
                self.compile_expr(callee)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.emit(Opcode::Spawn, &[args.len()]);
            }
            Stmt::Import { path, alias, span } => {
                self.compile_expr(path)?;
                self.emit(Opcode::Import, &[]);

                let name = match alias {
                    Some(alias) => alias.clone(),
                    None => match path {
                        Expr::Str { value, .. } => module_stem(value),
                        _ => {
                            return Err(self.error(
                                "import without 'as' requires a string literal path",
                                *span,
                            ))
                        }
                    },
                };
                let symbol = self.symbol_table.define(&name);
                self.store_symbol(&symbol);
            }
        }
        Ok(())
    }

    fn compile_statements(&mut self, statements: &[Stmt]) -> XnResult<()> {
        for stmt in statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    /// Compile a block whose value is the last expression statement's value;
    /// any other shape yields Null. Used by try/catch and match arms.
    fn compile_statements_value(&mut self, statements: &[Stmt]) -> XnResult<()> {
        match statements.split_last() {
            None => {
                self.emit(Opcode::Null, &[]);
            }
            Some((last, rest)) => {
                self.compile_statements(rest)?;
                match last {
                    Stmt::Expression { expr, .. } => {
                        self.compile_expr(expr)?;
                    }
                    other => {
                        self.compile_stmt(other)?;
                        self.emit(Opcode::Null, &[]);
                    }
                }
            }
        }
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expr,
        consequence: &[Stmt],
        alternative: Option<&[Stmt]>,
    ) -> XnResult<()> {
        self.compile_expr(condition)?;
        let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER]);

        self.compile_statements(consequence)?;

        match alternative {
            None => {
                let after = self.current_len();
                self.change_operand(jump_not_truthy, after);
            }
            Some(alternative) => {
                let jump_over_else = self.emit(Opcode::Jump, &[PLACEHOLDER]);
                let after_consequence = self.current_len();
                self.change_operand(jump_not_truthy, after_consequence);

                self.compile_statements(alternative)?;
                let after_alternative = self.current_len();
                self.change_operand(jump_over_else, after_alternative);
            }
        }
        Ok(())
    }

    fn compile_while(&mut self, condition: &Expr, body: &[Stmt]) -> XnResult<()> {
        let loop_start = self.current_len();
        self.push_loop(loop_start);

        self.compile_expr(condition)?;
        let exit_jump = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER]);

        self.compile_statements(body)?;
        self.emit(Opcode::Jump, &[loop_start]);

        let after = self.current_len();
        self.change_operand(exit_jump, after);
        self.patch_loop_exits(after);
        Ok(())
    }

    fn compile_for(
        &mut self,
        init: &Stmt,
        condition: &Expr,
        update: &Stmt,
        body: &[Stmt],
    ) -> XnResult<()> {
        self.compile_stmt(init)?;

        // continue jumps back to the condition, skipping the update; this
        // mirrors the reference implementation and is documented in DESIGN.md
        let condition_start = self.current_len();
        self.push_loop(condition_start);

        self.compile_expr(condition)?;
        let exit_jump = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER]);

        self.compile_statements(body)?;
        self.compile_stmt(update)?;
        self.emit(Opcode::Jump, &[condition_start]);

        let after = self.current_len();
        self.change_operand(exit_jump, after);
        self.patch_loop_exits(after);
        Ok(())
    }

    fn compile_for_in(&mut self, variable: &str, iterable: &Expr, body: &[Stmt]) -> XnResult<()> {
        self.enter_block_scope();

        self.compile_expr(iterable)?;
        let iter_symbol = self.symbol_table.define("__for_iter");
        self.store_symbol(&iter_symbol);

        let zero = self.add_constant(Value::Integer(0));
        self.emit(Opcode::Constant, &[zero]);
        let idx_symbol = self.symbol_table.define("__for_idx");
        self.store_symbol(&idx_symbol);

        let var_symbol = self.symbol_table.define(variable);

        // header: length > index
        let header = self.current_len();
        self.load_symbol(&iter_symbol);
        let len_name = self.string_constant("len");
        self.emit(Opcode::Member, &[len_name]);
        self.emit(Opcode::Call, &[0]);
        self.load_symbol(&idx_symbol);
        self.emit(Opcode::GreaterThan, &[]);
        let exit_jump = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER]);

        self.load_symbol(&iter_symbol);
        self.load_symbol(&idx_symbol);
        self.emit(Opcode::Index, &[]);
        self.store_symbol(&var_symbol);

        self.push_loop(PLACEHOLDER);
        self.compile_statements(body)?;

        // index increment is the continue target
        let increment = self.current_len();
        self.set_continue_target(increment);
        self.load_symbol(&idx_symbol);
        let one = self.add_constant(Value::Integer(1));
        self.emit(Opcode::Constant, &[one]);
        self.emit(Opcode::Add, &[]);
        self.store_symbol(&idx_symbol);

        self.emit(Opcode::Jump, &[header]);
        let after = self.current_len();
        self.change_operand(exit_jump, after);
        self.patch_loop_exits(after);

        self.leave_block_scope();
        Ok(())
    }

    // ==================== Expressions ====================

    fn compile_expr(&mut self, expr: &Expr) -> XnResult<()> {
        match expr {
            Expr::Integer { value, .. } => {
                let idx = self.add_constant(Value::Integer(*value));
                self.emit(Opcode::Constant, &[idx]);
            }
            Expr::Float { value, .. } => {
                let idx = self.add_constant(Value::Float(*value));
                self.emit(Opcode::Constant, &[idx]);
            }
            Expr::Str { value, .. } => {
                let idx = self.string_constant(value);
                self.emit(Opcode::String, &[idx]);
            }
            Expr::Interpolated { parts, .. } => {
                if parts.is_empty() {
                    let idx = self.string_constant("");
                    self.emit(Opcode::String, &[idx]);
                } else {
                    for (i, part) in parts.iter().enumerate() {
                        self.compile_expr(part)?;
                        if i > 0 {
                            self.emit(Opcode::Add, &[]);
                        }
                    }
                }
            }
            Expr::Boolean { value, .. } => {
                if *value {
                    self.emit(Opcode::True, &[]);
                } else {
                    self.emit(Opcode::False, &[]);
                }
            }
            Expr::Identifier { name, span } => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| self.error(format!("undefined variable {}", name), *span))?;
                self.load_symbol(&symbol);
            }
            Expr::Prefix {
                operator,
                right,
                span,
            } => {
                self.compile_expr(right)?;
                match operator.as_str() {
                    "!" => self.emit(Opcode::Bang, &[]),
                    "-" => self.emit(Opcode::Minus, &[]),
                    "~" => self.emit(Opcode::BitNot, &[]),
                    other => {
                        return Err(
                            self.error(format!("unknown prefix operator {}", other), *span)
                        )
                    }
                };
            }
            Expr::Infix {
                operator,
                left,
                right,
                span,
            } => {
                self.compile_infix(operator, left, right, *span)?;
            }
            Expr::Postfix {
                operator,
                left,
                span,
            } => {
                self.compile_postfix(operator, left, *span)?;
            }
            Expr::Array { elements, .. } => {
                for element in elements {
                    self.compile_expr(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }
            Expr::HashLit { pairs, .. } => {
                for (key, value) in pairs {
                    self.compile_expr(key)?;
                    self.compile_expr(value)?;
                }
                self.emit(Opcode::Hash, &[pairs.len() * 2]);
            }
            Expr::Index { left, index, .. } => {
                self.compile_expr(left)?;
                self.compile_expr(index)?;
                self.emit(Opcode::Index, &[]);
            }
            Expr::Member { object, member, .. } => {
                self.compile_expr(object)?;
                let idx = self.string_constant(member);
                self.emit(Opcode::Member, &[idx]);
            }
            Expr::Call { callee, args, .. } => {
                self.compile_expr(callee)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.emit(Opcode::Call, &[args.len()]);
            }
            Expr::Function { params, body, .. } => {
                self.compile_function(params, body)?;
            }
            Expr::Match { value, cases, .. } => {
                self.compile_match(value, cases)?;
            }
            Expr::Try {
                block,
                catch_param,
                catch_block,
                ..
            } => {
                self.compile_try(block, catch_param.as_deref(), catch_block)?;
            }
            Expr::Pipe {
                left, right, span, ..
            } => {
                self.compile_pipe(left, right, *span)?;
            }
        }
        Ok(())
    }

    fn compile_infix(
        &mut self,
        operator: &str,
        left: &Expr,
        right: &Expr,
        span: Span,
    ) -> XnResult<()> {
        // `<` is lowered as `>` with swapped operands
        if operator == "<" {
            self.compile_expr(right)?;
            self.compile_expr(left)?;
            self.emit(Opcode::GreaterThan, &[]);
            return Ok(());
        }

        // Short-circuit logic. JumpNotTruthy pops, so `&&` duplicates the
        // left value to keep the first falsy value as the result; JumpTruthy
        // peeks, so `||` keeps the first truthy value and pops it only when
        // the right side must run. Both forms leave exactly one value.
        if operator == "&&" {
            self.compile_expr(left)?;
            self.emit(Opcode::Dup, &[]);
            let end_jump = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER]);
            self.emit(Opcode::Pop, &[]);
            self.compile_expr(right)?;
            let after = self.current_len();
            self.change_operand(end_jump, after);
            return Ok(());
        }
        if operator == "||" {
            self.compile_expr(left)?;
            let end_jump = self.emit(Opcode::JumpTruthy, &[PLACEHOLDER]);
            self.emit(Opcode::Pop, &[]);
            self.compile_expr(right)?;
            let after = self.current_len();
            self.change_operand(end_jump, after);
            return Ok(());
        }

        self.compile_expr(left)?;
        self.compile_expr(right)?;

        match operator {
            "+" => self.emit(Opcode::Add, &[]),
            "-" => self.emit(Opcode::Sub, &[]),
            "*" => self.emit(Opcode::Mul, &[]),
            "/" => self.emit(Opcode::Div, &[]),
            "%" => self.emit(Opcode::Mod, &[]),
            ">" => self.emit(Opcode::GreaterThan, &[]),
            "==" => self.emit(Opcode::Equal, &[]),
            "!=" => self.emit(Opcode::NotEqual, &[]),
            "&" => self.emit(Opcode::BitAnd, &[]),
            "|" => self.emit(Opcode::BitOr, &[]),
            "^" => self.emit(Opcode::BitXor, &[]),
            "<<" => self.emit(Opcode::Lshift, &[]),
            ">>" => self.emit(Opcode::Rshift, &[]),
            other => return Err(self.error(format!("unknown operator {}", other), span)),
        };
        Ok(())
    }

    /// `x++` / `x--`: duplicate the original as the expression value,
    /// then store the bumped value back
    fn compile_postfix(&mut self, operator: &str, left: &Expr, span: Span) -> XnResult<()> {
        let name = match left {
            Expr::Identifier { name, .. } => name,
            _ => return Err(self.error("postfix operator requires an identifier", span)),
        };

        let symbol = self
            .symbol_table
            .resolve(name)
            .ok_or_else(|| self.error(format!("undefined variable {}", name), span))?;
        if symbol.scope == SymbolScope::Builtin {
            return Err(self.error(format!("cannot increment builtin {}", name), span));
        }
        if symbol.is_const {
            return Err(self.error(format!("cannot assign to constant {}", name), span));
        }

        self.load_symbol(&symbol);
        self.emit(Opcode::Dup, &[]);
        let one = self.add_constant(Value::Integer(1));
        self.emit(Opcode::Constant, &[one]);
        match operator {
            "++" => self.emit(Opcode::Add, &[]),
            "--" => self.emit(Opcode::Sub, &[]),
            other => return Err(self.error(format!("unknown postfix operator {}", other), span)),
        };
        self.store_symbol(&symbol);
        Ok(())
    }

    fn compile_function(&mut self, params: &[String], body: &[Stmt]) -> XnResult<()> {
        self.enter_scope();

        for param in params {
            self.symbol_table.define(param);
        }

        self.compile_statements(body)?;

        if !self.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Return, &[]);
        }

        let free_symbols = self.symbol_table.free_symbols.clone();
        let num_locals = self.symbol_table.num_definitions;
        let instructions = self.leave_scope();

        // captures sit on the stack below the Closure instruction
        for symbol in &free_symbols {
            self.load_symbol(symbol);
        }

        let fun = CompiledFunction {
            instructions,
            num_locals,
            num_parameters: params.len(),
        };
        let idx = self.add_constant(Value::CompiledFunction(Arc::new(fun)));
        self.emit(Opcode::Closure, &[idx, free_symbols.len()]);
        Ok(())
    }

    /// Dup/Equal chain; each arm body is a value-producing block
    fn compile_match(&mut self, value: &Expr, cases: &[MatchCase]) -> XnResult<()> {
        self.compile_expr(value)?;

        let mut end_jumps = Vec::new();
        let mut matched_all = false;

        for case in cases {
            if let Expr::Identifier { name, .. } = &case.pattern {
                if name == "_" {
                    // wildcard: unconditional, later arms are unreachable
                    self.emit(Opcode::Pop, &[]);
                    self.compile_statements_value(&case.body)?;
                    matched_all = true;
                    break;
                }
            }

            self.emit(Opcode::Dup, &[]);
            self.compile_expr(&case.pattern)?;
            self.emit(Opcode::Equal, &[]);
            let next_case = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER]);

            self.emit(Opcode::Pop, &[]);
            self.compile_statements_value(&case.body)?;
            end_jumps.push(self.emit(Opcode::Jump, &[PLACEHOLDER]));

            let here = self.current_len();
            self.change_operand(next_case, here);
        }

        if !matched_all {
            self.emit(Opcode::Pop, &[]);
            self.emit(Opcode::Null, &[]);
        }

        let end = self.current_len();
        for position in end_jumps {
            self.change_operand(position, end);
        }
        Ok(())
    }

    fn compile_try(
        &mut self,
        block: &[Stmt],
        catch_param: Option<&str>,
        catch_block: &[Stmt],
    ) -> XnResult<()> {
        let catch_register = self.emit(Opcode::Catch, &[PLACEHOLDER]);

        self.compile_statements_value(block)?;
        self.emit(Opcode::EndCatch, &[]);
        let jump_over_catch = self.emit(Opcode::Jump, &[PLACEHOLDER]);

        let catch_start = self.current_len();
        self.change_operand(catch_register, catch_start);

        // the VM re-pushes the thrown value before entering the handler
        match catch_param {
            Some(param) => {
                self.enter_block_scope();
                let symbol = self.symbol_table.define(param);
                self.store_symbol(&symbol);
                self.compile_statements_value(catch_block)?;
                self.leave_block_scope();
            }
            None => {
                self.emit(Opcode::Pop, &[]);
                self.compile_statements_value(catch_block)?;
            }
        }

        let after = self.current_len();
        self.change_operand(jump_over_catch, after);
        Ok(())
    }

    /// `x |> f(a)` calls `f(x, a)`; `x |> f` calls `f(x)`
    fn compile_pipe(&mut self, left: &Expr, right: &Expr, span: Span) -> XnResult<()> {
        match right {
            Expr::Call { callee, args, .. } => {
                self.compile_expr(callee)?;
                self.compile_expr(left)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.emit(Opcode::Call, &[args.len() + 1]);
            }
            Expr::Identifier { .. } => {
                self.compile_expr(right)?;
                self.compile_expr(left)?;
                self.emit(Opcode::Call, &[1]);
            }
            _ => {
                return Err(self.error(
                    "pipeline right side must be a function call or identifier",
                    span,
                ))
            }
        }
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// File stem used as the binding name for `import "path"` without an alias
fn module_stem(path: &str) -> String {
    let base = path
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(path);
    base.strip_suffix(".xn").unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{disassemble, make};
    use crate::parser::Parser;

    fn compile(source: &str) -> Bytecode {
        try_compile(source).expect("compile failed")
    }

    fn try_compile(source: &str) -> XnResult<Bytecode> {
        let (program, errors) = Parser::parse_source(source, "<test>");
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        let mut compiler = Compiler::new();
        compiler.compile(&program)?;
        Ok(compiler.bytecode())
    }

    fn concat(parts: Vec<Vec<u8>>) -> Vec<u8> {
        parts.into_iter().flatten().collect()
    }

    fn assert_instructions(source: &str, expected: Vec<Vec<u8>>) {
        let bytecode = compile(source);
        let expected = concat(expected);
        assert_eq!(
            bytecode.instructions,
            expected,
            "\nwant:\n{}\ngot:\n{}",
            disassemble(&expected),
            disassemble(&bytecode.instructions)
        );
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_instructions(
            "1 + 2;",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_less_than_is_swapped_greater_than() {
        assert_instructions(
            "1 < 2;",
            vec![
                make(Opcode::Constant, &[0]), // 2
                make(Opcode::Constant, &[1]), // 1
                make(Opcode::GreaterThan, &[]),
                make(Opcode::Pop, &[]),
            ],
        );
        let bytecode = compile("1 < 2;");
        assert_eq!(bytecode.constants[0], Value::Integer(2));
        assert_eq!(bytecode.constants[1], Value::Integer(1));
    }

    #[test]
    fn test_prefix_operators() {
        assert_instructions(
            "-1; !true; ~5;",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Minus, &[]),
                make(Opcode::Pop, &[]),
                make(Opcode::True, &[]),
                make(Opcode::Bang, &[]),
                make(Opcode::Pop, &[]),
                make(Opcode::Constant, &[1]),
                make(Opcode::BitNot, &[]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_if_statement() {
        assert_instructions(
            "if true { out 10; } out 20;",
            vec![
                make(Opcode::True, &[]),           // 0000
                make(Opcode::JumpNotTruthy, &[8]), // 0001
                make(Opcode::Constant, &[0]),      // 0004
                make(Opcode::Out, &[]),            // 0007
                make(Opcode::Constant, &[1]),      // 0008
                make(Opcode::Out, &[]),            // 0011
            ],
        );
    }

    #[test]
    fn test_if_else_statement() {
        assert_instructions(
            "if true { 10; } else { 20; } 30;",
            vec![
                make(Opcode::True, &[]),            // 0000
                make(Opcode::JumpNotTruthy, &[11]), // 0001
                make(Opcode::Constant, &[0]),       // 0004
                make(Opcode::Pop, &[]),             // 0007
                make(Opcode::Jump, &[15]),          // 0008
                make(Opcode::Constant, &[1]),       // 0011
                make(Opcode::Pop, &[]),             // 0014
                make(Opcode::Constant, &[2]),       // 0015
                make(Opcode::Pop, &[]),             // 0018
            ],
        );
    }

    #[test]
    fn test_global_set_and_get() {
        assert_instructions(
            "set one = 1; set two = 2; one;",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::SetGlobal, &[1]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_string_expressions() {
        assert_instructions(
            "\"mon\" + \"key\";",
            vec![
                make(Opcode::String, &[0]),
                make(Opcode::String, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_array_and_hash_literals() {
        assert_instructions(
            "[1, 2, 3];",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Constant, &[2]),
                make(Opcode::Array, &[3]),
                make(Opcode::Pop, &[]),
            ],
        );
        assert_instructions(
            "{1: 2, 3: 4};",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Constant, &[2]),
                make(Opcode::Constant, &[3]),
                make(Opcode::Hash, &[4]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_index_and_member() {
        assert_instructions(
            "[1][0];",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Array, &[1]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Index, &[]),
                make(Opcode::Pop, &[]),
            ],
        );
        assert_instructions(
            "set h = {}; h.name;",
            vec![
                make(Opcode::Hash, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Member, &[0]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_functions_and_calls() {
        let bytecode = compile("set f = fn(a) { return a; }; f(24);");
        let expected_main = concat(vec![
            make(Opcode::Closure, &[0, 0]),
            make(Opcode::SetGlobal, &[0]),
            make(Opcode::GetGlobal, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::Call, &[1]),
            make(Opcode::Pop, &[]),
        ]);
        assert_eq!(bytecode.instructions, expected_main);

        match &bytecode.constants[0] {
            Value::CompiledFunction(fun) => {
                assert_eq!(fun.num_parameters, 1);
                assert_eq!(fun.num_locals, 1);
                let expected = concat(vec![
                    make(Opcode::GetLocal, &[0]),
                    make(Opcode::ReturnValue, &[]),
                ]);
                assert_eq!(fun.instructions, expected);
            }
            other => panic!("expected compiled function, got {:?}", other),
        }
    }

    #[test]
    fn test_implicit_return() {
        let bytecode = compile("fn() { 1; };");
        match &bytecode.constants[1] {
            Value::CompiledFunction(fun) => {
                let expected = concat(vec![
                    make(Opcode::Constant, &[0]),
                    make(Opcode::Pop, &[]),
                    make(Opcode::Return, &[]),
                ]);
                assert_eq!(fun.instructions, expected);
            }
            other => panic!("expected compiled function, got {:?}", other),
        }
    }

    #[test]
    fn test_closures_capture_free_variables() {
        let bytecode = compile("fn(a) { return fn(b) { return a + b; }; };");

        // inner function reads the capture, then its own parameter
        match &bytecode.constants[0] {
            Value::CompiledFunction(inner) => {
                let expected = concat(vec![
                    make(Opcode::GetFree, &[0]),
                    make(Opcode::GetLocal, &[0]),
                    make(Opcode::Add, &[]),
                    make(Opcode::ReturnValue, &[]),
                ]);
                assert_eq!(inner.instructions, expected);
            }
            other => panic!("expected compiled function, got {:?}", other),
        }

        // outer function pushes the capture before building the closure
        match &bytecode.constants[1] {
            Value::CompiledFunction(outer) => {
                let expected = concat(vec![
                    make(Opcode::GetLocal, &[0]),
                    make(Opcode::Closure, &[0, 1]),
                    make(Opcode::ReturnValue, &[]),
                ]);
                assert_eq!(outer.instructions, expected);
            }
            other => panic!("expected compiled function, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_resolution() {
        assert_instructions(
            "len([]);",
            vec![
                make(Opcode::GetBuiltin, &[1]),
                make(Opcode::Array, &[0]),
                make(Opcode::Call, &[1]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_while_with_break_and_continue() {
        assert_instructions(
            "while true { break; continue; }",
            vec![
                make(Opcode::True, &[]),            // 0000
                make(Opcode::JumpNotTruthy, &[13]), // 0001
                make(Opcode::Jump, &[13]),          // 0004 break
                make(Opcode::Jump, &[0]),           // 0007 continue
                make(Opcode::Jump, &[0]),           // 0010 loop back
            ],
        );
    }

    #[test]
    fn test_c_style_for_continue_targets_condition() {
        let bytecode = compile("for (set i = 0; i < 3; i = i + 1) { continue; }");
        let asm = disassemble(&bytecode.instructions);
        // init: Constant + SetGlobal = 6 bytes; condition starts at 0006
        assert!(
            asm.contains("OpJump 6"),
            "continue should target the condition:\n{}",
            asm
        );
    }

    #[test]
    fn test_postfix_increment() {
        assert_instructions(
            "set i = 5; i++;",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Dup, &[]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_short_circuit_and_or() {
        assert_instructions(
            "1 && 2;",
            vec![
                make(Opcode::Constant, &[0]),       // 0000
                make(Opcode::Dup, &[]),             // 0003
                make(Opcode::JumpNotTruthy, &[11]), // 0004
                make(Opcode::Pop, &[]),             // 0007
                make(Opcode::Constant, &[1]),       // 0008
                make(Opcode::Pop, &[]),             // 0011
            ],
        );
        assert_instructions(
            "1 || 2;",
            vec![
                make(Opcode::Constant, &[0]),    // 0000
                make(Opcode::JumpTruthy, &[10]), // 0003
                make(Opcode::Pop, &[]),          // 0006
                make(Opcode::Constant, &[1]),    // 0007
                make(Opcode::Pop, &[]),          // 0010
            ],
        );
    }

    #[test]
    fn test_pipe_desugars_to_call() {
        assert_instructions(
            "set f = fn(a, b) { return a; }; 1 |> f(2);",
            vec![
                make(Opcode::Closure, &[0, 0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Constant, &[1]), // piped value first
                make(Opcode::Constant, &[2]),
                make(Opcode::Call, &[2]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_try_catch_layout() {
        let bytecode = compile("set r = try { 1 } catch (e) { e };");
        let asm = disassemble(&bytecode.instructions);
        assert!(asm.contains("OpCatch"), "{}", asm);
        assert!(asm.contains("OpEndCatch"), "{}", asm);
        // catch target points past the EndCatch + Jump pair
        assert!(asm.contains("OpCatch 10"), "{}", asm);
    }

    #[test]
    fn test_spawn_statement() {
        assert_instructions(
            "set f = fn() { return 1; }; spawn f();",
            vec![
                make(Opcode::Closure, &[1, 0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Spawn, &[0]),
            ],
        );
    }

    #[test]
    fn test_import_binds_alias() {
        assert_instructions(
            "import \"lib/utils\" as u;",
            vec![
                make(Opcode::String, &[0]),
                make(Opcode::Import, &[]),
                make(Opcode::SetGlobal, &[0]),
            ],
        );
        // without an alias the file stem is bound
        assert_instructions(
            "import \"lib/utils\";",
            vec![
                make(Opcode::String, &[0]),
                make(Opcode::Import, &[]),
                make(Opcode::SetGlobal, &[0]),
            ],
        );
    }

    #[test]
    fn test_compile_errors() {
        assert!(try_compile("foobar;").is_err());
        assert!(try_compile("break;").is_err());
        assert!(try_compile("continue;").is_err());
        assert!(try_compile("set const x = 1; x = 2;").is_err());
        assert!(try_compile("set const x = 1; x++;").is_err());
        assert!(try_compile("5++;").is_err());
        assert!(try_compile("len = 3;").is_err());
        assert!(try_compile("1 |> 2;").is_err());
    }

    #[test]
    fn test_match_lowering() {
        let bytecode = compile("set r = match 2 { 1 => 10, _ => 0 };");
        let asm = disassemble(&bytecode.instructions);
        assert!(asm.contains("OpDup"), "{}", asm);
        assert!(asm.contains("OpEqual"), "{}", asm);
    }

    #[test]
    fn test_module_stem() {
        assert_eq!(module_stem("utils"), "utils");
        assert_eq!(module_stem("lib/utils"), "utils");
        assert_eq!(module_stem("lib/utils.xn"), "utils");
        assert_eq!(module_stem("a\\b\\c.xn"), "c");
    }
}
