// Xn Compiler Module

pub mod compiler;
pub mod symbol_table;

pub use compiler::{Bytecode, Compiler};
pub use symbol_table::{Symbol, SymbolScope, SymbolTable};
