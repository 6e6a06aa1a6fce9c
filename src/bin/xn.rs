// Xn CLI - Command Line Interface
// Usage: xn [FILE] [OPTIONS]

use clap::Parser as ClapParser;
use colored::*;
use parking_lot::RwLock;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use xn::builtins;
use xn::code;
use xn::compiler::Compiler;
use xn::lexer::Scanner;
use xn::parser::Parser;
use xn::vm::{Value, GLOBALS_SIZE, VM};

/// The xn scripting language
#[derive(ClapParser)]
#[command(name = "xn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "The xn scripting language", long_about = None)]
struct Cli {
    /// Source file to run (.xn)
    file: Option<PathBuf>,

    /// Execute inline code
    #[arg(short = 'e', long = "exec")]
    exec: Option<String>,

    /// Debug options: tokens, ast, asm (comma-separated)
    #[arg(short = 'd', long = "debug", value_delimiter = ',')]
    debug: Option<Vec<String>>,

    /// Skip the standard-library prelude
    #[arg(long = "no-std")]
    no_std: bool,
}

#[derive(Default, Clone)]
struct DebugFlags {
    tokens: bool,
    ast: bool,
    asm: bool,
}

impl DebugFlags {
    fn from_options(opts: &Option<Vec<String>>) -> Self {
        let mut flags = Self::default();
        if let Some(opts) = opts {
            for opt in opts {
                match opt.as_str() {
                    "tokens" => flags.tokens = true,
                    "ast" => flags.ast = true,
                    "asm" => flags.asm = true,
                    _ => eprintln!("{} unknown debug option: {}", "!".yellow(), opt),
                }
            }
        }
        flags
    }
}

fn main() {
    let cli = Cli::parse();
    let debug = DebugFlags::from_options(&cli.debug);

    let result = if let Some(source) = cli.exec {
        run_source(&source, "<exec>", &debug, cli.no_std)
    } else if let Some(path) = cli.file {
        match fs::read_to_string(&path) {
            Ok(source) => run_source(&source, &path.to_string_lossy(), &debug, cli.no_std),
            Err(e) => Err(format!("error reading file '{}': {}", path.display(), e)),
        }
    } else {
        repl()
    };

    if let Err(message) = result {
        eprintln!("{}", message);
        std::process::exit(1);
    }
}

fn run_source(source: &str, file: &str, debug: &DebugFlags, no_std: bool) -> Result<(), String> {
    let source = xn::normalize_source(source);
    let full_source = if no_std {
        source
    } else {
        format!("{}\n{}", builtins::load_stdlib(), source)
    };

    if debug.tokens {
        for token in Scanner::new(&full_source).scan_tokens() {
            println!("{:?}", token);
        }
    }

    let (program, errors) = Parser::parse_source(&full_source, file);
    if !errors.is_empty() {
        let mut out = format!("{}", "Syntax errors:".red().bold());
        for error in &errors {
            out.push_str(&format!("\n  {}", error));
        }
        return Err(out);
    }

    if debug.ast {
        println!("{:#?}", program);
    }

    let mut compiler = Compiler::new().with_file(file);
    compiler.compile(&program).map_err(|e| e.to_string())?;
    let bytecode = compiler.bytecode();

    if debug.asm {
        println!("--- {} ---", file);
        print!("{}", code::disassemble(&bytecode.instructions));
        for (i, constant) in bytecode.constants.iter().enumerate() {
            if let Value::CompiledFunction(fun) = constant {
                println!(
                    "--- fn constants[{}] (locals={}, params={}) ---",
                    i, fun.num_locals, fun.num_parameters
                );
                print!("{}", code::disassemble(&fun.instructions));
            }
        }
    }

    let mut vm = VM::new(bytecode);
    vm.run().map_err(|e| e.to_string())
}

fn repl() -> Result<(), String> {
    use reedline::{
        DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal,
    };

    println!("xn {} repl — type 'exit' to quit", env!("CARGO_PKG_VERSION"));

    let globals = Arc::new(RwLock::new(vec![Value::Null; GLOBALS_SIZE]));
    let (mut symbol_table, mut constants) = Compiler::new().into_state();

    // make the prelude available to the session
    let std_source = builtins::load_stdlib();
    let (std_program, std_errors) = Parser::parse_source(&std_source, "std/core.xn");
    if std_errors.is_empty() {
        let mut compiler = Compiler::new_with_state(symbol_table, constants);
        match compiler.compile(&std_program) {
            Ok(()) => {
                let bytecode = compiler.bytecode();
                let (table, consts) = compiler.into_state();
                symbol_table = table;
                constants = consts;
                let mut vm = VM::new_with_globals(bytecode, globals.clone());
                if let Err(e) = vm.run() {
                    eprintln!("{} {}", "warning:".yellow(), e);
                }
            }
            Err(e) => {
                let (table, consts) = compiler.into_state();
                symbol_table = table;
                constants = consts;
                eprintln!("{} {}", "warning:".yellow(), e);
            }
        }
    }

    let history = FileBackedHistory::with_file(200, ".xn_history".into())
        .map_err(|e| e.to_string())?;
    let mut editor = Reedline::create().with_history(Box::new(history));
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("xn".to_string()),
        DefaultPromptSegment::Empty,
    );

    loop {
        match editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }

                let (program, errors) = Parser::parse_source(line, "<repl>");
                if !errors.is_empty() {
                    for error in errors {
                        eprintln!("{}", error);
                    }
                    continue;
                }

                let mut compiler = Compiler::new_with_state(symbol_table, constants);
                match compiler.compile(&program) {
                    Ok(()) => {
                        let bytecode = compiler.bytecode();
                        let (table, consts) = compiler.into_state();
                        symbol_table = table;
                        constants = consts;

                        let mut vm = VM::new_with_globals(bytecode, globals.clone());
                        match vm.run() {
                            Ok(()) => println!("{}", vm.last_popped()),
                            Err(e) => eprintln!("{}", e),
                        }
                    }
                    Err(e) => {
                        let (table, consts) = compiler.into_state();
                        symbol_table = table;
                        constants = consts;
                        eprintln!("{}", e);
                    }
                }
            }
            Ok(Signal::CtrlC) => continue,
            Ok(Signal::CtrlD) => break,
            Err(e) => return Err(e.to_string()),
        }
    }

    Ok(())
}
