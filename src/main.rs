mod codegen;
mod lexer;
mod runtime;
mod token;

use std::env;
use std::io::BufRead;

use crate::codegen::CompileError;
use crate::codegen::compile::compile;
use crate::codegen::listing::compile_listing;
use crate::lexer::{Lexer, LexerError};
use crate::runtime::{JitAllocator, MemoryError};

const FLAGS: &[&str] = &["--tokens", "--emit", "--batch", "-", "--help", "-h"];

fn main() {
    let args: Vec<String> = env::args().collect();

    let tokens_only = args.contains(&"--tokens".to_string());
    let emit = args.contains(&"--emit".to_string());
    let batch = args.contains(&"--batch".to_string()) || args.contains(&"-".to_string());

    if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
        print_usage();
        return;
    }

    if batch {
        run_batch();
        return;
    }

    // first non-flag argument is the expression
    let expression = args.iter().skip(1).find(|a| !FLAGS.contains(&a.as_str()));

    match expression {
        Some(expression) => {
            if tokens_only {
                dump_tokens(expression);
            } else if emit {
                dump_listing(expression);
            } else {
                run_expression(expression);
            }
        }
        None => {
            print_usage();
            if args.len() > 1 {
                std::process::exit(1);
            }
        }
    }
}

fn print_usage() {
    println!("KILN - postfix expression JIT evaluator");
    println!();
    println!("Usage:");
    println!("  kiln \"<expr>\"            Compile and run one expression, e.g. \"3 4 +\"");
    println!("  kiln --batch, -           Read one expression per stdin line");
    println!("  kiln --tokens \"<expr>\"    Show tokens only");
    println!("  kiln --emit \"<expr>\"      Show the compiled instruction listing");
    println!("  kiln --help, -h           Show this help");
}

fn run_expression(source: &str) {
    let alloc = JitAllocator::new();
    match eval_expression(source, &alloc) {
        Ok(value) => println!("{}", value),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run_batch() {
    let alloc = JitAllocator::new();
    let stdin = std::io::stdin();

    for (i, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("failed to read stdin: {}", e);
                std::process::exit(1);
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        // one failed line never aborts the batch
        match eval_expression(&line, &alloc) {
            Ok(value) => println!("{}", value),
            Err(e) => eprintln!("line {}: {}", i + 1, e),
        }
    }
}

fn dump_tokens(source: &str) {
    match Lexer::new(source).tokenize() {
        Ok(tokens) => {
            for spanned in tokens {
                println!("{:>4}  {:?}", spanned.col, spanned.token);
            }
        }
        Err(e) => {
            eprintln!("lex error: {}", e);
            std::process::exit(1);
        }
    }
}

fn dump_listing(source: &str) {
    let tokens = match Lexer::new(source).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("lex error: {}", e);
            std::process::exit(1);
        }
    };

    match compile_listing(&tokens) {
        Ok(listing) => listing.print(),
        Err(e) => {
            eprintln!("compile error: {}", e);
            std::process::exit(1);
        }
    }
}

// =============================================================================
// Evaluation pipeline
// =============================================================================

/// Any failure a single expression can produce, one variant per stage.
/// All of them are recoverable at the expression boundary; the allocator and
/// compiler carry no state across expressions.
#[derive(Debug)]
enum EvalError {
    Lex(LexerError),
    Compile(CompileError),
    Memory(MemoryError),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::Lex(e) => write!(f, "lex error: {}", e),
            EvalError::Compile(e) => write!(f, "compile error: {}", e),
            EvalError::Memory(e) => write!(f, "{}", e),
        }
    }
}

impl From<LexerError> for EvalError {
    fn from(e: LexerError) -> Self {
        EvalError::Lex(e)
    }
}

impl From<CompileError> for EvalError {
    fn from(e: CompileError) -> Self {
        EvalError::Compile(e)
    }
}

impl From<MemoryError> for EvalError {
    fn from(e: MemoryError) -> Self {
        EvalError::Memory(e)
    }
}

/// Lex, compile, load, run. Each expression gets its own executable region,
/// released when the handle drops at the end of this function.
fn eval_expression(source: &str, alloc: &JitAllocator) -> Result<i64, EvalError> {
    let tokens = Lexer::new(source).tokenize()?;
    let code = compile(&tokens)?;
    let handle = alloc.load(&code)?;
    Ok(handle.invoke())
}
