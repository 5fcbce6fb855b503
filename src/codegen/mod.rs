pub mod compile;
pub mod compile_error;
pub mod insn;
pub mod listing;
pub mod x86_64;

pub use compile::Compiler;
pub use compile_error::CompileError;
