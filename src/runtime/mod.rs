pub mod exec;
pub mod memory_error;

pub use exec::{ExecutableCode, JitAllocator};
pub use memory_error::MemoryError;
