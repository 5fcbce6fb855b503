#[derive(Debug, Clone)]
pub struct MemoryError {
    pub message: String,
}

impl MemoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap the current OS error, e.g. after a failed mmap or mprotect.
    pub fn os(context: &str) -> Self {
        Self {
            message: format!("{}: {}", context, std::io::Error::last_os_error()),
        }
    }
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "memory error: {}", self.message)
    }
}

impl std::error::Error for MemoryError {}
