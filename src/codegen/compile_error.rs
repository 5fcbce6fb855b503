use crate::codegen::insn::EncodeError;

#[derive(Debug, Clone)]
pub enum CompileError {
    /// An operator found fewer operands than it consumes, or the expression
    /// produced no result at all.
    StackUnderflow {
        operator: Option<char>,
        depth: i32,
    },
    /// More than one value left on the evaluation stack at end of input.
    UnusedOperands { depth: i32 },
    /// An operator symbol the instruction set has no operation for.
    InvalidOperator { operator: char },
    /// The encoder rejected an operation the compiler believes is always
    /// valid; internal-invariant violation, propagated rather than masked.
    Encoding(EncodeError),
}

impl CompileError {
    pub fn underflow_at(operator: char, depth: i32) -> Self {
        CompileError::StackUnderflow {
            operator: Some(operator),
            depth,
        }
    }

    pub fn empty_result(depth: i32) -> Self {
        CompileError::StackUnderflow {
            operator: None,
            depth,
        }
    }

    pub fn unused_operands(depth: i32) -> Self {
        CompileError::UnusedOperands { depth }
    }

    pub fn invalid_operator(operator: char) -> Self {
        CompileError::InvalidOperator { operator }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::StackUnderflow {
                operator: Some(op),
                depth,
            } => write!(
                f,
                "stack underflow: '{}' needs 2 operands, {} available",
                op, depth
            ),
            CompileError::StackUnderflow {
                operator: None, ..
            } => write!(f, "stack underflow: expression produces no result"),
            CompileError::UnusedOperands { depth } => write!(
                f,
                "{} values left on the stack, expected exactly 1 (missing an operator?)",
                depth
            ),
            CompileError::InvalidOperator { operator } => {
                write!(f, "invalid operator '{}'", operator)
            }
            CompileError::Encoding(e) => write!(f, "internal: {}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<EncodeError> for CompileError {
    fn from(e: EncodeError) -> Self {
        CompileError::Encoding(e)
    }
}
