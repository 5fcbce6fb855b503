// =============================================================================
// INSN - Symbolic machine operations
// =============================================================================

/// The eight legacy x86-64 general-purpose registers, with their 3-bit
/// encoding numbers. RAX doubles as scratch A and the return-value register;
/// RCX is scratch B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Rax,
    Rcx,
    Rdx,
    Rbx,
    Rsp,
    Rbp,
    Rsi,
    Rdi,
}

impl Reg {
    pub fn number(self) -> u8 {
        match self {
            Reg::Rax => 0,
            Reg::Rcx => 1,
            Reg::Rdx => 2,
            Reg::Rbx => 3,
            Reg::Rsp => 4,
            Reg::Rbp => 5,
            Reg::Rsi => 6,
            Reg::Rdi => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::Rax => "rax",
            Reg::Rcx => "rcx",
            Reg::Rdx => "rdx",
            Reg::Rbx => "rbx",
            Reg::Rsp => "rsp",
            Reg::Rbp => "rbp",
            Reg::Rsi => "rsi",
            Reg::Rdi => "rdi",
        }
    }
}

/// One symbolic operation, 0-2 operands. Constructed by the compiler and
/// immediately handed to an encoder; never stored in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Insn {
    /// push r64 onto the runtime stack
    Push(Reg),
    /// pop from the runtime stack into r64
    Pop(Reg),
    /// movabs r64, imm64
    MovImm(Reg, i64),
    /// mov dst, src
    Mov(Reg, Reg),
    /// add dst, src
    Add(Reg, Reg),
    /// sub dst, src
    Sub(Reg, Reg),
    /// imul dst, src (signed)
    Imul(Reg, Reg),
    /// sign-extend rax into rdx:rax
    Cqo,
    /// signed divide rdx:rax by r64, quotient in rax
    Idiv(Reg),
    Leave,
    Ret,
}

/// An encoder rejecting an operation. The bundled x86-64 encoder is total
/// over `Insn`, so reaching this through it means a broken invariant
/// somewhere; the compiler still propagates it instead of panicking.
#[derive(Debug, Clone)]
pub struct EncodeError {
    pub message: String,
}

impl EncodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "encode error: {}", self.message)
    }
}

impl std::error::Error for EncodeError {}

/// The narrow seam between the compiler and a target architecture: turn one
/// symbolic operation into exact bytes, appended to `out`. Stateless per
/// call.
pub trait InsnEncoder {
    fn encode(&mut self, insn: &Insn, out: &mut Vec<u8>) -> Result<(), EncodeError>;
}

impl<E: InsnEncoder + ?Sized> InsnEncoder for &mut E {
    fn encode(&mut self, insn: &Insn, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        (**self).encode(insn, out)
    }
}
