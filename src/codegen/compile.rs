use crate::codegen::compile_error::CompileError;
use crate::codegen::insn::{Insn, InsnEncoder, Reg};
use crate::codegen::x86_64::X86Encoder;
use crate::lexer::Spanned;
use crate::token::Token;

// Scratch registers: A holds the left operand and the result, B the right.
const SCRATCH_A: Reg = Reg::Rax;
const SCRATCH_B: Reg = Reg::Rcx;

/// One-pass translator from a postfix token stream to a native function
/// body. There is no intermediate representation: each token expands into a
/// fixed instruction template, appended straight to the output buffer.
///
/// The only analysis state is `depth`, the number of values that would be on
/// the runtime stack at this point of the emitted code. It must end at
/// exactly 1 and may never drop below 2 when an operator consumes its
/// operands, which catches every malformed expression before any code runs.
pub struct Compiler<E: InsnEncoder> {
    encoder: E,
    code: Vec<u8>,
    depth: i32,
}

impl Compiler<X86Encoder> {
    pub fn new() -> Self {
        Compiler::with_encoder(X86Encoder::new())
    }
}

impl<E: InsnEncoder> Compiler<E> {
    pub fn with_encoder(encoder: E) -> Self {
        Compiler {
            encoder,
            code: Vec::new(),
            depth: 0,
        }
    }

    /// Compile a full expression into the body of an
    /// `extern "C" fn() -> i64`, prologue and epilogue included.
    pub fn compile(mut self, tokens: &[Spanned]) -> Result<Vec<u8>, CompileError> {
        self.emit(Insn::Push(Reg::Rbp))?;
        self.emit(Insn::Mov(Reg::Rbp, Reg::Rsp))?;

        for spanned in tokens {
            match spanned.token {
                Token::Integer(n) => self.compile_literal(n)?,
                Token::Operator(op) => self.compile_operator(op)?,
                Token::Eof => break,
            }
        }

        if self.depth < 1 {
            return Err(CompileError::empty_result(self.depth));
        }
        if self.depth > 1 {
            return Err(CompileError::unused_operands(self.depth));
        }

        self.emit(Insn::Pop(SCRATCH_A))?;
        self.emit(Insn::Leave)?;
        self.emit(Insn::Ret)?;
        Ok(self.code)
    }

    fn compile_literal(&mut self, value: i64) -> Result<(), CompileError> {
        self.emit(Insn::MovImm(SCRATCH_A, value))?;
        self.emit(Insn::Push(SCRATCH_A))?;
        self.depth += 1;
        Ok(())
    }

    fn compile_operator(&mut self, op: char) -> Result<(), CompileError> {
        if self.depth < 2 {
            return Err(CompileError::underflow_at(op, self.depth));
        }

        // Right operand was pushed last, so it pops first.
        self.emit(Insn::Pop(SCRATCH_B))?;
        self.emit(Insn::Pop(SCRATCH_A))?;

        match op {
            '+' => self.emit(Insn::Add(SCRATCH_A, SCRATCH_B))?,
            '-' => self.emit(Insn::Sub(SCRATCH_A, SCRATCH_B))?,
            '*' => self.emit(Insn::Imul(SCRATCH_A, SCRATCH_B))?,
            '/' => {
                // Quotient lands in A. Division by zero and MIN / -1 are
                // left to fault at run time; see DESIGN.md.
                self.emit(Insn::Cqo)?;
                self.emit(Insn::Idiv(SCRATCH_B))?;
            }
            other => return Err(CompileError::invalid_operator(other)),
        }

        self.emit(Insn::Push(SCRATCH_A))?;
        self.depth -= 1;
        Ok(())
    }

    fn emit(&mut self, insn: Insn) -> Result<(), CompileError> {
        self.encoder.encode(&insn, &mut self.code)?;
        Ok(())
    }
}

/// Compile one expression with the default x86-64 encoder.
pub fn compile(tokens: &[Spanned]) -> Result<Vec<u8>, CompileError> {
    Compiler::new().compile(tokens)
}
