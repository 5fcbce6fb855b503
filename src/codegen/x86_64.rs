use crate::codegen::insn::{EncodeError, Insn, InsnEncoder, Reg};

// REX.W: 64-bit operand size, no extended registers.
const REX_W: u8 = 0x48;

/// Encoder for the x86-64 subset the compiler emits. Every `Insn` variant
/// has exactly one encoding, so this encoder never fails.
#[derive(Debug, Default)]
pub struct X86Encoder;

impl X86Encoder {
    pub fn new() -> Self {
        X86Encoder
    }
}

impl InsnEncoder for X86Encoder {
    fn encode(&mut self, insn: &Insn, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        match *insn {
            Insn::Push(r) => out.push(0x50 + r.number()),
            Insn::Pop(r) => out.push(0x58 + r.number()),

            Insn::MovImm(r, imm) => {
                out.push(REX_W);
                out.push(0xB8 + r.number()); // movabs r64, imm64
                out.extend_from_slice(&imm.to_le_bytes());
            }

            Insn::Mov(dst, src) => {
                out.extend_from_slice(&[REX_W, 0x89, modrm(src, dst)]);
            }
            Insn::Add(dst, src) => {
                out.extend_from_slice(&[REX_W, 0x01, modrm(src, dst)]);
            }
            Insn::Sub(dst, src) => {
                out.extend_from_slice(&[REX_W, 0x29, modrm(src, dst)]);
            }
            Insn::Imul(dst, src) => {
                // imul r64, r/m64 puts the destination in the reg field
                out.extend_from_slice(&[REX_W, 0x0F, 0xAF, modrm(dst, src)]);
            }

            Insn::Cqo => out.extend_from_slice(&[REX_W, 0x99]),
            Insn::Idiv(r) => {
                out.extend_from_slice(&[REX_W, 0xF7, modrm_ext(7, r)]); // F7 /7
            }

            Insn::Leave => out.push(0xC9),
            Insn::Ret => out.push(0xC3),
        }
        Ok(())
    }
}

/// ModRM byte for register-direct operands: mod=11, reg, rm.
fn modrm(reg: Reg, rm: Reg) -> u8 {
    0xC0 | (reg.number() << 3) | rm.number()
}

/// ModRM with an opcode extension in the reg field.
fn modrm_ext(ext: u8, rm: Reg) -> u8 {
    0xC0 | (ext << 3) | rm.number()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(insn: Insn) -> Vec<u8> {
        let mut out = Vec::new();
        X86Encoder::new().encode(&insn, &mut out).unwrap();
        out
    }

    #[test]
    fn test_push_pop() {
        assert_eq!(encode(Insn::Push(Reg::Rax)), vec![0x50]);
        assert_eq!(encode(Insn::Push(Reg::Rcx)), vec![0x51]);
        assert_eq!(encode(Insn::Push(Reg::Rbp)), vec![0x55]);
        assert_eq!(encode(Insn::Pop(Reg::Rax)), vec![0x58]);
        assert_eq!(encode(Insn::Pop(Reg::Rcx)), vec![0x59]);
    }

    #[test]
    fn test_mov_imm() {
        assert_eq!(
            encode(Insn::MovImm(Reg::Rax, 7)),
            vec![0x48, 0xB8, 0x07, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_mov_imm_negative() {
        assert_eq!(
            encode(Insn::MovImm(Reg::Rax, -1)),
            vec![0x48, 0xB8, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_mov_rr() {
        // mov rbp, rsp
        assert_eq!(
            encode(Insn::Mov(Reg::Rbp, Reg::Rsp)),
            vec![0x48, 0x89, 0xE5]
        );
    }

    #[test]
    fn test_arithmetic() {
        // add rax, rcx / sub rax, rcx / imul rax, rcx
        assert_eq!(
            encode(Insn::Add(Reg::Rax, Reg::Rcx)),
            vec![0x48, 0x01, 0xC8]
        );
        assert_eq!(
            encode(Insn::Sub(Reg::Rax, Reg::Rcx)),
            vec![0x48, 0x29, 0xC8]
        );
        assert_eq!(
            encode(Insn::Imul(Reg::Rax, Reg::Rcx)),
            vec![0x48, 0x0F, 0xAF, 0xC1]
        );
    }

    #[test]
    fn test_division_pair() {
        assert_eq!(encode(Insn::Cqo), vec![0x48, 0x99]);
        // idiv rcx
        assert_eq!(encode(Insn::Idiv(Reg::Rcx)), vec![0x48, 0xF7, 0xF9]);
    }

    #[test]
    fn test_leave_ret() {
        assert_eq!(encode(Insn::Leave), vec![0xC9]);
        assert_eq!(encode(Insn::Ret), vec![0xC3]);
    }

    #[test]
    fn test_appends_without_clearing() {
        let mut out = vec![0x90];
        X86Encoder::new()
            .encode(&Insn::Ret, &mut out)
            .unwrap();
        assert_eq!(out, vec![0x90, 0xC3]);
    }
}
