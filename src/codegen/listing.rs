use crate::codegen::compile_error::CompileError;
use crate::codegen::insn::{EncodeError, Insn, InsnEncoder};
use crate::codegen::x86_64::X86Encoder;
use crate::codegen::Compiler;
use crate::lexer::Spanned;

// =============================================================================
// Instruction listing - debug view of the emitted code
// =============================================================================

/// Encoder wrapper that records every `(insn, bytes)` pair it delegates.
pub struct RecordingEncoder<E> {
    inner: E,
    records: Vec<(Insn, Vec<u8>)>,
}

impl<E: InsnEncoder> RecordingEncoder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            records: Vec::new(),
        }
    }

    pub fn into_records(self) -> Vec<(Insn, Vec<u8>)> {
        self.records
    }
}

impl<E: InsnEncoder> InsnEncoder for RecordingEncoder<E> {
    fn encode(&mut self, insn: &Insn, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let before = out.len();
        self.inner.encode(insn, out)?;
        self.records.push((*insn, out[before..].to_vec()));
        Ok(())
    }
}

/// A compiled expression together with its per-instruction breakdown.
pub struct Listing {
    pub code: Vec<u8>,
    pub lines: Vec<(Insn, Vec<u8>)>,
}

/// Compile an expression and keep the listing alongside the bytes.
pub fn compile_listing(tokens: &[Spanned]) -> Result<Listing, CompileError> {
    let mut recorder = RecordingEncoder::new(X86Encoder::new());
    let code = Compiler::with_encoder(&mut recorder).compile(tokens)?;
    Ok(Listing {
        code,
        lines: recorder.into_records(),
    })
}

impl Listing {
    pub fn print(&self) {
        print!("{}", self.to_text());
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let mut offset = 0;

        for (insn, bytes) in &self.lines {
            let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            out.push_str(&format!(
                "{:04x}   {:<30} {}\n",
                offset,
                hex.join(" "),
                format_insn(insn)
            ));
            offset += bytes.len();
        }

        out
    }
}

fn format_insn(insn: &Insn) -> String {
    match *insn {
        Insn::Push(r) => format!("push   {}", r.name()),
        Insn::Pop(r) => format!("pop    {}", r.name()),
        Insn::MovImm(r, imm) => format!("movabs {}, {}", r.name(), imm),
        Insn::Mov(dst, src) => format!("mov    {}, {}", dst.name(), src.name()),
        Insn::Add(dst, src) => format!("add    {}, {}", dst.name(), src.name()),
        Insn::Sub(dst, src) => format!("sub    {}, {}", dst.name(), src.name()),
        Insn::Imul(dst, src) => format!("imul   {}, {}", dst.name(), src.name()),
        Insn::Cqo => "cqo".to_string(),
        Insn::Idiv(r) => format!("idiv   {}", r.name()),
        Insn::Leave => "leave".to_string(),
        Insn::Ret => "ret".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn listing_for(source: &str) -> Listing {
        let tokens = Lexer::new(source).tokenize().unwrap();
        compile_listing(&tokens).unwrap()
    }

    #[test]
    fn test_listing_matches_code() {
        let listing = listing_for("3 4 +");
        let concatenated: Vec<u8> = listing
            .lines
            .iter()
            .flat_map(|(_, bytes)| bytes.clone())
            .collect();
        assert_eq!(concatenated, listing.code);
    }

    #[test]
    fn test_listing_mnemonics() {
        let text = listing_for("10 2 /").to_text();
        assert!(text.contains("push   rbp"));
        assert!(text.contains("mov    rbp, rsp"));
        assert!(text.contains("movabs rax, 10"));
        assert!(text.contains("cqo"));
        assert!(text.contains("idiv   rcx"));
        assert!(text.contains("ret"));
    }

    #[test]
    fn test_listing_offsets_advance() {
        let text = listing_for("1 2 *").to_text();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("0000"));
        // second line starts after the 1-byte push rbp
        assert!(lines.next().unwrap().starts_with("0001"));
    }

    #[test]
    fn test_listing_propagates_compile_errors() {
        let tokens = Lexer::new("1 2").tokenize().unwrap();
        assert!(matches!(
            compile_listing(&tokens),
            Err(CompileError::UnusedOperands { .. })
        ));
    }
}
