#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    /// Signed 64-bit integer literal
    Integer(i64),

    /// Single-character operator symbol. The lexer accepts any symbol here;
    /// whether it names a real operation is the compiler's call.
    Operator(char),

    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "{}", n),
            Token::Operator(c) => write!(f, "{}", c),
            Token::Eof => write!(f, "EOF"),
        }
    }
}
