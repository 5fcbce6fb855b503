use crate::token::Token;

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    /// 1-based column of the first character of the token
    pub col: usize,
}

#[derive(Debug)]
pub struct LexerError {
    pub message: String,
    pub col: usize,
}

impl LexerError {
    fn new(message: impl Into<String>, col: usize) -> Self {
        Self {
            message: message.into(),
            col,
        }
    }
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "col {}: {}", self.col, self.message)
    }
}

impl std::error::Error for LexerError {}

/// Splits one postfix expression into tokens.
///
/// The grammar is flat: words are separated by whitespace (spaces, tabs, or
/// newlines), and every word is either a signed integer literal (decimal, or
/// 0x/0o/0b prefixed) or a single-character operator symbol.
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { source }
    }

    pub fn tokenize(&self) -> Result<Vec<Spanned>, LexerError> {
        let mut tokens = Vec::new();
        let mut col = 1;
        let mut word_start = None;

        let mut words: Vec<(usize, &str)> = Vec::new();
        for (i, ch) in self.source.char_indices() {
            if ch.is_ascii_whitespace() {
                if let Some((start_col, start)) = word_start.take() {
                    words.push((start_col, &self.source[start..i]));
                }
            } else if word_start.is_none() {
                word_start = Some((col, i));
            }
            col += 1;
        }
        if let Some((start_col, start)) = word_start {
            words.push((start_col, &self.source[start..]));
        }

        for (word_col, word) in words {
            let token = read_word(word, word_col)?;
            tokens.push(Spanned {
                token,
                col: word_col,
            });
        }

        tokens.push(Spanned {
            token: Token::Eof,
            col,
        });
        Ok(tokens)
    }
}

fn read_word(word: &str, col: usize) -> Result<Token, LexerError> {
    let mut chars = word.chars();
    let first = chars.next().expect("words are never empty");
    let second = chars.next();

    // A lone non-alphanumeric symbol is an operator, even one the compiler
    // will reject later. A lone letter is not.
    if second.is_none() && !first.is_alphanumeric() {
        return Ok(Token::Operator(first));
    }

    let digits_start = matches!(first, '-' | '+')
        && second.map(|c| c.is_ascii_digit()).unwrap_or(false);
    if first.is_ascii_digit() || digits_start {
        return read_number(word, col);
    }

    Err(LexerError::new(
        format!("'{}' is not a number or operator", word),
        col,
    ))
}

fn read_number(word: &str, col: usize) -> Result<Token, LexerError> {
    let (sign, magnitude) = match word.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", word.strip_prefix('+').unwrap_or(word)),
    };

    let (radix, digits) = if let Some(hex) = strip_radix_prefix(magnitude, "0x", "0X") {
        (16, hex)
    } else if let Some(oct) = strip_radix_prefix(magnitude, "0o", "0O") {
        (8, oct)
    } else if let Some(bin) = strip_radix_prefix(magnitude, "0b", "0B") {
        (2, bin)
    } else {
        (10, magnitude)
    };

    if digits.is_empty() {
        return Err(LexerError::new(
            format!("expected digits after '{}'", word),
            col,
        ));
    }

    // The sign belongs before the radix prefix; from_str_radix would quietly
    // honor one placed after it.
    if digits.starts_with(['+', '-']) {
        return Err(LexerError::new(
            format!("invalid integer literal '{}'", word),
            col,
        ));
    }

    // from_str_radix accepts a leading '-', which keeps i64::MIN parseable.
    let value = i64::from_str_radix(&format!("{}{}", sign, digits), radix)
        .map_err(|_| LexerError::new(format!("invalid integer literal '{}'", word), col))?;

    Ok(Token::Integer(value))
}

fn strip_radix_prefix<'a>(s: &'a str, lower: &str, upper: &str) -> Option<&'a str> {
    s.strip_prefix(lower).or_else(|| s.strip_prefix(upper))
}
