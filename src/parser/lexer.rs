//! Toolpath Lexer
//!
//! Splits one line of toolpath text into a code token, argument tokens and a
//! trailing comment. Numbers are not interpreted here.

/// Codes whose whole argument text is a free-form message
pub const FREE_TEXT_CODES: &[&str] = &["M117", "M38"];

/// Token types in a toolpath line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    /// Command code like "G1", "M104"
    Code,
    /// Letter-prefixed argument like "X10", "E0.5", "F"
    Word,
    /// Argument without a letter prefix (free text, checksums)
    Bare,
    /// Text after `;`, delimiter removed
    Comment,
}

/// A token with its text content
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

/// Tokenize a line of toolpath text
///
/// Blank lines yield no tokens. A line whose first non-blank character is `;`
/// yields a single comment token.
pub fn tokenize_line(line: &str) -> Vec<Token> {
    let trimmed = line.trim_start();
    if let Some(comment) = trimmed.strip_prefix(';') {
        return vec![Token::new(TokenKind::Comment, comment)];
    }

    let (body, comment) = match line.split_once(';') {
        Some((body, comment)) => (body, Some(comment)),
        None => (line, None),
    };

    let mut tokens = Vec::new();
    let mut words = body.split_whitespace();

    if let Some(code) = words.next() {
        tokens.push(Token::new(TokenKind::Code, code));

        if FREE_TEXT_CODES.contains(&code) {
            // Everything after the code is a single message
            let message = body.trim_start()[code.len()..].trim();
            if !message.is_empty() {
                tokens.push(Token::new(TokenKind::Bare, message));
            }
        } else {
            for word in words {
                let kind = if word.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    TokenKind::Word
                } else {
                    TokenKind::Bare
                };
                tokens.push(Token::new(kind, word));
            }
        }
    }

    if let Some(comment) = comment {
        tokens.push(Token::new(TokenKind::Comment, comment));
    }

    tokens
}
