//! Lexer for GoType sources.
//!
//! A single forward scan over the raw bytes with one byte of lookahead.
//! Indentation is not interpreted here: every 4 leading spaces of a line
//! become one `Indent` token, and `indent::normalize` turns those into
//! explicit block-close markers afterwards.

use tracing::debug;

use crate::builtins::find_builtin;
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;

/// Number of spaces that make up one indentation level.
pub const INDENT_WIDTH: usize = 4;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A byte that starts no known token.
    Illegal,

    // Keywords
    Import,
    From,
    For,
    In,
    If,
    Elif,
    Else,
    Class,
    While,
    Def,
    Return,

    // Builtin functions
    Print,
    Range,

    // Boolean operators
    Not,
    And,
    Or,

    // Math operators
    Plus,    // +
    Minus,   // -
    Star,    // * (multiplication or import wildcard)
    Slash,   // /
    Percent, // %

    // Structure
    Identifier,
    Newline,
    Indent,
    CloseBlock,
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }
    Comma,    // ,
    Colon,    // :
    Assign,   // =
    Arrow,    // ->

    // Literals
    BoolLiteral,   // True / False
    IntLiteral,    // 1_000, 3.5
    StringLiteral, // "..."
    NullLiteral,   // None

    // Comparison operators
    Equals,        // ==
    NotEquals,     // !=
    Greater,       // >
    GreaterEquals, // >=
    Less,          // <
    LessEquals,    // <=
}

impl TokenKind {
    /// Human-readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Illegal => "illegal character",
            TokenKind::Import => "`import`",
            TokenKind::From => "`from`",
            TokenKind::For => "`for`",
            TokenKind::In => "`in`",
            TokenKind::If => "`if`",
            TokenKind::Elif => "`elif`",
            TokenKind::Else => "`else`",
            TokenKind::Class => "`class`",
            TokenKind::While => "`while`",
            TokenKind::Def => "`def`",
            TokenKind::Return => "`return`",
            TokenKind::Print => "`print`",
            TokenKind::Range => "`range`",
            TokenKind::Not => "`not`",
            TokenKind::And => "`and`",
            TokenKind::Or => "`or`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Identifier => "identifier",
            TokenKind::Newline => "newline",
            TokenKind::Indent => "indentation",
            TokenKind::CloseBlock => "end of block",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::Colon => "`:`",
            TokenKind::Assign => "`=`",
            TokenKind::Arrow => "`->`",
            TokenKind::BoolLiteral => "boolean literal",
            TokenKind::IntLiteral => "integer literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::NullLiteral => "`None`",
            TokenKind::Equals => "`==`",
            TokenKind::NotEquals => "`!=`",
            TokenKind::Greater => "`>`",
            TokenKind::GreaterEquals => "`>=`",
            TokenKind::Less => "`<`",
            TokenKind::LessEquals => "`<=`",
        }
    }

    pub fn is_math_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
        )
    }

    pub fn is_comparator(self) -> bool {
        matches!(
            self,
            TokenKind::Equals
                | TokenKind::NotEquals
                | TokenKind::Greater
                | TokenKind::GreaterEquals
                | TokenKind::Less
                | TokenKind::LessEquals
        )
    }
}

/// A single token: its kind, the source text it was scanned from, and the
/// 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            line,
        }
    }
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("import", TokenKind::Import),
    ("from", TokenKind::From),
    ("for", TokenKind::For),
    ("in", TokenKind::In),
    ("if", TokenKind::If),
    ("elif", TokenKind::Elif),
    ("else", TokenKind::Else),
    ("class", TokenKind::Class),
    ("while", TokenKind::While),
    ("def", TokenKind::Def),
    ("return", TokenKind::Return),
];

const BOOL_OPERATORS: &[(&str, TokenKind)] = &[
    ("not", TokenKind::Not),
    ("and", TokenKind::And),
    ("or", TokenKind::Or),
];

/// Lex a source buffer into tokens.
///
/// Fails only on empty input, on a numeric literal that does not end in a
/// digit, and on a string literal that is not closed on its line. Bytes
/// that start no token become `Illegal` tokens and are left for the parser
/// to reject.
pub fn lex(source: &[u8]) -> Result<Vec<Token>, CoreError> {
    if source.is_empty() {
        return Err(CoreError::Lex(Diagnostic::new(&["lex"], 1, "missing input")));
    }

    let mut lexer = Lexer {
        source,
        index: 0,
        line: 1,
        at_line_start: true,
        tokens: Vec::new(),
    };
    lexer.run()?;

    debug!(tokens = lexer.tokens.len(), lines = lexer.line, "lexed source");
    Ok(lexer.tokens)
}

struct Lexer<'src> {
    source: &'src [u8],
    index: usize,
    line: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<(), CoreError> {
        while let Some(ch) = self.peek_char() {
            if self.at_line_start {
                self.at_line_start = false;
                self.lex_indentation();
                continue;
            }

            match ch {
                b' ' => self.consume_char(),
                b'\n' => {
                    self.consume_char();
                    self.newline();
                }
                b'\r' if self.peek_next() == Some(b'\n') => {
                    self.consume_char();
                    self.consume_char();
                    self.newline();
                }
                b'#' => self.skip_comment(),
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b'[' => self.single(TokenKind::LBracket),
                b']' => self.single(TokenKind::RBracket),
                b'{' => self.single(TokenKind::LBrace),
                b'}' => self.single(TokenKind::RBrace),
                b',' => self.single(TokenKind::Comma),
                b':' => self.single(TokenKind::Colon),
                b'+' => self.single(TokenKind::Plus),
                b'*' => self.single(TokenKind::Star),
                b'/' => self.single(TokenKind::Slash),
                b'%' => self.single(TokenKind::Percent),
                b'-' => self.one_or_two(b'>', TokenKind::Arrow, TokenKind::Minus),
                b'=' => self.one_or_two(b'=', TokenKind::Equals, TokenKind::Assign),
                b'!' => self.one_or_two(b'=', TokenKind::NotEquals, TokenKind::Illegal),
                b'>' => self.one_or_two(b'=', TokenKind::GreaterEquals, TokenKind::Greater),
                b'<' => self.one_or_two(b'=', TokenKind::LessEquals, TokenKind::Less),
                b'"' => self.lex_string()?,
                b'0'..=b'9' => self.lex_number()?,
                _ if ch.is_ascii_alphabetic() => self.lex_word(),
                _ => self.single(TokenKind::Illegal),
            }
        }
        Ok(())
    }

    /// Each complete group of `INDENT_WIDTH` leading spaces is one `Indent`
    /// token; a shorter remainder is dropped.
    fn lex_indentation(&mut self) {
        let mut run = 0;
        while self.peek_char() == Some(b' ') {
            self.consume_char();
            run += 1;
            if run == INDENT_WIDTH {
                self.push(TokenKind::Indent, "    ");
                run = 0;
            }
        }
    }

    fn newline(&mut self) {
        self.push(TokenKind::Newline, "\n");
        self.line += 1;
        self.at_line_start = true;
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' || (ch == b'\r' && self.peek_next() == Some(b'\n')) {
                break;
            }
            self.consume_char();
        }
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.index;
        self.consume_char();
        self.push_span(kind, start);
    }

    /// Greedy two-byte operator: `second` following the current byte makes
    /// it `double`, otherwise the current byte alone is `single`.
    fn one_or_two(&mut self, second: u8, double: TokenKind, single: TokenKind) {
        let start = self.index;
        self.consume_char();
        if self.peek_char() == Some(second) {
            self.consume_char();
            self.push_span(double, start);
        } else {
            self.push_span(single, start);
        }
    }

    fn lex_string(&mut self) -> Result<(), CoreError> {
        let start = self.index;
        // opening quote
        self.consume_char();

        while let Some(ch) = self.peek_char() {
            match ch {
                b'"' => {
                    self.consume_char();
                    self.push_span(TokenKind::StringLiteral, start);
                    return Ok(());
                }
                b'\n' | b'\r' => break,
                _ => self.consume_char(),
            }
        }

        Err(CoreError::Lex(Diagnostic::new(
            &["lex", "string"],
            self.line,
            "unterminated string literal",
        )))
    }

    fn lex_number(&mut self) -> Result<(), CoreError> {
        let start = self.index;
        while let Some(ch) = self.peek_char() {
            if matches!(ch, b'0'..=b'9' | b'_' | b'.') {
                self.consume_char();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.index];
        if !text.last().is_some_and(u8::is_ascii_digit) {
            return Err(CoreError::Lex(Diagnostic::new(
                &["lex", "number"],
                self.line,
                format!(
                    "numbers must end with a digit, got `{}`",
                    String::from_utf8_lossy(text)
                ),
            )));
        }

        self.push_span(TokenKind::IntLiteral, start);
        Ok(())
    }

    fn lex_word(&mut self) {
        let start = self.index;
        while let Some(ch) = self.peek_char() {
            if is_word_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }

        let word = String::from_utf8_lossy(&self.source[start..self.index]).into_owned();
        let kind = classify_word(&word);
        self.push(kind, word);
    }

    fn push_span(&mut self, kind: TokenKind, start: usize) {
        let text = String::from_utf8_lossy(&self.source[start..self.index]).into_owned();
        self.push(kind, text);
    }

    fn push(&mut self, kind: TokenKind, lexeme: impl Into<String>) {
        self.tokens.push(Token::new(kind, lexeme, self.line));
    }

    fn peek_char(&self) -> Option<u8> {
        self.source.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.source.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.source.len() {
            self.index += 1;
        }
    }
}

/// Classify a scanned word: keyword, then builtin, then boolean operator,
/// then boolean / null literal, else identifier.
fn classify_word(word: &str) -> TokenKind {
    if let Some((_, kind)) = KEYWORDS.iter().find(|(text, _)| *text == word) {
        return *kind;
    }
    if let Some(builtin) = find_builtin(word) {
        return builtin.token;
    }
    if let Some((_, kind)) = BOOL_OPERATORS.iter().find(|(text, _)| *text == word) {
        return *kind;
    }
    match word {
        "True" | "False" => TokenKind::BoolLiteral,
        "None" => TokenKind::NullLiteral,
        _ => TokenKind::Identifier,
    }
}

fn is_word_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source.as_bytes())
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_import_clause() {
        let tokens = lex(b"from GoType import *\n").expect("lex");
        let pairs: Vec<_> = tokens
            .iter()
            .map(|token| (token.kind, token.lexeme.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (TokenKind::From, "from"),
                (TokenKind::Identifier, "GoType"),
                (TokenKind::Import, "import"),
                (TokenKind::Star, "*"),
                (TokenKind::Newline, "\n"),
            ]
        );
    }

    #[test]
    fn rejects_empty_input() {
        let err = lex(b"").unwrap_err();
        assert!(matches!(err, CoreError::Lex(_)));
    }

    #[test]
    fn leading_spaces_become_indent_tokens() {
        assert_eq!(
            kinds("        x\n"),
            vec![
                TokenKind::Indent,
                TokenKind::Indent,
                TokenKind::Identifier,
                TokenKind::Newline
            ]
        );
    }

    #[test]
    fn inner_and_partial_space_runs_are_skipped() {
        assert_eq!(
            kinds("      x    =  1\n"),
            vec![
                TokenKind::Indent,
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::IntLiteral,
                TokenKind::Newline
            ]
        );
    }

    #[test]
    fn takes_two_character_operators_greedily() {
        assert_eq!(
            kinds("== != >= <= -> = > < - !"),
            vec![
                TokenKind::Equals,
                TokenKind::NotEquals,
                TokenKind::GreaterEquals,
                TokenKind::LessEquals,
                TokenKind::Arrow,
                TokenKind::Assign,
                TokenKind::Greater,
                TokenKind::Less,
                TokenKind::Minus,
                TokenKind::Illegal,
            ]
        );
    }

    #[test]
    fn classifies_words_by_priority() {
        assert_eq!(
            kinds("while print and True None uint64 value"),
            vec![
                TokenKind::While,
                TokenKind::Print,
                TokenKind::And,
                TokenKind::BoolLiteral,
                TokenKind::NullLiteral,
                TokenKind::Identifier,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn tracks_lines_across_crlf_and_lf() {
        let tokens = lex(b"a\r\nb\nc").expect("lex");
        let lines: Vec<_> = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Identifier)
            .map(|token| token.line)
            .collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn drops_comments_up_to_end_of_line() {
        assert_eq!(
            kinds("x # note: ignored\ny"),
            vec![TokenKind::Identifier, TokenKind::Newline, TokenKind::Identifier]
        );
    }

    #[test]
    fn keeps_string_quotes_without_escape_processing() {
        let tokens = lex(br#"print("a\n b")"#).expect("lex");
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[2].lexeme, r#""a\n b""#);
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = lex(b"x: string = \"abc\n").unwrap_err();
        assert!(matches!(err, CoreError::Lex(_)));
    }

    #[test]
    fn accepts_separated_numbers() {
        let tokens = lex(b"1_000 2.5").expect("lex");
        assert_eq!(tokens[0].lexeme, "1_000");
        assert_eq!(tokens[1].lexeme, "2.5");
        assert!(tokens.iter().all(|token| token.kind == TokenKind::IntLiteral));
    }

    #[test]
    fn rejects_number_ending_in_separator() {
        let err = lex(b"x: int = 10_\n").unwrap_err();
        let CoreError::Lex(diag) = err else {
            panic!("expected lex error");
        };
        assert_eq!(diag.line, 1);
        assert!(diag.message.contains("10_"));
    }

    #[test]
    fn unknown_bytes_become_illegal_tokens() {
        let tokens = lex(b"x $ y").expect("lex");
        assert_eq!(tokens[1].kind, TokenKind::Illegal);
        assert_eq!(tokens[1].lexeme, "$");
    }
}
