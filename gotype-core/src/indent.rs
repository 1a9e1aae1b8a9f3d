//! Indentation normalization (off-side rule to explicit delimiters).
//!
//! The lexer reports indentation as `Indent` tokens at the start of each
//! line. This pass removes them and inserts one `CloseBlock` token for every
//! level the indentation drops, placed right before the first token of the
//! dedented line. Opening a block needs no marker: the parser already knows
//! a block follows every `:` at the end of a line.

use tracing::debug;

use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind};

/// Replace `Indent` tokens with explicit `CloseBlock` markers.
///
/// Lines without content (blank or comment-only) never open or close a
/// block. A content line indented more than one level deeper than the
/// previous one is rejected: closing it would dedent past a level that was
/// never opened.
pub fn normalize(tokens: Vec<Token>) -> Result<Vec<Token>, CoreError> {
    let levels = line_levels(&tokens);

    let mut output = Vec::with_capacity(tokens.len() + 1);
    let mut line_index = 0;
    let mut line_has_content = false;
    let mut level = 0;
    let mut opened = 0;
    let mut last_line = 1;

    for token in tokens {
        last_line = token.line;
        match token.kind {
            TokenKind::Indent => continue,
            TokenKind::Newline => {
                line_index += 1;
                line_has_content = false;
                output.push(token);
            }
            _ => {
                if !line_has_content {
                    line_has_content = true;
                    let next = levels[line_index].unwrap_or(level);
                    if next > level + 1 {
                        return Err(CoreError::Parse(Diagnostic::new(
                            &["normalize"],
                            token.line,
                            format!("unexpected indent: level {next} after level {level}"),
                        )));
                    }
                    if next > level {
                        opened += 1;
                    }
                    for _ in next..level {
                        output.push(close_block(token.line));
                    }
                    level = next;
                }
                output.push(token);
            }
        }
    }

    for _ in 0..level {
        output.push(close_block(last_line));
    }
    output.push(Token::new(TokenKind::Newline, "\n", last_line));

    debug!(tokens = output.len(), blocks = opened, "normalized indentation");
    Ok(output)
}

/// First pass: the indent level of every logical line, or `None` for lines
/// that hold nothing but indentation.
fn line_levels(tokens: &[Token]) -> Vec<Option<usize>> {
    let mut levels = Vec::new();
    let mut indents = 0;
    let mut has_content = false;

    for token in tokens {
        match token.kind {
            TokenKind::Newline => {
                levels.push(has_content.then_some(indents));
                indents = 0;
                has_content = false;
            }
            TokenKind::Indent => indents += 1,
            _ => has_content = true,
        }
    }
    levels.push(has_content.then_some(indents));
    levels
}

fn close_block(line: usize) -> Token {
    Token::new(TokenKind::CloseBlock, "", line)
}
