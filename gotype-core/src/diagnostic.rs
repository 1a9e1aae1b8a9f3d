//! Diagnostics attached to every pipeline error.

use std::fmt;

/// A single compile diagnostic.
///
/// `trail` is the path of phases and grammar productions that were active
/// when the problem was found, outermost first. It is rendered together
/// with the source line as one message:
///
/// ```text
/// parse -> program -> statement -> for -> line 3: expected `,`, got `5`
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub trail: Vec<&'static str>,
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(trail: &[&'static str], line: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            trail: trail.to_vec(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.trail {
            write!(f, "{step} -> ")?;
        }
        write!(f, "line {}: {}", self.line, self.message)
    }
}
