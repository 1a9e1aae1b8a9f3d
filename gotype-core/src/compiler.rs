use tracing::info;

use crate::analyzer::analyze;
use crate::codegen_go::emit;
use crate::error::CoreError;
use crate::indent::normalize;
use crate::lexer::lex;
use crate::parser::parse;

/// Translate GoType source into Go source.
///
/// Runs every phase in order and stops at the first diagnostic; no later
/// phase runs after an earlier one fails.
pub fn compile(source: &[u8]) -> Result<String, CoreError> {
    let tokens = lex(source)?;
    let tokens = normalize(tokens)?;
    let program = parse(tokens)?;
    analyze(&program, &[], &[])?;
    let output = emit(&program)?;
    info!(
        input = source.len(),
        output = output.len(),
        "compiled gotype source"
    );
    Ok(output)
}
