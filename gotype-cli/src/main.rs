use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use gotype_core::compile;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Output directory used when a directory is compiled without `--output`.
const DEFAULT_OUTPUT_DIR: &str = "Output";

const SOURCE_EXTENSION: &str = "py";
const TARGET_EXTENSION: &str = "go";

/// Translate GoType sources into Go.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Source file or directory (reads stdin when omitted)"
    )]
    input: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Output file, or output directory for directory input"
    )]
    output: Option<PathBuf>,

    #[arg(long, help = "Run the whole pipeline without writing any output")]
    check: bool,

    #[arg(short, long, action = ArgAction::Count, help = "Raise log verbosity (repeatable)")]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    match &cli.input {
        Some(path) if path.is_dir() => compile_directory(path, cli.output.as_deref(), cli.check),
        Some(path) => {
            let source =
                fs::read(path).with_context(|| format!("failed to read input file {path:?}"))?;
            let output = compile_source(&source, path)?;
            emit(cli.output.as_deref(), &output, cli.check)
        }
        None => {
            let mut source = Vec::new();
            io::stdin()
                .read_to_end(&mut source)
                .context("failed to read source from stdin")?;
            let output = compile_source(&source, Path::new("<stdin>"))?;
            emit(cli.output.as_deref(), &output, cli.check)
        }
    }
}

fn compile_source(source: &[u8], origin: &Path) -> Result<String> {
    debug!(?origin, bytes = source.len(), "compiling");
    compile(source).with_context(|| format!("failed to compile {}", origin.display()))
}

fn emit(output: Option<&Path>, text: &str, check: bool) -> Result<()> {
    if check {
        return Ok(());
    }
    match output {
        Some(path) => write_output(path, text.as_bytes()),
        None => io::stdout()
            .write_all(text.as_bytes())
            .context("failed to write to stdout"),
    }
}

/// Compiles every `.py` file below `root`, stopping at the first failure.
fn compile_directory(root: &Path, output: Option<&Path>, check: bool) -> Result<()> {
    let output_root = output.unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_DIR));
    let mut compiled = 0;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {root:?}"))?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_source_file(path) {
            continue;
        }

        let source = fs::read(path).with_context(|| format!("failed to read {path:?}"))?;
        let text = compile_source(&source, path)?;
        if !check {
            let relative = path.strip_prefix(root).unwrap_or(path);
            write_output(&target_path(output_root, relative), text.as_bytes())?;
        }
        compiled += 1;
    }

    info!(files = compiled, root = ?root, "compiled directory");
    Ok(())
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension == SOURCE_EXTENSION)
}

fn target_path(output_root: &Path, relative: &Path) -> PathBuf {
    output_root.join(relative).with_extension(TARGET_EXTENSION)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path:?}"))?;
    debug!(?path, bytes = bytes.len(), "wrote output");
    Ok(())
}
