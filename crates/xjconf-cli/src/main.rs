use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use xjconf::{BindOptions, Binder, Config, DuplicateKeys, FileSource, ParsedTag, TypeRegistry};

#[derive(Debug, Parser)]
#[command(
    name = "xjconf-check",
    version,
    about = "Check an XML document against xjconf definitions without binding it"
)]
struct Args {
    /// Definitions document describing the accepted tags
    #[arg(short, long, value_name = "DEFINES")]
    defines: PathBuf,
    /// Document to check
    #[arg(value_name = "DOCUMENT")]
    document: PathBuf,
    /// Fail when keyed children share a key instead of keeping the last
    #[arg(long)]
    reject_duplicate_keys: bool,
    /// Maximum element depth (0 means the built-in ceiling)
    #[arg(long, default_value_t = 128)]
    max_depth: u16,
    /// Treat include directives as ordinary elements
    #[arg(long)]
    no_includes: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let defines = read(&args.defines)?;
    let schema = xjconf::load_schema(&defines)
        .with_context(|| format!("invalid definitions in {}", args.defines.display()))?;
    debug!(tags = schema.len(), "definitions loaded");

    let options = BindOptions {
        duplicate_keys: if args.reject_duplicate_keys {
            DuplicateKeys::Reject
        } else {
            DuplicateKeys::LastWins
        },
        max_depth: args.max_depth,
        reader: Config::new(args.max_depth, Config::default().max_size),
    };

    let registry = TypeRegistry::new();
    let binder = Binder::new(&schema, &registry).with_options(options);
    let text = read(&args.document)?;
    let tree = if args.no_includes {
        binder.parse(&text)
    } else {
        parse_with_includes(&binder, &args.document, &text)
    }
    .with_context(|| format!("cannot read {}", args.document.display()))?;

    binder
        .check(&tree)
        .with_context(|| format!("{} does not match the definitions", args.document.display()))?;

    let elements = count_elements(&tree);
    info!(elements, "document checked");
    writeln!(
        io::stdout(),
        "{}: ok ({elements} elements, root <{}>)",
        args.document.display(),
        tree.name()
    )
    .context("failed to write stdout")?;
    Ok(())
}

/// Resolve includes relative to the document's own directory
fn parse_with_includes<'a>(
    binder: &Binder<'a>,
    path: &Path,
    text: &str,
) -> xjconf::Result<ParsedTag<'a>> {
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    binder.parse_with_includes_at(text, &FileSource::new(root), &base)
}

fn read(path: &Path) -> Result<String> {
    if path.is_dir() {
        bail!("{} is a directory", path.display());
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn count_elements(tag: &ParsedTag<'_>) -> usize {
    1 + tag.children().iter().map(count_elements).sum::<usize>()
}
