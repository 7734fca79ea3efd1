//! CLI command definitions, routing, and tracing setup.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use docchunk_core::StructureEngine;
use docchunk_shared::{
    AppConfig, Chunk, DocChunkError, DocumentReport, init_config, init_config_at, load_config,
    load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docchunk: turn partitioned PDF elements into embedding-ready chunks.
#[derive(Parser)]
#[command(
    name = "docchunk",
    version,
    about = "Structure partitioned PDF elements into sections, noise verdicts, and embedding chunks.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.docchunk/docchunk.toml).
    #[arg(long, global = true, env = "DOCCHUNK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Emit one audit record per block: section, hierarchy level, noise verdict.
    Structure(EmitArgs),

    /// Emit the chunks to embed.
    Chunks(EmitArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Inputs and output options shared by `structure` and `chunks`.
#[derive(Args, Debug)]
pub(crate) struct EmitArgs {
    /// Element JSON files from the PDF partitioner; `-` reads stdin.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Write one `<stem>.<kind>.json` per input into this directory.
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Single-line JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Which part of the report a command writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputKind {
    Structure,
    Chunks,
}

impl OutputKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Chunks => "chunks",
        }
    }

    fn render(self, report: &DocumentReport, compact: bool) -> Result<String> {
        match self {
            Self::Structure => to_json(&report.blocks, compact),
            Self::Chunks => {
                let records: Vec<ChunkRecord<'_>> =
                    report.chunks.iter().map(ChunkRecord::from).collect();
                to_json(&records, compact)
            }
        }
    }
}

/// A chunk as written by `chunks`: the chunk fields plus the text to embed.
#[derive(Serialize)]
struct ChunkRecord<'a> {
    #[serde(flatten)]
    chunk: &'a Chunk,
    embedding_text: String,
}

impl<'a> From<&'a Chunk> for ChunkRecord<'a> {
    fn from(chunk: &'a Chunk) -> Self {
        Self {
            chunk,
            embedding_text: chunk.embedding_text(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docchunk=info",
        1 => "docchunk=debug",
        _ => "docchunk=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Structure(args) => cmd_emit(OutputKind::Structure, &args, config_path),
        Command::Chunks(args) => cmd_emit(OutputKind::Chunks, &args, config_path),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn cmd_emit(kind: OutputKind, args: &EmitArgs, config_path: Option<&Path>) -> Result<()> {
    let engine = StructureEngine::new(resolve_config(config_path)?)?;
    emit(&engine, kind, args)
}

fn emit(engine: &StructureEngine, kind: OutputKind, args: &EmitArgs) -> Result<()> {
    if let ([input], None) = (args.inputs.as_slice(), &args.out_dir) {
        let report = process_input(engine, input)?;
        println!("{}", kind.render(&report, args.compact)?);
        return Ok(());
    }

    let out_dir = args.out_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir).map_err(|e| DocChunkError::io(&out_dir, e))?;

    let total = args.inputs.len();
    let progress = if total > 1 {
        Some(progress_bar(total)?)
    } else {
        None
    };

    let mut written: HashSet<PathBuf> = HashSet::new();
    let mut failed = 0usize;
    for input in &args.inputs {
        if let Some(bar) = &progress {
            bar.set_message(input.display().to_string());
        }

        // Every input is an independent document run; one failure does not stop the rest.
        match emit_one(engine, kind, input, &out_dir, args.compact, &mut written) {
            Ok(path) => {
                info!(input = %input.display(), output = %path.display(), "wrote output");
            }
            Err(e) => {
                failed += 1;
                let message = format!("{e:#}");
                suspend(progress.as_ref(), || {
                    error!(input = %input.display(), error = %message, "input failed");
                });
            }
        }

        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    if failed > 0 {
        return Err(eyre!("{failed} of {total} inputs failed"));
    }
    Ok(())
}

fn emit_one(
    engine: &StructureEngine,
    kind: OutputKind,
    input: &Path,
    out_dir: &Path,
    compact: bool,
    written: &mut HashSet<PathBuf>,
) -> Result<PathBuf> {
    let report = process_input(engine, input)?;
    let path = output_path(out_dir, input, kind, written)?;
    std::fs::write(&path, kind.render(&report, compact)?)
        .map_err(|e| DocChunkError::io(&path, e))?;
    written.insert(path.clone());
    Ok(path)
}

fn process_input(engine: &StructureEngine, input: &Path) -> Result<DocumentReport> {
    let content = read_input(input)?;
    engine
        .process_json(&content)
        .wrap_err_with(|| format!("failed to process {}", input.display()))
}

fn read_input(input: &Path) -> Result<String> {
    let mut content = String::new();
    if is_stdin(input) {
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| DocChunkError::io(input, e))?;
    } else {
        content = std::fs::read_to_string(input).map_err(|e| DocChunkError::io(input, e))?;
    }
    Ok(content)
}

fn is_stdin(input: &Path) -> bool {
    input == Path::new("-")
}

/// `<out_dir>/<stem>.<kind>.json`; stdin is named `stdin`.
///
/// Names already written earlier in the same run get a `-2`, `-3`, ...
/// suffix on the stem so inputs sharing a file stem never overwrite each
/// other.
fn output_path(
    out_dir: &Path,
    input: &Path,
    kind: OutputKind,
    taken: &HashSet<PathBuf>,
) -> docchunk_shared::Result<PathBuf> {
    let stem = if is_stdin(input) {
        "stdin"
    } else {
        input
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                DocChunkError::validation(format!(
                    "cannot derive an output name from {}",
                    input.display()
                ))
            })?
    };

    let mut path = out_dir.join(format!("{stem}.{}.json", kind.suffix()));
    let mut n = 2;
    while taken.contains(&path) {
        path = out_dir.join(format!("{stem}-{n}.{}.json", kind.suffix()));
        n += 1;
    }
    if n > 2 {
        warn!(
            input = %input.display(),
            output = %path.display(),
            "output name already used in this run; writing under a numbered name"
        );
    }
    Ok(path)
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(json)
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

/// Run `f` with the progress bar hidden so log lines don't tear it.
fn suspend(bar: Option<&ProgressBar>, f: impl FnOnce()) {
    match bar {
        Some(bar) => bar.suspend(f),
        None => f(),
    }
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => init_config_at(path)?,
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
