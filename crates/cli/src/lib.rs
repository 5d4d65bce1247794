use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use webqa_pipeline::{
    EmbeddingMode, IndexReport, IndexSource, QaConfig, QaError, QaPipeline, RetrievalResult,
};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string_pretty(value)?)
}

#[derive(Parser)]
#[command(name = "webqa")]
#[command(about = "Ask questions about a web page, answered only from its content", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ./webqa.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the persisted index (overrides WEBQA_INDEX_DIR)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    /// Override embedding backend in this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print machine-readable JSON on stdout (implies --quiet)
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum EmbedMode {
    Remote,
    Lexical,
}

impl From<EmbedMode> for EmbeddingMode {
    fn from(mode: EmbedMode) -> Self {
        match mode {
            EmbedMode::Remote => Self::Remote,
            EmbedMode::Lexical => Self::Lexical,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page (or read a text file) and rebuild the index from it
    Index(IndexArgs),

    /// Answer a question from the indexed page
    Ask(AskArgs),

    /// Show the chunks a question would be answered from, without generating
    Search(SearchArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Page URL (http or https)
    #[arg(required_unless_present = "text_file", conflicts_with = "text_file")]
    url: Option<String>,

    /// Index already-clean text from a file instead of fetching a URL
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Source label stored with each chunk (default: the file path)
    #[arg(long, requires = "text_file")]
    source: Option<String>,

    /// Title stored with each chunk (default: the file name)
    #[arg(long, requires = "text_file")]
    title: Option<String>,
}

#[derive(Args)]
struct AskArgs {
    /// Question about the indexed page
    question: String,
}

#[derive(Args)]
struct SearchArgs {
    /// Query text
    query: String,

    /// Number of candidates to consider (default from config)
    #[arg(short = 'k', long)]
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    results: &'a [RetrievalResult],
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // reqwest/hyper are noisy at debug
    if !cli.verbose {
        builder.filter_module("hyper", log::LevelFilter::Warn);
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = resolve_config(&cli)?;
    let pipeline = QaPipeline::from_config(&config).map_err(describe)?;

    match cli.command {
        Commands::Index(args) => run_index(&pipeline, args, cli.json).await?,
        Commands::Ask(args) => run_ask(&pipeline, args, cli.json).await?,
        Commands::Search(args) => run_search(&pipeline, args, cli.json).await?,
    }

    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<QaConfig> {
    let mut config = QaConfig::load(cli.config.as_deref())
        .map_err(describe)
        .context("Failed to load configuration")?;
    if let Some(dir) = &cli.index_dir {
        config.index.dir.clone_from(dir);
    }
    if let Some(mode) = cli.embed_mode {
        config.embedding.mode = mode.into();
    }
    config.validate().map_err(describe)?;
    log::debug!(
        "Index at {}, embeddings via {}",
        config.index.dir.display(),
        config.embedding.mode.as_str()
    );
    Ok(config)
}

/// Prefix pipeline errors with their kind so scripts can tell them apart.
fn describe(err: QaError) -> anyhow::Error {
    anyhow::anyhow!("[{}] {err}", err.kind())
}

async fn run_index(pipeline: &QaPipeline, args: IndexArgs, json: bool) -> Result<()> {
    let source = match (args.url, args.text_file) {
        (Some(url), None) => IndexSource::Url(url),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            IndexSource::Text {
                text,
                source: args.source.unwrap_or_else(|| path.display().to_string()),
                title: args.title.unwrap_or_else(|| default_title(&path)),
            }
        }
        _ => bail!("Pass either a URL or --text-file"),
    };

    let report = pipeline
        .index(source)
        .await
        .map_err(describe)
        .context("Indexing failed")?;

    if json {
        print_json(&report)
    } else {
        print_stdout(&render_index_report(&report))
    }
}

fn default_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled Page".to_string())
}

fn render_index_report(report: &IndexReport) -> String {
    format!(
        "Indexed {} chunks from {} ({}), avg {} chars per chunk",
        report.chunk_count, report.source, report.title, report.avg_chunk_chars
    )
}

async fn run_ask(pipeline: &QaPipeline, args: AskArgs, json: bool) -> Result<()> {
    let answer = pipeline
        .ask_with_sources(&args.question)
        .await
        .map_err(describe)?;

    if json {
        print_json(&answer)
    } else {
        print_stdout(&answer.answer)
    }
}

async fn run_search(pipeline: &QaPipeline, args: SearchArgs, json: bool) -> Result<()> {
    let results = pipeline
        .search(&args.query, args.top_k)
        .await
        .map_err(describe)?;

    if json {
        return print_json(&SearchOutput {
            query: &args.query,
            results: &results,
        });
    }
    if results.is_empty() {
        return print_stdout("No relevant chunks found.");
    }
    print_stdout(&render_results(&results))
}

fn render_results(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(rank, result)| {
            format!(
                "{}. chunk {} (distance {:.3})\n{}",
                rank + 1,
                result.chunk.chunk_id,
                result.score,
                result.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
