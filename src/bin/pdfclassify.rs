//! CLI binary for edgequake-pdfclassify.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClassifierConfig`, shows progress and writes the report.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfclassify::pipeline::document::check_pdfium;
use edgequake_pdfclassify::pipeline::input::expand_inputs;
use edgequake_pdfclassify::report::render_report;
use edgequake_pdfclassify::{
    write_report, Category, ClassificationMode, ClassificationProgressCallback,
    ClassificationRecord, Classifier, ClassifierConfig, ProgressCallback, ReportFormat, RunSummary,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Colour a label by how much attention it needs.
fn paint(category: Category) -> String {
    let label = format!("{:<25}", category.as_str());
    match category {
        Category::Error | Category::ArchivoCorrupto => red(&label),
        Category::RevisionManual => yellow(&label),
        Category::Vacio => dim(&label),
        _ => green(&label),
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Classifying");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ClassificationProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Classifying {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, file_name: &str) {
        self.bar.set_message(file_name.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, record: &ClassificationRecord) {
        self.bar.println(format!(
            "  {:>3}/{:<3}  {}  {:.2}  {}  {}",
            index,
            total,
            paint(record.result.category()),
            record.result.score(),
            record.file_name,
            dim(&format!("{:.1}s", record.duration_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();
        let mark = if summary.sentinel_documents == 0 {
            green("✔")
        } else {
            yellow("⚠")
        };
        eprintln!(
            "{} {}/{} documents classified  ({} need attention)",
            mark,
            bold(&summary.classified_documents().to_string()),
            summary.total_documents,
            summary.sentinel_documents,
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Classify a folder with the local text model, report to stdout
  pdfclassify inbox/

  # Write a CSV report
  pdfclassify inbox/ -o clasificacion.csv

  # Hybrid (page image + text) with a vision model
  pdfclassify --mode hybrid inbox/ -o clasificacion.csv

  # JSON report
  pdfclassify inbox/ -o clasificacion.json

  # Use a hosted provider through edgequake-llm
  pdfclassify --provider openai --model gpt-4.1-mini inbox/

CATEGORIES:
  QUEJA_RECLAMO  CONTRATO  RESOLUCION_ADMINISTRATIVA  INFORME_TECNICO  COMUNICACION_INTERNA

SENTINELS:
  REVISION_MANUAL   model answer unusable, or too little text (likely a scan)
  ERROR             model unreachable or failed
  VACIO             document has no pages
  ARCHIVO_CORRUPTO  file could not be opened or read

ENVIRONMENT VARIABLES:
  OLLAMA_HOST       OpenAI-compatible base URL (default http://localhost:11434/v1)
  PDFIUM_LIB_PATH   Path to an existing libpdfium
  OPENAI_API_KEY    Used with --provider openai (likewise ANTHROPIC_API_KEY, GEMINI_API_KEY)
"#;

/// Classify administrative PDFs into five categories using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdfclassify",
    version,
    about = "Classify administrative PDFs into five categories using an LLM",
    long_about = "Classify administrative PDF documents (complaints, contracts, resolutions, \
technical reports, internal memos) with a local Ollama model or any provider supported by \
edgequake-llm. Every document gets exactly one label and a score in [0, 1].",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files and/or directories (directories are scanned non-recursively).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Classification mode.
    #[arg(long, env = "PDFCLASSIFY_MODE", value_enum, default_value = "text")]
    mode: ModeArg,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "PDFCLASSIFY_OUTPUT")]
    output: Option<PathBuf>,

    /// Report format. Default: from the output extension, else csv.
    #[arg(long, env = "PDFCLASSIFY_FORMAT", value_enum)]
    format: Option<FormatArg>,

    /// Model ID (default: qwen2.5-coder:7b for text, llama3.2-vision for hybrid).
    #[arg(long, env = "PDFCLASSIFY_MODEL")]
    model: Option<String>,

    /// OpenAI-compatible base URL.
    #[arg(long, env = "OLLAMA_HOST")]
    endpoint: Option<String>,

    /// Bearer token for the endpoint.
    #[arg(long, env = "PDFCLASSIFY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// edgequake-llm provider (openai, anthropic, gemini, ollama, …) instead of --endpoint.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Rendering DPI for the hybrid page image (72–400).
    #[arg(long, env = "PDFCLASSIFY_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Max tokens the model may generate per document.
    #[arg(long, env = "PDFCLASSIFY_MAX_TOKENS", default_value_t = 300)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0). Default: 0.0 text, 0.1 hybrid.
    #[arg(long, env = "PDFCLASSIFY_TEMPERATURE")]
    temperature: Option<f32>,

    /// Sampling seed. Default: 42 in text mode, unset in hybrid.
    #[arg(long, env = "PDFCLASSIFY_SEED")]
    seed: Option<u64>,

    /// Retries per document on transient inference failures.
    #[arg(long, env = "PDFCLASSIFY_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call inference timeout in seconds.
    #[arg(long, env = "PDFCLASSIFY_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFCLASSIFY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print the full run (records + summary) as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFCLASSIFY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFCLASSIFY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFCLASSIFY_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Text,
    Hybrid,
}

impl From<ModeArg> for ClassificationMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Text => ClassificationMode::TextOnly,
            ModeArg::Hybrid => ClassificationMode::Hybrid,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Csv => ReportFormat::Csv,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries per-document feedback, so library INFO logs
    // are muted while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Discover documents ───────────────────────────────────────────────
    let paths = expand_inputs(&cli.inputs).context("Failed to read inputs")?;
    if paths.is_empty() {
        if !cli.quiet {
            eprintln!("{} no PDF files found; no report written", yellow("⚠"));
        }
        return Ok(());
    }

    // ── Ensure PDFium engine is available ────────────────────────────────
    check_pdfium().await.context("PDFium is not available")?;

    // ── Build config and classifier ──────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ClassificationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let classifier = Arc::new(Classifier::new(config).context("Failed to set up inference")?);

    // ── Run ──────────────────────────────────────────────────────────────
    let run = classifier.classify_paths(paths).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&run).context("Failed to serialise run")?;
        println!("{json}");
    }

    let format = cli
        .format
        .map(ReportFormat::from)
        .or_else(|| cli.output.as_deref().map(ReportFormat::from_path))
        .unwrap_or_default();

    match cli.output {
        Some(ref output_path) => {
            write_report(&run.records, output_path, format).context("Failed to write report")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} row(s)  {}ms  →  {}",
                    green("✔"),
                    run.records.len(),
                    run.summary.total_duration_ms,
                    bold(&output_path.display().to_string()),
                );
            }
        }
        None if !cli.json => {
            let bytes = render_report(&run.records, format).context("Failed to render report")?;
            io::stdout()
                .lock()
                .write_all(&bytes)
                .context("Failed to write to stdout")?;
        }
        None => {}
    }

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Classified {} document(s) in {}ms: {} substantive, {} sentinel",
            run.summary.total_documents,
            run.summary.total_duration_ms,
            run.summary.classified_documents(),
            run.summary.sentinel_documents,
        );
    }

    Ok(())
}

/// Map CLI args to `ClassifierConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClassifierConfig> {
    let mut builder = ClassifierConfig::builder()
        .mode(cli.mode.into())
        .dpi(cli.dpi)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(seed) = cli.seed {
        builder = builder.seed(seed);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
