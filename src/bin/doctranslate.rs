//! CLI binary for edgequake-doctranslate.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `TranslationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doctranslate::{
    inspect, translate_batch, Credentials, OutputNaming, PageBox, ProgressCallback, Stage,
    TranslationConfig, TranslationOutput, TranslationProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while a single document is in
/// flight, a bar across documents in a batch, and one log line per finished
/// document. Documents may finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-document wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<String, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, input: &str) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(input)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        if total > 1 {
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} documents  ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);
            self.bar.set_length(total as u64);
            self.bar.set_style(style);
        }
        self.bar.set_prefix("Translating");
    }

    fn on_stage(&self, input: &str, stage: Stage) {
        if stage == Stage::Resolve {
            self.start_times
                .lock()
                .unwrap()
                .insert(input.to_string(), Instant::now());
        }
        self.bar.set_message(format!("{input}: {}", stage.label()));
    }

    fn on_document_complete(&self, input: &str, output_bytes: usize) {
        let secs = self.elapsed_secs(input);
        self.bar.println(format!(
            "  {} {}  {}  {}",
            green("✓"),
            input,
            dim(&format!("{output_bytes} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, input: &str, error: &str) {
        let secs = self.elapsed_secs(input);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {}  {}  {}",
            red("✗"),
            input,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(success_count);
        if total > 1 && failed > 0 {
            eprintln!(
                "{} {}/{} documents translated  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate a PDF to English → outputs/translated_document.pdf
  doctranslate inputs/document2.pdf

  # Translate a scanned page to French
  doctranslate --target fr scans/receipt.jpg

  # Several documents at once, named after their inputs
  doctranslate --name-from-input --target de a.pdf b.png c.docx

  # Keep the PDF made from an image
  doctranslate --keep-pdf temp/temp_image.pdf photo.png

  # Inspect an input (no credentials needed)
  doctranslate --inspect-only photo.png

  # JSON summary
  doctranslate --json document.pdf > result.json

SUPPORTED INPUTS:
  PDF                       submitted as-is
  PNG, JPEG, GIF, BMP, ...  laid out on one 612×792 pt page, submitted as PDF
  DOC(X), PPT(X), XLS(X)    submitted as-is

ENVIRONMENT VARIABLES:
  GOOGLE_APPLICATION_CREDENTIALS  Path to a service-account JSON key
  GOOGLE_OAUTH_ACCESS_TOKEN       Ready-made OAuth access token (takes precedence)
  GOOGLE_CLOUD_PROJECT            Project id (defaults to the key's project_id)
  DOCTRANSLATE_TARGET             Default target language
  RUST_LOG                        Override log filter (e.g. edgequake_doctranslate=debug)

  A .env file in the working directory is loaded on start.
"#;

/// Translate PDF, image and Office documents with Google Cloud Translation.
#[derive(Parser, Debug)]
#[command(
    name = "doctranslate",
    version,
    about = "Translate PDF, image and Office documents with Google Cloud Translation",
    long_about = "Translate documents (local files or URLs) with the Cloud Translation v3 \
translateDocument API. Images are laid out on a single PDF page before submission; the \
translated file is named from the MIME type the API returns.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Target language code (en-US, fr, ja, ...).
    #[arg(short, long, env = "DOCTRANSLATE_TARGET", default_value = "en-US")]
    target: String,

    /// Source language code. Detected by the API when omitted.
    #[arg(short, long, env = "DOCTRANSLATE_SOURCE")]
    source: Option<String>,

    /// Google Cloud project id.
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    project: Option<String>,

    /// API location (global, us-central1, ...).
    #[arg(long, env = "DOCTRANSLATE_LOCATION", default_value = "global")]
    location: String,

    /// Model resource name, e.g. projects/p/locations/us-central1/models/general/nmt.
    #[arg(long, env = "DOCTRANSLATE_MODEL")]
    model: Option<String>,

    /// Directory translated documents are written to.
    #[arg(short, long, env = "DOCTRANSLATE_OUTPUT_DIR", default_value = "outputs")]
    output_dir: PathBuf,

    /// Output file stem (extension comes from the response).
    #[arg(long, default_value = "translated_document", conflicts_with = "name_from_input")]
    name: String,

    /// Name each output <input stem>_translated.<ext>. Required for several inputs.
    #[arg(long)]
    name_from_input: bool,

    /// Write the PDF generated from an image input to this path
    /// (`<stem>_<input stem>.pdf` beside it when several inputs are given).
    #[arg(long)]
    keep_pdf: Option<PathBuf>,

    /// Layout page size for image inputs.
    #[arg(long, value_enum, default_value = "letter")]
    page: PageArg,

    /// Only translate native (non-scanned) PDFs.
    #[arg(long)]
    native_pdf_only: bool,

    /// Service-account key file (overrides GOOGLE_APPLICATION_CREDENTIALS).
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Translation API base URL.
    #[arg(long, env = "DOCTRANSLATE_ENDPOINT")]
    endpoint: Option<String>,

    /// Per-document API timeout in seconds.
    #[arg(long, env = "DOCTRANSLATE_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Retries on rate limits, timeouts and 5xx responses.
    #[arg(long, env = "DOCTRANSLATE_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Documents translated at the same time.
    #[arg(short, long, env = "DOCTRANSLATE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Describe the inputs only; nothing is translated.
    #[arg(long)]
    inspect_only: bool,

    /// Print a JSON summary on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress display.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageArg {
    Letter,
    A4,
}

impl From<PageArg> for PageBox {
    fn from(v: PageArg) -> Self {
        match v {
            PageArg::Letter => PageBox::LETTER,
            PageArg::A4 => PageBox::A4,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress display replaces INFO logs unless -v is given.
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let mut reports = Vec::with_capacity(cli.inputs.len());
        for input in &cli.inputs {
            reports.push(
                inspect(input)
                    .await
                    .with_context(|| format!("Failed to inspect {input}"))?,
            );
        }

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&reports).context("Failed to serialize report")?
            );
        } else {
            for r in &reports {
                println!("File:         {}", r.input);
                println!(
                    "MIME type:    {}",
                    r.mime_type.as_deref().unwrap_or("unknown")
                );
                match r.kind {
                    Some(kind) => println!("Kind:         {:?}", kind),
                    None => println!("Kind:         {}", red("unsupported")),
                }
                println!("Size:         {} bytes", r.size_bytes);
                if let Some((w, h)) = r.image_dimensions {
                    println!("Dimensions:   {w}×{h} px");
                }
                if let Some(ref m) = r.submitted_mime_type {
                    println!("Submitted as: {m}");
                }
                println!();
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn TranslationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run translation ──────────────────────────────────────────────────
    let items = translate_batch(&cli.inputs, &config)
        .await
        .context("Translation failed")?;

    let mut failed = 0usize;
    let mut outputs: Vec<&TranslationOutput> = Vec::new();
    for item in &items {
        match item.result {
            Ok(ref out) => {
                if !cli.quiet && !cli.json {
                    let dest = out
                        .written_to
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    eprintln!(
                        "{}  {}  →  {}  {}",
                        green("✔"),
                        item.input,
                        bold(&dest),
                        dim(&format!(
                            "{}  {}ms",
                            out.mime_type, out.stats.total_duration_ms
                        )),
                    );
                    if let Some(ref lang) = out.detected_language_code {
                        eprintln!("   detected source language: {}", dim(lang));
                    }
                }
                outputs.push(out);
            }
            Err(ref e) => {
                failed += 1;
                if !show_progress {
                    eprintln!("{}  {}: {}", red("✘"), item.input, e);
                }
            }
        }
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outputs).context("Failed to serialise output")?
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} documents failed", items.len());
    }
    Ok(())
}

/// Map CLI args to `TranslationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranslationConfig> {
    let naming = if cli.name_from_input {
        OutputNaming::FromInput
    } else {
        OutputNaming::Fixed(cli.name.clone())
    };

    let mut builder = TranslationConfig::builder()
        .target_language(&cli.target)
        .location(&cli.location)
        .output_dir(&cli.output_dir)
        .naming(naming)
        .page_box(cli.page.into())
        .native_pdf_only(cli.native_pdf_only)
        .api_timeout_secs(cli.api_timeout)
        .max_retries(cli.max_retries)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref s) = cli.source {
        builder = builder.source_language(s);
    }
    if let Some(ref p) = cli.project {
        builder = builder.project_id(p);
    }
    if let Some(ref m) = cli.model {
        builder = builder.model(m);
    }
    if let Some(ref e) = cli.endpoint {
        builder = builder.endpoint(e);
    }
    if let Some(ref path) = cli.keep_pdf {
        builder = builder.keep_intermediate_pdf(path);
    }
    if let Some(ref path) = cli.credentials {
        let creds = Credentials::from_key_file(path)
            .with_context(|| format!("Failed to load credentials from {}", path.display()))?;
        builder = builder.credentials(creds);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
