//! CLI binary for edgequake-mediachat.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `ClientConfig` + `AskRequest` and prints the answer.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_mediachat::{
    resolve_input, AskRequest, ClientConfig, ExtractionPolicy, GenerationConfig, MediaKind,
    ModelTier, ProgressCallback, Session, SessionProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that follows a question through upload, polling and
/// generation.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl SessionProgressCallback for CliProgressCallback {
    fn on_extraction_complete(&self, documents: usize, chars: usize) {
        self.bar.println(format!(
            "  {} Read {} document(s)  {}",
            green("✓"),
            documents,
            dim(&format!("{chars} chars"))
        ));
    }

    fn on_upload_complete(&self, remote_id: &str, bytes: usize) {
        self.bar.println(format!(
            "  {} Uploaded {}  {}",
            green("✓"),
            remote_id,
            dim(&format!("{bytes} bytes"))
        ));
        self.bar.set_prefix("Processing");
        self.bar.set_message("waiting for the file to become ready…");
    }

    fn on_poll(&self, _remote_id: &str, attempt: u32, readiness: &str) {
        self.bar
            .set_message(format!("poll #{attempt}: {readiness}"));
    }

    fn on_ready(&self, remote_id: &str, polls: u32) {
        self.bar.println(format!(
            "  {} {} ready  {}",
            green("✓"),
            remote_id,
            dim(&format!("{polls} polls"))
        ));
    }

    fn on_generation_start(&self, model: &str) {
        self.bar.set_prefix("Generating");
        self.bar.set_message(model.to_string());
    }

    fn on_generation_complete(&self, model: &str, output_chars: usize) {
        self.bar.println(format!(
            "  {} {} answered  {}",
            green("✓"),
            model,
            dim(&format!("{output_chars} chars"))
        ));
    }

    fn on_release(&self, remote_id: &str, deleted: bool) {
        if deleted {
            self.bar
                .println(format!("  {} Deleted {}", green("✓"), remote_id));
        } else {
            self.bar
                .println(format!("  {} Could not delete {}", yellow("⚠"), remote_id));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ask about one or more PDFs (text is extracted locally)
  mediachat --kind pdf report.pdf appendix.pdf -p "Summarise the findings"

  # Ask about an image with the pro model
  mediachat --kind image --model pro photo.jpg -p "What is in this picture?"

  # Video and audio are uploaded and processed remotely first
  mediachat --kind video clip.mp4 -p "Describe what happens"
  mediachat --kind audio https://example.com/talk.mp3 -p "Transcribe the first minute"

  # Prompt from stdin, JSON answer
  echo "List the speakers" | mediachat --kind audio talk.mp3 --json

MODELS:
  flash   gemini-1.5-flash (default)
  pro     gemini-1.5-pro

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY    Gemini API key (required)
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory) for PDF questions
  RUST_LOG          Override the log filter
"#;

/// Ask questions about PDFs, images, video and audio.
#[derive(Parser, Debug)]
#[command(
    name = "mediachat",
    version,
    about = "Ask a multimodal model questions about PDFs, images, video and audio",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs. Several are allowed for PDFs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Question to ask. Read from stdin when omitted.
    #[arg(short, long, env = "MEDIACHAT_PROMPT")]
    prompt: Option<String>,

    /// What the inputs are.
    #[arg(short, long, env = "MEDIACHAT_KIND", value_enum, default_value = "pdf")]
    kind: KindArg,

    /// Select a model you want to use.
    #[arg(short, long, env = "MEDIACHAT_MODEL", value_enum, default_value = "flash")]
    model: ModelArg,

    /// Sampling temperature (0.0–2.0).
    #[arg(
        long,
        env = "MEDIACHAT_TEMPERATURE",
        default_value_t = 1.0,
        long_help = "Lower temperatures are good for prompts that require a less open-ended or \
creative response, while higher temperatures can lead to more diverse or creative results. \
A temperature of 0 means that the highest probability tokens are always selected."
    )]
    temperature: f32,

    /// Nucleus-sampling threshold (0.0–1.0).
    #[arg(
        long,
        env = "MEDIACHAT_TOP_P",
        default_value_t = 0.94,
        long_help = "Used for nucleus sampling. Specify a lower value for less random responses \
and a higher value for more random responses."
    )]
    top_p: f32,

    /// Number of response tokens (100–5000).
    #[arg(long, env = "MEDIACHAT_MAX_TOKENS", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(100..=5000))]
    max_tokens: u32,

    /// Send the generation settings for video and audio too.
    #[arg(long, env = "MEDIACHAT_ALWAYS_SEND_CONFIG")]
    always_send_config: bool,

    /// Skip PDFs that cannot be parsed instead of failing.
    #[arg(long, env = "MEDIACHAT_SKIP_BAD_DOCUMENTS")]
    skip_bad_documents: bool,

    /// Seconds between readiness checks of an uploaded file.
    #[arg(long, env = "MEDIACHAT_POLL_INTERVAL", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    /// Give up on an upload still processing after this many seconds.
    #[arg(long, env = "MEDIACHAT_READY_TIMEOUT", default_value_t = 600)]
    ready_timeout: u64,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "MEDIACHAT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Override the Gemini API endpoint.
    #[arg(long, env = "MEDIACHAT_BASE_URL")]
    base_url: Option<String>,

    /// Output the full answer (with stats) as JSON.
    #[arg(long, env = "MEDIACHAT_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "MEDIACHAT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEDIACHAT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MEDIACHAT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Pdf,
    Image,
    Video,
    Audio,
}

impl From<KindArg> for MediaKind {
    fn from(v: KindArg) -> Self {
        match v {
            KindArg::Pdf => MediaKind::Document,
            KindArg::Image => MediaKind::Image,
            KindArg::Video => MediaKind::Video,
            KindArg::Audio => MediaKind::Audio,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModelArg {
    Flash,
    Pro,
}

impl From<ModelArg> for ModelTier {
    fn from(v: ModelArg) -> Self {
        match v {
            ModelArg::Flash => ModelTier::Fast,
            ModelArg::Pro => ModelTier::Pro,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what INFO logs would say, so only errors get through
    // while it is shown.
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

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_client_config(&cli)?;
    let kind: MediaKind = cli.kind.into();

    let prompt = match cli.prompt.clone() {
        Some(p) => p,
        None => read_prompt_from_stdin()?,
    };

    let generation = GenerationConfig::builder()
        .temperature(cli.temperature)
        .top_p(cli.top_p)
        .max_output_tokens(cli.max_tokens)
        .build()
        .context("Invalid generation settings")?;

    let mut session = Session::gemini(&config).context("Failed to create session")?;
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        session = session.with_progress(cb);
    }

    // ── Resolve inputs ───────────────────────────────────────────────────
    let mut inputs = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        inputs.push(
            resolve_input(input, kind, config.download_timeout)
                .await
                .with_context(|| format!("Failed to read input '{input}'"))?,
        );
    }

    let request = AskRequest::new(kind, inputs, prompt)
        .model(cli.model.into())
        .generation(generation)
        .always_send_config(cli.always_send_config);

    // ── Ask ──────────────────────────────────────────────────────────────
    let cancel = async {
        // Without a signal handler the question simply runs to completion.
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let answer = match session.ask_with_cancel(request, cancel).await {
        Ok(answer) => answer,
        Err(e) => {
            if e.is_media_error() && !cli.quiet {
                eprintln!(
                    "{}  The remote store could not prepare this file. Try re-encoding it, \
                     or allow more time with --ready-timeout.",
                    yellow("⚠")
                );
            }
            return Err(e).context("Question failed");
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&answer).context("Failed to serialise answer")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(answer.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !answer.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !cli.json {
        if let Some(tokens) = answer.document_tokens {
            eprintln!("   {} document tokens", dim(&tokens.to_string()));
        }
        eprintln!(
            "{}  {}  {} tokens in  /  {} tokens out  —  {}ms total",
            green("✔"),
            cyan(&answer.model),
            dim(&answer.stats.prompt_tokens.to_string()),
            dim(&answer.stats.output_tokens.to_string()),
            answer.stats.total_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`. Fails when `GOOGLE_API_KEY` is unset.
fn build_client_config(cli: &Cli) -> Result<ClientConfig> {
    let policy = if cli.skip_bad_documents {
        ExtractionPolicy::Skip
    } else {
        ExtractionPolicy::Abort
    };

    let mut builder = ClientConfig::builder()
        .api_key_from_env()
        .context("Cannot start without an API key")?
        .poll_interval(Duration::from_secs(cli.poll_interval))
        .readiness_timeout(Duration::from_secs(cli.ready_timeout))
        .download_timeout(Duration::from_secs(cli.download_timeout))
        .extraction_policy(policy);

    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }

    builder.build().context("Invalid configuration")
}

fn read_prompt_from_stdin() -> Result<String> {
    let mut prompt = String::new();
    io::stdin()
        .read_to_string(&mut prompt)
        .context("Failed to read prompt from stdin")?;
    Ok(prompt)
}
