use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use ui_explorer::config::{normalize_url, parse_hints};
use ui_explorer::{
    ChromeDriver, ConnectionMode, Explorer, ExplorerConfig, RunSummary, SessionFile, StepStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Start URL (scheme optional)
    #[arg(short, long)]
    url: String,

    /// Description of the task being explored, stored in run.json
    #[arg(short, long, default_value = "")]
    task: String,

    /// Maximum number of actions to take
    #[arg(short, long, default_value_t = 25)]
    steps: usize,

    /// Allow clicking controls labeled delete/remove/archive/reset
    #[arg(long)]
    allow_destructive: bool,

    /// Seconds to wait after the first navigation (e.g. to log in by hand)
    #[arg(long)]
    hold_secs: Option<u64>,

    /// Comma-separated keywords that boost matching controls
    #[arg(long, default_value = "")]
    hints: String,

    /// Output directory for run and step artifacts
    #[arg(short, long, default_value = "./explorer-run")]
    out: PathBuf,

    /// Cookie document imported before and written back after the run
    #[arg(long)]
    session: Option<PathBuf>,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Pass --no-sandbox to Chrome
    #[arg(long)]
    no_sandbox: bool,

    /// Path to the Chrome executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Attach to a running Chrome on this debug port instead of launching one
    #[arg(long)]
    debug_port: Option<u16>,
}

impl Args {
    fn config(&self) -> ExplorerConfig {
        ExplorerConfig {
            start_url: normalize_url(&self.url),
            task: self.task.clone(),
            max_steps: self.steps,
            allow_destructive: self.allow_destructive,
            hold: self.hold_secs.map(Duration::from_secs),
            hints: parse_hints(&self.hints),
            output_dir: self.out.clone(),
            session_file: self.session.clone(),
            ..Default::default()
        }
    }

    fn connection_mode(&self) -> ConnectionMode {
        match self.debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => ConnectionMode::Sandboxed {
                chrome_path: self.chrome_path.clone(),
                no_sandbox: self.no_sandbox,
                headless: self.headless,
            },
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    match run(&args).await {
        Ok(summary) => {
            log::info!(
                "✅ Finished ({:?}): {} steps written, {} iterations, {} skipped captures, {} failed iterations",
                summary.stop_reason,
                summary.steps_written,
                summary.iterations,
                summary.skipped_captures,
                summary.failed_iterations
            );
        }
        Err(e) => {
            log::error!("Run failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<RunSummary> {
    let config = args.config();
    log::info!("Exploring {} (budget {} steps)", config.start_url, config.max_steps);

    let driver = ChromeDriver::new(args.connection_mode())
        .await
        .context("Browser startup failed")?;

    if let Some(path) = &config.session_file {
        let session = SessionFile::load(path).await;
        if let Err(e) = driver.import_cookies(&session).await {
            log::warn!("Cookie import failed: {}", e);
        }
    }

    let store = StepStore::open(&config.output_dir)
        .await
        .context("Cannot prepare output directory")?;

    let session_file = config.session_file.clone();
    let summary = Explorer::new(&driver, store, config)
        .run()
        .await
        .context("Exploration failed")?;

    if let Some(path) = &session_file {
        match driver.export_cookies().await {
            Ok(session) => session
                .save(path)
                .await
                .with_context(|| format!("Cannot write session file {}", path.display()))?,
            Err(e) => log::warn!("Cookie export failed: {}", e),
        }
    }

    if let Err(e) = driver.close().await {
        log::debug!("Browser close: {}", e);
    }

    Ok(summary)
}
