use anyhow::{bail, Context};
use clap::Parser;
use gestion_uploader::upload::{
    stage_paths, BatchProgress, BatchState, BatchSummary, OutcomeStatus, ProgressEvent,
    ReqwestTransport, UploadContext, UploadOrchestrator,
};
use gestion_uploader::{init_tracing, UploaderConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::channel;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

#[derive(Parser)]
#[command(name = "gestion-upload", about = "Upload attachments to a gestion record")]
struct Cli {
    /// JSON configuration file
    #[arg(long, conflicts_with_all = ["endpoint", "curl"])]
    config: Option<PathBuf>,
    /// Attachment endpoint URL
    #[arg(long)]
    endpoint: Option<Url>,
    /// File holding a "Copy as cURL" command from the dashboard
    #[arg(long, conflicts_with = "endpoint")]
    curl: Option<PathBuf>,
    /// Gestion (owner record) id
    #[arg(long)]
    gestion: u64,
    /// Acting user id
    #[arg(long)]
    user: u64,
    #[arg(long, default_value = "0")]
    workflow: u64,
    #[arg(long)]
    unidad: Option<u64>,
    /// Files or folders to upload
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<UploaderConfig> {
        if let Some(path) = &self.config {
            return UploaderConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()));
        }
        if let Some(path) = &self.curl {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            return Ok(UploaderConfig::from_curl(&text)?);
        }
        match &self.endpoint {
            Some(endpoint) => Ok(UploaderConfig::new(endpoint.clone())),
            None => bail!("one of --config, --curl or --endpoint is required"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.load_config()?;

    let mut context = UploadContext::new(cli.gestion, cli.user)?.with_workflow(cli.workflow);
    if let Some(unidad) = cli.unidad {
        context = context.with_unit(unidad);
    }

    let staged = stage_paths(&cli.paths, &config.rules).await?;
    let validation = staged.validate(&config.rules);
    if !validation.valid {
        for error in &validation.errors {
            eprintln!("{}", error);
        }
        return Ok(ExitCode::from(2));
    }
    let candidates = staged.into_candidates();

    let transport = ReqwestTransport::new(
        config.endpoint.clone(),
        config.header_map()?,
        config.timeout(),
    )?;
    let (sender, receiver) = channel::<ProgressEvent>();
    let orchestrator =
        UploadOrchestrator::new(transport, config.request_settings()).with_observer(Arc::new(sender));

    let total = candidates.len();
    let progress_task = std::thread::spawn(move || {
        let mut progress = BatchProgress::new(total);
        let mut last_completed = 0;
        while let Ok(event) = receiver.recv() {
            progress.apply(event);
            if progress.completed() != last_completed {
                last_completed = progress.completed();
                info!("{}", progress.status_text());
            }
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, abandoning pending uploads");
            ctrl_c.cancel();
        }
    });

    let outcomes = orchestrator
        .upload_cancellable(candidates, &context, cancel.clone())
        .await;
    drop(orchestrator);
    // Abandoned requests may still hold a progress sender.
    if !cancel.is_cancelled() {
        progress_task.join().unwrap_or_default();
    }

    for outcome in &outcomes {
        match outcome.status {
            OutcomeStatus::Succeeded => println!(
                "ok      {} -> {}",
                outcome.display_name,
                outcome.server_reference.as_deref().unwrap_or_default()
            ),
            OutcomeStatus::Failed => println!(
                "failed  {}: {}",
                outcome.display_name,
                outcome.failure_reason.as_deref().unwrap_or_default()
            ),
        }
    }

    let summary = BatchSummary::from_outcomes(&outcomes);
    println!("{}", summary);

    Ok(match summary.state() {
        BatchState::Empty | BatchState::Succeeded => ExitCode::SUCCESS,
        BatchState::PartialFailure | BatchState::Failed => ExitCode::FAILURE,
    })
}
