//! plantrack CLI entrypoint.
//!
//! Rendered progress goes to stdout; logs go to stderr.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use deploy_plan_tracker::api::{DeploymentClient, ResourceKind};
use deploy_plan_tracker::cli::{Cli, Commands, OutputFormat};
use deploy_plan_tracker::config::{ConfigParser, ConfigValidator, Settings};
use deploy_plan_tracker::error::Result;
use deploy_plan_tracker::render::{render_json, render_text};
use deploy_plan_tracker::tracker::{
    check_interrupted, resolve_deployment_id, track_change, TrackConfig, TrackParams,
};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system on stderr.
fn init_logging(verbose: bool, format: OutputFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        OutputFormat::Text => subscriber.init(),
        OutputFormat::Json => subscriber.json().init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Track {
            deployment_id,
            resource_id,
            kind,
            ignore_downstream,
            poll_frequency_ms,
            max_retries,
            output,
            pretty,
        } => {
            let mut track = settings.track.clone();
            if let Some(ms) = poll_frequency_ms {
                track.poll_frequency_ms = ms;
            }
            if let Some(retries) = max_retries {
                track.max_retries = retries;
            }

            let params = TrackParams {
                api: Arc::new(create_client(&settings)?),
                deployment_id,
                resource_id,
                kind,
                ignore_downstream: ignore_downstream || track.ignore_downstream,
                config: TrackConfig::from(&track),
                cancel: CancellationToken::new(),
            };
            cmd_track(params, output, pretty).await
        }
        Commands::Resolve { resource_id, kind } => {
            cmd_resolve(&settings, &resource_id, kind).await
        }
    }
}

/// Track a plan change and render its progress.
async fn cmd_track(params: TrackParams, output: OutputFormat, pretty: bool) -> Result<()> {
    let cancel = params.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping tracker");
            cancel.cancel();
        }
    });

    let interrupted = params.cancel.clone();
    let events = track_change(params).await?;
    let mut out = std::io::stdout();

    match output {
        OutputFormat::Text => render_text(events, &mut out).await?,
        OutputFormat::Json => render_json(events, &mut out, pretty).await?,
    }

    check_interrupted(&interrupted)
}

/// Print the deployment owning a resource.
async fn cmd_resolve(settings: &Settings, resource_id: &str, kind: ResourceKind) -> Result<()> {
    let client = create_client(settings)?;
    let deployment_id = resolve_deployment_id(&client, resource_id, kind).await?;

    writeln!(std::io::stdout(), "{deployment_id}")?;
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads and validates settings.
fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    let settings = ConfigParser::new().load(config_path)?;
    debug!("Using API endpoint: {}", settings.api.endpoint);

    ConfigValidator::new().validate(&settings)?;
    Ok(settings)
}

/// Creates the control-plane API client.
fn create_client(settings: &Settings) -> Result<DeploymentClient> {
    let api_key = ConfigParser::api_key()?;
    let client =
        DeploymentClient::with_timeout(&settings.api.endpoint, &api_key, settings.api.timeout_secs)?
            .with_max_attempts(settings.api.max_attempts);
    Ok(client)
}
