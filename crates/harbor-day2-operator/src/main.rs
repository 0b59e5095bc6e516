use anyhow::{Context, Result};
use clap::Parser;
use harbor_day2_api::HarborClient;
use harbor_day2_operator::cli::Cli;
use harbor_day2_operator::config::loader::load_unvalidated;
use harbor_day2_operator::observability::init_tracing;
use harbor_day2_operator::{AppConfig, Operator};
use harbor_day2_sync::adapters::RobotSecrets;

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist - it's optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let cli = Cli::parse();
    let cfg = match load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    init_tracing(&cfg.logging);
    tracing::info!(
        api_url = cfg.harbor.api_url.as_deref().unwrap_or_default(),
        config_folder = %cfg.config_folder().display(),
        "Configuration loaded"
    );

    if let Err(e) = run(&cfg).await {
        tracing::error!(error = format!("{e:#}"), "Synchronization failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load(cli: &Cli) -> Result<AppConfig, String> {
    let mut cfg = load_unvalidated(cli.config.as_deref())?;
    cli.apply(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

async fn run(cfg: &AppConfig) -> Result<()> {
    let password = cfg.admin.password.as_deref().unwrap_or_default();
    let client = HarborClient::new(cfg.client_config(password))
        .context("Failed to create the Harbor client")?;

    let previous = match cfg.admin.old_password.as_deref() {
        Some(old) => Some(
            HarborClient::new(cfg.rotation_client_config(old))
                .context("Failed to create the Harbor client for the old password")?,
        ),
        None => None,
    };

    let mut operator = Operator::new(cfg, &client).with_robot_secrets(RobotSecrets::from_env());
    if let Some(previous) = &previous {
        operator = operator.with_previous_client(previous);
    }
    operator.run().await?;
    Ok(())
}
