mod cli;

use liveops::{
    config,
    context::{AppContext, OPERATIONS_VERSION},
    server,
};
use liveops_teardown::{DependentStatus, RawTeardownRequest, TeardownReport};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "liveops=debug,liveops_teardown=debug,liveops_media=debug,liveops_store=debug,tower_http=debug".to_string()
        } else {
            "liveops=info,liveops_teardown=info,liveops_media=warn,liveops_store=warn,tower_http=info".to_string()
        }
    });

    // Logs go to stderr so `--json` output stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(host, port, cli.config.as_deref()))
        }
        Commands::Teardown {
            channel,
            keep_assets,
            region,
            json,
        } => {
            let request = RawTeardownRequest {
                channel_name: Some(channel),
                delete_asset: Some(!keep_assets),
                region_selector: region,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(teardown(request, cli.config.as_deref(), json))
        }
        Commands::Metadata {
            channel,
            region,
            refresh,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_metadata(
                &channel,
                region.as_deref(),
                refresh,
                cli.config.as_deref(),
            ))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("liveops {}", OPERATIONS_VERSION);
            Ok(())
        }
    }
}

async fn serve(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    for warning in config.validate() {
        tracing::warn!("Config: {}", warning);
    }

    let ctx = AppContext::from_config(config)?;
    tracing::info!(store = ctx.store.name(), "Starting liveops server");
    server::start_server(ctx).await
}

async fn teardown(
    request: RawTeardownRequest,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let request = request.validate()?;
    let config = config::load_config_or_default(config_path)?;
    let ctx = AppContext::from_config(config)?;

    let (_, report) = ctx.teardown(&request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    match report {
        TeardownReport::Success(_) => Ok(()),
        TeardownReport::Failure(failure) => anyhow::bail!(failure.error_message),
    }
}

fn print_report(report: &TeardownReport) {
    let (dependents, warnings) = match report {
        TeardownReport::Success(s) => {
            println!("✓ Live event {} deleted", s.channel_name);
            (&s.dependents, &s.warnings)
        }
        TeardownReport::Failure(f) => {
            match f.failed_stage {
                Some(stage) => println!("✗ Teardown failed during {}: {}", stage, f.error_message),
                None => println!("✗ Teardown failed: {}", f.error_message),
            }
            (&f.dependents, &f.warnings)
        }
    };

    for dependent in dependents {
        let status = match &dependent.status {
            DependentStatus::Deleted => "deleted".to_string(),
            DependentStatus::Preserved => "preserved".to_string(),
            DependentStatus::Skipped(reason) => format!("skipped ({reason})"),
            DependentStatus::Failed(error) => format!("FAILED ({error})"),
        };
        println!("  {} {}: {}", dependent.kind, dependent.name, status);
    }

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in warnings {
            println!("  - {}", warning);
        }
    }
}

async fn show_metadata(
    channel: &str,
    region: Option<&str>,
    refresh: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let ctx = AppContext::from_config(config)?;

    if refresh {
        let (record, stored) = ctx.record_metadata(channel, region).await?;
        if !stored {
            println!("Metadata store is {}; record not saved", ctx.store.name());
            println!("{}", serde_json::to_string_pretty(&record)?);
            return Ok(());
        }
    }

    match ctx.metadata(channel, region).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No metadata record for {} (store: {})", channel, ctx.store.name()),
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let (config, source) = match path {
        Some(p) => (config::load_config(p)?, format!("{:?}", p)),
        None => match config::find_config() {
            Some(p) => (config::load_config(&p)?, format!("{:?}", p)),
            None => (config::load_config_or_default(None)?, "defaults".to_string()),
        },
    };

    println!("Validating config: {}", source);
    println!("✓ Configuration parsed");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!(
        "  Media account: {}/{}",
        config.media.resource_group, config.media.account_name
    );
    println!("  Metadata store: {:?}", config.store.backend);
    match config.teardown.stop_max_wait() {
        Some(max) => println!(
            "  Stop wait: every {}ms, up to {}s",
            config.teardown.stop_poll_interval_ms,
            max.as_secs()
        ),
        None => println!(
            "  Stop wait: every {}ms, unbounded",
            config.teardown.stop_poll_interval_ms
        ),
    }

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}
