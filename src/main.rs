mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{AttachmentsCommand, Cli, Commands};
use fv_attachments::ExtractionCache;
use fv_av::ToolRegistry;
use fv_core::config::Config;
use fv_core::MediaSourceId;
use fv_probe::AttachmentProber;
use fv_server::context::build_prober;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from --verbose.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "framevault=trace,fv_attachments=trace,fv_server=debug,fv_probe=debug,fv_av=debug,tower_http=debug".to_string()
        } else {
            "framevault=info,fv_attachments=info,fv_server=info,fv_probe=info,fv_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(host, port, cli.config.as_deref()))
        }
        Commands::Attachments { command } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(attachments(command, cli.config.as_deref()))
        }
        Commands::Evict { media_source_id } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(evict(&media_source_id, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("framevault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_or_default(config_path);
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    fv_server::start(config, CancellationToken::new()).await?;
    Ok(())
}

async fn attachments(command: AttachmentsCommand, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let prober = build_prober(
        config.attachments.prober,
        &tools,
        Duration::from_secs(config.attachments.extraction_timeout_secs),
    )?;

    match command {
        AttachmentsCommand::List { file, json } => {
            let streams = prober
                .list(&file)
                .await
                .with_context(|| format!("failed to list attachments of {}", file.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&streams)?);
                return Ok(());
            }

            if streams.is_empty() {
                println!("No attachments in {}", file.display());
            }
            for s in &streams {
                println!(
                    "#{:<3} {:<32} {:<28} {}",
                    s.index,
                    s.file_name.as_deref().unwrap_or("-"),
                    s.mime_type.as_deref().unwrap_or("-"),
                    s.size.map(|n| format!("{n} bytes")).unwrap_or_default()
                );
            }
        }
        AttachmentsCommand::Extract {
            file,
            index,
            output,
        } => {
            let probed = prober
                .extract(&file, index, &output)
                .await
                .with_context(|| format!("failed to extract attachment {index} of {}", file.display()))?;
            println!(
                "Wrote {} ({}, {})",
                output.display(),
                probed.mime_type.as_deref().unwrap_or(fv_attachments::DEFAULT_MIME_TYPE),
                probed.file_name.as_deref().unwrap_or("unnamed")
            );
        }
    }
    Ok(())
}

async fn evict(media_source_id: &str, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let id: MediaSourceId = media_source_id
        .parse()
        .with_context(|| format!("invalid media source id: {media_source_id}"))?;

    let cache = ExtractionCache::open(&config.attachments.cache_dir)?;
    let removed = cache.evict(id).await?;
    println!("Removed {removed} cached attachment(s) for {id}");
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All tools are available!");
    } else {
        println!("Some tools are missing. Matroska attachments still work without them.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read {}", p.display()))?;
            Config::from_json(&contents)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    println!("✓ Configuration parsed");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Cache dir: {}", config.attachments.cache_dir.display());
    println!("  Prober: {:?}", config.attachments.prober);
    println!(
        "  Catalog: {}",
        config
            .library
            .catalog_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".into())
    );
    println!("  Webhooks: {}", config.notifications.webhooks.len());
    for w in &warnings {
        println!("  ! {w}");
    }

    Ok(())
}
