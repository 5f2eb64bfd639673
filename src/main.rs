//! STM32N6 Development MCP Server

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use rmcp::{transport::stdio, ServiceExt};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

use stm32n6_dev::{config::Args, Config, ServerContext, Stm32DevServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let environment: HashMap<String, String> = std::env::vars().collect();
    let config = Config::resolve(&args, &environment)?;

    if args.show_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }
    if args.validate_config {
        println!("Configuration is valid");
        return Ok(());
    }

    init_logging(&args, &config)?;

    info!("Starting STM32N6 Development MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let context = ServerContext::with_builtins(config, environment, std::env::current_dir()?)?;
    debug!(
        "Registered {} tools, {} agents, {} hooks",
        context.tools.count(),
        context.agents.count(),
        context.hooks.len()
    );

    let service = Stm32DevServer::new(Arc::new(context))
        .serve(stdio())
        .await
        .inspect_err(|e| {
            error!("Serving error: {:?}", e);
        })?;

    service.waiting().await?;
    Ok(())
}

fn init_logging(args: &Args, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let level = config.server.log_level.as_str();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false);

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    debug!("Logging initialized with level: {}", level);
    Ok(())
}
