use std::{path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use roundhouse::{
    adapters::{HttpClientAdapter, HttpHandler, admin, http_handler},
    config::{ServerConfig, ServerConfigValidator, loader::load_config},
    core::{ForwardingEngine, HealthMonitor, Router},
    metrics,
    ports::http_client::HttpClient,
    tracing_setup,
    utils::{
        graceful_shutdown::{GracefulShutdown, ShutdownReason},
        log_health_summary, spawn_health_checker_task,
    },
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Start the load balancer (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config).await,
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Serve { config }) => serve(&config).await,
        None => serve(&args.config).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config: ServerConfig = load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    ServerConfigValidator::validate(&config)
        .map_err(|e| eyre!("Invalid configuration in {config_path}:\n{e}"))?;

    tracing_setup::init_tracing(&config.logging)?;
    metrics::init_metrics()?;

    tracing::info!("Loaded configuration from {config_path}");

    let http_client: Arc<dyn HttpClient> =
        Arc::new(HttpClientAdapter::new().context("Failed to create HTTP client adapter")?);

    let monitor = Arc::new(
        HealthMonitor::from_config(&config, http_client.clone())
            .context("Failed to build backend pool")?,
    );
    tracing::info!(
        "Backend pool: {}",
        monitor
            .get_all()
            .iter()
            .map(|b| format!("{} ({})", b.id, b.address))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let engine = Arc::new(ForwardingEngine::new(
        monitor.clone(),
        Router::round_robin(),
        http_client,
        config.forwarding.clone(),
    ));
    let handler = HttpHandler::new(engine);

    let shutdown = Arc::new(GracefulShutdown::new());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.run_signal_handler().await }
    });

    let health_checker = spawn_health_checker_task(
        monitor.clone(),
        config.health_check.clone(),
        shutdown.shutdown_token(),
    );

    let admin_server = if config.admin.enabled {
        let listen_addr = config.admin.listen_addr.clone();
        let monitor = monitor.clone();
        let token = shutdown.shutdown_token();
        Some(tokio::spawn(async move {
            admin::serve_admin(&listen_addr, monitor, token.cancelled()).await
        }))
    } else {
        None
    };

    let server_result = http_handler::serve(
        &config.listen_addr,
        handler,
        shutdown.shutdown_token().cancelled(),
    )
    .await;

    // Ingress stopped on its own (e.g. bind failure): bring everything else down too
    if !shutdown.is_shutdown_initiated() {
        shutdown.trigger_shutdown(ShutdownReason::Force);
    }

    monitor.mark_stopping();

    if shutdown.drain(health_checker).await.is_none() {
        tracing::warn!("Health checker did not stop in time");
    }

    if let Some(admin_server) = admin_server {
        match shutdown.drain(admin_server).await {
            Some(Ok(Err(e))) => tracing::error!("Admin server failed: {:?}", e),
            Some(Err(e)) => tracing::error!("Admin server task failed: {}", e),
            Some(Ok(Ok(()))) => {}
            None => tracing::warn!("Admin server did not stop in time"),
        }
    }

    log_health_summary(&monitor, "shutdown");
    tracing::info!("Graceful shutdown completed");

    server_result
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    match ServerConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            for backend in config.resolved_backends() {
                println!("   • Backend {}: {}", backend.id, backend.address);
            }
            println!(
                "   • Health Checks: {} (every {}s, path {})",
                config.health_check.enabled,
                config.health_check.interval_secs,
                config.health_check.path
            );
            println!(
                "   • Admin Interface: {}",
                if config.admin.enabled {
                    config.admin.listen_addr.as_str()
                } else {
                    "disabled"
                }
            );
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure all backend addresses start with http:// or https://");
            println!("   • Give every backend a unique id");
            println!("   • Verify listen address format (e.g., '127.0.0.1:9000')");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Roundhouse load balancer configuration

# The address to listen on
listen_addr: "127.0.0.1:9000"

# Local backends by port: become server-1.. at http://localhost:<port>
ports: [8001, 8002, 8003]

# Explicit backends (ids must match the serverId reported by /health)
# backends:
#   - id: "api-a"
#     address: "http://10.0.0.5:8080"

health_check:
  enabled: true
  interval_secs: 10
  timeout_secs: 5
  path: "/health"
  initial_delay_ms: 0

forwarding:
  max_attempts: 3
  timeout_secs: 10

# Force health flags and trigger checks from test tooling
admin:
  enabled: false
  listen_addr: "127.0.0.1:9100"

logging:
  level: "info"
  format: "pretty"
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'roundhouse serve --config {config_path}' to start the load balancer");
    Ok(())
}
