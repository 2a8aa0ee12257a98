//! pedido-gateway: WhatsApp order-notification gateway
//!
//! Bridges the order-management backend to customers over WhatsApp:
//! greets first-time contacts with the digital menu and relays
//! order-status updates as chat notifications.
//!
//! Usage:
//!   pedido-gateway           - Start the gateway
//!   pedido-gateway --help    - Show help

use std::time::Duration;

use pedido_core::{Config, GreetingTexts};
use pedido_whatsapp::{
    FileAuthStore, Greeter, NotificationDispatcher, SeenContacts, SharedHandle, SocketTransport,
    Supervisor,
};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Gateway mode (WhatsApp session + webhook server)
    Server,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let mode = parse_args();

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("pedido-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting pedido-gateway...");
    tracing::info!("Bridge: {}", config.whatsapp.bridge_url);

    run_server(config).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("pedido-gateway - WhatsApp order-notification gateway");
    println!();
    println!("Usage:");
    println!("  pedido-gateway           Start the gateway");
    println!("  pedido-gateway --help    Show this help message");
    println!("  pedido-gateway --version Show version");
    println!();
    println!("Environment Variables:");
    println!("  PORT                 Webhook HTTP port (default: 3000)");
    println!("  LINK_CARDAPIO        Menu link sent to first-time contacts");
    println!("  WA_BRIDGE_URL        WebSocket URL of the WhatsApp bridge");
    println!("  WA_AUTH_PATH         Path of the persisted credential state");
}

/// Run the gateway (WhatsApp supervisor + webhook HTTP server)
async fn run_server(config: Config) -> anyhow::Result<()> {
    let handle = SharedHandle::new();
    let seen = SeenContacts::new();
    let texts = GreetingTexts::new(&config.bot.menu_link);

    let greeter = Greeter::new(
        handle.clone(),
        seen,
        texts,
        Duration::from_millis(config.whatsapp.greeting_pause_ms),
    );

    let transport = SocketTransport::new(
        &config.whatsapp.bridge_url,
        Duration::from_secs(config.whatsapp.send_timeout_secs),
    );
    let auth_store = FileAuthStore::new(&config.whatsapp.auth_path);
    let supervisor = Supervisor::new(
        transport,
        handle.clone(),
        greeter,
        auth_store,
        Duration::from_secs(config.whatsapp.reconnect_delay_secs),
    );

    // Track running services for graceful shutdown
    let mut service_handles = Vec::new();

    let supervisor_task = tokio::spawn(supervisor.run());
    service_handles.push(supervisor_task);
    tracing::info!("WhatsApp supervisor started");

    // Start the webhook HTTP server
    let dispatcher = NotificationDispatcher::new(handle);
    let api_port = config.api.port;

    let api_task = tokio::spawn(async move {
        if let Err(e) = pedido_api::start_server(api_port, dispatcher).await {
            tracing::error!("HTTP API error: {}", e);
        }
    });
    service_handles.push(api_task);
    tracing::info!("Webhook HTTP server started on port {}", api_port);

    tracing::info!("pedido-gateway initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    // Abort all services
    for task in service_handles {
        task.abort();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
