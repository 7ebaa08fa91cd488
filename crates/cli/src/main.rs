use std::{path::PathBuf, time::Duration};

use {
    clap::Parser,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    confab_config::{ConfabConfig, RealtimeConfig},
    confab_gateway::{server, state::AppState},
    confab_realtime::{RealtimeService, Tuning},
};

#[derive(Parser)]
#[command(name = "confab", about = "Confab — realtime chat backend")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long)]
    port: Option<u16>,

    /// Config file path (overrides discovery).
    #[arg(long, env = "CONFAB_CONFIG")]
    config: Option<PathBuf>,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ConfabConfig> {
    match &cli.config {
        // An explicitly named file that fails to load is fatal, unlike the
        // discovery path which falls back to defaults.
        Some(path) => {
            let mut config = confab_config::load_config(path)?;
            confab_config::apply_env_overrides(&mut config);
            Ok(config)
        },
        None => Ok(confab_config::discover_and_load()),
    }
}

fn tuning_from(realtime: &RealtimeConfig) -> Tuning {
    Tuning {
        events_capacity: realtime.events_capacity,
        outgoing_capacity: realtime.outgoing_capacity,
        pong_wait: Duration::from_secs(realtime.pong_wait_secs),
        write_timeout: Duration::from_secs(realtime.write_timeout_secs),
        max_frame_bytes: realtime.max_frame_bytes,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let mut config = load_config(&cli)?;
    if let Some(bind) = &cli.bind {
        config.gateway.host = bind.clone();
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    let service = RealtimeService::new(tuning_from(&config.realtime));
    service.start_event_loop();

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let state = AppState::new(service, config.gateway.clone());

    server::serve(listener, state, shutdown_signal()).await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        info!("ctrl-c handler unavailable, running until killed");
        std::future::pending::<()>().await;
    }
}
