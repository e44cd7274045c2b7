mod action;
mod app;
mod app_state;
mod channel;
mod component;
mod components;
mod dispatcher;
mod fault;
mod focus;
mod intent;
mod keys;
mod scheduler;
mod search;
mod session;
mod store;
mod theme;
mod widgets;


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = juke_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("juke.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP and WebSocket internals quiet.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "debug,hyper_util=warn,reqwest=warn,hyper=warn,tungstenite=warn,tokio_tungstenite=warn"
            .to_string()
    });
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // The terminal is in raw mode while the app runs; panics go to the log.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {}", info);
    }));

    eprintln!("juke log: {}", log_path.display());
    tracing::info!("juke starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = juke_proto::config::Config::load().unwrap_or_else(|e| {
        tracing::warn!("config load failed, using defaults: {}", e);
        juke_proto::config::Config::default()
    });
    tracing::info!(
        "server {} (poll every {:?})",
        config.server.host,
        config.sync.poll_interval()
    );

    app::App::new(config)?.run().await
}
