//! sendit-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the tracking API and realtime
//! endpoint over HTTP.
//!
//! # Issuing a token for local testing
//!
//! ```
//! cargo run -p sendit-server -- --issue-token driver-7 --role driver
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use sendit_server::{AppState, ServerConfig, auth::JwtVerifier};
use sendit_store_sqlite::SqliteStore;
use sendit_tracking::{GeocodeClient, Role, Tracker, TrackingBroadcaster};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "SendIt tracking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a signed access token for this subject and exit.
  #[arg(long, value_name = "SUBJECT")]
  issue_token: Option<String>,

  /// Role carried by the issued token: user, driver or admin.
  #[arg(long, default_value = "driver", value_parser = parse_role)]
  role: Role,

  /// Lifetime of the issued token, in hours.
  #[arg(long, default_value_t = 24)]
  ttl_hours: i64,
}

fn parse_role(s: &str) -> Result<Role, String> {
  serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
    .map_err(|_| format!("unknown role {s:?} (expected user, driver or admin)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let server_cfg =
    ServerConfig::load(&cli.config).context("failed to load configuration")?;

  // Helper mode: sign a token and exit.
  if let Some(subject) = &cli.issue_token {
    let token = sendit_server::auth::issue_token(
      &server_cfg.jwt_secret,
      subject,
      cli.role,
      chrono::Duration::hours(cli.ttl_hours),
    )
    .context("failed to sign token")?;
    println!("{token}");
    return Ok(());
  }

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let geocoder = GeocodeClient::from_config(&server_cfg.geocoder)
    .context("failed to build geocoder client")?;
  if !server_cfg.geocoder.enabled {
    tracing::info!("reverse geocoding disabled");
  }

  // Build application state.
  let tracking = &server_cfg.tracking;
  let broadcaster = Arc::new(TrackingBroadcaster::new(tracking.outbound()));
  let tracker = Tracker::new(
    Arc::new(store),
    Arc::new(geocoder),
    broadcaster,
    tracking.route_window,
    server_cfg.geocoder.timeout(),
  )
  .with_route_idle(tracking.route_idle());
  let tracker = Arc::new(tracker);

  // Periodically drop route windows for shipments that went quiet without
  // reaching a terminal status.
  let pruner = tracker.clone();
  let sweep_every = (tracking.route_idle() / 4).max(Duration::from_secs(1));
  tokio::spawn(async move {
    let mut ticks = tokio::time::interval(sweep_every);
    loop {
      ticks.tick().await;
      pruner.prune_idle_routes();
    }
  });

  let state = AppState {
    tracker,
    verifier:     Arc::new(JwtVerifier::new(&server_cfg.jwt_secret)),
    send_timeout: tracking.send_timeout(),
  };

  let app = sendit_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
