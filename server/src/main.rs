use anyhow::{Context, Result};
use clap::Parser;
use lootcase_execution::ReelConfig;
use lootcase_server::{load_catalog, Api, Server, ServerConfig, SqliteStore};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEV_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn init_tracing() -> Result<()> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .and_then(|value| {
            let trimmed = value.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        });

    if let Some(endpoint) = endpoint {
        let service_name =
            std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "lootcase-server".to_string());
        let rate = std::env::var("OTEL_SAMPLING_RATE")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(1.0);
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()
            .context("failed to build OTLP exporter")?;
        let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(rate))
            .with_resource(
                opentelemetry_sdk::Resource::builder_empty()
                    .with_attributes([opentelemetry::KeyValue::new("service.name", service_name)])
                    .build(),
            )
            .with_batch_exporter(exporter)
            .build();
        let tracer = tracer_provider.tracer("lootcase-server");
        opentelemetry::global::set_tracer_provider(tracer_provider);

        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_filter(LevelFilter::INFO))
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind (default: localhost).
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Path to the SQLite database holding users, sessions and inventories.
    #[arg(long, default_value = "lootcase.db")]
    database_path: PathBuf,

    /// YAML case catalog (built-in catalog when omitted).
    #[arg(long)]
    catalog_path: Option<PathBuf>,

    /// HTTP rate limit per IP in requests per second (0 disables rate limiting).
    #[arg(long)]
    http_rate_limit_per_second: Option<u64>,

    /// HTTP rate limit burst size (0 disables rate limiting).
    #[arg(long)]
    http_rate_limit_burst: Option<u32>,

    /// Action endpoint rate limit per IP in requests per minute (default: 120).
    #[arg(long)]
    action_rate_limit_per_minute: Option<u64>,

    /// Action endpoint rate limit burst size (default: 10).
    #[arg(long)]
    action_rate_limit_burst: Option<u32>,

    /// Max request body size in bytes (0 disables limit).
    #[arg(long)]
    http_body_limit_bytes: Option<usize>,

    /// Items per reel.
    #[arg(long)]
    reel_length: Option<usize>,

    /// First reel position the winner may land on.
    #[arg(long)]
    winner_window_start: Option<usize>,

    /// One past the last reel position the winner may land on.
    #[arg(long)]
    winner_window_end: Option<usize>,

    /// Inventory capacity for newly provisioned users.
    #[arg(long)]
    default_inventory_max: Option<u32>,

    /// Provision this user and log a session for it (refused in production).
    #[arg(long)]
    dev_user: Option<String>,

    /// Starting balance for `--dev-user`.
    #[arg(long, default_value_t = 100.0)]
    dev_balance: f64,
}

fn is_production() -> bool {
    matches!(
        std::env::var("NODE_ENV").as_deref(),
        Ok("production") | Ok("prod")
    )
}

/// Maps an optional arg value to Option: 0 => None, Some(v) => Some(v), None => default
fn map_optional_limit<T: Copy + PartialEq + From<u8>>(
    arg: Option<T>,
    default: Option<T>,
) -> Option<T> {
    match arg {
        Some(v) if v == T::from(0) => None,
        Some(v) => Some(v),
        None => default,
    }
}

fn build_config(args: &Args) -> Result<ServerConfig> {
    let defaults = ServerConfig::default();
    let reel = ReelConfig::new(
        args.reel_length.unwrap_or(defaults.reel.length),
        args.winner_window_start
            .unwrap_or(defaults.reel.winner_window.start)
            ..args
                .winner_window_end
                .unwrap_or(defaults.reel.winner_window.end),
    )
    .context("invalid reel configuration")?;
    let default_inventory_max = args
        .default_inventory_max
        .unwrap_or(defaults.default_inventory_max);
    if default_inventory_max == 0 {
        anyhow::bail!("default_inventory_max must be > 0");
    }

    Ok(ServerConfig {
        allowed_origins: defaults.allowed_origins,
        allow_no_origin: defaults.allow_no_origin,
        http_rate_limit_per_second: map_optional_limit(args.http_rate_limit_per_second, defaults.http_rate_limit_per_second),
        http_rate_limit_burst: map_optional_limit(args.http_rate_limit_burst, defaults.http_rate_limit_burst),
        action_rate_limit_per_minute: map_optional_limit(args.action_rate_limit_per_minute, defaults.action_rate_limit_per_minute),
        action_rate_limit_burst: map_optional_limit(args.action_rate_limit_burst, defaults.action_rate_limit_burst),
        http_body_limit_bytes: map_optional_limit(args.http_body_limit_bytes, defaults.http_body_limit_bytes),
        metrics_auth_token: defaults.metrics_auth_token,
        reel,
        default_inventory_max,
    })
}

/// Environment variables override flags, as deployments configure the edge through env.
fn apply_env_overrides(mut config: ServerConfig, env: impl Fn(&str) -> Option<String>) -> ServerConfig {
    let parse_u64 = |var: &str| env(var).and_then(|value| value.trim().parse::<u64>().ok());
    let parse_u32 = |var: &str| env(var).and_then(|value| value.trim().parse::<u32>().ok());

    if let Some(origins) = env("ALLOWED_HTTP_ORIGINS") {
        config.allowed_origins = origins
            .split(',')
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();
    }
    if let Some(value) = env("ALLOW_HTTP_NO_ORIGIN") {
        config.allow_no_origin = matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES");
    }
    if let Some(rate) = parse_u64("RATE_LIMIT_HTTP_PER_SEC") {
        config.http_rate_limit_per_second = Some(rate);
    }
    if let Some(burst) = parse_u32("RATE_LIMIT_HTTP_BURST") {
        config.http_rate_limit_burst = Some(burst);
    }
    if let Some(rate) = parse_u64("RATE_LIMIT_ACTION_PER_MIN") {
        config.action_rate_limit_per_minute = Some(rate);
    }
    if let Some(burst) = parse_u32("RATE_LIMIT_ACTION_BURST") {
        config.action_rate_limit_burst = Some(burst);
    }
    if let Some(token) = env("METRICS_AUTH_TOKEN").filter(|token| !token.trim().is_empty()) {
        config.metrics_auth_token = Some(token);
    }
    config
}

fn require_env(var: &str) -> Result<String> {
    let value = std::env::var(var).unwrap_or_default();
    if value.trim().is_empty() {
        anyhow::bail!("Missing required env: {var}");
    }
    Ok(value)
}

fn require_positive_u64(var: &str) -> Result<()> {
    let value = require_env(var)?;
    let parsed: u64 = value
        .parse()
        .with_context(|| format!("Invalid {var}: {value}"))?;
    if parsed == 0 {
        anyhow::bail!("Invalid {var}: {value}");
    }
    Ok(())
}

fn ensure_production_env(args: &Args) -> Result<()> {
    if !is_production() {
        return Ok(());
    }
    if args.dev_user.is_some() {
        anyhow::bail!("--dev-user is not allowed in production");
    }
    require_env("ALLOWED_HTTP_ORIGINS")?;
    require_env("METRICS_AUTH_TOKEN")?;
    require_positive_u64("RATE_LIMIT_HTTP_PER_SEC")?;
    require_positive_u64("RATE_LIMIT_HTTP_BURST")?;
    require_positive_u64("RATE_LIMIT_ACTION_PER_MIN")?;
    require_positive_u64("RATE_LIMIT_ACTION_BURST")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Create logger
    init_tracing()?;
    ensure_production_env(&args)?;

    let config = apply_env_overrides(build_config(&args)?, |var| std::env::var(var).ok());
    let catalog = load_catalog(args.catalog_path.as_deref())?;
    info!(cases = catalog.len(), "catalog loaded");

    let store = SqliteStore::open(&args.database_path, config.default_inventory_max)
        .context("open lootcase store")?;
    info!(path = %args.database_path.display(), "store opened");

    if let Some(user_id) = &args.dev_user {
        store
            .upsert_user(user_id, args.dev_balance)
            .await
            .context("provision dev user")?;
        let tokens = store
            .create_session(user_id, DEV_SESSION_TTL)
            .await
            .context("create dev session")?;
        info!(
            user_id = %user_id,
            balance = args.dev_balance,
            auth_token = %tokens.auth_token,
            csrf_token = %tokens.csrf_token,
            "dev user provisioned"
        );
    }

    let server = Arc::new(Server::new(config, store, catalog));
    let api = Api::new(server);
    let app = api.router();

    let addr = SocketAddr::new(args.host, args.port);
    info!(%addr, "lootcase server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_limits_and_reel() {
        let args = Args::parse_from([
            "lootcase-server",
            "--http-rate-limit-per-second",
            "0",
            "--action-rate-limit-burst",
            "4",
            "--reel-length",
            "40",
            "--winner-window-start",
            "10",
            "--winner-window-end",
            "30",
        ]);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(config.http_rate_limit_per_second, None);
        assert_eq!(config.action_rate_limit_burst, Some(4));
        assert_eq!(config.action_rate_limit_per_minute, Some(120));
        assert_eq!(config.reel.length, 40);
        assert_eq!(config.reel.winner_window, 10..30);
    }

    #[test]
    fn rejects_window_outside_reel() {
        let args = Args::parse_from(["lootcase-server", "--reel-length", "50"]);
        let err = build_config(&args).unwrap_err();
        assert!(
            err.to_string().contains("invalid reel configuration"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn rejects_zero_inventory() {
        let args = Args::parse_from(["lootcase-server", "--default-inventory-max", "0"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn env_overrides_flags() {
        let args = Args::parse_from(["lootcase-server", "--action-rate-limit-per-minute", "30"]);
        let env: HashMap<&str, &str> = HashMap::from([
            ("ALLOWED_HTTP_ORIGINS", "https://a.test, https://b.test,"),
            ("ALLOW_HTTP_NO_ORIGIN", "true"),
            ("RATE_LIMIT_ACTION_PER_MIN", "60"),
            ("METRICS_AUTH_TOKEN", "  "),
        ]);
        let config = apply_env_overrides(build_config(&args).unwrap(), |var| {
            env.get(var).map(|value| value.to_string())
        });
        assert_eq!(config.allowed_origins, vec!["https://a.test", "https://b.test"]);
        assert!(config.allow_no_origin);
        assert_eq!(config.action_rate_limit_per_minute, Some(60));
        assert_eq!(config.metrics_auth_token, None);
    }
}
