use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use linkseal::api;
use linkseal::models::AppConfig;
use linkseal::server;
use linkseal::services::{generate_secret, parse_query, ParamMap, QueryMap, UrlGenerator};

#[derive(Parser)]
#[command(name = "linkseal")]
#[command(about = "Linkseal - HMAC-signed, expiring URLs for axum services")]
struct Cli {
    /// Path to config.yaml (environment variables override its values)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Sign a URL from the command line
    Sign {
        /// Route template or relative path, e.g. "/verify/:version/:id"
        path: String,

        /// Placeholder values as name=value
        #[arg(short, long)]
        param: Vec<String>,

        /// Query data as key=value
        #[arg(short, long)]
        query: Vec<String>,

        /// Link lifetime in seconds from now
        #[arg(short, long)]
        expires_in: Option<i64>,

        /// Absolute expiry instant (ISO-8601); overrides --expires-in
        #[arg(long)]
        expires_at: Option<String>,
    },
    /// Verify a previously signed URL
    Verify {
        /// The full signed URL
        url: String,
    },
    /// Generate a random 256-bit signing secret
    Keygen,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Linkseal API",
        description = "HMAC-signed, expiring URLs",
        version = "0.3.0",
        license(name = "MIT")
    ),
    paths(
        api::links::handle_make_url,
        api::links::handle_make_signed_url,
        api::links::handle_target,
        api::links::handle_verify,
    ),
    components(schemas(api::MakeUrlResponse, api::EchoResponse)),
    tags(
        (name = "Links", description = "Issue signed and unsigned links"),
        (name = "Echo", description = "Demo target endpoints")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => run_server(cli.config.as_deref()).await,
        Some(Commands::Sign {
            path,
            param,
            query,
            expires_in,
            expires_at,
        }) => run_sign(
            cli.config.as_deref(),
            &path,
            &param,
            &query,
            expires_in,
            expires_at.as_deref(),
        ),
        Some(Commands::Verify { url }) => run_verify(cli.config.as_deref(), &url),
        Some(Commands::Keygen) => {
            println!("{}", generate_secret());
            Ok(())
        }
        None => {
            run_status_command();
            Ok(())
        }
    }
}

/// Minimal logging for CLI commands
fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkseal=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

/// Load and validate configuration from --config, CONFIG_FILE, or the
/// LINKSEAL_* environment variables alone.
fn load_config(path: Option<&Path>) -> anyhow::Result<Arc<AppConfig>> {
    let path = path
        .map(PathBuf::from)
        .or_else(|| std::env::var("CONFIG_FILE").ok().map(PathBuf::from));
    let config = AppConfig::load(path.as_deref())?;
    config.validate()?;
    Ok(Arc::new(config))
}

fn parse_kv(args: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| anyhow::anyhow!("Expected key=value, got `{arg}`"))
        })
        .collect()
}

/// Run the HTTP server
async fn run_server(config_path: Option<&Path>) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkseal=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(config_path)?;
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    tracing::info!(
        app_url = %config.app_url,
        prefix = %config.global_prefix,
        "Configuration loaded"
    );

    let state = server::create_app_state(config)?;
    let app = server::build_router(state)
        // OpenAPI documentation
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Linkseal server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Sign a URL directly from the command line (no server needed)
fn run_sign(
    config_path: Option<&Path>,
    path: &str,
    params: &[String],
    query: &[String],
    expires_in: Option<i64>,
    expires_at: Option<&str>,
) -> anyhow::Result<()> {
    init_cli_tracing();

    let config = load_config(config_path)?;
    let generator = UrlGenerator::new(config)?;

    let params: ParamMap = parse_kv(params)?.into_iter().collect();
    let mut query_map = QueryMap::new();
    for (key, value) in parse_kv(query)? {
        query_map.insert(key, value);
    }

    let expiration = match expires_at {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|e| anyhow::anyhow!("Malformed --expires-at `{raw}`: {e}"))?
                .with_timezone(&Utc),
        ),
        None => expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
    };

    let url = generator.signed_url(path, expiration, &query_map, &params)?;
    println!("{url}");

    Ok(())
}

/// Verify a pasted signed URL and report the verdict
fn run_verify(config_path: Option<&Path>, url: &str) -> anyhow::Result<()> {
    init_cli_tracing();

    let config = load_config(config_path)?;
    let generator = UrlGenerator::new(config)?;

    let (protocol, rest) = url
        .split_once("://")
        .ok_or_else(|| anyhow::anyhow!("The url must be absolute, including its scheme"))?;
    let (host, path_and_query) = match rest.split_once('/') {
        Some((host, rest)) => (host, format!("/{rest}")),
        None => (rest, "/".to_string()),
    };
    let (path, raw_query) = match path_and_query.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (path_and_query.clone(), String::new()),
    };
    let pairs = parse_query(&raw_query);

    match generator.is_signature_valid(protocol, host, &path, &pairs) {
        Ok(true) => {
            println!("Signature is valid");
            Ok(())
        }
        Ok(false) => {
            println!("Signature is valid but the link has expired");
            std::process::exit(1);
        }
        Err(err) => {
            println!("Rejected: {err}");
            std::process::exit(2);
        }
    }
}

/// Display status and configuration information
fn run_status_command() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let bind_addr = std::env::var("BIND_ADDR").ok();
    let config_file = std::env::var("CONFIG_FILE").ok();
    let app_url = std::env::var("LINKSEAL_APP_URL").ok();
    let secret_set = std::env::var("LINKSEAL_SECRET").is_ok();

    println!("Linkseal v{VERSION} - HMAC-signed, expiring URLs\n");

    println!("Environment Variables:");
    println!(
        "  BIND_ADDR        = {}",
        bind_addr.as_deref().unwrap_or("0.0.0.0:3000 (default)")
    );
    println!(
        "  CONFIG_FILE      = {}",
        config_file.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  LINKSEAL_APP_URL = {}",
        app_url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  LINKSEAL_SECRET  = {}",
        if secret_set { "(set)" } else { "(not set)" }
    );

    println!("\nCommands:");
    println!("  linkseal serve     Start the HTTP server");
    println!("  linkseal sign      Sign a URL from the command line");
    println!("  linkseal verify    Verify a previously signed URL");
    println!("  linkseal keygen    Generate a random signing secret");
    println!("\nRun 'linkseal --help' for more details.");
}
