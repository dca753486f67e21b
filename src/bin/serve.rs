use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tapster::{
    format_json, load_config, request_logger, validate_config, HttpMethod, Server, ServerConfig,
    StaticMount, STATUS_OK,
};

/// tapster-serve: serve a directory and a request echo endpoint over HTTP/1.x.
///
/// Settings come from an optional TOML file; flags override it.
/// `GET /_echo/...` answers with the decoded request as JSON.
#[derive(ClapParser)]
#[command(name = "tapster-serve", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080.
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory to serve.
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// URL prefix the --root directory is mounted under.
    #[arg(long, default_value = "/")]
    prefix: String,

    /// Maximum size of the request line plus headers, in bytes.
    #[arg(long)]
    max_head_size: Option<usize>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tapster=info,tapster_serve=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    tracing::info!(
        bind_address = %config.bind_address,
        max_head_size = config.max_head_size,
        mounts = config.static_mounts.len(),
        "configuration loaded"
    );

    let server = Server::new(config);
    if let Err(e) = install_routes(&server) {
        eprintln!("Route error: {e}");
        process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!(error = %e, "server stopped");
        process::exit(2);
    }
}

/// File settings first, then flag overrides, then one more validation pass.
fn build_config(cli: &Cli) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = &cli.bind {
        config.bind_address = bind.clone();
    }
    if let Some(limit) = cli.max_head_size {
        config.max_head_size = limit;
    }
    if let Some(root) = &cli.root {
        config.static_mounts.push(StaticMount {
            prefix: cli.prefix.clone(),
            root: root.clone(),
        });
    }

    validate_config(&config).map_err(|errors| errors.join(", "))?;
    Ok(config)
}

fn install_routes(server: &Server) -> Result<(), tapster::RouteError> {
    let router = server.router();
    router.use_middleware(request_logger());

    for method in [HttpMethod::GET, HttpMethod::POST] {
        router.register(method, "/_echo/:rest*", |ctx| {
            let body = format_json(ctx.request(), true);
            ctx.response_mut()
                .send(STATUS_OK, Some("application/json"), body.as_bytes())?;
            Ok(())
        })?;
    }

    for mount in &server.config().static_mounts {
        router.serve_static(&mount.prefix, &mount.root)?;
    }
    Ok(())
}
