use std::{path::Path, sync::Arc};

use bastion::{
    adapters::{HttpClientAdapter, HttpHandler, router},
    config::{GatewaySettings, SettingsValidator, load_settings},
    core::RouteTable,
    ports::http_client::HttpClient,
    tracing_setup,
    utils::graceful_shutdown::{GracefulShutdown, ShutdownReason},
};
use clap::Parser;
use color_eyre::{Result, eyre::Context};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Routes file (overrides ROUTES_CONFIG)
    #[clap(short, long)]
    routes: Option<String>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate settings and the routes file
    Validate {
        /// Routes file to validate (overrides ROUTES_CONFIG)
        #[clap(short, long)]
        routes: Option<String>,
    },
    /// Write a sample routes file
    Init {
        /// Output path for the new routes file
        #[clap(short, long, default_value = "config/routes.json")]
        routes: String,
    },
    /// Start the gateway server (default)
    Serve {
        /// Routes file to use (overrides ROUTES_CONFIG)
        #[clap(short, long)]
        routes: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // A missing .env is normal; a malformed one is not.
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        return Err(e).context("Failed to load .env file");
    }

    let args = Args::parse();
    let settings = load_settings().context("Failed to load gateway settings")?;
    let routes_path = |routes: Option<String>| {
        routes
            .or_else(|| args.routes.clone())
            .unwrap_or_else(|| settings.routes_config.clone())
    };

    match args.command {
        Some(Commands::Init { ref routes }) => init_routes_command(routes).await,
        Some(Commands::Validate { ref routes }) => {
            let path = routes_path(routes.clone());
            validate_command(&settings, &path)
        }
        Some(Commands::Serve { ref routes }) => {
            let path = routes_path(routes.clone());
            serve(settings.clone(), path).await
        }
        None => {
            let path = routes_path(None);
            serve(settings.clone(), path).await
        }
    }
}

async fn serve(settings: GatewaySettings, routes_path: String) -> Result<()> {
    tracing_setup::init_tracing(settings.mode()).context("Failed to initialize tracing")?;

    SettingsValidator::validate(&settings).context("Invalid gateway settings")?;

    let routes = Arc::new(
        RouteTable::load(&routes_path)
            .with_context(|| format!("Failed to load routes from {routes_path}"))?,
    );
    tracing::info!(
        routes = routes.len(),
        path = %routes_path,
        mode = %settings.mode(),
        auth_service = %settings.auth_service_host,
        "Route table loaded"
    );

    let http_client: Arc<dyn HttpClient> =
        Arc::new(HttpClientAdapter::new().context("Failed to create HTTP client adapter")?);
    let handler = Arc::new(HttpHandler::new(routes, http_client, &settings));
    let app = router(handler);

    let addr = settings.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Bastion gateway listening on {}", addr);

    let graceful_shutdown = Arc::new(GracefulShutdown::with_grace_period(
        settings.shutdown_grace(),
    ));

    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {:?}", e);
            signal_handler_shutdown.trigger(ShutdownReason::Requested);
        }
    });

    let token = graceful_shutdown.token();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => {
            result
                .context("Server task panicked")?
                .context("Server error")?;
        }
        _ = graceful_shutdown.cancelled() => {
            tracing::info!(
                grace_period = ?graceful_shutdown.grace_period(),
                "Draining in-flight requests"
            );
            match tokio::time::timeout(graceful_shutdown.grace_period(), &mut server).await {
                Ok(result) => {
                    result
                        .context("Server task panicked")?
                        .context("Server error")?;
                    tracing::info!("Graceful shutdown completed");
                }
                Err(_) => {
                    tracing::warn!("Grace period elapsed with requests in flight, forcing exit");
                    server.abort();
                }
            }
        }
    }

    tracing_setup::shutdown_tracing();
    Ok(())
}

/// Validate settings and the routes file and exit
fn validate_command(settings: &GatewaySettings, routes_path: &str) -> Result<()> {
    // Surfaces warnings about unset placeholder variables.
    let _ = tracing_setup::init_console_tracing();

    println!("🔍 Validating routes file: {routes_path}");

    if !Path::new(routes_path).exists() {
        eprintln!("❌ Error: Routes file '{routes_path}' not found");
        std::process::exit(1);
    }

    let routes = match RouteTable::load(routes_path) {
        Ok(routes) => {
            println!("✅ Routes validation: OK");
            routes
        }
        Err(e) => {
            eprintln!("❌ Routes validation failed:");
            eprintln!("{e:?}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure every serviceUrl starts with http:// or https://");
            println!("   • Give every non-public route at least one entry in rolesAllowed");
            println!("   • Routes with a \"self\" rule need a :userID path segment");
            std::process::exit(1);
        }
    };

    if let Err(e) = SettingsValidator::validate(settings) {
        eprintln!("❌ Settings validation failed:");
        eprintln!("{e}");
        std::process::exit(1);
    }
    println!("✅ Settings validation: OK");

    let public = routes.routes().iter().filter(|r| r.public).count();
    println!();
    println!("📋 Configuration Summary:");
    println!("   • Listen Address: {}:{}", settings.host, settings.port);
    println!("   • Mode: {}", settings.mode());
    println!("   • Auth Service: {}", settings.auth_service_host);
    println!(
        "   • Routes: {} ({} public, {} protected)",
        routes.len(),
        public,
        routes.len() - public
    );
    for route in routes.routes() {
        println!(
            "     {:<7} {} -> {}",
            route.method.as_str(),
            route.pattern,
            route.target_base_url
        );
    }
    println!();
    println!("🎉 Configuration is valid and ready to use!");
    Ok(())
}

/// Write a sample routes file
async fn init_routes_command(routes_path: &str) -> Result<()> {
    let path = Path::new(routes_path);
    if path.exists() {
        eprintln!("❌ Error: Routes file '{routes_path}' already exists");
        std::process::exit(1);
    }

    let sample_routes = r#"[
  {
    "method": "GET",
    "path": "/health",
    "serviceUrl": "${HEALTH_SERVICE_URL}",
    "public": true
  },
  {
    "method": "GET",
    "path": "/api/v1/users/:userID",
    "serviceUrl": "${USER_SERVICE_URL}",
    "rolesAllowed": {
      "member": { "access": "self" },
      "admin": { "access": "all" }
    }
  },
  {
    "method": "DELETE",
    "path": "/api/v1/users/:userID",
    "serviceUrl": "${USER_SERVICE_URL}",
    "rolesAllowed": {
      "admin": { "access": "all" }
    }
  }
]
"#;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, sample_routes)
        .await
        .context("Failed to write routes file")?;
    println!("✅ Created sample routes file at: {routes_path}");
    println!("   Run 'bastion serve --routes {routes_path}' to start the gateway");
    Ok(())
}
