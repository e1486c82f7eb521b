use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

use idrecon_api::config::ApiConfig;
use idrecon_api::{handlers, helpers};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Also write logs to this file
    #[arg(long)]
    log_file_path: Option<String>,

    /// Config file to use instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,

    /// Drop and recreate the contacts table before serving
    #[arg(long)]
    reset_database: bool,
}

fn init_tracing(log_file_path: Option<&str>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let Some(log_path) = log_file_path else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        return;
    };

    let log_path = std::path::Path::new(log_path);
    let file_appender = tracing_appender::rolling::never(
        log_path.parent().unwrap_or(std::path::Path::new(".")),
        log_path
            .file_name()
            .unwrap_or(std::ffi::OsStr::new("idrecon-api.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // The writer must outlive the server
    std::mem::forget(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_writer(std::io::stdout),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file_path.as_deref());

    let (config, config_path) = ApiConfig::load(args.config.as_deref())?;
    tracing::info!("Loaded config from {}", config_path.display());

    let backend = helpers::database::initialize_backend(&config.database, args.reset_database)?;
    let backend = web::Data::from(backend);

    let host = config.server.host.clone();
    let port = config.server.port;
    tracing::info!("Server will listen on {}:{}", host, port);

    let cors_config = config.cors.clone();
    let server = HttpServer::new(move || {
        // Configure CORS
        let cors = match &cors_config {
            Some(cors_config) => {
                let mut cors_builder = Cors::default();
                for origin in &cors_config.allowed_origins {
                    cors_builder = cors_builder.allowed_origin(origin);
                }
                cors_builder
            }
            None => Cors::default().allow_any_origin(),
        }
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec!["Accept", "Content-Type"])
        .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(backend.clone())
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        tracing::info!("Ctrl+C received, shutting down...");
        handle.stop(true).await;
    });

    server.await?;
    Ok(())
}
