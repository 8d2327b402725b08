//! ClanHub server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::{App, HttpServer, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use clanhub_lib::api::{self, ApiDoc};
use clanhub_lib::auth::{AdminKey, TokenVerifier};
use clanhub_lib::backend::Backend;
use clanhub_lib::config::Config;
use clanhub_lib::middleware;
use clanhub_lib::services::profiles::bootstrap_profile_store;

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    Config::from_env().is_ok()
}

fn cors(is_development: bool) -> Cors {
    let admin_key = HeaderName::from_static("x-admin-key");
    let cors = if is_development {
        Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:3000")
            .supports_credentials()
    } else {
        // Same-origin only
        Cors::default()
    };

    cors.allowed_methods(vec!["GET", "PUT", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            admin_key,
        ])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // --health-check is used by the container HEALTHCHECK
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, SUPABASE_URL, SUPABASE_ANON_KEY, SUPABASE_SERVICE_ROLE_KEY");
            error!("    and SUPABASE_JWT_SECRET must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  ClanHub Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let backend = match Backend::from_config(&config) {
        Ok(backend) => backend,
        Err(e) => {
            error!("Failed to initialise backend clients: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        backend = backend.kind(),
        table = %config.backend.profile_table,
        search_function = backend.search_function(),
        "Profile backend ready"
    );

    if let Some(function) = &config.backend.bootstrap_function {
        let state = bootstrap_profile_store(backend.admin_profiles().as_ref(), function).await;
        info!(state = ?state, "Profile table bootstrap finished");
    }

    let bind_address = config.bind_address();
    let admin_key = AdminKey::new(config.admin_key.clone());
    let verifier = TokenVerifier::new(config.backend.jwt_secret.clone());
    let is_development = config.is_development();

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };

    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        App::new()
            // CORS before other middleware
            .wrap(cors(is_development))
            .wrap(middleware::RequestLogger)
            .app_data(web::Data::new(backend.clone()))
            .app_data(web::Data::new(admin_key.clone()))
            .app_data(web::Data::new(verifier.clone()))
            .app_data(web::Data::new(config.clone()))
            .service(web::scope("/api/v1").configure(api::configure_v1))
            .service(
                SwaggerUi::new("/api/docs/{_:.*}").url("/api/docs/openapi.json", openapi.clone()),
            )
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
