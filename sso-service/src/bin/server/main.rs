use std::future::Future;
use std::io;
use std::sync::Arc;

use auth::Authenticator;
use auth::PasswordHasher;
use sqlx::postgres::PgPoolOptions;
use sso_service::config;
use sso_service::config::Config;
use sso_service::domain::auth::models::App;
use sso_service::domain::auth::models::AppId;
use sso_service::domain::auth::ports::AuthServicePort;
use sso_service::domain::auth::service::AuthService;
use sso_service::inbound::http::router::create_router;
use sso_service::outbound::repositories::InMemoryAppRepository;
use sso_service::outbound::repositories::InMemoryUserRepository;
use sso_service::outbound::repositories::PostgresAppRepository;
use sso_service::outbound::repositories::PostgresUserRepository;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let run_mode = config::run_mode();
    let json_logs = config::json_logs(&run_mode);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sso_service=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!(
        service = "sso-service",
        version = env!("CARGO_PKG_VERSION"),
        run_mode = %run_mode,
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        token_ttl_secs = config.jwt.token_ttl_secs,
        password_memory_kib = config.password.memory_kib,
        password_iterations = config.password.iterations,
        persistence = if config.database.url.is_some() { "postgresql" } else { "memory" },
        "Configuration loaded"
    );

    let password_hasher = PasswordHasher::with_params(
        config.password.memory_kib,
        config.password.iterations,
        config.password.parallelism,
    )?;
    let authenticator = Arc::new(Authenticator::with_hasher(
        config.jwt.secret.as_bytes(),
        password_hasher,
    ));
    let token_ttl = config.jwt.token_ttl();

    let auth_service: Arc<dyn AuthServicePort> = match &config.database.url {
        Some(url) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;
            tracing::info!(
                max_connections = 5,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
            let app_repository = Arc::new(PostgresAppRepository::new(pg_pool));
            for app in &config.apps {
                let inserted = app_repository
                    .insert_if_absent(&App {
                        id: AppId(app.id),
                        name: app.name.clone(),
                    })
                    .await?;
                tracing::info!(app_id = app.id, app = %app.name, inserted, "Registered app");
            }

            Arc::new(AuthService::new(
                Arc::clone(&user_repository),
                app_repository,
                user_repository,
                authenticator,
                token_ttl,
            ))
        }
        None => {
            tracing::warn!("No database URL configured, users and apps are kept in memory");

            let user_repository = Arc::new(InMemoryUserRepository::new());
            let app_repository = Arc::new(InMemoryAppRepository::new());
            for app in &config.apps {
                app_repository
                    .insert(App {
                        id: AppId(app.id),
                        name: app.name.clone(),
                    })
                    .await;
                tracing::info!(app_id = app.id, app = %app.name, "Registered app");
            }

            Arc::new(AuthService::new(
                Arc::clone(&user_repository),
                app_repository,
                user_repository,
                authenticator,
                token_ttl,
            ))
        }
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    axum::serve(http_listener, create_router(auth_service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        let mut stream = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        stream.recv().await;
        Ok::<(), io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<io::Result<()>>();

    wait_for_signal(signal::ctrl_c(), terminate).await
}

/// Resolve once either listener fires. A listener that fails is logged and
/// never fires, so the server keeps running on the other one.
async fn wait_for_signal<C, T>(ctrl_c: C, terminate: T)
where
    C: Future<Output = io::Result<()>>,
    T: Future<Output = io::Result<()>>,
{
    let ctrl_c = async {
        if let Err(e) = ctrl_c.await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        if let Err(e) = terminate.await {
            tracing::error!(error = %e, "Failed to listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "Stopping server"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Stopping server"),
    }
}
