use sqlx::postgres::PgPoolOptions;

mod adapters;
mod app_state;
mod auth;
mod config;
mod domain;
mod repositories;
mod router;
mod routes;

#[tokio::main]
async fn main() {
    dotenvy::from_filename("./profile-api/.env.local").ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let config = config::read_config().expect("Failed to read configuration");

    let connection_pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_with(config.database.with_db())
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to run database migrations");

    let address = format!(
        "{}:{}",
        config.application.host, config.application.port
    );
    let app = router::create(connection_pool, config).await;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind listen address");

    tracing::info!("Listening on {}", address);
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
