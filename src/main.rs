use std::sync::Arc;

use identity_core::{app, config::AppConfig, db, state::AppState, users::store::PgUserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "identity_core=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let pool = db::connect(&config.database).await?;

    // Migrations are embedded; the unique indexes they create guard registration.
    db::migrate(&pool).await?;

    let state = AppState::new(config.clone(), Arc::new(PgUserStore::new(pool.clone())))?;

    if config.reset_on_boot {
        tracing::warn!("RESET_ON_BOOT is set; removing every user row");
        state.accounts.users().reset().await?;
    }

    app::serve(app::build_app(state), &config.host, config.port).await?;

    pool.close().await;
    Ok(())
}
