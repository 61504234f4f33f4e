//! Notes App API server
//!
//! Loads configuration from the environment, picks a user store and serves
//! the auth routes.

use notes_auth::{
    AppConfig, AppState, AuthService, MemoryNoteStore, MemoryUserStore, NoteStore, PgNoteStore,
    PgUserStore, UserStore,
};

use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notes_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AppConfig::from_env().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let users: Arc<dyn UserStore>;
    let notes: Arc<dyn NoteStore>;

    match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url).await?;
            let pg_users = PgUserStore::new(pool.clone());
            pg_users.ensure_schema().await?;
            let pg_notes = PgNoteStore::new(pool);
            pg_notes.ensure_schema().await?;
            users = Arc::new(pg_users);
            notes = Arc::new(pg_notes);
        }
        None => {
            tracing::warn!("DATABASE_URL not set, users and notes are kept in memory");
            users = Arc::new(MemoryUserStore::new());
            notes = Arc::new(MemoryNoteStore::new());
        }
    }

    let auth = Arc::new(AuthService::from_config(users, &config)?);
    let app = notes_auth::app(AppState::new(auth, notes), &config.api_prefix);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        project = %config.project_name,
        addr = %config.bind_addr,
        prefix = %config.api_prefix,
        "Server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
