use crate::application::VoteAggregator;
use crate::config::AppConfig;
use crate::infrastructure::db::{self, PostRepository};
use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub votes: Arc<VoteAggregator>,
    pub posts: PostRepository,
}

impl AppContext {
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Self {
        Self {
            votes: Arc::new(VoteAggregator::new(db.clone(), config.vote.clone())),
            posts: PostRepository::new(db),
        }
    }

    /// Connects to the database, prepares the schema and wires the services.
    pub async fn connect(config: &AppConfig) -> Result<Self, DbErr> {
        let db = db::create_connection(&config.database_url, config.max_connections).await?;
        db::run_migrations(&db).await?;
        tracing::info!(
            max_connections = config.max_connections,
            lock_timeout_ms = config.vote.lock_timeout.as_millis() as u64,
            "Database connected"
        );
        Ok(Self::new(db, config))
    }
}
