pub mod entities;
mod error;
mod post_repository;
mod vote_repository;

pub use error::{classify_db_error, StoreError};
pub use post_repository::PostRepository;
pub use vote_repository::VoteRepository;

use entities::{vote, Post, Vote};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use std::time::Duration;

pub async fn create_connection(
    database_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    Database::connect(opt).await
}

/// Creates the posts and votes tables from the entity definitions.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut posts = schema.create_table_from_entity(Post);
    posts.if_not_exists();
    db.execute(backend.build(&posts)).await?;

    // Carries the ON DELETE CASCADE foreign key to posts.
    let mut votes = schema.create_table_from_entity(Vote);
    votes.if_not_exists();
    db.execute(backend.build(&votes)).await?;

    let votes_by_post = Index::create()
        .if_not_exists()
        .name("idx_votes_post_id")
        .table(Vote)
        .col(vote::Column::PostId)
        .to_owned();
    db.execute(backend.build(&votes_by_post)).await?;

    tracing::info!(backend = ?backend, "Vote schema ready");
    Ok(())
}
