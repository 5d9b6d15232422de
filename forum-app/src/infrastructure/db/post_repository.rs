use super::entities::{post, Post};
use crate::domain::{CounterDelta, Counters, PersistedPost};
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, DbBackend, DbErr};
use uuid::Uuid;

/// Owner-side access to posts. The vote engine only uses the counter methods.
#[derive(Clone)]
pub struct PostRepository {
    db: DatabaseConnection,
}

impl PostRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, post_data: &PersistedPost) -> Result<post::Model, DbErr> {
        let active = post::ActiveModel {
            id: Set(post_data.id),
            title: Set(post_data.title.clone()),
            body: Set(post_data.body.clone()),
            author_id: Set(post_data.author_id),
            up_votes: Set(0),
            down_votes: Set(0),
            created_at: Set(Some(chrono::Utc::now())),
        };
        active.insert(&self.db).await
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, DbErr> {
        Ok(self.counters(id).await?.is_some())
    }

    pub async fn counters(&self, id: Uuid) -> Result<Option<Counters>, DbErr> {
        self.counters_on(&self.db, id).await
    }

    /// Deletes the post; its votes go with it through the foreign key.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = Post::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn counters_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
    ) -> Result<Option<Counters>, DbErr> {
        Ok(Post::find_by_id(id)
            .one(conn)
            .await?
            .map(|p| Counters::new(p.up_votes, p.down_votes)))
    }

    /// Reads the post with a row lock held until `conn` commits.
    /// SQLite has no row locks, so there a no-op write takes the database
    /// write lock instead; other writers wait on it the same way.
    pub async fn lock_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
    ) -> Result<Option<post::Model>, DbErr> {
        let mut query = Post::find_by_id(id);
        if conn.get_database_backend() == DbBackend::Sqlite {
            Post::update_many()
                .col_expr(post::Column::UpVotes, Expr::col(post::Column::UpVotes).into())
                .filter(post::Column::Id.eq(id))
                .exec(conn)
                .await?;
        } else {
            query = query.lock_exclusive();
        }
        query.one(conn).await
    }

    /// Adds `delta` to both counters in a single `UPDATE`, computed by the
    /// database from the current column values.
    pub async fn apply_delta<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
        delta: CounterDelta,
    ) -> Result<bool, DbErr> {
        if delta == CounterDelta::default() {
            return Ok(true);
        }

        let mut update = Post::update_many().filter(post::Column::Id.eq(id));
        if delta.up != 0 {
            update = update.col_expr(
                post::Column::UpVotes,
                Expr::col(post::Column::UpVotes).add(delta.up),
            );
        }
        if delta.down != 0 {
            update = update.col_expr(
                post::Column::DownVotes,
                Expr::col(post::Column::DownVotes).add(delta.down),
            );
        }

        let result = update.exec(conn).await?;
        Ok(result.rows_affected == 1)
    }
}
