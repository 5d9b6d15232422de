use super::entities::{vote, Vote as VoteEntity};
use super::StoreError;
use crate::domain::{Vote, VoteValue};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{entity::*, query::*, ConnectionTrait, PaginatorTrait};
use uuid::Uuid;

/// Vote rows keyed by (voter, post).
///
/// Every method takes the connection to run on, so callers can compose them
/// with counter updates inside one `DatabaseTransaction`.
#[derive(Clone, Default)]
pub struct VoteRepository;

impl VoteRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get_vote<C: ConnectionTrait>(
        &self,
        conn: &C,
        voter_id: Uuid,
        post_id: Uuid,
    ) -> Result<Option<Vote>, StoreError> {
        VoteEntity::find_by_id((voter_id, post_id))
            .one(conn)
            .await?
            .map(into_domain)
            .transpose()
    }

    /// Inserts the vote unless the pair already has one; an existing vote is
    /// returned untouched. The primary key decides, not a prior lookup.
    pub async fn upsert_vote<C: ConnectionTrait>(
        &self,
        conn: &C,
        voter_id: Uuid,
        post_id: Uuid,
        value: VoteValue,
    ) -> Result<(Vote, bool), StoreError> {
        let now = chrono::Utc::now();
        let active = vote::ActiveModel {
            voter_id: Set(voter_id),
            post_id: Set(post_id),
            value: Set(value.as_i16()),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };

        let inserted = VoteEntity::insert(active)
            .on_conflict(
                OnConflict::columns([vote::Column::VoterId, vote::Column::PostId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        let stored = self
            .get_vote(conn, voter_id, post_id)
            .await?
            .ok_or(StoreError::NotFound { voter_id, post_id })?;

        Ok((stored, inserted == 1))
    }

    pub async fn set_vote_value<C: ConnectionTrait>(
        &self,
        conn: &C,
        voter_id: Uuid,
        post_id: Uuid,
        value: VoteValue,
    ) -> Result<(), StoreError> {
        let result = VoteEntity::update_many()
            .col_expr(vote::Column::Value, Expr::value(value.as_i16()))
            .col_expr(vote::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(vote::Column::VoterId.eq(voter_id))
            .filter(vote::Column::PostId.eq(post_id))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound { voter_id, post_id });
        }
        Ok(())
    }

    pub async fn delete_vote<C: ConnectionTrait>(
        &self,
        conn: &C,
        voter_id: Uuid,
        post_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = VoteEntity::delete_many()
            .filter(vote::Column::VoterId.eq(voter_id))
            .filter(vote::Column::PostId.eq(post_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count_by_value<C: ConnectionTrait>(
        &self,
        conn: &C,
        post_id: Uuid,
        value: VoteValue,
    ) -> Result<u64, StoreError> {
        let count = VoteEntity::find()
            .filter(vote::Column::PostId.eq(post_id))
            .filter(vote::Column::Value.eq(value.as_i16()))
            .count(conn)
            .await?;
        Ok(count)
    }
}

fn into_domain(model: vote::Model) -> Result<Vote, StoreError> {
    let value = VoteValue::try_from(model.value as i64)
        .map_err(|_| StoreError::InvalidVoteValue(model.value as i64))?;
    Ok(Vote {
        voter_id: model.voter_id,
        post_id: model.post_id,
        value,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}
