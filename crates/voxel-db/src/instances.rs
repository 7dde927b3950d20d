//! Instance index repository implementation.
//!
//! Owns watermark assignment and version currency. Every write appends its
//! change feed entry in the same transaction that updates currency, so
//! watermark order always matches true commit order.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Transaction};
use tracing::info;

use voxel_core::{
    ChangeFeedAction, Error, InstanceIndexRepository, Result, VersionedInstanceIdentifier,
};

/// PostgreSQL implementation of InstanceIndexRepository.
pub struct PgInstanceRepository {
    pool: Pool<Postgres>,
}

impl PgInstanceRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub(crate) fn action_to_str(action: ChangeFeedAction) -> &'static str {
        match action {
            ChangeFeedAction::Create => "create",
            ChangeFeedAction::Update => "update",
            ChangeFeedAction::Delete => "delete",
        }
    }

    /// Take the next watermark from the shared sequence.
    ///
    /// The sequence is shared by instance versions and change feed entries;
    /// a value is never reused, even after logical deletion.
    async fn next_watermark(tx: &mut Transaction<'_, Postgres>) -> Result<i64> {
        sqlx::query_scalar("SELECT nextval('watermark_seq')")
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)
    }

    /// Serialize writers on one triple for the duration of the transaction.
    ///
    /// `FOR UPDATE` alone cannot order two writers racing on a triple that
    /// has no row yet, so every write path takes a transaction-scoped
    /// advisory lock on the triple before reading currency. The partial
    /// unique index on current triples is the store-level backstop.
    async fn lock_triple(
        tx: &mut Transaction<'_, Postgres>,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: &str,
        sop_uid: &str,
    ) -> Result<()> {
        sqlx::query(
            "SELECT pg_advisory_xact_lock(
                 hashtextextended(concat_ws('/', coalesce($1, ''), $2, $3, $4), 0))",
        )
        .bind(partition)
        .bind(study_uid)
        .bind(series_uid)
        .bind(sop_uid)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Current version of a triple, locked for the duration of the
    /// transaction to serialize concurrent writers on the same instance.
    async fn lock_current(
        tx: &mut Transaction<'_, Postgres>,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: &str,
        sop_uid: &str,
    ) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT watermark FROM instance
             WHERE partition_key IS NOT DISTINCT FROM $1
               AND study_uid = $2 AND series_uid = $3 AND sop_uid = $4
               AND is_current
             FOR UPDATE",
        )
        .bind(partition)
        .bind(study_uid)
        .bind(series_uid)
        .bind(sop_uid)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(row.map(|(w,)| w))
    }

    async fn append_feed_entry(
        tx: &mut Transaction<'_, Postgres>,
        watermark: i64,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: &str,
        sop_uid: &str,
        action: ChangeFeedAction,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO change_feed
                 (watermark, partition_key, study_uid, series_uid, sop_uid, action, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(watermark)
        .bind(partition)
        .bind(study_uid)
        .bind(series_uid)
        .bind(sop_uid)
        .bind(Self::action_to_str(action))
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn resolve(
        &self,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: Option<&str>,
    ) -> Result<Vec<VersionedInstanceIdentifier>> {
        let rows: Vec<(i64, Option<String>, String, String, String)> = sqlx::query_as(
            "SELECT watermark, partition_key, study_uid, series_uid, sop_uid FROM instance
             WHERE partition_key IS NOT DISTINCT FROM $1
               AND study_uid = $2
               AND ($3::text IS NULL OR series_uid = $3)
               AND is_current
             ORDER BY watermark ASC",
        )
        .bind(partition)
        .bind(study_uid)
        .bind(series_uid)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(
                |(watermark, partition, study_uid, series_uid, sop_uid)| {
                    VersionedInstanceIdentifier {
                        partition,
                        study_uid,
                        series_uid,
                        sop_uid,
                        version: watermark,
                    }
                },
            )
            .collect())
    }
}

#[async_trait]
impl InstanceIndexRepository for PgInstanceRepository {
    async fn create_instance(
        &self,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: &str,
        sop_uid: &str,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        Self::lock_triple(&mut tx, partition, study_uid, series_uid, sop_uid).await?;
        let prior = Self::lock_current(&mut tx, partition, study_uid, series_uid, sop_uid).await?;
        if let Some(prior_watermark) = prior {
            sqlx::query("UPDATE instance SET is_current = FALSE WHERE watermark = $1")
                .bind(prior_watermark)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        let watermark = Self::next_watermark(&mut tx).await?;
        sqlx::query(
            "INSERT INTO instance
                 (watermark, partition_key, study_uid, series_uid, sop_uid, is_current, created_at)
             VALUES ($1, $2, $3, $4, $5, TRUE, $6)",
        )
        .bind(watermark)
        .bind(partition)
        .bind(study_uid)
        .bind(series_uid)
        .bind(sop_uid)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let action = if prior.is_some() {
            ChangeFeedAction::Update
        } else {
            ChangeFeedAction::Create
        };
        Self::append_feed_entry(
            &mut tx, watermark, partition, study_uid, series_uid, sop_uid, action,
        )
        .await?;

        tx.commit().await.map_err(Error::Database)?;

        info!(
            watermark,
            study_uid,
            sop_uid,
            replaced = prior.is_some(),
            "instance version written"
        );
        Ok(watermark)
    }

    async fn delete_instance(
        &self,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: &str,
        sop_uid: &str,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        Self::lock_triple(&mut tx, partition, study_uid, series_uid, sop_uid).await?;
        let prior = Self::lock_current(&mut tx, partition, study_uid, series_uid, sop_uid)
            .await?
            .ok_or_else(|| {
                Error::ScopeNotFound(format!("{study_uid}/{series_uid}/{sop_uid}"))
            })?;

        sqlx::query("UPDATE instance SET is_current = FALSE WHERE watermark = $1")
            .bind(prior)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        // The Delete entry gets its own watermark; the superseded version's
        // watermark is never reassigned.
        let watermark = Self::next_watermark(&mut tx).await?;
        Self::append_feed_entry(
            &mut tx,
            watermark,
            partition,
            study_uid,
            series_uid,
            sop_uid,
            ChangeFeedAction::Delete,
        )
        .await?;

        tx.commit().await.map_err(Error::Database)?;

        info!(watermark, study_uid, sop_uid, "instance deleted");
        Ok(watermark)
    }

    async fn resolve_study(
        &self,
        partition: Option<&str>,
        study_uid: &str,
    ) -> Result<Vec<VersionedInstanceIdentifier>> {
        self.resolve(partition, study_uid, None).await
    }

    async fn resolve_series(
        &self,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: &str,
    ) -> Result<Vec<VersionedInstanceIdentifier>> {
        self.resolve(partition, study_uid, Some(series_uid)).await
    }
}
