//! Extended attribute registry repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use tracing::info;

use voxel_core::{
    AttributeTag, AttributeValueType, CreateExtendedAttribute, Error,
    ExtendedAttributeDefinition, ExtendedAttributeRepository, QueryTagLevel, Result, TagStatus,
};

/// PostgreSQL implementation of ExtendedAttributeRepository.
///
/// The registry exclusively owns the `extended_query_tag` table. Non-deleting
/// tag uniqueness is enforced by a partial unique index on `tag_path`, and
/// registrations take a SHARE ROW EXCLUSIVE table lock so the live-count cap
/// holds under concurrent writers. Registration is all-or-nothing.
pub struct PgExtendedAttributeRepository {
    pool: Pool<Postgres>,
}

impl PgExtendedAttributeRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn status_to_str(status: TagStatus) -> &'static str {
        match status {
            TagStatus::Adding => "adding",
            TagStatus::Ready => "ready",
            TagStatus::Deleting => "deleting",
        }
    }

    fn str_to_status(s: &str) -> TagStatus {
        match s {
            "adding" => TagStatus::Adding,
            "ready" => TagStatus::Ready,
            "deleting" => TagStatus::Deleting,
            _ => TagStatus::Adding, // fallback
        }
    }

    fn value_type_to_str(value_type: AttributeValueType) -> &'static str {
        match value_type {
            AttributeValueType::String => "string",
            AttributeValueType::Int => "int",
            AttributeValueType::Double => "double",
            AttributeValueType::DateTime => "datetime",
            AttributeValueType::PersonName => "person_name",
        }
    }

    fn str_to_value_type(s: &str) -> AttributeValueType {
        match s {
            "string" => AttributeValueType::String,
            "int" => AttributeValueType::Int,
            "double" => AttributeValueType::Double,
            "datetime" => AttributeValueType::DateTime,
            "person_name" => AttributeValueType::PersonName,
            _ => AttributeValueType::String, // fallback
        }
    }

    fn level_to_str(level: QueryTagLevel) -> &'static str {
        match level {
            QueryTagLevel::Study => "study",
            QueryTagLevel::Series => "series",
            QueryTagLevel::Instance => "instance",
        }
    }

    fn str_to_level(s: &str) -> QueryTagLevel {
        match s {
            "study" => QueryTagLevel::Study,
            "series" => QueryTagLevel::Series,
            "instance" => QueryTagLevel::Instance,
            _ => QueryTagLevel::Instance, // fallback
        }
    }

    fn parse_row(
        row: (i64, String, String, String, String, DateTime<Utc>),
    ) -> Result<ExtendedAttributeDefinition> {
        let (key, tag_path, value_type, level, status, created_at) = row;
        let tag = AttributeTag::parse(&tag_path)
            .ok_or_else(|| Error::Internal(format!("corrupt tag path in registry: {tag_path}")))?;
        Ok(ExtendedAttributeDefinition {
            key,
            tag,
            value_type: Self::str_to_value_type(&value_type),
            level: Self::str_to_level(&level),
            status: Self::str_to_status(&status),
            created_at,
        })
    }

    /// A unique-index violation on `tag_path` is a registration conflict,
    /// not a database fault. The partial unique index is the backstop for
    /// writers that raced past the in-transaction probe.
    fn map_unique_violation(e: sqlx::Error, tag: AttributeTag) -> Error {
        if let Some(code) = e.as_database_error().and_then(|db| db.code()) {
            if code == "23505" {
                return Error::AlreadyExists(tag.to_string());
            }
        }
        Error::Database(e)
    }
}

const SELECT_COLUMNS: &str = "key, tag_path, value_type, level, status, created_at";

#[async_trait]
impl ExtendedAttributeRepository for PgExtendedAttributeRepository {
    async fn register(
        &self,
        definitions: Vec<CreateExtendedAttribute>,
        max_allowed_count: usize,
        mark_ready_immediately: bool,
    ) -> Result<Vec<ExtendedAttributeDefinition>> {
        if definitions.is_empty() {
            return Err(Error::InvalidInput(
                "at least one attribute definition is required".to_string(),
            ));
        }

        // Duplicate tags within the batch conflict with themselves.
        for (i, def) in definitions.iter().enumerate() {
            if definitions[..i].iter().any(|d| d.tag == def.tag) {
                return Err(Error::AlreadyExists(def.tag.to_string()));
            }
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // SHARE ROW EXCLUSIVE conflicts with itself, so concurrent
        // registrations serialize here and the live-count check below stays
        // exact under concurrency.
        sqlx::query("LOCK TABLE extended_query_tag IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        for def in &definitions {
            let existing: Option<(i64,)> = sqlx::query_as(
                "SELECT key FROM extended_query_tag
                 WHERE tag_path = $1 AND status <> 'deleting'",
            )
            .bind(def.tag.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;

            if existing.is_some() {
                return Err(Error::AlreadyExists(def.tag.to_string()));
            }
        }

        let live_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM extended_query_tag WHERE status <> 'deleting'")
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;

        if live_count as usize + definitions.len() > max_allowed_count {
            return Err(Error::TooManyAttributes {
                requested: definitions.len(),
                max: max_allowed_count,
            });
        }

        let status = if mark_ready_immediately {
            TagStatus::Ready
        } else {
            TagStatus::Adding
        };

        let mut registered = Vec::with_capacity(definitions.len());
        for def in &definitions {
            let (key, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
                "INSERT INTO extended_query_tag (tag_path, value_type, level, status)
                 VALUES ($1, $2, $3, $4)
                 RETURNING key, created_at",
            )
            .bind(def.tag.to_string())
            .bind(Self::value_type_to_str(def.value_type))
            .bind(Self::level_to_str(def.level))
            .bind(Self::status_to_str(status))
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| Self::map_unique_violation(e, def.tag))?;

            registered.push(ExtendedAttributeDefinition {
                key,
                tag: def.tag,
                value_type: def.value_type,
                level: def.level,
                status,
                created_at,
            });
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            count = registered.len(),
            ready = mark_ready_immediately,
            "registered extended attributes"
        );
        Ok(registered)
    }

    async fn mark_ready(&self, keys: &[i64]) -> Result<()> {
        self.transition(keys, TagStatus::Adding, TagStatus::Ready)
            .await
    }

    async fn mark_deleting(&self, keys: &[i64]) -> Result<()> {
        self.transition(keys, TagStatus::Ready, TagStatus::Deleting)
            .await
    }

    async fn get_by_keys(&self, keys: &[i64]) -> Result<Vec<ExtendedAttributeDefinition>> {
        let rows: Vec<(i64, String, String, String, String, DateTime<Utc>)> = sqlx::query_as(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM extended_query_tag
                 WHERE key = ANY($1) ORDER BY key"
            ),
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_row).collect()
    }

    async fn get_by_tag(&self, tag: &AttributeTag) -> Result<Option<ExtendedAttributeDefinition>> {
        let row: Option<(i64, String, String, String, String, DateTime<Utc>)> = sqlx::query_as(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM extended_query_tag
                 WHERE tag_path = $1 AND status <> 'deleting'"
            ),
        )
        .bind(tag.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_row).transpose()
    }

    async fn list(&self) -> Result<Vec<ExtendedAttributeDefinition>> {
        let rows: Vec<(i64, String, String, String, String, DateTime<Utc>)> = sqlx::query_as(
            &format!("SELECT {SELECT_COLUMNS} FROM extended_query_tag ORDER BY key"),
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_row).collect()
    }
}

impl PgExtendedAttributeRepository {
    /// Transition every key `from -> to`, failing without effect when any key
    /// is missing or not in the `from` state.
    async fn transition(&self, keys: &[i64], from: TagStatus, to: TagStatus) -> Result<()> {
        if keys.is_empty() {
            return Err(Error::InvalidInput(
                "at least one tag key is required".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let updated: Vec<(i64,)> = sqlx::query_as(
            "UPDATE extended_query_tag SET status = $1
             WHERE key = ANY($2) AND status = $3
             RETURNING key",
        )
        .bind(Self::status_to_str(to))
        .bind(keys)
        .bind(Self::status_to_str(from))
        .fetch_all(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if updated.len() != keys.len() {
            let updated_keys: Vec<i64> = updated.into_iter().map(|(k,)| k).collect();
            let missing = keys
                .iter()
                .find(|k| !updated_keys.contains(k))
                .copied()
                .unwrap_or_default();
            tx.rollback().await.map_err(Error::Database)?;
            return Err(Error::InvalidInput(format!(
                "tag key {missing} is not in the {} state",
                Self::status_to_str(from)
            )));
        }

        tx.commit().await.map_err(Error::Database)?;
        info!(count = keys.len(), to = Self::status_to_str(to), "transitioned extended attributes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [TagStatus::Adding, TagStatus::Ready, TagStatus::Deleting] {
            let s = PgExtendedAttributeRepository::status_to_str(status);
            assert_eq!(PgExtendedAttributeRepository::str_to_status(s), status);
        }
    }

    #[test]
    fn test_value_type_round_trip() {
        for vt in [
            AttributeValueType::String,
            AttributeValueType::Int,
            AttributeValueType::Double,
            AttributeValueType::DateTime,
            AttributeValueType::PersonName,
        ] {
            let s = PgExtendedAttributeRepository::value_type_to_str(vt);
            assert_eq!(PgExtendedAttributeRepository::str_to_value_type(s), vt);
        }
    }

    #[test]
    fn test_level_round_trip() {
        for level in [
            QueryTagLevel::Study,
            QueryTagLevel::Series,
            QueryTagLevel::Instance,
        ] {
            let s = PgExtendedAttributeRepository::level_to_str(level);
            assert_eq!(PgExtendedAttributeRepository::str_to_level(s), level);
        }
    }

    #[test]
    fn test_non_unique_violation_errors_pass_through() {
        let tag = AttributeTag::new(0x0011, 0x0001);
        let err = PgExtendedAttributeRepository::map_unique_violation(sqlx::Error::RowNotFound, tag);
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_parse_row_rejects_corrupt_tag() {
        let row = (
            1_i64,
            "nothex!".to_string(),
            "string".to_string(),
            "study".to_string(),
            "adding".to_string(),
            Utc::now(),
        );
        let err = PgExtendedAttributeRepository::parse_row(row).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
