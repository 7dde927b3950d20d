//! Core data models for the voxel metadata store.
//!
//! These types are shared across all voxel crates and represent the core
//! domain entities: attribute tags, extended attribute definitions, change
//! feed entries, versioned instance identifiers, and operation status views.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

// =============================================================================
// ATTRIBUTE TAGS
// =============================================================================

/// A (group, element) attribute tag identifying a searchable field.
///
/// The canonical textual form is eight upper-case hex digits, `GGGGEEEE`.
/// Parsing also accepts the `GGGG,EEEE` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeTag {
    pub group: u16,
    pub element: u16,
}

impl AttributeTag {
    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }

    /// Parse a tag from its textual form, returning `None` on any deviation.
    pub fn parse(value: &str) -> Option<Self> {
        let compact: String = match value.len() {
            8 => value.to_string(),
            9 if value.as_bytes()[4] == b',' => value.replace(',', ""),
            _ => return None,
        };
        if compact.len() != 8 || !compact.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let group = u16::from_str_radix(&compact[..4], 16).ok()?;
        let element = u16::from_str_radix(&compact[4..], 16).ok()?;
        Some(Self { group, element })
    }
}

impl fmt::Display for AttributeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}{:04X}", self.group, self.element)
    }
}

impl FromStr for AttributeTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid attribute tag: {s}"))
    }
}

impl Serialize for AttributeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AttributeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// EXTENDED ATTRIBUTE DEFINITIONS
// =============================================================================

/// Value type of an extended attribute, constraining index storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeValueType {
    String,
    Int,
    Double,
    DateTime,
    PersonName,
}

/// Record level an extended attribute is indexed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryTagLevel {
    Study,
    Series,
    Instance,
}

/// Lifecycle status of an extended attribute definition.
///
/// Transitions are strictly forward: Adding -> Ready -> Deleting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagStatus {
    /// Registered, backfill not yet complete; not searchable.
    Adding,
    /// Backfill complete; searchable.
    Ready,
    /// Scheduled for physical removal; excluded from uniqueness checks.
    Deleting,
}

/// A dynamically registered searchable attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedAttributeDefinition {
    /// Registry-assigned key, unique and immutable once assigned.
    pub key: i64,
    pub tag: AttributeTag,
    pub value_type: AttributeValueType,
    pub level: QueryTagLevel,
    pub status: TagStatus,
    pub created_at: DateTime<Utc>,
}

/// Request to register one extended attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExtendedAttribute {
    pub tag: AttributeTag,
    pub value_type: AttributeValueType,
    pub level: QueryTagLevel,
}

// =============================================================================
// QUERY EXPRESSION
// =============================================================================

/// Parsed query expression parameters.
///
/// Built up by the query parameter parser and handed to the query execution
/// engine. When `include_all` is set, `include_fields` is ignored by
/// consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExpressionParams {
    pub offset: i64,
    pub limit: i64,
    pub fuzzy_match: bool,
    pub include_all: bool,
    pub include_fields: Vec<AttributeTag>,
}

impl Default for QueryExpressionParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: crate::defaults::DEFAULT_QUERY_RESULT_COUNT,
            fuzzy_match: false,
            include_all: false,
            include_fields: Vec::new(),
        }
    }
}

// =============================================================================
// CHANGE FEED
// =============================================================================

/// Kind of material change recorded in the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeFeedAction {
    Create,
    Update,
    Delete,
}

/// One immutable entry in the append-only change feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFeedEntry {
    /// Strictly increasing, globally unique, assigned at commit time.
    pub watermark: i64,
    pub partition: Option<String>,
    pub study_uid: String,
    pub series_uid: String,
    pub sop_uid: String,
    pub action: ChangeFeedAction,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// INSTANCE IDENTITY & METADATA
// =============================================================================

/// Identity of one stored instance version.
///
/// `version` is the watermark assigned when the version was written. Multiple
/// versions may exist for the same (study, series, sop) triple; exactly one
/// is current at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedInstanceIdentifier {
    pub partition: Option<String>,
    pub study_uid: String,
    pub series_uid: String,
    pub sop_uid: String,
    pub version: i64,
}

impl fmt::Display for VersionedInstanceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} v{}",
            self.study_uid, self.series_uid, self.sop_uid, self.version
        )
    }
}

/// Metadata document for one instance version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceMetadata {
    pub identifier: VersionedInstanceIdentifier,
    pub document: JsonValue,
}

// =============================================================================
// REINDEX OPERATIONS
// =============================================================================

/// Kind of long-running operation run by the orchestration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    Reindex,
}

/// Runtime status of a long-running operation.
///
/// Running is the only non-terminal state and is observed by polling, never
/// pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationRuntimeStatus {
    Running,
    Completed,
    Failed,
    Canceled,
}

impl OperationRuntimeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationRuntimeStatus::Running)
    }
}

/// Last-observed view of an operation owned by the orchestration engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    pub operation_id: String,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub created_time: DateTime<Utc>,
    pub last_updated_time: DateTime<Utc>,
    pub status: OperationRuntimeStatus,
    #[serde(default)]
    pub tag_keys: Vec<i64>,
}
