// Resource descriptors exchanged with the service.
//
// Request bodies and responses share the same types: system properties are
// filled in by the service and skipped on the way out when empty.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::link::ResourceType;

/// Properties the service stamps on every resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemProperties {
    #[serde(rename = "_rid", default, skip_serializing_if = "String::is_empty")]
    pub resource_id: String,
    #[serde(rename = "_self", default, skip_serializing_if = "String::is_empty")]
    pub self_link: String,
    #[serde(rename = "_etag", default, skip_serializing_if = "String::is_empty")]
    pub etag: String,
    #[serde(rename = "_ts", default, skip_serializing_if = "is_zero")]
    pub timestamp: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl SystemProperties {
    /// Last-modified time; `None` until the service has stamped the resource.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        if self.timestamp == 0 {
            return None;
        }
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Common surface of typed resources, used by the generic client operations.
pub trait CosmosResource: Serialize + DeserializeOwned {
    const TYPE: ResourceType;

    fn id(&self) -> &str;

    fn system(&self) -> SystemProperties;
}

macro_rules! resource {
    ($ty:ty, $kind:expr) => {
        impl CosmosResource for $ty {
            const TYPE: ResourceType = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn system(&self) -> SystemProperties {
                self.system.clone()
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: String,
    #[serde(flatten)]
    pub system: SystemProperties,
}

impl Database {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<PartitionKeyDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing_policy: Option<IndexingPolicy>,
    #[serde(flatten)]
    pub system: SystemProperties,
}

impl Collection {
    pub fn new(id: &str, partition_key_path: &str) -> Self {
        Self {
            id: id.to_string(),
            partition_key: Some(PartitionKeyDefinition::hash(partition_key_path)),
            ..Default::default()
        }
    }

    pub fn with_indexing_policy(mut self, policy: IndexingPolicy) -> Self {
        self.indexing_policy = Some(policy);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionKeyDefinition {
    pub paths: Vec<String>,
    #[serde(default = "default_partition_kind")]
    pub kind: String,
}

fn default_partition_kind() -> String {
    "Hash".to_string()
}

impl PartitionKeyDefinition {
    pub fn hash(path: &str) -> Self {
        Self {
            paths: vec![path.to_string()],
            kind: default_partition_kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingPolicy {
    #[serde(default = "default_indexing_mode")]
    pub indexing_mode: String,
    #[serde(default = "default_true")]
    pub automatic: bool,
    #[serde(default)]
    pub included_paths: Vec<IndexPath>,
    #[serde(default)]
    pub excluded_paths: Vec<IndexPath>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub composite_indexes: Vec<Vec<CompositePath>>,
}

fn default_indexing_mode() -> String {
    "consistent".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for IndexingPolicy {
    fn default() -> Self {
        Self {
            indexing_mode: default_indexing_mode(),
            automatic: true,
            included_paths: vec![IndexPath::new("/*")],
            excluded_paths: vec![IndexPath::new("/\"_etag\"/?")],
            composite_indexes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPath {
    pub path: String,
}

impl IndexPath {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositePath {
    pub path: String,
    #[serde(default = "default_order")]
    pub order: String,
}

fn default_order() -> String {
    "ascending".to_string()
}

impl CompositePath {
    pub fn ascending(path: &str) -> Self {
        Self {
            path: path.to_string(),
            order: default_order(),
        }
    }

    pub fn descending(path: &str) -> Self {
        Self {
            path: path.to_string(),
            order: "descending".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(flatten)]
    pub system: SystemProperties,
}

impl User {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermissionMode {
    #[default]
    Read,
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    pub permission_mode: PermissionMode,
    /// Self-link of the resource the permission applies to.
    pub resource: String,
    /// Resource token, only present on responses.
    #[serde(rename = "_token", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub system: SystemProperties,
}

impl Permission {
    pub fn new(id: &str, mode: PermissionMode, resource: &str) -> Self {
        Self {
            id: id.to_string(),
            permission_mode: mode,
            resource: resource.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredProcedure {
    pub id: String,
    pub body: String,
    #[serde(flatten)]
    pub system: SystemProperties,
}

impl StoredProcedure {
    pub fn new(id: &str, body: &str) -> Self {
        Self {
            id: id.to_string(),
            body: body.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerType {
    #[default]
    Pre,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerOperation {
    #[default]
    All,
    Create,
    Replace,
    Delete,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    pub body: String,
    pub trigger_type: TriggerType,
    pub trigger_operation: TriggerOperation,
    #[serde(flatten)]
    pub system: SystemProperties,
}

impl Trigger {
    pub fn new(id: &str, body: &str, trigger_type: TriggerType, operation: TriggerOperation) -> Self {
        Self {
            id: id.to_string(),
            body: body.to_string(),
            trigger_type,
            trigger_operation: operation,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDefinedFunction {
    pub id: String,
    pub body: String,
    #[serde(flatten)]
    pub system: SystemProperties,
}

impl UserDefinedFunction {
    pub fn new(id: &str, body: &str) -> Self {
        Self {
            id: id.to_string(),
            body: body.to_string(),
            ..Default::default()
        }
    }
}

resource!(Database, ResourceType::Databases);
resource!(Collection, ResourceType::Collections);
resource!(User, ResourceType::Users);
resource!(Permission, ResourceType::Permissions);
resource!(StoredProcedure, ResourceType::StoredProcedures);
resource!(Trigger, ResourceType::Triggers);
resource!(UserDefinedFunction, ResourceType::UserDefinedFunctions);

/// Documents are schemaless.
impl CosmosResource for Value {
    const TYPE: ResourceType = ResourceType::Documents;

    fn id(&self) -> &str {
        self.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    fn system(&self) -> SystemProperties {
        let text = |key: &str| {
            self.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        SystemProperties {
            resource_id: text("_rid"),
            self_link: text("_self"),
            etag: text("_etag"),
            timestamp: self.get("_ts").and_then(Value::as_i64).unwrap_or_default(),
        }
    }
}
