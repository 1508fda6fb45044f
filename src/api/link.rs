// Name-based addressing of service resources.
//
// A `Link` names one resource (`dbs/mydb/colls/mystore`). Feed operations
// (list, create, query) address the children of a link, so they are signed
// with the parent link and the child resource type.

use std::fmt;

/// Kinds of resources exposed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Databases,
    Collections,
    Documents,
    Users,
    Permissions,
    StoredProcedures,
    Triggers,
    UserDefinedFunctions,
}

impl ResourceType {
    /// Path segment, also used in the signature payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Databases => "dbs",
            ResourceType::Collections => "colls",
            ResourceType::Documents => "docs",
            ResourceType::Users => "users",
            ResourceType::Permissions => "permissions",
            ResourceType::StoredProcedures => "sprocs",
            ResourceType::Triggers => "triggers",
            ResourceType::UserDefinedFunctions => "udfs",
        }
    }

    /// Property holding the items of a feed response.
    pub fn feed_key(&self) -> &'static str {
        match self {
            ResourceType::Databases => "Databases",
            ResourceType::Collections => "DocumentCollections",
            ResourceType::Documents => "Documents",
            ResourceType::Users => "Users",
            ResourceType::Permissions => "Permissions",
            ResourceType::StoredProcedures => "StoredProcedures",
            ResourceType::Triggers => "Triggers",
            ResourceType::UserDefinedFunctions => "UserDefinedFunctions",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a single resource. `Link::root()` is the account itself and
/// is only useful as the parent of the database feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    segments: Vec<(ResourceType, String)>,
}

impl Link {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn database(id: &str) -> Self {
        Self::root().child(ResourceType::Databases, id)
    }

    pub fn collection(&self, id: &str) -> Self {
        self.child(ResourceType::Collections, id)
    }

    pub fn document(&self, id: &str) -> Self {
        self.child(ResourceType::Documents, id)
    }

    pub fn user(&self, id: &str) -> Self {
        self.child(ResourceType::Users, id)
    }

    pub fn permission(&self, id: &str) -> Self {
        self.child(ResourceType::Permissions, id)
    }

    pub fn stored_procedure(&self, id: &str) -> Self {
        self.child(ResourceType::StoredProcedures, id)
    }

    pub fn trigger(&self, id: &str) -> Self {
        self.child(ResourceType::Triggers, id)
    }

    pub fn user_defined_function(&self, id: &str) -> Self {
        self.child(ResourceType::UserDefinedFunctions, id)
    }

    pub fn child(&self, resource_type: ResourceType, id: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push((resource_type, id.to_string()));
        Self { segments }
    }

    /// Type of the addressed resource; `None` for the root.
    pub fn resource_type(&self) -> Option<ResourceType> {
        self.segments.last().map(|(ty, _)| *ty)
    }

    pub fn id(&self) -> Option<&str> {
        self.segments.last().map(|(_, id)| id.as_str())
    }

    /// Unencoded link used when signing requests.
    pub fn path(&self) -> String {
        self.segments
            .iter()
            .map(|(ty, id)| format!("{}/{}", ty.as_str(), id))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Percent-encoded path used in request URLs.
    pub fn url_path(&self) -> String {
        self.segments
            .iter()
            .map(|(ty, id)| format!("{}/{}", ty.as_str(), urlencoding::encode(id)))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Encoded URL path of the `resource_type` feed below this link.
    pub fn feed_url_path(&self, resource_type: ResourceType) -> String {
        if self.segments.is_empty() {
            resource_type.as_str().to_string()
        } else {
            format!("{}/{}", self.url_path(), resource_type.as_str())
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_paths() {
        let link = Link::database("mydb").collection("mystore").document("doc1");
        assert_eq!(link.path(), "dbs/mydb/colls/mystore/docs/doc1");
        assert_eq!(link.resource_type(), Some(ResourceType::Documents));
        assert_eq!(link.id(), Some("doc1"));
    }

    #[test]
    fn feed_paths_hang_off_the_parent() {
        assert_eq!(Link::root().feed_url_path(ResourceType::Databases), "dbs");
        assert_eq!(
            Link::database("mydb").feed_url_path(ResourceType::Collections),
            "dbs/mydb/colls"
        );
    }

    #[test]
    fn url_path_encodes_ids_but_signing_path_does_not() {
        let link = Link::database("my db").user("Alice");
        assert_eq!(link.path(), "dbs/my db/users/Alice");
        assert_eq!(link.url_path(), "dbs/my%20db/users/Alice");
    }

    #[test]
    fn root_has_no_type() {
        assert_eq!(Link::root().resource_type(), None);
        assert_eq!(Link::root().path(), "");
    }
}
