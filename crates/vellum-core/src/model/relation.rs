//! Typed directed edges between entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, normalize};

/// Built-in relation type aliases seeded by the store migrations.
pub mod aliases {
    pub const RELATE_DOCUMENT_ON_COPY: &str = "relateDocumentOnCopy";
    pub const RELATE_PARENT_DOCUMENT_ON_DELETE: &str = "relateParentDocumentOnDelete";
    pub const RELATE_PARENT_MEDIA_FOLDER_ON_DELETE: &str = "relateParentMediaFolderOnDelete";
    pub const DOCUMENT_DEPENDENCY: &str = "umbDocument";
    pub const MEDIA_DEPENDENCY: &str = "umbMedia";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// Surrogate id; `0` until the relation has been persisted.
    pub id: i64,
    pub parent_id: i64,
    pub child_id: i64,
    pub relation_type_alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub create_date: DateTime<Utc>,
}

impl Relation {
    pub fn new(parent_id: i64, child_id: i64, relation_type_alias: impl Into<String>) -> Self {
        Self {
            id: 0,
            parent_id,
            child_id,
            relation_type_alias: relation_type_alias.into(),
            comment: None,
            create_date: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Whether `id` is either endpoint of this edge.
    #[must_use]
    pub const fn touches(&self, id: i64) -> bool {
        self.parent_id == id || self.child_id == id
    }
}

/// Kind of entity on either end of a relation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Document,
    Media,
    Member,
    ContentType,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Media => "media",
            Self::Member => "member",
            Self::ContentType => "content_type",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "document" | "doc" => Ok(Self::Document),
            "media" => Ok(Self::Media),
            "member" => Ok(Self::Member),
            "contenttype" | "type" => Ok(Self::ContentType),
            _ => Err(ParseEnumError {
                expected: "entity kind",
                got: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationType {
    pub alias: String,
    pub name: String,
    #[serde(default)]
    pub is_bidirectional: bool,
    /// Edges of this type mean "parent depends on child".
    #[serde(default)]
    pub is_dependency: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_object_type: Option<EntityKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_object_type: Option<EntityKind>,
}

impl RelationType {
    pub fn new(alias: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            name: name.into(),
            is_bidirectional: false,
            is_dependency: false,
            parent_object_type: None,
            child_object_type: None,
        }
    }

    #[must_use]
    pub const fn bidirectional(mut self) -> Self {
        self.is_bidirectional = true;
        self
    }

    #[must_use]
    pub const fn dependency(mut self) -> Self {
        self.is_dependency = true;
        self
    }

    #[must_use]
    pub const fn between(mut self, parent: EntityKind, child: EntityKind) -> Self {
        self.parent_object_type = Some(parent);
        self.child_object_type = Some(child);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, Relation, RelationType};

    #[test]
    fn entity_kind_parses_loosely() {
        assert_eq!("Document".parse::<EntityKind>().unwrap(), EntityKind::Document);
        assert_eq!(
            "content-type".parse::<EntityKind>().unwrap(),
            EntityKind::ContentType
        );
        assert!("widget".parse::<EntityKind>().is_err());
        for kind in [
            EntityKind::Document,
            EntityKind::Media,
            EntityKind::Member,
            EntityKind::ContentType,
        ] {
            assert_eq!(kind.to_string().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn relation_touches_both_ends() {
        let relation = Relation::new(1, 2, "umbDocument").with_comment("link");
        assert!(relation.touches(1));
        assert!(relation.touches(2));
        assert!(!relation.touches(3));
        assert_eq!(relation.id, 0);
    }

    #[test]
    fn relation_type_serializes_camel_case() {
        let ty = RelationType::new("umbMedia", "Related Media")
            .dependency()
            .between(EntityKind::Document, EntityKind::Media);
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json["isDependency"], true);
        assert_eq!(json["childObjectType"], "media");
    }
}
