//! Canonical SQLite schema for the vellum store.
//!
//! - `content_types` holds the slice of the type schema the core consumes
//! - `content` keeps identity, hierarchy and audit fields per item
//! - `content_variants` stores one row per (item, element group, culture)
//! - `relation_types` and `relations` model the typed relation graph
//! - `store_meta` mirrors the schema version for tooling

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS content_types (
    type_id INTEGER PRIMARY KEY,
    alias TEXT NOT NULL UNIQUE CHECK (length(trim(alias)) > 0),
    varies_by_culture INTEGER NOT NULL DEFAULT 0 CHECK (varies_by_culture IN (0, 1)),
    definition_json TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS content (
    content_id INTEGER PRIMARY KEY,
    content_key TEXT NOT NULL UNIQUE,
    type_id INTEGER NOT NULL REFERENCES content_types(type_id),
    parent_id INTEGER NOT NULL,
    path TEXT NOT NULL,
    level INTEGER NOT NULL CHECK (level >= 1),
    sort_order INTEGER NOT NULL DEFAULT 0,
    creator_id INTEGER NOT NULL,
    trashed INTEGER NOT NULL DEFAULT 0 CHECK (trashed IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (content_id <> parent_id)
);

CREATE TABLE IF NOT EXISTS content_variants (
    content_id INTEGER NOT NULL REFERENCES content(content_id) ON DELETE CASCADE,
    group_alias TEXT NOT NULL DEFAULT '',
    culture TEXT NOT NULL CHECK (length(culture) > 0),
    name TEXT,
    state TEXT NOT NULL CHECK (
        state IN ('NotCreated', 'Draft', 'Published', 'PublishedPendingChanges')
    ),
    values_json TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (content_id, group_alias, culture),
    CHECK (state = 'NotCreated' OR name IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS relation_types (
    alias TEXT PRIMARY KEY CHECK (length(trim(alias)) > 0),
    name TEXT NOT NULL,
    is_bidirectional INTEGER NOT NULL DEFAULT 0 CHECK (is_bidirectional IN (0, 1)),
    is_dependency INTEGER NOT NULL DEFAULT 0 CHECK (is_dependency IN (0, 1)),
    parent_object_type TEXT,
    child_object_type TEXT
);

CREATE TABLE IF NOT EXISTS relations (
    relation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER NOT NULL,
    child_id INTEGER NOT NULL,
    relation_type_alias TEXT NOT NULL REFERENCES relation_types(alias),
    comment TEXT,
    created_at_us INTEGER NOT NULL,
    UNIQUE (parent_id, child_id, relation_type_alias)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    initialized_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, initialized_at_us)
VALUES (1, 0, 0);
";

/// Migration v2: read-path indexes and the built-in relation types.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_content_parent_sort
    ON content(parent_id, sort_order);

CREATE INDEX IF NOT EXISTS idx_content_type
    ON content(type_id);

CREATE INDEX IF NOT EXISTS idx_content_trashed_updated
    ON content(trashed, updated_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_content_variants_state
    ON content_variants(state, culture);

CREATE INDEX IF NOT EXISTS idx_relations_parent_type
    ON relations(parent_id, relation_type_alias);

CREATE INDEX IF NOT EXISTS idx_relations_child_type
    ON relations(child_id, relation_type_alias);

INSERT OR IGNORE INTO relation_types
    (alias, name, is_bidirectional, is_dependency, parent_object_type, child_object_type)
VALUES
    ('relateDocumentOnCopy', 'Relate Document On Copy', 1, 0, 'document', 'document'),
    ('relateParentDocumentOnDelete', 'Relate Parent Document On Delete', 0, 0, 'document', 'document'),
    ('relateParentMediaFolderOnDelete', 'Relate Parent Media Folder On Delete', 0, 0, 'media', 'media'),
    ('umbDocument', 'Related Document', 0, 1, 'document', 'document'),
    ('umbMedia', 'Related Media', 0, 1, 'document', 'media');
";

/// Indexes expected by the read paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_content_parent_sort",
    "idx_content_type",
    "idx_content_trashed_updated",
    "idx_content_variants_state",
    "idx_relations_parent_type",
    "idx_relations_child_type",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    #[test]
    fn duplicate_relation_tuple_is_rejected() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;

        let insert = "INSERT INTO relations (parent_id, child_id, relation_type_alias, created_at_us)
                      VALUES (?1, ?2, ?3, 0)";
        conn.execute(insert, params![1, 2, "umbDocument"])?;
        assert!(conn.execute(insert, params![1, 2, "umbDocument"]).is_err());
        conn.execute(insert, params![1, 2, "umbMedia"])?;
        Ok(())
    }

    #[test]
    fn named_state_requires_name() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;
        conn.execute(
            "INSERT INTO content_types (type_id, alias, definition_json, created_at_us)
             VALUES (1, 'page', '{}', 0)",
            [],
        )?;
        conn.execute(
            "INSERT INTO content (content_id, content_key, type_id, parent_id, path, level,
                                  creator_id, created_at_us, updated_at_us)
             VALUES (5, 'k', 1, -1, '-1,5', 1, 1, 0, 0)",
            [],
        )?;

        let insert = "INSERT INTO content_variants (content_id, culture, name, state)
                      VALUES (5, ?1, ?2, ?3)";
        assert!(conn
            .execute(insert, params!["en", Option::<String>::None, "Draft"])
            .is_err());
        conn.execute(insert, params!["fr", Option::<String>::None, "NotCreated"])?;
        assert!(conn.execute(insert, params!["de", "Start", "Archived"]).is_err());
        Ok(())
    }

    #[test]
    fn unknown_relation_alias_violates_foreign_key() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::migrate(&mut conn)?;
        let result = conn.execute(
            "INSERT INTO relations (parent_id, child_id, relation_type_alias, created_at_us)
             VALUES (1, 2, 'noSuchType', 0)",
            [],
        );
        assert!(result.is_err());
        Ok(())
    }
}
