//! Relation and relation-type persistence.
//!
//! Relations are unique per `(parent_id, child_id, relation_type_alias)`;
//! creating an existing tuple returns the stored relation instead of a
//! duplicate. Bulk deletes run in one transaction so a concurrent reader sees
//! either every targeted relation or none of them.

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::{debug, info};

use super::repository::Repository;
use super::{from_micros, parse_column, to_micros};
use crate::error::{Result, VellumError};
use crate::graph::RelationGraph;
use crate::model::relation::{EntityKind, Relation, RelationType};

const RELATION_COLUMNS: &str =
    "relation_id, parent_id, child_id, relation_type_alias, comment, created_at_us";

/// Filter for [`Repository::query`] over relations. Unset fields match all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationFilter {
    pub parent_id: Option<i64>,
    pub child_id: Option<i64>,
    /// Matches relations where this id is either endpoint.
    pub parent_or_child_id: Option<i64>,
    pub relation_type_alias: Option<String>,
    pub limit: Option<u32>,
}

impl RelationFilter {
    #[must_use]
    pub fn parent(parent_id: i64) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn child(child_id: i64) -> Self {
        Self {
            child_id: Some(child_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn parent_or_child(id: i64) -> Self {
        Self {
            parent_or_child_id: Some(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.relation_type_alias = Some(alias.into());
        self
    }
}

/// Relation-specific operations on top of the generic repository.
pub trait RelationRepository: Repository<i64, Relation, Query = RelationFilter> {
    /// Delete the relations `parent_id` parents, optionally limited to
    /// `aliases`. An empty `aliases` slice deletes all of them. Returns the
    /// number of relations removed; no match is `Ok(0)`.
    ///
    /// # Errors
    ///
    /// Storage errors; nothing is deleted when one occurs.
    fn delete_by_parent(&self, parent_id: i64, aliases: &[&str]) -> Result<usize>;

    /// # Errors
    ///
    /// Storage errors only.
    fn get_relation_type(&self, alias: &str) -> Result<Option<RelationType>>;

    /// Insert or replace a relation type.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    fn save_relation_type(&self, relation_type: &RelationType) -> Result<()>;

    /// # Errors
    ///
    /// Storage errors only.
    fn list_relation_types(&self) -> Result<Vec<RelationType>>;

    /// # Errors
    ///
    /// Storage errors only.
    fn get_by_parent(&self, parent_id: i64, alias: Option<&str>) -> Result<Vec<Relation>> {
        let mut filter = RelationFilter::parent(parent_id);
        filter.relation_type_alias = alias.map(str::to_string);
        self.query(&filter)
    }

    /// # Errors
    ///
    /// Storage errors only.
    fn get_by_child(&self, child_id: i64, alias: Option<&str>) -> Result<Vec<Relation>> {
        let mut filter = RelationFilter::child(child_id);
        filter.relation_type_alias = alias.map(str::to_string);
        self.query(&filter)
    }

    /// # Errors
    ///
    /// Storage errors only.
    fn get_by_parent_or_child(&self, id: i64, alias: Option<&str>) -> Result<Vec<Relation>> {
        let mut filter = RelationFilter::parent_or_child(id);
        filter.relation_type_alias = alias.map(str::to_string);
        self.query(&filter)
    }
}

/// [`RelationRepository`] over a borrowed SQLite connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteRelationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationRepository<'conn> {
    #[must_use]
    pub const fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Snapshot every relation and type into an in-memory graph.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub fn graph(&self) -> Result<RelationGraph> {
        let relations = self.query(&RelationFilter::default())?;
        let types = self.list_relation_types()?;
        Ok(RelationGraph::from_relations(&relations, &types))
    }

    fn ensure_relation_type(&self, alias: &str) -> Result<()> {
        if self.get_relation_type(alias)?.is_some() {
            Ok(())
        } else {
            Err(VellumError::UnknownRelationType(alias.to_string()))
        }
    }
}

impl Repository<i64, Relation> for SqliteRelationRepository<'_> {
    const ENTITY: &'static str = "relation";
    type Query = RelationFilter;

    fn create(&self, relation: &mut Relation) -> Result<i64> {
        self.ensure_relation_type(&relation.relation_type_alias)?;
        self.conn.execute(
            "INSERT INTO relations (parent_id, child_id, relation_type_alias, comment, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (parent_id, child_id, relation_type_alias)
             DO UPDATE SET comment = COALESCE(excluded.comment, relations.comment)",
            params![
                relation.parent_id,
                relation.child_id,
                relation.relation_type_alias,
                relation.comment,
                to_micros(relation.create_date),
            ],
        )?;

        let stored = self.conn.query_row(
            &format!(
                "SELECT {RELATION_COLUMNS} FROM relations
                 WHERE parent_id = ?1 AND child_id = ?2 AND relation_type_alias = ?3"
            ),
            params![
                relation.parent_id,
                relation.child_id,
                relation.relation_type_alias
            ],
            row_to_relation,
        )?;
        debug!(
            relation_id = stored.id,
            parent_id = stored.parent_id,
            child_id = stored.child_id,
            alias = %stored.relation_type_alias,
            "saved relation"
        );
        *relation = stored;
        Ok(relation.id)
    }

    fn find(&self, id: i64) -> Result<Option<Relation>> {
        let relation = self
            .conn
            .query_row(
                &format!("SELECT {RELATION_COLUMNS} FROM relations WHERE relation_id = ?1"),
                [id],
                row_to_relation,
            )
            .optional()?;
        Ok(relation)
    }

    fn update(&self, relation: &mut Relation) -> Result<()> {
        self.ensure_relation_type(&relation.relation_type_alias)?;
        let changed = self.conn.execute(
            "UPDATE relations
             SET parent_id = ?2, child_id = ?3, relation_type_alias = ?4, comment = ?5
             WHERE relation_id = ?1",
            params![
                relation.id,
                relation.parent_id,
                relation.child_id,
                relation.relation_type_alias,
                relation.comment,
            ],
        )?;
        if changed == 0 {
            return Err(VellumError::not_found(Self::ENTITY, relation.id));
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM relations WHERE relation_id = ?1", [id])?;
        if changed == 0 {
            return Err(VellumError::not_found(Self::ENTITY, id));
        }
        debug!(relation_id = id, "deleted relation");
        Ok(())
    }

    fn query(&self, filter: &RelationFilter) -> Result<Vec<Relation>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(parent_id) = filter.parent_id {
            param_values.push(Box::new(parent_id));
            conditions.push(format!("parent_id = ?{}", param_values.len()));
        }
        if let Some(child_id) = filter.child_id {
            param_values.push(Box::new(child_id));
            conditions.push(format!("child_id = ?{}", param_values.len()));
        }
        if let Some(id) = filter.parent_or_child_id {
            param_values.push(Box::new(id));
            let n = param_values.len();
            conditions.push(format!("(parent_id = ?{n} OR child_id = ?{n})"));
        }
        if let Some(ref alias) = filter.relation_type_alias {
            param_values.push(Box::new(alias.clone()));
            conditions.push(format!("relation_type_alias = ?{}", param_values.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let limit_clause = filter
            .limit
            .map(|limit| format!(" LIMIT {limit}"))
            .unwrap_or_default();

        let sql = format!(
            "SELECT {RELATION_COLUMNS} FROM relations{where_clause} ORDER BY relation_id{limit_clause}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(AsRef::as_ref).collect();
        let rows = stmt.query_map(params_from_iter(params_ref), row_to_relation)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl RelationRepository for SqliteRelationRepository<'_> {
    fn delete_by_parent(&self, parent_id: i64, aliases: &[&str]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = delete_relations_by_parent(&tx, parent_id, aliases)?;
        tx.commit()?;
        info!(parent_id, ?aliases, deleted, "deleted relations by parent");
        Ok(deleted)
    }

    fn get_relation_type(&self, alias: &str) -> Result<Option<RelationType>> {
        let relation_type = self
            .conn
            .query_row(
                "SELECT alias, name, is_bidirectional, is_dependency,
                        parent_object_type, child_object_type
                 FROM relation_types WHERE alias = ?1",
                [alias],
                row_to_relation_type,
            )
            .optional()?;
        Ok(relation_type)
    }

    fn save_relation_type(&self, relation_type: &RelationType) -> Result<()> {
        self.conn.execute(
            "INSERT INTO relation_types
                (alias, name, is_bidirectional, is_dependency, parent_object_type, child_object_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (alias) DO UPDATE SET
                name = excluded.name,
                is_bidirectional = excluded.is_bidirectional,
                is_dependency = excluded.is_dependency,
                parent_object_type = excluded.parent_object_type,
                child_object_type = excluded.child_object_type",
            params![
                relation_type.alias,
                relation_type.name,
                relation_type.is_bidirectional,
                relation_type.is_dependency,
                relation_type.parent_object_type.map(EntityKind::as_str),
                relation_type.child_object_type.map(EntityKind::as_str),
            ],
        )?;
        debug!(alias = %relation_type.alias, "saved relation type");
        Ok(())
    }

    fn list_relation_types(&self) -> Result<Vec<RelationType>> {
        let mut stmt = self.conn.prepare(
            "SELECT alias, name, is_bidirectional, is_dependency,
                    parent_object_type, child_object_type
             FROM relation_types ORDER BY alias",
        )?;
        let rows = stmt.query_map([], row_to_relation_type)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

/// Delete a parent's relations on `conn` without opening a transaction, so
/// callers that already hold one can compose it.
///
/// # Errors
///
/// Storage errors only.
pub fn delete_relations_by_parent(
    conn: &Connection,
    parent_id: i64,
    aliases: &[&str],
) -> Result<usize> {
    if aliases.is_empty() {
        let deleted = conn.execute("DELETE FROM relations WHERE parent_id = ?1", [parent_id])?;
        return Ok(deleted);
    }

    let placeholders = (0..aliases.len())
        .map(|i| format!("?{}", i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "DELETE FROM relations WHERE parent_id = ?1 AND relation_type_alias IN ({placeholders})"
    );

    let mut param_values: Vec<&dyn rusqlite::types::ToSql> = Vec::with_capacity(aliases.len() + 1);
    param_values.push(&parent_id);
    for alias in aliases {
        param_values.push(alias);
    }
    let deleted = conn.execute(&sql, params_from_iter(param_values))?;
    Ok(deleted)
}

fn row_to_relation(row: &Row<'_>) -> rusqlite::Result<Relation> {
    Ok(Relation {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        child_id: row.get(2)?,
        relation_type_alias: row.get(3)?,
        comment: row.get(4)?,
        create_date: from_micros(5, row.get(5)?)?,
    })
}

fn row_to_relation_type(row: &Row<'_>) -> rusqlite::Result<RelationType> {
    let parent: Option<String> = row.get(4)?;
    let child: Option<String> = row.get(5)?;
    Ok(RelationType {
        alias: row.get(0)?,
        name: row.get(1)?,
        is_bidirectional: row.get(2)?,
        is_dependency: row.get(3)?,
        parent_object_type: parent.map(|raw| parse_column(4, &raw)).transpose()?,
        child_object_type: child.map(|raw| parse_column(5, &raw)).transpose()?,
    })
}
