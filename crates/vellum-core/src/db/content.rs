//! Content item persistence.
//!
//! An item is one `content` row plus one `content_variants` row per
//! (element group, culture). Saving rewrites the variant rows in the same
//! transaction as the item row, then clears the item's dirty tracking.

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::content_types::SqliteContentTypeRepository;
use super::relations::delete_relations_by_parent;
use super::repository::Repository;
use super::{from_micros, parse_column, to_micros};
use crate::error::{Result, VellumError};
use crate::model::content::{ContentItem, ContentRecord};
use crate::model::culture::Culture;
use crate::model::variant::{PublicationState, VariantRecord, VariantStore};

const CONTENT_COLUMNS: &str = "content_id, content_key, type_id, parent_id, path, level, \
     sort_order, creator_id, trashed, created_at_us, updated_at_us";

/// Top-level variants use the empty group alias.
const ROOT_GROUP: &str = "";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub parent_id: Option<i64>,
    pub type_id: Option<i64>,
    /// `None` lists both trashed and live items.
    pub trashed: Option<bool>,
    /// Items with at least one variant in this state.
    pub state: Option<PublicationState>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct SqliteContentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContentRepository<'conn> {
    #[must_use]
    pub const fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Direct children of `parent_id`, in sort order.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors.
    pub fn children(&self, parent_id: i64) -> Result<Vec<ContentItem>> {
        self.query(&ContentFilter {
            parent_id: Some(parent_id),
            ..ContentFilter::default()
        })
    }

    fn load_variants(&self, content_id: i64) -> Result<VariantStore> {
        let mut stmt = self.conn.prepare(
            "SELECT group_alias, culture, name, state, values_json
             FROM content_variants WHERE content_id = ?1
             ORDER BY group_alias, culture",
        )?;
        let rows = stmt
            .query_map([content_id], |row| {
                let group: String = row.get(0)?;
                let culture: String = row.get(1)?;
                let state: String = row.get(3)?;
                Ok((
                    group,
                    culture,
                    row.get::<_, Option<String>>(2)?,
                    state,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut by_group: BTreeMap<String, Vec<VariantRecord>> = BTreeMap::new();
        for (group, culture, name, state, values_json) in rows {
            let values: BTreeMap<String, Value> = serde_json::from_str(&values_json)?;
            by_group.entry(group).or_default().push(VariantRecord {
                culture: parse_column::<Culture>(1, &culture)?,
                name,
                state: parse_column::<PublicationState>(3, &state)?,
                values,
            });
        }

        let root = by_group.remove(ROOT_GROUP).unwrap_or_default();
        let groups = by_group
            .into_iter()
            .map(|(alias, records)| (alias, VariantStore::restore(records, BTreeMap::new())))
            .collect();
        Ok(VariantStore::restore(root, groups))
    }

    fn write(&self, item: &mut ContentItem, insert: bool) -> Result<()> {
        // Stage the lifecycle bump so a failed write leaves `item` untouched.
        let mut staged = item.clone();
        let pending = staged.commit_edits();

        let tx = self.conn.unchecked_transaction()?;
        let key = staged.key().to_string();
        let sql = if insert {
            format!(
                "INSERT INTO content ({CONTENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            )
        } else {
            tx.execute(
                "DELETE FROM content_variants WHERE content_id = ?1",
                [staged.id()],
            )?;
            "UPDATE content SET content_key = ?2, type_id = ?3, parent_id = ?4, path = ?5,
                 level = ?6, sort_order = ?7, creator_id = ?8, trashed = ?9,
                 created_at_us = ?10, updated_at_us = ?11
             WHERE content_id = ?1"
                .to_string()
        };
        tx.execute(
            &sql,
            params![
                staged.id(),
                key,
                staged.content_type().id,
                staged.parent_id(),
                staged.path(),
                staged.level(),
                staged.sort_order(),
                staged.creator_id(),
                staged.trashed(),
                to_micros(staged.create_date()),
                to_micros(staged.update_date()),
            ],
        )?;

        write_variants(&tx, staged.id(), ROOT_GROUP, staged.variants())?;
        for (alias, group) in staged.variants().groups() {
            write_variants(&tx, staged.id(), alias, group)?;
        }
        tx.commit()?;

        staged.reset_dirty_properties(true);
        *item = staged;
        debug!(
            content_id = item.id(),
            pending = pending.len(),
            insert,
            "saved content item"
        );
        Ok(())
    }
}

fn write_variants(
    conn: &Connection,
    content_id: i64,
    group: &str,
    store: &VariantStore,
) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO content_variants (content_id, group_alias, culture, name, state, values_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (culture, variant) in store.iter() {
        stmt.execute(params![
            content_id,
            group,
            culture.as_str(),
            variant.name(),
            variant.state().as_str(),
            serde_json::to_string(variant.values())?,
        ])?;
    }
    Ok(())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(ContentRecord, i64)> {
    let key: String = row.get(1)?;
    Ok((
        ContentRecord {
            id: row.get(0)?,
            key: parse_column(1, &key)?,
            parent_id: row.get(3)?,
            path: row.get(4)?,
            level: row.get(5)?,
            sort_order: row.get(6)?,
            creator_id: row.get(7)?,
            trashed: row.get(8)?,
            create_date: from_micros(9, row.get(9)?)?,
            update_date: from_micros(10, row.get(10)?)?,
        },
        row.get(2)?,
    ))
}

impl Repository<i64, ContentItem> for SqliteContentRepository<'_> {
    const ENTITY: &'static str = "content";
    type Query = ContentFilter;

    /// Persist a new item. Published variants holding unsaved edits are
    /// stored as `PublishedPendingChanges`; dirty tracking is cleared after.
    fn create(&self, item: &mut ContentItem) -> Result<i64> {
        if self.exists(item.id())? {
            return Err(VellumError::AlreadyExists {
                entity: Self::ENTITY,
                id: item.id().to_string(),
            });
        }
        self.write(item, true)?;
        Ok(item.id())
    }

    fn find(&self, id: i64) -> Result<Option<ContentItem>> {
        let Some((record, type_id)) = self
            .conn
            .query_row(
                &format!("SELECT {CONTENT_COLUMNS} FROM content WHERE content_id = ?1"),
                [id],
                row_to_record,
            )
            .optional()?
        else {
            return Ok(None);
        };

        let content_type = SqliteContentTypeRepository::new(self.conn)
            .find(type_id)?
            .ok_or_else(|| {
                VellumError::missing_content_type(format!(
                    "content {id} references missing content type {type_id}"
                ))
            })?;
        let variants = self.load_variants(id)?;
        Ok(Some(ContentItem::restore(record, content_type, variants)))
    }

    fn exists(&self, id: i64) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM content WHERE content_id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn update(&self, item: &mut ContentItem) -> Result<()> {
        if !self.exists(item.id())? {
            return Err(VellumError::not_found(Self::ENTITY, item.id()));
        }
        self.write(item, false)
    }

    fn delete(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM content WHERE content_id = ?1", [id])?;
        if changed == 0 {
            return Err(VellumError::not_found(Self::ENTITY, id));
        }
        debug!(content_id = id, "deleted content item");
        Ok(())
    }

    fn query(&self, filter: &ContentFilter) -> Result<Vec<ContentItem>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(parent_id) = filter.parent_id {
            param_values.push(Box::new(parent_id));
            conditions.push(format!("c.parent_id = ?{}", param_values.len()));
        }
        if let Some(type_id) = filter.type_id {
            param_values.push(Box::new(type_id));
            conditions.push(format!("c.type_id = ?{}", param_values.len()));
        }
        if let Some(trashed) = filter.trashed {
            param_values.push(Box::new(trashed));
            conditions.push(format!("c.trashed = ?{}", param_values.len()));
        }
        if let Some(state) = filter.state {
            param_values.push(Box::new(state.as_str()));
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM content_variants v \
                 WHERE v.content_id = c.content_id AND v.state = ?{})",
                param_values.len()
            ));
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
            "SELECT c.content_id FROM content c{where_clause} \
             ORDER BY c.parent_id, c.sort_order, c.content_id{limit_clause}"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(AsRef::as_ref).collect();
        let ids = stmt
            .query_map(params_from_iter(params_ref), |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            items.push(self.get(id)?);
        }
        Ok(items)
    }
}

/// Smallest unused content id above every stored one.
///
/// # Errors
///
/// Storage errors only.
pub fn next_content_id(conn: &Connection) -> Result<i64> {
    let max: Option<i64> =
        conn.query_row("SELECT MAX(content_id) FROM content", [], |row| row.get(0))?;
    Ok(max.unwrap_or(0) + 1)
}

/// Remove an item together with every relation it parents, atomically.
/// Returns the number of relations removed.
///
/// # Errors
///
/// [`VellumError::NotFound`] when the item does not exist; nothing is
/// deleted in that case.
pub fn delete_content_with_relations(conn: &Connection, id: i64) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let relations = delete_relations_by_parent(&tx, id, &[])?;
    let changed = tx.execute("DELETE FROM content WHERE content_id = ?1", [id])?;
    if changed == 0 {
        return Err(VellumError::not_found("content", id));
    }
    tx.commit()?;
    info!(content_id = id, relations, "deleted content item with relations");
    Ok(relations)
}
