//! Content-type persistence and the SQLite-backed type resolver.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::repository::Repository;
use super::to_micros;
use crate::error::{Result, VellumError};
use crate::model::content_type::{ContentType, ContentTypeResolver, PropertyType};

const TYPE_COLUMNS: &str = "type_id, alias, varies_by_culture, definition_json";

/// Property and group declarations, stored as one JSON column.
#[derive(Debug, Serialize, Deserialize)]
struct Definition {
    #[serde(default)]
    property_types: Vec<PropertyType>,
    #[serde(default)]
    element_groups: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypeFilter {
    pub alias: Option<String>,
    pub varies_by_culture: Option<bool>,
}

#[derive(Debug, Clone, Copy)]
pub struct SqliteContentTypeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContentTypeRepository<'conn> {
    #[must_use]
    pub const fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// # Errors
    ///
    /// Storage or decoding errors.
    pub fn find_by_alias(&self, alias: &str) -> Result<Option<ContentType>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TYPE_COLUMNS} FROM content_types WHERE alias = ?1"),
                [alias],
                raw_type,
            )
            .optional()?;
        row.map(RawType::decode).transpose()
    }

    /// Smallest unused id above every stored one.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub fn next_id(&self) -> Result<i64> {
        let max: Option<i64> =
            self.conn
                .query_row("SELECT MAX(type_id) FROM content_types", [], |row| row.get(0))?;
        Ok(max.unwrap_or(0) + 1)
    }
}

struct RawType {
    id: i64,
    alias: String,
    varies_by_culture: bool,
    definition_json: String,
}

impl RawType {
    fn decode(self) -> Result<ContentType> {
        let definition: Definition = serde_json::from_str(&self.definition_json)?;
        Ok(ContentType {
            id: self.id,
            alias: self.alias,
            varies_by_culture: self.varies_by_culture,
            property_types: definition.property_types,
            element_groups: definition.element_groups,
        })
    }
}

fn raw_type(row: &Row<'_>) -> rusqlite::Result<RawType> {
    Ok(RawType {
        id: row.get(0)?,
        alias: row.get(1)?,
        varies_by_culture: row.get(2)?,
        definition_json: row.get(3)?,
    })
}

fn definition_json(content_type: &ContentType) -> Result<String> {
    Ok(serde_json::to_string(&Definition {
        property_types: content_type.property_types.clone(),
        element_groups: content_type.element_groups.clone(),
    })?)
}

impl Repository<i64, ContentType> for SqliteContentTypeRepository<'_> {
    const ENTITY: &'static str = "content type";
    type Query = ContentTypeFilter;

    fn create(&self, content_type: &mut ContentType) -> Result<i64> {
        if self.exists(content_type.id)? {
            return Err(VellumError::AlreadyExists {
                entity: Self::ENTITY,
                id: content_type.id.to_string(),
            });
        }
        if self.find_by_alias(&content_type.alias)?.is_some() {
            return Err(VellumError::AlreadyExists {
                entity: Self::ENTITY,
                id: content_type.alias.clone(),
            });
        }

        self.conn.execute(
            "INSERT INTO content_types (type_id, alias, varies_by_culture, definition_json, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                content_type.id,
                content_type.alias,
                content_type.varies_by_culture,
                definition_json(content_type)?,
                to_micros(Utc::now()),
            ],
        )?;
        debug!(type_id = content_type.id, alias = %content_type.alias, "created content type");
        Ok(content_type.id)
    }

    fn find(&self, id: i64) -> Result<Option<ContentType>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TYPE_COLUMNS} FROM content_types WHERE type_id = ?1"),
                [id],
                raw_type,
            )
            .optional()?;
        row.map(RawType::decode).transpose()
    }

    fn update(&self, content_type: &mut ContentType) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE content_types SET alias = ?2, varies_by_culture = ?3, definition_json = ?4
             WHERE type_id = ?1",
            params![
                content_type.id,
                content_type.alias,
                content_type.varies_by_culture,
                definition_json(content_type)?,
            ],
        )?;
        if changed == 0 {
            return Err(VellumError::not_found(Self::ENTITY, content_type.id));
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM content_types WHERE type_id = ?1", [id])?;
        if changed == 0 {
            return Err(VellumError::not_found(Self::ENTITY, id));
        }
        Ok(())
    }

    fn query(&self, filter: &ContentTypeFilter) -> Result<Vec<ContentType>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref alias) = filter.alias {
            param_values.push(Box::new(alias.clone()));
            conditions.push(format!("alias = ?{}", param_values.len()));
        }
        if let Some(varies) = filter.varies_by_culture {
            param_values.push(Box::new(varies));
            conditions.push(format!("varies_by_culture = ?{}", param_values.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let sql = format!("SELECT {TYPE_COLUMNS} FROM content_types{where_clause} ORDER BY type_id");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(AsRef::as_ref).collect();
        let rows = stmt
            .query_map(params_from_iter(params_ref), raw_type)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawType::decode).collect()
    }
}

impl ContentTypeResolver for SqliteContentTypeRepository<'_> {
    fn resolve(&self, id: i64) -> Result<Option<ContentType>> {
        self.find(id)
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentTypeFilter, SqliteContentTypeRepository};
    use crate::db::open_store_in_memory;
    use crate::db::repository::Repository;
    use crate::error::ErrorCode;
    use crate::model::content_type::{ContentType, ContentTypeResolver};

    fn article() -> ContentType {
        ContentType::new(1, "article")
            .varying_by_culture()
            .with_property("title", true)
            .with_element_group("blocks")
    }

    #[test]
    fn create_find_and_resolve() {
        let conn = open_store_in_memory().unwrap();
        let repo = SqliteContentTypeRepository::new(&conn);
        let mut ty = article();
        assert_eq!(repo.create(&mut ty).unwrap(), 1);

        assert_eq!(repo.get(1).unwrap(), ty);
        assert_eq!(repo.resolve(1).unwrap(), Some(ty.clone()));
        assert_eq!(repo.find_by_alias("article").unwrap(), Some(ty));
        assert!(repo.resolve(2).unwrap().is_none());
        assert_eq!(repo.next_id().unwrap(), 2);
    }

    #[test]
    fn duplicate_id_or_alias_is_rejected() {
        let conn = open_store_in_memory().unwrap();
        let repo = SqliteContentTypeRepository::new(&conn);
        repo.create(&mut article()).unwrap();

        let err = repo.create(&mut article()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateEntity);
        let mut same_alias = ContentType::new(2, "article");
        assert_eq!(
            repo.create(&mut same_alias).unwrap_err().code(),
            ErrorCode::DuplicateEntity
        );
    }

    #[test]
    fn update_query_and_delete() {
        let conn = open_store_in_memory().unwrap();
        let repo = SqliteContentTypeRepository::new(&conn);
        repo.create(&mut article()).unwrap();
        repo.create(&mut ContentType::new(2, "settings")).unwrap();

        let mut ty = repo.get(2).unwrap();
        ty.property_types.push(crate::model::content_type::PropertyType {
            alias: "theme".into(),
            varies_by_culture: false,
        });
        repo.update(&mut ty).unwrap();
        assert!(repo.get(2).unwrap().property_type("theme").is_some());

        let varying = repo
            .query(&ContentTypeFilter {
                varies_by_culture: Some(true),
                ..ContentTypeFilter::default()
            })
            .unwrap();
        assert_eq!(varying.len(), 1);
        assert_eq!(varying[0].alias, "article");

        repo.delete(2).unwrap();
        assert!(repo.delete(2).unwrap_err().is_not_found());
        assert!(repo.update(&mut ty).unwrap_err().is_not_found());
    }
}
