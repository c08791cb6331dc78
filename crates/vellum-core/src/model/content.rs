//! Content items: identity, hierarchy, audit fields and culture variants.
//!
//! Items are constructed from a [`ContentSettings`] value whose fields are all
//! optional; [`ContentItem::build`] fills defaults, resolves the content type
//! and validates the hierarchy before any variant is touched.
//!
//! The item exclusively owns its [`VariantStore`]. Callers read it through
//! [`ContentItem::variants`] and mutate only through the item's own methods,
//! which also keep `update_date` moving forward.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use uuid::Uuid;

use super::content_type::{ContentType, ContentTypeResolver};
use super::culture::Culture;
use super::variant::{NameChange, PublicationState, VariantStore};
use crate::error::{Result, VellumError};
use crate::publish::VariantSnapshot;

/// Parent id of top-level items; also the first segment of every path.
pub const ROOT_ID: i64 = -1;

/// Either a content-type id to resolve, or an already-resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTypeRef {
    Id(i64),
    Type(ContentType),
}

impl From<i64> for ContentTypeRef {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<ContentType> for ContentTypeRef {
    fn from(content_type: ContentType) -> Self {
        Self::Type(content_type)
    }
}

/// One (alias, value) pair to seed during construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyData {
    pub alias: String,
    pub value: Value,
    pub culture: Option<Culture>,
}

impl PropertyData {
    pub fn new(alias: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            alias: alias.into(),
            value: value.into(),
            culture: None,
        }
    }

    pub fn for_culture(alias: impl Into<String>, value: impl Into<Value>, culture: Culture) -> Self {
        Self {
            alias: alias.into(),
            value: value.into(),
            culture: Some(culture),
        }
    }
}

/// Construction parameters; every field is independently optional.
#[derive(Debug, Clone, Default)]
pub struct ContentSettings {
    pub content_type: Option<ContentTypeRef>,
    pub id: Option<i64>,
    pub key: Option<Uuid>,
    pub parent_id: Option<i64>,
    /// Initial name, applied to `culture` (or the invariant key).
    pub name: Option<String>,
    pub culture: Option<Culture>,
    pub creator_id: Option<i64>,
    pub create_date: Option<DateTime<Utc>>,
    pub update_date: Option<DateTime<Utc>>,
    pub level: Option<u32>,
    pub path: Option<String>,
    pub sort_order: Option<u32>,
    pub trashed: Option<bool>,
    pub culture_names: BTreeMap<Culture, String>,
    pub property_data: Vec<PropertyData>,
}

impl ContentSettings {
    pub fn new(content_type: impl Into<ContentTypeRef>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }
}

/// Structural fields tracked by the entity-level dirty set.
pub mod fields {
    pub const PARENT_ID: &str = "parentId";
    pub const PATH: &str = "path";
    pub const LEVEL: &str = "level";
    pub const SORT_ORDER: &str = "sortOrder";
    pub const TRASHED: &str = "trashed";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    id: i64,
    key: Uuid,
    parent_id: i64,
    path: String,
    level: u32,
    sort_order: u32,
    creator_id: i64,
    create_date: DateTime<Utc>,
    update_date: DateTime<Utc>,
    trashed: bool,
    content_type: ContentType,
    variants: VariantStore,
    #[serde(skip)]
    edited: BTreeSet<&'static str>,
}

/// Row-level fields of a persisted item.
#[derive(Debug, Clone)]
pub(crate) struct ContentRecord {
    pub id: i64,
    pub key: Uuid,
    pub parent_id: i64,
    pub path: String,
    pub level: u32,
    pub sort_order: u32,
    pub creator_id: i64,
    pub create_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
    pub trashed: bool,
}

impl ContentItem {
    /// Construct an item from `settings`, resolving its content type first.
    ///
    /// Defaults: id `1`, a fresh key, parent [`ROOT_ID`], dates now, a fresh
    /// uuid as name, creator `1`, path `-1,{id}`, level from the path, sort
    /// order `0`, not trashed. Culture names are applied, then property
    /// data; seeded property data is not reported as dirty.
    ///
    /// # Errors
    ///
    /// - [`VellumError::InvalidState`] when no content type is given or it
    ///   cannot be resolved, or when path/level break the hierarchy rules.
    /// - Variation/property errors from seeding names and values.
    pub fn build<R>(settings: ContentSettings, resolver: &R) -> Result<Self>
    where
        R: ContentTypeResolver + ?Sized,
    {
        let content_type = match settings.content_type {
            None => {
                return Err(VellumError::missing_content_type(
                    "a content item cannot be constructed without a content type",
                ));
            }
            Some(ContentTypeRef::Type(content_type)) => content_type,
            Some(ContentTypeRef::Id(type_id)) => resolver.resolve(type_id)?.ok_or_else(|| {
                VellumError::missing_content_type(format!(
                    "content type {type_id} could not be resolved"
                ))
            })?,
        };

        let id = settings.id.unwrap_or(1);
        let parent_id = settings.parent_id.unwrap_or(ROOT_ID);
        let path = match settings.path {
            Some(path) => path,
            None if parent_id == ROOT_ID => format!("{ROOT_ID},{id}"),
            None => {
                return Err(VellumError::invalid_hierarchy(format!(
                    "item {id} under parent {parent_id} needs an explicit path"
                )));
            }
        };
        let depth = path_depth(&path)?;
        let level = settings.level.unwrap_or(depth);
        validate_hierarchy(id, parent_id, &path, level)?;

        let now = Utc::now();
        let create_date = settings.create_date.unwrap_or(now);
        let update_date = settings.update_date.unwrap_or(now).max(create_date);

        let mut item = Self {
            id,
            key: settings.key.unwrap_or_else(Uuid::new_v4),
            parent_id,
            path,
            level,
            sort_order: settings.sort_order.unwrap_or(0),
            creator_id: settings.creator_id.unwrap_or(1),
            create_date,
            update_date,
            trashed: settings.trashed.unwrap_or(false),
            content_type,
            variants: VariantStore::new(),
            edited: BTreeSet::new(),
        };

        let name = settings
            .name
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        match (&settings.culture, item.content_type.varies_by_culture) {
            (Some(culture), _) => {
                item.set_culture_name(culture, &name)?;
            }
            (None, false) => {
                item.set_name(&name)?;
            }
            // Culture-variant items are named through `culture_names`.
            (None, true) => {}
        }

        for (culture, name) in &settings.culture_names {
            item.set_culture_name(culture, name)?;
        }

        if !settings.property_data.is_empty() {
            for data in settings.property_data {
                item.set_value(&data.alias, data.value, data.culture.as_ref())?;
            }
            item.reset_dirty_properties(false);
        }

        item.edited.clear();
        // Seeding goes through the mutators; keep the supplied audit date.
        item.update_date = update_date;
        debug!(
            content_id = item.id,
            content_type = %item.content_type.alias,
            "constructed content item"
        );
        Ok(item)
    }

    pub(crate) fn restore(
        record: ContentRecord,
        content_type: ContentType,
        variants: VariantStore,
    ) -> Self {
        Self {
            id: record.id,
            key: record.key,
            parent_id: record.parent_id,
            path: record.path,
            level: record.level,
            sort_order: record.sort_order,
            creator_id: record.creator_id,
            create_date: record.create_date,
            update_date: record.update_date,
            trashed: record.trashed,
            content_type,
            variants,
            edited: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub const fn key(&self) -> Uuid {
        self.key
    }

    #[must_use]
    pub const fn parent_id(&self) -> i64 {
        self.parent_id
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub const fn sort_order(&self) -> u32 {
        self.sort_order
    }

    #[must_use]
    pub const fn creator_id(&self) -> i64 {
        self.creator_id
    }

    #[must_use]
    pub const fn create_date(&self) -> DateTime<Utc> {
        self.create_date
    }

    #[must_use]
    pub const fn update_date(&self) -> DateTime<Utc> {
        self.update_date
    }

    #[must_use]
    pub const fn trashed(&self) -> bool {
        self.trashed
    }

    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    #[must_use]
    pub const fn variants(&self) -> &VariantStore {
        &self.variants
    }

    /// Name of `culture`, or the invariant name when `culture` is `None`.
    #[must_use]
    pub fn name(&self, culture: Option<&Culture>) -> Option<&str> {
        let key = culture.cloned().unwrap_or_else(Culture::invariant);
        self.variants.name(&key)
    }

    /// Value of `alias` for `culture`; `None` for unknown aliases too.
    #[must_use]
    pub fn value(&self, alias: &str, culture: Option<&Culture>) -> Option<&Value> {
        let key = self.content_type.value_key(alias, culture).ok()?;
        self.variants.value(&key, alias)
    }

    /// Publication state of `culture` (or the invariant variant).
    #[must_use]
    pub fn publication_state(&self, culture: Option<&Culture>) -> PublicationState {
        self.variant_key(culture)
            .map_or(PublicationState::NotCreated, |key| self.variants.state(&key))
    }

    /// Set or clear the name of one culture.
    ///
    /// # Errors
    ///
    /// [`VellumError::UnsupportedVariation`] when the content type does not
    /// vary by culture.
    pub fn set_culture_name(&mut self, culture: &Culture, name: &str) -> Result<NameChange> {
        let key = self.variant_key(Some(culture))?;
        let change = self.variants.set_name(&key, name);
        self.touch();
        debug!(content_id = self.id, culture = %key, ?change, "set culture name");
        Ok(change)
    }

    /// Set or clear the name of an invariant item.
    ///
    /// # Errors
    ///
    /// [`VellumError::UnsupportedVariation`] when the content type varies by
    /// culture; use [`set_culture_name`](Self::set_culture_name) instead.
    pub fn set_name(&mut self, name: &str) -> Result<NameChange> {
        let key = self.variant_key(None)?;
        let change = self.variants.set_name(&key, name);
        self.touch();
        debug!(content_id = self.id, ?change, "set name");
        Ok(change)
    }

    /// Upsert a property value and mark it dirty for its culture.
    ///
    /// # Errors
    ///
    /// [`VellumError::UnknownProperty`] or
    /// [`VellumError::UnsupportedVariation`] from the content type.
    pub fn set_value(
        &mut self,
        alias: &str,
        value: impl Into<Value>,
        culture: Option<&Culture>,
    ) -> Result<()> {
        let key = self.content_type.value_key(alias, culture)?;
        self.variants.set_value(&key, alias, value.into());
        self.touch();
        debug!(content_id = self.id, culture = %key, alias, "set value");
        Ok(())
    }

    /// Upsert a value inside a nested element group.
    ///
    /// # Errors
    ///
    /// [`VellumError::UnknownProperty`] for an undeclared group, or
    /// [`VellumError::UnsupportedVariation`].
    pub fn set_group_value(
        &mut self,
        group: &str,
        alias: &str,
        value: impl Into<Value>,
        culture: Option<&Culture>,
    ) -> Result<()> {
        let key = self.content_type.group_value_key(group, culture)?;
        self.variants.group_mut(group).set_value(&key, alias, value.into());
        self.touch();
        Ok(())
    }

    /// Clear all dirty tracking; `recursive` also resets nested groups.
    pub fn reset_dirty_properties(&mut self, recursive: bool) {
        self.variants.reset_dirty(recursive);
        self.edited.clear();
    }

    /// Structural fields changed since the last reset.
    pub fn edited_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.edited.iter().copied()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.variants.is_dirty() || !self.edited.is_empty()
    }

    /// Mark `culture` (or the invariant variant) as published.
    ///
    /// The variant's pending edits count as published, so a later save keeps
    /// it `Published` unless it is edited again.
    ///
    /// # Errors
    ///
    /// [`VellumError::InvalidTransition`] when the variant does not exist.
    pub fn publish_culture(&mut self, culture: Option<&Culture>) -> Result<()> {
        let key = self.variant_key(culture)?;
        self.variants.publish(&key)?;
        self.touch();
        debug!(content_id = self.id, culture = %key, "published");
        Ok(())
    }

    /// Take `culture` (or the invariant variant) back to `Draft`.
    ///
    /// # Errors
    ///
    /// [`VellumError::InvalidTransition`] unless the variant is published.
    pub fn unpublish_culture(&mut self, culture: Option<&Culture>) -> Result<()> {
        let key = self.variant_key(culture)?;
        self.variants.transition(&key, PublicationState::Draft)?;
        self.touch();
        debug!(content_id = self.id, culture = %key, "unpublished");
        Ok(())
    }

    /// Flag published variants with unsaved edits as pending changes.
    pub fn commit_edits(&mut self) -> Vec<Culture> {
        let changed = self.variants.commit_edits();
        if !changed.is_empty() {
            self.touch();
        }
        changed
    }

    /// Re-parent under `parent`, recomputing path and level.
    ///
    /// # Errors
    ///
    /// [`VellumError::InvalidState`] when `parent` is this item or one of
    /// its descendants.
    pub fn move_to(&mut self, parent: &Self, sort_order: u32) -> Result<()> {
        let own = self.id.to_string();
        if parent.id == self.id || parent.path.split(',').any(|segment| segment == own) {
            return Err(VellumError::invalid_hierarchy(format!(
                "cannot move item {} under its own descendant {}",
                self.id, parent.id
            )));
        }
        self.place(parent.id, format!("{},{}", parent.path, self.id), parent.level + 1, sort_order);
        Ok(())
    }

    pub fn move_to_root(&mut self, sort_order: u32) {
        self.place(ROOT_ID, format!("{ROOT_ID},{}", self.id), 1, sort_order);
    }

    fn place(&mut self, parent_id: i64, path: String, level: u32, sort_order: u32) {
        if self.parent_id != parent_id {
            self.parent_id = parent_id;
            self.edited.insert(fields::PARENT_ID);
        }
        if self.path != path {
            self.path = path;
            self.edited.insert(fields::PATH);
        }
        if self.level != level {
            self.level = level;
            self.edited.insert(fields::LEVEL);
        }
        if self.sort_order != sort_order {
            self.sort_order = sort_order;
            self.edited.insert(fields::SORT_ORDER);
        }
        self.touch();
        debug!(content_id = self.id, parent_id, path = %self.path, "moved");
    }

    pub fn trash(&mut self) {
        self.set_trashed(true);
    }

    pub fn restore_from_trash(&mut self) {
        self.set_trashed(false);
    }

    fn set_trashed(&mut self, trashed: bool) {
        if self.trashed != trashed {
            self.trashed = trashed;
            self.edited.insert(fields::TRASHED);
            self.touch();
        }
    }

    /// Point-in-time view of the variants for the send-to-publish workflow.
    ///
    /// Culture-variant items get one snapshot per entry of `languages` (or
    /// per existing culture when `languages` is empty); invariant items get
    /// a single, always active, invariant snapshot. Pair with
    /// [`Self::editing_culture`] when computing eligibility. Edits to shared invariant values count
    /// as dirty for every culture.
    #[must_use]
    pub fn variant_snapshots(
        &self,
        languages: &[Culture],
        active: Option<&Culture>,
    ) -> Vec<VariantSnapshot> {
        let invariant = Culture::invariant();
        if !self.content_type.varies_by_culture {
            // The invariant variant is the one being edited, whatever the
            // caller's culture.
            let mut snapshot = self.snapshot(&invariant, false);
            snapshot.active = true;
            return vec![snapshot];
        }

        let shared_dirty = self.variants.is_culture_dirty(&invariant);
        let cultures: Vec<Culture> = if languages.is_empty() {
            self.variants.cultures().cloned().collect()
        } else {
            languages.to_vec()
        };

        cultures
            .iter()
            .map(|culture| {
                let mut snapshot = self.snapshot(culture, shared_dirty);
                snapshot.active = active == Some(culture);
                snapshot
            })
            .collect()
    }

    /// The culture being edited: `active` for culture-variant items, the
    /// invariant key otherwise.
    #[must_use]
    pub fn editing_culture(&self, active: Option<&Culture>) -> Option<Culture> {
        if self.content_type.varies_by_culture {
            active.cloned()
        } else {
            Some(Culture::invariant())
        }
    }

    fn snapshot(&self, culture: &Culture, shared_dirty: bool) -> VariantSnapshot {
        VariantSnapshot {
            culture: culture.clone(),
            name: self.variants.name(culture).map(str::to_string),
            state: self.variants.state(culture),
            is_dirty: shared_dirty || self.variants.has_unpublished_edits(culture),
            active: false,
            send_to_publish: false,
        }
    }

    fn variant_key(&self, culture: Option<&Culture>) -> Result<Culture> {
        let varies = self.content_type.varies_by_culture;
        match culture {
            Some(c) if varies && !c.is_invariant() => Ok(c.clone()),
            None if !varies => Ok(Culture::invariant()),
            Some(c) if !varies && c.is_invariant() => Ok(Culture::invariant()),
            _ => Err(VellumError::UnsupportedVariation {
                alias: self.content_type.alias.clone(),
                culture: culture.cloned(),
            }),
        }
    }

    fn touch(&mut self) {
        self.update_date = self.update_date.max(Utc::now());
    }
}

fn parse_path(path: &str) -> Result<Vec<i64>> {
    path.split(',')
        .map(|segment| {
            segment.trim().parse::<i64>().map_err(|_| {
                VellumError::invalid_hierarchy(format!("path segment '{segment}' is not an id"))
            })
        })
        .collect()
}

fn path_depth(path: &str) -> Result<u32> {
    let segments = parse_path(path)?;
    let below_root = segments.len().saturating_sub(1);
    u32::try_from(below_root)
        .map_err(|_| VellumError::invalid_hierarchy(format!("path '{path}' is too deep")))
}

/// Path starts at the root, ends with `id`, names `parent_id` just before it,
/// and has exactly `level` segments below the root.
fn validate_hierarchy(id: i64, parent_id: i64, path: &str, level: u32) -> Result<()> {
    let segments = parse_path(path)?;
    if segments.first() != Some(&ROOT_ID) {
        return Err(VellumError::invalid_hierarchy(format!(
            "path '{path}' must start with {ROOT_ID}"
        )));
    }
    if segments.len() < 2 || segments.last() != Some(&id) {
        return Err(VellumError::invalid_hierarchy(format!(
            "path '{path}' must end with item id {id}"
        )));
    }
    if segments[segments.len() - 2] != parent_id {
        return Err(VellumError::invalid_hierarchy(format!(
            "path '{path}' does not place item {id} under parent {parent_id}"
        )));
    }
    if usize::try_from(level).ok() != Some(segments.len() - 1) {
        return Err(VellumError::invalid_hierarchy(format!(
            "level {level} does not match path '{path}'"
        )));
    }
    Ok(())
}
