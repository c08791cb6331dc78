//! Per-culture variant records and dirty tracking.
//!
//! A [`VariantStore`] maps each [`Culture`] (or the invariant key) to a
//! [`Variant`]. A variant *exists* once it has a name; until then a record
//! may still hold property values but reports [`PublicationState::NotCreated`].
//!
//! Dirty aliases accumulate on every [`VariantStore::set_value`] and are only
//! cleared by [`VariantStore::reset_dirty`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::{fmt, str::FromStr};

use super::culture::Culture;
use super::{ParseEnumError, normalize};
use crate::error::{Result, VellumError};

/// Publication lifecycle of one culture variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PublicationState {
    #[default]
    NotCreated,
    Draft,
    Published,
    PublishedPendingChanges,
}

impl PublicationState {
    pub const ALL: [Self; 4] = [
        Self::NotCreated,
        Self::Draft,
        Self::Published,
        Self::PublishedPendingChanges,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotCreated => "NotCreated",
            Self::Draft => "Draft",
            Self::Published => "Published",
            Self::PublishedPendingChanges => "PublishedPendingChanges",
        }
    }

    /// Whether the variant has been created (has a name).
    #[must_use]
    pub const fn exists(self) -> bool {
        !matches!(self, Self::NotCreated)
    }

    #[must_use]
    pub const fn is_published(self) -> bool {
        matches!(self, Self::Published | Self::PublishedPendingChanges)
    }

    /// Validate whether a transition from self to `target` is allowed.
    ///
    /// Valid transitions:
    /// - `NotCreated -> Draft` (name set)
    /// - `Draft -> Published`
    /// - `Published -> PublishedPendingChanges` (edits saved)
    /// - `PublishedPendingChanges -> Published`
    /// - `Published | PublishedPendingChanges -> Draft` (unpublish)
    /// - `Draft | Published | PublishedPendingChanges -> NotCreated` (name removed)
    pub fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        if self == target {
            return Err(InvalidTransition {
                from: self,
                to: target,
                reason: "no-op transition is not allowed",
            });
        }

        let allowed = matches!(
            (self, target),
            (Self::NotCreated, Self::Draft)
                | (Self::Draft, Self::Published)
                | (Self::Published, Self::PublishedPendingChanges)
                | (Self::PublishedPendingChanges, Self::Published)
                | (Self::Published | Self::PublishedPendingChanges, Self::Draft)
                | (
                    Self::Draft | Self::Published | Self::PublishedPendingChanges,
                    Self::NotCreated
                )
        );

        if allowed {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self,
                to: target,
                reason: "transition not allowed by publication rules",
            })
        }
    }
}

impl fmt::Display for PublicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicationState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "notcreated" => Ok(Self::NotCreated),
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "publishedpendingchanges" => Ok(Self::PublishedPendingChanges),
            _ => Err(ParseEnumError {
                expected: "publication state",
                got: s.to_string(),
            }),
        }
    }
}

/// Error returned when a publication state transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: PublicationState,
    pub to: PublicationState,
    pub reason: &'static str,
}

/// One culture's name, property values and publication state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Variant {
    name: Option<String>,
    #[serde(default)]
    values: BTreeMap<String, Value>,
    #[serde(default)]
    state: PublicationState,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    dirty: BTreeSet<String>,
    /// Dirty aliases already carried by the latest publish.
    #[serde(skip)]
    published_edits: BTreeSet<String>,
}

impl Variant {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn state(&self) -> PublicationState {
        self.state
    }

    #[must_use]
    pub fn value(&self, alias: &str) -> Option<&Value> {
        self.values.get(alias)
    }

    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Aliases edited since the last reset.
    #[must_use]
    pub const fn dirty_properties(&self) -> &BTreeSet<String> {
        &self.dirty
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Dirty aliases that no publish has picked up yet.
    #[must_use]
    pub fn has_unpublished_edits(&self) -> bool {
        self.dirty.iter().any(|alias| !self.published_edits.contains(alias))
    }
}

/// Outcome of [`VariantStore::set_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameChange {
    /// The culture had no variant; it is now a `Draft`.
    Created,
    Renamed,
    Unchanged,
    /// The name was removed; values remain on a `NotCreated` record.
    Cleared,
    /// The name was removed and the empty record dropped.
    Removed,
    /// Blank name for a culture that had no name to remove.
    Ignored,
}

/// A persisted variant row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VariantRecord {
    pub culture: Culture,
    pub name: Option<String>,
    pub state: PublicationState,
    pub values: BTreeMap<String, Value>,
}

/// Culture → variant map, plus nested element groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariantStore {
    #[serde(default)]
    variants: BTreeMap<Culture, Variant>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    groups: BTreeMap<String, VariantStore>,
}

impl VariantStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, culture: &Culture) -> Option<&Variant> {
        self.variants.get(culture)
    }

    /// Publication state for `culture`; absent records are `NotCreated`.
    #[must_use]
    pub fn state(&self, culture: &Culture) -> PublicationState {
        self.variants
            .get(culture)
            .map_or(PublicationState::NotCreated, Variant::state)
    }

    #[must_use]
    pub fn name(&self, culture: &Culture) -> Option<&str> {
        self.variants.get(culture).and_then(Variant::name)
    }

    #[must_use]
    pub fn value(&self, culture: &Culture, alias: &str) -> Option<&Value> {
        self.variants.get(culture).and_then(|v| v.value(alias))
    }

    /// Every record, including value-only `NotCreated` ones.
    pub fn iter(&self) -> impl Iterator<Item = (&Culture, &Variant)> {
        self.variants.iter()
    }

    /// Cultures whose variant exists (has been named).
    pub fn cultures(&self) -> impl Iterator<Item = &Culture> {
        self.variants
            .iter()
            .filter(|(_, v)| v.state.exists())
            .map(|(c, _)| c)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty() && self.groups.is_empty()
    }

    #[must_use]
    pub fn group(&self, alias: &str) -> Option<&Self> {
        self.groups.get(alias)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &Self)> {
        self.groups.iter()
    }

    /// Upsert or clear the name of `culture`.
    ///
    /// A blank name removes the name and drops the variant back to
    /// `NotCreated`; the record itself goes away once it holds no values.
    pub fn set_name(&mut self, culture: &Culture, name: &str) -> NameChange {
        let name = name.trim();
        if name.is_empty() {
            return self.clear_name(culture);
        }

        let variant = self.variants.entry(culture.clone()).or_default();
        if variant.state == PublicationState::NotCreated {
            variant.name = Some(name.to_string());
            variant.state = PublicationState::Draft;
            return NameChange::Created;
        }

        if variant.name.as_deref() == Some(name) {
            NameChange::Unchanged
        } else {
            variant.name = Some(name.to_string());
            NameChange::Renamed
        }
    }

    fn clear_name(&mut self, culture: &Culture) -> NameChange {
        let Some(variant) = self.variants.get_mut(culture) else {
            return NameChange::Ignored;
        };
        if variant.name.is_none() && !variant.state.exists() {
            return NameChange::Ignored;
        }

        variant.name = None;
        variant.state = PublicationState::NotCreated;
        if variant.values.is_empty() {
            self.variants.remove(culture);
            NameChange::Removed
        } else {
            NameChange::Cleared
        }
    }

    /// Upsert a property value and mark `alias` dirty for `culture`.
    ///
    /// Never changes the publication state.
    pub fn set_value(&mut self, culture: &Culture, alias: &str, value: Value) {
        let variant = self.variants.entry(culture.clone()).or_default();
        variant.values.insert(alias.to_string(), value);
        variant.dirty.insert(alias.to_string());
        variant.published_edits.remove(alias);
    }

    /// Mutable access to a nested element group, created on first use.
    pub fn group_mut(&mut self, alias: &str) -> &mut Self {
        self.groups.entry(alias.to_string()).or_default()
    }

    /// Clear the dirty set of every culture; `recursive` also resets nested
    /// element groups.
    pub fn reset_dirty(&mut self, recursive: bool) {
        for variant in self.variants.values_mut() {
            variant.dirty.clear();
            variant.published_edits.clear();
        }
        if recursive {
            for group in self.groups.values_mut() {
                group.reset_dirty(true);
            }
        }
    }

    /// Dirty aliases for `culture` (empty when the record is absent).
    pub fn dirty_properties(&self, culture: &Culture) -> impl Iterator<Item = &str> {
        self.variants
            .get(culture)
            .into_iter()
            .flat_map(|v| v.dirty.iter().map(String::as_str))
    }

    #[must_use]
    pub fn is_culture_dirty(&self, culture: &Culture) -> bool {
        self.variants.get(culture).is_some_and(Variant::is_dirty)
    }

    /// Whether `culture` holds edits that have not been published.
    #[must_use]
    pub fn has_unpublished_edits(&self, culture: &Culture) -> bool {
        self.variants.get(culture).is_some_and(Variant::has_unpublished_edits)
    }

    /// Any culture dirty, at this level or in any nested group.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.variants.values().any(Variant::is_dirty) || self.groups.values().any(Self::is_dirty)
    }

    /// Move `culture` to `target`, validating the lifecycle rules.
    ///
    /// # Errors
    ///
    /// Returns [`VellumError::InvalidTransition`] when the rules forbid it.
    pub fn transition(&mut self, culture: &Culture, target: PublicationState) -> Result<()> {
        let from = self.state(culture);
        let invalid = || VellumError::InvalidTransition {
            culture: culture.clone(),
            from,
            to: target,
        };
        // Only naming a culture may create it.
        if from == PublicationState::NotCreated {
            return Err(invalid());
        }
        from.can_transition_to(target).map_err(|_| invalid())?;

        if target == PublicationState::NotCreated {
            self.clear_name(culture);
        } else if let Some(variant) = self.variants.get_mut(culture) {
            variant.state = target;
            variant.published_edits = if target == PublicationState::Published {
                variant.dirty.clone()
            } else {
                BTreeSet::new()
            };
        }
        Ok(())
    }

    /// Publish `culture`, carrying its current edits.
    ///
    /// Re-publishing a `Published` variant only picks up the edits made
    /// since the previous publish.
    ///
    /// # Errors
    ///
    /// Returns [`VellumError::InvalidTransition`] when the variant does not
    /// exist.
    pub fn publish(&mut self, culture: &Culture) -> Result<()> {
        if self.state(culture) != PublicationState::Published {
            return self.transition(culture, PublicationState::Published);
        }
        if let Some(variant) = self.variants.get_mut(culture) {
            variant.published_edits.clone_from(&variant.dirty);
        }
        Ok(())
    }

    /// Flag every published variant holding edits no publish has carried as
    /// `PublishedPendingChanges`. Returns the cultures that changed.
    pub fn commit_edits(&mut self) -> Vec<Culture> {
        let mut changed = Vec::new();
        for (culture, variant) in &mut self.variants {
            if variant.state == PublicationState::Published && variant.has_unpublished_edits() {
                variant.state = PublicationState::PublishedPendingChanges;
                changed.push(culture.clone());
            }
        }
        changed
    }

    /// Rebuild a store from persisted records; dirty sets start empty.
    pub(crate) fn restore(
        records: impl IntoIterator<Item = VariantRecord>,
        groups: BTreeMap<String, Self>,
    ) -> Self {
        let variants = records
            .into_iter()
            .map(|record| {
                (
                    record.culture,
                    Variant {
                        name: record.name,
                        values: record.values,
                        state: record.state,
                        dirty: BTreeSet::new(),
                        published_edits: BTreeSet::new(),
                    },
                )
            })
            .collect();
        Self { variants, groups }
    }
}
