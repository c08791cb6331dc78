//! The slice of the content-type schema the core consumes: an identifier,
//! the valid property aliases, and whether things vary by culture.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::culture::Culture;
use crate::error::{Result, VellumError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyType {
    pub alias: String,
    #[serde(default)]
    pub varies_by_culture: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub id: i64,
    pub alias: String,
    #[serde(default)]
    pub varies_by_culture: bool,
    #[serde(default)]
    pub property_types: Vec<PropertyType>,
    /// Aliases of nested element groups carrying their own variants.
    #[serde(default)]
    pub element_groups: Vec<String>,
}

impl ContentType {
    pub fn new(id: i64, alias: impl Into<String>) -> Self {
        Self {
            id,
            alias: alias.into(),
            varies_by_culture: false,
            property_types: Vec::new(),
            element_groups: Vec::new(),
        }
    }

    #[must_use]
    pub const fn varying_by_culture(mut self) -> Self {
        self.varies_by_culture = true;
        self
    }

    #[must_use]
    pub fn with_property(mut self, alias: impl Into<String>, varies_by_culture: bool) -> Self {
        self.property_types.push(PropertyType {
            alias: alias.into(),
            varies_by_culture,
        });
        self
    }

    #[must_use]
    pub fn with_element_group(mut self, alias: impl Into<String>) -> Self {
        self.element_groups.push(alias.into());
        self
    }

    #[must_use]
    pub fn property_type(&self, alias: &str) -> Option<&PropertyType> {
        self.property_types.iter().find(|p| p.alias == alias)
    }

    pub fn property_aliases(&self) -> impl Iterator<Item = &str> {
        self.property_types.iter().map(|p| p.alias.as_str())
    }

    #[must_use]
    pub fn has_element_group(&self, alias: &str) -> bool {
        self.element_groups.iter().any(|g| g == alias)
    }

    /// Map a requested culture onto the key a value of `alias` is stored
    /// under.
    ///
    /// Culture-variant properties (on culture-variant types) need a concrete
    /// culture; everything else lives under the invariant key and rejects an
    /// explicit culture.
    ///
    /// # Errors
    ///
    /// [`VellumError::UnknownProperty`] for aliases the type does not define,
    /// [`VellumError::UnsupportedVariation`] for a culture mismatch.
    pub fn value_key(&self, alias: &str, culture: Option<&Culture>) -> Result<Culture> {
        let property = self
            .property_type(alias)
            .ok_or_else(|| VellumError::UnknownProperty(alias.to_string()))?;
        let varies = self.varies_by_culture && property.varies_by_culture;
        Self::key_for(alias, varies, culture)
    }

    /// Same as [`value_key`](Self::value_key) for a nested element group,
    /// whose own properties are not validated here.
    ///
    /// # Errors
    ///
    /// [`VellumError::UnknownProperty`] for an undeclared group,
    /// [`VellumError::UnsupportedVariation`] for a culture on an invariant type.
    pub fn group_value_key(&self, group: &str, culture: Option<&Culture>) -> Result<Culture> {
        if !self.has_element_group(group) {
            return Err(VellumError::UnknownProperty(group.to_string()));
        }
        match culture {
            Some(c) if !c.is_invariant() && !self.varies_by_culture => {
                Err(VellumError::UnsupportedVariation {
                    alias: group.to_string(),
                    culture: Some(c.clone()),
                })
            }
            Some(c) => Ok(c.clone()),
            None => Ok(Culture::invariant()),
        }
    }

    fn key_for(alias: &str, varies: bool, culture: Option<&Culture>) -> Result<Culture> {
        match (varies, culture) {
            (true, Some(c)) if !c.is_invariant() => Ok(c.clone()),
            (false, None) => Ok(Culture::invariant()),
            (false, Some(c)) if c.is_invariant() => Ok(Culture::invariant()),
            (_, culture) => Err(VellumError::UnsupportedVariation {
                alias: alias.to_string(),
                culture: culture.cloned(),
            }),
        }
    }
}

/// Resolves a content-type identifier into the schema the core needs.
pub trait ContentTypeResolver {
    /// # Errors
    ///
    /// Returns an error if the backing lookup fails. A type that simply does
    /// not exist is `Ok(None)`.
    fn resolve(&self, id: i64) -> Result<Option<ContentType>>;
}

impl ContentTypeResolver for HashMap<i64, ContentType> {
    fn resolve(&self, id: i64) -> Result<Option<ContentType>> {
        Ok(self.get(&id).cloned())
    }
}

impl ContentTypeResolver for BTreeMap<i64, ContentType> {
    fn resolve(&self, id: i64) -> Result<Option<ContentType>> {
        Ok(self.get(&id).cloned())
    }
}

impl ContentTypeResolver for [ContentType] {
    fn resolve(&self, id: i64) -> Result<Option<ContentType>> {
        Ok(self.iter().find(|t| t.id == id).cloned())
    }
}

/// Resolver that knows no types; construction through it always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContentTypes;

impl ContentTypeResolver for NoContentTypes {
    fn resolve(&self, _id: i64) -> Result<Option<ContentType>> {
        Ok(None)
    }
}
