//! Generic persistence contract shared by every entity kind.

use crate::error::{Result, VellumError};

/// CRUD plus a typed query over one entity kind.
///
/// Implementations are independent per entity: each picks its id type and
/// its own filter struct. `create` and `update` take the entity mutably so
/// the store can write back assigned ids and normalized fields.
pub trait Repository<Id, Entity> {
    /// Entity name used in `NotFound` errors.
    const ENTITY: &'static str;

    /// Filter accepted by [`query`](Self::query).
    type Query;

    /// Persist a new entity and return its id.
    ///
    /// # Errors
    ///
    /// Storage errors, or a domain error when the entity cannot be stored.
    fn create(&self, entity: &mut Entity) -> Result<Id>;

    /// # Errors
    ///
    /// Storage errors only; a missing id is `Ok(None)`.
    fn find(&self, id: Id) -> Result<Option<Entity>>;

    /// # Errors
    ///
    /// [`VellumError::NotFound`] when no entity has this id.
    fn get(&self, id: Id) -> Result<Entity>
    where
        Id: Copy + std::fmt::Display,
    {
        self.find(id)?
            .ok_or_else(|| VellumError::not_found(Self::ENTITY, id))
    }

    /// # Errors
    ///
    /// [`VellumError::NotFound`] when the entity was never stored.
    fn update(&self, entity: &mut Entity) -> Result<()>;

    /// # Errors
    ///
    /// [`VellumError::NotFound`] when no entity has this id.
    fn delete(&self, id: Id) -> Result<()>;

    /// # Errors
    ///
    /// Storage errors only.
    fn exists(&self, id: Id) -> Result<bool> {
        Ok(self.find(id)?.is_some())
    }

    /// # Errors
    ///
    /// Storage errors only.
    fn query(&self, query: &Self::Query) -> Result<Vec<Entity>>;
}
