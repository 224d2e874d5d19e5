//! Seam to the external user service.
//!
//! Registration, authentication and profile editing live in a separate
//! service; the chat subsystem only ever needs "who is this id" lookups,
//! expressed by [`UserDirectory`].  The store-backed implementation reads
//! the local `profiles` cache.

use retrouve_shared::types::UserId;
use retrouve_store::{Database, Profile, StoreError};

use crate::error::Result;

/// Lookup interface for user display data.
pub trait UserDirectory {
    /// Resolve a single user, `None` when unknown.
    fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>>;

    /// Resolve a set of users; unknown ids are absent from the result.
    fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<Profile>>;
}

impl UserDirectory for Database {
    fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>> {
        match self.get_profile(id) {
            Ok(profile) => Ok(Some(profile)),
            Err(StoreError::NotFound) => Ok(None),
            Err(other) => Err(other.into()),
        }
    }

    fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<Profile>> {
        Ok(self.get_profiles(ids)?)
    }
}
