//! Local cache of the external user service.
//!
//! The user service owns registration and identity; this table only mirrors
//! the fields the chat views need (display name, avatar).

use chrono::{SecondsFormat, Utc};
use rusqlite::params;

use retrouve_shared::types::UserId;

use crate::chats::parse_ts;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Profile;

impl Database {
    /// Insert or refresh a cached profile.
    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.conn().execute(
            "INSERT INTO profiles (user_id, full_name, picture_url, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                full_name   = excluded.full_name,
                picture_url = excluded.picture_url,
                updated_at  = excluded.updated_at",
            params![
                profile.user_id.as_str(),
                profile.full_name,
                profile.picture_url,
                profile.updated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single cached profile.
    pub fn get_profile(&self, user_id: &UserId) -> Result<Profile> {
        self.conn()
            .query_row(
                "SELECT user_id, full_name, picture_url, updated_at
                   FROM profiles
                  WHERE user_id = ?1",
                params![user_id.as_str()],
                row_to_profile,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch cached profiles for a set of users.  Unknown ids are simply
    /// absent from the result.
    pub fn get_profiles(&self, user_ids: &[UserId]) -> Result<Vec<Profile>> {
        let mut profiles = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            match self.get_profile(id) {
                Ok(profile) => profiles.push(profile),
                Err(StoreError::NotFound) => {}
                Err(other) => return Err(other),
            }
        }
        Ok(profiles)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Profile`].
fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let user: String = row.get(0)?;
    let full_name: String = row.get(1)?;
    let picture_url: Option<String> = row.get(2)?;
    let updated_str: String = row.get(3)?;

    Ok(Profile {
        user_id: UserId(user),
        full_name,
        picture_url,
        updated_at: parse_ts(&updated_str, 3)?,
    })
}
