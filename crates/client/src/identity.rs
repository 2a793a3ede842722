//! Persisted guest identity.
//!
//! Without authentication, each client invents a user id on first use and
//! keeps it in local storage so its cart follows it across runs.

use chrono::Utc;
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use shopcart_core::UserId;

use crate::storage::{KeyValueStore, StorageError};

/// Storage key of the persisted user id.
pub const USER_ID_KEY: &str = "userId";

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a synthetic user id: `user_<unix-millis>_<9 base36 chars>`.
#[must_use]
pub fn generate_user_id() -> UserId {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .filter_map(|_| BASE36.choose(&mut rng).copied().map(char::from))
        .collect();
    let raw = format!("user_{}_{suffix}", Utc::now().timestamp_millis());

    // Always well formed: short, no whitespace, no control characters.
    UserId::parse(&raw).unwrap_or_else(|_| UserId::guest())
}

/// The persisted user id, generating and storing one on first use.
///
/// A stored value that is no longer a valid user id is replaced.
///
/// # Errors
///
/// Returns `StorageError` if the storage cannot be read or written.
pub fn load_or_create(storage: &dyn KeyValueStore) -> Result<UserId, StorageError> {
    if let Some(raw) = storage.get(USER_ID_KEY)? {
        match UserId::parse(&raw) {
            Ok(user_id) => return Ok(user_id),
            Err(e) => warn!(error = %e, "Stored user id is invalid, generating a new one"),
        }
    }

    let user_id = generate_user_id();
    storage.set(USER_ID_KEY, user_id.as_str())?;
    info!(user_id = %user_id, "Generated user id");
    Ok(user_id)
}
