use actix_identity::Identity;
use actix_session::Session;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::structs::{BusinessSettings, FlashMessage};

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(provided: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(provided.as_bytes(), &parsed)
        .is_ok()
}

/// Resolves the identity cookie to a user id. Absent or stale identities
/// resolve to `None`, which handlers turn into a redirect to /login.
pub fn identity_user_id(identity: Option<&Identity>) -> Option<i64> {
    identity
        .and_then(|id| id.id().ok())
        .and_then(|raw| raw.parse().ok())
}

const FLASH_KEY: &str = "flash";
const SETTINGS_KEY: &str = "settings";

/// Queues a one-shot message for the next rendered page.
pub fn flash(session: &Session, level: &str, message: &str) {
    let msg = FlashMessage {
        level: level.to_owned(),
        message: message.to_owned(),
    };
    if let Err(e) = session.insert(FLASH_KEY, msg) {
        log::warn!("Failed to store flash message: {}", e);
    }
}

/// Removes and returns the pending flash message, if any.
pub fn take_flash(session: &Session) -> Option<FlashMessage> {
    let msg = session.get::<FlashMessage>(FLASH_KEY).ok().flatten()?;
    session.remove(FLASH_KEY);
    Some(msg)
}

pub fn business_settings(session: &Session) -> BusinessSettings {
    session
        .get::<BusinessSettings>(SETTINGS_KEY)
        .ok()
        .flatten()
        .unwrap_or_default()
}

pub fn store_business_settings(session: &Session, settings: &BusinessSettings) {
    if let Err(e) = session.insert(SETTINGS_KEY, settings) {
        log::warn!("Failed to store business settings: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("hunter2hunter2!").unwrap();
        assert_ne!(hash, "hunter2hunter2!");
        assert!(verify_password("hunter2hunter2!", &hash));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let hash = hash_password("correct horse").unwrap();
        assert!(!verify_password("battery staple", &hash));
    }

    #[test]
    fn garbage_hash_is_rejected() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
