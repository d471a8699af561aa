use super::{random_timestamp, SeedError};
use crate::config::USERS;
use crate::store::{Row, Store};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use std::collections::HashSet;

const MAX_EMAIL_ATTEMPTS: usize = 1000;

/// Delete every user, then insert `count` fresh ones. Returns the number inserted.
///
/// Fails if posts still reference existing users; `run_seeds` clears posts first.
pub async fn seed_users(store: &dyn Store, rng: &mut ChaCha8Rng, count: usize) -> Result<u64, SeedError> {
    store.delete_all(&USERS).await?;

    let mut seen = HashSet::with_capacity(count);
    let mut rows = Vec::with_capacity(count);
    for _ in 0..count {
        let name: String = Name().fake_with_rng(rng);
        let email = unique_email(rng, &mut seen)?;
        let mut row = Row::new();
        row.insert("name".into(), Value::String(name));
        row.insert("email".into(), Value::String(email));
        row.insert("created_at".into(), random_timestamp(rng));
        row.insert("updated_at".into(), random_timestamp(rng));
        rows.push(row);
    }

    let inserted = store.insert_many(&USERS, &rows).await?;
    tracing::info!(count = inserted, "seeded users");
    Ok(inserted)
}

fn unique_email(rng: &mut ChaCha8Rng, seen: &mut HashSet<String>) -> Result<String, SeedError> {
    for _ in 0..MAX_EMAIL_ATTEMPTS {
        let email: String = SafeEmail().fake_with_rng(rng);
        if seen.insert(email.clone()) {
            return Ok(email);
        }
    }
    Err(SeedError::EmailExhausted {
        attempts: MAX_EMAIL_ATTEMPTS,
    })
}
