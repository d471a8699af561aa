//! Synthetic data for development databases.
//!
//! Generation is driven by a `ChaCha8Rng`, so a fixed seed reproduces the same
//! names, emails and post ownership on every run.

mod posts;
mod users;

pub use posts::seed_posts;
pub use users::seed_users;

use crate::config::POSTS;
use crate::error::StoreError;
use crate::sql::format_timestamp;
use crate::store::Store;
use chrono::{Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_USER_COUNT: usize = 100;
pub const DEFAULT_POST_COUNT: usize = 100;

/// Random timestamps fall within this many seconds of now, either side.
const TIMESTAMP_SPREAD_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot seed posts: the users table is empty")]
    NoUsers,

    #[error("could not generate a unique email after {attempts} attempts")]
    EmailExhausted { attempts: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    pub users: usize,
    pub posts: usize,
    /// `None` seeds the generator from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            users: DEFAULT_USER_COUNT,
            posts: DEFAULT_POST_COUNT,
            rng_seed: None,
        }
    }
}

/// Row counts written by `run_seeds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: u64,
    pub posts: u64,
}

/// Wipe posts, then reseed users and posts in that order.
pub async fn run_seeds(store: &dyn Store, options: SeedOptions) -> Result<SeedSummary, SeedError> {
    let mut rng = match options.rng_seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    };

    // users cannot be wiped while posts still reference them
    let cleared = store.delete_all(&POSTS).await?;
    tracing::debug!(count = cleared, "cleared posts before seeding users");

    let users = seed_users(store, &mut rng, options.users).await?;
    let posts = seed_posts(store, &mut rng, options.posts).await?;
    Ok(SeedSummary { users, posts })
}

fn random_timestamp(rng: &mut ChaCha8Rng) -> Value {
    let offset = rng.random_range(-TIMESTAMP_SPREAD_SECS..=TIMESTAMP_SPREAD_SECS);
    Value::String(format_timestamp(&(Utc::now() + Duration::seconds(offset))))
}
