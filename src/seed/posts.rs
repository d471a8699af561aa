use super::{random_timestamp, SeedError};
use crate::config::{POSTS, USERS};
use crate::store::{Row, Store};
use fake::faker::lorem::en::{Paragraphs, Sentence};
use fake::Fake;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;

const PARAGRAPHS_PER_POST: usize = 4;

/// Delete every post, then insert `count` posts owned by random existing users.
pub async fn seed_posts(store: &dyn Store, rng: &mut ChaCha8Rng, count: usize) -> Result<u64, SeedError> {
    store.delete_all(&POSTS).await?;

    let user_ids = store.pluck_ids(&USERS).await?;
    if user_ids.is_empty() {
        return Err(SeedError::NoUsers);
    }

    let mut rows = Vec::with_capacity(count);
    for _ in 0..count {
        let title: String = Sentence(3..8).fake_with_rng(rng);
        let paragraphs: Vec<String> =
            Paragraphs(PARAGRAPHS_PER_POST..PARAGRAPHS_PER_POST + 1).fake_with_rng(rng);
        let owner = *user_ids.choose(rng).ok_or(SeedError::NoUsers)?;

        let mut row = Row::new();
        row.insert("title".into(), Value::String(title));
        // each generated paragraph is newline-separated sentences
        let content = paragraphs
            .iter()
            .map(|p| p.replace('\n', " "))
            .collect::<Vec<_>>()
            .join("\n");
        row.insert("content".into(), Value::String(content));
        row.insert("created_by".into(), Value::from(owner));
        row.insert("created_at".into(), random_timestamp(rng));
        row.insert("updated_at".into(), random_timestamp(rng));
        rows.push(row);
    }

    let inserted = store.insert_many(&POSTS, &rows).await?;
    tracing::info!(count = inserted, owners = user_ids.len(), "seeded posts");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RESOURCES;
    use crate::store::MemoryStore;
    use rand::SeedableRng;

    #[tokio::test]
    async fn no_users_means_no_posts() {
        let store = MemoryStore::new(&RESOURCES);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert!(matches!(
            seed_posts(&store, &mut rng, 10).await,
            Err(SeedError::NoUsers)
        ));
        assert!(store.list(&POSTS).await.expect("posts").is_empty());
    }

    #[tokio::test]
    async fn content_has_four_paragraphs() {
        let store = MemoryStore::new(&RESOURCES);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        super::super::seed_users(&store, &mut rng, 3).await.expect("users");
        seed_posts(&store, &mut rng, 5).await.expect("posts");

        for post in store.list(&POSTS).await.expect("posts") {
            let content = post["content"].as_str().expect("content");
            let paragraphs: Vec<&str> = content.split('\n').collect();
            assert_eq!(paragraphs.len(), PARAGRAPHS_PER_POST);
            assert!(paragraphs.iter().all(|p| !p.trim().is_empty()));
            assert!(!post["title"].as_str().expect("title").is_empty());
        }
    }
}
