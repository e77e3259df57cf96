use std::time::Duration;

use anyhow::Result;
use moka::future::Cache;
use once_cell::sync::Lazy;

use crate::store::UserRepository;
use crate::utils::email_filter::normalize;

/// Registered emails. Only taken addresses are stored.
static EMAIL_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86400))
        .build()
});

pub async fn mark_taken(email: &str) {
    EMAIL_CACHE.insert(normalize(email), true).await;
}

pub async fn is_taken(email: &str) -> bool {
    EMAIL_CACHE.get(&normalize(email)).await.unwrap_or(false)
}

async fn batch_mark(emails: &[String]) {
    let inserts: Vec<_> = emails
        .iter()
        .map(|e| EMAIL_CACHE.insert(normalize(e), true))
        .collect();

    futures::future::join_all(inserts).await;
}

/// Preload registered emails in batches of `batch_size`.
pub async fn warmup_email_cache(users: &dyn UserRepository, batch_size: usize) -> Result<()> {
    let emails: Vec<String> = users.list_users().await?.into_iter().map(|u| u.email).collect();

    for batch in emails.chunks(batch_size.max(1)) {
        batch_mark(batch).await;
    }

    log::info!("Email cache warmup complete: {} users", emails.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn remembers_taken_emails() {
        assert!(!is_taken("cache.test@company.com").await);
        mark_taken("Cache.Test@company.com").await;
        assert!(is_taken("cache.test@company.com").await);
    }
}
