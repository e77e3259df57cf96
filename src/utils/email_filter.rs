use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use autoscale_cuckoo_filter::CuckooFilter;
use once_cell::sync::Lazy;

use crate::store::UserRepository;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// False means the email is certainly unregistered; true may be a false positive.
pub fn might_exist(email: &str) -> bool {
    let email = normalize(email);
    EMAIL_FILTER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&email)
}

pub fn insert(email: &str) {
    let email = normalize(email);
    EMAIL_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add(&email);
}

/// Load every registered email, `batch_size` per write lock.
pub async fn warmup_email_filter(users: &dyn UserRepository, batch_size: usize) -> Result<()> {
    let emails: Vec<String> = users
        .list_users()
        .await?
        .iter()
        .map(|u| normalize(&u.email))
        .collect();

    for batch in emails.chunks(batch_size.max(1)) {
        insert_batch(batch);
    }

    log::info!("Email filter warmup complete: {} users", emails.len());
    Ok(())
}

fn insert_batch(emails: &[String]) {
    let mut filter = EMAIL_FILTER.write().unwrap_or_else(PoisonError::into_inner);

    for email in emails {
        filter.add(email);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_emails_are_found_case_insensitively() {
        insert("Filter.Test@Company.com");
        assert!(might_exist("filter.test@company.com"));
        assert!(might_exist("  FILTER.TEST@COMPANY.COM "));
    }
}
