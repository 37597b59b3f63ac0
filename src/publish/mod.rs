// src/publish/mod.rs
pub mod archive;
pub mod feed;

use anyhow::{ensure, Result};
use chrono::NaiveDate;
use metrics::counter;
use url::Url;

use crate::metrics as m;
use crate::store::name::is_valid_account;
use crate::store::{MediaName, MediaStore};

/// Rewrite the account's feed and the given archive days from one snapshot.
/// Returns the number of archive pages written.
pub async fn publish_account(
    store: &MediaStore,
    snapshot: &[MediaName],
    account: &str,
    base_url: &Url,
    days: &[NaiveDate],
) -> Result<usize> {
    m::ensure_described();
    ensure!(
        is_valid_account(account),
        "refusing to publish unsafe account name {account:?}"
    );

    feed::write_feed(store, snapshot, account, base_url).await?;
    counter!(m::FEEDS_WRITTEN).increment(1);

    for day in days {
        archive::write_page(store, snapshot, account, *day, base_url).await?;
        counter!(m::PAGES_WRITTEN).increment(1);
    }
    Ok(days.len())
}
