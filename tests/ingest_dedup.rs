// tests/ingest_dedup.rs
mod common;

use snapfeed::ingest;
use snapfeed::upstream::fake::{FakeBlob, FakeStoryClient};
use snapfeed::upstream::MediaType;
use snapfeed::MediaStore;
use std::time::Duration;

#[tokio::test]
async fn second_run_downloads_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MediaStore::open(tmp.path()).unwrap();
    let client = FakeStoryClient::new("pw")
        .with_story(
            "alice~1400000000000",
            MediaType::Image,
            FakeBlob::Data(b"jpg".to_vec()),
        )
        .with_story(
            "bob~1400000005000",
            MediaType::Video,
            FakeBlob::Data(b"mp4".to_vec()),
        );
    let session = common::login(&client).await;

    let first = ingest::run_once(&client, &session, &store, &[], Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(first.listed, 2);
    assert_eq!(first.saved, 2);
    let after_first = common::files_in(tmp.path());
    assert_eq!(
        after_first,
        vec![
            "alice~1400000000000.jpg".to_string(),
            "bob~1400000005000.mp4".to_string()
        ]
    );

    let second = ingest::run_once(&client, &session, &store, &[], Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(second.saved, 0);
    assert_eq!(second.skipped_existing, 2);
    assert_eq!(client.fetches(), 2, "existing files must not be refetched");
    assert_eq!(common::files_in(tmp.path()), after_first);
}

#[tokio::test]
async fn timestamps_are_padded_before_the_dedup_check() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MediaStore::open(tmp.path()).unwrap();
    let client = FakeStoryClient::new("pw")
        .with_story(
            "alice~999999999999",
            MediaType::Image,
            FakeBlob::Data(b"x".to_vec()),
        )
        .with_story("alice~42", MediaType::Image, FakeBlob::Data(b"y".to_vec()));
    let session = common::login(&client).await;

    for _ in 0..2 {
        ingest::run_once(&client, &session, &store, &[], Duration::from_secs(5))
            .await
            .unwrap();
    }
    assert_eq!(
        common::files_in(tmp.path()),
        vec![
            "alice~0999999999999.jpg".to_string(),
            "alice~42.jpg".to_string(),
        ]
    );
    assert_eq!(client.fetches(), 2);
}
