// tests/ingest_unpack.rs
mod common;

use snapfeed::ingest;
use snapfeed::publish::feed::build_feed;
use snapfeed::upstream::fake::{FakeBlob, FakeStoryClient};
use snapfeed::upstream::MediaType;
use snapfeed::MediaStore;
use std::time::Duration;

#[tokio::test]
async fn zipped_story_is_unpacked_and_not_refetched() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MediaStore::open(tmp.path()).unwrap();
    let blob = common::zip_of(&[("media~abc", b"VIDEO"), ("overlay~abc", b"PNG")]);
    let client = FakeStoryClient::new("pw").with_story(
        "alice~1400000000000",
        MediaType::Video,
        FakeBlob::Data(blob),
    );
    let session = common::login(&client).await;

    let first = ingest::run_once(&client, &session, &store, &[], Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(first.saved, 1);
    assert_eq!(first.unpacked, 1);
    assert_eq!(
        common::files_in(tmp.path()),
        vec![
            "alice~1400000000000.mp4".to_string(),
            "alice~1400000000000_overlay.png".to_string(),
        ]
    );
    assert_eq!(
        std::fs::read(tmp.path().join("alice~1400000000000.mp4")).unwrap(),
        b"VIDEO"
    );

    let second = ingest::run_once(&client, &session, &store, &[], Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(second.skipped_existing, 1);
    assert_eq!(second.unpacked, 0);
    assert_eq!(client.fetches(), 1);

    // The overlay is auxiliary and never syndicated.
    let snapshot = store.snapshot().await.unwrap();
    let doc = build_feed(&snapshot, "alice", &common::base()).unwrap();
    assert_eq!(doc.entries.len(), 1);
    assert_eq!(doc.entries[0].title, "alice~1400000000000.mp4");
}
