// tests/archive_days.rs
mod common;

use chrono::NaiveDate;
use snapfeed::publish::archive::{backfill, build_page, write_page, DayWindow};
use snapfeed::MediaStore;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn window_includes_start_and_excludes_end() {
    let d = day(2014, 5, 13);
    let w = DayWindow::for_day(d);
    let at_start = format!("a~{}.jpg", w.start_ms);
    let at_end = format!("a~{}.jpg", w.end_ms);
    let last_ms = format!("a~{}.mp4", w.end_ms - 1);

    let tmp = tempfile::tempdir().unwrap();
    common::touch(tmp.path(), &[&at_start, &at_end, &last_ms]);
    let store = MediaStore::open(tmp.path()).unwrap();
    let snapshot = store.snapshot().await.unwrap();

    let page = build_page(&snapshot, "a", d, &common::base()).unwrap();
    let titles: Vec<_> = page.entries.iter().map(|e| e.title.clone()).collect();
    assert_eq!(titles, vec![last_ms.clone(), at_start.clone()]);
    assert!(page.entries[0].is_video);
    assert!(!page.entries[1].is_video);
}

#[tokio::test]
async fn write_page_creates_the_directory_chain() {
    let tmp = tempfile::tempdir().unwrap();
    common::touch(tmp.path(), &["a~1399982400000.jpg"]);
    let store = MediaStore::open(tmp.path()).unwrap();
    let snapshot = store.snapshot().await.unwrap();

    let path = write_page(&store, &snapshot, "a", day(2014, 5, 13), &common::base())
        .await
        .unwrap();
    assert_eq!(path, tmp.path().join("archive/a/2014/05/13.html"));
    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("http://localhost/snaps/a~1399982400000.jpg"));
    assert!(html.contains("http://localhost/snaps/archive/a/2014/05/12.html"));
    assert!(html.contains("http://localhost/snaps/archive/a/2014/05/14.html"));
}

#[tokio::test]
async fn backfill_writes_one_chained_page_per_day() {
    let tmp = tempfile::tempdir().unwrap();
    common::touch(
        tmp.path(),
        &[
            "a~1399982400000.jpg", // 2014-05-13 12:00
            "a~1399990000000.mp4", // 2014-05-13 14:06
            "a~1400068800000.jpg", // 2014-05-14 12:00
            "a~1400155200000.mp4", // 2014-05-15 12:00
            "b~1390000000000.jpg", // other account, earlier
        ],
    );
    let store = MediaStore::open(tmp.path()).unwrap();

    let pages = backfill(&store, "a", &common::base(), day(2014, 5, 15))
        .await
        .unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(
        pages,
        vec![
            tmp.path().join("archive/a/2014/05/13.html"),
            tmp.path().join("archive/a/2014/05/14.html"),
            tmp.path().join("archive/a/2014/05/15.html"),
        ]
    );

    let middle = std::fs::read_to_string(&pages[1]).unwrap();
    assert!(middle.contains("rel=\"prev\" href=\"http://localhost/snaps/archive/a/2014/05/13.html\""));
    assert!(middle.contains("rel=\"next\" href=\"http://localhost/snaps/archive/a/2014/05/15.html\""));
    assert!(middle.contains("a~1400068800000.jpg"));
    assert!(!middle.contains("a~1399982400000.jpg"));

    let first = std::fs::read_to_string(&pages[0]).unwrap();
    assert_eq!(first.matches("<figure>").count(), 2);
}

#[tokio::test]
async fn backfill_without_media_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    common::touch(tmp.path(), &["a~1399982400000.zip", "b~1399982400000.jpg"]);
    let store = MediaStore::open(tmp.path()).unwrap();

    let pages = backfill(&store, "a", &common::base(), day(2014, 5, 15))
        .await
        .unwrap();
    assert!(pages.is_empty());
    let pages = backfill(&store, "ghost", &common::base(), day(2014, 5, 15))
        .await
        .unwrap();
    assert!(pages.is_empty());
    assert!(!tmp.path().join("archive").exists());
}
