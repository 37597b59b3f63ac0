// src/publish/feed.rs
//! Per-account RSS feed, rebuilt from the store listing on every call.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

use crate::store::{MediaName, MediaStore, Visibility};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: String,
    pub link: String,
    pub title: String,
    pub published: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    pub account: String,
    /// Self link; doubles as the channel id.
    pub id: String,
    pub title: String,
    pub description: String,
    pub language: String,
    pub entries: Vec<FeedEntry>,
}

pub fn feed_file_name(account: &str) -> String {
    format!("{account}.xml")
}

/// Join `rel` onto the base URL the way a browser resolves a relative link.
pub fn public_url(base_url: &Url, rel: &str) -> Result<Url> {
    base_url
        .join(rel)
        .with_context(|| format!("joining {rel} onto {base_url}"))
}

/// Publishable files owned by `account`, newest first.
pub fn account_media<'a>(snapshot: &'a [MediaName], account: &str) -> Vec<&'a MediaName> {
    let mut out: Vec<&MediaName> = snapshot
        .iter()
        .filter(|n| n.account() == account && n.is_publishable())
        .collect();
    out.sort_by(|a, b| MediaName::newest_first(a, b));
    out
}

/// Pure: same snapshot in, same document out.
pub fn build_feed(snapshot: &[MediaName], account: &str, base_url: &Url) -> Result<FeedDocument> {
    let self_link = public_url(base_url, &feed_file_name(account))?.to_string();
    let mut entries = Vec::new();
    for name in account_media(snapshot, account) {
        let link = public_url(base_url, name.file_name())?.to_string();
        entries.push(FeedEntry {
            id: link.clone(),
            link,
            title: name.file_name().to_string(),
            published: name.timestamp_ms().and_then(DateTime::<Utc>::from_timestamp_millis),
        });
    }
    Ok(FeedDocument {
        account: account.to_string(),
        id: self_link,
        title: format!("Stories for {account}"),
        description: format!("Story media published by {account}"),
        language: "en".to_string(),
        entries,
    })
}

fn write_text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Serialize as RSS 2.0.
pub fn render_rss(doc: &FeedDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", "http://www.w3.org/2005/Atom"));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut writer, "title", &doc.title)?;
    write_text_element(&mut writer, "link", &doc.id)?;
    let mut self_link = BytesStart::new("atom:link");
    self_link.push_attribute(("href", doc.id.as_str()));
    self_link.push_attribute(("rel", "self"));
    self_link.push_attribute(("type", "application/rss+xml"));
    writer.write_event(Event::Empty(self_link))?;
    write_text_element(&mut writer, "description", &doc.description)?;
    write_text_element(&mut writer, "language", &doc.language)?;
    if let Some(newest) = doc.entries.iter().find_map(|e| e.published) {
        write_text_element(&mut writer, "lastBuildDate", &newest.to_rfc2822())?;
    }

    for e in &doc.entries {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &e.title)?;
        write_text_element(&mut writer, "link", &e.link)?;
        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        writer.write_event(Event::Start(guid))?;
        writer.write_event(Event::Text(BytesText::new(&e.id)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;
        if let Some(ts) = e.published {
            write_text_element(&mut writer, "pubDate", &ts.to_rfc2822())?;
        }
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut out = String::from_utf8(writer.into_inner()).context("rss output is not utf-8")?;
    out.push('\n');
    Ok(out)
}

/// Write `<store>/<account>.xml` from a snapshot.
pub async fn write_feed(
    store: &MediaStore,
    snapshot: &[MediaName],
    account: &str,
    base_url: &Url,
) -> Result<PathBuf> {
    let doc = build_feed(snapshot, account, base_url)?;
    let xml = render_rss(&doc)?;
    let path = store
        .write_atomic(
            Path::new(&feed_file_name(account)),
            xml.as_bytes(),
            Visibility::Public,
        )
        .await?;
    tracing::info!(account, url = %doc.id, entries = doc.entries.len(), "regenerated feed");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(names: &[&str]) -> Vec<MediaName> {
        names.iter().filter_map(|n| MediaName::parse(n)).collect()
    }

    #[test]
    fn entries_link_to_base_joined_names() {
        let base = Url::parse("http://localhost/snaps/").unwrap();
        let doc = build_feed(&snap(&["a~0000000000002.jpg"]), "a", &base).unwrap();
        assert_eq!(doc.id, "http://localhost/snaps/a.xml");
        assert_eq!(doc.entries[0].link, "http://localhost/snaps/a~0000000000002.jpg");
        assert_eq!(doc.entries[0].id, doc.entries[0].link);
        assert_eq!(doc.entries[0].title, "a~0000000000002.jpg");
    }

    #[test]
    fn rss_escapes_and_orders_items() {
        let base = Url::parse("http://localhost/s/").unwrap();
        let doc = build_feed(
            &snap(&["a~1400000000000.jpg", "a~1400000001000.mp4"]),
            "a",
            &base,
        )
        .unwrap();
        let xml = render_rss(&doc).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<rss version=\"2.0\""));
        let newer = xml.find("a~1400000001000.mp4").unwrap();
        let older = xml.find("a~1400000000000.jpg").unwrap();
        assert!(newer < older);
        assert!(xml.contains("<pubDate>"));
    }

    #[test]
    fn empty_account_still_renders_channel() {
        let base = Url::parse("http://localhost/s/").unwrap();
        let doc = build_feed(&[], "nobody", &base).unwrap();
        let xml = render_rss(&doc).unwrap();
        assert!(xml.contains("<title>Stories for nobody</title>"));
        assert!(!xml.contains("<item>"));
    }
}
