// tests/common/mod.rs
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use std::time::Duration;

use snapfeed::upstream::{Credentials, Session, StoryClient};
use snapfeed::GatewaySettings;
use url::Url;

pub fn creds(password: &str) -> Credentials {
    Credentials {
        username: "me".into(),
        password: Some(password.into()),
        secondary_identity: "me@example.com".into(),
        secondary_credential: "secret".into(),
    }
}

pub async fn login(client: &dyn StoryClient) -> Session {
    client.authenticate(&creds("pw")).await.expect("login")
}

pub fn base() -> Url {
    Url::parse("http://localhost/snaps/").unwrap()
}

pub fn settings(whitelist: &[&str]) -> GatewaySettings {
    GatewaySettings {
        credentials: creds("pw"),
        auth_token: None,
        base_url: base(),
        whitelist: whitelist.iter().map(|s| s.to_string()).collect(),
        delay: Duration::from_secs(3600),
        fetch_timeout: Duration::from_secs(5),
    }
}

pub fn touch(dir: &Path, names: &[&str]) {
    for n in names {
        std::fs::write(dir.join(n), n.as_bytes()).unwrap();
    }
}

pub fn files_in(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    v.sort();
    v
}

pub fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (n, data) in entries {
        w.start_file(*n, opts).unwrap();
        w.write_all(data).unwrap();
    }
    w.finish().unwrap().into_inner()
}
