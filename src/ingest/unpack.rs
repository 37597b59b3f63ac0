// src/ingest/unpack.rs
//! Some stories arrive as a zip bundling the video with a transparent
//! overlay. Detection is by signature, never by extension.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::store::{MediaName, MediaStore, Visibility};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

pub fn is_container(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// Where a downloaded blob ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stored {
    Media(PathBuf),
    Unpacked {
        media: PathBuf,
        overlay: Option<PathBuf>,
    },
    /// Container without a playable entry, kept as `<stem>.zip`.
    Container(PathBuf),
}

#[derive(Debug, Default)]
struct Extracted {
    media: Option<Vec<u8>>,
    overlay: Option<Vec<u8>>,
    ignored: Vec<String>,
}

fn container_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Container(e.to_string())
}

fn extract(bytes: &[u8]) -> Result<Extracted, StoreError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(container_err)?;

    let mut out = Extracted::default();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(container_err)?;
        if entry.is_dir() {
            continue;
        }
        let entry_name = entry
            .name()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).map_err(container_err)?;

        if entry_name.starts_with("media") && out.media.is_none() {
            out.media = Some(buf);
        } else if entry_name.starts_with("overlay") && out.overlay.is_none() {
            out.overlay = Some(buf);
        } else {
            out.ignored.push(entry_name);
        }
    }
    Ok(out)
}

/// Persist a downloaded blob under `name`, unpacking containers in place.
///
/// The playable entry always lands on the canonical name so the next dedup
/// check sees it; the overlay becomes `<stem>_overlay.png`.
pub async fn store_blob(
    store: &MediaStore,
    name: &MediaName,
    bytes: &[u8],
    visibility: Visibility,
) -> Result<Stored, StoreError> {
    if !is_container(bytes) {
        let path = store
            .write_atomic(Path::new(name.file_name()), bytes, visibility)
            .await?;
        return Ok(Stored::Media(path));
    }

    let parts = match extract(bytes) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(file = name.file_name(), error = %e, "corrupt container, keeping raw zip");
            Extracted::default()
        }
    };
    for other in &parts.ignored {
        tracing::warn!(file = name.file_name(), entry = %other, "unexpected entry in container");
    }

    let Some(media) = parts.media else {
        let zip_name = name.with_ext("zip");
        let path = store
            .write_atomic(Path::new(zip_name.file_name()), bytes, visibility)
            .await?;
        return Ok(Stored::Container(path));
    };

    let overlay = match parts.overlay {
        Some(ov) => {
            let ov_name = name.companion("_overlay", "png");
            Some(
                store
                    .write_atomic(Path::new(ov_name.file_name()), &ov, visibility)
                    .await?,
            )
        }
        None => None,
    };
    let media = store
        .write_atomic(Path::new(name.file_name()), &media, visibility)
        .await?;
    Ok(Stored::Unpacked { media, overlay })
}
