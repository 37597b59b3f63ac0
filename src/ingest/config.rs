// src/ingest/config.rs
//! Whitelist files: either `accounts = [..]` TOML or a bare JSON array.

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const ENV_PATH: &str = "SNAPFEED_WHITELIST_PATH";

/// Looked up relative to the working directory when no path is configured.
pub const FALLBACK_PATHS: [&str; 2] = ["config/whitelist.toml", "config/whitelist.json"];

#[derive(Deserialize)]
struct AccountsFile {
    accounts: Vec<String>,
}

/// Read one whitelist file. A `.json` file must hold a JSON list; anything
/// else is read as TOML, then as JSON.
pub fn load_whitelist_from(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading whitelist {}", path.display()))?;
    let json_only = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let accounts = if json_only {
        serde_json::from_str::<Vec<String>>(&raw).map_err(anyhow::Error::from)
    } else {
        toml::from_str::<AccountsFile>(&raw)
            .map(|f| f.accounts)
            .or_else(|_| serde_json::from_str::<Vec<String>>(&raw))
            .map_err(anyhow::Error::from)
    }
    .with_context(|| {
        format!(
            "{} is neither `accounts = [..]` TOML nor a JSON list",
            path.display()
        )
    })?;
    Ok(clean_list(accounts))
}

/// The configured file if any (it must exist), else the first fallback that
/// does. No file at all means an empty list.
pub fn resolve_whitelist(configured: Option<&str>) -> Result<Vec<String>> {
    if let Some(p) = configured {
        let path = Path::new(p);
        ensure!(path.is_file(), "{ENV_PATH}={p} does not exist");
        return load_whitelist_from(path);
    }
    match FALLBACK_PATHS.iter().map(Path::new).find(|p| p.is_file()) {
        Some(path) => load_whitelist_from(path),
        None => Ok(Vec::new()),
    }
}

/// Comma or whitespace separated list, as given in the environment.
pub fn parse_list(s: &str) -> Vec<String> {
    clean_list(s.split(|c: char| c == ',' || c.is_whitespace()))
}

/// Trimmed, non-empty, unique, sorted.
pub fn clean_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .filter_map(|s| {
            let t = s.as_ref().trim();
            (!t.is_empty()).then(|| t.to_string())
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
