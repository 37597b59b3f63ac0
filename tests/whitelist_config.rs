// tests/whitelist_config.rs
use snapfeed::ingest::config::{load_whitelist_from, resolve_whitelist};
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("whitelist.toml");
    fs::write(
        &p_toml,
        r#"
accounts = [" alice ", "", "bob", "bob"]
"#,
    )
    .unwrap();
    let v = load_whitelist_from(&p_toml).unwrap();
    assert_eq!(v, vec!["alice".to_string(), "bob".to_string()]);

    let p_json = dir.path().join("whitelist.json");
    fs::write(&p_json, r#"["carol"," bob  ", ""]"#).unwrap();
    let vj = load_whitelist_from(&p_json).unwrap();
    assert_eq!(vj, vec!["bob".to_string(), "carol".to_string()]);

    // A .json file is never read as TOML.
    let p_mislabelled = dir.path().join("other.json");
    fs::write(&p_mislabelled, r#"accounts = ["alice"]"#).unwrap();
    assert!(load_whitelist_from(&p_mislabelled).is_err());

    let p_bad = dir.path().join("whitelist.txt");
    fs::write(&p_bad, "alice bob").unwrap();
    assert!(load_whitelist_from(&p_bad).is_err());
}

#[serial_test::serial]
#[test]
fn configured_path_wins_over_fallbacks() {
    // Isolate CWD so the repo's own config/ is never read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // 1) Nothing present → empty
    assert!(resolve_whitelist(None).unwrap().is_empty());

    // 2) TOML fallback in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("whitelist.toml"), r#"accounts = ["alice","bob"]"#).unwrap();
    assert_eq!(
        resolve_whitelist(None).unwrap(),
        vec!["alice".to_string(), "bob".to_string()]
    );

    // 3) A configured path wins over the fallback
    let p_env = tmp.path().join("override.json");
    fs::write(&p_env, r#"["x"]"#).unwrap();
    assert_eq!(
        resolve_whitelist(p_env.to_str()).unwrap(),
        vec!["x".to_string()]
    );

    env::set_current_dir(&old).unwrap();
}
