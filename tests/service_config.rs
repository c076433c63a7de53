use std::sync::Mutex;

use tempfile::NamedTempFile;

use ewaste_detect::config::ServiceConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "EWASTE_CONFIG",
        "EWASTE_API_ADDR",
        "EWASTE_MODEL_PATH",
        "EWASTE_DETECT_TIMEOUT_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_defaults_without_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ServiceConfig::load().expect("load config");

    assert_eq!(cfg.api_addr, "127.0.0.1:8700");
    assert_eq!(cfg.model.path.to_string_lossy(), "models/best.onnx");
    assert_eq!(cfg.model.input_size, 640);
    assert!(cfg.model.class_names.contains(&"battery".to_string()));
    assert_eq!(cfg.model.detect_timeout.as_secs(), 30);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "api": {
            "addr": "0.0.0.0:9100"
        },
        "model": {
            "path": "artifacts/ewaste.onnx",
            "input_size": 320,
            "class_names": ["Battery", "CRT Monitor"],
            "detect_timeout_secs": 12
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("EWASTE_CONFIG", file.path());
    std::env::set_var("EWASTE_MODEL_PATH", "override/model.onnx");
    std::env::set_var("EWASTE_DETECT_TIMEOUT_SECS", "7");

    let cfg = ServiceConfig::load().expect("load config");

    assert_eq!(cfg.api_addr, "0.0.0.0:9100");
    assert_eq!(cfg.model.path.to_string_lossy(), "override/model.onnx");
    assert_eq!(cfg.model.input_size, 320);
    // Class names are normalized during validation.
    assert_eq!(cfg.model.class_names, vec!["battery", "crt monitor"]);
    assert_eq!(cfg.model.detect_timeout.as_secs(), 7);

    clear_env();
}

#[test]
fn rejects_non_numeric_timeout_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("EWASTE_DETECT_TIMEOUT_SECS", "soon");
    assert!(ServiceConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_unreadable_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("EWASTE_CONFIG", "/nonexistent/ewaste.json");
    assert!(ServiceConfig::load().is_err());

    clear_env();
}
