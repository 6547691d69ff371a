use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_path(prefix: &str) -> PathBuf {
    let now_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "seqdiagram_architect_{prefix}_{}_{}",
        std::process::id(),
        now_ns
    ))
}

pub fn remove_dir_if_exists(path: &Path) {
    let _ = std::fs::remove_dir_all(path);
}

/// Points a spawned binary at `openai_base_url` and keeps its logging quiet.
pub fn apply_provider_test_env(command: &mut Command, openai_base_url: &str, log_dir: &Path) {
    command.env("MODEL", "test-model");
    command.env("OPENAI_BASE_URL", openai_base_url);
    command.env("RUST_LOG", "error");
    command.env("SEQDIAGRAM_FILE_LOG", "error");
    command.env("SEQDIAGRAM_LOG_DIR", log_dir.as_os_str());
}
