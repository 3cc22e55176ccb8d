use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use spendgate_core::config::{AppConfig, LoadOptions, CONFIG_FILE_NAME};
use toml::Value;

struct Entry {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_token = config
        .backend
        .api_token
        .as_ref()
        .map(|token| redact_token(token.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let entries = [
        Entry {
            key: "backend.base_url",
            value: config.backend.base_url.clone(),
            env_keys: &["SPENDGATE_BACKEND_BASE_URL"],
        },
        Entry {
            key: "backend.api_token",
            value: api_token,
            env_keys: &["SPENDGATE_BACKEND_API_TOKEN", "SPENDGATE_API_TOKEN"],
        },
        Entry {
            key: "backend.timeout_secs",
            value: config.backend.timeout_secs.to_string(),
            env_keys: &["SPENDGATE_BACKEND_TIMEOUT_SECS"],
        },
        Entry {
            key: "display.id_preview_len",
            value: config.display.id_preview_len.to_string(),
            env_keys: &["SPENDGATE_DISPLAY_ID_PREVIEW_LEN"],
        },
        Entry {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["SPENDGATE_LOGGING_LEVEL", "SPENDGATE_LOG_LEVEL"],
        },
        Entry {
            key: "logging.format",
            value: config.logging.format.as_str().to_string(),
            env_keys: &["SPENDGATE_LOGGING_FORMAT", "SPENDGATE_LOG_FORMAT"],
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.iter().map(|entry| {
        render_line(
            entry.key,
            &entry.value,
            field_source(
                entry.key,
                entry.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        )
    }));
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(CONFIG_FILE_NAME), Path::new("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn redaction_keeps_only_the_token_prefix() {
        assert_eq!(redact_token("sg-live-abc123"), "sg-***");
        assert_eq!(redact_token("opaque"), "<redacted>");
        assert_eq!(redact_token("  "), "<empty>");
    }

    #[test]
    fn dotted_paths_are_looked_up_in_toml() {
        let doc: toml::Value = "[backend]\nbase_url = \"https://x.example.com\"\n"
            .parse()
            .expect("toml parses");
        assert!(contains_path(&doc, "backend.base_url"));
        assert!(!contains_path(&doc, "backend.api_token"));
        assert!(!contains_path(&doc, "display.id_preview_len"));
    }
}
