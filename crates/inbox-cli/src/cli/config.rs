use std::path::Path;

use anyhow::Result;
use inbox_core::InboxConfig;

/// Resolve the effective configuration: file (or defaults), then environment,
/// then explicit command-line flags.
pub fn load_config(path: Option<&Path>, api_url: Option<String>) -> Result<InboxConfig> {
    let config = match path {
        Some(path) => InboxConfig::load(path)?,
        None => InboxConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(api_url) = api_url {
        config.api_url = api_url;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flag_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"apiUrl": "https://inbox.example.com/api", "agent": {{"id": "a1", "name": "Rita"}}}}"#
        )
        .unwrap();

        let config = load_config(Some(file.path()), None).unwrap();
        assert_eq!(config.agent.name, "Rita");

        let config = load_config(Some(file.path()), Some("http://127.0.0.1:9000".to_string())).unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.agent.id, "a1");
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_config(Some(Path::new("/nonexistent/inbox.json")), None).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/inbox.json"));
    }
}
