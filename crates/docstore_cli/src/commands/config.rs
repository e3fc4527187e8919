//! JSON configuration files.

use super::CliResult;
use docstore_core::Config;
use serde::Deserialize;
use std::path::Path;

/// Keys accepted in a configuration file. Absent keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    /// Database name.
    pub database: Option<String>,
    /// Collection name.
    pub collection: Option<String>,
    /// Recovery batch limit.
    pub recovery_batch_limit: Option<usize>,
    /// Monitoring limit.
    pub monitor_limit: Option<usize>,
    /// Drill read limit.
    pub drill_read_limit: Option<usize>,
    /// Sync the log after every append.
    pub sync_on_append: Option<bool>,
}

impl FileConfig {
    /// Applies the present keys on top of `config`.
    #[must_use]
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(name) = self.database {
            config = config.database(name);
        }
        if let Some(name) = self.collection {
            config = config.collection(name);
        }
        if let Some(limit) = self.recovery_batch_limit {
            config = config.recovery_batch_limit(limit);
        }
        if let Some(limit) = self.monitor_limit {
            config = config.monitor_limit(limit);
        }
        if let Some(limit) = self.drill_read_limit {
            config = config.drill_read_limit(limit);
        }
        if let Some(sync) = self.sync_on_append {
            config = config.sync_on_append(sync);
        }
        config
    }
}

/// Loads the configuration, or the defaults without a file.
pub fn load(path: Option<&Path>) -> CliResult<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)?;
    let file: FileConfig = serde_json::from_str(&text)?;
    Ok(file.apply(Config::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let file: FileConfig =
            serde_json::from_str(r#"{"collection": "actas", "monitor_limit": 5}"#).unwrap();
        let config = file.apply(Config::default());
        assert_eq!(config.namespace(), "gestion_documental.actas");
        assert_eq!(config.monitor_limit, 5);
        assert_eq!(config.recovery_batch_limit, 20);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<FileConfig>(r#"{"colection": "x"}"#).is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docstore.json");
        std::fs::write(&path, r#"{"drill_read_limit": 50}"#).unwrap();
        assert_eq!(load(Some(&path)).unwrap().drill_read_limit, 50);
        assert_eq!(load(None).unwrap(), Config::default());
    }
}
