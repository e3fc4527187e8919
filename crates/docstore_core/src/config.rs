//! Session configuration.

/// Configuration shared by the writer, log reader, replay and drill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database half of the change-log namespace.
    pub database: String,

    /// Collection half of the change-log namespace.
    pub collection: String,

    /// Entries read by a recovery replay started without a timestamp.
    pub recovery_batch_limit: usize,

    /// Entries shown by the monitoring view.
    pub monitor_limit: usize,

    /// Entries read by a disaster drill.
    pub drill_read_limit: usize,

    /// Whether to sync the change log after every append.
    pub sync_on_append: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "gestion_documental".to_string(),
            collection: "documentos".to_string(),
            recovery_batch_limit: 20,
            monitor_limit: 20,
            drill_read_limit: 1000,
            sync_on_append: true,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database name.
    #[must_use]
    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.database = name.into();
        self
    }

    /// Sets the collection name.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = name.into();
        self
    }

    /// Sets the recovery batch limit.
    #[must_use]
    pub const fn recovery_batch_limit(mut self, limit: usize) -> Self {
        self.recovery_batch_limit = limit;
        self
    }

    /// Sets the monitoring limit.
    #[must_use]
    pub const fn monitor_limit(mut self, limit: usize) -> Self {
        self.monitor_limit = limit;
        self
    }

    /// Sets the drill read limit.
    #[must_use]
    pub const fn drill_read_limit(mut self, limit: usize) -> Self {
        self.drill_read_limit = limit;
        self
    }

    /// Sets whether to sync the log after every append.
    #[must_use]
    pub const fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// The `"<database>.<collection>"` namespace string.
    #[must_use]
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.recovery_batch_limit, 20);
        assert_eq!(config.monitor_limit, 20);
        assert_eq!(config.drill_read_limit, 1000);
        assert!(config.sync_on_append);
        assert_eq!(config.namespace(), "gestion_documental.documentos");
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .database("archivo")
            .collection("actas")
            .drill_read_limit(50)
            .sync_on_append(false);

        assert_eq!(config.namespace(), "archivo.actas");
        assert_eq!(config.drill_read_limit, 50);
        assert!(!config.sync_on_append);
    }
}
