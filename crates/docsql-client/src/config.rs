//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How ORDER BY and GROUP BY queries reach their partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOut {
    /// All partitions at once.
    #[default]
    Concurrent,
    /// One partition after another.
    Sequential,
}

/// Settings shared by every statement prepared on a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Database used when a statement names none.
    pub default_db: Option<String>,
    /// Fan-out strategy for ORDER BY and GROUP BY.
    pub fan_out: FanOut,
    /// Page size cap used when a query does not set one, `-1` for none.
    pub default_max_item_count: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_db: None,
            fan_out: FanOut::Concurrent,
            default_max_item_count: -1,
        }
    }
}

impl ClientConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| Error::Config(e.to_string()))
    }

    /// Sets the default database.
    #[must_use]
    pub fn with_default_db(mut self, db: impl Into<String>) -> Self {
        self.default_db = Some(db.into());
        self
    }

    /// Sets the fan-out strategy.
    #[must_use]
    pub const fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Sets the default page size cap.
    #[must_use]
    pub const fn with_max_item_count(mut self, max_item_count: i64) -> Self {
        self.default_max_item_count = max_item_count;
        self
    }

    /// The default database, or `""`.
    #[must_use]
    pub fn default_db(&self) -> &str {
        self.default_db.as_deref().unwrap_or_default()
    }
}
