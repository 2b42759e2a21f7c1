//! Data source configuration parsing and validation.
//!
//! This module handles parsing connection strings and building data source
//! configuration with validation.

use crate::error::ConnectionError;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const MEMORY: &str = ":memory:";

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Private in-memory database, shared by every connection of one data source
    Memory,
    /// Database file
    File(PathBuf),
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseTarget::Memory => write!(f, "{}", MEMORY),
            DatabaseTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// How a database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read only
    ReadOnly,
    /// Read and write, file must exist
    ReadWrite,
    /// Read and write, file is created when missing
    ReadWriteCreate,
}

impl FromStr for OpenMode {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ro" => Ok(OpenMode::ReadOnly),
            "rw" => Ok(OpenMode::ReadWrite),
            "rwc" => Ok(OpenMode::ReadWriteCreate),
            other => Err(ConnectionError::InvalidParameter {
                parameter: "mode".to_string(),
                message: format!("Invalid open mode: {}", other),
            }),
        }
    }
}

/// Configuration for opening a data source.
#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    /// Database location
    pub target: DatabaseTarget,

    /// Open mode for file databases
    pub mode: OpenMode,

    /// How long a connection waits on a locked database
    pub busy_timeout: Duration,

    /// Default statement timeout for queries and updates; zero means unlimited
    pub query_timeout: Duration,

    /// Unrecognized connection string parameters
    pub attributes: HashMap<String, String>,
}

impl DataSourceConfig {
    /// Create a new DataSourceConfigBuilder.
    pub fn builder() -> DataSourceConfigBuilder {
        DataSourceConfigBuilder::new()
    }
}

impl FromStr for DataSourceConfig {
    type Err = ConnectionError;

    /// Parse a connection string in one of the formats:
    /// `sqlite::memory:[?param=value&...]` or
    /// `sqlite://<path>[?param=value&...]`
    ///
    /// # Examples
    ///
    /// ```
    /// # use rowstream::config::DataSourceConfig;
    /// # use std::str::FromStr;
    /// let config = DataSourceConfig::from_str("sqlite::memory:")?;
    ///
    /// let config = DataSourceConfig::from_str(
    ///     "sqlite:///var/lib/app/books.db?mode=ro&query_timeout=30"
    /// )?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = s.trim();

        let rest = if let Some(rest) = url.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = url.strip_prefix("sqlite:") {
            rest
        } else {
            return Err(ConnectionError::ParseError(
                "Connection string must start with 'sqlite:'".to_string(),
            ));
        };

        // Split into location and query string
        let (location, query_string) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };

        let params = parse_query_params(query_string)?;

        let mut builder = DataSourceConfigBuilder::new();
        builder = if location == MEMORY {
            builder.memory()
        } else {
            let path = urlencoding::decode(location)
                .map_err(|e| ConnectionError::ParseError(format!("Failed to decode path: {}", e)))?
                .into_owned();
            builder.path(path)
        };

        builder = apply_query_params(builder, params)?;

        builder.build()
    }
}

impl fmt::Display for DataSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataSourceConfig {{ target: {}, mode: {:?}, query_timeout: {:?} }}",
            self.target, self.mode, self.query_timeout
        )
    }
}

/// Builder for constructing DataSourceConfig with validation.
#[derive(Debug, Clone, Default)]
pub struct DataSourceConfigBuilder {
    target: Option<DatabaseTarget>,
    mode: Option<OpenMode>,
    busy_timeout: Option<Duration>,
    query_timeout: Option<Duration>,
    attributes: HashMap<String, String>,
}

impl DataSourceConfigBuilder {
    /// Create a new DataSourceConfigBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an in-memory database.
    pub fn memory(mut self) -> Self {
        self.target = Some(DatabaseTarget::Memory);
        self
    }

    /// Use a database file.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = Some(DatabaseTarget::File(path.into()));
        self
    }

    /// Set the open mode.
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    /// Set the default statement timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Add a custom attribute.
    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    /// Build the DataSourceConfig with validation.
    pub fn build(self) -> Result<DataSourceConfig, ConnectionError> {
        let target = self.target.ok_or_else(|| ConnectionError::InvalidParameter {
            parameter: "target".to_string(),
            message: "A database path or ':memory:' is required".to_string(),
        })?;

        if let DatabaseTarget::File(path) = &target {
            if path.as_os_str().is_empty() {
                return Err(ConnectionError::InvalidParameter {
                    parameter: "path".to_string(),
                    message: "Database path cannot be empty".to_string(),
                });
            }
        }

        let mode = self.mode.unwrap_or(OpenMode::ReadWriteCreate);
        if target == DatabaseTarget::Memory && mode == OpenMode::ReadOnly {
            return Err(ConnectionError::InvalidParameter {
                parameter: "mode".to_string(),
                message: "An in-memory database cannot be opened read-only".to_string(),
            });
        }

        let busy_timeout = self.busy_timeout.unwrap_or(Duration::from_secs(5));
        if busy_timeout.as_secs() > 600 {
            return Err(ConnectionError::InvalidParameter {
                parameter: "busy_timeout".to_string(),
                message: "Busy timeout cannot exceed 600 seconds".to_string(),
            });
        }

        Ok(DataSourceConfig {
            target,
            mode,
            busy_timeout,
            query_timeout: self.query_timeout.unwrap_or(Duration::ZERO),
            attributes: self.attributes,
        })
    }
}

/// Parse query parameters from URL query string.
fn parse_query_params(query: Option<&str>) -> Result<HashMap<String, String>, ConnectionError> {
    let mut params = HashMap::new();

    if let Some(query) = query {
        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ConnectionError::ParseError(format!("Invalid query parameter format: {}", pair))
            })?;

            let key = urlencoding::decode(key)
                .map_err(|e| ConnectionError::ParseError(format!("Failed to decode key: {}", e)))?
                .into_owned();
            let value = urlencoding::decode(value)
                .map_err(|e| ConnectionError::ParseError(format!("Failed to decode value: {}", e)))?
                .into_owned();

            params.insert(key, value);
        }
    }

    Ok(params)
}

/// Apply query parameters to builder.
fn apply_query_params(
    mut builder: DataSourceConfigBuilder,
    params: HashMap<String, String>,
) -> Result<DataSourceConfigBuilder, ConnectionError> {
    for (key, value) in params {
        match key.as_str() {
            "mode" => {
                builder = builder.mode(value.parse()?);
            }
            "busy_timeout" => {
                let millis = parse_number(&key, &value)?;
                builder = builder.busy_timeout(Duration::from_millis(millis));
            }
            "query_timeout" => {
                let secs = parse_number(&key, &value)?;
                builder = builder.query_timeout(Duration::from_secs(secs));
            }
            _ => {
                builder = builder.attribute(&key, &value);
            }
        }
    }

    Ok(builder)
}

fn parse_number(key: &str, value: &str) -> Result<u64, ConnectionError> {
    value.parse().map_err(|_| ConnectionError::InvalidParameter {
        parameter: key.to_string(),
        message: format!("Invalid timeout value: {}", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_minimal() {
        let config = DataSourceConfigBuilder::new().memory().build().unwrap();

        assert_eq!(config.target, DatabaseTarget::Memory);
        assert_eq!(config.mode, OpenMode::ReadWriteCreate);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert!(config.query_timeout.is_zero());
    }

    #[test]
    fn test_builder_full() {
        let config = DataSourceConfig::builder()
            .path("/tmp/books.db")
            .mode(OpenMode::ReadOnly)
            .busy_timeout(Duration::from_millis(250))
            .query_timeout(Duration::from_secs(30))
            .attribute("application", "catalog")
            .build()
            .unwrap();

        assert_eq!(
            config.target,
            DatabaseTarget::File(PathBuf::from("/tmp/books.db"))
        );
        assert_eq!(config.mode, OpenMode::ReadOnly);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert_eq!(
            config.attributes.get("application"),
            Some(&"catalog".to_string())
        );
    }

    #[test]
    fn test_builder_validation_missing_target() {
        let result = DataSourceConfigBuilder::new().build();

        assert!(matches!(
            result.unwrap_err(),
            ConnectionError::InvalidParameter { parameter, .. } if parameter == "target"
        ));
    }

    #[test]
    fn test_builder_validation_read_only_memory() {
        let result = DataSourceConfigBuilder::new()
            .memory()
            .mode(OpenMode::ReadOnly)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_builder_validation_busy_timeout() {
        let result = DataSourceConfigBuilder::new()
            .memory()
            .busy_timeout(Duration::from_secs(601))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_parse_memory() {
        let config = DataSourceConfig::from_str("sqlite::memory:").unwrap();
        assert_eq!(config.target, DatabaseTarget::Memory);

        let config = DataSourceConfig::from_str("sqlite://:memory:").unwrap();
        assert_eq!(config.target, DatabaseTarget::Memory);
    }

    #[test]
    fn test_parse_path_with_query_params() {
        let config =
            DataSourceConfig::from_str("sqlite://data/books.db?mode=rw&busy_timeout=100&query_timeout=7")
                .unwrap();

        assert_eq!(
            config.target,
            DatabaseTarget::File(PathBuf::from("data/books.db"))
        );
        assert_eq!(config.mode, OpenMode::ReadWrite);
        assert_eq!(config.busy_timeout, Duration::from_millis(100));
        assert_eq!(config.query_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_parse_absolute_url_encoded_path() {
        let config = DataSourceConfig::from_str("sqlite:///tmp/my%20books.db").unwrap();

        assert_eq!(
            config.target,
            DatabaseTarget::File(PathBuf::from("/tmp/my books.db"))
        );
    }

    #[test]
    fn test_parse_unknown_params_become_attributes() {
        let config = DataSourceConfig::from_str("sqlite::memory:?journal=wal").unwrap();

        assert_eq!(config.attributes.get("journal"), Some(&"wal".to_string()));
    }

    #[test]
    fn test_parse_invalid_scheme() {
        let result = DataSourceConfig::from_str("mysql://localhost/books");
        assert!(matches!(result, Err(ConnectionError::ParseError(_))));
    }

    #[test]
    fn test_parse_invalid_values() {
        assert!(DataSourceConfig::from_str("sqlite::memory:?query_timeout=soon").is_err());
        assert!(DataSourceConfig::from_str("sqlite://a.db?mode=append").is_err());
        assert!(DataSourceConfig::from_str("sqlite://a.db?mode").is_err());
        assert!(DataSourceConfig::from_str("sqlite://").is_err());
    }

    #[test]
    fn test_display() {
        let config = DataSourceConfig::from_str("sqlite://books.db").unwrap();
        let display = format!("{}", config);

        assert!(display.contains("books.db"));
        assert!(display.contains("ReadWriteCreate"));
    }
}
