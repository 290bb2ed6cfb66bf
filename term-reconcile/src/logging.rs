//! Logging utilities and configuration for reconciliation runs.
//!
//! Comparators emit structured `tracing` events on their own. [`LogConfig`]
//! controls the chattier parts: the SQL an engine issues and per-column
//! comparison detail. [`setup`] installs a `tracing-subscriber` for binaries
//! and tests that want output.

use tracing::Level;

/// Logging configuration for engines and comparators.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Most verbose level emitted by the gated macros; query and column
    /// events are debug-level and need `DEBUG` or `TRACE`
    pub base_level: Level,
    /// Whether to log every generated SQL statement
    pub log_queries: bool,
    /// Whether to log per-column comparison details
    pub log_column_details: bool,
    /// Maximum length for logged field values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_queries: false,
            log_column_details: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_queries: true,
            log_column_details: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_queries: false,
            log_column_details: false,
            max_field_length: 128,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Returns true if events at `level` pass `base_level`.
    pub fn allows(&self, level: Level) -> bool {
        level <= self.base_level
    }

    /// Returns true if generated SQL is logged.
    pub fn logs_queries(&self) -> bool {
        self.log_queries && self.allows(Level::DEBUG)
    }

    /// Returns true if per-column comparison detail is logged.
    pub fn logs_column_details(&self) -> bool {
        self.log_column_details && self.allows(Level::DEBUG)
    }
}

/// Macro for conditional query logging.
///
/// The SQL text is only formatted when query logging is enabled and the
/// base level admits debug events.
#[macro_export]
macro_rules! log_query {
    ($config:expr, $sql:expr, $($arg:tt)*) => {
        if $config.logs_queries() {
            tracing::debug!(
                query.sql = %$crate::logging::truncate_field($sql, $config.max_field_length),
                $($arg)*
            );
        }
    };
}

/// Macro for conditional per-column detail logging.
#[macro_export]
macro_rules! log_column {
    ($config:expr, $($arg:tt)*) => {
        if $config.logs_column_details() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
///
/// Truncation happens on a character boundary.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let cut = value
        .char_indices()
        .map(|(idx, _)| idx)
        .take_while(|idx| *idx <= max_length)
        .last()
        .unwrap_or(0);
    let truncated = &value[..cut];
    format!("{truncated}...(truncated)")
}

/// Utilities for setting up structured logging.
pub mod setup {
    use tracing::Level;

    /// Configuration for the global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for `term_reconcile` specifically
        pub term_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                term_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                term_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                term_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets the log level for the application.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for reconciliation components.
        pub fn with_term_level(mut self, level: Level) -> Self {
            self.term_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},term_reconcile={}",
                    self.level.as_str().to_lowercase(),
                    self.term_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Initializes the global `tracing` subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_reconcile::logging::setup::{LoggingConfig, init_logging};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}
