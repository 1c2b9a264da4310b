//! Error types shared by the library modules.
//!
//! The binary wraps these in `anyhow` at the boundary; inside the crate every
//! fallible operation returns one of the typed errors below.

use std::path::PathBuf;

use thiserror::Error;

/// A request that could not be answered by the network or the offline cache.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The origin could not be reached (offline, refused, missing directory).
    #[error("сеть недоступна для {url}: {reason}")]
    Network {
        /// Requested URL.
        url: String,
        /// Human readable cause.
        reason: String,
    },

    /// The cache worker thread has stopped and dropped its channel.
    #[error("cache worker is not running")]
    WorkerGone,
}

/// Failure of the initial ticket load. Terminal for the current run.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The ticket file could not be fetched at all.
    #[error("не удалось загрузить {url}: {source}")]
    Fetch {
        /// Requested URL.
        url: String,
        /// The underlying fetch failure.
        #[source]
        source: FetchError,
    },

    /// The origin answered, but not with a 2xx status.
    #[error("файл {url} не найден (статус {status})")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP-like status code.
        status: u16,
    },

    /// The payload is not JSON.
    #[error("не удалось разобрать JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload is JSON but not a non-empty array.
    #[error("данные не найдены или файл пуст")]
    Empty,

    /// An element of the array is not an object.
    #[error("билет #{index} не является объектом")]
    NotAnObject {
        /// Zero-based position of the offending element.
        index: usize,
    },
}

/// Errors raised by the durable key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        /// Path to the storage file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file could not be (de)serialized.
    #[error("storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the on-disk cache buckets and the worker lifecycle.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem failure inside the cache directory.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Cache names become directory names and must stay a single component.
    #[error("invalid cache name: {0:?}")]
    InvalidName(String),

    /// Entry metadata could not be (de)serialized.
    #[error("cache metadata is corrupt: {0}")]
    Metadata(#[from] serde_json::Error),

    /// An asset in the manifest could not be fetched during install.
    #[error("failed to fetch {url} during install: {source}")]
    Fetch {
        /// Asset URL.
        url: String,
        /// The underlying fetch failure.
        #[source]
        source: FetchError,
    },

    /// The worker thread could not be started.
    #[error("failed to spawn cache worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread exited before reporting its lifecycle result.
    #[error("cache worker stopped during startup")]
    WorkerStopped,

    /// An asset in the manifest answered with a non-2xx status during install.
    #[error("{url} answered with status {status} during install")]
    Status {
        /// Asset URL.
        url: String,
        /// HTTP-like status code.
        status: u16,
    },
}

/// Errors raised while loading the TOML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path to the config file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`crate::config::Config`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Path to the config file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is syntactically fine but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the spreadsheet converter.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Reading the input or writing the output failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The input has no header line.
    #[error("input has no header row")]
    NoHeader,

    /// Delimiters must be single-byte characters.
    #[error("unsupported delimiter {0:?}")]
    Delimiter(char),

    /// The delimited text could not be parsed.
    #[error("malformed delimited text: {0}")]
    Csv(#[from] csv::Error),

    /// The workbook could not be opened or has no readable sheet.
    #[error("cannot read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// The workbook has no sheets.
    #[error("workbook {0} has no sheets")]
    NoSheet(PathBuf),

    /// Serializing the ticket list failed.
    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}
