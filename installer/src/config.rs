//! Run configuration.
//!
//! A [`Config`] starts from defaults, is overlaid by an optional TOML file,
//! then by command-line overrides. The finished value is passed explicitly
//! to the components that need it; nothing reads ambient process state
//! after loading.
//!
//! The file is located through `$UPKERN_CONFIG` or, failing that, the
//! platform configuration directory:
//!
//! ```toml
//! forced_version = "6.11.5"
//! destination_root = "/srv/kernels"
//! workers = 2
//! digest_algorithm = "sha1"
//! transfer = "builtin"
//! ```

use crate::archive::layout::DEFAULT_ARCHIVE_URL;
use crate::archive::releases::DEFAULT_RELEASE_METADATA_URL;
use crate::catalog::digest::DigestAlgorithm;
use crate::dirs::{BaseDirs, default_destination_root};
use crate::download::DEFAULT_WORKERS;
use crate::transfer::TransferPreference;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::io;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "UPKERN_CONFIG";

/// Name of the configuration file in the platform configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        /// Path of the file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid.
    #[error("invalid configuration file {path}: {source}")]
    Parse {
        /// Path of the file.
        path: Utf8PathBuf,
        /// The TOML error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// A value is out of range.
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// No destination was configured and no default could be derived.
    #[error("no destination root configured and no downloads directory found; pass --destination")]
    NoDestination,
}

/// Settings for one run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Version to fetch instead of the latest stable one.
    pub forced_version: Option<String>,
    /// Root of the download tree; the platform default when absent.
    pub destination_root: Option<Utf8PathBuf>,
    /// Release metadata endpoint.
    pub release_metadata_url: String,
    /// Root of the mainline package archive.
    pub archive_url: String,
    /// Maximum concurrent transfers; at least one.
    pub workers: usize,
    /// Digest algorithm the archive's manifest uses.
    ///
    /// Never inferred from the manifest; a change of algorithm on the
    /// archive side must be configured here.
    pub digest_algorithm: DigestAlgorithm,
    /// How the transfer strategy is chosen.
    pub transfer: TransferPreference,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forced_version: None,
            destination_root: None,
            release_metadata_url: DEFAULT_RELEASE_METADATA_URL.to_owned(),
            archive_url: DEFAULT_ARCHIVE_URL.to_owned(),
            workers: DEFAULT_WORKERS,
            digest_algorithm: DigestAlgorithm::default(),
            transfer: TransferPreference::default(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigOverrides {
    /// `--kernel-version`.
    pub forced_version: Option<String>,
    /// `--destination`.
    pub destination_root: Option<Utf8PathBuf>,
    /// `--workers`.
    pub workers: Option<usize>,
    /// `--builtin-transfer`.
    pub builtin_transfer: bool,
}

impl Config {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML or unknown keys, and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml(path: &Utf8Path, source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|err| ConfigError::Parse {
            path: path.to_owned(),
            source: Box::new(err),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the resolved file location.
    ///
    /// `explicit` (from `--config`) wins over `$UPKERN_CONFIG`, which wins
    /// over the platform default. Only a missing platform-default file is
    /// tolerated; a file that was named explicitly must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a named file is missing or unreadable,
    /// or the contents are invalid.
    pub fn load(explicit: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<Self, ConfigError> {
        let named = explicit
            .map(Utf8Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(Utf8PathBuf::from));

        let (path, required) = match named {
            Some(path) => (path, true),
            None => match platform_config_path(dirs) {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        match std::fs::read_to_string(&path) {
            Ok(source) => {
                log::debug!("loading configuration from {path}");
                Self::from_toml(&path, &source)
            }
            Err(err) if !required && err.kind() == io::ErrorKind::NotFound => {
                log::trace!("no configuration file at {path}; using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// Apply command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override is out of range.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        if overrides.forced_version.is_some() {
            self.forced_version = overrides.forced_version;
        }
        if overrides.destination_root.is_some() {
            self.destination_root = overrides.destination_root;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if overrides.builtin_transfer {
            self.transfer = TransferPreference::Builtin;
        }
        self.validate()?;
        Ok(self)
    }

    /// Return the destination root, deriving the default when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoDestination`] when nothing is configured and
    /// no default can be derived.
    pub fn resolve_destination_root(
        &self,
        dirs: &dyn BaseDirs,
    ) -> Result<Utf8PathBuf, ConfigError> {
        self.destination_root
            .clone()
            .or_else(|| default_destination_root(dirs))
            .ok_or(ConfigError::NoDestination)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "workers",
                reason: "must be at least 1".to_owned(),
            });
        }
        for (field, url) in [
            ("release_metadata_url", &self.release_metadata_url),
            ("archive_url", &self.archive_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{url:?} is not an http(s) URL"),
                });
            }
        }
        Ok(())
    }
}

fn platform_config_path(dirs: &dyn BaseDirs) -> Option<Utf8PathBuf> {
    let dir = dirs.config_dir()?;
    Utf8PathBuf::from_path_buf(dir.join(CONFIG_FILE_NAME)).ok()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
