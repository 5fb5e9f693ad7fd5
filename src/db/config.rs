//! Connection options and the TOML-backed client configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::AuthToken;

/// Address used when nothing else is configured.
pub const DEFAULT_ADDRESS: &str = "neo4j://localhost:7687";
/// Database selected when nothing else is configured.
pub const DEFAULT_DATABASE: &str = "neo4j";
/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "GRAPHCONN_CONFIG";

const SCHEMES: &[&str] = &["neo4j", "neo4j+s", "neo4j+ssc", "bolt", "bolt+s", "bolt+ssc"];

/// Everything needed to open a [`super::Connection`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Server URI.
    pub address: String,
    /// Name of the connecting user, shown without querying the server.
    pub username: String,
    /// Credentials for the driver.
    pub auth: AuthToken,
    /// Database selected right after connecting.
    pub database: String,
    /// Records fetched per batch.
    pub fetch_size: Option<i64>,
    /// Upper bound for establishing a connection.
    pub connect_timeout: Option<Duration>,
    /// Maximum pooled connections held by the driver.
    pub max_pool_size: Option<usize>,
    /// User agent announced to the server.
    pub user_agent: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_owned(),
            username: String::new(),
            auth: AuthToken::None,
            database: DEFAULT_DATABASE.to_owned(),
            fetch_size: None,
            connect_timeout: None,
            max_pool_size: None,
            user_agent: None,
        }
    }
}

impl ConnectOptions {
    /// Options for `address` with default settings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets credentials; basic tokens also fill in the username.
    pub fn auth(mut self, auth: AuthToken) -> Self {
        if let Some(user) = auth.principal() {
            self.username = user.to_owned();
        }
        self.auth = auth;
        self
    }

    /// Sets the username explicitly.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Sets the initial database.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the fetch size.
    pub fn fetch_size(mut self, size: i64) -> Self {
        self.fetch_size = Some(size);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the connection pool size.
    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Sets the user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }
}

/// Named connection settings from the config file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    /// Profile name.
    pub name: String,
    /// Server URI.
    pub address: String,
    /// Connecting user.
    pub username: Option<String>,
    /// Initial database.
    pub database: Option<String>,
    /// Records fetched per batch.
    pub fetch_size: Option<i64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Maximum pooled connections.
    pub max_pool_size: Option<usize>,
    /// User agent.
    pub user_agent: Option<String>,
}

impl Profile {
    /// Builds connection options from this profile. Secrets are never stored
    /// in the config file, so the token is supplied by the caller.
    pub fn connect_options(&self, auth: AuthToken) -> ConnectOptions {
        let mut opts = ConnectOptions::new(self.address.clone()).auth(auth);
        if let Some(user) = &self.username {
            opts.username = user.clone();
        }
        if let Some(db) = &self.database {
            opts.database = db.clone();
        }
        opts.fetch_size = self.fetch_size;
        opts.connect_timeout = self.connect_timeout_ms.map(Duration::from_millis);
        opts.max_pool_size = self.max_pool_size;
        opts.user_agent = self.user_agent.clone();
        opts
    }
}

/// Fields to change on a profile; `None` leaves a field untouched.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    /// Server URI.
    pub address: Option<String>,
    /// Connecting user.
    pub username: Option<String>,
    /// Initial database.
    pub database: Option<String>,
    /// Records fetched per batch.
    pub fetch_size: Option<i64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Maximum pooled connections.
    pub max_pool_size: Option<usize>,
    /// User agent.
    pub user_agent: Option<String>,
}

/// Client configuration file with named profiles.
#[derive(Debug, Default)]
pub struct ClientConfig {
    path: Option<PathBuf>,
    data: RawConfig,
    profiles: BTreeMap<String, Profile>,
}

impl ClientConfig {
    /// Loads the config from `explicit`, `$GRAPHCONN_CONFIG`, or the platform
    /// config directory. A missing file yields an empty config.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        let profiles = parse_profiles(&data)?;
        Ok(Self {
            path,
            data,
            profiles,
        })
    }

    /// Parses config text that is not backed by a file.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let data: RawConfig =
            toml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        let profiles = parse_profiles(&data)?;
        Ok(Self {
            path: None,
            data,
            profiles,
        })
    }

    /// Location the config was loaded from or will be written to.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Name of the default profile, if it exists.
    pub fn default_profile_name(&self) -> Option<&str> {
        self.data
            .default_profile
            .as_deref()
            .filter(|name| self.profiles.contains_key(*name))
    }

    /// The default profile, if configured.
    pub fn default_profile(&self) -> Option<&Profile> {
        self.default_profile_name().and_then(|name| self.profile(name))
    }

    /// Looks up a profile by name.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// All profiles sorted by name.
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    /// Changes or clears the default profile.
    pub fn set_default_profile(&mut self, name: Option<&str>) -> Result<(), ConfigError> {
        if let Some(name) = name {
            if !self.profiles.contains_key(name) {
                return Err(ConfigError::ProfileNotFound {
                    name: name.to_string(),
                });
            }
        }
        self.data.default_profile = name.map(str::to_owned);
        Ok(())
    }

    /// Creates or updates a profile. An update that fails validation leaves
    /// the config untouched.
    pub fn upsert_profile(&mut self, name: &str, update: ProfileUpdate) -> Result<(), ConfigError> {
        let mut entry = self.data.profiles.get(name).cloned().unwrap_or_default();
        if let Some(address) = update.address {
            entry.address = Some(address);
        }
        if let Some(username) = update.username {
            entry.username = Some(username);
        }
        if let Some(database) = update.database {
            entry.database = Some(database);
        }
        if let Some(fetch_size) = update.fetch_size {
            entry.fetch_size = Some(fetch_size);
        }
        if let Some(timeout) = update.connect_timeout_ms {
            entry.connect_timeout_ms = Some(timeout);
        }
        if let Some(size) = update.max_pool_size {
            entry.max_pool_size = Some(size);
        }
        if let Some(agent) = update.user_agent {
            entry.user_agent = Some(agent);
        }
        let profile = convert_profile(name, &entry)?;
        self.data.profiles.insert(name.to_string(), entry);
        self.profiles.insert(name.to_string(), profile);
        Ok(())
    }

    /// Removes a profile, clearing the default if it pointed there.
    pub fn delete_profile(&mut self, name: &str) -> Result<(), ConfigError> {
        if self.data.profiles.remove(name).is_none() {
            return Err(ConfigError::ProfileNotFound {
                name: name.to_string(),
            });
        }
        if self.data.default_profile.as_deref() == Some(name) {
            self.data.default_profile = None;
        }
        self.profiles = parse_profiles(&self.data)?;
        Ok(())
    }

    /// Writes the config back to disk and returns the path written.
    pub fn persist(&self) -> Result<PathBuf, ConfigError> {
        let target = match &self.path {
            Some(path) => path.clone(),
            None => default_config_path().ok_or(ConfigError::NoConfigPath)?,
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = toml::to_string_pretty(&self.data)
            .map_err(|source| ConfigError::Serialize { source })?;
        fs::write(&target, serialized).map_err(|source| ConfigError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_profiles(data: &RawConfig) -> Result<BTreeMap<String, Profile>, ConfigError> {
    let mut profiles = BTreeMap::new();
    for (name, raw) in &data.profiles {
        profiles.insert(name.clone(), convert_profile(name, raw)?);
    }
    if let Some(default_name) = data.default_profile.as_ref() {
        if !profiles.contains_key(default_name) {
            return Err(ConfigError::ProfileNotFound {
                name: default_name.clone(),
            });
        }
    }
    Ok(profiles)
}

fn convert_profile(name: &str, raw: &RawProfile) -> Result<Profile, ConfigError> {
    let address = raw
        .address
        .clone()
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_owned());
    let scheme = address.split("://").next().unwrap_or_default();
    if !address.contains("://") || !SCHEMES.contains(&scheme) {
        return Err(ConfigError::InvalidAddress {
            profile: name.to_string(),
            value: address,
        });
    }
    Ok(Profile {
        name: name.to_string(),
        address,
        username: raw.username.clone(),
        database: raw.database.clone(),
        fetch_size: raw.fetch_size,
        connect_timeout_ms: raw.connect_timeout_ms,
        max_pool_size: raw.max_pool_size,
        user_agent: raw.user_agent.clone(),
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_profile: Option<String>,
    #[serde(default)]
    profiles: BTreeMap<String, RawProfile>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct RawProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fetch_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connect_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_pool_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,
}

/// Errors raised while loading or saving the client config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },
    /// The config could not be serialized.
    #[error("failed to serialize config: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: toml::ser::Error,
    },
    /// The file could not be written.
    #[error("failed to write config {path}: {source}")]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The parent directory could not be created.
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A referenced profile does not exist.
    #[error("profile '{name}' not found")]
    ProfileNotFound {
        /// Profile name.
        name: String,
    },
    /// A profile address has no supported URI scheme.
    #[error("profile '{profile}' address '{value}' is invalid")]
    InvalidAddress {
        /// Profile name.
        profile: String,
        /// Offending address.
        value: String,
    },
    /// No location is known to write the config to.
    #[error("no config directory found; set GRAPHCONN_CONFIG")]
    NoConfigPath,
}

/// `$GRAPHCONN_CONFIG` if set, otherwise `<config dir>/graphconn/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|base| base.join("graphconn").join("config.toml"))
}
