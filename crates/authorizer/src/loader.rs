//! reading configuration files
//!
//! The file format is picked by extension:
//! - `.xml`: element based, e.g. `<config><server><baseUrl>..</baseUrl></server>..</config>`
//! - `.yaml`/`.yml` and `.json`: the same structure with the element names as keys
//!
//! A missing or unparseable file means there is no configuration at all. That is a
//! different state from a configuration without any rules.
use crate::error::ConfigurationError;
use crate::raw::RawConfig;
use crate::resolve::{ConfigResolver, Configuration};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

/// Environment variable that overrides [default_config_path]
pub const CONFIG_ENV_VAR: &str = "AUTHORIZER_CONFIG";
const CONFIG_DIR_NAME: &str = ".authorizer";
const CONFIG_FILE_NAME: &str = "config.xml";

/// `$AUTHORIZER_CONFIG`, or `config.xml` in `.authorizer` of the home directory
pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }

    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_default();

    home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Read and parse a configuration file without resolving it
pub fn read_raw(path: &Path) -> Result<RawConfig, ConfigurationError> {
    if !path.exists() {
        return Err(ConfigurationError::Missing(path.to_path_buf()));
    }

    tracing::info!(path = %path.display(), "loading configuration");
    let contents = std::fs::read_to_string(path)?;
    parse_raw(path, &contents)
}

fn parse_raw(path: &Path, contents: &str) -> Result<RawConfig, ConfigurationError> {
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase());

    let parse_error = |message: String| ConfigurationError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match extension.as_deref() {
        Some("xml") => quick_xml::de::from_str(contents).map_err(|e| parse_error(e.to_string())),
        Some("yaml" | "yml") => {
            serde_yaml::from_str(contents).map_err(|e| parse_error(e.to_string()))
        }
        Some("json") => serde_json::from_str(contents).map_err(|e| parse_error(e.to_string())),
        _ => Err(ConfigurationError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Read, parse and resolve a configuration file
pub fn try_load(path: &Path) -> Result<Configuration, ConfigurationError> {
    let raw = read_raw(path)?;
    ConfigResolver::new(path).resolve(&raw)
}

/// [try_load], logging the failure and reporting it as "no configuration"
pub fn load(path: &Path) -> Option<Configuration> {
    match try_load(path) {
        Ok(configuration) => Some(configuration),
        Err(error) => {
            tracing::error!(path = %path.display(), %error, "unable to load configuration");
            None
        }
    }
}

type Generation = Arc<OnceLock<Option<Arc<Configuration>>>>;

/// Lazily loaded configuration shared between threads
///
/// The first caller of [ConfigurationStore::get] loads the file, concurrent
/// callers wait for it and receive the same result. Nothing is loaded again
/// until [ConfigurationStore::reload] is called.
#[derive(Debug)]
pub struct ConfigurationStore {
    path: PathBuf,
    current: RwLock<Generation>,
}

impl ConfigurationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Generation::default()),
        }
    }

    /// `None` when the configuration file is missing or invalid
    pub fn get(&self) -> Option<Arc<Configuration>> {
        let generation = match self.current.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        generation
            .get_or_init(|| load(&self.path).map(Arc::new))
            .clone()
    }

    /// Forget the loaded configuration, the next [ConfigurationStore::get] reads the file again
    pub fn reload(&self) {
        let mut current = match self.current.write() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = Generation::default();
        tracing::debug!(path = %self.path.display(), "configuration marked for reload");
    }
}
