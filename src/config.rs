use crate::core::db::Adapter;
use crate::core::{AdapterError, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Keys recognized by [`Defaults`] and [`AdapterConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Host,
    User,
    Password,
    Schema,
    Autoconnect,
}

impl ConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Host => "host",
            ConfigKey::User => "user",
            ConfigKey::Password => "password",
            ConfigKey::Schema => "schema",
            ConfigKey::Autoconnect => "autoconnect",
        }
    }
}

impl FromStr for ConfigKey {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "host" => Ok(ConfigKey::Host),
            "user" => Ok(ConfigKey::User),
            "password" => Ok(ConfigKey::Password),
            "schema" => Ok(ConfigKey::Schema),
            "autoconnect" => Ok(ConfigKey::Autoconnect),
            other => Err(AdapterError::InvalidArgument(format!(
                "Unknown configuration key: {}",
                other
            ))),
        }
    }
}

/// Fallback values used when an [`AdapterConfig`] leaves a setting out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub host: String,
    pub user: String,
    pub password: String,
    pub schema: String,
    pub autoconnect: bool,
    /// Values stored under keys the adapter does not use
    #[serde(skip)]
    extra: BTreeMap<String, String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            host: "localhost".to_string(),
            user: "root".to_string(),
            password: String::new(),
            schema: String::new(),
            autoconnect: false,
            extra: BTreeMap::new(),
        }
    }
}

impl Defaults {
    /// Reads a value as a string.
    ///
    /// `autoconnect` reads back as `"1"` or `""`; a key never set reads back as `""`.
    pub fn get(&self, key: &str) -> String {
        match key.parse::<ConfigKey>() {
            Ok(ConfigKey::Host) => self.host.clone(),
            Ok(ConfigKey::User) => self.user.clone(),
            Ok(ConfigKey::Password) => self.password.clone(),
            Ok(ConfigKey::Schema) => self.schema.clone(),
            Ok(ConfigKey::Autoconnect) => String::from(if self.autoconnect { "1" } else { "" }),
            Err(_) => self.extra.get(key).cloned().unwrap_or_default(),
        }
    }

    /// Stores a value. `None` stores an empty string.
    ///
    /// For `autoconnect` the value is coerced: absent, `""` and `"0"` mean
    /// false, anything else means true.
    pub fn set(&mut self, key: &str, value: Option<&str>) {
        let text = value.unwrap_or_default().to_string();
        match key.parse::<ConfigKey>() {
            Ok(ConfigKey::Host) => self.host = text,
            Ok(ConfigKey::User) => self.user = text,
            Ok(ConfigKey::Password) => self.password = text,
            Ok(ConfigKey::Schema) => self.schema = text,
            Ok(ConfigKey::Autoconnect) => self.autoconnect = !matches!(value, None | Some("" | "0")),
            Err(_) => {
                self.extra.insert(key.to_string(), text);
            }
        }
    }
}

static DEFAULTS: Lazy<RwLock<Defaults>> = Lazy::new(|| RwLock::new(Defaults::default()));

/// Returns the process-wide default for `key`, or `""` when the key is unknown.
pub fn get_default(key: &str) -> String {
    DEFAULTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
}

/// Updates the process-wide default for `key`.
///
/// Every later [`Adapter::create`] call in the process sees the new value.
pub fn set_default(key: &str, value: Option<&str>) {
    debug!(key, "updating default configuration");
    DEFAULTS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .set(key, value);
}

/// Snapshot of the process-wide defaults.
pub fn defaults() -> Defaults {
    DEFAULTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replaces all process-wide defaults at once.
pub fn replace_defaults(defaults: Defaults) {
    *DEFAULTS.write().unwrap_or_else(PoisonError::into_inner) = defaults;
}

/// Restores the built-in process-wide defaults.
pub fn reset_defaults() {
    replace_defaults(Defaults::default());
}

/// Partial connection settings. Missing or empty values fall back to [`Defaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub schema: Option<String>,
    pub autoconnect: Option<bool>,
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn autoconnect(mut self, autoconnect: bool) -> Self {
        self.autoconnect = Some(autoconnect);
        self
    }
}

fn pick<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

impl Adapter {
    /// Builds an adapter from `config`, falling back to the process-wide defaults.
    ///
    /// An absent `autoconnect` also falls back to the default, which is `false`
    /// unless [`set_default`] changed it.
    pub fn create(config: &AdapterConfig) -> Result<Adapter> {
        Adapter::create_with(config, &defaults())
    }

    /// Builds an adapter from `config`, falling back to `defaults`.
    ///
    /// Fails with `AdapterError::InvalidArgument` when host or schema resolve
    /// to empty, and with the connect error when autoconnect is on and the
    /// connection cannot be opened.
    pub fn create_with(config: &AdapterConfig, defaults: &Defaults) -> Result<Adapter> {
        Adapter::new(
            pick(&config.host, &defaults.host),
            pick(&config.schema, &defaults.schema),
            pick(&config.user, &defaults.user),
            pick(&config.password, &defaults.password),
            config.autoconnect.unwrap_or(defaults.autoconnect),
        )
    }
}

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: Defaults,
    pub connection: AdapterConfig,
}

impl Config {
    /// Builds an adapter from the `[connection]` table over the `[defaults]` table.
    pub fn adapter(&self) -> Result<Adapter> {
        Adapter::create_with(&self.connection, &self.defaults)
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = dbadapter::load_config("dbadapter.toml")?;
/// let mut adapter = config.adapter()?;
/// adapter.connect()?;
/// # Ok::<(), dbadapter::AdapterError>(())
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MEMORY_HOST;

    const SAMPLE_CONFIG: &str = r#"
[defaults]
host = "/var/lib/app"
user = "app"
schema = "app.db"

[connection]
schema = "reports.db"
password = "s3cret"
"#;

    fn test_defaults() -> Defaults {
        let mut defaults = Defaults::default();
        defaults.set("host", Some("local"));
        defaults.set("schema", Some("none"));
        defaults.set("user", Some("usr"));
        defaults.set("password", Some("pswd"));
        defaults
    }

    #[test]
    fn test_builtin_defaults() {
        let defaults = Defaults::default();
        assert_eq!(defaults.get("host"), "localhost");
        assert_eq!(defaults.get("user"), "root");
        assert_eq!(defaults.get("password"), "");
        assert_eq!(defaults.get("schema"), "");
        assert_eq!(defaults.get("autoconnect"), "");
    }

    #[test]
    fn test_unknown_key_reads_empty() {
        let mut defaults = Defaults::default();
        assert_eq!(defaults.get("port"), "");
        defaults.set("port", Some("3306"));
        assert_eq!(defaults.get("port"), "3306");
    }

    #[test]
    fn test_autoconnect_coercion() {
        let mut defaults = Defaults::default();
        for (value, expected) in [
            (Some("1"), true),
            (Some("yes"), true),
            (Some("false"), true),
            (Some("0"), false),
            (Some(""), false),
            (None, false),
        ] {
            defaults.set("autoconnect", value);
            assert_eq!(defaults.autoconnect, expected, "value {:?}", value);
        }
        defaults.set("autoconnect", Some("on"));
        assert_eq!(defaults.get("autoconnect"), "1");
    }

    #[test]
    fn test_config_key_parsing() {
        assert_eq!("schema".parse::<ConfigKey>().unwrap(), ConfigKey::Schema);
        assert_eq!(ConfigKey::Autoconnect.as_str(), "autoconnect");
        assert!("Host".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_create_with_uses_defaults() {
        let adapter = Adapter::create_with(&AdapterConfig::new(), &test_defaults()).unwrap();
        assert_eq!(adapter.get_host(), "local");
        assert_eq!(adapter.get_schema(), "none");
        assert_eq!(adapter.get_user(), "usr");
        assert_eq!(adapter.get_password(), "pswd");
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_create_with_empty_override_falls_back() {
        let config = AdapterConfig::new().host("").schema("x").user("");
        let adapter = Adapter::create_with(&config, &test_defaults()).unwrap();
        assert_eq!(adapter.get_host(), "local");
        assert_eq!(adapter.get_schema(), "x");
        assert_eq!(adapter.get_user(), "usr");
    }

    #[test]
    fn test_create_with_missing_schema_fails() {
        let err = Adapter::create_with(&AdapterConfig::new(), &Defaults::default()).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidArgument(_)));
    }

    #[test]
    fn test_create_with_autoconnect() {
        let config = AdapterConfig::new().host(MEMORY_HOST).autoconnect(true);
        let adapter = Adapter::create_with(&config, &test_defaults()).unwrap();
        assert!(adapter.is_connected());

        let mut defaults = test_defaults();
        defaults.set("host", Some(MEMORY_HOST));
        defaults.set("autoconnect", Some("1"));
        let adapter = Adapter::create_with(&AdapterConfig::new(), &defaults).unwrap();
        assert!(adapter.is_connected());

        let config = AdapterConfig::new().autoconnect(false);
        let adapter = Adapter::create_with(&config, &defaults).unwrap();
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_create_with_autoconnect_failure() {
        let config = AdapterConfig::new()
            .host("/nonexistent/dbadapter/path")
            .autoconnect(true);
        let err = Adapter::create_with(&config, &test_defaults()).unwrap_err();
        assert!(matches!(err, AdapterError::Database(_)));
    }

    #[test]
    fn test_load_config_from_str() {
        let config: Config = toml::from_str(SAMPLE_CONFIG).expect("Failed to parse sample config");
        assert_eq!(config.defaults.host, "/var/lib/app");
        assert_eq!(config.defaults.password, "");
        assert!(!config.defaults.autoconnect);
        assert_eq!(config.connection.schema.as_deref(), Some("reports.db"));
        assert_eq!(config.connection.host, None);

        let adapter = config.adapter().unwrap();
        assert_eq!(adapter.get_host(), "/var/lib/app");
        assert_eq!(adapter.get_schema(), "reports.db");
        assert_eq!(adapter.get_user(), "app");
        assert_eq!(adapter.get_password(), "s3cret");
    }

    #[test]
    fn test_empty_config_uses_builtins() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.defaults, Defaults::default());
        assert_eq!(config.connection, AdapterConfig::default());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/dbadapter.toml").unwrap_err();
        assert!(matches!(err, AdapterError::Io(_)));
    }
}
