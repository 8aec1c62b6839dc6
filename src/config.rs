use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

pub const URL_KEY: &str = "NEXT_PUBLIC_SUPABASE_URL";
pub const SERVICE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";

const DEFAULT_DB_HOST: &str = "aws-0-ap-northeast-1.pooler.supabase.com";
const DEFAULT_DB_PORT: u16 = 6543;
const DEFAULT_DB_NAME: &str = "postgres";
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

/// Optional `quizseed.toml` contents. Every field falls back to a default.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct QuizseedConfig {
    pub env_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub reference_texts: Option<PathBuf>,
    pub migration: Option<PathBuf>,
    pub unit_pattern: Option<String>,
    pub database: DatabaseConfig,
    pub rest: RestConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub name: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RestConfig {
    pub ignore_duplicates: Option<bool>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("quizseed.toml")
}

/// Load the project config. A missing default file means "use defaults";
/// a missing file that was named explicitly is an error.
pub fn load_config(path: Option<&Path>) -> Result<Option<QuizseedConfig>> {
    let explicit = path.is_some();
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        if explicit {
            return Err(Error::Config(format!("config file not found: {}", path.display())));
        }
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: QuizseedConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Key/value pairs read from a `.env`-style file.
///
/// The values are never written into the process environment; they only
/// feed [`Settings::resolve`].
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    vars: HashMap<String, String>,
}

impl EnvFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingEnvFile(path.to_path_buf()));
        }

        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) =
                item.map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
            // first occurrence wins, same as a later setdefault would
            vars.entry(key).or_insert(value);
        }
        Ok(Self { vars })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub name: String,
    pub timeout: Duration,
}

/// Everything a run needs, resolved once at startup and passed down explicitly.
#[derive(Clone)]
pub struct Settings {
    pub supabase_url: reqwest::Url,
    pub service_key: String,
    pub data_dir: PathBuf,
    pub reference_texts: PathBuf,
    pub migration: PathBuf,
    pub unit_pattern: String,
    pub database: DatabaseSettings,
    pub ignore_duplicates: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("supabase_url", &self.supabase_url.as_str())
            .field("service_key", &"<redacted>")
            .field("data_dir", &self.data_dir)
            .field("reference_texts", &self.reference_texts)
            .field("migration", &self.migration)
            .field("unit_pattern", &self.unit_pattern)
            .field("database", &self.database)
            .field("ignore_duplicates", &self.ignore_duplicates)
            .finish()
    }
}

impl Settings {
    /// Read the project config, the env file it points at and the process
    /// environment, in that order.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?.unwrap_or_default();
        let env_path = config
            .env_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(".env.local"));
        let env = EnvFile::load(&env_path)?;
        tracing::debug!("Loaded {} entries from {}", env.len(), env_path.display());
        Self::resolve(config, &env, |key| std::env::var(key).ok())
    }

    /// Resolve settings. A value already present in `lookup` (the process
    /// environment) wins over the env file.
    pub fn resolve<F>(config: QuizseedConfig, env: &EnvFile, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .or_else(|| env.get(key).map(str::to_string))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{} is not set", key)))
        };

        let raw_url = required(URL_KEY)?;
        let supabase_url = reqwest::Url::parse(&raw_url)
            .map_err(|e| Error::Config(format!("{} is not a valid URL ({}): {}", URL_KEY, e, raw_url)))?;
        if supabase_url.host_str().is_none() {
            return Err(Error::Config(format!("{} has no host: {}", URL_KEY, raw_url)));
        }
        let service_key = required(SERVICE_KEY)?;

        let data_dir = config.data_dir.unwrap_or_else(|| PathBuf::from("scripts/data"));
        let reference_texts = config
            .reference_texts
            .unwrap_or_else(|| data_dir.join("reference-texts.json"));
        let migration = config
            .migration
            .unwrap_or_else(|| PathBuf::from("supabase/migrations/004_reference_texts.sql"));

        let project_ref = project_ref_of(&supabase_url);
        let db = config.database;
        let database = DatabaseSettings {
            host: db.host.unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
            port: db.port.unwrap_or(DEFAULT_DB_PORT),
            user: db.user.unwrap_or_else(|| format!("postgres.{}", project_ref)),
            name: db.name.unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            timeout: Duration::from_secs(db.timeout_secs.unwrap_or(DEFAULT_DB_TIMEOUT_SECS)),
        };

        Ok(Self {
            supabase_url,
            service_key,
            data_dir,
            reference_texts,
            migration,
            unit_pattern: config.unit_pattern.unwrap_or_else(|| "unit*.json".to_string()),
            database,
            ignore_duplicates: config.rest.ignore_duplicates.unwrap_or(true),
        })
    }

    /// `abc` for `https://abc.supabase.co`; the bare host for anything else.
    pub fn project_ref(&self) -> String {
        project_ref_of(&self.supabase_url)
    }

    /// Base of the table API, without a trailing slash.
    pub fn rest_base(&self) -> String {
        format!("{}/rest/v1", self.supabase_url.as_str().trim_end_matches('/'))
    }
}

fn project_ref_of(url: &reqwest::Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_suffix(".supabase.co").unwrap_or(host).to_string()
}
