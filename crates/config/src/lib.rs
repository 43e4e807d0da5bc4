//! Layered configuration.
//!
//! Values are merged from, in increasing priority:
//! 1. built-in defaults (platform data directories, local storage),
//! 2. an optional configuration file (TOML, YAML or JSON by extension),
//! 3. `AICON_`-prefixed environment variables, with `__` separating nested
//!    keys (`AICON_STORAGE__ROOT=/srv/aicon`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "AICON_";
const ENV_SEPARATOR: &str = "__";
pub const DEFAULT_DOMAIN: &str = "a-icon.com";
const DEFAULT_S3_REGION: &str = "us-east-1";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "a-icon", "aicon")
}

/// Where a configuration file is looked for when none is given.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

fn default_data_dir() -> PathBuf {
    // Without a home directory there is no platform data dir; a relative path
    // still works for the database, and validation asks for an explicit
    // storage root.
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).unwrap_or_else(|| PathBuf::from("aicon-data"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file, created on first use.
    pub path: PathBuf,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir().join("aicon.sqlite"),
        }
    }
}

/// Blob storage for sources and generated variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Local {
        /// Must be absolute.
        root: PathBuf,
    },
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default = "default_region")]
        region: String,
        /// For S3-compatible services (MinIO, R2, ...).
        #[serde(default)]
        endpoint: Option<String>,
        key_id: String,
        key_secret: String,
    },
}
impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            root: default_data_dir().join("storage"),
        }
    }
}

fn default_region() -> String {
    DEFAULT_S3_REGION.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Used in variant keys when a favicon has no target domain.
    #[serde(default = "default_domain")]
    pub default_domain: String,
    #[serde(default)]
    pub dedup: Dedup,
}
impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_domain: default_domain(),
            dedup: Dedup::default(),
        }
    }
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

/// Behaviour when a byte-identical source is submitted again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dedup {
    #[default]
    AlwaysCreate,
    ReuseExisting,
}

impl Config {
    /// Load, merge and validate configuration.
    ///
    /// An explicit `path` must exist. Without one, the platform default file
    /// is merged only if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::from_figment(Self::figment(path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// The merged provider stack, before extraction.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::Load(format!("{} does not exist", path.display())));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                if let Some(path) = default_config_path().filter(|p| p.is_file()) {
                    tracing::debug!(path = %path.display(), "using default configuration file");
                    figment = merge_file(figment, &path)?;
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        match figment.extract() {
            Ok(config) => Ok(config),
            Err(err) => {
                let reason = err.to_string();
                Err(err).or_raise(|| ErrorKind::Load(reason))
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| ErrorKind::Invalid(reason.to_string());
        if self.database.path.as_os_str().is_empty() {
            exn::bail!(invalid("database.path must not be empty"));
        }
        match &self.storage {
            StorageConfig::Local { root } => {
                if !root.is_absolute() {
                    exn::bail!(ErrorKind::Invalid(format!(
                        "storage.root must be an absolute path, got {}",
                        root.display()
                    )));
                }
            },
            StorageConfig::S3 {
                bucket,
                key_id,
                key_secret,
                ..
            } => {
                if bucket.trim().is_empty() {
                    exn::bail!(invalid("storage.bucket must not be empty"));
                }
                if key_id.is_empty() || key_secret.is_empty() {
                    exn::bail!(invalid("storage.key_id and storage.key_secret are required"));
                }
            },
        }
        let domain = self.generation.default_domain.trim();
        if domain.is_empty() || domain.contains('/') || domain.chars().all(|c| c == '.') {
            exn::bail!(ErrorKind::Invalid(format!(
                "generation.default_domain {domain:?} cannot be used in storage keys"
            )));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    let extension = extension
        .ok_or_raise(|| ErrorKind::Load(format!("{} has no file extension", path.display())))?;
    let figment = match extension.as_str() {
        "toml" => figment.merge(Toml::file_exact(path)),
        "yaml" | "yml" => figment.merge(Yaml::file_exact(path)),
        "json" => figment.merge(Json::file_exact(path)),
        other => exn::bail!(ErrorKind::Load(format!("unsupported configuration format .{other}"))),
    };
    Ok(figment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn from_toml(toml: &str) -> Result<Config> {
        let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml));
        let config = Config::from_figment(figment)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.generation.default_domain, "a-icon.com");
        assert_eq!(config.generation.dedup, Dedup::AlwaysCreate);
        assert!(matches!(config.storage, StorageConfig::Local { .. }));
        assert!(config.database.path.ends_with("aicon.sqlite"));
    }

    #[test]
    fn test_local_storage() {
        let config = from_toml(
            r#"
            [database]
            path = "/var/lib/aicon/db.sqlite"

            [storage]
            backend = "local"
            root = "/srv/aicon"

            [generation]
            dedup = "reuse-existing"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/var/lib/aicon/db.sqlite"));
        assert_eq!(
            config.storage,
            StorageConfig::Local {
                root: PathBuf::from("/srv/aicon")
            }
        );
        assert_eq!(config.generation.dedup, Dedup::ReuseExisting);
        assert_eq!(config.generation.default_domain, "a-icon.com");
    }

    #[test]
    fn test_s3_storage() {
        let config = from_toml(
            r#"
            [storage]
            backend = "s3"
            bucket = "favicons"
            endpoint = "http://localhost:9000"
            key_id = "minio"
            key_secret = "minio123"
            "#,
        )
        .unwrap();
        let StorageConfig::S3 {
            bucket,
            prefix,
            region,
            endpoint,
            ..
        } = config.storage
        else {
            panic!("expected S3 storage");
        };
        assert_eq!(bucket, "favicons");
        assert_eq!(prefix, None);
        assert_eq!(region, "us-east-1");
        assert_eq!(endpoint.as_deref(), Some("http://localhost:9000"));
    }

    #[rstest]
    #[case::relative_root("[storage]\nbackend = \"local\"\nroot = \"relative/dir\"")]
    #[case::empty_bucket("[storage]\nbackend = \"s3\"\nbucket = \" \"\nkey_id = \"a\"\nkey_secret = \"b\"")]
    #[case::missing_secret("[storage]\nbackend = \"s3\"\nbucket = \"b\"\nkey_id = \"a\"\nkey_secret = \"\"")]
    #[case::domain_with_slash("[generation]\ndefault_domain = \"a/b\"")]
    #[case::dot_domain("[generation]\ndefault_domain = \"..\"")]
    fn test_invalid(#[case] toml: &str) {
        let err = from_toml(toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)), "{err:?}");
    }

    #[rstest]
    #[case::unknown_backend("[storage]\nbackend = \"ftp\"")]
    #[case::unknown_dedup("[generation]\ndedup = \"sometimes\"")]
    fn test_malformed(#[case] toml: &str) {
        let err = from_toml(toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load(_)), "{err:?}");
    }

    #[test]
    fn test_file_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "aicon.yaml",
                "storage:\n  backend: local\n  root: /srv/from-file\ngeneration:\n  default_domain: file.io\n",
            )?;
            jail.set_env("AICON_GENERATION__DEFAULT_DOMAIN", "env.io");
            jail.set_env("AICON_DATABASE__PATH", "/tmp/env.sqlite");

            let config = Config::load(Some(Path::new("aicon.yaml"))).unwrap();
            assert_eq!(
                config.storage,
                StorageConfig::Local {
                    root: PathBuf::from("/srv/from-file")
                }
            );
            assert_eq!(config.generation.default_domain, "env.io");
            assert_eq!(config.database.path, PathBuf::from("/tmp/env.sqlite"));
            Ok(())
        });
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aicon.json");
        std::fs::write(&path, r#"{"generation": {"dedup": "reuse-existing"}}"#).unwrap();
        let figment = Config::figment(Some(&path)).unwrap();
        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.generation.dedup, Dedup::ReuseExisting);
    }

    #[rstest]
    #[case::missing("missing.toml", false)]
    #[case::unsupported("aicon.ini", true)]
    #[case::no_extension("aicon", true)]
    fn test_unusable_file(#[case] name: &str, #[case] create: bool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        if create {
            std::fs::write(&path, "x = 1").unwrap();
        }
        let err = Config::figment(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load(_)));
    }
}
