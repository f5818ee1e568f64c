use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::ConnectionTarget;

pub const DEFAULT_CONNECTION: &str = "sqlite:gradestore.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GradestoreConfig {
    /// Connection string of the store, e.g. `sqlite:data/grades.db`
    pub database: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("gradestore.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<GradestoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: GradestoreConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Command line beats config file beats the default.
pub fn resolve_connection(
    cli: Option<&str>,
    config: Option<&GradestoreConfig>,
) -> anyhow::Result<ConnectionTarget> {
    let conn = cli
        .map(str::to_string)
        .or_else(|| config.and_then(|c| c.database.clone()))
        .unwrap_or_else(|| DEFAULT_CONNECTION.to_string());
    Ok(ConnectionTarget::parse(&conn)?)
}

pub fn write_config(path: &Path, config: &GradestoreConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(target: &ConnectionTarget) -> anyhow::Result<()> {
    if let Some(parent) = target.path().and_then(Path::parent) {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradestore.toml");
        let config = GradestoreConfig {
            database: Some("sqlite:course.db".to_string()),
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database.as_deref(), Some("sqlite:course.db"));
    }

    #[test]
    fn test_connection_precedence() {
        let config = GradestoreConfig {
            database: Some("sqlite:from-config.db".to_string()),
        };

        let target = resolve_connection(Some(":memory:"), Some(&config)).unwrap();
        assert_eq!(target, ConnectionTarget::Memory);

        let target = resolve_connection(None, Some(&config)).unwrap();
        assert_eq!(target, ConnectionTarget::File(PathBuf::from("from-config.db")));

        let target = resolve_connection(None, None).unwrap();
        assert_eq!(target, ConnectionTarget::File(PathBuf::from("gradestore.db")));
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let target = ConnectionTarget::File(dir.path().join("nested/deeper/grades.db"));
        ensure_db_dir(&target).unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());
        ensure_db_dir(&ConnectionTarget::Memory).unwrap();
    }
}
