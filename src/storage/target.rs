//! Connection target - where a store lives
//!
//! Accepted forms:
//! - `sqlite:<path>` / `sqlite://<path>`
//! - `jdbc:sqlite:<path>`
//! - `sqlite::memory:` / `:memory:`
//! - a bare file path

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MEMORY: &str = ":memory:";

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionTarget {
    /// Private in-memory database, gone when the store is closed
    Memory,
    /// Database file, created on first open
    File(PathBuf),
}

impl ConnectionTarget {
    /// Parse a connection string
    pub fn parse(conn: &str) -> Result<Self> {
        let conn = conn.trim();

        let (scheme_required, rest) = match conn.strip_prefix("jdbc:") {
            Some(rest) => (true, rest),
            None => (false, conn),
        };

        let rest = match rest
            .strip_prefix("sqlite://")
            .or_else(|| rest.strip_prefix("sqlite:"))
        {
            Some(rest) => rest,
            None if scheme_required => {
                return Err(Error::InvalidConnection(format!(
                    "Unsupported driver in {}, only sqlite is available",
                    conn
                )));
            }
            None => rest,
        };

        if rest.is_empty() {
            return Err(Error::InvalidConnection(format!("Missing database path in '{}'", conn)));
        }

        if rest == MEMORY {
            Ok(ConnectionTarget::Memory)
        } else {
            Ok(ConnectionTarget::File(PathBuf::from(rest)))
        }
    }

    /// File path of the database, `None` for in-memory
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConnectionTarget::Memory => None,
            ConnectionTarget::File(path) => Some(path),
        }
    }

    /// Convert to connection string
    pub fn to_connection_string(&self) -> String {
        match self {
            ConnectionTarget::Memory => format!("sqlite:{}", MEMORY),
            ConnectionTarget::File(path) => format!("sqlite:{}", path.display()),
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

impl FromStr for ConnectionTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ConnectionTarget {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_connection_string())
    }
}

impl<'de> Deserialize<'de> for ConnectionTarget {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ConnectionTarget::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_forms() {
        let expected = ConnectionTarget::File(PathBuf::from("data/grades.db"));
        assert_eq!(ConnectionTarget::parse("sqlite:data/grades.db").unwrap(), expected);
        assert_eq!(ConnectionTarget::parse("sqlite://data/grades.db").unwrap(), expected);
        assert_eq!(ConnectionTarget::parse("jdbc:sqlite:data/grades.db").unwrap(), expected);
        assert_eq!(ConnectionTarget::parse("  data/grades.db ").unwrap(), expected);
    }

    #[test]
    fn test_parse_memory() {
        assert_eq!(ConnectionTarget::parse("sqlite::memory:").unwrap(), ConnectionTarget::Memory);
        assert_eq!(ConnectionTarget::parse(":memory:").unwrap(), ConnectionTarget::Memory);
        assert_eq!(ConnectionTarget::parse("jdbc:sqlite::memory:").unwrap(), ConnectionTarget::Memory);
        assert!(ConnectionTarget::Memory.path().is_none());
    }

    #[test]
    fn test_invalid_targets() {
        assert!(ConnectionTarget::parse("").is_err());
        assert!(ConnectionTarget::parse("sqlite:").is_err());
        assert!(ConnectionTarget::parse("jdbc:postgresql://localhost/grades").is_err());
    }

    #[test]
    fn test_display_parses_back() {
        let target = ConnectionTarget::File(PathBuf::from("grades.db"));
        assert_eq!(target.to_string(), "sqlite:grades.db");
        assert_eq!(target.to_string().parse::<ConnectionTarget>().unwrap(), target);
    }
}
