//! Deployment settings for the request log.
//!
//! Everything here is `serde`-deserializable so it can sit in whatever config
//! file the embedding service already reads.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::sink::Tenure;

/// The environment the service runs in.
///
/// The only behavioural difference today: `Production` drops DEBUG lines
/// from request logs.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
    Testing,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production  => "production",
            Self::Development => "development",
            Self::Testing     => "testing",
        }
    }
}

/// Parses the lowercase names `production`, `development`, `testing`.
impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production"  => Ok(Self::Production),
            "development" => Ok(Self::Development),
            "testing"     => Ok(Self::Testing),
            other         => Err(UnknownEnvironment(other.to_owned())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown environment `{0}`")]
pub struct UnknownEnvironment(pub String);

/// Where and how a [`FileSink`](crate::FileSink) writes.
#[derive(Clone, Debug, Deserialize)]
pub struct FileSinkConfig {
    /// Directory the log files live in.
    pub dir: PathBuf,
    /// Appended to every file name, before `.txt`.
    pub suffix: String,
    /// How long one file collects records before the next one starts.
    #[serde(default)]
    pub tenure: Tenure,
}
