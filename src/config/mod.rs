//! Policy configuration: the title pattern, the comment text and the scan scopes.
//!
//! The configuration is read from a YAML document:
//!
//! ```yaml
//! needs_retitle:
//!   regexp: "^(fix:|feat:|major:).*$"
//!   error_message: "Please use a conventional title."
//! scopes:
//!   - my-org
//!   - other-org/some-repo
//! ```
//!
//! A [`Configuration`] can only be built from a document whose pattern is
//! non-empty and compiles, so holding one means holding a usable policy.
//! Publication to concurrent readers goes through [`ConfigStore`].

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::types::RepoId;

mod store;

pub use store::ConfigStore;

/// Comment text used when the document does not set `error_message`.
///
/// `%s` is replaced with the configured pattern.
pub const DEFAULT_ERROR_MESSAGE: &str =
    "Wrong title for PR, allowed titles need to match the regular expression: %s";

/// Errors from loading or validating the configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML for the expected shape.
    #[error("invalid configuration document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `needs_retitle.regexp` is missing or empty.
    #[error("needs_retitle.regexp can not be empty")]
    EmptyPattern,

    /// `needs_retitle.regexp` does not compile.
    #[error("error compiling regular expression {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A scope entry is neither `org` nor `org/repo`.
    #[error("invalid scope {0:?}: expected \"org\" or \"org/repo\"")]
    InvalidScope(String),
}

/// Serialization target for the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub needs_retitle: NeedsRetitle,
    pub scopes: Vec<String>,
}

/// The `needs_retitle` section of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NeedsRetitle {
    pub regexp: String,
    pub error_message: String,
}

/// Organizations and repositories enabled for the periodic scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scopes {
    pub orgs: Vec<String>,
    pub repos: Vec<RepoId>,
}

impl Scopes {
    /// Parses scope entries, splitting `org` from `org/repo` and dropping duplicates.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, ConfigError> {
        let mut scopes = Scopes::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.contains('/') {
                let repo =
                    RepoId::parse(entry).ok_or_else(|| ConfigError::InvalidScope(entry.into()))?;
                if !scopes.repos.contains(&repo) {
                    scopes.repos.push(repo);
                }
            } else if entry.is_empty() {
                return Err(ConfigError::InvalidScope(entry.into()));
            } else if !scopes.orgs.iter().any(|o| o == entry) {
                scopes.orgs.push(entry.to_string());
            }
        }
        Ok(scopes)
    }

    pub fn is_empty(&self) -> bool {
        self.orgs.is_empty() && self.repos.is_empty()
    }
}

/// A validated, immutable policy snapshot.
#[derive(Debug, Clone)]
pub struct Configuration {
    pattern: Regex,
    error_message: String,
    scopes: Scopes,
}

impl Configuration {
    /// Compiles a configuration.
    ///
    /// An empty `error_message` selects [`DEFAULT_ERROR_MESSAGE`] formatted
    /// with the pattern.
    pub fn new(pattern: &str, error_message: &str, scopes: Scopes) -> Result<Self, ConfigError> {
        if pattern.is_empty() {
            return Err(ConfigError::EmptyPattern);
        }
        let compiled = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let error_message = if error_message.is_empty() {
            DEFAULT_ERROR_MESSAGE.replace("%s", pattern)
        } else {
            error_message.to_string()
        };

        Ok(Configuration {
            pattern: compiled,
            error_message,
            scopes,
        })
    }

    /// Validates a parsed document.
    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let scopes = Scopes::parse(&file.scopes)?;
        Configuration::new(
            &file.needs_retitle.regexp,
            &file.needs_retitle.error_message,
            scopes,
        )
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(text)?;
        Configuration::from_file(file)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Configuration::from_yaml(&text)
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// The comment text that is posted, and searched for when pruning.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    /// Whether `title` satisfies the pattern.
    ///
    /// This is a search, not a full match: anchoring is up to the pattern.
    pub fn title_ok(&self, title: &str) -> bool {
        self.pattern.is_match(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONVENTIONAL: &str = "^(fix:|feat:|major:).*$";

    #[test]
    fn default_message_mentions_pattern() {
        let config = Configuration::new(CONVENTIONAL, "", Scopes::default()).unwrap();
        assert_eq!(
            config.error_message(),
            "Wrong title for PR, allowed titles need to match the regular expression: ^(fix:|feat:|major:).*$"
        );
    }

    #[test]
    fn custom_message_is_kept() {
        let config =
            Configuration::new(CONVENTIONAL, "Use a conventional title.", Scopes::default())
                .unwrap();
        assert_eq!(config.error_message(), "Use a conventional title.");
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let err = Configuration::new("", "", Scopes::default()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPattern));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = Configuration::new("(unclosed", "", Scopes::default()).unwrap_err();
        match err {
            ConfigError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("expected InvalidPattern, got {other:?}"),
        }
    }

    #[test]
    fn unanchored_pattern_searches() {
        let config = Configuration::new("JIRA-[0-9]+", "", Scopes::default()).unwrap();
        assert!(config.title_ok("fix JIRA-12 crash"));
        assert!(!config.title_ok("fix crash"));
    }

    #[test]
    fn anchored_pattern_is_respected() {
        let config = Configuration::new(CONVENTIONAL, "", Scopes::default()).unwrap();
        assert!(config.title_ok("fix: bug"));
        assert!(!config.title_ok("random fix: bug"));
    }

    #[test]
    fn parse_full_document() {
        let yaml = r#"
needs_retitle:
  regexp: "^(fix:|feat:|major:).*$"
  error_message: "Bad title"
scopes:
  - my-org
  - other-org/some-repo
  - my-org
"#;
        let config = Configuration::from_yaml(yaml).unwrap();
        assert_eq!(config.pattern().as_str(), CONVENTIONAL);
        assert_eq!(config.error_message(), "Bad title");
        assert_eq!(config.scopes().orgs, vec!["my-org".to_string()]);
        assert_eq!(
            config.scopes().repos,
            vec![RepoId::new("other-org", "some-repo")]
        );
    }

    #[test]
    fn missing_section_is_empty_pattern() {
        let err = Configuration::from_yaml("scopes: [my-org]\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPattern));
    }

    #[test]
    fn malformed_scope_is_rejected() {
        let err = Scopes::parse(&["org/repo/extra"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScope(s) if s == "org/repo/extra"));

        let err = Scopes::parse(&[""]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScope(_)));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let err = Configuration::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }
}
