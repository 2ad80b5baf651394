//! Service configuration.
//!
//! Resolved once at startup from environment variables and passed into the
//! core; nothing reads the environment while requests are handled.

use std::path::PathBuf;

use tarmed_loader::PackagingConfig;

use crate::error::{ServiceError, ServiceResult};

/// Data file or directory to load.
pub const DATA_PATH_VAR: &str = "TARMED_DATA_PATH";
/// Category list overriding the discovered one.
pub const CATEGORIES_PATH_VAR: &str = "TARMED_CATEGORIES_PATH";
/// Rule file to load and evaluate.
pub const RULES_PATH_VAR: &str = "TARMED_RULES_PATH";
/// Directory the sheets are written to.
pub const OUTPUT_DIR_VAR: &str = "TARMED_OUTPUT_DIR";
/// Field delimiter, a single character.
pub const DELIMITER_VAR: &str = "TARMED_DELIMITER";
/// Marker of the relevant tariff system.
pub const TARIFF_VAR: &str = "TARMED_TARIFF";

const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Configuration of the packager binary.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Data file or directory.
    pub data_path: PathBuf,
    /// Explicit category list.
    pub categories_path: Option<PathBuf>,
    /// Rule file.
    pub rules_path: Option<PathBuf>,
    /// Output directory.
    pub output_dir: PathBuf,
    /// Packaging settings.
    pub packaging: PackagingConfig,
}

impl ServiceConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> ServiceResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_path = get(DATA_PATH_VAR)
            .map(PathBuf::from)
            .ok_or_else(|| ServiceError::Config(format!("{DATA_PATH_VAR} is not set")))?;

        let mut packaging = PackagingConfig::default();
        if let Some(delimiter) = get(DELIMITER_VAR) {
            packaging.delimiter = parse_delimiter(&delimiter)?;
        }
        if let Some(tariff) = get(TARIFF_VAR) {
            packaging.relevant_tariff = tariff;
        }

        Ok(Self {
            data_path,
            categories_path: get(CATEGORIES_PATH_VAR).map(PathBuf::from),
            rules_path: get(RULES_PATH_VAR).map(PathBuf::from),
            output_dir: PathBuf::from(
                get(OUTPUT_DIR_VAR).unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            packaging,
        })
    }
}

fn parse_delimiter(value: &str) -> ServiceResult<u8> {
    match value {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match value.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(ServiceError::Config(format!(
                "{DELIMITER_VAR} must be a single ASCII character, got {value:?}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[(DATA_PATH_VAR, "daten.csv")])).unwrap();
        assert_eq!(config.data_path, PathBuf::from("daten.csv"));
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert!(config.categories_path.is_none());
        assert!(config.rules_path.is_none());
        assert_eq!(config.packaging.delimiter, b',');
        assert_eq!(config.packaging.relevant_tariff, "TARMED");
    }

    #[test]
    fn test_all_variables() {
        let config = ServiceConfig::from_lookup(lookup(&[
            (DATA_PATH_VAR, "daten"),
            (CATEGORIES_PATH_VAR, "kat.csv"),
            (RULES_PATH_VAR, "regeln.json"),
            (OUTPUT_DIR_VAR, "/tmp/out"),
            (DELIMITER_VAR, ";"),
            (TARIFF_VAR, "TARDOC"),
        ]))
        .unwrap();
        assert_eq!(config.categories_path, Some(PathBuf::from("kat.csv")));
        assert_eq!(config.rules_path, Some(PathBuf::from("regeln.json")));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.packaging.delimiter, b';');
        assert_eq!(config.packaging.relevant_tariff, "TARDOC");
    }

    #[test]
    fn test_missing_data_path() {
        let err = ServiceConfig::from_lookup(lookup(&[(DATA_PATH_VAR, "  ")])).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn test_delimiter_parsing() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter("|").unwrap(), b'|');
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("ä").is_err());
    }
}
