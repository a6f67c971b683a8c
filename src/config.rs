//! Configuration adapter.
//!
//! Resolves the style framework's breakpoint names and token separator once per
//! compilation unit. Only the key set of `theme.screens` matters to the macro.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::debug;

use crate::errors::MacroError;

pub const DEFAULT_SEPARATOR: &str = ":";
pub const DEFAULT_SCREENS: [&str; 5] = ["sm", "md", "lg", "xl", "2xl"];
pub const DEFAULT_CONFIG_FILE: &str = "tailwind.config.json";
pub const DEFAULT_IMPORT_NAME: &str = "tw";

/// Resolved, read-only configuration shared by the resolver and the variant composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailwindConfig {
    pub screens: BTreeSet<String>,
    pub separator: String,
}

impl Default for TailwindConfig {
    fn default() -> Self {
        Self::resolve(UserConfig::default())
    }
}

impl TailwindConfig {
    pub fn new<I, S>(screens: I, separator: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            screens: screens.into_iter().map(Into::into).collect(),
            separator: separator.into(),
        }
    }

    pub fn is_screen(&self, name: &str) -> bool {
        self.screens.contains(name)
    }

    /// Merges a user config over the framework defaults.
    ///
    /// `theme.screens` replaces the default breakpoints, `theme.extend.screens` adds to
    /// whichever set is in effect.
    pub fn resolve(user: UserConfig) -> Self {
        let mut screens: BTreeSet<String> = match user.theme.screens {
            Some(screens) => screens.into_keys().collect(),
            None => DEFAULT_SCREENS.iter().map(|s| s.to_string()).collect(),
        };
        if let Some(extra) = user.theme.extend.screens {
            screens.extend(extra.into_keys());
        }

        Self {
            screens,
            separator: user
                .separator
                .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
        }
    }

    /// Loads and resolves the config at `path`.
    ///
    /// A missing file resolves an empty user config. JSON is assumed unless the
    /// extension is `yaml` or `yml`.
    pub fn load(path: &Path) -> Result<Self, MacroError> {
        if !path.exists() {
            debug!(path = %path.display(), "no tailwind config found, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|e| MacroError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let user: UserConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&text).map_err(|e| e.to_string()),
            _ => serde_json::from_str(&text).map_err(|e| e.to_string()),
        }
        .map_err(|reason| MacroError::Config {
            path: path.to_path_buf(),
            reason,
        })?;

        let config = Self::resolve(user);
        debug!(
            path = %path.display(),
            screens = ?config.screens,
            separator = %config.separator,
            "loaded tailwind config"
        );
        Ok(config)
    }
}

/// The subset of a user-authored tailwind config the macro reads.
#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub theme: UserTheme,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserTheme {
    #[serde(default)]
    pub screens: Option<BTreeMap<String, IgnoredAny>>,
    #[serde(default)]
    pub extend: UserThemeExtend,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserThemeExtend {
    #[serde(default)]
    pub screens: Option<BTreeMap<String, IgnoredAny>>,
}

/// Options handed to the macro by the host, mirroring the macro's own config object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MacroOptions {
    /// Exported name of the macro function.
    pub import_name: String,
    /// Config file, relative to `source_root` unless absolute.
    pub config: PathBuf,
    pub source_root: PathBuf,
}

impl Default for MacroOptions {
    fn default() -> Self {
        Self {
            import_name: DEFAULT_IMPORT_NAME.to_string(),
            config: PathBuf::from(DEFAULT_CONFIG_FILE),
            source_root: PathBuf::from("."),
        }
    }
}

impl MacroOptions {
    pub fn config_path(&self) -> PathBuf {
        self.source_root.join(&self.config)
    }

    pub fn load_config(&self) -> Result<TailwindConfig, MacroError> {
        TailwindConfig::load(&self.config_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = TailwindConfig::load(Path::new("/nonexistent/tailwind.config.json")).unwrap();
        assert_eq!(config, TailwindConfig::default());
        assert_eq!(config.separator, ":");
        assert!(config.is_screen("2xl"));
        assert!(!config.is_screen("hover"));
    }

    #[test]
    fn test_json_screens_replace_defaults() {
        let file = write_config(
            ".json",
            r#"{ "separator": "_", "theme": { "screens": { "tablet": "640px", "desktop": { "min": "1280px" } } } }"#,
        );
        let config = TailwindConfig::load(file.path()).unwrap();
        assert_eq!(config.separator, "_");
        assert_eq!(
            config.screens,
            ["desktop", "tablet"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn test_yaml_extend_adds_screens() {
        let file = write_config(".yaml", "theme:\n  extend:\n    screens:\n      3xl: 1920px\n");
        let config = TailwindConfig::load(file.path()).unwrap();
        assert!(config.is_screen("3xl"));
        assert!(config.is_screen("sm"));
        assert_eq!(config.separator, ":");
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let file = write_config(".json", "{ not json");
        let err = TailwindConfig::load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_options_deserialize_camel_case() {
        let options: MacroOptions =
            serde_json::from_str(r#"{ "importName": "css", "config": "tw.yml" }"#).unwrap();
        assert_eq!(options.import_name, "css");
        assert_eq!(options.config_path(), PathBuf::from("./tw.yml"));
    }
}
