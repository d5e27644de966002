//! sprint-cleaner configuration (`sprint-cleaner.toml`).
//!
//! Defines the typed configuration for the sprint directory convention and
//! the symbol sources used to resolve interpolated test titles. Projects that
//! keep their settings in `package.json` (`config.sprintDir`,
//! `config.enumPaths`) are read as a fallback.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "sprint-cleaner.toml";

/// Fallback file name looked up in the working directory.
pub const PACKAGE_JSON_NAME: &str = "package.json";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level sprint-cleaner configuration.
///
/// Missing fields use defaults. Missing file → all defaults (no error).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CleanerConfig {
    /// Sprint directory convention.
    #[serde(default)]
    pub sprint: SprintConfig,

    /// Symbol name → source file exporting name/value pairs.
    #[serde(default)]
    pub symbols: BTreeMap<String, PathBuf>,
}

// ---------------------------------------------------------------------------
// SprintConfig
// ---------------------------------------------------------------------------

/// Where the sprint files live and how they are named.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SprintConfig {
    /// Default sprint directory, used when `--dir` is not given.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Test-file suffix (default: `".cy.ts"`).
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Shared fixture file excluded from scanning (default: `"base.cy.ts"`).
    #[serde(default = "default_base_file")]
    pub base_file: String,
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            dir: None,
            suffix: default_suffix(),
            base_file: default_base_file(),
        }
    }
}

fn default_suffix() -> String {
    ".cy.ts".to_owned()
}

fn default_base_file() -> String {
    "base.cy.ts".to_owned()
}

// ---------------------------------------------------------------------------
// package.json fallback
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    config: Option<PackageConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageConfig {
    #[serde(default)]
    sprint_dir: Option<PathBuf>,
    #[serde(default)]
    enum_paths: BTreeMap<String, PathBuf>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a sprint-cleaner configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where the effective configuration came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    /// A TOML file.
    File(PathBuf),
    /// The `config` section of a `package.json`.
    PackageJson(PathBuf),
    /// Nothing found; built-in defaults.
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) | Self::PackageJson(p) => write!(f, "{}", p.display()),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

impl CleanerConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// Relative paths in the file are resolved against its directory.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let Some(contents) = read_optional(path)? else {
            return Ok(Self::default());
        };
        let cfg = Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })?;
        Ok(cfg.rebase(parent_dir(path)))
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }

    /// Build configuration from the `config` section of a `package.json`.
    ///
    /// Only `sprintDir` and `enumPaths` are read; everything else in the
    /// manifest is ignored.
    ///
    /// # Errors
    /// Returns `ConfigError` if the text is not valid JSON or the two keys
    /// have the wrong shape.
    pub fn from_package_json(json_str: &str) -> Result<Self, ConfigError> {
        let pkg: PackageJson = serde_json::from_str(json_str).map_err(|e| ConfigError {
            path: None,
            message: format!("line {}: {e}", e.line()),
        })?;
        let Some(config) = pkg.config else {
            return Ok(Self::default());
        };
        Ok(Self {
            sprint: SprintConfig {
                dir: config.sprint_dir,
                ..SprintConfig::default()
            },
            symbols: config.enum_paths,
        })
    }

    /// Locate and load the effective configuration.
    ///
    /// An explicit path must exist (`.json` files are read as `package.json`).
    /// Otherwise `sprint-cleaner.toml`, then `package.json`, are looked up in
    /// `cwd`; if neither exists the defaults are used.
    ///
    /// # Errors
    /// Returns `ConfigError` if the explicit file is missing or any file
    /// found fails to parse.
    pub fn discover(cwd: &Path, explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_owned()
            } else {
                cwd.join(path)
            };
            if !path.is_file() {
                return Err(ConfigError {
                    path: Some(path),
                    message: "config file not found".to_owned(),
                });
            }
            if path.extension().is_some_and(|ext| ext == "json") {
                return Ok((Self::load_package_json(&path)?, ConfigSource::PackageJson(path)));
            }
            return Ok((Self::load(&path)?, ConfigSource::File(path)));
        }

        let toml_path = cwd.join(CONFIG_FILE_NAME);
        if toml_path.is_file() {
            return Ok((Self::load(&toml_path)?, ConfigSource::File(toml_path)));
        }

        let pkg_path = cwd.join(PACKAGE_JSON_NAME);
        if pkg_path.is_file() {
            return Ok((
                Self::load_package_json(&pkg_path)?,
                ConfigSource::PackageJson(pkg_path),
            ));
        }

        Ok((Self::default(), ConfigSource::Defaults))
    }

    fn load_package_json(path: &Path) -> Result<Self, ConfigError> {
        let Some(contents) = read_optional(path)? else {
            return Ok(Self::default());
        };
        let cfg = Self::from_package_json(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })?;
        Ok(cfg.rebase(parent_dir(path)))
    }

    /// Pick the sprint directory: the flag (or `SPRINT_DIR`, which clap folds
    /// into the flag) wins over the configured default.
    #[must_use]
    pub fn sprint_dir(&self, flag: Option<&Path>) -> Option<PathBuf> {
        flag.map(Path::to_path_buf).or_else(|| self.sprint.dir.clone())
    }

    /// Resolve relative paths against `base`.
    #[must_use]
    pub fn rebase(mut self, base: &Path) -> Self {
        if let Some(dir) = self.sprint.dir.take() {
            self.sprint.dir = Some(join_relative(base, dir));
        }
        self.symbols = self
            .symbols
            .into_iter()
            .map(|(name, path)| (name, join_relative(base, path)))
            .collect();
        self
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(c) => Ok(Some(c)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError {
            path: Some(path.to_owned()),
            message: format!("could not read file: {e}"),
        }),
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

fn join_relative(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = CleanerConfig::default();
        assert_eq!(cfg.sprint.dir, None);
        assert_eq!(cfg.sprint.suffix, ".cy.ts");
        assert_eq!(cfg.sprint.base_file, "base.cy.ts");
        assert!(cfg.symbols.is_empty());
    }

    #[test]
    fn parse_empty_is_default() {
        assert_eq!(CleanerConfig::parse("").unwrap(), CleanerConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let cfg = CleanerConfig::parse(
            r#"
[sprint]
dir = "cypress/e2e/sprint"
suffix = ".spec.ts"
base_file = "shared.spec.ts"

[symbols]
ClientModules = "enums/client.ts"
AdminModules = "enums/admin.json"
"#,
        )
        .unwrap();
        assert_eq!(cfg.sprint.dir, Some(PathBuf::from("cypress/e2e/sprint")));
        assert_eq!(cfg.sprint.suffix, ".spec.ts");
        assert_eq!(cfg.sprint.base_file, "shared.spec.ts");
        assert_eq!(cfg.symbols.len(), 2);
        assert_eq!(
            cfg.symbols.get("ClientModules"),
            Some(&PathBuf::from("enums/client.ts"))
        );
    }

    #[test]
    fn unknown_field_reports_line() {
        let err = CleanerConfig::parse("[sprint]\ndir = \"x\"\nflavour = 1\n").unwrap_err();
        assert!(err.message.starts_with("line 3:"), "got: {}", err.message);
        assert!(err.message.contains("flavour"));
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let cfg = CleanerConfig::load(Path::new("/nonexistent/sprint-cleaner.toml")).unwrap();
        assert_eq!(cfg, CleanerConfig::default());
    }

    #[test]
    fn load_resolves_paths_against_file_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[sprint]\ndir = \"sprint\"\n\n[symbols]\nMods = \"/abs/mods.ts\"\nMore = \"rel/more.ts\"\n",
        )
        .unwrap();
        let cfg = CleanerConfig::load(&path).unwrap();
        assert_eq!(cfg.sprint.dir, Some(dir.path().join("sprint")));
        assert_eq!(cfg.symbols["Mods"], PathBuf::from("/abs/mods.ts"));
        assert_eq!(cfg.symbols["More"], dir.path().join("rel/more.ts"));
    }

    #[test]
    fn load_invalid_file_shows_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid [[[toml").unwrap();
        let err = CleanerConfig::load(&path).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn package_json_config_section() {
        let cfg = CleanerConfig::from_package_json(
            r#"{
  "name": "e2e",
  "scripts": { "test": "cypress run" },
  "config": {
    "sprintDir": "cypress/e2e/sprint",
    "enumPaths": { "ClientModules": "cypress/enums/client.ts" }
  }
}"#,
        )
        .unwrap();
        assert_eq!(cfg.sprint.dir, Some(PathBuf::from("cypress/e2e/sprint")));
        assert_eq!(cfg.sprint.suffix, ".cy.ts");
        assert_eq!(
            cfg.symbols["ClientModules"],
            PathBuf::from("cypress/enums/client.ts")
        );
    }

    #[test]
    fn package_json_without_config_is_default() {
        let cfg = CleanerConfig::from_package_json(r#"{"name": "e2e"}"#).unwrap();
        assert_eq!(cfg, CleanerConfig::default());
    }

    #[test]
    fn package_json_invalid_reports_line() {
        let err = CleanerConfig::from_package_json("{\n  \"config\": [\n").unwrap_err();
        assert!(err.message.starts_with("line "), "got: {}", err.message);
    }

    #[test]
    fn discover_prefers_toml_over_package_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[sprint]\ndir = \"from-toml\"\n").unwrap();
        std::fs::write(
            dir.path().join(PACKAGE_JSON_NAME),
            r#"{"config": {"sprintDir": "from-json"}}"#,
        )
        .unwrap();
        let (cfg, source) = CleanerConfig::discover(dir.path(), None).unwrap();
        assert_eq!(cfg.sprint.dir, Some(dir.path().join("from-toml")));
        assert_eq!(source, ConfigSource::File(dir.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn discover_falls_back_to_package_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PACKAGE_JSON_NAME),
            r#"{"config": {"sprintDir": "from-json"}}"#,
        )
        .unwrap();
        let (cfg, source) = CleanerConfig::discover(dir.path(), None).unwrap();
        assert_eq!(cfg.sprint.dir, Some(dir.path().join("from-json")));
        assert!(matches!(source, ConfigSource::PackageJson(_)));
    }

    #[test]
    fn discover_nothing_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, source) = CleanerConfig::discover(dir.path(), None).unwrap();
        assert_eq!(cfg, CleanerConfig::default());
        assert_eq!(source, ConfigSource::Defaults);
    }

    #[test]
    fn discover_explicit_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CleanerConfig::discover(dir.path(), Some(Path::new("missing.toml"))).unwrap_err();
        assert_eq!(err.path, Some(dir.path().join("missing.toml")));
        assert!(err.message.contains("not found"));
    }

    #[test]
    fn flag_wins_over_configured_dir() {
        let cfg = CleanerConfig::parse("[sprint]\ndir = \"configured\"\n").unwrap();
        assert_eq!(
            cfg.sprint_dir(Some(Path::new("flagged"))),
            Some(PathBuf::from("flagged"))
        );
        assert_eq!(cfg.sprint_dir(None), Some(PathBuf::from("configured")));
        assert_eq!(CleanerConfig::default().sprint_dir(None), None);
    }
}
