// Framework configuration

use crate::http::MethodOverride;
use crate::routing::MatchPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported definition file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }

    /// Detect the format from a file path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                Error::Config(format!("No file extension found: {}", path.display()))
            })?;

        Self::from_extension(ext)
            .ok_or_else(|| Error::Config(format!("Unsupported format: {}", ext)))
    }
}

/// What the boundary does with a handler's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionPolicy {
    /// Emit only textual output of JSON-negotiated requests. Everything else
    /// relies on what the handler wrote to the context.
    #[default]
    JsonText,
    /// Always emit the return value: text as is, structured values as JSON.
    Always,
}

impl FromStr for EmissionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "json_text" => Ok(EmissionPolicy::JsonText),
            "always" => Ok(EmissionPolicy::Always),
            other => Err(Error::Config(format!("unknown emission policy '{}'", other))),
        }
    }
}

/// Framework settings.
///
/// Every field has a default, so a configuration file only needs the values
/// it changes.
///
/// # Examples
///
/// ```
/// use trellis_core::{EmissionPolicy, FrameworkConfig, MatchPolicy};
///
/// let config = FrameworkConfig::from_toml_str(r#"
///     app_name = "blog"
///     emission = "always"
/// "#).unwrap();
///
/// assert_eq!(config.app_name, "blog");
/// assert_eq!(config.emission, EmissionPolicy::Always);
/// assert_eq!(config.match_policy, MatchPolicy::ScanAll);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    pub app_name: String,
    pub debug: bool,
    /// Route definition file, JSON or TOML.
    pub routes: Option<PathBuf>,
    pub match_policy: MatchPolicy,
    /// Serve `HEAD` from `GET` routes. Off gives strict 405 classification.
    pub head_fallback: bool,
    pub emission: EmissionPolicy,
    pub method_override_field: String,
    pub method_override_header: String,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        let overrides = MethodOverride::default();
        Self {
            app_name: "Trellis".to_string(),
            debug: false,
            routes: None,
            match_policy: MatchPolicy::default(),
            head_fallback: true,
            emission: EmissionPolicy::default(),
            method_override_field: overrides.field,
            method_override_header: overrides.header,
            secure_cookies: false,
        }
    }
}

impl FrameworkConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("TOML parse error: {}", e)))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(format!("JSON parse error: {}", e)))
    }

    /// Load from a file, picking the parser from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        match FileFormat::from_path(path)? {
            FileFormat::Json => Self::from_json_str(&content),
            FileFormat::Toml => Self::from_toml_str(&content),
        }
    }

    /// Defaults with `TRELLIS_*` overrides from the process environment,
    /// after loading a `.env` file when one exists.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `TRELLIS_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("TRELLIS_APP_NAME") {
            self.app_name = name;
        }
        if let Some(debug) = lookup("TRELLIS_DEBUG") {
            self.debug = parse_bool("TRELLIS_DEBUG", &debug)?;
        }
        if let Some(routes) = lookup("TRELLIS_ROUTES") {
            self.routes = Some(PathBuf::from(routes));
        }
        if let Some(policy) = lookup("TRELLIS_MATCH_POLICY") {
            self.match_policy = policy.parse()?;
        }
        if let Some(fallback) = lookup("TRELLIS_HEAD_FALLBACK") {
            self.head_fallback = parse_bool("TRELLIS_HEAD_FALLBACK", &fallback)?;
        }
        if let Some(emission) = lookup("TRELLIS_EMISSION") {
            self.emission = emission.parse()?;
        }
        if let Some(field) = lookup("TRELLIS_METHOD_OVERRIDE_FIELD") {
            self.method_override_field = field;
        }
        if let Some(header) = lookup("TRELLIS_METHOD_OVERRIDE_HEADER") {
            self.method_override_header = header;
        }
        if let Some(secure) = lookup("TRELLIS_SECURE_COOKIES") {
            self.secure_cookies = parse_bool("TRELLIS_SECURE_COOKIES", &secure)?;
        }
        Ok(())
    }

    pub fn method_override(&self) -> MethodOverride {
        MethodOverride {
            field: self.method_override_field.clone(),
            header: self.method_override_header.clone(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = FrameworkConfig::default();
        assert_eq!(config.emission, EmissionPolicy::JsonText);
        assert_eq!(config.match_policy, MatchPolicy::ScanAll);
        assert!(config.head_fallback);
        assert_eq!(config.method_override(), MethodOverride::default());
    }

    #[test]
    fn test_from_json() {
        let config = FrameworkConfig::from_json_str(
            r#"{"match_policy": "first_structural", "routes": "routes.toml"}"#,
        )
        .unwrap();
        assert_eq!(config.match_policy, MatchPolicy::FirstStructural);
        assert_eq!(config.routes, Some(PathBuf::from("routes.toml")));
        assert_eq!(config.app_name, "Trellis");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            FrameworkConfig::from_toml_str("emission = 3"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            FrameworkConfig::from_json_str(r#"{"match_policy": "best"}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TRELLIS_APP_NAME", "shop"),
            ("TRELLIS_DEBUG", "yes"),
            ("TRELLIS_EMISSION", "always"),
            ("TRELLIS_HEAD_FALLBACK", "off"),
            ("TRELLIS_METHOD_OVERRIDE_FIELD", "__verb"),
        ]
        .into_iter()
        .collect();

        let mut config = FrameworkConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.app_name, "shop");
        assert!(config.debug);
        assert_eq!(config.emission, EmissionPolicy::Always);
        assert!(!config.head_fallback);
        assert_eq!(config.method_override().field, "__verb");
        assert_eq!(config.method_override().header, "X-HTTP-Method-Override");
    }

    #[test]
    fn test_env_override_errors() {
        let mut config = FrameworkConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "TRELLIS_DEBUG").then(|| "maybe".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_file_format_detection() {
        assert_eq!(
            FileFormat::from_path(Path::new("routes.TOML")).unwrap(),
            FileFormat::Toml
        );
        assert!(FileFormat::from_path(Path::new("routes")).is_err());
        assert!(FileFormat::from_path(Path::new("routes.yaml")).is_err());
    }
}
