//! Configuration Model (spec.md §4.4): a typed projection over a
//! caller-supplied mapping. The core never loads YAML or JSON itself — it
//! takes a `serde_json::Value` that some external collaborator (the binary's
//! `main.rs`, or a test) already produced. See SPEC_FULL.md §4.4.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::diagnostics::{codes, Diagnostic, Severity};
use crate::errors::ConfigError;
use crate::model::{Language, LinkClassification, Visibility};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetMapping {
    pub dest_name: Option<String>,
    pub type_override: Option<String>,
    pub link_libs: Vec<String>,
    pub include_dirs: Vec<String>,
    pub defines: Vec<String>,
    pub options: Vec<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOverride {
    pub classification: LinkClassification,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub project_name: String,
    pub version: Option<semver::Version>,
    pub namespace: String,
    pub languages: Option<HashSet<Language>>,
    pub target_mappings: HashMap<String, TargetMapping>,
    pub flag_mappings: HashMap<String, String>,
    pub ignore_paths: Vec<String>,
    pub global_config_files: HashSet<String>,
    pub link_overrides: HashMap<String, LinkOverride>,
    pub packaging_enabled: bool,
    pub strict: bool,
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_name: "project".to_string(),
            version: None,
            namespace: "project".to_string(),
            languages: None,
            target_mappings: HashMap::new(),
            flag_mappings: HashMap::new(),
            ignore_paths: Vec::new(),
            global_config_files: crate::DEFAULT_GLOBAL_CONFIG_FILES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            link_overrides: HashMap::new(),
            packaging_enabled: false,
            strict: false,
            jobs: 1,
        }
    }
}

/// Strips characters that are not valid in a C identifier and ensures the
/// result does not start with a digit, per spec.md §4.4's namespace default.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        out.insert(0, '_');
    }
    if out.is_empty() {
        out.push_str("project");
    }
    out
}

const RECOGNIZED_KEYS: &[&str] = &[
    "project_name",
    "version",
    "namespace",
    "languages",
    "target_mappings",
    "flag_mappings",
    "ignore_paths",
    "global_config_files",
    "link_overrides",
    "packaging_enabled",
    "strict",
    "jobs",
];

impl Config {
    /// Builds a `Config` from a generic mapping, collecting schema
    /// diagnostics rather than failing outright — only malformed values
    /// (wrong shape) are hard errors; unknown keys are warnings, promoted to
    /// errors under `strict` once that flag itself has been read.
    pub fn from_value(value: Value) -> Result<(Config, Vec<Diagnostic>), ConfigError> {
        let object = value.as_object().ok_or(ConfigError::NotAnObject)?.clone();
        let mut diagnostics = Vec::new();
        let mut config = Config::default();

        let strict = object
            .get("strict")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        config.strict = strict;

        for key in object.keys() {
            if !RECOGNIZED_KEYS.contains(&key.as_str()) {
                let message = format!("unrecognized configuration key \"{}\"", key);
                let severity = if strict { Severity::Error } else { Severity::Warn };
                diagnostics.push(Diagnostic::new(severity, codes::CONFIG_SCHEMA, message));
            }
        }

        if let Some(name) = object.get("project_name") {
            config.project_name = expect_string(name, "project_name")?;
        }

        if let Some(version) = object.get("version") {
            let raw = expect_string(version, "version")?;
            config.version = Some(
                semver::Version::parse(&raw)
                    .map_err(|_| ConfigError::WrongShape("version".to_string()))?,
            );
        }

        config.namespace = match object.get("namespace") {
            Some(ns) => expect_string(ns, "namespace")?,
            None => sanitize_identifier(&config.project_name),
        };

        if let Some(languages) = object.get("languages") {
            let arr = languages
                .as_array()
                .ok_or_else(|| ConfigError::WrongShape("languages".to_string()))?;
            let mut set = HashSet::new();
            for entry in arr {
                let raw = expect_string(entry, "languages")?;
                set.insert(parse_language(&raw)?);
            }
            config.languages = Some(set);
        }

        if let Some(mappings) = object.get("target_mappings") {
            config.target_mappings = parse_target_mappings(mappings)?;
        }

        if let Some(mappings) = object.get("flag_mappings") {
            let obj = mappings
                .as_object()
                .ok_or_else(|| ConfigError::WrongShape("flag_mappings".to_string()))?;
            for (k, v) in obj {
                config
                    .flag_mappings
                    .insert(k.clone(), expect_string(v, "flag_mappings")?);
            }
        }

        if let Some(ignore) = object.get("ignore_paths") {
            let arr = ignore
                .as_array()
                .ok_or_else(|| ConfigError::WrongShape("ignore_paths".to_string()))?;
            for entry in arr {
                config
                    .ignore_paths
                    .push(expect_string(entry, "ignore_paths")?.replace('\\', "/"));
            }
        }

        if let Some(files) = object.get("global_config_files") {
            let arr = files
                .as_array()
                .ok_or_else(|| ConfigError::WrongShape("global_config_files".to_string()))?;
            config.global_config_files = arr
                .iter()
                .map(|v| expect_string(v, "global_config_files"))
                .collect::<Result<HashSet<_>, _>>()?;
        }

        if let Some(overrides) = object.get("link_overrides") {
            config.link_overrides = parse_link_overrides(overrides)?;
        }

        if let Some(p) = object.get("packaging_enabled") {
            config.packaging_enabled = p
                .as_bool()
                .ok_or_else(|| ConfigError::WrongShape("packaging_enabled".to_string()))?;
        }

        if let Some(jobs) = object.get("jobs") {
            config.jobs = jobs
                .as_u64()
                .ok_or_else(|| ConfigError::WrongShape("jobs".to_string()))? as usize;
        }

        Ok((config, diagnostics))
    }
}

fn expect_string(value: &Value, field: &str) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ConfigError::WrongShape(field.to_string()))
}

fn parse_language(raw: &str) -> Result<Language, ConfigError> {
    match raw {
        "c" => Ok(Language::C),
        "cpp" | "cxx" | "c++" => Ok(Language::Cpp),
        "asm" => Ok(Language::Asm),
        "other" => Ok(Language::Other),
        _ => Err(ConfigError::WrongShape("languages".to_string())),
    }
}

fn parse_target_mappings(value: &Value) -> Result<HashMap<String, TargetMapping>, ConfigError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ConfigError::WrongShape("target_mappings".to_string()))?;
    let mut out = HashMap::new();
    for (src, entry) in obj {
        let entry_obj = entry
            .as_object()
            .ok_or_else(|| ConfigError::WrongShape("target_mappings".to_string()))?;
        let mapping = TargetMapping {
            dest_name: entry_obj.get("dest_name").map(|v| expect_string(v, "dest_name")).transpose()?,
            type_override: entry_obj
                .get("type_override")
                .map(|v| expect_string(v, "type_override"))
                .transpose()?,
            link_libs: string_array(entry_obj.get("link_libs"))?,
            include_dirs: string_array(entry_obj.get("include_dirs"))?,
            defines: string_array(entry_obj.get("defines"))?,
            options: string_array(entry_obj.get("options"))?,
            visibility: entry_obj
                .get("visibility")
                .map(|v| parse_visibility(v))
                .transpose()?,
        };
        out.insert(src.clone(), mapping);
    }
    Ok(out)
}

fn parse_visibility(value: &Value) -> Result<Visibility, ConfigError> {
    match expect_string(value, "visibility")?.as_str() {
        "PUBLIC" => Ok(Visibility::Public),
        "PRIVATE" => Ok(Visibility::Private),
        "INTERFACE" => Ok(Visibility::Interface),
        _ => Err(ConfigError::WrongShape("visibility".to_string())),
    }
}

fn string_array(value: Option<&Value>) -> Result<Vec<String>, ConfigError> {
    match value {
        None => Ok(Vec::new()),
        Some(v) => v
            .as_array()
            .ok_or_else(|| ConfigError::WrongShape("expected array".to_string()))?
            .iter()
            .map(|e| expect_string(e, "expected string"))
            .collect(),
    }
}

fn parse_link_overrides(value: &Value) -> Result<HashMap<String, LinkOverride>, ConfigError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ConfigError::WrongShape("link_overrides".to_string()))?;
    let mut out = HashMap::new();
    for (name, entry) in obj {
        let entry_obj = entry
            .as_object()
            .ok_or_else(|| ConfigError::WrongShape("link_overrides".to_string()))?;
        let classification = match entry_obj
            .get("classification")
            .map(|v| expect_string(v, "classification"))
            .transpose()?
            .as_deref()
        {
            Some("internal") => LinkClassification::Internal,
            Some("external") => LinkClassification::External,
            Some("imported") => {
                let imported_target = entry_obj
                    .get("imported_target")
                    .map(|v| expect_string(v, "imported_target"))
                    .transpose()?
                    .ok_or_else(|| ConfigError::WrongShape("imported_target".to_string()))?;
                LinkClassification::Imported { imported_target }
            }
            _ => return Err(ConfigError::WrongShape("classification".to_string())),
        };
        let alias = entry_obj.get("alias").map(|v| expect_string(v, "alias")).transpose()?;
        out.insert(name.clone(), LinkOverride { classification, alias });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_identifier_strips_non_identifier_chars() {
        assert_eq!(sanitize_identifier("my-proj.v2"), "my_proj_v2");
    }

    #[test]
    fn sanitize_identifier_prefixes_leading_digit() {
        assert_eq!(sanitize_identifier("2fast"), "_2fast");
    }

    #[test]
    fn namespace_defaults_to_sanitized_project_name() {
        let (config, _) = Config::from_value(json!({"project_name": "my-proj"})).unwrap();
        assert_eq!(config.namespace, "my_proj");
    }

    #[test]
    fn unknown_key_is_warning_unless_strict() {
        let (_, diagnostics) = Config::from_value(json!({"bogus": 1})).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warn);
    }

    #[test]
    fn unknown_key_is_error_under_strict() {
        let (_, diagnostics) = Config::from_value(json!({"strict": true, "bogus": 1})).unwrap();
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn wrong_shape_is_hard_error() {
        let result = Config::from_value(json!({"project_name": 5}));
        assert!(result.is_err());
    }

    #[test]
    fn global_config_files_default_set() {
        let (config, _) = Config::from_value(json!({})).unwrap();
        assert!(config.global_config_files.contains("config.mk"));
        assert!(config.global_config_files.contains("rules.mk"));
        assert!(config.global_config_files.contains("defs.mk"));
    }

    #[test]
    fn link_overrides_parse_imported_classification() {
        let (config, _) = Config::from_value(json!({
            "link_overrides": {
                "fmt": {"classification": "imported", "imported_target": "fmt::fmt"}
            }
        }))
        .unwrap();
        let over = config.link_overrides.get("fmt").unwrap();
        assert_eq!(
            over.classification,
            LinkClassification::Imported { imported_target: "fmt::fmt".to_string() }
        );
    }
}
