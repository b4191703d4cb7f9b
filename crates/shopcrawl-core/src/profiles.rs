use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Field every profile must be able to extract.
pub const REQUIRED_FIELD: &str = "title";

/// Uncompiled extraction profile as written in YAML.
///
/// Query strings are CSS selectors with an optional `@attr` suffix; they are
/// compiled by the scraper crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub name: String,
    /// Record-level fallback chain, most specific first.
    pub record_patterns: Vec<String>,
    /// Field name to its own fallback chain.
    pub fields: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ProfilesFile {
    pub profiles: Vec<ProfileConfig>,
}

impl ProfilesFile {
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ProfileConfig> {
        self.profiles.iter().find(|p| p.name == name)
    }
}

/// Load and validate extraction profiles from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_profiles(path: &Path) -> Result<ProfilesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProfilesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_profiles(&content)
}

/// Parse and validate profiles from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or a profile is invalid.
pub fn parse_profiles(content: &str) -> Result<ProfilesFile, ConfigError> {
    let file: ProfilesFile = serde_yaml::from_str(content)?;
    validate_profiles(&file)?;
    Ok(file)
}

fn validate_profiles(file: &ProfilesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for profile in &file.profiles {
        validate_profile(profile)?;
        if !seen.insert(profile.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate profile name: '{}'",
                profile.name
            )));
        }
    }

    Ok(())
}

/// Checks the structural rules every profile must satisfy.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] describing the first violated rule.
pub fn validate_profile(profile: &ProfileConfig) -> Result<(), ConfigError> {
    if profile.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "profile name must be non-empty".to_string(),
        ));
    }

    if profile.record_patterns.iter().all(|p| p.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "profile '{}' has no record patterns",
            profile.name
        )));
    }

    let has_title = profile
        .fields
        .get(REQUIRED_FIELD)
        .is_some_and(|queries| queries.iter().any(|q| !q.trim().is_empty()));
    if !has_title {
        return Err(ConfigError::Validation(format!(
            "profile '{}' must define at least one '{REQUIRED_FIELD}' query",
            profile.name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
profiles:
  - name: furniture-store
    record_patterns:
      - "ul.products > li.product"
      - "div.product-card"
    fields:
      title:
        - "h2.woocommerce-loop-product__title"
        - "a.product-title"
      price:
        - "span.price"
      image:
        - "img@data-src"
        - "img@src"
"#;

    #[test]
    fn parses_valid_profiles() {
        let file = parse_profiles(VALID).unwrap();
        assert_eq!(file.profiles.len(), 1);
        let profile = file.find("furniture-store").unwrap();
        assert_eq!(profile.record_patterns.len(), 2);
        assert_eq!(profile.fields["image"], vec!["img@data-src", "img@src"]);
    }

    #[test]
    fn rejects_profile_without_title_field() {
        let yaml = r#"
profiles:
  - name: broken
    record_patterns: ["li.product"]
    fields:
      price: ["span.price"]
"#;
        let err = parse_profiles(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("title")));
    }

    #[test]
    fn rejects_profile_without_record_patterns() {
        let yaml = r#"
profiles:
  - name: broken
    record_patterns: []
    fields:
      title: ["h2"]
"#;
        let err = parse_profiles(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("record patterns")));
    }

    #[test]
    fn rejects_duplicate_names() {
        let yaml = r#"
profiles:
  - name: twin
    record_patterns: ["li"]
    fields: { title: ["h2"] }
  - name: twin
    record_patterns: ["div"]
    fields: { title: ["h3"] }
"#;
        let err = parse_profiles(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse_profiles("profiles: [").unwrap_err();
        assert!(matches!(err, ConfigError::ProfilesFileParse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_profiles(Path::new("/nonexistent/profiles.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ProfilesFileIo { .. }));
    }
}
