// Remote runtime mapping per language, loaded from languages.json
use anyhow::{bail, Context, Result};
use assessor_common::types::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_RUNTIME_VERSION: &str = "latest";

fn default_version() -> String {
    DEFAULT_RUNTIME_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Our language name (python, javascript, java)
    pub name: String,
    /// Language identifier understood by the execution service
    pub runtime: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// File name submitted with the source, when the runtime cares
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, LanguageConfig>,
}

impl Default for LanguageConfigManager {
    fn default() -> Self {
        let configs = Language::all_variants()
            .iter()
            .map(|language| (*language, builtin_config(*language)))
            .collect();
        Self { configs }
    }
}

fn builtin_config(language: Language) -> LanguageConfig {
    let (runtime, file_name) = match language {
        Language::Python => ("python", "main.py"),
        Language::JavaScript => ("javascript", "main.js"),
        Language::Java => ("java", "Main.java"),
    };
    LanguageConfig {
        name: language.to_string(),
        runtime: runtime.to_string(),
        version: default_version(),
        file_name: Some(file_name.to_string()),
    }
}

impl LanguageConfigManager {
    /// Load language configurations from languages.json.
    /// Languages missing from the file keep their built-in mapping.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let languages_json: LanguagesJson =
            serde_json::from_str(content).context("Failed to parse languages.json")?;

        let mut manager = Self::default();
        for config in languages_json.languages {
            let Some(language) = Language::from_str(&config.name) else {
                bail!("Unsupported language in config: {}", config.name);
            };
            manager.configs.insert(language, config);
        }

        Ok(manager)
    }

    /// Load the file if present; built-in mapping otherwise
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }
        warn!(
            path = %config_path.display(),
            "Language config not found, using built-in runtime mapping"
        );
        Ok(Self::default())
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: Language) -> LanguageConfig {
        self.configs
            .get(&language)
            .cloned()
            .unwrap_or_else(|| builtin_config(language))
    }

    /// List all configured languages
    pub fn list_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.configs.keys().copied().collect();
        languages.sort_by_key(|language| language.to_string());
        languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_defaults_cover_every_language() {
        let manager = LanguageConfigManager::default();
        for language in Language::all_variants() {
            let config = manager.get_config(*language);
            assert_eq!(config.version, "latest");
            assert!(config.file_name.is_some());
        }
        assert_eq!(manager.get_config(Language::Java).file_name.as_deref(), Some("Main.java"));
    }

    #[test]
    fn test_load_overrides_version() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"languages": [{{"name": "python", "runtime": "python", "version": "3.10.0", "file_name": "solution.py"}}]}}"#
        )
        .unwrap();

        let manager = LanguageConfigManager::load(file.path()).unwrap();
        let python = manager.get_config(Language::Python);
        assert_eq!(python.version, "3.10.0");
        assert_eq!(python.file_name.as_deref(), Some("solution.py"));
        assert_eq!(manager.get_config(Language::JavaScript).runtime, "javascript");
    }

    #[test]
    fn test_missing_version_defaults_to_latest() {
        let manager =
            LanguageConfigManager::from_json(r#"{"languages": [{"name": "js", "runtime": "node"}]}"#).unwrap();
        let config = manager.get_config(Language::JavaScript);
        assert_eq!(config.runtime, "node");
        assert_eq!(config.version, "latest");
        assert_eq!(config.file_name, None);
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let result = LanguageConfigManager::from_json(r#"{"languages": [{"name": "cobol", "runtime": "cobol"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(LanguageConfigManager::load(&path).is_err());
        assert_eq!(
            LanguageConfigManager::load_or_default(&path).unwrap().list_languages().len(),
            Language::all_variants().len()
        );
    }

    #[test]
    fn test_repository_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/languages.json");
        let manager = LanguageConfigManager::load(&path).unwrap();
        assert_eq!(manager.get_config(Language::Python).runtime, "python");
    }
}
