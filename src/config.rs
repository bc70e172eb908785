use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Credit load assumed for each remaining semester by the target solver
    pub credits_per_semester: f64,
    pub remaining_semesters: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Documents extracted at the same time
    pub max_concurrent_documents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            credits_per_semester: 21.0,
            remaining_semesters: 1,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_documents: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Defaults, then the optional file, then environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(credits) = lookup("TRANSCRIPT_GPA_CREDITS_PER_SEM")
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|credits| *credits > 0.0)
        {
            self.analysis.credits_per_semester = credits;
        }

        if let Some(limit) = lookup("TRANSCRIPT_GPA_MAX_CONCURRENT")
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|limit| *limit > 0)
        {
            self.batch.max_concurrent_documents = limit;
        }

        if let Some(level) = lookup("TRANSCRIPT_GPA_LOG_LEVEL").filter(|level| !level.is_empty()) {
            self.logging.level = level;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.credits_per_semester, 21.0);
        assert_eq!(config.analysis.remaining_semesters, 1);
        assert_eq!(config.batch.max_concurrent_documents, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript-gpa.toml");
        std::fs::write(&path, "[analysis]\ncredits_per_semester = 20.0\n").unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.analysis.credits_per_semester, 20.0);
        assert_eq!(config.batch.max_concurrent_documents, 3);
    }

    #[test]
    fn env_overrides_valid_values_only() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TRANSCRIPT_GPA_CREDITS_PER_SEM", "20"),
            ("TRANSCRIPT_GPA_MAX_CONCURRENT", "0"),
            ("TRANSCRIPT_GPA_LOG_LEVEL", "debug"),
        ]);
        let config = AppConfig::default()
            .with_env_overrides(|key| env.get(key).map(|value| value.to_string()));
        assert_eq!(config.analysis.credits_per_semester, 20.0);
        assert_eq!(config.batch.max_concurrent_documents, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(AppConfig::load_from_file(Path::new("/nonexistent/config.toml")).is_err());
    }
}
