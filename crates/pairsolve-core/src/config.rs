use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Language, PairSolveError, Result};

pub const PISTON_URL_ENV: &str = "PISTON_URL";
pub const CATALOG_ENV: &str = "PAIRSOLVE_CATALOG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairSolveConfig {
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl PairSolveConfig {
    /// Reads a JSON config file, then applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PairSolveConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config.with_env_overrides())
    }

    /// Loads `path` when given, otherwise starts from defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default().with_env_overrides()),
        }
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(PISTON_URL_ENV) {
            self.sandbox.base_url = url;
        }
        if let Ok(path) = std::env::var(CATALOG_ENV) {
            self.catalog.path = Some(PathBuf::from(path));
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.sandbox.base_url.trim().is_empty() {
            return Err(PairSolveError::Config("sandbox.base_url is empty".into()));
        }
        if self.sandbox.timeout_ms == 0 {
            return Err(PairSolveError::Config("sandbox.timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Language to sandbox runtime mapping; a language needs an entry here
    /// before anything written in it can be executed. Entries from a config
    /// file replace the default for their language only.
    #[serde(default = "default_runtimes", deserialize_with = "merge_runtimes")]
    pub runtimes: BTreeMap<Language, RuntimeSpec>,
}

impl SandboxConfig {
    pub fn runtime(&self, language: Language) -> Option<&RuntimeSpec> {
        self.runtimes.get(&language)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://emkc.org/api/v2/piston".to_string(),
            timeout_ms: default_timeout_ms(),
            runtimes: default_runtimes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSpec {
    pub language: String,
    pub version: String,
    pub file_name: String,
}

impl RuntimeSpec {
    fn new(language: &str, version: &str, file_name: &str) -> Self {
        Self {
            language: language.to_string(),
            version: version.to_string(),
            file_name: file_name.to_string(),
        }
    }
}

fn default_runtimes() -> BTreeMap<Language, RuntimeSpec> {
    BTreeMap::from([
        (Language::JavaScript, RuntimeSpec::new("javascript", "18.15.0", "index.js")),
        (Language::TypeScript, RuntimeSpec::new("typescript", "5.0.3", "index.ts")),
        (Language::Python, RuntimeSpec::new("python", "3.10.0", "main.py")),
        (Language::Java, RuntimeSpec::new("java", "15.0.2", "Main.java")),
        (Language::CSharp, RuntimeSpec::new("csharp", "6.12.0", "Program.cs")),
        (Language::Cpp, RuntimeSpec::new("c++", "10.2.0", "main.cpp")),
        (Language::C, RuntimeSpec::new("c", "10.2.0", "main.c")),
        (Language::Go, RuntimeSpec::new("go", "1.16.2", "main.go")),
        (Language::Rust, RuntimeSpec::new("rust", "1.68.2", "main.rs")),
    ])
}

fn merge_runtimes<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<Language, RuntimeSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<Language, RuntimeSpec>::deserialize(deserializer)?;
    let mut runtimes = default_runtimes();
    runtimes.extend(overrides);
    Ok(runtimes)
}

fn default_interview_delay_ms() -> u64 {
    2_500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_interview_delay_ms")]
    pub interview_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interview_delay_ms: default_interview_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_cover_every_language() {
        let config = SandboxConfig::default();
        for lang in Language::all() {
            assert!(config.runtime(*lang).is_some(), "missing runtime for {}", lang);
        }
        assert_eq!(config.runtime(Language::Cpp).unwrap().language, "c++");
        assert_eq!(config.runtime(Language::Java).unwrap().file_name, "Main.java");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "sandbox": {{ "base_url": "http://localhost:2000/api/v2" }}, "session": {{}} }}"#
        )
        .unwrap();

        let config: PairSolveConfig =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(config.sandbox.base_url, "http://localhost:2000/api/v2");
        assert_eq!(config.sandbox.timeout_ms, 10_000);
        assert_eq!(config.sandbox.runtimes.len(), Language::all().len());
        assert_eq!(config.session.interview_delay_ms, 2_500);
        assert!(config.catalog.path.is_none());
    }

    #[test]
    fn test_runtime_override_merges_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "sandbox": {{ "base_url": "http://localhost:2000/api/v2", "runtimes": {{ "python": {{ "language": "python", "version": "3.12.0", "file_name": "main.py" }} }} }} }}"#
        )
        .unwrap();

        let config = PairSolveConfig::load(file.path()).unwrap();
        let runtimes = &config.sandbox.runtimes;
        assert_eq!(runtimes.len(), Language::all().len());
        assert_eq!(config.sandbox.runtime(Language::Python).unwrap().version, "3.12.0");
        assert_eq!(config.sandbox.runtime(Language::Java).unwrap().version, "15.0.2");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = PairSolveConfig::default();
        config.sandbox.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(PairSolveError::Config(_))));
    }
}
