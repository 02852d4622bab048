use std::path::Path;

use pairsolve_core::{Problem, ProblemSet};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Problem not found: {0}")]
    NotFound(String),
}

pub fn load_problem_set(path: &Path) -> Result<ProblemSet, CatalogError> {
    let content = std::fs::read_to_string(path)?;
    let problem_set: ProblemSet = serde_json::from_str(&content)?;
    Ok(problem_set)
}

/// Every `*.json` problem set in `dir`, sorted by file name. Files that do
/// not parse are skipped.
pub fn load_all_problem_sets(dir: &Path) -> Result<Vec<ProblemSet>, CatalogError> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut sets = Vec::new();
    for path in paths {
        match load_problem_set(&path) {
            Ok(set) => sets.push(set),
            Err(e) => tracing::warn!("Skipping problem set {}: {}", path.display(), e),
        }
    }
    Ok(sets)
}

/// Loads a catalog from a single problem set file or a directory of them.
pub fn load_catalog(path: &Path) -> Result<Vec<ProblemSet>, CatalogError> {
    if path.is_dir() {
        return load_all_problem_sets(path);
    }
    Ok(vec![load_problem_set(path)?])
}

/// Looks a problem up by id or title across all sets.
pub fn find_problem<'a>(sets: &'a [ProblemSet], id_or_title: &str) -> Result<&'a Problem, CatalogError> {
    sets.iter()
        .find_map(|set| set.find(id_or_title))
        .ok_or_else(|| CatalogError::NotFound(id_or_title.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairsolve_core::Language;
    use std::fs;

    const ARRAYS: &str = r#"{
        "name": "Arrays",
        "problems": [{
            "id": "two-sum",
            "title": "Two Sum",
            "difficulty": "Easy",
            "examples": [{ "input": "nums = [2,7,11,15], target = 9", "output": "[0,1]" }],
            "starterCode": { "python": "class Solution:\n    def twoSum(self, nums, target):\n        pass" }
        }]
    }"#;

    const STRINGS: &str = r#"{
        "name": "Strings",
        "problems": [{
            "id": "valid-anagram",
            "title": "Valid Anagram",
            "examples": [{ "input": "s = \"anagram\", t = \"nagaram\"", "output": "true" }]
        }]
    }"#;

    #[test]
    fn test_load_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), ARRAYS).unwrap();
        fs::write(dir.path().join("b.json"), STRINGS).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let sets = load_catalog(dir.path()).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].name, "Arrays");

        let problem = find_problem(&sets, "Valid Anagram").unwrap();
        assert_eq!(problem.id, "valid-anagram");
        let problem = find_problem(&sets, "two-sum").unwrap();
        assert!(problem.starter(Language::Python).is_some());
        assert!(matches!(
            find_problem(&sets, "three-sum"),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, ARRAYS).unwrap();
        let sets = load_catalog(&path).unwrap();
        assert_eq!(sets[0].problems[0].examples.len(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_catalog(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
