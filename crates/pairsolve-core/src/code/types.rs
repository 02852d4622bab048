use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Language;

/// One literal input/expected-output pair shown with a problem.
///
/// `input` uses the `name = literal, name = literal` notation, e.g.
/// `nums = [2,7,11,15], target = 9`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Example {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            explanation: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    #[serde(alias = "easy")]
    Easy,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "hard")]
    Hard,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub examples: Vec<Example>,
    #[serde(default, alias = "starterCode")]
    pub starter_code: HashMap<Language, String>,
    /// Stored output per language, used only when no driver can be built.
    #[serde(default, alias = "expectedOutput")]
    pub expected_output: HashMap<Language, String>,
}

impl Problem {
    pub fn starter(&self, language: Language) -> Option<&str> {
        self.starter_code.get(&language).map(String::as_str)
    }

    pub fn legacy_expected(&self, language: Language) -> Option<&str> {
        self.expected_output.get(&language).map(String::as_str)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProblemSet {
    pub name: String,
    pub problems: Vec<Problem>,
}

impl ProblemSet {
    pub fn find(&self, id_or_title: &str) -> Option<&Problem> {
        self.problems
            .iter()
            .find(|p| p.id == id_or_title || p.title.eq_ignore_ascii_case(id_or_title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_accepts_catalog_field_names() {
        let json = r#"{
            "id": "two-sum",
            "title": "Two Sum",
            "difficulty": "Easy",
            "examples": [{ "input": "nums = [2,7,11,15], target = 9", "output": "[0,1]" }],
            "starterCode": { "python": "def twoSum(nums, target):\n    pass" },
            "expectedOutput": { "javascript": "[0,1]" }
        }"#;
        let problem: Problem = serde_json::from_str(json).unwrap();
        assert_eq!(problem.examples.len(), 1);
        assert!(problem.starter(Language::Python).unwrap().starts_with("def twoSum"));
        assert_eq!(problem.legacy_expected(Language::JavaScript), Some("[0,1]"));
        assert_eq!(problem.legacy_expected(Language::Java), None);
    }

    #[test]
    fn test_find_by_id_or_title() {
        let set = ProblemSet {
            name: "demo".into(),
            problems: vec![Problem {
                id: "two-sum".into(),
                title: "Two Sum".into(),
                ..Default::default()
            }],
        };
        assert!(set.find("two-sum").is_some());
        assert!(set.find("two sum").is_some());
        assert!(set.find("three-sum").is_none());
    }
}
