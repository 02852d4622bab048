use pairsolve_core::{Example, Language};

use crate::adapters::{AdapterRegistry, DriverCase, DriverProgram};
use crate::signature::Unsupported;

impl AdapterRegistry {
    /// Builds the full program for one run. The same inputs always produce
    /// the same text.
    pub fn synthesize_driver(
        &self,
        language: Language,
        source: &str,
        starter: Option<&str>,
        examples: &[Example],
    ) -> Result<DriverProgram, Unsupported> {
        let adapter = self.get(language).ok_or(Unsupported::NoAdapter(language))?;
        let signature = self.detect_signature(language, source, starter)?;

        let cases: Vec<DriverCase> = examples
            .iter()
            .enumerate()
            .map(|(i, example)| DriverCase::from_example(i as u32, example))
            .collect();

        let program = adapter.synthesize_driver(source, &signature, &cases);
        tracing::debug!(
            "Synthesized {} driver for {} ({} cases, {} bytes)",
            language,
            signature.name,
            cases.len(),
            program.len()
        );

        Ok(DriverProgram {
            language,
            callable: signature.name,
            source: program,
            case_count: cases.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sum() -> Vec<Example> {
        vec![
            Example::new("nums = [2,7,11,15], target = 9", "[0,1]"),
            Example::new("nums = [3,2,4], target = 6", "[1,2]"),
        ]
    }

    #[test]
    fn test_every_language_names_the_detected_callable() {
        let registry = AdapterRegistry::new();
        let sources = [
            (Language::JavaScript, "var twoSum = function(nums, target) {\n  return [0, 1];\n};"),
            (Language::TypeScript, "function twoSum(nums: number[], target: number): number[] {\n  return [0, 1];\n}"),
            (Language::Python, "class Solution:\n    def twoSum(self, nums: List[int], target: int) -> List[int]:\n        return [0, 1]"),
            (Language::Java, "class Solution {\n    public int[] twoSum(int[] nums, int target) {\n        return new int[]{0, 1};\n    }\n}"),
            (Language::CSharp, "public class Solution {\n    public int[] twoSum(int[] nums, int target) {\n        return new int[]{0, 1};\n    }\n}"),
            (Language::Cpp, "class Solution {\npublic:\n    vector<int> twoSum(vector<int>& nums, int target) {\n        return {0, 1};\n    }\n};"),
            (Language::C, "int* twoSum(int* nums, int numsSize, int target, int* returnSize) {\n    *returnSize = 0;\n    return NULL;\n}"),
            (Language::Go, "func twoSum(nums []int, target int) []int {\n\treturn []int{0, 1}\n}"),
            (Language::Rust, "impl Solution {\n    pub fn twoSum(nums: Vec<i32>, target: i32) -> Vec<i32> {\n        vec![0, 1]\n    }\n}"),
        ];
        for (language, source) in sources {
            let program = registry
                .synthesize_driver(language, source, None, &two_sum())
                .unwrap_or_else(|e| panic!("{language}: {e}"));
            assert_eq!(program.callable, "twoSum", "{language}");
            assert_eq!(program.case_count, 2, "{language}");
            assert!(program.source.contains("twoSum("), "{language}");
            assert!(program.source.contains("stats"), "{language}");
        }
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let registry = AdapterRegistry::new();
        let source = "def twoSum(nums, target):\n    return [0, 1]";
        let first = registry
            .synthesize_driver(Language::Python, source, None, &two_sum())
            .unwrap();
        let second = registry
            .synthesize_driver(Language::Python, source, None, &two_sum())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unsupported_without_signature() {
        let registry = AdapterRegistry::new();
        let err = registry
            .synthesize_driver(Language::Go, "package main\n", None, &two_sum())
            .unwrap_err();
        assert_eq!(err, Unsupported::NoSignature(Language::Go));

        let err = AdapterRegistry::empty()
            .synthesize_driver(Language::Go, "func f() int {\n}", None, &two_sum())
            .unwrap_err();
        assert_eq!(err, Unsupported::NoAdapter(Language::Go));
    }

    #[test]
    fn test_starter_supplies_signature_for_partial_edit() {
        let registry = AdapterRegistry::new();
        let starter = "class Solution:\n    def isValid(self, s: str) -> bool:\n        pass";
        let program = registry
            .synthesize_driver(
                Language::Python,
                "# still typing",
                Some(starter),
                &[Example::new("s = \"()\"", "true")],
            )
            .unwrap();
        assert_eq!(program.callable, "isValid");
        assert!(program.source.starts_with("import json"));
    }
}
