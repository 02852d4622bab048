//! Best-effort discovery of the callable a solution exposes.

use std::sync::OnceLock;

use pairsolve_core::Language;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type token that marks a singly linked list parameter or result.
pub const LINKED_LIST_MARKER: &str = "ListNode";

/// Names that show up in solutions without being the entry point.
const HELPER_NAMES: &[&str] = &[
    "min", "max", "abs", "main", "helper", "swap", "gcd", "lcm", "dfs", "bfs",
];

/// Words that a loose `type name(` pattern picks up inside bodies or from
/// constructors.
const NON_CALLABLE_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "return", "sizeof", "catch", "new", "delete", "else",
    "Solution", "ListNode", "TreeNode", "__init__",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableSignature {
    pub name: String,
    /// One entry per declared parameter; empty string where no type is known.
    pub param_types: Vec<String>,
    pub param_names: Vec<String>,
    pub return_type: Option<String>,
    /// Type the callable is reached through, e.g. `Solution` for
    /// `impl Solution { pub fn .. }`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl CallableSignature {
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_types: Vec::new(),
            param_names: Vec::new(),
            return_type: None,
            owner: None,
        }
    }

    pub fn param_type(&self, index: usize) -> Option<&str> {
        self.param_types
            .get(index)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn mentions_linked_list(&self) -> bool {
        self.param_types.iter().any(|t| t.contains(LINKED_LIST_MARKER))
            || self
                .return_type
                .as_deref()
                .is_some_and(|t| t.contains(LINKED_LIST_MARKER))
    }

    pub fn returns_linked_list(&self) -> bool {
        self.return_type
            .as_deref()
            .is_some_and(|t| t.contains(LINKED_LIST_MARKER))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unsupported {
    #[error("no driver adapter registered for {0}")]
    NoAdapter(Language),
    #[error("no callable signature found in {0} source")]
    NoSignature(Language),
}

pub(crate) fn is_candidate_name(name: &str) -> bool {
    !HELPER_NAMES.contains(&name) && !NON_CALLABLE_NAMES.contains(&name)
}

/// Splits a parameter list on commas that are not nested inside `<>`, `()`,
/// `[]` or `{}`.
pub(crate) fn split_params(list: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in list.chars() {
        match c {
            '<' | '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            '>' | ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth <= 0 => {
                params.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        params.push(current.trim().to_string());
    }
    params.retain(|p| !p.is_empty());
    params
}

fn line_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"//[^\n]*").expect("invalid line comment regex"))
}

fn block_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("invalid block comment regex"))
}

/// Drops `//` and `/* */` comments so commented-out declarations (the usual
/// `Definition for singly-linked list` block) are not mistaken for code.
pub(crate) fn strip_c_comments(source: &str) -> String {
    let without_blocks = block_comment().replace_all(source, " ");
    line_comment().replace_all(&without_blocks, "").into_owned()
}

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "public:", "private:", "protected:", "internal", "static",
    "final", "virtual", "override", "abstract", "synchronized", "unsafe", "async", "inline",
    "extern", "const", "sealed", "ref", "out", "in", "params",
];

const NON_TYPES: &[&str] = &["return", "new", "else", "throw", "case", "goto", "delete"];

/// Declarations in C-family languages, with the pattern capturing
/// `(return type)(separator)(name)(parameter list)`.
pub(crate) fn detect_typed_callable(source: &str, pattern: &Regex) -> Option<CallableSignature> {
    let code = strip_c_comments(source);
    pattern.captures_iter(&code).find_map(|caps| {
        let name = caps.get(3)?.as_str();
        if !is_candidate_name(name) {
            return None;
        }
        let separator: String = caps
            .get(2)
            .map_or("", |m| m.as_str())
            .chars()
            .filter(|c| *c == '*' || *c == '&')
            .collect();
        let return_type = clean_type(caps.get(1)?.as_str()) + &separator;
        if return_type.is_empty() || NON_TYPES.contains(&return_type.as_str()) {
            return None;
        }
        let (param_types, param_names) = split_params(caps.get(4).map_or("", |m| m.as_str()))
            .iter()
            .map(|param| split_typed_param(param))
            .filter(|(ty, _)| ty != "void")
            .unzip();
        Some(CallableSignature {
            name: name.to_string(),
            param_types,
            param_names,
            return_type: Some(return_type),
            owner: None,
        })
    })
}

fn without_modifiers(raw: &str) -> String {
    let kept: Vec<&str> = raw
        .split_whitespace()
        .filter(|t| !MODIFIERS.contains(t) && !t.starts_with('@'))
        .collect();
    kept.join(" ")
}

fn glue_markers(ty: &str) -> String {
    ty.replace(" *", "*").replace(" &", "&").replace(" [", "[")
}

fn clean_type(raw: &str) -> String {
    glue_markers(&without_modifiers(raw))
}

/// `int[] nums` becomes `("int[]", "nums")`; pointer and array markers glued
/// to the name move onto the type.
pub(crate) fn split_typed_param(param: &str) -> (String, String) {
    let cleaned = without_modifiers(param);
    let Some((ty, name)) = cleaned.rsplit_once(' ') else {
        return (cleaned, String::new());
    };
    let mut ty = glue_markers(ty.trim());
    let mut name = name;
    while let Some(rest) = name.strip_prefix(|c: char| c == '*' || c == '&') {
        ty.push_str(&name[..1]);
        name = rest;
    }
    while let Some(rest) = name.strip_suffix("[]") {
        ty.push_str("[]");
        name = rest;
    }
    (ty, name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_typed_param() {
        assert_eq!(split_typed_param("int[] nums"), ("int[]".into(), "nums".into()));
        assert_eq!(split_typed_param("final int k"), ("int".into(), "k".into()));
        assert_eq!(
            split_typed_param("struct ListNode *head"),
            ("struct ListNode*".into(), "head".into())
        );
        assert_eq!(
            split_typed_param("const vector<int> & nums"),
            ("vector<int>&".into(), "nums".into())
        );
        assert_eq!(split_typed_param("char s[]"), ("char[]".into(), "s".into()));
        assert_eq!(
            split_typed_param("Map<String, Integer> counts"),
            ("Map<String, Integer>".into(), "counts".into())
        );
    }

    #[test]
    fn test_split_params_respects_generics() {
        assert_eq!(
            split_params("Map<String, Integer> counts, int k"),
            vec!["Map<String, Integer> counts", "int k"]
        );
        assert_eq!(split_params(""), Vec::<String>::new());
        assert_eq!(split_params(" a , b "), vec!["a", "b"]);
    }

    #[test]
    fn test_strip_comments() {
        let src = "/**\n * struct ListNode {\n *   ListNode() {}\n * };\n */\nint f(int x) { // trailing\n}";
        let stripped = strip_c_comments(src);
        assert!(!stripped.contains("ListNode"));
        assert!(stripped.contains("int f(int x)"));
        assert!(!stripped.contains("trailing"));
    }

    #[test]
    fn test_linked_list_detection() {
        let sig = CallableSignature {
            name: "reverseList".into(),
            param_types: vec!["ListNode*".into()],
            param_names: vec!["head".into()],
            return_type: Some("ListNode*".into()),
            owner: None,
        };
        assert!(sig.mentions_linked_list());
        assert!(sig.returns_linked_list());
        assert!(!CallableSignature::untyped("f").mentions_linked_list());
    }
}
