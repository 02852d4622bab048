use std::fmt::Write as _;
use std::sync::OnceLock;

use pairsolve_core::Language;
use regex::Regex;
use serde_json::Value;

use super::{fill, json_quoted, mismatch, DriverCase, LanguageAdapter};
use crate::signature::{is_candidate_name, split_params, CallableSignature, LINKED_LIST_MARKER};

pub struct PythonAdapter;

fn def_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"def\s+(\w+)\s*\(([^)]*)\)\s*(?:->\s*([^:]+?))?\s*:")
            .expect("invalid python def regex")
    })
}

fn defines_list_node() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*class\s+ListNode\b").expect("invalid class regex"))
}

const PRELUDE: &str = r#"import json
import sys
import traceback
import bisect
import collections
import functools
import heapq
import itertools
import math
import re
import string
from typing import *
"#;

const LIST_NODE_CLASS: &str = r#"
class ListNode:
    def __init__(self, val=0, next=None):
        self.val = val
        self.next = next
"#;

const LIST_HELPERS: &str = r#"
def __pairsolve_to_list_node(values):
    head = None
    for value in reversed(values):
        head = ListNode(value, head)
    return head


def __pairsolve_from_list_node(node):
    values = []
    while node is not None:
        values.append(node.val)
        node = node.next
    return values
"#;

const RUNNER: &str = r#"

def __pairsolve_fail(message):
    raise ValueError(message)


def __pairsolve_plain(value):
    if "ListNode" in globals() and isinstance(value, globals()["ListNode"]):
        return __pairsolve_from_list_node(value)
    if isinstance(value, (list, tuple)):
        return [__pairsolve_plain(item) for item in value]
    return value


def __pairsolve_dump(value):
    return json.dumps(__pairsolve_plain(value), separators=(",", ":"), ensure_ascii=False)


def __pairsolve_resolve(name):
    try:
        instance = Solution()
        if hasattr(instance, name):
            return getattr(instance, name)
    except Exception:
        pass
    return globals().get(name)


def __pairsolve_run(name):
    func = __pairsolve_resolve(name)
    if func is None:
        print(json.dumps({"stats": {"passed": 0, "total": 0}, "results": [],
                          "error": "Function '" + name + "' not found"}))
        return
    passed = 0
    results = []
    for index, test in enumerate(__pairsolve_tests):
        try:
            result = test["call"](func)
            actual = @SERIALIZE@
            expected = test["expected"]
            is_pass = "".join(actual.split()) == "".join(expected.split()) \
                or str(result).lower() == expected.lower()
            if is_pass:
                passed += 1
            results.append({"id": index, "passed": is_pass, "actual": actual,
                            "expected": expected, "input": test["input"]})
        except Exception:
            results.append({"id": index, "passed": False, "error": traceback.format_exc()})
    print(json.dumps({"stats": {"passed": passed, "total": len(__pairsolve_tests)}, "results": results}))
"#;

fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => json_quoted(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", json_quoted(k), python_literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn detect_signature(&self, source: &str) -> Option<CallableSignature> {
        def_pattern().captures_iter(source).find_map(|caps| {
            let name = caps.get(1)?.as_str();
            if !is_candidate_name(name) || name.starts_with("__") {
                return None;
            }
            let mut param_names = Vec::new();
            let mut param_types = Vec::new();
            for param in split_params(caps.get(2).map_or("", |m| m.as_str())) {
                let declared = param.split('=').next().unwrap_or("").trim();
                let (pname, ptype) = match declared.split_once(':') {
                    Some((n, t)) => (n.trim(), t.trim()),
                    None => (declared, ""),
                };
                if pname == "self" || pname == "cls" || pname.starts_with('*') || pname == "/" {
                    continue;
                }
                param_names.push(pname.to_string());
                param_types.push(ptype.trim_matches(|c| c == '"' || c == '\'').to_string());
            }
            Some(CallableSignature {
                name: name.to_string(),
                param_types,
                param_names,
                return_type: caps.get(3).map(|m| m.as_str().trim().to_string()),
                owner: None,
            })
        })
    }

    fn render_arg(&self, value: &Value, param_type: Option<&str>) -> Result<String, String> {
        match param_type {
            Some(ty) if ty.contains(LINKED_LIST_MARKER) => match value {
                Value::Array(_) => Ok(format!("__pairsolve_to_list_node({})", python_literal(value))),
                Value::Null => Ok("None".to_string()),
                _ => Err(mismatch(value, ty)),
            },
            _ => Ok(python_literal(value)),
        }
    }

    fn build_invocation(&self, _signature: &CallableSignature, args: &[String]) -> String {
        format!("func({})", args.join(", "))
    }

    /// A linked-list result is walked into a list first so an empty list
    /// (`None`) prints as `[]`.
    fn build_serialization(&self, signature: &CallableSignature, result: &str) -> Result<String, String> {
        match signature.returns_linked_list() {
            true => Ok(format!("__pairsolve_dump(__pairsolve_from_list_node({result}))")),
            false => Ok(format!("__pairsolve_dump({result})")),
        }
    }

    fn synthesize_driver(
        &self,
        source: &str,
        signature: &CallableSignature,
        cases: &[DriverCase],
    ) -> String {
        let mut program = String::from(PRELUDE);
        let uses_lists = signature.mentions_linked_list() || source.contains(LINKED_LIST_MARKER);
        if uses_lists && !defines_list_node().is_match(source) {
            program.push_str(LIST_NODE_CLASS);
        }
        if uses_lists {
            program.push_str(LIST_HELPERS);
        }
        program.push_str("\n\n");
        program.push_str(source);
        let serialize = self
            .build_serialization(signature, "result")
            .unwrap_or_else(|_| "repr(result)".to_string());
        program.push_str(&fill(RUNNER, &[("SERIALIZE", serialize.as_str())]));

        program.push_str("\n__pairsolve_tests = [\n");
        for case in cases {
            let call = match self.render_args(signature, case) {
                Ok(args) => self.build_invocation(signature, &args),
                Err(message) => format!("__pairsolve_fail({})", json_quoted(&message)),
            };
            let _ = writeln!(
                program,
                "    {{\"call\": lambda func: {}, \"expected\": {}, \"input\": {}}},",
                call,
                json_quoted(&case.expected),
                json_quoted(&case.input)
            );
        }
        program.push_str("]\n\n");
        let _ = writeln!(program, "__pairsolve_run({})", json_quoted(&signature.name));
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STARTER: &str = "class Solution:\n    def twoSum(self, nums: List[int], target: int) -> List[int]:\n        pass\n";

    #[test]
    fn test_detects_method_with_hints() {
        let sig = PythonAdapter.detect_signature(STARTER).unwrap();
        assert_eq!(sig.name, "twoSum");
        assert_eq!(sig.param_names, vec!["nums", "target"]);
        assert_eq!(sig.param_types, vec!["List[int]", "int"]);
        assert_eq!(sig.return_type.as_deref(), Some("List[int]"));
    }

    #[test]
    fn test_skips_helpers_and_dunders() {
        let src = "class Solution:\n    def __init__(self):\n        pass\n    def helper(self, x):\n        pass\n    def solve(self, x):\n        return x\n";
        assert_eq!(PythonAdapter.detect_signature(src).unwrap().name, "solve");
        assert!(PythonAdapter.detect_signature("x = 1").is_none());
    }

    #[test]
    fn test_render_python_literals() {
        let adapter = PythonAdapter;
        assert_eq!(
            adapter.render_arg(&json!([true, null, "a"]), None).unwrap(),
            r#"[True, None, "a"]"#
        );
        assert_eq!(
            adapter.render_arg(&json!([1, 2]), Some("Optional[ListNode]")).unwrap(),
            "__pairsolve_to_list_node([1, 2])"
        );
        assert!(adapter.render_arg(&json!("x"), Some("ListNode")).is_err());
    }

    #[test]
    fn test_invocation_and_serialization() {
        let sig = PythonAdapter.detect_signature(STARTER).unwrap();
        assert_eq!(
            PythonAdapter.build_invocation(&sig, &["[1, 2]".into(), "3".into()]),
            "func([1, 2], 3)"
        );
        assert_eq!(
            PythonAdapter.build_serialization(&sig, "out").unwrap(),
            "__pairsolve_dump(out)"
        );
    }

    #[test]
    fn test_empty_linked_list_result_serializes_as_empty_list() {
        let src = "class Solution:\n    def reverseList(self, head: Optional[ListNode]) -> Optional[ListNode]:\n        return None\n";
        let sig = PythonAdapter.detect_signature(src).unwrap();
        assert_eq!(
            PythonAdapter.build_serialization(&sig, "result").unwrap(),
            "__pairsolve_dump(__pairsolve_from_list_node(result))"
        );

        let cases = vec![DriverCase {
            id: 0,
            args: vec![json!([])],
            expected: "[]".into(),
            input: "[]".into(),
        }];
        let program = PythonAdapter.synthesize_driver(src, &sig, &cases);
        assert!(program.contains("def __pairsolve_from_list_node(node):"));
        assert!(program.contains("actual = __pairsolve_dump(__pairsolve_from_list_node(result))"));
        assert!(program.contains("func(__pairsolve_to_list_node([]))"));
    }

    #[test]
    fn test_program_embeds_every_case() {
        let sig = PythonAdapter.detect_signature(STARTER).unwrap();
        let cases = vec![
            DriverCase {
                id: 0,
                args: vec![json!([2, 7, 11, 15]), json!(9)],
                expected: "[0,1]".into(),
                input: "[2,7,11,15], 9".into(),
            },
            DriverCase {
                id: 1,
                args: vec![json!([3, 2, 4]), json!(6)],
                expected: "[1,2]".into(),
                input: "[3,2,4], 6".into(),
            },
        ];
        let program = PythonAdapter.synthesize_driver(STARTER, &sig, &cases);
        assert!(program.contains(STARTER));
        assert!(program.contains(
            r#"{"call": lambda func: func([2, 7, 11, 15], 9), "expected": "[0,1]""#
        ));
        assert!(program.contains("actual = __pairsolve_dump(result)"));
        assert!(program.contains(r#""expected": "[1,2]""#));
        assert!(program.trim_end().ends_with(r#"__pairsolve_run("twoSum")"#));
        assert!(!program.contains("class ListNode"));
    }
}
