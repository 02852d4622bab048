use std::fmt::Write as _;
use std::sync::OnceLock;

use pairsolve_core::Language;
use regex::Regex;
use serde_json::Value;

use super::{
    array_items, bool_literal, char_value, fill, float_literal, infer_shape, int_items,
    int_literal, json_quoted, quoted_char, string_value, DriverCase, LanguageAdapter, Shape,
};
use crate::signature::{
    is_candidate_name, split_params, strip_c_comments, CallableSignature, LINKED_LIST_MARKER,
};

pub struct GoAdapter;

fn func_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"func\s+(\w+)\s*\(([^)]*)\)\s*([^{\n]*)\{").expect("invalid go func regex")
    })
}

fn defines_list_node() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\btype\s+ListNode\s+struct\b").expect("invalid ListNode regex"))
}

const IMPORTS: &[&str] = &[
    "\"bytes\"",
    "\"encoding/json\"",
    "\"fmt\"",
    "\"runtime/debug\"",
    "\"strings\"",
];

const LIST_NODE_TYPE: &str = r#"
type ListNode struct {
	Val  int
	Next *ListNode
}
"#;

const LIST_HELPERS: &str = r#"
func pairsolveToList(values []int) *ListNode {
	var head *ListNode
	for i := len(values) - 1; i >= 0; i-- {
		head = &ListNode{Val: values[i], Next: head}
	}
	return head
}

func pairsolveFromList(head *ListNode) []int {
	values := []int{}
	for node := head; node != nil; node = node.Next {
		values = append(values, node.Val)
	}
	return values
}
"#;

const LIST_TO_JSON: &str = "\tif head, ok := v.(*ListNode); ok {\n\t\tv = pairsolveFromList(head)\n\t}\n";

const RUNNER: &str = r#"
type pairsolveStats struct {
	Passed int `json:"passed"`
	Total  int `json:"total"`
}

type pairsolveSummary struct {
	Stats   pairsolveStats           `json:"stats"`
	Results []map[string]interface{} `json:"results"`
}

func pairsolveJSON(v interface{}) string {
@LIST_TO_JSON@	if b, ok := v.([]byte); ok {
		v = string(b)
	}
	var buf bytes.Buffer
	enc := json.NewEncoder(&buf)
	enc.SetEscapeHTML(false)
	if err := enc.Encode(v); err != nil {
		return fmt.Sprintf("%v", v)
	}
	return strings.TrimRight(buf.String(), "\n")
}

func pairsolveStrip(s string) string {
	return strings.Join(strings.Fields(s), "")
}

func pairsolveCase(id int, input string, expected string, call func() interface{}) (entry map[string]interface{}, passed bool) {
	defer func() {
		if r := recover(); r != nil {
			entry = map[string]interface{}{"id": id, "passed": false, "error": fmt.Sprintf("panic: %v\n%s", r, debug.Stack())}
			passed = false
		}
	}()
	result := call()
	actual := @SERIALIZE@
	passed = pairsolveStrip(actual) == pairsolveStrip(expected) || strings.EqualFold(fmt.Sprint(result), expected)
	entry = map[string]interface{}{"id": id, "passed": passed, "actual": actual, "expected": expected, "input": input}
	return entry, passed
}

func main() {
	cases := []struct {
		input    string
		expected string
		call     func() interface{}
	}{
@CASES@	}
	summary := pairsolveSummary{Stats: pairsolveStats{Total: len(cases)}, Results: []map[string]interface{}{}}
	for i, c := range cases {
		entry, ok := pairsolveCase(i, c.input, c.expected, c.call)
		if ok {
			summary.Stats.Passed++
		}
		summary.Results = append(summary.Results, entry)
	}
	out, _ := json.Marshal(summary)
	fmt.Println(string(out))
}
"#;

/// Splits `package`/`import` declarations off the solution, returning the
/// import specs and the remaining code.
fn split_imports(source: &str) -> (Vec<String>, String) {
    let mut imports = Vec::new();
    let mut body = Vec::new();
    let mut in_block = false;
    for line in source.lines() {
        let trimmed = line.trim();
        if in_block {
            if trimmed == ")" {
                in_block = false;
            } else if !trimmed.is_empty() && !trimmed.starts_with("//") {
                imports.push(trimmed.to_string());
            }
        } else if trimmed.starts_with("package ") {
            continue;
        } else if trimmed.starts_with("import (") {
            in_block = true;
        } else if let Some(spec) = trimmed.strip_prefix("import ") {
            imports.push(spec.trim().to_string());
        } else {
            body.push(line);
        }
    }
    (imports, body.join("\n"))
}

fn go_type(shape: &Shape) -> String {
    match shape {
        Shape::Int => "int".to_string(),
        Shape::Float => "float64".to_string(),
        Shape::Bool => "bool".to_string(),
        Shape::Str => "string".to_string(),
        Shape::List(inner) => format!("[]{}", go_type(inner)),
    }
}

fn render(value: &Value, ty: &str) -> Result<String, String> {
    let ty = ty.trim();
    if ty.contains(LINKED_LIST_MARKER) {
        return Ok(format!("pairsolveToList([]int{{{}}})", int_items(value)?.join(", ")));
    }
    if let Some(elem) = ty.strip_prefix("[]") {
        if let ("byte", Value::String(s)) = (elem, value) {
            return Ok(format!("[]byte({})", json_quoted(s)));
        }
        let items = array_items(value)?
            .iter()
            .map(|item| render(item, elem))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(format!("{}{{{}}}", ty, items.join(", ")));
    }
    match ty {
        "int" | "int64" | "int32" | "int16" | "int8" | "uint" | "uint64" | "uint32" => int_literal(value),
        "float64" | "float32" => float_literal(value),
        "bool" => bool_literal(value),
        "byte" | "rune" => Ok(quoted_char(char_value(value)?)),
        "string" => Ok(json_quoted(string_value(value)?)),
        "" | "interface{}" | "any" => render(value, &go_type(&infer_shape(value))),
        other => Err(format!("unsupported parameter type {other}")),
    }
}

impl LanguageAdapter for GoAdapter {
    fn language(&self) -> Language {
        Language::Go
    }

    fn detect_signature(&self, source: &str) -> Option<CallableSignature> {
        let code = strip_c_comments(source);
        func_pattern().captures_iter(&code).find_map(|caps| {
            let name = caps.get(1)?.as_str();
            if !is_candidate_name(name) {
                return None;
            }
            // `a, b int` declares both a and b as int
            let mut param_names = Vec::new();
            let mut param_types = Vec::new();
            for param in split_params(caps.get(2).map_or("", |m| m.as_str())) {
                match param.split_once(char::is_whitespace) {
                    Some((pname, ptype)) => {
                        param_names.push(pname.to_string());
                        param_types.push(ptype.trim().to_string());
                    }
                    None => {
                        param_names.push(param);
                        param_types.push(String::new());
                    }
                }
            }
            let mut inherited = String::new();
            for ty in param_types.iter_mut().rev() {
                if ty.is_empty() {
                    ty.clone_from(&inherited);
                } else {
                    inherited.clone_from(ty);
                }
            }
            let return_type = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .filter(|t| !t.is_empty());
            Some(CallableSignature {
                name: name.to_string(),
                param_types,
                param_names,
                return_type,
                owner: None,
            })
        })
    }

    fn render_arg(&self, value: &Value, param_type: Option<&str>) -> Result<String, String> {
        render(value, param_type.unwrap_or(""))
    }

    fn build_invocation(&self, signature: &CallableSignature, args: &[String]) -> String {
        format!("{}({})", signature.name, args.join(", "))
    }

    fn build_serialization(&self, _signature: &CallableSignature, result: &str) -> Result<String, String> {
        Ok(format!("pairsolveJSON({result})"))
    }

    fn synthesize_driver(
        &self,
        source: &str,
        signature: &CallableSignature,
        cases: &[DriverCase],
    ) -> String {
        let (user_imports, body) = split_imports(source);
        let uses_lists = signature.mentions_linked_list() || source.contains(LINKED_LIST_MARKER);

        let mut program = String::from("package main\n\nimport (\n");
        for import in IMPORTS {
            let _ = writeln!(program, "\t{import}");
        }
        for import in &user_imports {
            if !IMPORTS.contains(&import.as_str()) {
                let _ = writeln!(program, "\t{import}");
            }
        }
        program.push_str(")\n\n");
        program.push_str(body.trim());
        program.push('\n');
        if uses_lists {
            if !defines_list_node().is_match(&strip_c_comments(source)) {
                program.push_str(LIST_NODE_TYPE);
            }
            program.push_str(LIST_HELPERS);
        }

        let mut entries = String::new();
        for case in cases {
            let call = match self.render_args(signature, case) {
                Ok(args) => format!(
                    "func() interface{{}} {{ return {} }}",
                    self.build_invocation(signature, &args)
                ),
                Err(message) => format!("func() interface{{}} {{ panic({}) }}", json_quoted(&message)),
            };
            let _ = writeln!(
                entries,
                "\t\t{{{}, {}, {}}},",
                json_quoted(&case.input),
                json_quoted(&case.expected),
                call
            );
        }

        let serialize = self
            .build_serialization(signature, "result")
            .unwrap_or_else(|_| "fmt.Sprint(result)".to_string());
        program.push_str(&fill(
            RUNNER,
            &[
                ("LIST_TO_JSON", if uses_lists { LIST_TO_JSON } else { "" }),
                ("SERIALIZE", serialize.as_str()),
                ("CASES", entries.as_str()),
            ],
        ));
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detects_grouped_params() {
        let sig = GoAdapter
            .detect_signature("func addRange(lo, hi int, scale float64) []int {\n\treturn nil\n}")
            .unwrap();
        assert_eq!(sig.name, "addRange");
        assert_eq!(sig.param_names, vec!["lo", "hi", "scale"]);
        assert_eq!(sig.param_types, vec!["int", "int", "float64"]);
        assert_eq!(sig.return_type.as_deref(), Some("[]int"));
    }

    #[test]
    fn test_skips_main() {
        let src = "func main() {\n}\n\nfunc isValid(s string) bool {\n\treturn true\n}";
        assert_eq!(GoAdapter.detect_signature(src).unwrap().name, "isValid");
    }

    #[test]
    fn test_render_slices() {
        let go = GoAdapter;
        assert_eq!(
            go.render_arg(&json!([[1, 2], [3]]), Some("[][]int")).unwrap(),
            "[][]int{[]int{1, 2}, []int{3}}"
        );
        assert_eq!(
            go.render_arg(&json!([["1", "0"]]), Some("[][]byte")).unwrap(),
            "[][]byte{[]byte{'1', '0'}}"
        );
        assert_eq!(
            go.render_arg(&json!([1, 2]), Some("*ListNode")).unwrap(),
            "pairsolveToList([]int{1, 2})"
        );
    }

    #[test]
    fn test_program_merges_imports() {
        let src = "package main\n\nimport (\n\t\"sort\"\n\t\"strings\"\n)\n\nfunc twoSum(nums []int, target int) []int {\n\tsort.Ints(nums)\n\treturn nil\n}";
        let sig = GoAdapter.detect_signature(src).unwrap();
        let case = DriverCase {
            id: 0,
            args: vec![json!([2, 7, 11, 15]), json!(9)],
            expected: "[0,1]".into(),
            input: "[2,7,11,15], 9".into(),
        };
        let program = GoAdapter.synthesize_driver(src, &sig, &[case]);
        assert_eq!(program.matches("package main").count(), 1);
        assert_eq!(program.matches("\"strings\"").count(), 1);
        assert!(program.contains("\t\"sort\"\n"));
        assert!(program.contains("return twoSum([]int{2, 7, 11, 15}, 9)"));
        assert!(program.contains("actual := pairsolveJSON(result)"));
        assert!(!program.contains("ListNode"));
    }

    #[test]
    fn test_invocation_calls_free_function() {
        let sig = GoAdapter.detect_signature("func isValid(s string) bool {\n}").unwrap();
        assert_eq!(GoAdapter.build_invocation(&sig, &["\"()\"".into()]), "isValid(\"()\")");
        assert_eq!(
            GoAdapter.build_serialization(&sig, "result").unwrap(),
            "pairsolveJSON(result)"
        );
    }
}
