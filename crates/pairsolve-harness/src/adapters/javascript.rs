use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

use pairsolve_core::Language;
use regex::Regex;
use serde_json::Value;

use super::{json_quoted, mismatch, DriverCase, LanguageAdapter};
use crate::signature::{
    is_candidate_name, split_params, strip_c_comments, CallableSignature, LINKED_LIST_MARKER,
};

/// Shared by JavaScript and TypeScript; the TypeScript flavour only adds
/// annotations the compiler needs.
pub struct JavaScriptAdapter {
    typed: bool,
}

impl JavaScriptAdapter {
    pub fn javascript() -> Self {
        Self { typed: false }
    }

    pub fn typescript() -> Self {
        Self { typed: true }
    }

    fn ann<'a>(&self, annotation: &'a str) -> &'a str {
        if self.typed {
            annotation
        } else {
            ""
        }
    }
}

fn binding_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:var|const|let)\s+(\w+)\s*=\s*(?:async\s+)?(?:function\s*\w*\s*\(([^)]*)\)|\(([^)]*)\)\s*(?::\s*[^=]+?)?\s*=>|(\w+)\s*=>)",
        )
        .expect("invalid binding regex")
    })
}

fn declaration_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"function\s+(\w+)\s*(?:<[^>]*>)?\s*\(([^)]*)\)\s*(?::\s*([^{]+?))?\s*\{")
            .expect("invalid function regex")
    })
}

fn jsdoc_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"@param\s*\{([^}]+)\}\s*\[?(\w+)").expect("invalid jsdoc param regex")
    })
}

fn jsdoc_return() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@returns?\s*\{([^}]+)\}").expect("invalid jsdoc return regex"))
}

fn export_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(\s*)export\s+(?:default\s+)?").expect("invalid export regex"))
}

fn defines_list_node() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:export\s+)?(?:function|class)\s+ListNode\b")
            .expect("invalid ListNode regex")
    })
}

struct Candidate {
    start: usize,
    name: String,
    params: String,
    return_type: Option<String>,
}

const JS_LIST_NODE: &str = r#"
function ListNode(val, next) {
  this.val = (val === undefined ? 0 : val);
  this.next = (next === undefined ? null : next);
}
"#;

const TS_LIST_NODE: &str = r#"
class ListNode {
  val: number;
  next: ListNode | null;
  constructor(val?: number, next?: ListNode | null) {
    this.val = (val === undefined ? 0 : val);
    this.next = (next === undefined ? null : next);
  }
}
"#;

impl LanguageAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        if self.typed {
            Language::TypeScript
        } else {
            Language::JavaScript
        }
    }

    fn detect_signature(&self, source: &str) -> Option<CallableSignature> {
        let mut candidates: Vec<Candidate> = binding_pattern()
            .captures_iter(source)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let params = caps.get(2).or(caps.get(3)).or(caps.get(4))?;
                Some(Candidate {
                    start: whole.start(),
                    name: caps.get(1)?.as_str().to_string(),
                    params: params.as_str().to_string(),
                    return_type: None,
                })
            })
            .collect();
        candidates.extend(declaration_pattern().captures_iter(source).filter_map(|caps| {
            Some(Candidate {
                start: caps.get(0)?.start(),
                name: caps.get(1)?.as_str().to_string(),
                params: caps.get(2).map_or("", |m| m.as_str()).to_string(),
                return_type: caps.get(3).map(|m| m.as_str().trim().to_string()),
            })
        }));
        candidates.sort_by_key(|c| c.start);
        let chosen = candidates.into_iter().find(|c| is_candidate_name(&c.name))?;

        let documented: HashMap<&str, &str> = jsdoc_param()
            .captures_iter(source)
            .filter_map(|caps| Some((caps.get(2)?.as_str(), caps.get(1)?.as_str().trim())))
            .collect();

        let mut param_names = Vec::new();
        let mut param_types = Vec::new();
        for param in split_params(&chosen.params) {
            let declared = param.split('=').next().unwrap_or("").trim();
            let (name, annotated) = match declared.split_once(':') {
                Some((n, t)) => (n.trim().trim_end_matches('?'), t.trim()),
                None => (declared, ""),
            };
            let ty = if annotated.is_empty() {
                documented.get(name).copied().unwrap_or("")
            } else {
                annotated
            };
            param_names.push(name.to_string());
            param_types.push(ty.to_string());
        }

        let return_type = chosen.return_type.or_else(|| {
            jsdoc_return()
                .captures(source)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        });

        Some(CallableSignature {
            name: chosen.name,
            param_types,
            param_names,
            return_type,
            owner: None,
        })
    }

    fn render_arg(&self, value: &Value, param_type: Option<&str>) -> Result<String, String> {
        match param_type {
            Some(ty) if ty.contains(LINKED_LIST_MARKER) => match value {
                Value::Array(_) => Ok(format!("__pairsolveToList({value})")),
                Value::Null => Ok("null".to_string()),
                _ => Err(mismatch(value, ty)),
            },
            _ => Ok(value.to_string()),
        }
    }

    fn build_invocation(&self, signature: &CallableSignature, args: &[String]) -> String {
        format!("{}({})", signature.name, args.join(", "))
    }

    fn build_serialization(&self, signature: &CallableSignature, result: &str) -> Result<String, String> {
        match signature.returns_linked_list() {
            true => Ok(format!("__pairsolveSerialize(__pairsolveFromList({result}))")),
            false => Ok(format!("__pairsolveSerialize({result})")),
        }
    }

    fn synthesize_driver(
        &self,
        source: &str,
        signature: &CallableSignature,
        cases: &[DriverCase],
    ) -> String {
        let body = export_prefix().replace_all(source, "$1");
        let uses_lists = signature.mentions_linked_list() || source.contains(LINKED_LIST_MARKER);

        let mut program = String::new();
        program.push_str(&body);
        program.push_str("\n\n");

        if uses_lists {
            if !defines_list_node().is_match(&strip_c_comments(source)) {
                program.push_str(if self.typed { TS_LIST_NODE } else { JS_LIST_NODE });
            }
            let _ = write!(
                program,
                r#"
function __pairsolveToList(values{values_ann}){list_ann} {{
  let head{list_ann} = null;
  for (let i = values.length - 1; i >= 0; i--) head = new ListNode(values[i], head);
  return head;
}}

function __pairsolveFromList(node{any}){nums_ann} {{
  const values{nums_ann} = [];
  while (node) {{
    values.push(node.val);
    node = node.next;
  }}
  return values;
}}
"#,
                values_ann = self.ann(": number[]"),
                list_ann = self.ann(": ListNode | null"),
                any = self.ann(": any"),
                nums_ann = self.ann(": number[]"),
            );
        }

        let replacer = if uses_lists {
            "(v instanceof ListNode ? __pairsolveFromList(v) : v)"
        } else {
            "v"
        };

        let _ = writeln!(program, "\nconst __pairsolveTests{} = [", self.ann(": any[]"));
        for case in cases {
            let call = match self.render_args(signature, case) {
                Ok(args) => format!("() => {}", self.build_invocation(signature, &args)),
                Err(message) => format!("() => {{ throw new Error({}); }}", json_quoted(&message)),
            };
            let _ = writeln!(
                program,
                "  {{ call: {}, expected: {}, input: {} }},",
                call,
                json_quoted(&case.expected),
                json_quoted(&case.input)
            );
        }
        program.push_str("];\n");

        let serialize = self
            .build_serialization(signature, "result")
            .unwrap_or_else(|_| "String(result)".to_string());
        let _ = write!(
            program,
            r#"
function __pairsolveSerialize(value{any}){str_ann} {{
  return JSON.stringify(value === undefined ? null : value, (key{str_ann}, v{any}) => {replacer});
}}

(function __pairsolveRun() {{
  const results{any_list} = [];
  let passed = 0;
  __pairsolveTests.forEach((test{any}, i{num_ann}) => {{
    try {{
      if (typeof {name} !== 'function') throw new Error("Function '{name}' not found. Check naming.");
      const result = test.call();
      const actual = {serialize};
      const isPass = actual.replace(/\s/g, '') === test.expected.replace(/\s/g, '')
        || String(result).toLowerCase() === test.expected.toLowerCase();
      if (isPass) passed++;
      results.push({{ id: i, passed: isPass, actual, expected: test.expected, input: test.input }});
    }} catch (e{any}) {{
      results.push({{ id: i, passed: false, error: String((e && (e.stack || e.message)) || e) }});
    }}
  }});
  console.log(JSON.stringify({{ stats: {{ passed, total: __pairsolveTests.length }}, results }}));
}})();
"#,
            any = self.ann(": any"),
            str_ann = self.ann(": string"),
            num_ann = self.ann(": number"),
            any_list = self.ann(": any[]"),
            name = signature.name,
            replacer = replacer,
            serialize = serialize,
        );
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_sum_case() -> DriverCase {
        DriverCase {
            id: 0,
            args: vec![json!([2, 7, 11, 15]), json!(9)],
            expected: "[0,1]".into(),
            input: "[2,7,11,15], 9".into(),
        }
    }

    #[test]
    fn test_detects_function_declaration() {
        let src = "/**\n * @param {number[]} nums\n * @param {number} target\n * @return {number[]}\n */\nvar twoSum = function(nums, target) {\n  const seen = new Map();\n};";
        let sig = JavaScriptAdapter::javascript().detect_signature(src).unwrap();
        assert_eq!(sig.name, "twoSum");
        assert_eq!(sig.param_names, vec!["nums", "target"]);
        assert_eq!(sig.param_types, vec!["number[]", "number"]);
        assert_eq!(sig.return_type.as_deref(), Some("number[]"));
    }

    #[test]
    fn test_earliest_declaration_wins_over_inner_arrow() {
        let src = "function maxDepth(root) {\n  const walk = (n) => n;\n  return walk(root);\n}";
        let sig = JavaScriptAdapter::javascript().detect_signature(src).unwrap();
        assert_eq!(sig.name, "maxDepth");
    }

    #[test]
    fn test_typescript_annotations() {
        let src = "function reverseList(head: ListNode | null): ListNode | null {\n  return head;\n}";
        let sig = JavaScriptAdapter::typescript().detect_signature(src).unwrap();
        assert_eq!(sig.param_types, vec!["ListNode | null"]);
        assert!(sig.returns_linked_list());
    }

    #[test]
    fn test_no_callable() {
        assert!(JavaScriptAdapter::javascript()
            .detect_signature("console.log('hi');")
            .is_none());
    }

    #[test]
    fn test_program_shape() {
        let adapter = JavaScriptAdapter::javascript();
        let src = "function twoSum(nums, target) { return [0, 1]; }";
        let sig = adapter.detect_signature(src).unwrap();
        let program = adapter.synthesize_driver(src, &sig, &[two_sum_case()]);
        assert!(program.starts_with(src));
        assert!(program.contains(r#"{ call: () => twoSum([2,7,11,15], 9), expected: "[0,1]", input: "[2,7,11,15], 9" },"#));
        assert!(program.contains("const actual = __pairsolveSerialize(result);"));
        assert!(!program.contains("ListNode"));
        assert!(!program.contains(": any"));
    }

    #[test]
    fn test_linked_list_program_defines_node() {
        let adapter = JavaScriptAdapter::typescript();
        let src = "export function reverseList(head: ListNode | null): ListNode | null { return head; }";
        let sig = adapter.detect_signature(src).unwrap();
        let case = DriverCase {
            id: 0,
            args: vec![json!([1, 2, 3])],
            expected: "[3,2,1]".into(),
            input: "[1,2,3]".into(),
        };
        let program = adapter.synthesize_driver(src, &sig, &[case]);
        assert!(!program.contains("export function"));
        assert!(program.contains("class ListNode"));
        assert!(program.contains("__pairsolveToList([1,2,3])"));
        assert!(program.contains("catch (e: any)"));
    }

    #[test]
    fn test_empty_linked_list_result_serializes_as_empty_list() {
        let adapter = JavaScriptAdapter::javascript();
        let src = "/**\n * @param {ListNode} head\n * @return {ListNode}\n */\nvar reverseList = function(head) {\n  return null;\n};";
        let sig = adapter.detect_signature(src).unwrap();
        assert!(sig.returns_linked_list());
        assert_eq!(
            adapter.build_serialization(&sig, "result").unwrap(),
            "__pairsolveSerialize(__pairsolveFromList(result))"
        );

        let case = DriverCase {
            id: 0,
            args: vec![json!([])],
            expected: "[]".into(),
            input: "[]".into(),
        };
        let program = adapter.synthesize_driver(src, &sig, &[case]);
        assert!(program.contains("const actual = __pairsolveSerialize(__pairsolveFromList(result));"));
        assert!(program.contains("function __pairsolveFromList(node)"));
    }

    #[test]
    fn test_render_failure_throws_per_case() {
        let adapter = JavaScriptAdapter::javascript();
        let sig = CallableSignature {
            name: "f".into(),
            param_types: vec!["ListNode".into()],
            param_names: vec!["head".into()],
            return_type: None,
            owner: None,
        };
        let case = DriverCase {
            id: 0,
            args: vec![json!("1->2")],
            expected: "[]".into(),
            input: "\"1->2\"".into(),
        };
        let program = adapter.synthesize_driver("function f(head) {}", &sig, &[case]);
        assert!(program.contains("call: () => { throw new Error(\"argument 1: "));
    }
}
