use std::fmt::Write as _;
use std::sync::OnceLock;

use pairsolve_core::Language;
use regex::Regex;
use serde_json::Value;

use super::{
    array_items, bool_literal, c_char, c_quoted, char_value, fill, float_literal, generic_inner,
    infer_shape, int_items, int_literal, string_value, DriverCase, LanguageAdapter, Shape,
};
use crate::signature::{detect_typed_callable, strip_c_comments, CallableSignature, LINKED_LIST_MARKER};

pub struct CppAdapter;

/// Shared with the C adapter: `(return type)(pointer/space)(name)(params) {`.
pub(super) fn function_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"([\w<>\[\]\s,:]+?)([\s*&]+)(\w+)\s*\(([^)]*)\)\s*(?:const\s*)?(?:noexcept\s*)?\{",
        )
        .expect("invalid c-family function regex")
    })
}

fn defines_list_node() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bstruct\s+ListNode\s*\{").expect("invalid ListNode regex"))
}

const PRELUDE: &str = r#"#include <bits/stdc++.h>
using namespace std;
"#;

const LIST_NODE_STRUCT: &str = r#"
struct ListNode {
    int val;
    ListNode *next;
    ListNode() : val(0), next(nullptr) {}
    ListNode(int x) : val(x), next(nullptr) {}
    ListNode(int x, ListNode *next) : val(x), next(next) {}
};
"#;

const JSON_HELPERS: &str = r#"
static string pairsolve_escape(const string& s) {
    string out;
    for (unsigned char c : s) {
        switch (c) {
            case '"': out += "\\\""; break;
            case '\\': out += "\\\\"; break;
            case '\n': out += "\\n"; break;
            case '\r': out += "\\r"; break;
            case '\t': out += "\\t"; break;
            default:
                if (c < 0x20) {
                    char buf[8];
                    snprintf(buf, sizeof buf, "\\u%04x", c);
                    out += buf;
                } else {
                    out += (char) c;
                }
        }
    }
    return out;
}

static string pairsolve_strip(const string& s) {
    string out;
    for (char c : s) if (!isspace((unsigned char) c)) out += c;
    return out;
}

static string pairsolve_lower(string s) {
    for (auto& c : s) c = (char) tolower((unsigned char) c);
    return s;
}

static string to_json(const string& s) { return "\"" + pairsolve_escape(s) + "\""; }
static string to_json(const char* s) { return to_json(string(s)); }
static string to_json(char c) { return to_json(string(1, c)); }
static string to_json(bool b) { return b ? "true" : "false"; }

template <typename T>
static typename enable_if<is_arithmetic<T>::value, string>::type to_json(T v) {
    ostringstream os;
    os << setprecision(15) << v;
    return os.str();
}
@LIST_TO_JSON@
template <typename T>
static string to_json(const vector<T>& items) {
    string out = "[";
    for (size_t i = 0; i < items.size(); i++) {
        if (i > 0) out += ",";
        out += to_json((T) items[i]);
    }
    return out + "]";
}
"#;

const LIST_HELPERS: &str = r#"
static ListNode* pairsolve_to_list(const vector<int>& values) {
    ListNode* head = nullptr;
    for (int i = (int) values.size() - 1; i >= 0; i--) head = new ListNode(values[i], head);
    return head;
}

static string to_json(ListNode* head) {
    string out = "[";
    for (ListNode* node = head; node != nullptr; node = node->next) {
        if (out.size() > 1) out += ",";
        out += to_json(node->val);
    }
    return out + "]";
}
"#;

const MAIN: &str = r#"
int main() {
    Solution solution;
    int passed = 0;
    int total = @TOTAL@;
    string results;
@CASES@
    cout << "{\"stats\":{\"passed\":" << passed << ",\"total\":" << total << "},\"results\":[" << results << "]}" << endl;
    return 0;
}
"#;

const CASE: &str = r#"
    {
        string entry;
        try {
@DECLS@
            auto result = @CALL@;
            string actual = @SERIALIZE@;
            string expected = @EXPECTED@;
            bool isPass = pairsolve_strip(actual) == pairsolve_strip(expected)
                || pairsolve_lower(actual) == pairsolve_lower(expected);
            if (isPass) passed++;
            entry = string("{\"id\":@ID@,\"passed\":") + (isPass ? "true" : "false")
                + ",\"actual\":" + to_json(actual) + ",\"expected\":" + to_json(expected)
                + ",\"input\":" + to_json(string(@INPUT@)) + "}";
        } catch (const exception& e) {
            entry = string("{\"id\":@ID@,\"passed\":false,\"error\":") + to_json(string(e.what())) + "}";
        } catch (...) {
            entry = "{\"id\":@ID@,\"passed\":false,\"error\":\"unknown exception\"}";
        }
        if (!results.empty()) results += ",";
        results += entry;
    }
"#;

const FAILED_CASE: &str = r#"
    {
        if (!results.empty()) results += ",";
        results += string("{\"id\":@ID@,\"passed\":false,\"error\":") + to_json(string(@MESSAGE@)) + "}";
    }
"#;

fn cpp_type(shape: &Shape) -> String {
    match shape {
        Shape::Int => "int".to_string(),
        Shape::Float => "double".to_string(),
        Shape::Bool => "bool".to_string(),
        Shape::Str => "string".to_string(),
        Shape::List(inner) => format!("vector<{}>", cpp_type(inner)),
    }
}

/// Parameter type with references and `const` removed, usable for a local.
fn storage_type(ty: &str) -> String {
    let ty = ty.trim().trim_end_matches('&').trim();
    let ty = ty.strip_prefix("const ").unwrap_or(ty).trim();
    ty.replace("std::", "")
}

fn render(value: &Value, ty: &str) -> Result<String, String> {
    let ty = storage_type(ty);
    if ty.contains(LINKED_LIST_MARKER) {
        return Ok(format!("pairsolve_to_list({{{}}})", int_items(value)?.join(", ")));
    }
    if let Some(inner) = generic_inner(&ty, &["vector"]) {
        let items: Vec<String> = match (inner, value) {
            ("char", Value::String(s)) => s.chars().map(c_char).collect(),
            _ => array_items(value)?
                .iter()
                .map(|item| render(item, inner))
                .collect::<Result<_, _>>()?,
        };
        return Ok(format!("vector<{}>{{{}}}", inner, items.join(", ")));
    }
    match ty.as_str() {
        "int" | "short" | "unsigned" | "unsigned int" | "size_t" => int_literal(value),
        "long" | "long long" | "int64_t" => Ok(int_literal(value)? + "LL"),
        "double" | "float" => float_literal(value),
        "bool" => bool_literal(value),
        "char" => Ok(c_char(char_value(value)?)),
        "string" => Ok(format!("string({})", c_quoted(string_value(value)?))),
        "" | "auto" => render(value, &cpp_type(&infer_shape(value))),
        other => Err(format!("unsupported parameter type {other}")),
    }
}

impl LanguageAdapter for CppAdapter {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn detect_signature(&self, source: &str) -> Option<CallableSignature> {
        detect_typed_callable(source, function_pattern())
    }

    fn render_arg(&self, value: &Value, param_type: Option<&str>) -> Result<String, String> {
        render(value, param_type.unwrap_or(""))
    }

    fn build_invocation(&self, signature: &CallableSignature, args: &[String]) -> String {
        format!("solution.{}({})", signature.name, args.join(", "))
    }

    fn build_serialization(&self, _signature: &CallableSignature, result: &str) -> Result<String, String> {
        Ok(format!("to_json({result})"))
    }

    /// Arguments are bound to named locals first so that non-const
    /// reference parameters have an lvalue to bind to.
    fn synthesize_driver(
        &self,
        source: &str,
        signature: &CallableSignature,
        cases: &[DriverCase],
    ) -> String {
        let uses_lists = signature.mentions_linked_list() || source.contains(LINKED_LIST_MARKER);

        let mut program = String::from(PRELUDE);
        if uses_lists && !defines_list_node().is_match(&strip_c_comments(source)) {
            program.push_str(LIST_NODE_STRUCT);
        }
        program.push_str("\n#line 1 \"solution.cpp\"\n");
        program.push_str(source);
        program.push_str("\n#line 1 \"driver.cpp\"\n");
        program.push_str(&fill(
            JSON_HELPERS,
            &[("LIST_TO_JSON", if uses_lists { LIST_HELPERS } else { "" })],
        ));

        let serialize = self
            .build_serialization(signature, "result")
            .unwrap_or_else(|_| "to_json(string(\"?\"))".to_string());
        let mut blocks = String::new();
        for case in cases {
            let id = case.id.to_string();
            let mut decls = String::new();
            let mut names = Vec::new();
            let mut failure = None;
            for (i, arg) in case.args.iter().enumerate() {
                let declared = signature.param_type(i).map(storage_type);
                let local_type = match &declared {
                    Some(ty) if ty.contains(LINKED_LIST_MARKER) => "ListNode*".to_string(),
                    Some(ty) => ty.clone(),
                    None => cpp_type(&infer_shape(arg)),
                };
                match self.render_arg(arg, Some(&local_type)) {
                    Ok(literal) => {
                        let _ = writeln!(decls, "            {local_type} arg{i} = {literal};");
                        names.push(format!("arg{i}"));
                    }
                    Err(message) => {
                        failure = Some(format!("argument {}: {}", i + 1, message));
                        break;
                    }
                }
            }
            let block = match failure {
                None => fill(
                    CASE,
                    &[
                        ("DECLS", decls.trim_end()),
                        ("CALL", self.build_invocation(signature, &names).as_str()),
                        ("SERIALIZE", serialize.as_str()),
                        ("EXPECTED", c_quoted(&case.expected).as_str()),
                        ("INPUT", c_quoted(&case.input).as_str()),
                        ("ID", id.as_str()),
                    ],
                ),
                Some(message) => fill(
                    FAILED_CASE,
                    &[("MESSAGE", c_quoted(&message).as_str()), ("ID", id.as_str())],
                ),
            };
            blocks.push_str(&block);
        }

        let total = cases.len().to_string();
        program.push_str(&fill(
            MAIN,
            &[("TOTAL", total.as_str()), ("CASES", blocks.as_str())],
        ));
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STARTER: &str = "class Solution {\npublic:\n    vector<int> twoSum(vector<int>& nums, int target) {\n        return {};\n    }\n};";

    #[test]
    fn test_detects_member_function() {
        let sig = CppAdapter.detect_signature(STARTER).unwrap();
        assert_eq!(sig.name, "twoSum");
        assert_eq!(sig.param_types, vec!["vector<int>&", "int"]);
        assert_eq!(sig.return_type.as_deref(), Some("vector<int>"));
    }

    #[test]
    fn test_detect_skips_commented_constructors() {
        let src = "/**\n * struct ListNode {\n *     ListNode(int x) : val(x), next(nullptr) {}\n * };\n */\nclass Solution {\npublic:\n    ListNode* reverseList(ListNode* head) {\n        return head;\n    }\n};";
        let sig = CppAdapter.detect_signature(src).unwrap();
        assert_eq!(sig.name, "reverseList");
        assert_eq!(sig.param_types, vec!["ListNode*"]);
        assert_eq!(sig.return_type.as_deref(), Some("ListNode*"));
    }

    #[test]
    fn test_render_values() {
        let cpp = CppAdapter;
        assert_eq!(
            cpp.render_arg(&json!([[1, 2], []]), Some("vector<vector<int>>&")).unwrap(),
            "vector<vector<int>>{vector<int>{1, 2}, vector<int>{}}"
        );
        assert_eq!(
            cpp.render_arg(&json!("a\"b"), Some("const string&")).unwrap(),
            "string(\"a\\\"b\")"
        );
        assert_eq!(cpp.render_arg(&json!(5), Some("long long")).unwrap(), "5LL");
        assert_eq!(
            cpp.render_arg(&json!([1, 2]), Some("ListNode*")).unwrap(),
            "pairsolve_to_list({1, 2})"
        );
    }

    #[test]
    fn test_program_declares_locals() {
        let sig = CppAdapter.detect_signature(STARTER).unwrap();
        let case = DriverCase {
            id: 0,
            args: vec![json!([2, 7, 11, 15]), json!(9)],
            expected: "[0,1]".into(),
            input: "[2,7,11,15], 9".into(),
        };
        let program = CppAdapter.synthesize_driver(STARTER, &sig, &[case]);
        assert!(program.contains("vector<int> arg0 = vector<int>{2, 7, 11, 15};"));
        assert!(program.contains("int arg1 = 9;"));
        assert!(program.contains("auto result = solution.twoSum(arg0, arg1);"));
        assert!(program.contains("string actual = to_json(result);"));
        assert!(program.contains("#line 1 \"solution.cpp\""));
        assert!(!program.contains("struct ListNode"));
    }
}
