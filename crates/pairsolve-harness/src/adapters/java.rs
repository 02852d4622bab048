use std::sync::OnceLock;

use pairsolve_core::Language;
use regex::Regex;
use serde_json::Value;

use super::{
    array_items, bool_literal, char_value, fill, float_literal, generic_inner, hoist_lines,
    infer_shape, int_items, int_literal, json_quoted, quoted_char, string_value, DriverCase,
    LanguageAdapter, Shape,
};
use crate::signature::{detect_typed_callable, strip_c_comments, CallableSignature, LINKED_LIST_MARKER};

pub struct JavaAdapter;

pub(super) fn method_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([\w<>\[\]\s,?.]+?)(\s+)(\w+)\s*\(([^)]*)\)\s*(?:throws\s+[\w\s,.]+)?\{")
            .expect("invalid java method regex")
    })
}

fn public_class() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bpublic\s+((?:final\s+)?class)\b").expect("invalid class regex"))
}

fn defines_list_node() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bclass\s+ListNode\b").expect("invalid ListNode regex"))
}

const LIST_NODE_CLASS: &str = r#"
class ListNode {
    int val;
    ListNode next;
    ListNode() {}
    ListNode(int val) { this.val = val; }
    ListNode(int val, ListNode next) { this.val = val; this.next = next; }
}
"#;

const LIST_HELPERS: &str = r#"
    static ListNode arrayToList(int[] values) {
        ListNode head = null;
        for (int i = values.length - 1; i >= 0; i--) head = new ListNode(values[i], head);
        return head;
    }

    static String listToJson(ListNode head) {
        StringBuilder sb = new StringBuilder("[");
        for (ListNode node = head; node != null; node = node.next) {
            if (sb.length() > 1) sb.append(',');
            sb.append(node.val);
        }
        return sb.append(']').toString();
    }
"#;

const LIST_TO_JSON: &str = r#"        if (value instanceof ListNode) return listToJson((ListNode) value);
"#;

const MAIN_CLASS: &str = r#"
public class Main {
@LIST_HELPERS@
    static String escape(String s) {
        StringBuilder sb = new StringBuilder();
        for (char c : s.toCharArray()) {
            switch (c) {
                case '"': sb.append("\\\""); break;
                case '\\': sb.append("\\\\"); break;
                case '\n': sb.append("\\n"); break;
                case '\r': sb.append("\\r"); break;
                case '\t': sb.append("\\t"); break;
                default:
                    if (c < 0x20) sb.append(String.format("\\u%04x", (int) c));
                    else sb.append(c);
            }
        }
        return sb.toString();
    }

    static String toJson(Object value) {
        if (value == null) return "null";
        if (value instanceof String || value instanceof Character) return "\"" + escape(String.valueOf(value)) + "\"";
@LIST_TO_JSON@
        if (value.getClass().isArray()) {
            StringBuilder sb = new StringBuilder("[");
            int length = java.lang.reflect.Array.getLength(value);
            for (int i = 0; i < length; i++) {
                if (i > 0) sb.append(',');
                sb.append(toJson(java.lang.reflect.Array.get(value, i)));
            }
            return sb.append(']').toString();
        }
        if (value instanceof Iterable) {
            StringBuilder sb = new StringBuilder("[");
            boolean first = true;
            for (Object item : (Iterable<?>) value) {
                if (!first) sb.append(',');
                sb.append(toJson(item));
                first = false;
            }
            return sb.append(']').toString();
        }
        return String.valueOf(value);
    }

    static String stackTrace(Throwable e) {
        StringWriter writer = new StringWriter();
        e.printStackTrace(new PrintWriter(writer));
        return writer.toString();
    }

    static void record(StringBuilder results, String entry) {
        if (results.length() > 0) results.append(',');
        results.append(entry);
    }

    public static void main(String[] args) {
        Solution solution = new Solution();
        StringBuilder results = new StringBuilder();
        int passed = 0;
        int total = @TOTAL@;
@CASES@
        System.out.println("{\"stats\":{\"passed\":" + passed + ",\"total\":" + total + "},\"results\":[" + results + "]}");
    }
}
"#;

const CASE: &str = r#"
        try {
            Object result = @CALL@;
            String actual = @SERIALIZE@;
            String expected = @EXPECTED@;
            boolean isPass = actual.replaceAll("\\s", "").equals(expected.replaceAll("\\s", ""))
                || String.valueOf(result).equalsIgnoreCase(expected);
            if (isPass) passed++;
            record(results, "{\"id\":@ID@,\"passed\":" + isPass + ",\"actual\":\"" + escape(actual)
                + "\",\"expected\":\"" + escape(expected) + "\",\"input\":\"" + escape(@INPUT@) + "\"}");
        } catch (Throwable e) {
            record(results, "{\"id\":@ID@,\"passed\":false,\"error\":\"" + escape(stackTrace(e)) + "\"}");
        }
"#;

const FAILED_CASE: &str = r#"
        try {
            throw new IllegalArgumentException(@MESSAGE@);
        } catch (Throwable e) {
            record(results, "{\"id\":@ID@,\"passed\":false,\"error\":\"" + escape(stackTrace(e)) + "\"}");
        }
"#;

fn java_type(shape: &Shape) -> String {
    match shape {
        Shape::Int => "int".to_string(),
        Shape::Float => "double".to_string(),
        Shape::Bool => "boolean".to_string(),
        Shape::Str => "String".to_string(),
        Shape::List(inner) => format!("{}[]", java_type(inner)),
    }
}

fn render(value: &Value, ty: &str) -> Result<String, String> {
    let ty = ty.trim();
    if ty.contains(LINKED_LIST_MARKER) {
        return Ok(format!("arrayToList(new int[]{{{}}})", int_items(value)?.join(", ")));
    }
    if let Some(elem) = ty.strip_suffix("[]") {
        let items: Vec<String> = match (elem.trim(), value) {
            ("char", Value::String(s)) => s.chars().map(quoted_char).collect(),
            _ => array_items(value)?
                .iter()
                .map(|item| render(item, elem))
                .collect::<Result<_, _>>()?,
        };
        return Ok(format!("new {}{{{}}}", ty, items.join(", ")));
    }
    if let Some(inner) = generic_inner(ty, &["List", "ArrayList", "LinkedList", "Collection", "Iterable"]) {
        let items = array_items(value)?
            .iter()
            .map(|item| render(item, inner))
            .collect::<Result<Vec<_>, _>>()?;
        if items.is_empty() {
            return Ok(format!("new ArrayList<{inner}>()"));
        }
        return Ok(format!(
            "new ArrayList<{inner}>(Arrays.<{inner}>asList({}))",
            items.join(", ")
        ));
    }
    match ty {
        "int" | "Integer" | "short" | "Short" | "byte" | "Byte" => int_literal(value),
        "long" | "Long" => Ok(int_literal(value)? + "L"),
        "double" | "Double" => float_literal(value),
        "float" | "Float" => Ok(float_literal(value)? + "f"),
        "boolean" | "Boolean" => bool_literal(value),
        "char" | "Character" => Ok(quoted_char(char_value(value)?)),
        "String" | "CharSequence" => Ok(json_quoted(string_value(value)?)),
        "" | "Object" | "var" => render(value, &java_type(&infer_shape(value))),
        other => Err(format!("unsupported parameter type {other}")),
    }
}

impl LanguageAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn detect_signature(&self, source: &str) -> Option<CallableSignature> {
        detect_typed_callable(source, method_pattern())
    }

    fn render_arg(&self, value: &Value, param_type: Option<&str>) -> Result<String, String> {
        render(value, param_type.unwrap_or(""))
    }

    fn build_invocation(&self, signature: &CallableSignature, args: &[String]) -> String {
        format!("solution.{}({})", signature.name, args.join(", "))
    }

    /// A declared `ListNode` return goes through `listToJson`, so `null`
    /// prints as `[]`.
    fn build_serialization(&self, signature: &CallableSignature, result: &str) -> Result<String, String> {
        match signature.returns_linked_list() {
            true => Ok(format!("listToJson((ListNode) {result})")),
            false => Ok(format!("toJson({result})")),
        }
    }

    fn synthesize_driver(
        &self,
        source: &str,
        signature: &CallableSignature,
        cases: &[DriverCase],
    ) -> String {
        let (imports, body) = hoist_lines(source, &["import "]);
        let body: String = body
            .lines()
            .filter(|line| !line.trim_start().starts_with("package "))
            .collect::<Vec<_>>()
            .join("\n");
        let body = public_class().replace_all(&body, "$1");
        let uses_lists = signature.mentions_linked_list() || source.contains(LINKED_LIST_MARKER);

        let mut program = String::from("import java.util.*;\nimport java.io.*;\n");
        for import in imports {
            if import != "import java.util.*;" && import != "import java.io.*;" {
                program.push_str(import);
                program.push('\n');
            }
        }
        program.push('\n');
        program.push_str(&body);
        program.push('\n');
        if uses_lists && !defines_list_node().is_match(&strip_c_comments(source)) {
            program.push_str(LIST_NODE_CLASS);
        }

        let serialize = self
            .build_serialization(signature, "result")
            .unwrap_or_else(|_| "String.valueOf(result)".to_string());
        let mut blocks = String::new();
        for case in cases {
            let id = case.id.to_string();
            let block = match self.render_args(signature, case) {
                Ok(args) => fill(
                    CASE,
                    &[
                        ("CALL", self.build_invocation(signature, &args).as_str()),
                        ("SERIALIZE", serialize.as_str()),
                        ("EXPECTED", json_quoted(&case.expected).as_str()),
                        ("INPUT", json_quoted(&case.input).as_str()),
                        ("ID", id.as_str()),
                    ],
                ),
                Err(message) => fill(
                    FAILED_CASE,
                    &[("MESSAGE", json_quoted(&message).as_str()), ("ID", id.as_str())],
                ),
            };
            blocks.push_str(&block);
        }

        let total = cases.len().to_string();
        program.push_str(&fill(
            MAIN_CLASS,
            &[
                ("LIST_HELPERS", if uses_lists { LIST_HELPERS } else { "" }),
                ("LIST_TO_JSON", if uses_lists { LIST_TO_JSON } else { "" }),
                ("TOTAL", total.as_str()),
                ("CASES", blocks.as_str()),
            ],
        ));
        program
    }
}
