use std::sync::OnceLock;

use pairsolve_core::Language;
use regex::Regex;
use serde_json::Value;

use super::java::method_pattern;
use super::{
    array_items, bool_literal, char_value, fill, float_literal, generic_inner, hoist_lines,
    infer_shape, int_items, int_literal, json_quoted, quoted_char, string_value, DriverCase,
    LanguageAdapter, Shape,
};
use crate::signature::{detect_typed_callable, strip_c_comments, CallableSignature, LINKED_LIST_MARKER};

pub struct CSharpAdapter;

fn defines_list_node() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bclass\s+ListNode\b").expect("invalid ListNode regex"))
}

const USINGS: &[&str] = &[
    "using System;",
    "using System.Collections;",
    "using System.Collections.Generic;",
    "using System.Globalization;",
    "using System.Linq;",
    "using System.Text;",
];

const LIST_NODE_CLASS: &str = r#"
public class ListNode {
    public int val;
    public ListNode next;
    public ListNode(int val = 0, ListNode next = null) {
        this.val = val;
        this.next = next;
    }
}
"#;

const LIST_HELPERS: &str = r#"
    static ListNode ArrayToList(int[] values) {
        ListNode head = null;
        for (int i = values.Length - 1; i >= 0; i--) head = new ListNode(values[i], head);
        return head;
    }

    static string ListToJson(ListNode head) {
        var sb = new StringBuilder("[");
        for (var current = head; current != null; current = current.next) {
            if (sb.Length > 1) sb.Append(',');
            sb.Append(current.val);
        }
        return sb.Append(']').ToString();
    }
"#;

const LIST_TO_JSON: &str = r#"        if (value is ListNode node) return ListToJson(node);
"#;

const PROGRAM_CLASS: &str = r#"
public class Program {
@LIST_HELPERS@
    static string Escape(string s) {
        var sb = new StringBuilder();
        foreach (char c in s) {
            switch (c) {
                case '"': sb.Append("\\\""); break;
                case '\\': sb.Append("\\\\"); break;
                case '\n': sb.Append("\\n"); break;
                case '\r': sb.Append("\\r"); break;
                case '\t': sb.Append("\\t"); break;
                default:
                    if (c < 0x20) sb.Append("\\u" + ((int) c).ToString("x4"));
                    else sb.Append(c);
                    break;
            }
        }
        return sb.ToString();
    }

    static string StripWhitespace(string s) {
        return new string(s.Where(c => !char.IsWhiteSpace(c)).ToArray());
    }

    static string ToJson(object value) {
        if (value == null) return "null";
        if (value is string s) return "\"" + Escape(s) + "\"";
        if (value is char c) return "\"" + Escape(c.ToString()) + "\"";
        if (value is bool b) return b ? "true" : "false";
@LIST_TO_JSON@
        if (value is double d) return d.ToString("R", CultureInfo.InvariantCulture);
        if (value is float f) return f.ToString("R", CultureInfo.InvariantCulture);
        if (value is IEnumerable items) {
            var sb = new StringBuilder("[");
            bool first = true;
            foreach (var item in items) {
                if (!first) sb.Append(',');
                sb.Append(ToJson(item));
                first = false;
            }
            return sb.Append(']').ToString();
        }
        return Convert.ToString(value, CultureInfo.InvariantCulture);
    }

    static void Record(StringBuilder results, string entry) {
        if (results.Length > 0) results.Append(',');
        results.Append(entry);
    }

    public static void Main(string[] args) {
        var solution = new Solution();
        var results = new StringBuilder();
        int passed = 0;
        int total = @TOTAL@;
@CASES@
        Console.WriteLine("{\"stats\":{\"passed\":" + passed + ",\"total\":" + total + "},\"results\":[" + results + "]}");
    }
}
"#;

const CASE: &str = r#"
        try {
            object result = @CALL@;
            string actual = @SERIALIZE@;
            string expected = @EXPECTED@;
            bool isPass = StripWhitespace(actual) == StripWhitespace(expected)
                || string.Equals(Convert.ToString(result, CultureInfo.InvariantCulture), expected, StringComparison.OrdinalIgnoreCase);
            if (isPass) passed++;
            Record(results, "{\"id\":@ID@,\"passed\":" + (isPass ? "true" : "false") + ",\"actual\":\"" + Escape(actual)
                + "\",\"expected\":\"" + Escape(expected) + "\",\"input\":\"" + Escape(@INPUT@) + "\"}");
        } catch (Exception e) {
            Record(results, "{\"id\":@ID@,\"passed\":false,\"error\":\"" + Escape(e.ToString()) + "\"}");
        }
"#;

const FAILED_CASE: &str = r#"
        try {
            throw new ArgumentException(@MESSAGE@);
        } catch (Exception e) {
            Record(results, "{\"id\":@ID@,\"passed\":false,\"error\":\"" + Escape(e.ToString()) + "\"}");
        }
"#;

fn csharp_type(shape: &Shape) -> String {
    match shape {
        Shape::Int => "int".to_string(),
        Shape::Float => "double".to_string(),
        Shape::Bool => "bool".to_string(),
        Shape::Str => "string".to_string(),
        Shape::List(inner) => format!("{}[]", csharp_type(inner)),
    }
}

fn render(value: &Value, ty: &str) -> Result<String, String> {
    let ty = ty.trim().trim_end_matches('?');
    if ty.contains(LINKED_LIST_MARKER) {
        return Ok(format!("ArrayToList(new int[] {{{}}})", int_items(value)?.join(", ")));
    }
    if let Some(elem) = ty.strip_suffix("[]") {
        let items: Vec<String> = match (elem.trim(), value) {
            ("char", Value::String(s)) => s.chars().map(quoted_char).collect(),
            _ => array_items(value)?
                .iter()
                .map(|item| render(item, elem))
                .collect::<Result<_, _>>()?,
        };
        return Ok(format!("new {} {{{}}}", ty, items.join(", ")));
    }
    if let Some(inner) = generic_inner(
        ty,
        &["IList", "List", "ICollection", "IEnumerable", "IReadOnlyList"],
    ) {
        let items = array_items(value)?
            .iter()
            .map(|item| render(item, inner))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(format!("new List<{inner}> {{{}}}", items.join(", ")));
    }
    match ty {
        "int" | "Int32" | "short" | "byte" => int_literal(value),
        "long" | "Int64" => Ok(int_literal(value)? + "L"),
        "double" | "Double" => float_literal(value),
        "float" | "Single" => Ok(float_literal(value)? + "f"),
        "bool" | "Boolean" => bool_literal(value),
        "char" | "Char" => Ok(quoted_char(char_value(value)?)),
        "string" | "String" => Ok(json_quoted(string_value(value)?)),
        "" | "object" | "var" | "dynamic" => render(value, &csharp_type(&infer_shape(value))),
        other => Err(format!("unsupported parameter type {other}")),
    }
}

impl LanguageAdapter for CSharpAdapter {
    fn language(&self) -> Language {
        Language::CSharp
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

    fn build_serialization(&self, signature: &CallableSignature, result: &str) -> Result<String, String> {
        match signature.returns_linked_list() {
            true => Ok(format!("ListToJson((ListNode) {result})")),
            false => Ok(format!("ToJson({result})")),
        }
    }

    fn synthesize_driver(
        &self,
        source: &str,
        signature: &CallableSignature,
        cases: &[DriverCase],
    ) -> String {
        let (usings, body) = hoist_lines(source, &["using "]);
        let uses_lists = signature.mentions_linked_list() || source.contains(LINKED_LIST_MARKER);

        let mut program = USINGS.join("\n");
        program.push('\n');
        for using in usings {
            if !USINGS.contains(&using) {
                program.push_str(using);
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
            .unwrap_or_else(|_| "Convert.ToString(result)".to_string());
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
            PROGRAM_CLASS,
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
