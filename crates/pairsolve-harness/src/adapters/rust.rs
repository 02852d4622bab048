use std::ops::Range;
use std::sync::OnceLock;

use pairsolve_core::Language;
use regex::Regex;
use serde_json::Value;

use super::{
    array_items, bool_literal, char_value, fill, float_literal, generic_inner, infer_shape,
    int_items, int_literal, string_value, DriverCase, LanguageAdapter, Shape,
};
use crate::signature::{
    is_candidate_name, split_params, strip_c_comments, CallableSignature, LINKED_LIST_MARKER,
};

pub struct RustAdapter;

fn fn_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:pub\s+)?fn\s+(\w+)\s*(?:<[^>]*>)?\s*\(([^)]*)\)\s*(?:->\s*([^{]+?))?\s*(?:where\s[^{]*)?\{",
        )
        .expect("invalid rust fn regex")
    })
}

fn impl_solution() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bimpl\s+Solution\b").expect("invalid impl regex"))
}

fn defines_solution() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bstruct\s+Solution\b").expect("invalid struct regex"))
}

fn defines_list_node() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bstruct\s+ListNode\b").expect("invalid ListNode regex"))
}

/// Byte ranges of every `impl Solution { .. }` body.
fn solution_impl_spans(code: &str) -> Vec<Range<usize>> {
    impl_solution()
        .find_iter(code)
        .filter_map(|m| {
            let open = m.end() + code[m.end()..].find('{')?;
            let mut depth = 0usize;
            for (offset, c) in code[open..].char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(open..open + offset + 1);
                        }
                    }
                    _ => {}
                }
            }
            Some(open..code.len())
        })
        .collect()
}

const LIST_NODE_STRUCT: &str = r#"
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ListNode {
    pub val: i32,
    pub next: Option<Box<ListNode>>,
}

impl ListNode {
    #[inline]
    fn new(val: i32) -> Self {
        ListNode { next: None, val }
    }
}
"#;

const LIST_HELPERS: &str = r#"
fn pairsolve_to_list(values: Vec<i32>) -> Option<Box<ListNode>> {
    let mut head = None;
    for value in values.into_iter().rev() {
        let mut node = Box::new(ListNode::new(value));
        node.next = head;
        head = Some(node);
    }
    head
}

fn pairsolve_list_json(head: &Option<Box<ListNode>>) -> String {
    let mut values = Vec::new();
    let mut current = head.as_ref();
    while let Some(node) = current {
        values.push(node.val.to_string());
        current = node.next.as_ref();
    }
    format!("[{}]", values.join(","))
}
"#;

const RUNNER: &str = r#"
trait PairsolveJson {
    fn pairsolve_json(&self) -> String;
}

macro_rules! pairsolve_json_display {
    ($($t:ty),*) => {
        $(impl PairsolveJson for $t {
            fn pairsolve_json(&self) -> String {
                self.to_string()
            }
        })*
    };
}

pairsolve_json_display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool);

impl PairsolveJson for f64 {
    fn pairsolve_json(&self) -> String {
        format!("{:?}", self)
    }
}

impl PairsolveJson for f32 {
    fn pairsolve_json(&self) -> String {
        format!("{:?}", self)
    }
}

impl PairsolveJson for char {
    fn pairsolve_json(&self) -> String {
        format!("\"{}\"", pairsolve_escape(&self.to_string()))
    }
}

impl PairsolveJson for String {
    fn pairsolve_json(&self) -> String {
        format!("\"{}\"", pairsolve_escape(self))
    }
}

impl PairsolveJson for str {
    fn pairsolve_json(&self) -> String {
        format!("\"{}\"", pairsolve_escape(self))
    }
}

impl PairsolveJson for () {
    fn pairsolve_json(&self) -> String {
        "null".to_string()
    }
}

impl<T: PairsolveJson> PairsolveJson for [T] {
    fn pairsolve_json(&self) -> String {
        let items: Vec<String> = self.iter().map(|item| item.pairsolve_json()).collect();
        format!("[{}]", items.join(","))
    }
}

impl<T: PairsolveJson> PairsolveJson for Vec<T> {
    fn pairsolve_json(&self) -> String {
        self.as_slice().pairsolve_json()
    }
}

impl<T: PairsolveJson> PairsolveJson for Option<T> {
    fn pairsolve_json(&self) -> String {
        match self {
            Some(value) => value.pairsolve_json(),
            None => "null".to_string(),
        }
    }
}

impl<'a, T: PairsolveJson + ?Sized> PairsolveJson for &'a T {
    fn pairsolve_json(&self) -> String {
        (**self).pairsolve_json()
    }
}

impl<A: PairsolveJson, B: PairsolveJson> PairsolveJson for (A, B) {
    fn pairsolve_json(&self) -> String {
        format!("[{},{}]", self.0.pairsolve_json(), self.1.pairsolve_json())
    }
}

fn pairsolve_escape(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn pairsolve_strip(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn pairsolve_panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

fn pairsolve_record(
    results: &mut Vec<String>,
    passed: &mut usize,
    id: usize,
    outcome: std::thread::Result<String>,
    expected: &str,
    input: &str,
) {
    match outcome {
        Ok(actual) => {
            let is_pass = pairsolve_strip(&actual) == pairsolve_strip(expected)
                || actual.to_lowercase() == expected.to_lowercase();
            if is_pass {
                *passed += 1;
            }
            results.push(format!(
                "{{\"id\":{},\"passed\":{},\"actual\":\"{}\",\"expected\":\"{}\",\"input\":\"{}\"}}",
                id,
                is_pass,
                pairsolve_escape(&actual),
                pairsolve_escape(expected),
                pairsolve_escape(input)
            ));
        }
        Err(payload) => results.push(format!(
            "{{\"id\":{},\"passed\":false,\"error\":\"{}\"}}",
            id,
            pairsolve_escape(&pairsolve_panic_message(payload))
        )),
    }
}

fn main() {
    std::panic::set_hook(Box::new(|_| {}));
    let mut passed = 0usize;
    let mut results: Vec<String> = Vec::new();
    let total = @TOTAL@;
@CASES@
    println!(
        "{{\"stats\":{{\"passed\":{},\"total\":{}}},\"results\":[{}]}}",
        passed,
        total,
        results.join(",")
    );
}
"#;

const CASE: &str = r#"
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> String {
        let result = @CALL@;
        @SERIALIZE@
    }));
    pairsolve_record(&mut results, &mut passed, @ID@, outcome, @EXPECTED@, @INPUT@);
"#;

const FAILED_CASE: &str = r#"
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> String {
        panic!("{}", @MESSAGE@)
    }));
    pairsolve_record(&mut results, &mut passed, @ID@, outcome, @EXPECTED@, @INPUT@);
"#;

/// Rust string literal; `Debug` output of a `str` is always valid source.
fn rust_quoted(s: &str) -> String {
    format!("{s:?}")
}

fn rust_type(shape: &Shape) -> String {
    match shape {
        Shape::Int => "i32".to_string(),
        Shape::Float => "f64".to_string(),
        Shape::Bool => "bool".to_string(),
        Shape::Str => "String".to_string(),
        Shape::List(inner) => format!("Vec<{}>", rust_type(inner)),
    }
}

fn render(value: &Value, ty: &str) -> Result<String, String> {
    let ty = ty.trim();
    if ty.contains(LINKED_LIST_MARKER) {
        return Ok(format!("pairsolve_to_list(vec![{}])", int_items(value)?.join(", ")));
    }
    if let Some(inner) = ty.strip_prefix("&mut ") {
        return Ok(format!("&mut {}", render(value, &owned_form(inner))?));
    }
    if ty == "&str" {
        return Ok(rust_quoted(string_value(value)?));
    }
    if let Some(inner) = ty.strip_prefix('&') {
        return Ok(format!("&{}", render(value, &owned_form(inner))?));
    }
    if let Some(elem) = generic_inner(ty, &["Vec"]) {
        let items: Vec<String> = match (elem, value) {
            ("char", Value::String(s)) => s.chars().map(|c| format!("{c:?}")).collect(),
            _ => array_items(value)?
                .iter()
                .map(|item| render(item, elem))
                .collect::<Result<_, _>>()?,
        };
        return Ok(format!("vec![{}]", items.join(", ")));
    }
    if let Some(inner) = generic_inner(ty, &["Option"]) {
        return match value {
            Value::Null => Ok("None".to_string()),
            _ => Ok(format!("Some({})", render(value, inner)?)),
        };
    }
    match ty {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128"
        | "usize" => int_literal(value),
        "f64" | "f32" => float_literal(value),
        "bool" => bool_literal(value),
        "char" => Ok(format!("{:?}", char_value(value)?)),
        "String" => Ok(format!("String::from({})", rust_quoted(string_value(value)?))),
        "" | "_" => render(value, &rust_type(&infer_shape(value))),
        other => Err(format!("unsupported parameter type {other}")),
    }
}

/// Owned type behind a borrow: `[T]` becomes `Vec<T>`, `str` becomes `String`.
fn owned_form(ty: &str) -> String {
    let ty = ty.trim();
    if let Some(elem) = ty.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return format!("Vec<{}>", elem.trim());
    }
    if ty == "str" {
        return "String".to_string();
    }
    ty.to_string()
}

impl LanguageAdapter for RustAdapter {
    fn language(&self) -> Language {
        Language::Rust
    }

    /// Methods of `impl Solution` win over free functions; a free helper
    /// declared ahead of the impl block is never called through `Solution::`.
    fn detect_signature(&self, source: &str) -> Option<CallableSignature> {
        let code = strip_c_comments(source);
        let impl_spans = solution_impl_spans(&code);
        let mut free = None;
        for caps in fn_pattern().captures_iter(&code) {
            let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if !is_candidate_name(name) {
                continue;
            }
            let start = caps.get(0).map_or(0, |m| m.start());
            let in_impl = impl_spans.iter().any(|span| span.contains(&start));

            let mut param_names = Vec::new();
            let mut param_types = Vec::new();
            for param in split_params(caps.get(2).map_or("", |m| m.as_str())) {
                let Some((pname, ptype)) = param.split_once(':') else {
                    continue;
                };
                let pname = pname.trim();
                param_names.push(pname.strip_prefix("mut ").unwrap_or(pname).trim().to_string());
                param_types.push(ptype.trim().to_string());
            }
            let signature = CallableSignature {
                name: name.to_string(),
                param_types,
                param_names,
                return_type: caps.get(3).map(|m| m.as_str().trim().to_string()),
                owner: in_impl.then(|| "Solution".to_string()),
            };
            if in_impl {
                return Some(signature);
            }
            free.get_or_insert(signature);
        }
        free
    }

    fn render_arg(&self, value: &Value, param_type: Option<&str>) -> Result<String, String> {
        render(value, param_type.unwrap_or(""))
    }

    fn build_invocation(&self, signature: &CallableSignature, args: &[String]) -> String {
        match &signature.owner {
            Some(owner) => format!("{}::{}({})", owner, signature.name, args.join(", ")),
            None => format!("{}({})", signature.name, args.join(", ")),
        }
    }

    fn build_serialization(&self, signature: &CallableSignature, result: &str) -> Result<String, String> {
        if signature.returns_linked_list() {
            Ok(format!("pairsolve_list_json(&{result})"))
        } else {
            Ok(format!("PairsolveJson::pairsolve_json(&{result})"))
        }
    }

    fn synthesize_driver(
        &self,
        source: &str,
        signature: &CallableSignature,
        cases: &[DriverCase],
    ) -> String {
        let code = strip_c_comments(source);
        let uses_lists = signature.mentions_linked_list() || source.contains(LINKED_LIST_MARKER);
        let on_solution = signature.owner.is_some() || impl_solution().is_match(&code);

        let mut program = String::from("#![allow(dead_code, unused_imports, unused_mut)]\n\n");
        if uses_lists && !defines_list_node().is_match(&code) {
            program.push_str(LIST_NODE_STRUCT);
        }
        if on_solution && !defines_solution().is_match(&code) {
            program.push_str("\npub struct Solution;\n");
        }
        program.push('\n');
        program.push_str(source);
        program.push('\n');
        if uses_lists {
            program.push_str(LIST_HELPERS);
        }

        let serialize = self
            .build_serialization(signature, "result")
            .unwrap_or_else(|_| "format!(\"{:?}\", result)".to_string());

        let mut blocks = String::new();
        for case in cases {
            let id = case.id.to_string();
            let expected = rust_quoted(&case.expected);
            let input = rust_quoted(&case.input);
            let block = match self.render_args(signature, case) {
                Ok(args) => fill(
                    CASE,
                    &[
                        ("CALL", self.build_invocation(signature, &args).as_str()),
                        ("SERIALIZE", serialize.as_str()),
                        ("ID", id.as_str()),
                        ("EXPECTED", expected.as_str()),
                        ("INPUT", input.as_str()),
                    ],
                ),
                Err(message) => fill(
                    FAILED_CASE,
                    &[
                        ("MESSAGE", rust_quoted(&message).as_str()),
                        ("ID", id.as_str()),
                        ("EXPECTED", expected.as_str()),
                        ("INPUT", input.as_str()),
                    ],
                ),
            };
            blocks.push_str(&block);
        }

        let total = format!("{}usize", cases.len());
        program.push_str(&fill(
            RUNNER,
            &[("TOTAL", total.as_str()), ("CASES", blocks.as_str())],
        ));
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STARTER: &str = "impl Solution {\n    pub fn two_sum(nums: Vec<i32>, target: i32) -> Vec<i32> {\n        vec![]\n    }\n}";

    #[test]
    fn test_detects_associated_fn() {
        let sig = RustAdapter.detect_signature(STARTER).unwrap();
        assert_eq!(sig.name, "two_sum");
        assert_eq!(sig.param_names, vec!["nums", "target"]);
        assert_eq!(sig.param_types, vec!["Vec<i32>", "i32"]);
        assert_eq!(sig.return_type.as_deref(), Some("Vec<i32>"));
        assert_eq!(sig.owner.as_deref(), Some("Solution"));
    }

    #[test]
    fn test_impl_method_wins_over_earlier_free_helper() {
        let src = "fn digit_sum(mut n: i32) -> i32 {\n    let mut total = 0;\n    while n > 0 { total += n % 10; n /= 10; }\n    total\n}\n\nimpl Solution {\n    pub fn add_digits(num: i32) -> i32 {\n        digit_sum(num)\n    }\n}";
        let sig = RustAdapter.detect_signature(src).unwrap();
        assert_eq!(sig.name, "add_digits");
        assert_eq!(sig.owner.as_deref(), Some("Solution"));

        let spans = solution_impl_spans(src);
        assert_eq!(spans.len(), 1);
        assert!(!spans[0].contains(&src.find("fn digit_sum").unwrap()));
        assert!(spans[0].contains(&src.find("pub fn add_digits").unwrap()));
    }

    #[test]
    fn test_free_function_after_impl_is_not_owned() {
        let src = "impl Solution {}\n\nfn is_valid(s: String) -> bool {\n    true\n}";
        let sig = RustAdapter.detect_signature(src).unwrap();
        assert_eq!(sig.name, "is_valid");
        assert_eq!(sig.owner, None);
        assert_eq!(RustAdapter.build_invocation(&sig, &["s".into()]), "is_valid(s)");
    }

    #[test]
    fn test_free_function_invocation() {
        let sig = RustAdapter
            .detect_signature("fn is_valid(s: String) -> bool {\n    true\n}")
            .unwrap();
        assert_eq!(sig.owner, None);
        assert_eq!(
            RustAdapter.build_invocation(&sig, &["String::from(\"()\")".into()]),
            "is_valid(String::from(\"()\"))"
        );
    }

    #[test]
    fn test_detects_list_signature() {
        let src = "impl Solution {\n    pub fn reverse_list(head: Option<Box<ListNode>>) -> Option<Box<ListNode>> {\n        head\n    }\n}";
        let sig = RustAdapter.detect_signature(src).unwrap();
        assert!(sig.returns_linked_list());
        assert_eq!(
            RustAdapter.render_arg(&json!([1, 2]), sig.param_type(0)).unwrap(),
            "pairsolve_to_list(vec![1, 2])"
        );
    }

    #[test]
    fn test_render_borrowed_and_nested() {
        let rust = RustAdapter;
        assert_eq!(
            rust.render_arg(&json!([[1], [2, 3]]), Some("Vec<Vec<i32>>")).unwrap(),
            "vec![vec![1], vec![2, 3]]"
        );
        assert_eq!(rust.render_arg(&json!([1, 2]), Some("&[i32]")).unwrap(), "&vec![1, 2]");
        assert_eq!(
            rust.render_arg(&json!([1]), Some("&mut Vec<i32>")).unwrap(),
            "&mut vec![1]"
        );
        assert_eq!(rust.render_arg(&json!("a\"b"), Some("&str")).unwrap(), r#""a\"b""#);
        assert_eq!(
            rust.render_arg(&json!("ab"), Some("String")).unwrap(),
            r#"String::from("ab")"#
        );
        assert_eq!(
            rust.render_arg(&json!(["a", "b"]), Some("Vec<char>")).unwrap(),
            "vec!['a', 'b']"
        );
        assert_eq!(rust.render_arg(&json!(null), Some("Option<i32>")).unwrap(), "None");
    }

    #[test]
    fn test_program_adds_solution_struct() {
        let sig = RustAdapter.detect_signature(STARTER).unwrap();
        let case = DriverCase {
            id: 0,
            args: vec![json!([2, 7, 11, 15]), json!(9)],
            expected: "[0,1]".into(),
            input: "[2,7,11,15], 9".into(),
        };
        let program = RustAdapter.synthesize_driver(STARTER, &sig, &[case]);
        assert!(program.contains("pub struct Solution;"));
        assert!(program.contains("let result = Solution::two_sum(vec![2, 7, 11, 15], 9);"));
        assert!(program.contains("PairsolveJson::pairsolve_json(&result)"));
        assert!(program.contains("let total = 1usize;"));
        assert!(!program.contains("pub struct ListNode"));
    }
}
