//! Per-language driver synthesis.
//!
//! Each adapter knows how to find the entry point in a solution, how to
//! render a decoded argument as a literal of its language, and how to wrap
//! the solution in a harness that runs every case in isolation and prints a
//! single JSON summary line.

mod c;
mod cpp;
mod csharp;
mod go;
mod java;
mod javascript;
mod python;
mod rust;

use std::collections::HashMap;
use std::sync::Arc;

use pairsolve_core::{Example, Language};
use serde_json::Value;

use crate::canonical::{canonical, normalize_expected};
use crate::input_parser::parse_input;
use crate::signature::{CallableSignature, Unsupported};

pub use c::CAdapter;
pub use cpp::CppAdapter;
pub use csharp::CSharpAdapter;
pub use go::GoAdapter;
pub use java::JavaAdapter;
pub use javascript::JavaScriptAdapter;
pub use python::PythonAdapter;
pub use rust::RustAdapter;

/// One example, decoded and ready to embed in a harness.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverCase {
    pub id: u32,
    pub args: Vec<Value>,
    /// Canonical expected output, compared by the harness.
    pub expected: String,
    /// Human readable argument list reported back with each result.
    pub input: String,
}

impl DriverCase {
    pub fn from_example(id: u32, example: &Example) -> Self {
        let args = parse_input(&example.input);
        let input = args.iter().map(canonical).collect::<Vec<_>>().join(", ");
        Self {
            id,
            args,
            expected: normalize_expected(&example.output),
            input,
        }
    }
}

/// A self-contained program: the solution plus a generated test harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverProgram {
    pub language: Language,
    pub callable: String,
    pub source: String,
    pub case_count: usize,
}

pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Finds the entry point in `source`, or `None` when nothing recognisable
    /// is declared.
    fn detect_signature(&self, source: &str) -> Option<CallableSignature>;

    /// Renders `value` as a literal of this language, coerced to
    /// `param_type` when it is known.
    fn render_arg(&self, value: &Value, param_type: Option<&str>) -> Result<String, String>;

    /// Expression calling the entry point with already rendered arguments.
    fn build_invocation(&self, signature: &CallableSignature, args: &[String]) -> String;

    /// Code turning the value bound to `result` into its canonical JSON text.
    fn build_serialization(&self, signature: &CallableSignature, result: &str) -> Result<String, String>;

    /// Wraps `source` in a harness that calls `signature` once per case.
    fn synthesize_driver(
        &self,
        source: &str,
        signature: &CallableSignature,
        cases: &[DriverCase],
    ) -> String;

    /// Renders every argument of `case`, stopping at the first that does
    /// not fit its parameter.
    fn render_args(&self, signature: &CallableSignature, case: &DriverCase) -> Result<Vec<String>, String> {
        case.args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                self.render_arg(arg, signature.param_type(i))
                    .map_err(|e| format!("argument {}: {}", i + 1, e))
            })
            .collect()
    }
}

/// Adapters by language. Languages without an adapter are simply absent.
pub struct AdapterRegistry {
    adapters: HashMap<Language, Arc<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with an adapter for every supported language.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(JavaScriptAdapter::javascript()));
        registry.register(Arc::new(JavaScriptAdapter::typescript()));
        registry.register(Arc::new(PythonAdapter));
        registry.register(Arc::new(JavaAdapter));
        registry.register(Arc::new(CSharpAdapter));
        registry.register(Arc::new(CppAdapter));
        registry.register(Arc::new(CAdapter));
        registry.register(Arc::new(GoAdapter));
        registry.register(Arc::new(RustAdapter));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn LanguageAdapter>) {
        self.adapters.insert(adapter.language(), adapter);
    }

    pub fn get(&self, language: Language) -> Option<Arc<dyn LanguageAdapter>> {
        self.adapters.get(&language).cloned()
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.adapters.keys().copied().collect();
        languages.sort();
        languages
    }

    /// Looks for the entry point in the live source first and falls back to
    /// the problem's starter code.
    pub fn detect_signature(
        &self,
        language: Language,
        source: &str,
        starter: Option<&str>,
    ) -> Result<CallableSignature, Unsupported> {
        let adapter = self.get(language).ok_or(Unsupported::NoAdapter(language))?;
        adapter
            .detect_signature(source)
            .or_else(|| starter.and_then(|s| adapter.detect_signature(s)))
            .ok_or(Unsupported::NoSignature(language))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Rough element type of a decoded value, used when a parameter type is
/// unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Shape {
    Int,
    Float,
    Bool,
    Str,
    List(Box<Shape>),
}

pub(crate) fn infer_shape(value: &Value) -> Shape {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Shape::Int,
        Value::Number(_) => Shape::Float,
        Value::Bool(_) => Shape::Bool,
        Value::Array(items) => Shape::List(Box::new(
            items.iter().map(infer_shape).next().unwrap_or(Shape::Int),
        )),
        Value::String(_) | Value::Null | Value::Object(_) => Shape::Str,
    }
}

pub(crate) fn mismatch(value: &Value, expected: &str) -> String {
    format!("cannot pass {} as {}", canonical(value), expected)
}

pub(crate) fn int_literal(value: &Value) -> Result<String, String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => Ok(format!("{}", f as i64)),
            _ => Err(mismatch(value, "an integer")),
        },
        Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        _ => Err(mismatch(value, "an integer")),
    }
}

/// Always carries a decimal point or exponent so it types as floating point.
pub(crate) fn float_literal(value: &Value) -> Result<String, String> {
    value
        .as_f64()
        .map(|f| format!("{f:?}"))
        .ok_or_else(|| mismatch(value, "a floating point number"))
}

pub(crate) fn bool_literal(value: &Value) -> Result<String, String> {
    value
        .as_bool()
        .map(|b| b.to_string())
        .ok_or_else(|| mismatch(value, "a boolean"))
}

pub(crate) fn string_value(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| mismatch(value, "a string"))
}

pub(crate) fn char_value(value: &Value) -> Result<char, String> {
    let s = string_value(value)?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(mismatch(value, "a single character")),
    }
}

pub(crate) fn array_items(value: &Value) -> Result<&[Value], String> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| mismatch(value, "a list"))
}

/// Integer elements of a list, as used for linked list construction.
pub(crate) fn int_items(value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        _ => array_items(value)?.iter().map(int_literal).collect(),
    }
}

/// Double-quoted literal with JSON escapes, valid in JavaScript, Python,
/// Java, C# and Go.
pub(crate) fn json_quoted(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Double-quoted C/C++ literal. Control characters become octal escapes and
/// `?` is escaped to keep trigraphs out.
pub(crate) fn c_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        push_c_escaped(&mut out, c, '"');
    }
    out.push('"');
    out
}

pub(crate) fn c_char(c: char) -> String {
    let mut out = String::from("'");
    push_c_escaped(&mut out, c, '\'');
    out.push('\'');
    out
}

fn push_c_escaped(out: &mut String, c: char, quote: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '?' => out.push_str("\\?"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c if (c as u32) < 0x20 || c as u32 == 0x7f => out.push_str(&format!("\\{:03o}", c as u32)),
        c => out.push(c),
    }
}

/// Single-quoted character literal for Java, C# and Go.
pub(crate) fn quoted_char(c: char) -> String {
    match c {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\r' => "'\\r'".to_string(),
        '\t' => "'\\t'".to_string(),
        c if (c as u32) < 0x20 => format!("'\\u{:04x}'", c as u32),
        c => format!("'{c}'"),
    }
}

/// Strips a generic wrapper such as `List<...>` and returns the inner type.
pub(crate) fn generic_inner<'a>(ty: &'a str, wrappers: &[&str]) -> Option<&'a str> {
    let ty = ty.trim();
    wrappers.iter().find_map(|w| {
        ty.strip_prefix(w)
            .and_then(|rest| rest.trim_start().strip_prefix('<'))
            .and_then(|rest| rest.trim_end().strip_suffix('>'))
            .map(str::trim)
    })
}

/// Substitutes `@KEY@` markers in one pass, so substituted text is never
/// scanned again. Unknown markers are left as they are.
pub(crate) fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('@') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let substitution = after.find('@').and_then(|end| {
            let key = &after[..end];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, end))
        });
        match substitution {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('@');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Moves top-level `import`/`using`-style lines to the front, returning
/// `(header_lines, remaining_body)`. Indented lines are statements and stay.
pub(crate) fn hoist_lines<'a>(source: &'a str, prefixes: &[&str]) -> (Vec<&'a str>, String) {
    let mut header = Vec::new();
    let mut body = Vec::new();
    for line in source.lines() {
        let top_level = !line.starts_with(char::is_whitespace);
        if top_level
            && prefixes.iter().any(|p| line.starts_with(p))
            && line.trim_end().ends_with(';')
        {
            header.push(line.trim());
        } else {
            body.push(line);
        }
    }
    (header, body.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_from_example() {
        let example = Example::new("nums = [2,7,11,15], target = 9", "[0, 1]");
        let case = DriverCase::from_example(0, &example);
        assert_eq!(case.args, vec![json!([2, 7, 11, 15]), json!(9)]);
        assert_eq!(case.expected, "[0,1]");
        assert_eq!(case.input, "[2,7,11,15], 9");
    }

    #[test]
    fn test_registry_covers_every_language() {
        let registry = AdapterRegistry::new();
        assert_eq!(registry.languages(), Language::all().to_vec());
    }

    #[test]
    fn test_empty_registry_is_unsupported() {
        let registry = AdapterRegistry::empty();
        let err = registry
            .detect_signature(Language::Python, "def f(x): return x", None)
            .unwrap_err();
        assert_eq!(err, Unsupported::NoAdapter(Language::Python));
    }

    #[test]
    fn test_signature_falls_back_to_starter() {
        let registry = AdapterRegistry::new();
        let sig = registry
            .detect_signature(
                Language::Python,
                "# nothing yet",
                Some("class Solution:\n    def isValid(self, s: str) -> bool:\n        pass"),
            )
            .unwrap();
        assert_eq!(sig.name, "isValid");

        let err = registry
            .detect_signature(Language::Python, "x = 1", Some("y = 2"))
            .unwrap_err();
        assert_eq!(err, Unsupported::NoSignature(Language::Python));
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(json_quoted("a\"b\n"), r#""a\"b\n""#);
        assert_eq!(c_quoted("a\"b?\n\u{1}"), r#""a\"b\?\n\001""#);
        assert_eq!(c_char('\''), r"'\''");
        assert_eq!(quoted_char('x'), "'x'");
        assert_eq!(float_literal(&json!(2)).unwrap(), "2.0");
        assert_eq!(int_literal(&json!(3.0)).unwrap(), "3");
        assert!(int_literal(&json!("x")).is_err());
    }

    #[test]
    fn test_fill_is_single_pass() {
        let out = fill(
            "call(@ARGS@) == @EXPECTED@ @ me@x",
            &[("ARGS", "\"@EXPECTED@\""), ("EXPECTED", "[0,1]")],
        );
        assert_eq!(out, "call(\"@EXPECTED@\") == [0,1] @ me@x");
    }

    #[test]
    fn test_hoist_imports() {
        let (header, body) = hoist_lines("import java.util.*;\nclass A {}\n", &["import "]);
        assert_eq!(header, vec!["import java.util.*;"]);
        assert_eq!(body.trim(), "class A {}");
    }

    #[test]
    fn test_generic_inner() {
        assert_eq!(generic_inner("List<Integer>", &["List"]), Some("Integer"));
        assert_eq!(
            generic_inner("vector<vector<int>>", &["vector"]),
            Some("vector<int>")
        );
        assert_eq!(generic_inner("int[]", &["List"]), None);
    }
}
