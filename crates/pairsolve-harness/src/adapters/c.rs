use std::fmt::Write as _;
use std::sync::OnceLock;

use pairsolve_core::Language;
use regex::Regex;
use serde_json::Value;

use super::cpp::function_pattern;
use super::{
    array_items, bool_literal, c_char, c_quoted, char_value, fill, float_literal, infer_shape,
    int_literal, string_value, DriverCase, LanguageAdapter, Shape,
};
use crate::signature::{detect_typed_callable, strip_c_comments, CallableSignature, LINKED_LIST_MARKER};

/// C has no exceptions, so a crashing case takes the whole run down with it;
/// the grader then reports the raw output.
pub struct CAdapter;

fn defines_list_node() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bstruct\s+ListNode\s*\{").expect("invalid ListNode regex"))
}

const PRELUDE: &str = r#"#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <stdbool.h>
#include <ctype.h>
#include <limits.h>
#include <math.h>
"#;

const LIST_NODE_STRUCT: &str = r#"
struct ListNode {
    int val;
    struct ListNode *next;
};
"#;

const HELPERS: &str = r#"
typedef struct {
    char* data;
    size_t len;
    size_t cap;
} PsBuf;

static void ps_init(PsBuf* b) {
    b->cap = 64;
    b->len = 0;
    b->data = malloc(b->cap);
    b->data[0] = '\0';
}

static void ps_append(PsBuf* b, const char* s) {
    size_t n = strlen(s);
    if (b->len + n + 1 > b->cap) {
        while (b->len + n + 1 > b->cap) b->cap *= 2;
        b->data = realloc(b->data, b->cap);
    }
    memcpy(b->data + b->len, s, n + 1);
    b->len += n;
}

static void ps_append_escaped(PsBuf* b, const char* s) {
    char tmp[8];
    for (; *s; s++) {
        unsigned char c = (unsigned char) *s;
        if (c == '"') ps_append(b, "\\\"");
        else if (c == '\\') ps_append(b, "\\\\");
        else if (c == '\n') ps_append(b, "\\n");
        else if (c == '\r') ps_append(b, "\\r");
        else if (c == '\t') ps_append(b, "\\t");
        else if (c < 0x20) {
            snprintf(tmp, sizeof tmp, "\\u%04x", c);
            ps_append(b, tmp);
        } else {
            tmp[0] = (char) c;
            tmp[1] = '\0';
            ps_append(b, tmp);
        }
    }
}

static void ps_append_int(PsBuf* b, long long v) {
    char tmp[32];
    snprintf(tmp, sizeof tmp, "%lld", v);
    ps_append(b, tmp);
}

static void ps_append_double(PsBuf* b, double v) {
    char tmp[64];
    snprintf(tmp, sizeof tmp, "%.10g", v);
    ps_append(b, tmp);
}

static void ps_append_string(PsBuf* b, const char* s) {
    if (s == NULL) {
        ps_append(b, "null");
        return;
    }
    ps_append(b, "\"");
    ps_append_escaped(b, s);
    ps_append(b, "\"");
}

static bool ps_same(const char* a, const char* b) {
    for (;;) {
        while (*a && isspace((unsigned char) *a)) a++;
        while (*b && isspace((unsigned char) *b)) b++;
        if (tolower((unsigned char) *a) != tolower((unsigned char) *b)) return false;
        if (*a == '\0') return true;
        a++;
        b++;
    }
}
"#;

const LIST_HELPERS: &str = r#"
static struct ListNode* ps_to_list(const int* values, int n) {
    struct ListNode* head = NULL;
    for (int i = n - 1; i >= 0; i--) {
        struct ListNode* node = malloc(sizeof(struct ListNode));
        node->val = values[i];
        node->next = head;
        head = node;
    }
    return head;
}

static void ps_append_list(PsBuf* b, struct ListNode* head) {
    ps_append(b, "[");
    for (struct ListNode* node = head; node != NULL; node = node->next) {
        if (node != head) ps_append(b, ",");
        ps_append_int(b, node->val);
    }
    ps_append(b, "]");
}
"#;

const MAIN: &str = r#"
int main(void) {
    int passed = 0;
    int total = @TOTAL@;
    PsBuf results;
    ps_init(&results);
@CASES@
    printf("{\"stats\":{\"passed\":%d,\"total\":%d},\"results\":[%s]}\n", passed, total, results.data);
    return 0;
}
"#;

const CASE: &str = r#"
    {
        PsBuf actual;
        ps_init(&actual);
@BODY@
        const char* expected = @EXPECTED@;
        bool isPass = ps_same(actual.data, expected);
        if (isPass) passed++;
        if (results.len > 0) ps_append(&results, ",");
        ps_append(&results, "{\"id\":@ID@,\"passed\":");
        ps_append(&results, isPass ? "true" : "false");
        ps_append(&results, ",\"actual\":");
        ps_append_string(&results, actual.data);
        ps_append(&results, ",\"expected\":");
        ps_append_string(&results, expected);
        ps_append(&results, ",\"input\":");
        ps_append_string(&results, @INPUT@);
        ps_append(&results, "}");
        free(actual.data);
    }
"#;

const FAILED_CASE: &str = r#"
    {
        if (results.len > 0) ps_append(&results, ",");
        ps_append(&results, "{\"id\":@ID@,\"passed\":false,\"error\":");
        ps_append_string(&results, @MESSAGE@);
        ps_append(&results, "}");
    }
"#;

/// `const struct ListNode *` and friends reduced to `ListNode*`.
fn normalize(ty: &str) -> String {
    ty.split_whitespace()
        .filter(|t| *t != "const" && *t != "struct")
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" *", "*")
}

fn is_integer(ty: &str) -> bool {
    matches!(
        ty,
        "int" | "long" | "long long" | "short" | "unsigned" | "unsigned int" | "size_t" | "long int"
    )
}

fn is_floating(ty: &str) -> bool {
    matches!(ty, "double" | "float")
}

fn is_size_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ["size", "len", "length", "count"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
        || lower == "n"
}

fn is_return_size(name: &str) -> bool {
    name.starts_with("return") && name.ends_with("Size")
}

fn c_type(shape: &Shape) -> String {
    match shape {
        Shape::Int => "int".to_string(),
        Shape::Float => "double".to_string(),
        Shape::Bool => "bool".to_string(),
        Shape::Str => "char*".to_string(),
        Shape::List(inner) => format!("{}*", c_type(inner)),
    }
}

fn render(value: &Value, ty: &str) -> Result<String, String> {
    let ty = normalize(ty);
    if ty.contains(LINKED_LIST_MARKER) {
        return render(value, "int*");
    }
    if ty == "char*" || ty == "char[]" {
        return Ok(c_quoted(string_value(value)?));
    }
    if let Some(elem) = ty.strip_suffix('*').or_else(|| ty.strip_suffix("[]")) {
        let items = array_items(value)?
            .iter()
            .map(|item| render(item, elem))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(format!("{{{}}}", items.join(", ")));
    }
    match ty.as_str() {
        t if is_integer(t) => int_literal(value),
        t if is_floating(t) => float_literal(value),
        "bool" | "_Bool" => bool_literal(value),
        "char" => Ok(c_char(char_value(value)?)),
        "" => render(value, &c_type(&infer_shape(value))),
        other => Err(format!("unsupported parameter type {other}")),
    }
}

/// Array declaration that stays valid when the list is empty.
fn array_decl(elem: &str, name: &str, literal: &str, len: usize) -> String {
    if len == 0 {
        format!("        {elem} {name}[1] = {{0}};")
    } else {
        format!("        {elem} {name}[] = {literal};")
    }
}

#[derive(Default)]
struct CallPlan {
    decls: Vec<String>,
    args: Vec<String>,
    return_size: bool,
    column_sizes: bool,
}

/// Type of the local holding the call result.
fn result_type(ret: &str) -> String {
    if ret.contains(LINKED_LIST_MARKER) {
        "struct ListNode*".to_string()
    } else if ret == "_Bool" {
        "bool".to_string()
    } else if is_integer(ret) {
        "long long".to_string()
    } else if is_floating(ret) {
        "double".to_string()
    } else {
        ret.to_string()
    }
}

fn has_param(signature: &CallableSignature, matches: impl Fn(&str, &str) -> bool) -> bool {
    signature
        .param_types
        .iter()
        .zip(&signature.param_names)
        .any(|(ty, name)| matches(&normalize(ty), name))
}

fn append_element(elem: &str, access: &str) -> Result<String, String> {
    if is_integer(elem) || elem == "char" {
        Ok(format!("ps_append_int(&actual, {access});"))
    } else if is_floating(elem) {
        Ok(format!("ps_append_double(&actual, {access});"))
    } else if elem == "bool" {
        Ok(format!("ps_append(&actual, {access} ? \"true\" : \"false\");"))
    } else if elem == "char*" {
        Ok(format!("ps_append_string(&actual, {access});"))
    } else {
        Err(format!("unsupported return element type {elem}"))
    }
}

impl CAdapter {
    fn plan_call(&self, signature: &CallableSignature, case: &DriverCase) -> Result<CallPlan, String> {
        let params: Vec<(String, String)> = signature
            .param_types
            .iter()
            .map(|t| normalize(t))
            .zip(signature.param_names.iter().cloned())
            .collect();
        let mut values = case.args.iter();
        let mut next_value = |name: &str| {
            values
                .next()
                .ok_or_else(|| format!("no example value for parameter {name}"))
        };

        let mut plan = CallPlan::default();
        let mut p = 0;
        while p < params.len() {
            let (ty, name) = &params[p];
            let follows_size = params
                .get(p + 1)
                .is_some_and(|(t, n)| is_integer(t) && is_size_name(n));

            if ty.contains(LINKED_LIST_MARKER) {
                let value = next_value(name.as_str())?;
                let len = array_items(value).map_or(0, <[Value]>::len);
                let literal = match value {
                    Value::Null => String::new(),
                    _ => render(value, "int*")?,
                };
                plan.decls.push(array_decl("int", &format!("raw{p}"), &literal, len));
                plan.decls.push(format!(
                    "        struct ListNode* list{p} = ps_to_list(raw{p}, {len});"
                ));
                plan.args.push(format!("list{p}"));
            } else if ty == "int*" && is_return_size(name) {
                plan.return_size = true;
                plan.args.push("&returnSize".to_string());
            } else if ty == "int**" && name.contains("ColumnSizes") {
                plan.column_sizes = true;
                plan.args.push("&returnColumnSizes".to_string());
            } else if ty == "char*" {
                let value = next_value(name.as_str())?;
                let literal = render(value, ty)?;
                plan.decls.push(format!("        char str{p}[] = {literal};"));
                plan.args.push(format!("str{p}"));
                if follows_size {
                    plan.args.push(format!("(int) strlen(str{p})"));
                    p += 1;
                }
            } else if ty == "char**" {
                let value = next_value(name.as_str())?;
                let len = array_items(value)?.len();
                let literal = render(value, ty)?;
                plan.decls.push(array_decl("char*", &format!("strs{p}"), &literal, len));
                plan.args.push(format!("strs{p}"));
                if follows_size {
                    plan.args.push(len.to_string());
                    p += 1;
                }
            } else if let Some(elem) = ty.strip_suffix("**") {
                let value = next_value(name.as_str())?;
                let rows = array_items(value)?;
                let mut row_names = Vec::new();
                let mut row_lens = Vec::new();
                for (r, row) in rows.iter().enumerate() {
                    let len = array_items(row)?.len();
                    let literal = render(row, &format!("{elem}*"))?;
                    plan.decls.push(array_decl(elem, &format!("row{p}_{r}"), &literal, len));
                    row_names.push(format!("row{p}_{r}"));
                    row_lens.push(len.to_string());
                }
                let grid = format!("{{{}}}", row_names.join(", "));
                let cols = format!("{{{}}}", row_lens.join(", "));
                plan.decls.push(array_decl(&format!("{elem}*"), &format!("grid{p}"), &grid, rows.len()));
                plan.decls.push(array_decl("int", &format!("cols{p}"), &cols, rows.len()));
                plan.args.push(format!("grid{p}"));
                if follows_size {
                    plan.args.push(rows.len().to_string());
                    p += 1;
                    if params.get(p + 1).is_some_and(|(t, _)| t == "int*") {
                        plan.args.push(format!("cols{p}", p = p - 1));
                        p += 1;
                    }
                }
            } else if let Some(elem) = ty.strip_suffix('*').or_else(|| ty.strip_suffix("[]")) {
                let value = next_value(name.as_str())?;
                let len = array_items(value)?.len();
                let literal = render(value, ty)?;
                plan.decls.push(array_decl(elem, &format!("arr{p}"), &literal, len));
                plan.args.push(format!("arr{p}"));
                if follows_size {
                    plan.args.push(len.to_string());
                    p += 1;
                }
            } else {
                let value = next_value(name.as_str())?;
                plan.args.push(render(value, ty)?);
            }
            p += 1;
        }

        if params.is_empty() {
            for value in case.args.iter() {
                plan.args.push(render(value, "")?);
            }
        }
        if plan.return_size {
            plan.decls.push("        int returnSize = 0;".to_string());
        }
        if plan.column_sizes {
            plan.decls.push("        int* returnColumnSizes = NULL;".to_string());
        }
        Ok(plan)
    }

    fn case_block(&self, signature: &CallableSignature, case: &DriverCase) -> Result<String, String> {
        let serialize = self.build_serialization(signature, "result")?;
        let plan = self.plan_call(signature, case)?;
        let ret = normalize(signature.return_type.as_deref().unwrap_or("int"));
        let mut body = plan.decls.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        let _ = writeln!(
            body,
            "        {} result = {};",
            result_type(&ret),
            self.build_invocation(signature, &plan.args)
        );
        for line in serialize.lines() {
            let _ = writeln!(body, "        {line}");
        }
        let body = body.trim_end();
        let id = case.id.to_string();
        Ok(fill(
            CASE,
            &[
                ("BODY", body),
                ("EXPECTED", c_quoted(&case.expected).as_str()),
                ("INPUT", c_quoted(&case.input).as_str()),
                ("ID", id.as_str()),
            ],
        ))
    }
}

impl LanguageAdapter for CAdapter {
    fn language(&self) -> Language {
        Language::C
    }

    fn detect_signature(&self, source: &str) -> Option<CallableSignature> {
        detect_typed_callable(source, function_pattern())
    }

    fn render_arg(&self, value: &Value, param_type: Option<&str>) -> Result<String, String> {
        render(value, param_type.unwrap_or(""))
    }

    fn build_invocation(&self, signature: &CallableSignature, args: &[String]) -> String {
        format!("{}({})", signature.name, args.join(", "))
    }

    /// Statements appending `result` to the `actual` buffer. Returned arrays
    /// are only measurable through `returnSize`/`returnColumnSizes`
    /// out-parameters.
    fn build_serialization(&self, signature: &CallableSignature, result: &str) -> Result<String, String> {
        let ret = normalize(signature.return_type.as_deref().unwrap_or("int"));
        let return_size = has_param(signature, |ty, name| ty == "int*" && is_return_size(name));
        let column_sizes = has_param(signature, |ty, name| ty == "int**" && name.contains("ColumnSizes"));

        let code = if ret.contains(LINKED_LIST_MARKER) {
            format!("ps_append_list(&actual, {result});")
        } else if ret == "char*" {
            format!("ps_append_string(&actual, {result});")
        } else if ret == "char" {
            format!("{{\n    char text[2] = {{{result}, '\\0'}};\n    ps_append_string(&actual, text);\n}}")
        } else if ret == "bool" || ret == "_Bool" {
            format!("ps_append(&actual, {result} ? \"true\" : \"false\");")
        } else if is_integer(&ret) {
            format!("ps_append_int(&actual, {result});")
        } else if is_floating(&ret) {
            format!("ps_append_double(&actual, {result});")
        } else if let Some(elem) = ret.strip_suffix("**").filter(|_| column_sizes) {
            if !return_size {
                return Err("cannot determine the size of the returned array".to_string());
            }
            let append = append_element(elem, &format!("{result}[i][j]"))?;
            format!(
                "ps_append(&actual, \"[\");\nfor (int i = 0; i < returnSize; i++) {{\n    if (i > 0) ps_append(&actual, \",\");\n    ps_append(&actual, \"[\");\n    for (int j = 0; j < returnColumnSizes[i]; j++) {{\n        if (j > 0) ps_append(&actual, \",\");\n        {append}\n    }}\n    ps_append(&actual, \"]\");\n}}\nps_append(&actual, \"]\");"
            )
        } else if let Some(elem) = ret.strip_suffix('*') {
            if !return_size {
                return Err("cannot determine the size of the returned array".to_string());
            }
            let append = append_element(elem, &format!("{result}[i]"))?;
            format!(
                "ps_append(&actual, \"[\");\nfor (int i = 0; i < returnSize; i++) {{\n    if (i > 0) ps_append(&actual, \",\");\n    {append}\n}}\nps_append(&actual, \"]\");"
            )
        } else {
            return Err(format!("unsupported return type {ret}"));
        };
        Ok(code)
    }

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
        program.push_str("\n#line 1 \"solution.c\"\n");
        program.push_str(source);
        program.push_str("\n#line 1 \"driver.c\"\n");
        program.push_str(HELPERS);
        if uses_lists {
            program.push_str(LIST_HELPERS);
        }

        let mut blocks = String::new();
        for case in cases {
            let block = self.case_block(signature, case).unwrap_or_else(|message| {
                let id = case.id.to_string();
                fill(
                    FAILED_CASE,
                    &[("MESSAGE", c_quoted(&message).as_str()), ("ID", id.as_str())],
                )
            });
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

    const STARTER: &str = "/**\n * Note: The returned array must be malloced, assume caller calls free().\n */\nint* twoSum(int* nums, int numsSize, int target, int* returnSize) {\n    \n}";

    fn case(args: Vec<Value>, expected: &str) -> DriverCase {
        DriverCase {
            id: 0,
            args,
            expected: expected.into(),
            input: String::new(),
        }
    }

    #[test]
    fn test_detects_pointer_signature() {
        let sig = CAdapter.detect_signature(STARTER).unwrap();
        assert_eq!(sig.name, "twoSum");
        assert_eq!(sig.param_types, vec!["int*", "int", "int", "int*"]);
        assert_eq!(sig.param_names, vec!["nums", "numsSize", "target", "returnSize"]);
        assert_eq!(sig.return_type.as_deref(), Some("int*"));
    }

    #[test]
    fn test_plan_passes_sizes_and_return_size() {
        let sig = CAdapter.detect_signature(STARTER).unwrap();
        let plan = CAdapter
            .plan_call(&sig, &case(vec![json!([2, 7, 11, 15]), json!(9)], "[0,1]"))
            .unwrap();
        assert_eq!(plan.args, vec!["arr0", "4", "9", "&returnSize"]);
        assert!(plan.decls.contains(&"        int arr0[] = {2, 7, 11, 15};".to_string()));
        assert!(plan.return_size);
    }

    #[test]
    fn test_plan_string_and_list_params() {
        let sig = CallableSignature {
            name: "isValid".into(),
            param_types: vec!["char*".into()],
            param_names: vec!["s".into()],
            return_type: Some("bool".into()),
            owner: None,
        };
        let plan = CAdapter.plan_call(&sig, &case(vec![json!("()[]")], "true")).unwrap();
        assert_eq!(plan.decls, vec!["        char str0[] = \"()[]\";"]);
        assert_eq!(plan.args, vec!["str0"]);

        let sig = CAdapter
            .detect_signature("struct ListNode* reverseList(struct ListNode* head) {\n}")
            .unwrap();
        assert_eq!(sig.return_type.as_deref(), Some("struct ListNode*"));
        let plan = CAdapter.plan_call(&sig, &case(vec![json!([])], "[]")).unwrap();
        assert_eq!(plan.decls[0], "        int raw0[1] = {0};");
        assert_eq!(plan.args, vec!["list0"]);
    }

    #[test]
    fn test_unsized_array_return_fails_the_case_only() {
        let sig = CAdapter
            .detect_signature("int* sorted(int* nums, int numsSize) {\n}")
            .unwrap();
        let program = CAdapter.synthesize_driver(
            "int* sorted(int* nums, int numsSize) {\n}",
            &sig,
            &[case(vec![json!([3, 1])], "[1,3]")],
        );
        assert!(program.contains("cannot determine the size of the returned array"));
        assert!(program.contains("int total = 1;"));
    }

    #[test]
    fn test_program_loops_over_return_size() {
        let sig = CAdapter.detect_signature(STARTER).unwrap();
        let program = CAdapter.synthesize_driver(
            STARTER,
            &sig,
            &[case(vec![json!([3, 3]), json!(6)], "[0,1]")],
        );
        assert!(program.contains("int* result = twoSum(arr0, 2, 6, &returnSize);"));
        assert!(program.contains("for (int i = 0; i < returnSize; i++)"));
        assert!(program.contains("#line 1 \"solution.c\""));
    }

    #[test]
    fn test_serialization_follows_return_type() {
        let sig = CAdapter
            .detect_signature("bool isValid(char* s) {\n}")
            .unwrap();
        assert_eq!(
            CAdapter.build_serialization(&sig, "result").unwrap(),
            "ps_append(&actual, result ? \"true\" : \"false\");"
        );
        let sig = CAdapter.detect_signature(STARTER).unwrap();
        assert!(CAdapter
            .build_serialization(&sig, "result")
            .unwrap()
            .contains("ps_append_int(&actual, result[i]);"));
    }
}
