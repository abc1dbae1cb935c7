use anyhow::{Context, Result};
use regex::Regex;
use tree_sitter::{Node, Parser};

use super::types::{
    AssertionPattern, AssertionStyle, FixturePattern, GoldenExample, ImportPattern,
    TestFunctionPattern,
};

const HTTP_VERBS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

/// Lines kept in a body summary before truncation.
const SUMMARY_LINES: usize = 10;

fn python_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .context("Failed to load python grammar")?;
    Ok(parser)
}

/// Parse one python test file into a `GoldenExample`.
pub fn parse_python_source(source: &str, file_path: &str) -> Result<GoldenExample> {
    let mut parser = python_parser()?;
    let tree = parser
        .parse(source, None)
        .context("Parser returned no tree")?;
    let root = tree.root_node();
    let bytes = source.as_bytes();

    Ok(GoldenExample {
        file_path: file_path.to_string(),
        source_code: source.to_string(),
        imports: extract_imports(root, bytes),
        fixtures: extract_fixtures(root, bytes),
        test_functions: extract_test_functions(root, bytes),
        helper_functions: extract_helper_functions(root, bytes),
        class_names: extract_class_names(root, bytes),
    })
}

fn node_text<'a>(node: Node, bytes: &'a [u8]) -> &'a str {
    node.utf8_text(bytes).unwrap_or("")
}

fn extract_imports(root: Node, bytes: &[u8]) -> Vec<ImportPattern> {
    let import_re = Regex::new(r"^import\s+([\w.]+)(?:\s+as\s+(\w+))?").expect("valid regex");
    let from_re = Regex::new(r"^from\s+([\w.]+)\s+import\s+(.+)").expect("valid regex");

    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        match node.kind() {
            "import_statement" => {
                let text = node_text(node, bytes);
                if let Some(cap) = import_re.captures(text) {
                    imports.push(ImportPattern {
                        module: cap[1].to_string(),
                        names: Vec::new(),
                        alias: cap.get(2).map(|m| m.as_str().to_string()),
                        is_from_import: false,
                    });
                }
            }
            "import_from_statement" => {
                let text = node_text(node, bytes);
                if let Some(cap) = from_re.captures(text) {
                    let names = cap[2]
                        .split(',')
                        .map(|n| n.trim().to_string())
                        .filter(|n| !n.is_empty())
                        .collect();
                    imports.push(ImportPattern {
                        module: cap[1].to_string(),
                        names,
                        alias: None,
                        is_from_import: true,
                    });
                }
            }
            _ => {}
        }
    }
    imports
}

fn extract_fixtures(root: Node, bytes: &[u8]) -> Vec<FixturePattern> {
    let scope_re = Regex::new(r#"scope=["'](\w+)["']"#).expect("valid regex");

    let mut fixtures = Vec::new();
    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        if node.kind() != "decorated_definition" {
            continue;
        }

        let mut decorators = Vec::new();
        let mut func_node = None;
        let mut inner = node.walk();
        for child in node.children(&mut inner) {
            match child.kind() {
                "decorator" => decorators.push(node_text(child, bytes).to_string()),
                "function_definition" => func_node = Some(child),
                _ => {}
            }
        }

        let Some(func) = func_node else { continue };
        if !decorators.iter().any(|d| d.contains("fixture")) {
            continue;
        }

        let name = function_name(func, bytes);
        let scope = decorators
            .iter()
            .find_map(|d| scope_re.captures(d).map(|cap| cap[1].to_string()))
            .unwrap_or_else(|| "function".to_string());
        let body = node_text(func, bytes);

        fixtures.push(FixturePattern {
            name,
            scope,
            yields: body.contains("yield"),
            docstring: extract_docstring(func, bytes),
            body_summary: summarize_body(func, bytes),
        });
    }
    fixtures
}

fn extract_test_functions(root: Node, bytes: &[u8]) -> Vec<TestFunctionPattern> {
    let mut functions = Vec::new();
    visit_function_defs(root, &mut |node| {
        let name = function_name(node, bytes);
        if !name.starts_with("test_") {
            return;
        }

        let body_text = node_text(node, bytes);
        let (http_method, endpoint) = detect_http_call(body_text);

        functions.push(TestFunctionPattern {
            name,
            docstring: extract_docstring(node, bytes),
            decorators: decorators_of(node, bytes),
            fixtures_used: parameters_of(node, bytes),
            http_method,
            endpoint,
            assertions: extract_assertions(body_text),
            body_summary: summarize_body(node, bytes),
            line_count: node.end_position().row - node.start_position().row + 1,
        });
    });
    functions
}

/// Walk all function definitions, recursing into class bodies so test
/// methods are captured as test units too.
fn visit_function_defs<'t>(node: Node<'t>, visit: &mut dyn FnMut(Node<'t>)) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_definition" => visit(child),
            "decorated_definition" => {
                let mut inner = child.walk();
                for sub in child.children(&mut inner) {
                    if sub.kind() == "function_definition" {
                        visit(sub);
                    }
                }
            }
            "class_definition" => {
                let mut inner = child.walk();
                for sub in child.children(&mut inner) {
                    if sub.kind() == "block" {
                        visit_function_defs(sub, visit);
                    }
                }
            }
            _ => {}
        }
    }
}

fn extract_helper_functions(root: Node, bytes: &[u8]) -> Vec<String> {
    let mut helpers = Vec::new();
    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        let mut func_node = None;
        match node.kind() {
            "function_definition" => func_node = Some(node),
            "decorated_definition" => {
                let mut is_fixture = false;
                let mut inner = node.walk();
                for child in node.children(&mut inner) {
                    match child.kind() {
                        "decorator" if node_text(child, bytes).contains("fixture") => {
                            is_fixture = true;
                        }
                        "function_definition" => func_node = Some(child),
                        _ => {}
                    }
                }
                if is_fixture {
                    continue;
                }
            }
            _ => {}
        }

        if let Some(func) = func_node {
            let name = function_name(func, bytes);
            if !name.is_empty() && !name.starts_with("test_") {
                helpers.push(name);
            }
        }
    }
    helpers
}

fn extract_class_names(root: Node, bytes: &[u8]) -> Vec<String> {
    let mut classes = Vec::new();
    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        if node.kind() == "class_definition" {
            let mut inner = node.walk();
            for child in node.children(&mut inner) {
                if child.kind() == "identifier" {
                    classes.push(node_text(child, bytes).to_string());
                    break;
                }
            }
        }
    }
    classes
}

fn function_name(func: Node, bytes: &[u8]) -> String {
    let mut cursor = func.walk();
    for child in func.children(&mut cursor) {
        if child.kind() == "identifier" {
            return node_text(child, bytes).to_string();
        }
    }
    String::new()
}

fn decorators_of(func: Node, bytes: &[u8]) -> Vec<String> {
    let Some(parent) = func.parent() else {
        return Vec::new();
    };
    if parent.kind() != "decorated_definition" {
        return Vec::new();
    }
    let mut decorators = Vec::new();
    let mut cursor = parent.walk();
    for child in parent.children(&mut cursor) {
        if child.kind() == "decorator" {
            decorators.push(
                node_text(child, bytes)
                    .trim_start_matches('@')
                    .to_string(),
            );
        }
    }
    decorators
}

fn parameters_of(func: Node, bytes: &[u8]) -> Vec<String> {
    let mut cursor = func.walk();
    for child in func.children(&mut cursor) {
        if child.kind() == "parameters" {
            let mut params = Vec::new();
            let mut inner = child.walk();
            for param in child.children(&mut inner) {
                if param.kind() == "identifier" {
                    let name = node_text(param, bytes);
                    if name != "self" {
                        params.push(name.to_string());
                    }
                }
            }
            return params;
        }
    }
    Vec::new()
}

/// First HTTP verb call in the body, with its literal or f-string target.
fn detect_http_call(body: &str) -> (Option<String>, Option<String>) {
    for verb in HTTP_VERBS {
        let call_re = Regex::new(&format!(r"\.{}\s*\(", verb)).expect("valid regex");
        if !call_re.is_match(body) {
            continue;
        }

        let literal_re =
            Regex::new(&format!(r#"\.{}\s*\(\s*["']([^"']+)["']"#, verb)).expect("valid regex");
        if let Some(cap) = literal_re.captures(body) {
            return (Some(verb.to_uppercase()), Some(cap[1].to_string()));
        }

        // f-string target like f"{base_url}/api/users", keep the path part
        let fstring_re =
            Regex::new(&format!(r#"\.{}\s*\(\s*f["'][^"']*\}}(/[^"']*)["']"#, verb))
                .expect("valid regex");
        let endpoint = fstring_re.captures(body).map(|cap| cap[1].to_string());
        return (Some(verb.to_uppercase()), endpoint);
    }
    (None, None)
}

fn extract_assertions(body: &str) -> Vec<AssertionPattern> {
    let unittest_re = Regex::new(r"^self\.assert\w+").expect("valid regex");

    let mut assertions = Vec::new();
    for line in body.lines() {
        let line = line.trim();
        let style = if line.starts_with("assert ") {
            Some(AssertionStyle::Assert)
        } else if line.contains("pytest.raises") {
            Some(AssertionStyle::Raises)
        } else if unittest_re.is_match(line) {
            Some(AssertionStyle::AssertEqual)
        } else {
            None
        };

        if let Some(style) = style {
            assertions.push(AssertionPattern {
                style,
                pattern: line.to_string(),
                frequency: 1,
            });
        }
    }
    assertions
}

/// Docstring of a function, if its body starts with a string expression.
fn extract_docstring(func: Node, bytes: &[u8]) -> Option<String> {
    let mut cursor = func.walk();
    for child in func.children(&mut cursor) {
        if child.kind() != "block" {
            continue;
        }
        let mut inner = child.walk();
        for stmt in child.children(&mut inner) {
            if stmt.kind() == "expression_statement" {
                let mut expr_cursor = stmt.walk();
                for expr in stmt.children(&mut expr_cursor) {
                    if expr.kind() == "string" {
                        let text = node_text(expr, bytes)
                            .trim_matches(|c| c == '"' || c == '\'')
                            .trim()
                            .to_string();
                        return Some(text);
                    }
                }
            }
        }
        break;
    }
    None
}

fn summarize_body(node: Node, bytes: &[u8]) -> String {
    let text = node_text(node, bytes);
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= SUMMARY_LINES {
        return text.to_string();
    }
    format!(
        "{}\n... ({} more lines)",
        lines[..SUMMARY_LINES].join("\n"),
        lines.len() - SUMMARY_LINES
    )
}
