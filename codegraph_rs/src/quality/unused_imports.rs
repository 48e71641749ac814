//! Unused-import detection with per-language parsing rules.
//!
//! Imports are parsed from source text with language-specific patterns, then
//! checked against the identifier usages in the rest of the file. Wildcard
//! and namespace imports use the coarse heuristic "used if any dotted usage
//! exists"; the false-positive rate is an accepted bound, not zero.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex literal")
}

/// Frameworks and tooling whose imports are side-effectful or injected;
/// never reported unused.
const FRAMEWORK_ALLOW_LIST: &[&str] = &[
    "react",
    "vue",
    "@angular",
    "angular",
    "express",
    "next",
    "svelte",
    "vitest",
    "jest",
    "@testing-library",
    "testing-library",
    "webpack",
    "vite",
    "rollup",
    "esbuild",
    "eslint",
    "prettier",
];

/// One parsed import statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedImport {
    pub source: String,
    /// Named symbols bound into scope.
    pub symbols: Vec<String>,
    /// Default-import binding, if any.
    pub default: Option<String>,
    /// Namespace/alias binding (`* as ns`, `import numpy as np`).
    pub namespace: Option<String>,
    pub line: usize,
    pub wildcard: bool,
}

/// An import (or part of one) with no matching usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedImport {
    pub source: String,
    pub symbols: Vec<String>,
    pub line: usize,
}

fn regex_js_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // import Default, { a, b as c } from 'x'; import * as ns from 'x'
        regex(r#"(?m)^\s*import\s+(?:type\s+)?(?P<clause>[^'"]*?)\s*from\s*['"](?P<source>[^'"]+)['"]"#)
    })
}

fn regex_js_side_effect() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"(?m)^\s*import\s*['"](?P<source>[^'"]+)['"]"#))
}

fn regex_py_from_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(r"(?m)^\s*from\s+(?P<source>[\w\.]+)\s+import\s+(?P<names>[\w\.\,\s\*]+?)\s*$")
    })
}

fn regex_py_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(r"(?m)^\s*import\s+(?P<source>[\w\.]+)(?:\s+as\s+(?P<alias>\w+))?\s*$")
    })
}

fn regex_rust_use() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"(?m)^\s*(?:pub\s+)?use\s+(?P<path>[^;]+);"))
}

fn regex_go_import_single() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"(?m)^\s*import\s+(?:(?P<alias>\w+)\s+)?"(?P<source>[^"]+)""#))
}

fn regex_go_import_block_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"(?m)^\s*(?:(?P<alias>[\w\.]+)\s+)?"(?P<source>[^"]+)"\s*$"#))
}

fn regex_java_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(r"(?m)^\s*import\s+(?:static\s+)?(?P<path>[\w\.]+(?:\.\*)?)\s*;")
    })
}

fn regex_csharp_using() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(r"(?m)^\s*using\s+(?:(?P<alias>\w+)\s*=\s*)?(?P<path>[\w\.]+)\s*;")
    })
}

fn regex_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"[A-Za-z_][A-Za-z0-9_]*"))
}

fn line_number(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

/// Parse imports with the rules for the given language key
/// (`ts`, `py`, `rs`, `go`, `java`, `c`, `cs`).
pub fn parse_imports(content: &str, lang: &str) -> Vec<ParsedImport> {
    match lang {
        "ts" => parse_js_imports(content),
        "py" => parse_py_imports(content),
        "rs" => parse_rust_imports(content),
        "go" => parse_go_imports(content),
        "java" => parse_java_imports(content),
        "cs" => parse_csharp_imports(content),
        // C/C++ #include pulls in headers, not bindings; nothing to track.
        _ => Vec::new(),
    }
}

fn parse_js_imports(content: &str) -> Vec<ParsedImport> {
    let mut imports = Vec::new();
    for cap in regex_js_import().captures_iter(content) {
        let source = cap["source"].to_string();
        let clause = cap["clause"].trim();
        let line = line_number(content, cap.get(0).unwrap().start());
        let mut import = ParsedImport {
            source,
            symbols: Vec::new(),
            default: None,
            namespace: None,
            line,
            wildcard: false,
        };

        let mut rest = clause;
        if let Some(star_idx) = rest.find("* as ") {
            let after = &rest[star_idx + 5..];
            let ns: String = after
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            import.namespace = Some(ns);
            import.wildcard = true;
            rest = "";
        }
        if let Some(open) = rest.find('{') {
            let before = rest[..open].trim().trim_end_matches(',').trim();
            if !before.is_empty() {
                import.default = Some(before.to_string());
            }
            if let Some(close) = rest.find('}') {
                for part in rest[open + 1..close].split(',') {
                    let part = part.trim();
                    if part.is_empty() {
                        continue;
                    }
                    // `orig as local` binds the local name
                    let bound = part
                        .rsplit(" as ")
                        .next()
                        .unwrap_or(part)
                        .trim()
                        .to_string();
                    if !bound.is_empty() {
                        import.symbols.push(bound);
                    }
                }
            }
        } else if !rest.is_empty() {
            import.default = Some(rest.trim_end_matches(',').trim().to_string());
        }
        imports.push(import);
    }
    for cap in regex_js_side_effect().captures_iter(content) {
        // side-effect imports bind nothing; never reported
        let source = cap["source"].to_string();
        if imports.iter().any(|i| i.source == source) {
            continue;
        }
        imports.push(ParsedImport {
            source,
            symbols: Vec::new(),
            default: None,
            namespace: None,
            line: line_number(content, cap.get(0).unwrap().start()),
            wildcard: false,
        });
    }
    imports
}

fn parse_py_imports(content: &str) -> Vec<ParsedImport> {
    let mut imports = Vec::new();
    for cap in regex_py_from_import().captures_iter(content) {
        let names = cap["names"].trim();
        let line = line_number(content, cap.get(0).unwrap().start());
        let wildcard = names == "*";
        let symbols = if wildcard {
            Vec::new()
        } else {
            names
                .split(',')
                .map(|n| {
                    n.trim()
                        .rsplit(" as ")
                        .next()
                        .unwrap_or(n.trim())
                        .trim()
                        .to_string()
                })
                .filter(|n| !n.is_empty())
                .collect()
        };
        imports.push(ParsedImport {
            source: cap["source"].to_string(),
            symbols,
            default: None,
            namespace: None,
            line,
            wildcard,
        });
    }
    for cap in regex_py_import().captures_iter(content) {
        let source = cap["source"].to_string();
        let namespace = cap
            .name("alias")
            .map(|m| m.as_str().to_string())
            .or_else(|| source.split('.').next().map(|s| s.to_string()));
        imports.push(ParsedImport {
            source,
            symbols: Vec::new(),
            default: None,
            namespace,
            line: line_number(content, cap.get(0).unwrap().start()),
            wildcard: true,
        });
    }
    imports
}

fn parse_rust_imports(content: &str) -> Vec<ParsedImport> {
    let mut imports = Vec::new();
    for cap in regex_rust_use().captures_iter(content) {
        let path = cap["path"].trim().to_string();
        let line = line_number(content, cap.get(0).unwrap().start());
        let wildcard = path.ends_with("::*");
        let mut symbols = Vec::new();
        if let Some(open) = path.find('{') {
            let close = path.rfind('}').unwrap_or(path.len());
            for part in path[open + 1..close].split(',') {
                let part = part.trim();
                if part.is_empty() || part == "self" {
                    continue;
                }
                let bound = part.rsplit(" as ").next().unwrap_or(part);
                let leaf = bound.rsplit("::").next().unwrap_or(bound).trim();
                if leaf != "*" && !leaf.is_empty() {
                    symbols.push(leaf.to_string());
                }
            }
        } else if !wildcard {
            let bound = path.rsplit(" as ").next().unwrap_or(&path);
            let leaf = bound.rsplit("::").next().unwrap_or(bound).trim();
            if !leaf.is_empty() {
                symbols.push(leaf.to_string());
            }
        }
        imports.push(ParsedImport {
            source: path.clone(),
            symbols,
            default: None,
            namespace: None,
            line,
            wildcard,
        });
    }
    imports
}

fn parse_go_imports(content: &str) -> Vec<ParsedImport> {
    let mut imports = Vec::new();
    for cap in regex_go_import_single().captures_iter(content) {
        imports.push(go_import(content, &cap));
    }
    // import ( ... ) blocks
    let mut in_block = false;
    let mut offset = 0usize;
    for raw_line in content.split_inclusive('\n') {
        let line = raw_line.trim();
        if line.starts_with("import (") {
            in_block = true;
        } else if in_block && line.starts_with(')') {
            in_block = false;
        } else if in_block {
            if let Some(cap) = regex_go_import_block_line().captures(raw_line) {
                imports.push(go_import_at(&cap, line_number(content, offset)));
            }
        }
        offset += raw_line.len();
    }
    imports
}

fn go_import(content: &str, cap: &regex::Captures<'_>) -> ParsedImport {
    go_import_at(cap, line_number(content, cap.get(0).unwrap().start()))
}

fn go_import_at(cap: &regex::Captures<'_>, line: usize) -> ParsedImport {
    let source = cap["source"].to_string();
    let alias = cap.name("alias").map(|m| m.as_str().to_string());
    let namespace = match alias.as_deref() {
        Some("_") | Some(".") => None,
        Some(a) => Some(a.to_string()),
        None => source.rsplit('/').next().map(|s| s.to_string()),
    };
    // blank and dot imports are side-effect/wildcard style; never reported
    let side_effect = matches!(alias.as_deref(), Some("_") | Some("."));
    ParsedImport {
        source,
        symbols: Vec::new(),
        default: None,
        namespace,
        line,
        wildcard: side_effect,
    }
}

fn parse_java_imports(content: &str) -> Vec<ParsedImport> {
    regex_java_import()
        .captures_iter(content)
        .map(|cap| {
            let path = cap["path"].to_string();
            let line = line_number(content, cap.get(0).unwrap().start());
            let wildcard = path.ends_with(".*");
            let symbols = if wildcard {
                Vec::new()
            } else {
                path.rsplit('.')
                    .next()
                    .map(|s| vec![s.to_string()])
                    .unwrap_or_default()
            };
            ParsedImport {
                source: path,
                symbols,
                default: None,
                namespace: None,
                line,
                wildcard,
            }
        })
        .collect()
}

fn parse_csharp_imports(content: &str) -> Vec<ParsedImport> {
    regex_csharp_using()
        .captures_iter(content)
        .map(|cap| {
            let path = cap["path"].to_string();
            let line = line_number(content, cap.get(0).unwrap().start());
            let namespace = cap
                .name("alias")
                .map(|m| m.as_str().to_string())
                .or_else(|| path.rsplit('.').next().map(|s| s.to_string()));
            ParsedImport {
                source: path,
                symbols: Vec::new(),
                default: None,
                namespace,
                line,
                wildcard: true,
            }
        })
        .collect()
}

fn is_allow_listed(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    FRAMEWORK_ALLOW_LIST
        .iter()
        .any(|allowed| lower.starts_with(allowed))
}

/// Identifier-like usages outside the import statements themselves.
fn collect_usages(content: &str, import_lines: &HashSet<usize>) -> HashSet<String> {
    let mut usages = HashSet::new();
    for (idx, line) in content.lines().enumerate() {
        if import_lines.contains(&(idx + 1)) {
            continue;
        }
        for m in regex_identifier().find_iter(line) {
            usages.insert(m.as_str().to_string());
        }
    }
    usages
}

/// Dotted usages like `ns.member`, for the wildcard/namespace heuristic.
fn has_dotted_usage(content: &str, namespace: &str, import_lines: &HashSet<usize>) -> bool {
    let needle = format!("{namespace}.");
    content
        .lines()
        .enumerate()
        .filter(|(idx, _)| !import_lines.contains(&(idx + 1)))
        .any(|(_, line)| line.contains(&needle))
}

/// Find imports whose bindings never appear in the file.
pub fn find_unused_imports(content: &str, lang: &str) -> Vec<UnusedImport> {
    let imports = parse_imports(content, lang);
    if imports.is_empty() {
        return Vec::new();
    }
    let import_lines: HashSet<usize> = imports.iter().map(|i| i.line).collect();
    let usages = collect_usages(content, &import_lines);

    let mut unused = Vec::new();
    for import in &imports {
        if is_allow_listed(&import.source) {
            continue;
        }

        if let Some(ns) = &import.namespace {
            if !usages.contains(ns) && !has_dotted_usage(content, ns, &import_lines) {
                unused.push(UnusedImport {
                    source: import.source.clone(),
                    symbols: vec![ns.clone()],
                    line: import.line,
                });
            }
            continue;
        }

        if import.wildcard {
            // wildcard with no namespace: used if any dotted usage exists
            let any_dotted = content
                .lines()
                .enumerate()
                .filter(|(idx, _)| !import_lines.contains(&(idx + 1)))
                .any(|(_, line)| regex_identifier().find_iter(line).count() > 0 && line.contains('.'));
            if !any_dotted {
                unused.push(UnusedImport {
                    source: import.source.clone(),
                    symbols: Vec::new(),
                    line: import.line,
                });
            }
            continue;
        }

        let mut dead_symbols: Vec<String> = import
            .symbols
            .iter()
            .filter(|s| !usages.contains(*s))
            .cloned()
            .collect();
        if let Some(default) = &import.default {
            if !usages.contains(default) {
                dead_symbols.push(default.clone());
            }
        }

        let binds_anything =
            !import.symbols.is_empty() || import.default.is_some();
        let total_bound = import.symbols.len() + usize::from(import.default.is_some());
        if binds_anything && dead_symbols.len() == total_bound {
            unused.push(UnusedImport {
                source: import.source.clone(),
                symbols: dead_symbols,
                line: import.line,
            });
        }
    }
    unused
}
