//! File-level classification: language detection and test heuristics.

use std::path::Path;

/// Map a file path to a language label by extension.
///
/// Known extensions map to canonical names; anything else falls back to the
/// raw lowercased extension so downstream consumers still get a stable tag.
pub fn detect_language(file_path: &str) -> Option<String> {
    let ext = Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();

    let label = match ext.as_str() {
        "ts" | "tsx" => "TypeScript",
        "js" | "jsx" => "JavaScript",
        "py" => "Python",
        "rs" => "Rust",
        "go" => "Go",
        "java" => "Java",
        "cpp" | "hpp" => "C++",
        "c" | "h" => "C",
        "cs" => "C#",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "kt" => "Kotlin",
        "scala" => "Scala",
        "lua" => "Lua",
        "sol" => "Solidity",
        other => return Some(other.to_string()),
    };
    Some(label.to_string())
}

/// Short language key used by the unused-import rules ("ts", "py", "rs", ...).
pub fn language_key(file_path: &str) -> Option<&'static str> {
    let ext = Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    let key = match ext.as_str() {
        "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" => "ts",
        "py" => "py",
        "rs" => "rs",
        "go" => "go",
        "java" => "java",
        "c" | "h" | "cpp" | "hpp" | "cc" => "c",
        "cs" => "cs",
        _ => return None,
    };
    Some(key)
}

/// Function names that belong to test harnesses rather than production code.
pub fn is_test_function_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("test") || lower.starts_with("it") || lower.starts_with("describe")
}

/// Path-based test detection, used when block metadata carries no verdict.
pub fn is_test_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.contains("__tests__")
        || lower.contains(".test.")
        || lower.contains(".spec.")
        || lower.ends_with("_test.rs")
        || lower.ends_with("_tests.rs")
        || lower.ends_with("_test.go")
        || lower.ends_with("_test.py")
        || lower.contains("/tests/")
        || lower.starts_with("tests/")
        || lower.contains("/test_")
        || lower.starts_with("test_")
}
