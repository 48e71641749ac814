//! Complexity metrics over syntax trees: cyclomatic, cognitive, nesting,
//! parameter count, and comment-aware function length.

use crate::types::SyntaxNode;

/// Decision points for cyclomatic complexity.
fn is_decision_point(kind: &str) -> bool {
    kind.contains("if_statement")
        || kind.contains("if_expression")
        || kind.contains("elif")
        || kind.contains("else_if")
        || kind.contains("else_clause")
        || kind.contains("for_statement")
        || kind.contains("for_in")
        || kind.contains("foreach")
        || kind.contains("while")
        || kind.contains("do_statement")
        || kind.contains("loop_expression")
        || kind.contains("repeat_statement")
        || kind.contains("switch")
        || kind.contains("case")
        || kind.contains("when_entry")
        || kind.contains("catch")
        || kind.contains("except")
        || kind.contains("finally")
        || kind.contains("ternary")
        || kind.contains("conditional_expression")
        || kind.contains("guard")
        || kind.contains("match_arm")
        || kind.contains("match_expression")
        || kind.contains("break_statement")
        || kind.contains("continue_statement")
        || is_logical_operator(kind)
}

fn is_logical_operator(kind: &str) -> bool {
    kind == "&&"
        || kind == "||"
        || kind == "and"
        || kind == "or"
        || kind.contains("boolean_operator")
        || kind.contains("logical_expression")
}

/// Structural nodes that add cognitive nesting.
fn is_structural(kind: &str) -> bool {
    (kind.contains("if_statement") || kind.contains("if_expression"))
        || kind.contains("for_statement")
        || kind.contains("for_in")
        || kind.contains("foreach")
        || kind.contains("while")
        || kind.contains("do_statement")
        || kind.contains("switch")
        || kind.contains("match_expression")
        || kind.contains("catch")
        || kind.contains("except")
        || kind.contains("loop_expression")
}

/// Cyclomatic complexity: `1 + decision points` over the subtree.
pub fn cyclomatic_complexity(node: &SyntaxNode) -> usize {
    1 + count_decision_points(node)
}

fn count_decision_points(node: &SyntaxNode) -> usize {
    let own = usize::from(is_decision_point(&node.kind));
    own + node
        .children
        .iter()
        .map(count_decision_points)
        .sum::<usize>()
}

/// Sonar-style cognitive complexity: each structural node costs
/// `1 + nesting`, logical operators cost 1, nesting only increments for
/// structural nodes.
pub fn cognitive_complexity(node: &SyntaxNode) -> usize {
    fn walk(node: &SyntaxNode, nesting: usize) -> usize {
        let mut total = 0;
        for child in &node.children {
            if is_structural(&child.kind) {
                total += 1 + nesting;
                total += walk(child, nesting + 1);
            } else if is_logical_operator(&child.kind) {
                total += 1;
                total += walk(child, nesting);
            } else {
                total += walk(child, nesting);
            }
        }
        total
    }
    walk(node, 0)
}

/// Maximum structural nesting depth in the subtree.
pub fn nesting_depth(node: &SyntaxNode) -> usize {
    fn walk(node: &SyntaxNode, current: usize) -> usize {
        let mut max = current;
        for child in &node.children {
            let next = if is_structural(&child.kind) {
                current + 1
            } else {
                current
            };
            max = max.max(walk(child, next));
        }
        max
    }
    walk(node, 0)
}

/// Count parameter children in the parameters/arguments field.
pub fn parameter_count(node: &SyntaxNode) -> usize {
    let Some(params) = node.children.iter().find(|c| {
        c.kind.contains("parameters")
            || c.kind.contains("parameter_list")
            || c.kind.contains("argument_list")
    }) else {
        return 0;
    };
    params
        .children
        .iter()
        .filter(|c| c.named && c.kind.chars().any(|ch| ch.is_ascii_alphanumeric()))
        .count()
}

/// Non-blank, non-comment line count.
///
/// Comment detection handles `//`, `#`, `--`, leading `*` continuation lines,
/// and `/* ... */` both inline and spanning lines.
pub fn function_length(content: &str) -> usize {
    let mut count = 0;
    let mut in_block_comment = false;

    for raw_line in content.lines() {
        let mut line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if in_block_comment {
            match line.find("*/") {
                Some(end) => {
                    in_block_comment = false;
                    line = line[end + 2..].trim();
                    if line.is_empty() {
                        continue;
                    }
                }
                None => continue,
            }
        }

        if line.starts_with("//") || line.starts_with('#') || line.starts_with("--") {
            continue;
        }
        if line.starts_with('*') {
            continue;
        }
        if let Some(start) = line.find("/*") {
            let before = line[..start].trim();
            match line[start..].find("*/") {
                Some(end) => {
                    let after = line[start + end + 2..].trim();
                    if before.is_empty() && after.is_empty() {
                        continue;
                    }
                }
                None => {
                    in_block_comment = true;
                    if before.is_empty() {
                        continue;
                    }
                }
            }
        }

        count += 1;
    }
    count
}
