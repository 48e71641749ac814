//! HAS_TYPE / ACCEPTS_TYPE / RETURNS_TYPE edges from LSP payloads.
//!
//! Type strings are decomposed to base identifiers (unions, intersections,
//! arrays, one level of generics) and matched against class/interface-like
//! blocks in the batch. Primitives never produce edges.

use crate::mapper::map_block_type;
use crate::types::{CodeBlock, NodeKind, RelKind, RelMetadata, Relationship};

use super::block_node_id;

const PRIMITIVES: &[&str] = &[
    "string",
    "number",
    "boolean",
    "void",
    "any",
    "unknown",
    "never",
    "null",
    "undefined",
];

/// Decompose a type string into base identifiers.
///
/// `Promise<User | null> & Serializable` → `["Promise", "User", "Serializable"]`
pub fn parse_base_type_names(type_string: &str) -> Vec<String> {
    let mut out = Vec::new();
    collect_base_names(type_string, &mut out, 0);
    out
}

fn collect_base_names(type_string: &str, out: &mut Vec<String>, depth: usize) {
    // One level of generics is peeled per recursion step; a small cap keeps
    // adversarial strings from recursing forever.
    if depth > 8 {
        return;
    }
    for part in split_top_level(type_string, &['|', '&']) {
        let mut base = part.trim();
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
        }
        if base.is_empty() {
            continue;
        }
        if let Some(open) = base.find('<') {
            let head = base[..open].trim();
            push_name(head, out);
            if let Some(close) = base.rfind('>') {
                let inner = &base[open + 1..close];
                for argument in split_top_level(inner, &[',']) {
                    collect_base_names(argument, out, depth + 1);
                }
            }
        } else {
            push_name(base, out);
        }
    }
}

fn push_name(raw: &str, out: &mut Vec<String>) {
    let name = raw.trim().trim_end_matches('?');
    if name.is_empty() {
        return;
    }
    if PRIMITIVES.contains(&name.to_ascii_lowercase().as_str()) {
        return;
    }
    if !name.chars().next().map(|c| c.is_alphabetic() || c == '_').unwrap_or(false) {
        return;
    }
    if !out.iter().any(|existing| existing == name) {
        out.push(name.to_string());
    }
}

/// Split on separators that sit outside any `<...>` nesting.
fn split_top_level<'a>(input: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut nesting = 0usize;
    let mut start = 0usize;
    for (idx, ch) in input.char_indices() {
        match ch {
            '<' | '(' | '[' => nesting += 1,
            '>' | ')' | ']' => nesting = nesting.saturating_sub(1),
            c if nesting == 0 && separators.contains(&c) => {
                parts.push(&input[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// All type edges for one block, when the language server answered.
pub fn type_relationships(
    block: &CodeBlock,
    from_id: &str,
    batch: &[CodeBlock],
) -> Vec<Relationship> {
    let Some(lsp) = &block.lsp_type_info else {
        return Vec::new();
    };
    if !lsp.lsp_available {
        return Vec::new();
    }

    let mut rels = Vec::new();

    if let Some(type_string) = &lsp.type_info {
        emit_edges(
            from_id,
            type_string,
            RelKind::HasType,
            None,
            None,
            batch,
            &mut rels,
        );
    }

    if let Some(signature) = &lsp.signature_info {
        for parameter in &signature.parameters {
            emit_edges(
                from_id,
                &parameter.type_string,
                RelKind::AcceptsType,
                Some(parameter.name.clone()),
                Some(parameter.is_optional),
                batch,
                &mut rels,
            );
        }
        if let Some(return_type) = &signature.return_type {
            emit_edges(
                from_id,
                return_type,
                RelKind::ReturnsType,
                None,
                None,
                batch,
                &mut rels,
            );
        }
    }

    rels
}

fn emit_edges(
    from_id: &str,
    type_string: &str,
    kind: RelKind,
    parameter_name: Option<String>,
    is_optional: Option<bool>,
    batch: &[CodeBlock],
    rels: &mut Vec<Relationship>,
) {
    for base in parse_base_type_names(type_string) {
        let Some(target) = find_type_block(&base, batch) else {
            continue;
        };
        rels.push(
            Relationship::new(from_id, block_node_id(target), kind).with_metadata(
                RelMetadata::TypeRef {
                    type_string: type_string.to_string(),
                    source: "lsp".to_string(),
                    is_optional,
                    parameter_name: parameter_name.clone(),
                },
            ),
        );
    }
}

/// Class/interface-like blocks cover classes, interfaces, type aliases, enums.
fn find_type_block<'a>(name: &str, batch: &'a [CodeBlock]) -> Option<&'a CodeBlock> {
    batch.iter().find(|b| {
        b.identifier.as_deref() == Some(name)
            && matches!(
                map_block_type(b.block_type.as_deref()),
                NodeKind::Class | NodeKind::Interface
            )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LspTypeInfo, ParameterInfo, SignatureInfo};

    #[test]
    fn plain_identifier() {
        assert_eq!(parse_base_type_names("User"), vec!["User"]);
    }

    #[test]
    fn primitives_are_dropped() {
        assert!(parse_base_type_names("string").is_empty());
        assert!(parse_base_type_names("number | boolean | void").is_empty());
        assert_eq!(parse_base_type_names("string | User"), vec!["User"]);
    }

    #[test]
    fn unions_and_intersections_split() {
        assert_eq!(
            parse_base_type_names("User | Admin & Auditable"),
            vec!["User", "Admin", "Auditable"]
        );
    }

    #[test]
    fn array_suffix_is_stripped() {
        assert_eq!(parse_base_type_names("User[]"), vec!["User"]);
        assert_eq!(parse_base_type_names("User[][]"), vec!["User"]);
    }

    #[test]
    fn generics_peel_one_level_and_recurse() {
        assert_eq!(
            parse_base_type_names("Promise<User | null>"),
            vec!["Promise", "User"]
        );
        assert_eq!(
            parse_base_type_names("Map<UserId, List<Order>>"),
            vec!["Map", "UserId", "List", "Order"]
        );
    }

    #[test]
    fn union_inside_generic_does_not_split_outer() {
        assert_eq!(
            parse_base_type_names("Result<Ok | Err>"),
            vec!["Result", "Ok", "Err"]
        );
    }

    #[test]
    fn duplicates_collapse() {
        assert_eq!(
            parse_base_type_names("User | User[]"),
            vec!["User"]
        );
    }

    fn type_block(path: &str, ident: &str, btype: &str, start: usize) -> CodeBlock {
        CodeBlock {
            file_path: path.to_string(),
            identifier: Some(ident.to_string()),
            block_type: Some(btype.to_string()),
            start_line: start,
            end_line: start + 10,
            ..Default::default()
        }
    }

    #[test]
    fn has_type_edge_for_variable() {
        let mut var = type_block("/src/a.ts", "current", "lexical_declaration", 4);
        var.lsp_type_info = Some(LspTypeInfo {
            lsp_available: true,
            type_info: Some("User | null".into()),
            signature_info: None,
        });
        let user = type_block("/src/models.ts", "User", "interface_declaration", 1);
        let batch = vec![var.clone(), user];

        let rels = type_relationships(&batch[0], "variable:/src/a.ts:4", &batch);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].kind, RelKind::HasType);
        assert_eq!(rels[0].to_id, "interface:/src/models.ts:1");
        let meta = rels[0].metadata.as_ref().unwrap().to_value();
        assert_eq!(meta["typeString"], "User | null");
        assert_eq!(meta["source"], "lsp");
    }

    #[test]
    fn signature_produces_accepts_and_returns() {
        let mut func = type_block("/src/a.ts", "load", "function_declaration", 1);
        func.lsp_type_info = Some(LspTypeInfo {
            lsp_available: true,
            type_info: None,
            signature_info: Some(SignatureInfo {
                parameters: vec![ParameterInfo {
                    name: "query".into(),
                    type_string: "Query".into(),
                    is_optional: true,
                }],
                return_type: Some("Promise<User>".into()),
            }),
        });
        let query = type_block("/src/q.ts", "Query", "class_declaration", 1);
        let user = type_block("/src/models.ts", "User", "interface_declaration", 1);
        let batch = vec![func.clone(), query, user];

        let rels = type_relationships(&batch[0], "function:/src/a.ts:1", &batch);
        assert_eq!(rels.len(), 2);

        let accepts = rels.iter().find(|r| r.kind == RelKind::AcceptsType).unwrap();
        assert_eq!(accepts.to_id, "class:/src/q.ts:1");
        let meta = accepts.metadata.as_ref().unwrap().to_value();
        assert_eq!(meta["parameterName"], "query");
        assert_eq!(meta["isOptional"], true);

        let returns = rels.iter().find(|r| r.kind == RelKind::ReturnsType).unwrap();
        assert_eq!(returns.to_id, "interface:/src/models.ts:1");
    }

    #[test]
    fn lsp_unavailable_emits_nothing() {
        let mut var = type_block("/src/a.ts", "x", "lexical_declaration", 4);
        var.lsp_type_info = Some(LspTypeInfo {
            lsp_available: false,
            type_info: Some("User".into()),
            signature_info: None,
        });
        let user = type_block("/src/models.ts", "User", "interface_declaration", 1);
        let batch = vec![var.clone(), user];
        assert!(type_relationships(&batch[0], "x", &batch).is_empty());
    }

    #[test]
    fn enums_and_aliases_are_valid_targets() {
        let mut var = type_block("/src/a.ts", "state", "lexical_declaration", 4);
        var.lsp_type_info = Some(LspTypeInfo {
            lsp_available: true,
            type_info: Some("Status | Alias".into()),
            signature_info: None,
        });
        let status = type_block("/src/s.ts", "Status", "enum_declaration", 1);
        let alias = type_block("/src/t.ts", "Alias", "type_alias_declaration", 2);
        let batch = vec![var.clone(), status, alias];

        let rels = type_relationships(&batch[0], "variable:/src/a.ts:4", &batch);
        assert_eq!(rels.len(), 2);
    }
}
