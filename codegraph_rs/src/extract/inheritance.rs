//! EXTENDS / IMPLEMENTS edges from parser-recorded inheritance facts.

use crate::mapper::map_block_type;
use crate::types::{CodeBlock, NodeKind, RelKind, RelMetadata, Relationship};

use super::block_node_id;

/// Strip generic parameters and qualifiers: `a.b.Base<T>` → `Base`.
pub fn normalize_type_name(raw: &str) -> String {
    let without_generics = match raw.find('<') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let tail = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);
    let tail = tail.rsplit('.').next().unwrap_or(tail);
    tail.trim().to_string()
}

/// EXTENDS edges for a class-like block.
pub fn extends_relationships(
    block: &CodeBlock,
    from_id: &str,
    batch: &[CodeBlock],
) -> Vec<Relationship> {
    let Some(meta) = &block.symbol_metadata else {
        return Vec::new();
    };
    if map_block_type(block.block_type.as_deref()) != NodeKind::Class {
        return Vec::new();
    }
    let Some(raw_parent) = meta.extends.as_deref() else {
        return Vec::new();
    };

    let parent = normalize_type_name(raw_parent);
    let Some(parent_block) = find_class_block(&parent, batch) else {
        return Vec::new();
    };

    vec![
        Relationship::new(from_id, block_node_id(parent_block), RelKind::Extends).with_metadata(
            RelMetadata::Extends {
                parent_class: parent,
                is_abstract: meta.is_abstract,
            },
        ),
    ]
}

/// IMPLEMENTS edges for each listed interface that resolves in the batch.
pub fn implements_relationships(
    block: &CodeBlock,
    from_id: &str,
    batch: &[CodeBlock],
) -> Vec<Relationship> {
    let Some(meta) = &block.symbol_metadata else {
        return Vec::new();
    };
    if map_block_type(block.block_type.as_deref()) != NodeKind::Class {
        return Vec::new();
    }

    meta.implements
        .iter()
        .filter_map(|raw| {
            let name = normalize_type_name(raw);
            find_interface_block(&name, batch).map(|target| {
                Relationship::new(from_id, block_node_id(target), RelKind::Implements)
                    .with_metadata(RelMetadata::Implements { interface: name })
            })
        })
        .collect()
}

fn find_class_block<'a>(name: &str, batch: &'a [CodeBlock]) -> Option<&'a CodeBlock> {
    batch.iter().find(|b| {
        b.identifier.as_deref() == Some(name)
            && map_block_type(b.block_type.as_deref()) == NodeKind::Class
    })
}

fn find_interface_block<'a>(name: &str, batch: &'a [CodeBlock]) -> Option<&'a CodeBlock> {
    batch.iter().find(|b| {
        b.identifier.as_deref() == Some(name)
            && map_block_type(b.block_type.as_deref()) == NodeKind::Interface
    })
}
