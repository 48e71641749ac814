//! Call-target resolution.
//!
//! Four strategies, tried in order, first hit wins:
//! 1. same-file function/method by identifier
//! 2. imported function through a resolved import path
//! 3. method call with a receiver, same file
//! 4. static call with a qualifier, method nested in the named class
//!
//! Unresolved calls are dropped without error; external-library calls are
//! expected to miss.

use std::collections::HashSet;

use crate::mapper::map_block_type;
use crate::types::{CallInfo, CodeBlock, NodeKind};

use super::imports::resolve_import_path;

/// Resolve one call site against the batch. Returns the target block.
pub fn resolve_call_target<'a>(
    call: &CallInfo,
    caller: &CodeBlock,
    batch: &'a [CodeBlock],
    workspace_root: &str,
) -> Option<&'a CodeBlock> {
    same_file_callable(call, caller, batch)
        .or_else(|| imported_function(call, caller, batch, workspace_root))
        .or_else(|| receiver_method(call, caller, batch))
        .or_else(|| qualified_static_method(call, batch))
}

/// Strategy 1: a function or method in the caller's file with the callee name.
fn same_file_callable<'a>(
    call: &CallInfo,
    caller: &CodeBlock,
    batch: &'a [CodeBlock],
) -> Option<&'a CodeBlock> {
    batch.iter().find(|b| {
        b.file_path == caller.file_path
            && !std::ptr::eq(*b, caller)
            && b.identifier.as_deref() == Some(call.callee_name.as_str())
            && map_block_type(b.block_type.as_deref()).is_callable()
    })
}

/// Strategy 2: the callee is named in an import whose source resolves to a
/// file in the batch.
fn imported_function<'a>(
    call: &CallInfo,
    caller: &CodeBlock,
    batch: &'a [CodeBlock],
    workspace_root: &str,
) -> Option<&'a CodeBlock> {
    let import = caller
        .imports
        .iter()
        .find(|i| i.symbols.iter().any(|s| s == &call.callee_name))?;

    let known_files: HashSet<&str> = batch.iter().map(|b| b.file_path.as_str()).collect();
    let resolved = resolve_import_path(
        &caller.file_path,
        &import.source,
        workspace_root,
        &known_files,
    )?;

    batch.iter().find(|b| {
        b.file_path == resolved && b.identifier.as_deref() == Some(call.callee_name.as_str())
    })
}

/// Strategy 3: `receiver.method()` against a same-file method block.
fn receiver_method<'a>(
    call: &CallInfo,
    caller: &CodeBlock,
    batch: &'a [CodeBlock],
) -> Option<&'a CodeBlock> {
    call.receiver.as_ref()?;
    batch.iter().find(|b| {
        b.file_path == caller.file_path
            && b.identifier.as_deref() == Some(call.callee_name.as_str())
            && map_block_type(b.block_type.as_deref()) == NodeKind::Method
    })
}

/// Strategy 4: `Qualifier.method()` against a method nested inside a class
/// block named like the qualifier.
fn qualified_static_method<'a>(call: &CallInfo, batch: &'a [CodeBlock]) -> Option<&'a CodeBlock> {
    let qualifier = call.qualifier.as_deref()?;
    batch.iter().find(|b| {
        b.identifier.as_deref() == Some(call.callee_name.as_str())
            && map_block_type(b.block_type.as_deref()) == NodeKind::Method
            && is_method_in_class(b, qualifier, batch)
    })
}

/// True when some class block named `class_name` encloses the method's lines.
fn is_method_in_class(method: &CodeBlock, class_name: &str, batch: &[CodeBlock]) -> bool {
    batch.iter().any(|c| {
        c.identifier.as_deref() == Some(class_name)
            && map_block_type(c.block_type.as_deref()) == NodeKind::Class
            && c.file_path == method.file_path
            && c.start_line <= method.start_line
            && c.end_line >= method.end_line
    })
}
