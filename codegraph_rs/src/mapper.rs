//! Block-type mapper: tree-sitter node type → semantic node kind.
//!
//! The single source of truth for what counts as an indexable entity.
//! Matching is case-insensitive substring matching over an ordered pattern
//! table; first match wins. The table is organized in tiers (root containers,
//! class-like, interface-like, method-like, function-like, variable-like,
//! type annotations, imports, modules, control flow, literals/markup) and the
//! tier order is load-bearing: compounds that belong to a later tier but
//! contain an earlier tier's substring are pinned at the top of the table
//! (`constructor` would otherwise match `struct`).
//!
//! Unknown and null types always map to `function` so no block is dropped.

use crate::types::NodeKind;

use NodeKind::{Class, Function, Import, Interface, Method, Variable};

/// Root AST containers map to `class` (module-like container).
const ROOT_TYPES: &[&str] = &["source_file", "program"];

/// Ordered pattern table. Substring match, first hit wins.
const PATTERNS: &[(&str, NodeKind)] = &[
    // ------------------------------------------------------------------
    // Pinned compounds: explicitly enumerated in a later tier but colliding
    // with an earlier tier's substring. Order is the contract here.
    // ------------------------------------------------------------------
    ("constructor", Method),       // contains "struct"
    ("destructor", Method),        // contains "struct"
    ("class_variable", Variable),  // contains "class"
    ("instance_variable", Variable),
    // ------------------------------------------------------------------
    // Tier: class-like containers
    // ------------------------------------------------------------------
    ("class_declaration", Class),
    ("class_definition", Class),
    ("class_specifier", Class),
    ("class_body", Class),
    ("abstract_class_declaration", Class),
    ("abstract_class", Class),
    ("anonymous_class", Class),
    ("inner_class", Class),
    ("local_class", Class),
    ("annotation_type_declaration", Class),
    ("struct_item", Class),
    ("struct_specifier", Class),
    ("struct_declaration", Class),
    ("struct_definition", Class),
    ("struct_expression", Class),
    ("struct_type", Class),
    ("enum_item", Class),
    ("enum_declaration", Class),
    ("enum_specifier", Class),
    ("enum_class_specifier", Class),
    ("enum_entry", Class),
    ("enum_variant", Class),
    ("enum_constant", Class),
    ("union_item", Class),
    ("union_specifier", Class),
    ("union_declaration", Class),
    ("record_declaration", Class),
    ("record_definition", Class),
    ("object_declaration", Class),
    ("companion_object", Class),
    ("companion", Class),
    ("data_class", Class),
    ("sealed_class", Class),
    ("sealed", Class),
    ("protocol_declaration", Class),
    ("protocol_body", Class),
    ("protocol", Class),
    ("contract_declaration", Class),
    ("contract_body", Class),
    ("contract", Class),
    ("library_declaration", Class),
    ("library", Class),
    ("class", Class),
    ("struct", Class),
    ("enum", Class),
    ("union", Class),
    ("record", Class),
    // ------------------------------------------------------------------
    // Tier: interface-like
    // ------------------------------------------------------------------
    ("interface_declaration", Interface),
    ("interface_body", Interface),
    ("interface_type", Interface),
    ("interface", Interface),
    ("trait_item", Interface),
    ("trait_declaration", Interface),
    ("trait_definition", Interface),
    ("trait_bound", Interface),
    ("trait", Interface),
    ("type_alias_declaration", Interface),
    ("type_alias", Interface),
    ("type_item", Interface),
    ("type_definition", Interface),
    ("typedef", Interface),
    ("utility_type", Interface),
    // ------------------------------------------------------------------
    // Tier: method-like members
    // ------------------------------------------------------------------
    ("method_declaration", Method),
    ("method_definition", Method),
    ("method_signature", Method),
    ("method_spec", Method),
    ("method_elem", Method),
    ("abstract_method", Method),
    ("singleton_method", Method),
    ("class_method", Method),
    ("method", Method),
    ("constructor_declaration", Method),
    ("constructor_definition", Method),
    ("init_declaration", Method),
    ("init_declarator", Method),
    ("initializer_declaration", Method),
    ("deinit", Method),
    ("finalizer", Method),
    ("property_declaration", Method),
    ("property_definition", Method),
    ("property_signature", Method),
    ("property", Method),
    ("accessor_declaration", Method),
    ("accessor", Method),
    ("get_accessor", Method),
    ("set_accessor", Method),
    ("getter_declaration", Method),
    ("setter_declaration", Method),
    ("getter", Method),
    ("setter", Method),
    ("extension_function", Method),
    ("operator_overload", Method),
    ("operator_declaration", Method),
    ("conversion_operator", Method),
    ("indexer_declaration", Method),
    ("indexer", Method),
    ("subscript_declaration", Method),
    ("subscript", Method),
    // ------------------------------------------------------------------
    // Tier: function-like
    // ------------------------------------------------------------------
    ("function_declaration", Function),
    ("function_definition", Function),
    ("function_item", Function),
    ("function_signature", Function),
    ("function_expression", Function),
    ("function_literal", Function),
    ("function_type", Function),
    ("func_literal", Function),
    ("function", Function),
    ("func", Function),
    ("arrow_function", Function),
    ("arrow", Function),
    ("lambda_expression", Function),
    ("lambda_literal", Function),
    ("lambda", Function),
    ("generator_function_declaration", Function),
    ("generator_function", Function),
    ("generator", Function),
    ("async_function", Function),
    ("async", Function),
    ("coroutine", Function),
    ("closure_expression", Function),
    ("closure", Function),
    ("anonymous_function", Function),
    ("anonymous", Function),
    ("local_function", Function),
    ("nested_function", Function),
    ("defun", Function),
    ("defmacro", Function),
    ("defdelegate", Function),
    ("defguard", Function),
    ("defp", Function),
    // ------------------------------------------------------------------
    // Tier: variable-like
    // ------------------------------------------------------------------
    ("variable_declaration", Variable),
    ("variable_declarator", Variable),
    ("variable_definition", Variable),
    ("variable_assignment", Variable),
    ("variable", Variable),
    ("lexical_declaration", Variable),
    ("const_declaration", Variable),
    ("const_item", Variable),
    ("const_spec", Variable),
    ("const", Variable),
    ("let_declaration", Variable),
    ("let_spec", Variable),
    ("var_declaration", Variable),
    ("var_spec", Variable),
    ("short_var_declaration", Variable),
    ("field_declaration", Variable),
    ("field_definition", Variable),
    ("public_field_definition", Variable),
    ("field", Variable),
    ("static_item", Variable),
    ("static_declaration", Variable),
    ("assignment_expression", Variable),
    ("assignment_statement", Variable),
    ("augmented_assignment", Variable),
    ("assignment", Variable),
    ("destructuring_pattern", Variable),
    ("destructuring", Variable),
    ("object_pattern", Variable),
    ("array_pattern", Variable),
    ("tuple_pattern", Variable),
    ("list_pattern", Variable),
    ("pattern", Variable),
    ("formal_parameters", Variable),
    ("formal_parameter", Variable),
    ("default_parameter", Variable),
    ("optional_parameter", Variable),
    ("rest_parameter", Variable),
    ("spread_parameter", Variable),
    ("typed_parameter", Variable),
    ("typed_default_parameter", Variable),
    ("named_parameter", Variable),
    ("variadic_parameter", Variable),
    ("variadic", Variable),
    ("parameter", Variable),
    ("keyword_argument", Variable),
    ("named_argument", Variable),
    ("lateinit", Variable),
    ("lazy", Variable),
    ("event_declaration", Variable),
    ("event_field", Variable),
    ("event", Variable),
    ("immutable", Variable),
    ("binding", Variable),
    // ------------------------------------------------------------------
    // Tier: type annotations (usages, not declarations)
    // ------------------------------------------------------------------
    ("type_annotation", Interface),
    ("type_arguments", Interface),
    ("type_parameter", Interface),
    ("type_identifier", Interface),
    ("type_descriptor", Interface),
    ("type_spec", Interface),
    ("primitive_type", Interface),
    ("predefined_type", Interface),
    ("optional_type", Interface),
    ("nullable_type", Interface),
    ("generic_type", Interface),
    ("scoped_type", Interface),
    ("qualified_type", Interface),
    ("tuple_type", Interface),
    ("array_type", Interface),
    ("list_type", Interface),
    ("map_type", Interface),
    ("pointer_type", Interface),
    ("reference_type", Interface),
    ("slice_type", Interface),
    ("channel_type", Interface),
    ("_type", Interface),
    // ------------------------------------------------------------------
    // Tier: imports / exports / inclusion
    // ------------------------------------------------------------------
    ("import_statement", Import),
    ("import_declaration", Import),
    ("import_from_statement", Import),
    ("import_header", Import),
    ("import_spec", Import),
    ("import_directive", Import),
    ("import_clause", Import),
    ("import_alias", Import),
    ("import", Import),
    ("export_statement", Import),
    ("export_declaration", Import),
    ("export_clause", Import),
    ("export_specifier", Import),
    ("export", Import),
    ("use_declaration", Import),
    ("use_statement", Import),
    ("use_as_clause", Import),
    ("use_list", Import),
    ("use_wildcard", Import),
    ("extern_crate", Import),
    ("require_statement", Import),
    ("require_clause", Import),
    ("require", Import),
    ("include_statement", Import),
    ("include_directive", Import),
    ("preproc_include", Import),
    ("include", Import),
    ("package_declaration", Import),
    ("package_clause", Import),
    ("package_header", Import),
    ("namespace_use_declaration", Import),
    ("namespace_use", Import),
    ("using_directive", Import),
    ("using_declaration", Import),
    ("alias", Import),
    // ------------------------------------------------------------------
    // Tier: modules / namespaces / implementation blocks
    // ------------------------------------------------------------------
    ("module_declaration", Class),
    ("module_definition", Class),
    ("module", Class),
    ("namespace_declaration", Class),
    ("namespace_definition", Class),
    ("namespace", Class),
    ("impl_item", Class),
    ("impl_block", Class),
    ("impl_", Class),
    ("delegate_declaration", Class),
    ("delegate", Class),
    ("mixin_declaration", Class),
    ("mixin", Class),
    ("extension_declaration", Class),
    ("extension", Class),
    ("category_interface", Class),
    ("category_implementation", Class),
    ("category", Class),
    ("concept_definition", Class),
    ("concept", Class),
    // ------------------------------------------------------------------
    // Tier: control flow, error handling, async plumbing, expressions
    // ------------------------------------------------------------------
    ("if_statement", Function),
    ("if_expression", Function),
    ("else_clause", Function),
    ("else_if_clause", Function),
    ("elif_clause", Function),
    ("elseif_clause", Function),
    ("unless", Function),
    ("for_statement", Function),
    ("for_expression", Function),
    ("for_in_statement", Function),
    ("foreach_statement", Function),
    ("while_statement", Function),
    ("while_expression", Function),
    ("do_statement", Function),
    ("do_while_statement", Function),
    ("do_block", Function),
    ("loop_expression", Function),
    ("loop_statement", Function),
    ("loop", Function),
    ("repeat_statement", Function),
    ("switch_statement", Function),
    ("switch_expression", Function),
    ("switch_section", Function),
    ("switch", Function),
    ("case_clause", Function),
    ("case_statement", Function),
    ("case", Function),
    ("when_entry", Function),
    ("when_expression", Function),
    ("guard_statement", Function),
    ("guard", Function),
    ("match_expression", Function),
    ("match_arm", Function),
    ("match_statement", Function),
    ("match", Function),
    ("try_statement", Function),
    ("try_expression", Function),
    ("try", Function),
    ("catch_clause", Function),
    ("catch_block", Function),
    ("catch", Function),
    ("except_clause", Function),
    ("except", Function),
    ("finally_clause", Function),
    ("finally", Function),
    ("throw_statement", Function),
    ("throw_expression", Function),
    ("throw", Function),
    ("raise_statement", Function),
    ("raise", Function),
    ("rescue", Function),
    ("ensure", Function),
    ("panic", Function),
    ("return_statement", Function),
    ("return", Function),
    ("yield_expression", Function),
    ("yield", Function),
    ("await_expression", Function),
    ("await", Function),
    ("defer_statement", Function),
    ("defer", Function),
    ("go_statement", Function),
    ("spawn_expression", Function),
    ("break_statement", Function),
    ("break", Function),
    ("continue_statement", Function),
    ("continue", Function),
    ("goto_statement", Function),
    ("goto", Function),
    ("ternary_expression", Function),
    ("ternary", Function),
    ("conditional_expression", Function),
    ("conditional", Function),
    ("binary_expression", Function),
    ("unary_expression", Function),
    ("update_expression", Function),
    ("call_expression", Function),
    ("invocation_expression", Function),
    ("call", Function),
    ("pipe", Function),
    ("expression_statement", Function),
    ("parenthesized_expression", Function),
    ("expression", Function),
    ("statement_block", Function),
    ("compound_statement", Function),
    ("block", Function),
    // ------------------------------------------------------------------
    // Tier: literals, comments, markup, config formats
    // ------------------------------------------------------------------
    ("string_literal", Variable),
    ("template_string", Variable),
    ("template_literal", Variable),
    ("raw_string", Variable),
    ("interpolation", Variable),
    ("string", Variable),
    ("number", Variable),
    ("integer", Variable),
    ("float", Variable),
    ("decimal", Variable),
    ("boolean", Variable),
    ("true", Variable),
    ("false", Variable),
    ("null", Variable),
    ("nil", Variable),
    ("undefined", Variable),
    ("char_literal", Variable),
    ("character", Variable),
    ("regex", Variable),
    ("literal", Variable),
    ("comment", Function),
    ("jsx_self_closing_element", Function),
    ("jsx_element", Function),
    ("jsx_fragment", Function),
    ("jsx_expression", Function),
    ("jsx_attribute", Variable),
    ("jsx", Function),
    ("template_element", Function),
    ("template", Function),
    ("script_element", Function),
    ("style_element", Function),
    ("start_tag", Function),
    ("end_tag", Function),
    ("self_closing_tag", Function),
    ("tag", Function),
    ("element", Function),
    ("attribute_value", Variable),
    ("attribute", Variable),
    ("directive", Function),
    ("doctype", Function),
    ("fragment", Function),
    ("text", Variable),
    ("block_mapping_pair", Variable),
    ("flow_mapping", Variable),
    ("block_mapping", Variable),
    ("mapping", Variable),
    ("pair", Variable),
    ("key_value", Variable),
    ("flow_sequence", Variable),
    ("block_sequence", Variable),
    ("sequence", Variable),
    ("anchor", Variable),
    ("document", Class),
    ("stream", Class),
    ("table", Class),
    ("array", Variable),
    ("object", Variable),
    ("from_instruction", Function),
    ("run_instruction", Function),
    ("copy_instruction", Function),
    ("env_instruction", Variable),
    ("arg_instruction", Variable),
    ("workdir_instruction", Function),
    ("expose_instruction", Function),
    ("entrypoint_instruction", Function),
    ("cmd_instruction", Function),
    ("label_instruction", Variable),
    ("instruction", Function),
    ("heredoc", Variable),
    ("shebang", Function),
];

/// Classify a tree-sitter node type into the semantic taxonomy.
///
/// Never returns "drop": null, empty, and unknown types map to `function`.
pub fn map_block_type(node_type: Option<&str>) -> NodeKind {
    let raw = match node_type {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Function,
    };
    let lower = raw.to_ascii_lowercase();

    if ROOT_TYPES.contains(&lower.as_str()) {
        return Class;
    }

    if let Some(kind) = lookup(&lower) {
        return kind;
    }

    // Any "*definition" not matched above: infer from the prefix.
    if let Some(prefix) = lower.strip_suffix("_definition") {
        if let Some(kind) = lookup(prefix) {
            return kind;
        }
        return Function;
    }
    if lower.contains("definition") {
        return Function;
    }

    // Any remaining "*statement" is executable code.
    if lower.contains("statement") {
        return Function;
    }

    Function
}

fn lookup(lower: &str) -> Option<NodeKind> {
    PATTERNS
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, kind)| *kind)
}
