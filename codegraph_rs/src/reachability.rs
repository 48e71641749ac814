//! Unreachable-code detection via a scope-stack syntax walk.
//!
//! A fresh [`ReachabilityContext`] is built per file analysis. The context
//! owns the scope stack, the branch list, and the unreachable-node
//! accumulator, and is discarded when the walk completes; an
//! [`AnalysisStats`] snapshot is retained for one read-back.
//!
//! The walk is bounded by both recursion depth and wall-clock time so a
//! pathological tree can never stall the dispatch loop.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::types::SyntaxNode;

/// Longest snippet recorded per unreachable node.
const MAX_SNIPPET_LEN: usize = 100;

pub const DEFAULT_MAX_ANALYSIS_DEPTH: usize = 100;
pub const DEFAULT_MAX_ANALYSIS_TIME_MS: u64 = 10_000;

/// Kind of scope a stack frame represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    Function,
    Loop,
    Conditional,
    TryCatch,
    Switch,
    Block,
}

/// Why a region became unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableReason {
    AfterReturn,
    AfterThrow,
    AfterBreak,
    AfterContinue,
    ConditionalFalse,
    DeadCode,
}

impl UnreachableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnreachableReason::AfterReturn => "after_return",
            UnreachableReason::AfterThrow => "after_throw",
            UnreachableReason::AfterBreak => "after_break",
            UnreachableReason::AfterContinue => "after_continue",
            UnreachableReason::ConditionalFalse => "conditional_false",
            UnreachableReason::DeadCode => "dead_code",
        }
    }
}

/// One frame of the scope stack.
#[derive(Debug, Clone)]
struct ReachabilityState {
    is_reachable: bool,
    unreachable_reason: Option<UnreachableReason>,
    #[allow(dead_code)]
    unreachable_at: Option<usize>,
    /// Scope type of the frame where the unreachable state originated.
    origin_scope: Option<ScopeType>,
    scope_type: ScopeType,
}

impl ReachabilityState {
    fn new(scope_type: ScopeType, reachable: bool) -> Self {
        Self {
            is_reachable: reachable,
            unreachable_reason: None,
            unreachable_at: None,
            origin_scope: None,
            scope_type,
        }
    }
}

/// Branch bookkeeping for conditionals and switch sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchContext {
    pub id: usize,
    pub is_reachable: bool,
    pub condition: Option<String>,
    pub parent_kind: String,
}

/// A statement the walk proved unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreachableNode {
    pub kind: String,
    pub reason: UnreachableReason,
    pub scope_type: ScopeType,
    pub line: usize,
    pub snippet: String,
}

/// Walk statistics, retained for one read-back after analysis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub nodes_visited: usize,
    pub max_depth: usize,
    pub elapsed_ms: u64,
    pub aborted: bool,
}

/// Walk bounds.
#[derive(Debug, Clone)]
pub struct ReachabilityConfig {
    pub max_analysis_depth: usize,
    pub max_analysis_time: Duration,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            max_analysis_depth: DEFAULT_MAX_ANALYSIS_DEPTH,
            max_analysis_time: Duration::from_millis(DEFAULT_MAX_ANALYSIS_TIME_MS),
        }
    }
}

/// Per-file walk state. Build, run [`ReachabilityContext::analyze`], drop.
pub struct ReachabilityContext {
    config: ReachabilityConfig,
    scopes: Vec<ReachabilityState>,
    branches: Vec<BranchContext>,
    unreachable: Vec<UnreachableNode>,
    started: Instant,
    nodes_visited: usize,
    max_depth: usize,
    aborted: bool,
    next_branch_id: usize,
}

impl ReachabilityContext {
    pub fn new(config: ReachabilityConfig) -> Self {
        Self {
            config,
            scopes: vec![ReachabilityState::new(ScopeType::Block, true)],
            branches: Vec::new(),
            unreachable: Vec::new(),
            started: Instant::now(),
            nodes_visited: 0,
            max_depth: 0,
            aborted: false,
            next_branch_id: 0,
        }
    }

    /// Run the walk and consume the context.
    pub fn analyze(mut self, root: &SyntaxNode) -> (Vec<UnreachableNode>, AnalysisStats) {
        self.started = Instant::now();
        self.walk(root, 0);
        let stats = AnalysisStats {
            nodes_visited: self.nodes_visited,
            max_depth: self.max_depth,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            aborted: self.aborted,
        };
        (self.unreachable, stats)
    }

    fn walk(&mut self, node: &SyntaxNode, depth: usize) {
        if self.aborted {
            return;
        }
        if depth > self.config.max_analysis_depth
            || self.started.elapsed() > self.config.max_analysis_time
        {
            self.aborted = true;
            return;
        }
        self.nodes_visited += 1;
        self.max_depth = self.max_depth.max(depth);

        if !self.current_reachable() {
            if is_significant(node) {
                self.record(node);
            }
            // The recorded statement subsumes its subtree.
            return;
        }

        let kind = node.kind.as_str();
        if is_return(kind) {
            self.handle_return(node);
            return;
        }
        if is_throw(kind) {
            self.handle_throw(node);
            return;
        }
        if is_break(kind) {
            self.handle_break(node);
            return;
        }
        if is_continue(kind) {
            self.handle_continue(node);
            return;
        }
        if is_conditional(kind) {
            self.handle_conditional(node, depth);
            return;
        }
        if is_switch(kind) {
            self.handle_switch(node, depth);
            return;
        }

        let scope = scope_type_for(kind);
        if let Some(scope_type) = scope {
            let reachable = self.current_reachable();
            self.scopes.push(ReachabilityState::new(scope_type, reachable));
        }
        for child in &node.children {
            self.walk(child, depth + 1);
        }
        if scope.is_some() {
            self.scopes.pop();
        }
    }

    fn current_reachable(&self) -> bool {
        self.scopes.last().map(|s| s.is_reachable).unwrap_or(true)
    }

    fn record(&mut self, node: &SyntaxNode) {
        let top = self.scopes.last().expect("scope stack never empty");
        let mut snippet = node.text.trim().to_string();
        if snippet.len() > MAX_SNIPPET_LEN {
            snippet.truncate(MAX_SNIPPET_LEN);
        }
        self.unreachable.push(UnreachableNode {
            kind: node.kind.clone(),
            reason: top.unreachable_reason.unwrap_or(UnreachableReason::DeadCode),
            scope_type: top.origin_scope.unwrap_or(top.scope_type),
            line: node.start_line,
            snippet,
        });
    }

    /// Mark every frame from the top down to `until` (inclusive) unreachable.
    fn mark_down_to(
        &mut self,
        until: usize,
        reason: UnreachableReason,
        at: usize,
        origin: ScopeType,
    ) {
        for frame in self.scopes[until..].iter_mut() {
            frame.is_reachable = false;
            frame.unreachable_reason = Some(reason);
            frame.unreachable_at = Some(at);
            frame.origin_scope = Some(origin);
        }
    }

    fn mark_current(&mut self, reason: UnreachableReason, at: usize) {
        let idx = self.scopes.len() - 1;
        let origin = self.scopes[idx].scope_type;
        self.mark_down_to(idx, reason, at, origin);
    }

    /// Topmost frame index matching a scope type, scanning inner to outer.
    fn find_scope(&self, scope_type: ScopeType) -> Option<usize> {
        self.scopes
            .iter()
            .rposition(|s| s.scope_type == scope_type)
    }

    fn handle_return(&mut self, node: &SyntaxNode) {
        match self.find_scope(ScopeType::Function) {
            Some(idx) => self.mark_down_to(
                idx,
                UnreachableReason::AfterReturn,
                node.end_line,
                ScopeType::Function,
            ),
            None => self.mark_current(UnreachableReason::AfterReturn, node.end_line),
        }
    }

    fn handle_throw(&mut self, node: &SyntaxNode) {
        // Inside try/catch the throw may be handled; reachability continues.
        let function = self.find_scope(ScopeType::Function);
        let try_catch = self.find_scope(ScopeType::TryCatch);
        if let Some(t) = try_catch {
            if function.map(|f| t > f).unwrap_or(true) {
                return;
            }
        }
        match function {
            Some(idx) => self.mark_down_to(
                idx,
                UnreachableReason::AfterThrow,
                node.end_line,
                ScopeType::Function,
            ),
            None => self.mark_current(UnreachableReason::AfterThrow, node.end_line),
        }
    }

    fn handle_break(&mut self, node: &SyntaxNode) {
        let loop_idx = self.find_scope(ScopeType::Loop);
        let switch_idx = self.find_scope(ScopeType::Switch);
        // break inside a switch is the normal section exit
        if let Some(s) = switch_idx {
            if loop_idx.map(|l| s > l).unwrap_or(true) {
                return;
            }
        }
        match loop_idx {
            Some(idx) => self.mark_down_to(
                idx,
                UnreachableReason::AfterBreak,
                node.end_line,
                ScopeType::Loop,
            ),
            None => self.mark_current(UnreachableReason::AfterBreak, node.end_line),
        }
    }

    fn handle_continue(&mut self, node: &SyntaxNode) {
        match self.find_scope(ScopeType::Loop) {
            Some(idx) => self.mark_down_to(
                idx,
                UnreachableReason::AfterContinue,
                node.end_line,
                ScopeType::Loop,
            ),
            None => self.mark_current(UnreachableReason::AfterContinue, node.end_line),
        }
    }

    fn handle_conditional(&mut self, node: &SyntaxNode, depth: usize) {
        let entry_reachable = self.current_reachable();
        let condition = condition_text(node);

        let mut branch_nodes: Vec<&SyntaxNode> = Vec::new();
        let mut has_else = false;
        for child in &node.children {
            if is_condition_child(&child.kind) {
                continue;
            }
            if child.kind.contains("else") {
                has_else = true;
            }
            branch_nodes.push(child);
        }

        let mut any_branch_reachable = false;
        for branch in branch_nodes {
            let id = self.next_branch_id;
            self.next_branch_id += 1;

            // Save/restore: terminators inside one branch must not poison the
            // sibling branch or the enclosing scope before the merge.
            let saved = self.scopes.clone();
            self.scopes
                .push(ReachabilityState::new(ScopeType::Conditional, entry_reachable));
            self.walk(branch, depth + 1);
            let end_reachable = self.current_reachable();
            self.scopes = saved;

            any_branch_reachable |= end_reachable;
            self.branches.push(BranchContext {
                id,
                is_reachable: end_reachable,
                condition: condition.clone(),
                parent_kind: node.kind.clone(),
            });
        }

        // Without an else the fall-through path keeps the scope alive.
        if entry_reachable && has_else && !any_branch_reachable {
            self.mark_current(UnreachableReason::ConditionalFalse, node.end_line);
        }
    }

    fn handle_switch(&mut self, node: &SyntaxNode, depth: usize) {
        let entry_reachable = self.current_reachable();
        self.scopes
            .push(ReachabilityState::new(ScopeType::Switch, entry_reachable));

        let mut previous_had_break = false;
        let mut has_default = false;
        let mut any_branch_reachable = false;

        for child in &node.children {
            let kind = child.kind.as_str();
            if !is_switch_case(kind) {
                continue;
            }
            if kind.contains("default") {
                has_default = true;
            }

            let branch_reachable = entry_reachable && !previous_had_break;
            any_branch_reachable |= branch_reachable;

            let id = self.next_branch_id;
            self.next_branch_id += 1;
            self.branches.push(BranchContext {
                id,
                is_reachable: branch_reachable,
                condition: condition_text(child),
                parent_kind: node.kind.clone(),
            });

            let saved = self.scopes.clone();
            self.scopes
                .push(ReachabilityState::new(ScopeType::Block, branch_reachable));
            self.walk_children_only(child, depth + 1);
            self.scopes = saved;

            previous_had_break = child.contains_kind("break_statement");
        }

        self.scopes.pop();

        if entry_reachable && !has_default && !any_branch_reachable {
            self.mark_current(UnreachableReason::ConditionalFalse, node.end_line);
        }
    }

    fn walk_children_only(&mut self, node: &SyntaxNode, depth: usize) {
        for child in &node.children {
            self.walk(child, depth + 1);
        }
    }

    /// Branch bookkeeping accumulated during the walk, exposed for tests.
    pub fn branches(&self) -> &[BranchContext] {
        &self.branches
    }
}

/// Convenience wrapper holding a config and the last stats snapshot.
pub struct ReachabilityAnalyzer {
    config: ReachabilityConfig,
    last_stats: Option<AnalysisStats>,
}

impl ReachabilityAnalyzer {
    pub fn new(config: ReachabilityConfig) -> Self {
        Self {
            config,
            last_stats: None,
        }
    }

    /// Run a fresh context over one file's tree.
    pub fn analyze(&mut self, root: &SyntaxNode) -> Vec<UnreachableNode> {
        let context = ReachabilityContext::new(self.config.clone());
        let (unreachable, stats) = context.analyze(root);
        self.last_stats = Some(stats);
        unreachable
    }

    /// One-shot read-back of the last walk's statistics.
    pub fn take_last_stats(&mut self) -> Option<AnalysisStats> {
        self.last_stats.take()
    }
}

impl Default for ReachabilityAnalyzer {
    fn default() -> Self {
        Self::new(ReachabilityConfig::default())
    }
}

fn is_return(kind: &str) -> bool {
    kind == "return" || kind.contains("return_statement")
}

fn is_throw(kind: &str) -> bool {
    kind.contains("throw_statement") || kind.contains("raise_statement") || kind == "throw"
}

fn is_break(kind: &str) -> bool {
    kind == "break" || kind.contains("break_statement")
}

fn is_continue(kind: &str) -> bool {
    kind == "continue" || kind.contains("continue_statement")
}

fn is_conditional(kind: &str) -> bool {
    kind.contains("if_statement")
        || kind.contains("if_expression")
        || kind.contains("conditional_expression")
        || kind.contains("ternary")
}

fn is_switch(kind: &str) -> bool {
    kind.contains("switch_statement")
        || kind.contains("switch_expression")
        || kind.contains("when_expression")
}

fn is_switch_case(kind: &str) -> bool {
    kind.contains("case") || kind.contains("default") || kind.contains("switch_section")
}

fn is_condition_child(kind: &str) -> bool {
    kind.contains("condition") || kind.contains("parenthesized_expression")
}

fn condition_text(node: &SyntaxNode) -> Option<String> {
    node.children
        .iter()
        .find(|c| is_condition_child(&c.kind))
        .map(|c| c.text.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn scope_type_for(kind: &str) -> Option<ScopeType> {
    if kind.contains("function")
        || kind.contains("method")
        || kind.contains("arrow")
        || kind.contains("lambda")
        || kind.contains("closure")
        || kind.contains("constructor")
    {
        return Some(ScopeType::Function);
    }
    if kind.contains("for_statement")
        || kind.contains("for_in")
        || kind.contains("foreach")
        || kind.contains("while")
        || kind.contains("do_statement")
        || kind.contains("loop")
        || kind.contains("repeat")
    {
        return Some(ScopeType::Loop);
    }
    if kind.contains("try_statement") || kind == "try" {
        return Some(ScopeType::TryCatch);
    }
    if kind.contains("block") || kind.contains("compound_statement") {
        return Some(ScopeType::Block);
    }
    None
}

/// Container and trivia nodes never get recorded as unreachable findings.
fn is_significant(node: &SyntaxNode) -> bool {
    if !node.named {
        return false;
    }
    let kind = node.kind.as_str();
    if kind == "program" || kind == "source_file" || kind.contains("comment") {
        return false;
    }
    if !kind.chars().any(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    !node.text.trim().is_empty()
}
