//! codegraph CLI: index a workspace, watch it, inspect quality.
//!
//! Runs fully offline against the in-memory stores; production deployments
//! wire real graph/vector stores through the library API.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;

use codegraph::config::CodegraphConfig;
use codegraph::orchestrator::{IndexOrchestrator, OrchestratorConfig};
use codegraph::progress::IndexProgress;
use codegraph::quality::report::{FileInput, QualityReport, analyze_workspace};
use codegraph::reachability::ReachabilityConfig;
use codegraph::scanner::{BlockParser, LineBlockParser, ScanConfig};
use codegraph::store::{HashEmbeddingProvider, MemoryGraphStore, MemoryVectorStore};
use codegraph::types::RelKind;
use codegraph::watcher::{WatchConfig, watch_and_reindex};

#[derive(Parser, Debug)]
#[command(name = "codegraph")]
#[command(about = "Code knowledge graph indexer - parse once, query every relationship")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a workspace and build the knowledge graph
    Index {
        /// Workspace root
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Emit a JSON summary instead of human output
        #[arg(long)]
        json: bool,
    },
    /// Index, then keep re-indexing on file changes
    Watch {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Delete the collection, the graph, and the cache
    Clear {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Dead-code, complexity, and unused-import report
    Quality {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Files depending on the given file (reverse IMPORTS/CALLS)
    Impact {
        /// Workspace root
        #[arg(long, default_value = ".")]
        path: PathBuf,
        /// Target file path
        file: String,
    },
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn orchestrator_for(
    path: &PathBuf,
    graph: Arc<MemoryGraphStore>,
    vector: Arc<MemoryVectorStore>,
) -> Result<Arc<IndexOrchestrator>> {
    let root = path
        .canonicalize()
        .with_context(|| format!("workspace {} not found", path.display()))?;
    let file_config = CodegraphConfig::load(&root);
    let mut scan = ScanConfig::default();
    scan.exclude_patterns.extend(file_config.scan.exclude);
    for ext in file_config.scan.extensions {
        scan.extensions.insert(ext.to_ascii_lowercase());
    }
    let config = OrchestratorConfig {
        workspace: Some(root),
        store_configured: true,
        scan,
        validator: file_config.validator,
        cache_path: None,
    };
    Ok(Arc::new(IndexOrchestrator::new(
        config,
        graph,
        vector,
        Arc::new(HashEmbeddingProvider::default()),
        Arc::new(LineBlockParser),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    match args.command {
        Command::Index { path, json } => {
            let graph = Arc::new(MemoryGraphStore::new());
            let vector = Arc::new(MemoryVectorStore::new());
            let orch = orchestrator_for(&path, graph, vector)?;

            let progress = IndexProgress::start(&path.display().to_string());
            match orch.start_indexing().await {
                Ok(summary) => {
                    if json {
                        progress.finish_quiet();
                        println!(
                            "{}",
                            serde_json::json!({
                                "files": summary.files_scanned,
                                "skipped": summary.files_skipped,
                                "blocks": summary.found,
                                "indexed": summary.indexed,
                                "nodes": summary.nodes_created,
                                "relationships": summary.relationships_created,
                                "incremental": summary.incremental,
                                "durationMs": summary.duration_ms,
                            })
                        );
                    } else {
                        progress.finish_summary(&summary);
                    }
                    Ok(())
                }
                Err(e) => {
                    let state_error = orch.last_error();
                    progress.finish_failure(&format!("indexing failed: {e}"), state_error.as_ref());
                    std::process::exit(1);
                }
            }
        }
        Command::Watch { path } => {
            let graph = Arc::new(MemoryGraphStore::new());
            let vector = Arc::new(MemoryVectorStore::new());
            let orch = orchestrator_for(&path, graph, vector)?;

            let progress = IndexProgress::start(&path.display().to_string());
            let summary = orch.start_indexing().await?;
            progress.finish_summary(&summary);
            println!(
                "{} watching for changes (Ctrl+C to exit)",
                style("…").cyan().bold()
            );

            let watch_config = WatchConfig {
                root: path,
                ..Default::default()
            };
            let handle = tokio::runtime::Handle::current();
            let watcher_orch = Arc::clone(&orch);
            tokio::task::spawn_blocking(move || {
                if let Err(e) = watch_and_reindex(watcher_orch, watch_config, handle) {
                    eprintln!("{} watcher failed: {e}", style("✗").red().bold());
                }
            })
            .await?;
            Ok(())
        }
        Command::Clear { path } => {
            let graph = Arc::new(MemoryGraphStore::new());
            let vector = Arc::new(MemoryVectorStore::new());
            let orch = orchestrator_for(&path, graph, vector)?;
            orch.clear().await?;
            println!(
                "{} cleared index, collection, and cache",
                style("✓").green().bold()
            );
            Ok(())
        }
        Command::Quality { path, json } => {
            let root = path
                .canonicalize()
                .with_context(|| format!("workspace {} not found", path.display()))?;

            // Build the graph first; the dead-code analyzers read edges.
            let graph = Arc::new(MemoryGraphStore::new());
            let vector = Arc::new(MemoryVectorStore::new());
            let orch = orchestrator_for(&path, Arc::clone(&graph), vector)?;
            orch.start_indexing().await?;

            let parser = LineBlockParser;
            let scan = ScanConfig::default();
            let mut files = Vec::new();
            for entry in walkdir_files(&root) {
                let Some(ext) = std::path::Path::new(&entry)
                    .extension()
                    .and_then(|e| e.to_str())
                else {
                    continue;
                };
                if !scan.extensions.contains(&ext.to_ascii_lowercase()) {
                    continue;
                }
                let Ok(content) = std::fs::read_to_string(&entry) else {
                    continue;
                };
                let tree = parser.syntax_tree(&entry, &content);
                files.push(FileInput {
                    path: entry,
                    content,
                    tree,
                });
            }

            let report = analyze_workspace(
                &graph.nodes(),
                &graph.relationships(),
                &files,
                &HashSet::new(),
                &ReachabilityConfig::default(),
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_quality_report(&report);
            }
            Ok(())
        }
        Command::Impact { path, file } => {
            let graph = Arc::new(MemoryGraphStore::new());
            let vector = Arc::new(MemoryVectorStore::new());
            let orch = orchestrator_for(&path, Arc::clone(&graph), vector)?;
            orch.start_indexing().await?;

            let targets: Vec<String> = graph
                .nodes()
                .into_iter()
                .filter(|n| n.file_path.ends_with(&file))
                .map(|n| n.id)
                .collect();
            if targets.is_empty() {
                println!(
                    "{} no indexed nodes match '{file}'",
                    style("⚠").yellow().bold()
                );
                return Ok(());
            }
            let mut dependents: Vec<String> = graph
                .relationships()
                .into_iter()
                .filter(|r| {
                    targets.contains(&r.to_id)
                        && matches!(r.kind, RelKind::Imports | RelKind::Calls)
                })
                .map(|r| r.from_id)
                .collect();
            dependents.sort();
            dependents.dedup();

            println!("Impact analysis for '{file}':");
            println!("  {} matched nodes", targets.len());
            println!("  {} dependents", dependents.len());
            for d in dependents {
                println!("  - {d}");
            }
            Ok(())
        }
    }
}

fn print_quality_report(report: &QualityReport) {
    println!(
        "Quality report: {} files, {} code lines, avg cyclomatic {:.1}",
        report.files, report.code_lines, report.avg_cyclomatic
    );
    for unused in &report.unused_functions {
        println!(
            "  unused function '{}' ({}:{})",
            unused.name, unused.file_path, unused.line
        );
    }
    for node in &report.orphaned_nodes {
        println!(
            "  orphaned {} '{}' ({}:{})",
            node.kind, node.name, node.file_path, node.start_line
        );
    }
    for file in &report.unreachable {
        for finding in &file.findings {
            println!(
                "  unreachable code ({}:{}) {}",
                file.file_path,
                finding.line,
                finding.reason.as_str()
            );
        }
    }
    for file in &report.unused_imports {
        for import in &file.imports {
            println!(
                "  unused import '{}' ({}:{})",
                import.source, file.file, import.line
            );
        }
    }
    if report.finding_count() == 0 {
        println!("{} no quality findings", style("✓").green().bold());
    }
    println!(
        "overall score: {:.1}/100 (complexity {:.1}, coverage {:.1}, maintainability {:.1})",
        report.score.overall,
        report.score.complexity_score,
        report.score.coverage_score,
        report.score.maintainability
    );
}

fn walkdir_files(root: &PathBuf) -> Vec<String> {
    walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_string_lossy().to_string())
        .filter(|p| !p.contains("/node_modules/") && !p.contains("/target/") && !p.contains("/.git/"))
        .collect()
}
