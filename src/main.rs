use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use tracing_subscriber::EnvFilter;

use vocabgraph::errors::VocabGraphError;
use vocabgraph::linkcheck::format_report_as_markdown;
use vocabgraph::linked_data::to_nquads;
use vocabgraph::vocabgraph::VocabGraph;

/// Resolve, graph and check linked vocabulary corpora.
#[derive(Parser)]
#[command(name = "vocabgraph", about = "Resolve, graph and check linked vocabulary corpora")]
struct Cli {
    /// Project path (default: current directory)
    #[arg(short, long, global = true)]
    path: Option<String>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration to .vocabgraph/config.json
    Init,
    /// Resolve a document, merging referenced documents into it
    Resolve {
        /// Identifier, prefixed identifier or location
        id: String,
        /// Reference depth (default: from configuration)
        #[arg(short, long)]
        depth: Option<u32>,
        /// Keep the expanded form instead of compacting
        #[arg(short, long)]
        expanded: bool,
    },
    /// Print the expanded form of a document
    Expand {
        location: String,
    },
    /// Compact a document against a context (default: its own)
    Compact {
        location: String,
        context: Option<String>,
    },
    /// Print a document as N-Quads
    Rdf {
        location: String,
    },
    /// Build the dependency graph of a corpus and write it to disk
    Graph {
        /// Documents, directories or registry prefixes
        #[arg(required = true)]
        locations: Vec<String>,
        /// Output file (default: from configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Rebuild even if the stored graph is current
        #[arg(short, long)]
        force: bool,
    },
    /// Generate the context template for a type from a stored graph
    Context {
        /// RDF type, full or prefixed
        type_id: String,
        /// Graph file (default: from configuration)
        #[arg(short, long)]
        graph: Option<PathBuf>,
    },
    /// Check a corpus for references that cannot be dereferenced
    Links {
        /// Documents, directories or registry prefixes
        #[arg(required = true)]
        locations: Vec<String>,
        /// Number of documents checked concurrently
        #[arg(short, long)]
        workers: Option<usize>,
        /// Write a Markdown summary to this file
        #[arg(short, long)]
        summary: Option<PathBuf>,
    },
    /// Expand a prefixed identifier, or compact a full one
    Iri {
        id: String,
        #[arg(short, long)]
        compact: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so JSON on stdout stays machine-readable. `RUST_LOG`
/// overrides the verbosity flags.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> vocabgraph::errors::Result<()> {
    let project_path = resolve_path(cli.path);
    match cli.command {
        Commands::Init => {
            VocabGraph::init(&project_path)?;
            println!("Initialized vocabgraph at {}", project_path.display());
        }
        Commands::Resolve {
            id,
            depth,
            expanded,
        } => {
            let vg = VocabGraph::open(&project_path)?;
            let compact = vg.config().compact_output && !expanded;
            print_json(&vg.resolve(&id, compact, depth)?)?;
        }
        Commands::Expand { location } => {
            let vg = VocabGraph::open(&project_path)?;
            print_json(&vg.expand(&location)?)?;
        }
        Commands::Compact { location, context } => {
            let vg = VocabGraph::open(&project_path)?;
            print_json(&vg.compact(&location, context.as_deref())?)?;
        }
        Commands::Rdf { location } => {
            let vg = VocabGraph::open(&project_path)?;
            print!("{}", to_nquads(&vg.to_rdf(&location)?));
        }
        Commands::Graph {
            locations,
            output,
            force,
        } => {
            let vg = VocabGraph::open(&project_path)?;
            let result = vg.refresh_graph(&locations, output.as_deref(), force)?;
            let graph = &result.graph;
            if result.rebuilt {
                println!(
                    "Built graph: {} nodes, {} links, {} types, {} missing in {}ms",
                    graph.nodes.len(),
                    graph.links.len(),
                    graph.types.len(),
                    graph.missing.len(),
                    result.duration_ms
                );
            } else {
                println!("Graph is up to date ({} nodes, {} links)", graph.nodes.len(), graph.links.len());
            }
            for id in &graph.missing {
                println!("  missing: {}", vg.registry().compact(id));
            }
        }
        Commands::Context { type_id, graph } => {
            let vg = VocabGraph::open(&project_path)?;
            let graph = vg.read_graph(graph.as_deref())?;
            print_json(&vg.context_for_type(&graph, &type_id)?)?;
        }
        Commands::Links {
            locations,
            workers,
            summary,
        } => {
            let vg = VocabGraph::open(&project_path)?;
            let report = vg.check_links(&locations, workers).await;
            print_json(&serde_json::to_value(&report.entries)?)?;
            if let Some(summary_path) = summary {
                let markdown = format_report_as_markdown(&report, vg.registry());
                std::fs::write(&summary_path, markdown)?;
                eprintln!("Summary written to {}", summary_path.display());
            }
            if !report.is_clean() {
                return Err(VocabGraphError::linked_data(format!(
                    "{} broken links, {} unreadable documents",
                    report.broken_count(),
                    report.failures.len()
                )));
            }
        }
        Commands::Iri { id, compact } => {
            let vg = VocabGraph::open(&project_path)?;
            if compact {
                println!("{}", vg.registry().compact(&id));
            } else {
                println!("{}", vg.registry().resolve(&id));
            }
        }
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> vocabgraph::errors::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolves an optional path argument to a `PathBuf`.
///
/// Defaults to the current working directory if no path is provided.
fn resolve_path(path: Option<String>) -> PathBuf {
    match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
