//! ctxmap CLI
//!
//! - `map`: search for context-sensitive mappings between two ontologies
//! - `layers`: print the breadth-first layering of an ontology graph
//! - `score`: score a raw contingency table
//! - `filter`: post-filter a mappings file by information content

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod inspect;
mod mapping;

#[derive(Parser)]
#[command(name = "ctxmap")]
#[command(
    author,
    version,
    about = "ctxmap: context-sensitive ontology mapping over co-occurrence counts"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find (source, destination, context) concept triples with strong
    /// dependence evidence.
    Map(MapArgs),

    /// Print the topological layers of an ontology graph.
    Layers {
        /// Ontology graph (JSON)
        #[arg(long)]
        graph: PathBuf,
    },

    /// Score a contingency table given as comma-separated cells.
    Score {
        /// Cells in `2 * 2^k` order, e.g. `1016,28,95,6`
        #[arg(long, value_delimiter = ',', required = true)]
        cells: Vec<u64>,
        /// Dirichlet prior strength (or equivalent sample size with --bdeu)
        #[arg(long, default_value_t = 2.0)]
        alpha: f64,
        /// Also report the BDeu score
        #[arg(long)]
        bdeu: bool,
    },

    /// Keep mappings whose information content clears a fraction of the maximum.
    Filter {
        /// Mappings JSON written by `ctxmap map`
        #[arg(long)]
        mappings: PathBuf,
        #[arg(long, default_value_t = 0.5)]
        cutoff: f64,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct MapArgs {
    /// Source ontology graph (JSON)
    #[arg(long)]
    pub source: PathBuf,
    /// Destination ontology graph (JSON)
    #[arg(long)]
    pub destination: PathBuf,
    /// Context ontology graph (JSON)
    #[arg(long)]
    pub context: PathBuf,
    /// Document index (JSON `{"documents": [[concept, ...], ...]}`)
    #[arg(long)]
    pub index: PathBuf,
    /// Search config (JSON); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub alpha: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub min_threshold: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub accept_threshold: Option<f64>,
    /// Disable cross-context memoization of pruned nodes
    #[arg(long)]
    pub no_memo: bool,
    /// Keep source and destination as given
    #[arg(long)]
    pub no_orient: bool,
    /// Score with BDeu instead of the conditional-independence Bayes factor
    #[arg(long)]
    pub bdeu: bool,
    /// Test every triple without pruning
    #[arg(long)]
    pub brute_force: bool,
    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Map(args) => mapping::cmd_map(&args),
        Commands::Layers { graph } => inspect::cmd_layers(&graph),
        Commands::Score { cells, alpha, bdeu } => inspect::cmd_score(cells, alpha, bdeu),
        Commands::Filter {
            mappings,
            cutoff,
            out,
        } => mapping::cmd_filter(&mappings, cutoff, out.as_deref()),
    }
}
