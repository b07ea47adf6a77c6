use clap::{ArgGroup, Parser};
use log::{error, info};
use std::path::PathBuf;
use std::time::Instant;
use tree_wasserstein::io::{read_distributions, read_edge_list, read_newick, write_matrix_tsv};
use tree_wasserstein::{TreeMetric, square_matrix};

/// Compute pairwise tree-Wasserstein distances between distributions over the
/// nodes of one weighted tree and write a labeled distance matrix (TSV).
#[derive(Parser, Debug)]
#[command(name = "tree-wasserstein", version, about = "Pairwise tree-Wasserstein distance matrix")]
#[command(group(ArgGroup::new("topology").required(true).args(["tree", "newick"])))]
struct Args {
    /// Edge list: one `from to weight` line per edge, node ids 0..N
    #[arg(short = 't', long = "tree")]
    tree: Option<PathBuf>,

    /// Newick tree; nodes are numbered breadth-first from its root
    #[arg(short = 'n', long = "newick")]
    newick: Option<PathBuf>,

    /// Distribution table: header names tree nodes, one distribution per row
    #[arg(short = 'd', long = "distributions")]
    distributions: PathBuf,

    /// Node id to root the tree at
    #[arg(short = 'r', long = "root", default_value_t = 0)]
    root: usize,

    /// Output path for TSV distance matrix (`-` for stdout, `.gz` to compress)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Worker threads for the pairwise evaluation (default: all cores)
    #[arg(long = "threads")]
    threads: Option<usize>,

    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if let Some(threads) = args.threads
        && let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global()
    {
        error!("Failed to configure {threads} threads: {e}");
        std::process::exit(2);
    }

    // Read tree topology and distributions
    let t0 = Instant::now();
    let labeled = match (&args.tree, &args.newick) {
        (Some(path), _) => read_edge_list(path),
        (None, Some(path)) => read_newick(path),
        (None, None) => unreachable!("clap enforces the topology group"),
    };
    let labeled = match labeled {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to read tree: {e}");
            std::process::exit(2);
        }
    };
    let dists = match read_distributions(&args.distributions, &labeled.labels) {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to read distributions {:?}: {e}", args.distributions);
            std::process::exit(2);
        }
    };
    if dists.values.is_empty() {
        error!("No distributions parsed from {:?}.", args.distributions);
        std::process::exit(2);
    }
    info!(
        "Read {} nodes and {} distributions in {:.3}s",
        labeled.num_node(),
        dists.values.len(),
        t0.elapsed().as_secs_f64()
    );

    // Validate and root the tree once
    let t1 = Instant::now();
    let metric = match TreeMetric::new(labeled.num_node(), &labeled.edges, args.root) {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to build tree: {e}");
            std::process::exit(3);
        }
    };
    info!(
        "Built tree with {} leaves rooted at {} in {:.3}s",
        metric.tree().leaves().len(),
        args.root,
        t1.elapsed().as_secs_f64()
    );

    let n = dists.names.len();
    let t2 = Instant::now();
    info!("Determining distances for {} combinations", n * (n - 1) / 2);
    let pairs = match metric.pairwise_distances(&dists.values) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to compute distances: {e}");
            std::process::exit(4);
        }
    };
    let mat = square_matrix(n, &pairs);
    info!("Determining distances {:.3}s", t2.elapsed().as_secs_f64());

    let t3 = Instant::now();
    if let Err(e) = write_matrix_tsv(&args.output, &dists.names, &mat) {
        error!("Failed to write output {:?}: {e}", args.output);
        std::process::exit(5);
    }
    let target = if args.output.as_os_str() == "-" { "stdout" } else { "output" };
    info!("Writing to {target} {:.3}s", t3.elapsed().as_secs_f64());
}
