//! Command-line interface for the pubsearch index.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pubsearch_config::Config;
use pubsearch_index::{
    HttpBackend, IdBound, InlineDispatcher, ReindexOptions, Reindexer, SearchArgs, Searcher,
    cleanup_index, push_data_keywords,
};

mod dump;

use dump::DumpStore;

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "pubsearch")]
#[command(about = "Search index maintenance for publications and data tables")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported `pubsearch` subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Search publications and their data tables
    Search {
        /// Query string; empty lists the newest publications
        #[arg(default_value = "")]
        query: String,

        /// Filter as name=value (author, collaboration, subject_areas,
        /// date, cmenergies, or a data keyword); repeatable
        #[arg(short, long)]
        filter: Vec<String>,

        /// Results per page
        #[arg(short = 'n', long, default_value = "10")]
        size: usize,

        /// Result offset
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Sort field (title, collaborations, date, latest, recid,
        /// inspire_id, relevance)
        #[arg(long, default_value = "")]
        sort_by: String,

        /// Sort order; "rev" flips the field's default direction
        #[arg(long, default_value = "")]
        sort_order: String,

        /// Filter applied after facet counts, as name=value
        #[arg(long)]
        post_filter: Option<String>,
    },

    /// Fetch one indexed document by record id
    Get {
        /// Record id
        recid: u64,
    },

    /// Reindex submissions from a JSON dump
    Reindex {
        /// Path to the submission dump file
        dump: PathBuf,

        /// Drop and recreate the index with the current schema first
        #[arg(long)]
        recreate: bool,

        /// Apply the current mappings in place first
        #[arg(long)]
        update_mapping: bool,

        /// Restrict to an inclusive id range
        #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"])]
        range: Option<Vec<u64>>,

        /// Interpret the range over inspire ids instead of record ids
        #[arg(long, requires = "range")]
        by_inspire_id: bool,
    },

    /// Delete table documents superseded by a newer version
    Cleanup {
        /// Path to the submission dump file
        dump: PathBuf,
    },

    /// Merge table keywords onto their publications
    PushKeywords {
        /// Publication record ids
        #[arg(required = true)]
        recids: Vec<u64>,
    },

    /// Remove one publication and its tables from the index
    Unload {
        /// Path to the submission dump file
        dump: PathBuf,

        /// Publication record id
        recid: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };
    let backend = match HttpBackend::new(
        &config.backend_url,
        Duration::from_secs(config.timeout_secs),
    ) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Search {
            query,
            filter,
            size,
            offset,
            sort_by,
            sort_order,
            post_filter,
        } => cmd_search(
            &backend,
            &config,
            query,
            &filter,
            size,
            offset,
            sort_by,
            sort_order,
            post_filter.as_deref(),
        ),
        Commands::Get { recid } => cmd_get(&backend, &config, recid),
        Commands::Reindex {
            dump,
            recreate,
            update_mapping,
            range,
            by_inspire_id,
        } => cmd_reindex(
            &backend,
            &config,
            &dump,
            recreate,
            update_mapping,
            range.as_deref(),
            by_inspire_id,
        ),
        Commands::Cleanup { dump } => cmd_cleanup(&backend, &config, &dump),
        Commands::PushKeywords { recids } => cmd_push_keywords(&backend, &config, &recids),
        Commands::Unload { dump, recid } => cmd_unload(&backend, &config, &dump, recid),
    }
}

/// Routes log output to stderr so stdout stays machine-readable JSON.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads configuration from the given path, or the defaults without one.
fn load_config(path: Option<&std::path::Path>) -> Result<Config, String> {
    match path {
        Some(path) => Config::load(path).map_err(|e| e.to_string()),
        None => Ok(Config::default()),
    }
}

/// Splits a `name=value` argument.
fn split_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got {raw:?}"))
}

/// Implements the `pubsearch search` command.
#[allow(clippy::too_many_arguments, reason = "one parameter per CLI flag")]
fn cmd_search(
    backend: &HttpBackend,
    config: &Config,
    query: String,
    filter: &[String],
    size: usize,
    offset: usize,
    sort_by: String,
    sort_order: String,
    post_filter: Option<&str>,
) -> ExitCode {
    let filters = match filter.iter().map(|f| split_pair(f)).collect::<Result<Vec<_>, _>>() {
        Ok(filters) => filters,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };
    let post_filter = match post_filter.map(split_pair).transpose() {
        Ok(post_filter) => post_filter,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let args = SearchArgs {
        query,
        filters,
        size,
        offset,
        sort_by,
        sort_order,
        post_filter,
    };
    match Searcher::new(backend, config).search(&args) {
        Ok(results) => print_json(&results),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Implements the `pubsearch get` command.
fn cmd_get(backend: &HttpBackend, config: &Config, recid: u64) -> ExitCode {
    match Searcher::new(backend, config).get_record(recid) {
        Ok(Some(document)) => print_json(&document),
        Ok(None) => {
            eprintln!("error: no document with record id {recid}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Implements the `pubsearch reindex` command.
fn cmd_reindex(
    backend: &HttpBackend,
    config: &Config,
    dump: &std::path::Path,
    recreate: bool,
    update_mapping: bool,
    range: Option<&[u64]>,
    by_inspire_id: bool,
) -> ExitCode {
    let store = match DumpStore::load(dump) {
        Ok(store) => store,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let id_range = range.map(|bounds| {
        let bound = if by_inspire_id {
            IdBound::InspireId
        } else {
            IdBound::Recid
        };
        (bound, bounds[0], bounds[1])
    });
    let options = ReindexOptions {
        recreate,
        update_mapping,
        id_range,
    };

    let reindexer = Reindexer::new(backend, &store, config);
    match reindexer.reindex_all(&options, &InlineDispatcher::new(&reindexer)) {
        Ok(stats) => print_json(&stats),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Implements the `pubsearch cleanup` command.
fn cmd_cleanup(backend: &HttpBackend, config: &Config, dump: &std::path::Path) -> ExitCode {
    let store = match DumpStore::load(dump) {
        Ok(store) => store,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };
    match cleanup_index(backend, &store, config) {
        Ok(stats) => print_json(&stats),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Implements the `pubsearch push-keywords` command.
fn cmd_push_keywords(backend: &HttpBackend, config: &Config, recids: &[u64]) -> ExitCode {
    let stats = push_data_keywords(backend, config, recids);
    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    }
    if stats.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Implements the `pubsearch unload` command.
fn cmd_unload(
    backend: &HttpBackend,
    config: &Config,
    dump: &std::path::Path,
    recid: u64,
) -> ExitCode {
    let store = match DumpStore::load(dump) {
        Ok(store) => store,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };
    let reindexer = Reindexer::new(backend, &store, config);
    match reindexer.unload_submission(recid) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Prints a value as pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
