use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use postmortem_bugzilla::{
    parse_record, register_list_converters, BugSearch, Materialize, Product, QueryCommand,
};
use postmortem_core::env::{bugzilla_base_url, ignore_quality};
use postmortem_core::{
    shutdown_save_report, CrashMetadata, CrashSession, PanicInterceptor, ProcessBackend,
    SaveOutcome, ShutdownOptions,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "postmortem")]
#[command(about = "Crash handler that collects a backtrace of a crashed process and prepares bug reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a backtrace for a crashed process and store it in the cache directory
    Save {
        #[command(flatten)]
        crash: CrashArgs,
        /// Directory for saved backtraces (defaults to the platform cache dir)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Debugger command; %pid, %execpath and %thread are substituted
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        debugger: Option<Vec<String>>,
    },
    /// Print the query parameters of a duplicate search
    Search {
        /// Products to search in (comma-separated)
        #[arg(long, value_delimiter = ',')]
        products: Vec<String>,
        #[arg(long)]
        severity: Option<String>,
        /// Only bugs created after this time (RFC 3339)
        #[arg(long)]
        created_after: Option<DateTime<Utc>>,
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
        /// Text that must appear in a comment
        #[arg(long)]
        longdesc: Option<String>,
        /// Sort keys (comma-separated)
        #[arg(long, value_delimiter = ',')]
        order: Vec<String>,
    },
    /// Load a product record from a JSON file and list its components and versions
    Product {
        #[arg(long)]
        input: PathBuf,
    },
}

/// Crash metadata as passed by the crashing process.
#[derive(Args)]
struct CrashArgs {
    /// Number of the signal that crashed the application
    #[arg(long, default_value_t = 0)]
    signal: i32,
    /// PID of the crashed application
    #[arg(long, default_value_t = 0)]
    pid: i32,
    /// Name of the application
    #[arg(long, default_value = "")]
    appname: String,
    /// Path to the executable
    #[arg(long, default_value = "")]
    apppath: String,
    /// Version of the application
    #[arg(long, default_value = "")]
    appversion: String,
    /// Bug address of the application
    #[arg(long, default_value = "")]
    bugaddress: String,
    /// Translated name of the application
    #[arg(long, default_value = "")]
    programname: String,
    /// The application was started by the init helper
    #[arg(long)]
    kdeinit: bool,
    /// Restricted I/O: never ask where to write files
    #[arg(long)]
    safer: bool,
    /// The application has already been restarted
    #[arg(long)]
    restarted: bool,
    /// The application keeps running after the report
    #[arg(long)]
    keeprunning: bool,
    /// Thread id of the crashing thread
    #[arg(long, default_value_t = 0)]
    thread: i32,
}

impl From<CrashArgs> for CrashMetadata {
    fn from(args: CrashArgs) -> Self {
        CrashMetadata {
            signal: args.signal,
            pid: args.pid,
            app_name: args.appname,
            app_path: args.apppath,
            app_version: args.appversion,
            bug_address: args.bugaddress,
            program_name: args.programname,
            kdeinit: args.kdeinit,
            safer: args.safer,
            restarted: args.restarted,
            keep_running: args.keeprunning,
            thread: args.thread,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Save {
            crash,
            cache_dir,
            debugger,
        } => {
            save_backtrace(crash.into(), cache_dir, debugger).await?;
        }
        Commands::Search {
            products,
            severity,
            created_after,
            id,
            limit,
            offset,
            longdesc,
            order,
        } => {
            let search = BugSearch {
                products,
                severity,
                creation_time: created_after,
                id,
                limit,
                offset,
                longdesc,
                order,
            };
            print_search(&search);
        }
        Commands::Product { input } => {
            print_product(input)?;
        }
    }

    Ok(())
}

async fn save_backtrace(
    metadata: CrashMetadata,
    cache_dir: Option<PathBuf>,
    debugger: Option<Vec<String>>,
) -> anyhow::Result<()> {
    info!("Starting postmortem for pid {}", metadata.pid);
    info!("Bug tracker: {}", bugzilla_base_url());
    if ignore_quality() {
        warn!("Backtrace quality checks are disabled");
    }

    let backend = match debugger {
        Some(command) => ProcessBackend::new(command),
        None => ProcessBackend::gdb(),
    };

    let mut session = CrashSession::with_metadata(Box::new(backend), metadata);
    let interceptor = PanicInterceptor::install();
    session
        .init(interceptor)
        .context("Could not initialize crash handling")?;
    info!("{}", session.system_information().summary());

    let options = ShutdownOptions { cache_dir };
    match shutdown_save_report(&session, &options).await? {
        SaveOutcome::Saved { path, task } => {
            info!("Backtrace saved to {} ({:?})", path.display(), task);
            println!("{}", path.display());
        }
        SaveOutcome::NoCacheDir => {
            warn!("Backtrace not saved: no usable cache directory");
        }
        SaveOutcome::WriteFailed(path) => {
            error!("Backtrace not saved: could not write {}", path.display());
        }
    }

    Ok(())
}

fn print_search(search: &BugSearch) {
    info!("Searching {}", bugzilla_base_url());
    for (key, value) in search.to_query() {
        println!("{}={}", key, value);
    }
}

fn print_product(input: PathBuf) -> anyhow::Result<()> {
    register_list_converters();

    let json = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let record = parse_record(&json).context("Invalid product record")?;
    let product = Product::from_record(&record);

    println!(
        "{} ({})",
        product.name,
        if product.is_active() { "active" } else { "inactive" }
    );
    println!("components: {}", product.component_names().join(", "));
    println!("versions: {}", product.all_versions().join(", "));
    let inactive = product.inactive_versions();
    if !inactive.is_empty() {
        println!("inactive versions: {}", inactive.join(", "));
    }

    Ok(())
}
