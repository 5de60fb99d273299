//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use harvester_collector::{ExtractVariant, SourceList, collect};
use harvester_shared::{
    AppConfig, DedupPolicy, init_config, load_config, resolve_downloads_dir,
};
use harvester_workbook::{CombineOutcome, combine, discover, write_workbook};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Harvester — collect citations and combine exports from the ComBase browser.
#[derive(Parser)]
#[command(
    name = "harvester",
    version,
    about = "Extract source citations from saved result pages and combine Excel exports.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract source citations from saved result pages into a numbered list.
    Extract {
        /// Result-page HTML files. Defaults to combase_page_*.html in the
        /// pages directory.
        files: Vec<PathBuf>,

        /// Directory holding saved result pages.
        #[arg(long)]
        pages_dir: Option<PathBuf>,

        /// Duplicate handling: dedupe or append-all.
        #[arg(long, default_value = "dedupe")]
        policy: String,

        /// Match the source span id exactly instead of by prefix.
        #[arg(long)]
        exact_id: bool,

        /// Append to an existing list instead of starting fresh.
        #[arg(long)]
        resume: bool,

        /// Output file for the numbered source list.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Combine downloaded Excel exports into one workbook.
    Combine {
        /// Directory holding the exports (defaults to the downloads folder).
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Filename pattern for export files.
        #[arg(long)]
        pattern: Option<String>,

        /// Output path for the combined workbook.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "harvester=info",
        1 => "harvester=debug",
        _ => "harvester=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract {
            files,
            pages_dir,
            policy,
            exact_id,
            resume,
            out,
        } => cmd_extract(files, pages_dir, &policy, exact_id, resume, out),
        Command::Combine { dir, pattern, out } => {
            cmd_combine(dir, pattern.as_deref(), out)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

fn cmd_extract(
    files: Vec<PathBuf>,
    pages_dir: Option<PathBuf>,
    policy: &str,
    exact_id: bool,
    resume: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = load_config()?;

    let policy: DedupPolicy = policy.parse()?;

    let pages_dir = pages_dir.unwrap_or_else(|| PathBuf::from(&config.defaults.pages_dir));
    let out = out.unwrap_or_else(|| PathBuf::from(&config.defaults.sources_file));

    let documents = if files.is_empty() {
        default_page_files(&pages_dir)?
    } else {
        files
    };

    // Nothing discovered means nothing to do, not a failure.
    if documents.is_empty() {
        println!();
        println!(
            "  No result pages found in '{}' (expected combase_page_*.html).",
            pages_dir.display()
        );
        println!();
        return Ok(());
    }

    let variant = if exact_id {
        ExtractVariant::ExactId
    } else {
        ExtractVariant::PrefixId
    };

    // Default is a fresh list; --resume continues the numbering on disk.
    let mut list = if resume {
        SourceList::load(&out)
    } else {
        if out.exists() {
            std::fs::write(&out, "")?;
        }
        SourceList::new()
    };

    info!(
        documents = documents.len(),
        policy = %policy,
        resume,
        out = %out.display(),
        "extracting sources"
    );

    let spinner = spinner("Extracting sources");
    let summary = collect(&documents, variant, policy, &mut list, &out)?;
    spinner.finish_and_clear();

    println!();
    println!("  Source extraction complete!");
    println!("  Pages:   {}", summary.documents_processed);
    println!("  Found:   {}", summary.records_found);
    println!("  Added:   {}", summary.records_added);
    println!("  List:    {} entries total", list.len());
    println!("  Output:  {}", out.display());
    println!("  Time:    {:.1}s", summary.duration.as_secs_f64());
    if !summary.documents_skipped.is_empty() {
        println!("  Skipped: {}", summary.documents_skipped.len());
        for (path, reason) in &summary.documents_skipped {
            println!("    - {} ({reason})", path.display());
        }
    }
    println!();

    Ok(())
}

/// Saved result pages in their capture order: the standalone
/// `combase_search_results.html` snapshot first, then `combase_page_1.html`,
/// `combase_page_2.html`, ... (glob order would put page 10 before page 2).
fn default_page_files(pages_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages: Vec<(usize, PathBuf)> = discover(pages_dir, "combase_page_*.html")?
        .into_iter()
        .filter_map(|path| Some((page_number(&path)?, path)))
        .collect();
    pages.sort_by_key(|(n, _)| *n);

    let mut files = Vec::new();
    let single = pages_dir.join("combase_search_results.html");
    if single.exists() {
        files.push(single);
    }
    files.extend(pages.into_iter().map(|(_, path)| path));

    Ok(files)
}

fn page_number(path: &Path) -> Option<usize> {
    path.file_stem()?
        .to_str()?
        .strip_prefix("combase_page_")?
        .parse()
        .ok()
}

// ---------------------------------------------------------------------------
// combine
// ---------------------------------------------------------------------------

fn cmd_combine(
    dir: Option<PathBuf>,
    pattern: Option<&str>,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = load_config()?;

    let dir = dir.unwrap_or_else(|| resolve_downloads_dir(&config));
    let pattern = pattern.unwrap_or(&config.export.pattern);
    let out = out.unwrap_or_else(|| PathBuf::from(&config.defaults.combined_workbook));

    info!(dir = %dir.display(), pattern, "combining exports");

    let files = discover(&dir, pattern)?;

    let spinner = spinner("Combining exports");
    let outcome = combine(&files)?;
    spinner.finish_and_clear();

    match outcome {
        CombineOutcome::Combined { dataset, summary } => {
            write_workbook(&dataset, &out)?;

            println!();
            println!("  Exports combined!");
            println!("  Files:     {}", summary.files_combined);
            println!("  Records:   {}", summary.data_rows);
            println!("  Log rows:  {}", summary.log_rows);
            println!("  Output:    {}", out.display());
            println!("  Time:      {:.1}s", summary.duration.as_secs_f64());
            if !summary.files_skipped.is_empty() {
                println!("  Skipped:   {}", summary.files_skipped.len());
                for (path, reason) in &summary.files_skipped {
                    println!("    - {} ({reason})", path.display());
                }
            }
            println!();
        }
        CombineOutcome::NothingToCombine { files_skipped } => {
            println!();
            println!(
                "  No exports to combine in '{}' (pattern '{pattern}').",
                dir.display()
            );
            for (path, reason) in &files_skipped {
                println!("    - {} ({reason})", path.display());
            }
            println!();
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress spinner
// ---------------------------------------------------------------------------

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(message.to_string());
    spinner
}
