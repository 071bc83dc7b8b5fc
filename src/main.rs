use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glyphwise::{
    catalog::Catalog,
    config::{default_database_path, Config, ConfigStore, FileConfigStore, DEFAULT_LOG_FILTER},
    export::{progress_rows, render_progress_table, write_history_csv, SortBy},
    progress::{UserId, UserProgress},
    store::{MemoryStore, SqliteStore, StrokeStore},
    Point, PracticeService, StrokeSubmission, SubmissionReceipt,
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    io::{self, IsTerminal, Read},
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

const LOG_ENV: &str = "GLYPHWISE_LOG";

/// stroke reduction and per-character mastery tracking for handwriting practice
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Reduces traced strokes to three representative points and keeps a running mastery score per user and character. State is kept in memory unless a SQLite database is given."
)]
pub struct Cli {
    /// sqlite database to record into (default: volatile in-memory store)
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// record into the default sqlite database in the local data directory
    #[clap(long, global = true, conflicts_with = "db")]
    persist: bool,

    /// config file to load instead of the platform default
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// reduce a path (JSON array of {"x", "y"}) to its representative points
    Reduce {
        /// file holding the path; stdin when omitted
        #[clap(short, long)]
        input: Option<PathBuf>,
    },

    /// record one stroke attempt and print its receipt
    Submit {
        #[clap(long, allow_hyphen_values = true)]
        user: i64,

        #[clap(long, allow_hyphen_values = true)]
        character: i64,

        /// zero-based stroke position within the character
        #[clap(long, default_value_t = 0, allow_hyphen_values = true)]
        stroke: i64,

        #[clap(long, allow_hyphen_values = true)]
        score: f64,

        /// file holding the traced path; stdin when omitted
        #[clap(long)]
        path: Option<PathBuf>,
    },

    /// submit a JSON array of attempts from several worker threads
    Replay {
        file: PathBuf,

        #[clap(short, long, default_value_t = 4)]
        threads: usize,
    },

    /// show a user's progress per character
    Progress {
        #[clap(long, allow_hyphen_values = true)]
        user: i64,

        #[clap(long, value_enum, default_value_t = ProgressFormat::Json)]
        format: ProgressFormat,

        /// table ordering
        #[clap(long, value_enum, default_value_t = SortBy::Character)]
        sort: SortBy,

        #[clap(long)]
        desc: bool,
    },

    /// list a user's attempts, oldest first
    History {
        #[clap(long, allow_hyphen_values = true)]
        user: i64,

        #[clap(long, value_enum, default_value_t = HistoryFormat::Json)]
        format: HistoryFormat,
    },

    /// show a user's progress together with the attempts behind it
    Summary {
        #[clap(long, allow_hyphen_values = true)]
        user: i64,
    },

    /// write the effective settings to the config file
    InitConfig {
        /// replace an existing file
        #[clap(long)]
        force: bool,
    },

    /// list practice characters
    Characters,

    /// show one character with its reference strokes
    Character { id: i64 },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ProgressFormat {
    Json,
    Table,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum HistoryFormat {
    Json,
    Csv,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Rejection {
    index: usize,
    reason: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayReport {
    accepted: Vec<SubmissionReceipt>,
    rejected: Vec<Rejection>,
    progress: BTreeMap<UserId, UserProgress>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let filter_handle = init_tracing();
    let config = config_store.load().apply_env();
    if let Some(handle) = filter_handle {
        if let Err(e) = handle.reload(EnvFilter::new(&config.log_filter)) {
            warn!(error = %e, "keeping the default log filter");
        }
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_store.path().display(),
        "glyphwise starting"
    );

    match &cli.command {
        Command::Reduce { input } => {
            let path: Vec<Point> = serde_json::from_str(&read_input(input.as_deref())?)
                .context("path must be a JSON array of {\"x\", \"y\"} points")?;
            print_json(&config.reducer().reduce(&path))
        }
        Command::Submit {
            user,
            character,
            stroke,
            score,
            path,
        } => {
            let points: Vec<Point> = serde_json::from_str(&read_input(path.as_deref())?)
                .context("path must be a JSON array of {\"x\", \"y\"} points")?;
            let service = build_service(&cli, &config)?;
            let receipt = service.submit(StrokeSubmission {
                user_id: *user,
                character_id: *character,
                stroke_index: *stroke,
                path: points,
                score: *score,
            })?;
            print_json(&receipt)
        }
        Command::Replay { file, threads } => {
            let submissions: Vec<StrokeSubmission> =
                serde_json::from_str(&read_input(Some(file.as_path()))?).with_context(|| {
                    format!("{} is not a JSON array of submissions", file.display())
                })?;
            let service = build_service(&cli, &config)?;
            replay(&service, submissions, *threads)
        }
        Command::Progress {
            user,
            format,
            sort,
            desc,
        } => {
            let progress = build_service(&cli, &config)?.progress(*user)?;
            match format {
                ProgressFormat::Json => print_json(&progress),
                ProgressFormat::Table => {
                    let rows = progress_rows(&progress, *sort, !desc);
                    print!("{}", render_progress_table(&rows));
                    Ok(())
                }
            }
        }
        Command::History { user, format } => {
            let history = build_service(&cli, &config)?.history(*user)?;
            match format {
                HistoryFormat::Json => print_json(&history),
                HistoryFormat::Csv => Ok(write_history_csv(&history, io::stdout().lock())?),
            }
        }
        Command::Summary { user } => print_json(&build_service(&cli, &config)?.snapshot(*user)?),
        Command::InitConfig { force } => {
            let path = config_store.path();
            if path.exists() && !force {
                bail!("{} already exists, pass --force to replace it", path.display());
            }
            config_store
                .save(&config)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "config written");
            println!("{}", path.display());
            Ok(())
        }
        Command::Characters => print_json(Catalog::builtin()?.previews()),
        Command::Character { id } => print_json(Catalog::builtin()?.character(*id)?),
    }
}

/// Install the stderr subscriber before anything can log. Unless
/// `GLYPHWISE_LOG` pins the filter, the returned handle swaps in the
/// configured one once the config file has been read.
fn init_tracing() -> Option<reload::Handle<EnvFilter, Registry>> {
    let pinned = EnvFilter::try_from_env(LOG_ENV).ok();
    let from_env = pinned.is_some();
    let (filter, handle) =
        reload::Layer::new(pinned.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER)));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .init();
    (!from_env).then_some(handle)
}

fn build_service(cli: &Cli, config: &Config) -> Result<PracticeService> {
    let database = cli
        .db
        .clone()
        .or_else(|| cli.persist.then(default_database_path))
        .or_else(|| config.database.clone());

    let store: Arc<dyn StrokeStore> = match database {
        Some(path) => Arc::new(
            SqliteStore::open(&path, config.scale())
                .with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new(config.scale())),
    };

    Ok(PracticeService::new(config.reducer(), store))
}

fn replay(
    service: &PracticeService,
    submissions: Vec<StrokeSubmission>,
    threads: usize,
) -> Result<()> {
    let total = submissions.len();
    let workers = threads.clamp(1, total.max(1));
    let per_worker = total.div_ceil(workers).max(1);
    let users: Vec<UserId> = submissions.iter().map(|s| s.user_id).collect();

    let (tx, rx) = mpsc::channel();
    let mut indexed: Vec<(usize, StrokeSubmission)> =
        submissions.into_iter().enumerate().collect();

    thread::scope(|scope| {
        while !indexed.is_empty() {
            let take = per_worker.min(indexed.len());
            let batch: Vec<_> = indexed.drain(..take).collect();
            let tx = tx.clone();
            scope.spawn(move || {
                for (index, submission) in batch {
                    // the receiver outlives every worker
                    let _ = tx.send((index, service.submit(submission)));
                }
            });
        }
    });
    drop(tx);

    let mut outcomes: Vec<_> = rx.into_iter().collect();
    outcomes.sort_by_key(|(index, _)| *index);

    let mut report = ReplayReport {
        accepted: Vec::new(),
        rejected: Vec::new(),
        progress: BTreeMap::new(),
    };
    for (index, outcome) in outcomes {
        match outcome {
            Ok(receipt) => report.accepted.push(receipt),
            Err(e) => {
                warn!(index, error = %e, "submission rejected");
                report.rejected.push(Rejection {
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }
    for user in users {
        if user > 0 && !report.progress.contains_key(&user) {
            report.progress.insert(user, service.progress(user)?);
        }
    }

    info!(
        total,
        accepted = report.accepted.len(),
        rejected = report.rejected.len(),
        workers,
        "replay finished"
    );
    print_json(&report)?;

    if !report.rejected.is_empty() {
        bail!("{} of {} submissions rejected", report.rejected.len(), total);
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => {
            std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
