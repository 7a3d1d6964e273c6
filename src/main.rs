use anyhow::Result;
use arbor::areas::repository::Repository;
use arbor::artifacts::core::pager::PagerWriter;
use arbor::commands::porcelain::log::LogOptions;
use clap::{Parser, Subcommand};
use is_terminal::IsTerminal;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "arbor",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A content-addressed version-control engine",
    long_about = "arbor stores snapshots in a content-addressed object database, \
    keeps a staging index, and supports branching, line diffs and three-way merges.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "Create the .arbor directory in the current directory or at the given path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<PathBuf>,
    },
    #[command(
        name = "hash-object",
        about = "Compute the digest of a file and optionally store it"
    )]
    HashObject {
        #[arg(short, long, help = "Write the blob to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: PathBuf,
    },
    #[command(name = "cat-file", about = "Print the content of an object")]
    CatFile {
        #[arg(short = 'p', long = "pretty", help = "The object to print")]
        object: String,
    },
    #[command(name = "ls-tree", about = "List the contents of a tree")]
    LsTree {
        #[arg(short, long, help = "Recurse into subtrees")]
        recursive: bool,
        #[arg(index = 1, default_value = "HEAD")]
        object: String,
    },
    #[command(name = "add", about = "Stage files for the next commit")]
    Add {
        #[arg(index = 1, required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },
    #[command(name = "rm", about = "Remove files from the index")]
    Rm {
        #[arg(long, help = "Only unstage, keep the working files")]
        cached: bool,
        #[arg(index = 1, required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },
    #[command(name = "commit", about = "Record the index as a new commit")]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: Option<String>,
    },
    #[command(name = "status", about = "Show the working tree status")]
    Status {
        #[arg(long, help = "Machine-readable output")]
        porcelain: bool,
    },
    #[command(name = "diff", about = "Show unstaged or staged changes")]
    Diff {
        #[arg(long, alias = "staged", help = "Compare the index against HEAD")]
        cached: bool,
    },
    #[command(name = "log", about = "Show commit history")]
    Log {
        #[arg(long, help = "One commit per line")]
        oneline: bool,
        #[arg(index = 1)]
        revision: Option<String>,
    },
    #[command(name = "branch", about = "List, create or delete branches")]
    Branch {
        #[arg(short, long, help = "Delete the named branch")]
        delete: bool,
        #[arg(index = 1)]
        name: Option<String>,
        #[arg(index = 2)]
        start_point: Option<String>,
    },
    #[command(name = "checkout", about = "Switch branches or detach HEAD")]
    Checkout {
        #[arg(index = 1)]
        target: String,
    },
    #[command(name = "reset", about = "Move the current ref and reload the index")]
    Reset {
        #[arg(index = 1)]
        revision: Option<String>,
    },
    #[command(name = "merge", about = "Merge a revision into HEAD")]
    Merge {
        #[arg(index = 1)]
        target: String,
        #[arg(short, long, help = "The merge commit message")]
        message: Option<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let pwd = std::env::current_dir()?;

    match &cli.command {
        Commands::Init { path } => {
            let path = path.clone().unwrap_or_else(|| pwd.clone());
            Repository::initialize(&path, Box::new(std::io::stdout()))?;
        }
        Commands::Log { oneline, revision } => {
            let opts = LogOptions {
                revision: revision.clone(),
                oneline: *oneline,
            };

            if use_pager() {
                let pager = minus::Pager::new();
                let repository = Repository::open(&pwd, Box::new(PagerWriter::new(pager.clone())))?;
                repository.log(&opts)?;
                minus::page_all(pager)?;
            } else {
                open(&pwd)?.log(&opts)?;
            }
        }
        command => run(&open(&pwd)?, &pwd, command)?,
    }

    Ok(())
}

fn run(repository: &Repository, pwd: &Path, command: &Commands) -> Result<()> {
    match command {
        Commands::HashObject { write, file } => repository.hash_object(file, *write),
        Commands::CatFile { object } => repository.cat_file(object),
        Commands::LsTree { recursive, object } => repository.ls_tree(object, *recursive),
        Commands::Add { paths } => repository.add(&anchor(pwd, paths)),
        Commands::Rm { cached, paths } => repository.rm(&anchor(pwd, paths), *cached),
        Commands::Commit { message } => repository.commit(message.as_deref()),
        Commands::Status { porcelain } => repository.print_status(*porcelain),
        Commands::Diff { cached } => repository.diff(*cached),
        Commands::Branch {
            delete,
            name,
            start_point,
        } => match (name, *delete) {
            (Some(name), true) => repository.branch_delete(name),
            (Some(name), false) => repository.branch_create(name, start_point.as_deref()),
            (None, true) => anyhow::bail!("branch name required"),
            (None, false) => repository.branch_list(),
        },
        Commands::Checkout { target } => repository.checkout_revision(target),
        Commands::Reset { revision } => repository.reset_revision(revision.as_deref()),
        Commands::Merge { target, message } => {
            repository.merge_revision(target, message.as_deref())
        }
        Commands::Init { .. } | Commands::Log { .. } => Ok(()),
    }?;

    repository.writer().flush()?;

    Ok(())
}

fn open(path: &Path) -> Result<Repository> {
    Ok(Repository::open(path, Box::new(std::io::stdout()))?)
}

/// Pathspecs are relative to the invocation directory, not the repository root.
fn anchor(pwd: &Path, paths: &[PathBuf]) -> Vec<PathBuf> {
    paths.iter().map(|path| pwd.join(path)).collect()
}

/// Page `log` output only on an interactive terminal without `NO_PAGER`.
fn use_pager() -> bool {
    std::env::var_os("NO_PAGER").is_none() && std::io::stdout().is_terminal()
}

/// Log to stderr, filtered by `ARBOR_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("ARBOR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
