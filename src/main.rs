use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use git_semver::cli::{exit_code, run_workflow, WorkflowArgs};
use git_semver::config::{self, Backend, Config};
use git_semver::env::{self, OsEnvironment};
use git_semver::git::{Git2Client, GitCommand, VersionControl};
use git_semver::{ui, GitSemverError, Result};

#[derive(clap::Parser)]
#[command(
    name = "git-semver",
    version,
    about = "Print a semantic version for the current commit, derived from git tags and CI variables"
)]
struct Args {
    #[arg(help = "Directory inside the repository; environment variables are expanded")]
    repo: Option<String>,

    #[arg(long, help = "Path to the git executable")]
    git: Option<String>,

    #[arg(long, value_enum, help = "Git implementation to use")]
    backend: Option<Backend>,

    #[arg(
        long,
        help = "Write to file instead of stdout (relative paths are relative to the repository)"
    )]
    out: Option<String>,

    #[arg(
        long,
        help = "Override the Go PkgName, default is the last part of the module in go.mod"
    )]
    name: Option<String>,

    #[arg(long = "gopackage", help = "Write Go source with PkgName and PkgVersion")]
    go_package: bool,

    #[arg(long = "nofetch", help = "Don't fetch remote tags")]
    no_fetch: bool,

    #[arg(long = "nonewline", help = "Don't print a newline after the output")]
    no_newline: bool,

    #[arg(long = "incpatch", help = "Increment the patch level and create a new tag")]
    inc_patch: bool,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, help = "Log git invocations and resolution steps to stderr")]
    debug: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.debug);

    if let Err(e) = run(args) {
        ui::display_error(&format!("{:#}", e));
        let code = e.downcast_ref::<GitSemverError>().map_or(125, exit_code);
        std::process::exit(code);
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> anyhow::Result<()> {
    let repo = args
        .repo
        .as_deref()
        .map(|r| env::expand(r, &OsEnvironment))
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| ".".to_string());
    let repo = PathBuf::from(repo);

    let config = config::load_config(args.config.as_deref(), Some(&repo))
        .context("Error loading config")?;
    let git = open_backend(&config, args.git.as_deref(), args.backend)?;

    let workflow_args = WorkflowArgs {
        repo,
        out: args
            .out
            .as_deref()
            .map(|o| PathBuf::from(env::expand(o, &OsEnvironment))),
        name: args.name,
        go_package: args.go_package,
        no_fetch: args.no_fetch,
        no_newline: args.no_newline,
        inc_patch: args.inc_patch,
        release_branches: config.release.branches,
    };

    let result = run_workflow(git, OsEnvironment, &workflow_args, &mut io::stdout().lock())?;
    if let Some(path) = &result.written_to {
        debug!(path = %path.display(), "wrote output");
    }
    if let Some(tag) = &result.new_tag {
        ui::display_success(&format!("Created and pushed tag {}", tag));
    }
    Ok(())
}

/// Chooses the git implementation. Flags override the configuration file.
fn open_backend(
    config: &Config,
    git: Option<&str>,
    backend: Option<Backend>,
) -> Result<Box<dyn VersionControl>> {
    let remote = config.git.remote.clone();
    match backend.unwrap_or(config.git.backend) {
        Backend::Command => {
            let binary = git.unwrap_or(&config.git.binary);
            let client = GitCommand::new(Path::new(binary))?.with_remote(remote);
            debug!(git = %client.git_path().display(), "using git executable");
            Ok(Box::new(client))
        }
        Backend::Libgit2 => {
            if git.is_some() {
                ui::display_warning("--git is ignored with the libgit2 backend");
            }
            Ok(Box::new(Git2Client::new().with_remote(remote)))
        }
    }
}
