//! `lxd-remote`: run commands and move files in an LXD container from the shell

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "lxd-remote")]
#[command(about = "Run commands and transfer files in an LXD container through lxc")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "lxd.yaml")]
    config: PathBuf,

    /// Log debug output, including every wrapped command line
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a shell command in the container and exit with its status
    Exec {
        /// Forward this process's stdin to the command
        #[arg(short = 'i', long)]
        stdin: bool,

        /// Command to run, joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Upload a local file into the container
    Push {
        /// Local file to read
        local: PathBuf,

        /// Destination path inside the container
        remote: String,
    },

    /// Download a file from the container
    Pull {
        /// Source path inside the container
        remote: String,

        /// Local file to write, or `-` for stdout
        local: String,
    },

    /// Upload a local directory tree into an existing container directory
    PushDir {
        /// Local directory to archive
        local: PathBuf,

        /// Destination directory inside the container
        remote: String,

        /// Leave out entries matching this tar pattern (repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// Download a directory from the container (not supported by lxc)
    PullDir {
        /// Source directory inside the container
        remote: String,

        /// Local destination directory
        local: PathBuf,
    },

    /// Print the container's runlevel once its init system answers
    Ready {
        /// Keep probing for up to this many seconds
        #[arg(short, long, default_value_t = 0)]
        wait: u64,
    },

    /// Validate configuration file
    Validate,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    smol::block_on(async {
        match cli.command {
            Commands::Exec { stdin, command } => {
                let code = commands::exec::run(&cli.config, &command.join(" "), stdin).await?;
                std::process::exit(code);
            }
            Commands::Push { local, remote } => {
                commands::push::run(&cli.config, &local, &remote).await
            }
            Commands::Pull { remote, local } => {
                commands::pull::run(&cli.config, &remote, &local).await
            }
            Commands::PushDir {
                local,
                remote,
                exclude,
            } => commands::push_dir::run(&cli.config, &local, &remote, &exclude).await,
            Commands::PullDir { remote, local } => {
                commands::pull_dir::run(&cli.config, &remote, &local).await
            }
            Commands::Ready { wait } => commands::ready::run(&cli.config, wait).await,
            Commands::Validate => commands::validate::run(&cli.config).await,
        }
    })
}
