use azsp_bootstrap::cache::DEFAULT_CACHE_FILE;
use azsp_bootstrap::compose::{DEFAULT_PROGRAM, DEFAULT_PROJECT, DEFAULT_SERVICE};
use azsp_bootstrap::tasks::Context;
use azsp_bootstrap::{config, logging, CacheFile, CacheWrite, Compose, Policy, SystemRunner};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "azsp-bootstrap",
    about = "Bootstrap an Azure AD service principal for non-interactive tooling",
    version
)]
struct Cli {
    /// How directory objects are ensured: `reuse` or `explicit`.
    #[arg(long, env = "AZSP_POLICY", default_value = "reuse", global = true)]
    policy: Policy,

    /// Container orchestration executable.
    #[arg(long, env = "AZSP_COMPOSE", default_value = DEFAULT_PROGRAM, global = true)]
    compose: String,

    /// Compose project name.
    #[arg(long, env = "AZSP_PROJECT_NAME", default_value = DEFAULT_PROJECT, global = true)]
    project_name: String,

    /// Compose service running the Azure CLI.
    #[arg(long, env = "AZSP_SERVICE", default_value = DEFAULT_SERVICE, global = true)]
    service: String,

    /// Where resolved identifiers are cached.
    #[arg(long, env = "AZSP_CACHE_FILE", default_value = DEFAULT_CACHE_FILE, global = true)]
    cache_file: PathBuf,

    /// Also append log output to this file.
    #[arg(long, env = "AZSP_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Log at debug level (ignored when RUST_LOG is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that docker-compose is installed and AZURE_* variables are set.
    Prerequisites,
    /// Pull the Azure CLI container image.
    Containerpull,
    /// Check prerequisites, pull, start the container and log in.
    Containerup,
    /// Run containerup, then ensure the service principal and update the cache.
    Bootstrap {
        /// Role granted to a newly created principal (reuse policy only, default Reader).
        #[arg(long)]
        role: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    if let Err(e) = logging::init(level, cli.log_file.as_deref()) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    let ctx = Context {
        runner: &SystemRunner,
        compose: Compose::default()
            .with_program(cli.compose)
            .with_project(cli.project_name)
            .with_service(cli.service),
        policy: cli.policy,
        cache: CacheFile::new(&cli.cache_file),
        env: config::process_env(),
    };

    let result = match cli.command {
        Command::Prerequisites => ctx.prerequisites().await.map(|_| ()),
        Command::Containerpull => ctx.container_pull().await,
        Command::Containerup => ctx.container_up().await.map(|_| ()),
        Command::Bootstrap { role } => ctx.bootstrap(role.as_deref()).await.and_then(|outcome| {
            println!("{}", outcome.record.redacted().to_pretty_json()?);
            if outcome.cache != CacheWrite::Skipped {
                info!("Bootstrap record cached in {}", ctx.cache.path().display());
            }
            Ok(())
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
