//! termhub binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use termhub::cli::{self, Args};
use termhub::config::Config;
use termhub::session::{Environment, Evaluator, IdSource, Principal, SequentialIds, Session};
use termhub::{
    logging, system, AccessFilteredRegistry, Builtins, Registry, SessionRegistry, ShellEngine,
};
use tokio::runtime::{Handle, Runtime};
use tracing::{error, info};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'termhub --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Ignore error if already initialized
    let _ = logging::try_init_with(config.log_filter());

    info!("termhub v{}", env!("CARGO_PKG_VERSION"));

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(run(config));
    // a pending stdin read cannot be cancelled, don't wait for it
    runtime.shutdown_background();

    match outcome {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            error!("shell failed: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<Config, BoxError> {
    let config = Config::load(args)?;
    // fail early on values only checked when the session starts
    config.to_environment()?;
    ShellEngine::new(config.shell.read_timeout_ms)?;
    Ok(config)
}

async fn run(config: Config) -> Result<i32, BoxError> {
    let engine = ShellEngine::new(config.shell.read_timeout_ms)?;
    let environment = config.to_environment()?;
    let owner = config.user();

    let handle = Handle::current();
    let evaluator: Arc<dyn Evaluator> = Arc::new(Builtins::new());
    let ids = SequentialIds::new();
    let registry = SessionRegistry::new(
        move |environment: Environment| -> termhub::Result<Session> {
            system::stdio_session(ids.next_id(), Arc::clone(&evaluator), environment, &handle)
        },
    );
    let registry = AccessFilteredRegistry::new(registry, move |user: Option<&Principal>| {
        user == owner.as_ref()
    });

    let session = registry.create_from_environment(environment)?;
    info!(session = %session.id(), "session started");

    let shell = session.clone();
    let code = tokio::task::spawn_blocking(move || engine.run(&shell)).await??;

    registry.remove(session.id())?;
    info!(session = %session.id(), code, "session finished");
    Ok(code)
}
