//! Command-line interface for termhub.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Read timeout in milliseconds (overrides config file).
    pub timeout_ms: Option<i64>,
    /// Owning user's email address.
    pub user: Option<String>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                let timeout = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("timeout", value.clone()))?;
                result.timeout_ms = Some(timeout);
            }
            Short('u') | Long("user") => {
                result.user = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"termhub {version}
Line-oriented terminal shell over stdin/stdout

USAGE:
    termhub [OPTIONS]

OPTIONS:
    -c, --config <FILE>     Path to configuration file (JSON)
    -t, --timeout <MS>      Read timeout in milliseconds [default: 50]
    -u, --user <EMAIL>      User owning the session
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    TERMHUB_TIMEOUT_MS      Read timeout (overrides config)
    TERMHUB_USER            Session user (overrides config)
    TERMHUB_LOCALE          Session locale (overrides config)
    TERMHUB_LOG_LEVEL       Log level (overrides config)
    RUST_LOG                Alternative log level setting

COMMANDS:
    exit                    Close the session
    print <TEXT>            Print text
    println <TEXT>          Print text and a line ending
    printenv [NAMES..]      Print environment values
    setenv <NAME> <VALUE>   Set an environment value
    readline [MS]           Read one more line of input
    shell [MS]              Run a nested shell, print its exit code

    End a line with \ to continue it on the next line.

EXAMPLES:
    # Interactive session
    termhub -u alice@example.com

    # Scripted session
    printf 'println hello\nprintenv\n' | termhub
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("termhub {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ArgsError {
    /// Lexopt parsing error.
    #[error("{0}")]
    Lexopt(#[from] lexopt::Error),
    /// Invalid argument value.
    #[error("invalid value for --{0}: '{1}'")]
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    #[error("unexpected argument: '{0}'")]
    UnexpectedArgument(String),
}
