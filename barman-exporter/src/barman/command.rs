//! Execution of barman subcommands.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use process_utils::ProcessError;
use thiserror::Error;
use tracing::debug;

/// Output format flag passed to every barman invocation.
const OUTPUT_FORMAT_ARGS: [&str; 2] = ["-f", "json"];

/// A barman subcommand that failed to produce usable output.
#[derive(Debug, Error)]
#[error("barman {subcommand}{} failed: {cause}", display_args(.args))]
pub struct CommandError {
    pub subcommand: String,
    pub args: Vec<String>,
    #[source]
    pub cause: CommandErrorCause,
}

impl CommandError {
    pub fn new(subcommand: &str, args: &[&str], cause: impl Into<CommandErrorCause>) -> Self {
        Self {
            subcommand: subcommand.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cause: cause.into(),
        }
    }
}

fn display_args(args: &[String]) -> String {
    args.iter().fold(String::new(), |mut out, arg| {
        out.push(' ');
        out.push_str(arg);
        out
    })
}

#[derive(Debug, Error)]
pub enum CommandErrorCause {
    #[error("could not run barman: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("exited with {}", describe_exit(.code))]
    Exit { code: Option<i32> },

    #[error("invalid JSON output: {0}")]
    Decode(#[from] serde_json::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl From<ProcessError> for CommandErrorCause {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Spawn { source, .. } => Self::Spawn(source),
            exit @ ProcessError::Exit { .. } => Self::Exit {
                code: exit.exit_code(),
            },
        }
    }
}

/// Runs one barman subcommand and hands back its raw standard output.
///
/// Success is decided by the exit status alone; decoding is left to
/// [`BarmanClient`](super::BarmanClient).
#[async_trait]
pub trait CommandInvoker: Send + Sync {
    async fn invoke(&self, subcommand: &str, args: &[&str]) -> Result<Vec<u8>, CommandError>;
}

/// Invokes the real barman binary as a child process.
#[derive(Debug, Clone)]
pub struct BarmanProcess {
    binary: PathBuf,
}

impl BarmanProcess {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl CommandInvoker for BarmanProcess {
    async fn invoke(&self, subcommand: &str, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        let mut cmd = process_utils::tokio_command(&self.binary);
        cmd.args(OUTPUT_FORMAT_ARGS).arg(subcommand).args(args);

        debug!(binary = %self.binary.display(), subcommand, ?args, "Running barman");

        process_utils::capture_stdout(&mut cmd)
            .await
            .map_err(|e| CommandError::new(subcommand, args, e))
    }
}
