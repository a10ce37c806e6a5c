//! A canned-response [`CommandInvoker`] for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::command::{CommandError, CommandErrorCause, CommandInvoker};

#[derive(Debug, Clone)]
enum Reply {
    Stdout(String),
    Exit(i32),
}

/// Answers invocations from a script keyed by the full command line
/// (`"show-backup main 20220203T120000"`), recording every call.
///
/// Unscripted invocations fail the way an unknown barman command does.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `subcommand args...` with `stdout` and a zero exit status.
    pub fn respond(mut self, subcommand: &str, args: &[&str], stdout: impl Into<String>) -> Self {
        self.replies
            .insert(command_line(subcommand, args), Reply::Stdout(stdout.into()));
        self
    }

    /// Make `subcommand args...` exit with `code`.
    pub fn fail(mut self, subcommand: &str, args: &[&str], code: i32) -> Self {
        self.replies
            .insert(command_line(subcommand, args), Reply::Exit(code));
        self
    }

    /// Command lines invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of invocations of `subcommand`, whatever the arguments.
    pub fn count(&self, subcommand: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.split(' ').next() == Some(subcommand))
            .count()
    }
}

fn command_line(subcommand: &str, args: &[&str]) -> String {
    std::iter::once(subcommand)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl CommandInvoker for ScriptedInvoker {
    async fn invoke(&self, subcommand: &str, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        let line = command_line(subcommand, args);
        self.calls.lock().push(line.clone());

        match self.replies.get(&line) {
            Some(Reply::Stdout(stdout)) => Ok(stdout.clone().into_bytes()),
            Some(Reply::Exit(code)) => Err(CommandError::new(
                subcommand,
                args,
                CommandErrorCause::Exit { code: Some(*code) },
            )),
            None => Err(CommandError::new(
                subcommand,
                args,
                CommandErrorCause::Exit { code: Some(1) },
            )),
        }
    }
}
