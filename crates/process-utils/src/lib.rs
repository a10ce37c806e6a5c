//! Small process-related helpers shared across the workspace.

use std::ffi::OsStr;
use std::process::ExitStatus;

use thiserror::Error;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

/// Failure to obtain the standard output of a child process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be started or waited on.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but did not exit successfully.
    #[error("{program} exited with {status}")]
    Exit { program: String, status: ExitStatus },
}

impl ProcessError {
    /// Exit code of the child, if it exited normally with a failure code.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { status, .. } => status.code(),
            Self::Spawn { .. } => None,
        }
    }
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd
}

/// Run `cmd` to completion and return its standard output.
///
/// Standard error is discarded. Only the exit status decides success.
#[cfg(feature = "tokio")]
pub async fn capture_stdout(cmd: &mut tokio::process::Command) -> Result<Vec<u8>, ProcessError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();

    let output = cmd
        .stdin(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .output()
        .await
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProcessError::Exit {
            program,
            status: output.status,
        });
    }

    Ok(output.stdout)
}
