//! Child process plumbing shared by the snarkjs backend and the cast invoker.

use std::ffi::OsStr;
use std::io;

use tokio::process::Command;
use tracing::debug;

use crate::error::{BackendError, InvocationError};

#[derive(Debug)]
pub(crate) enum CommandError {
    Io(io::Error),
    Exit {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Run `program` to completion and return its stdout.
///
/// The child is killed if the returned future is dropped, so an outer
/// timeout does not leave a prover running.
pub(crate) async fn run<I, S>(program: &str, args: I) -> Result<String, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);
    debug!(program, "spawning command");
    let output = command.output().await.map_err(CommandError::Io)?;
    if !output.status.success() {
        return Err(CommandError::Exit {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl From<CommandError> for BackendError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Io(e) => Self::Io(e),
            CommandError::Exit {
                program,
                status,
                stderr,
            } => Self::Process {
                program,
                status,
                stderr,
            },
        }
    }
}

impl From<CommandError> for InvocationError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Io(e) => Self::Io(e),
            CommandError::Exit {
                program,
                status,
                stderr,
            } => Self::Process {
                program,
                status,
                stderr,
            },
        }
    }
}
