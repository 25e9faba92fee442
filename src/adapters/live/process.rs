//! Live command runner using `tokio::process`.

use std::process::Stdio;

use tokio::process::Command;

use crate::error::ToolError;
use crate::ports::command::{CommandFuture, CommandOutput, CommandRunner, Invocation};

/// Live command runner that spawns real child processes.
///
/// Children are killed when their future is dropped, so a timed-out or
/// cancelled call does not leave a stray process holding state locks.
pub struct LiveCommandRunner;

impl CommandRunner for LiveCommandRunner {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> CommandFuture<'a> {
        Box::pin(async move {
            let mut command = Command::new(&invocation.program);
            command
                .args(&invocation.args)
                .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .stdin(Stdio::null())
                .kill_on_drop(true);
            if let Some(dir) = &invocation.workdir {
                command.current_dir(dir);
            }

            let output = command.output().await.map_err(|source| ToolError::Spawn {
                program: invocation.program.display().to_string(),
                source,
            })?;

            let Some(exit_code) = output.status.code() else {
                return Err(ToolError::Terminated {
                    program: invocation.program.display().to_string(),
                    status: output.status.to_string(),
                });
            };
            Ok(CommandOutput {
                exit_code,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_echo_command() {
        let invocation = Invocation::new("sh").args(["-c", "echo hello"]);
        let result = LiveCommandRunner.run(&invocation).await.unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn captures_exit_code() {
        let invocation = Invocation::new("sh").args(["-c", "exit 42"]);
        let result = LiveCommandRunner.run(&invocation).await.unwrap();

        assert_eq!(result.exit_code, 42);
    }

    #[tokio::test]
    async fn runs_in_working_directory_with_env() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = Invocation::new("sh")
            .args(["-c", "pwd; echo \"$TF_IN_AUTOMATION\""])
            .current_dir(dir.path())
            .env("TF_IN_AUTOMATION", "1");
        let result = LiveCommandRunner.run(&invocation).await.unwrap();

        let mut lines = result.stdout.lines();
        let pwd = std::path::PathBuf::from(lines.next().unwrap());
        assert_eq!(pwd.canonicalize().unwrap(), dir.path().canonicalize().unwrap());
        assert_eq!(lines.next(), Some("1"));
    }

    #[tokio::test]
    async fn killed_process_is_terminated_error() {
        let invocation = Invocation::new("sh").args(["-c", "kill -9 $$"]);
        let err = LiveCommandRunner.run(&invocation).await.unwrap_err();

        assert!(matches!(err, ToolError::Terminated { ref program, .. } if program == "sh"));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let invocation = Invocation::new("/definitely/not/a/binary");
        let err = LiveCommandRunner.run(&invocation).await.unwrap_err();

        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
