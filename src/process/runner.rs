//! Process spawning.

use std::collections::HashMap;
use std::process::Stdio;

use tracing::debug;

use super::CommandResult;
use crate::error::FfprocError;
use crate::Result;

/// Spawns external processes for composed command lines.
///
/// The command line is tokenized on whitespace; the first token is the
/// program, the rest its arguments. The engine composes command lines as
/// `<resolved-binary-path> <caller-arguments>`, so the program token is
/// always an absolute path here.
pub struct ProcessRunner;

impl ProcessRunner {
    /// Spawn a process for async supervision.
    ///
    /// Stdout and stderr are piped for capture; the child is killed if the
    /// handle is dropped while still running.
    pub fn spawn(
        command_line: &str,
        env: Option<&HashMap<String, String>>,
    ) -> Result<tokio::process::Child> {
        let (program, args) = split_command(command_line)?;
        debug!(%program, "spawning process");

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(vars) = env {
            cmd.envs(vars);
        }

        Ok(cmd.spawn()?)
    }

    /// Spawn a process for blocking supervision on the calling thread.
    pub fn spawn_std(
        command_line: &str,
        env: Option<&HashMap<String, String>>,
    ) -> Result<std::process::Child> {
        let (program, args) = split_command(command_line)?;
        debug!(%program, "spawning process (blocking)");

        let mut cmd = std::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(vars) = env {
            cmd.envs(vars);
        }

        Ok(cmd.spawn()?)
    }

    /// Run a command to completion on the calling thread.
    pub fn run_blocking(
        command_line: &str,
        env: Option<&HashMap<String, String>>,
    ) -> Result<CommandResult> {
        let child = Self::spawn_std(command_line, env)?;
        let output = child.wait_with_output()?;
        Ok(CommandResult::from_status(
            output.status,
            &output.stdout,
            &output.stderr,
        ))
    }
}

fn split_command(command_line: &str) -> Result<(&str, std::str::SplitWhitespace<'_>)> {
    let mut tokens = command_line.split_whitespace();
    let program = tokens
        .next()
        .ok_or_else(|| FfprocError::InvalidArgument("command cannot be empty".into()))?;
    Ok((program, tokens))
}
