//! Type-safe external command execution
//!
//! Every external program the installer runs (`tar`, `unzip`, `dpkg`,
//! `dpkg-query`) goes through `run_command`. Arguments come from a struct
//! implementing `CommandArgs`, so flag spelling lives in exactly one place.
//!
//! Commands block until they exit. There is no timeout: a hung command hangs
//! the wizard.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use tracing::info;

/// Trait for typed command arguments.
///
/// # Contract
///
/// - `program()`: executable name, resolved through PATH.
/// - `to_cli_args()`: arguments exactly as the program expects them.
/// - `get_env_vars()`: extra environment variables (usually none).
pub trait CommandArgs {
    /// Executable to run (e.g. "tar").
    fn program(&self) -> &'static str;

    /// Convert struct fields to CLI arguments.
    fn to_cli_args(&self) -> Vec<String>;

    /// Extra environment variables for the child process.
    fn get_env_vars(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Run a command with typed arguments and capture its output.
///
/// # Returns
///
/// - `Ok(output)` - the command ran; check `output.success`
/// - `Err` - the command could not be spawned or waited on
pub fn run_command<T: CommandArgs>(args: &T) -> Result<CommandOutput> {
    let program = args.program();
    let cli_args = args.to_cli_args();
    let env_vars = args.get_env_vars();

    info!("run_command: {} args={:?} env={:?}", program, cli_args, env_vars);

    let mut cmd = Command::new(program);
    cmd.args(&cli_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in &env_vars {
        cmd.env(key, value);
    }

    let output = cmd
        .output()
        .with_context(|| format!("Failed to run command: {}", program))?;

    let result = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
        success: output.status.success(),
    };

    if result.success {
        info!("Command {} executed successfully", program);
    } else {
        info!(
            "Command {} failed with exit code {}",
            program,
            result.exit_code.unwrap_or(-1)
        );
    }
    Ok(result)
}

/// Output from a command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited with status 0.
    pub success: bool,
}

impl CommandOutput {
    /// Return an error describing the failure if the command did not succeed.
    pub fn ensure_success(&self, context: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            anyhow::bail!(
                "{} failed (exit code {}): {}",
                context,
                self.exit_code.unwrap_or(-1),
                self.stderr.trim()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    impl CommandArgs for Echo {
        fn program(&self) -> &'static str {
            "sh"
        }

        fn to_cli_args(&self) -> Vec<String> {
            vec!["-c".into(), self.0.into()]
        }

        fn get_env_vars(&self) -> Vec<(String, String)> {
            vec![("PKGWIZARD_TEST".into(), "value".into())]
        }
    }

    #[test]
    fn test_run_command_captures_output_and_env() {
        let output = run_command(&Echo("printf %s \"$PKGWIZARD_TEST\"")).unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "value");
        assert!(output.ensure_success("echo").is_ok());
    }

    #[test]
    fn test_run_command_reports_failure() {
        let output = run_command(&Echo("echo broken >&2; exit 3")).unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        let err = output.ensure_success("broken step").unwrap_err();
        assert_eq!(err.to_string(), "broken step failed (exit code 3): broken");
    }

    #[test]
    fn test_missing_program_is_error() {
        struct Missing;
        impl CommandArgs for Missing {
            fn program(&self) -> &'static str {
                "pkgwizard-no-such-program"
            }
            fn to_cli_args(&self) -> Vec<String> {
                Vec::new()
            }
        }
        assert!(run_command(&Missing).is_err());
    }
}
