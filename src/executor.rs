//! Privileged command execution.
//!
//! Every side effect the installer has on the host goes through a
//! `CommandRunner`. The production runner, `PrivilegedExecutor`, spawns the
//! command in its own process group, registers the PID with the global
//! `ChildRegistry`, captures stdout/stderr and logs the command before it
//! runs.
//!
//! # Privilege Escalation
//!
//! - `Escalation::None`: the installer already runs as root
//! - `Escalation::Sudo`: before each command the credential cache is
//!   refreshed with `sudo -S -p '' -v`, which alone receives the password on
//!   stdin. The command itself then runs as `sudo -n -- <cmd>` and its stdin
//!   carries only the command's own payload, whether or not sudo prompts.
//!
//! Stdin payloads can carry passwords; they are never logged.

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::error::{InstallError, Result};
use crate::process_guard::{ChildRegistry, CommandProcessGroup};

/// One external command: program, arguments and optional stdin payload.
#[derive(Clone, PartialEq, Eq)]
pub struct SystemCommand {
    program: String,
    args: Vec<String>,
    stdin: Option<String>,
    capture_stdout: bool,
}

impl SystemCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            capture_stdout: true,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `input` to the command's stdin
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Send stdout to /dev/null instead of capturing it
    pub fn discard_stdout(mut self) -> Self {
        self.capture_stdout = false;
        self
    }

    /// `tee <path>` with `contents` on stdin: create or replace a file.
    pub fn write_file(path: &str, contents: impl Into<String>) -> Self {
        Self::new("tee").arg(path).stdin(contents).discard_stdout()
    }

    /// `tee -a <path>` with `contents` on stdin: append to a file.
    pub fn append_file(path: &str, contents: impl Into<String>) -> Self {
        Self::new("tee")
            .args(["-a", path])
            .stdin(contents)
            .discard_stdout()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn stdin_payload(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    pub fn captures_stdout(&self) -> bool {
        self.capture_stdout
    }

    /// Argument vector, program first
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for SystemCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_words::join(self.argv()))
    }
}

// Debug goes to logs too, so it mirrors Display and only sizes the payload
impl fmt::Debug for SystemCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemCommand")
            .field("argv", &self.argv())
            .field("stdin_bytes", &self.stdin.as_ref().map(String::len))
            .finish()
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated by signal)
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            success: false,
        }
    }

    /// Map a non-zero exit into `InstallError::CommandFailed`.
    pub fn ensure_success(&self, command: &SystemCommand) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(InstallError::CommandFailed {
                command: command.to_string(),
                exit_code: self.exit_code.unwrap_or(-1),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs external commands. The single seam between the installer and the OS.
pub trait CommandRunner {
    /// Run a command to completion and capture its output. A non-zero exit
    /// is reported in the output, not as an error.
    fn run(&mut self, command: &SystemCommand) -> Result<CommandOutput>;

    /// Run a command and fail on non-zero exit.
    fn run_checked(&mut self, command: &SystemCommand) -> Result<CommandOutput> {
        let output = self.run(command)?;
        output.ensure_success(command)?;
        Ok(output)
    }

    /// Run a command attached to the user's terminal.
    fn run_interactive(&mut self, command: &SystemCommand) -> Result<()> {
        self.run_checked(command).map(|_| ())
    }
}

/// How commands obtain root privileges.
pub enum Escalation {
    /// Already running as root
    None,
    /// Run through sudo, feeding this password on stdin
    Sudo { password: Zeroizing<String> },
}

impl fmt::Debug for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Sudo { .. } => write!(f, "Sudo {{ password: <redacted> }}"),
        }
    }
}

/// Production `CommandRunner` that spawns real processes.
#[derive(Debug)]
pub struct PrivilegedExecutor {
    escalation: Escalation,
    /// Program (plus leading arguments) that provides sudo
    sudo_argv: Vec<String>,
}

impl PrivilegedExecutor {
    /// Executor for a process that already has root privileges
    pub fn as_root() -> Self {
        Self {
            escalation: Escalation::None,
            sudo_argv: vec!["sudo".to_string()],
        }
    }

    /// Executor that escalates through sudo.
    ///
    /// The password is checked once with `sudo -k -S -v` so a typo fails
    /// before any disk is touched.
    pub fn with_sudo(password: Zeroizing<String>) -> Result<Self> {
        let mut executor = Self {
            escalation: Escalation::Sudo { password },
            sudo_argv: vec!["sudo".to_string()],
        };
        executor.validate_password()?;
        Ok(executor)
    }

    fn validate_password(&mut self) -> Result<()> {
        let check = SystemCommand::new("sudo").args(["-k", "-v"]);
        let mut process = self.sudo();
        process.args(["-k", "-S", "-p", "", "-v"]);
        let input = self.password_line();
        let output = self.spawn_and_wait(&check, process, input)?;
        if !output.success {
            return Err(InstallError::NotRoot);
        }
        info!("sudo credentials validated");
        Ok(())
    }

    /// Refresh the sudo timestamp so the next `sudo -n` call is authorized.
    /// The password line goes to this call only; a sudo that does not prompt
    /// leaves it unread.
    fn refresh_credentials(&mut self) -> Result<()> {
        if !self.uses_sudo() {
            return Ok(());
        }
        let refresh = SystemCommand::new("sudo").arg("-v");
        let mut process = self.sudo();
        process.args(["-S", "-p", "", "-v"]);
        let input = self.password_line();
        let output = self.spawn_and_wait(&refresh, process, input)?;
        output.ensure_success(&refresh)
    }

    /// True when commands run through sudo
    pub fn uses_sudo(&self) -> bool {
        matches!(self.escalation, Escalation::Sudo { .. })
    }

    fn build(&self, command: &SystemCommand) -> Command {
        match self.escalation {
            Escalation::None => {
                let mut process = Command::new(command.program());
                process.args(command.arguments());
                process
            }
            Escalation::Sudo { .. } => {
                let mut process = self.sudo();
                process
                    .args(["-n", "--", command.program()])
                    .args(command.arguments());
                process
            }
        }
    }

    fn sudo(&self) -> Command {
        let mut argv = self.sudo_argv.iter();
        let mut process = Command::new(argv.next().map_or("sudo", String::as_str));
        process.args(argv);
        process
    }

    fn password_line(&self) -> Option<Zeroizing<String>> {
        match &self.escalation {
            Escalation::None => None,
            Escalation::Sudo { password } => {
                let mut line = Zeroizing::new(String::with_capacity(password.len() + 1));
                line.push_str(password);
                line.push('\n');
                Some(line)
            }
        }
    }

    fn spawn_and_wait(
        &mut self,
        command: &SystemCommand,
        mut process: Command,
        input: Option<Zeroizing<String>>,
    ) -> Result<CommandOutput> {
        process
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(if command.captures_stdout() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped())
            .in_new_process_group();

        let mut child = process.spawn().map_err(|source| InstallError::Spawn {
            command: command.to_string(),
            source,
        })?;
        let pid = child.id();
        ChildRegistry::track(pid);

        // Feed stdin from a separate thread so a chatty child cannot fill
        // its output pipe while we block on the write
        let writer = match (child.stdin.take(), input) {
            (Some(mut pipe), Some(data)) => Some(thread::spawn(move || {
                pipe.write_all(data.as_bytes())
            })),
            _ => None,
        };

        let waited = child.wait_with_output();
        ChildRegistry::release(pid);

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    warn!("Failed writing stdin for {}: {}", command, e);
                }
                Err(_) => warn!("stdin writer thread panicked for {}", command),
                _ => {}
            }
        }

        let output = waited?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        })
    }
}

impl CommandRunner for PrivilegedExecutor {
    fn run(&mut self, command: &SystemCommand) -> Result<CommandOutput> {
        info!("[EXEC] {}", command);
        if let Some(payload) = command.stdin_payload() {
            debug!("[EXEC] stdin: {} byte(s)", payload.len());
        }

        self.refresh_credentials()?;
        let process = self.build(command);
        let input = command
            .stdin_payload()
            .map(|payload| Zeroizing::new(payload.to_string()));
        let output = self.spawn_and_wait(command, process, input)?;

        if !output.stdout.trim().is_empty() {
            debug!("[OUT] {}", output.stdout.trim_end());
        }
        if !output.stderr.trim().is_empty() {
            debug!("[ERR] {}", output.stderr.trim_end());
        }
        if !output.success {
            error!(
                "Command failed with exit code {}: {}",
                output.exit_code.unwrap_or(-1),
                command
            );
        }
        Ok(output)
    }

    fn run_interactive(&mut self, command: &SystemCommand) -> Result<()> {
        info!("[EXEC] {} (interactive)", command);

        // The terminal stays attached to the command, so sudo must not prompt
        self.refresh_credentials()?;
        let mut process = self.build(command);

        let status = process.status().map_err(|source| InstallError::Spawn {
            command: command.to_string(),
            source,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(InstallError::CommandFailed {
                command: command.to_string(),
                exit_code: status.code().unwrap_or(-1),
                stderr: String::new(),
            })
        }
    }
}
