//! Terraform executor backed by the `terraform` CLI.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info};

use crate::error::{RunnerError, RunnerResult};
use crate::executor::{CommandOutput, TerraformExecutor};

/// Output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// CLI executor options.
#[derive(Debug, Clone)]
pub struct CliExecutorOptions {
    /// Path or name of the terraform binary
    pub terraform_bin: PathBuf,
    /// Dry-run mode (log commands without executing)
    pub dry_run: bool,
    /// Echo terraform output to the console while it runs
    pub stream_output: bool,
    /// Kill terraform after this many seconds (0 disables the timeout)
    pub timeout_seconds: u64,
    /// Extra environment variables for terraform
    pub env: HashMap<String, String>,
}

impl Default for CliExecutorOptions {
    fn default() -> Self {
        let mut env = HashMap::new();
        env.insert("TF_IN_AUTOMATION".to_string(), "1".to_string());
        Self {
            terraform_bin: PathBuf::from("terraform"),
            dry_run: false,
            stream_output: true,
            timeout_seconds: 0,
            env,
        }
    }
}

impl CliExecutorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terraform_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.terraform_bin = bin.into();
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.stream_output = false;
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Runs terraform as a child process.
pub struct CliExecutor {
    options: CliExecutorOptions,
}

impl CliExecutor {
    pub fn new(options: CliExecutorOptions) -> Self {
        Self { options }
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Format command for logging.
    fn format_command(&self, args: &[String]) -> String {
        self.options.format_command(args)
    }
}

impl CliExecutorOptions {
    fn format_command(&self, args: &[String]) -> String {
        let mut cmd = self.terraform_bin.display().to_string();
        for arg in args {
            if arg.contains(' ') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }

    /// Execute terraform and capture output, echoing lines as they arrive.
    fn execute_with_streaming(
        &self,
        working_dir: &Path,
        args: &[String],
    ) -> RunnerResult<(i64, String, String)> {
        let mut cmd = Command::new(&self.terraform_bin);
        cmd.args(args)
            .current_dir(working_dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Executing: {}", self.format_command(args));

        let mut child = cmd.spawn().map_err(|e| {
            RunnerError::SpawnFailed(format!("{}: {}", self.terraform_bin.display(), e))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::SpawnFailed("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::SpawnFailed("stderr was not captured".to_string()))?;

        let stdout_handle = collect_lines(stdout, LogStream::Stdout, self.stream_output);
        let stderr_handle = collect_lines(stderr, LogStream::Stderr, self.stream_output);

        let status = if self.timeout_seconds > 0 {
            let timeout = Duration::from_secs(self.timeout_seconds);
            let start = Instant::now();
            loop {
                match child.try_wait() {
                    Ok(Some(status)) => break status,
                    Ok(None) => {
                        if start.elapsed() > timeout {
                            let _ = child.kill();
                            // Reap the child so it does not linger as a zombie.
                            let _ = child.wait();
                            let _ = stdout_handle.join();
                            let _ = stderr_handle.join();
                            return Err(RunnerError::Timeout(self.timeout_seconds));
                        }
                        std::thread::sleep(Duration::from_millis(100));
                    }
                    Err(e) => {
                        return Err(RunnerError::SpawnFailed(format!(
                            "Failed to wait for terraform: {}",
                            e
                        )));
                    }
                }
            }
        } else {
            child.wait().map_err(|e| {
                RunnerError::SpawnFailed(format!("Failed to wait for terraform: {}", e))
            })?
        };

        let stdout_output = stdout_handle.join().unwrap_or_default();
        let stderr_output = stderr_handle.join().unwrap_or_default();

        Ok((status.code().unwrap_or(-1) as i64, stdout_output, stderr_output))
    }
}

/// Read `reader` line by line on a background thread.
fn collect_lines<R>(reader: R, stream: LogStream, echo: bool) -> JoinHandle<String>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut output = String::new();
        for line in BufReader::new(reader).lines().map_while(Result::ok) {
            if echo {
                match stream {
                    LogStream::Stdout => println!("{}", line),
                    LogStream::Stderr => eprintln!("{}", line),
                }
            }
            debug!(target: "modweave::terraform", "[{}] {}", stream, line);
            output.push_str(&line);
            output.push('\n');
        }
        output
    })
}

#[async_trait]
impl TerraformExecutor for CliExecutor {
    async fn is_available(&self) -> RunnerResult<bool> {
        Ok(Command::new(&self.options.terraform_bin)
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false))
    }

    async fn version(&self) -> RunnerResult<String> {
        let output = Command::new(&self.options.terraform_bin)
            .arg("version")
            .output()
            .map_err(|e| RunnerError::TerraformNotAvailable(e.to_string()))?;

        if !output.status.success() {
            return Err(RunnerError::TerraformNotAvailable(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    async fn run(&self, working_dir: &Path, args: &[String]) -> RunnerResult<CommandOutput> {
        let cmd_str = self.format_command(args);
        info!("Running: {}", cmd_str);

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute in {:?}: {}", working_dir, cmd_str);
            return Ok(CommandOutput {
                args: args.to_vec(),
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                started_at: Utc::now(),
                finished_at: Utc::now(),
                duration_ms: 0,
            });
        }

        let started_at = Utc::now();
        let options = self.options.clone();
        let dir = working_dir.to_path_buf();
        let argv = args.to_vec();
        let (exit_code, stdout, stderr) =
            tokio::task::spawn_blocking(move || options.execute_with_streaming(&dir, &argv))
                .await
                .map_err(|e| RunnerError::SpawnFailed(format!("terraform task panicked: {}", e)))??;
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        if exit_code == 0 {
            debug!("terraform {} completed in {}ms", args.join(" "), duration_ms);
        } else {
            error!(
                "terraform {} failed with exit code {} after {}ms",
                args.join(" "),
                exit_code,
                duration_ms
            );
        }

        Ok(CommandOutput {
            args: args.to_vec(),
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CliExecutorOptions::default();
        assert_eq!(options.terraform_bin, PathBuf::from("terraform"));
        assert!(!options.dry_run);
        assert_eq!(options.env.get("TF_IN_AUTOMATION"), Some(&"1".to_string()));
    }

    #[test]
    fn test_format_command_quotes_spaces() {
        let executor = CliExecutor::new(CliExecutorOptions::new().terraform_bin("/opt/tf"));
        let args = vec!["plan".to_string(), "-var=name=my app".to_string()];
        assert_eq!(executor.format_command(&args), "/opt/tf plan '-var=name=my app'");
    }

    #[tokio::test]
    async fn test_dry_run_does_not_execute() {
        let executor = CliExecutor::new(
            CliExecutorOptions::new()
                .terraform_bin("/nonexistent/terraform")
                .dry_run(),
        );
        assert!(executor.is_dry_run());

        let output = executor
            .run(Path::new("."), &["init".to_string()])
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.args, vec!["init"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_long_running_command() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CliExecutor::new(
            CliExecutorOptions::new()
                .terraform_bin("sleep")
                .timeout(1)
                .quiet(),
        );

        let start = Instant::now();
        let result = executor.run(dir.path(), &["30".to_string()]).await;

        assert!(matches!(result, Err(RunnerError::Timeout(1))));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CliExecutor::new(
            CliExecutorOptions::new()
                .terraform_bin("sh")
                .timeout(10)
                .quiet(),
        );

        let args = vec!["-c".to_string(), "echo planned; echo oops >&2; exit 3".to_string()];
        let output = executor.run(dir.path(), &args).await.unwrap();

        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout, "planned\n");
        assert_eq!(output.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_spawn() {
        let executor = CliExecutor::new(
            CliExecutorOptions::new()
                .terraform_bin("/nonexistent/terraform")
                .quiet(),
        );

        assert!(!executor.is_available().await.unwrap());
        let result = executor.run(Path::new("."), &["init".to_string()]).await;
        assert!(matches!(result, Err(RunnerError::SpawnFailed(_))));
    }
}
