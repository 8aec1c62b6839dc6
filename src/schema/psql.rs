//! `psql` subprocess runner with a hard timeout

use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};

use crate::config::DatabaseSettings;
use crate::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Executes a SQL file against the database as one batch.
pub trait SqlRunner {
    /// Human-readable target, e.g. `postgres.abc@host:6543/postgres`.
    fn describe(&self) -> String;

    /// Run the file; returns captured stdout on success.
    fn run_file(&self, path: &Path) -> Result<String>;
}

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run `cmd` to completion, killing it once `timeout` elapses.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let program = cmd.get_program().to_string_lossy().to_string();
    let mut child = cmd
        .spawn()
        .map_err(|e| Error::Migration(format!("could not start {}: {}", program, e)))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            let diagnostics = stderr.recv_timeout(DRAIN_GRACE).unwrap_or_default();
            let mut message = format!("{} timed out after {}s", program, timeout.as_secs_f32());
            if !diagnostics.trim().is_empty() {
                message.push_str(": ");
                message.push_str(diagnostics.trim());
            }
            return Err(Error::Migration(message));
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        status,
        stdout: stdout.recv_timeout(DRAIN_GRACE).unwrap_or_default(),
        stderr: stderr.recv_timeout(DRAIN_GRACE).unwrap_or_default(),
    })
}

// Pipes are read on their own threads so a full pipe never stalls the child.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = channel::bounded(1);
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

pub struct PsqlRunner {
    program: String,
    host: String,
    port: u16,
    user: String,
    database: String,
    password: String,
    timeout: Duration,
}

impl PsqlRunner {
    pub fn new(db: &DatabaseSettings, password: &str) -> Self {
        Self {
            program: "psql".to_string(),
            host: db.host.clone(),
            port: db.port,
            user: db.user.clone(),
            database: db.name.clone(),
            password: password.to_string(),
            timeout: db.timeout,
        }
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    /// The file runs in one transaction and the first failing statement
    /// aborts it with a non-zero exit.
    pub fn args(&self, path: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "ON_ERROR_STOP=1".to_string(),
            "--single-transaction".to_string(),
            "-h".to_string(),
            self.host.clone(),
            "-p".to_string(),
            self.port.to_string(),
            "-U".to_string(),
            self.user.clone(),
            "-d".to_string(),
            self.database.clone(),
            "-f".to_string(),
            path.display().to_string(),
        ]
    }
}

impl SqlRunner for PsqlRunner {
    fn describe(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }

    fn run_file(&self, path: &Path) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(path)).env("PGPASSWORD", &self.password);

        tracing::info!("Running {} against {}", self.program, self.describe());
        let output = run_with_timeout(cmd, self.timeout)?;
        if !output.status.success() {
            return Err(Error::Migration(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn db() -> DatabaseSettings {
        DatabaseSettings {
            host: "db.example".to_string(),
            port: 6543,
            user: "postgres.abc".to_string(),
            name: "postgres".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_psql_args() {
        let runner = PsqlRunner::new(&db(), "pw");
        let args = runner.args(&PathBuf::from("supabase/migrations/004_reference_texts.sql"));
        assert_eq!(
            args,
            vec![
                "-v", "ON_ERROR_STOP=1", "--single-transaction",
                "-h", "db.example", "-p", "6543", "-U", "postgres.abc", "-d", "postgres", "-f",
                "supabase/migrations/004_reference_texts.sql",
            ]
        );
        assert_eq!(runner.describe(), "postgres.abc@db.example:6543/postgres");
    }

    #[test]
    fn test_missing_program() {
        let runner = PsqlRunner::new(&db(), "pw").with_program("quizseed-no-such-psql");
        let err = runner.run_file(&PathBuf::from("x.sql")).unwrap_err();
        assert!(matches!(err, Error::Migration(ref msg) if msg.contains("could not start")));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_output() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo created; echo notice >&2"]);
        let output = run_with_timeout(cmd, Duration::from_secs(10)).unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "created");
        assert_eq!(output.stderr.trim(), "notice");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exec sleep 5"]);
        let started = Instant::now();
        let err = run_with_timeout(cmd, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, Error::Migration(ref msg) if msg.contains("timed out")));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_keeps_diagnostics() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo 'could not connect to server' >&2; exec sleep 5"]);
        let err = run_with_timeout(cmd, Duration::from_millis(500)).unwrap_err();
        assert!(matches!(
            err,
            Error::Migration(ref msg) if msg.contains("timed out") && msg.contains("could not connect to server")
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure() {
        let runner = PsqlRunner::new(&db(), "pw").with_program("false");
        let err = runner.run_file(&PathBuf::from("x.sql")).unwrap_err();
        assert!(matches!(err, Error::Migration(ref msg) if msg.contains("exited with")));
    }
}
