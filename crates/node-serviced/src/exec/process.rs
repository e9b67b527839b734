//! [`ProcessRunner`]: the production [`CommandRunner`] backed by `tokio::process`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CommandRunner, ExecError};

/// Spawns the program as a child process of the agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<(), ExecError> {
        let io_err = |source| ExecError::Io {
            program: program.to_owned(),
            source,
        };

        debug!(program, ?args, "spawning command");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(io_err)?;

        let mut stderr_pipe = child.stderr.take();
        let collect_stderr = async {
            let mut buf = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        };

        let waited =
            tokio::time::timeout(timeout, async { tokio::try_join!(child.wait(), collect_stderr) })
                .await;

        let (status, stderr) = match waited {
            Ok(res) => res.map_err(io_err)?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(program, error = %e, "failed to kill timed-out command");
                }
                return Err(ExecError::TimedOut {
                    program: program.to_owned(),
                    timeout,
                });
            }
        };

        if status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        match status.code() {
            Some(code) => Err(ExecError::Exited {
                program: program.to_owned(),
                code,
                stderr,
            }),
            None => Err(ExecError::Terminated {
                program: program.to_owned(),
                stderr,
            }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::exec::GENERIC_EXIT_CODE;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".into(), script.into()]
    }

    const DEADLINE: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn success_returns_ok() {
        let res = ProcessRunner.run("sh", &sh("exit 0"), DEADLINE).await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn failure_reports_code_and_stderr_only() {
        let err = ProcessRunner
            .run("sh", &sh("echo to-stdout; echo to-stderr >&2; exit 3"), DEADLINE)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.stderr(), "to-stderr\n");
    }

    #[tokio::test]
    async fn stderr_with_escapes_is_preserved() {
        let err = ProcessRunner
            .run(
                "sh",
                &sh(r"printf '\033[31mversion not found\033[0m' >&2; exit 1"),
                DEADLINE,
            )
            .await
            .unwrap_err();
        assert_eq!(err.stderr(), "\x1b[31mversion not found\x1b[0m");
    }

    #[tokio::test]
    async fn missing_program_is_generic_failure() {
        let err = ProcessRunner
            .run("definitely-not-a-real-binary-7f3a", &[], DEADLINE)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Io { .. }));
        assert_eq!(err.exit_code(), GENERIC_EXIT_CODE);
    }

    #[tokio::test]
    async fn signal_termination_is_generic_failure() {
        let err = ProcessRunner
            .run("sh", &sh("kill -9 $$"), DEADLINE)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Terminated { .. }));
        assert_eq!(err.exit_code(), GENERIC_EXIT_CODE);
    }

    #[tokio::test]
    async fn deadline_kills_the_child() {
        let started = Instant::now();
        let err = ProcessRunner
            .run("sleep", &["30".to_string()], Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// Gone or zombie. Zombies still answer `kill -0`, so read the state.
    #[cfg(target_os = "linux")]
    fn is_running(pid: u32) -> bool {
        let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
            return false;
        };
        let state = stat.rsplit(')').next().unwrap_or("").trim_start();
        !(state.starts_with('Z') || state.starts_with('X'))
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn dropping_the_call_kills_the_child() {
        let dir = tempfile::TempDir::new().unwrap();
        let pid_file = dir.path().join("child.pid");
        let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());

        let dropped = tokio::time::timeout(
            Duration::from_millis(500),
            ProcessRunner.run("sh", &sh(&script), DEADLINE),
        )
        .await;
        assert!(dropped.is_err(), "command should still be running");

        let pid: u32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();

        let started = Instant::now();
        while is_running(pid) {
            assert!(
                started.elapsed() < Duration::from_secs(5),
                "child {pid} outlived the dropped call"
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
