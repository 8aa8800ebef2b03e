//! External text-to-speech command (macOS `say`, `espeak`, ...).
//!
//! The executable takes no arguments and reads UTF-8 text on stdin. Only its
//! exit status is interpreted.

use std::{
    process::{ExitStatus, Stdio},
    time::Duration,
};

use {
    async_trait::async_trait,
    murmur_config::MurmurConfig,
    tokio::{
        io::AsyncWriteExt,
        process::{Child, ChildStdin, Command},
        sync::Mutex,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::{error::SpeechError, tts::Speaker};

/// Runs one process per utterance, one at a time.
pub struct CommandSpeaker {
    command: String,
    timeout: Duration,
    /// Held for the whole life of a process.
    turn: Mutex<()>,
}

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

impl CommandSpeaker {
    #[must_use]
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
            turn: Mutex::new(()),
        }
    }

    pub fn from_config(config: &MurmurConfig) -> murmur_config::Result<Self> {
        Ok(Self::new(config.command(), config.timeout()?))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn io_error(&self, stage: &'static str, source: std::io::Error) -> SpeechError {
        SpeechError::Io {
            command: self.command.clone(),
            stage,
            source,
        }
    }

    /// Kill the process and wait for it so nothing is left behind.
    async fn terminate(&self, child: &mut Child) {
        if let Err(e) = child.start_kill() {
            debug!(command = %self.command, error = %e, "kill failed, process may have exited");
        }
        match child.wait().await {
            Ok(status) => debug!(command = %self.command, %status, "speech process reaped"),
            Err(e) => warn!(command = %self.command, error = %e, "failed to reap speech process"),
        }
    }
}

/// Stream `text` into stdin, close it, then wait for exit.
async fn feed_and_wait(
    child: &mut Child,
    stdin: Option<ChildStdin>,
    text: &str,
) -> std::io::Result<ExitStatus> {
    if let Some(mut stdin) = stdin {
        stdin.write_all(text.as_bytes()).await?;
        stdin.shutdown().await?;
    }
    child.wait().await
}

#[async_trait]
impl Speaker for CommandSpeaker {
    fn id(&self) -> &str {
        &self.command
    }

    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<(), SpeechError> {
        let _turn = self.turn.lock().await;

        // Resolved per job so a PATH change is picked up without a restart.
        let program = which::which(&self.command).map_err(|_| SpeechError::NotInstalled {
            command: self.command.clone(),
        })?;

        let mut child = Command::new(&program)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.io_error("spawn", e))?;
        let stdin = child.stdin.take();
        debug!(
            command = %self.command,
            pid = child.id(),
            bytes = text.len(),
            "speech process started"
        );

        let outcome = tokio::select! {
            result = feed_and_wait(&mut child, stdin, text) => Outcome::Exited(result),
            () = tokio::time::sleep(self.timeout) => Outcome::TimedOut,
            () = cancel.cancelled() => Outcome::Cancelled,
        };

        match outcome {
            Outcome::Exited(Ok(status)) if status.success() => Ok(()),
            Outcome::Exited(Ok(status)) => Err(SpeechError::Failed {
                command: self.command.clone(),
                status,
            }),
            Outcome::Exited(Err(e)) => {
                self.terminate(&mut child).await;
                Err(self.io_error("write/wait", e))
            },
            Outcome::TimedOut => {
                self.terminate(&mut child).await;
                Err(SpeechError::Timeout {
                    command: self.command.clone(),
                    timeout: self.timeout,
                })
            },
            Outcome::Cancelled => {
                self.terminate(&mut child).await;
                Err(SpeechError::Cancelled {
                    command: self.command.clone(),
                })
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests {
    use {
        super::*,
        std::{path::Path, sync::Arc, time::Instant},
    };

    fn sh(timeout: Duration) -> CommandSpeaker {
        CommandSpeaker::new("sh", timeout)
    }

    /// `sh` reads its script from stdin, so the utterance doubles as a script.
    fn pid_script(pidfile: &Path) -> String {
        format!("echo $$ > {}\nexec sleep 30\n", pidfile.display())
    }

    fn read_pid(pidfile: &Path) -> u32 {
        std::fs::read_to_string(pidfile)
            .unwrap()
            .trim()
            .parse()
            .unwrap()
    }

    #[cfg(target_os = "linux")]
    fn assert_gone(pid: u32) {
        assert!(
            !Path::new(&format!("/proc/{pid}")).exists(),
            "process {pid} still in the process table"
        );
    }

    #[cfg(not(target_os = "linux"))]
    fn assert_gone(_pid: u32) {}

    #[tokio::test]
    async fn text_is_streamed_to_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("spoken.txt");
        let script = format!("printf '%s' 'hello from stdin' > {}\n", out.display());
        sh(Duration::from_secs(10))
            .speak(&script, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "hello from stdin");
    }

    #[tokio::test]
    async fn large_input_is_fully_consumed() {
        let text = "murmur ".repeat(200_000);
        CommandSpeaker::new("cat", Duration::from_secs(10))
            .speak(&text, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_command_is_not_installed() {
        let err = CommandSpeaker::new("definitely-not-a-real-binary-xyz123", Duration::from_secs(1))
            .speak("hi", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::NotInstalled { .. }), "{err}");
        assert!(err.to_string().contains("not installed"));
    }

    #[tokio::test]
    async fn command_is_looked_up_for_every_job() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("speak-later");
        let speaker = CommandSpeaker::new(program.display().to_string(), Duration::from_secs(10));
        let cancel = CancellationToken::new();

        let err = speaker.speak("hi", &cancel).await.unwrap_err();
        assert!(matches!(err, SpeechError::NotInstalled { .. }), "{err}");

        std::fs::write(&program, "#!/bin/sh\ncat > /dev/null\n").unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        // A sibling test forking while the script was open for writing makes
        // exec fail with ETXTBSY until that child execs.
        let mut attempts = 0;
        loop {
            match speaker.speak("hi", &cancel).await {
                Ok(()) => break,
                Err(SpeechError::Io { .. }) if attempts < 20 => {
                    attempts += 1;
                    tokio::time::sleep(Duration::from_millis(50)).await;
                },
                Err(e) => panic!("installed command failed: {e}"),
            }
        }
    }

    #[tokio::test]
    async fn nonzero_exit_is_failure() {
        let err = sh(Duration::from_secs(10))
            .speak("exit 3\n", &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            SpeechError::Failed { status, .. } => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn timeout_kills_and_reaps() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let started = Instant::now();

        let err = sh(Duration::from_millis(500))
            .speak(&pid_script(&pidfile), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SpeechError::Timeout { .. }), "{err}");
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_gone(read_pid(&pidfile));
    }

    #[tokio::test]
    async fn cancellation_kills_and_reaps() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let err = sh(Duration::from_secs(30))
            .speak(&pid_script(&pidfile), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled(), "{err}");
        assert_gone(read_pid(&pidfile));
    }

    #[tokio::test]
    async fn invocations_do_not_overlap() {
        let speaker = Arc::new(sh(Duration::from_secs(10)));
        let started = Instant::now();

        let a = {
            let speaker = Arc::clone(&speaker);
            tokio::spawn(async move {
                speaker
                    .speak("sleep 0.3\n", &CancellationToken::new())
                    .await
            })
        };
        let b = {
            let speaker = Arc::clone(&speaker);
            tokio::spawn(async move {
                speaker
                    .speak("sleep 0.3\n", &CancellationToken::new())
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert!(started.elapsed() >= Duration::from_millis(600));
    }

    #[test]
    fn from_config_uses_effective_values() {
        let speaker = CommandSpeaker::from_config(&MurmurConfig {
            command: "espeak".into(),
            timeout: "45s".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(speaker.id(), "espeak");
        assert_eq!(speaker.timeout(), Duration::from_secs(45));
    }
}
