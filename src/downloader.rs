use std::{
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, Command},
    sync::{mpsc::UnboundedSender, oneshot},
};
use tracing::{debug, info, warn};

use crate::error::DownloadError;
use crate::model::{DownloadOutcome, OutputLine, OutputStream};

/// Names tried, in order, when looking for yt-dlp on PATH
pub const EXECUTABLE_NAMES: [&str; 2] = ["yt-dlp", "yt-dlp.exe"];

/// Messages from the worker task to the UI thread
#[derive(Debug)]
pub enum WorkerEvent {
    /// One line of child output
    Output(OutputLine),
    /// A stop request reached the running process
    Stopping,
    /// The run is over; always the last event
    Finished(DownloadOutcome),
}

/// Resolves yt-dlp through the PATH
pub fn find_executable() -> Option<PathBuf> {
    EXECUTABLE_NAMES
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Runs one download to completion, relaying output through `events`.
/// Resolving `cancel` sends a graceful termination signal to the child.
pub async fn spawn_download(
    program: PathBuf,
    args: Vec<String>,
    events: UnboundedSender<WorkerEvent>,
    cancel: oneshot::Receiver<()>,
) {
    let outcome = match supervise(&program, &args, &events, cancel).await {
        Ok(status) => classify_exit(status),
        Err(err) => DownloadOutcome::Error(err),
    };
    info!(program = %program.display(), ?outcome, "download finished");
    let _ = events.send(WorkerEvent::Finished(outcome));
}

async fn supervise(
    program: &Path,
    args: &[String],
    events: &UnboundedSender<WorkerEvent>,
    mut cancel: oneshot::Receiver<()>,
) -> Result<ExitStatus, DownloadError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = command.spawn().map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DownloadError::ExecutableNotFound(program.display().to_string())
        } else {
            DownloadError::Spawn {
                program: program.display().to_string(),
                source,
            }
        }
    })?;
    info!(pid = ?child.id(), "spawned {}", program.display());

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::Unexpected("stdout was not captured".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::Unexpected("stderr was not captured".into()))?;
    let mut out_lines = BufReader::new(stdout).split(b'\n');
    let mut err_lines = BufReader::new(stderr).split(b'\n');
    let mut out_open = true;
    let mut err_open = true;
    let mut cancel_seen = false;

    let status = loop {
        tokio::select! {
            segment = out_lines.next_segment(), if out_open => match segment.map_err(unexpected)? {
                Some(bytes) => relay(events, OutputStream::Stdout, &bytes),
                None => out_open = false,
            },
            segment = err_lines.next_segment(), if err_open => match segment.map_err(unexpected)? {
                Some(bytes) => relay(events, OutputStream::Stderr, &bytes),
                None => err_open = false,
            },
            request = &mut cancel, if !cancel_seen => {
                cancel_seen = true;
                // A dropped sender means the supervisor went away; let the run finish.
                if request.is_ok() && request_stop(&mut child).map_err(unexpected)? {
                    let _ = events.send(WorkerEvent::Stopping);
                }
            },
            status = child.wait(), if !out_open && !err_open => break status.map_err(unexpected)?,
        }
    };

    // Closing the receiver tells the supervisor there is nothing left to stop.
    drop(cancel);
    Ok(status)
}

/// Zero is success, negative or signal-terminated is a stop, anything else an error
pub fn classify_exit(status: ExitStatus) -> DownloadOutcome {
    match status.code() {
        Some(0) => DownloadOutcome::Completed,
        Some(code) if code < 0 => DownloadOutcome::Cancelled { code: Some(code) },
        Some(code) => DownloadOutcome::Failed { code },
        None => DownloadOutcome::Cancelled { code: None },
    }
}

/// Terminates the child unless it has already exited; true when a signal was sent
fn request_stop(child: &mut Child) -> io::Result<bool> {
    // Pipes can outlive the process, so it may already be waiting to be reaped.
    if let Some(status) = child.try_wait()? {
        debug!(?status, "stop requested after exit");
        return Ok(false);
    }
    terminate(child)?;
    Ok(true)
}

fn relay(events: &UnboundedSender<WorkerEvent>, stream: OutputStream, bytes: &[u8]) {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end_matches(['\r', '\n']).to_string();
    debug!(?stream, "{text}");
    let _ = events.send(WorkerEvent::Output(OutputLine { stream, text }));
}

fn unexpected(err: io::Error) -> DownloadError {
    DownloadError::Unexpected(err.to_string())
}

/// Asks the child to exit: SIGTERM on Unix, TerminateProcess elsewhere
#[cfg(unix)]
fn terminate(child: &mut Child) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    info!(pid, "sending SIGTERM");
    match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => {
            warn!(pid, "failed to signal child: {e}");
            Err(io::Error::other(e))
        }
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> io::Result<()> {
    info!(pid = ?child.id(), "terminating child");
    child.start_kill()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    async fn run(program: &str, args: &[&str]) -> (Vec<OutputLine>, DownloadOutcome) {
        let (tx, mut rx) = unbounded_channel();
        let (_cancel_tx, cancel_rx) = oneshot::channel();
        spawn_download(
            PathBuf::from(program),
            args.iter().map(|a| a.to_string()).collect(),
            tx,
            cancel_rx,
        )
        .await;

        let mut lines = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                WorkerEvent::Output(line) => lines.push(line),
                WorkerEvent::Stopping => {}
                WorkerEvent::Finished(outcome) => return (lines, outcome),
            }
        }
        panic!("worker never reported a result");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn relays_both_streams_and_tags_stderr() {
        let (lines, outcome) = run("sh", &["-c", "echo out; echo err >&2"]).await;

        assert!(outcome.is_success());
        assert!(lines.contains(&OutputLine {
            stream: OutputStream::Stdout,
            text: "out".to_string(),
        }));
        assert!(lines.contains(&OutputLine {
            stream: OutputStream::Stderr,
            text: "err".to_string(),
        }));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn invalid_utf8_is_replaced() {
        let (lines, outcome) = run("sh", &["-c", "printf 'bad \\377 byte\\r\\n'"]).await;

        assert!(outcome.is_success());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "bad \u{FFFD} byte");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn positive_exit_code_is_failure() {
        let (_, outcome) = run("sh", &["-c", "exit 3"]).await;
        assert!(matches!(outcome, DownloadOutcome::Failed { code: 3 }));
    }

    #[tokio::test]
    async fn missing_program_is_reported_not_raised() {
        let (lines, outcome) = run("definitely-not-a-real-downloader-binary", &[]).await;

        assert!(lines.is_empty());
        assert!(matches!(
            outcome,
            DownloadOutcome::Error(DownloadError::ExecutableNotFound(_))
        ));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn cancel_terminates_child() {
        let (tx, mut rx) = unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let worker = tokio::spawn(spawn_download(
            PathBuf::from("sleep"),
            vec!["30".to_string()],
            tx,
            cancel_rx,
        ));

        cancel_tx.send(()).unwrap();
        worker.await.unwrap();

        let mut outcome = None;
        while let Some(event) = rx.recv().await {
            if let WorkerEvent::Finished(done) = event {
                outcome = Some(done);
            }
        }
        assert!(matches!(
            outcome,
            Some(DownloadOutcome::Cancelled { code: None })
        ));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn cancel_after_exit_sends_no_signal() {
        let (tx, mut rx) = unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        // The backgrounded sleep keeps both pipes open after the shell has exited.
        let worker = tokio::spawn(spawn_download(
            PathBuf::from("sh"),
            vec!["-c".to_string(), "sleep 2 & exit 0".to_string()],
            tx,
            cancel_rx,
        ));

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        cancel_tx.send(()).unwrap();
        worker.await.unwrap();

        let mut stopping = false;
        let mut outcome = None;
        while let Some(event) = rx.recv().await {
            match event {
                WorkerEvent::Stopping => stopping = true,
                WorkerEvent::Finished(done) => outcome = Some(done),
                WorkerEvent::Output(_) => {}
            }
        }
        assert!(!stopping);
        assert!(matches!(outcome, Some(DownloadOutcome::Completed)));
    }
}
