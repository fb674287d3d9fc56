use anyhow::Result;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::engine::ControlCommand;

/// Reads user commands from stdin while the dashboard owns the screen:
/// `pause`, `resume`, `reset`, `export` and `quit`.
pub async fn listen_for_commands(
    sender: mpsc::Sender<ControlCommand>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(()) };
                match parse_command(&line) {
                    Some(command) => {
                        debug!("User command {command:?}");
                        if sender.send(command).await.is_err() {
                            return Ok(());
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!("Ignoring unknown command {line:?}"),
                }
            }
        }
    }
}

fn parse_command(line: &str) -> Option<ControlCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "pause" | "p" => Some(ControlCommand::Pause),
        "resume" | "r" => Some(ControlCommand::Resume),
        "reset" => Some(ControlCommand::ResetToday),
        "export" | "e" => Some(ControlCommand::Export),
        "quit" | "q" => Some(ControlCommand::Quit),
        _ => None,
    }
}
