//! Interactive commands accepted by pktgenctl.

use std::fmt;
use std::str::FromStr;

/// One line of operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    /// Print the application counters. An empty line means `report`.
    Report,
    Start,
    Stop,
    /// Print the application's source port.
    Port,
    /// Print the first frames one trigger should emit.
    Frames,
    Quit,
}

impl ReplCommand {
    pub const HELP: &'static str = "commands: report (or empty line), start, stop, port, frames, quit";

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplCommand::Report => "report",
            ReplCommand::Start => "start",
            ReplCommand::Stop => "stop",
            ReplCommand::Port => "port",
            ReplCommand::Frames => "frames",
            ReplCommand::Quit => "quit",
        }
    }
}

impl fmt::Display for ReplCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim().to_lowercase().as_str() {
            "" | "report" | "r" => Ok(ReplCommand::Report),
            "start" => Ok(ReplCommand::Start),
            "stop" => Ok(ReplCommand::Stop),
            "port" => Ok(ReplCommand::Port),
            "frames" | "f" => Ok(ReplCommand::Frames),
            "quit" | "exit" | "q" => Ok(ReplCommand::Quit),
            other => Err(format!("unknown command '{}'; {}", other, Self::HELP)),
        }
    }
}
