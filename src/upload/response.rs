use log::debug;

use crate::constants::{COMMAND_CORE, COMMAND_OOPS_ID};

/// Instruction from the intake service following a report submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    /// Report recorded under the accompanying OOPS id
    OopsId,
    /// Send the core dump for the accompanying OOPS id
    Core,
    Other(String),
}

impl From<&str> for ServerCommand {
    fn from(token: &str) -> Self {
        match token {
            COMMAND_OOPS_ID => ServerCommand::OopsId,
            COMMAND_CORE => ServerCommand::Core,
            other => ServerCommand::Other(other.to_string()),
        }
    }
}

/// Parsed body of a submission response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReply {
    /// Empty or whitespace-only body
    Empty,
    /// `<oops id> <command>`
    Command { oops_id: String, command: ServerCommand },
    /// Body that is not exactly two tokens, decoded lossily
    Unparseable(String),
}

impl ServerReply {
    /// Parse a response body.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, so a binary body from
    /// a server that accepted the report still counts as a submission.
    pub fn parse(body: &[u8]) -> Self {
        let (text, lossy) = match std::str::from_utf8(body) {
            Ok(text) => (text.to_string(), false),
            Err(_) => {
                debug!("Server reply is not UTF-8 ({} bytes)", body.len());
                (String::from_utf8_lossy(body).into_owned(), true)
            }
        };

        let tokens: Vec<&str> = text.split_whitespace().collect();
        match tokens.as_slice() {
            [] => ServerReply::Empty,
            [oops_id, command] if !lossy => ServerReply::Command {
                oops_id: oops_id.to_string(),
                command: ServerCommand::from(*command),
            },
            _ => ServerReply::Unparseable(text.trim().to_string()),
        }
    }
}
