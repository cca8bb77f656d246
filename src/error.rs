use thiserror::Error;

use crate::dns::ParseError;

/// Errors a single datagram handler can produce. None of these are allowed to
/// take the server down; the dispatcher logs them and moves on to the next
/// datagram. Only startup errors (socket creation, bind, configuration) are
/// fatal.
#[derive(Debug, Error)]
pub enum DnsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed DNS packet: {0}")]
    MalformedPacket(ParseError),

    #[error("No answer from the configured nameservers")]
    Timeout,

    #[error("Rewritten response needs {need} bytes but the buffer holds {have}")]
    ResponseTooLarge { need: usize, have: usize },
}

impl From<ParseError> for DnsError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::BufferTooSmall { need, have } => {
                DnsError::ResponseTooLarge { need, have }
            }
            other => DnsError::MalformedPacket(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("Missing or invalid dns64-prefix: {0}")]
    InvalidPrefix(String),

    #[error("No usable nameserver configured")]
    NoNameservers,
}

pub type Result<T> = std::result::Result<T, DnsError>;
