//! Operator command parsing for `profile start`, `profile stop` and
//! `profile frames=N`.
//!
//! This only turns a command line into a [`ProfileCommand`]. Hosting the
//! console that reads the line is the application's job; executing it is
//! [`ProfilerSession::execute`](crate::engine::session::ProfilerSession::execute).

use std::fmt;
use std::str::FromStr;

use crate::engine::error::CommandError;


/// Leading keyword accepted (and optional) in front of every command.
pub const COMMAND_KEYWORD: &str = "profile";

/// A parsed operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileCommand {
    /// Start an open-ended capture.
    Start,

    /// Request the running capture to stop.
    Stop,

    /// Start a capture that stops itself after `N` primary frames.
    Frames(u32),
}

impl ProfileCommand {
    /// Parses `profile start`, `profile stop` or `profile frames=N`.
    ///
    /// The leading `profile` keyword is optional and matching is
    /// case-insensitive.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace().peekable();
        if words.peek().is_some_and(|word| word.eq_ignore_ascii_case(COMMAND_KEYWORD)) {
            words.next();
        }

        let verb = words.next().ok_or(CommandError::Empty)?;
        if let Some(extra) = words.next() {
            return Err(CommandError::UnknownVerb(format!("{verb} {extra}")));
        }

        let lowered = verb.to_ascii_lowercase();
        match lowered.as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            _ => match lowered.strip_prefix("frames=") {
                Some(count) => count
                    .parse::<u32>()
                    .ok()
                    .filter(|&n| n > 0)
                    .map(Self::Frames)
                    .ok_or_else(|| CommandError::InvalidFrameCount(count.to_owned())),
                None => Err(CommandError::UnknownVerb(verb.to_owned())),
            },
        }
    }
}

impl FromStr for ProfileCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ProfileCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "{COMMAND_KEYWORD} start"),
            Self::Stop => write!(f, "{COMMAND_KEYWORD} stop"),
            Self::Frames(n) => write!(f, "{COMMAND_KEYWORD} frames={n}"),
        }
    }
}
