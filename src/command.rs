//! Serial command protocol
//!
//! Line-oriented, case-insensitive, CRLF-terminated. Two commands are
//! recognized: `reset` (unconditional device restart) and `read <n>`
//! (acquire `n` samples). Line assembly is the transport's job; this
//! module consumes complete lines, including the terminator.

use crate::sampler::{Error as SamplerError, SampleAlarm, Sampler};

/// Longest accepted line, terminator included.
pub const MAX_LINE_LEN: usize = 32;

/// Shortest accepted line: the bare terminator.
pub const MIN_LINE_LEN: usize = 2;

/// A validated command, ready to dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Restart the device.
    Reset,
    /// Acquire the given number of samples.
    Read(u16),
}

/// Why a line was rejected. Rejection never changes run state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Unrecognized token or malformed framing: length out of bounds,
    /// missing CRLF, or not valid UTF-8.
    InvalidCommand,
    /// The command's argument is missing, non-numeric, or does not fit
    /// the representable count range.
    InvalidArgument,
    /// The line parsed fine but the controller refused it.
    Refused(SamplerError),
}

impl From<SamplerError> for CommandError {
    fn from(error: SamplerError) -> Self {
        CommandError::Refused(error)
    }
}

/// Device restart capability.
///
/// On hardware this is expected not to return; the signature allows a
/// plain return so mocks can observe the call.
pub trait ResetControl {
    /// Restart the device.
    fn system_reset(&mut self);
}

impl Command {
    /// Validate one received line, terminator included.
    pub fn parse(line: &[u8]) -> Result<Self, CommandError> {
        if line.len() < MIN_LINE_LEN || line.len() > MAX_LINE_LEN {
            return Err(CommandError::InvalidCommand);
        }
        let body = line
            .strip_suffix(b"\r\n")
            .ok_or(CommandError::InvalidCommand)?;
        let body = core::str::from_utf8(body).map_err(|_| CommandError::InvalidCommand)?;

        let mut tokens = body.split_ascii_whitespace();
        let keyword = tokens.next().ok_or(CommandError::InvalidCommand)?;
        if keyword.eq_ignore_ascii_case("reset") {
            Ok(Command::Reset)
        } else if keyword.eq_ignore_ascii_case("read") {
            // Extra tokens after the count are ignored.
            let argument = tokens.next().ok_or(CommandError::InvalidArgument)?;
            let count: u16 = argument.parse().map_err(|_| CommandError::InvalidArgument)?;
            Ok(Command::Read(count))
        } else {
            Err(CommandError::InvalidCommand)
        }
    }
}

/// Parse one line and apply it to the sampling controller.
///
/// Returns the executed command, or the reason the line was rejected. A
/// rejected line has no effect (a `read` while a run is active leaves
/// that run untouched) and the returned error carries the diagnostic for
/// the caller to log. `reset` goes through [`ResetControl`] and on real
/// hardware never comes back.
pub fn dispatch<A, R>(
    line: &[u8],
    sampler: &mut Sampler<'_>,
    alarm: &mut A,
    reset: &mut R,
) -> Result<Command, CommandError>
where
    A: SampleAlarm,
    R: ResetControl,
{
    let command = Command::parse(line)?;
    match command {
        Command::Reset => reset.system_reset(),
        Command::Read(count) => sampler.start(count, alarm)?,
    }
    Ok(command)
}
