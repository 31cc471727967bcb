//! Line-oriented console source feeding the head of the pipeline.

use crate::cancel::CancellationSignal;
use crate::error::Result;
use crate::observer::StageObserver;
use crate::Value;
use crossbeam::channel::{select, Sender};
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Printed once before the first line is read
pub const PROMPT: &str = "Enter positive or negative integers, or 'exit' to quit";
/// Printed for every line that is neither an integer nor the sentinel
pub const REJECTION: &str = "Only integers are accepted!";
/// Printed when the sentinel is read
pub const FAREWELL: &str = "Shutting down.";
/// Case-insensitive line that stops the whole pipeline
pub const SENTINEL: &str = "exit";

const STAGE_NAME: &str = "source";

/// Classification of one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLine {
    Value(Value),
    Exit,
    Invalid(String),
}

/// Classify a single line. The line is matched as-is, without trimming.
pub fn parse_line(line: &str) -> SourceLine {
    if line.eq_ignore_ascii_case(SENTINEL) {
        return SourceLine::Exit;
    }
    match line.parse::<Value>() {
        Ok(value) => SourceLine::Value(value),
        Err(_) => SourceLine::Invalid(line.to_string()),
    }
}

/// Strip the line terminator. Bytes that are not UTF-8 are replaced, so
/// such a line can only ever be rejected, never read as a number.
fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// How the source finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutcome {
    /// The sentinel was read and cancellation fired
    Exit,
    /// The reader ran dry; the outbound link is closed on return
    EndOfInput,
    /// Cancellation fired from elsewhere
    Cancelled,
    /// The first stage stopped receiving
    DownstreamClosed,
}

/// Reads integers line by line and sends them downstream.
///
/// User-facing messages go to `console`; values go to the outbound link.
pub struct LineSource<R, W> {
    reader: R,
    console: W,
    observer: Arc<dyn StageObserver>,
}

impl<R, W> LineSource<R, W>
where
    R: BufRead,
    W: Write,
{
    pub fn new(reader: R, console: W, observer: Arc<dyn StageObserver>) -> Self {
        Self {
            reader,
            console,
            observer,
        }
    }

    /// Consume the reader. The outbound sender is dropped on return.
    pub fn run(mut self, output: Sender<Value>, cancel: &CancellationSignal) -> Result<SourceOutcome> {
        writeln!(self.console, "{PROMPT}")?;
        self.console.flush()?;

        let mut buf = Vec::new();
        loop {
            if cancel.is_cancelled() {
                return Ok(SourceOutcome::Cancelled);
            }
            buf.clear();
            if self.reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(SourceOutcome::EndOfInput);
            }
            let line = decode_line(&buf);

            match parse_line(&line) {
                SourceLine::Exit => {
                    writeln!(self.console, "{FAREWELL}")?;
                    self.console.flush()?;
                    cancel.fire();
                    self.observer.on_sentinel(STAGE_NAME);
                    return Ok(SourceOutcome::Exit);
                }
                SourceLine::Invalid(line) => {
                    writeln!(self.console, "{REJECTION}")?;
                    self.console.flush()?;
                    self.observer.on_rejected(STAGE_NAME, &line);
                }
                SourceLine::Value(value) => {
                    select! {
                        send(output, value) -> res => {
                            if res.is_err() {
                                return Ok(SourceOutcome::DownstreamClosed);
                            }
                            self.observer.on_forwarded(STAGE_NAME, value);
                        }
                        recv(cancel.receiver()) -> _ => return Ok(SourceOutcome::Cancelled),
                    }
                }
            }
        }
    }
}
