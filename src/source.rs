//! Collecting program text entered line by line.
//!
//! Interactive entry ends at a line consisting of the end marker (`eol`) or at
//! end of input. The collected lines are joined with newlines so that tokens on
//! adjacent lines never run together.

/// Line that terminates interactive program entry
pub const END_MARKER: &str = "eol";

/// Whether a pushed line completed the program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Pending,
    Complete,
}

#[derive(Debug, Default)]
pub struct ProgramBuffer {
    lines: Vec<String>,
}

impl ProgramBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one line of input; the end marker is not part of the program
    pub fn push_line(&mut self, line: &str) -> LineStatus {
        let line = line.trim_end_matches(['\r', '\n']);
        if line == END_MARKER {
            LineStatus::Complete
        } else {
            self.lines.push(line.to_owned());
            LineStatus::Pending
        }
    }

    pub fn into_source(self) -> String {
        self.lines.join("\n")
    }
}

/// Collect lines up to the end marker (or the end of `lines`) into program text
pub fn collect_program<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut buffer = ProgramBuffer::new();
    for line in lines {
        if buffer.push_line(line.as_ref()) == LineStatus::Complete {
            break;
        }
    }
    buffer.into_source()
}
