//! A small sink abstraction so every stage can be driven and tested
//! without touching the filesystem (§9).

use std::io::{self, Write};

/// Something that accepts a stage's output one line at a time.
pub trait LineSink {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// Collects lines in memory — what tests use in place of a file.
impl LineSink for Vec<String> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.push(line.to_owned());
        Ok(())
    }
}

/// Adapts any [`Write`] (a `BufWriter<File>`, `stdout`, ...) into a
/// [`LineSink`] by appending a newline to every line written.
pub struct WriteLineSink<W: Write>(pub W);

impl<W: Write> LineSink for WriteLineSink<W> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.0.write_all(line.as_bytes())?;
        self.0.write_all(b"\n")
    }
}
