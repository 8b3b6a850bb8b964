use anyhow::{Context, Result};
use csv::{Reader, ReaderBuilder};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const READ_BUF_SIZE: usize = 128 * 1024;

/// Where the scanner is within the CSV grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    RecordStart,
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
    AfterCr,
}

/// Rewrites every blank line outside a quoted field as `""`, a record with
/// one empty field. `csv` drops blank lines entirely, which would shift the
/// row number of every row after them.
pub struct BlankLineReader<R> {
    inner: R,
    state: LineState,
    buf: Box<[u8]>,
    pending: Vec<u8>,
    pos: usize,
}

impl<R: Read> BlankLineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            state: LineState::RecordStart,
            buf: vec![0; READ_BUF_SIZE].into_boxed_slice(),
            pending: Vec::with_capacity(READ_BUF_SIZE + 64),
            pos: 0,
        }
    }
}

impl<R: Read> Read for BlankLineReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            let n = self.inner.read(&mut self.buf)?;
            if n == 0 {
                return Ok(0);
            }
            self.pending.clear();
            self.pos = 0;
            for &b in &self.buf[..n] {
                self.state = step(self.state, b, &mut self.pending);
            }
        }

        let available = &self.pending[self.pos..];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

fn step(state: LineState, b: u8, out: &mut Vec<u8>) -> LineState {
    use LineState::*;

    match state {
        RecordStart if b == b'\n' || b == b'\r' => {
            out.extend_from_slice(b"\"\"");
            out.push(b);
            if b == b'\r' {
                AfterCr
            } else {
                RecordStart
            }
        }
        RecordStart => step(FieldStart, b, out),
        // \r\n is one terminator
        AfterCr if b == b'\n' => {
            out.push(b);
            RecordStart
        }
        AfterCr => step(RecordStart, b, out),
        Quoted => {
            out.push(b);
            if b == b'"' {
                QuoteInQuoted
            } else {
                Quoted
            }
        }
        FieldStart | Unquoted | QuoteInQuoted => {
            out.push(b);
            match b {
                b'\n' => RecordStart,
                b'\r' => AfterCr,
                b',' => FieldStart,
                b'"' if state == FieldStart || state == QuoteInQuoted => Quoted,
                _ => Unquoted,
            }
        }
    }
}

/// Opens a corpus table for reading raw records, header skipped. Blank lines
/// come back as one-field records so that every line keeps a row number.
pub fn open(path: &Path) -> Result<Reader<BlankLineReader<BufReader<File>>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open corpus: {}", path.display()))?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BlankLineReader::new(BufReader::new(file))))
}
