use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// The kind of memory access recorded in a trace. Translation does not depend on it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AccessKind {
    Read,
    Write,
    Other(char),
}

impl From<char> for AccessKind {
    fn from(value: char) -> Self {
        match value {
            'R' | 'r' => AccessKind::Read,
            'W' | 'w' => AccessKind::Write,
            other => AccessKind::Other(other),
        }
    }
}

/// One line of a memory trace: a hexadecimal virtual address followed by an access kind.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TraceRecord {
    pub address: u32,
    pub kind: AccessKind,
}

/// `TraceReader` is a utility type responsible for sequentially obtaining trace records from a
/// text source. Each process of the simulation owns one reader and consumes exactly one record
/// per simulation cycle.
pub struct TraceReader<R> {
    reader: R,
    name: String,
    pub line_number: u64,
    pub records_read: u64,
}

impl TraceReader<BufReader<File>> {
    /// Open the trace file at the provided path.
    ///
    /// # Errors
    ///
    /// Returns `Error::TraceOpen` if the file does not exist or cannot be read.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::TraceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(
            BufReader::new(file),
            path.display().to_string(),
        ))
    }
}

impl<R: BufRead> TraceReader<R> {
    /// Wrap an already buffered source. `name` identifies the trace in reports and errors.
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            line_number: 0,
            records_read: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the next record, skipping blank lines. `Ok(None)` marks the end of the trace.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedRecord` when the address is not hexadecimal or the access kind is
    /// missing, and `Error::Io` when the underlying read fails.
    pub fn next_record(&mut self) -> Result<Option<TraceRecord>> {
        let mut buffer = String::new();
        loop {
            buffer.clear();
            if self.reader.read_line(&mut buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            if !buffer.trim().is_empty() {
                break;
            }
        }

        let record = self.parse(buffer.trim())?;
        self.records_read += 1;
        Ok(Some(record))
    }

    /// Like `next_record`, but running out of input is an error: a pass needs a record from
    /// every process on every cycle.
    pub fn expect_record(&mut self) -> Result<TraceRecord> {
        match self.next_record()? {
            Some(record) => Ok(record),
            None => Err(Error::TraceExhausted {
                trace: self.name.clone(),
                records: self.records_read,
            }),
        }
    }

    fn parse(&self, line: &str) -> Result<TraceRecord> {
        let mut fields = line.split_whitespace();
        let address_field = fields.next().unwrap_or_default();
        let digits = address_field
            .strip_prefix("0x")
            .or_else(|| address_field.strip_prefix("0X"))
            .unwrap_or(address_field);
        let address = u32::from_str_radix(digits, 16)
            .map_err(|e| self.malformed(format!("bad address '{}': {}", address_field, e)))?;

        let kind = match fields
            .next()
            .map(|field| (field.chars().next(), field.chars().count()))
        {
            Some((Some(c), 1)) => AccessKind::from(c),
            Some(_) => return Err(self.malformed(String::from("access kind must be one character"))),
            None => return Err(self.malformed(String::from("missing access kind"))),
        };

        Ok(TraceRecord { address, kind })
    }

    fn malformed(&self, reason: String) -> Error {
        Error::MalformedRecord {
            trace: self.name.clone(),
            line: self.line_number,
            reason,
        }
    }
}

impl<R: BufRead + Seek> TraceReader<R> {
    /// Move back to the start of the trace so another pass can replay it.
    pub fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.line_number = 0;
        self.records_read = 0;
        log::debug!("rewound trace {}", self.name);
        Ok(())
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
