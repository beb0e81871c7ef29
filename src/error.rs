use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Type Alias: A rebranding of the `Result` enum from the standard library which focuses on errors
/// that may result from configuring or running a simulation.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the simulator can report. None of them are recoverable: configuration errors
/// stop the program before any trace is opened, input errors stop the run in progress, and
/// `Invariant` signals a bug in the translation engine itself.
#[derive(Error, Debug)]
pub enum Error {
    #[error("first level bits {0} is too big: at least one second level bit is required")]
    FirstLevelTooWide(u32),

    #[error("physical memory size bits {0} should be at least the page size bits {min}", min = crate::PAGE_SIZE_BITS)]
    PhysicalMemoryTooSmall(u32),

    #[error("physical memory size bits {0} exceeds the {max} bit physical address space", max = crate::MAX_PHYSICAL_MEMORY_BITS)]
    PhysicalMemoryTooLarge(u32),

    #[error("failed to open trace {}: {source}", path.display())]
    TraceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed record in {trace} at line {line}: {reason}")]
    MalformedRecord {
        trace: String,
        line: u64,
        reason: String,
    },

    #[error("trace {trace} ran out after {records} records")]
    TraceExhausted { trace: String, records: u64 },

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    /// Process exit status reported by the binary for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::FirstLevelTooWide(_)
            | Self::PhysicalMemoryTooSmall(_)
            | Self::PhysicalMemoryTooLarge(_) => 2,
            Self::TraceOpen { .. } => 3,
            Self::MalformedRecord { .. } | Self::TraceExhausted { .. } => 4,
            Self::Io(_) => 5,
            Self::Invariant(_) => 70,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}
