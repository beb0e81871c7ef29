use crate::error::{Error, Result};
use crate::simulation::PageTableKind;
use std::ops::{Add, AddAssign};

/// `ProcessStats` is a simple collection of named counters gathered for one process during one
/// simulation pass. Counters only grow within a pass and are zeroed before the next one.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct ProcessStats {
    pub traces: u64,
    pub page_faults: u64,
    pub page_hits: u64,
    pub second_level_tables: u64,
    pub hash_conflict_accesses: u64,
    pub hash_null_accesses: u64,
    pub hash_non_null_accesses: u64,
}

impl ProcessStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify the postconditions every finished pass must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `Error::Invariant` if hits and faults do not account for every trace, or, for the
    /// inverted design, if empty and non-empty bucket accesses do not.
    pub fn check(&self, kind: PageTableKind) -> Result<()> {
        if self.page_hits + self.page_faults != self.traces {
            return Err(Error::Invariant(format!(
                "{} hits + {} faults != {} traces",
                self.page_hits, self.page_faults, self.traces
            )));
        }
        if kind == PageTableKind::Inverted
            && self.hash_null_accesses + self.hash_non_null_accesses != self.traces
        {
            return Err(Error::Invariant(format!(
                "{} empty + {} non-empty hash accesses != {} traces",
                self.hash_null_accesses, self.hash_non_null_accesses, self.traces
            )));
        }
        Ok(())
    }
}

impl Add<ProcessStats> for ProcessStats {
    type Output = ProcessStats;

    fn add(self, rhs: ProcessStats) -> Self::Output {
        Self::Output {
            traces: self.traces + rhs.traces,
            page_faults: self.page_faults + rhs.page_faults,
            page_hits: self.page_hits + rhs.page_hits,
            second_level_tables: self.second_level_tables + rhs.second_level_tables,
            hash_conflict_accesses: self.hash_conflict_accesses + rhs.hash_conflict_accesses,
            hash_null_accesses: self.hash_null_accesses + rhs.hash_null_accesses,
            hash_non_null_accesses: self.hash_non_null_accesses + rhs.hash_non_null_accesses,
        }
    }
}

impl AddAssign for ProcessStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.add(rhs)
    }
}

impl std::fmt::Display for ProcessStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "traces={} faults={} hits={} second_level_tables={} hash_conflicts={} hash_empty={} hash_non_empty={}",
            self.traces,
            self.page_faults,
            self.page_hits,
            self.second_level_tables,
            self.hash_conflict_accesses,
            self.hash_null_accesses,
            self.hash_non_null_accesses,
        )
    }
}
