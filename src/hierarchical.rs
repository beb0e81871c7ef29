use crate::address::{self, AddressLayout, Vpn};
use crate::error::{Error, Result};
use crate::frame::{FrameNumber, Owner, Pid};
use crate::replacement::MappingStore;
use crate::stats::ProcessStats;

/// A second level entry: `Some` holds the frame of a valid mapping.
type SecondLevelTable = Box<[Option<FrameNumber>]>;

/// Which level of the walk found an invalid entry.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FaultLevel {
    First,
    Second,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Translation {
    Hit(FrameNumber),
    Fault(FaultLevel),
}

/// The `HierarchicalPageTable` struct is one process's two-level page table. The first level is
/// allocated up front with one slot per first level index; a slot materializes its second level
/// table on the first fault beneath it and keeps it until the whole table is dropped.
#[derive(Debug)]
pub struct HierarchicalPageTable {
    layout: AddressLayout,
    first_level: Vec<Option<SecondLevelTable>>,
}

impl HierarchicalPageTable {
    pub fn build(layout: AddressLayout) -> Self {
        Self {
            layout,
            first_level: (0..layout.first_level_entries()).map(|_| None).collect(),
        }
    }

    /// Walk both levels for `address`.
    ///
    /// # Arguments
    ///
    /// * `address` - virtual address to translate
    pub fn translate(&self, address: u32) -> Translation {
        let parts = self.layout.decompose(address);
        match &self.first_level[parts.first_index] {
            None => Translation::Fault(FaultLevel::First),
            Some(table) => match table[parts.second_index] {
                Some(frame) => Translation::Hit(frame),
                None => Translation::Fault(FaultLevel::Second),
            },
        }
    }

    /// Point the entry for `address` at `frame`, materializing the second level table if this is
    /// the first mapping under its first level slot. Returns `true` when a table was allocated.
    pub fn map(&mut self, address: u32, frame: FrameNumber) -> bool {
        let parts = self.layout.decompose(address);
        let entries = self.layout.second_level_entries();
        let slot = &mut self.first_level[parts.first_index];

        let allocated = slot.is_none();
        let table = slot.get_or_insert_with(|| vec![None; entries].into_boxed_slice());
        table[parts.second_index] = Some(frame);

        if allocated {
            log::debug!(
                "allocated second level table {:#x} ({} entries)",
                parts.first_index,
                entries
            );
        }
        allocated
    }

    /// Invalidate the entry for virtual page `vpn`, returning the frame it mapped.
    pub fn unmap(&mut self, vpn: Vpn) -> Option<FrameNumber> {
        let parts = self.layout.decompose_vpn(vpn);
        self.first_level[parts.first_index]
            .as_mut()
            .and_then(|table| table[parts.second_index].take())
    }
}

/// Every process's hierarchical table, indexed by pid. Eviction may have to clear an entry in a
/// table other than the faulting process's own.
#[derive(Debug)]
pub struct HierarchicalTables {
    tables: Vec<HierarchicalPageTable>,
}

impl HierarchicalTables {
    pub fn build(layout: AddressLayout, processes: usize) -> Self {
        Self {
            tables: (0..processes)
                .map(|_| HierarchicalPageTable::build(layout))
                .collect(),
        }
    }

    pub fn table(&self, pid: Pid) -> &HierarchicalPageTable {
        &self.tables[pid]
    }
}

impl MappingStore for HierarchicalTables {
    fn lookup(
        &self,
        pid: Pid,
        address: u32,
        _: &mut ProcessStats,
    ) -> Result<Option<FrameNumber>> {
        match self.tables[pid].translate(address) {
            Translation::Hit(frame) => Ok(Some(frame)),
            Translation::Fault(_) => Ok(None),
        }
    }

    fn unmap(&mut self, owner: Owner) -> Result<Option<FrameNumber>> {
        Ok(self
            .tables
            .get_mut(owner.pid)
            .and_then(|table| table.unmap(owner.vpn)))
    }

    fn map(
        &mut self,
        pid: Pid,
        address: u32,
        frame: FrameNumber,
        stats: &mut ProcessStats,
    ) -> Result<()> {
        let table = &mut self.tables[pid];
        if let Translation::Hit(existing) = table.translate(address) {
            return Err(Error::Invariant(format!(
                "pid {} vpn {:#x} is already mapped to frame {}",
                pid,
                address::vpn(address),
                existing
            )));
        }
        if table.map(address, frame) {
            stats.second_level_tables += 1;
        }
        Ok(())
    }
}
