use crate::address;
use crate::error::{Error, Result};
use crate::frame::{FrameNumber, FrameRing, Owner, Pid};
use crate::stats::ProcessStats;

/// How a page table design stores and forgets (process, page) to frame mappings. The
/// replacement policy is identical for every design; only these three operations differ.
pub trait MappingStore {
    /// Search for the frame currently mapping `address` in process `pid`. Designs that gather
    /// lookup statistics record them in `stats`.
    fn lookup(&self, pid: Pid, address: u32, stats: &mut ProcessStats)
        -> Result<Option<FrameNumber>>;

    /// Forget the mapping held by `owner`, returning the frame it pointed to, or `None` if no
    /// such mapping exists.
    fn unmap(&mut self, owner: Owner) -> Result<Option<FrameNumber>>;

    /// Record that `address` of process `pid` now lives in `frame`.
    fn map(
        &mut self,
        pid: Pid,
        address: u32,
        frame: FrameNumber,
        stats: &mut ProcessStats,
    ) -> Result<()>;
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Outcome {
    Hit,
    Fault,
}

/// The result of one translated memory access.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Access {
    pub frame: FrameNumber,
    pub outcome: Outcome,
}

/// `ReplacementEngine` owns the shared frame pool and applies the least recently used policy on
/// behalf of whichever `MappingStore` is active.
#[derive(Debug)]
pub struct ReplacementEngine {
    ring: FrameRing,
}

impl ReplacementEngine {
    pub fn build(frame_count: usize) -> Self {
        Self {
            ring: FrameRing::build(frame_count),
        }
    }

    /// Free every frame ahead of a new pass.
    pub fn reset(&mut self) {
        self.ring.reset();
    }

    pub fn ring(&self) -> &FrameRing {
        &self.ring
    }

    /// Translate one access of process `pid`, installing a new mapping on a fault.
    ///
    /// A hit only refreshes the recency of its frame. A fault takes the oldest frame, invalidates
    /// the mapping that frame held, installs the new one and then refreshes the frame.
    ///
    /// # Errors
    ///
    /// Returns `Error::Invariant` when the store and the frame pool disagree about who owns a
    /// frame. Any such disagreement would corrupt every later access.
    pub fn access<S: MappingStore + ?Sized>(
        &mut self,
        store: &mut S,
        pid: Pid,
        address: u32,
        stats: &mut ProcessStats,
    ) -> Result<Access> {
        let owner = Owner {
            pid,
            vpn: address::vpn(address),
        };

        let access = match store.lookup(pid, address, stats)? {
            Some(frame) => {
                self.check_hit(frame, owner)?;
                stats.page_hits += 1;
                Access {
                    frame,
                    outcome: Outcome::Hit,
                }
            }
            None => {
                stats.page_faults += 1;
                let frame = self.acquire_frame(store, owner)?;
                store.map(pid, address, frame, stats)?;
                Access {
                    frame,
                    outcome: Outcome::Fault,
                }
            }
        };

        self.ring.promote(access.frame);
        Ok(access)
    }

    /// Hand the least recently used frame to `owner`, invalidating its previous mapping first.
    /// The caller is responsible for installing the new mapping and promoting the frame.
    pub fn acquire_frame<S: MappingStore + ?Sized>(
        &mut self,
        store: &mut S,
        owner: Owner,
    ) -> Result<FrameNumber> {
        let victim = self.ring.oldest();
        let number = victim.number();

        if let Some(previous) = victim.owner {
            match store.unmap(previous)? {
                Some(frame) if frame == number => {}
                other => {
                    return Err(Error::Invariant(format!(
                        "frame {} is owned by {:?} but its mapping resolved to {:?}",
                        number, previous, other
                    )))
                }
            }
            log::trace!(
                "evicting frame {} from pid {} vpn {:#x} for pid {} vpn {:#x}",
                number,
                previous.pid,
                previous.vpn,
                owner.pid,
                owner.vpn
            );
        }

        self.ring[number].owner = Some(owner);
        Ok(number)
    }

    fn check_hit(&self, frame: FrameNumber, owner: Owner) -> Result<()> {
        if frame >= self.ring.len() {
            return Err(Error::Invariant(format!(
                "lookup returned frame {} outside of {} frames",
                frame,
                self.ring.len()
            )));
        }
        if self.ring[frame].owner != Some(owner) {
            return Err(Error::Invariant(format!(
                "frame {} is mapped for {:?} but owned by {:?}",
                frame, owner, self.ring[frame].owner
            )));
        }
        Ok(())
    }
}
