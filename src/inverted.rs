use crate::address;
use crate::error::{Error, Result};
use crate::frame::{FrameNumber, Owner, Pid};
use crate::replacement::MappingStore;
use crate::stats::ProcessStats;

/// A resident mapping. Nodes are stored at the index of the frame they map, which is possible
/// because a frame holds at most one mapping at a time.
#[derive(Debug, PartialEq, Clone, Copy)]
struct Node {
    owner: Owner,
    next: Option<FrameNumber>,
}

/// The outcome of walking one bucket chain.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Probe {
    pub frame: Option<FrameNumber>,
    /// Chain nodes inspected, including the matching one.
    pub visited: u64,
}

/// The `InvertedPageTable` struct is a single hash table shared by all processes with one bucket
/// per physical frame. Each bucket heads a chain of mappings, most recently inserted first.
#[derive(Debug)]
pub struct InvertedPageTable {
    buckets: Vec<Option<FrameNumber>>,
    nodes: Vec<Option<Node>>,
}

impl InvertedPageTable {
    pub fn build(frame_count: usize) -> Self {
        Self {
            buckets: vec![None; frame_count],
            nodes: vec![None; frame_count],
        }
    }

    /// Bucket of a (process, page) key.
    ///
    /// # Examples
    ///
    /// ```
    /// use page_table_sim::inverted::InvertedPageTable;
    /// let table = InvertedPageTable::build(8);
    /// assert_eq!(table.bucket(3, 6), 1);
    /// ```
    pub fn bucket(&self, pid: Pid, vpn: address::Vpn) -> usize {
        ((u64::from(vpn) + pid as u64) % self.buckets.len() as u64) as usize
    }

    /// Walk the chain of `owner`'s bucket without recording anything.
    ///
    /// # Errors
    ///
    /// Returns `Error::Invariant` if the chain links to a frame that holds no mapping.
    pub fn probe(&self, owner: Owner) -> Result<Probe> {
        let mut cursor = self.buckets[self.bucket(owner.pid, owner.vpn)];
        let mut visited = 0;
        while let Some(frame) = cursor {
            visited += 1;
            let node = self.node(frame)?;
            if node.owner == owner {
                return Ok(Probe {
                    frame: Some(frame),
                    visited,
                });
            }
            cursor = node.next;
        }
        Ok(Probe {
            frame: None,
            visited,
        })
    }

    /// Prepend a mapping from `owner` to `frame` to its bucket chain.
    ///
    /// # Errors
    ///
    /// Returns `Error::Invariant` if `frame` is out of range or still holds a mapping.
    pub fn insert(&mut self, owner: Owner, frame: FrameNumber) -> Result<()> {
        match self.nodes.get(frame) {
            None => {
                return Err(Error::Invariant(format!(
                    "frame {} outside of {} frames",
                    frame,
                    self.nodes.len()
                )))
            }
            Some(Some(node)) => {
                return Err(Error::Invariant(format!(
                    "frame {} still mapped for {:?}",
                    frame, node.owner
                )))
            }
            Some(None) => {}
        }

        let bucket = self.bucket(owner.pid, owner.vpn);
        self.nodes[frame] = Some(Node {
            owner,
            next: self.buckets[bucket],
        });
        self.buckets[bucket] = Some(frame);
        Ok(())
    }

    /// Unlink the first mapping of `owner` from its chain, returning the frame it held. A key
    /// with no mapping leaves the table untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::Invariant` if the chain links to a frame that holds no mapping.
    pub fn remove(&mut self, owner: Owner) -> Result<Option<FrameNumber>> {
        let bucket = self.bucket(owner.pid, owner.vpn);
        let mut prev: Option<FrameNumber> = None;
        let mut cursor = self.buckets[bucket];

        while let Some(frame) = cursor {
            let node = *self.node(frame)?;
            if node.owner == owner {
                match prev {
                    None => self.buckets[bucket] = node.next,
                    Some(p) => {
                        if let Some(prev_node) = self.nodes[p].as_mut() {
                            prev_node.next = node.next;
                        }
                    }
                }
                self.nodes[frame] = None;
                return Ok(Some(frame));
            }
            prev = Some(frame);
            cursor = node.next;
        }
        Ok(None)
    }

    /// Number of resident mappings.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| node.is_none())
    }

    fn node(&self, frame: FrameNumber) -> Result<&Node> {
        self.nodes
            .get(frame)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::Invariant(format!("bucket chain links to free frame {}", frame)))
    }
}

impl MappingStore for InvertedPageTable {
    /// Records one empty or non-empty access per lookup plus one conflict access per chain node
    /// visited, the match included.
    fn lookup(
        &self,
        pid: Pid,
        address: u32,
        stats: &mut ProcessStats,
    ) -> Result<Option<FrameNumber>> {
        let probe = self.probe(Owner {
            pid,
            vpn: address::vpn(address),
        })?;
        if probe.visited == 0 {
            stats.hash_null_accesses += 1;
        } else {
            stats.hash_non_null_accesses += 1;
        }
        stats.hash_conflict_accesses += probe.visited;
        Ok(probe.frame)
    }

    fn unmap(&mut self, owner: Owner) -> Result<Option<FrameNumber>> {
        self.remove(owner)
    }

    fn map(
        &mut self,
        pid: Pid,
        address: u32,
        frame: FrameNumber,
        _: &mut ProcessStats,
    ) -> Result<()> {
        self.insert(
            Owner {
                pid,
                vpn: address::vpn(address),
            },
            frame,
        )
    }
}
