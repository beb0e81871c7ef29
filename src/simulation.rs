use crate::address::{self, AddressLayout};
use crate::error::{Error, Result};
use crate::frame::Pid;
use crate::hierarchical::HierarchicalTables;
use crate::inverted::InvertedPageTable;
use crate::replacement::{MappingStore, ReplacementEngine};
use crate::stats::ProcessStats;
use crate::trace::TraceReader;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::io::{BufRead, Seek, Write};

const PROGRESS_STEP: u64 = 4096;

/// The two page table designs compared over the same traces.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PageTableKind {
    Hierarchical,
    Inverted,
}

impl PageTableKind {
    pub const ALL: [PageTableKind; 2] = [PageTableKind::Hierarchical, PageTableKind::Inverted];

    pub fn banner(&self) -> &'static str {
        match self {
            PageTableKind::Hierarchical => "The 2nd Level Page Table Memory Simulation Starts .....",
            PageTableKind::Inverted => "The Inverted Page Table Memory Simulation Starts .....",
        }
    }

    fn echo_label(&self) -> &'static str {
        match self {
            PageTableKind::Hierarchical => "Two-Level",
            PageTableKind::Inverted => "IHT",
        }
    }
}

impl fmt::Display for PageTableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageTableKind::Hierarchical => write!(f, "hierarchical"),
            PageTableKind::Inverted => write!(f, "inverted"),
        }
    }
}

/// A simulated process: its trace and the counters of the pass in progress.
struct Process<R> {
    pid: Pid,
    trace: TraceReader<R>,
    stats: ProcessStats,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ProcessReport {
    pub pid: Pid,
    pub name: String,
    pub stats: ProcessStats,
}

/// Final counters of every process for one pass.
#[derive(Debug, PartialEq, Clone)]
pub struct PassReport {
    pub kind: PageTableKind,
    pub processes: Vec<ProcessReport>,
}

impl PassReport {
    /// Counters summed over all processes.
    pub fn totals(&self) -> ProcessStats {
        self.processes
            .iter()
            .fold(ProcessStats::new(), |total, process| total + process.stats)
    }

    /// Both designs apply the same replacement policy to the same accesses, so every process
    /// must see the same faults and hits in either pass.
    ///
    /// # Errors
    ///
    /// Returns `Error::Invariant` naming the first process whose counts differ.
    pub fn check_equivalent(&self, other: &PassReport) -> Result<()> {
        if self.processes.len() != other.processes.len() {
            return Err(Error::Invariant(format!(
                "{} pass has {} processes, {} pass has {}",
                self.kind,
                self.processes.len(),
                other.kind,
                other.processes.len()
            )));
        }
        for (a, b) in self.processes.iter().zip(&other.processes) {
            if a.stats.page_faults != b.stats.page_faults || a.stats.page_hits != b.stats.page_hits {
                return Err(Error::Invariant(format!(
                    "process {} saw {}/{} faults/hits in the {} pass but {}/{} in the {} pass",
                    a.pid,
                    a.stats.page_faults,
                    a.stats.page_hits,
                    self.kind,
                    b.stats.page_faults,
                    b.stats.page_hits,
                    other.kind
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for process in &self.processes {
            let (pid, stats) = (process.pid, &process.stats);
            writeln!(f, "**** {} *****", process.name)?;
            writeln!(f, "Proc {} Num of traces {}", pid, stats.traces)?;
            match self.kind {
                PageTableKind::Hierarchical => {
                    writeln!(
                        f,
                        "Proc {} Num of second level page tables allocated {}",
                        pid, stats.second_level_tables
                    )?;
                }
                PageTableKind::Inverted => {
                    writeln!(
                        f,
                        "Proc {} Num of Inverted Hash Table Access Conflicts {}",
                        pid, stats.hash_conflict_accesses
                    )?;
                    writeln!(
                        f,
                        "Proc {} Num of Empty Inverted Hash Table Access {}",
                        pid, stats.hash_null_accesses
                    )?;
                    writeln!(
                        f,
                        "Proc {} Num of Non-Empty Inverted Hash Table Access {}",
                        pid, stats.hash_non_null_accesses
                    )?;
                }
            }
            writeln!(f, "Proc {} Num of Page Faults {}", pid, stats.page_faults)?;
            writeln!(f, "Proc {} Num of Page Hit {}", pid, stats.page_hits)?;
        }
        Ok(())
    }
}

/// A structure which contains the core elements required to run a simulation: the address
/// layout, the shared frame pool and one trace per process. Processes take turns, one access
/// each per cycle, and every access completes (eviction included) before the next one starts.
pub struct Simulation<R> {
    layout: AddressLayout,
    engine: ReplacementEngine,
    processes: Vec<Process<R>>,
    cycles: u64,
    show_progress: bool,
}

impl<R: BufRead + Seek> Simulation<R> {
    /// Create a new simulation over the given traces. Process ids follow the order of `traces`.
    ///
    /// # Arguments
    ///
    /// * `layout` - virtual address split used by the hierarchical design.
    /// * `frame_count` - number of physical frames shared by all processes.
    /// * `traces` - one trace per process.
    /// * `cycles` - number of round-robin cycles per pass.
    pub fn build(
        layout: AddressLayout,
        frame_count: usize,
        traces: Vec<TraceReader<R>>,
        cycles: u64,
    ) -> Self {
        Self {
            layout,
            engine: ReplacementEngine::build(frame_count),
            processes: traces
                .into_iter()
                .enumerate()
                .map(|(pid, trace)| Process {
                    pid,
                    trace,
                    stats: ProcessStats::new(),
                })
                .collect(),
            cycles,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.engine.ring().len()
    }

    /// Run one full pass with the given design and return the per-process counters.
    ///
    /// The frame pool and every counter are reset and every trace is rewound first, so passes
    /// are independent of each other. When `echo` is provided, one line per access is written to
    /// it.
    ///
    /// # Errors
    ///
    /// Any trace error ends the pass, as does a violated postcondition or a disagreement between
    /// the page table and the frame pool.
    pub fn run_pass(
        &mut self,
        kind: PageTableKind,
        echo: Option<&mut dyn Write>,
    ) -> Result<PassReport> {
        self.engine.reset();
        for process in self.processes.iter_mut() {
            process.stats = ProcessStats::new();
            process.trace.rewind()?;
        }

        log::info!(
            "starting {} pass: {} processes, {} frames, {} cycles",
            kind,
            self.processes.len(),
            self.frame_count(),
            self.cycles
        );

        match kind {
            PageTableKind::Hierarchical => {
                let mut tables = HierarchicalTables::build(self.layout, self.processes.len());
                self.drive(kind, &mut tables, echo)?;
            }
            PageTableKind::Inverted => {
                let mut table = InvertedPageTable::build(self.frame_count());
                self.drive(kind, &mut table, echo)?;
            }
        }

        let report = self.report(kind)?;
        log::info!("{} pass finished: {}", kind, report.totals());
        Ok(report)
    }

    fn drive<S: MappingStore>(
        &mut self,
        kind: PageTableKind,
        store: &mut S,
        mut echo: Option<&mut dyn Write>,
    ) -> Result<()> {
        let progress = self.progress_bar(kind);

        for cycle in 0..self.cycles {
            for process in self.processes.iter_mut() {
                let record = process.trace.expect_record()?;
                process.stats.traces += 1;
                let access =
                    self.engine
                        .access(store, process.pid, record.address, &mut process.stats)?;

                if let Some(out) = echo.as_mut() {
                    writeln!(
                        out,
                        "{} procID {} traceNumber {} virtual addr {:x} physical addr {:x}",
                        kind.echo_label(),
                        process.pid,
                        process.stats.traces,
                        record.address,
                        address::physical_address(access.frame, record.address)
                    )?;
                }
            }

            if (cycle + 1) % PROGRESS_STEP == 0 {
                progress.set_position(cycle + 1);
            }
        }

        progress.finish_and_clear();
        Ok(())
    }

    fn progress_bar(&self, kind: PageTableKind) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(self.cycles);
        if let Ok(style) = ProgressStyle::with_template("{msg:>12} [{bar:40}] {pos}/{len} cycles") {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(kind.to_string());
        bar
    }

    fn report(&self, kind: PageTableKind) -> Result<PassReport> {
        let processes = self
            .processes
            .iter()
            .map(|process| {
                process.stats.check(kind)?;
                Ok(ProcessReport {
                    pid: process.pid,
                    name: process.trace.name().to_string(),
                    stats: process.stats,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PassReport { kind, processes })
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::PAGE_SIZE_BITS;
    use std::io::Cursor;

    fn trace(name: &str, vpns: &[u32]) -> TraceReader<Cursor<Vec<u8>>> {
        let text: String = vpns
            .iter()
            .map(|vpn| format!("{:08x} R\n", (vpn << PAGE_SIZE_BITS) | 0x2a))
            .collect();
        TraceReader::new(Cursor::new(text.into_bytes()), name)
    }

    fn simulation(
        frames: usize,
        traces: Vec<TraceReader<Cursor<Vec<u8>>>>,
        cycles: u64,
    ) -> Simulation<Cursor<Vec<u8>>> {
        Simulation::build(AddressLayout::new(10).unwrap(), frames, traces, cycles)
    }

    #[cfg(test)]
    mod simulation_tests {

        use super::*;

        #[test]
        fn golden_sequence_both_passes() {
            let mut sim = simulation(4, vec![trace("golden", &[1, 2, 3, 4, 1, 2, 5])], 7);
            for kind in PageTableKind::ALL {
                let report = sim.run_pass(kind, None).unwrap();
                let stats = report.processes[0].stats;
                assert_eq!(stats.traces, 7);
                assert_eq!(stats.page_faults, 5);
                assert_eq!(stats.page_hits, 2);
            }
        }

        #[test]
        fn counters_reset_between_passes() {
            let mut sim = simulation(2, vec![trace("a", &[1, 1, 2, 3])], 4);
            let first = sim.run_pass(PageTableKind::Hierarchical, None).unwrap();
            let again = sim.run_pass(PageTableKind::Hierarchical, None).unwrap();
            assert_eq!(first, again);
            assert_eq!(first.processes[0].stats.second_level_tables, 1);
        }

        #[test]
        fn round_robin_shares_frames() {
            // two processes alternating over the same page number never hit with one frame
            let mut sim = simulation(1, vec![trace("a", &[1, 1, 1]), trace("b", &[1, 1, 1])], 3);
            let report = sim.run_pass(PageTableKind::Inverted, None).unwrap();
            for process in &report.processes {
                assert_eq!(process.stats.page_faults, 3);
                assert_eq!(process.stats.page_hits, 0);
                assert_eq!(
                    process.stats.hash_null_accesses + process.stats.hash_non_null_accesses,
                    3
                );
            }
        }

        #[test]
        fn passes_are_equivalent() {
            let a = trace("a", &[1, 7, 3, 1, 9, 7, 2, 1, 3, 3, 8, 1]);
            let b = trace("b", &[1, 2, 3, 4, 5, 6, 1, 2, 3, 4, 5, 6]);
            let mut sim = simulation(4, vec![a, b], 12);
            let hierarchical = sim.run_pass(PageTableKind::Hierarchical, None).unwrap();
            let inverted = sim.run_pass(PageTableKind::Inverted, None).unwrap();
            assert!(hierarchical.check_equivalent(&inverted).is_ok());
            assert_eq!(hierarchical.totals().traces, 24);
        }

        #[test]
        fn exhausted_trace_is_fatal() {
            let mut sim = simulation(4, vec![trace("short", &[1, 2])], 3);
            match sim.run_pass(PageTableKind::Hierarchical, None) {
                Err(Error::TraceExhausted { trace, records }) => {
                    assert_eq!(trace, "short");
                    assert_eq!(records, 2);
                }
                other => panic!("unexpected: {:?}", other),
            }
        }

        #[test]
        fn echo() {
            let mut sim = simulation(4, vec![trace("a", &[1, 2])], 2);
            let mut out: Vec<u8> = Vec::new();
            sim.run_pass(PageTableKind::Inverted, Some(&mut out)).unwrap();
            let text = String::from_utf8(out).unwrap();
            let lines: Vec<&str> = text.lines().collect();
            assert_eq!(
                lines,
                vec![
                    "IHT procID 0 traceNumber 1 virtual addr 102a physical addr 2a",
                    "IHT procID 0 traceNumber 2 virtual addr 202a physical addr 102a",
                ]
            );
        }
    }

    #[cfg(test)]
    mod pass_report_tests {

        use super::*;

        fn report(kind: PageTableKind, faults: u64) -> PassReport {
            PassReport {
                kind,
                processes: vec![ProcessReport {
                    pid: 0,
                    name: String::from("t"),
                    stats: ProcessStats {
                        traces: 10,
                        page_faults: faults,
                        page_hits: 10 - faults,
                        ..ProcessStats::default()
                    },
                }],
            }
        }

        #[test]
        fn check_equivalent_detects_mismatch() {
            let a = report(PageTableKind::Hierarchical, 4);
            let b = report(PageTableKind::Inverted, 5);
            assert!(matches!(a.check_equivalent(&b), Err(Error::Invariant(_))));
        }

        #[test]
        fn display_hierarchical() {
            let text = report(PageTableKind::Hierarchical, 4).to_string();
            assert_eq!(
                text,
                "**** t *****\n\
                 Proc 0 Num of traces 10\n\
                 Proc 0 Num of second level page tables allocated 0\n\
                 Proc 0 Num of Page Faults 4\n\
                 Proc 0 Num of Page Hit 6\n"
            );
        }

        #[test]
        fn display_inverted() {
            let text = report(PageTableKind::Inverted, 4).to_string();
            assert!(text.contains("Proc 0 Num of Inverted Hash Table Access Conflicts 0\n"));
            assert!(text.contains("Proc 0 Num of Empty Inverted Hash Table Access 0\n"));
            assert!(text.contains("Proc 0 Num of Non-Empty Inverted Hash Table Access 0\n"));
            assert!(!text.contains("second level"));
        }
    }
}
