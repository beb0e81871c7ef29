pub mod address;
pub mod config;
pub mod error;
pub mod frame;
pub mod hierarchical;
pub mod inverted;
pub mod replacement;
pub mod simulation;
pub mod stats;
pub mod trace;

use config::Config;
use error::Result;
use simulation::{PageTableKind, PassReport, Simulation};
use std::io::{self, BufWriter, Write};
use trace::TraceReader;

pub const PAGE_SIZE_BITS: u32 = 12;
pub const VIRTUAL_ADDRESS_BITS: u32 = 32;
pub const MAX_PHYSICAL_MEMORY_BITS: u32 = 32;
pub const DEFAULT_CYCLES: u64 = 1_000_000;

const SEPARATOR: &str = "=============================================================";

/// Run both passes described by `config`, writing the results to standard output.
pub fn run_simulation(config: &Config) -> Result<Vec<PassReport>> {
    let mut out = BufWriter::new(io::stdout().lock());
    run_simulation_to(config, &mut out)
}

/// Validate `config`, open every trace, then run the hierarchical pass followed by the inverted
/// pass over the same traces. Reports (and the per-access echo, if enabled) are written to `out`.
///
/// # Errors
///
/// Fails on invalid configuration, unreadable or short traces, output errors, and if the two
/// passes disagree on any process's faults and hits.
pub fn run_simulation_to<W: Write>(config: &Config, out: &mut W) -> Result<Vec<PassReport>> {
    config.validate()?;
    let layout = config.layout()?;

    let mut traces = Vec::with_capacity(config.traces.len());
    for (pid, path) in config.traces.iter().enumerate() {
        writeln!(out, "process {} opening {}", pid, path.display())?;
        traces.push(TraceReader::open(path)?);
    }

    writeln!(
        out,
        "\nNum of Frames {} Physical Memory Size {} bytes",
        config.frame_count(),
        config.physical_memory_bytes()
    )?;

    let mut simulation = Simulation::build(layout, config.frame_count(), traces, config.cycles)
        .with_progress(!config.no_progress);

    let mut reports = Vec::with_capacity(PageTableKind::ALL.len());
    for kind in PageTableKind::ALL {
        writeln!(out, "{}\n{}\n{}", SEPARATOR, kind.banner(), SEPARATOR)?;
        let echo: Option<&mut dyn Write> = if config.echo { Some(&mut *out) } else { None };
        let report = simulation.run_pass(kind, echo)?;
        write!(out, "{}", report)?;
        reports.push(report);
    }
    out.flush()?;

    reports[0].check_equivalent(&reports[1])?;
    Ok(reports)
}
