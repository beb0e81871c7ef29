use crate::address::AddressLayout;
use crate::error::{Error, Result};
use crate::{DEFAULT_CYCLES, MAX_PHYSICAL_MEMORY_BITS, PAGE_SIZE_BITS};
use clap::Parser;
use std::path::PathBuf;

/// Compare a two-level page table with an inverted page table over the same memory traces.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Virtual address bits used to index the first level page table.
    pub first_level_bits: u32,

    /// Physical memory size in bits; the frame count is 2^(bits - 12).
    pub physical_memory_bits: u32,

    /// Memory trace files, one per simulated process.
    #[arg(required = true)]
    pub traces: Vec<PathBuf>,

    /// Print the physical address of every translated access.
    #[arg(short = 's', long)]
    pub echo: bool,

    /// Simulation cycles per pass; each cycle reads one record from every trace.
    #[arg(long, env = "SIM_CYCLES", default_value_t = DEFAULT_CYCLES)]
    pub cycles: u64,

    /// Do not draw a progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

impl Config {
    /// Reject configurations that cannot be simulated.
    ///
    /// # Errors
    ///
    /// Physical memory must hold at least one page and frame numbers must fit a 32-bit physical
    /// address; the first level must leave at least one bit for the second level.
    pub fn validate(&self) -> Result<()> {
        if self.physical_memory_bits < PAGE_SIZE_BITS {
            return Err(Error::PhysicalMemoryTooSmall(self.physical_memory_bits));
        }
        if self.physical_memory_bits > MAX_PHYSICAL_MEMORY_BITS {
            return Err(Error::PhysicalMemoryTooLarge(self.physical_memory_bits));
        }
        self.layout()?;
        Ok(())
    }

    pub fn layout(&self) -> Result<AddressLayout> {
        AddressLayout::new(self.first_level_bits)
    }

    pub fn frame_count(&self) -> usize {
        1 << (self.physical_memory_bits - PAGE_SIZE_BITS)
    }

    pub fn physical_memory_bytes(&self) -> u64 {
        1 << self.physical_memory_bits
    }

    pub fn display(&self) {
        log::info!("simulation configuration values: {:#?}", self);
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("page_table_sim").chain(args.iter().copied()))
            .unwrap()
    }

    #[cfg(test)]
    mod config_tests {

        use super::*;

        #[test]
        fn parse_positionals() {
            let config = parse(&["10", "16", "a.trace", "b.trace", "--cycles", "5"]);
            assert_eq!(config.first_level_bits, 10);
            assert_eq!(config.physical_memory_bits, 16);
            assert_eq!(
                config.traces,
                vec![PathBuf::from("a.trace"), PathBuf::from("b.trace")]
            );
            assert_eq!(config.cycles, 5);
            assert!(!config.echo);
        }

        #[test]
        fn parse_echo() {
            let config = parse(&["-s", "8", "14", "a.trace"]);
            assert!(config.echo);
        }

        #[test]
        fn traces_required() {
            let result = Config::try_parse_from(["page_table_sim", "10", "16"]);
            assert!(result.is_err());
        }

        #[test]
        fn negative_width_rejected() {
            let result = Config::try_parse_from(["page_table_sim", "--", "-1", "16", "a.trace"]);
            assert!(result.is_err());
        }

        #[test]
        fn validate() {
            assert!(parse(&["10", "16", "a"]).validate().is_ok());
            assert!(parse(&["19", "12", "a"]).validate().is_ok());
            assert!(parse(&["0", "32", "a"]).validate().is_ok());
            assert!(matches!(
                parse(&["10", "11", "a"]).validate(),
                Err(Error::PhysicalMemoryTooSmall(11))
            ));
            assert!(matches!(
                parse(&["10", "33", "a"]).validate(),
                Err(Error::PhysicalMemoryTooLarge(33))
            ));
            assert!(matches!(
                parse(&["20", "16", "a"]).validate(),
                Err(Error::FirstLevelTooWide(20))
            ));
        }

        #[test]
        fn validate_rejects_huge_first_level() {
            assert!(matches!(
                parse(&["4294967290", "16", "a"]).validate(),
                Err(Error::FirstLevelTooWide(4294967290))
            ));
        }

        #[test]
        fn sizes() {
            let config = parse(&["10", "16", "a"]);
            assert_eq!(config.frame_count(), 16);
            assert_eq!(config.physical_memory_bytes(), 65536);
        }
    }
}
