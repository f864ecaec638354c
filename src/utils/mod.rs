// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::Result;
use log::LevelFilter;

pub mod worker_pool;

pub use worker_pool::ThreadPool;

/// Install a global logger writing to STDERR at the given level.
pub fn setup_logger(level: LevelFilter) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

/// Length of the longest common prefix of two sequences.
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Length of the longest common suffix of two sequences.
pub fn common_suffix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefix_and_suffix() {
        assert_eq!(common_prefix_len(b"TTACG", b"TTACT"), 4);
        assert_eq!(common_suffix_len(b"TTACGCT", b"TGGCGCT"), 4);
        assert_eq!(common_prefix_len(b"TAG", b"TTACG"), 1);
        assert_eq!(common_suffix_len(b"", b"ACGT"), 0);
        assert_eq!(common_prefix_len(b"ACG", b"ACGT"), 3);
    }

    #[test]
    fn test_setup_logger() {
        setup_logger(LevelFilter::Warn).unwrap();
        assert_eq!(log::max_level(), LevelFilter::Warn);
        // only one global logger per process
        assert!(setup_logger(LevelFilter::Debug).is_err());
    }
}
