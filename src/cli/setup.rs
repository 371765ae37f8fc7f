//! Runtime setup for the binary.

use log::LevelFilter;

/// Default log level for a `-v` count.
pub fn verbosity_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs the global logger. `RUST_LOG` takes precedence over `-v`.
pub fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(verbosity_level(verbose))
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false);

    if let Err(e) = builder.try_init() {
        eprintln!("Note: logger already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(verbosity_level(0), LevelFilter::Warn);
        assert_eq!(verbosity_level(1), LevelFilter::Info);
        assert_eq!(verbosity_level(2), LevelFilter::Debug);
        assert_eq!(verbosity_level(7), LevelFilter::Trace);
    }
}
