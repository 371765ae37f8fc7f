use anyhow::Result;
use stepmap::cli::{self, init_logging};
use stepmap::commands::{handle_analyze, AnalyzeConfig};

fn main() -> Result<()> {
    let cli = cli::parse_args();
    init_logging(cli.verbose);

    handle_analyze(AnalyzeConfig::from_cli(&cli))
}
