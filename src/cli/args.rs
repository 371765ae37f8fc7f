use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stepmap")]
#[command(about = "State diagrams from Go state machine step functions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Go source files to analyze, processed in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Print the diagram to stdout instead of writing diagram files
    #[arg(short, long)]
    pub console: bool,

    /// Configuration file (defaults to the nearest .stepmap.toml)
    #[arg(long, env = "STEPMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Import path of the state machine framework
    #[arg(long)]
    pub framework: Option<String>,

    /// Extension of written diagram files
    #[arg(long)]
    pub extension: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["stepmap", "-c", "-vv", "--framework", "x/sm", "a.go", "b.go"])
            .unwrap();
        assert!(cli.console);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.framework.as_deref(), Some("x/sm"));
        assert_eq!(cli.files, vec![PathBuf::from("a.go"), PathBuf::from("b.go")]);
    }

    #[test]
    fn test_files_are_required() {
        assert!(Cli::try_parse_from(["stepmap", "-c"]).is_err());
    }
}
