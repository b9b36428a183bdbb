use std::path::PathBuf;

use clap::Parser;

/// Bundle a PHP entry script and everything it includes into one file
#[derive(Parser, Debug)]
#[command(name = "phpinclude")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Entry script
    #[arg(default_value = "src/index.php")]
    pub input: PathBuf,

    /// Where to write the bundle
    #[arg(default_value = "dest/index.php")]
    pub output: PathBuf,

    /// Keep running and rebuild when an included file changes
    #[arg(short, long)]
    pub watch: bool,

    /// Configuration file (default: ./phpinclude.toml if present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Diagnostics mode: readable module names and source comments
    #[arg(long)]
    pub dev: bool,

    /// Print watch events as NDJSON
    #[arg(long)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
