use clap::Parser;
use std::path::PathBuf;

use crate::types::DEFAULT_OUTPUT_PREFIX;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "subhound",
    version = crate::LONG_VERSION,
    about = "Subdomain discovery and IP enrichment",
    long_about = "subhound discovers subdomains of each domain in a list through certificate transparency logs and DNS CNAME records,\nthen resolves every hostname and annotates it with geolocation, ISP and cloud provider data.\nResults are written to a timestamped CSV report."
)]
pub struct Args {
    /// File containing one domain per line
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: PathBuf,

    /// Report name prefix
    #[arg(short = 'o', long = "output", value_name = "NAME", default_value = DEFAULT_OUTPUT_PREFIX)]
    pub output: String,

    /// Directory the report is written to (overrides configuration)
    #[arg(long = "reports-dir", value_name = "DIR")]
    pub reports_dir: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<String>,

    /// Verbose mode
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
