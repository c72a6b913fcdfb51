use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None, name = "dmsim")]
pub struct Args {
    /// Path to settings (yaml file).
    #[clap(long)]
    pub settings: String,

    /// Path to wildtype gene (fasta file).
    #[clap(long)]
    pub sequence: String,

    /// Path to output directory.
    #[clap(long, short)]
    pub outdir: String,

    /// Path to pre-selection counts (csv file), used instead of simulated counts.
    #[clap(long)]
    pub pre_counts: Option<String>,

    /// Seed, overriding the seed in the settings.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Path to log file.
    #[clap(long, default_value = "dmsim.log")]
    pub log_file: String,

    /// Verbosity level.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
