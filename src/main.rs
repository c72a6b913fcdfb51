use clap::Parser;
use dmsim::args::Args;
use dmsim::runner::Runner;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    Runner::setup_logger(&args);
    let runner = Runner::new(args)?;
    runner.start()
}
