use anyhow::Result;

use std::fs;
use std::path::{Path, PathBuf};

use crate::args::Args;
use crate::config::Settings;
use crate::core::{CodonVariantTable, VariantRow};
use crate::readwrite::{MutationEffectRow, TableIO, mutation_effect_rows, read_wildtype};
use crate::simulate::{
    PhenotypeSimulator, PreSample, PreSampleCount, SampleCount, simulate_sample_counts,
    simulate_variants,
};

pub struct Runner {
    settings: Settings,
    geneseq: String,
    outdir: PathBuf,
}

impl Runner {
    pub fn new(args: Args) -> Result<Runner> {
        let mut settings = Self::load_settings(&args.settings)?;
        if let Some(seed) = args.seed {
            settings.seed = Some(seed);
        }
        if let Some(path) = &args.pre_counts {
            let counts = PreSampleCount::read_table_from_file(Path::new(path))?;
            settings.counts.pre_sample = PreSample::Counts(counts);
        }

        let geneseq = read_wildtype(&args.sequence)?;
        log::info!("Loaded wildtype gene with {} codons.", geneseq.len() / 3);

        Ok(Self {
            settings,
            geneseq,
            outdir: PathBuf::from(args.outdir),
        })
    }

    /// Setup logging level and file
    pub fn setup_logger(args: &Args) {
        let log_level = match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        simple_logging::log_to_file(args.log_file.as_str(), log_level).unwrap_or_else(|_| {
            eprintln!("Unable to open log file.");
            std::process::exit(1);
        });
    }

    /// Load settings from file
    fn load_settings(path: &str) -> Result<Settings> {
        let settings: Settings = Settings::read_from_file(path)?;
        log::info!("Loaded settings\n{}", settings);
        Ok(settings)
    }

    /// Simulate variants, phenotypes and counts, and write each to the output directory.
    pub fn start(&self) -> Result<()> {
        fs::create_dir_all(&self.outdir)?;

        log::info!("Simulating variants...");
        let rows = simulate_variants(&self.geneseq, &self.settings.variants, self.settings.seed)?;
        VariantRow::write_table_to_file(&rows, &self.outdir.join("variants.csv"))?;
        let table = CodonVariantTable::new(&self.geneseq, &rows)?;

        log::info!("Simulating phenotypes...");
        let phenotype = PhenotypeSimulator::new(&self.geneseq, &self.settings.phenotype)?;
        MutationEffectRow::write_table_to_file(
            &mutation_effect_rows(&phenotype),
            &self.outdir.join("mutation_effects.csv"),
        )?;

        log::info!("Simulating counts...");
        let seed = self.settings.seed.map(|seed| seed.wrapping_add(1));
        let counts = simulate_sample_counts(&table, &phenotype, &self.settings.counts, seed)?;
        SampleCount::write_table_to_file(&counts, &self.outdir.join("counts.csv"))?;

        log::info!("Finished simulation.");
        Ok(())
    }
}
