//! Simulation of pre- and post-selection variant counts.
//!
//! The simulation proceeds in four stages:
//!
//! 1. Variant calling errors: with probability `variant_error_rate`, a codon substitution is
//!    spuriously added to or removed from a variant before its phenotype is computed.
//! 2. Phenotypes: the phenotype function is evaluated on every (possibly erroneous) variant.
//! 3. Pre-selection: frequencies are either taken from given counts, or drawn from a Dirichlet
//!    distribution and then sequenced as a multinomial draw.
//! 4. Post-selection: for every library and post-selection sample, frequencies optionally pass a
//!    bottleneck, are multiplied with phenotype and noise, renormalized and sequenced again.

use itertools::izip;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;

use super::phenotype::PhenotypeFunction;
use super::variants::random_mutant_codon;
use crate::core::rng::with_default_rng;
use crate::core::sampling::{dirichlet, multinomial, noise_factors};
use crate::core::substitutions::CodonSubstitution;
use crate::core::variants::{BarcodeVariant, CodonVariantTable};
use crate::errors::{Result, SimulationError};

/// Probability that an erroneous variant call gains rather than loses a substitution.
const ADD_SUBSTITUTION_PROBABILITY: f64 = 0.5;

/// Pre-selection count of a single barcode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PreSampleCount {
    pub library: String,
    pub barcode: String,
    pub count: u64,
}

/// Parameters of simulated pre-selection counts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimulatedPreSample {
    /// Total counts per library.
    pub total_count: u64,

    /// Concentration of the Dirichlet distribution of frequencies. Larger values give more even
    /// libraries.
    pub uniformity: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PreSample {
    Simulated(SimulatedPreSample),
    /// Exact pre-selection counts of every barcode in every library.
    Counts(Vec<PreSampleCount>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PostSample {
    /// Total counts per library.
    pub total_count: u64,

    /// Standard deviation of the multiplicative noise on selection, which has mean 1.
    pub noise: f64,

    /// Size of the bottleneck that pre-selection frequencies pass before selection. Must be given
    /// explicitly, `null` meaning no bottleneck.
    #[serde(deserialize_with = "deserialize_bottleneck")]
    pub bottleneck: Option<u64>,
}

fn deserialize_bottleneck<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<u64>::deserialize(deserializer)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CountSpec {
    /// Probability that a variant has a spuriously called or missing codon substitution.
    pub variant_error_rate: f64,
    pub pre_sample: PreSample,
    pub post_samples: BTreeMap<String, PostSample>,
    #[serde(default = "default_pre_sample_name")]
    pub pre_sample_name: String,
}

fn default_pre_sample_name() -> String {
    "pre-selection".to_string()
}

/// Count of one barcode in one sample.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SampleCount {
    pub library: String,
    pub barcode: String,
    pub sample: String,
    pub count: u64,
}

impl CountSpec {
    pub fn new(
        variant_error_rate: f64,
        pre_sample: PreSample,
        post_samples: BTreeMap<String, PostSample>,
    ) -> Self {
        Self {
            variant_error_rate,
            pre_sample,
            post_samples,
            pre_sample_name: default_pre_sample_name(),
        }
    }

    fn validate(&self, variants: &CodonVariantTable) -> Result<()> {
        if !(0. ..=1.).contains(&self.variant_error_rate) {
            return Err(SimulationError::ConfigurationError(format!(
                "variant error rate {} is not a probability",
                self.variant_error_rate
            )));
        }

        if self.post_samples.contains_key(&self.pre_sample_name) {
            return Err(SimulationError::ConfigurationError(format!(
                "pre-selection sample name {} is also a post-selection sample",
                self.pre_sample_name
            )));
        }

        for (sample, post_sample) in self.post_samples.iter() {
            if !post_sample.noise.is_finite() || post_sample.noise < 0. {
                return Err(SimulationError::ConfigurationError(format!(
                    "invalid noise {} for post-selection sample {sample}",
                    post_sample.noise
                )));
            }
            if post_sample.bottleneck == Some(0) {
                return Err(SimulationError::ConfigurationError(format!(
                    "bottleneck of post-selection sample {sample} must be positive"
                )));
            }
        }

        match &self.pre_sample {
            PreSample::Simulated(SimulatedPreSample { uniformity, .. }) => {
                if !uniformity.is_finite() || *uniformity <= 0. {
                    return Err(SimulationError::ConfigurationError(format!(
                        "uniformity {uniformity} of pre-selection sample must be positive"
                    )));
                }
            }
            PreSample::Counts(records) => validate_pre_counts(variants, records)?,
        }

        Ok(())
    }
}

/// Check that the given counts cover exactly the barcodes of `variants`, with positive totals.
fn validate_pre_counts(variants: &CodonVariantTable, records: &[PreSampleCount]) -> Result<()> {
    let mut given: HashSet<(&str, &str)> = HashSet::with_capacity(records.len());
    for record in records {
        if !given.insert((record.library.as_str(), record.barcode.as_str())) {
            return Err(SimulationError::ConfigurationError(format!(
                "pre-selection counts list barcode {} in library {} more than once",
                record.barcode, record.library
            )));
        }
    }

    let expected: HashSet<(&str, &str)> = variants
        .barcode_variants()
        .iter()
        .map(|variant| (variant.library.as_str(), variant.barcode.as_str()))
        .collect();

    if let Some((library, barcode)) = given.difference(&expected).next() {
        return Err(SimulationError::ConfigurationError(format!(
            "pre-selection counts contain unknown barcode {barcode} in library {library}"
        )));
    }
    if let Some((library, barcode)) = expected.difference(&given).next() {
        return Err(SimulationError::ConfigurationError(format!(
            "pre-selection counts lack barcode {barcode} in library {library}"
        )));
    }

    let mut totals: HashMap<&str, u64> = HashMap::new();
    for record in records {
        *totals.entry(record.library.as_str()).or_default() += record.count;
    }
    if let Some(library) = variants
        .libraries()
        .iter()
        .find(|library| totals.get(library.as_str()).copied().unwrap_or(0) == 0)
    {
        return Err(SimulationError::ConfigurationError(format!(
            "pre-selection counts of library {library} sum to zero"
        )));
    }

    Ok(())
}

/// Simulate counts of `variants` before and after selection on `phenotype`.
///
/// If `seed` is given, the default generator is reseeded before simulating.
pub fn simulate_sample_counts<P: PhenotypeFunction + ?Sized>(
    variants: &CodonVariantTable,
    phenotype: &P,
    spec: &CountSpec,
    seed: Option<u64>,
) -> Result<Vec<SampleCount>> {
    with_default_rng(seed, |rng| {
        simulate_sample_counts_with_rng(variants, phenotype, spec, rng)
    })
}

pub fn simulate_sample_counts_with_rng<P, R>(
    variants: &CodonVariantTable,
    phenotype: &P,
    spec: &CountSpec,
    rng: &mut R,
) -> Result<Vec<SampleCount>>
where
    P: PhenotypeFunction + ?Sized,
    R: Rng + ?Sized,
{
    spec.validate(variants)?;

    let called_variants = add_variant_errors(variants, spec.variant_error_rate, rng)?;
    let phenotypes = called_variants
        .iter()
        .map(|variant| {
            let value = phenotype.phenotype(variant)?;
            if !value.is_finite() || value < 0. {
                return Err(SimulationError::SamplingError(format!(
                    "phenotype {value} of barcode {} in library {} is not a non-negative number",
                    variant.barcode, variant.library
                )));
            }
            Ok(value)
        })
        .collect::<Result<Vec<f64>>>()?;

    let barcode_variants = variants.barcode_variants();
    let library_ranges = library_ranges(barcode_variants);
    let n_rows = barcode_variants.len() * (1 + spec.post_samples.len());
    let mut sample_counts = Vec::with_capacity(n_rows);

    // pre-selection
    let mut pre_freqs: Vec<Vec<f64>> = Vec::with_capacity(library_ranges.len());
    let given_counts: HashMap<(&str, &str), u64> = match &spec.pre_sample {
        PreSample::Counts(records) => records
            .iter()
            .map(|r| ((r.library.as_str(), r.barcode.as_str()), r.count))
            .collect(),
        PreSample::Simulated(_) => HashMap::new(),
    };
    for (library, range) in library_ranges.iter() {
        let library_variants = &barcode_variants[range.clone()];
        let (freqs, counts) = match &spec.pre_sample {
            PreSample::Simulated(SimulatedPreSample {
                total_count,
                uniformity,
            }) => {
                let freqs = dirichlet(rng, *uniformity, library_variants.len())?;
                let counts = multinomial(rng, *total_count, &freqs)?;
                (freqs, counts)
            }
            PreSample::Counts(_) => {
                let counts: Vec<u64> = library_variants
                    .iter()
                    .map(|v| given_counts[&(v.library.as_str(), v.barcode.as_str())])
                    .collect();
                let total = counts.iter().sum::<u64>() as f64;
                let freqs = counts.iter().map(|&c| c as f64 / total).collect();
                (freqs, counts)
            }
        };
        log::debug!(
            "Pre-selection sample {} of library {library} has {} counts.",
            spec.pre_sample_name,
            counts.iter().sum::<u64>()
        );
        push_sample_counts(
            &mut sample_counts,
            library_variants,
            &spec.pre_sample_name,
            counts,
        );
        pre_freqs.push(freqs);
    }

    // post-selection
    for ((library, range), freqs) in library_ranges.iter().zip(pre_freqs.iter()) {
        let library_variants = &barcode_variants[range.clone()];
        for (sample, post_sample) in spec.post_samples.iter() {
            let bottleneck_freqs: Vec<f64> = match post_sample.bottleneck {
                Some(bottleneck) => multinomial(rng, bottleneck, freqs)?
                    .into_iter()
                    .map(|count| count as f64 / bottleneck as f64)
                    .collect(),
                None => freqs.clone(),
            };
            let noise = noise_factors(rng, post_sample.noise, library_variants.len())?;
            let selected_freqs: Vec<f64> =
                izip!(bottleneck_freqs, &phenotypes[range.clone()], noise)
                    .map(|(freq, value, noise)| freq * value * noise)
                    .collect();
            let counts = multinomial(rng, post_sample.total_count, &selected_freqs).map_err(|_| {
                SimulationError::SamplingError(format!(
                    "no variant of library {library} survives selection in sample {sample}"
                ))
            })?;
            log::debug!("Simulated post-selection sample {sample} of library {library}.");
            push_sample_counts(&mut sample_counts, library_variants, sample, counts);
        }
    }

    log::info!(
        "Simulated counts for {} libraries and {} samples.",
        library_ranges.len(),
        spec.post_samples.len() + 1
    );

    Ok(sample_counts)
}

/// Spuriously add or remove a codon substitution in each variant with probability `rate`.
///
/// Amino-acid substitutions of the returned variants are recomputed from the codon
/// substitutions.
pub fn add_variant_errors<R: Rng + ?Sized>(
    variants: &CodonVariantTable,
    rate: f64,
    rng: &mut R,
) -> Result<Vec<BarcodeVariant>> {
    variants
        .barcode_variants()
        .iter()
        .map(|variant| {
            let mut variant = variant.clone();
            if rng.random::<f64>() >= rate {
                return Ok(variant);
            }

            let substitutions = &mut variant.codon_substitutions;
            if substitutions.is_empty() || rng.random::<f64>() < ADD_SUBSTITUTION_PROBABILITY {
                let mutated: HashSet<usize> = substitutions.iter().map(|s| s.site).collect();
                let unmutated: Vec<usize> = variants
                    .sites()
                    .iter()
                    .copied()
                    .filter(|site| !mutated.contains(site))
                    .collect();
                let site = *unmutated.choose(rng).ok_or_else(|| {
                    SimulationError::ExhaustionError(format!(
                        "barcode {} in library {} already has all sites mutated",
                        variant.barcode, variant.library
                    ))
                })?;
                let wildtype = variants.codons()[&site];
                let mutant = random_mutant_codon(rng, &wildtype);
                let position = substitutions.partition_point(|s| s.site < site);
                substitutions.insert(position, CodonSubstitution::new(wildtype, site, mutant));
            } else {
                let idx = rng.random_range(0..substitutions.len());
                substitutions.remove(idx);
            }

            variant.aa_substitutions =
                CodonVariantTable::codon_to_aa_substitutions(&variant.codon_substitutions);
            Ok(variant)
        })
        .collect()
}

/// Contiguous ranges of each library in variants sorted by library.
fn library_ranges(variants: &[BarcodeVariant]) -> Vec<(&str, Range<usize>)> {
    let mut ranges: Vec<(&str, Range<usize>)> = Vec::new();
    for (idx, variant) in variants.iter().enumerate() {
        match ranges.last_mut() {
            Some((library, range)) if *library == variant.library => range.end = idx + 1,
            _ => ranges.push((variant.library.as_str(), idx..idx + 1)),
        }
    }
    ranges
}

fn push_sample_counts(
    sample_counts: &mut Vec<SampleCount>,
    variants: &[BarcodeVariant],
    sample: &str,
    counts: Vec<u64>,
) {
    sample_counts.extend(variants.iter().zip(counts).map(|(variant, count)| SampleCount {
        library: variant.library.clone(),
        barcode: variant.barcode.clone(),
        sample: sample.to_string(),
        count,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::seeded_rng;
    use crate::core::variants::VariantRow;
    use crate::simulate::phenotype::{ConstantPhenotype, PhenotypeModel, PhenotypeSimulator};
    use crate::simulate::variants::{
        LibrarySpec, VariantCallSupport, VariantSpec, simulate_codon_variant_table,
    };
    use itertools::Itertools;

    // M G * K P
    const GENE: &str = "ATGGGATGAAAACCC";

    fn table(rows: &[(&str, &str, &str)]) -> CodonVariantTable {
        let rows: Vec<VariantRow> = rows
            .iter()
            .map(|(library, barcode, substitutions)| VariantRow {
                barcode: barcode.to_string(),
                substitutions: substitutions.to_string(),
                library: library.to_string(),
                variant_call_support: 1,
            })
            .collect();
        CodonVariantTable::new(GENE, &rows).unwrap()
    }

    fn simulated_table() -> CodonVariantTable {
        let spec = VariantSpec {
            barcode_length: 10,
            libraries: vec![
                LibrarySpec {
                    name: "lib_1".to_string(),
                    average_mutations: 1.,
                    variant_count: 200,
                },
                LibrarySpec {
                    name: "lib_2".to_string(),
                    average_mutations: 2.,
                    variant_count: 150,
                },
            ],
            variant_call_support: VariantCallSupport::Fixed(1),
        };
        simulate_codon_variant_table(&GENE.repeat(10), &spec, Some(1)).unwrap()
    }

    fn post_sample(total_count: u64, noise: f64, bottleneck: Option<u64>) -> PostSample {
        PostSample {
            total_count,
            noise,
            bottleneck,
        }
    }

    fn count_spec() -> CountSpec {
        CountSpec::new(
            0.01,
            PreSample::Simulated(SimulatedPreSample {
                total_count: 5000,
                uniformity: 5.,
            }),
            BTreeMap::from([
                ("post_b".to_string(), post_sample(3000, 0.2, Some(1000))),
                ("post_a".to_string(), post_sample(2000, 0., None)),
            ]),
        )
    }

    fn block_totals(counts: &[SampleCount]) -> Vec<(String, String, u64)> {
        counts
            .iter()
            .chunk_by(|c| (c.library.clone(), c.sample.clone()))
            .into_iter()
            .map(|((library, sample), group)| (library, sample, group.map(|c| c.count).sum()))
            .collect()
    }

    #[test]
    fn counts_are_conserved_and_ordered() {
        let variants = simulated_table();
        let gene = GENE.repeat(10);
        let phenotype = PhenotypeSimulator::new(&gene, &PhenotypeModel::default()).unwrap();
        let counts = simulate_sample_counts(&variants, &phenotype, &count_spec(), Some(1)).unwrap();
        assert_eq!(counts.len(), 350 * 3);

        let totals = block_totals(&counts);
        let expected: Vec<(String, String, u64)> = [
            ("lib_1", "pre-selection", 5000),
            ("lib_2", "pre-selection", 5000),
            ("lib_1", "post_a", 2000),
            ("lib_1", "post_b", 3000),
            ("lib_2", "post_a", 2000),
            ("lib_2", "post_b", 3000),
        ]
        .iter()
        .map(|(l, s, c)| (l.to_string(), s.to_string(), *c))
        .collect();
        assert_eq!(totals, expected);

        // barcodes keep the table order within each block
        let table_barcodes: Vec<&str> = variants
            .barcode_variants()
            .iter()
            .filter(|v| v.library == "lib_1")
            .map(|v| v.barcode.as_str())
            .collect();
        let block_barcodes: Vec<&str> = counts
            .iter()
            .filter(|c| c.library == "lib_1" && c.sample == "post_b")
            .map(|c| c.barcode.as_str())
            .collect();
        assert_eq!(table_barcodes, block_barcodes);
    }

    #[test]
    fn deterministic_given_seed() {
        let variants = simulated_table();
        let phenotype = ConstantPhenotype(1.);
        let first = simulate_sample_counts(&variants, &phenotype, &count_spec(), Some(5)).unwrap();
        let second = simulate_sample_counts(&variants, &phenotype, &count_spec(), Some(5)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn selection_enriches_fit_variants() {
        let variants = table(&[("lib_1", "AAAA", ""), ("lib_1", "CCCC", "")]);
        let fit = |variant: &BarcodeVariant| -> Result<f64> {
            Ok(if variant.barcode == "AAAA" { 9. } else { 1. })
        };
        let spec = CountSpec::new(
            0.,
            PreSample::Counts(vec![
                PreSampleCount {
                    library: "lib_1".to_string(),
                    barcode: "AAAA".to_string(),
                    count: 500,
                },
                PreSampleCount {
                    library: "lib_1".to_string(),
                    barcode: "CCCC".to_string(),
                    count: 500,
                },
            ]),
            BTreeMap::from([("post".to_string(), post_sample(100_000, 0., None))]),
        );
        let counts =
            simulate_sample_counts_with_rng(&variants, &fit, &spec, &mut seeded_rng(1)).unwrap();
        assert_eq!(counts[0].sample, "pre-selection");
        assert_eq!(counts[0].count, 500);
        assert_eq!(counts[1].count, 500);
        let fraction = counts[2].count as f64 / 100_000.;
        assert!((fraction - 0.9).abs() < 0.01, "{fraction}");
    }

    #[test]
    fn post_counts_follow_pre_frequencies() {
        let barcodes = [
            "AAAA", "AAAC", "AAAG", "AAAT", "AACA", "AACC", "AACG", "AACT", "AAGA", "AAGC",
        ];
        let pre_counts: [u64; 10] = [10, 20, 30, 40, 50, 100, 150, 200, 150, 250];
        let rows: Vec<(&str, &str, &str)> = barcodes.iter().map(|b| ("lib_1", *b, "")).collect();
        let variants = table(&rows);
        let spec = CountSpec::new(
            0.,
            PreSample::Counts(
                barcodes
                    .iter()
                    .zip(pre_counts)
                    .map(|(barcode, count)| PreSampleCount {
                        library: "lib_1".to_string(),
                        barcode: barcode.to_string(),
                        count,
                    })
                    .collect(),
            ),
            BTreeMap::from([("post".to_string(), post_sample(1000, 0., None))]),
        );

        let n_seeds = 200;
        let mut observed = [0u64; 10];
        for seed in 0..n_seeds {
            let counts =
                simulate_sample_counts(&variants, &ConstantPhenotype(1.), &spec, Some(seed))
                    .unwrap();
            let post: Vec<u64> = counts
                .iter()
                .filter(|c| c.sample == "post")
                .map(|c| c.count)
                .collect();
            assert_eq!(post.iter().sum::<u64>(), 1000);
            for (total, count) in observed.iter_mut().zip(post) {
                *total += count;
            }
        }

        let chi_square: f64 = observed
            .iter()
            .zip(pre_counts)
            .map(|(&o, pre)| {
                let expected = n_seeds as f64 * pre as f64;
                (o as f64 - expected).powi(2) / expected
            })
            .sum();
        // 99.99% quantile of chi-square with 9 degrees of freedom
        assert!(chi_square < 33.72, "{chi_square}");
    }

    #[test]
    fn variant_errors_change_one_substitution() {
        let variants = table(&[
            ("lib_1", "AAAA", "A1G"),
            ("lib_1", "CCCC", "G4C"),
            ("lib_1", "GGGG", "T7C"),
            ("lib_1", "TTTT", "A10G"),
            ("lib_1", "ACGT", "C13A"),
        ]);
        for seed in 0..20 {
            let called = add_variant_errors(&variants, 1., &mut seeded_rng(seed)).unwrap();
            for (original, called) in variants.barcode_variants().iter().zip(called.iter()) {
                let n_original = original.codon_substitutions.len() as i64;
                let n_called = called.codon_substitutions.len() as i64;
                assert_eq!((n_called - n_original).abs(), 1);
                assert!(variants
                    .validate_codon_substitutions(&called.codon_substitutions)
                    .is_ok());
                assert!(called
                    .codon_substitutions
                    .windows(2)
                    .all(|pair| pair[0].site < pair[1].site));
                assert_eq!(
                    called.aa_substitutions,
                    CodonVariantTable::codon_to_aa_substitutions(&called.codon_substitutions)
                );
            }
        }
    }

    #[test]
    fn variant_errors_add_to_wildtype() {
        let variants = table(&[("lib_1", "AAAA", ""), ("lib_1", "CCCC", "")]);
        let called = add_variant_errors(&variants, 1., &mut seeded_rng(1)).unwrap();
        assert!(called.iter().all(|v| v.codon_substitutions.len() == 1));
        let untouched = add_variant_errors(&variants, 0., &mut seeded_rng(1)).unwrap();
        assert_eq!(untouched, variants.barcode_variants());
    }

    #[test]
    fn variant_errors_exhaust_sites() {
        let variants = table(&[("lib_1", "AAAA", "A1G G4C T7C A10G C13A")]);
        let outcomes: Vec<Result<Vec<BarcodeVariant>>> = (0..64)
            .map(|seed| add_variant_errors(&variants, 1., &mut seeded_rng(seed)))
            .collect();
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, Err(SimulationError::ExhaustionError(_)))));
        for outcome in outcomes.iter().filter_map(|o| o.as_ref().ok()) {
            assert_eq!(outcome[0].codon_substitutions.len(), 4);
        }
    }

    #[test]
    fn phenotype_errors_propagate() {
        let variants = table(&[("lib_1", "AAAA", "A1G")]);
        let spec = count_spec();
        let failing = |_: &BarcodeVariant| -> Result<f64> {
            Err(SimulationError::LookupError("no mutational effect for M1V".to_string()))
        };
        assert!(matches!(
            simulate_sample_counts(&variants, &failing, &spec, Some(1)),
            Err(SimulationError::LookupError(_))
        ));
        assert!(matches!(
            simulate_sample_counts(&variants, &ConstantPhenotype(-1.), &spec, Some(1)),
            Err(SimulationError::SamplingError(_))
        ));
        assert!(matches!(
            simulate_sample_counts(&variants, &ConstantPhenotype(0.), &spec, Some(1)),
            Err(SimulationError::SamplingError(_))
        ));
    }

    #[test]
    fn reject_invalid_specs() {
        let variants = table(&[("lib_1", "AAAA", ""), ("lib_2", "AAAA", "")]);
        let phenotype = ConstantPhenotype(1.);
        let check = |spec: CountSpec| {
            assert!(matches!(
                simulate_sample_counts(&variants, &phenotype, &spec, Some(1)),
                Err(SimulationError::ConfigurationError(_))
            ));
        };

        let mut spec = count_spec();
        spec.pre_sample_name = "post_a".to_string();
        check(spec);

        let mut spec = count_spec();
        spec.variant_error_rate = 1.5;
        check(spec);

        let mut spec = count_spec();
        spec.post_samples.insert("post_c".to_string(), post_sample(10, -1., None));
        check(spec);

        let mut spec = count_spec();
        spec.post_samples.insert("post_c".to_string(), post_sample(10, 0., Some(0)));
        check(spec);

        let mut spec = count_spec();
        spec.pre_sample = PreSample::Simulated(SimulatedPreSample {
            total_count: 10,
            uniformity: 0.,
        });
        check(spec);

        let record = |library: &str, barcode: &str, count: u64| PreSampleCount {
            library: library.to_string(),
            barcode: barcode.to_string(),
            count,
        };

        // missing barcode
        let mut spec = count_spec();
        spec.pre_sample = PreSample::Counts(vec![record("lib_1", "AAAA", 1)]);
        check(spec);

        // unknown barcode
        let mut spec = count_spec();
        spec.pre_sample = PreSample::Counts(vec![
            record("lib_1", "AAAA", 1),
            record("lib_2", "AAAA", 1),
            record("lib_2", "CCCC", 1),
        ]);
        check(spec);

        // duplicated barcode
        let mut spec = count_spec();
        spec.pre_sample = PreSample::Counts(vec![
            record("lib_1", "AAAA", 1),
            record("lib_1", "AAAA", 1),
            record("lib_2", "AAAA", 1),
        ]);
        check(spec);

        // library without counts
        let mut spec = count_spec();
        spec.pre_sample =
            PreSample::Counts(vec![record("lib_1", "AAAA", 1), record("lib_2", "AAAA", 0)]);
        check(spec);
    }

    #[test]
    fn read_post_samples() {
        let spec: CountSpec = serde_yaml::from_str(
            "variant_error_rate: 0.01\n\
             pre_sample:\n  total_count: 100\n  uniformity: 5\n\
             post_samples:\n  post:\n    total_count: 100\n    noise: 0.1\n    bottleneck: null\n",
        )
        .unwrap();
        assert_eq!(spec.pre_sample_name, "pre-selection");
        assert_eq!(spec.post_samples["post"], post_sample(100, 0.1, None));
        assert_eq!(
            spec.pre_sample,
            PreSample::Simulated(SimulatedPreSample {
                total_count: 100,
                uniformity: 5.,
            })
        );

        let missing: std::result::Result<PostSample, _> =
            serde_yaml::from_str("total_count: 100\nnoise: 0.1\n");
        assert!(missing.is_err());
        let extra: std::result::Result<PostSample, _> =
            serde_yaml::from_str("total_count: 100\nnoise: 0.1\nbottleneck: 10\nfoo: 1\n");
        assert!(extra.is_err());
        let bottleneck: PostSample =
            serde_yaml::from_str("total_count: 100\nnoise: 0.1\nbottleneck: 10\n").unwrap();
        assert_eq!(bottleneck.bottleneck, Some(10));
    }

    #[test]
    fn read_pre_sample_counts() {
        let pre_sample: PreSample = serde_yaml::from_str(
            "- {library: lib_1, barcode: AAAA, count: 3}\n\
             - {library: lib_1, barcode: CCCC, count: 4}\n",
        )
        .unwrap();
        match pre_sample {
            PreSample::Counts(records) => assert_eq!(records.len(), 2),
            _ => panic!("expected counts"),
        }
    }

    #[test]
    fn reject_unknown_keys() {
        let extra: std::result::Result<PreSample, _> =
            serde_yaml::from_str("total_count: 100\nuniformity: 5\nbogus: 1\n");
        assert!(extra.is_err());
        let missing: std::result::Result<PreSample, _> = serde_yaml::from_str("total_count: 100\n");
        assert!(missing.is_err());

        let misspelled: std::result::Result<CountSpec, _> = serde_yaml::from_str(
            "variant_error_rate: 0.01\n\
             pre_sample:\n  total_count: 100\n  uniformity: 5\n\
             post_samples: {}\n\
             pre_sample_nme: pre\n",
        );
        assert!(misspelled.is_err());
    }

    fn uniform_pre_counts(barcodes: &[&str], count: u64) -> PreSample {
        PreSample::Counts(
            barcodes
                .iter()
                .map(|barcode| PreSampleCount {
                    library: "lib_1".to_string(),
                    barcode: barcode.to_string(),
                    count,
                })
                .collect(),
        )
    }

    #[test]
    fn bottleneck_of_one_keeps_single_barcode() {
        let barcodes = ["AAAA", "CCCC", "GGGG", "TTTT"];
        let rows: Vec<(&str, &str, &str)> = barcodes.iter().map(|b| ("lib_1", *b, "")).collect();
        let variants = table(&rows);
        let spec = CountSpec::new(
            0.,
            uniform_pre_counts(&barcodes, 250),
            BTreeMap::from([("post".to_string(), post_sample(1000, 0., Some(1)))]),
        );

        for seed in 0..10 {
            let counts =
                simulate_sample_counts(&variants, &ConstantPhenotype(1.), &spec, Some(seed))
                    .unwrap();
            let post: Vec<u64> = counts
                .iter()
                .filter(|c| c.sample == "post")
                .map(|c| c.count)
                .collect();
            assert_eq!(post.len(), 4);
            assert_eq!(post.iter().filter(|&&c| c == 1000).count(), 1, "{post:?}");
            assert_eq!(post.iter().filter(|&&c| c == 0).count(), 3, "{post:?}");
        }
    }

    #[test]
    fn noise_changes_post_counts_only() {
        let variants = simulated_table();
        let spec_with_noise = |noise: f64| {
            CountSpec::new(
                0.,
                PreSample::Simulated(SimulatedPreSample {
                    total_count: 5000,
                    uniformity: 5.,
                }),
                BTreeMap::from([("post".to_string(), post_sample(5000, noise, None))]),
            )
        };
        let phenotype = ConstantPhenotype(1.);
        let exact = simulate_sample_counts(&variants, &phenotype, &spec_with_noise(0.), Some(3))
            .unwrap();
        let noisy = simulate_sample_counts(&variants, &phenotype, &spec_with_noise(0.5), Some(3))
            .unwrap();

        let block = |counts: &[SampleCount], sample: &str| -> Vec<u64> {
            counts
                .iter()
                .filter(|c| c.sample == sample)
                .map(|c| c.count)
                .collect()
        };
        assert_eq!(block(&exact, "pre-selection"), block(&noisy, "pre-selection"));
        assert_ne!(block(&exact, "post"), block(&noisy, "post"));
    }

    #[test]
    fn nested_default_generator_is_an_error() {
        let variants = table(&[("lib_1", "AAAA", "A1G")]);
        let nested = |_: &BarcodeVariant| -> Result<f64> {
            PhenotypeSimulator::new(GENE, &PhenotypeModel::default()).map(|_| 1.)
        };
        assert!(matches!(
            simulate_sample_counts(&variants, &nested, &count_spec(), Some(1)),
            Err(SimulationError::SamplingError(_))
        ));
        // explicit generators are unaffected
        assert!(
            simulate_sample_counts_with_rng(&variants, &nested, &count_spec(), &mut seeded_rng(1))
                .is_ok()
        );
    }

    #[test]
    fn library_ranges_are_contiguous() {
        let variants = table(&[
            ("lib_1", "AAAA", ""),
            ("lib_2", "AAAA", ""),
            ("lib_1", "CCCC", ""),
        ]);
        let ranges = library_ranges(variants.barcode_variants());
        assert_eq!(ranges, vec![("lib_1", 0..2), ("lib_2", 2..3)]);
    }
}
