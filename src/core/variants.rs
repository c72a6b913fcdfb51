//! Barcoded codon variants of a gene.
//!
//! The `CodonVariantTable` is a read-only view on a set of barcoded variants. It is created from
//! rows that give nucleotide substitutions relative to the wildtype gene, converts them to codon
//! and amino-acid substitutions and validates them against the wildtype. Rows are kept sorted by
//! library and barcode.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::substitutions::{
    AaSubstitution, CodonSubstitution, NucleotideSubstitution, join_substitutions,
    parse_substitutions,
};
use crate::encoding::{Codon, Nucleotide, decode_sequence};
use crate::errors::{Result, SimulationError};

/// A single barcode-variant definition as produced by the variant simulation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VariantRow {
    pub barcode: String,
    /// Space-delimited nucleotide substitutions, e.g. `G301A A302T`.
    pub substitutions: String,
    pub library: String,
    pub variant_call_support: u32,
}

/// A barcoded variant with its codon and amino-acid substitutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeVariant {
    pub library: String,
    pub barcode: String,
    pub variant_call_support: u32,
    pub codon_substitutions: Vec<CodonSubstitution>,
    pub aa_substitutions: Vec<AaSubstitution>,
}

impl BarcodeVariant {
    pub fn codon_substitutions_string(&self) -> String {
        join_substitutions(&self.codon_substitutions)
    }

    pub fn aa_substitutions_string(&self) -> String {
        join_substitutions(&self.aa_substitutions)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodonVariantTable {
    geneseq: String,
    sites: Vec<usize>,
    codons: BTreeMap<usize, Codon>,
    libraries: Vec<String>,
    barcode_variants: Vec<BarcodeVariant>,
}

/// Decode a wildtype gene into codons, checking that it is non-empty and codon aligned.
pub fn decode_gene(geneseq: &str) -> Result<Vec<Codon>> {
    if geneseq.is_empty() || geneseq.len() % 3 != 0 {
        return Err(SimulationError::ConfigurationError(format!(
            "length of gene ({}) is not a positive multiple of 3",
            geneseq.len()
        )));
    }
    let nucleotides = decode_sequence(geneseq).ok_or_else(|| {
        SimulationError::ConfigurationError(format!("invalid nucleotides in gene {geneseq}"))
    })?;
    Ok(nucleotides
        .chunks_exact(3)
        .map(|chunk| Codon([chunk[0], chunk[1], chunk[2]]))
        .collect())
}

impl CodonVariantTable {
    /// Create a table from barcode-variant rows for the wildtype gene `geneseq`.
    pub fn new(geneseq: &str, rows: &[VariantRow]) -> Result<Self> {
        let geneseq = geneseq.to_uppercase();
        let codons: BTreeMap<usize, Codon> = decode_gene(&geneseq)?
            .into_iter()
            .enumerate()
            .map(|(idx, codon)| (idx + 1, codon))
            .collect();
        let sites: Vec<usize> = codons.keys().copied().collect();

        let mut barcodes: HashSet<(&str, &str)> = HashSet::with_capacity(rows.len());
        for row in rows {
            if !barcodes.insert((row.library.as_str(), row.barcode.as_str())) {
                return Err(SimulationError::ConfigurationError(format!(
                    "duplicated barcode {} in library {}",
                    row.barcode, row.library
                )));
            }
        }

        let mut table = Self {
            geneseq,
            sites,
            codons,
            libraries: Vec::new(),
            barcode_variants: Vec::with_capacity(rows.len()),
        };

        for row in rows {
            let codon_substitutions = table.nt_to_codon_substitutions(&row.substitutions)?;
            let aa_substitutions = Self::codon_to_aa_substitutions(&codon_substitutions);
            table.barcode_variants.push(BarcodeVariant {
                library: row.library.clone(),
                barcode: row.barcode.clone(),
                variant_call_support: row.variant_call_support,
                codon_substitutions,
                aa_substitutions,
            });
        }

        table
            .barcode_variants
            .sort_by(|a, b| (&a.library, &a.barcode).cmp(&(&b.library, &b.barcode)));
        table.libraries = table
            .barcode_variants
            .iter()
            .map(|variant| variant.library.clone())
            .dedup()
            .collect();

        log::debug!(
            "Created codon variant table with {} variants in {} libraries.",
            table.barcode_variants.len(),
            table.libraries.len()
        );

        Ok(table)
    }

    pub fn geneseq(&self) -> &str {
        &self.geneseq
    }

    /// Codon sites in 1, 2, ... numbering.
    pub fn sites(&self) -> &[usize] {
        &self.sites
    }

    /// Wildtype codon at each site.
    pub fn codons(&self) -> &BTreeMap<usize, Codon> {
        &self.codons
    }

    /// Libraries sorted by name.
    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    /// All variants sorted by library and barcode.
    pub fn barcode_variants(&self) -> &[BarcodeVariant] {
        &self.barcode_variants
    }

    /// Barcodes of a library, or `None` for an unknown library.
    pub fn valid_barcodes(&self, library: &str) -> Option<HashSet<&str>> {
        if !self.libraries.iter().any(|lib| lib == library) {
            return None;
        }
        Some(
            self.barcode_variants
                .iter()
                .filter(|variant| variant.library == library)
                .map(|variant| variant.barcode.as_str())
                .collect(),
        )
    }

    /// Translate codon substitutions into non-synonymous amino-acid substitutions sorted by site.
    pub fn codon_to_aa_substitutions(
        codon_substitutions: &[CodonSubstitution],
    ) -> Vec<AaSubstitution> {
        codon_substitutions
            .iter()
            .sorted_by_key(|substitution| substitution.site)
            .filter_map(CodonSubstitution::translate)
            .collect()
    }

    /// Convert space-delimited nucleotide substitutions into codon substitutions.
    pub fn nt_to_codon_substitutions(&self, substitutions: &str) -> Result<Vec<CodonSubstitution>> {
        let wildtype: Vec<Nucleotide> = self
            .codons
            .values()
            .flat_map(|codon| codon.nucleotides().iter().copied())
            .collect();

        let mut mutant_codons: BTreeMap<usize, Codon> = BTreeMap::new();
        let mut positions: HashSet<usize> = HashSet::new();
        for substitution in parse_substitutions::<NucleotideSubstitution>(substitutions)? {
            let NucleotideSubstitution {
                wildtype: wt_nt,
                position,
                mutant,
            } = substitution;
            if wt_nt == mutant {
                return Err(SimulationError::ParseError(format!(
                    "invalid substitution {substitution}"
                )));
            }
            if position > wildtype.len() {
                return Err(SimulationError::ParseError(format!(
                    "invalid nucleotide site {position}"
                )));
            }
            if wildtype[position - 1] != wt_nt {
                return Err(SimulationError::ParseError(format!(
                    "nucleotide {position} should be {} not {wt_nt}",
                    wildtype[position - 1]
                )));
            }
            if !positions.insert(position) {
                return Err(SimulationError::ParseError(format!(
                    "duplicate substitutions at nucleotide {position}"
                )));
            }
            let site = (position - 1) / 3 + 1;
            let codon = mutant_codons.entry(site).or_insert(self.codons[&site]);
            codon.0[(position - 1) % 3] = mutant;
        }

        Ok(mutant_codons
            .into_iter()
            .map(|(site, mutant)| CodonSubstitution::new(self.codons[&site], site, mutant))
            .collect())
    }

    /// Check that codon substitutions are valid for this table's wildtype.
    pub fn validate_codon_substitutions(&self, substitutions: &[CodonSubstitution]) -> Result<()> {
        let mut sites = HashSet::new();
        for substitution in substitutions {
            match self.codons.get(&substitution.site) {
                None => {
                    return Err(SimulationError::ParseError(format!(
                        "invalid site in codon substitution {substitution}"
                    )));
                }
                Some(codon) if *codon != substitution.wildtype => {
                    return Err(SimulationError::ParseError(format!(
                        "wrong wildtype codon in {substitution}, expected {codon}"
                    )));
                }
                _ => {}
            }
            if substitution.wildtype == substitution.mutant || !sites.insert(substitution.site) {
                return Err(SimulationError::ParseError(format!(
                    "invalid codon substitution {substitution}"
                )));
            }
        }
        Ok(())
    }
}
