//! Nucleotide, codon and amino-acid substitutions.
//!
//! All substitutions are written as `{wildtype}{position}{mutant}` with 1-based positions, e.g.
//! `A4G` (nucleotide), `ATG1GTG` (codon) or `M1V` (amino acid). Lists of substitutions are
//! delimited by single spaces.

use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

use crate::encoding::{AMINO_ACIDS, Codon, Nucleotide};
use crate::errors::{Result, SimulationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NucleotideSubstitution {
    pub wildtype: Nucleotide,
    pub position: usize,
    pub mutant: Nucleotide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodonSubstitution {
    pub wildtype: Codon,
    pub site: usize,
    pub mutant: Codon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AaSubstitution {
    pub wildtype: char,
    pub site: usize,
    pub mutant: char,
}

impl CodonSubstitution {
    pub fn new(wildtype: Codon, site: usize, mutant: Codon) -> Self {
        Self {
            wildtype,
            site,
            mutant,
        }
    }

    /// Translate into an amino-acid substitution, or `None` if the change is synonymous.
    pub fn translate(&self) -> Option<AaSubstitution> {
        let wildtype = self.wildtype.translate();
        let mutant = self.mutant.translate();
        (wildtype != mutant).then_some(AaSubstitution {
            wildtype,
            site: self.site,
            mutant,
        })
    }
}

impl AaSubstitution {
    pub fn new(wildtype: char, site: usize, mutant: char) -> Self {
        Self {
            wildtype,
            site,
            mutant,
        }
    }
}

/// Join substitutions into a space-delimited string.
pub fn join_substitutions<T: fmt::Display>(substitutions: &[T]) -> String {
    substitutions.iter().join(" ")
}

/// Parse a space-delimited list of substitutions.
pub fn parse_substitutions<T>(substitutions: &str) -> Result<Vec<T>>
where
    T: FromStr<Err = SimulationError>,
{
    substitutions.split_whitespace().map(str::parse).collect()
}

/// Split `token` into wildtype, position and mutant parts, where wildtype and mutant have
/// `width` bytes.
fn split_token(token: &str, width: usize) -> Result<(&str, usize, &str)> {
    let invalid = || SimulationError::ParseError(format!("invalid substitution {token}"));
    if !token.is_ascii() || token.len() < 2 * width + 1 {
        return Err(invalid());
    }
    let (wildtype, rest) = token.split_at(width);
    let (position, mutant) = rest.split_at(rest.len() - width);
    if !position.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let position: usize = position.parse().map_err(|_| invalid())?;
    if position == 0 {
        return Err(SimulationError::ParseError(format!(
            "substitution {token} is not in 1-based numbering"
        )));
    }
    Ok((wildtype, position, mutant))
}

impl FromStr for NucleotideSubstitution {
    type Err = SimulationError;

    fn from_str(token: &str) -> Result<Self> {
        let (wildtype, position, mutant) = split_token(token, 1)?;
        let decode = |part: &str| {
            Nucleotide::try_decode(&part.as_bytes()[0]).ok_or_else(|| {
                SimulationError::ParseError(format!("invalid nucleotide in {token}"))
            })
        };
        Ok(Self {
            wildtype: decode(wildtype)?,
            position,
            mutant: decode(mutant)?,
        })
    }
}

impl FromStr for CodonSubstitution {
    type Err = SimulationError;

    fn from_str(token: &str) -> Result<Self> {
        let (wildtype, site, mutant) = split_token(token, 3)?;
        let decode = |part: &str| {
            Codon::try_decode(part.as_bytes())
                .ok_or_else(|| SimulationError::ParseError(format!("invalid codon in {token}")))
        };
        Ok(Self::new(decode(wildtype)?, site, decode(mutant)?))
    }
}

impl FromStr for AaSubstitution {
    type Err = SimulationError;

    fn from_str(token: &str) -> Result<Self> {
        let (wildtype, site, mutant) = split_token(token, 1)?;
        let decode = |part: &str| {
            part.chars()
                .next()
                .filter(|aa| AMINO_ACIDS.contains(aa))
                .ok_or_else(|| {
                    SimulationError::ParseError(format!("invalid amino acid in {token}"))
                })
        };
        Ok(Self::new(decode(wildtype)?, site, decode(mutant)?))
    }
}

impl fmt::Display for NucleotideSubstitution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", self.wildtype, self.position, self.mutant)
    }
}

impl fmt::Display for CodonSubstitution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", self.wildtype, self.site, self.mutant)
    }
}

impl fmt::Display for AaSubstitution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", self.wildtype, self.site, self.mutant)
    }
}
