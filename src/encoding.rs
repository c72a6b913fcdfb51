//! Nucleotide, codon and amino-acid alphabets.

use phf::phf_map;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
}

/// Nucleotide alphabet used for genes and barcodes.
pub const NUCLEOTIDES: [Nucleotide; 4] =
    [Nucleotide::A, Nucleotide::C, Nucleotide::G, Nucleotide::T];

/// Amino acids followed by the stop symbol.
pub const AMINO_ACIDS: [char; 21] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'Y', '*',
];

pub const STOP: char = '*';

pub static CODON_TO_AA: phf::Map<&'static str, char> = phf_map! {
    "AAA" => 'K', "AAC" => 'N', "AAG" => 'K', "AAT" => 'N',
    "ACA" => 'T', "ACC" => 'T', "ACG" => 'T', "ACT" => 'T',
    "AGA" => 'R', "AGC" => 'S', "AGG" => 'R', "AGT" => 'S',
    "ATA" => 'I', "ATC" => 'I', "ATG" => 'M', "ATT" => 'I',
    "CAA" => 'Q', "CAC" => 'H', "CAG" => 'Q', "CAT" => 'H',
    "CCA" => 'P', "CCC" => 'P', "CCG" => 'P', "CCT" => 'P',
    "CGA" => 'R', "CGC" => 'R', "CGG" => 'R', "CGT" => 'R',
    "CTA" => 'L', "CTC" => 'L', "CTG" => 'L', "CTT" => 'L',
    "GAA" => 'E', "GAC" => 'D', "GAG" => 'E', "GAT" => 'D',
    "GCA" => 'A', "GCC" => 'A', "GCG" => 'A', "GCT" => 'A',
    "GGA" => 'G', "GGC" => 'G', "GGG" => 'G', "GGT" => 'G',
    "GTA" => 'V', "GTC" => 'V', "GTG" => 'V', "GTT" => 'V',
    "TAA" => '*', "TAC" => 'Y', "TAG" => '*', "TAT" => 'Y',
    "TCA" => 'S', "TCC" => 'S', "TCG" => 'S', "TCT" => 'S',
    "TGA" => '*', "TGC" => 'C', "TGG" => 'W', "TGT" => 'C',
    "TTA" => 'L', "TTC" => 'F', "TTG" => 'L', "TTT" => 'F',
};

impl Nucleotide {
    pub fn try_decode(s: &u8) -> Option<Self> {
        match s {
            // ACGT | acgt -> Nucleotide
            0x41 | 0x61 => Some(Nucleotide::A),
            0x43 | 0x63 => Some(Nucleotide::C),
            0x47 | 0x67 => Some(Nucleotide::G),
            0x54 | 0x74 => Some(Nucleotide::T),
            _ => None,
        }
    }

    pub fn encode(&self) -> u8 {
        match self {
            Nucleotide::A => 0x41,
            Nucleotide::C => 0x43,
            Nucleotide::G => 0x47,
            Nucleotide::T => 0x54,
        }
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.encode() as char)
    }
}

/// Decode a nucleotide string, returning `None` on the first invalid symbol.
pub fn decode_sequence(sequence: &str) -> Option<Vec<Nucleotide>> {
    sequence.as_bytes().iter().map(Nucleotide::try_decode).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Codon(pub [Nucleotide; 3]);

/// All 64 codons in lexicographic `ACGT` order.
pub const CODONS: [Codon; 64] = make_codons();

const fn make_codons() -> [Codon; 64] {
    let mut codons = [Codon([Nucleotide::A; 3]); 64];
    let mut i = 0;
    while i < 64 {
        codons[i] = Codon([NUCLEOTIDES[i / 16], NUCLEOTIDES[(i / 4) % 4], NUCLEOTIDES[i % 4]]);
        i += 1;
    }
    codons
}

impl Codon {
    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [a, b, c] => Some(Codon([
                Nucleotide::try_decode(a)?,
                Nucleotide::try_decode(b)?,
                Nucleotide::try_decode(c)?,
            ])),
            _ => None,
        }
    }

    pub fn nucleotides(&self) -> &[Nucleotide; 3] {
        &self.0
    }

    /// Translate with the standard genetic code.
    pub fn translate(&self) -> char {
        let bytes = self.0.map(|nt| nt.encode());
        match std::str::from_utf8(&bytes)
            .ok()
            .and_then(|key| CODON_TO_AA.get(key))
        {
            Some(aa) => *aa,
            None => unreachable!("codon {} is missing from the genetic code", self),
        }
    }
}

impl fmt::Display for Codon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", self.0[0], self.0[1], self.0[2])
    }
}
