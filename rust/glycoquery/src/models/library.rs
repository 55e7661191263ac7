//! Target library model.
//!
//! The library is produced by an upstream composition generator and
//! consumed read-only here. Each [`LibraryEntry`] carries the modelled
//! isotope envelope of the neutral glycan and one target m/z per adduct.
//!
//! Adduct labels are element/count strings such as `H1`, `Na1`, `H1Na1`
//! or `H-1`; the charge of the ion is the signed sum of the counts.

use crate::errors::LibraryReadingError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::hash_map::Entry;
use std::collections::{
    BTreeMap,
    HashMap,
    HashSet,
};

static ADDUCT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][a-z]*)(-?\d*)").expect("adduct token regex is valid")
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdductTarget {
    pub label: String,
    pub mz: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryEntry {
    pub formula: String,
    #[serde(default)]
    pub composition: BTreeMap<String, u32>,
    pub neutral_mass: f64,
    /// Mass of the reducing-end tag already included in `neutral_mass`.
    #[serde(default)]
    pub tag_mass: f64,
    pub envelope_mass: Vec<f64>,
    pub envelope_abundance: Vec<f64>,
    pub adducts: Vec<AdductTarget>,
    #[serde(default)]
    pub internal_standard: bool,
}

/// One (glycan, adduct) ion ready for extraction.
///
/// Isotope positions are offsets from `mz`, excluding the monoisotopic peak.
#[derive(Debug, Clone, PartialEq)]
pub struct IonTarget {
    pub label: String,
    pub mz: f64,
    pub charge: u32,
    pub isotope_offsets: Vec<f64>,
    pub isotope_abundances: Vec<f64>,
}

impl IonTarget {
    pub fn num_isotopes(&self) -> usize {
        self.isotope_offsets.len()
    }

    pub fn isotope_mz(&self, i: usize) -> f64 {
        self.mz + self.isotope_offsets[i]
    }
}

/// Signed charge encoded in an adduct label.
///
/// ```
/// use glycoquery::models::library::adduct_charge;
///
/// assert_eq!(adduct_charge("H1").unwrap(), 1);
/// assert_eq!(adduct_charge("H1Na1").unwrap(), 2);
/// assert_eq!(adduct_charge("H-2").unwrap(), -2);
/// assert!(adduct_charge("h1").is_err());
/// ```
pub fn adduct_charge(label: &str) -> Result<i32, LibraryReadingError> {
    let malformed = |reason: &str| LibraryReadingError::MalformedEntry {
        glycan: label.to_string(),
        reason: reason.to_string(),
    };
    let mut charge = 0i32;
    let mut consumed = 0usize;
    for cap in ADDUCT_TOKEN.captures_iter(label) {
        let whole = cap.get(0).ok_or_else(|| malformed("empty adduct token"))?;
        if whole.start() != consumed {
            return Err(malformed("unparsable adduct label"));
        }
        consumed = whole.end();
        let count = match cap.get(2).map(|m| m.as_str()) {
            None | Some("") => 1,
            Some("-") => -1,
            Some(x) => x
                .parse::<i32>()
                .map_err(|_| malformed("unparsable adduct count"))?,
        };
        charge += count;
    }
    if consumed != label.len() || consumed == 0 {
        return Err(malformed("unparsable adduct label"));
    }
    Ok(charge)
}

impl LibraryEntry {
    pub fn validate(&self) -> Result<(), LibraryReadingError> {
        let malformed = |reason: String| LibraryReadingError::MalformedEntry {
            glycan: self.formula.clone(),
            reason,
        };
        if self.envelope_mass.is_empty() {
            return Err(malformed("empty isotope envelope".into()));
        }
        if self.envelope_mass.len() != self.envelope_abundance.len() {
            return Err(malformed(format!(
                "envelope has {} masses but {} abundances",
                self.envelope_mass.len(),
                self.envelope_abundance.len()
            )));
        }
        if (self.envelope_abundance[0] - 1.0).abs() > 1e-9 {
            return Err(malformed(format!(
                "monoisotopic abundance must be 1.0, got {}",
                self.envelope_abundance[0]
            )));
        }
        if self.envelope_mass.windows(2).any(|w| w[0] >= w[1]) {
            return Err(malformed("envelope masses are not ascending".into()));
        }
        if self.adducts.is_empty() {
            return Err(malformed("no adducts".into()));
        }
        for adduct in self.adducts.iter() {
            let charge = adduct_charge(&adduct.label).map_err(|_| {
                malformed(format!("unparsable adduct label '{}'", adduct.label))
            })?;
            if charge == 0 {
                return Err(malformed(format!("adduct '{}' has no charge", adduct.label)));
            }
            if !(adduct.mz.is_finite() && adduct.mz > 0.0) {
                return Err(malformed(format!(
                    "adduct '{}' has invalid m/z {}",
                    adduct.label, adduct.mz
                )));
            }
        }
        Ok(())
    }

    pub fn ion_targets(&self) -> Result<Vec<IonTarget>, LibraryReadingError> {
        let mono = self.envelope_mass[0];
        self.adducts
            .iter()
            .map(|adduct| {
                let charge = adduct_charge(&adduct.label)?.unsigned_abs();
                let isotope_offsets = self.envelope_mass[1..]
                    .iter()
                    .map(|m| (m - mono) / charge as f64)
                    .collect();
                Ok(IonTarget {
                    label: adduct.label.clone(),
                    mz: adduct.mz,
                    charge,
                    isotope_offsets,
                    isotope_abundances: self.envelope_abundance[1..].to_vec(),
                })
            })
            .collect()
    }

    /// Two entries are indistinguishable by m/z when they share the neutral
    /// mass and every adduct target. Internal standards never pair with
    /// regular entries since their peaks are picked differently.
    pub fn mass_key(&self) -> (bool, u64, Vec<(String, u64)>) {
        (
            self.internal_standard,
            self.neutral_mass.to_bits(),
            self.adducts
                .iter()
                .map(|a| (a.label.clone(), a.mz.to_bits()))
                .collect(),
        )
    }
}

/// Validated, insertion-ordered target library.
#[derive(Debug, Clone, Default)]
pub struct TargetLibrary {
    entries: Vec<LibraryEntry>,
    /// Index of the first earlier entry with the same [`LibraryEntry::mass_key`].
    twins: Vec<Option<usize>>,
}

impl TargetLibrary {
    pub fn from_entries(entries: Vec<LibraryEntry>) -> Result<Self, LibraryReadingError> {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut first_by_mass = HashMap::with_capacity(entries.len());
        let mut twins = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            entry.validate()?;
            if !seen.insert(entry.formula.as_str()) {
                return Err(LibraryReadingError::MalformedEntry {
                    glycan: entry.formula.clone(),
                    reason: "duplicate glycan".to_string(),
                });
            }
            twins.push(match first_by_mass.entry(entry.mass_key()) {
                Entry::Occupied(first) => Some(*first.get()),
                Entry::Vacant(slot) => {
                    slot.insert(idx);
                    None
                }
            });
        }
        Ok(Self { entries, twins })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    /// Earliest entry indistinguishable from entry `idx`, if any.
    pub fn twin_of(&self, idx: usize) -> Option<usize> {
        self.twins.get(idx).copied().flatten()
    }
}
