//! Variant generation engine.
//!
//! Generation is a pure function of the target domain and the injected data
//! sources. Each technique is an independent unit registered in a
//! `TechniqueRegistry`; the generator runs the units in registration order
//! and unions their output into a `VariantSet`.
//!
//! # Ordering
//!
//! Registration order is technique priority. Within a technique, candidates
//! keep the order the unit produced them in. A domain produced by more than
//! one technique keeps the first technique that produced it. Truncation to
//! `max_variants` keeps the first `k` entries of that order, so a capped run
//! always yields the same subset.
//!
//! # Examples
//!
//! ```
//! use homograph_check_lib::generate::VariantGenerator;
//!
//! let generator = VariantGenerator::builtin();
//! let target = generator.target("example.com").unwrap();
//! let variants = generator.generate(&target);
//! assert!(variants.contains("examlpe.com"));
//! assert!(variants.contains("example.net"));
//! assert!(!variants.contains("example.com"));
//! ```

pub mod data;
pub mod techniques;

pub use data::{ConfusableMap, TldList};

use crate::error::HomographError;
use crate::types::{TargetDomain, Technique, Variant};
use crate::utils::{is_valid_domain, to_ascii_domain};
use std::collections::HashSet;
use std::fmt;

/// One raw candidate emitted by a technique unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub domain: String,
    pub detail: String,
}

impl Candidate {
    pub fn new<D: Into<String>, S: Into<String>>(domain: D, detail: S) -> Self {
        Self {
            domain: domain.into(),
            detail: detail.into(),
        }
    }
}

/// Read-only inputs shared by every technique unit during one generation.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub target: &'a TargetDomain,
    pub confusables: &'a ConfusableMap,
    pub tlds: &'a TldList,
}

impl<'a> GenerationContext<'a> {
    pub fn new(target: &'a TargetDomain, confusables: &'a ConfusableMap, tlds: &'a TldList) -> Self {
        Self {
            target,
            confusables,
            tlds,
        }
    }

    /// The target name in its Unicode form. Techniques transform this, not
    /// the punycode label.
    pub fn name(&self) -> &str {
        self.target.unicode_name()
    }

    /// The Unicode target name as characters.
    pub fn name_chars(&self) -> Vec<char> {
        self.name().chars().collect()
    }

    /// Attach the target TLD to a transformed name.
    pub fn with_name(&self, name: &str) -> String {
        format!("{}.{}", name, self.target.tld())
    }
}

/// A single generation technique.
///
/// Units must be deterministic: the same context always yields the same
/// candidates in the same order. Invalid candidates are allowed and are
/// filtered out by the `VariantSet`.
pub trait VariantTechnique: Send + Sync {
    /// Identifier attached to every variant this unit produces.
    fn technique(&self) -> Technique;

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate>;
}

/// Ordered collection of technique units. Order is priority.
#[derive(Default)]
pub struct TechniqueRegistry {
    units: Vec<Box<dyn VariantTechnique>>,
}

impl TechniqueRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in techniques in priority order.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for technique in Technique::BUILTIN.iter() {
            if let Some(unit) = builtin_unit(technique) {
                registry.units.push(unit);
            }
        }
        registry
    }

    /// Only the listed built-in techniques, still in priority order.
    /// Custom and unknown names are ignored.
    pub fn only(techniques: &[Technique]) -> Self {
        let mut registry = Self::new();
        for technique in Technique::BUILTIN.iter() {
            if techniques.contains(technique) {
                if let Some(unit) = builtin_unit(technique) {
                    registry.units.push(unit);
                }
            }
        }
        registry
    }

    /// Add a unit at the lowest priority. A unit for an already registered
    /// technique replaces it in place.
    pub fn register<T: VariantTechnique + 'static>(&mut self, unit: T) -> &mut Self {
        let technique = unit.technique();
        match self.units.iter().position(|u| u.technique() == technique) {
            Some(index) => self.units[index] = Box::new(unit),
            None => self.units.push(Box::new(unit)),
        }
        self
    }

    /// Builder form of `register`.
    pub fn with<T: VariantTechnique + 'static>(mut self, unit: T) -> Self {
        self.register(unit);
        self
    }

    /// Registered techniques in priority order.
    pub fn techniques(&self) -> Vec<Technique> {
        self.units.iter().map(|u| u.technique()).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &dyn VariantTechnique> {
        self.units.iter().map(|u| u.as_ref())
    }
}

impl fmt::Debug for TechniqueRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.techniques()).finish()
    }
}

fn builtin_unit(technique: &Technique) -> Option<Box<dyn VariantTechnique>> {
    use techniques::*;

    let unit: Box<dyn VariantTechnique> = match technique {
        Technique::Homoglyph => Box::new(Homoglyph),
        Technique::AsciiVisual => Box::new(AsciiVisual),
        Technique::VowelSwap => Box::new(VowelSwap),
        Technique::AdjacentKey => Box::new(AdjacentKey),
        Technique::Transposition => Box::new(Transposition),
        Technique::Omission => Box::new(Omission),
        Technique::Duplication => Box::new(Duplication),
        Technique::Insertion => Box::new(Insertion),
        Technique::TldVariation => Box::new(TldVariation),
        Technique::Hyphenation => Box::new(Hyphenation),
        Technique::DotInsertion => Box::new(DotInsertion),
        Technique::Affix => Box::new(Affix),
        Technique::Punycode => Box::new(Punycode),
        Technique::BitFlip => Box::new(BitFlip),
        Technique::WordCombination => Box::new(WordCombination),
        Technique::Phonetic => Box::new(Phonetic),
        Technique::Direct | Technique::Custom(_) => return None,
    };
    Some(unit)
}

/// De-duplicated, insertion-ordered set of variants for one target.
///
/// Keys are compared case-insensitively. The target itself, in either its
/// Unicode or ASCII form, is never admitted.
#[derive(Debug, Clone)]
pub struct VariantSet {
    target: String,
    variants: Vec<Variant>,
    seen: HashSet<String>,
}

impl VariantSet {
    pub fn new(target: &TargetDomain) -> Self {
        Self {
            target: target.fqdn(),
            variants: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Add a candidate. Returns `false` when it was a duplicate, the target,
    /// or not a valid domain.
    pub fn insert(&mut self, domain: &str, technique: Technique, detail: String) -> bool {
        let domain = domain.to_lowercase();
        if domain == self.target || !is_valid_domain(&domain) {
            return false;
        }

        match to_ascii_domain(&domain) {
            Some(ascii) if ascii != self.target => {}
            _ => return false,
        }

        if !self.seen.insert(domain.clone()) {
            return false;
        }

        let sequence = self.variants.len();
        self.variants.push(Variant {
            domain,
            technique,
            detail,
            sequence,
        });
        true
    }

    /// Keep only the first `max` variants.
    pub fn truncate(&mut self, max: usize) {
        if max >= self.variants.len() {
            return;
        }
        for dropped in self.variants.drain(max..) {
            self.seen.remove(&dropped.domain);
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.seen.contains(&domain.to_lowercase())
    }

    pub fn get(&self, domain: &str) -> Option<&Variant> {
        let key = domain.to_lowercase();
        self.variants.iter().find(|v| v.domain == key)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variant> {
        self.variants.iter()
    }

    pub fn as_slice(&self) -> &[Variant] {
        &self.variants
    }

    /// Variants produced by `technique`, in generation order.
    pub fn by_technique<'a>(&'a self, technique: &'a Technique) -> impl Iterator<Item = &'a Variant> {
        self.variants.iter().filter(move |v| &v.technique == technique)
    }

    pub fn into_vec(self) -> Vec<Variant> {
        self.variants
    }
}

impl IntoIterator for VariantSet {
    type Item = Variant;
    type IntoIter = std::vec::IntoIter<Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.into_iter()
    }
}

impl<'a> IntoIterator for &'a VariantSet {
    type Item = &'a Variant;
    type IntoIter = std::slice::Iter<'a, Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.iter()
    }
}

/// Turns a target domain into its `VariantSet`.
#[derive(Debug)]
pub struct VariantGenerator {
    registry: TechniqueRegistry,
    confusables: ConfusableMap,
    tlds: TldList,
}

impl Default for VariantGenerator {
    fn default() -> Self {
        Self::builtin()
    }
}

impl VariantGenerator {
    pub fn new(registry: TechniqueRegistry, confusables: ConfusableMap, tlds: TldList) -> Self {
        Self {
            registry,
            confusables,
            tlds,
        }
    }

    /// Generator with every built-in technique and the built-in tables.
    pub fn builtin() -> Self {
        Self::new(
            TechniqueRegistry::builtin(),
            ConfusableMap::builtin(),
            TldList::builtin(),
        )
    }

    pub fn with_registry(mut self, registry: TechniqueRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_confusables(mut self, confusables: ConfusableMap) -> Self {
        self.confusables = confusables;
        self
    }

    pub fn with_tlds(mut self, tlds: TldList) -> Self {
        self.tlds = tlds;
        self
    }

    /// Normalize user input into a target, using the TLD list to recognize
    /// multi-label suffixes.
    pub fn target(&self, input: &str) -> Result<TargetDomain, HomographError> {
        TargetDomain::parse_with_suffixes(input, self.tlds.as_slice())
    }

    /// Run every registered technique against `target`.
    pub fn generate(&self, target: &TargetDomain) -> VariantSet {
        let ctx = GenerationContext::new(target, &self.confusables, &self.tlds);
        let mut set = VariantSet::new(target);

        for unit in self.registry.iter() {
            let technique = unit.technique();
            let mut added = 0usize;
            for candidate in unit.generate(&ctx) {
                if set.insert(&candidate.domain, technique.clone(), candidate.detail) {
                    added += 1;
                }
            }
            tracing::trace!(technique = %technique, added, "technique finished");
        }

        tracing::debug!(domain = %target, variants = set.len(), "generated variants");
        set
    }

    /// Like `generate`, capped to the first `max_variants` entries.
    pub fn generate_limited(&self, target: &TargetDomain, max_variants: Option<usize>) -> VariantSet {
        let mut set = self.generate(target);
        if let Some(max) = max_variants {
            set.truncate(max);
        }
        set
    }

    pub fn registry(&self) -> &TechniqueRegistry {
        &self.registry
    }

    pub fn confusables(&self) -> &ConfusableMap {
        &self.confusables
    }

    pub fn tlds(&self) -> &TldList {
        &self.tlds
    }
}
