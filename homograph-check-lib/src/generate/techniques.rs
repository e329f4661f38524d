//! Built-in variant techniques.
//!
//! Every unit works on the registrable name of the target (everything left
//! of the TLD) one position at a time. Units do not validate their output;
//! the `VariantSet` drops anything that is not a valid domain.

use super::data::{
    keyboard_neighbors, ASCII_VISUAL_PAIRS, COMBINATION_WORDS, INSERTION_ALPHABET, LURE_TOKENS,
    PHONETIC_PAIRS, VOWELS,
};
use super::{Candidate, GenerationContext, VariantTechnique};
use crate::types::Technique;
use crate::utils::to_ascii_domain;

/// Replace `chars[index]` with `with` and join back into a string.
fn replace_at(chars: &[char], index: usize, with: &str) -> String {
    let mut out: String = chars[..index].iter().collect();
    out.push_str(with);
    out.extend(&chars[index + 1..]);
    out
}

/// Insert `ch` before `chars[index]` (or at the end).
fn insert_at(chars: &[char], index: usize, ch: char) -> String {
    let mut out: String = chars[..index].iter().collect();
    out.push(ch);
    out.extend(&chars[index..]);
    out
}

/// Replace each occurrence of `from` in `name` with `to`, one at a time.
/// Positions in the detail are character indices.
fn substitute_each(ctx: &GenerationContext<'_>, pairs: &[(&str, &str)]) -> Vec<Candidate> {
    let name = ctx.name();
    let mut out = Vec::new();
    for (from, to) in pairs {
        for (pos, _) in name.match_indices(from) {
            let replaced = format!("{}{}{}", &name[..pos], to, &name[pos + from.len()..]);
            out.push(Candidate::new(
                ctx.with_name(&replaced),
                format!(
                    "replaced '{}' with '{}' at {}",
                    from,
                    to,
                    name[..pos].chars().count()
                ),
            ));
        }
    }
    out
}

fn is_separator(c: char) -> bool {
    c == '.' || c == '-'
}

/// Unicode confusable substitution, one position and one confusable at a
/// time.
pub struct Homoglyph;

impl VariantTechnique for Homoglyph {
    fn technique(&self) -> Technique {
        Technique::Homoglyph
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let chars = ctx.name_chars();
        let mut out = Vec::new();
        for (i, &c) in chars.iter().enumerate() {
            for &alt in ctx.confusables.get(c) {
                out.push(Candidate::new(
                    ctx.with_name(&replace_at(&chars, i, &alt.to_string())),
                    format!("replaced '{}' with '{}' at {}", c, alt, i),
                ));
            }
        }
        out
    }
}

/// ASCII look-alikes such as `l`/`1`, `o`/`0` and `rn`/`m`.
pub struct AsciiVisual;

impl VariantTechnique for AsciiVisual {
    fn technique(&self) -> Technique {
        Technique::AsciiVisual
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        substitute_each(ctx, ASCII_VISUAL_PAIRS)
    }
}

pub struct VowelSwap;

impl VariantTechnique for VowelSwap {
    fn technique(&self) -> Technique {
        Technique::VowelSwap
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let chars = ctx.name_chars();
        let mut out = Vec::new();
        for (i, &c) in chars.iter().enumerate() {
            if !VOWELS.contains(c) {
                continue;
            }
            for v in VOWELS.chars().filter(|&v| v != c) {
                out.push(Candidate::new(
                    ctx.with_name(&replace_at(&chars, i, &v.to_string())),
                    format!("swapped vowel '{}' for '{}' at {}", c, v, i),
                ));
            }
        }
        out
    }
}

/// QWERTY neighbour substitution.
pub struct AdjacentKey;

impl VariantTechnique for AdjacentKey {
    fn technique(&self) -> Technique {
        Technique::AdjacentKey
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let chars = ctx.name_chars();
        let mut out = Vec::new();
        for (i, &c) in chars.iter().enumerate() {
            for n in keyboard_neighbors(c).chars() {
                out.push(Candidate::new(
                    ctx.with_name(&replace_at(&chars, i, &n.to_string())),
                    format!("typed '{}' instead of '{}' at {}", n, c, i),
                ));
            }
        }
        out
    }
}

pub struct Transposition;

impl VariantTechnique for Transposition {
    fn technique(&self) -> Technique {
        Technique::Transposition
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let chars = ctx.name_chars();
        let mut out = Vec::new();
        for i in 0..chars.len().saturating_sub(1) {
            let (a, b) = (chars[i], chars[i + 1]);
            if a == b || a == '.' || b == '.' {
                continue;
            }
            let mut swapped = chars.clone();
            swapped.swap(i, i + 1);
            let name: String = swapped.into_iter().collect();
            out.push(Candidate::new(
                ctx.with_name(&name),
                format!("swapped '{}' and '{}' at {}", a, b, i),
            ));
        }
        out
    }
}

pub struct Omission;

impl VariantTechnique for Omission {
    fn technique(&self) -> Technique {
        Technique::Omission
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let chars = ctx.name_chars();
        let mut out = Vec::new();
        for (i, &c) in chars.iter().enumerate() {
            if c == '.' {
                continue;
            }
            out.push(Candidate::new(
                ctx.with_name(&replace_at(&chars, i, "")),
                format!("omitted '{}' at {}", c, i),
            ));
        }
        out
    }
}

pub struct Duplication;

impl VariantTechnique for Duplication {
    fn technique(&self) -> Technique {
        Technique::Duplication
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let chars = ctx.name_chars();
        let mut out = Vec::new();
        for (i, &c) in chars.iter().enumerate() {
            if is_separator(c) {
                continue;
            }
            out.push(Candidate::new(
                ctx.with_name(&insert_at(&chars, i, c)),
                format!("doubled '{}' at {}", c, i),
            ));
        }
        out
    }
}

pub struct Insertion;

impl VariantTechnique for Insertion {
    fn technique(&self) -> Technique {
        Technique::Insertion
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let chars = ctx.name_chars();
        let mut out = Vec::new();
        for i in 0..=chars.len() {
            for ch in INSERTION_ALPHABET.chars() {
                out.push(Candidate::new(
                    ctx.with_name(&insert_at(&chars, i, ch)),
                    format!("inserted '{}' at {}", ch, i),
                ));
            }
        }
        out
    }
}

/// Same name under every other TLD of the injected TLD list.
pub struct TldVariation;

impl VariantTechnique for TldVariation {
    fn technique(&self) -> Technique {
        Technique::TldVariation
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let current = ctx.target.tld();
        ctx.tlds
            .iter()
            .filter(|tld| *tld != current)
            .map(|tld| {
                Candidate::new(
                    format!("{}.{}", ctx.name(), tld),
                    format!("changed TLD '.{}' to '.{}'", current, tld),
                )
            })
            .collect()
    }
}

pub struct Hyphenation;

impl VariantTechnique for Hyphenation {
    fn technique(&self) -> Technique {
        Technique::Hyphenation
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let chars = ctx.name_chars();
        let mut out = Vec::new();
        for i in 1..chars.len() {
            if is_separator(chars[i - 1]) || is_separator(chars[i]) {
                continue;
            }
            out.push(Candidate::new(
                ctx.with_name(&insert_at(&chars, i, '-')),
                format!("inserted hyphen at {}", i),
            ));
        }

        let name = ctx.name();
        if name.contains('-') {
            out.push(Candidate::new(
                ctx.with_name(&name.replace('-', "")),
                "removed hyphens".to_string(),
            ));
        }
        out
    }
}

/// Splits the name into a subdomain-looking prefix.
pub struct DotInsertion;

impl VariantTechnique for DotInsertion {
    fn technique(&self) -> Technique {
        Technique::DotInsertion
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let chars = ctx.name_chars();
        let mut out = Vec::new();
        for i in 1..chars.len() {
            if is_separator(chars[i - 1]) || is_separator(chars[i]) {
                continue;
            }
            out.push(Candidate::new(
                ctx.with_name(&insert_at(&chars, i, '.')),
                format!("inserted dot at {}", i),
            ));
        }
        out
    }
}

/// Security-lure prefixes and suffixes (`secure-example.com`,
/// `examplelogin.com`).
pub struct Affix;

impl VariantTechnique for Affix {
    fn technique(&self) -> Technique {
        Technique::Affix
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let name = ctx.name();
        let mut out = Vec::with_capacity(LURE_TOKENS.len() * 4);
        for token in LURE_TOKENS {
            out.push(Candidate::new(
                ctx.with_name(&format!("{}{}", token, name)),
                format!("added prefix '{}'", token),
            ));
            out.push(Candidate::new(
                ctx.with_name(&format!("{}-{}", token, name)),
                format!("added prefix '{}-'", token),
            ));
            out.push(Candidate::new(
                ctx.with_name(&format!("{}{}", name, token)),
                format!("added suffix '{}'", token),
            ));
            out.push(Candidate::new(
                ctx.with_name(&format!("{}-{}", name, token)),
                format!("added suffix '-{}'", token),
            ));
        }
        out
    }
}

/// Homoglyph variants re-encoded in their ASCII (punycode) form.
pub struct Punycode;

impl VariantTechnique for Punycode {
    fn technique(&self) -> Technique {
        Technique::Punycode
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        Homoglyph
            .generate(ctx)
            .into_iter()
            .filter_map(|candidate| {
                let ascii = to_ascii_domain(&candidate.domain)?;
                if ascii == candidate.domain {
                    return None;
                }
                Some(Candidate::new(
                    ascii,
                    format!("punycode of '{}'", candidate.domain),
                ))
            })
            .collect()
    }
}

/// Single-bit flips that land on a domain-legal character.
pub struct BitFlip;

impl VariantTechnique for BitFlip {
    fn technique(&self) -> Technique {
        Technique::BitFlip
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let chars = ctx.name_chars();
        let mut out = Vec::new();
        for (i, &c) in chars.iter().enumerate() {
            if !c.is_ascii() || c == '.' {
                continue;
            }
            for bit in 0..8 {
                let flipped = char::from((c as u8) ^ (1 << bit));
                if flipped.is_ascii_lowercase() || flipped.is_ascii_digit() || flipped == '-' {
                    out.push(Candidate::new(
                        ctx.with_name(&replace_at(&chars, i, &flipped.to_string())),
                        format!("flipped bit {} of '{}' to '{}' at {}", bit, c, flipped, i),
                    ));
                }
            }
        }
        out
    }
}

pub struct WordCombination;

impl VariantTechnique for WordCombination {
    fn technique(&self) -> Technique {
        Technique::WordCombination
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        let name = ctx.name();
        let mut out = Vec::with_capacity(COMBINATION_WORDS.len() * 2);
        for word in COMBINATION_WORDS {
            out.push(Candidate::new(
                ctx.with_name(&format!("{}{}", name, word)),
                format!("appended word '{}'", word),
            ));
            out.push(Candidate::new(
                ctx.with_name(&format!("{}{}", word, name)),
                format!("prepended word '{}'", word),
            ));
        }
        out
    }
}

/// Sound-alike spellings (`ph`/`f`, `ck`/`k`).
pub struct Phonetic;

impl VariantTechnique for Phonetic {
    fn technique(&self) -> Technique {
        Technique::Phonetic
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Candidate> {
        substitute_each(ctx, PHONETIC_PAIRS)
    }
}
