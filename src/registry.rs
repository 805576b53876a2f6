//! Deduplication of resolution sets into short codes.
//!
//! Most images in an album share an aspect ratio, so their resolution sets
//! are identical. The viewer's `resolutions.json` stores each distinct set
//! once under a code (`res00`, `res01`, ...) and maps every basename to a
//! code. Codes are minted in first-seen order and only live for one run;
//! two runs over different inputs may number the same set differently.

use crate::types::ResolutionSet;
use std::collections::{BTreeMap, HashMap};

/// Code prefix; the sequence number follows, zero-padded to two digits.
const CODE_PREFIX: &str = "res";

/// Insertion-ordered map from resolution set to code for one run.
#[derive(Debug, Default)]
pub struct ResolutionRegistry {
    sets: Vec<ResolutionSet>,
    index: HashMap<ResolutionSet, usize>,
}

fn code(seq: usize) -> String {
    format!("{CODE_PREFIX}{seq:02}")
}

impl ResolutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code for `set`, minting the next one if this set hasn't been seen.
    pub fn code_for(&mut self, set: &ResolutionSet) -> String {
        if let Some(&seq) = self.index.get(set) {
            return code(seq);
        }
        let seq = self.sets.len();
        self.sets.push(set.clone());
        self.index.insert(set.clone(), seq);
        code(seq)
    }

    /// Code → set mapping for the manifest.
    pub fn invert(&self) -> BTreeMap<String, ResolutionSet> {
        self.iter()
            .map(|(code, set)| (code, set.clone()))
            .collect()
    }

    /// `(code, set)` pairs in minting order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &ResolutionSet)> {
        self.sets.iter().enumerate().map(|(seq, set)| (code(seq), set))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Size;

    fn set(pairs: &[(u32, u32)]) -> ResolutionSet {
        ResolutionSet(pairs.iter().map(|&p| Size::from(p)).collect())
    }

    #[test]
    fn first_code_is_res00() {
        let mut registry = ResolutionRegistry::new();
        assert_eq!(registry.code_for(&set(&[(160, 120)])), "res00");
    }

    #[test]
    fn code_for_is_idempotent() {
        let mut registry = ResolutionRegistry::new();
        let a = set(&[(160, 120), (640, 480)]);
        let first = registry.code_for(&a);
        let again = registry.code_for(&a.clone());
        assert_eq!(first, again);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_sets_get_sequential_codes() {
        let mut registry = ResolutionRegistry::new();
        let codes: Vec<String> = (1..=5)
            .map(|w| registry.code_for(&set(&[(w, 1)])))
            .collect();
        assert_eq!(codes, vec!["res00", "res01", "res02", "res03", "res04"]);
    }

    #[test]
    fn interleaved_repeats_keep_their_codes() {
        let mut registry = ResolutionRegistry::new();
        let landscape = set(&[(160, 120)]);
        let portrait = set(&[(120, 160)]);
        assert_eq!(registry.code_for(&landscape), "res00");
        assert_eq!(registry.code_for(&portrait), "res01");
        assert_eq!(registry.code_for(&landscape), "res00");
        assert_eq!(registry.code_for(&portrait), "res01");
    }

    #[test]
    fn code_widens_past_99() {
        let mut registry = ResolutionRegistry::new();
        let mut last = String::new();
        for w in 0..101 {
            last = registry.code_for(&set(&[(w + 1, 1)]));
        }
        assert_eq!(last, "res100");
    }

    #[test]
    fn invert_maps_codes_back_to_sets() {
        let mut registry = ResolutionRegistry::new();
        let a = set(&[(160, 120), (640, 480)]);
        let b = set(&[(120, 160), (360, 480)]);
        registry.code_for(&a);
        registry.code_for(&b);

        let inverted = registry.invert();
        assert_eq!(inverted.len(), 2);
        assert_eq!(inverted["res00"], a);
        assert_eq!(inverted["res01"], b);
    }

    #[test]
    fn empty_registry() {
        let registry = ResolutionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.invert().is_empty());
    }
}
