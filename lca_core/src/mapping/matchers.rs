//! Matcher strategies for automatic material mapping.
//!
//! Each strategy looks at one model material name and the database entries
//! and returns a single confident identifier or nothing. Ambiguity always
//! yields nothing.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};

use crate::database::DatabaseEntry;

/// Scores closer than this count as a tie
const TIE_EPSILON: f64 = 1e-9;

/// A single mapping heuristic.
pub trait MaterialMatcher: Send + Sync {
    /// Short strategy name for diagnostics
    fn name(&self) -> &'static str;

    /// Identifier of the one entry `material` confidently refers to
    fn find_match(&self, material: &str, candidates: &[&DatabaseEntry]) -> Option<String>;
}

// ============================================================================
// Normalization helpers
// ============================================================================

/// Lowercase, trimmed, inner whitespace collapsed
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lowercase alphanumeric tokens
pub fn tokenize(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Similarity in 0..=1: the larger of token Jaccard overlap and token
/// containment (the shorter token run found whole inside the longer one,
/// scored by length of the shorter name over the longer one).
pub fn similarity(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);

    let sa: BTreeSet<&String> = ta.iter().collect();
    let sb: BTreeSet<&String> = tb.iter().collect();
    let union = sa.union(&sb).count();
    let jaccard = if union == 0 {
        0.0
    } else {
        sa.intersection(&sb).count() as f64 / union as f64
    };

    jaccard.max(containment(&ta, &tb))
}

fn containment(ta: &[String], tb: &[String]) -> f64 {
    let (short, long) = if ta.len() <= tb.len() { (ta, tb) } else { (tb, ta) };
    if short.is_empty() || !long.windows(short.len()).any(|w| w == short) {
        return 0.0;
    }
    let chars = |tokens: &[String]| tokens.iter().map(|t| t.chars().count()).sum::<usize>() + tokens.len() - 1;
    chars(short) as f64 / chars(long) as f64
}

/// Every purely alphabetic token of `material` appears in `candidate`.
///
/// Grade codes such as "c30" are not words; a word missing from the
/// candidate ("lightweight", "reinforcement") names a different material.
pub fn covers_words(material: &str, candidate: &str) -> bool {
    let candidate: BTreeSet<String> = tokenize(candidate).into_iter().collect();
    tokenize(material)
        .iter()
        .filter(|t| t.chars().all(char::is_alphabetic))
        .all(|t| candidate.contains(t))
}

// ============================================================================
// Strategies
// ============================================================================

/// Case-insensitive, whitespace-normalized name equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactNameMatcher;

impl MaterialMatcher for ExactNameMatcher {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn find_match(&self, material: &str, candidates: &[&DatabaseEntry]) -> Option<String> {
        let wanted = normalize_name(material);
        if wanted.is_empty() {
            return None;
        }
        let mut hits = candidates.iter().filter(|e| normalize_name(&e.name) == wanted);
        match (hits.next(), hits.next()) {
            (Some(entry), None) => Some(entry.id.clone()),
            _ => None,
        }
    }
}

/// Token overlap / containment similarity with a unique best above a
/// threshold. Candidates missing one of the material's words are not
/// considered.
#[derive(Debug, Clone, Copy)]
pub struct TokenOverlapMatcher {
    pub threshold: f64,
}

impl MaterialMatcher for TokenOverlapMatcher {
    fn name(&self) -> &'static str {
        "token-overlap"
    }

    fn find_match(&self, material: &str, candidates: &[&DatabaseEntry]) -> Option<String> {
        let mut best: Option<(&DatabaseEntry, f64)> = None;
        let mut runner_up = 0.0_f64;

        for entry in candidates.iter().filter(|e| covers_words(material, &e.name)) {
            let score = similarity(material, &entry.name);
            match best {
                Some((_, top)) if score <= top + TIE_EPSILON => {
                    runner_up = runner_up.max(score);
                }
                Some((_, top)) => {
                    runner_up = runner_up.max(top);
                    best = Some((entry, score));
                }
                None => best = Some((entry, score)),
            }
        }

        let (entry, top) = best?;
        if top + TIE_EPSILON < self.threshold || top - runner_up <= TIE_EPSILON {
            return None;
        }
        Some(entry.id.clone())
    }
}

/// Alternate and German material names found in models from DACH offices,
/// rewritten into the vocabulary of the database names.
static SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("beton", "concrete"),
        ("recyclingbeton", "recycled concrete"),
        ("bewehrung", "reinforcing steel"),
        ("bewehrungsstahl", "reinforcing steel"),
        ("betonstahl", "reinforcing steel"),
        ("armierung", "reinforcing steel"),
        ("rebar", "reinforcing steel"),
        ("stahl", "steel"),
        ("baustahl", "structural steel"),
        ("holz", "timber"),
        ("wood", "timber"),
        ("brettsperrholz", "cross laminated timber"),
        ("bsp", "cross laminated timber"),
        ("brettschichtholz", "glued laminated timber"),
        ("bsh", "glued laminated timber"),
        ("glulam", "glued laminated timber"),
        ("backstein", "clay brick"),
        ("ziegel", "clay brick"),
        ("mauerwerk", "clay brick"),
        ("mineralwolle", "mineral wool"),
        ("steinwolle", "mineral wool"),
        ("glaswolle", "mineral wool"),
        ("styropor", "expanded polystyrene"),
        ("gipskarton", "gypsum plasterboard"),
        ("gipskartonplatte", "gypsum plasterboard"),
        ("drywall", "gypsum plasterboard"),
        ("verputz", "lime cement plaster"),
        ("putz", "lime cement plaster"),
        ("kalkzementputz", "lime cement plaster"),
        ("aluminum", "aluminium"),
        ("glas", "insulating glazing"),
        ("verglasung", "insulating glazing"),
    ]
    .into_iter()
    .collect()
});

/// Rewrite synonym tokens; `None` when no token has a synonym
pub fn translate_synonyms(material: &str) -> Option<String> {
    let mut replaced = false;
    let translated: Vec<String> = tokenize(material)
        .into_iter()
        .map(|t| match SYNONYMS.get(t.as_str()) {
            Some(canonical) => {
                replaced = true;
                canonical.to_string()
            }
            None => t,
        })
        .collect();
    replaced.then(|| translated.join(" "))
}

/// Synonym translation followed by the exact and overlap strategies.
#[derive(Debug, Clone, Copy)]
pub struct SynonymMatcher {
    pub threshold: f64,
}

impl MaterialMatcher for SynonymMatcher {
    fn name(&self) -> &'static str {
        "synonym"
    }

    fn find_match(&self, material: &str, candidates: &[&DatabaseEntry]) -> Option<String> {
        let translated = translate_synonyms(material)?;
        ExactNameMatcher
            .find_match(&translated, candidates)
            .or_else(|| {
                TokenOverlapMatcher {
                    threshold: self.threshold,
                }
                .find_match(&translated, candidates)
            })
    }
}
