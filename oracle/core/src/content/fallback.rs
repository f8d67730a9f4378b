//! Fallback Fortune Pool
//!
//! Authored fortunes used whenever the remote generator is absent or fails.
//! Draws are weighted; a pool with no entries, a blank entry or only zero
//! weights cannot be built.

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a fallback pool cannot be built
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FallbackError {
    /// An entry whose text is empty or whitespace
    #[error("fortune #{index} has no text")]
    BlankText {
        /// Position of the entry
        index: usize,
    },

    /// No entries, or no positive weight
    #[error(transparent)]
    Weights(#[from] WeightedError),
}

/// One authored fortune and its draw weight
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedFortune {
    /// Fortune text
    pub text: String,
    /// Relative draw weight
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl WeightedFortune {
    /// Create an entry
    pub fn new(text: impl Into<String>, weight: u32) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }
}

const BUILTIN: [(&str, u32); 10] = [
    ("The stars align in your favor. Success is on the horizon.", 3),
    ("A surprising opportunity will present itself soon.", 3),
    ("The path you've chosen is the right one. Continue with confidence.", 2),
    ("An old friend will reenter your life with good news.", 2),
    ("Your creativity will lead to an unexpected reward.", 2),
    ("Be patient. What you seek is coming, but timing is essential.", 2),
    ("A small change in your routine will lead to great happiness.", 2),
    ("Trust your intuition on an important decision coming your way.", 2),
    ("The obstacle you face is actually a blessing in disguise.", 1),
    ("Your kindness to others will return to you tenfold.", 1),
];

/// Built-in authored fortunes
#[must_use]
pub fn builtin_fortunes() -> Vec<WeightedFortune> {
    BUILTIN
        .iter()
        .map(|(text, weight)| WeightedFortune::new(*text, *weight))
        .collect()
}

/// Weighted pool of fallback fortunes
#[derive(Clone, Debug)]
pub struct FallbackPool {
    entries: Vec<WeightedFortune>,
    index: WeightedIndex<u32>,
}

impl FallbackPool {
    /// Build a pool
    ///
    /// # Errors
    ///
    /// Fails when `entries` is empty, an entry has blank text, or every
    /// weight is zero.
    pub fn new(entries: Vec<WeightedFortune>) -> Result<Self, FallbackError> {
        if let Some(index) = entries.iter().position(|e| e.text.trim().is_empty()) {
            return Err(FallbackError::BlankText { index });
        }
        let index = WeightedIndex::new(entries.iter().map(|e| e.weight))?;
        Ok(Self { entries, index })
    }

    /// Draw one fortune
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.entries[self.index.sample(rng)].text
    }

    /// Whether `text` is one of this pool's fortunes
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e.text == text)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; empty pools cannot be built
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FallbackPool {
    fn default() -> Self {
        let entries = builtin_fortunes();
        let index = WeightedIndex::new(BUILTIN.iter().map(|(_, w)| *w))
            .expect("built-in weights are positive");
        Self { entries, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_builtin_pool() {
        let pool = FallbackPool::default();
        assert_eq!(pool.len(), 10);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let fortune = pool.draw(&mut rng);
            assert!(!fortune.is_empty());
            assert!(pool.contains(fortune));
        }
    }

    #[test]
    fn test_empty_and_zero_weight_pools_rejected() {
        assert!(FallbackPool::new(Vec::new()).is_err());
        assert!(FallbackPool::new(vec![WeightedFortune::new("never", 0)]).is_err());
    }

    #[test]
    fn test_blank_text_rejected() {
        let result = FallbackPool::new(vec![
            WeightedFortune::new("Fine.", 1),
            WeightedFortune::new("   ", 1),
        ]);
        assert_eq!(result.unwrap_err(), FallbackError::BlankText { index: 1 });
    }

    #[test]
    fn test_zero_weight_entry_never_drawn() {
        let pool = FallbackPool::new(vec![
            WeightedFortune::new("always", 1),
            WeightedFortune::new("never", 0),
        ])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(pool.draw(&mut rng), "always");
        }
    }
}
