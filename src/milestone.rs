//! Milestone classification of user counts.
//!
//! A [`Ladder`] is an ordered list of `(lower_bound_inclusive, label)` rungs
//! starting at zero; the last rung covers everything above it. A count lands on
//! the rung with the greatest lower bound not exceeding it. The coarse and the
//! detailed ladder are two independent configurations of the same lookup.
//!
//! | Coarse   | Detailed   | Users            |
//! |----------|------------|------------------|
//! | 0-10k    | 0-10k      | < 10 000         |
//! | 10-20k   | 10-20k     | 10 000 – 19 999  |
//! | 20-30k   | 20-30k     | 20 000 – 29 999  |
//! | 30-40k   | 30-40k     | 30 000 – 39 999  |
//! | >40k     | 40k-100k   | 40 000 – 99 999  |
//! | >40k     | >100k      | >= 100 000       |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

static COARSE: &[(u64, &str)] = &[
    (0, "0-10k"),
    (10_000, "10-20k"),
    (20_000, "20-30k"),
    (30_000, "30-40k"),
    (40_000, ">40k"),
];

static DETAILED: &[(u64, &str)] = &[
    (0, "0-10k"),
    (10_000, "10-20k"),
    (20_000, "20-30k"),
    (30_000, "30-40k"),
    (40_000, "40k-100k"),
    (100_000, ">100k"),
];

/// One bucket of a ladder: every count from `lower` up to the next rung.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rung {
    pub lower: u64,
    pub label: String,
}

/// A validated threshold ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ladder {
    name: String,
    rungs: Vec<Rung>,
}

/// The bucket a count fell into. `rank` is 0 for the lowest bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tier {
    pub rank: usize,
    pub label: String,
}

impl Ladder {
    /// Validates and builds a ladder.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidLadder`] if the ladder is empty, does not
    /// start at zero, has bounds that are not strictly ascending, or has an
    /// empty label.
    pub fn new(name: impl Into<String>, rungs: Vec<Rung>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: String| AnalyticsError::InvalidLadder {
            name: name.clone(),
            reason,
        };

        let first = rungs.first().ok_or_else(|| invalid("no rungs".into()))?;
        if first.lower != 0 {
            return Err(invalid(format!(
                "first lower bound must be 0, got {}",
                first.lower
            )));
        }
        for pair in rungs.windows(2) {
            if pair[1].lower <= pair[0].lower {
                return Err(invalid(format!(
                    "lower bounds must be strictly ascending ({} then {})",
                    pair[0].lower, pair[1].lower
                )));
            }
        }
        if let Some(rung) = rungs.iter().find(|r| r.label.trim().is_empty()) {
            return Err(invalid(format!("empty label at lower bound {}", rung.lower)));
        }

        Ok(Self { name, rungs })
    }

    fn from_table(name: &str, table: &[(u64, &str)]) -> Self {
        Self {
            name: name.to_string(),
            rungs: table
                .iter()
                .map(|&(lower, label)| Rung {
                    lower,
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    /// The default coarse ladder.
    pub fn coarse() -> Self {
        Self::from_table("coarse", COARSE)
    }

    /// The default detailed ladder.
    pub fn detailed() -> Self {
        Self::from_table("detailed", DETAILED)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rungs(&self) -> &[Rung] {
        &self.rungs
    }

    /// Finds the rung with the greatest lower bound `<= count`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidInput`] for a negative count.
    pub fn classify(&self, count: i64) -> Result<Tier> {
        let count = u64::try_from(count).map_err(|_| {
            AnalyticsError::InvalidInput(format!("negative user count {count}"))
        })?;
        // rungs[0].lower == 0, so at least one rung always matches
        let rank = self.rungs.partition_point(|r| r.lower <= count) - 1;
        Ok(Tier {
            rank,
            label: self.rungs[rank].label.clone(),
        })
    }
}

macro_rules! tier_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub Tier);

        impl $name {
            pub fn rank(&self) -> usize {
                self.0.rank
            }

            pub fn label(&self) -> &str {
                &self.0.label
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0.label)
            }
        }
    };
}

tier_newtype!(
    /// Coarse traffic tier.
    Category
);
tier_newtype!(
    /// Fine-grained traffic tier from the denser ladder.
    DetailedCategory
);

/// Both ladders, configured once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneClassifier {
    coarse: Ladder,
    detailed: Ladder,
}

impl Default for MilestoneClassifier {
    fn default() -> Self {
        Self::new(Ladder::coarse(), Ladder::detailed())
    }
}

impl MilestoneClassifier {
    pub fn new(coarse: Ladder, detailed: Ladder) -> Self {
        Self { coarse, detailed }
    }

    pub fn coarse(&self) -> &Ladder {
        &self.coarse
    }

    pub fn detailed(&self) -> &Ladder {
        &self.detailed
    }

    pub fn classify(&self, count: i64) -> Result<Category> {
        self.coarse.classify(count).map(Category)
    }

    pub fn classify_detailed(&self, count: i64) -> Result<DetailedCategory> {
        self.detailed.classify(count).map(DetailedCategory)
    }

    /// Classifies a count reported by the analytics API against both ladders.
    pub fn classify_both(&self, users: u64) -> Result<(Category, DetailedCategory)> {
        let count = i64::try_from(users)
            .map_err(|_| AnalyticsError::InvalidInput(format!("user count {users} overflows")))?;
        Ok((self.classify(count)?, self.classify_detailed(count)?))
    }
}
