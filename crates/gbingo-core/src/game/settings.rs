use std::{fmt, str::FromStr};

use super::{GameError, Number, MAX_HIGH, MAX_ROW_WIDTH, MIN_LOW};

/// How random numbers are produced for a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenerationPolicy {
    /// Distinct values within a batch while the pool is large enough, plain
    /// draws with replacement otherwise.
    #[default]
    Distinct,
    /// Independent draws; forbidden values are rejected and redrawn.
    ExclusionAware,
}

impl GenerationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationPolicy::Distinct => "distinct",
            GenerationPolicy::ExclusionAware => "exclusion",
        }
    }
}

impl fmt::Display for GenerationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationPolicy {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "distinct" | "unique" => Ok(GenerationPolicy::Distinct),
            "exclusion" | "exclude" | "independent" => Ok(GenerationPolicy::ExclusionAware),
            other => Err(GameError::InvalidConfiguration(format!(
                "unknown generation policy: {other}"
            ))),
        }
    }
}

/// Active draw configuration. Construct through [`DrawConfig::new`], which
/// enforces the bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawConfig {
    pub row_width: usize,
    pub low: Number,
    pub high: Number,
    pub policy: GenerationPolicy,
}

impl DrawConfig {
    pub fn new(
        row_width: usize,
        low: Number,
        high: Number,
        policy: GenerationPolicy,
    ) -> Result<Self, GameError> {
        if !(1..=MAX_ROW_WIDTH).contains(&row_width) {
            return Err(GameError::InvalidConfiguration(format!(
                "row width must be between 1 and {MAX_ROW_WIDTH}"
            )));
        }
        if low < MIN_LOW || high > MAX_HIGH || low >= high {
            return Err(GameError::InvalidConfiguration(format!(
                "range must lie within {MIN_LOW}..={MAX_HIGH} with min < max"
            )));
        }
        Ok(Self {
            row_width,
            low,
            high,
            policy,
        })
    }

    /// Number of values in `[low, high]`.
    pub fn range_len(&self) -> usize {
        (self.high - self.low) as usize + 1
    }

    pub fn contains(&self, n: Number) -> bool {
        (self.low..=self.high).contains(&n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bounds() {
        assert!(DrawConfig::new(1, 1, 2, GenerationPolicy::Distinct).is_ok());
        assert!(DrawConfig::new(100, 1, 1000, GenerationPolicy::ExclusionAware).is_ok());
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        for (w, lo, hi) in [
            (0, 1, 10),
            (101, 1, 10),
            (5, 0, 10),
            (5, 1, 1001),
            (5, 10, 10),
            (5, 11, 10),
        ] {
            let err = DrawConfig::new(w, lo, hi, GenerationPolicy::Distinct).unwrap_err();
            assert!(
                matches!(err, GameError::InvalidConfiguration(_)),
                "({w}, {lo}, {hi}) should be rejected"
            );
        }
    }

    #[test]
    fn range_len_is_inclusive() {
        let cfg = DrawConfig::new(2, 1, 3, GenerationPolicy::Distinct).unwrap();
        assert_eq!(cfg.range_len(), 3);
        assert!(cfg.contains(3));
        assert!(!cfg.contains(4));
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!(
            "Distinct".parse::<GenerationPolicy>().unwrap(),
            GenerationPolicy::Distinct
        );
        assert_eq!(
            " exclusion ".parse::<GenerationPolicy>().unwrap(),
            GenerationPolicy::ExclusionAware
        );
        assert!("lottery".parse::<GenerationPolicy>().is_err());
    }
}
