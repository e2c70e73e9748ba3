use std::collections::{BTreeMap, BTreeSet};

use rand::{rngs::StdRng, SeedableRng};

use super::{
    chunk_rows, policy, DrawConfig, GameError, GenerationPolicy, Ledger, Number, Position,
    MAX_DRAW_ROWS, MAX_FORCED,
};

/// Immutable copy of the ledger taken right after a mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistorySnapshot {
    /// Configuration epoch the snapshot belongs to.
    pub epoch: u64,
    pub row_width: usize,
    pub numbers: Vec<Number>,
}

impl HistorySnapshot {
    pub fn rows(&self) -> Vec<Vec<Number>> {
        chunk_rows(&self.numbers, self.row_width)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct DrawOutcome {
    pub batch: Vec<Number>,
    pub history: HistorySnapshot,
}

impl DrawOutcome {
    pub fn batch_rows(&self) -> Vec<Vec<Number>> {
        chunk_rows(&self.batch, self.history.row_width)
    }

    pub fn row_count(&self) -> usize {
        self.batch.len() / self.history.row_width.max(1)
    }
}

#[derive(Debug)]
struct ActiveGame {
    config: DrawConfig,
    ledger: Ledger,
}

/// The one live game: configuration, ledger and pending constraints.
#[derive(Debug)]
pub struct Game {
    active: Option<ActiveGame>,
    forced: Vec<Number>,
    forbidden: BTreeSet<Number>,
    epoch: u64,
    rng: StdRng,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic game for reproducible draws.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            active: None,
            forced: Vec::new(),
            forbidden: BTreeSet::new(),
            epoch: 0,
            rng,
        }
    }

    pub fn config(&self) -> Option<&DrawConfig> {
        self.active.as_ref().map(|a| &a.config)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn forced(&self) -> &[Number] {
        &self.forced
    }

    pub fn forbidden(&self) -> &BTreeSet<Number> {
        &self.forbidden
    }

    /// Replace the configuration, clearing the ledger and all constraints.
    pub fn reconfigure(
        &mut self,
        row_width: usize,
        low: Number,
        high: Number,
        policy: GenerationPolicy,
    ) -> Result<DrawConfig, GameError> {
        let config = DrawConfig::new(row_width, low, high, policy)?;
        self.active = Some(ActiveGame {
            config,
            ledger: Ledger::new(config.row_width),
        });
        self.forced.clear();
        self.forbidden.clear();
        self.epoch += 1;
        Ok(config)
    }

    /// Generate `row_count` rows, apply the forced set, and append to the ledger.
    pub fn draw_batch(&mut self, row_count: usize) -> Result<DrawOutcome, GameError> {
        let active = self.active.as_mut().ok_or(GameError::NotConfigured)?;
        if !(1..=MAX_DRAW_ROWS).contains(&row_count) {
            return Err(GameError::InvalidRowCount(row_count));
        }

        let total = row_count * active.config.row_width;
        let mut batch = policy::generate(&mut self.rng, &active.config, total, &self.forbidden)?;
        policy::apply_forced(&mut self.rng, &mut batch, &self.forced);
        self.forced.clear();

        active.ledger.append(&batch);
        Ok(DrawOutcome {
            batch,
            history: HistorySnapshot {
                epoch: self.epoch,
                row_width: active.ledger.row_width(),
                numbers: active.ledger.numbers().to_vec(),
            },
        })
    }

    /// Replace the forced set for the next draw.
    ///
    /// Once configured, every value must lie inside the configured range.
    pub fn set_forced(&mut self, values: &[Number]) -> Result<(), GameError> {
        if values.is_empty() || values.len() > MAX_FORCED {
            return Err(GameError::InvalidForcedCount(values.len()));
        }
        if let Some(cfg) = self.config() {
            if let Some(&n) = values.iter().find(|n| !cfg.contains(**n)) {
                return Err(GameError::ForcedOutOfRange(n));
            }
        }
        self.forced = values.to_vec();
        Ok(())
    }

    /// Add to the forbidden set; returns its new size.
    pub fn set_forbidden(&mut self, values: &[Number]) -> Result<usize, GameError> {
        if values.is_empty() {
            return Err(GameError::EmptyForbiddenList);
        }
        self.forbidden.extend(values.iter().copied());
        Ok(self.forbidden.len())
    }

    pub fn render_history(&self) -> Vec<Vec<Number>> {
        self.active
            .as_ref()
            .map(|a| a.ledger.rows())
            .unwrap_or_default()
    }

    pub fn history_snapshot(&self) -> Option<HistorySnapshot> {
        self.active.as_ref().map(|a| HistorySnapshot {
            epoch: self.epoch,
            row_width: a.ledger.row_width(),
            numbers: a.ledger.numbers().to_vec(),
        })
    }

    pub fn search(&self, target: Number) -> Result<Vec<Position>, GameError> {
        let active = self.active.as_ref().ok_or(GameError::NotConfigured)?;
        Ok(active.ledger.search(target))
    }

    pub fn frequency_report(&self) -> Result<BTreeMap<Number, usize>, GameError> {
        match &self.active {
            Some(a) if !a.ledger.is_empty() => Ok(a.ledger.frequency()),
            _ => Err(GameError::EmptyLedger),
        }
    }

    #[cfg(test)]
    fn append_for_test(&mut self, numbers: &[Number]) {
        if let Some(a) = self.active.as_mut() {
            a.ledger.append(numbers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(width: usize, low: Number, high: Number, policy: GenerationPolicy) -> Game {
        let mut g = Game::with_seed(42);
        g.reconfigure(width, low, high, policy).unwrap();
        g
    }

    #[test]
    fn reconfigure_starts_with_empty_history() {
        let g = configured(5, 1, 100, GenerationPolicy::Distinct);
        assert!(g.render_history().is_empty());
        assert_eq!(g.epoch(), 1);
    }

    #[test]
    fn invalid_reconfigure_keeps_previous_state() {
        let mut g = configured(3, 1, 50, GenerationPolicy::Distinct);
        g.draw_batch(2).unwrap();
        g.set_forbidden(&[4]).unwrap();

        let err = g
            .reconfigure(3, 10, 10, GenerationPolicy::Distinct)
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidConfiguration(_)));
        assert_eq!(g.config().map(|c| c.high), Some(50));
        assert_eq!(g.render_history().len(), 2);
        assert!(g.forbidden().contains(&4));
        assert_eq!(g.epoch(), 1);
    }

    #[test]
    fn reconfigure_clears_ledger_and_constraints() {
        let mut g = configured(3, 1, 50, GenerationPolicy::Distinct);
        g.draw_batch(1).unwrap();
        g.set_forced(&[1]).unwrap();
        g.set_forbidden(&[2]).unwrap();

        g.reconfigure(4, 1, 10, GenerationPolicy::ExclusionAware).unwrap();
        assert!(g.render_history().is_empty());
        assert!(g.forced().is_empty());
        assert!(g.forbidden().is_empty());
        assert_eq!(g.epoch(), 2);
    }

    #[test]
    fn operations_before_configuration_fail() {
        let mut g = Game::with_seed(1);
        assert_eq!(g.draw_batch(1).unwrap_err(), GameError::NotConfigured);
        assert_eq!(g.search(3).unwrap_err(), GameError::NotConfigured);
        assert_eq!(g.frequency_report().unwrap_err(), GameError::EmptyLedger);
        assert!(g.render_history().is_empty());
        assert!(g.history_snapshot().is_none());
    }

    #[test]
    fn draw_grows_ledger_by_rows_times_width() {
        let mut g = configured(7, 1, 1000, GenerationPolicy::Distinct);
        let mut expected = 0;
        for rows in 1..=5 {
            let out = g.draw_batch(rows).unwrap();
            expected += rows * 7;
            assert_eq!(out.batch.len(), rows * 7);
            assert_eq!(out.row_count(), rows);
            assert_eq!(out.history.len(), expected);
            assert_eq!(out.batch_rows().len(), rows);
        }
    }

    #[test]
    fn row_count_out_of_range_is_rejected_without_mutation() {
        let mut g = configured(2, 1, 10, GenerationPolicy::Distinct);
        g.set_forced(&[3]).unwrap();
        assert_eq!(g.draw_batch(0).unwrap_err(), GameError::InvalidRowCount(0));
        assert_eq!(g.draw_batch(6).unwrap_err(), GameError::InvalidRowCount(6));
        assert!(g.render_history().is_empty());
        assert_eq!(g.forced(), &[3]);
    }

    #[test]
    fn history_rows_keep_partial_tail_and_order() {
        let mut g = configured(2, 1, 50, GenerationPolicy::Distinct);
        let first = g.draw_batch(1).unwrap().batch;
        let second = g.draw_batch(2).unwrap().batch;
        let flat: Vec<Number> = g.render_history().concat();
        assert_eq!(flat, [first, second].concat());
    }

    #[test]
    fn distinct_mode_small_range_yields_distinct_pair() {
        for seed in 0..50 {
            let mut g = Game::with_seed(seed);
            g.reconfigure(2, 1, 3, GenerationPolicy::Distinct).unwrap();
            let batch = g.draw_batch(1).unwrap().batch;
            assert_eq!(batch.len(), 2);
            assert_ne!(batch[0], batch[1], "seed {seed}");
        }
    }

    #[test]
    fn exclusion_mode_never_draws_forbidden_numbers() {
        let mut g = configured(50, 1, 20, GenerationPolicy::ExclusionAware);
        g.set_forbidden(&[1, 2, 3]).unwrap();
        g.set_forbidden(&[20]).unwrap();
        for _ in 0..10 {
            let out = g.draw_batch(5).unwrap();
            assert!(out.batch.iter().all(|n| !g.forbidden().contains(n)));
        }
    }

    #[test]
    fn forced_value_appears_exactly_once_and_is_consumed() {
        for seed in 0..50 {
            let mut g = Game::with_seed(seed);
            g.reconfigure(3, 1, 100, GenerationPolicy::Distinct).unwrap();
            g.set_forced(&[5]).unwrap();
            let batch = g.draw_batch(1).unwrap().batch;
            assert_eq!(batch.iter().filter(|n| **n == 5).count(), 1, "seed {seed}");
            assert!(g.forced().is_empty());

            // The next draw is unconstrained again.
            g.draw_batch(1).unwrap();
        }
    }

    #[test]
    fn forcing_overrides_forbidding() {
        let mut g = configured(1, 1, 10, GenerationPolicy::ExclusionAware);
        g.set_forbidden(&[7]).unwrap();
        g.set_forced(&[7]).unwrap();
        assert_eq!(g.draw_batch(1).unwrap().batch, vec![7]);
    }

    #[test]
    fn forced_values_survive_exclusion_mode_draws() {
        for seed in 0..50 {
            let mut g = Game::with_seed(seed);
            g.reconfigure(4, 1, 30, GenerationPolicy::ExclusionAware).unwrap();
            g.set_forbidden(&[1, 2, 3]).unwrap();
            g.set_forced(&[17]).unwrap();
            let batch = g.draw_batch(2).unwrap().batch;
            assert!(batch.contains(&17), "seed {seed}");
            assert!(batch.iter().all(|n| !g.forbidden().contains(n)), "seed {seed}");
            assert!(g.forced().is_empty());
        }
    }

    #[test]
    fn forced_values_outside_the_range_are_rejected() {
        let mut g = configured(3, 1, 100, GenerationPolicy::Distinct);
        assert_eq!(
            g.set_forced(&[5, 0]).unwrap_err(),
            GameError::ForcedOutOfRange(0)
        );
        assert_eq!(
            g.set_forced(&[5000]).unwrap_err(),
            GameError::ForcedOutOfRange(5000)
        );
        assert!(g.forced().is_empty());
        g.set_forced(&[1, 100]).unwrap();
        assert_eq!(g.forced(), &[1, 100]);
    }

    #[test]
    fn set_forced_replaces_and_validates_count() {
        let mut g = Game::with_seed(0);
        assert_eq!(
            g.set_forced(&[]).unwrap_err(),
            GameError::InvalidForcedCount(0)
        );
        assert_eq!(
            g.set_forced(&[1, 2, 3, 4, 5, 6]).unwrap_err(),
            GameError::InvalidForcedCount(6)
        );
        g.set_forced(&[1, 2]).unwrap();
        g.set_forced(&[9]).unwrap();
        assert_eq!(g.forced(), &[9]);
    }

    #[test]
    fn set_forbidden_is_additive() {
        let mut g = Game::with_seed(0);
        assert_eq!(
            g.set_forbidden(&[]).unwrap_err(),
            GameError::EmptyForbiddenList
        );
        assert_eq!(g.set_forbidden(&[1, 2]).unwrap(), 2);
        assert_eq!(g.set_forbidden(&[2, 3]).unwrap(), 3);
    }

    #[test]
    fn exhausted_range_keeps_forced_set_and_ledger() {
        let mut g = configured(1, 1, 3, GenerationPolicy::Distinct);
        g.set_forbidden(&[1, 2, 3]).unwrap();
        g.set_forced(&[2]).unwrap();
        assert_eq!(g.draw_batch(1).unwrap_err(), GameError::RangeExhausted);
        assert_eq!(g.forced(), &[2]);
        assert!(g.render_history().is_empty());
    }

    #[test]
    fn search_on_known_sequence() {
        let mut g = configured(1, 1, 10, GenerationPolicy::Distinct);
        g.append_for_test(&[7, 3, 7]);
        assert_eq!(
            g.search(7).unwrap(),
            vec![
                Position { row: 1, position: 1 },
                Position { row: 3, position: 1 }
            ]
        );
        assert!(g.search(8).unwrap().is_empty());
    }

    #[test]
    fn frequency_report_on_known_sequence() {
        let mut g = configured(2, 1, 10, GenerationPolicy::Distinct);
        assert_eq!(g.frequency_report().unwrap_err(), GameError::EmptyLedger);
        g.append_for_test(&[1, 1, 2]);
        let freq: Vec<_> = g.frequency_report().unwrap().into_iter().collect();
        assert_eq!(freq, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn snapshot_tracks_epoch() {
        let mut g = configured(2, 1, 10, GenerationPolicy::Distinct);
        let a = g.draw_batch(1).unwrap().history;
        g.reconfigure(2, 1, 10, GenerationPolicy::Distinct).unwrap();
        let b = g.history_snapshot().unwrap();
        assert_eq!(a.epoch + 1, b.epoch);
        assert!(b.is_empty());
    }
}
