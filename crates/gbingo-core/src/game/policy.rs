use std::collections::BTreeSet;

use rand::{seq::index, Rng};

use super::{DrawConfig, GameError, GenerationPolicy, Number};

/// Produce `total` random numbers for `cfg`, never yielding a forbidden value.
pub(crate) fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    cfg: &DrawConfig,
    total: usize,
    forbidden: &BTreeSet<Number>,
) -> Result<Vec<Number>, GameError> {
    let blocked = forbidden.range(cfg.low..=cfg.high).count();
    if blocked >= cfg.range_len() {
        return Err(GameError::RangeExhausted);
    }

    let out = match cfg.policy {
        GenerationPolicy::Distinct => distinct(rng, cfg, total, forbidden),
        GenerationPolicy::ExclusionAware => rejection(rng, cfg, total, forbidden),
    };
    Ok(out)
}

fn distinct<R: Rng + ?Sized>(
    rng: &mut R,
    cfg: &DrawConfig,
    total: usize,
    forbidden: &BTreeSet<Number>,
) -> Vec<Number> {
    let pool: Vec<Number> = (cfg.low..=cfg.high)
        .filter(|n| !forbidden.contains(n))
        .collect();

    if total > pool.len() {
        // Distinct sampling is impossible; fall back to draws with replacement.
        return (0..total)
            .map(|_| pool[rng.gen_range(0..pool.len())])
            .collect();
    }

    index::sample(rng, pool.len(), total)
        .into_iter()
        .map(|i| pool[i])
        .collect()
}

fn rejection<R: Rng + ?Sized>(
    rng: &mut R,
    cfg: &DrawConfig,
    total: usize,
    forbidden: &BTreeSet<Number>,
) -> Vec<Number> {
    let mut out = Vec::with_capacity(total);
    while out.len() < total {
        let n = rng.gen_range(cfg.low..=cfg.high);
        if forbidden.contains(&n) {
            continue;
        }
        out.push(n);
    }
    out
}

/// Write each forced value into a uniformly chosen slot of `batch`.
///
/// Values already present are left alone. Slots are picked independently, so
/// a later forced value may land on an earlier one.
pub(crate) fn apply_forced<R: Rng + ?Sized>(rng: &mut R, batch: &mut [Number], forced: &[Number]) {
    if batch.is_empty() {
        return;
    }
    for &value in forced {
        if batch.contains(&value) {
            continue;
        }
        let slot = rng.gen_range(0..batch.len());
        batch[slot] = value;
    }
}
