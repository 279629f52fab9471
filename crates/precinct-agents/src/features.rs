//! Normalisation helpers shared by the state encoders.
//!
//! Every feature handed to a Q-network lands in `[0, 1]` (the controller's
//! signed error term is the one exception). Currency is log-scaled so that
//! a million-dollar murder bribe and a ten-dollar jaywalking fine remain
//! distinguishable without saturating.

/// Decades of currency covered by [`log_scale`] before it saturates.
pub const LOG_SCALE_DECADES: f64 = 8.0;

/// Episodes over which the capture-recency signal fades to zero.
pub const RECENCY_WINDOW: u32 = 500;

/// `min(log10(max(1, value)) / 8, 1)`.
pub fn log_scale(value: f64) -> f64 {
    (value.max(1.0).log10() / LOG_SCALE_DECADES).min(1.0)
}

/// `count / cap`, capped at 1.
pub fn capped_ratio(count: u32, cap: u32) -> f64 {
    if cap == 0 {
        return 1.0;
    }
    (f64::from(count) / f64::from(cap)).min(1.0)
}

/// Signal that is 1.0 at the moment of capture and fades linearly to 0.0
/// over [`RECENCY_WINDOW`] episodes. An officer never caught scores 0.
pub fn capture_recency(last_caught: Option<u64>, episode: u64) -> f64 {
    let Some(caught_at) = last_caught else {
        return 0.0;
    };
    let elapsed = episode.saturating_sub(caught_at);
    match u32::try_from(elapsed) {
        Ok(e) if e < RECENCY_WINDOW => 1.0 - f64::from(e) / f64::from(RECENCY_WINDOW),
        _ => 0.0,
    }
}

/// Convert a currency amount to `f64`.
#[allow(clippy::cast_precision_loss)]
pub const fn currency(amount: u64) -> f64 {
    amount as f64
}

/// Flag to `0.0` / `1.0`.
pub const fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_scale_endpoints() {
        assert!(log_scale(1.0).abs() < f64::EPSILON);
        assert!((log_scale(1e8) - 1.0).abs() < f64::EPSILON);
        assert!((log_scale(1e12) - 1.0).abs() < f64::EPSILON);
        assert!((log_scale(1e4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn log_scale_floors_small_and_negative_values() {
        assert!(log_scale(0.0).abs() < f64::EPSILON);
        assert!(log_scale(-5_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn recency_decays_linearly() {
        assert!((capture_recency(Some(100), 100) - 1.0).abs() < f64::EPSILON);
        assert!((capture_recency(Some(100), 350) - 0.5).abs() < 1e-12);
        assert!(capture_recency(Some(100), 600).abs() < f64::EPSILON);
        assert!(capture_recency(Some(100), 10_000).abs() < f64::EPSILON);
        assert!(capture_recency(None, 10).abs() < f64::EPSILON);
    }

    #[test]
    fn capped_ratio_saturates() {
        assert!((capped_ratio(2, 5) - 0.4).abs() < 1e-12);
        assert!((capped_ratio(9, 5) - 1.0).abs() < f64::EPSILON);
    }
}
