//! The explicit episode context.
//!
//! Every decide, resolve, and learn call receives the context instead of
//! reaching for a global RNG or counter. A single seeded [`StdRng`] drives
//! all randomness, so two simulations built from the same seed produce the
//! same sequence of officers, actions, and outcomes.

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Episode counter and seeded randomness for one simulation.
#[derive(Debug, Clone)]
pub struct EpisodeContext {
    episode: u64,
    rng: StdRng,
}

impl EpisodeContext {
    /// Create a context at episode 0 from a seed.
    pub fn seeded(seed: u64) -> Self {
        Self::resume(seed, 0)
    }

    /// Create a context that continues from a previously completed episode.
    ///
    /// The RNG stream is derived from both the seed and the episode, so a
    /// resumed run does not replay the random stream of the first session.
    pub fn resume(seed: u64, episode: u64) -> Self {
        Self {
            episode,
            rng: StdRng::seed_from_u64(seed ^ episode.rotate_left(32)),
        }
    }

    /// Number of the most recently started episode (0 before the first).
    pub const fn episode(&self) -> u64 {
        self.episode
    }

    /// Start the next episode and return its number.
    pub const fn advance(&mut self) -> u64 {
        self.episode = self.episode.saturating_add(1);
        self.episode
    }

    /// The shared random number generator.
    pub const fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
