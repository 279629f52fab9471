//! The persistence interface for roster, history, and statistics.
//!
//! Four record kinds are kept: a roster registry keyed by agent id, and
//! three append-only logs (action history, investigations, per-episode
//! stats). [`SimulationStore::recent_stats`] serves cold-start history
//! replay and always returns rows in chronological order.

use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use precinct_types::{
    AgentId, AgentStatus, EpisodeStatsRow, HistoryRow, InvestigationRow, RosterRow,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PersistenceError;

/// Durable sink for simulation records.
pub trait SimulationStore: Send {
    /// Insert or replace a registry row.
    fn upsert_agent(&mut self, row: &RosterRow) -> Result<(), PersistenceError>;

    /// Every registry row, ordered by id.
    fn roster(&self) -> Result<Vec<RosterRow>, PersistenceError>;

    /// Registry rows still marked active, ordered by id.
    fn active_roster(&self) -> Result<Vec<RosterRow>, PersistenceError> {
        Ok(self
            .roster()?
            .into_iter()
            .filter(|row| row.status == AgentStatus::Active)
            .collect())
    }

    /// Append one resolved action.
    fn append_history(&mut self, row: &HistoryRow) -> Result<(), PersistenceError>;

    /// Append one investigation.
    fn append_investigation(&mut self, row: &InvestigationRow) -> Result<(), PersistenceError>;

    /// Append one per-episode stats row.
    fn append_episode_stats(&mut self, row: &EpisodeStatsRow) -> Result<(), PersistenceError>;

    /// The most recent `n` stats rows, oldest first.
    fn recent_stats(&self, n: usize) -> Result<Vec<EpisodeStatsRow>, PersistenceError>;

    /// Record the global episode counter.
    fn save_progress(&mut self, episode: u64) -> Result<(), PersistenceError>;

    /// The last recorded global episode counter.
    fn progress(&self) -> Result<Option<u64>, PersistenceError>;

    /// Wipe everything.
    fn clear(&mut self) -> Result<(), PersistenceError>;
}

// =============================================================================
// In-memory
// =============================================================================

/// A store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    roster: BTreeMap<AgentId, RosterRow>,
    history: Vec<HistoryRow>,
    investigations: Vec<InvestigationRow>,
    stats: Vec<EpisodeStatsRow>,
    progress: Option<u64>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full action history.
    pub fn history(&self) -> &[HistoryRow] {
        &self.history
    }

    /// The full investigation log.
    pub fn investigations(&self) -> &[InvestigationRow] {
        &self.investigations
    }

    /// Every stats row.
    pub fn stats(&self) -> &[EpisodeStatsRow] {
        &self.stats
    }
}

impl SimulationStore for MemoryStore {
    fn upsert_agent(&mut self, row: &RosterRow) -> Result<(), PersistenceError> {
        self.roster.insert(row.id, row.clone());
        Ok(())
    }

    fn roster(&self) -> Result<Vec<RosterRow>, PersistenceError> {
        Ok(self.roster.values().cloned().collect())
    }

    fn append_history(&mut self, row: &HistoryRow) -> Result<(), PersistenceError> {
        self.history.push(row.clone());
        Ok(())
    }

    fn append_investigation(&mut self, row: &InvestigationRow) -> Result<(), PersistenceError> {
        self.investigations.push(row.clone());
        Ok(())
    }

    fn append_episode_stats(&mut self, row: &EpisodeStatsRow) -> Result<(), PersistenceError> {
        self.stats.push(row.clone());
        Ok(())
    }

    fn recent_stats(&self, n: usize) -> Result<Vec<EpisodeStatsRow>, PersistenceError> {
        let skip = self.stats.len().saturating_sub(n);
        Ok(self.stats.iter().skip(skip).cloned().collect())
    }

    fn save_progress(&mut self, episode: u64) -> Result<(), PersistenceError> {
        self.progress = Some(episode);
        Ok(())
    }

    fn progress(&self) -> Result<Option<u64>, PersistenceError> {
        Ok(self.progress)
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        *self = Self::default();
        Ok(())
    }
}

// =============================================================================
// Filesystem
// =============================================================================

const ROSTER_FILE: &str = "roster.json";
const HISTORY_FILE: &str = "history.jsonl";
const INVESTIGATIONS_FILE: &str = "investigations.jsonl";
const STATS_FILE: &str = "episode_stats.jsonl";
const PROGRESS_FILE: &str = "progress.json";

/// A store backed by a directory.
///
/// The registry is kept in memory and rewritten whole on every change; the
/// three logs are JSON-lines files opened in append mode.
///
/// | File | Contents |
/// |------|----------|
/// | `roster.json` | array of [`RosterRow`] |
/// | `history.jsonl` | one [`HistoryRow`] per line |
/// | `investigations.jsonl` | one [`InvestigationRow`] per line |
/// | `episode_stats.jsonl` | one [`EpisodeStatsRow`] per line |
/// | `progress.json` | the global episode counter |
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    roster: BTreeMap<AgentId, RosterRow>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] if the directory cannot be created or
    /// the registry cannot be read, and [`PersistenceError::Serialization`]
    /// if the registry is not valid JSON.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let rows: Vec<RosterRow> = read_json(&dir.join(ROSTER_FILE))?.unwrap_or_default();
        let roster = rows.into_iter().map(|row| (row.id, row)).collect();
        tracing::debug!(dir = %dir.display(), "Opened file store");
        Ok(Self { dir, roster })
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn flush_roster(&self) -> Result<(), PersistenceError> {
        let rows: Vec<&RosterRow> = self.roster.values().collect();
        write_json(&self.dir.join(ROSTER_FILE), &rows)
    }

    fn append_line<T: Serialize>(&self, file: &str, row: &T) -> Result<(), PersistenceError> {
        let line = serde_json::to_string(row)?;
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))?;
        writeln!(handle, "{line}")?;
        Ok(())
    }
}

impl SimulationStore for FileStore {
    fn upsert_agent(&mut self, row: &RosterRow) -> Result<(), PersistenceError> {
        self.roster.insert(row.id, row.clone());
        self.flush_roster()
    }

    fn roster(&self) -> Result<Vec<RosterRow>, PersistenceError> {
        Ok(self.roster.values().cloned().collect())
    }

    fn append_history(&mut self, row: &HistoryRow) -> Result<(), PersistenceError> {
        self.append_line(HISTORY_FILE, row)
    }

    fn append_investigation(&mut self, row: &InvestigationRow) -> Result<(), PersistenceError> {
        self.append_line(INVESTIGATIONS_FILE, row)
    }

    fn append_episode_stats(&mut self, row: &EpisodeStatsRow) -> Result<(), PersistenceError> {
        self.append_line(STATS_FILE, row)
    }

    fn recent_stats(&self, n: usize) -> Result<Vec<EpisodeStatsRow>, PersistenceError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let file = match File::open(self.dir.join(STATS_FILE)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut window = VecDeque::with_capacity(n.min(4096));
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if window.len() == n {
                window.pop_front();
            }
            window.push_back(serde_json::from_str(&line)?);
        }
        Ok(window.into())
    }

    fn save_progress(&mut self, episode: u64) -> Result<(), PersistenceError> {
        write_json(&self.dir.join(PROGRESS_FILE), &episode)
    }

    fn progress(&self) -> Result<Option<u64>, PersistenceError> {
        read_json(&self.dir.join(PROGRESS_FILE))
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        self.roster.clear();
        for file in [
            ROSTER_FILE,
            HISTORY_FILE,
            INVESTIGATIONS_FILE,
            STATS_FILE,
            PROGRESS_FILE,
        ] {
            remove_if_present(&self.dir.join(file))?;
        }
        tracing::info!(dir = %self.dir.display(), "Cleared file store");
        Ok(())
    }
}

/// Read a JSON document, treating a missing file as `None`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write a JSON document through a temporary file and rename.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PersistenceError> {
    let text = serde_json::to_string(value)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Remove a file, ignoring one that does not exist.
pub(crate) fn remove_if_present(path: &Path) -> Result<(), PersistenceError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use precinct_types::{Personality, Role, RunId};

    use super::*;

    fn row(id: u64, status: AgentStatus) -> RosterRow {
        RosterRow {
            id: AgentId(id),
            name: format!("Officer_{id}"),
            role: Role::CorruptOfficer,
            rank: String::from("Officer"),
            personality: Some(Personality::Greedy),
            corruption_score: 70.0,
            loyalty_score: 50.0,
            paranoia_level: 0.0,
            times_caught: 0,
            times_bribed: 0,
            total_money_earned: 0.0,
            last_caught_episode: None,
            status,
            updated_at: Utc::now(),
        }
    }

    fn stats(run_id: RunId, episode: u64) -> EpisodeStatsRow {
        EpisodeStatsRow {
            run_id,
            episode,
            mean_corruption: 60.0,
            mean_wealth: 100.0,
            controller_wealth: 10.0,
            corrupt_officers: 5,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn recent_stats_are_the_tail_in_order() {
        let mut store = MemoryStore::new();
        let run = RunId::new();
        for episode in 1..=10 {
            store.append_episode_stats(&stats(run, episode)).unwrap();
        }
        let recent: Vec<u64> = store
            .recent_stats(3)
            .unwrap()
            .iter()
            .map(|r| r.episode)
            .collect();
        assert_eq!(recent, vec![8, 9, 10]);
        assert_eq!(store.recent_stats(50).unwrap().len(), 10);
    }

    #[test]
    fn active_roster_skips_removed_agents() {
        let mut store = MemoryStore::new();
        store.upsert_agent(&row(2, AgentStatus::Active)).unwrap();
        store.upsert_agent(&row(3, AgentStatus::Active)).unwrap();
        store.upsert_agent(&row(2, AgentStatus::Executed)).unwrap();
        let active: Vec<AgentId> = store
            .active_roster()
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(active, vec![AgentId(3)]);
        assert_eq!(store.roster().unwrap().len(), 2);
    }

    #[test]
    fn clear_wipes_everything() {
        let mut store = MemoryStore::new();
        store.upsert_agent(&row(2, AgentStatus::Active)).unwrap();
        store.save_progress(40).unwrap();
        store.clear().unwrap();
        assert!(store.roster().unwrap().is_empty());
        assert_eq!(store.progress().unwrap(), None);
    }
}
