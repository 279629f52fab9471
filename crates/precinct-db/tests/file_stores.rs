//! Integration tests for the filesystem-backed stores.
//!
//! Each test works in its own directory under the system temp dir and
//! removes it afterwards.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::path::PathBuf;

use chrono::Utc;
use precinct_agents::{DqnLearner, LearningConfig, PolicyLoadError};
use precinct_db::{BrainKey, BrainStore, FileBrainStore, FileStore, SimulationStore};
use precinct_types::{
    AgentId, AgentStatus, ControllerAction, DetectiveAction, EpisodeStatsRow, EvidenceGrade,
    InvestigationRow, Role, RosterRow, RunId,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

struct TempDir(PathBuf);

impl TempDir {
    fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(format!("precinct-{label}-{}", uuid::Uuid::new_v4()));
        Self(path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn chief_row() -> RosterRow {
    RosterRow {
        id: AgentId(0),
        name: String::from("Chief_Justice"),
        role: Role::Controller,
        rank: String::from("Chief"),
        personality: None,
        corruption_score: 0.0,
        loyalty_score: 100.0,
        paranoia_level: 0.0,
        times_caught: 0,
        times_bribed: 0,
        total_money_earned: 250.0,
        last_caught_episode: None,
        status: AgentStatus::Active,
        updated_at: Utc::now(),
    }
}

fn stats(run_id: RunId, episode: u64) -> EpisodeStatsRow {
    EpisodeStatsRow {
        run_id,
        episode,
        mean_corruption: 55.0,
        mean_wealth: 1_000.0,
        controller_wealth: 100.0,
        corrupt_officers: 5,
        recorded_at: Utc::now(),
    }
}

#[test]
fn registry_and_progress_survive_reopen() {
    let tmp = TempDir::new("store");
    {
        let mut store = FileStore::open(&tmp.0).unwrap();
        store.upsert_agent(&chief_row()).unwrap();
        store.save_progress(120).unwrap();
    }
    let store = FileStore::open(&tmp.0).unwrap();
    let roster = store.active_roster().unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].name, "Chief_Justice");
    assert!((roster[0].total_money_earned - 250.0).abs() < f64::EPSILON);
    assert_eq!(store.progress().unwrap(), Some(120));
}

#[test]
fn recent_stats_reads_the_tail_of_the_log() {
    let tmp = TempDir::new("stats");
    let mut store = FileStore::open(&tmp.0).unwrap();
    assert!(store.recent_stats(5).unwrap().is_empty());
    let run = RunId::new();
    for episode in 1..=7 {
        store.append_episode_stats(&stats(run, episode)).unwrap();
    }
    let tail: Vec<u64> = store
        .recent_stats(3)
        .unwrap()
        .iter()
        .map(|r| r.episode)
        .collect();
    assert_eq!(tail, vec![5, 6, 7]);
}

#[test]
fn clear_removes_logs_and_registry() {
    let tmp = TempDir::new("clear");
    let mut store = FileStore::open(&tmp.0).unwrap();
    store.upsert_agent(&chief_row()).unwrap();
    store
        .append_investigation(&InvestigationRow {
            run_id: RunId::new(),
            episode: 10,
            target_id: AgentId(3),
            detective_action: DetectiveAction::Escalate,
            evidence: EvidenceGrade::Strong,
            controller_action: Some(ControllerAction::Fire),
            summary: String::from("escalate->strong->fire"),
            recorded_at: Utc::now(),
        })
        .unwrap();
    store.clear().unwrap();
    assert!(store.roster().unwrap().is_empty());
    assert_eq!(store.progress().unwrap(), None);
    let reopened = FileStore::open(&tmp.0).unwrap();
    assert!(reopened.roster().unwrap().is_empty());
}

#[test]
fn brain_blobs_round_trip_and_clear() {
    let tmp = TempDir::new("brains");
    let mut brains = FileBrainStore::open(&tmp.0).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let config = LearningConfig {
        hidden_dim: 4,
        ..LearningConfig::default()
    };
    let state = DqnLearner::new(5, 2, config, &mut rng).checkpoint();

    brains.save(BrainKey::Detective, &state).unwrap();
    brains.save(BrainKey::Officer(AgentId(7)), &state).unwrap();
    assert_eq!(brains.load(BrainKey::Detective).unwrap(), Some(state));
    assert!(brains.load(BrainKey::Controller).unwrap().is_none());

    brains.clear().unwrap();
    assert!(brains.load(BrainKey::Officer(AgentId(7))).unwrap().is_none());
}

#[test]
fn truncated_blob_fails_to_load() {
    let tmp = TempDir::new("truncated");
    let brains = FileBrainStore::open(&tmp.0).unwrap();
    std::fs::write(tmp.0.join("controller.json"), "{\"network\":").unwrap();
    assert!(matches!(
        brains.load(BrainKey::Controller),
        Err(PolicyLoadError::Decode { .. })
    ));
}
