//! Update check: compare the local pak against a remote manifest.
//!
//! Fetching the manifest is left to a [`ManifestSource`]; this crate only
//! ships file and in-memory sources.  Progress lives in an
//! [`UpdateTracker`] that the caller owns and shares with whoever displays
//! it.  Pausing is cooperative: the check calls
//! [`UpdateTracker::checkpoint`] between assets and blocks there while
//! paused.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info};

use crate::archive::{PakArchive, ReadOptions};
use crate::diff::is_stale;
use crate::error::PakResult;
use crate::manifest::Manifest;

// ── Manifest sources ─────────────────────────────────────────────────────────

pub trait ManifestSource {
    fn fetch(&self) -> PakResult<Vec<u8>>;
}

/// Manifest already on disk.
pub struct FileManifestSource {
    pub path: PathBuf,
}

impl FileManifestSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl ManifestSource for FileManifestSource {
    fn fetch(&self) -> PakResult<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }
}

impl ManifestSource for Vec<u8> {
    fn fetch(&self) -> PakResult<Vec<u8>> {
        Ok(self.clone())
    }
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    Idle,
    Check,
    Download,
    Update,
    Compile,
    Paused,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub state:      UpdateState,
    pub percentage: f64,
}

#[derive(Debug)]
struct TrackerState {
    progress: Progress,
    paused:   bool,
    /// State to return to when unpaused.
    resume:   UpdateState,
}

#[derive(Debug)]
pub struct UpdateTracker {
    state:  Mutex<TrackerState>,
    resume: Condvar,
}

impl Default for UpdateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                progress: Progress { state: UpdateState::Idle, percentage: 0.0 },
                paused:   false,
                resume:   UpdateState::Idle,
            }),
            resume: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        // Progress is plain data; a panicked holder cannot leave it torn.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The only way to change progress.  While paused the new state is
    /// remembered and applied on resume.
    pub fn set(&self, state: UpdateState, percentage: f64) {
        let mut guard = self.lock();
        guard.progress.percentage = percentage.clamp(0.0, 100.0);
        if guard.paused {
            guard.resume = state;
        } else {
            guard.progress.state = state;
        }
    }

    pub fn progress(&self) -> Progress {
        self.lock().progress
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn pause(&self, paused: bool) {
        let mut guard = self.lock();
        if paused == guard.paused {
            return;
        }
        guard.paused = paused;
        if paused {
            guard.resume = guard.progress.state;
            guard.progress.state = UpdateState::Paused;
        } else {
            guard.progress.state = guard.resume;
            self.resume.notify_all();
        }
    }

    /// Block the calling task for as long as the tracker is paused.
    pub fn checkpoint(&self) {
        let mut guard = self.lock();
        while guard.paused {
            guard = self.resume.wait(guard).unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    pub fn reset(&self) {
        let mut guard = self.lock();
        guard.progress = Progress { state: UpdateState::Idle, percentage: 0.0 };
        guard.paused = false;
        guard.resume = UpdateState::Idle;
        self.resume.notify_all();
    }
}

// ── Updater ──────────────────────────────────────────────────────────────────

pub struct Updater;

impl Updater {
    /// Paths of `archive_path` that are stale relative to the manifest
    /// served by `source`.
    pub fn check(
        archive_path: &Path,
        source:       &dyn ManifestSource,
        tracker:      &UpdateTracker,
    ) -> PakResult<Vec<String>> {
        let result = Self::run_check(archive_path, source, tracker);
        match &result {
            Ok(stale) => {
                info!(stale = stale.len(), "update check finished");
                tracker.set(UpdateState::Idle, 100.0);
            }
            Err(e) => {
                debug!(error = %e, "update check failed");
                tracker.set(UpdateState::Failed, tracker.progress().percentage);
            }
        }
        result
    }

    fn run_check(
        archive_path: &Path,
        source:       &dyn ManifestSource,
        tracker:      &UpdateTracker,
    ) -> PakResult<Vec<String>> {
        tracker.set(UpdateState::Check, 0.0);
        let manifest = Manifest::parse(&source.fetch()?)?;
        tracker.checkpoint();

        let archive = PakArchive::open(archive_path, &ReadOptions::default())?;
        let total = archive.len().max(1) as f64;
        debug!(local = archive.len(), remote = manifest.len(), "comparing");

        let mut stale = Vec::new();
        for (i, (path, asset)) in archive.assets().iter().enumerate() {
            tracker.checkpoint();
            if is_stale(path, asset, &manifest) {
                stale.push(path.to_owned());
            }
            tracker.set(UpdateState::Check, (i + 1) as f64 * 100.0 / total);
        }
        Ok(stale)
    }
}
