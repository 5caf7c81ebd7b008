//! Level Session
//!
//! The service a game loop talks to at level transitions: pick a level,
//! load or restart it, capture the edited arrangement back to disk, and
//! record completion times. Construct one and pass it by reference; there
//! is no global instance.

use std::fmt::Debug;
use std::path::PathBuf;

use thiserror::Error;

use crate::capture::{CaptureError, LevelCapture};
use crate::descriptor::DescriptorError;
use crate::loader::{LevelLoader, LoadError, LoadReport};
use crate::repository::{LevelInfo, LevelRepository, RepositoryError, SelectionHandle};
use crate::scene::{CameraFollowAccessor, ContentResolver, Entity, VisualAccessor, WorldHost};
use crate::scores::{CompletionTime, ScoreEntry, ScoreError, ScoreKey, ScoreLedger};
use crate::settings::Settings;
use crate::storage::{LocalStorage, StorageError};

#[derive(Debug, Error)]
pub enum SessionError<H: Debug = Entity> {
    #[error("no level selected")]
    NoSelection,
    #[error("no player name set")]
    NoPlayerName,
    #[error(transparent)]
    Load(#[from] LoadError<H>),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Level selection, loading, capture and scores for one player
#[derive(Debug)]
pub struct LevelSession {
    settings: Settings,
    /// Where `set_player_name` persists settings (None = memory only)
    settings_path: Option<PathBuf>,
    storage: LocalStorage,
    repository: LevelRepository,
    ledger: ScoreLedger,
    loader: LevelLoader,
    capture: LevelCapture,
}

impl LevelSession {
    pub fn new(settings: Settings, settings_path: Option<PathBuf>) -> Self {
        let repository = LevelRepository::new(&settings.content_root, &settings.descriptor_extension);
        let ledger = ScoreLedger::new(&settings.ledger_root);
        let loader = LevelLoader::new(settings.names.clone());
        let capture = LevelCapture::new(settings.names.clone());
        Self {
            settings,
            settings_path,
            storage: LocalStorage::new(),
            repository,
            ledger,
            loader,
            capture,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn repository(&self) -> &LevelRepository {
        &self.repository
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Levels under the content root, in presentation order
    pub fn levels(&self) -> Result<Vec<LevelInfo>, SessionError> {
        Ok(self.repository.discover()?)
    }

    pub fn select(&mut self, path: impl Into<PathBuf>) -> SelectionHandle {
        self.repository.select(path)
    }

    /// Select a level by display name
    pub fn select_named(&mut self, name: &str) -> Result<SelectionHandle, SessionError> {
        let path = self.repository.path_for(name)?;
        Ok(self.repository.select(path))
    }

    pub fn selection(&self) -> Option<&SelectionHandle> {
        self.repository.current()
    }

    pub fn player_name(&self) -> &str {
        &self.settings.player_name
    }

    /// Remember the player name, writing settings if a path is configured
    pub fn set_player_name(&mut self, name: impl Into<String>) -> Result<(), SessionError> {
        self.settings.player_name = name.into();
        if let Some(path) = &self.settings_path {
            self.settings.save_to(path)?;
            log::info!("Player name set to '{}'", self.settings.player_name);
        }
        Ok(())
    }

    /// Rebuild the selected level into `world`
    pub fn load_selected<W, R>(
        &self,
        resolver: &R,
        world: &mut W,
    ) -> Result<LoadReport<W::Handle>, SessionError<W::Handle>>
    where
        W: WorldHost + VisualAccessor + CameraFollowAccessor,
        R: ContentResolver<W> + ?Sized,
    {
        let selection = self.repository.current().ok_or(SessionError::NoSelection)?;
        Ok(self.loader.load(&self.storage, selection.path(), resolver, world)?)
    }

    /// Reload the selected level from disk, discarding in-world changes
    pub fn restart<W, R>(
        &self,
        resolver: &R,
        world: &mut W,
    ) -> Result<LoadReport<W::Handle>, SessionError<W::Handle>>
    where
        W: WorldHost + VisualAccessor + CameraFollowAccessor,
        R: ContentResolver<W> + ?Sized,
    {
        if let Some(selection) = self.repository.current() {
            log::info!("Restarting '{}'", selection.name());
        }
        self.load_selected(resolver, world)
    }

    /// Capture the level in `world` and save it under `name` in the content root
    pub fn save_level<W>(&self, world: &mut W, name: &str) -> Result<PathBuf, SessionError>
    where
        W: WorldHost + VisualAccessor + CameraFollowAccessor,
    {
        let path = self.repository.path_for(name)?;
        let descriptor = self.capture.capture_level(world)?;
        self.capture.save(&self.storage, &descriptor, &path)?;
        Ok(path)
    }

    fn score_key(&self) -> Result<ScoreKey, SessionError> {
        let selection = self.repository.current().ok_or(SessionError::NoSelection)?;
        Ok(ScoreKey::new(&self.settings.player_name, selection.name()))
    }

    /// Append a completion of the selected level for the current player
    pub fn record_completion(&self, time: CompletionTime) -> Result<ScoreEntry, SessionError> {
        if self.settings.player_name.trim().is_empty() {
            return Err(SessionError::NoPlayerName);
        }
        let key = self.score_key()?;
        let entry = ScoreEntry::now(time);
        self.ledger.append(&key, entry.clone())?;
        log::info!("Recorded {} for {} on '{}'", time, key.player, key.level);
        Ok(entry)
    }

    /// The `n` best times on the selected level for the current player
    pub fn best_times(&self, n: usize) -> Result<Vec<ScoreEntry>, SessionError> {
        let key = self.score_key()?;
        Ok(self.ledger.best_n(&key, n))
    }
}
