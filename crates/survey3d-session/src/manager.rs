// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use chrono::{Local, Timelike};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use survey3d_structures::{ParticipantConfig, ProjectedField, Survey};

use crate::persistence;
use crate::{SessionError, SessionResult};

struct SessionState {
    survey: Option<Survey>,
    data_path: PathBuf,
    next_set_num: u32,
    /// `(date, start_time)` of the last survey issued
    last_stamp: Option<(String, String)>,
}

/// Process-wide owner of the live survey
///
/// Share it as `Arc<SessionManager>`; all methods take `&self`.
pub struct SessionManager {
    participants: ParticipantConfig,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(participants: ParticipantConfig, data_path: impl Into<PathBuf>) -> Self {
        Self {
            participants,
            state: Mutex::new(SessionState {
                survey: None,
                data_path: data_path.into(),
                next_set_num: 1,
                last_stamp: None,
            }),
        }
    }

    /// Load the participant configuration document and build a manager
    ///
    /// A missing or unparsable document is returned as an error; callers treat it as fatal.
    pub fn open(config_file: &Path, data_path: impl Into<PathBuf>) -> SessionResult<Self> {
        let participants =
            ParticipantConfig::load(config_file).map_err(|source| SessionError::Load {
                path: config_file.to_path_buf(),
                source,
            })?;
        info!(
            "[SESSION] Loaded {} participant(s) from {}",
            participants.len(),
            config_file.display()
        );
        Ok(Self::new(participants, data_path))
    }

    pub fn participant_config(&self) -> &ParticipantConfig {
        &self.participants
    }

    /// Start a survey for `participant`
    ///
    /// Fails without side effects if a survey is already live or the participant
    /// is unknown. Returns a snapshot of the new survey.
    ///
    /// Tokens have one-second resolution and also name the output file. A start
    /// in the same second as the previous one, or one whose file already exists,
    /// waits for the next second while holding the session lock.
    pub fn new_survey(&self, participant: &str) -> SessionResult<Survey> {
        let mut state = self.state.lock();

        if let Some(live) = &state.survey {
            warn!(
                "[SESSION] Cannot begin survey for '{}': survey for '{}' already in progress",
                participant, live.participant
            );
            return Err(SessionError::SessionActive {
                participant: live.participant.clone(),
            });
        }

        let config = self.participants.get(participant).cloned().ok_or_else(|| {
            warn!(
                "[SESSION] Cannot begin survey: '{}' is not in the participant config",
                participant
            );
            SessionError::UnknownParticipant(participant.to_string())
        })?;

        let survey = Self::stamp_unique(&state, participant, config);
        state.next_set_num += 1;
        state.last_stamp = Some((survey.date.clone(), survey.start_time.clone()));
        info!(
            "[SESSION] Started survey #{} for '{}' (token {})",
            survey.set_num, participant, survey.start_time
        );
        state.survey = Some(survey.clone());
        Ok(survey)
    }

    pub fn current_survey(&self) -> Option<Survey> {
        self.state.lock().survey.clone()
    }

    pub fn has_live_survey(&self) -> bool {
        self.state.lock().survey.is_some()
    }

    /// Replace the live survey's fields wholesale
    pub fn update(&self, start_time: &str, fields: Vec<ProjectedField>) -> SessionResult<()> {
        Survey::check_field_names(&fields).map_err(SessionError::InvalidFields)?;

        let mut state = self.state.lock();
        let live = Self::live_matching(&mut state, start_time)?;
        debug!(
            "[SESSION] Updating survey {} with {} field(s)",
            live.start_time,
            fields.len()
        );
        live.projected_fields = fields;
        Ok(())
    }

    /// Apply `fields`, stamp the end time and write the survey to the data path
    ///
    /// The live slot is freed only once the file is on disk. If the write fails
    /// the fields are kept on the live survey (nothing the participant entered is
    /// lost) and the error is returned.
    pub fn submit(&self, start_time: &str, fields: Vec<ProjectedField>) -> SessionResult<Survey> {
        Survey::check_field_names(&fields).map_err(SessionError::InvalidFields)?;

        let mut state = self.state.lock();
        let data_path = state.data_path.clone();
        let live = Self::live_matching(&mut state, start_time)?;

        if fields.is_empty() {
            warn!("[SESSION] Survey cannot be saved without any projected fields");
            return Err(SessionError::EmptySubmission);
        }
        live.projected_fields = fields;

        let mut finished = live.clone();
        finished.stamp_end_now();

        match persistence::save_survey(&data_path, &finished) {
            Ok(path) => {
                info!("[SESSION] Saved survey to {}", path.display());
                state.survey = None;
                Ok(finished)
            }
            Err(e) => {
                warn!("[SESSION] {}", e);
                Err(e)
            }
        }
    }

    pub fn data_path(&self) -> PathBuf {
        self.state.lock().data_path.clone()
    }

    /// Point subsequent submissions at `path`, creating it if needed
    pub fn set_data_path(&self, path: impl Into<PathBuf>) -> SessionResult<()> {
        let path = path.into();
        std::fs::create_dir_all(&path).map_err(|e| SessionError::PersistenceFailure {
            path: path.clone(),
            reason: format!("Create dir failed: {}", e),
        })?;

        let mut state = self.state.lock();
        info!(
            "[SESSION] Data path changed: {} -> {}",
            state.data_path.display(),
            path.display()
        );
        state.data_path = path;
        Ok(())
    }

    /// Read back a survey written by [`SessionManager::submit`]
    pub fn load_saved(path: &Path) -> SessionResult<Survey> {
        persistence::load_survey(path)
    }

    /// New survey whose token differs from the last one issued and whose file
    /// name is still free in the data path
    fn stamp_unique(
        state: &SessionState,
        participant: &str,
        config: serde_json::Value,
    ) -> Survey {
        loop {
            let now = Local::now().naive_local();
            let survey = Survey::started_at(participant, config.clone(), state.next_set_num, now);

            let reused = state
                .last_stamp
                .as_ref()
                .is_some_and(|(date, time)| *date == survey.date && *time == survey.start_time);
            let taken = state.data_path.join(survey.file_name()).exists();
            if !reused && !taken {
                return survey;
            }

            let into_second = (now.nanosecond() / 1_000_000).min(999);
            debug!(
                "[SESSION] Token {} already used, waiting for the next second",
                survey.start_time
            );
            std::thread::sleep(Duration::from_millis(u64::from(1000 - into_second)));
        }
    }

    fn live_matching<'a>(
        state: &'a mut SessionState,
        start_time: &str,
    ) -> SessionResult<&'a mut Survey> {
        let live = state.survey.as_mut().ok_or(SessionError::NoLiveSession)?;
        if live.start_time != start_time {
            warn!(
                "[SESSION] Rejecting stale request: token {} does not match live survey {}",
                start_time, live.start_time
            );
            return Err(SessionError::StaleToken {
                expected: live.start_time.clone(),
                received: start_time.to_string(),
            });
        }
        Ok(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn participants() -> ParticipantConfig {
        let mut entries = BTreeMap::new();
        entries.insert("alice".to_string(), serde_json::json!({"models": ["hand"]}));
        entries.insert("bob".to_string(), serde_json::json!({}));
        ParticipantConfig::from_entries(entries)
    }

    fn field(name: &str) -> ProjectedField {
        ProjectedField::new("hand", name).with_vertices(vec![0, 1, 2])
    }

    #[test]
    fn test_second_new_survey_rejected() {
        let dir = tempdir().unwrap();
        let manager = SessionManager::new(participants(), dir.path());

        let first = manager.new_survey("alice").unwrap();
        let second = manager.new_survey("bob");

        assert!(matches!(second, Err(SessionError::SessionActive { .. })));
        assert_eq!(manager.current_survey().unwrap().start_time, first.start_time);
        assert_eq!(manager.current_survey().unwrap().participant, "alice");
    }

    #[test]
    fn test_unknown_participant() {
        let manager = SessionManager::new(participants(), "unused");
        assert!(matches!(
            manager.new_survey("mallory"),
            Err(SessionError::UnknownParticipant(_))
        ));
        assert!(!manager.has_live_survey());
    }

    #[test]
    fn test_config_bound_at_creation() {
        let manager = SessionManager::new(participants(), "unused");
        let survey = manager.new_survey("alice").unwrap();
        assert_eq!(survey.config["models"][0], "hand");
        assert_eq!(survey.set_num, 1);
    }

    #[test]
    fn test_update_replaces_fields() {
        let manager = SessionManager::new(participants(), "unused");
        let token = manager.new_survey("alice").unwrap().start_time;

        manager.update(&token, vec![field("a"), field("b")]).unwrap();
        manager.update(&token, vec![field("c")]).unwrap();

        let names: Vec<String> = manager
            .current_survey()
            .unwrap()
            .projected_fields
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["c".to_string()]);
    }

    #[test]
    fn test_stale_token_never_mutates() {
        let manager = SessionManager::new(participants(), "unused");
        let token = manager.new_survey("alice").unwrap().start_time;
        manager.update(&token, vec![field("a")]).unwrap();

        let stale = "00-00-00-stale";
        assert!(matches!(
            manager.update(stale, vec![field("x")]),
            Err(SessionError::StaleToken { .. })
        ));
        assert!(manager.submit(stale, vec![field("x")]).is_err());

        let live = manager.current_survey().unwrap();
        assert_eq!(live.projected_fields.len(), 1);
        assert_eq!(live.projected_fields[0].name, "a");
    }

    #[test]
    fn test_update_without_live_survey() {
        let manager = SessionManager::new(participants(), "unused");
        let result = manager.update("10-00-00", vec![field("a")]);
        assert!(matches!(result, Err(SessionError::NoLiveSession)));
        assert!(result.unwrap_err().is_stale());
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let manager = SessionManager::new(participants(), "unused");
        let token = manager.new_survey("alice").unwrap().start_time;
        assert!(matches!(
            manager.update(&token, vec![field("a"), field("a")]),
            Err(SessionError::InvalidFields(_))
        ));
    }

    #[test]
    fn test_empty_submission_keeps_live_survey() {
        let dir = tempdir().unwrap();
        let manager = SessionManager::new(participants(), dir.path());
        let token = manager.new_survey("alice").unwrap().start_time;
        manager.update(&token, vec![field("a")]).unwrap();

        assert!(matches!(
            manager.submit(&token, Vec::new()),
            Err(SessionError::EmptySubmission)
        ));
        assert_eq!(manager.current_survey().unwrap().projected_fields.len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_submit_clears_and_increments_set_num() {
        let dir = tempdir().unwrap();
        let manager = SessionManager::new(participants(), dir.path());
        let token = manager.new_survey("alice").unwrap().start_time;

        let saved = manager.submit(&token, vec![field("a")]).unwrap();
        assert!(!saved.end_time.is_empty());
        assert!(!manager.has_live_survey());
        assert!(dir.path().join(saved.file_name()).exists());

        assert_eq!(manager.new_survey("bob").unwrap().set_num, 2);
    }

    #[test]
    fn test_failed_write_keeps_live_survey() {
        let dir = tempdir().unwrap();
        // A regular file where the data directory should be
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"").unwrap();

        let manager = SessionManager::new(participants(), &blocker);
        let token = manager.new_survey("alice").unwrap().start_time;

        let result = manager.submit(&token, vec![field("a")]);
        assert!(matches!(result, Err(SessionError::PersistenceFailure { .. })));

        let live = manager.current_survey().unwrap();
        assert_eq!(live.start_time, token);
        assert_eq!(live.projected_fields.len(), 1);
        assert!(live.end_time.is_empty());
    }

    #[test]
    fn test_immediate_restart_gets_fresh_token() {
        let dir = tempdir().unwrap();
        let manager = SessionManager::new(participants(), dir.path());

        let first = manager.new_survey("alice").unwrap().start_time;
        manager.submit(&first, vec![field("a")]).unwrap();

        let second = manager.new_survey("alice").unwrap();
        assert_ne!(second.start_time, first);
        let saved = manager.submit(&second.start_time, vec![field("b")]).unwrap();
        assert!(dir.path().join(saved.file_name()).exists());

        assert!(!manager.has_live_survey());
        assert!(manager.new_survey("alice").is_ok());
    }

    #[test]
    fn test_existing_file_is_not_reused_after_restart() {
        let dir = tempdir().unwrap();
        let first = SessionManager::new(participants(), dir.path());
        let token = first.new_survey("alice").unwrap().start_time;
        let saved = first.submit(&token, vec![field("a")]).unwrap();

        // Fresh process state over the same data directory
        let restarted = SessionManager::new(participants(), dir.path());
        let survey = restarted.new_survey("alice").unwrap();
        assert_ne!(survey.file_name(), saved.file_name());
        assert!(restarted
            .submit(&survey.start_time, vec![field("b")])
            .is_ok());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_set_data_path_creates_directory() {
        let dir = tempdir().unwrap();
        let manager = SessionManager::new(participants(), dir.path());
        let target = dir.path().join("session_7");

        manager.set_data_path(&target).unwrap();
        assert!(target.is_dir());
        assert_eq!(manager.data_path(), target);
    }
}
