// SPDX-License-Identifier: GPL-3.0-only

//! Per-run session record

use super::catalog::ChoiceCategory;
use crate::errors::CoordinatorError;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// User choices, name and resulting photo for one run
///
/// Owned by the coordinator; the UI only reads it.
#[derive(Debug)]
pub struct SessionRecord {
    start_time: DateTime<Local>,
    user_name: String,
    weapon: Option<String>,
    land: Option<String>,
    companion: Option<String>,
    captured_photo_path: Option<PathBuf>,
}

impl SessionRecord {
    pub fn new() -> Self {
        let start_time = Local::now();
        info!(start = %start_time.to_rfc3339(), "Session created");
        Self {
            start_time,
            user_name: String::new(),
            weapon: None,
            land: None,
            companion: None,
            captured_photo_path: None,
        }
    }

    pub fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn set_user_name(&mut self, name: &str) {
        self.user_name = name.trim().to_string();
    }

    pub fn choice(&self, category: ChoiceCategory) -> Option<&str> {
        match category {
            ChoiceCategory::Weapon => self.weapon.as_deref(),
            ChoiceCategory::Land => self.land.as_deref(),
            ChoiceCategory::Companion => self.companion.as_deref(),
        }
    }

    /// Record a choice; `id` must belong to `category`
    pub fn set_choice(&mut self, category: ChoiceCategory, id: &str) -> Result<(), CoordinatorError> {
        if ChoiceCategory::of(id) != Some(category) {
            return Err(CoordinatorError::UnknownChoice(id.to_string()));
        }

        let slot = match category {
            ChoiceCategory::Weapon => &mut self.weapon,
            ChoiceCategory::Land => &mut self.land,
            ChoiceCategory::Companion => &mut self.companion,
        };
        *slot = Some(id.to_string());
        Ok(())
    }

    pub fn captured_photo_path(&self) -> Option<&Path> {
        self.captured_photo_path.as_deref()
    }

    pub(crate) fn set_captured_photo_path(&mut self, path: Option<PathBuf>) {
        self.captured_photo_path = path;
    }

    /// Log the choices made so far
    pub fn log_summary(&self) {
        info!(
            user = %self.display_name(),
            weapon = self.weapon.as_deref().unwrap_or("[None]"),
            land = self.land.as_deref().unwrap_or("[None]"),
            companion = self.companion.as_deref().unwrap_or("[None]"),
            start = %self.start_time.to_rfc3339(),
            "Session summary"
        );
    }

    fn display_name(&self) -> &str {
        if self.user_name.is_empty() {
            "[NoName]"
        } else {
            &self.user_name
        }
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionRecord {
    fn drop(&mut self) {
        info!(
            user = %self.display_name(),
            weapon = self.weapon.as_deref().unwrap_or("[None]"),
            land = self.land.as_deref().unwrap_or("[None]"),
            companion = self.companion.as_deref().unwrap_or("[None]"),
            photo = %self
                .captured_photo_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "[None]".to_string()),
            "Session destroyed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_are_validated_per_category() {
        let mut session = SessionRecord::new();
        session.set_choice(ChoiceCategory::Weapon, "weapon2").unwrap();
        assert_eq!(session.choice(ChoiceCategory::Weapon), Some("weapon2"));

        assert_eq!(
            session.set_choice(ChoiceCategory::Land, "weapon3"),
            Err(CoordinatorError::UnknownChoice("weapon3".to_string()))
        );
        assert!(session.set_choice(ChoiceCategory::Land, "land9").is_err());
        assert_eq!(session.choice(ChoiceCategory::Land), None);
    }

    #[test]
    fn start_time_is_fixed() {
        let mut session = SessionRecord::new();
        let start = session.start_time();
        session.set_user_name("  Ada ");
        assert_eq!(session.user_name(), "Ada");
        assert_eq!(session.start_time(), start);
    }
}
