// SPDX-License-Identifier: GPL-3.0-only

//! Choice catalog
//!
//! The set of choice ids is closed: `weapon1`..`weapon4`, `land1`..`land4`,
//! `companion1`..`companion4`. Bitmaps are optional decoration loaded once
//! from `<dir>/<id>.jpg`; an id stays selectable when its image is missing.

use crate::constants::catalog::{CATEGORIES, ENTRIES_PER_CATEGORY, ICON_SIZE, IMAGE_EXTENSION};
use image::RgbaImage;
use image::imageops::FilterType;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Choice category, in screen order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChoiceCategory {
    Weapon,
    Land,
    Companion,
}

impl ChoiceCategory {
    pub const ALL: [ChoiceCategory; 3] = [
        ChoiceCategory::Weapon,
        ChoiceCategory::Land,
        ChoiceCategory::Companion,
    ];

    /// Id prefix (`weapon`, `land`, `companion`)
    pub fn prefix(self) -> &'static str {
        match self {
            ChoiceCategory::Weapon => CATEGORIES[0],
            ChoiceCategory::Land => CATEGORIES[1],
            ChoiceCategory::Companion => CATEGORIES[2],
        }
    }

    /// Screen heading
    pub fn title(self) -> &'static str {
        match self {
            ChoiceCategory::Weapon => "Choose your weapon",
            ChoiceCategory::Land => "Choose your land",
            ChoiceCategory::Companion => "Choose your companion",
        }
    }

    /// All ids of this category
    pub fn ids(self) -> Vec<String> {
        (1..=ENTRIES_PER_CATEGORY)
            .map(|n| format!("{}{}", self.prefix(), n))
            .collect()
    }

    /// Category of a known id
    pub fn of(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.ids().iter().any(|known| known == id))
    }
}

impl fmt::Display for ChoiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Pre-scaled choice images keyed by id
#[derive(Debug, Clone, Default)]
pub struct ChoiceCatalog {
    images: HashMap<String, Arc<RgbaImage>>,
}

impl ChoiceCatalog {
    /// Catalog without bitmaps
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every choice image found in `dir`
    pub fn load(dir: &Path) -> Self {
        let mut images = HashMap::new();

        for category in ChoiceCategory::ALL {
            for id in category.ids() {
                let path = dir.join(format!("{}.{}", id, IMAGE_EXTENSION));
                match image::open(&path) {
                    Ok(img) => {
                        let icon = img.resize(ICON_SIZE, ICON_SIZE, FilterType::Lanczos3);
                        debug!(id = %id, width = icon.width(), height = icon.height(), "Loaded choice image");
                        images.insert(id, Arc::new(icon.to_rgba8()));
                    }
                    Err(e) => {
                        warn!(id = %id, path = %path.display(), error = %e, "Failed to load choice image");
                    }
                }
            }
        }

        info!(loaded = images.len(), dir = %dir.display(), "Choice catalog loaded");
        Self { images }
    }

    pub fn image(&self, id: &str) -> Option<&Arc<RgbaImage>> {
        self.images.get(id)
    }
}
