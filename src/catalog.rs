//! Dataset discovery and selection
//!
//! Every game lives in its own directory below the data directory:
//!
//! ```text
//! recipes/
//!   yonder/
//!     meta.json   {"title": "Yonder", "specialisations": ["Cooking"]}
//!     data.json   crafting tree
//! ```
//!
//! Root items tag themselves with `specialisation` to take part in filtering.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::db;
use crate::error::{CraftError, CraftResult};
use crate::loader;
use crate::models::Forest;

pub const META_FILE: &str = "meta.json";
pub const DATA_FILE: &str = "data.json";

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "specializations")]
    specialisations: Vec<String>,
}

/// A discovered game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub id: String,
    pub title: String,
    pub dir: PathBuf,
    pub specialisations: Vec<String>,
}

impl Dataset {
    pub fn data_file(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }
}

pub struct Catalog {
    data_dir: PathBuf,
}

impl Catalog {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Find every game directory with a titled meta file, sorted by id
    pub fn discover_datasets(&self) -> CraftResult<Vec<Dataset>> {
        if !self.data_dir.is_dir() {
            return Err(CraftError::unavailable(
                self.data_dir.display().to_string(),
                "not a directory",
            ));
        }

        let mut datasets = Vec::new();
        for entry in WalkDir::new(&self.data_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.file_name().map_or(true, |n| n != META_FILE) {
                continue;
            }
            match read_dataset(path) {
                Ok(Some(dataset)) => datasets.push(dataset),
                Ok(None) => debug!("Skipping untitled game at {}", path.display()),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        datasets.sort_by(|a, b| a.id.cmp(&b.id));
        debug!("Discovered {} games in {}", datasets.len(), self.data_dir.display());
        Ok(datasets)
    }

    pub fn dataset(&self, id: &str) -> CraftResult<Dataset> {
        self.discover_datasets()?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CraftError::UnknownDataset(id.to_string()))
    }

    pub fn load_dataset(&self, id: &str) -> CraftResult<Forest> {
        let dataset = self.dataset(id)?;
        loader::load_tree_file(&dataset.data_file())
    }

    /// Specialisations declared in the meta file or tagged on root items
    pub fn discover_groups(&self, id: &str) -> CraftResult<Vec<String>> {
        let dataset = self.dataset(id)?;
        let forest = loader::load_tree_file(&dataset.data_file())?;
        Ok(groups_of(&dataset, &forest))
    }

    /// Load a game's tree keeping only roots tagged with `group`
    pub fn filter_by_group(&self, id: &str, group: &str) -> CraftResult<Forest> {
        let dataset = self.dataset(id)?;
        let forest = loader::load_tree_file(&dataset.data_file())?;
        if !groups_of(&dataset, &forest).iter().any(|g| g == group) {
            return Err(CraftError::UnknownGroup {
                dataset: id.to_string(),
                group: group.to_string(),
            });
        }
        Ok(retain_group(&forest, group))
    }

    /// Make `id` the active game; its specialisation starts out unset
    pub fn select_dataset(&self, conn: &Connection, id: &str) -> CraftResult<Dataset> {
        let dataset = self.dataset(id)?;
        db::set_selection(conn, db::GAME_KEY, &dataset.id)?;
        db::clear_selection(conn, db::SPECIALISATION_KEY)?;
        Ok(dataset)
    }

    pub fn select_group(&self, conn: &Connection, group: &str) -> CraftResult<()> {
        let game = db::get_selection(conn, db::GAME_KEY)?.ok_or(CraftError::NoDatasetSelected)?;
        if !self.discover_groups(&game)?.iter().any(|g| g == group) {
            return Err(CraftError::UnknownGroup {
                dataset: game,
                group: group.to_string(),
            });
        }
        db::set_selection(conn, db::SPECIALISATION_KEY, group)
    }

    /// The tree for the stored selection
    pub fn current_tree(&self, conn: &Connection) -> CraftResult<Forest> {
        let selection = db::current_selection(conn)?;
        let game = selection.game.ok_or(CraftError::NoDatasetSelected)?;
        match selection.specialisation {
            Some(group) => self.filter_by_group(&game, &group),
            None => self.load_dataset(&game),
        }
    }
}

fn read_dataset(meta_path: &Path) -> CraftResult<Option<Dataset>> {
    let content = fs::read_to_string(meta_path)
        .map_err(|e| CraftError::unavailable(meta_path.display().to_string(), e))?;
    let meta: Meta = serde_json::from_str(&content)
        .map_err(|e| CraftError::unavailable(meta_path.display().to_string(), e))?;

    let Some(title) = meta.title.filter(|t| !t.trim().is_empty()) else {
        return Ok(None);
    };
    let Some(dir) = meta_path.parent() else {
        return Ok(None);
    };
    let id = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    Ok(Some(Dataset {
        id,
        title,
        dir: dir.to_path_buf(),
        specialisations: meta.specialisations,
    }))
}

fn groups_of(dataset: &Dataset, forest: &Forest) -> Vec<String> {
    let mut groups: BTreeSet<String> = dataset.specialisations.iter().cloned().collect();
    for root in &forest.roots {
        groups.extend(root.specialisations.iter().cloned());
    }
    groups.into_iter().collect()
}

/// Roots tagged with `group`, in source order
pub fn retain_group(forest: &Forest, group: &str) -> Forest {
    Forest {
        roots: forest
            .roots
            .iter()
            .filter(|r| r.specialisations.iter().any(|s| s == group))
            .cloned()
            .collect(),
    }
}
