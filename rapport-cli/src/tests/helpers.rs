//! Test helpers for seeding SQLite databases and request files.

use camino::{Utf8Path, Utf8PathBuf};
use rapport_core::{PersonaBag, PlaceTarget, UserProfile, store::SqliteStore};
use std::fs;
use tempfile::TempDir;

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write test file");
}

/// Temporary directory holding a seeded database.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
    database: Utf8PathBuf,
}

impl Workspace {
    /// Create a database with users `alice` and `bob` and a place `cafe`.
    pub(super) fn seeded() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root =
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        let database = root.join("rapport.db");
        let store = SqliteStore::open(database.as_std_path()).expect("open store");
        store
            .insert_user("alice", Some(&profile(&["coffee", "music"], "mid-range")), None)
            .expect("insert alice");
        store
            .insert_user("bob", Some(&profile(&["music"], "budget")), None)
            .expect("insert bob");
        store
            .insert_place(&PlaceTarget::new("cafe", ["coffee", "music"]).with_price_level(2))
            .expect("insert cafe");
        Self {
            _dir: dir,
            root,
            database,
        }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn database(&self) -> &Utf8Path {
        &self.database
    }
}

fn profile(interests: &[&str], budget: &str) -> UserProfile {
    UserProfile {
        languages: Some(vec!["en".into()]),
        persona: Some(PersonaBag {
            interests: Some(interests.iter().map(|tag| (*tag).to_owned()).collect()),
            budget: Some(budget.into()),
            ..PersonaBag::default()
        }),
        birthday: None,
    }
}
