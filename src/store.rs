//! JSON-backed collection: decks, options groups, and the review log.

use std::{
    collections::{BTreeMap, HashMap},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    id::{DeckId, GroupId, Id, ItemId},
    retention::{OutcomeCounts, ReviewLog},
    review::ReviewEvent,
    session::ConfigStore,
};

pub const NEUTRAL_MODIFIER: f64 = 100.0;

fn neutral_modifier() -> f64 {
    NEUTRAL_MODIFIER
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    pub group: GroupId,
    /// Filtered decks borrow cards temporarily and are never tuned.
    #[serde(default)]
    pub filtered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsGroup {
    pub name: String,
    /// Percentage applied to every review interval; 100 leaves them unchanged.
    #[serde(default = "neutral_modifier")]
    pub interval_modifier: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub decks: BTreeMap<DeckId, Deck>,
    #[serde(default)]
    pub groups: BTreeMap<GroupId, OptionsGroup>,
    /// Deck each card currently lives in.
    #[serde(default)]
    pub cards: HashMap<ItemId, DeckId>,
    #[serde(default)]
    pub revlog: Vec<ReviewEvent>,
}

impl Collection {
    /// Non-filtered decks, ordered by name.
    pub fn tunable_decks(&self) -> Vec<(DeckId, &Deck)> {
        let mut decks: Vec<_> = self
            .decks
            .iter()
            .filter(|(_, deck)| !deck.filtered)
            .map(|(id, deck)| (*id, deck))
            .collect();
        decks.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        decks
    }

    /// Resolves a deck by id token or by case-insensitive name.
    pub fn find_deck(&self, query: &str) -> Option<DeckId> {
        if let Ok(id) = query.parse::<Id>()
            && self.decks.contains_key(&id)
        {
            return Some(id);
        }
        self.decks
            .iter()
            .find(|(_, deck)| deck.name.eq_ignore_ascii_case(query.trim()))
            .map(|(id, _)| *id)
    }

    /// Creates a deck, sharing the options group called `group_name` if one
    /// exists.
    pub fn add_deck(&mut self, name: &str, group_name: &str, filtered: bool) -> DeckId {
        let group = match self.groups.iter().find(|(_, g)| g.name == group_name) {
            Some((id, _)) => *id,
            None => {
                let id = Id::random();
                self.groups.insert(
                    id,
                    OptionsGroup {
                        name: group_name.to_owned(),
                        interval_modifier: NEUTRAL_MODIFIER,
                    },
                );
                id
            }
        };
        let id = Id::random();
        self.decks.insert(
            id,
            Deck {
                name: name.to_owned(),
                group,
                filtered,
            },
        );
        id
    }

    /// Appends a review and files its card under `deck`.
    pub fn record(&mut self, deck: DeckId, event: ReviewEvent) -> Result<()> {
        if !self.decks.contains_key(&deck) {
            return Err(Error::InvalidScope(deck));
        }
        self.cards.insert(event.item, deck);
        self.revlog.push(event);
        Ok(())
    }
}

impl ReviewLog for Collection {
    fn has_scope(&self, scope: &DeckId) -> bool {
        self.decks.get(scope).is_some_and(|deck| !deck.filtered)
    }

    fn query_outcome_counts(&self, scope: &DeckId, since: Option<i64>) -> Result<OutcomeCounts> {
        Ok(OutcomeCounts::tally(
            self.revlog
                .iter()
                .filter(|e| self.cards.get(&e.item) == Some(scope)),
            since,
        ))
    }
}

impl ConfigStore for Collection {
    fn group_of(&self, scope: &DeckId) -> Result<GroupId> {
        self.decks
            .get(scope)
            .map(|deck| deck.group)
            .ok_or(Error::InvalidScope(*scope))
    }

    fn read_modifier(&self, group: &GroupId) -> Result<f64> {
        self.groups
            .get(group)
            .map(|g| g.interval_modifier)
            .ok_or(Error::InvalidScope(*group))
    }

    /// Updates memory only; [`Store`] persists.
    fn write_modifier(&mut self, group: &GroupId, modifier: f64) -> Result<()> {
        if !modifier.is_finite() || modifier <= 0.0 {
            return Err(Error::InvalidModifier(modifier));
        }
        let entry = self.groups.get_mut(group).ok_or(Error::InvalidScope(*group))?;
        entry.interval_modifier = modifier;
        Ok(())
    }
}

pub fn data_path() -> anyhow::Result<PathBuf> {
    let mut dir = match std::env::var("XDG_DATA_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let mut home = PathBuf::from(std::env::var("HOME")?);
            home.push(".local/share");
            home
        }
    };
    dir.push("ivltune");
    Ok(dir)
}

/// A [`Collection`] bound to the file it was read from.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    collection: Collection,
}

impl Store {
    pub fn open_at(path: &Path) -> Result<Self> {
        let open = || -> io::Result<Collection> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = match std::fs::read_to_string(path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(e),
            };
            if contents.trim().is_empty() {
                Ok(Collection::default())
            } else {
                Ok(serde_json::from_str(&contents)?)
            }
        };
        let collection = open().map_err(Error::StoreUnavailable)?;
        debug!(
            path = %path.display(),
            decks = collection.decks.len(),
            reviews = collection.revlog.len(),
            "opened collection"
        );
        Ok(Self {
            path: path.to_owned(),
            collection,
        })
    }

    pub fn open() -> anyhow::Result<Self> {
        let mut path = data_path()?;
        path.push("collection.json");
        Ok(Self::open_at(&path)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut Collection {
        &mut self.collection
    }

    /// Writes a sibling temp file and renames it over the collection, so the
    /// old file survives any failure.
    pub fn save(&self) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &self.collection)?;
            writer.flush()?;
        }
        tmp.as_file().sync_data()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), "saved collection");
        Ok(())
    }
}

impl ReviewLog for Store {
    fn has_scope(&self, scope: &DeckId) -> bool {
        self.collection.has_scope(scope)
    }

    fn query_outcome_counts(&self, scope: &DeckId, since: Option<i64>) -> Result<OutcomeCounts> {
        self.collection.query_outcome_counts(scope, since)
    }
}

impl ConfigStore for Store {
    fn group_of(&self, scope: &DeckId) -> Result<GroupId> {
        self.collection.group_of(scope)
    }

    fn read_modifier(&self, group: &GroupId) -> Result<f64> {
        self.collection.read_modifier(group)
    }

    fn write_modifier(&mut self, group: &GroupId, modifier: f64) -> Result<()> {
        let previous = self.collection.read_modifier(group)?;
        self.collection.write_modifier(group, modifier)?;
        if let Err(e) = self.save() {
            if let Some(entry) = self.collection.groups.get_mut(group) {
                entry.interval_modifier = previous;
            }
            return Err(Error::PersistenceFailure(e));
        }
        info!(%group, previous, modifier, "interval modifier updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{Grade, ReviewKind};

    fn review(item: ItemId, at: i64, grade: Grade) -> ReviewEvent {
        ReviewEvent {
            item,
            at,
            grade,
            kind: ReviewKind::Review,
        }
    }

    #[test]
    fn decks_share_groups_by_name() {
        let mut col = Collection::default();
        let a = col.add_deck("Spanish", "Default", false);
        let b = col.add_deck("French", "Default", false);
        let c = col.add_deck("Kanji", "Hard stuff", false);
        assert_eq!(col.group_of(&a).unwrap(), col.group_of(&b).unwrap());
        assert_ne!(col.group_of(&a).unwrap(), col.group_of(&c).unwrap());
        assert_eq!(col.read_modifier(&col.group_of(&c).unwrap()).unwrap(), 100.0);
    }

    #[test]
    fn counts_only_cards_in_scope() {
        let mut col = Collection::default();
        let a = col.add_deck("A", "Default", false);
        let b = col.add_deck("B", "Default", false);
        let (x, y) = (Id::new(1), Id::new(2));
        col.record(a, review(x, 10, Grade::Good)).unwrap();
        col.record(a, review(x, 20, Grade::Again)).unwrap();
        col.record(b, review(y, 30, Grade::Again)).unwrap();

        let counts = col.query_outcome_counts(&a, None).unwrap();
        assert_eq!(counts, OutcomeCounts { failed: 1, passed: 1 });
        let counts = col.query_outcome_counts(&a, Some(15)).unwrap();
        assert_eq!(counts, OutcomeCounts { failed: 1, passed: 0 });
        let counts = col.query_outcome_counts(&b, None).unwrap();
        assert_eq!(counts, OutcomeCounts { failed: 1, passed: 0 });
    }

    #[test]
    fn filtered_decks_are_hidden() {
        let mut col = Collection::default();
        let normal = col.add_deck("Normal", "Default", false);
        let filtered = col.add_deck("Cram", "Default", true);
        assert!(col.has_scope(&normal));
        assert!(!col.has_scope(&filtered));
        let names: Vec<_> = col.tunable_decks().iter().map(|(_, d)| d.name.clone()).collect();
        assert_eq!(names, ["Normal"]);
    }

    #[test]
    fn find_deck_by_name_or_id() {
        let mut col = Collection::default();
        let id = col.add_deck("Spanish", "Default", false);
        assert_eq!(col.find_deck("spanish"), Some(id));
        assert_eq!(col.find_deck(&id.to_string()), Some(id));
        assert_eq!(col.find_deck("German"), None);
    }

    #[test]
    fn record_rejects_unknown_deck() {
        let mut col = Collection::default();
        assert!(matches!(
            col.record(Id::new(3), review(Id::new(1), 0, Grade::Good)),
            Err(Error::InvalidScope(_))
        ));
    }

    #[test]
    fn write_back_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/collection.json");

        let mut store = Store::open_at(&path).unwrap();
        let deck = store.collection_mut().add_deck("Spanish", "Default", false);
        for n in 0..20 {
            let event = review(Id::new(n), n as i64, Grade::Good);
            store.collection_mut().record(deck, event).unwrap();
        }
        store.save().unwrap();
        let group = store.group_of(&deck).unwrap();
        store.write_modifier(&group, 87.5).unwrap();
        // a shorter document must not leave the tail of the old one behind
        store.collection_mut().revlog.clear();
        store.save().unwrap();
        drop(store);

        let store = Store::open_at(&path).unwrap();
        assert!(store.collection().revlog.is_empty());
        assert_eq!(store.read_modifier(&group).unwrap(), 87.5);
        assert_eq!(store.group_of(&deck).unwrap(), group);
    }

    #[test]
    fn write_back_validates() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open_at(&dir.path().join("collection.json")).unwrap();
        let deck = store.collection_mut().add_deck("Spanish", "Default", false);
        let group = store.group_of(&deck).unwrap();
        assert!(matches!(
            store.write_modifier(&group, 0.0),
            Err(Error::InvalidModifier(_))
        ));
        assert!(matches!(
            store.write_modifier(&Id::new(5), 90.0),
            Err(Error::InvalidScope(_))
        ));
        assert_eq!(store.read_modifier(&group).unwrap(), 100.0);
    }

    #[test]
    fn failed_write_back_keeps_memory_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.json");
        let mut store = Store::open_at(&path).unwrap();
        let deck = store.collection_mut().add_deck("Spanish", "Default", false);
        let group = store.group_of(&deck).unwrap();
        // a stored value that would fail validation must still be restored
        store.collection_mut().groups.get_mut(&group).unwrap().interval_modifier = 0.0;
        store.save().unwrap();
        let before = std::fs::read(&path).unwrap();

        // the parent of this path is a regular file, so no temp file can be made
        store.path = path.join("collection.json");
        assert!(matches!(
            store.write_modifier(&group, 120.0),
            Err(Error::PersistenceFailure(_))
        ));
        assert_eq!(store.read_modifier(&group).unwrap(), 0.0);
        assert_eq!(std::fs::read(&path).unwrap(), before);

        let reopened = Store::open_at(&path).unwrap();
        assert_eq!(reopened.group_of(&deck).unwrap(), group);
    }

    #[test]
    fn missing_file_is_not_created_until_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.json");
        let store = Store::open_at(&path).unwrap();
        assert!(store.collection().decks.is_empty());
        assert!(!path.exists());
        store.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Store::open_at(&path), Err(Error::StoreUnavailable(_))));
    }
}
