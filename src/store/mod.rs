pub mod sqlite;

use std::fmt;

use crate::app::Result;
use crate::domain::Story;

pub use sqlite::SqliteStore;

/// The two independent record collections of the local database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Stories,
    Bookmarks,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Stories, Collection::Bookmarks];

    pub fn table(&self) -> &'static str {
        match self {
            Collection::Stories => "stories",
            Collection::Bookmarks => "bookmarks",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Keyed storage for story records, one transaction per call.
///
/// Errors are always returned to the caller; deciding whether a storage
/// failure is fatal belongs to the layer above.
pub trait Store {
    /// Point lookup. A missing id is `Ok(None)`, not an error.
    fn get(&self, collection: Collection, id: &str) -> Result<Option<Story>>;

    /// Every record in the collection, in no particular order.
    fn get_all(&self, collection: Collection) -> Result<Vec<Story>>;

    /// Insert or fully overwrite the record with the same id.
    fn put(&self, collection: Collection, story: &Story) -> Result<()>;

    /// Upsert a batch inside a single write transaction.
    fn put_many(&self, collection: Collection, stories: &[Story]) -> Result<usize>;

    /// Remove one record; absent ids are a no-op.
    fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    /// Remove every record from one collection.
    fn clear(&self, collection: Collection) -> Result<()>;

    /// Remove every record from every collection in one transaction.
    fn clear_all(&self) -> Result<()>;

    fn count(&self, collection: Collection) -> Result<usize>;
}
