use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::app::Result;
use crate::domain::Story;
use crate::store::{Collection, Store};

/// A story annotated with whether the user bookmarked it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub story: Story,
    pub bookmarked: bool,
}

/// Favorites kept in the `bookmarks` collection.
///
/// Works entirely against local storage, so bookmarking behaves the same
/// offline and signed out. Storage errors are returned as-is.
pub struct BookmarkService {
    store: Arc<dyn Store + Send + Sync>,
}

impl BookmarkService {
    pub fn new(store: Arc<dyn Store + Send + Sync>) -> Self {
        Self { store }
    }

    pub fn is_bookmarked(&self, id: &str) -> Result<bool> {
        Ok(self.store.get(Collection::Bookmarks, id)?.is_some())
    }

    pub fn put_bookmark(&self, story: &Story) -> Result<()> {
        self.store.put(Collection::Bookmarks, story)?;
        tracing::debug!("Bookmarked story {}", story.id);
        Ok(())
    }

    pub fn delete_bookmark(&self, id: &str) -> Result<()> {
        self.store.delete(Collection::Bookmarks, id)
    }

    pub fn get_bookmark(&self, id: &str) -> Result<Option<Story>> {
        self.store.get(Collection::Bookmarks, id)
    }

    pub fn get_all_bookmarks(&self) -> Result<Vec<Story>> {
        self.store.get_all(Collection::Bookmarks)
    }

    /// Flip the bookmark for `story`. Returns the new state.
    pub fn toggle(&self, story: &Story) -> Result<bool> {
        if self.is_bookmarked(&story.id)? {
            self.delete_bookmark(&story.id)?;
            Ok(false)
        } else {
            self.put_bookmark(story)?;
            Ok(true)
        }
    }

    /// Attach the bookmarked flag to each story, keeping input order.
    pub fn decorate(&self, stories: Vec<Story>) -> Result<Vec<FeedEntry>> {
        let bookmarked: HashSet<String> = self
            .get_all_bookmarks()?
            .into_iter()
            .map(|s| s.id)
            .collect();

        Ok(stories
            .into_iter()
            .map(|story| FeedEntry {
                bookmarked: bookmarked.contains(&story.id),
                story,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::StoryError;
    use crate::cache::testing::{story, BrokenStore};
    use crate::store::SqliteStore;
    use tokio_test::{assert_err, assert_ok};

    fn service() -> (BookmarkService, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        (BookmarkService::new(store.clone()), store)
    }

    #[test]
    fn test_bookmark_lifecycle() {
        let (bookmarks, _) = service();
        let s1 = story("s1");

        assert!(!bookmarks.is_bookmarked("s1").unwrap());
        assert_ok!(bookmarks.put_bookmark(&s1));
        assert!(bookmarks.is_bookmarked("s1").unwrap());
        assert_ok!(bookmarks.delete_bookmark("s1"));
        assert!(!bookmarks.is_bookmarked("s1").unwrap());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (bookmarks, _) = service();
        assert_ok!(bookmarks.delete_bookmark("never-saved"));
        assert_ok!(bookmarks.delete_bookmark("never-saved"));
    }

    #[test]
    fn test_bookmark_survives_clearing_stories() {
        let (bookmarks, store) = service();
        let s1 = story("s1");
        store.put(Collection::Stories, &s1).unwrap();
        bookmarks.put_bookmark(&s1).unwrap();

        store.clear(Collection::Stories).unwrap();

        assert_eq!(bookmarks.get_all_bookmarks().unwrap(), vec![s1]);
    }

    #[test]
    fn test_put_bookmark_twice_keeps_latest() {
        let (bookmarks, _) = service();
        let mut s1 = story("s1");
        bookmarks.put_bookmark(&s1).unwrap();
        s1.description = "Updated caption".into();
        bookmarks.put_bookmark(&s1).unwrap();

        let all = bookmarks.get_all_bookmarks().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "Updated caption");
    }

    #[test]
    fn test_toggle() {
        let (bookmarks, _) = service();
        let s1 = story("s1");

        assert!(bookmarks.toggle(&s1).unwrap());
        assert_eq!(bookmarks.get_bookmark("s1").unwrap(), Some(s1.clone()));
        assert!(!bookmarks.toggle(&s1).unwrap());
        assert_eq!(bookmarks.get_bookmark("s1").unwrap(), None);
    }

    #[test]
    fn test_decorate_marks_favorites_in_order() {
        let (bookmarks, _) = service();
        bookmarks.put_bookmark(&story("s2")).unwrap();

        let entries = bookmarks
            .decorate(vec![story("s1"), story("s2"), story("s3")])
            .unwrap();

        let flags: Vec<(&str, bool)> = entries
            .iter()
            .map(|e| (e.story.id.as_str(), e.bookmarked))
            .collect();
        assert_eq!(flags, vec![("s1", false), ("s2", true), ("s3", false)]);
    }

    #[test]
    fn test_storage_errors_propagate() {
        let bookmarks = BookmarkService::new(Arc::new(BrokenStore));

        let err = assert_err!(bookmarks.is_bookmarked("s1"));
        assert!(err.is_storage());
        assert!(matches!(
            bookmarks.put_bookmark(&story("s1")),
            Err(StoryError::TransactionFailed(_))
        ));
        assert!(bookmarks.get_all_bookmarks().is_err());
    }

    #[test]
    fn test_invalid_story_rejected() {
        let (bookmarks, _) = service();
        assert!(matches!(
            bookmarks.put_bookmark(&story("")),
            Err(StoryError::InvalidRecord(_))
        ));
    }
}
