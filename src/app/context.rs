use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::api::{ApiResponse, HttpStoryApi, ListQuery};
use crate::app::error::{Result, StoryError};
use crate::bookmarks::BookmarkService;
use crate::cache::StoryCache;
use crate::config::Config;
use crate::domain::validation::{is_valid_email, is_valid_password, MIN_PASSWORD_CHARS};
use crate::session::{FileSession, Session, SessionProvider};
use crate::store::{SqliteStore, Store};

/// Wires the store, the remote API and the services built on them.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub api: Arc<HttpStoryApi>,
    pub stories: Arc<StoryCache>,
    pub bookmarks: BookmarkService,
    pub session: FileSession,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.storage.database_path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };
        let session_path = match &config.storage.session_path {
            Some(p) => p.clone(),
            None => FileSession::default_path()?,
        };

        let store = SqliteStore::open(&db_path)?;
        let session = FileSession::load(&session_path)?;
        Self::assemble(config, store, session)
    }

    /// Context backed by an in-memory database and the given session file.
    pub fn in_memory(config: Config, session_path: PathBuf) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let session = FileSession::load(session_path)?;
        Self::assemble(config, store, session)
    }

    fn assemble(config: Config, store: Arc<SqliteStore>, session: FileSession) -> Result<Self> {
        let api = Arc::new(HttpStoryApi::new(&config.api)?);
        let stories = Arc::new(StoryCache::new(store.clone(), api.clone()));
        let bookmarks = BookmarkService::new(store.clone());

        Ok(Self {
            config,
            store,
            api,
            stories,
            bookmarks,
            session,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StoryError::Config("Could not find data directory".into()))?;
        let app_dir = data_dir.join("storyline");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("storyline.db"))
    }

    /// Token of the signed-in user.
    pub fn token(&self) -> Result<String> {
        self.session.token().ok_or(StoryError::NotAuthenticated)
    }

    /// Listing parameters from config, overridable per call.
    pub fn list_query(&self, page: u32, size: Option<u32>, with_location: bool) -> ListQuery {
        ListQuery {
            page: page.max(1),
            size: size.unwrap_or(self.config.feed.page_size).max(1),
            with_location: with_location || self.config.feed.with_location,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        if !is_valid_email(email) {
            return Err(StoryError::InvalidInput(format!("not an email address: {}", email)));
        }

        match self.api.login(email, password).await? {
            ApiResponse::Ok(session) => {
                self.session.store(session.clone())?;
                tracing::info!("Signed in as {}", session.name);
                Ok(session)
            }
            ApiResponse::Rejected { message, .. } => Err(StoryError::Server(message)),
        }
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<String> {
        if name.trim().is_empty() {
            return Err(StoryError::InvalidInput("name is empty".into()));
        }
        if !is_valid_email(email) {
            return Err(StoryError::InvalidInput(format!("not an email address: {}", email)));
        }
        if !is_valid_password(password) {
            return Err(StoryError::InvalidInput(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }

        match self.api.register(name, email, password).await? {
            ApiResponse::Ok(message) => {
                tracing::info!("Registered account for {}", email);
                Ok(message)
            }
            ApiResponse::Rejected { message, .. } => Err(StoryError::Server(message)),
        }
    }

    /// Register a throwaway account and sign in with it.
    pub async fn register_guest(&self) -> Result<Session> {
        let guest = GuestAccount::generate();
        self.register(&guest.name, &guest.email, &guest.password)
            .await?;
        self.login(&guest.email, &guest.password).await
    }

    /// Forget the session and wipe both local collections.
    pub fn logout(&self) -> Result<()> {
        self.session.clear()?;
        self.store.clear_all()?;
        tracing::info!("Signed out and cleared local data");
        Ok(())
    }
}

/// Generated credentials for a guest account.
#[derive(Debug, Clone)]
pub struct GuestAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl GuestAccount {
    pub fn generate() -> Self {
        let name = format!("Guest_{}", random_base36(6));
        let email = format!("{}.{}@gmail.com", name.to_lowercase(), random_base36(6));
        Self {
            name,
            email,
            password: random_base36(MIN_PASSWORD_CHARS),
        }
    }
}

/// Up to 12 random base-36 digits from a freshly keyed hasher.
fn random_base36(len: usize) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = RandomState::new().hash_one(Utc::now().timestamp_nanos_opt());
    (0..len.min(12))
        .map(|_| {
            let digit = DIGITS[(n % 36) as usize] as char;
            n /= 36;
            digit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Story;
    use crate::store::Collection;

    fn context(dir: &tempfile::TempDir) -> AppContext {
        AppContext::in_memory(Config::default(), dir.path().join("session.json")).unwrap()
    }

    #[test]
    fn test_token_requires_session() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        assert!(matches!(ctx.token(), Err(StoryError::NotAuthenticated)));

        ctx.session
            .store(Session {
                user_id: "user-1".into(),
                name: "Arif".into(),
                token: "tok".into(),
            })
            .unwrap();
        assert_eq!(ctx.token().unwrap(), "tok");
    }

    #[test]
    fn test_logout_clears_session_and_both_collections() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        ctx.session
            .store(Session {
                user_id: "user-1".into(),
                name: "Arif".into(),
                token: "tok".into(),
            })
            .unwrap();
        let s1 = Story::new("s1", "Arif", "d", "https://example.com/p.png");
        ctx.store.put(Collection::Stories, &s1).unwrap();
        ctx.bookmarks.put_bookmark(&s1).unwrap();

        ctx.logout().unwrap();

        assert!(!ctx.session.is_authenticated());
        assert_eq!(ctx.store.count(Collection::Stories).unwrap(), 0);
        assert!(ctx.bookmarks.get_all_bookmarks().unwrap().is_empty());
    }

    #[test]
    fn test_list_query_uses_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);

        let query = ctx.list_query(0, None, false);
        assert_eq!(query.page, 1);
        assert_eq!(query.size, ctx.config.feed.page_size);
        assert!(!query.with_location);

        let query = ctx.list_query(2, Some(30), true);
        assert_eq!((query.page, query.size, query.with_location), (2, 30, true));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_email_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        assert!(matches!(
            ctx.login("not-an-email", "secret").await,
            Err(StoryError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_register_validates_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);

        for (name, email, password) in [
            ("", "arif@example.com", "rahasia123"),
            ("Arif", "arif@example", "rahasia123"),
            ("Arif", "arif@example.com", "short"),
        ] {
            assert!(matches!(
                ctx.register(name, email, password).await,
                Err(StoryError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_guest_account_passes_validation() {
        let guest = GuestAccount::generate();
        assert!(guest.name.starts_with("Guest_"));
        assert_eq!(guest.name.len(), "Guest_".len() + 6);
        assert!(is_valid_email(&guest.email));
        assert!(guest.email.starts_with(&guest.name.to_lowercase()));
        assert!(is_valid_password(&guest.password));
        assert!(guest
            .password
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_guest_accounts_differ() {
        let a = GuestAccount::generate();
        let b = GuestAccount::generate();
        assert_ne!(a.email, b.email);
    }
}
