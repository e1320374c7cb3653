use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::auth::dto::{AuthResponse, PublicUser};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// String key/value storage that outlives a single page view.
pub trait SessionStorage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove_item(&mut self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FileStorage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("parse session file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("read session file {}", path.display()))
            }
        };
        Ok(Self { path, items })
    }

    /// The file holds a bearer token, so on unix it is kept owner-only.
    fn persist(&self) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(&self.items)?;
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            if self.path.exists() {
                std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                    .with_context(|| format!("restrict session file {}", self.path.display()))?;
            }
        }
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("open session file {}", self.path.display()))?;
        file.write_all(raw.as_bytes())
            .with_context(|| format!("write session file {}", self.path.display()))?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        if self.items.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Landing,
    Login,
    Register,
    Home,
    Service,
    Review,
    Other(String),
}

impl Page {
    pub fn from_path(path: &str) -> Self {
        match path {
            "/" | "/index.html" => Page::Landing,
            "/login.html" => Page::Login,
            "/register.html" => Page::Register,
            "/home.html" => Page::Home,
            "/service.html" => Page::Service,
            "/review.html" => Page::Review,
            other => Page::Other(other.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Page::Landing => "/",
            Page::Login => "/login.html",
            Page::Register => "/register.html",
            Page::Home => "/home.html",
            Page::Service => "/service.html",
            Page::Review => "/review.html",
            Page::Other(p) => p,
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Page::Home | Page::Service | Page::Review)
    }

    /// Pages a signed-in user is sent away from.
    pub fn is_entry(&self) -> bool {
        matches!(self, Page::Landing | Page::Login | Page::Register)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { token: String, user: PublicUser },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    Redirect(Page),
}

/// Session presence derived from storage; storage is the only source of truth.
pub struct Session<S> {
    storage: S,
}

impl<S: SessionStorage> Session<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn state(&self) -> SessionState {
        let token = self.storage.get_item(TOKEN_KEY);
        let user = self
            .storage
            .get_item(USER_KEY)
            .and_then(|raw| serde_json::from_str::<PublicUser>(&raw).ok());
        match (token, user) {
            (Some(token), Some(user)) if !token.is_empty() => {
                SessionState::Authenticated { token, user }
            }
            _ => SessionState::Anonymous,
        }
    }

    pub fn token(&self) -> Option<String> {
        match self.state() {
            SessionState::Authenticated { token, .. } => Some(token),
            SessionState::Anonymous => None,
        }
    }

    pub fn on_load(&self, page: &Page) -> Navigation {
        match self.state() {
            SessionState::Authenticated { .. } if page.is_entry() => Navigation::Redirect(Page::Home),
            SessionState::Anonymous if page.requires_auth() => Navigation::Redirect(Page::Login),
            _ => Navigation::Stay,
        }
    }

    pub fn sign_in(&mut self, auth: &AuthResponse) -> anyhow::Result<Navigation> {
        self.storage.set_item(TOKEN_KEY, &auth.token)?;
        self.storage
            .set_item(USER_KEY, &serde_json::to_string(&auth.user)?)?;
        Ok(Navigation::Redirect(Page::Home))
    }

    pub fn logout(&mut self) -> anyhow::Result<Navigation> {
        self.storage.remove_item(TOKEN_KEY)?;
        self.storage.remove_item(USER_KEY)?;
        Ok(Navigation::Redirect(Page::Landing))
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
