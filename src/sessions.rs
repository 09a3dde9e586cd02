//! Cookie-identified sessions.
//!
//! The [`sessions`] middleware reads the session id from a cookie and
//! attaches a [`Session`] to the request's key/value store under
//! [`DEFAULT_KEY`]. Values are loaded from the [`Store`] on first access and
//! written back by [`Session::save`], which also sets the cookie. The session
//! lives exactly as long as the request's [`Context`].
//!
//! ```rust
//! use cob::sessions::{self, MemoryStore};
//! use cob::{Context, Engine};
//!
//! fn visit(c: &mut Context) {
//!     let session = sessions::default_session(c);
//!     let count = session.get("count").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
//!     session.set("count", count);
//!     if let Err(e) = session.save(c) {
//!         c.fail(500, e.to_string());
//!         return;
//!     }
//!     c.string(200, count);
//! }
//!
//! let mut engine = Engine::new();
//! engine.use_(sessions::sessions("cob_session", MemoryStore::default()));
//! engine.get("/visit", visit);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use http::header::{COOKIE, HeaderValue, SET_COOKIE};
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::context::Context;
use crate::error::Error;

/// Key under which the middleware stores the session(s) in the context.
pub const DEFAULT_KEY: &str = "cob/sessions";

/// The values of one session.
pub type Values = HashMap<String, Value>;

/// Sessions keyed by cookie name, as attached by [`sessions_many`].
pub type SessionMap = HashMap<String, Session>;

/// Server-side session storage.
///
/// `load` must return `None` for ids it never issued or whose session has
/// expired: the caller then starts a fresh session under a new id.
pub trait Store: Send + Sync + 'static {
    fn load(&self, id: &str) -> Option<Values>;
    /// Stores `values` for `max_age`, or for the store's own lifetime when
    /// the cookie has none.
    fn save(&self, id: &str, values: Values, max_age: Option<Duration>);
    fn remove(&self, id: &str);
}

/// Lets the application keep a handle on the store it installs.
impl<S: Store + ?Sized> Store for Arc<S> {
    fn load(&self, id: &str) -> Option<Values> {
        (**self).load(id)
    }

    fn save(&self, id: &str, values: Values, max_age: Option<Duration>) {
        (**self).save(id, values, max_age)
    }

    fn remove(&self, id: &str) {
        (**self).remove(id)
    }
}

/// Lifetime of sessions saved without a `max_age`: 30 days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(86400 * 30);

#[derive(Debug)]
struct Entry {
    values: Values,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Process-local [`Store`]. Sessions are lost on restart.
///
/// Expired entries are dropped when loaded and swept on every save.
#[derive(Debug)]
pub struct MemoryStore {
    sessions: DashMap<String, Entry>,
    ttl: Duration,
}

impl MemoryStore {
    /// A store whose sessions without a `max_age` live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: DashMap::new(), ttl }
    }

    /// Number of stored sessions, expired ones not yet swept included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Store for MemoryStore {
    fn load(&self, id: &str) -> Option<Values> {
        let now = Instant::now();
        let values = {
            let entry = self.sessions.get(id)?;
            entry.is_live(now).then(|| entry.values.clone())
        };
        if values.is_none() {
            self.sessions.remove_if(id, |_, entry| !entry.is_live(now));
        }
        values
    }

    fn save(&self, id: &str, values: Values, max_age: Option<Duration>) {
        let now = Instant::now();
        self.sessions.retain(|_, entry| entry.is_live(now));
        // An age past what `Instant` can hold is treated as ~136 years.
        let expires_at = now
            .checked_add(max_age.unwrap_or(self.ttl))
            .unwrap_or_else(|| now + Duration::from_secs(u64::from(u32::MAX)));
        self.sessions.insert(id.to_owned(), Entry { values, expires_at });
    }

    fn remove(&self, id: &str) {
        self.sessions.remove(id);
    }
}

/// Cookie attributes.
#[derive(Clone, Debug)]
pub struct Options {
    pub path: String,
    pub domain: Option<String>,
    /// `None` makes a browser-session cookie; a negative value deletes the
    /// session on the next save.
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            path: "/".to_owned(),
            domain: None,
            max_age: None,
            secure: false,
            http_only: true,
        }
    }
}

struct State {
    id: Option<String>,
    values: Option<Values>,
    options: Options,
    written: bool,
}

/// One named session of the current request.
pub struct Session {
    name: String,
    store: Arc<dyn Store>,
    state: Mutex<State>,
}

impl Session {
    /// `cookie` is whatever the client sent; it only becomes the session id
    /// if it is a UUID the store still knows, checked on first access.
    fn new(name: &str, store: Arc<dyn Store>, cookie: Option<String>) -> Self {
        let id = cookie.filter(|id| Uuid::parse_str(id).is_ok());
        Self {
            name: name.to_owned(),
            store,
            state: Mutex::new(State {
                id,
                values: None,
                options: Options::default(),
                written: false,
            }),
        }
    }

    fn with_values<R>(&self, f: impl FnOnce(&mut Values, &mut bool) -> R) -> R {
        let mut state = self.state.lock();
        let State { id, values, written, .. } = &mut *state;
        let values = values.get_or_insert_with(|| {
            let loaded = id.as_deref().and_then(|id| self.store.load(id));
            if loaded.is_none() {
                *id = None;
            }
            loaded.unwrap_or_default()
        });
        f(values, written)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.with_values(|values, _| values.get(key).cloned())
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.with_values(|values, written| {
            values.insert(key.into(), value.into());
            *written = true;
        });
    }

    pub fn delete(&self, key: &str) {
        self.with_values(|values, written| {
            values.remove(key);
            *written = true;
        });
    }

    pub fn clear(&self) {
        self.with_values(|values, written| {
            values.clear();
            *written = true;
        });
    }

    pub fn options(&self, options: Options) {
        self.state.lock().options = options;
    }

    /// Whether there are changes not yet saved.
    pub fn written(&self) -> bool {
        self.state.lock().written
    }

    /// Persists pending changes and sets the session cookie.
    ///
    /// Does nothing if nothing changed. Must run before the response status
    /// is written, or the cookie is lost.
    pub fn save(&self, c: &mut Context) -> Result<(), Error> {
        let mut state = self.state.lock();
        if !state.written {
            return Ok(());
        }

        let id = state
            .id
            .get_or_insert_with(|| Uuid::new_v4().simple().to_string())
            .clone();
        let values = state.values.clone().unwrap_or_default();

        match state.options.max_age {
            Some(age) if age < 0 => self.store.remove(&id),
            age => {
                let max_age = age.map(|secs| Duration::from_secs(secs.unsigned_abs()));
                self.store.save(&id, values, max_age);
            }
        }

        let cookie = HeaderValue::try_from(set_cookie(&self.name, &id, &state.options))?;
        c.writer.header_mut().append(SET_COOKIE, cookie);
        state.written = false;
        Ok(())
    }
}

fn set_cookie(name: &str, id: &str, options: &Options) -> String {
    let mut cookie = format!("{name}={id}; Path={}", options.path);
    if let Some(domain) = &options.domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    match options.max_age {
        Some(age) if age < 0 => cookie.push_str("; Max-Age=0"),
        Some(age) => cookie.push_str(&format!("; Max-Age={age}")),
        None => {}
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie
}

/// The value of cookie `name` in the request, if any.
fn cookie(c: &Context, name: &str) -> Option<String> {
    c.request()
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.trim_matches('"').to_owned())
        })
}

/// Attaches the session named `name` to every request.
pub fn sessions<S: Store>(name: &str, store: S) -> impl Fn(&mut Context) + Send + Sync + 'static {
    let name = name.to_owned();
    let store: Arc<dyn Store> = Arc::new(store);
    move |c: &mut Context| {
        let session = Session::new(&name, Arc::clone(&store), cookie(c, &name));
        c.set(DEFAULT_KEY, session);
        c.next();
    }
}

/// Attaches one session per name, as a [`SessionMap`].
pub fn sessions_many<S: Store>(names: &[&str], store: S) -> impl Fn(&mut Context) + Send + Sync + 'static {
    let names: Vec<String> = names.iter().map(|&name| name.to_owned()).collect();
    let store: Arc<dyn Store> = Arc::new(store);
    move |c: &mut Context| {
        let sessions: SessionMap = names
            .iter()
            .map(|name| (name.clone(), Session::new(name, Arc::clone(&store), cookie(c, name))))
            .collect();
        c.set(DEFAULT_KEY, sessions);
        c.next();
    }
}

/// The session attached by [`sessions`].
///
/// # Panics
///
/// Panics if the middleware is not installed on this request's chain.
pub fn default_session(c: &Context) -> Arc<Session> {
    c.must_get(DEFAULT_KEY)
}

/// The sessions attached by [`sessions_many`].
///
/// # Panics
///
/// Panics if the middleware is not installed on this request's chain.
pub fn default_many(c: &Context) -> Arc<SessionMap> {
    c.must_get(DEFAULT_KEY)
}
