//! Session environment: user, locale, line ending and named values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::TermhubError;

/// Name of the entry holding the owning principal.
pub const USER: &str = "user";
/// Name of the entry holding the locale tag.
pub const LOCALE: &str = "locale";
/// Name of the entry holding the line ending.
pub const LINE_ENDING: &str = "lineEnding";
/// Name of the entry a session records its own id under.
pub const TERMINAL_ID: &str = "terminal";

/// The identity owning a session, an email address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Principal(String);

impl Principal {
    /// Parse an email address.
    pub fn parse(text: &str) -> crate::Result<Self> {
        match text.split_once('@') {
            Some((local, domain))
                if !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !text.contains(char::is_whitespace) =>
            {
                Ok(Self(text.to_string()))
            }
            _ => Err(TermhubError::InvalidFormat(format!(
                "invalid email address {text:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Principal {
    type Err = TermhubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Line terminator written by `println`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }

    /// The escaped form, e.g. `\r\n`, used when printing the environment.
    pub fn escaped(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\\n",
            LineEnding::CrLf => "\\r\\n",
            LineEnding::Cr => "\\r",
        }
    }
}

impl FromStr for LineEnding {
    type Err = TermhubError;

    /// Accepts `lf`, `crlf`, `cr` (any case) or the literal terminator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lf" | "\n" | "\\n" => Ok(LineEnding::Lf),
            "crlf" | "\r\n" | "\\r\\n" => Ok(LineEnding::CrLf),
            "cr" | "\r" | "\\r" => Ok(LineEnding::Cr),
            _ => Err(TermhubError::InvalidFormat(format!(
                "invalid line ending {s:?}"
            ))),
        }
    }
}

/// A single change, delivered to [`Environment::watch`] listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentChange {
    /// Entry name.
    pub name: String,
    /// New value, `None` when removed.
    pub value: Option<String>,
}

type Listener = Arc<dyn Fn(&EnvironmentChange) + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct EnvironmentState {
    user: Option<Principal>,
    locale: String,
    line_ending: LineEnding,
    values: BTreeMap<String, String>,
}

/// Keyed property bag shared by a session and whoever created it.
///
/// Cloning shares the underlying values; use [`Environment::clone_environment`]
/// for an independent copy.
#[derive(Clone)]
pub struct Environment {
    state: Arc<RwLock<EnvironmentState>>,
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl Environment {
    /// An environment with no user, locale `en` and `\n` line endings.
    pub fn new() -> Self {
        Self::from_state(EnvironmentState {
            locale: "en".to_string(),
            ..Default::default()
        })
    }

    fn from_state(state: EnvironmentState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Builder-style user assignment.
    pub fn with_user(self, user: Option<Principal>) -> Self {
        self.set_user(user);
        self
    }

    /// Deep copy without listeners.
    pub fn clone_environment(&self) -> Self {
        let state = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self::from_state(state)
    }

    /// Whether both handles share the same underlying values.
    pub fn same_as(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Register a listener called after every change.
    ///
    /// Listeners run without any environment lock held, so they may change
    /// this environment themselves.
    pub fn watch<F>(&self, listener: F)
    where
        F: Fn(&EnvironmentChange) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    pub fn user(&self) -> Option<Principal> {
        self.read(|s| s.user.clone())
    }

    pub fn set_user(&self, user: Option<Principal>) {
        let value = user.as_ref().map(Principal::to_string);
        self.write(|s| s.user = user);
        self.notify(USER, value);
    }

    pub fn locale(&self) -> String {
        self.read(|s| s.locale.clone())
    }

    pub fn set_locale(&self, locale: impl Into<String>) {
        let locale = locale.into();
        self.write(|s| s.locale = locale.clone());
        self.notify(LOCALE, Some(locale));
    }

    pub fn line_ending(&self) -> LineEnding {
        self.read(|s| s.line_ending)
    }

    pub fn set_line_ending(&self, line_ending: LineEnding) {
        self.write(|s| s.line_ending = line_ending);
        self.notify(LINE_ENDING, Some(line_ending.escaped().to_string()));
    }

    /// Get any entry as text, including the typed ones.
    pub fn get(&self, name: &str) -> Option<String> {
        self.read(|s| match name {
            USER => s.user.as_ref().map(Principal::to_string),
            LOCALE => Some(s.locale.clone()),
            LINE_ENDING => Some(s.line_ending.escaped().to_string()),
            _ => s.values.get(name).cloned(),
        })
    }

    /// Set an entry. The typed entries are parsed and may fail.
    pub fn set(&self, name: &str, value: impl Into<String>) -> crate::Result<()> {
        let value = value.into();
        match name {
            USER => self.set_user(Some(value.parse()?)),
            LOCALE => self.set_locale(value),
            LINE_ENDING => self.set_line_ending(value.parse()?),
            _ => {
                self.write(|s| {
                    s.values.insert(name.to_string(), value.clone());
                });
                self.notify(name, Some(value));
            }
        }
        Ok(())
    }

    /// Remove an entry. Removing `user` clears the owner; locale and line
    /// ending cannot be removed.
    pub fn remove(&self, name: &str) -> crate::Result<()> {
        match name {
            USER => self.set_user(None),
            LOCALE | LINE_ENDING => {
                return Err(TermhubError::InvalidArgument(format!(
                    "environment value {name} cannot be removed"
                )))
            }
            _ => {
                let removed = self.write(|s| s.values.remove(name));
                if removed.is_some() {
                    self.notify(name, None);
                }
            }
        }
        Ok(())
    }

    /// All entry names with a value, sorted.
    pub fn names(&self) -> Vec<String> {
        self.read(|s| {
            let mut names: Vec<String> = s.values.keys().cloned().collect();
            names.push(LINE_ENDING.to_string());
            names.push(LOCALE.to_string());
            if s.user.is_some() {
                names.push(USER.to_string());
            }
            names.sort();
            names
        })
    }

    fn read<T>(&self, f: impl FnOnce(&EnvironmentState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut EnvironmentState) -> T) -> T {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner))
    }

    fn notify(&self, name: &str, value: Option<String>) {
        let change = EnvironmentChange {
            name: name.to_string(),
            value,
        };
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener(&change);
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Environment")
            .field("user", &state.user)
            .field("locale", &state.locale)
            .field("line_ending", &state.line_ending)
            .field("values", &state.values)
            .finish()
    }
}
