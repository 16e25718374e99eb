//! User resolution for `@name` mentions.
//!
//! An external identity system plugs in through [`UserResolver`]. The
//! renderer never calls it directly: every lookup goes through
//! [`ResolverBridge`], which contains failures so a broken directory can
//! never abort a render.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::RenderError;
use crate::error::ResolverError;
use crate::inline::is_mention_name;

/// Boxed existence check, as accepted by [`FnResolver::with_exists`].
pub type ExistsFn = Box<dyn Fn(&str) -> Result<bool, ResolverError> + Send + Sync>;

/// Boxed display-name lookup, as accepted by [`FnResolver::with_display_name`].
pub type DisplayNameFn = Box<dyn Fn(&str) -> Result<String, ResolverError> + Send + Sync>;

/// External user directory consulted while rendering mentions.
///
/// Implementations are called synchronously, once per mention per pass, and
/// must be safe to call from several render threads at once.
pub trait UserResolver: Send + Sync {
    /// Whether `name` is a known user.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot answer. The mention is
    /// then rendered as unknown.
    fn exists(&self, name: &str) -> Result<bool, ResolverError>;

    /// Name to display for a known user.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot answer. The mention then
    /// keeps the name as written.
    fn display_name(&self, name: &str) -> Result<String, ResolverError>;
}

/// Resolver assembled from two optional closures.
///
/// A missing existence check reports every user as unknown; a missing
/// display-name lookup shows names as written.
#[derive(Default)]
pub struct FnResolver {
    exists: Option<ExistsFn>,
    display_name: Option<DisplayNameFn>,
}

impl FnResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the existence check.
    #[must_use]
    pub fn with_exists<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<bool, ResolverError> + Send + Sync + 'static,
    {
        self.exists = Some(Box::new(f));
        self
    }

    /// Set the display-name lookup.
    #[must_use]
    pub fn with_display_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<String, ResolverError> + Send + Sync + 'static,
    {
        self.display_name = Some(Box::new(f));
        self
    }

    pub(crate) fn from_parts(exists: Option<ExistsFn>, display_name: Option<DisplayNameFn>) -> Self {
        Self {
            exists,
            display_name,
        }
    }
}

impl UserResolver for FnResolver {
    fn exists(&self, name: &str) -> Result<bool, ResolverError> {
        self.exists.as_ref().map_or(Ok(false), |f| f(name))
    }

    fn display_name(&self, name: &str) -> Result<String, ResolverError> {
        self.display_name
            .as_ref()
            .map_or_else(|| Ok(name.to_owned()), |f| f(name))
    }
}

impl fmt::Debug for FnResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver")
            .field("exists", &self.exists.is_some())
            .field("display_name", &self.display_name.is_some())
            .finish()
    }
}

/// Fixed user directory keyed by case-insensitive username.
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
    users: HashMap<String, String>,
}

impl StaticResolver {
    /// Build a directory from `(username, display name)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidArgument`] if a username is not a valid
    /// mention name or a display name is empty.
    pub fn new<I, K, V>(entries: I) -> Result<Self, RenderError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut users = HashMap::new();
        for (name, display) in entries {
            let name = name.as_ref();
            if !is_mention_name(name) {
                return Err(RenderError::InvalidArgument(format!(
                    "invalid username {name:?}"
                )));
            }
            let display = display.into();
            if display.is_empty() {
                return Err(RenderError::InvalidArgument(format!(
                    "empty display name for {name:?}"
                )));
            }
            users.insert(name.to_ascii_lowercase(), display);
        }
        Ok(Self { users })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserResolver for StaticResolver {
    fn exists(&self, name: &str) -> Result<bool, ResolverError> {
        Ok(self.users.contains_key(&name.to_ascii_lowercase()))
    }

    fn display_name(&self, name: &str) -> Result<String, ResolverError> {
        self.users
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ResolverError::Lookup {
                name: name.to_owned(),
                message: "not in directory".to_owned(),
            })
    }
}

/// Failure-containing view over an optional [`UserResolver`].
///
/// Existence checks fail closed and display-name lookups fail open. Errors
/// and panics raised by the resolver are logged and absorbed.
#[derive(Clone, Default)]
pub struct ResolverBridge {
    resolver: Option<Arc<dyn UserResolver>>,
}

impl ResolverBridge {
    #[must_use]
    pub fn new(resolver: Option<Arc<dyn UserResolver>>) -> Self {
        Self { resolver }
    }

    /// Bridge with no resolver: every mention is unknown.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.resolver.is_some()
    }

    /// Whether `name` is a known user. `false` on any resolver failure.
    #[must_use]
    pub fn user_exists(&self, name: &str) -> bool {
        let Some(resolver) = &self.resolver else {
            return false;
        };
        match catch_unwind(AssertUnwindSafe(|| resolver.exists(name))) {
            Ok(Ok(exists)) => exists,
            Ok(Err(e)) => {
                tracing::warn!(user = name, error = %e, "User lookup failed, treating as unknown");
                false
            }
            Err(_) => {
                tracing::warn!(user = name, "User lookup panicked, treating as unknown");
                false
            }
        }
    }

    /// Display name for `name`. `name` itself on any resolver failure.
    #[must_use]
    pub fn display_name_for(&self, name: &str) -> String {
        let Some(resolver) = &self.resolver else {
            return name.to_owned();
        };
        match catch_unwind(AssertUnwindSafe(|| resolver.display_name(name))) {
            Ok(Ok(display)) => display,
            Ok(Err(e)) => {
                tracing::warn!(user = name, error = %e, "Display name lookup failed, keeping name");
                name.to_owned()
            }
            Err(_) => {
                tracing::warn!(user = name, "Display name lookup panicked, keeping name");
                name.to_owned()
            }
        }
    }
}

impl fmt::Debug for ResolverBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverBridge")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge(resolver: impl UserResolver + 'static) -> ResolverBridge {
        ResolverBridge::new(Some(Arc::new(resolver)))
    }

    #[test]
    fn test_detached_bridge() {
        let bridge = ResolverBridge::detached();
        assert!(!bridge.is_attached());
        assert!(!bridge.user_exists("alice"));
        assert_eq!(bridge.display_name_for("alice"), "alice");
    }

    #[test]
    fn test_fn_resolver_defaults() {
        let bridge = bridge(FnResolver::new());
        assert!(!bridge.user_exists("alice"));
        assert_eq!(bridge.display_name_for("alice"), "alice");
    }

    #[test]
    fn test_fn_resolver_calls_closures() {
        let bridge = bridge(
            FnResolver::new()
                .with_exists(|name| Ok(name == "alice"))
                .with_display_name(|name| Ok(name.to_uppercase())),
        );
        assert!(bridge.user_exists("alice"));
        assert!(!bridge.user_exists("bob"));
        assert_eq!(bridge.display_name_for("alice"), "ALICE");
    }

    #[test]
    fn test_exists_error_fails_closed() {
        let bridge = bridge(
            FnResolver::new()
                .with_exists(|_| Err(ResolverError::Unavailable("down".into()))),
        );
        assert!(!bridge.user_exists("alice"));
    }

    #[test]
    fn test_exists_panic_fails_closed() {
        let bridge = bridge(FnResolver::new().with_exists(|_| panic!("directory exploded")));
        assert!(!bridge.user_exists("alice"));
    }

    #[test]
    fn test_display_name_error_fails_open() {
        let bridge = bridge(FnResolver::new().with_display_name(|name| {
            Err(ResolverError::Lookup {
                name: name.to_owned(),
                message: "timeout".into(),
            })
        }));
        assert_eq!(bridge.display_name_for("alice"), "alice");
    }

    #[test]
    fn test_display_name_panic_fails_open() {
        let bridge = bridge(FnResolver::new().with_display_name(|_| panic!("boom")));
        assert_eq!(bridge.display_name_for("alice"), "alice");
    }

    #[test]
    fn test_static_resolver_lookup_is_case_insensitive() {
        let resolver = StaticResolver::new([("Alice", "Alice Liddell")]).unwrap();
        assert_eq!(resolver.len(), 1);
        assert!(resolver.exists("alice").unwrap());
        assert!(resolver.exists("ALICE").unwrap());
        assert!(!resolver.exists("bob").unwrap());
        assert_eq!(resolver.display_name("alice").unwrap(), "Alice Liddell");
        assert!(resolver.display_name("bob").is_err());
    }

    #[test]
    fn test_static_resolver_rejects_bad_names() {
        for name in ["", "has space", "@alice"] {
            let err = StaticResolver::new([(name, "Someone")]).unwrap_err();
            assert!(matches!(err, RenderError::InvalidArgument(_)), "{name:?}");
        }
    }

    #[test]
    fn test_static_resolver_rejects_empty_display_name() {
        let err = StaticResolver::new([("alice", "")]).unwrap_err();
        assert!(matches!(err, RenderError::InvalidArgument(_)));
    }

    #[test]
    fn test_debug_hides_closures() {
        let resolver = FnResolver::new().with_exists(|_| Ok(true));
        assert_eq!(
            format!("{resolver:?}"),
            "FnResolver { exists: true, display_name: false }"
        );
        assert_eq!(
            format!("{:?}", bridge(resolver)),
            "ResolverBridge { attached: true }"
        );
    }
}
