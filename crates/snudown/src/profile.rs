//! Render profiles and the registry holding the four base profiles.
//!
//! Base profiles are built once and never written. A render derives its own
//! per-call copies with the `with_*` methods, so nothing one call sets can be
//! seen by another.

use std::sync::{Arc, RwLock};

use snudown_config::{DEFAULT_MAX_NESTING, LimitsConfig};

use crate::flags::{DEFAULT_OUTPUT_FLAGS, DEFAULT_PARSER_FLAGS, OutputFlags, ParserFlags};
use crate::link::LinkPolicy;
use crate::resolver::{ResolverBridge, UserResolver};
use crate::surface::{Purpose, Surface};
use crate::whitelist::WhitelistTable;

/// Immutable configuration for one engine invocation.
#[derive(Clone, Debug)]
pub struct RenderProfile {
    surface: Surface,
    purpose: Purpose,
    parser_flags: ParserFlags,
    output_flags: OutputFlags,
    whitelist: WhitelistTable,
    link_policy: LinkPolicy,
    resolver: ResolverBridge,
    toc_id_prefix: Option<String>,
    max_nesting: usize,
    strict_nesting: bool,
}

impl RenderProfile {
    /// Base profile for a surface and purpose with the default flag sets.
    #[must_use]
    pub fn base(surface: Surface, purpose: Purpose) -> Self {
        Self {
            surface,
            purpose,
            parser_flags: DEFAULT_PARSER_FLAGS,
            output_flags: DEFAULT_OUTPUT_FLAGS,
            whitelist: WhitelistTable::standard(),
            link_policy: LinkPolicy::default(),
            resolver: ResolverBridge::detached(),
            toc_id_prefix: None,
            max_nesting: DEFAULT_MAX_NESTING,
            strict_nesting: false,
        }
    }

    #[must_use]
    pub fn surface(&self) -> Surface {
        self.surface
    }

    #[must_use]
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    #[must_use]
    pub fn parser_flags(&self) -> ParserFlags {
        self.parser_flags
    }

    #[must_use]
    pub fn output_flags(&self) -> OutputFlags {
        self.output_flags
    }

    #[must_use]
    pub fn whitelist(&self) -> &WhitelistTable {
        &self.whitelist
    }

    #[must_use]
    pub fn link_policy(&self) -> &LinkPolicy {
        &self.link_policy
    }

    #[must_use]
    pub fn resolver(&self) -> &ResolverBridge {
        &self.resolver
    }

    #[must_use]
    pub fn toc_id_prefix(&self) -> Option<&str> {
        self.toc_id_prefix.as_deref()
    }

    #[must_use]
    pub fn max_nesting(&self) -> usize {
        self.max_nesting
    }

    /// Whether exceeding `max_nesting` fails the render instead of flattening.
    #[must_use]
    pub fn strict_nesting(&self) -> bool {
        self.strict_nesting
    }

    #[must_use]
    pub fn with_parser_flags(mut self, flags: ParserFlags) -> Self {
        self.parser_flags = flags;
        self
    }

    #[must_use]
    pub fn with_output_flags(mut self, flags: OutputFlags) -> Self {
        self.output_flags = flags;
        self
    }

    #[must_use]
    pub fn with_link_policy(mut self, policy: LinkPolicy) -> Self {
        self.link_policy = policy;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: ResolverBridge) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_toc_id_prefix(mut self, prefix: Option<String>) -> Self {
        self.toc_id_prefix = prefix;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, max_nesting: usize, strict: bool) -> Self {
        self.max_nesting = max_nesting;
        self.strict_nesting = strict;
        self
    }
}

/// The four base profiles, indexed by surface and purpose, plus the
/// replaceable usertext resolver.
pub struct ProfileRegistry {
    profiles: [[RenderProfile; 2]; 2],
    usertext_resolver: RwLock<Option<Arc<dyn UserResolver>>>,
}

impl ProfileRegistry {
    /// Registry with default limits and no resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(&LimitsConfig::default())
    }

    #[must_use]
    pub fn with_limits(limits: &LimitsConfig) -> Self {
        let build = |surface| {
            Purpose::ALL.map(|purpose| {
                RenderProfile::base(surface, purpose)
                    .with_limits(limits.max_nesting, limits.fail_on_depth_exceeded)
            })
        };
        Self {
            profiles: Surface::ALL.map(build),
            usertext_resolver: RwLock::new(None),
        }
    }

    /// Base profile for a surface and purpose.
    #[must_use]
    pub fn get(&self, surface: Surface, purpose: Purpose) -> &RenderProfile {
        &self.profiles[surface.index()][purpose.index()]
    }

    /// Replace the usertext resolver, returning the previous one.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn register_resolver(
        &self,
        resolver: Option<Arc<dyn UserResolver>>,
    ) -> Option<Arc<dyn UserResolver>> {
        let mut slot = self.usertext_resolver.write().unwrap();
        std::mem::replace(&mut *slot, resolver)
    }

    /// Snapshot of the resolver for `surface`. Only usertext has one.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn resolver_for(&self, surface: Surface) -> ResolverBridge {
        match surface {
            Surface::UserText => {
                ResolverBridge::new(self.usertext_resolver.read().unwrap().clone())
            }
            Surface::Wiki => ResolverBridge::detached(),
        }
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::FnResolver;

    #[test]
    fn test_registry_holds_four_profiles() {
        let registry = ProfileRegistry::new();
        for surface in Surface::ALL {
            for purpose in Purpose::ALL {
                let profile = registry.get(surface, purpose);
                assert_eq!(profile.surface(), surface);
                assert_eq!(profile.purpose(), purpose);
                assert_eq!(profile.parser_flags(), DEFAULT_PARSER_FLAGS);
                assert_eq!(profile.output_flags(), DEFAULT_OUTPUT_FLAGS);
                assert_eq!(profile.whitelist(), &WhitelistTable::standard());
                assert_eq!(profile.toc_id_prefix(), None);
                assert_eq!(profile.max_nesting(), DEFAULT_MAX_NESTING);
            }
        }
    }

    #[test]
    fn test_limits_apply_to_every_profile() {
        let registry = ProfileRegistry::with_limits(&LimitsConfig {
            max_nesting: 4,
            fail_on_depth_exceeded: true,
        });
        let profile = registry.get(Surface::Wiki, Purpose::Toc);
        assert_eq!(profile.max_nesting(), 4);
        assert!(profile.strict_nesting());
    }

    #[test]
    fn test_derivation_leaves_base_untouched() {
        let registry = ProfileRegistry::new();
        let base = registry.get(Surface::UserText, Purpose::Main);
        let derived = base
            .clone()
            .with_toc_id_prefix(Some("md-".into()))
            .with_output_flags(base.output_flags() | OutputFlags::TOC)
            .with_link_policy(LinkPolicy::new().with_nofollow(true));

        assert_eq!(derived.toc_id_prefix(), Some("md-"));
        assert!(derived.output_flags().contains(OutputFlags::TOC));
        assert!(derived.link_policy().nofollow());

        let base = registry.get(Surface::UserText, Purpose::Main);
        assert_eq!(base.toc_id_prefix(), None);
        assert!(!base.output_flags().contains(OutputFlags::TOC));
        assert_eq!(base.link_policy(), &LinkPolicy::default());
    }

    #[test]
    fn test_resolver_slot_is_usertext_only() {
        let registry = ProfileRegistry::new();
        assert!(!registry.resolver_for(Surface::UserText).is_attached());

        let previous = registry.register_resolver(Some(Arc::new(FnResolver::new())));
        assert!(previous.is_none());
        assert!(registry.resolver_for(Surface::UserText).is_attached());
        assert!(!registry.resolver_for(Surface::Wiki).is_attached());

        let previous = registry.register_resolver(None);
        assert!(previous.is_some());
        assert!(!registry.resolver_for(Surface::UserText).is_attached());
    }

    #[test]
    fn test_snapshot_survives_replacement() {
        let registry = ProfileRegistry::new();
        registry.register_resolver(Some(Arc::new(
            FnResolver::new().with_exists(|_| Ok(true)),
        )));
        let snapshot = registry.resolver_for(Surface::UserText);
        registry.register_resolver(None);
        assert!(snapshot.user_exists("alice"));
    }

    static_assertions::assert_impl_all!(super::ProfileRegistry: Send, Sync);
    static_assertions::assert_impl_all!(super::RenderProfile: Send, Sync);
}
