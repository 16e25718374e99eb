//! Dual-pass render pipeline.
//!
//! A render resolves the base profiles for its surface, derives per-call
//! copies carrying the request's link policy and TOC prefix, then runs the
//! TOC pass (when requested) followed by the main pass. Nothing a call sets
//! is written back into the registry.

use std::borrow::Cow;
use std::sync::{Arc, LazyLock};

use snudown_config::{Config, LimitsConfig, RenderDefaults};

use crate::RenderError;
use crate::flags::OutputFlags;
use crate::html::HtmlEmitter;
use crate::link::LinkPolicy;
use crate::profile::ProfileRegistry;
use crate::resolver::{DisplayNameFn, ExistsFn, FnResolver, StaticResolver, UserResolver};
use crate::surface::{Purpose, RENDERER_USERTEXT, Surface};
use crate::toc::TocEmitter;

/// Process-wide renderer behind [`markdown`] and [`set_username_callbacks`].
static DEFAULT_RENDERER: LazyLock<Renderer> = LazyLock::new(Renderer::new);

/// A single render call: the document plus per-call options.
#[derive(Clone, Debug)]
pub struct RenderRequest<'a> {
    document: Cow<'a, str>,
    surface: Surface,
    nofollow: bool,
    target: Option<String>,
    domain: Option<String>,
    toc_id_prefix: Option<String>,
    enable_toc: bool,
}

impl<'a> RenderRequest<'a> {
    /// Request for `document` on the usertext surface with no decoration.
    #[must_use]
    pub fn new(document: impl Into<Cow<'a, str>>) -> Self {
        Self {
            document: document.into(),
            surface: Surface::default(),
            nofollow: false,
            target: None,
            domain: None,
            toc_id_prefix: None,
            enable_toc: false,
        }
    }

    /// Request for a raw byte document. Invalid UTF-8 is replaced with
    /// U+FFFD.
    #[must_use]
    pub fn from_bytes(document: &'a [u8]) -> Self {
        Self::new(String::from_utf8_lossy(document))
    }

    /// Apply configured defaults. Later `with_*` calls still override them.
    #[must_use]
    pub fn with_defaults(mut self, defaults: &RenderDefaults) -> Self {
        self.surface = defaults.surface.into();
        self.nofollow = defaults.nofollow;
        self.target.clone_from(&defaults.target);
        self.domain.clone_from(&defaults.domain);
        self.toc_id_prefix.clone_from(&defaults.toc_id_prefix);
        self.enable_toc = defaults.enable_toc;
        self
    }

    #[must_use]
    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }

    #[must_use]
    pub fn with_nofollow(mut self, nofollow: bool) -> Self {
        self.nofollow = nofollow;
        self
    }

    /// Set the `target` attribute emitted on links.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the domain whose links never get a `_blank` target.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_toc_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.toc_id_prefix = Some(prefix.into());
        self
    }

    /// Produce a table of contents and give headings matching ids.
    #[must_use]
    pub fn with_toc(mut self, enable: bool) -> Self {
        self.enable_toc = enable;
        self
    }

    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    #[must_use]
    pub fn surface(&self) -> Surface {
        self.surface
    }

    #[must_use]
    pub fn toc_enabled(&self) -> bool {
        self.enable_toc
    }

    fn link_policy(&self) -> LinkPolicy {
        LinkPolicy::new()
            .with_nofollow(self.nofollow)
            .with_target(self.target.clone())
            .with_exempt_domain(self.domain.clone())
    }
}

/// Result of a render call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Main document HTML.
    pub html: String,
    /// TOC fragment, present when the request enabled it.
    pub toc: Option<String>,
    /// Degradations applied while rendering (e.g. flattened nesting).
    pub warnings: Vec<String>,
}

impl Rendered {
    /// TOC fragment followed by the main HTML, as one string.
    #[must_use]
    pub fn into_combined(self) -> String {
        match self.toc {
            Some(mut toc) => {
                toc.push_str(&self.html);
                toc
            }
            None => self.html,
        }
    }
}

/// Options of the legacy single-string entry point [`markdown`].
///
/// `renderer` is the integer surface id ([`RENDERER_USERTEXT`] or
/// [`RENDERER_WIKI`](crate::RENDERER_WIKI)).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkdownOptions {
    pub nofollow: bool,
    pub target: Option<String>,
    pub domain: Option<String>,
    pub toc_id_prefix: Option<String>,
    pub renderer: i32,
    pub enable_toc: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            nofollow: false,
            target: None,
            domain: None,
            toc_id_prefix: None,
            renderer: RENDERER_USERTEXT,
            enable_toc: false,
        }
    }
}

/// Markdown renderer over a [`ProfileRegistry`].
///
/// Renders are independent: concurrent calls share only the immutable base
/// profiles and a snapshot of the resolver slot.
pub struct Renderer {
    registry: ProfileRegistry,
}

impl Renderer {
    /// Renderer with default limits and no resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ProfileRegistry::new(),
        }
    }

    #[must_use]
    pub fn with_limits(limits: &LimitsConfig) -> Self {
        Self {
            registry: ProfileRegistry::with_limits(limits),
        }
    }

    /// Renderer configured from `snudown.toml`.
    ///
    /// The `[users]` table, when present, becomes the usertext resolver.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidArgument`] if the user table holds an
    /// invalid username or an empty display name.
    pub fn from_config(config: &Config) -> Result<Self, RenderError> {
        let renderer = Self::with_limits(&config.limits);
        if !config.users.is_empty() {
            let directory = StaticResolver::new(&config.users)?;
            tracing::debug!(users = directory.len(), "Registering static user directory");
            renderer.register_resolver(Some(Arc::new(directory)));
        }
        Ok(renderer)
    }

    #[must_use]
    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Replace the usertext resolver, returning the previous one. `None`
    /// clears it.
    ///
    /// Renders already in progress keep the resolver they started with.
    pub fn register_resolver(
        &self,
        resolver: Option<Arc<dyn UserResolver>>,
    ) -> Option<Arc<dyn UserResolver>> {
        self.registry.register_resolver(resolver)
    }

    /// Render a request.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DepthExceeded`] if the document nests past the
    /// configured ceiling and the renderer is strict about it.
    pub fn render(&self, request: &RenderRequest<'_>) -> Result<Rendered, RenderError> {
        let surface = request.surface;
        let document = request.document();
        tracing::debug!(
            surface = surface.as_str(),
            toc = request.enable_toc,
            bytes = document.len(),
            "Rendering document"
        );

        let resolver = self.registry.resolver_for(surface);
        let main_base = self.registry.get(surface, Purpose::Main);
        let mut main_flags = main_base.output_flags();

        let toc = if request.enable_toc {
            let profile = self
                .registry
                .get(surface, Purpose::Toc)
                .clone()
                .with_toc_id_prefix(request.toc_id_prefix.clone());
            main_flags |= OutputFlags::TOC;
            Some(TocEmitter::new(&profile).render(document))
        } else {
            None
        };

        let main = main_base
            .clone()
            .with_output_flags(main_flags)
            .with_toc_id_prefix(request.toc_id_prefix.clone())
            .with_link_policy(request.link_policy())
            .with_resolver(resolver);
        let emitted = HtmlEmitter::new(&main).render(document)?;

        Ok(Rendered {
            html: emitted.html,
            toc,
            warnings: emitted.warnings,
        })
    }

    /// Render with integer-surface options, returning the TOC fragment (if
    /// any) followed by the document.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidSurface`] if `options.renderer` is not a
    /// known surface id, or any error of [`render`](Self::render).
    pub fn markdown(&self, text: &str, options: &MarkdownOptions) -> Result<String, RenderError> {
        let surface = Surface::from_id(options.renderer)?;
        let request = RenderRequest {
            document: Cow::Borrowed(text),
            surface,
            nofollow: options.nofollow,
            target: options.target.clone(),
            domain: options.domain.clone(),
            toc_id_prefix: options.toc_id_prefix.clone(),
            enable_toc: options.enable_toc,
        };
        Ok(self.render(&request)?.into_combined())
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide renderer.
#[must_use]
pub fn default_renderer() -> &'static Renderer {
    &DEFAULT_RENDERER
}

/// Render `text` with the process-wide renderer.
///
/// # Errors
///
/// Returns [`RenderError::InvalidSurface`] if `options.renderer` is not a
/// known surface id.
pub fn markdown(text: &str, options: &MarkdownOptions) -> Result<String, RenderError> {
    DEFAULT_RENDERER.markdown(text, options)
}

/// Install user lookup callbacks on the process-wide renderer's usertext
/// surface, replacing any earlier ones.
///
/// Passing `None` for both callbacks clears the resolver. Either way the
/// registration succeeds and `true` is returned.
pub fn set_username_callbacks(
    exists: Option<ExistsFn>,
    display_name: Option<DisplayNameFn>,
) -> bool {
    let resolver: Option<Arc<dyn UserResolver>> = if exists.is_none() && display_name.is_none() {
        None
    } else {
        Some(Arc::new(FnResolver::from_parts(exists, display_name)))
    };
    let previous = DEFAULT_RENDERER.register_resolver(resolver);
    tracing::debug!(
        replaced = previous.is_some(),
        "Registered username callbacks"
    );
    true
}
