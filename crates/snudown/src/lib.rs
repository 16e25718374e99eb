//! Surface-aware Markdown rendering.
//!
//! Renders user-authored Markdown into sanitized XHTML for two content
//! surfaces, usertext and wiki, with an optional table of contents.
//!
//! # Architecture
//!
//! - [`ProfileRegistry`] holds one immutable [`RenderProfile`] per surface and
//!   purpose (main document or TOC). A render derives per-call copies with the
//!   request's link decoration and TOC prefix; base profiles are never written.
//! - [`Renderer`] drives the engine once, or twice when a TOC is requested,
//!   and returns both fragments in [`Rendered`].
//! - [`UserResolver`] lets an external user directory decide how `@name`
//!   mentions render. Lookups go through [`ResolverBridge`], which contains
//!   resolver failures.
//! - Raw HTML is escaped unless the element and all its attributes are on the
//!   [`WhitelistTable`].
//!
//! # Example
//!
//! ```
//! use snudown::{RenderRequest, Renderer};
//!
//! let renderer = Renderer::new();
//! let request = RenderRequest::new("# Hello\n\n[docs](http://example.com)")
//!     .with_nofollow(true)
//!     .with_toc(true);
//! let rendered = renderer.render(&request).unwrap();
//!
//! assert!(rendered.html.contains(r#"<h1 id="toc_0">Hello</h1>"#));
//! assert!(rendered.html.contains(r#"rel="nofollow""#));
//! assert!(rendered.toc.unwrap().contains(r##"href="#toc_0""##));
//! ```

mod error;
mod flags;
mod html;
mod inline;
mod link;
mod pipeline;
mod profile;
mod resolver;
mod state;
mod surface;
mod toc;
mod whitelist;

pub use error::{RenderError, ResolverError};
pub use flags::{DEFAULT_OUTPUT_FLAGS, DEFAULT_PARSER_FLAGS, OutputFlags, ParserFlags};
pub use inline::MAX_MENTION_LEN;
pub use link::{LinkPolicy, is_safe_link};
pub use pipeline::{
    MarkdownOptions, RenderRequest, Rendered, Renderer, default_renderer, markdown,
    set_username_callbacks,
};
pub use profile::{ProfileRegistry, RenderProfile};
pub use resolver::{
    DisplayNameFn, ExistsFn, FnResolver, ResolverBridge, StaticResolver, UserResolver,
};
pub use surface::{Purpose, RENDERER_USERTEXT, RENDERER_WIKI, Surface};
pub use whitelist::{ATTRIBUTE_WHITELIST, ELEMENT_WHITELIST, WhitelistTable};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
