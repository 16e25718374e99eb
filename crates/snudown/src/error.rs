//! Error types for rendering and resolver registration.

/// Error returned by render and registration entry points.
///
/// Failures of the external user resolver are not represented here: they are
/// contained by [`ResolverBridge`](crate::ResolverBridge) and never abort a
/// render.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// Integer surface id outside the known set.
    #[error("Invalid renderer: {0}")]
    InvalidSurface(i32),

    /// Resolver registration with an unusable value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Document nesting exceeded the configured ceiling in strict mode.
    #[error("Nesting depth exceeded limit of {limit}")]
    DepthExceeded {
        /// Configured ceiling.
        limit: usize,
    },
}

/// Error reported by a [`UserResolver`](crate::UserResolver) implementation.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Backing user directory could not be reached.
    #[error("user directory unavailable: {0}")]
    Unavailable(String),

    /// Lookup ran but failed for this name.
    #[error("lookup failed for {name}: {message}")]
    Lookup {
        /// Name being resolved.
        name: String,
        /// Error detail.
        message: String,
    },
}
