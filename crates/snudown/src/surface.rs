//! Content surfaces and render purposes.

use snudown_config::SurfaceSetting;

use crate::RenderError;

/// Stable integer id of [`Surface::UserText`].
pub const RENDERER_USERTEXT: i32 = 0;

/// Stable integer id of [`Surface::Wiki`].
pub const RENDERER_WIKI: i32 = 1;

/// Content context selecting a render configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Surface {
    /// Free-form user text (comments, posts). Mentions are resolved here.
    #[default]
    UserText,
    /// Curated wiki pages.
    Wiki,
}

impl Surface {
    /// All surfaces, in id order.
    pub const ALL: [Self; 2] = [Self::UserText, Self::Wiki];

    /// Stable integer id.
    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::UserText => RENDERER_USERTEXT,
            Self::Wiki => RENDERER_WIKI,
        }
    }

    /// Look up a surface by its integer id.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidSurface`] for ids outside the known set.
    pub fn from_id(id: i32) -> Result<Self, RenderError> {
        match id {
            RENDERER_USERTEXT => Ok(Self::UserText),
            RENDERER_WIKI => Ok(Self::Wiki),
            other => Err(RenderError::InvalidSurface(other)),
        }
    }

    /// Lowercase name used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserText => "usertext",
            Self::Wiki => "wiki",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::UserText => 0,
            Self::Wiki => 1,
        }
    }
}

impl TryFrom<i32> for Surface {
    type Error = RenderError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        Self::from_id(id)
    }
}

impl From<SurfaceSetting> for Surface {
    fn from(setting: SurfaceSetting) -> Self {
        match setting {
            SurfaceSetting::Usertext => Self::UserText,
            SurfaceSetting::Wiki => Self::Wiki,
        }
    }
}

/// What a single engine invocation produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Full document.
    Main,
    /// Table-of-contents fragment only.
    Toc,
}

impl Purpose {
    /// Both purposes.
    pub const ALL: [Self; 2] = [Self::Main, Self::Toc];

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Main => 0,
            Self::Toc => 1,
        }
    }
}
