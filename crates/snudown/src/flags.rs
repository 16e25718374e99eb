//! Parser and output flag sets carried by render profiles.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use pulldown_cmark::Options;

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$flag_meta:meta])* $flag:ident = $bit:expr; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            $( $(#[$flag_meta])* pub const $flag: Self = Self(1 << $bit); )+

            const NAMES: &'static [(Self, &'static str)] = &[$((Self::$flag, stringify!($flag))),+];

            /// Set with no flags.
            #[must_use]
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Whether every flag in `other` is set.
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Flags set in either operand.
            #[must_use]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Flags of `self` not set in `other`.
            #[must_use]
            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                *self = self.union(rhs);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut set = f.debug_set();
                for (flag, name) in Self::NAMES {
                    if self.contains(*flag) {
                        set.entry(&format_args!("{name}"));
                    }
                }
                set.finish()
            }
        }
    };
}

flag_set! {
    /// Markdown extensions enabled for a profile.
    ParserFlags {
        /// Underscores between word characters never form emphasis.
        NO_INTRA_EMPHASIS = 0;
        /// GFM tables.
        TABLES = 1;
        /// Bare `http://`, `https://`, `ftp://` and `www.` URLs become links.
        AUTOLINK = 2;
        /// `~~text~~` strikethrough.
        STRIKETHROUGH = 3;
        /// `^word` and `^(group)` superscript.
        SUPERSCRIPT = 4;
    }
}

flag_set! {
    /// HTML emission switches for a profile.
    OutputFlags {
        /// Do not pass raw HTML through.
        SKIP_HTML = 0;
        /// Drop links whose scheme is not on the safe list.
        SAFELINK = 1;
        /// Escape suppressed raw HTML instead of dropping it.
        ESCAPE = 2;
        /// Self-close void elements.
        USE_XHTML = 3;
        /// Turn soft line breaks into `<br>`.
        HARD_WRAP = 4;
        /// Let whitelisted elements through even with `SKIP_HTML`.
        ALLOW_ELEMENT_WHITELIST = 5;
        /// Give headings ids that the TOC fragment links to.
        TOC = 6;
    }
}

/// Extensions shared by both surfaces.
pub const DEFAULT_PARSER_FLAGS: ParserFlags = ParserFlags::NO_INTRA_EMPHASIS
    .union(ParserFlags::SUPERSCRIPT)
    .union(ParserFlags::AUTOLINK)
    .union(ParserFlags::STRIKETHROUGH)
    .union(ParserFlags::TABLES);

/// Output switches shared by both surfaces.
pub const DEFAULT_OUTPUT_FLAGS: OutputFlags = OutputFlags::SKIP_HTML
    .union(OutputFlags::SAFELINK)
    .union(OutputFlags::ESCAPE)
    .union(OutputFlags::USE_XHTML)
    .union(OutputFlags::HARD_WRAP)
    .union(OutputFlags::ALLOW_ELEMENT_WHITELIST);

impl ParserFlags {
    /// Parser options for the engine.
    ///
    /// `AUTOLINK` and `SUPERSCRIPT` are applied during emission and
    /// `NO_INTRA_EMPHASIS` is the engine's native underscore rule, so none of
    /// them maps to an option.
    #[must_use]
    pub fn engine_options(self) -> Options {
        let mut options = Options::empty();
        if self.contains(Self::TABLES) {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.contains(Self::STRIKETHROUGH) {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        options
    }
}
