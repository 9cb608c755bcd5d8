//! Primitive predicates a matcher rule is composed of.

use std::fmt;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use strum::Display;
use thiserror::Error;

use super::event::Event;

/// Prefix a message must start with to be read as a command.
pub const COMMAND_START: &str = "/";
/// Joins the tokens of a multi-part command, as in `/admin.ban`.
pub const COMMAND_SEPARATOR: &str = ".";

/// Discriminant of a [`Checker`], also used on the wire as `match_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CheckerKind {
    Startswith,
    Endswith,
    Fullmatch,
    Keywords,
    Command,
    Regex,
    ToMe,
    Custom,
}

impl CheckerKind {
    /// Whether the kind is one of the six mutually exclusive text checkers.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        !matches!(self, Self::ToMe | Self::Custom)
    }
}

/// A single predicate over an [`Event`].
#[derive(Debug, Clone)]
pub enum Checker {
    /// Text starts with any pattern.
    Startswith(TextMatch),
    /// Text ends with any pattern.
    Endswith(TextMatch),
    /// Text equals any pattern.
    Fullmatch(TextMatch),
    /// Text contains any keyword.
    Keywords(Vec<String>),
    /// Text invokes one of the commands.
    Command(CommandMatch),
    /// Text contains a match for the expression.
    Regex(RegexMatch),
    /// Event addressed the bot.
    ToMe,
    /// Opaque host predicate with no structured form.
    Custom(CustomCheck),
}

impl Checker {
    /// Builds a `startswith` checker.
    pub fn startswith<I, S>(patterns: I, ignore_case: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Startswith(TextMatch::new(patterns, ignore_case))
    }

    /// Builds an `endswith` checker.
    pub fn endswith<I, S>(patterns: I, ignore_case: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Endswith(TextMatch::new(patterns, ignore_case))
    }

    /// Builds a `fullmatch` checker.
    pub fn fullmatch<I, S>(patterns: I, ignore_case: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fullmatch(TextMatch::new(patterns, ignore_case))
    }

    /// Builds a `keywords` checker.
    pub fn keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keywords(keywords.into_iter().map(Into::into).collect())
    }

    /// Builds a `command` checker from token sequences.
    pub fn command(commands: Vec<Vec<String>>, force_whitespace: bool) -> Self {
        Self::Command(CommandMatch {
            commands,
            force_whitespace,
        })
    }

    /// Compiles a `regex` checker.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError`] when the pattern does not compile or `flags`
    /// carries bits outside [`RegexMatch::SUPPORTED_FLAGS`].
    pub fn regex(pattern: impl Into<String>, flags: u32) -> Result<Self, CheckerError> {
        RegexMatch::new(pattern, flags).map(Self::Regex)
    }

    /// Wraps an opaque host predicate.
    pub fn custom<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self::Custom(CustomCheck {
            name: name.into(),
            predicate: Arc::new(predicate),
        })
    }

    /// Returns the discriminant.
    #[must_use]
    pub const fn kind(&self) -> CheckerKind {
        match self {
            Self::Startswith(_) => CheckerKind::Startswith,
            Self::Endswith(_) => CheckerKind::Endswith,
            Self::Fullmatch(_) => CheckerKind::Fullmatch,
            Self::Keywords(_) => CheckerKind::Keywords,
            Self::Command(_) => CheckerKind::Command,
            Self::Regex(_) => CheckerKind::Regex,
            Self::ToMe => CheckerKind::ToMe,
            Self::Custom(_) => CheckerKind::Custom,
        }
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn check(&self, event: &Event) -> bool {
        if self.kind().is_primitive() && !event.is_message() {
            return false;
        }
        match self {
            Self::ToMe => event.to_me,
            Self::Custom(custom) => (custom.predicate)(event),
            Self::Startswith(text) => text.any(&event.plaintext, |haystack, needle| {
                haystack.starts_with(needle)
            }),
            Self::Endswith(text) => {
                text.any(&event.plaintext, |haystack, needle| haystack.ends_with(needle))
            }
            Self::Fullmatch(text) => text.any(&event.plaintext, |haystack, needle| haystack == needle),
            Self::Keywords(keywords) => keywords
                .iter()
                .any(|keyword| event.plaintext.contains(keyword.as_str())),
            Self::Command(command) => command.matches(&event.plaintext),
            Self::Regex(regex) => regex.regex.is_match(&event.plaintext),
        }
    }
}

/// Patterns shared by the `startswith`, `endswith` and `fullmatch` checkers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    /// Candidate patterns; any one matching is enough.
    pub patterns: Vec<String>,
    /// Compare case-insensitively.
    pub ignore_case: bool,
}

impl TextMatch {
    fn new<I, S>(patterns: I, ignore_case: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            ignore_case,
        }
    }

    fn any(&self, text: &str, test: impl Fn(&str, &str) -> bool) -> bool {
        if text.is_empty() {
            return false;
        }
        if self.ignore_case {
            let folded = text.to_lowercase();
            self.patterns
                .iter()
                .any(|pattern| test(&folded, &pattern.to_lowercase()))
        } else {
            self.patterns.iter().any(|pattern| test(text, pattern))
        }
    }
}

/// Token sequences recognised by a `command` checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatch {
    /// Each entry is one command, split on [`COMMAND_SEPARATOR`].
    pub commands: Vec<Vec<String>>,
    /// Require whitespace between the command and its argument.
    pub force_whitespace: bool,
}

impl CommandMatch {
    fn matches(&self, text: &str) -> bool {
        let Some(body) = text.strip_prefix(COMMAND_START) else {
            return false;
        };
        self.commands.iter().any(|tokens| {
            let name = tokens.join(COMMAND_SEPARATOR);
            body.strip_prefix(name.as_str()).is_some_and(|rest| {
                rest.is_empty() || !self.force_whitespace || rest.starts_with(char::is_whitespace)
            })
        })
    }
}

/// Compiled `regex` checker.
///
/// Flags use the bit values of Python's `re` module so descriptors written by
/// existing management hosts keep their meaning.
#[derive(Debug, Clone)]
pub struct RegexMatch {
    pattern: String,
    flags: u32,
    regex: Regex,
}

impl RegexMatch {
    /// Case-insensitive matching.
    pub const IGNORECASE: u32 = 2;
    /// `^` and `$` match at line boundaries.
    pub const MULTILINE: u32 = 8;
    /// `.` matches newlines.
    pub const DOTALL: u32 = 16;
    /// Unicode classes. Always on; accepted for compatibility.
    pub const UNICODE: u32 = 32;
    /// Whitespace and `#` comments in the pattern are ignored.
    pub const VERBOSE: u32 = 64;
    /// Every flag bit the checker understands.
    pub const SUPPORTED_FLAGS: u32 =
        Self::IGNORECASE | Self::MULTILINE | Self::DOTALL | Self::UNICODE | Self::VERBOSE;

    /// Compiles `pattern` with the given flag bits.
    ///
    /// # Errors
    ///
    /// See [`Checker::regex`].
    pub fn new(pattern: impl Into<String>, flags: u32) -> Result<Self, CheckerError> {
        let pattern = pattern.into();
        if flags & !Self::SUPPORTED_FLAGS != 0 {
            return Err(CheckerError::UnsupportedFlags {
                flags,
                supported: Self::SUPPORTED_FLAGS,
            });
        }
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(flags & Self::IGNORECASE != 0)
            .multi_line(flags & Self::MULTILINE != 0)
            .dot_matches_new_line(flags & Self::DOTALL != 0)
            .ignore_whitespace(flags & Self::VERBOSE != 0)
            .unicode(true)
            .build()
            .map_err(|source| CheckerError::InvalidRegex {
                pattern: pattern.clone(),
                source,
            })?;
        Ok(Self {
            pattern,
            flags,
            regex,
        })
    }

    /// Source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Flag bits the pattern was compiled with.
    #[must_use]
    pub const fn flags(&self) -> u32 {
        self.flags
    }
}

/// Named host predicate without a structured description.
#[derive(Clone)]
pub struct CustomCheck {
    name: String,
    predicate: Arc<dyn Fn(&Event) -> bool + Send + Sync>,
}

impl CustomCheck {
    /// Name the host gave the predicate.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CustomCheck")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Errors raised while building a checker.
#[derive(Debug, Error)]
pub enum CheckerError {
    /// The expression failed to compile.
    #[error("invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        /// Offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        #[source]
        source: regex::Error,
    },
    /// Flag bits outside the supported set were requested.
    #[error("unsupported regex flags {flags}; supported bits are {supported}")]
    UnsupportedFlags {
        /// Requested flags.
        flags: u32,
        /// Supported mask.
        supported: u32,
    },
}
