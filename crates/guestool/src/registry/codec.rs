//! Translation between live rules and their serialisable descriptors.
//!
//! A descriptor names exactly one primitive checker through its `match_type`
//! discriminant, plus a `restrict_to_me` flag standing for the mention filter.
//! Decoding walks the checkers of a rule once and classifies them directly;
//! checkers with no structured form are dropped, so decoding is lossy for
//! rules that carry host-specific predicates.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::REGISTRY_TARGET;
use super::errors::RegistryError;
use crate::host::{Checker, CheckerKind, Rule, TextMatch};

/// Serialisable description of a matcher rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match_type", rename_all = "snake_case")]
pub enum RuleDescriptor {
    Startswith(CommonMatchRule),
    Endswith(CommonMatchRule),
    Fullmatch(CommonMatchRule),
    Keywords(CommonMatchRule),
    Command(CommandRule),
    Regex(RegexRule),
}

/// Fields shared by the plain text match types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonMatchRule {
    pub patterns: Vec<String>,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub restrict_to_me: bool,
}

/// Command match: each entry is a token sequence such as `["admin", "ban"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRule {
    pub commands: Vec<Vec<String>>,
    #[serde(default)]
    pub force_whitespace: bool,
    #[serde(default)]
    pub restrict_to_me: bool,
}

/// Regular expression match with `re`-compatible flag bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexRule {
    pub pattern: String,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub restrict_to_me: bool,
}

impl RuleDescriptor {
    /// Primitive checker kind the descriptor stands for.
    #[must_use]
    pub const fn match_type(&self) -> CheckerKind {
        match self {
            Self::Startswith(_) => CheckerKind::Startswith,
            Self::Endswith(_) => CheckerKind::Endswith,
            Self::Fullmatch(_) => CheckerKind::Fullmatch,
            Self::Keywords(_) => CheckerKind::Keywords,
            Self::Command(_) => CheckerKind::Command,
            Self::Regex(_) => CheckerKind::Regex,
        }
    }

    /// Whether the rule also requires the event to address the bot.
    #[must_use]
    pub const fn restrict_to_me(&self) -> bool {
        match self {
            Self::Startswith(rule)
            | Self::Endswith(rule)
            | Self::Fullmatch(rule)
            | Self::Keywords(rule) => rule.restrict_to_me,
            Self::Command(rule) => rule.restrict_to_me,
            Self::Regex(rule) => rule.restrict_to_me,
        }
    }

    fn set_restrict_to_me(&mut self, value: bool) {
        match self {
            Self::Startswith(rule)
            | Self::Endswith(rule)
            | Self::Fullmatch(rule)
            | Self::Keywords(rule) => rule.restrict_to_me = value,
            Self::Command(rule) => rule.restrict_to_me = value,
            Self::Regex(rule) => rule.restrict_to_me = value,
        }
    }
}

/// Classifies a live rule.
///
/// # Errors
///
/// Returns [`RegistryError::RuleConflict`] when more than one primitive
/// checker is present, even of the same kind, and
/// [`RegistryError::Validation`] when the rule has no primitive checker at
/// all.
pub fn decode(rule: &Rule) -> Result<RuleDescriptor, RegistryError> {
    let mut descriptor: Option<RuleDescriptor> = None;
    let mut restrict_to_me = false;

    for checker in rule.checkers() {
        let Some(incoming) = primitive_descriptor(checker) else {
            match checker {
                Checker::ToMe => restrict_to_me = true,
                Checker::Custom(custom) => debug!(
                    target: REGISTRY_TARGET,
                    checker = custom.name(),
                    "dropping checker without a structured form"
                ),
                _ => {}
            }
            continue;
        };
        // A single descriptor cannot express an AND of two pattern lists.
        if let Some(existing) = &descriptor {
            return Err(RegistryError::RuleConflict {
                first: existing.match_type(),
                second: incoming.match_type(),
            });
        }
        descriptor = Some(incoming);
    }

    let mut descriptor = descriptor.ok_or_else(|| {
        RegistryError::validation(
            "rule has no startswith, endswith, fullmatch, keywords, command or regex checker",
        )
    })?;
    descriptor.set_restrict_to_me(restrict_to_me);
    Ok(descriptor)
}

/// Builds a live rule from a descriptor.
///
/// # Errors
///
/// Returns [`RegistryError::Validation`] for empty pattern or command lists,
/// `ignore_case` on keywords, and regexes that do not compile or use
/// unsupported flags.
pub fn encode(descriptor: &RuleDescriptor) -> Result<Rule, RegistryError> {
    let checker = match descriptor {
        RuleDescriptor::Startswith(rule) => Checker::Startswith(text_match(rule)?),
        RuleDescriptor::Endswith(rule) => Checker::Endswith(text_match(rule)?),
        RuleDescriptor::Fullmatch(rule) => Checker::Fullmatch(text_match(rule)?),
        RuleDescriptor::Keywords(rule) => {
            if rule.ignore_case {
                return Err(RegistryError::validation(
                    "keywords matching does not support ignore_case",
                ));
            }
            Checker::keywords(text_match(rule)?.patterns)
        }
        RuleDescriptor::Command(rule) => {
            validate_commands(&rule.commands)?;
            Checker::command(rule.commands.clone(), rule.force_whitespace)
        }
        RuleDescriptor::Regex(rule) => Checker::regex(rule.pattern.clone(), rule.flags)?,
    };

    let live = Rule::from(checker);
    if descriptor.restrict_to_me() {
        Ok(live.and(Checker::ToMe))
    } else {
        Ok(live)
    }
}

fn primitive_descriptor(checker: &Checker) -> Option<RuleDescriptor> {
    let common = |text: &TextMatch| CommonMatchRule {
        patterns: text.patterns.clone(),
        ignore_case: text.ignore_case,
        restrict_to_me: false,
    };
    match checker {
        Checker::Startswith(text) => Some(RuleDescriptor::Startswith(common(text))),
        Checker::Endswith(text) => Some(RuleDescriptor::Endswith(common(text))),
        Checker::Fullmatch(text) => Some(RuleDescriptor::Fullmatch(common(text))),
        Checker::Keywords(keywords) => Some(RuleDescriptor::Keywords(CommonMatchRule {
            patterns: keywords.clone(),
            ignore_case: false,
            restrict_to_me: false,
        })),
        Checker::Command(command) => Some(RuleDescriptor::Command(CommandRule {
            commands: command.commands.clone(),
            force_whitespace: command.force_whitespace,
            restrict_to_me: false,
        })),
        Checker::Regex(regex) => Some(RuleDescriptor::Regex(RegexRule {
            pattern: regex.pattern().to_owned(),
            flags: regex.flags(),
            restrict_to_me: false,
        })),
        Checker::ToMe | Checker::Custom(_) => None,
    }
}

fn text_match(rule: &CommonMatchRule) -> Result<TextMatch, RegistryError> {
    if rule.patterns.is_empty() {
        return Err(RegistryError::validation("patterns must not be empty"));
    }
    Ok(TextMatch {
        patterns: rule.patterns.clone(),
        ignore_case: rule.ignore_case,
    })
}

fn validate_commands(commands: &[Vec<String>]) -> Result<(), RegistryError> {
    if commands.is_empty() {
        return Err(RegistryError::validation("commands must not be empty"));
    }
    let has_empty = commands
        .iter()
        .any(|tokens| tokens.is_empty() || tokens.iter().any(String::is_empty));
    if has_empty {
        return Err(RegistryError::validation(
            "every command needs at least one non-empty token",
        ));
    }
    Ok(())
}
