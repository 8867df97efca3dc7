//! Routing commands
//!
//! The classifier answers with a loosely-structured list of
//! `[module, query]` string pairs; this module gives that output a typed
//! shape. Parsing of the raw text lives in [`parser`].

mod parser;

pub use parser::parse_routing;

/// Fallback query spoken when the classifier output cannot be parsed
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't understand that.";

/// Enumerated module tags consumed by the dispatcher
///
/// Unknown tags are preserved in [`Module::Unrecognized`] so the dispatcher
/// can surface a per-command error without aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Module {
    /// Conversational reply engine
    Chatbot,
    /// Weather lookups
    Weather,
    /// Time and date questions
    Time,
    /// Location questions
    Location,
    /// Real-time web search
    Search,
    /// App/file/system-level commands
    SystemCommands,
    /// Music playback skill
    SkillMusic,
    /// Smart-home skill
    SkillHome,
    /// Study-tools skill
    SkillStudy,
    /// Graceful session termination
    Exit,
    /// Tag the classifier produced that matches no known module
    Unrecognized(String),
}

impl Module {
    /// Resolve a classifier tag to a module, case-insensitively
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "CHATBOT" => Self::Chatbot,
            "WEATHER" => Self::Weather,
            "TIME" => Self::Time,
            "LOCATION" => Self::Location,
            "SEARCH" => Self::Search,
            "SYSTEM_COMMANDS" => Self::SystemCommands,
            "CUSTOM_SKILL_MUSIC" => Self::SkillMusic,
            "CUSTOM_SKILL_HOME" => Self::SkillHome,
            "CUSTOM_SKILL_STUDY" => Self::SkillStudy,
            "EXIT" => Self::Exit,
            _ => Self::Unrecognized(tag.trim().to_string()),
        }
    }

    /// Canonical tag for logs and aggregated error lines
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Chatbot => "CHATBOT",
            Self::Weather => "WEATHER",
            Self::Time => "TIME",
            Self::Location => "LOCATION",
            Self::Search => "SEARCH",
            Self::SystemCommands => "SYSTEM_COMMANDS",
            Self::SkillMusic => "CUSTOM_SKILL_MUSIC",
            Self::SkillHome => "CUSTOM_SKILL_HOME",
            Self::SkillStudy => "CUSTOM_SKILL_STUDY",
            Self::Exit => "Exit",
            Self::Unrecognized(tag) => tag,
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One validated `(module, query)` pair from the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingCommand {
    /// Which handler should process the query
    pub module: Module,
    /// Cleaned query text for that handler
    pub query: String,
}

impl RoutingCommand {
    /// Create a routing command
    #[must_use]
    pub fn new(module: Module, query: impl Into<String>) -> Self {
        Self {
            module,
            query: query.into(),
        }
    }

    /// The guaranteed-safe fallback batch used when parsing fails
    #[must_use]
    pub fn fallback() -> Vec<Self> {
        vec![Self::new(Module::Chatbot, FALLBACK_REPLY)]
    }
}
