use std::fmt;
use std::path::{Path, PathBuf};

use crate::model::culture::Culture;
use crate::model::variant::PublicationState;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    ContentTypeMissing,
    InvalidHierarchy,
    EntityNotFound,
    InvalidStateTransition,
    UnsupportedVariation,
    UnknownProperty,
    UnknownRelationType,
    DuplicateEntity,
    CorruptStore,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ContentTypeMissing => "E2001",
            Self::InvalidHierarchy => "E2002",
            Self::EntityNotFound => "E2003",
            Self::InvalidStateTransition => "E2004",
            Self::UnsupportedVariation => "E2005",
            Self::UnknownProperty => "E2006",
            Self::UnknownRelationType => "E2007",
            Self::DuplicateEntity => "E2008",
            Self::CorruptStore => "E3001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::ContentTypeMissing => "Content type missing or unresolvable",
            Self::InvalidHierarchy => "Invalid path or level",
            Self::EntityNotFound => "Entity not found",
            Self::InvalidStateTransition => "Invalid publication state transition",
            Self::UnsupportedVariation => "Culture variation not supported",
            Self::UnknownProperty => "Unknown property alias",
            Self::UnknownRelationType => "Unknown relation type alias",
            Self::DuplicateEntity => "Entity already exists",
            Self::CorruptStore => "Corrupt SQLite store",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `vl init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix the TOML syntax in the named config file and retry."),
            Self::ContentTypeMissing => {
                Some("Supply a content type (register one with `vl type add`) and retry.")
            }
            Self::InvalidHierarchy => {
                Some("Path must end with the item id and level must match the path depth.")
            }
            Self::EntityNotFound => None,
            Self::InvalidStateTransition => Some(
                "Follow valid transitions: draft -> published -> pending changes -> published.",
            ),
            Self::UnsupportedVariation => {
                Some("Pass a culture only for properties and types that vary by culture.")
            }
            Self::UnknownProperty => Some("Use a property alias defined on the content type."),
            Self::UnknownRelationType => {
                Some("List relation types with `vl relation types` and use one of those aliases.")
            }
            Self::DuplicateEntity => Some("Pick an unused id or update the existing entity."),
            Self::CorruptStore => Some("Restore the store from a backup or re-run `vl init`."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the content model, the eligibility engine and repositories.
#[derive(Debug, thiserror::Error)]
pub enum VellumError {
    /// Construction or mutation would leave an item in an unusable state.
    #[error("invalid state: {reason}")]
    InvalidState { code: ErrorCode, reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("'{alias}' does not support culture {culture:?}")]
    UnsupportedVariation {
        alias: String,
        culture: Option<Culture>,
    },

    #[error("unknown property alias '{0}'")]
    UnknownProperty(String),

    #[error("unknown relation type alias '{0}'")]
    UnknownRelationType(String),

    #[error("cannot move culture {culture} from {from} to {to}")]
    InvalidTransition {
        culture: Culture,
        from: PublicationState,
        to: PublicationState,
    },

    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("failed to parse {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl VellumError {
    /// Missing or unresolvable content type during construction.
    pub fn missing_content_type(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            code: ErrorCode::ContentTypeMissing,
            reason: reason.into(),
        }
    }

    /// A path/level combination that breaks the hierarchy invariants.
    pub fn invalid_hierarchy(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            code: ErrorCode::InvalidHierarchy,
            reason: reason.into(),
        }
    }

    pub fn config_parse(path: &Path, reason: impl fmt::Display) -> Self {
        Self::Config {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidState { code, .. } => *code,
            Self::NotFound { .. } => ErrorCode::EntityNotFound,
            Self::UnsupportedVariation { .. } => ErrorCode::UnsupportedVariation,
            Self::UnknownProperty(_) => ErrorCode::UnknownProperty,
            Self::UnknownRelationType(_) => ErrorCode::UnknownRelationType,
            Self::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            Self::AlreadyExists { .. } => ErrorCode::DuplicateEntity,
            Self::Config { .. } => ErrorCode::ConfigParseError,
            Self::Storage(_) => ErrorCode::CorruptStore,
            Self::Serialization(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Remediation hint, falling back to the code's summary.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.code();
        code.hint().unwrap_or_else(|| code.message()).to_string()
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T, E = VellumError> = std::result::Result<T, E>;
