use thiserror::Error;

/// Errors surfaced by the gamification engine. Every variant is
/// recoverable at the caller and maps to a user-facing detail string;
/// storage failures come back as `Unavailable` so callers can retry.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown user, quest, product, reward, or community.
    #[error("not found: {0}")]
    NotFound(String),

    /// The (user, quest) pair already has a completion fact for the
    /// current eligibility window.
    #[error("already completed this window: {0}")]
    AlreadyCompleted(String),

    /// A debit or purchase would drive the balance negative.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: i64, need: i64 },

    /// Credit/debit amounts must be positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Community quest attempted outside [event_start, event_end].
    #[error("event not active: {0}")]
    EventNotActive(String),

    /// User has not joined the community that owns the quest.
    #[error("not a member of community: {0}")]
    NotAMember(String),

    /// Per-user lock contention exceeded the retry budget.
    #[error("conflict: user {0} is busy, retry later")]
    Conflict(String),

    /// Wrapper around sled's error type; retried by the caller.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Invalid catalog data (non-positive reward, inverted event window).
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
