/// Errors raised while parsing a scheduling pattern.
///
/// Group indices are 1-based, counting `|`-separated alternatives left to
/// right, so messages read the way a user wrote the pattern.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,

    #[error("group {group}: empty alternative")]
    EmptyGroup { group: usize },

    #[error("group {group}: expected 5 fields (minute hour dom month dow), got {count}")]
    FieldCount { group: usize, count: usize },

    #[error("group {group}, {field} field: {message}")]
    Field {
        group: usize,
        field: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, PatternError>;
