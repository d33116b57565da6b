use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid attendance status '{value}'")]
    InvalidStatus { value: String },

    #[error("Unknown assignment {id}")]
    UnknownAssignment { id: i64 },

    #[error("Unknown person {id}")]
    UnknownPerson { id: i64 },

    #[error("No duty plan found for {day}")]
    PlanNotFound { day: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RosterResult<T> = Result<T, RosterError>;
