/// A single field that failed input checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

/// All field failures for one submission, reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid input: {}", join_messages(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }
}

/// A database row that cannot be turned into a typed entity.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("{table} row {id}: unknown {column} `{value}`")]
    UnknownValue {
        table: &'static str,
        id: uuid::Uuid,
        column: &'static str,
        value: String,
    },
}
