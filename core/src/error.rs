use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Uniqueness exhausted for '{domain}': produced {produced} of {requested} after {attempts} draws")]
    Exhaustion {
        domain: String,
        requested: usize,
        produced: usize,
        attempts: usize,
    },

    #[error("Distribution '{table}' is malformed: {reason}")]
    Distribution { table: String, reason: String },

    #[error("Identifier '{id}' already registered for {entity}")]
    DuplicateIdentifier { entity: String, id: String },

    #[error("Cannot sample {requested} {entity} from a population of {available}")]
    InsufficientPopulation {
        entity: String,
        requested: usize,
        available: usize,
    },

    #[error("Constraint violation in {store}.{table}: {message}")]
    ConstraintViolation {
        store: String,
        table: String,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl GenError {
    /// Whether the orchestrator may retry the phase that raised this.
    /// Everything else aborts the run.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenError::Exhaustion { .. } | GenError::ConstraintViolation { .. }
        )
    }

    /// Short stable name used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            GenError::Config(_) => "config",
            GenError::Exhaustion { .. } => "exhaustion",
            GenError::Distribution { .. } => "distribution",
            GenError::DuplicateIdentifier { .. } => "duplicate_identifier",
            GenError::InsufficientPopulation { .. } => "insufficient_population",
            GenError::ConstraintViolation { .. } => "constraint_violation",
            GenError::Database(_) => "database",
        }
    }

    /// The uniqueness domain, constraint or table the failure names, if any.
    pub fn subject(&self) -> Option<String> {
        match self {
            GenError::Exhaustion { domain, .. } => Some(domain.clone()),
            GenError::Distribution { table, .. } => Some(table.clone()),
            GenError::DuplicateIdentifier { entity, .. } => Some(entity.clone()),
            GenError::InsufficientPopulation { entity, .. } => Some(entity.clone()),
            GenError::ConstraintViolation { store, table, .. } => Some(format!("{store}.{table}")),
            _ => None,
        }
    }
}

pub type GenResult<T> = Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exhaustion_and_constraint_violations_retry() {
        let exhaustion = GenError::Exhaustion {
            domain: "email".into(),
            requested: 10,
            produced: 3,
            attempts: 200,
        };
        let violation = GenError::ConstraintViolation {
            store: "accounts".into(),
            table: "customers".into(),
            message: "UNIQUE constraint failed".into(),
        };
        let duplicate = GenError::DuplicateIdentifier {
            entity: "employee".into(),
            id: "EMP-1".into(),
        };
        assert!(exhaustion.is_retryable());
        assert!(violation.is_retryable());
        assert!(!duplicate.is_retryable());
        assert!(!GenError::Config("bad".into()).is_retryable());
        assert_eq!(violation.subject().as_deref(), Some("accounts.customers"));
    }
}
