use thiserror::Error;

#[derive(Error, Debug)]
pub enum FarmError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("Barn {barn} holds {size} animals, capacity is {capacity}")]
    CapacityInvariant {
        barn: String,
        size: usize,
        capacity: usize,
    },

    #[error("Animal {animal} does not share the color of barn {barn}")]
    ColorMismatch { animal: u64, barn: String },

    #[error("Store operation failed: {message}")]
    StoreError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lookup,
    Invariant,
    Storage,
    Configuration,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FarmError {
    pub fn not_found_animal(id: u64) -> Self {
        FarmError::NotFound {
            entity: "Animal",
            id,
        }
    }

    pub fn not_found_barn(id: u64) -> Self {
        FarmError::NotFound { entity: "Barn", id }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            FarmError::NotFound { .. } => ErrorCategory::Lookup,
            FarmError::CapacityInvariant { .. } | FarmError::ColorMismatch { .. } => {
                ErrorCategory::Invariant
            }
            FarmError::StoreError { .. }
            | FarmError::IoError(_)
            | FarmError::SerializationError(_) => ErrorCategory::Storage,
            FarmError::TomlError(_)
            | FarmError::ConfigError { .. }
            | FarmError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            FarmError::CsvError(_) | FarmError::ValidationError { .. } => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Lookup => ErrorSeverity::Low,
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::Invariant => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Lookup => "Run `list` to see the ids currently on the farm",
            ErrorCategory::Invariant => {
                "Nothing was written; report this together with the data file"
            }
            ErrorCategory::Storage => "Check that the data file is readable and writable",
            ErrorCategory::Configuration => "Check the TOML configuration file and CLI flags",
            ErrorCategory::Input => "Check the input file format (header: name,favorite_color)",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            FarmError::NotFound { entity, id } => format!("No {} with id {}", entity.to_lowercase(), id),
            FarmError::IoError(e) => format!("Could not access the data file: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FarmError>;
