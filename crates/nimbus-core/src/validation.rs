use std::fmt;

pub type ValidationResult = Result<(), ValidationError>;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub kind: ValidationKind,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, kind: ValidationKind) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            kind,
        }
    }

    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(&field, format!("field '{}' is required", field), ValidationKind::Required)
    }

    pub fn min_value(field: impl Into<String>, min: f64, actual: f64) -> Self {
        let field = field.into();
        Self::new(
            &field,
            format!("field '{}' must be >= {} (got {})", field, min, actual),
            ValidationKind::MinValue { min, actual },
        )
    }

    pub fn max_value(field: impl Into<String>, max: f64, actual: f64) -> Self {
        let field = field.into();
        Self::new(
            &field,
            format!("field '{}' must be <= {} (got {})", field, max, actual),
            ValidationKind::MaxValue { max, actual },
        )
    }

    pub fn not_finite(field: impl Into<String>, actual: f64) -> Self {
        let field = field.into();
        Self::new(
            &field,
            format!("field '{}' must be finite (got {})", field, actual),
            ValidationKind::NotFinite { actual },
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationKind {
    Required,
    MinValue { min: f64, actual: f64 },
    MaxValue { max: f64, actual: f64 },
    NotFinite { actual: f64 },
}
