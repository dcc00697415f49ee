use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("base price must be a positive number, got {0}")]
    InvalidBaseline(f64),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("db error: {0}")]
    Db(#[from] mongodb::error::Error),

    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("template syntax error: {0}")]
    TemplateSyntax(#[from] handlebars::TemplateError),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl AlarmError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}
