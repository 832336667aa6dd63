pub type EncoreResult<T> = Result<T, EncoreError>;

#[derive(thiserror::Error, Debug)]
pub enum EncoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EncoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            EncoreError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(EncoreError::render("x").to_string().contains("render error:"));
        assert!(
            EncoreError::snapshot("x")
                .to_string()
                .contains("snapshot error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = EncoreError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
