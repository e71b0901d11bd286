pub type StoryResult<T> = Result<T, StoryError>;

#[derive(thiserror::Error, Debug)]
pub enum StoryError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("entropy error: {0}")]
    Entropy(String),

    #[error("unknown photo: {0}")]
    UnknownPhoto(String),

    #[error("export error: {0}")]
    Export(String),
}

impl StoryError {
    pub fn invalid_color(msg: impl Into<String>) -> Self {
        Self::InvalidColor(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            StoryError::invalid_color("x")
                .to_string()
                .contains("invalid color:")
        );
        assert!(StoryError::export("x").to_string().contains("export error:"));
        assert!(
            StoryError::UnknownPhoto("abc".into())
                .to_string()
                .contains("unknown photo: abc")
        );
    }
}
