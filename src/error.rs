use std::fmt;

#[derive(Debug)]
pub enum PageSvgError {
    /// The markup is not well-formed XML; there is no tree to degrade over.
    Markup(roxmltree::Error),
    /// An image source could not be resolved or decoded. Fatal: a missing
    /// image cannot be skipped without caller awareness.
    Asset(String),
    InvalidOptions(String),
}

impl fmt::Display for PageSvgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSvgError::Markup(err) => write!(f, "markup parse error: {}", err),
            PageSvgError::Asset(message) => write!(f, "asset error: {}", message),
            PageSvgError::InvalidOptions(message) => {
                write!(f, "invalid options: {}", message)
            }
        }
    }
}

impl std::error::Error for PageSvgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PageSvgError::Markup(err) => Some(err),
            _ => None,
        }
    }
}

impl From<roxmltree::Error> for PageSvgError {
    fn from(value: roxmltree::Error) -> Self {
        PageSvgError::Markup(value)
    }
}
