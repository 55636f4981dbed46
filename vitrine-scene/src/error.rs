use thiserror::Error;

pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Unknown element '{tag}': not in the allow-listed registry")]
    UnknownElement { tag: String },

    #[error("Unknown prop '{prop}' for element '{element}'")]
    UnknownProp { element: String, prop: String },

    #[error("Invalid type for prop '{prop}' in element '{element}': expected {expected}")]
    InvalidPropType {
        element: String,
        prop: String,
        expected: String,
    },

    #[error("Missing required prop '{prop}' for element '{element}'")]
    MissingProp { element: String, prop: String },

    #[error("Element '{element}' does not accept children")]
    ChildrenNotAllowed { element: String },

    #[error("Maximum nesting depth ({max_depth}) exceeded")]
    MaxNestingDepthExceeded { max_depth: usize },

    #[error("Duplicate id '{id}': element ids must be unique within the tree")]
    DuplicateId { id: String },

    #[error("Invalid color value '{value}': {reason}")]
    InvalidColor { value: String, reason: String },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}
