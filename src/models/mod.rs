pub mod document;
pub mod element;
pub mod loaders;
pub mod prompt_config;

pub use document::{Alignment, Document, HighlightColor, Paragraph, Relationship, Run};
pub use element::{
    Element, ElementId, ElementKind, FormatInfo, HighlightSet, ListInfo, ListMarker,
    MediaDescriptor, RewriteResult, RunFormat,
};
pub use loaders::{load_document, load_prompt_config, save_document};
pub use prompt_config::{PromptConfig, Replacement, Sample};
