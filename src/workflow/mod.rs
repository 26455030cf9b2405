pub mod batch_protocol;
pub mod extractor;
pub mod reconstructor;

pub use extractor::{extract, Extraction};
pub use reconstructor::{rebuild, select_strategy, BodyStrategy, FormattingStrategy};
