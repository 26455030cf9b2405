pub mod document_loader;

pub use document_loader::{
    load_document, load_prompt_config, output_path_for, parse_document, save_document,
    DocumentFormat,
};
