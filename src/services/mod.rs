pub mod arxiv_url;
pub mod html_text;
pub mod output_store;
pub mod script_format;
pub mod selection;
pub mod wav;

pub use output_store::{OutputStore, AUDIO_DIR_NAME, SUMMARY_FILE_NAME};
pub use selection::{extract_selection, Selection};
