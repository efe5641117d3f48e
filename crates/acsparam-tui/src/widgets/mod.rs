//! Reusable rendering helpers.

pub mod long_text;
pub mod text_input;
pub mod value_editor;
