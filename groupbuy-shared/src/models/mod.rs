pub mod document;
pub mod patch;
