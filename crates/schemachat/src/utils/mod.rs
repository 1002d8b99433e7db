//! Utilities module - text helpers shared by parsing, rendering and logging

pub mod text_utils;

pub use text_utils::TextUtils;
