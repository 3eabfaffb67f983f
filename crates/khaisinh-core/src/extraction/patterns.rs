//! Text patterns and keyword tables for birth certificate fields.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Any run of whitespace.
    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    /// Characters OCR emits between name parts.
    pub static ref NAME_SEPARATORS: Regex = Regex::new(r"[_-]").unwrap();
}

/// Substrings marking a birth certificate title ("giấy khai sinh").
pub const BIRTH_CERTIFICATE_MARKERS: [&str; 2] = ["khai sinh", "giấy khai sinh"];

/// Canonical document type for birth certificates.
pub const CANONICAL_DOCUMENT_TYPE: &str = "Giấy khai sinh";

/// Substrings marking a field label as a date.
pub const DATE_LABEL_MARKERS: [&str; 2] = ["ngày", "date"];

/// Substrings in a caption that refer to the mother.
pub const MOTHER_KEYWORDS: [&str; 4] = ["mẹ", "me", "mother", "má"];
