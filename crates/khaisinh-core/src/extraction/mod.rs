//! Field extraction: region selection, text cleanup and the pipeline.

mod correct;
mod normalize;
mod patterns;
mod pipeline;
mod select;

pub use correct::ParentFieldCorrector;
pub use normalize::{
    canonical_document_type, collapse_whitespace, normalize_date, normalize_name, FieldKind,
    FieldNormalizer,
};
pub use patterns::{CANONICAL_DOCUMENT_TYPE, MOTHER_KEYWORDS};
pub use pipeline::{decode_image, load_image, prepare_image, FieldExtractor, FieldExtractorBuilder};
pub use select::select_regions;
