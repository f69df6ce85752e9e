mod classifier;
mod extractor;
pub mod fields;

pub use classifier::{classify, unwrap_raw_content, PayloadShape, ShapeKind};
pub use extractor::{extract_envelope, extract_item, EnvelopeExtraction, UndatedPolicy};
