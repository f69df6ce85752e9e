mod models;
mod reader;

pub use models::RawEnvelope;
pub use reader::{load_envelope, EnvelopeError, EnvelopeReader, LoadedEnvelope, ENVELOPE_EXTENSION};
