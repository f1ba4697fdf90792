pub mod bigquery;
pub mod gemini;
pub mod text_generator;
pub mod warehouse;
