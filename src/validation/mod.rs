pub mod upload;

pub use upload::{sanitize_filename, UploadPolicy};
