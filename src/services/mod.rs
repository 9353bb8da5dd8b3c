pub mod media;
pub mod upload;
