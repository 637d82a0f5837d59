pub mod image;
pub mod pose;
