pub mod dimensions;
pub mod options;
pub mod sessions;
