pub mod parsing;
pub mod profile;
