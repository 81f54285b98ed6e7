pub mod models;
pub mod segments;
