pub mod text_segments;
