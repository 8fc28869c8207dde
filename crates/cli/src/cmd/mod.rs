pub mod prepare;
pub mod resume;
pub mod start;
pub mod suffix;
