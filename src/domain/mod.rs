pub mod lines;
pub mod prefetch;
