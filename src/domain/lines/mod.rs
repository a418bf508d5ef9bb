pub mod error;
pub mod html;
pub mod model;
pub mod source;

pub use error::LineSourceError;
pub use html::HtmlLineSource;
pub use model::Line;
pub use source::{LineSource, MultiLineSource, StaticLineSource, TextFileLineSource};
