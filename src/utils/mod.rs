pub mod html;
pub mod text;

pub use html::html_to_text;
pub use text::ellipsize;
