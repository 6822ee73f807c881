//! Helper functions for templates
//!
//! Small formatting and URL utilities shared by the page renderer,
//! the generator and the server.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
