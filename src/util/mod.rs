//! Small helpers shared across the pipeline.
//!
//! - **URL handling**: resolving discovered links and inspecting redirect targets
//! - **Text processing**: keeping rendered text valid XML

mod text;
mod url;

pub use self::text::strip_xml_illegal_chars;
pub use self::url::{has_query_param, resolve_url};
