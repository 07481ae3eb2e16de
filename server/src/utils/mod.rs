pub mod mask;
pub mod parser;

pub use mask::mask_sensitive;
pub use parser::{format_portal_date, parse_portal_date};
