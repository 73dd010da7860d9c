pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::{draw_header, HeaderInfo};
pub use utils::{label_color, relative_due, truncate};
