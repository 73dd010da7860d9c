//! Board columns: categorization, time totals and drag state.

mod aggregate;
pub(crate) mod category;
mod drag;

pub use aggregate::{categorize, Bucket, TimeTotals};
pub use category::{Categories, Category};
pub use drag::{DragState, PendingMove};
