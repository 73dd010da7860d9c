mod board;
mod milestone_list;

pub use board::BoardView;
pub use milestone_list::MilestoneListView;
