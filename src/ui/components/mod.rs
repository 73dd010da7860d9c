mod assignee_picker;
mod key_result;

pub use assignee_picker::{AssigneeEvent, AssigneePicker};
pub use key_result::KeyResult;
