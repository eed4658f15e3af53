pub mod types;
pub mod cursor;
pub mod json_source;

pub use types::{CandidateSchedule, EventRef, EventRefRecord, ScheduleRecord};
pub use cursor::{CursorPosition, ScheduleCursor, JUMP_STEP};
pub use json_source::{resolve_schedules, JsonScheduleSource};
