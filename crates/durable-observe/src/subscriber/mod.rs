mod journal;
mod view;

pub use journal::Journal;
pub use view::{View, log_event, message_for};
