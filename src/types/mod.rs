mod event;

pub use event::{EventStatus, ProgressEvent};
