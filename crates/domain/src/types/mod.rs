//! Domain types and models

pub mod event;
pub mod item;
pub mod status;
pub mod window;

pub use event::{EventKind, LifecycleEvent};
pub use item::{
    normalize_mailbox, AttachmentPresence, AttachmentRef, ItemAttributes, ItemIdentity,
    ItemRecord, NewCalendarItem, Sensitivity,
};
pub use status::ConnectionStatus;
pub use window::{truncate_to_minute, TimeWindow};
