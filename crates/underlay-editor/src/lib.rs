pub mod composite;
pub mod history;
pub mod session;
pub mod shortcuts;
pub mod sync;

pub use composite::{CompositeHandles, build_text_behind_composite};
pub use history::{HISTORY_CAP, HistoryLog};
pub use session::{SegmentationTicket, Session};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use sync::{Gesture, SyncEngine, TransformEvent};
