//! sidepanel-core: streaming conversation reconciliation
//!
//! This crate keeps the side panel's transcript consistent with the agent
//! events streaming in over the messaging port, and speaks the
//! submit/interrupt/cancel/reset protocol back over it.

pub mod error;
pub mod events;
pub mod handle;
pub mod input;
pub mod message;
pub mod port;
pub mod reconciler;
pub mod segments;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Error, Result};
pub use events::PanelEvent;
pub use handle::{SessionHandle, UiCommand};
pub use input::{ComposerStatus, tab_selector_trigger};
pub use message::{Message, MessageId, MessageMetadata, NewMessage, Role};
pub use port::{ChannelPort, Port};
pub use reconciler::Reconciler;
pub use segments::{DEFAULT_PLACEHOLDER, SegmentTracker};
pub use session::{
    CANCEL_REASON, DEFAULT_INTERRUPT_GRACE, DISCONNECTED_MESSAGE, INTERRUPT_REASON, Session,
    SessionConfig, SubmitOutcome,
};
pub use store::{Snapshot, TranscriptStore};
