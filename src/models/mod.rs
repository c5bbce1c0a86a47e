pub mod event;
pub mod snapshot;

pub use event::{
    Event, EventDraft, ValidationError, ARTIFACT_RECENT_ITEM, SOURCE_JUMPLIST, UNKNOWN_APP_ID,
};
pub use snapshot::SourceSnapshot;
