use std::path::PathBuf;

use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind};

/// What the change-event source observed about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// One or more changes settled within the debounce window.
    Any,
    /// The path kept changing for longer than the debounce window.
    Continuous,
}

/// A single observed filesystem mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

impl From<DebouncedEvent> for ChangeEvent {
    fn from(event: DebouncedEvent) -> Self {
        let kind = match event.kind {
            DebouncedEventKind::AnyContinuous => ChangeKind::Continuous,
            _ => ChangeKind::Any,
        };
        Self::new(kind, event.path)
    }
}

/// One delivery from the change-event source.
pub type ChangeBatch = Vec<ChangeEvent>;
