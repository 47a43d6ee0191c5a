//! Session lifecycle events and their subscribers.

use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

use crate::dive::NormalizedDive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DownloadState {
    #[default]
    Idle,
    Connecting,
    Downloading,
    Parsing,
    Complete,
    Error,
    Cancelled,
}

impl DownloadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Cancelled)
    }
}

/// Work done so far within one session. `current` never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    pub maximum: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    State(DownloadState),
    Progress(Progress),
    /// A dive was decoded; emitted in device order, one at a time.
    Dive(Box<NormalizedDive>),
    Error(String),
    /// The session completed with these dives.
    Complete(Vec<NormalizedDive>),
}

pub type ObserverId = u64;

type Observer = Box<dyn FnMut(&DownloadEvent) + Send>;

/// Channel receivers and synchronous observers of a manager's events.
#[derive(Default)]
pub(crate) struct Subscribers {
    channels: Vec<Sender<DownloadEvent>>,
    observers: Vec<(ObserverId, Observer)>,
    next_id: ObserverId,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self) -> Receiver<DownloadEvent> {
        let (tx, rx) = mpsc::channel();
        self.channels.push(tx);
        rx
    }

    pub(crate) fn observe(&mut self, observer: Observer) -> ObserverId {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn unobserve(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(i, _)| *i != id);
        self.observers.len() != before
    }

    /// Deliver an event. Channels whose receiver was dropped are removed.
    pub(crate) fn emit(&mut self, event: DownloadEvent) {
        for (_, observer) in &mut self.observers {
            observer(&event);
        }
        self.channels.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
