//! Session link - the guarded holder of a listener's outbound command channel
//!
//! A link moves through `Idle → Open → Closed`. Only an open link accepts
//! commands; in any other phase they are dropped without error. A listener
//! that supports reconnect re-arms a closed link back to `Idle`.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use rover_core::{Direction, RoverError, RoverResult, SessionId};

/// Default depth of the outbound command queue
pub const DEFAULT_COMMAND_QUEUE: usize = 32;

/// Observable session phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No peer yet
    Idle,
    /// Peer connected, commands flow
    Open,
    /// Peer gone; commands are dropped
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Open => write!(f, "open"),
            SessionPhase::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug)]
enum LinkState {
    Idle,
    Open {
        session: SessionId,
        commands: mpsc::Sender<Direction>,
    },
    Closed {
        session: SessionId,
    },
}

/// Session link
///
/// The sender half of the command queue only exists while the link is
/// open. Closing drops it, which ends the writer task and releases the
/// socket's write half; a dispatcher can never write to a half-closed
/// connection.
#[derive(Debug)]
pub struct SessionLink {
    state: Mutex<LinkState>,
    queue_depth: usize,
}

impl SessionLink {
    pub fn new(queue_depth: usize) -> Self {
        SessionLink {
            state: Mutex::new(LinkState::Idle),
            queue_depth: queue_depth.max(1),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match &*self.state.lock() {
            LinkState::Idle => SessionPhase::Idle,
            LinkState::Open { .. } => SessionPhase::Open,
            LinkState::Closed { .. } => SessionPhase::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase() == SessionPhase::Open
    }

    /// The open or most recently closed session
    pub fn session(&self) -> Option<SessionId> {
        match &*self.state.lock() {
            LinkState::Idle => None,
            LinkState::Open { session, .. } | LinkState::Closed { session } => Some(*session),
        }
    }

    /// `Idle → Open`; returns the receiving end of the command queue
    pub fn open(&self, session: SessionId) -> RoverResult<mpsc::Receiver<Direction>> {
        let mut state = self.state.lock();
        match &*state {
            LinkState::Idle => {
                let (tx, rx) = mpsc::channel(self.queue_depth);
                *state = LinkState::Open {
                    session,
                    commands: tx,
                };
                Ok(rx)
            }
            LinkState::Open { session: open, .. } => Err(RoverError::SessionAlreadyOpen(*open)),
            LinkState::Closed { .. } => Err(RoverError::SessionClosed),
        }
    }

    /// `Open → Closed` for the given session
    ///
    /// Returns false if that session is not the open one (already closed,
    /// or superseded after a reconnect).
    pub fn close(&self, session: SessionId) -> bool {
        let mut state = self.state.lock();
        match &*state {
            LinkState::Open { session: open, .. } if *open == session => {
                *state = LinkState::Closed { session };
                true
            }
            _ => false,
        }
    }

    /// `Closed → Idle`, ready to accept the next peer
    pub fn rearm(&self) -> bool {
        let mut state = self.state.lock();
        match &*state {
            LinkState::Closed { .. } => {
                *state = LinkState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Queue a command if the link is open
    ///
    /// Never blocks: with no open session, or with a full queue, the
    /// command is dropped and `false` is returned.
    pub fn dispatch(&self, direction: Direction) -> bool {
        let state = self.state.lock();
        let LinkState::Open { session, commands } = &*state else {
            tracing::trace!(%direction, "no open session, dropping command");
            return false;
        };
        match commands.try_send(direction) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(session = %session, %direction, error = %e, "dropping command");
                false
            }
        }
    }
}

impl Default for SessionLink {
    fn default() -> Self {
        SessionLink::new(DEFAULT_COMMAND_QUEUE)
    }
}

/// Command dispatcher - the collaborator's handle for steering the platform
///
/// Cheap to clone; every clone talks to the same link.
#[derive(Clone, Debug)]
pub struct CommandDispatcher {
    link: Arc<SessionLink>,
}

impl CommandDispatcher {
    pub fn new(link: Arc<SessionLink>) -> Self {
        CommandDispatcher { link }
    }

    /// Send `CMD:<letter>` to the peer if one is connected
    ///
    /// Fire-and-forget: returns whether the command was queued.
    pub fn send(&self, direction: Direction) -> bool {
        self.link.dispatch(direction)
    }

    /// Whether a peer is currently connected
    pub fn is_connected(&self) -> bool {
        self.link.is_open()
    }

    pub fn phase(&self) -> SessionPhase {
        self.link.phase()
    }
}
