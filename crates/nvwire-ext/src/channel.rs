//! RPC channel abstraction that handles call back through.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::CallError;
use crate::value::Value;

/// The session through which remote methods are invoked.
///
/// Every decoded handle keeps a [`ChannelRef`] to the session that produced
/// it, so later API calls on that handle go back to the same peer.
pub trait RpcChannel: Send + Sync + fmt::Debug {
    /// Invoke `method` on the peer and wait for its result.
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, CallError>;
}

/// Shared reference to a session. Never part of a handle's identity.
pub type ChannelRef = Arc<dyn RpcChannel>;

/// A recorded invocation on a [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub args: Vec<Value>,
}

/// In-process channel that records calls and replays scripted replies.
///
/// Calls with no scripted reply left return [`Value::Nil`].
#[derive(Debug, Default)]
pub struct RecordingChannel {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<VecDeque<Result<Value, CallError>>>,
}

impl RecordingChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty channel already wrapped in a [`ChannelRef`]-compatible `Arc`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Queue the reply for the next call.
    pub fn push_reply(&self, reply: Result<Value, CallError>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Calls observed so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RpcChannel for RecordingChannel {
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, CallError> {
        tracing::trace!(method, argc = args.len(), "recording call");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                method: method.to_string(),
                args,
            });
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Ok(Value::Nil))
    }
}
