//! Scripted in-memory transport.
//!
//! Replies are registered against a request prefix and delivered when a
//! matching `send` happens. Clones share state, so a test can keep one
//! handle while a [`Session`](crate::session::Session) owns another.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::NelkoError;
use crate::transport::Transport;

/// What the fake device does when a scripted request arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Deliver the bytes as one read.
    Bytes(Vec<u8>),
    /// Deliver the bytes split across several reads.
    Chunks(Vec<Vec<u8>>),
    /// Swallow the request.
    Silence,
}

#[derive(Debug)]
struct Rule {
    prefix: Vec<u8>,
    reply: Reply,
}

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<Vec<u8>>,
    rules: VecDeque<Rule>,
    inbox: VecDeque<Vec<u8>>,
    fail_send: Option<String>,
    fail_receive: Option<String>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockState>,
    arrived: Condvar,
}

#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others
        self.shared.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer the next send starting with `prefix`.
    ///
    /// Rules are matched in registration order and each fires once.
    pub fn respond_to(&self, prefix: &[u8], reply: Reply) -> &Self {
        self.lock().rules.push_back(Rule {
            prefix: prefix.to_vec(),
            reply,
        });
        self
    }

    /// Shorthand for `respond_to(prefix, Reply::Bytes(bytes))`.
    pub fn reply(&self, prefix: &[u8], bytes: &[u8]) -> &Self {
        self.respond_to(prefix, Reply::Bytes(bytes.to_vec()))
    }

    /// Push bytes into the receive buffer as if they arrived unprompted.
    pub fn inject(&self, bytes: &[u8]) {
        self.lock().inbox.push_back(bytes.to_vec());
        self.shared.arrived.notify_all();
    }

    pub fn fail_next_send(&self, reason: &str) {
        self.lock().fail_send = Some(reason.to_string());
    }

    pub fn fail_next_receive(&self, reason: &str) {
        self.lock().fail_receive = Some(reason.to_string());
    }

    /// Every buffer passed to `send`, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// All sent bytes concatenated.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.lock().sent.concat()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    /// Number of chunks waiting to be received.
    pub fn pending(&self) -> usize {
        self.lock().inbox.len()
    }

    /// Scripted rules that have not fired yet.
    pub fn unused_rules(&self) -> usize {
        self.lock().rules.len()
    }
}

impl Transport for MockTransport {
    fn send(&mut self, data: &[u8]) -> Result<(), NelkoError> {
        let mut state = self.lock();
        if let Some(reason) = state.fail_send.take() {
            return Err(NelkoError::Transport(reason));
        }
        state.sent.push(data.to_vec());

        let matched = state.rules.iter().position(|rule| data.starts_with(&rule.prefix));
        if let Some(rule) = matched.and_then(|index| state.rules.remove(index)) {
            match rule.reply {
                Reply::Bytes(bytes) => state.inbox.push_back(bytes),
                Reply::Chunks(chunks) => state.inbox.extend(chunks),
                Reply::Silence => {}
            }
        }
        drop(state);
        self.shared.arrived.notify_all();
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, NelkoError> {
        let state = self.lock();
        let (mut state, _) = self
            .shared
            .arrived
            .wait_timeout_while(state, timeout, |s| s.inbox.is_empty() && s.fail_receive.is_none())
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(reason) = state.fail_receive.take() {
            return Err(NelkoError::Transport(reason));
        }
        Ok(state.inbox.pop_front())
    }
}
