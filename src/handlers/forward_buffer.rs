//! Bounded send buffer shared by the network forwarders
//!
//! Entries live in two FIFO segments:
//! - `unwritten`: encoded but never sent.
//! - `written`: handed to the last connection, but a peer that silently went
//!   away only shows up as an error on a *later* write, so these are kept
//!   until the next delivery succeeds or the connection is replaced.
//!
//! The total size is capped. Eviction takes the oldest `written` entries first,
//! then the oldest `unwritten` ones, and reports each dropped record.

use crate::core::diagnostics::Diagnostics;
use std::collections::VecDeque;
use std::io;

/// Default byte ceiling (`2 * 4096 + 1024`)
pub const DEFAULT_BUFFER_LIMIT: usize = 2 * 4096 + 1024;

#[derive(Debug, Clone)]
struct Entry {
    payload: Vec<u8>,
    /// Human readable form, reported when the entry is evicted
    rendered: String,
}

#[derive(Debug, Clone)]
pub struct ForwardBuffer {
    limit: usize,
    written: VecDeque<Entry>,
    written_bytes: usize,
    unwritten: VecDeque<Entry>,
    unwritten_bytes: usize,
}

impl ForwardBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            written: VecDeque::new(),
            written_bytes: 0,
            unwritten: VecDeque::new(),
            unwritten_bytes: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Total buffered bytes, both segments
    pub fn len_bytes(&self) -> usize {
        self.written_bytes + self.unwritten_bytes
    }

    pub fn unwritten_len(&self) -> usize {
        self.unwritten.len()
    }

    pub fn written_len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.unwritten.is_empty()
    }

    pub fn push(&mut self, payload: Vec<u8>, rendered: String) {
        self.unwritten_bytes += payload.len();
        self.unwritten.push_back(Entry { payload, rendered });
    }

    /// The connection was replaced: whatever went to the old one may be lost,
    /// so send it again ahead of the unsent entries.
    pub fn requeue_written(&mut self) {
        if self.written.is_empty() {
            return;
        }
        let mut merged = std::mem::take(&mut self.written);
        merged.append(&mut self.unwritten);
        self.unwritten = merged;
        self.unwritten_bytes += self.written_bytes;
        self.written_bytes = 0;
    }

    /// Forget the `written` segment without reporting it. For transports
    /// where a successful send cannot be lost afterwards.
    pub fn release_written(&mut self) {
        self.written.clear();
        self.written_bytes = 0;
    }

    /// Send unwritten entries in order until one fails.
    ///
    /// The first successful send releases the previous `written` segment;
    /// every sent entry then joins `written`.
    pub fn deliver<F>(&mut self, mut send: F) -> io::Result<()>
    where
        F: FnMut(&[u8]) -> io::Result<()>,
    {
        let mut released = false;
        while let Some(entry) = self.unwritten.pop_front() {
            if let Err(e) = send(&entry.payload) {
                self.unwritten.push_front(entry);
                return Err(e);
            }

            if !released {
                self.written.clear();
                self.written_bytes = 0;
                released = true;
            }
            self.unwritten_bytes -= entry.payload.len();
            self.written_bytes += entry.payload.len();
            self.written.push_back(entry);
        }
        Ok(())
    }

    /// Evict oldest entries until the buffer fits its limit. Returns the
    /// number of evicted entries.
    pub fn trim(&mut self, diagnostics: &Diagnostics) -> usize {
        let mut evicted = 0;
        while self.len_bytes() > self.limit {
            if let Some(entry) = self.written.pop_front() {
                self.written_bytes -= entry.payload.len();
                diagnostics.dropped(true, &entry.rendered);
            } else if let Some(entry) = self.unwritten.pop_front() {
                self.unwritten_bytes -= entry.payload.len();
                diagnostics.dropped(false, &entry.rendered);
            } else {
                break;
            }
            evicted += 1;
        }
        evicted
    }

    /// Empty the buffer, reporting every entry that was never sent.
    pub fn discard(&mut self, diagnostics: &Diagnostics) {
        for entry in self.unwritten.drain(..) {
            diagnostics.dropped(false, &entry.rendered);
        }
        self.unwritten_bytes = 0;
        self.written.clear();
        self.written_bytes = 0;
    }
}

impl Default for ForwardBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_LIMIT)
    }
}
