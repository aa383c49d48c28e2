//! Thread-safe stream storage for concurrent processing
//!
//! This module provides the `AsyncStreamStore` struct, which holds the stream
//! records behind a `DashMap` so operations on different streams proceed in
//! parallel while operations on the same stream are serialized.
//!
//! # Thread Safety
//!
//! `update` runs its closure while holding the lock on the stream's entry.
//! That entry lock is the per-stream mutual exclusion the engine relies on:
//! no other task can observe or touch the stream mid-mutation, and a nested
//! call into the same stream from inside the closure is impossible.

use crate::types::{Stream, StreamError, StreamId};
use dashmap::DashMap;

/// Thread-safe stream store
///
/// Streams are never deleted; a depleted or canceled stream stays queryable.
#[derive(Debug, Default)]
pub struct AsyncStreamStore {
    streams: DashMap<StreamId, Stream>,
}

impl AsyncStreamStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created stream.
    pub fn insert(&self, stream: Stream) {
        self.streams.insert(stream.id, stream);
    }

    /// Remove a stream. Only used to roll back a failed creation.
    pub fn remove(&self, id: StreamId) {
        self.streams.remove(&id);
    }

    /// Snapshot of a stream at the time of the call.
    pub fn get(&self, id: StreamId) -> Option<Stream> {
        self.streams.get(&id).map(|stream| stream.clone())
    }

    /// Whether a stream exists with this id.
    pub fn contains(&self, id: StreamId) -> bool {
        self.streams.contains_key(&id)
    }

    /// Mutate a stream under its entry lock
    ///
    /// The closure sees the current record, can validate and mutate it, and
    /// its result is passed through. No other task can touch the stream while
    /// the closure runs.
    ///
    /// # Errors
    ///
    /// [`StreamError::StreamNotFound`] if no stream exists with this id;
    /// otherwise whatever the closure returns.
    pub fn update<T, F>(&self, id: StreamId, f: F) -> Result<T, StreamError>
    where
        F: FnOnce(&mut Stream) -> Result<T, StreamError>,
    {
        let mut entry = self
            .streams
            .get_mut(&id)
            .ok_or_else(|| StreamError::stream_not_found(id))?;
        f(entry.value_mut())
    }

    /// Snapshots of all streams, sorted by id for deterministic output.
    pub fn all(&self) -> Vec<Stream> {
        let mut streams: Vec<Stream> = self
            .streams
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        streams.sort_by_key(|stream| stream.id);
        streams
    }

    /// Number of streams ever created.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Whether the store holds no streams.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
