//! Size-bounded grouping of events for upload
//!
//! A batch is measured as the JSON array it becomes on the wire, without the
//! brackets: each event's compact JSON plus one comma between neighbours.
//! Whatever wraps the array in the request body is the caller's to subtract
//! from the limit.

use serde::Serialize;
use std::io;

/// Ingestion request size limit
pub const MAX_BATCH_BYTES: usize = 1_048_576;

/// Contiguous run of events sent in one upload call
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<'a, T> {
    events: &'a [T],
    byte_size: usize,
}

impl<'a, T> Batch<'a, T> {
    pub fn events(&self) -> &'a [T] {
        self.events
    }

    /// Serialized sizes of the events plus the commas separating them
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Split `events` greedily into batches of at most `limit` bytes
///
/// Order is preserved and every event lands in exactly one batch. An event
/// larger than `limit` on its own gets a batch to itself. The iterator is
/// lazy and holds no state beyond its position.
pub fn batch<T: Serialize>(events: &[T], limit: usize) -> Batches<'_, T> {
    Batches {
        events,
        limit,
        pos: 0,
        carried: None,
    }
}

/// Iterator returned by [`batch`]
#[derive(Debug)]
pub struct Batches<'a, T> {
    events: &'a [T],
    limit: usize,
    pos: usize,
    /// Size of `events[pos]` if it was measured by the previous batch
    carried: Option<usize>,
}

impl<'a, T: Serialize> Iterator for Batches<'a, T> {
    type Item = serde_json::Result<Batch<'a, T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.events.len() {
            return None;
        }

        let start = self.pos;
        let mut total = 0usize;
        while self.pos < self.events.len() {
            let size = match self.carried.take() {
                Some(size) => size,
                None => match serialized_len(&self.events[self.pos]) {
                    Ok(size) => size,
                    Err(e) => {
                        self.pos = self.events.len();
                        return Some(Err(e));
                    },
                },
            };

            let separator = usize::from(self.pos > start);
            if self.pos > start && total + separator + size > self.limit {
                self.carried = Some(size);
                break;
            }
            total += separator + size;
            self.pos += 1;
        }

        Some(Ok(Batch {
            events: &self.events[start..self.pos],
            byte_size: total,
        }))
    }
}

/// Byte length of the compact JSON form of `value`
pub fn serialized_len<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<usize> {
    let mut counter = ByteCounter(0);
    serde_json::to_writer(&mut counter, value)?;
    Ok(counter.0)
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
