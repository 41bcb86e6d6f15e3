//! The multi-reader byte ring: reservation-based writes, per-reader
//! notification protocol, and overrun resolution.
//!
//! # Write protocol
//!
//! 1. Under the lock, compute the minimum free space across readers. If the
//!    write does not fit and some reader permits overwriting, resolve the
//!    overrun (disable or skip those readers) to raise the minimum. Reserve
//!    the resulting span by advancing the reservation position and count the
//!    write as ongoing.
//! 2. Copy the payload into the reserved span outside the lock, in two
//!    segments when the span wraps the end of storage.
//! 3. Re-take the lock. The writer that drops the ongoing count to zero
//!    publishes: the committed position advances to the reservation position
//!    and idle or previously aborted readers with readable bytes are woken.
//!
//! Overlapping writers therefore become visible atomically, in reservation
//! order, and only the last of them dispatches notifications.
//!
//! # Reader protocol
//!
//! Each reader receives one contiguous span at a time and reports back with
//! [`MultiReaderRing::read_complete`] (or, after an abort request,
//! [`MultiReaderRing::abort_complete`]). Completion either re-notifies the
//! reader with the next contiguous span or parks it idle. A span never
//! crosses the end of storage: a wrapping write is delivered as two
//! back-to-back notifications.

use std::cell::UnsafeCell;
use std::ptr;
use std::slice;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::port;
use crate::reader::{OverrunPolicy, ReaderId, ReaderSlot, ReaderStatus, RingReader, RingSink};

/// Errors surfaced by ring construction and the write path.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    #[error("ring storage must be at least one byte")]
    EmptyBuffer,

    #[error("a ring needs at least one reader")]
    NoReaders,

    #[error("skip-on-overrun readers must support aborting")]
    AbortRequired,

    #[error("reader is not registered with this ring")]
    UnknownReader,

    #[error("ring lock poisoned")]
    Lock,
}

/// Shared mutable ring state; every field only changes under the lock.
struct RingState {
    /// Committed end of published data.
    write_pos: usize,
    /// End of in-flight reservations; never more than the minimum reader
    /// space ahead of any completion position.
    resv_pos: usize,
    /// Writers currently copying payload between reservation and
    /// publication. Publication is deferred while this is non-zero.
    ongoing_writes: usize,
    readers: Vec<ReaderSlot>,
}

/// A bounded byte ring with one logical write edge and any number of
/// registered readers, each consuming at its own pace under its own overrun
/// policy.
pub struct MultiReaderRing {
    /// Byte storage. Writers copy into spans they reserved under the lock;
    /// sinks read spans they were notified of. The reservation protocol keeps
    /// live spans disjoint, so access goes through raw pointers rather than
    /// the lock.
    storage: Box<[UnsafeCell<u8>]>,
    capacity: usize,
    state: Mutex<RingState>,
}

// SAFETY: `storage` is only written inside spans reserved under `state` and
// only read inside spans published to exactly one reader; `state` guards all
// remaining fields.
unsafe impl Send for MultiReaderRing {}
unsafe impl Sync for MultiReaderRing {}

/// Moves `pos` forward by `len` bytes, wrapping at `capacity`.
#[inline(always)]
fn advance(capacity: usize, pos: usize, len: usize) -> usize {
    if pos < capacity - len {
        pos + len
    } else {
        pos - (capacity - len)
    }
}

/// Free bytes between the reservation edge and this reader's completion
/// position. Disabled readers never limit writers.
fn slot_remaining(capacity: usize, resv_pos: usize, slot: &ReaderSlot) -> usize {
    match slot.status {
        ReaderStatus::Disabled | ReaderStatus::Disabling => capacity,
        _ if slot.is_full => 0,
        _ => {
            if slot.read_complete_pos > resv_pos {
                slot.read_complete_pos - resv_pos
            } else {
                capacity - (resv_pos - slot.read_complete_pos)
            }
        }
    }
}

/// Like [`slot_remaining`], but counting space an overrun resolution could
/// reclaim from this reader.
fn slot_overwritable(capacity: usize, resv_pos: usize, slot: &ReaderSlot) -> usize {
    if slot.policy == OverrunPolicy::Blocking {
        slot_remaining(capacity, resv_pos, slot)
    } else {
        capacity
    }
}

/// Published bytes readable by this reader without wrapping: up to the write
/// position, or to the end of storage when the unread region wraps (or the
/// reader is full, where completion and write position coincide).
fn slot_continuous_readable(capacity: usize, write_pos: usize, slot: &ReaderSlot) -> usize {
    port::fence();
    if slot.read_complete_pos > write_pos || slot.is_full {
        capacity - slot.read_complete_pos
    } else {
        write_pos - slot.read_complete_pos
    }
}

impl RingState {
    fn remaining_space(&self, capacity: usize) -> usize {
        self.readers
            .iter()
            .map(|slot| slot_remaining(capacity, self.resv_pos, slot))
            .min()
            .unwrap_or(capacity)
    }

    fn overwritable_space(&self, capacity: usize) -> usize {
        self.readers
            .iter()
            .map(|slot| slot_overwritable(capacity, self.resv_pos, slot))
            .min()
            .unwrap_or(capacity)
    }

    /// Overrun resolver. For every reader short of `requested` bytes, apply
    /// its policy and collect the indices whose sinks must be told to abort.
    /// Returns the minimum space reachable after resolution.
    fn clear_overrun_space(
        &mut self,
        capacity: usize,
        requested: usize,
        aborts: &mut Vec<usize>,
    ) -> usize {
        let resv = self.resv_pos;
        let mut clear = capacity;

        for (i, slot) in self.readers.iter_mut().enumerate() {
            if matches!(
                slot.status,
                ReaderStatus::Disabled | ReaderStatus::Disabling | ReaderStatus::Idle
            ) {
                continue;
            }

            let mut space = slot_remaining(capacity, resv, slot);
            if space < requested {
                match slot.policy {
                    // Hard ceiling; the minimum below truncates the write.
                    OverrunPolicy::Blocking => {}
                    OverrunPolicy::Disable => {
                        if slot.sink.supports_abort() {
                            slot.status = ReaderStatus::Disabling;
                            aborts.push(i);
                        } else {
                            slot.status = ReaderStatus::Disabled;
                        }
                        space = capacity;
                    }
                    OverrunPolicy::Skip => {
                        if slot.status == ReaderStatus::Active {
                            slot.status = ReaderStatus::Aborting;
                            aborts.push(i);
                            // The in-flight span counts as consumed; there is
                            // no telling how far the sink got.
                            slot.read_complete_pos = slot.read_pos;
                            slot.is_full = false;
                        }
                        space = slot_remaining(capacity, resv, slot);
                        if space < requested {
                            // Skip past exactly the deficit.
                            slot.read_complete_pos =
                                advance(capacity, slot.read_complete_pos, requested - space);
                            space = requested;
                        }
                        slot.is_full = space == requested;
                    }
                }
            }

            if space < clear {
                clear = space;
            }
        }
        clear
    }
}

impl MultiReaderRing {
    /// Builds a ring of `capacity` bytes over the given readers, all enabled
    /// and parked at the start of storage.
    pub fn new(capacity: usize, readers: Vec<RingReader>) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::EmptyBuffer);
        }
        if readers.is_empty() {
            return Err(RingError::NoReaders);
        }
        let storage = (0..capacity).map(|_| UnsafeCell::new(0u8)).collect();
        let slots = readers.into_iter().map(ReaderSlot::new).collect();
        Ok(Self {
            storage,
            capacity,
            state: Mutex::new(RingState {
                write_pos: 0,
                resv_pos: 0,
                ongoing_writes: 0,
                readers: slots,
            }),
        })
    }

    /// Ring storage size in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> Result<MutexGuard<'_, RingState>, RingError> {
        let guard = self.state.lock().map_err(|_| RingError::Lock)?;
        port::fence();
        Ok(guard)
    }

    fn unlock(&self, guard: MutexGuard<'_, RingState>) {
        port::fence();
        drop(guard);
    }

    /// Borrows a published span of storage.
    ///
    /// # Safety
    /// `[start, start + len)` must lie inside storage and be published to a
    /// single reader that has not completed it; the reservation protocol then
    /// guarantees no writer touches it concurrently.
    unsafe fn data_span(&self, start: usize, len: usize) -> &[u8] {
        debug_assert!(start + len <= self.capacity);
        unsafe { slice::from_raw_parts((self.storage.as_ptr() as *const u8).add(start), len) }
    }

    /// Delivers up to `data.len()` bytes into the ring, truncating to the
    /// space reachable after overrun resolution. Returns the number of bytes
    /// written; readers will observe exactly those bytes, in write order,
    /// minus whatever the skip policy later sacrifices.
    pub fn write(&self, data: &[u8]) -> Result<usize, RingError> {
        if data.is_empty() {
            return Ok(0);
        }
        // Writes from interrupt context are disabled by configuration on this
        // runtime; soft-drop if it ever reports one.
        if port::interrupt_active() {
            return Ok(0);
        }

        let mut abort_indices: Vec<usize> = Vec::new();
        let mut st = self.lock()?;

        // Size the write: fit in free space, or resolve overruns if some
        // reader volunteers its unread bytes.
        let remaining = st.remaining_space(self.capacity);
        let write_len = if data.len() <= remaining {
            data.len()
        } else {
            let overwritable = st.overwritable_space(self.capacity);
            if overwritable > remaining {
                let requested = data.len().min(self.capacity);
                let cleared = st.clear_overrun_space(self.capacity, requested, &mut abort_indices);
                data.len().min(cleared)
            } else {
                remaining
            }
        };

        // Reserve the span, spilling over the end of storage if needed.
        let write_at = st.resv_pos;
        let continuous = self.capacity - st.resv_pos;
        let (head_len, spill_len) = if write_len >= continuous {
            st.resv_pos = write_len - continuous;
            (continuous, write_len - continuous)
        } else {
            st.resv_pos += write_len;
            (write_len, 0)
        };

        if write_len > 0 {
            let resv = st.resv_pos;
            for slot in &mut st.readers {
                if matches!(slot.status, ReaderStatus::Disabled | ReaderStatus::Disabling) {
                    continue;
                }
                // The reservation edge catching a reader's completion
                // position means this write consumed its last free byte.
                slot.is_full = resv == slot.read_complete_pos;
            }
        }

        st.ongoing_writes += 1;

        let aborts: Vec<(Arc<dyn RingSink>, ReaderId)> = abort_indices
            .iter()
            .map(|&i| (st.readers[i].sink.clone(), ReaderId(i)))
            .collect();
        self.unlock(st);

        for (sink, id) in aborts {
            sink.abort_data(self, id);
        }

        // Payload copy happens outside the lock; nothing is notified of the
        // span until publication below.
        unsafe {
            let base = self.storage.as_ptr() as *mut u8;
            if head_len > 0 {
                ptr::copy_nonoverlapping(data.as_ptr(), base.add(write_at), head_len);
            }
            if spill_len > 0 {
                ptr::copy_nonoverlapping(data.as_ptr().add(head_len), base, spill_len);
            }
        }

        let mut st = self.lock()?;
        st.ongoing_writes -= 1;
        if st.ongoing_writes == 0 {
            self.publish(st);
        } else {
            self.unlock(st);
        }

        Ok(write_len)
    }

    /// Commits all reserved data and wakes readers. Runs on the writer that
    /// dropped the ongoing count to zero; notifications go out after the lock
    /// is released.
    fn publish(&self, mut st: MutexGuard<'_, RingState>) {
        let capacity = self.capacity;
        let old_write = st.write_pos;
        let new_write = st.resv_pos;

        let mut pending: Vec<(Arc<dyn RingSink>, ReaderId, usize, usize)> = Vec::new();
        for (i, slot) in st.readers.iter_mut().enumerate() {
            let wake = match slot.status {
                ReaderStatus::Idle => {
                    // Anchor at the previous committed edge; a reader enabled
                    // mid-write joins at the start of the write in flight.
                    slot.read_complete_pos = old_write;
                    true
                }
                ReaderStatus::Aborted => true,
                _ => false,
            };
            if !wake {
                continue;
            }
            let readable = slot_continuous_readable(capacity, new_write, slot);
            if readable == 0 {
                // Caught up; a zero-length wake would be indistinguishable
                // from a full span.
                continue;
            }
            slot.status = ReaderStatus::Active;
            let start = slot.read_complete_pos;
            slot.read_pos = advance(capacity, start, readable);
            pending.push((slot.sink.clone(), ReaderId(i), start, readable));
        }

        st.write_pos = new_write;
        self.unlock(st);

        for (sink, id, start, len) in pending {
            // SAFETY: the span is published and owned by this reader until it
            // completes.
            let span = unsafe { self.data_span(start, len) };
            sink.notify_data(self, id, span);
        }
    }

    /// The sink finished consuming the bytes of its last notification.
    /// Either re-notifies the reader with the next contiguous span or parks
    /// it idle. Ignored for readers that are not active.
    pub fn read_complete(&self, id: ReaderId) {
        let Ok(mut st) = self.lock() else {
            return;
        };
        let write_pos = st.write_pos;
        let capacity = self.capacity;
        if id.0 >= st.readers.len() {
            return;
        }
        let slot = &mut st.readers[id.0];
        if slot.status != ReaderStatus::Active {
            return;
        }

        slot.is_full = false;
        slot.read_complete_pos = slot.read_pos;

        let readable = slot_continuous_readable(capacity, write_pos, slot);
        let restart = if readable > 0 {
            let start = slot.read_complete_pos;
            slot.read_pos = advance(capacity, start, readable);
            Some((slot.sink.clone(), start, readable))
        } else {
            slot.status = ReaderStatus::Idle;
            None
        };
        self.unlock(st);

        if let Some((sink, start, len)) = restart {
            // SAFETY: span published and owned by this reader.
            let span = unsafe { self.data_span(start, len) };
            sink.notify_data(self, id, span);
        }
    }

    /// The sink acknowledged an abort request. Finalizes a pending disable,
    /// or restarts the reader on surviving data when no writer holds the
    /// ring; otherwise the reader parks until the next publication.
    pub fn abort_complete(&self, id: ReaderId) {
        let Ok(mut st) = self.lock() else {
            return;
        };
        let write_pos = st.write_pos;
        let ongoing = st.ongoing_writes;
        let capacity = self.capacity;
        if id.0 >= st.readers.len() {
            return;
        }
        let slot = &mut st.readers[id.0];

        let restart = match slot.status {
            ReaderStatus::Disabling => {
                slot.status = ReaderStatus::Disabled;
                None
            }
            ReaderStatus::Aborting => {
                // Completion position was already settled when the abort was
                // requested.
                let readable = slot_continuous_readable(capacity, write_pos, slot);
                if readable > 0 && ongoing == 0 {
                    let start = slot.read_complete_pos;
                    slot.read_pos = advance(capacity, start, readable);
                    slot.status = ReaderStatus::Active;
                    Some((slot.sink.clone(), start, readable))
                } else {
                    slot.status = ReaderStatus::Aborted;
                    None
                }
            }
            _ => None,
        };
        self.unlock(st);

        if let Some((sink, start, len)) = restart {
            // SAFETY: span published and owned by this reader.
            let span = unsafe { self.data_span(start, len) };
            sink.notify_data(self, id, span);
        }
    }

    /// Re-enables a disabled reader at the live edge: it will only see data
    /// reserved after this call.
    pub fn reader_enable(&self, id: ReaderId) -> Result<(), RingError> {
        let mut st = self.lock()?;
        let resv = st.resv_pos;
        let slot = st.readers.get_mut(id.0).ok_or(RingError::UnknownReader)?;
        if matches!(slot.status, ReaderStatus::Disabled | ReaderStatus::Disabling) {
            slot.status = ReaderStatus::Idle;
            slot.is_full = false;
            slot.read_pos = resv;
            slot.read_complete_pos = resv;
        }
        self.unlock(st);
        Ok(())
    }

    /// Disables a reader. Best effort: sinks that support aborting are asked
    /// to stand down first and the reader stays in a disabling state until
    /// they acknowledge; others are disabled on the spot.
    pub fn reader_disable(&self, id: ReaderId) -> Result<(), RingError> {
        let mut st = self.lock()?;
        let slot = st.readers.get_mut(id.0).ok_or(RingError::UnknownReader)?;
        let abort = match slot.status {
            ReaderStatus::Disabled | ReaderStatus::Disabling => None,
            _ if slot.sink.supports_abort() => {
                slot.status = ReaderStatus::Disabling;
                Some(slot.sink.clone())
            }
            _ => {
                slot.status = ReaderStatus::Disabled;
                None
            }
        };
        self.unlock(st);

        if let Some(sink) = abort {
            sink.abort_data(self, id);
        }
        Ok(())
    }

    /// Whether every reader has consumed everything. Advisory: the state may
    /// change concurrently.
    pub fn is_empty(&self) -> bool {
        self.remaining_space() == self.capacity
    }

    /// Whether some active reader has no free space left. Advisory.
    pub fn is_full(&self) -> bool {
        let Ok(st) = self.lock() else {
            return false;
        };
        st.readers
            .iter()
            .any(|slot| slot.status == ReaderStatus::Active && slot.is_full)
    }

    /// Minimum free space across readers. Advisory.
    pub fn remaining_space(&self) -> usize {
        let Ok(st) = self.lock() else {
            return 0;
        };
        st.remaining_space(self.capacity)
    }

    /// Free space counting bytes reclaimable from non-blocking readers.
    /// Advisory.
    pub fn overwritable_space(&self) -> usize {
        let Ok(st) = self.lock() else {
            return 0;
        };
        st.overwritable_space(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Consumes every span inside the callback, like a polled console sink.
    #[derive(Default)]
    struct ImmediateSink {
        seen: StdMutex<Vec<u8>>,
    }

    impl RingSink for ImmediateSink {
        fn notify_data(&self, ring: &MultiReaderRing, id: ReaderId, data: &[u8]) {
            self.seen.lock().unwrap().extend_from_slice(data);
            ring.read_complete(id);
        }
    }

    /// Holds spans until the test completes them, like a DMA-driven sink.
    struct TriggeredSink {
        seen: StdMutex<Vec<u8>>,
        pending: StdMutex<Option<ReaderId>>,
        aborts: StdMutex<u32>,
        abortable: bool,
        /// Acknowledge aborts from inside the callback.
        auto_abort: bool,
    }

    impl TriggeredSink {
        fn new(abortable: bool, auto_abort: bool) -> Self {
            Self {
                seen: StdMutex::new(Vec::new()),
                pending: StdMutex::new(None),
                aborts: StdMutex::new(0),
                abortable,
                auto_abort,
            }
        }

        fn complete(&self, ring: &MultiReaderRing) {
            let id = self.pending.lock().unwrap().take().expect("no span pending");
            ring.read_complete(id);
        }

        fn seen(&self) -> Vec<u8> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl RingSink for TriggeredSink {
        fn notify_data(&self, _ring: &MultiReaderRing, id: ReaderId, data: &[u8]) {
            self.seen.lock().unwrap().extend_from_slice(data);
            *self.pending.lock().unwrap() = Some(id);
        }

        fn abort_data(&self, ring: &MultiReaderRing, id: ReaderId) {
            *self.aborts.lock().unwrap() += 1;
            *self.pending.lock().unwrap() = None;
            if self.auto_abort {
                ring.abort_complete(id);
            }
        }

        fn supports_abort(&self) -> bool {
            self.abortable
        }
    }

    fn ring_with(readers: Vec<RingReader>) -> MultiReaderRing {
        MultiReaderRing::new(8, readers).unwrap()
    }

    #[test]
    fn rejects_degenerate_configurations() {
        let sink = Arc::new(ImmediateSink::default());
        let reader = RingReader::new(sink.clone(), OverrunPolicy::Blocking).unwrap();
        assert_eq!(
            MultiReaderRing::new(0, vec![reader]).err(),
            Some(RingError::EmptyBuffer)
        );
        assert_eq!(
            MultiReaderRing::new(8, Vec::new()).err(),
            Some(RingError::NoReaders)
        );
        assert_eq!(
            RingReader::new(sink, OverrunPolicy::Skip).err(),
            Some(RingError::AbortRequired)
        );
    }

    #[test]
    fn empty_ring_observers() {
        let sink = Arc::new(ImmediateSink::default());
        let ring = ring_with(vec![RingReader::new(sink, OverrunPolicy::Blocking).unwrap()]);
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.remaining_space(), 8);
        assert_eq!(ring.overwritable_space(), 8);
        assert_eq!(ring.write(&[]).unwrap(), 0);
    }

    #[test]
    fn immediate_reader_consumes_sequential_writes() {
        let sink = Arc::new(ImmediateSink::default());
        let ring = ring_with(vec![
            RingReader::new(sink.clone(), OverrunPolicy::Blocking).unwrap(),
        ]);

        assert_eq!(ring.write(&[0, 1, 2]).unwrap(), 3);
        assert!(ring.is_empty());
        assert_eq!(ring.write(&[3, 4, 5]).unwrap(), 3);
        assert!(ring.is_empty());
        // The third write wraps; the sink sees the pre-wrap and post-wrap
        // segments as two notifications on the same stack.
        assert_eq!(ring.write(&[6, 7, 8]).unwrap(), 3);
        assert!(ring.is_empty());

        assert_eq!(sink.seen.lock().unwrap().as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn blocking_reader_truncates_writer() {
        let sink = Arc::new(TriggeredSink::new(false, false));
        let ring = ring_with(vec![
            RingReader::new(sink.clone(), OverrunPolicy::Blocking).unwrap(),
        ]);

        assert_eq!(ring.write(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap(), 8);
        assert!(ring.is_full());
        assert_eq!(ring.remaining_space(), 0);

        // No space until the sink completes.
        assert_eq!(ring.write(&[8]).unwrap(), 0);
        assert_eq!(sink.seen().len(), 8);

        sink.complete(&ring);
        assert!(ring.is_empty());

        assert_eq!(ring.write(&[8]).unwrap(), 1);
        assert_eq!(sink.seen(), (0..=8).collect::<Vec<u8>>());
    }

    #[test]
    fn slow_blocking_reader_stalls_fast_reader() {
        let fast = Arc::new(ImmediateSink::default());
        let slow = Arc::new(TriggeredSink::new(false, false));
        let ring = ring_with(vec![
            RingReader::new(fast.clone(), OverrunPolicy::Blocking).unwrap(),
            RingReader::new(slow.clone(), OverrunPolicy::Blocking).unwrap(),
        ]);

        assert_eq!(ring.write(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap(), 8);
        assert_eq!(fast.seen.lock().unwrap().len(), 8);
        assert_eq!(slow.seen().len(), 8);

        // The slow reader has not completed, so nothing fits.
        assert_eq!(ring.write(&[8, 9, 10]).unwrap(), 0);
        assert_eq!(fast.seen.lock().unwrap().len(), 8);

        slow.complete(&ring);
        assert!(ring.is_empty());

        assert_eq!(ring.write(&[8, 9, 10]).unwrap(), 3);
        slow.complete(&ring);
        assert_eq!(fast.seen.lock().unwrap().as_slice(), &(0..=10).collect::<Vec<u8>>()[..]);
        assert_eq!(slow.seen(), (0..=10).collect::<Vec<u8>>());
    }

    #[test]
    fn skip_reader_is_aborted_and_restarted_on_surviving_bytes() {
        let sink = Arc::new(TriggeredSink::new(true, true));
        let ring = ring_with(vec![
            RingReader::new(sink.clone(), OverrunPolicy::Skip).unwrap(),
        ]);

        assert_eq!(ring.write(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap(), 8);
        assert_eq!(sink.seen().len(), 8);

        // Overrun: the outstanding span is revoked, the abort acknowledged
        // inside the callback, and the reader revived at publication with the
        // bytes of the new write.
        assert_eq!(ring.write(&[8, 9, 10]).unwrap(), 3);
        assert_eq!(*sink.aborts.lock().unwrap(), 1);
        assert_eq!(sink.seen(), (0..=10).collect::<Vec<u8>>());

        sink.complete(&ring);
        assert!(ring.is_empty());
    }

    #[test]
    fn skip_reader_with_deferred_abort_acknowledgement() {
        let sink = Arc::new(TriggeredSink::new(true, false));
        let ring = ring_with(vec![
            RingReader::new(sink.clone(), OverrunPolicy::Skip).unwrap(),
        ]);

        assert_eq!(ring.write(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap(), 8);
        assert_eq!(ring.write(&[8, 9, 10]).unwrap(), 3);
        assert_eq!(*sink.aborts.lock().unwrap(), 1);
        // Nothing delivered yet: the sink has not acknowledged.
        assert_eq!(sink.seen().len(), 8);

        ring.abort_complete(ReaderId::from_index(0));
        assert_eq!(sink.seen(), (0..=10).collect::<Vec<u8>>());
    }

    #[test]
    fn disable_policy_drops_reader_on_overrun() {
        let lossy = Arc::new(TriggeredSink::new(false, false));
        let keeper = Arc::new(ImmediateSink::default());
        let ring = ring_with(vec![
            RingReader::new(lossy.clone(), OverrunPolicy::Disable).unwrap(),
            RingReader::new(keeper.clone(), OverrunPolicy::Blocking).unwrap(),
        ]);

        assert_eq!(ring.write(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap(), 8);
        // The lossy reader still holds its span; overrunning it disables it
        // and the write proceeds in full.
        assert_eq!(ring.write(&[8, 9, 10, 11]).unwrap(), 4);
        assert_eq!(lossy.seen().len(), 8);
        assert_eq!(keeper.seen.lock().unwrap().len(), 12);

        // Re-enabled at the live edge: only new data is delivered.
        ring.reader_enable(ReaderId::from_index(0)).unwrap();
        assert_eq!(ring.write(&[12, 13]).unwrap(), 2);
        lossy.complete(&ring);
        let seen = lossy.seen();
        assert_eq!(&seen[8..], &[12, 13]);
    }

    #[test]
    fn wrapping_write_is_split_and_accounted() {
        let sink = Arc::new(TriggeredSink::new(false, false));
        let ring = ring_with(vec![
            RingReader::new(sink.clone(), OverrunPolicy::Blocking).unwrap(),
        ]);

        assert_eq!(ring.write(&[0, 1, 2, 3, 4]).unwrap(), 5);
        sink.complete(&ring);

        // Spills over the end of storage: delivered as [5..8) then [0..2).
        assert_eq!(ring.write(&[5, 6, 7, 8, 9]).unwrap(), 5);
        assert_eq!(sink.seen().len(), 8);
        assert_eq!(ring.remaining_space() + 5, 8);

        sink.complete(&ring);
        assert_eq!(sink.seen().len(), 10);
        sink.complete(&ring);
        assert!(ring.is_empty());
        assert_eq!(sink.seen(), (0..=9).collect::<Vec<u8>>());
    }

    #[test]
    fn disable_with_abort_goes_through_disabling() {
        let sink = Arc::new(TriggeredSink::new(true, false));
        let ring = ring_with(vec![
            RingReader::new(sink.clone(), OverrunPolicy::Blocking).unwrap(),
        ]);
        let id = ReaderId::from_index(0);

        assert_eq!(ring.write(&[0, 1, 2]).unwrap(), 3);
        ring.reader_disable(id).unwrap();
        assert_eq!(*sink.aborts.lock().unwrap(), 1);

        // Until the sink acknowledges, the reader no longer limits writers.
        assert_eq!(ring.remaining_space(), 8);
        ring.abort_complete(id);

        // Disabled readers ignore new data until re-enabled.
        assert_eq!(ring.write(&[3, 4]).unwrap(), 2);
        assert_eq!(sink.seen().len(), 3);

        ring.reader_enable(id).unwrap();
        assert_eq!(ring.write(&[5]).unwrap(), 1);
        sink.complete(&ring);
        let seen = sink.seen();
        assert_eq!(&seen[3..], &[5]);
    }

    #[test]
    fn unknown_reader_ids_are_rejected() {
        let sink = Arc::new(ImmediateSink::default());
        let ring = ring_with(vec![RingReader::new(sink, OverrunPolicy::Blocking).unwrap()]);
        let bogus = ReaderId::from_index(7);
        assert_eq!(ring.reader_enable(bogus).err(), Some(RingError::UnknownReader));
        assert_eq!(ring.reader_disable(bogus).err(), Some(RingError::UnknownReader));
        // Completion callbacks on unknown ids are silently ignored.
        ring.read_complete(bogus);
        ring.abort_complete(bogus);
    }
}
