//! Reader registration: sink capability, overrun policy, and the per-reader
//! state machine driven by the ring.

use std::sync::Arc;

use crate::ring::{MultiReaderRing, RingError};

/// Identifies a reader registered with a [`MultiReaderRing`].
///
/// Ids are the position of the reader in the registration order passed to
/// [`MultiReaderRing::new`], so they stay valid for the lifetime of the ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReaderId(pub(crate) usize);

impl ReaderId {
    /// Builds an id from a registration index.
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// The registration index this id refers to.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// What the writer does to a reader that has too little free space left for
/// an incoming write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrunPolicy {
    /// The reader is a hard ceiling: the write is truncated to the space the
    /// reader still has.
    Blocking,
    /// The reader is disabled and no longer limits writers. It must be
    /// re-enabled explicitly to resume at the live edge.
    Disable,
    /// The in-flight read is aborted and the reader is skipped forward past
    /// exactly the deficit, then restarted on the oldest surviving data.
    /// Requires a sink that supports aborting.
    Skip,
}

/// Lifecycle of a reader. Transitions happen only under the ring lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReaderStatus {
    /// Not participating; writers ignore it entirely.
    Disabled,
    /// Enabled and caught up; woken on the next publication.
    Idle,
    /// A notification is outstanding; the sink owes a completion.
    Active,
    /// An overrun abort was requested; the sink owes an abort completion.
    Aborting,
    /// Abort acknowledged with nothing left to read; revived on the next
    /// publication.
    Aborted,
    /// A disable was requested while a read was in flight; finalized when the
    /// sink acknowledges the abort.
    Disabling,
}

/// The sink side of a ring reader.
///
/// The ring calls [`notify_data`](RingSink::notify_data) with a contiguous
/// span of published bytes. Exactly one notification is in flight per reader:
/// the next span is delivered only after the sink reports back through
/// [`MultiReaderRing::read_complete`]. Sinks may complete synchronously from
/// inside the callback (the span then continues with at most one wrap-around
/// re-notification on the same stack) or hand the span off and complete later
/// from another thread.
///
/// All callbacks are invoked outside the ring lock, on whichever thread
/// triggered them: a writer publishing, or the thread calling
/// `read_complete` / `abort_complete`.
pub trait RingSink: Send + Sync {
    /// New published bytes for this reader. The span stays valid until the
    /// sink calls [`MultiReaderRing::read_complete`] (or the reader is
    /// aborted under the skip policy, after which the bytes may be
    /// overwritten).
    fn notify_data(&self, ring: &MultiReaderRing, id: ReaderId, data: &[u8]);

    /// The outstanding read must be abandoned. The sink acknowledges through
    /// [`MultiReaderRing::abort_complete`], immediately or later. Only called
    /// on sinks that report [`supports_abort`](RingSink::supports_abort).
    fn abort_data(&self, ring: &MultiReaderRing, id: ReaderId) {
        let _ = (ring, id);
    }

    /// Whether this sink honours [`abort_data`](RingSink::abort_data).
    fn supports_abort(&self) -> bool {
        false
    }
}

/// A reader ready to be registered with a ring.
pub struct RingReader {
    pub(crate) sink: Arc<dyn RingSink>,
    pub(crate) policy: OverrunPolicy,
}

impl RingReader {
    /// Pairs a sink with an overrun policy.
    ///
    /// Fails with [`RingError::AbortRequired`] if the skip policy is chosen
    /// for a sink that cannot abort: skipping revokes the span mid-read, so
    /// the sink must be told to stand down.
    pub fn new(sink: Arc<dyn RingSink>, policy: OverrunPolicy) -> Result<Self, RingError> {
        if policy == OverrunPolicy::Skip && !sink.supports_abort() {
            return Err(RingError::AbortRequired);
        }
        Ok(Self { sink, policy })
    }
}

/// Per-reader record owned by the ring; every field is guarded by the ring
/// lock.
pub(crate) struct ReaderSlot {
    pub(crate) sink: Arc<dyn RingSink>,
    pub(crate) policy: OverrunPolicy,
    pub(crate) status: ReaderStatus,
    /// End of the most recent notification span.
    pub(crate) read_pos: usize,
    /// Bytes up to here are confirmed consumed by the sink.
    pub(crate) read_complete_pos: usize,
    /// Set when the writer reservation has reached `read_complete_pos`;
    /// disambiguates a full ring from an empty one.
    pub(crate) is_full: bool,
}

impl ReaderSlot {
    pub(crate) fn new(reader: RingReader) -> Self {
        Self {
            sink: reader.sink,
            policy: reader.policy,
            status: ReaderStatus::Idle,
            read_pos: 0,
            read_complete_pos: 0,
            is_full: false,
        }
    }
}
