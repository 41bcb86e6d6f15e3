//! `basalt-ring`: a bounded byte ring with one write edge and many
//! independently paced readers.
//!
//! A single logical producer stream fans out to every registered reader:
//! each reader sees every published byte, in order, through a
//! notify/complete handshake, and declares a policy for what happens when
//! the writer catches up with it (block the writer, drop the reader, or skip
//! the reader forward). Typical use is fanning one diagnostic byte stream
//! out to sinks of very different speeds, where the slow sink must not be
//! allowed to stall the fast one unless it explicitly asks to.
//!
//! # Core components
//!
//! - [`MultiReaderRing`]: the ring itself; owns storage and reader records
//! - [`RingReader`] / [`RingSink`]: a sink capability paired with an
//!   [`OverrunPolicy`]
//! - [`ReaderId`]: stable registration index used by completion calls
//!
//! # Architecture
//!
//! ```text
//!                     ┌────────────────────────┐
//!  producer ───write──▶      byte storage      │
//!                     │  (reserve, copy, publish)
//!                     └───┬──────────┬─────────┘
//!                  notify_data    notify_data
//!                         │          │
//!                    ┌────▼───┐ ┌────▼───┐
//!                    │ sink A │ │ sink B │   each completes at its own pace
//!                    └────────┘ └────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use basalt_ring::{MultiReaderRing, OverrunPolicy, RingReader};
//!
//! let reader = RingReader::new(my_sink, OverrunPolicy::Blocking)?;
//! let ring = MultiReaderRing::new(1024, vec![reader])?;
//! let written = ring.write(b"hello")?;
//! // my_sink.notify_data(...) fires with the published span and calls
//! // ring.read_complete(id) when done.
//! ```
//!
//! # Internal modules
//!
//! - `ring`: reservation, publication, overrun resolution
//! - `reader`: sink trait, policies, per-reader state machine
//! - `port`: host shims for the lock fence and interrupt gate

mod port;
mod reader;
mod ring;

pub use reader::{OverrunPolicy, ReaderId, RingReader, RingSink};
pub use ring::{MultiReaderRing, RingError};
