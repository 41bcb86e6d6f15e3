//! Log fan-out through the multi-reader ring: the subscriber formats each
//! event once, the bytes go into the ring, and every sink drains them at
//! its own pace under its own overrun policy.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use basalt_ring::{MultiReaderRing, OverrunPolicy, ReaderId, RingReader, RingSink};
use tracing_subscriber::fmt::MakeWriter;

/// Console sink, consuming every span inside the callback. Blocking
/// policy: log bytes are never dropped on its account.
struct ConsoleSink;

impl RingSink for ConsoleSink {
    fn notify_data(&self, ring: &MultiReaderRing, id: ReaderId, data: &[u8]) {
        let _ = io::stderr().write_all(data);
        ring.read_complete(id);
    }
}

/// File sink, best effort: on overrun it is disabled rather than allowed
/// to stall the logger.
struct FileSink {
    file: Mutex<File>,
}

impl RingSink for FileSink {
    fn notify_data(&self, ring: &MultiReaderRing, id: ReaderId, data: &[u8]) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(data);
        }
        ring.read_complete(id);
    }
}

/// The writer handed to the tracing subscriber; every formatted event is
/// one ring write.
#[derive(Clone)]
pub struct RingLogWriter {
    ring: Arc<MultiReaderRing>,
}

impl RingLogWriter {
    /// A ring fanning out to stderr and, when configured, an append-only
    /// log file.
    pub fn stderr_with_optional_file(
        capacity: usize,
        log_file: Option<&str>,
    ) -> anyhow::Result<Self> {
        let mut readers = vec![RingReader::new(Arc::new(ConsoleSink), OverrunPolicy::Blocking)?];
        if let Some(path) = log_file {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            readers.push(RingReader::new(
                Arc::new(FileSink {
                    file: Mutex::new(file),
                }),
                OverrunPolicy::Disable,
            )?);
        }
        let ring = Arc::new(MultiReaderRing::new(capacity, readers)?);
        Ok(Self { ring })
    }
}

impl io::Write for RingLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.ring.write(buf) {
            // Truncated to nothing: the overrun policies already decided
            // what was sacrificed, count the event as consumed.
            Ok(0) if !buf.is_empty() => Ok(buf.len()),
            Ok(n) => Ok(n),
            Err(err) => Err(io::Error::other(err)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for RingLogWriter {
    type Writer = RingLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
