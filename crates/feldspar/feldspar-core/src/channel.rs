//! Messages exchanged between the protocol interpreter and its data
//! transfer process, over a pair of length-one queues that enforce
//! request/response pairing.

use std::sync::mpsc::{SyncSender, TrySendError};
use std::thread;
use std::time::{Duration, Instant};

/// Commands the interpreter delegates to the transfer process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DtpCommand {
    Retr,
    Stor,
    Appe,
    Rest,
    Abor,
    List,
    Nlst,
    /// Terminate the transfer thread.
    Close,
}

impl DtpCommand {
    pub(crate) fn name(self) -> &'static str {
        match self {
            DtpCommand::Retr => "RETR",
            DtpCommand::Stor => "STOR",
            DtpCommand::Appe => "APPE",
            DtpCommand::Rest => "REST",
            DtpCommand::Abor => "ABOR",
            DtpCommand::List => "LIST",
            DtpCommand::Nlst => "NLST",
            DtpCommand::Close => "CLOSE",
        }
    }
}

#[derive(Debug)]
pub(crate) struct TransferRequest {
    pub command: DtpCommand,
    /// Path argument, or the decimal offset for REST.
    pub path: Option<String>,
}

/// What the transfer process reports back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TransferResponse {
    Accepted,
    Rejected,
    Superfluous,
    Finished,
    ExitingError,
}

impl TransferResponse {
    pub(crate) fn name(self) -> &'static str {
        match self {
            TransferResponse::Accepted => "ACCEPTED",
            TransferResponse::Rejected => "REJECTED",
            TransferResponse::Superfluous => "SUPERFLUOUS",
            TransferResponse::Finished => "FINISHED",
            TransferResponse::ExitingError => "EXITING_ERROR",
        }
    }
}

/// Bounded put. The queues are length one, so a full queue means the peer
/// has not consumed the previous message within the deadline.
pub(crate) fn send_with_timeout<T>(
    tx: &SyncSender<T>,
    mut msg: T,
    timeout: Duration,
) -> Result<(), ()> {
    let deadline = Instant::now() + timeout;
    loop {
        match tx.try_send(msg) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(back)) if Instant::now() < deadline => {
                msg = back;
                thread::sleep(Duration::from_millis(1));
            }
            Err(_) => return Err(()),
        }
    }
}
