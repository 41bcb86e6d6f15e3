//! The data transfer process: one thread per data connection, driven by
//! interpreter commands over the queue pair, streaming between the volume
//! and the data socket one buffer at a time.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError};
use std::thread;
use std::time::Duration;

use basalt_vfs::{FileInfo, OpenMode, Vfs, VfsDir, VfsFile};
use tracing::{debug, trace};

use crate::DTP_BUFFER_LEN;
use crate::channel::{DtpCommand, TransferRequest, TransferResponse};
use crate::listing::unix_listing_line;

/// Reserved margin when batching name-only listing lines.
const MAX_NAME_LEN: usize = 255;

/// Who dials the data connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DtpMode {
    /// The server connects out to the address from PORT.
    Active,
    /// The client connects to the listener announced by PASV.
    Passive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReprType {
    Ascii,
    Ebcdic,
    Image,
    LocalByte,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReprSubtype {
    NonPrint,
    Telnet,
    CarriageControl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FileStructure {
    File,
    Record,
    Page,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TransferMode {
    Stream,
    Block,
    Compressed,
}

/// Per-session data-plane settings, owned by the interpreter and snapshotted
/// into each transfer thread it spawns.
pub(crate) struct DtpSettings {
    pub mode: DtpMode,
    /// Listener created by PASV, reused across transfer threads.
    pub passive: Option<TcpListener>,
    pub server_data_port: u16,
    pub repr_type: ReprType,
    pub subtype: ReprSubtype,
    pub num_bits: u32,
    pub structure: FileStructure,
    pub transfer_mode: TransferMode,
    /// Data-connection peer; defaults to the control peer, overwritten by
    /// PORT.
    pub client_addr: SocketAddr,
}

impl DtpSettings {
    pub(crate) fn new(client_addr: SocketAddr) -> Self {
        Self {
            mode: DtpMode::Active,
            passive: None,
            server_data_port: 0,
            repr_type: ReprType::Ascii,
            subtype: ReprSubtype::NonPrint,
            num_bits: 8,
            structure: FileStructure::File,
            transfer_mode: TransferMode::Stream,
            client_addr,
        }
    }
}

/// How the spawned thread obtains its data connection.
pub(crate) enum DtpConnect {
    Active(SocketAddr),
    Passive(TcpListener),
}

fn establish(target: DtpConnect) -> io::Result<TcpStream> {
    match target {
        DtpConnect::Active(addr) => TcpStream::connect(addr),
        DtpConnect::Passive(listener) => {
            debug!("waiting for client to establish data connection");
            listener.accept().map(|(conn, _)| conn)
        }
    }
}

/// Transfer thread entry point. Establishes the data connection, serves
/// interpreter commands until a transfer completes or the channel closes,
/// then posts the terminal response.
pub(crate) fn run_transfer(
    target: DtpConnect,
    vfs: Arc<dyn Vfs>,
    from_pi: Receiver<TransferRequest>,
    to_pi: SyncSender<TransferResponse>,
) {
    let conn = match establish(target).and_then(|conn| {
        conn.set_nonblocking(true)?;
        Ok(conn)
    }) {
        Ok(conn) => conn,
        Err(err) => {
            debug!(%err, "failed to open data connection");
            let _ = to_pi.send(TransferResponse::ExitingError);
            return;
        }
    };
    debug!("initialized dtp");

    let mut transfer = Transfer {
        conn,
        vfs,
        active: None,
        file: None,
        dir: None,
        pending_entry: None,
        list_file_only: false,
        buf: [0u8; DTP_BUFFER_LEN],
        used: 0,
        offset: 0,
        finish_pending: false,
    };

    let outcome = transfer.run(&from_pi, &to_pi);

    // Close any file or directory left open by an interrupted transfer.
    transfer.file = None;
    transfer.dir = None;

    let terminal = match outcome {
        Outcome::Finished => TransferResponse::Finished,
        Outcome::Error => TransferResponse::ExitingError,
    };
    if to_pi.send(terminal).is_err() {
        debug!("could not send exiting message to pi");
    }
    debug!("exiting dtp");
}

#[derive(PartialEq, Eq)]
enum Outcome {
    Finished,
    Error,
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

enum Tick {
    Finished,
    Progress,
    Idle,
}

struct Transfer {
    conn: TcpStream,
    vfs: Arc<dyn Vfs>,
    active: Option<DtpCommand>,
    file: Option<Box<dyn VfsFile>>,
    dir: Option<Box<dyn VfsDir>>,
    /// Next directory entry to render; primed when LIST is accepted.
    pending_entry: Option<FileInfo>,
    /// LIST named a plain file rather than a directory.
    list_file_only: bool,
    buf: [u8; DTP_BUFFER_LEN],
    used: usize,
    offset: usize,
    finish_pending: bool,
}

impl Transfer {
    fn run(
        &mut self,
        from_pi: &Receiver<TransferRequest>,
        to_pi: &SyncSender<TransferResponse>,
    ) -> Outcome {
        loop {
            // A new command only blocks when nothing is in flight.
            let request = if self.active.is_none() {
                match from_pi.recv() {
                    Ok(request) => Some(request),
                    Err(_) => {
                        debug!("command queue disconnected");
                        return Outcome::Error;
                    }
                }
            } else {
                match from_pi.try_recv() {
                    Ok(request) => Some(request),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => {
                        debug!("command queue disconnected");
                        return Outcome::Error;
                    }
                }
            };

            if let Some(request) = request {
                debug!(command = request.command.name(), "received pi command");
                let (response, flow) = self.execute_command(request);
                if flow == Flow::Exit {
                    return Outcome::Error;
                }
                if to_pi.send(response).is_err() {
                    debug!("failed to send response message to pi");
                    return Outcome::Error;
                }
            }

            match self.send_receive_tick() {
                Ok(Tick::Finished) => return Outcome::Finished,
                Ok(Tick::Progress) => {}
                Ok(Tick::Idle) => {
                    if self.active.is_some() {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
                Err(()) => return Outcome::Error,
            }
        }
    }

    /// Applies one interpreter command: opens the file or directory and arms
    /// the transfer, or adjusts the one in flight.
    fn execute_command(&mut self, request: TransferRequest) -> (TransferResponse, Flow) {
        use TransferResponse::*;

        let path = request.path.as_deref();
        let response = match request.command {
            DtpCommand::Retr => {
                if self.active.is_some() {
                    Rejected
                } else {
                    match self.vfs.open(path.unwrap_or(""), OpenMode::Read) {
                        Ok(file) => {
                            self.file = Some(file);
                            self.active = Some(DtpCommand::Retr);
                            Accepted
                        }
                        Err(err) => {
                            debug!(%err, "could not open file for reading");
                            Rejected
                        }
                    }
                }
            }
            DtpCommand::Stor | DtpCommand::Appe => {
                if self.active.is_some() {
                    Rejected
                } else {
                    let mode = if request.command == DtpCommand::Stor {
                        OpenMode::CreateAlways
                    } else {
                        OpenMode::Append
                    };
                    match self.vfs.open(path.unwrap_or(""), mode) {
                        Ok(file) => {
                            self.file = Some(file);
                            self.active = Some(request.command);
                            Accepted
                        }
                        Err(err) => {
                            debug!(%err, "could not open file for writing");
                            Rejected
                        }
                    }
                }
            }
            DtpCommand::Rest => match self.active {
                Some(DtpCommand::Retr) | Some(DtpCommand::Stor) | Some(DtpCommand::Appe) => {
                    let offset = path.map(|arg| arg.trim().parse().unwrap_or(0)).unwrap_or(0);
                    match self.file.as_mut() {
                        Some(file) => {
                            if file.seek(offset).is_ok() {
                                Accepted
                            } else {
                                Rejected
                            }
                        }
                        _ => Rejected,
                    }
                }
                Some(DtpCommand::List) | Some(DtpCommand::Nlst) => Rejected,
                _ => Superfluous,
            },
            DtpCommand::Abor => {
                let response = match self.active {
                    Some(DtpCommand::Retr) | Some(DtpCommand::Stor) | Some(DtpCommand::Appe) => {
                        self.file = None;
                        self.dir = None;
                        Accepted
                    }
                    Some(DtpCommand::List) | Some(DtpCommand::Nlst) => Accepted,
                    _ => Superfluous,
                };
                self.active = None;
                response
            }
            DtpCommand::List => {
                let path = path.unwrap_or(".");
                match self.vfs.stat(path) {
                    Ok(info) if info.is_dir => match self.vfs.opendir(path) {
                        Ok(mut dir) => match dir.next_entry() {
                            Ok(first) => {
                                self.pending_entry = first;
                                self.dir = Some(dir);
                                self.list_file_only = false;
                                self.active = Some(DtpCommand::List);
                                Accepted
                            }
                            Err(err) => {
                                debug!(%err, "could not prime directory listing");
                                Rejected
                            }
                        },
                        Err(err) => {
                            debug!(%err, "could not open directory");
                            Rejected
                        }
                    },
                    Ok(info) => {
                        self.pending_entry = Some(info);
                        self.list_file_only = true;
                        self.active = Some(DtpCommand::List);
                        Accepted
                    }
                    Err(err) => {
                        debug!(%err, "could not stat listing target");
                        Rejected
                    }
                }
            }
            DtpCommand::Nlst => {
                if self.active.is_some() {
                    Rejected
                } else {
                    match self.vfs.opendir(path.unwrap_or("")) {
                        Ok(dir) => {
                            self.dir = Some(dir);
                            self.active = Some(DtpCommand::Nlst);
                            Accepted
                        }
                        Err(err) => {
                            debug!(%err, "could not open directory for name listing");
                            Rejected
                        }
                    }
                }
            }
            DtpCommand::Close => {
                self.file = None;
                self.dir = None;
                return (Accepted, Flow::Exit);
            }
        };

        // A freshly accepted command starts from an empty transfer buffer.
        if response == Accepted {
            self.used = 0;
            self.offset = 0;
            self.finish_pending = false;
        }

        debug!(response = response.name(), "processed pi command");
        (response, Flow::Continue)
    }

    /// One streaming step: refill the buffer from the source, move bytes
    /// over the socket (or into the file for uploads), and finish when the
    /// source is drained and the buffer empty.
    fn send_receive_tick(&mut self) -> Result<Tick, ()> {
        let mut progress = false;

        // Fill the buffer for the sending commands.
        if self.used == 0 {
            match self.active {
                Some(DtpCommand::Retr) => {
                    let file = self.file.as_mut().ok_or(())?;
                    let n = file.read(&mut self.buf).map_err(|err| {
                        debug!(%err, "failed to read file from volume");
                    })?;
                    self.used = n;
                    if n < DTP_BUFFER_LEN {
                        // Short read: end of file.
                        self.finish_pending = true;
                    }
                    if n > 0 {
                        progress = true;
                    }
                }
                Some(DtpCommand::List) => {
                    if self.list_file_only {
                        if let Some(info) = self.pending_entry.take() {
                            let line = unix_listing_line(&info);
                            let n = line.len().min(DTP_BUFFER_LEN);
                            self.buf[..n].copy_from_slice(&line.as_bytes()[..n]);
                            self.used = n;
                            progress = true;
                        }
                        self.finish_pending = true;
                    } else {
                        loop {
                            let Some(info) = self.pending_entry.clone() else {
                                self.finish_pending = true;
                                break;
                            };
                            let line = unix_listing_line(&info);
                            if self.used + line.len() > DTP_BUFFER_LEN {
                                // Entry stays pending for the next buffer.
                                break;
                            }
                            self.buf[self.used..self.used + line.len()]
                                .copy_from_slice(line.as_bytes());
                            self.used += line.len();
                            progress = true;
                            let dir = self.dir.as_mut().ok_or(())?;
                            match dir.next_entry() {
                                Ok(next) => self.pending_entry = next,
                                Err(err) => {
                                    debug!(%err, "failed to read directory from volume");
                                    return Err(());
                                }
                            }
                        }
                    }
                }
                Some(DtpCommand::Nlst) => {
                    while self.used + MAX_NAME_LEN + 3 < DTP_BUFFER_LEN {
                        let dir = self.dir.as_mut().ok_or(())?;
                        match dir.next_entry() {
                            Ok(Some(info)) => {
                                let mut line = info.name;
                                line.push_str("\r\n");
                                let n = line.len().min(DTP_BUFFER_LEN - self.used);
                                self.buf[self.used..self.used + n]
                                    .copy_from_slice(&line.as_bytes()[..n]);
                                self.used += n;
                                progress = true;
                            }
                            Ok(None) => {
                                self.finish_pending = true;
                                break;
                            }
                            Err(err) => {
                                debug!(%err, "failed to read directory from volume");
                                return Err(());
                            }
                        }
                    }
                }
                _ => {}
            }
            if self.used != 0 {
                trace!(bytes = self.used, "queued data to send");
            }
        }

        // Move bytes over the data socket.
        match self.active {
            Some(DtpCommand::Stor) | Some(DtpCommand::Appe) => {
                if self.used == 0 {
                    match self.conn.read(&mut self.buf) {
                        Ok(0) => {
                            // Remote half-close ends the upload.
                            debug!("receive connection closed");
                            self.finish_pending = true;
                        }
                        Ok(n) => {
                            self.used = n;
                            progress = true;
                            trace!(bytes = n, "received");
                        }
                        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                        Err(err) => {
                            debug!(%err, "failed to receive data from socket");
                            return Err(());
                        }
                    }
                }
            }
            Some(DtpCommand::Retr) | Some(DtpCommand::List) | Some(DtpCommand::Nlst) => {
                if self.used > 0 {
                    match self.conn.write(&self.buf[self.offset..self.used]) {
                        Ok(0) => {
                            debug!("send connection closed unexpectedly");
                            return Err(());
                        }
                        Ok(n) => {
                            progress = true;
                            trace!(bytes = n, "sent");
                            if n >= self.used - self.offset {
                                self.used = 0;
                                self.offset = 0;
                            } else {
                                self.offset += n;
                            }
                        }
                        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                        Err(err) => {
                            debug!(%err, "failed to send data to socket");
                            return Err(());
                        }
                    }
                }
            }
            _ => {}
        }

        // Write received bytes through to the volume, tolerating short
        // writes.
        if matches!(self.active, Some(DtpCommand::Stor) | Some(DtpCommand::Appe))
            && self.used > self.offset
        {
            let file = self.file.as_mut().ok_or(())?;
            match file.write(&self.buf[self.offset..self.used]) {
                Ok(n) => {
                    self.offset += n;
                    progress = true;
                    if self.offset == self.used {
                        self.offset = 0;
                        self.used = 0;
                    }
                }
                Err(err) => {
                    debug!(%err, "could not write buffered data to file");
                    return Err(());
                }
            }
        }

        if self.used == 0 && self.finish_pending {
            debug!("finished current transfer");
            self.finish_pending = false;
            self.file = None;
            self.dir = None;
            return Ok(Tick::Finished);
        }

        Ok(if progress { Tick::Progress } else { Tick::Idle })
    }
}
