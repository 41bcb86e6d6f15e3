//! The protocol interpreter: one thread per control connection, parsing
//! commands, gating them on login state and permission, and driving the
//! paired data transfer process over the queue pair.

use std::fmt::Write as _;
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use basalt_vfs::Vfs;
use tracing::{debug, trace};

use crate::auth::{Authenticator, LoginResult, Permission};
use crate::channel::{
    DtpCommand, TransferRequest, TransferResponse, send_with_timeout,
};
use crate::command::{self, Cmd, ParseError};
use crate::dtp::{self, DtpConnect, DtpMode, DtpSettings, FileStructure, ReprSubtype, ReprType, TransferMode};
use crate::{
    MAX_ACCOUNT_LEN, MAX_PASSWORD_LEN, MAX_USERNAME_LEN, PATH_BUF_LEN, RECV_BUF_LEN, SEND_BUF_LEN,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoginState {
    WaitUser,
    WaitPass,
    WaitAcct,
    LoggedIn,
}

enum LoginInfo {
    Username,
    Password,
    Account,
}

struct UserState {
    /// Only meaningful once past WaitUser.
    name: String,
    account: String,
    perm: Permission,
    login_state: LoginState,
}

impl Default for UserState {
    fn default() -> Self {
        Self {
            name: String::new(),
            account: String::new(),
            perm: Permission::None,
            login_state: LoginState::WaitUser,
        }
    }
}

/// The interpreter's handle on its transfer process: the thread plus the
/// two length-one queues.
struct DtpLink {
    to_dtp: SyncSender<TransferRequest>,
    from_dtp: Receiver<TransferResponse>,
    thread: JoinHandle<()>,
}

struct Session {
    ctrl: TcpStream,
    index: usize,
    vfs: Arc<dyn Vfs>,
    auth: Arc<dyn Authenticator>,
    /// Bound on queue puts and the close handshake.
    timeout: Duration,
    user: UserState,
    prev_cmd: Cmd,
    /// Path saved by RNFR, consumed by RNTO, dropped after the next command.
    rename_from: Option<String>,
    settings: DtpSettings,
    dtp: Option<DtpLink>,
    reply: String,
}

/// Interpreter thread entry point.
pub(crate) fn run_session(
    ctrl: TcpStream,
    peer: SocketAddr,
    index: usize,
    vfs: Arc<dyn Vfs>,
    auth: Arc<dyn Authenticator>,
    timeout: Duration,
) {
    let mut session = Session {
        ctrl,
        index,
        vfs,
        auth,
        timeout,
        user: UserState::default(),
        prev_cmd: Cmd::Noop,
        rename_from: None,
        settings: DtpSettings::new(peer),
        dtp: None,
        reply: String::new(),
    };
    session.run();
}

impl Session {
    fn run(&mut self) {
        debug!("created new protocol interpreter");

        // Sessions start at the volume root.
        let _ = self.vfs.chdir("/");

        self.set_reply(220, "awaiting input.");
        if self.send_reply().is_err() {
            return;
        }

        loop {
            // The control receive blocks only while no transfer process is
            // attached; otherwise its responses are polled in the same
            // cycle.
            let blocking = self.dtp.is_none();
            if self.receive_and_process(blocking).is_err() {
                break;
            }
            if self.check_dtp_response().is_err() {
                break;
            }
            if !blocking {
                thread::sleep(Duration::from_millis(1));
            }
        }

        self.close_dtp_channel();
        debug!("closed control connection");
    }

    fn receive_and_process(&mut self, blocking: bool) -> Result<(), ()> {
        if self.ctrl.set_nonblocking(!blocking).is_err() {
            return Err(());
        }
        let mut buf = [0u8; RECV_BUF_LEN];
        let received = match self.ctrl.read(&mut buf) {
            Ok(0) => {
                debug!("connection closed by client");
                return Err(());
            }
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock && !blocking => return Ok(()),
            Err(err) => {
                debug!(%err, "failed to read control data");
                return Err(());
            }
        };

        let quit = self.process_ctrl_msg(&buf[..received]);
        if !self.reply.is_empty() && self.send_reply().is_err() {
            return Err(());
        }
        if quit { Err(()) } else { Ok(()) }
    }

    /// Parses and executes one received control segment. Returns true when
    /// the session must end (QUIT).
    fn process_ctrl_msg(&mut self, raw: &[u8]) -> bool {
        self.reply.clear();
        trace!(bytes = raw.len(), "received control data");

        let parsed = match command::parse_line(raw) {
            Ok(parsed) => parsed,
            Err(ParseError::BadTermination) => {
                debug!("invalid command termination");
                self.set_reply(500, "Syntax error: command too long or invalid termination.");
                return false;
            }
            Err(ParseError::Unknown) => {
                debug!("unknown command");
                self.set_reply(500, "Syntax error: command unrecognized.");
                return false;
            }
            Err(ParseError::NotEnoughArgs) => {
                self.set_reply(501, "Not enough arguments provided.");
                return false;
            }
            Err(ParseError::TooManyArgs) => {
                self.set_reply(501, "Too many arguments provided.");
                return false;
            }
        };
        let cmd = parsed.cmd;
        let args = parsed.args;

        if self.user.perm < cmd.required_permission() {
            debug!(command = cmd.token(), "user may not execute command");
            if self.user.login_state == LoginState::LoggedIn {
                self.set_reply(530, "User not permitted to take action.");
            } else {
                self.set_reply(530, "Not logged in.");
            }
            return false;
        }

        let mut quit = false;
        match cmd {
            Cmd::User => self.check_login_credentials(LoginInfo::Username, &args[0]),
            Cmd::Pass => {
                if self.prev_cmd == Cmd::User {
                    self.check_login_credentials(LoginInfo::Password, &args[0]);
                } else {
                    self.set_reply(503, "Bad sequence of commands.");
                }
            }
            Cmd::Acct => self.check_login_credentials(LoginInfo::Account, &args[0]),
            Cmd::Cwd | Cmd::Smnt => match self.vfs.chdir(&args[0]) {
                Ok(()) => self.set_reply(250, "Requested file action okay, completed."),
                Err(_) => self.set_reply(550, "Requested action not taken."),
            },
            Cmd::Cdup => match self.vfs.chdir("/") {
                Ok(()) => self.set_reply(200, "Command successful."),
                Err(_) => self.set_reply(550, "Requested action not taken."),
            },
            Cmd::Rein => {
                self.user.login_state = LoginState::WaitUser;
                self.user.perm = Permission::None;
                self.set_reply(200, "Command successful.");
            }
            Cmd::Quit => {
                self.set_reply(200, "Command successful.");
                quit = true;
            }
            Cmd::Port => self.set_data_port(&args[0]),
            Cmd::Pasv => self.set_passive(),
            Cmd::Type => self.set_type(&args),
            Cmd::Stru => self.set_structure(&args[0]),
            Cmd::Mode => self.set_transfer_mode(&args[0]),
            Cmd::Retr => self.execute_fs_command(DtpCommand::Retr, first_arg(&args)),
            Cmd::Stor => self.execute_fs_command(DtpCommand::Stor, first_arg(&args)),
            Cmd::Stou => self.set_reply(502, "Command not implemented."),
            Cmd::Appe => self.execute_fs_command(DtpCommand::Appe, first_arg(&args)),
            Cmd::Allo | Cmd::Noop => self.set_reply(200, "Command okay."),
            Cmd::Rest => self.execute_fs_command(DtpCommand::Rest, first_arg(&args)),
            Cmd::Rnfr => {
                if self.rename_from.is_some() || args[0].len() >= PATH_BUF_LEN {
                    debug!("cannot save rename source, no buffer");
                    self.set_reply(451, "Requested action aborted: not enough buffer.");
                } else {
                    self.rename_from = Some(args[0].clone());
                    self.set_reply(350, "Requested file action pending further information.");
                }
            }
            Cmd::Rnto => {
                let pending = if self.prev_cmd == Cmd::Rnfr {
                    self.rename_from.take()
                } else {
                    None
                };
                match pending {
                    Some(from) => match self.vfs.rename(&from, &args[0]) {
                        Ok(()) => self.set_reply(250, "Requested file action okay, completed."),
                        Err(_) => self.set_reply(553, "File name not allowed."),
                    },
                    None => self.set_reply(503, "Bad sequence of commands."),
                }
            }
            Cmd::Abor => self.execute_fs_command(DtpCommand::Abor, None),
            Cmd::Dele => match self.vfs.remove(&args[0]) {
                Ok(()) => self.set_reply(250, "Requested file action okay, completed."),
                Err(_) => self.set_reply(550, "Requested action not taken."),
            },
            Cmd::Rmd => match self.vfs.rmdir(&args[0]) {
                Ok(()) => self.set_reply(250, "Requested file action okay, completed."),
                Err(_) => self.set_reply(550, "Requested action not taken."),
            },
            Cmd::Mkd => match self.vfs.mkdir(&args[0]) {
                Ok(()) => self.set_reply(250, "Requested file action okay, completed."),
                Err(_) => self.set_reply(550, "Requested action not taken."),
            },
            Cmd::Pwd => match self.vfs.getcwd() {
                Ok(path) => {
                    self.set_reply(250, "");
                    self.append_reply(&path);
                }
                Err(_) => self.set_reply(550, "Requested action not taken."),
            },
            Cmd::List => self.execute_fs_command(DtpCommand::List, first_arg(&args)),
            Cmd::Nlst => self.execute_fs_command(DtpCommand::Nlst, first_arg(&args)),
            Cmd::Site => self.set_reply(202, "Command not implemented."),
            Cmd::Syst => self.set_reply(215, "ELF system type."),
            Cmd::Stat => self.set_reply(502, "Command not implemented."),
            Cmd::Help => self.set_reply(211, "For help, consult the official FTP documentation."),
        }

        // The rename source survives exactly one follow-up command.
        if self.prev_cmd == Cmd::Rnfr {
            self.rename_from = None;
        }
        self.prev_cmd = cmd;
        quit
    }

    fn check_login_credentials(&mut self, kind: LoginInfo, value: &str) {
        if value.is_empty() {
            self.set_reply(504, "Command not implemented for that parameter.");
            return;
        }
        let max = match kind {
            LoginInfo::Username => MAX_USERNAME_LEN,
            LoginInfo::Password => MAX_PASSWORD_LEN,
            LoginInfo::Account => MAX_ACCOUNT_LEN,
        };
        if value.len() >= max {
            debug!("credential does not fit into buffer");
            self.set_reply(504, "Argument too long.");
            return;
        }
        let in_sequence = match kind {
            LoginInfo::Username => true,
            LoginInfo::Password => self.user.login_state == LoginState::WaitPass,
            LoginInfo::Account => self.user.login_state == LoginState::WaitAcct,
        };
        if !in_sequence {
            debug!("bad sequence of login commands");
            self.set_reply(503, "Bad sequence of commands.");
            return;
        }

        // The password is passed through without being retained.
        let result = match kind {
            LoginInfo::Username => {
                self.user.name = value.to_string();
                self.auth.check(&self.user.name, None, None)
            }
            LoginInfo::Password => self.auth.check(&self.user.name, Some(value), None),
            LoginInfo::Account => {
                self.user.account = value.to_string();
                self.auth.check(&self.user.name, None, Some(&self.user.account))
            }
        };

        let mut granted = Permission::None;
        match result {
            LoginResult::MoreInfoRequired => match self.user.login_state {
                LoginState::WaitUser | LoginState::LoggedIn => {
                    self.user.login_state = LoginState::WaitPass;
                    self.set_reply(331, "User name okay, need password.");
                }
                LoginState::WaitPass => {
                    self.user.login_state = LoginState::WaitAcct;
                    self.set_reply(332, "Need account for login.");
                }
                LoginState::WaitAcct => {
                    self.user.login_state = LoginState::WaitUser;
                    self.set_reply(451, "Requested action aborted: local error in processing.");
                }
            },
            LoginResult::Success(perm) => {
                granted = perm;
                self.user.login_state = LoginState::LoggedIn;
                self.set_reply(230, "User logged in, proceed.");
            }
            LoginResult::Failure => {
                self.user.login_state = LoginState::WaitUser;
                self.set_reply(532, "Login failed.");
            }
        }

        self.user.perm = if self.user.login_state == LoginState::LoggedIn {
            granted
        } else {
            Permission::None
        };
        debug!(permission = ?self.user.perm, "set permission level");
    }

    fn set_type(&mut self, args: &[String]) {
        let mut not_supported = false;
        if args[0].len() != 1 {
            self.set_reply(501, "Syntax error in parameters or arguments.");
            return;
        }
        let repr_type = match args[0].as_bytes()[0] {
            b'A' => ReprType::Ascii,
            b'E' => {
                not_supported = true;
                ReprType::Ebcdic
            }
            b'I' => ReprType::Image,
            b'L' => {
                not_supported = true;
                ReprType::LocalByte
            }
            _ => {
                self.set_reply(501, "Syntax error in parameters or arguments.");
                return;
            }
        };

        let mut subtype = ReprSubtype::NonPrint;
        let mut num_bits = 8;
        if matches!(repr_type, ReprType::Ascii | ReprType::Ebcdic) && args.len() == 2 {
            if args[1].len() != 1 {
                self.set_reply(501, "Syntax error in parameters or arguments.");
                return;
            }
            subtype = match args[1].as_bytes()[0] {
                b'N' => ReprSubtype::NonPrint,
                b'T' => {
                    not_supported = true;
                    ReprSubtype::Telnet
                }
                b'C' => {
                    not_supported = true;
                    ReprSubtype::CarriageControl
                }
                _ => {
                    self.set_reply(501, "Syntax error in parameters or arguments.");
                    return;
                }
            };
        }
        if repr_type == ReprType::LocalByte {
            match args.get(1).and_then(|arg| arg.parse().ok()) {
                Some(bits) => {
                    num_bits = bits;
                    not_supported = true;
                }
                None => {
                    self.set_reply(501, "Syntax error in parameters or arguments.");
                    return;
                }
            }
        }

        if not_supported {
            self.set_reply(504, "Command not implemented for that parameter.");
            return;
        }
        self.settings.repr_type = repr_type;
        self.settings.subtype = subtype;
        self.settings.num_bits = num_bits;
        self.set_reply(200, "Command okay.");
    }

    fn set_structure(&mut self, arg: &str) {
        if arg.len() != 1 {
            self.set_reply(501, "Syntax error in parameters or arguments.");
            return;
        }
        match arg.as_bytes()[0] {
            b'F' => {
                self.settings.structure = FileStructure::File;
                self.set_reply(200, "Command okay.");
            }
            b'R' | b'P' => self.set_reply(504, "Command not implemented for that parameter."),
            _ => self.set_reply(501, "Syntax error in parameters or arguments."),
        }
    }

    fn set_transfer_mode(&mut self, arg: &str) {
        if arg.len() != 1 {
            self.set_reply(501, "Syntax error in parameters or arguments.");
            return;
        }
        match arg.as_bytes()[0] {
            b'S' => {
                self.settings.transfer_mode = TransferMode::Stream;
                self.set_reply(200, "Command okay.");
            }
            b'B' | b'C' => self.set_reply(504, "Command not implemented for that parameter."),
            _ => self.set_reply(501, "Syntax error in parameters or arguments."),
        }
    }

    fn set_data_port(&mut self, arg: &str) {
        let Some(addr) = parse_port_argument(arg) else {
            debug!("unable to parse data port string");
            self.set_reply(501, "Syntax error in parameters or arguments.");
            return;
        };
        self.settings.client_addr = addr;
        self.settings.mode = DtpMode::Active;
        self.set_reply(200, "Command successful.");
        debug!(%addr, "set client data port");
    }

    fn set_passive(&mut self) {
        if self.settings.mode != DtpMode::Passive {
            let listener = match TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)) {
                Ok(listener) => listener,
                Err(err) => {
                    debug!(%err, "failed to create passive data socket");
                    self.set_reply(425, "Cannot create socket.");
                    return;
                }
            };
            let port = match listener.local_addr() {
                Ok(addr) => addr.port(),
                Err(err) => {
                    debug!(%err, "failed to get name of passive data socket");
                    self.set_reply(425, "Cannot get port.");
                    return;
                }
            };
            self.settings.passive = Some(listener);
            self.settings.server_data_port = port;
            self.settings.mode = DtpMode::Passive;

            // A transfer thread armed for the old mode is useless now.
            if self.dtp.is_some() {
                self.close_dtp_channel();
            }
        }

        // Create the transfer thread so the client can connect to it.
        if self.open_dtp_channel().is_err() {
            self.set_reply(421, "Service not available.");
            return;
        }

        let ip = match self.ctrl.local_addr() {
            Ok(SocketAddr::V4(v4)) => *v4.ip(),
            _ => Ipv4Addr::UNSPECIFIED,
        };
        self.set_reply(227, "Entering Passive Mode ");
        let tuple = passive_tuple(ip, self.settings.server_data_port);
        self.append_reply(&tuple);
    }

    /// Delegates a transfer command to the data transfer process, opening
    /// the channel on first use. The completion replies (150, then 250 or an
    /// error) follow asynchronously from the response queue.
    fn execute_fs_command(&mut self, command: DtpCommand, path: Option<&str>) {
        let path_exists = path
            .map(|p| p == "/" || self.vfs.stat(p).is_ok())
            .unwrap_or(false);
        let needs_path = match command {
            DtpCommand::List => path.is_some(),
            DtpCommand::Retr | DtpCommand::Nlst => true,
            _ => false,
        };
        if needs_path && !path_exists {
            debug!(command = command.name(), "file or path not found");
            self.set_reply(550, "File or path not found.");
            return;
        }

        if path.is_some_and(|p| p.len() >= PATH_BUF_LEN) {
            debug!("cannot execute transfer command, path too long");
            self.set_reply(451, "Requested action aborted: not enough buffer.");
            return;
        }

        if self.dtp.is_none() && self.open_dtp_channel().is_err() {
            self.set_reply(425, "Can't open data connection.");
            return;
        }

        let link = self.dtp.as_ref().expect("transfer channel just opened");
        let request = TransferRequest {
            command,
            path: path.map(str::to_string),
        };
        if send_with_timeout(&link.to_dtp, request, self.timeout).is_err() {
            debug!("could not send message to dtp");
            self.set_reply(451, "Requested action aborted: local error in processing.");
            return;
        }
        debug!(command = command.name(), "sent transfer command to dtp");
    }

    /// Translates a queued transfer-process response into the final client
    /// reply, reaping the thread when it reports a terminal state.
    fn check_dtp_response(&mut self) -> Result<(), ()> {
        let response = {
            let Some(link) = &self.dtp else {
                return Ok(());
            };
            match link.from_dtp.try_recv() {
                Ok(response) => response,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    debug!("dtp response queue disconnected");
                    TransferResponse::ExitingError
                }
            }
        };
        debug!(response = response.name(), "received response from dtp");

        self.reply.clear();
        match response {
            TransferResponse::Accepted => {
                self.set_reply(150, "File status okay; about to open data connection.");
            }
            TransferResponse::Rejected => {
                self.set_reply(450, "Requested file action not taken.");
            }
            TransferResponse::Superfluous | TransferResponse::Finished => {
                self.set_reply(250, "Requested file action okay, completed.");
            }
            TransferResponse::ExitingError => {
                self.set_reply(451, "Requested action aborted: local error in processing.");
            }
        }

        if matches!(
            response,
            TransferResponse::Finished | TransferResponse::ExitingError
        ) {
            if let Some(link) = self.dtp.take() {
                let _ = link.thread.join();
            }
            self.rename_from = None;
            debug!("closed dtp");
        }

        if !self.reply.is_empty() && self.send_reply().is_err() {
            return Err(());
        }
        Ok(())
    }

    fn open_dtp_channel(&mut self) -> Result<(), ()> {
        if self.dtp.is_some() {
            debug!("dtp channel already open");
            return Ok(());
        }

        let (to_dtp, from_pi) = mpsc::sync_channel::<TransferRequest>(1);
        let (to_pi, from_dtp) = mpsc::sync_channel::<TransferResponse>(1);

        let target = match self.settings.mode {
            DtpMode::Active => DtpConnect::Active(self.settings.client_addr),
            DtpMode::Passive => {
                let listener = self
                    .settings
                    .passive
                    .as_ref()
                    .ok_or(())?
                    .try_clone()
                    .map_err(|_| ())?;
                DtpConnect::Passive(listener)
            }
        };

        let vfs = self.vfs.clone();
        let spawned = thread::Builder::new()
            .name(format!("ftp-s-{:03}-dtp", self.index))
            .spawn(move || dtp::run_transfer(target, vfs, from_pi, to_pi));
        match spawned {
            Ok(handle) => {
                debug!("created new dtp thread");
                self.dtp = Some(DtpLink {
                    to_dtp,
                    from_dtp,
                    thread: handle,
                });
                Ok(())
            }
            Err(err) => {
                debug!(%err, "failed to create dtp thread");
                Err(())
            }
        }
    }

    /// Stops the transfer process: CLOSE, a bounded wait for its terminal
    /// response, and otherwise a disconnect it will observe at its next
    /// queue access.
    fn close_dtp_channel(&mut self) {
        let Some(link) = self.dtp.take() else {
            return;
        };

        if link
            .to_dtp
            .try_send(TransferRequest {
                command: DtpCommand::Close,
                path: None,
            })
            .is_err()
        {
            debug!("could not send message to close dtp");
        }

        // Poll twice in case a stale response from an earlier command is
        // still queued.
        let mut exited = false;
        for _ in 0..2 {
            match link.from_dtp.recv_timeout(self.timeout) {
                Ok(TransferResponse::Finished) | Ok(TransferResponse::ExitingError) => {
                    exited = true;
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }

        if exited {
            let _ = link.thread.join();
        } else {
            // Dropping the queue endpoints disconnects the transfer thread;
            // it exits at its next queue access and its sockets close behind
            // it.
            debug!("dtp did not exit in time, detaching");
        }

        self.rename_from = None;
        debug!("closed dtp");
    }

    fn set_reply(&mut self, code: u16, message: &str) {
        self.reply.clear();
        let _ = write!(self.reply, "{code} ");
        if cfg!(not(feature = "terse-replies")) {
            self.reply.push_str(message);
        }
        self.truncate_reply();
    }

    fn append_reply(&mut self, text: &str) {
        self.reply.push_str(text);
        self.truncate_reply();
    }

    fn truncate_reply(&mut self) {
        let mut limit = SEND_BUF_LEN - 2;
        if self.reply.len() > limit {
            while !self.reply.is_char_boundary(limit) {
                limit -= 1;
            }
            self.reply.truncate(limit);
        }
    }

    fn send_reply(&mut self) -> io::Result<()> {
        self.reply.push_str("\r\n");
        trace!(reply = %self.reply.trim_end(), "sending control reply");
        // The control socket may be in non-blocking mode; replies are small
        // and go out whole.
        self.ctrl.set_nonblocking(false)?;
        let result = self.ctrl.write_all(self.reply.as_bytes());
        if result.is_err() {
            debug!("failed to send control data");
        }
        self.reply.clear();
        result
    }
}

fn first_arg(args: &[String]) -> Option<&str> {
    args.first().map(String::as_str)
}

/// Parses the PORT argument `h1,h2,h3,h4,p1,p2` (optionally parenthesized)
/// into the client data address.
pub(crate) fn parse_port_argument(arg: &str) -> Option<SocketAddr> {
    let arg = arg.strip_prefix('(').unwrap_or(arg);
    let arg = arg.strip_suffix(')').unwrap_or(arg);
    let mut fields = [0u8; 6];
    let mut count = 0;
    for piece in arg.split(',') {
        if count == 6 {
            return None;
        }
        fields[count] = piece.trim().parse().ok()?;
        count += 1;
    }
    if count != 6 {
        return None;
    }
    let ip = Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]);
    let port = u16::from_be_bytes([fields[4], fields[5]]);
    Some(SocketAddr::from((ip, port)))
}

/// Renders the PASV address tuple: every byte zero-padded to three digits,
/// port split high byte first.
pub(crate) fn passive_tuple(ip: Ipv4Addr, port: u16) -> String {
    let octets = ip.octets();
    let port = port.to_be_bytes();
    format!(
        "({:03},{:03},{:03},{:03},{:03},{:03})",
        octets[0], octets[1], octets[2], octets[3], port[0], port[1]
    )
}
