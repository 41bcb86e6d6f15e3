//! `feldspar-core`: an FTP server protocol engine over a socket pair of
//! threads per connection.
//!
//! Each accepted control connection runs a protocol interpreter thread (the
//! command loop: parse, gate on login state and permission, reply). Data
//! transfers run on a lazily created data transfer process thread, paired
//! with the interpreter through two length-one message queues that enforce
//! request/response pairing. The file system behind the transfers is
//! whatever implements the `basalt-vfs` volume traits.
//!
//! ```text
//!  client ──ctrl──▶ interpreter thread ──requests──▶ transfer thread
//!                        ▲                               │
//!                        └───────────responses───────────┘
//!  client ──data──────────────────────────────────────▶ (file system)
//! ```

pub mod auth;
mod channel;
mod command;
mod dtp;
pub mod listing;
mod pi;
mod server;

pub use auth::{Authenticator, DefaultCredentials, LoginResult, Permission};
pub use server::FtpServer;

/// Control receive buffer; a command line must fit in one segment.
pub const RECV_BUF_LEN: usize = 200;
/// Reply line cap, terminator excluded.
pub const SEND_BUF_LEN: usize = 200;
/// Longest path argument accepted from the wire.
pub const PATH_BUF_LEN: usize = 200;
/// Per-transfer staging buffer.
pub const DTP_BUFFER_LEN: usize = 600;
pub const MAX_USERNAME_LEN: usize = 16;
pub const MAX_PASSWORD_LEN: usize = 16;
pub const MAX_ACCOUNT_LEN: usize = 16;
