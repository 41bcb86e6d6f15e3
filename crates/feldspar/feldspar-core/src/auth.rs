//! Session authorization: permission tiers and the pluggable credential
//! check fed by USER/PASS/ACCT.

/// Ordered authorization tiers attached to a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    /// Only log-in commands and help.
    None,
    /// May inspect directories and system parameters, but not download.
    View,
    /// May read files.
    Read,
    /// May create files and directories.
    Write,
    /// May append, rename, overwrite and delete.
    Admin,
}

/// Outcome of a credential check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginResult {
    Failure,
    /// The next credential (password, then account) is required.
    MoreInfoRequired,
    Success(Permission),
}

/// Policy deciding who may log in and at which tier. The protocol
/// interpreter calls this once per credential: with the username alone,
/// then with the password, then with the account if still required. The
/// password is only held for the duration of the call.
pub trait Authenticator: Send + Sync {
    fn check(&self, username: &str, password: Option<&str>, account: Option<&str>) -> LoginResult;
}

struct TableEntry {
    username: &'static str,
    password: Option<&'static str>,
    perm: Permission,
}

// FTP sends credentials in the clear; this table is a development default,
// not a security boundary.
const DEFAULT_TABLE: [TableEntry; 2] = [
    TableEntry {
        username: "anonymous",
        password: None,
        perm: Permission::Read,
    },
    TableEntry {
        username: "admin",
        password: Some("password"),
        perm: Permission::Admin,
    },
];

/// The built-in two-row credential table: `anonymous` reads without a
/// password, `admin` administers with one. Accounts are ignored.
#[derive(Default)]
pub struct DefaultCredentials;

impl Authenticator for DefaultCredentials {
    fn check(&self, username: &str, password: Option<&str>, _account: Option<&str>) -> LoginResult {
        for entry in &DEFAULT_TABLE {
            if entry.username != username {
                continue;
            }
            let Some(expected) = entry.password else {
                return LoginResult::Success(entry.perm);
            };
            let Some(given) = password else {
                return LoginResult::MoreInfoRequired;
            };
            return if given == expected {
                LoginResult::Success(entry.perm)
            } else {
                LoginResult::Failure
            };
        }
        LoginResult::Failure
    }
}
