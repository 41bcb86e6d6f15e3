//! Control-channel command set: tokens, argument counts, required
//! permission tiers, and the line parser.

use crate::auth::Permission;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cmd {
    User, Pass, Acct, Cwd, Cdup, Smnt, Rein, Quit,
    Port, Pasv, Type, Stru, Mode, Retr, Stor, Stou,
    Appe, Allo, Rest, Rnfr, Rnto, Abor, Dele, Rmd,
    Mkd, Pwd, List, Nlst, Site, Syst, Stat, Help,
    Noop,
}

impl Cmd {
    pub const ALL: [Cmd; 33] = [
        Cmd::User, Cmd::Pass, Cmd::Acct, Cmd::Cwd, Cmd::Cdup, Cmd::Smnt, Cmd::Rein, Cmd::Quit,
        Cmd::Port, Cmd::Pasv, Cmd::Type, Cmd::Stru, Cmd::Mode, Cmd::Retr, Cmd::Stor, Cmd::Stou,
        Cmd::Appe, Cmd::Allo, Cmd::Rest, Cmd::Rnfr, Cmd::Rnto, Cmd::Abor, Cmd::Dele, Cmd::Rmd,
        Cmd::Mkd, Cmd::Pwd, Cmd::List, Cmd::Nlst, Cmd::Site, Cmd::Syst, Cmd::Stat, Cmd::Help,
        Cmd::Noop,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Cmd::User => "USER",
            Cmd::Pass => "PASS",
            Cmd::Acct => "ACCT",
            Cmd::Cwd => "CWD",
            Cmd::Cdup => "CDUP",
            Cmd::Smnt => "SMNT",
            Cmd::Rein => "REIN",
            Cmd::Quit => "QUIT",
            Cmd::Port => "PORT",
            Cmd::Pasv => "PASV",
            Cmd::Type => "TYPE",
            Cmd::Stru => "STRU",
            Cmd::Mode => "MODE",
            Cmd::Retr => "RETR",
            Cmd::Stor => "STOR",
            Cmd::Stou => "STOU",
            Cmd::Appe => "APPE",
            Cmd::Allo => "ALLO",
            Cmd::Rest => "REST",
            Cmd::Rnfr => "RNFR",
            Cmd::Rnto => "RNTO",
            Cmd::Abor => "ABOR",
            Cmd::Dele => "DELE",
            Cmd::Rmd => "RMD",
            Cmd::Mkd => "MKD",
            Cmd::Pwd => "PWD",
            Cmd::List => "LIST",
            Cmd::Nlst => "NLST",
            Cmd::Site => "SITE",
            Cmd::Syst => "SYST",
            Cmd::Stat => "STAT",
            Cmd::Help => "HELP",
            Cmd::Noop => "NOOP",
        }
    }

    pub fn min_args(self) -> usize {
        match self {
            Cmd::User | Cmd::Pass | Cmd::Acct | Cmd::Cwd | Cmd::Smnt | Cmd::Port | Cmd::Type
            | Cmd::Stru | Cmd::Mode | Cmd::Retr | Cmd::Stor | Cmd::Appe | Cmd::Allo | Cmd::Rest
            | Cmd::Rnfr | Cmd::Rnto | Cmd::Dele | Cmd::Rmd | Cmd::Mkd | Cmd::Site => 1,
            _ => 0,
        }
    }

    pub fn opt_args(self) -> usize {
        match self {
            Cmd::Allo => 2,
            Cmd::Type | Cmd::List | Cmd::Nlst | Cmd::Stat | Cmd::Help => 1,
            _ => 0,
        }
    }

    /// Minimum session tier allowed to issue this command.
    pub fn required_permission(self) -> Permission {
        match self {
            Cmd::User | Cmd::Pass | Cmd::Acct | Cmd::Rein | Cmd::Quit | Cmd::Help | Cmd::Noop => {
                Permission::None
            }
            Cmd::Retr => Permission::Read,
            Cmd::Stou | Cmd::Allo | Cmd::Mkd | Cmd::Rest => Permission::Write,
            Cmd::Stor | Cmd::Appe | Cmd::Rnfr | Cmd::Rnto | Cmd::Dele | Cmd::Rmd => {
                Permission::Admin
            }
            _ => Permission::View,
        }
    }

    pub fn lookup(token: &str) -> Option<Cmd> {
        Cmd::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.token().eq_ignore_ascii_case(token))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The line does not end with CRLF (too long for the receive buffer, or
    /// malformed).
    BadTermination,
    /// Unrecognized command token or undecodable line.
    Unknown,
    NotEnoughArgs,
    TooManyArgs,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub cmd: Cmd,
    pub args: Vec<String>,
}

/// Parses one received control segment: CRLF-terminated command token plus
/// whitespace-separated arguments, checked against the command's argument
/// counts.
pub fn parse_line(raw: &[u8]) -> Result<ParsedCommand, ParseError> {
    if raw.len() < 2 || !raw.ends_with(b"\r\n") {
        return Err(ParseError::BadTermination);
    }
    let line = std::str::from_utf8(&raw[..raw.len() - 2]).map_err(|_| ParseError::Unknown)?;

    let mut tokens = line.split_whitespace();
    let token = tokens.next().ok_or(ParseError::Unknown)?;
    let cmd = Cmd::lookup(token).ok_or(ParseError::Unknown)?;

    let args: Vec<String> = tokens.map(str::to_string).collect();
    if args.len() < cmd.min_args() {
        return Err(ParseError::NotEnoughArgs);
    }
    if args.len() > cmd.min_args() + cmd.opt_args() {
        return Err(ParseError::TooManyArgs);
    }
    Ok(ParsedCommand { cmd, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_and_arguments() {
        let parsed = parse_line(b"USER admin\r\n").unwrap();
        assert_eq!(parsed.cmd, Cmd::User);
        assert_eq!(parsed.args, vec!["admin"]);

        let parsed = parse_line(b"TYPE A N\r\n").unwrap();
        assert_eq!(parsed.cmd, Cmd::Type);
        assert_eq!(parsed.args, vec!["A", "N"]);

        let parsed = parse_line(b"list\r\n").unwrap();
        assert_eq!(parsed.cmd, Cmd::List);
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn termination_is_mandatory() {
        assert_eq!(parse_line(b"NOOP").unwrap_err(), ParseError::BadTermination);
        assert_eq!(parse_line(b"NOOP\n").unwrap_err(), ParseError::BadTermination);
        assert_eq!(parse_line(b"\r\n").unwrap_err(), ParseError::Unknown);
    }

    #[test]
    fn argument_counts_are_enforced() {
        assert_eq!(parse_line(b"USER\r\n").unwrap_err(), ParseError::NotEnoughArgs);
        assert_eq!(
            parse_line(b"NOOP please\r\n").unwrap_err(),
            ParseError::TooManyArgs
        );
        assert_eq!(
            parse_line(b"CWD a b\r\n").unwrap_err(),
            ParseError::TooManyArgs
        );
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert_eq!(parse_line(b"FROB x\r\n").unwrap_err(), ParseError::Unknown);
    }

    #[test]
    fn permission_table_spot_checks() {
        assert_eq!(Cmd::User.required_permission(), Permission::None);
        assert_eq!(Cmd::Pwd.required_permission(), Permission::View);
        assert_eq!(Cmd::Retr.required_permission(), Permission::Read);
        assert_eq!(Cmd::Mkd.required_permission(), Permission::Write);
        assert_eq!(Cmd::Stor.required_permission(), Permission::Admin);
        assert_eq!(Cmd::Dele.required_permission(), Permission::Admin);
    }
}
