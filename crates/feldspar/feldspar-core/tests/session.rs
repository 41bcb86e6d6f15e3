//! End-to-end sessions against a live server on a loopback ephemeral port,
//! backed by an in-memory volume: login ladders, permission gating, and
//! full passive-mode transfers on separate data connections.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use basalt_vfs::{OpenMode, RamDisk, Vfs};
use feldspar_config::FeldsparConfig;
use feldspar_core::{DefaultCredentials, FtpServer};

struct Client {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    fn connect(addr: SocketAddr) -> Client {
        let stream = TcpStream::connect(addr).expect("connect control socket");
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        Client { stream, reader }
    }

    fn send(&mut self, line: &str) {
        self.stream.write_all(line.as_bytes()).unwrap();
        self.stream.write_all(b"\r\n").unwrap();
    }

    fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
    }

    fn reply(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read reply");
        line
    }

    fn expect(&mut self, code: &str) -> String {
        let line = self.reply();
        assert!(
            line.starts_with(code),
            "expected reply {code}, got {line:?}"
        );
        line
    }

    fn login(&mut self, user: &str, pass: Option<&str>) {
        self.send(&format!("USER {user}"));
        match pass {
            Some(pass) => {
                self.expect("331");
                self.send(&format!("PASS {pass}"));
                self.expect("230");
            }
            None => {
                self.expect("230");
            }
        }
    }

    /// PASV, then a fresh data connection to the announced port.
    fn open_passive(&mut self) -> TcpStream {
        self.send("PASV");
        let reply = self.expect("227");
        let start = reply.find('(').expect("pasv tuple");
        let end = reply.rfind(')').expect("pasv tuple");
        let fields: Vec<u16> = reply[start + 1..end]
            .split(',')
            .map(|field| field.trim().parse().expect("pasv field"))
            .collect();
        assert_eq!(fields.len(), 6);
        let port = fields[4] * 256 + fields[5];
        let data = TcpStream::connect(SocketAddr::from(([127, 0, 0, 1], port)))
            .expect("connect data socket");
        data.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        data
    }
}

fn start_server(vfs: Arc<RamDisk>) -> SocketAddr {
    let config = FeldsparConfig {
        control_port: 0,
        ..FeldsparConfig::default()
    };
    let server = FtpServer::bind(&config, vfs, Arc::new(DefaultCredentials)).expect("bind server");
    let port = server.local_addr().unwrap().port();
    server.spawn().expect("spawn server");
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn seed(vfs: &RamDisk, path: &str, contents: &[u8]) {
    let mut file = vfs.open(path, OpenMode::CreateAlways).unwrap();
    let mut off = 0;
    while off < contents.len() {
        off += file.write(&contents[off..]).unwrap();
    }
}

fn read_to_end(mut data: TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    data.read_to_end(&mut out).expect("drain data connection");
    out
}

#[test]
fn admin_login_pwd_quit() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("admin", Some("password"));
    client.send("PWD");
    let reply = client.expect("250");
    assert!(reply.contains('/'));

    client.send("QUIT");
    client.expect("200");
    // The server closes the control connection after QUIT.
    assert_eq!(client.reply(), "");
}

#[test]
fn anonymous_needs_no_password_but_cannot_store() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("anonymous", None);
    client.send("STOR /f");
    client.expect("530");
}

#[test]
fn wrong_password_resets_login() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    client.send("USER admin");
    client.expect("331");
    client.send("PASS letmein");
    client.expect("532");

    // Back at square one: privileged commands are refused.
    client.send("PWD");
    let reply = client.expect("530");
    assert!(reply.contains("Not logged in"));

    client.login("admin", Some("password"));
    client.send("NOOP");
    client.expect("200");
}

#[test]
fn pass_without_user_is_bad_sequence() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    client.send("PASS password");
    client.expect("503");
}

#[test]
fn rnto_without_rnfr_is_bad_sequence() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("admin", Some("password"));
    client.send("RNTO /new-name");
    client.expect("503");
}

#[test]
fn rename_via_rnfr_rnto() {
    let vfs = Arc::new(RamDisk::new());
    seed(&vfs, "/old.txt", b"contents");
    let addr = start_server(vfs.clone());
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("admin", Some("password"));
    client.send("RNFR /old.txt");
    client.expect("350");
    client.send("RNTO /new.txt");
    client.expect("250");

    assert!(vfs.stat("/new.txt").is_ok());
    assert!(vfs.stat("/old.txt").is_err());
}

#[test]
fn dele_of_missing_file_keeps_session() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("admin", Some("password"));
    client.send("DELE /no-such-file");
    client.expect("550");
    client.send("NOOP");
    client.expect("200");
}

#[test]
fn mkd_cwd_pwd_cdup() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("admin", Some("password"));
    client.send("MKD /stuff");
    client.expect("250");
    client.send("CWD /stuff");
    client.expect("250");
    client.send("PWD");
    let reply = client.expect("250");
    assert!(reply.contains("/stuff"));
    client.send("CDUP");
    client.expect("200");
    client.send("PWD");
    let reply = client.expect("250");
    assert!(!reply.contains("stuff"));
}

#[test]
fn malformed_and_unknown_commands() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    // No CRLF termination.
    client.send_raw(b"NOOP");
    client.expect("500");

    client.send("FROB");
    client.expect("500");

    client.send("USER");
    client.expect("501");

    client.send("NOOP");
    client.expect("200");
}

#[test]
fn type_mode_structure_negotiation() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("anonymous", None);
    client.send("TYPE I");
    client.expect("200");
    client.send("TYPE E");
    client.expect("504");
    client.send("TYPE ?");
    client.expect("501");
    client.send("STRU F");
    client.expect("200");
    client.send("STRU R");
    client.expect("504");
    client.send("MODE S");
    client.expect("200");
    client.send("MODE B");
    client.expect("504");
}

#[test]
fn passive_store_then_retrieve() {
    let vfs = Arc::new(RamDisk::new());
    let addr = start_server(vfs.clone());
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("admin", Some("password"));
    client.send("TYPE I");
    client.expect("200");

    // Upload: more than two staging buffers worth of data.
    let payload: Vec<u8> = (0..1500u32).map(|i| (i % 251) as u8).collect();
    let mut data = client.open_passive();
    client.send("STOR /up.bin");
    client.expect("150");
    data.write_all(&payload).unwrap();
    data.shutdown(Shutdown::Write).unwrap();
    client.expect("250");
    drop(data);

    assert_eq!(vfs.stat("/up.bin").unwrap().size, payload.len() as u64);

    // Download it back on a fresh data connection.
    let data = client.open_passive();
    client.send("RETR /up.bin");
    client.expect("150");
    let echoed = read_to_end(data);
    client.expect("250");
    assert_eq!(echoed, payload);

    client.send("QUIT");
    client.expect("200");
}

#[test]
fn retr_of_missing_file_is_refused_before_transfer() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("anonymous", None);
    client.send("RETR /absent.bin");
    client.expect("550");
}

#[test]
fn list_renders_unix_lines() {
    let vfs = Arc::new(RamDisk::new());
    vfs.mkdir("/docs").unwrap();
    seed(&vfs, "/docs/a.txt", b"alpha");
    seed(&vfs, "/docs/b.txt", b"bravo-bravo");
    let addr = start_server(vfs);
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("anonymous", None);
    let data = client.open_passive();
    client.send("LIST /docs");
    client.expect("150");
    let listing = String::from_utf8(read_to_end(data)).unwrap();
    client.expect("250");

    let lines: Vec<&str> = listing.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("-rw-rw-rw-"));
    assert!(lines[0].ends_with("a.txt"));
    assert!(lines[0].contains("anonymous"));
    assert!(lines[1].ends_with("b.txt"));
}

#[test]
fn nlst_renders_names_only() {
    let vfs = Arc::new(RamDisk::new());
    vfs.mkdir("/docs").unwrap();
    seed(&vfs, "/docs/a.txt", b"alpha");
    seed(&vfs, "/docs/b.txt", b"bravo");
    let addr = start_server(vfs);
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("anonymous", None);
    let data = client.open_passive();
    client.send("NLST /docs");
    client.expect("150");
    let listing = String::from_utf8(read_to_end(data)).unwrap();
    client.expect("250");
    assert_eq!(listing, "a.txt\r\nb.txt\r\n");
}

#[test]
fn rest_and_abor_without_transfer_are_superfluous() {
    let addr = start_server(Arc::new(RamDisk::new()));
    let mut client = Client::connect(addr);
    client.expect("220");

    client.login("admin", Some("password"));
    let _data = client.open_passive();
    client.send("REST 4");
    client.expect("250");
    client.send("ABOR");
    client.expect("250");
}
