use std::sync::Arc;

use basalt_vfs::{OpenMode, RamDisk, Vfs};
use feldspar_config::FeldsparConfig;
use feldspar_core::{DefaultCredentials, FtpServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod retarget;

use retarget::RingLogWriter;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => FeldsparConfig::load(path)?,
        None => FeldsparConfig::default(),
    };

    let writer = RingLogWriter::stderr_with_optional_file(
        config.log_ring_capacity,
        config.log_file.as_deref(),
    )?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with_writer(writer)
        .init();

    let vfs = Arc::new(RamDisk::new());
    seed_volume(&vfs)?;

    info!(
        "FELDSPAR: serving ftp on port {port} ({sessions} session slots)",
        port = config.control_port,
        sessions = config.max_sessions
    );

    let server = FtpServer::bind(&config, vfs, Arc::new(DefaultCredentials))?;
    let accept_loop = server.spawn()?;
    let _ = accept_loop.join();
    Ok(())
}

/// The volume starts out with something to list and fetch.
fn seed_volume(vfs: &RamDisk) -> anyhow::Result<()> {
    vfs.mkdir("/pub")?;
    let mut file = vfs.open("/README.txt", OpenMode::CreateAlways)?;
    let greeting: &[u8] = b"feldspar ftp server\r\nlog in as anonymous to browse.\r\n";
    let mut off = 0;
    while off < greeting.len() {
        off += file.write(&greeting[off..])?;
    }
    Ok(())
}
