use casky::storage::engine::Engine;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::session::{self, Response};

pub const DEFAULT_PORT: u16 = 5050;

/// The greeting sent to every client on connect.
pub fn banner() -> String {
    if cfg!(feature = "thread-safe") {
        format!("CASKY {} READY (thread-safe)", casky::version())
    } else {
        format!("CASKY {} READY", casky::version())
    }
}

/// Serves one client until QUIT or disconnect: banner first, then one reply
/// per command line. Engine calls block the task for their (short)
/// duration; a running compaction stalls commands exactly as it stalls
/// every other writer.
pub async fn handle_client<E: Engine>(stream: TcpStream, engine: &mut E) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    writer.write_all(banner().as_bytes()).await?;
    writer.write_all(b"\n").await?;

    while let Some(line) = lines.next_line().await? {
        match session::execute(engine, &line) {
            Response::Message(reply) => {
                writer.write_all(reply.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            Response::Bye => {
                writer.write_all(b"BYE\n").await?;
                break;
            }
        }
    }
    Ok(())
}

/// Accepts clients forever, one task per connection, each on its own clone
/// of the shared engine.
#[cfg(feature = "thread-safe")]
pub async fn serve(
    listener: TcpListener,
    engine: casky::storage::shared::SharedCask,
) -> std::io::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        log::info!("client connected ({})", addr);
        let mut engine = engine.clone();
        tokio::spawn(async move {
            match handle_client(stream, &mut engine).await {
                Ok(()) => log::info!("client disconnected ({})", addr),
                Err(error) => log::warn!("client {} failed: {}", addr, error),
            }
        });
    }
}

/// Accepts clients forever, one at a time: the paper-compatible build has no
/// locking, so later connections wait in the accept backlog until the
/// current client quits.
#[cfg(not(feature = "thread-safe"))]
pub async fn serve(
    listener: TcpListener,
    mut engine: casky::storage::cask::Cask,
) -> std::io::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        log::info!("client connected ({})", addr);
        match handle_client(stream, &mut engine).await {
            Ok(()) => log::info!("client disconnected ({})", addr),
            Err(error) => log::warn!("client {} failed: {}", addr, error),
        }
    }
}
