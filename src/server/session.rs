//! Client sessions
//!
//! Reads command lines, runs storage work on the blocking pool and writes
//! replies. Downloads and uploads move their payload inline on the same
//! connection, framed by an exact byte count.

use log::{debug, error, info, warn};
use std::io::{self, Cursor, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use crate::config::ServerConfig;
use crate::protocol::responses::{self, error_response, format_response};
use crate::protocol::{Command, CommandStatus, handle_command, parse_command};
use crate::storage::{ArchiveBody, ArchiveStream, Storage};

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
const UPLOAD_QUEUE_DEPTH: usize = 8;

/// Runs one client session until QUIT, disconnect or a transport error.
pub async fn handle_session(
    stream: TcpStream,
    client_addr: SocketAddr,
    storage: Arc<Storage>,
    config: Arc<ServerConfig>,
) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    write_half
        .write_all(format_response(responses::READY, "rax-drive ready").as_bytes())
        .await?;

    // Room for the line terminator on top of the command itself
    let line_limit = config.max_command_length as u64 + 2;

    loop {
        line.clear();
        let n = (&mut reader).take(line_limit).read_line(&mut line).await?;
        if n == 0 {
            info!("Connection closed by client {client_addr}");
            return Ok(());
        }
        if !line.ends_with('\n') && n as u64 >= line_limit {
            warn!("Command from {client_addr} exceeded {line_limit} bytes");
            let reply = format_response(responses::UNKNOWN_COMMAND, "Command too long");
            write_half.write_all(reply.as_bytes()).await?;
            return Ok(());
        }

        let command = parse_command(&line);
        debug!("Received from {client_addr}: {command:?}");

        match command {
            Command::RETR { path, name } => {
                send_download(&mut write_half, &storage, path, name).await?;
            }
            Command::STOR { path, name, size } => {
                receive_upload(&mut reader, &mut write_half, &storage, &config, path, name, size)
                    .await?;
            }
            command => {
                let storage = Arc::clone(&storage);
                let result = run_blocking(move || handle_command(&storage, &command)).await?;
                write_half.write_all(result.message.as_bytes()).await?;

                if result.status == CommandStatus::CloseConnection {
                    info!("Client {client_addr} requested to quit");
                    return Ok(());
                }
            }
        }
    }
}

/// Runs synchronous storage work off the async reactor.
async fn run_blocking<T, F>(work: F) -> io::Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(io::Error::other)
}

/// RETR: `150 <length> <name>`, the raw bytes, then `226`.
async fn send_download(
    writer: &mut OwnedWriteHalf,
    storage: &Arc<Storage>,
    path: String,
    name: String,
) -> io::Result<()> {
    let storage = Arc::clone(storage);
    let prepared = run_blocking(move || storage.download(&path, &name)).await?;

    let ArchiveStream { name, len, body } = match prepared {
        Ok(stream) => stream,
        Err(e) => {
            writer.write_all(error_response(&e).as_bytes()).await?;
            return Ok(());
        }
    };

    writer
        .write_all(format_response(responses::OPENING_DATA, &format!("{len} {name}")).as_bytes())
        .await?;

    let sent = match body {
        ArchiveBody::File(file) => {
            let file = tokio::fs::File::from_std(file);
            tokio::io::copy(&mut file.take(len), writer).await?
        }
        ArchiveBody::Zip(cursor) => {
            let bytes = cursor.into_inner();
            writer.write_all(&bytes).await?;
            bytes.len() as u64
        }
    };

    if sent != len {
        // The framing is broken; the only safe move is to drop the session
        error!("Download of {name} sent {sent} of {len} bytes");
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "file shrank during download",
        ));
    }

    writer
        .write_all(format_response(responses::TRANSFER_COMPLETE, "Transfer complete").as_bytes())
        .await?;
    info!("Sent {name} ({sent} bytes)");
    Ok(())
}

/// STOR: checks the target, replies `150`, then streams exactly `size`
/// bytes into storage.
async fn receive_upload(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
    storage: &Arc<Storage>,
    config: &ServerConfig,
    path: String,
    name: String,
    size: u64,
) -> io::Result<()> {
    if size > config.max_upload_size_bytes() {
        warn!("Rejected upload of {name}: {size} bytes over limit");
        let message = format!(
            "Upload exceeds {} MB limit",
            config.max_upload_size_mb
        );
        writer
            .write_all(format_response(responses::EXCEEDED_STORAGE, &message).as_bytes())
            .await?;
        return Ok(());
    }

    let checker = Arc::clone(storage);
    let (check_path, check_name) = (path.clone(), name.clone());
    if let Err(e) = run_blocking(move || checker.check_upload(&check_path, &check_name)).await? {
        writer.write_all(error_response(&e).as_bytes()).await?;
        return Ok(());
    }

    writer
        .write_all(
            format_response(responses::OPENING_DATA, &format!("Ready for {size} bytes")).as_bytes(),
        )
        .await?;

    let (chunks, receiver) = mpsc::channel(UPLOAD_QUEUE_DEPTH);
    let storage = Arc::clone(storage);
    let (store_path, store_name) = (path, name.clone());
    let store = tokio::task::spawn_blocking(move || {
        storage.store_file(&store_path, &store_name, &mut ChunkReader::new(receiver))
    });

    let mut buffer = vec![0; UPLOAD_CHUNK_SIZE];
    let mut remaining = size;
    let mut storing = true;
    while remaining > 0 {
        let want = remaining.min(UPLOAD_CHUNK_SIZE as u64) as usize;
        let read = match reader.read(&mut buffer[..want]).await {
            Ok(0) => {
                let received = size - remaining;
                warn!("Upload of {name} ended after {received} of {size} bytes");
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed during upload",
                ))
            }
            result => result,
        };
        let n = match read {
            Ok(n) => n,
            Err(e) => {
                // Fail the store so the partial upload is discarded
                let _ = chunks.send(Err(io::Error::new(e.kind(), e.to_string()))).await;
                drop(chunks);
                let _ = store.await;
                return Err(e);
            }
        };
        remaining -= n as u64;

        // Once storing has failed the rest of the payload is still drained
        if storing && chunks.send(Ok(buffer[..n].to_vec())).await.is_err() {
            storing = false;
        }
    }
    drop(chunks);

    let reply = match store.await.map_err(io::Error::other)? {
        Ok(_) => format_response(responses::TRANSFER_COMPLETE, "Transfer complete"),
        Err(e) => error_response(&e),
    };
    writer.write_all(reply.as_bytes()).await
}

/// Blocking [`Read`] over chunks sent from the session task.
///
/// An `Err` chunk fails the read, so a broken upload never looks like a short
/// but complete file.
struct ChunkReader {
    chunks: mpsc::Receiver<io::Result<Vec<u8>>>,
    current: Cursor<Vec<u8>>,
}

impl ChunkReader {
    fn new(chunks: mpsc::Receiver<io::Result<Vec<u8>>>) -> Self {
        Self {
            chunks,
            current: Cursor::new(Vec::new()),
        }
    }
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = Read::read(&mut self.current, buf)?;
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }
            match self.chunks.blocking_recv() {
                Some(Ok(chunk)) => self.current = Cursor::new(chunk),
                Some(Err(e)) => return Err(e),
                None => return Ok(0),
            }
        }
    }
}
