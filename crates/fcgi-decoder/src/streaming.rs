use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::DecoderConfig;
use crate::connection::{Connection, Event};
use crate::error::DecodeError;
use crate::record::RecordBuffer;

/// How much spare capacity to make room for before each read.
const READ_CHUNK: usize = 8 * 1024;

/// Asynchronous decoder over a live FastCGI connection.
///
/// Reads from any `AsyncRead` (TCP socket, Unix socket, pipe) into a
/// [`RecordBuffer`], routes each complete record through a
/// [`Connection`], and yields the resulting events one at a time. The
/// reader is only polled when no complete record is buffered, so
/// backpressure follows the caller awaiting [`next`](Self::next).
///
/// # Example
///
/// ```rust,no_run
/// use fcgi_decoder::{Event, StreamingDecoder};
/// use tokio::net::TcpStream;
///
/// async fn serve(socket: TcpStream) {
///     let mut decoder = StreamingDecoder::new(socket);
///     while let Some(event) = decoder.next().await {
///         match event {
///             Ok(Event::ParamsComplete { request_id, params }) => { /* dispatch */ }
///             Ok(_) => {}
///             Err(e) => { eprintln!("dropping connection: {e}"); break; }
///         }
///     }
/// }
/// ```
pub struct StreamingDecoder<R> {
  reader: R,
  records: RecordBuffer,
  connection: Connection,
  state: StreamState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamState {
  Reading,
  Done,
}

impl<R: AsyncRead + Unpin> StreamingDecoder<R> {
  #[must_use]
  pub fn new(reader: R) -> Self {
    Self::with_config(reader, DecoderConfig::default())
  }

  #[must_use]
  pub fn with_config(reader: R, config: DecoderConfig) -> Self {
    Self {
      reader,
      records: RecordBuffer::with_config(&config),
      connection: Connection::new(config),
      state: StreamState::Reading,
    }
  }

  /// The request state behind the events yielded so far.
  #[must_use]
  pub fn connection(&self) -> &Connection {
    &self.connection
  }

  /// Mutable access, e.g. to [`Connection::finish`] a request.
  pub fn connection_mut(&mut self) -> &mut Connection {
    &mut self.connection
  }

  /// Read the next event from the stream.
  ///
  /// Returns `None` once the reader hits EOF on a record boundary. After
  /// an error has been yielded, every later call returns `None`.
  pub async fn next(&mut self) -> Option<Result<Event, DecodeError>> {
    if self.state == StreamState::Done {
      return None;
    }

    let result = self.read_event().await;
    if !matches!(result, Some(Ok(_))) {
      self.state = StreamState::Done;
    }
    result
  }

  async fn read_event(&mut self) -> Option<Result<Event, DecodeError>> {
    loop {
      match self.records.next_record() {
        Ok(Some(record)) => match self.connection.handle(&record) {
          Ok(Some(event)) => return Some(Ok(event)),
          Ok(None) => continue,
          Err(e) => return Some(Err(e)),
        },
        Ok(None) => {}
        Err(e) => return Some(Err(e)),
      }

      let buf = self.records.buf_mut();
      buf.reserve(READ_CHUNK);
      match self.reader.read_buf(buf).await {
        Ok(0) if self.records.is_empty() => {
          tracing::debug!("connection closed by peer");
          return None;
        }
        Ok(0) => {
          return Some(Err(DecodeError::UnexpectedEof {
            buffered: self.records.buffered(),
          }));
        }
        Ok(n) => tracing::trace!(bytes = n, "read from connection"),
        Err(e) => return Some(Err(DecodeError::Io(e))),
      }
    }
  }
}
