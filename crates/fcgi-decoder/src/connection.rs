use std::collections::HashMap;

use bytes::Bytes;
use fcgi_wire::{
  BeginRequestBody, ParameterMap, RecordType, Role, read_all_name_value_pairs,
};

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::record::Record;

/// What a single record means for the requests on a connection.
///
/// Stream records (`PARAMS`, `STDIN`, `DATA`) are terminated by an empty
/// record of the same type, which shows up here as the `*Complete`
/// variant.
///
/// ```text
///   BeginRequest
///   Params ... ParamsComplete
///   Stdin  ... StdinComplete
///   (Data  ... DataComplete)      ← Filter role only
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
  BeginRequest {
    request_id: u16,
    role: Role,
    keep_connection: bool,
  },

  /// The web server gave up on a request. It has been forgotten.
  AbortRequest { request_id: u16 },

  /// Pairs decoded from one `PARAMS` record.
  Params { request_id: u16, params: ParameterMap },

  /// The parameter stream ended. `params` holds everything received for
  /// the request, later duplicates overwriting earlier ones.
  ParamsComplete { request_id: u16, params: ParameterMap },

  Stdin { request_id: u16, data: Bytes },

  StdinComplete { request_id: u16 },

  Data { request_id: u16, data: Bytes },

  DataComplete { request_id: u16 },

  /// A management query. `reply` is the content of the
  /// `GET_VALUES_RESULT` the application owes the web server.
  GetValues { query: ParameterMap, reply: ParameterMap },

  /// A record type the application does not accept. The web server
  /// expects an `UNKNOWN_TYPE` record naming it.
  UnknownType { record_type: RecordType },
}

impl Event {
  /// The request this event belongs to, `None` for management events.
  #[must_use]
  pub fn request_id(&self) -> Option<u16> {
    match self {
      Self::BeginRequest { request_id, .. }
      | Self::AbortRequest { request_id }
      | Self::Params { request_id, .. }
      | Self::ParamsComplete { request_id, .. }
      | Self::Stdin { request_id, .. }
      | Self::StdinComplete { request_id }
      | Self::Data { request_id, .. }
      | Self::DataComplete { request_id } => Some(*request_id),
      Self::GetValues { .. } | Self::UnknownType { .. } => None,
    }
  }
}

#[derive(Debug)]
struct RequestState {
  role: Role,
  keep_connection: bool,
  params: ParameterMap,
  params_bytes: usize,
  params_closed: bool,
  stdin_closed: bool,
  data_closed: bool,
}

impl RequestState {
  fn new(role: Role, keep_connection: bool) -> Self {
    Self {
      role,
      keep_connection,
      params: ParameterMap::new(),
      params_bytes: 0,
      params_closed: false,
      stdin_closed: false,
      data_closed: false,
    }
  }

  /// Every input stream the role uses has been closed by its empty record.
  fn input_complete(&self) -> bool {
    self.stdin_closed && (self.role != Role::Filter || self.data_closed)
  }
}

/// Per-connection router from whole records to [`Event`]s.
///
/// Tracks which request ids are active on the connection, collects each
/// request's parameters, and checks that stream records only arrive for
/// requests that exist and streams that are still open.
///
/// An id counts as open until its input streams are closed: STDIN, plus
/// DATA for the Filter role. After that a new `BEGIN_REQUEST` may reuse
/// the id without [`finish`](Self::finish) having been called, which is
/// how keep-alive web servers send request after request with id 1.
///
/// ```text
/// ┌──────────────────┬────────────────────────────────────────────────┐
/// │ Record           │ Handling                                       │
/// ├──────────────────┼────────────────────────────────────────────────┤
/// │ BEGIN_REQUEST    │ role check, id still open?, register request   │
/// │ ABORT_REQUEST    │ forget request (unknown ids are ignored)       │
/// │ PARAMS           │ decode block, merge; empty record completes    │
/// │ STDIN / DATA     │ pass through; empty record completes           │
/// │ GET_VALUES       │ decode query, compute reply                    │
/// │ anything else    │ UnknownType                                    │
/// └──────────────────┴────────────────────────────────────────────────┘
/// ```
#[derive(Debug)]
pub struct Connection {
  config: DecoderConfig,
  requests: HashMap<u16, RequestState>,
}

impl Default for Connection {
  fn default() -> Self {
    Self::new(DecoderConfig::default())
  }
}

impl Connection {
  #[must_use]
  pub fn new(config: DecoderConfig) -> Self {
    Self {
      config,
      requests: HashMap::new(),
    }
  }

  #[must_use]
  pub fn config(&self) -> &DecoderConfig {
    &self.config
  }

  /// Number of requests begun and not yet finished or aborted.
  #[must_use]
  pub fn active_requests(&self) -> usize {
    self.requests.len()
  }

  #[must_use]
  pub fn is_active(&self, request_id: u16) -> bool {
    self.requests.contains_key(&request_id)
  }

  /// The role an active request was begun with.
  #[must_use]
  pub fn role(&self, request_id: u16) -> Option<Role> {
    self.requests.get(&request_id).map(|r| r.role)
  }

  /// Parameters received so far for an active request.
  #[must_use]
  pub fn params(&self, request_id: u16) -> Option<&ParameterMap> {
    self.requests.get(&request_id).map(|r| &r.params)
  }

  /// Whether the web server asked for the connection to be closed once
  /// this request is done.
  #[must_use]
  pub fn should_close(&self, request_id: u16) -> bool {
    self
      .requests
      .get(&request_id)
      .is_some_and(|r| !r.keep_connection)
  }

  /// Forget a request the application has finished answering.
  ///
  /// Returns `true` if the connection should be closed now.
  pub fn finish(&mut self, request_id: u16) -> bool {
    match self.requests.remove(&request_id) {
      Some(state) => {
        tracing::debug!(request_id, "request finished");
        !state.keep_connection
      }
      None => false,
    }
  }

  /// Route one record.
  ///
  /// Returns `Ok(None)` for records that change nothing, which is only an
  /// abort for a request id that is not active.
  ///
  /// # Errors
  ///
  /// Any [`DecodeError`] other than `Io`/`UnexpectedEof`; see its docs.
  /// On error the connection state is unchanged.
  pub fn handle(&mut self, record: &Record) -> Result<Option<Event>, DecodeError> {
    let header = &record.header;
    let request_id = header.request_id;

    let result = match header.record_type {
      RecordType::BeginRequest => self.begin_request(request_id, &record.content).map(Some),
      RecordType::AbortRequest => Ok(self.abort_request(request_id)),
      RecordType::Params => self.params_record(request_id, &record.content).map(Some),
      RecordType::StdIn | RecordType::Data => {
        self.stream_record(header.record_type, request_id, &record.content).map(Some)
      }
      RecordType::GetValues => self.get_values(&record.content).map(Some),
      other => Ok(Some(Event::UnknownType { record_type: other })),
    };

    if let Err(e) = &result {
      tracing::warn!(request_id, record_type = %header.record_type, error = %e, "rejected record");
    }
    result
  }

  fn begin_request(&mut self, request_id: u16, content: &[u8]) -> Result<Event, DecodeError> {
    let body = BeginRequestBody::read_from(content)?;

    if !self.config.accepts(body.role) {
      return Err(DecodeError::UnsupportedRole {
        request_id,
        role: body.role,
      });
    }
    match self.requests.get(&request_id) {
      Some(state) if state.input_complete() => {
        tracing::debug!(request_id, "request id reused after input completed");
      }
      Some(_) => return Err(DecodeError::DuplicateRequest { request_id }),
      None => {}
    }

    let keep_connection = body.flags.keep_connection();
    self
      .requests
      .insert(request_id, RequestState::new(body.role, keep_connection));
    tracing::debug!(request_id, role = ?body.role, keep_connection, "request started");

    Ok(Event::BeginRequest {
      request_id,
      role: body.role,
      keep_connection,
    })
  }

  fn abort_request(&mut self, request_id: u16) -> Option<Event> {
    self.requests.remove(&request_id)?;
    tracing::debug!(request_id, "request aborted");
    Some(Event::AbortRequest { request_id })
  }

  /// Each non-empty PARAMS record must hold whole pairs. A pair split
  /// across two records fails with [`WireError::MalformedBlock`].
  ///
  /// [`WireError::MalformedBlock`]: fcgi_wire::WireError::MalformedBlock
  fn params_record(&mut self, request_id: u16, content: &[u8]) -> Result<Event, DecodeError> {
    let limit = self.config.max_params_bytes;
    let state = self.requests.get_mut(&request_id).ok_or(DecodeError::UnknownRequest {
      request_id,
      record_type: RecordType::Params,
    })?;

    if state.params_closed {
      return Err(DecodeError::StreamClosed {
        request_id,
        record_type: RecordType::Params,
      });
    }

    if content.is_empty() {
      state.params_closed = true;
      tracing::debug!(request_id, count = state.params.len(), "parameters complete");
      return Ok(Event::ParamsComplete {
        request_id,
        params: state.params.clone(),
      });
    }

    let total = state.params_bytes + content.len();
    if total > limit {
      return Err(DecodeError::ParamsTooLarge { request_id, limit });
    }

    let params = read_all_name_value_pairs(content)?;
    state.params_bytes = total;
    state
      .params
      .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

    Ok(Event::Params { request_id, params })
  }

  fn stream_record(
    &mut self,
    record_type: RecordType,
    request_id: u16,
    content: &Bytes,
  ) -> Result<Event, DecodeError> {
    let state = self
      .requests
      .get_mut(&request_id)
      .ok_or(DecodeError::UnknownRequest {
        request_id,
        record_type,
      })?;

    let closed = if record_type == RecordType::Data {
      &mut state.data_closed
    } else {
      &mut state.stdin_closed
    };
    if *closed {
      return Err(DecodeError::StreamClosed {
        request_id,
        record_type,
      });
    }

    let data = content.clone();
    Ok(match (record_type, data.is_empty()) {
      (RecordType::Data, true) => {
        *closed = true;
        Event::DataComplete { request_id }
      }
      (RecordType::Data, false) => Event::Data { request_id, data },
      (_, true) => {
        *closed = true;
        Event::StdinComplete { request_id }
      }
      (_, false) => Event::Stdin { request_id, data },
    })
  }

  fn get_values(&self, content: &[u8]) -> Result<Event, DecodeError> {
    let query = read_all_name_value_pairs(content)?;
    let reply = self.config.management.answer(&query);
    tracing::debug!(queried = query.len(), answered = reply.len(), "management query");
    Ok(Event::GetValues { query, reply })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use fcgi_wire::header::FCGI_VERSION_1;
  use fcgi_wire::{RecordHeader, WireError};

  fn record(record_type: RecordType, request_id: u16, content: &[u8]) -> Record {
    Record {
      header: RecordHeader {
        version: FCGI_VERSION_1,
        record_type,
        request_id,
        content_length: u16::try_from(content.len()).unwrap(),
        padding_length: 0,
        reserved: 0,
      },
      content: Bytes::copy_from_slice(content),
    }
  }

  fn begin(request_id: u16, role: u16, flags: u8) -> Record {
    let [hi, lo] = role.to_be_bytes();
    record(RecordType::BeginRequest, request_id, &[hi, lo, flags, 0, 0, 0, 0, 0])
  }

  #[test]
  fn begin_request_registers() {
    let mut conn = Connection::default();
    let event = conn.handle(&begin(1, 1, 1)).unwrap();

    assert_eq!(
      event,
      Some(Event::BeginRequest {
        request_id: 1,
        role: Role::Responder,
        keep_connection: true
      })
    );
    assert!(conn.is_active(1));
    assert_eq!(conn.role(1), Some(Role::Responder));
    assert!(!conn.should_close(1));
  }

  #[test]
  fn unsupported_role_is_rejected() {
    let mut conn = Connection::default();
    let result = conn.handle(&begin(1, 2, 0));
    assert!(matches!(
      result,
      Err(DecodeError::UnsupportedRole {
        request_id: 1,
        role: Role::Authorizer
      })
    ));
    assert_eq!(conn.active_requests(), 0);
  }

  #[test]
  fn duplicate_request_is_rejected() {
    let mut conn = Connection::default();
    conn.handle(&begin(7, 1, 0)).unwrap();
    assert!(matches!(
      conn.handle(&begin(7, 1, 0)),
      Err(DecodeError::DuplicateRequest { request_id: 7 })
    ));
  }

  #[test]
  fn id_reused_once_input_is_complete() {
    let mut conn = Connection::default();
    conn.handle(&begin(1, 1, 1)).unwrap();
    conn.handle(&record(RecordType::Params, 1, b"")).unwrap();
    assert!(matches!(
      conn.handle(&begin(1, 1, 1)),
      Err(DecodeError::DuplicateRequest { request_id: 1 })
    ));

    conn.handle(&record(RecordType::StdIn, 1, b"")).unwrap();
    assert_eq!(
      conn.handle(&begin(1, 1, 0)).unwrap(),
      Some(Event::BeginRequest {
        request_id: 1,
        role: Role::Responder,
        keep_connection: false
      })
    );
    assert_eq!(conn.active_requests(), 1);
    assert!(conn.params(1).unwrap().is_empty());
    assert!(conn.should_close(1));
  }

  #[test]
  fn filter_id_reused_only_after_data_closes() {
    let config = DecoderConfig {
      accepted_roles: vec![Role::Filter],
      ..DecoderConfig::default()
    };
    let mut conn = Connection::new(config);
    conn.handle(&begin(2, 3, 1)).unwrap();
    conn.handle(&record(RecordType::StdIn, 2, b"")).unwrap();
    assert!(matches!(
      conn.handle(&begin(2, 3, 1)),
      Err(DecodeError::DuplicateRequest { request_id: 2 })
    ));

    conn.handle(&record(RecordType::Data, 2, b"")).unwrap();
    assert!(conn.handle(&begin(2, 3, 1)).is_ok());
  }

  #[test]
  fn short_begin_body_is_truncated() {
    let mut conn = Connection::default();
    let result = conn.handle(&record(RecordType::BeginRequest, 1, &[0, 1, 0]));
    assert!(matches!(
      result,
      Err(DecodeError::Wire(WireError::TruncatedInput { .. }))
    ));
  }

  #[test]
  fn params_accumulate_until_empty_record() {
    let mut conn = Connection::default();
    conn.handle(&begin(1, 1, 0)).unwrap();

    let first = conn
      .handle(&record(RecordType::Params, 1, b"\x04\x03HOSTabc\x01\x01Ax"))
      .unwrap()
      .unwrap();
    let Event::Params { params, .. } = first else {
      panic!("expected Params, got {first:?}");
    };
    assert_eq!(params.len(), 2);

    conn
      .handle(&record(RecordType::Params, 1, b"\x01\x01Ay"))
      .unwrap();

    let done = conn.handle(&record(RecordType::Params, 1, b"")).unwrap().unwrap();
    let Event::ParamsComplete { request_id, params } = done else {
      panic!("expected ParamsComplete, got {done:?}");
    };
    assert_eq!(request_id, 1);
    assert_eq!(params.len(), 2);
    assert_eq!(params[&b"HOST"[..]], b"abc");
    assert_eq!(params[&b"A"[..]], b"y");
    assert!(conn.should_close(1));
  }

  #[test]
  fn params_after_close_are_rejected() {
    let mut conn = Connection::default();
    conn.handle(&begin(1, 1, 0)).unwrap();
    conn.handle(&record(RecordType::Params, 1, b"")).unwrap();
    assert!(matches!(
      conn.handle(&record(RecordType::Params, 1, b"\x01\x01ab")),
      Err(DecodeError::StreamClosed { request_id: 1, .. })
    ));
  }

  #[test]
  fn malformed_params_block() {
    let mut conn = Connection::default();
    conn.handle(&begin(1, 1, 0)).unwrap();
    let result = conn.handle(&record(RecordType::Params, 1, b"\x03\x03abcdefg"));
    assert!(matches!(
      result,
      Err(DecodeError::Wire(WireError::MalformedBlock { offset: 8, remaining: 1 }))
    ));
    assert!(conn.params(1).unwrap().is_empty());
  }

  #[test]
  fn params_for_unknown_request() {
    let mut conn = Connection::default();
    assert!(matches!(
      conn.handle(&record(RecordType::Params, 3, b"")),
      Err(DecodeError::UnknownRequest {
        request_id: 3,
        record_type: RecordType::Params
      })
    ));
  }

  #[test]
  fn params_limit_is_enforced() {
    let config = DecoderConfig {
      max_params_bytes: 8,
      ..DecoderConfig::default()
    };
    let mut conn = Connection::new(config);
    conn.handle(&begin(1, 1, 0)).unwrap();
    conn.handle(&record(RecordType::Params, 1, b"\x01\x01ab")).unwrap();
    assert!(matches!(
      conn.handle(&record(RecordType::Params, 1, b"\x01\x01cd\x01\x01ef")),
      Err(DecodeError::ParamsTooLarge { request_id: 1, limit: 8 })
    ));
  }

  #[test]
  fn stdin_passes_through() {
    let mut conn = Connection::default();
    conn.handle(&begin(2, 1, 1)).unwrap();

    assert_eq!(
      conn.handle(&record(RecordType::StdIn, 2, b"body")).unwrap(),
      Some(Event::Stdin {
        request_id: 2,
        data: Bytes::from_static(b"body")
      })
    );
    assert_eq!(
      conn.handle(&record(RecordType::StdIn, 2, b"")).unwrap(),
      Some(Event::StdinComplete { request_id: 2 })
    );
    assert!(matches!(
      conn.handle(&record(RecordType::StdIn, 2, b"more")),
      Err(DecodeError::StreamClosed { .. })
    ));
  }

  #[test]
  fn filter_data_stream() {
    let config = DecoderConfig {
      accepted_roles: vec![Role::Responder, Role::Filter],
      ..DecoderConfig::default()
    };
    let mut conn = Connection::new(config);
    conn.handle(&begin(4, 3, 0)).unwrap();

    assert_eq!(
      conn.handle(&record(RecordType::Data, 4, b"file")).unwrap(),
      Some(Event::Data {
        request_id: 4,
        data: Bytes::from_static(b"file")
      })
    );
    assert_eq!(
      conn.handle(&record(RecordType::Data, 4, b"")).unwrap(),
      Some(Event::DataComplete { request_id: 4 })
    );
    // STDIN is tracked separately.
    assert!(conn.handle(&record(RecordType::StdIn, 4, b"x")).is_ok());
  }

  #[test]
  fn abort_known_and_unknown() {
    let mut conn = Connection::default();
    conn.handle(&begin(5, 1, 1)).unwrap();

    assert_eq!(
      conn.handle(&record(RecordType::AbortRequest, 5, b"")).unwrap(),
      Some(Event::AbortRequest { request_id: 5 })
    );
    assert!(!conn.is_active(5));
    assert_eq!(conn.handle(&record(RecordType::AbortRequest, 5, b"")).unwrap(), None);
  }

  #[test]
  fn get_values_reply() {
    let mut conn = Connection::default();
    let event = conn
      .handle(&record(
        RecordType::GetValues,
        0,
        b"\x0F\x00FCGI_MPXS_CONNS\x03\x00FOO",
      ))
      .unwrap()
      .unwrap();

    let Event::GetValues { query, reply } = event else {
      panic!("expected GetValues, got {event:?}");
    };
    assert_eq!(query.len(), 2);
    assert_eq!(reply.len(), 1);
    assert_eq!(reply[&b"FCGI_MPXS_CONNS"[..]], b"1");
  }

  #[test]
  fn unknown_types() {
    let mut conn = Connection::default();
    for record_type in [RecordType::StdOut, RecordType::EndRequest, RecordType::Other(0x42)] {
      let event = conn.handle(&record(record_type, 0, b"")).unwrap();
      assert_eq!(event, Some(Event::UnknownType { record_type }));
      assert_eq!(event.unwrap().request_id(), None);
    }
  }

  #[test]
  fn finish_reports_close() {
    let mut conn = Connection::default();
    conn.handle(&begin(1, 1, 0)).unwrap();
    conn.handle(&begin(2, 1, 1)).unwrap();

    assert!(conn.finish(1));
    assert!(!conn.finish(2));
    assert!(!conn.finish(3));
    assert_eq!(conn.active_requests(), 0);
  }
}
