use std::num::NonZeroUsize;
use std::thread;

use fcgi_wire::{ParameterMap, Role};

/// Management variable: connections the application accepts at once.
pub const FCGI_MAX_CONNS: &[u8] = b"FCGI_MAX_CONNS";

/// Management variable: requests the application accepts at once.
pub const FCGI_MAX_REQS: &[u8] = b"FCGI_MAX_REQS";

/// Management variable: whether requests may be multiplexed on one
/// connection.
pub const FCGI_MPXS_CONNS: &[u8] = b"FCGI_MPXS_CONNS";

/// Configuration for the connection-level decoder.
///
/// ```text
/// ┌──────────────────┬─────────────────────────────────────────────────┐
/// │ Field            │ Purpose                                         │
/// ├──────────────────┼─────────────────────────────────────────────────┤
/// │ strict_version   │ Reject records whose version byte is not 1      │
/// │ accepted_roles   │ Roles a BEGIN_REQUEST may ask for               │
/// │ max_params_bytes │ Cap on PARAMS content accumulated per request   │
/// │ management       │ Values reported in answer to GET_VALUES         │
/// └──────────────────┴─────────────────────────────────────────────────┘
/// ```
///
/// The wire decoders never validate version or role. This is where a
/// server decides what it is willing to accept.
#[derive(Clone, Debug)]
pub struct DecoderConfig {
  /// Fail records whose header version is not `FCGI_VERSION_1`.
  pub strict_version: bool,

  /// Roles accepted on `BEGIN_REQUEST`. Anything else is rejected with
  /// `DecodeError::UnsupportedRole`.
  pub accepted_roles: Vec<Role>,

  /// Maximum total `PARAMS` content for a single request.
  pub max_params_bytes: usize,

  /// Values offered to `GET_VALUES` queries.
  pub management: ManagementValues,
}

impl Default for DecoderConfig {
  /// Strict version checking, Responder role only, 1 MiB of parameters
  /// per request.
  fn default() -> Self {
    Self {
      strict_version: true,
      accepted_roles: vec![Role::Responder],
      max_params_bytes: 1024 * 1024,
      management: ManagementValues::default(),
    }
  }
}

impl DecoderConfig {
  /// Whether a `BEGIN_REQUEST` for `role` should be served.
  #[must_use]
  pub fn accepts(&self, role: Role) -> bool {
    self.accepted_roles.contains(&role)
  }
}

/// Values the application reports about itself in a `GET_VALUES_RESULT`.
///
/// The three protocol-defined variables are always present. `custom`
/// adds application-specific ones; it cannot override the defined three.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagementValues {
  pub max_conns: usize,
  pub max_reqs: usize,
  pub mpxs_conns: bool,
  pub custom: ParameterMap,
}

impl Default for ManagementValues {
  /// One connection per CPU core, ten requests per core, multiplexing on.
  fn default() -> Self {
    let cores = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    Self {
      max_conns: cores,
      max_reqs: cores * 10,
      mpxs_conns: true,
      custom: ParameterMap::new(),
    }
  }
}

impl ManagementValues {
  /// Every variable this application can report, with its value.
  #[must_use]
  pub fn to_map(&self) -> ParameterMap {
    let mut map = self.custom.clone();
    map.insert(FCGI_MAX_CONNS.to_vec(), self.max_conns.to_string().into_bytes());
    map.insert(FCGI_MAX_REQS.to_vec(), self.max_reqs.to_string().into_bytes());
    map.insert(
      FCGI_MPXS_CONNS.to_vec(),
      if self.mpxs_conns { b"1".to_vec() } else { b"0".to_vec() },
    );
    map
  }

  /// Build the reply to a `GET_VALUES` query: the queried names this
  /// application knows, each with its value. Unknown names are left out.
  /// Query values are ignored; the protocol sends them empty.
  #[must_use]
  pub fn answer(&self, query: &ParameterMap) -> ParameterMap {
    let known = self.to_map();
    query
      .keys()
      .filter_map(|name| known.get(name).map(|value| (name.clone(), value.clone())))
      .collect()
  }
}
