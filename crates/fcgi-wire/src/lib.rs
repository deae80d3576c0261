#![warn(clippy::pedantic)]

pub mod begin_request;
pub mod byte_order;
pub mod error;
pub mod header;
pub mod length;
pub mod params;
pub mod peek;

pub use begin_request::{BeginRequestBody, BeginRequestFlags, Role, read_begin_request_body};
pub use error::WireError;
pub use header::{HEADER_SIZE, RecordHeader, RecordType, read_record};
pub use length::read_variable_length;
pub use params::{
    NameValuePair, NameValuePairs, ParameterMap, read_all_name_value_pairs, read_name_value_pair,
};
pub use peek::Peek;
