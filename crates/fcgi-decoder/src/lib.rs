#![warn(clippy::pedantic)]

pub mod config;
pub mod connection;
pub mod decoder;
pub mod error;
pub mod record;
pub mod streaming;

pub use config::{DecoderConfig, ManagementValues};
pub use connection::{Connection, Event};
pub use decoder::{DecodedStream, FcgiDecoder};
pub use error::DecodeError;
pub use record::{Record, RecordBuffer};
pub use streaming::StreamingDecoder;
