/// Implementation of `fcgi params`.
///
/// Decodes the capture through the full connection router and prints the
/// completed parameter map of every request, one `NAME=value` line per
/// parameter. Non-UTF-8 bytes are printed lossily.
///
/// ```text
/// Request 1 (Responder, keep-conn):
///   CONTENT_LENGTH=0
///   REQUEST_METHOD=GET
///   SCRIPT_NAME=/index
/// ```
use std::fs;

use anyhow::{Context, Result};
use fcgi_decoder::{DecoderConfig, Event, FcgiDecoder};
use fcgi_wire::{ParameterMap, Role};

use crate::ParamsArgs;

/// Run the `fcgi params` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to decode.
pub fn run(args: &ParamsArgs, config: DecoderConfig) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let decoded = FcgiDecoder::decode_with_config(&bytes, config)
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    let mut begun: Vec<(u16, Role, bool)> = Vec::new();
    for event in &decoded.events {
        match event {
            Event::BeginRequest {
                request_id,
                role,
                keep_connection,
            } => begun.push((*request_id, *role, *keep_connection)),
            Event::ParamsComplete { request_id, params } => {
                if args.request_id.is_some_and(|id| id != *request_id) {
                    continue;
                }
                let (role, keep) = begun
                    .iter()
                    .rev()
                    .find(|(id, ..)| id == request_id)
                    .map_or((None, false), |(_, role, keep)| (Some(*role), *keep));
                print!("{}", render_request(*request_id, role, keep, params));
            }
            _ => {}
        }
    }

    Ok(())
}

fn render_request(request_id: u16, role: Option<Role>, keep: bool, params: &ParameterMap) -> String {
    let role = role.map_or_else(|| "?".to_string(), |r| format!("{r:?}"));
    let conn = if keep { "keep-conn" } else { "close" };
    let mut out = format!("Request {request_id} ({role}, {conn}):\n");
    for (name, value) in params {
        out.push_str(&format!(
            "  {}={}\n",
            String::from_utf8_lossy(name),
            String::from_utf8_lossy(value)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sorted_params() {
        let mut params = ParameterMap::new();
        params.insert(b"SCRIPT_NAME".to_vec(), b"/index".to_vec());
        params.insert(b"REQUEST_METHOD".to_vec(), b"GET".to_vec());

        let out = render_request(1, Some(Role::Responder), true, &params);
        assert_eq!(
            out,
            "Request 1 (Responder, keep-conn):\n  REQUEST_METHOD=GET\n  SCRIPT_NAME=/index\n"
        );
    }
}
