/// Implementation of `fcgi validate`.
///
/// Runs a full decode of the capture and prints either a short report of
/// success checkmarks (`✓`) or a single diagnostic line (`✗`). The main
/// dispatcher turns the `Err` into exit code 1.
///
/// # Success output
///
/// ```text
/// ✓ Framing: 12 records, no trailing bytes
/// ✓ Requests: 2 begun, 2 with complete parameters
/// ✓ Bodies: all BEGIN_REQUEST and PARAMS content decoded
/// ```
///
/// # Failure output
///
/// ```text
/// ✗ Error: malformed parameter block: 1 bytes at offset 8 do not form a pair
/// ```
use std::fs;

use anyhow::{Context, Result, anyhow};
use fcgi_decoder::{DecodeError, DecoderConfig, Event, FcgiDecoder};

use crate::ValidateArgs;

/// Run the `fcgi validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the stream fails any
/// structural check.
pub fn run(args: &ValidateArgs, config: DecoderConfig) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    match FcgiDecoder::decode_with_config(&bytes, config) {
        Ok(decoded) => {
            let begun = decoded
                .events
                .iter()
                .filter(|e| matches!(e, Event::BeginRequest { .. }))
                .count();
            let complete = decoded
                .events
                .iter()
                .filter(|e| matches!(e, Event::ParamsComplete { .. }))
                .count();

            println!(
                "✓ Framing: {} record{}, no trailing bytes",
                decoded.records.len(),
                if decoded.records.len() == 1 { "" } else { "s" }
            );
            println!("✓ Requests: {begun} begun, {complete} with complete parameters");
            println!("✓ Bodies: all BEGIN_REQUEST and PARAMS content decoded");
            Ok(())
        }

        Err(e) => {
            println!("✗ Error: {}", decode_error_diagnostic(&e));
            Err(anyhow!("validation failed"))
        }
    }
}

// ── Error formatting ──────────────────────────────────────────────────────────

/// Adds a hint to the errors whose fix is usually a flag away.
fn decode_error_diagnostic(e: &DecodeError) -> String {
    match e {
        DecodeError::UnsupportedVersion { .. } => {
            format!("{e} (pass --strict-version false to accept it)")
        }
        DecodeError::ParamsTooLarge { .. } => format!("{e} (raise --max-params-bytes)"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcgi_wire::WireError;

    #[test]
    fn wire_errors_are_passed_through() {
        let e = DecodeError::Wire(WireError::MalformedBlock {
            offset: 8,
            remaining: 1,
        });
        assert_eq!(
            decode_error_diagnostic(&e),
            "malformed parameter block: 1 bytes at offset 8 do not form a pair"
        );
    }

    #[test]
    fn params_limit_hint() {
        let e = DecodeError::ParamsTooLarge {
            request_id: 1,
            limit: 16,
        };
        assert!(decode_error_diagnostic(&e).ends_with("(raise --max-params-bytes)"));
    }
}
