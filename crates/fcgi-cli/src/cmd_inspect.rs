/// Implementation of `fcgi inspect`.
///
/// Frames every record in a capture and prints one line per record. Only
/// the framing layer runs, so request-level problems (unknown ids,
/// unsupported roles) do not stop the listing.
///
/// # Output format
///
/// ```text
/// Record 0 @ 0: BEGIN_REQUEST id=1 content=8 padding=0
/// Record 1 @ 16: PARAMS id=1 content=411 padding=5
/// Record 2 @ 440: PARAMS id=1 content=0 padding=0
/// Record 3 @ 448: STDIN id=1 content=0 padding=0
/// ---
/// 4 records, 456 bytes
/// ```
use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result, bail};
use fcgi_decoder::{DecoderConfig, RecordBuffer};

use crate::InspectArgs;

/// Run the `fcgi inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a record header is
/// rejected, or the capture ends inside a record.
pub fn run(args: &InspectArgs, config: &DecoderConfig) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let mut records = RecordBuffer::with_config(config);
    records.extend(&bytes);

    let mut offset = 0;
    let mut count = 0;
    while let Some(record) = records
        .next_record()
        .with_context(|| format!("bad record at offset {offset}"))?
    {
        let header = &record.header;
        println!(
            "Record {count} @ {offset}: {} id={} content={} padding={}",
            header.record_type, header.request_id, header.content_length, header.padding_length
        );

        if args.show_hex {
            print!("{}", hex_dump(&record.content));
        }

        offset += header.record_len();
        count += 1;
    }

    if !records.is_empty() {
        bail!(
            "capture ends inside a record at offset {offset} ({} bytes left)",
            records.buffered()
        );
    }

    println!("---");
    println!(
        "{count} record{}, {} bytes",
        if count == 1 { "" } else { "s" },
        bytes.len()
    );
    Ok(())
}

/// 16 bytes per line: offset, hex, printable ASCII.
fn hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        let hex = chunk
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        let _ = writeln!(out, "         {:04x}  {hex:<48}  {ascii}", i * 16);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_dump_layout() {
        let dump = hex_dump(b"HOST\x00");
        assert_eq!(
            dump,
            format!("         0000  {:<48}  HOST.\n", "48 4f 53 54 00")
        );
    }

    #[test]
    fn hex_dump_empty() {
        assert!(hex_dump(&[]).is_empty());
    }
}
