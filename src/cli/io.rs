//! JSON output for the CLI
//!
//! Results go to stdout as JSON, one object per line for paged output.
//! UTF-8 only.

use std::io::{self, Write};

use serde_json::Value;

use super::errors::CliResult;

/// Writes one compact JSON object and a newline
pub fn write_line<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Writes pretty-printed JSON to stdout
pub fn write_pretty(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_line() {
        let mut out = Vec::new();
        write_line(&mut out, &serde_json::json!({"page": 1})).unwrap();
        write_line(&mut out, &serde_json::json!({"page": 2})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"page\":1}\n{\"page\":2}\n");
    }
}
