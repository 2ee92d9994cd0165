//! JSON presentation of [`DiffReport`]s.

use std::io::Write;

use diffscope_api::DiffReport;

use crate::Result;

/// Serialize `report` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`crate::Error::Serialize`] if serialization fails.
pub fn to_json(report: &DiffReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write `report` as pretty-printed JSON followed by a newline.
///
/// # Errors
///
/// Returns [`crate::Error::Serialize`] for serializer failures and
/// [`crate::Error::Io`] when the trailing newline cannot be written.
pub fn write_json(report: &DiffReport, mut writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    Ok(())
}
