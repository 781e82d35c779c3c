use std::io::{self, Write};

use serde::Serialize;

use crate::domain::{DestinationRecord, SourceRecord};
use crate::pipeline::HarvestReport;
use crate::store::ErrorRecord;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &HarvestReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_sources(sources: &[SourceRecord]) -> io::Result<()> {
        Self::print_json(&sources)
    }

    pub fn print_records(records: &[DestinationRecord]) -> io::Result<()> {
        Self::print_json(&records)
    }

    pub fn print_errors(errors: &[ErrorRecord]) -> io::Result<()> {
        Self::print_json(&errors)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
