use crate::domain::event_log::EventLog;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct EventRow<'a> {
    donation: u64,
    occurred_at: String,
    event: &'a str,
    status: &'a str,
    gateway: &'a str,
    note: Option<&'a str>,
}

/// Writes donation histories as CSV:
/// `donation,occurred_at,event,status,gateway,note`.
pub struct EventWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> EventWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_log(&mut self, log: &EventLog) -> Result<()> {
        for event in log.iter() {
            self.writer.serialize(EventRow {
                donation: event.donation_id.0,
                occurred_at: event.occurred_at.to_rfc3339(),
                event: &event.event_label,
                status: event.status.as_str(),
                gateway: &event.gateway,
                note: event.note.as_deref(),
            })?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
