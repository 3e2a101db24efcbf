pub mod event_writer;
pub mod record_reader;
pub mod records;
pub mod snapshot_writer;
