use crate::error::{EngineError, Result};
use serde::de::DeserializeOwned;
use std::io::Read;

/// Reads typed records from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<T>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct RecordReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RecordReader<R> {
    /// Creates a new `RecordReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes records.
    ///
    /// A malformed row yields an error for that row only; iteration continues.
    pub fn records<T: DeserializeOwned>(self) -> impl Iterator<Item = Result<T>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EngineError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::csv::records::DonationRecord;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "id, campaign, amount, currency, gateway, reference\n\
                    1, 1, 25.50, usd, stripe, cs_1\n\
                    2, 1, 10, USD, bank_transfer,";
        let reader = RecordReader::new(data.as_bytes());
        let results: Vec<Result<DonationRecord>> = reader.records().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.campaign, 1);
        assert_eq!(first.amount, dec!(25.50));
        assert_eq!(first.reference.as_deref(), Some("cs_1"));
        assert!(results[1].as_ref().unwrap().reference.is_none());
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "id, campaign, amount, currency, gateway, reference\n\
                    x, 1, 1.0, USD, stripe,\n\
                    3, 1, 1.0, USD, stripe,";
        let reader = RecordReader::new(data.as_bytes());
        let results: Vec<Result<DonationRecord>> = reader.records().collect();

        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }
}
