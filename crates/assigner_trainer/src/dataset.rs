//! CSV dataset loading and preprocessing
//!
//! Reads ticket rows with columns `title`, `description`, `labels` and
//! `assignee`. The labels cell holds a JSON array of strings; quotes inside
//! quoted cells are escaped with a backslash.

use crate::errors::TrainerError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use ticket_assigner_core::deterministic::row_hash;
use ticket_assigner_core::{Labels, Ticket};

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    labels: String,
    assignee: String,
}

/// One training row: the ticket and its known assignee
#[derive(Clone, Debug, PartialEq)]
pub struct TicketRecord {
    pub ticket: Ticket,
    pub assignee: String,
}

/// Training dataset of labelled tickets
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub records: Vec<TicketRecord>,
}

impl Dataset {
    pub fn new(records: Vec<TicketRecord>) -> Self {
        Self { records }
    }

    /// Load dataset from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, TrainerError> {
        let file = File::open(path.as_ref()).map_err(|e| {
            TrainerError::Dataset(format!("cannot open {}: {e}", path.as_ref().display()))
        })?;
        Self::from_reader(file)
    }

    /// Parse CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TrainerError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .escape(Some(b'\\'))
            .from_reader(reader);

        if !reader.headers()?.iter().any(|h| h == "assignee") {
            return Err(TrainerError::Dataset(
                "header row has no 'assignee' column".to_string(),
            ));
        }

        let mut records = Vec::new();
        for (idx, result) in reader.deserialize::<RawRecord>().enumerate() {
            let row = idx + 1;
            let raw = result.map_err(|e| match e.kind() {
                csv::ErrorKind::Deserialize { .. } | csv::ErrorKind::UnequalLengths { .. } => {
                    TrainerError::InvalidRow {
                        row,
                        message: e.to_string(),
                    }
                }
                _ => TrainerError::Csv(e),
            })?;

            let labels: Vec<String> =
                serde_json::from_str(&raw.labels).map_err(|e| TrainerError::InvalidRow {
                    row,
                    message: format!("labels {:?} is not a JSON array of strings: {e}", raw.labels),
                })?;

            records.push(TicketRecord {
                ticket: Ticket::new(raw.title, raw.description, Labels::List(labels)),
                assignee: raw.assignee,
            });
        }

        Ok(Self { records })
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Normalized feature text of every row
    pub fn texts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.ticket.feature_text()).collect()
    }

    pub fn assignees(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.assignee.as_str()).collect()
    }

    /// Rows per assignee, in assignee order
    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.assignee.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Deterministically shuffle the rows using `seed`
    pub fn shuffle(&mut self, seed: u64) {
        let mut keyed: Vec<(u64, usize, TicketRecord)> = self
            .records
            .drain(..)
            .enumerate()
            .map(|(i, record)| (row_hash(i, seed), i, record))
            .collect();

        keyed.sort_by_key(|(hash, i, _)| (*hash, *i));
        self.records = keyed.into_iter().map(|(_, _, record)| record).collect();
    }

    /// Split into `(train, test)`; the test part holds the last
    /// `ceil(len * test_fraction)` rows.
    ///
    /// A non-zero fraction always leaves at least one row on each side when
    /// the dataset has two or more rows.
    pub fn split(&self, test_fraction: f64) -> Result<(Dataset, Dataset), TrainerError> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(TrainerError::Dataset(format!(
                "test fraction must be in [0, 1), got {test_fraction}"
            )));
        }

        let n = self.len();
        let mut n_test = (n as f64 * test_fraction).ceil() as usize;
        if test_fraction > 0.0 && n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        }
        let n_test = n_test.min(n);

        let (train, test) = self.records.split_at(n - n_test);
        Ok((Dataset::new(train.to_vec()), Dataset::new(test.to_vec())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"title,description,labels,assignee
Fix login bug,Users cannot log in,"[\"bug\", \"auth\"]",alice
Add dark mode,UI theme request,"[\"feature\", \"ui\"]",bob
Slow query,"Timeout, under load","[]",carol
"#;

    #[test]
    fn test_parse_rows() {
        let dataset = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(
            dataset.records[0].ticket.labels,
            Labels::List(vec!["bug".to_string(), "auth".to_string()])
        );
        assert_eq!(dataset.records[2].ticket.description, "Timeout, under load");
        assert_eq!(
            dataset.texts()[0],
            "Fix login bug Users cannot log in bug auth"
        );
        assert_eq!(dataset.assignees(), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_bad_labels_name_the_row() {
        let csv = "title,description,labels,assignee\na,b,\"[]\",x\nc,d,not-json,y\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TrainerError::InvalidRow { row: 2, .. }));

        let csv = "title,description,labels,assignee\na,b,\"[1, 2]\",x\n";
        assert!(matches!(
            Dataset::from_reader(csv.as_bytes()),
            Err(TrainerError::InvalidRow { row: 1, .. })
        ));
    }

    #[test]
    fn test_short_row_names_the_row() {
        let csv = "title,description,labels,assignee\na,b,\"[]\",x\nc,d\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TrainerError::InvalidRow { row: 2, .. }));
    }

    #[test]
    fn test_reader_errors_are_csv_errors() {
        let bytes: &[u8] = b"title,description,labels,assignee\n\xff\xfe,b,\"[]\",x\n";
        let err = Dataset::from_reader(bytes).unwrap_err();
        assert!(matches!(err, TrainerError::Csv(_)), "got {err:?}");
    }

    #[test]
    fn test_missing_assignee_column() {
        let csv = "title,description,labels\na,b,\"[]\"\n";
        assert!(matches!(
            Dataset::from_reader(csv.as_bytes()),
            Err(TrainerError::Dataset(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Dataset::from_csv("/definitely/not/here.csv"),
            Err(TrainerError::Dataset(_))
        ));
    }

    #[test]
    fn test_label_counts() {
        let dataset = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let counts = dataset.label_counts();
        assert_eq!(counts.len(), 3);
        assert_eq!(counts["alice"], 1);
    }

    #[test]
    fn test_shuffle_determinism() {
        let mut ds1 = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let mut ds2 = ds1.clone();

        ds1.shuffle(42);
        ds2.shuffle(42);

        assert_eq!(ds1.records, ds2.records);
        assert_eq!(ds1.len(), 3);
    }

    #[test]
    fn test_split_sizes() {
        let record = TicketRecord {
            ticket: Ticket::default(),
            assignee: "a".to_string(),
        };
        let dataset = Dataset::new(vec![record; 10]);

        let (train, test) = dataset.split(0.2).unwrap();
        assert_eq!((train.len(), test.len()), (8, 2));

        let (train, test) = dataset.split(0.25).unwrap();
        assert_eq!((train.len(), test.len()), (7, 3));

        let (train, test) = dataset.split(0.0).unwrap();
        assert_eq!((train.len(), test.len()), (10, 0));

        let two = Dataset::new(dataset.records[..2].to_vec());
        let (train, test) = two.split(0.2).unwrap();
        assert_eq!((train.len(), test.len()), (1, 1));

        assert!(dataset.split(1.0).is_err());
        assert!(dataset.split(-0.1).is_err());
    }
}
