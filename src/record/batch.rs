use crate::record::EnrichedRecord;
use crate::FetchError;
use std::fmt;

/// Result of running one stub through the detail stage
#[derive(Debug)]
pub enum ItemOutcome {
    Accepted(EnrichedRecord),
    Skipped(SkipReason),
}

/// Why an item was dropped from the batch
#[derive(Debug)]
pub enum SkipReason {
    /// The detail page could not be fetched
    Fetch(FetchError),

    /// The detail page came back without any markup to parse
    EmptyDocument { url: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Fetch(e) => write!(f, "{}", e),
            SkipReason::EmptyDocument { url } => write!(f, "empty detail document at {}", url),
        }
    }
}

/// Whether a batch still accepts records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Open,
    Full,
}

/// Ordered records collected by one cycle, never longer than its target
#[derive(Debug, Clone)]
pub struct RecordBatch {
    records: Vec<EnrichedRecord>,
    target_count: usize,
}

impl RecordBatch {
    pub fn new(target_count: usize) -> Self {
        Self {
            records: Vec::with_capacity(target_count.min(1024)),
            target_count,
        }
    }

    /// Appends a record unless the batch is already full
    ///
    /// Returns the status after the append; a record offered to a full batch
    /// is dropped.
    pub fn push(&mut self, record: EnrichedRecord) -> BatchStatus {
        if !self.is_full() {
            self.records.push(record);
        }
        self.status()
    }

    pub fn status(&self) -> BatchStatus {
        if self.is_full() {
            BatchStatus::Full
        } else {
            BatchStatus::Open
        }
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.target_count
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EnrichedRecord> {
        self.records
    }
}
