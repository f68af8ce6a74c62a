/// Upper bound on ids accepted by one bulk request
pub const MAX_BULK_SIZE: usize = 100;

/// Ids are processed in chunks of this size
pub const BULK_CHUNK_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemError {
    pub id: i32,
    pub error: String,
}

/// Per-item tally of a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<BulkItemError>,
}

impl BulkOutcome {
    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self, id: i32, error: impl ToString) {
        self.failed += 1;
        self.errors.push(BulkItemError {
            id,
            error: error.to_string(),
        });
    }
}
