// src/record_store.rs

use crate::error::StoreError;
use crate::model::InvoiceRecord;
use crate::storage::{INVOICES_KEY, StoragePort};
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

/// Confirmed invoices, newest first, mirrored to the `invoices` key.
pub struct RecordStore<P> {
    port: P,
    records: Vec<InvoiceRecord>,
}

impl<P: StoragePort> RecordStore<P> {
    /// Load the persisted sequence. A missing key is an empty store.
    pub fn load_all(port: P) -> Result<Self, StoreError> {
        let records = match port.get(INVOICES_KEY)? {
            None => Vec::new(),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                key: INVOICES_KEY,
                source,
            })?,
        };

        let store = Self { port, records };
        info!(count = store.records.len(), "Record store loaded");
        Ok(store)
    }

    /// Prepend a record and re-serialize the whole sequence.
    ///
    /// On a failed write the in-memory head is rolled back so memory and
    /// storage stay in step.
    pub fn append(&mut self, record: InvoiceRecord) -> Result<(), StoreError> {
        let id = record.id;
        self.records.insert(0, record);

        if let Err(e) = self.persist() {
            self.records.remove(0);
            warn!(id = id, error = %e, "Invoice not stored, rolled back");
            return Err(e);
        }

        info!(id = id, count = self.records.len(), "Invoice stored");
        Ok(())
    }

    /// Creation timestamp in milliseconds, bumped past any id already taken.
    pub fn next_id(&self, now: OffsetDateTime) -> u64 {
        let mut id = u64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0);
        while self.records.iter().any(|r| r.id == id) {
            id += 1;
        }
        id
    }

    #[cfg(test)]
    pub fn records(&self) -> &[InvoiceRecord] {
        &self.records
    }

    /// The `n` most recent records.
    pub fn recent(&self, n: usize) -> &[InvoiceRecord] {
        &self.records[..n.min(self.records.len())]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records confirmed on the given calendar day.
    pub fn created_on(&self, day: Date) -> u64 {
        self.records.iter().filter(|r| r.created_on() == day).count() as u64
    }

    /// Drop every record, in memory and in storage.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.port.remove(INVOICES_KEY)?;
        let dropped = self.records.len();
        self.records.clear();
        info!(dropped = dropped, "Record store cleared");
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.records).map_err(|source| StoreError::Serialize {
            key: INVOICES_KEY,
            source,
        })?;
        self.port.set(INVOICES_KEY, &json)?;
        Ok(())
    }
}
