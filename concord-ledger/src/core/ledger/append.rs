use concord_common::{
    error::{ConcordError, Result},
    Record,
};

use crate::{core::ledger::integrity, Ledger};

impl Ledger {
    /// Returns the last record.
    pub fn tip(&self) -> Result<&Record> {
        self.records.last().ok_or(ConcordError::EmptyLedger)
    }

    /// Index the next appended record must carry.
    pub fn next_index(&self) -> Result<u64> {
        Ok(self.tip()?.index() + 1)
    }

    /// Appends `record` as the new tip.
    ///
    /// Requires `record.prev_hash == tip.hash`, `record.index == tip.index + 1`
    /// and an intact self hash. On failure the ledger is unchanged.
    pub fn append(&mut self, record: Record) -> Result<&Record> {
        let tip = self.tip()?;
        integrity::check_link(tip, &record)?;

        tracing::debug!("⛓️ Appending record {} ({})", record.index(), record.hash());
        self.records.push(record);
        self.tip()
    }
}
