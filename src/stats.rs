use crate::models::MatchRecord;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics collected by scan workers
#[derive(Default, Debug)]
pub struct ScanStats {
    pub rows_scanned: AtomicU64,
    pub mentions: AtomicU64,
    pub title_hits: AtomicU64,
    pub abstract_hits: AtomicU64,
    pub chunks_completed: AtomicU64,
    pub chunks_failed: AtomicU64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for one successfully scanned chunk
    pub fn record_chunk(&self, rows: usize, records: &[MatchRecord]) {
        let title_hits = records.iter().filter(|r| !r.title_country.is_empty()).count();
        let abstract_hits = records
            .iter()
            .filter(|r| !r.abstract_country.is_empty())
            .count();

        self.rows_scanned.fetch_add(rows as u64, Ordering::Relaxed);
        self.mentions
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        self.title_hits
            .fetch_add(title_hits as u64, Ordering::Relaxed);
        self.abstract_hits
            .fetch_add(abstract_hits as u64, Ordering::Relaxed);
        self.chunks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.chunks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rows(&self) -> u64 {
        self.rows_scanned.load(Ordering::Relaxed)
    }

    pub fn mentions(&self) -> u64 {
        self.mentions.load(Ordering::Relaxed)
    }

    pub fn title_hits(&self) -> u64 {
        self.title_hits.load(Ordering::Relaxed)
    }

    pub fn abstract_hits(&self) -> u64 {
        self.abstract_hits.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.chunks_completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.chunks_failed.load(Ordering::Relaxed)
    }
}
