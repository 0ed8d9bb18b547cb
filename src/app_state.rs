// =============================================================================
// Application State — shared between the scan loop and the dashboard API
// =============================================================================
//
// The scan loop is the only writer: it publishes a finished `ScanReport`,
// replacing the previous one.  API handlers only read.
//
// Thread safety:
//   - Atomic counter for completed passes.
//   - parking_lot::RwLock around the latest report (an `Arc`, so readers
//     clone a pointer and never hold the lock while serialising).
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::runtime_config::ScannerConfig;
use crate::scanner::ScanReport;

pub struct AppState {
    /// Effective configuration; fixed after startup.
    pub config: ScannerConfig,

    latest_report: RwLock<Option<Arc<ScanReport>>>,

    scans_completed: AtomicU64,
}

impl AppState {
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            latest_report: RwLock::new(None),
            scans_completed: AtomicU64::new(0),
        }
    }

    /// Replace the latest report.
    pub fn publish(&self, report: ScanReport) {
        *self.latest_report.write() = Some(Arc::new(report));
        self.scans_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn latest_report(&self) -> Option<Arc<ScanReport>> {
        self.latest_report.read().clone()
    }

    pub fn scans_completed(&self) -> u64 {
        self.scans_completed.load(Ordering::Relaxed)
    }
}
