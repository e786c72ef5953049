//! Per-merge and cumulative synchronization statistics.

/// What one merge window did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Registered fields at the start of the merge.
    pub fields: usize,
    /// Editor edits copied shadow -> live (step 3).
    pub pushed_to_live: usize,
    /// Worker changes copied live -> shadow (step 4).
    pub pushed_to_shadow: usize,
    /// Unregistered slots refreshed live -> shadow (step 4).
    pub mirrored: usize,
    /// Deferred tasks executed (step 6).
    pub tasks_run: usize,
    /// Ephemeral fields released after the merge.
    pub released: usize,
}

impl SyncStats {
    /// Returns true if the merge moved no data in either direction.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.pushed_to_live == 0
            && self.pushed_to_shadow == 0
            && self.mirrored == 0
            && self.tasks_run == 0
    }

    /// Fraction of registered fields that were copied (0.0 to 1.0).
    #[must_use]
    pub fn copy_ratio(&self) -> f32 {
        if self.fields == 0 {
            0.0
        } else {
            (self.pushed_to_live + self.pushed_to_shadow) as f32 / self.fields as f32
        }
    }
}

/// Totals across every merge a store has performed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Completed merge windows.
    pub merges: u64,
    /// Total shadow -> live copies.
    pub pushed_to_live: u64,
    /// Total live -> shadow copies.
    pub pushed_to_shadow: u64,
    /// Total unregistered-slot refreshes.
    pub mirrored: u64,
    /// Total deferred tasks executed.
    pub tasks_run: u64,
    /// Total ephemeral releases.
    pub released: u64,
}

impl StoreStats {
    /// Folds one merge into the totals.
    pub fn record(&mut self, merge: &SyncStats) {
        self.merges += 1;
        self.pushed_to_live += merge.pushed_to_live as u64;
        self.pushed_to_shadow += merge.pushed_to_shadow as u64;
        self.mirrored += merge.mirrored as u64;
        self.tasks_run += merge.tasks_run as u64;
        self.released += merge.released as u64;
    }
}
