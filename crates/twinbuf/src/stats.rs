//! Worker cycle timing.

use std::time::Duration;

/// Timing of one worker cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct CycleStats {
    /// Cycle number (0 is the priming pass).
    pub cycle: u64,
    /// Time spent inside the merge window in microseconds.
    pub merge_us: u64,
    /// Time spent in the simulation tick in microseconds.
    pub tick_us: u64,
    /// Time spent waiting for the editor in microseconds.
    pub wait_us: u64,
}

/// Accumulator for cycle statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Tick budget used for the over-budget count.
    pub budget_us: u64,
    /// Total cycles recorded.
    pub cycles_recorded: u64,
    /// Sum of merge window times.
    pub merge_us_sum: u64,
    /// Sum of tick times.
    pub tick_us_sum: u64,
    /// Sum of editor wait times.
    pub wait_us_sum: u64,
    /// Min tick time.
    pub min_tick_us: u64,
    /// Max tick time.
    pub max_tick_us: u64,
    /// Ticks that exceeded the budget.
    pub ticks_over_budget: u64,
}

impl FrameStatsAccumulator {
    /// Creates a new accumulator with the given tick budget.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            budget_us: budget.as_micros() as u64,
            cycles_recorded: 0,
            merge_us_sum: 0,
            tick_us_sum: 0,
            wait_us_sum: 0,
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            ticks_over_budget: 0,
        }
    }

    /// Records a cycle's statistics. Returns true if the tick was over budget.
    pub fn record(&mut self, stats: CycleStats) -> bool {
        self.cycles_recorded += 1;
        self.merge_us_sum += stats.merge_us;
        self.tick_us_sum += stats.tick_us;
        self.wait_us_sum += stats.wait_us;
        self.min_tick_us = self.min_tick_us.min(stats.tick_us);
        self.max_tick_us = self.max_tick_us.max(stats.tick_us);

        let over = stats.tick_us > self.budget_us;
        if over {
            self.ticks_over_budget += 1;
        }
        over
    }

    /// Returns average tick time in milliseconds.
    #[must_use]
    pub fn avg_tick_ms(&self) -> f64 {
        self.avg_ms(self.tick_us_sum)
    }

    /// Returns average merge window time in milliseconds.
    #[must_use]
    pub fn avg_merge_ms(&self) -> f64 {
        self.avg_ms(self.merge_us_sum)
    }

    /// Returns average editor wait in milliseconds.
    #[must_use]
    pub fn avg_wait_ms(&self) -> f64 {
        self.avg_ms(self.wait_us_sum)
    }

    /// Returns the fraction of ticks over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.cycles_recorded == 0 {
            return 0.0;
        }
        self.ticks_over_budget as f64 / self.cycles_recorded as f64
    }

    fn avg_ms(&self, sum_us: u64) -> f64 {
        if self.cycles_recorded == 0 {
            return 0.0;
        }
        (sum_us as f64 / self.cycles_recorded as f64) / 1000.0
    }

    /// Prints a summary of the statistics.
    pub fn print_summary(&self) {
        let min_tick = if self.cycles_recorded == 0 { 0 } else { self.min_tick_us };

        println!("╔══════════════════════════════════════════════════════════════════╗");
        println!("║                    CYCLE STATISTICS SUMMARY                      ║");
        println!("╚══════════════════════════════════════════════════════════════════╝");
        println!();
        println!("┌─ TIMING ───────────────────────────────────────────────────────┐");
        println!("│ Cycles Recorded:    {}                                        ", self.cycles_recorded);
        println!("│ Average Tick:       {:.3} ms                                  ", self.avg_tick_ms());
        println!("│ Min Tick:           {:.3} ms                                  ", min_tick as f64 / 1000.0);
        println!("│ Max Tick:           {:.3} ms                                  ", self.max_tick_us as f64 / 1000.0);
        println!("└──────────────────────────────────────────────────────────────────┘");
        println!();
        println!("┌─ BUDGET ───────────────────────────────────────────────────────┐");
        println!("│ Tick Budget:        {:.3} ms                                  ", self.budget_us as f64 / 1000.0);
        println!("│ Over Budget:        {} ticks ({:.1}%)                         ",
            self.ticks_over_budget,
            self.over_budget_ratio() * 100.0);
        println!("└──────────────────────────────────────────────────────────────────┘");

        if self.cycles_recorded > 0 {
            println!();
            println!("┌─ BREAKDOWN ─────────────────────────────────────────────────────┐");
            println!("│ Merge Window:       {:.3} ms                                  ", self.avg_merge_ms());
            println!("│ Tick:               {:.3} ms                                  ", self.avg_tick_ms());
            println!("│ Editor Wait:        {:.3} ms                                  ", self.avg_wait_ms());
            println!("└──────────────────────────────────────────────────────────────────┘");
        }
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_TICK_BUDGET_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulator() {
        let mut acc = FrameStatsAccumulator::new(Duration::from_millis(10));

        for i in 0..100 {
            acc.record(CycleStats {
                cycle: i,
                merge_us: 50,
                tick_us: 5_000 + (i * 100),
                wait_us: 1_000,
            });
        }

        assert_eq!(acc.cycles_recorded, 100);
        assert_eq!(acc.min_tick_us, 5_000);
        assert_eq!(acc.max_tick_us, 14_900);
        // Ticks 51..=99 exceed 10 ms
        assert_eq!(acc.ticks_over_budget, 49);
        assert!((acc.avg_merge_ms() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_empty_accumulator() {
        let acc = FrameStatsAccumulator::default();
        assert_eq!(acc.budget_us, 33_000);
        assert!(acc.avg_tick_ms().abs() < f64::EPSILON);
        assert!(acc.over_budget_ratio().abs() < f64::EPSILON);
    }
}
