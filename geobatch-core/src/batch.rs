use crate::activity_log::ActivityLog;
use crate::address::{ProcessedRow, RowStatus};
use crate::corrections;
use crate::providers::ReverseGeocoder;
use crate::report::{self, Report};
use crate::table::{ColumnSelection, InputTable};
use crate::validator::{validate, Validation};
use anyhow::Result;
use std::time::Duration;

/// Running totals for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Rows geocoded successfully
    pub processed: usize,
    /// Rows whose provider call failed
    pub errors: usize,
    /// Rows rejected by validation
    pub skipped: usize,
    /// Valid rows left unprocessed because the quota was exhausted
    pub deferred: usize,
}

impl RunCounters {
    /// Real provider calls made so far
    pub fn calls(&self) -> usize {
        self.processed + self.errors
    }

    pub fn handled(&self) -> usize {
        self.processed + self.errors + self.skipped + self.deferred
    }
}

/// Snapshot handed to the progress observer after each row
#[derive(Debug, Clone, Copy)]
pub struct RunProgress {
    /// 1-based position of the row just handled
    pub row: usize,
    pub total_rows: usize,
    pub status: RowStatus,
    pub counters: RunCounters,
    /// Estimated time until every remaining eligible row is called
    pub remaining: Duration,
}

impl RunProgress {
    pub fn percent(&self) -> f64 {
        if self.total_rows == 0 {
            100.0
        } else {
            self.row as f64 * 100.0 / self.total_rows as f64
        }
    }
}

/// Expected time spent pausing between calls for `valid_rows` rows
pub fn estimate_duration(valid_rows: usize, quota: Option<usize>, rate_limit: Duration) -> Duration {
    let calls = quota.map_or(valid_rows, |q| valid_rows.min(q));
    pause_total(rate_limit, calls)
}

/// `rate_limit * calls`, saturating instead of truncating or overflowing
fn pause_total(rate_limit: Duration, calls: usize) -> Duration {
    let calls = u32::try_from(calls).unwrap_or(u32::MAX);
    rate_limit.checked_mul(calls).unwrap_or(Duration::MAX)
}

/// Mutable state of a single run: created when the run starts, returned with its outcome
#[derive(Debug)]
pub struct RunContext {
    pub counters: RunCounters,
    pub log: ActivityLog,
    quota: Option<usize>,
    rate_limit: Duration,
    valid_rows: usize,
    valid_seen: usize,
}

impl RunContext {
    fn new(quota: Option<usize>, rate_limit: Duration, valid_rows: usize, log: ActivityLog) -> Self {
        Self {
            counters: RunCounters::default(),
            log,
            quota,
            rate_limit,
            valid_rows,
            valid_seen: 0,
        }
    }

    fn quota_exhausted(&self) -> bool {
        self.quota
            .map(|q| self.counters.calls() >= q)
            .unwrap_or(false)
    }

    /// Valid rows not yet handled that the quota still allows calling
    pub fn remaining_eligible(&self) -> usize {
        let left = self.valid_rows - self.valid_seen;
        match self.quota {
            Some(q) => left.min(q.saturating_sub(self.counters.calls())),
            None => left,
        }
    }

    pub fn remaining_time(&self) -> Duration {
        pause_total(self.rate_limit, self.remaining_eligible())
    }
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct BatchOutcome {
    pub rows: Vec<ProcessedRow>,
    pub report: Report,
    pub context: RunContext,
}

impl BatchOutcome {
    pub fn counters(&self) -> RunCounters {
        self.context.counters
    }
}

/// Drives one provider over every row of a table
///
/// Rows are handled strictly one after another in input order. Invalid rows and
/// rows past the quota never reach the provider; every real call is followed by
/// the provider's rate-limit pause.
pub struct BatchRunner<'a> {
    client: &'a dyn ReverseGeocoder,
    quota: Option<usize>,
    log_window: usize,
    pause: Box<dyn FnMut(Duration) + 'a>,
    observer: Option<Box<dyn FnMut(&RunProgress, &ActivityLog) + 'a>>,
}

impl<'a> BatchRunner<'a> {
    /// Runner with no quota that sleeps the thread between calls
    pub fn new(client: &'a dyn ReverseGeocoder) -> Self {
        Self {
            client,
            quota: None,
            log_window: crate::activity_log::DEFAULT_WINDOW,
            pause: Box::new(std::thread::sleep),
            observer: None,
        }
    }

    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_log_window(mut self, window: usize) -> Self {
        self.log_window = window;
        self
    }

    /// Replace the rate-limit pause (tests use this to avoid sleeping)
    pub fn with_pause(mut self, pause: impl FnMut(Duration) + 'a) -> Self {
        self.pause = Box::new(pause);
        self
    }

    /// Called after every row with a progress snapshot and the activity log
    pub fn on_progress(mut self, observer: impl FnMut(&RunProgress, &ActivityLog) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Process every row in input order and assemble the report
    pub fn run(mut self, table: &InputTable, columns: &ColumnSelection) -> Result<BatchOutcome> {
        let resolved = table.resolve(columns)?;
        let coordinates = table.coordinates(&resolved);
        let valid_rows = coordinates
            .iter()
            .filter(|&&(lat, lon)| validate(lat, lon).is_valid())
            .count();

        let rate_limit = self.client.rate_limit();
        let mut ctx = RunContext::new(
            self.quota,
            rate_limit,
            valid_rows,
            ActivityLog::new(self.log_window),
        );

        let total = coordinates.len();
        ctx.log.push(format!(
            "🚀 Geocoding {} rows ({} valid) with {}, estimated {}s",
            total,
            valid_rows,
            self.client.provider(),
            estimate_duration(valid_rows, self.quota, rate_limit).as_secs_f64()
        ));

        let mut rows = Vec::with_capacity(total);

        for (index, &(lat, lon)) in coordinates.iter().enumerate() {
            let row = self.process_row(index + 1, lat, lon, &mut ctx);
            let status = row.status;
            rows.push(row);

            if let Some(observer) = self.observer.as_mut() {
                let progress = RunProgress {
                    row: index + 1,
                    total_rows: total,
                    status,
                    counters: ctx.counters,
                    remaining: ctx.remaining_time(),
                };
                observer(&progress, &ctx.log);
            }
        }

        let counters = ctx.counters;
        debug_assert_eq!(counters.handled(), total);
        ctx.log.push(format!(
            "🏁 Done: {} succeeded, {} failed, {} skipped, {} deferred",
            counters.processed, counters.errors, counters.skipped, counters.deferred
        ));

        let report = report::assemble(table, &rows, columns)?;
        Ok(BatchOutcome {
            rows,
            report,
            context: ctx,
        })
    }

    fn process_row(
        &mut self,
        row_number: usize,
        lat: Option<f64>,
        lon: Option<f64>,
        ctx: &mut RunContext,
    ) -> ProcessedRow {
        let (lat_value, lon_value) = match (validate(lat, lon), lat, lon) {
            (Validation::Valid, Some(lat_value), Some(lon_value)) => (lat_value, lon_value),
            (validation, _, _) => {
                let status = validation
                    .failure_status()
                    .unwrap_or(RowStatus::NoCoordinates);
                ctx.counters.skipped += 1;
                ctx.log.push(format!("⏭️ Row {}: skipped ({})", row_number, status));
                return ProcessedRow::placeholder(lat, lon, status);
            }
        };

        ctx.valid_seen += 1;

        if ctx.quota_exhausted() {
            ctx.counters.deferred += 1;
            ctx.log.push(format!(
                "⏸️ Row {}: quota of {} requests reached, deferred",
                row_number,
                ctx.quota.unwrap_or_default()
            ));
            return ProcessedRow::placeholder(lat, lon, RowStatus::RateLimitDeferred);
        }

        let answer = self.client.reverse_geocode(lat_value, lon_value, &mut ctx.log);

        let row = match answer {
            Some(mut address) => {
                let (state, full_address) = corrections::correct(&address.full_address, &address.state);
                address.state = state;
                address.full_address = full_address;
                ctx.counters.processed += 1;
                ProcessedRow {
                    latitude: lat,
                    longitude: lon,
                    address,
                    status: RowStatus::Success,
                }
            }
            None => {
                ctx.counters.errors += 1;
                ProcessedRow::placeholder(lat, lon, RowStatus::Error)
            }
        };

        (self.pause)(ctx.rate_limit);
        row
    }
}
