//! Self-imposed usage policy: a daily extraction quota and a sliding request window.
//!
//! The gate is explicitly constructed and shared (usually behind an `Arc`) by everything
//! that issues page loads. All counters live behind a single mutex so a check and the
//! update that follows it can be made indivisible through [`ComplianceGate::admit`].

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Limits enforced by a [`ComplianceGate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceLimits {
    /// Recorded extractions allowed per UTC calendar day
    pub daily_limit: u32,
    /// Length of the trailing rate-limit window
    pub window: Duration,
    /// Extractions allowed inside one window
    pub max_per_window: u32,
}

impl Default for ComplianceLimits {
    fn default() -> Self {
        Self {
            daily_limit: 50,
            window: Duration::from_secs(60),
            max_per_window: 10,
        }
    }
}

/// Outcome of evaluating the policy at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    RateLimited {
        reason: String,
        reset_at: DateTime<Utc>,
    },
    Blocked {
        reason: String,
    },
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "compliant",
            ComplianceStatus::RateLimited { .. } => "rate_limited",
            ComplianceStatus::Blocked { .. } => "blocked",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gate decision together with the quota state it was taken against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceDecision {
    #[serde(flatten)]
    pub status: ComplianceStatus,
    pub daily_usage_count: u32,
    pub daily_limit: u32,
    pub session_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ComplianceDecision {
    pub fn is_compliant(&self) -> bool {
        matches!(self.status, ComplianceStatus::Compliant)
    }

    /// When a rate-limited caller may try again
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        match &self.status {
            ComplianceStatus::RateLimited { reset_at, .. } => Some(*reset_at),
            _ => None,
        }
    }
}

/// Read-only usage report for one UTC day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub date: NaiveDate,
    pub usage_count: u32,
    pub daily_limit: u32,
    pub remaining: u32,
    pub session_id: String,
}

#[derive(Debug, Default)]
struct Counters {
    daily_usage: HashMap<NaiveDate, u32>,
    request_times: HashMap<NaiveDate, Vec<DateTime<Utc>>>,
    // admitted attempts that have not been recorded yet
    reserved: HashMap<NaiveDate, u32>,
    blocked: Option<String>,
}

/// Daily quota and sliding-window rate limiter for page loads
#[derive(Debug)]
pub struct ComplianceGate {
    limits: ComplianceLimits,
    session_id: String,
    counters: Mutex<Counters>,
}

impl ComplianceGate {
    /// Create a gate whose session id is derived from the current UTC time
    pub fn new(limits: ComplianceLimits) -> Self {
        let session_id = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        Self::with_session_id(limits, session_id)
    }

    pub fn with_session_id(limits: ComplianceLimits, session_id: impl Into<String>) -> Self {
        Self {
            limits,
            session_id: session_id.into(),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn limits(&self) -> &ComplianceLimits {
        &self.limits
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Evaluate the policy at `now` without consuming quota.
    ///
    /// The only state change is pruning window entries older than the window, which
    /// is idempotent.
    pub fn check(&self, now: DateTime<Utc>) -> ComplianceDecision {
        let mut counters = self.lock();
        self.evaluate(&mut counters, now)
    }

    /// Consume one permit for `now`, unconditionally.
    pub fn record(&self, now: DateTime<Utc>) {
        let mut counters = self.lock();
        self.record_locked(&mut counters, now);
    }

    /// Check and reserve a permit in one critical section.
    ///
    /// While the returned [`Permit`] is alive it counts against both the daily and the
    /// window limit, so concurrent callers cannot pass on the same remaining slot.
    /// Returns the rejecting decision when the policy does not allow a new attempt.
    pub fn admit(&self, now: DateTime<Utc>) -> Result<Permit<'_>, ComplianceDecision> {
        let mut counters = self.lock();
        let decision = self.evaluate(&mut counters, now);
        if !decision.is_compliant() {
            warn!(
                "Compliance check rejected attempt: {} ({}/{} today)",
                decision.status, decision.daily_usage_count, decision.daily_limit
            );
            return Err(decision);
        }

        let day = now.date_naive();
        *counters.reserved.entry(day).or_insert(0) += 1;
        debug!("Reserved permit for {}", day);

        Ok(Permit {
            gate: self,
            day,
            decision,
            attempted: false,
            settled: false,
        })
    }

    pub fn daily_usage_snapshot(&self, now: DateTime<Utc>) -> UsageSnapshot {
        let today = now.date_naive();
        let usage_count = self
            .lock()
            .daily_usage
            .get(&today)
            .copied()
            .unwrap_or(0);

        UsageSnapshot {
            date: today,
            usage_count,
            daily_limit: self.limits.daily_limit,
            remaining: self.limits.daily_limit.saturating_sub(usage_count),
            session_id: self.session_id.clone(),
        }
    }

    /// Refuse every attempt until [`ComplianceGate::unblock`] is called
    pub fn block(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Compliance gate blocked: {}", reason);
        self.lock().blocked = Some(reason);
    }

    pub fn unblock(&self) {
        if self.lock().blocked.take().is_some() {
            info!("Compliance gate unblocked");
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.lock().blocked.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // counters stay consistent even if a holder panicked; every update is a single step
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evaluate(&self, counters: &mut Counters, now: DateTime<Utc>) -> ComplianceDecision {
        let today = now.date_naive();
        let daily_count = counters.daily_usage.get(&today).copied().unwrap_or(0);
        let reserved = counters.reserved.get(&today).copied().unwrap_or(0);

        if let Some(reason) = &counters.blocked {
            return self.decision(
                ComplianceStatus::Blocked {
                    reason: reason.clone(),
                },
                daily_count,
                vec![reason.clone()],
            );
        }

        if daily_count.saturating_add(reserved) >= self.limits.daily_limit {
            return self.decision(
                ComplianceStatus::RateLimited {
                    reason: "Daily extraction limit reached".to_string(),
                    reset_at: start_of_next_day(today, now),
                },
                daily_count,
                vec!["Daily extraction limit reached".to_string()],
            );
        }

        let window = window_delta(self.limits.window);
        let window_start = now - window;
        let in_window = match counters.request_times.get_mut(&today) {
            Some(times) => {
                times.retain(|t| *t > window_start);
                times.len()
            }
            None => 0,
        };

        if in_window.saturating_add(reserved as usize) >= self.limits.max_per_window as usize {
            return self.decision(
                ComplianceStatus::RateLimited {
                    reason: "Rate limit exceeded".to_string(),
                    reset_at: now + window,
                },
                daily_count,
                vec!["Rate limit exceeded".to_string()],
            );
        }

        self.decision(ComplianceStatus::Compliant, daily_count, Vec::new())
    }

    fn record_locked(&self, counters: &mut Counters, now: DateTime<Utc>) {
        let today = now.date_naive();
        let usage = counters.daily_usage.entry(today).or_insert(0);
        *usage += 1;
        let usage = *usage;
        counters.request_times.retain(|day, _| *day >= today);
        counters.request_times.entry(today).or_default().push(now);

        info!(
            "Recorded extraction, daily usage: {}/{}",
            usage, self.limits.daily_limit
        );
    }

    fn release(&self, counters: &mut Counters, day: NaiveDate) {
        if let Some(reserved) = counters.reserved.get_mut(&day) {
            *reserved = reserved.saturating_sub(1);
            if *reserved == 0 {
                counters.reserved.remove(&day);
            }
        }
    }

    fn decision(
        &self,
        status: ComplianceStatus,
        daily_usage_count: u32,
        warnings: Vec<String>,
    ) -> ComplianceDecision {
        ComplianceDecision {
            status,
            daily_usage_count,
            daily_limit: self.limits.daily_limit,
            session_id: self.session_id.clone(),
            warnings,
        }
    }
}

/// A reserved slot obtained from [`ComplianceGate::admit`].
///
/// Calling [`Permit::record`] bills the attempt. Dropping the permit unrecorded gives
/// the slot back, unless [`Permit::mark_attempted`] was called first, in which case the
/// drop bills it.
#[must_use = "dropping a permit without recording it releases the reservation"]
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a ComplianceGate,
    day: NaiveDate,
    decision: ComplianceDecision,
    attempted: bool,
    settled: bool,
}

impl Permit<'_> {
    /// The decision that admitted this attempt
    pub fn decision(&self) -> &ComplianceDecision {
        &self.decision
    }

    /// The page load has been dispatched; from here on the attempt is billed even if
    /// the permit is dropped without [`Permit::record`]
    pub fn mark_attempted(&mut self) {
        self.attempted = true;
    }

    pub fn record(mut self, now: DateTime<Utc>) {
        let mut counters = self.gate.lock();
        self.gate.release(&mut counters, self.day);
        self.gate.record_locked(&mut counters, now);
        self.settled = true;
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut counters = self.gate.lock();
        self.gate.release(&mut counters, self.day);
        if self.attempted {
            self.gate.record_locked(&mut counters, Utc::now());
        } else {
            debug!("Released unrecorded permit for {}", self.day);
        }
    }
}

fn window_delta(window: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(window.as_millis()).unwrap_or(i64::MAX / 1_000))
}

fn start_of_next_day(today: NaiveDate, now: DateTime<Utc>) -> DateTime<Utc> {
    today
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, min, sec).unwrap()
    }

    fn gate(daily_limit: u32, max_per_window: u32) -> ComplianceGate {
        ComplianceGate::with_session_id(
            ComplianceLimits {
                daily_limit,
                window: Duration::from_secs(60),
                max_per_window,
            },
            "test-session",
        )
    }

    #[test]
    fn test_daily_limit_after_two_cycles() {
        let gate = gate(2, 10);

        for i in 0..2 {
            let now = at(12, i, 0);
            assert!(gate.check(now).is_compliant());
            gate.record(now);
        }

        let decision = gate.check(at(12, 5, 0));
        assert_eq!(decision.status.as_str(), "rate_limited");
        assert_eq!(decision.daily_usage_count, 2);
        assert_eq!(decision.reset_at(), Some(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()));
        assert_eq!(decision.warnings, vec!["Daily extraction limit reached"]);
    }

    #[test]
    fn test_window_limit_resets_after_window() {
        let gate = gate(50, 1);
        let first = at(12, 0, 0);
        gate.record(first);
        gate.record(first + chrono::Duration::milliseconds(500));

        let now = first + chrono::Duration::seconds(1);
        let decision = gate.check(now);
        assert_eq!(
            decision.status,
            ComplianceStatus::RateLimited {
                reason: "Rate limit exceeded".to_string(),
                reset_at: now + chrono::Duration::seconds(60),
            }
        );
        assert_eq!(decision.daily_usage_count, 2);

        assert!(gate.check(first + chrono::Duration::seconds(61)).is_compliant());
    }

    #[test]
    fn test_check_is_idempotent() {
        let gate = gate(5, 5);
        gate.record(at(9, 0, 0));

        for _ in 0..10 {
            let decision = gate.check(at(9, 0, 30));
            assert!(decision.is_compliant());
            assert_eq!(decision.daily_usage_count, 1);
        }
    }

    #[test]
    fn test_pruning_keeps_daily_usage() {
        let gate = gate(50, 2);
        gate.record(at(8, 0, 0));
        gate.record(at(8, 0, 1));
        assert!(!gate.check(at(8, 0, 2)).is_compliant());

        let decision = gate.check(at(10, 0, 0));
        assert!(decision.is_compliant());
        assert_eq!(decision.daily_usage_count, 2);
    }

    #[test]
    fn test_new_day_has_fresh_quota() {
        let gate = gate(1, 10);
        gate.record(at(23, 59, 0));
        assert!(!gate.check(at(23, 59, 30)).is_compliant());

        let tomorrow = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 1).unwrap();
        let decision = gate.check(tomorrow);
        assert!(decision.is_compliant());
        assert_eq!(decision.daily_usage_count, 0);
    }

    #[test]
    fn test_recording_drops_earlier_days() {
        let gate = gate(5, 10);
        gate.record(at(23, 59, 0));
        gate.record(Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap());

        let counters = gate.lock();
        assert_eq!(counters.request_times.len(), 1);
        assert!(counters
            .request_times
            .contains_key(&NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()));
    }

    #[test]
    fn test_snapshot_remaining() {
        let gate = gate(2, 10);
        let snapshot = gate.daily_usage_snapshot(at(12, 0, 0));
        assert_eq!(snapshot.remaining, 2);
        assert_eq!(snapshot.session_id, "test-session");

        for i in 0..3 {
            gate.record(at(12, i, 0));
        }
        let snapshot = gate.daily_usage_snapshot(at(12, 10, 0));
        assert_eq!(snapshot.usage_count, 3);
        assert_eq!(snapshot.remaining, 0);
        assert_eq!(snapshot.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn test_admit_reserves_last_slot() {
        let gate = gate(1, 10);
        let now = at(12, 0, 0);

        let permit = gate.admit(now).unwrap();
        let rejected = gate.admit(now).unwrap_err();
        assert_eq!(rejected.status.as_str(), "rate_limited");
        assert_eq!(rejected.daily_usage_count, 0);

        drop(permit);
        let permit = gate.admit(now).unwrap();
        permit.record(now);

        assert_eq!(gate.daily_usage_snapshot(now).usage_count, 1);
        assert!(!gate.check(now).is_compliant());
    }

    #[test]
    fn test_attempted_permit_is_billed_on_drop() {
        let gate = gate(5, 10);
        let now = Utc::now();

        let mut permit = gate.admit(now).unwrap();
        permit.mark_attempted();
        drop(permit);
        assert_eq!(gate.daily_usage_snapshot(now).usage_count, 1);

        // an unattempted permit still hands its slot back
        drop(gate.admit(now).unwrap());
        assert_eq!(gate.daily_usage_snapshot(now).usage_count, 1);
        assert!(gate.lock().reserved.is_empty());
    }

    #[test]
    fn test_reservation_counts_against_window() {
        let gate = gate(50, 1);
        let now = at(12, 0, 0);

        let _permit = gate.admit(now).unwrap();
        let decision = gate.check(now);
        assert_eq!(decision.reset_at(), Some(now + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_concurrent_admissions_never_overrun() {
        let gate = Arc::new(gate(5, 100));
        let now = at(12, 0, 0);

        let admitted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..20)
                .map(|_| {
                    let gate = Arc::clone(&gate);
                    scope.spawn(move || match gate.admit(now) {
                        Ok(permit) => {
                            permit.record(now);
                            1
                        }
                        Err(_) => 0,
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 5);
        assert_eq!(gate.daily_usage_snapshot(now).usage_count, 5);
    }

    #[test]
    fn test_block_and_unblock() {
        let gate = gate(5, 5);
        gate.block("maintenance");
        assert!(gate.is_blocked());

        let decision = gate.check(at(12, 0, 0));
        assert_eq!(
            decision.status,
            ComplianceStatus::Blocked {
                reason: "maintenance".to_string()
            }
        );
        assert!(gate.admit(at(12, 0, 0)).is_err());

        gate.unblock();
        assert!(gate.check(at(12, 0, 0)).is_compliant());
    }

    #[test]
    fn test_decision_serializes_flat() {
        let gate = gate(5, 5);
        let value = serde_json::to_value(gate.check(at(12, 0, 0))).unwrap();
        assert_eq!(value["status"], "compliant");
        assert_eq!(value["daily_limit"], 5);
        assert!(value.get("warnings").is_none());
    }

    #[test]
    fn test_session_id_format() {
        let gate = ComplianceGate::new(ComplianceLimits::default());
        assert_eq!(gate.session_id().len(), "20240501-120000".len());
        assert_eq!(gate.session_id().as_bytes()[8], b'-');
    }
}
