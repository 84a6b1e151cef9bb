//! Load generator for a running keylock server.
//!
//! A scenario expands into a fixed request plan; a pool of workers drains
//! the plan concurrently and the replies are tallied by result code.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::ValueEnum;
use rand::seq::SliceRandom;

use keylock_core::Operation;

use crate::client::KeylockClient;

/// Request mix to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// lock, status, unlock over three independently shuffled key orders.
    Random,
    /// Every key is locked, then checked, then unlocked, pass by pass.
    Consistent,
    /// Mostly status checks with one lock/unlock window per key.
    MajorityStatus,
    /// 10 rlock, 9 runlock, 1 status per key. Only 200/202 are expected.
    MajorityReads,
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scenario::Random => "random",
            Scenario::Consistent => "consistent",
            Scenario::MajorityStatus => "majority-status",
            Scenario::MajorityReads => "majority-reads",
        };
        f.write_str(s)
    }
}

pub type Step = (Operation, String);

/// Expands a scenario over `keys` random keys into an ordered request plan.
pub fn plan(scenario: Scenario, keys: usize) -> Vec<Step> {
    let mut rng = rand::thread_rng();
    let base: Vec<String> = (0..keys).map(|_| rand::random::<u64>().to_string()).collect();

    match scenario {
        Scenario::Random => {
            let mut orders = [base.clone(), base.clone(), base];
            for order in orders.iter_mut() {
                order.shuffle(&mut rng);
            }
            let [locks, statuses, unlocks] = orders;
            locks
                .into_iter()
                .zip(statuses)
                .zip(unlocks)
                .flat_map(|((l, s), u)| {
                    [
                        (Operation::Lock, l),
                        (Operation::Status, s),
                        (Operation::Unlock, u),
                    ]
                })
                .collect()
        }
        Scenario::Consistent => passes(&base, 3, |pass| match pass {
            0 => Operation::Lock,
            1 => Operation::Status,
            _ => Operation::Unlock,
        }),
        Scenario::MajorityStatus => passes(&base, 20, |pass| match pass {
            5 => Operation::Lock,
            10 => Operation::Unlock,
            _ => Operation::Status,
        }),
        Scenario::MajorityReads => passes(&base, 20, |pass| match pass {
            0..=9 => Operation::RLock,
            10..=18 => Operation::RUnlock,
            _ => Operation::Status,
        }),
    }
}

/// Repeats the key list `count` times, choosing the operation by pass index.
fn passes(keys: &[String], count: usize, op_for: impl Fn(usize) -> Operation) -> Vec<Step> {
    (0..count)
        .flat_map(|pass| keys.iter().map(move |key| (pass, key)))
        .map(|(pass, key)| (op_for(pass), key.clone()))
        .collect()
}

/// Outcome of a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub scenario: Scenario,
    pub workers: usize,
    pub requests: usize,
    pub elapsed: Duration,
    pub tally: BTreeMap<String, usize>,
    /// Transport failures plus, for `majority-reads`, replies other than
    /// Accepted/OK.
    pub errors: usize,
}

impl BenchReport {
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.requests as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario:   {}", self.scenario)?;
        writeln!(f, "workers:    {}", self.workers)?;
        writeln!(f, "requests:   {}", self.requests)?;
        writeln!(f, "elapsed:    {:.3}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "throughput: {:.0} req/s", self.throughput())?;
        for (code, n) in &self.tally {
            writeln!(f, "  {:<12} {}", code, n)?;
        }
        write!(f, "errors:     {}", self.errors)
    }
}

/// Drains the scenario's plan with `workers` concurrent tasks.
pub async fn run(
    client: &KeylockClient,
    scenario: Scenario,
    keys: usize,
    workers: usize,
) -> BenchReport {
    let steps = Arc::new(plan(scenario, keys));
    let next = Arc::new(AtomicUsize::new(0));
    let workers = workers.max(1);
    let strict = scenario == Scenario::MajorityReads;

    let started = Instant::now();
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let client = client.clone();
            let steps = Arc::clone(&steps);
            let next = Arc::clone(&next);
            tokio::spawn(async move {
                let mut tally: BTreeMap<String, usize> = BTreeMap::new();
                let mut errors = 0;
                loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some((op, key)) = steps.get(i) else {
                        break;
                    };
                    match client.call(*op, key).await {
                        Ok(code) => {
                            if strict && !code.is_success() {
                                tracing::warn!(%op, key = %key, %code, "unexpected result");
                                errors += 1;
                            }
                            *tally.entry(code.to_string()).or_default() += 1;
                        }
                        Err(err) => {
                            tracing::warn!(%op, key = %key, "request failed: {}", err);
                            errors += 1;
                        }
                    }
                }
                (tally, errors)
            })
        })
        .collect();

    let mut report = BenchReport {
        scenario,
        workers,
        requests: steps.len(),
        elapsed: Duration::ZERO,
        tally: BTreeMap::new(),
        errors: 0,
    };
    for handle in handles {
        match handle.await {
            Ok((tally, errors)) => {
                for (code, n) in tally {
                    *report.tally.entry(code).or_default() += n;
                }
                report.errors += errors;
            }
            Err(err) => {
                tracing::error!("bench worker failed: {}", err);
                report.errors += 1;
            }
        }
    }
    report.elapsed = started.elapsed();
    report
}
