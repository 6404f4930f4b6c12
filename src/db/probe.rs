//! Pool diagnostics
//!
//! `probe_pool` checks connections out until the pool refuses one, then returns them all.
//! `time_checkout` compares opening a standalone connection with borrowing a pooled one.

use std::time::{Duration, Instant};

use crate::db::{ConnectionPool, PoolStatus, StoreError, TxConnection};

#[derive(Debug)]
pub struct ProbeReport {
    /// Connections held at once before the pool refused one (or `count` was reached)
    pub acquired: u32,
    /// Why the next checkout failed, if it did
    pub exhausted: Option<StoreError>,
    /// Status while every probed connection was still checked out
    pub peak: PoolStatus,
    pub after_release: PoolStatus,
}

pub fn probe_pool<P: ConnectionPool>(pool: &P, count: u32) -> ProbeReport {
    let mut held = Vec::new();
    let mut exhausted = None;

    for i in 1..=count {
        match pool.acquire() {
            Ok(conn) => {
                let status = pool.status();
                log::info!(
                    "[{}] connection{} acquired (checked_out={}, idle={})",
                    pool.name(),
                    i,
                    status.checked_out,
                    status.idle
                );
                held.push(conn);
            }
            Err(e) => {
                log::error!(
                    "[{}] connection pool exceeded at connection{}: {}",
                    pool.name(), i, e
                );
                exhausted = Some(e);
                break;
            }
        }
    }

    let peak = pool.status();
    let acquired = held.len() as u32;
    for conn in held {
        if let Err(e) = conn.close() {
            log::warn!("[{}] failed to return connection: {}", pool.name(), e);
        }
    }

    ProbeReport {
        acquired,
        exhausted,
        peak,
        after_release: pool.status(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CheckoutTiming {
    pub direct: Duration,
    pub pooled: Duration,
}

/// Time `samples` rounds of `open_direct` against a pool checkout
pub fn time_checkout<P, F, D>(
    pool: &P,
    samples: u32,
    mut open_direct: F,
) -> Result<Vec<CheckoutTiming>, StoreError>
where
    P: ConnectionPool,
    F: FnMut() -> Result<D, StoreError>,
{
    let mut timings = Vec::with_capacity(samples as usize);

    for _ in 0..samples {
        let started = Instant::now();
        let direct = open_direct()?;
        let direct_elapsed = started.elapsed();
        drop(direct);

        let started = Instant::now();
        let pooled = pool.acquire()?;
        let pooled_elapsed = started.elapsed();
        pooled.close()?;

        timings.push(CheckoutTiming {
            direct: direct_elapsed,
            pooled: pooled_elapsed,
        });
    }

    Ok(timings)
}
