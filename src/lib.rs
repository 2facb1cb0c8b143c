#![doc(test(attr(deny(warnings))))]

//! PG Admin core: guest records, bed capacity, payment cycles, reports and
//! backups for a paying-guest property, plus the operator shell built on them.

pub mod billing;
pub mod capacity;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("PG Admin tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
