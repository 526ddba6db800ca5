//! Integration tests for the process-wide wiring behind `Verifier::from_config`.
//!
//! This binary owns the global locator, so every test here configures it
//! identically: `sh` as the tool, with shell scripts as generated modules.

#![cfg(unix)]
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

mod common;

use common::{TempSubsystem, init_tracing};
use dynaproxy_verify::{
    HarnessConfig, PlatformVariant, SessionOutcome, ToolLocator, ToolPath, Verifier,
    VerifierConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 16;

fn sh_config() -> HarnessConfig {
    HarnessConfig {
        verifier: VerifierConfig {
            tool: Some(PathBuf::from("sh")),
            ..VerifierConfig::default()
        },
    }
}

#[test]
fn test_global_locator_is_shared_across_threads() {
    init_tracing();
    let config = sh_config();

    let locators: Vec<Arc<ToolLocator>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| scope.spawn(|| ToolLocator::global(PlatformVariant::current(), &config)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let first = &locators[0];
    assert!(locators.iter().all(|locator| Arc::ptr_eq(locator, first)));
    assert_eq!(first.resolve().unwrap(), ToolPath::new("sh"));

    let other = HarnessConfig {
        verifier: VerifierConfig {
            tool: Some(PathBuf::from("/nonexistent/peverify")),
            ..VerifierConfig::default()
        },
    };
    let later = ToolLocator::global(PlatformVariant::Reference, &other);
    assert!(Arc::ptr_eq(&later, first));
    assert_eq!(later.resolve().unwrap(), ToolPath::new("sh"));
}

#[test]
fn test_from_config_sessions_from_many_threads() {
    init_tracing();
    let config = sh_config();

    let outcomes: Vec<SessionOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|index| {
                let config = &config;
                scope.spawn(move || {
                    let verifier = Verifier::from_config(config);
                    let subsystem = TempSubsystem::new();
                    let mut session = verifier.begin(&subsystem, format!("threaded_{index}"));
                    session
                        .builder_mut()
                        .define_module("Proxies.sh", b"echo verified\nexit 0\n".to_vec());
                    session.end().unwrap()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(outcomes.len(), THREADS);
    assert!(outcomes.iter().all(|outcome| *outcome == SessionOutcome::Passed));
}
