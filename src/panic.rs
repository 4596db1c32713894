//! Per-request panic containment.
//!
//! [`catch_panic`] runs a future under `FutureExt::catch_unwind`. When the
//! future panics it resolves to a [`PanicReport`] instead of unwinding into
//! hyper's connection task.
//!
//! The payload alone says nothing about *where* things went wrong, so a
//! process-wide panic hook records the location and a forced backtrace in a
//! task-local slot. The hook runs on the panicking thread while the guarded
//! future is being polled, which is exactly when the task-local is set. Inside
//! a guard the default hook's stderr message is suppressed; panics elsewhere
//! in the process still reach the previously installed hook.
//!
//! The hook is installed once, by [`install_hook`]. A hook set with
//! `std::panic::set_hook` afterwards replaces it, and reports lose their
//! location and trace.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use futures::FutureExt;

tokio::task_local! {
    static PANIC_SITE: RefCell<Option<PanicSite>>;
}

static INSTALL_HOOK: Once = Once::new();

#[derive(Debug)]
struct PanicSite {
    file: String,
    line: u32,
    trace: String,
}

/// What is known about a contained panic.
#[derive(Debug)]
pub struct PanicReport {
    /// The panic payload if it was a string, otherwise a placeholder.
    pub message: String,
    pub file: String,
    pub line: u32,
    /// Backtrace captured at the panic site.
    pub trace: String,
}

impl PanicReport {
    fn new(payload: Box<dyn Any + Send>, site: Option<PanicSite>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_owned()
        };
        let site = site.unwrap_or(PanicSite { file: "<unknown>".into(), line: 0, trace: String::new() });
        Self { message, file: site.file, line: site.line, trace: site.trace }
    }
}

fn take_site() -> Option<PanicSite> {
    PANIC_SITE.try_with(|slot| slot.borrow_mut().take()).ok().flatten()
}

/// Chains wicket's hook in front of the current one. Idempotent.
pub(crate) fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let recorded = PANIC_SITE.try_with(|slot| {
                let (file, line) = info
                    .location()
                    .map(|l| (l.file().to_owned(), l.line()))
                    .unwrap_or_else(|| ("<unknown>".to_owned(), 0));
                let trace = Backtrace::force_capture().to_string();
                *slot.borrow_mut() = Some(PanicSite { file, line, trace });
            });
            if recorded.is_err() {
                previous(info);
            }
        }));
    });
}

#[cfg(test)]
pub(crate) fn hook_installed() -> bool {
    INSTALL_HOOK.is_completed()
}

/// Awaits `fut`, turning a panic inside it into `Err(PanicReport)`.
pub(crate) async fn catch_panic<F: Future>(fut: F) -> Result<F::Output, PanicReport> {
    install_hook();
    PANIC_SITE
        .scope(RefCell::new(None), async {
            AssertUnwindSafe(fut)
                .catch_unwind()
                .await
                .map_err(|payload| PanicReport::new(payload, take_site()))
        })
        .await
}

/// Runs a synchronous closure under the same hook, for code outside the
/// async pipeline (log sinks, custom response writers).
pub(crate) fn catch_sync<R>(f: impl FnOnce() -> R) -> Result<R, PanicReport> {
    install_hook();
    PANIC_SITE.sync_scope(RefCell::new(None), || {
        panic::catch_unwind(AssertUnwindSafe(f))
            .map_err(|payload| PanicReport::new(payload, take_site()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_value_passes_through() {
        let out = catch_panic(async { 7 }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_panic_after_await_is_contained() {
        let fut = async {
            tokio::task::yield_now().await;
            if true {
                panic!("widget store unreachable");
            }
            0
        };
        let report = catch_panic(fut).await.unwrap_err();
        assert_eq!(report.message, "widget store unreachable");
        assert!(report.file.ends_with("panic.rs"), "{}", report.file);
        assert!(report.line > 0);
        assert!(!report.trace.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_site_survives_worker_hop() {
        let fut = async {
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
            if true {
                panic!("late failure");
            }
        };
        let report = tokio::spawn(catch_panic(fut)).await.unwrap().unwrap_err();
        assert_eq!(report.message, "late failure");
        assert!(report.file.ends_with("panic.rs"), "{}", report.file);
    }

    #[tokio::test]
    async fn test_formatted_payload() {
        let id = 42;
        let fut = async move {
            if id > 0 {
                panic!("bad widget {id}");
            }
        };
        let report = catch_panic(fut).await.unwrap_err();
        assert_eq!(report.message, "bad widget 42");
    }

    #[test]
    fn test_catch_sync() {
        assert_eq!(catch_sync(|| 1 + 1).unwrap(), 2);
        let report = catch_sync(|| -> u8 { panic!("writer exploded") }).unwrap_err();
        assert_eq!(report.message, "writer exploded");
        assert!(report.file.ends_with("panic.rs"), "{}", report.file);
    }
}
