use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rebuild_gate::errors::{RebuildError, Result};
use rebuild_gate::exec::{RebuildBackend, RebuildReport};

/// What the fake rebuild should do when invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeResult {
    Succeed,
    Fail,
    TimeOut,
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// A fake backend that:
/// - counts how many times a rebuild was requested
/// - returns a configurable result without spawning anything
/// - optionally runs a hook "during the build" (e.g. to mutate the watched
///   file the way the scraper would)
pub struct FakeBackend {
    calls: Arc<Mutex<usize>>,
    result: FakeResult,
    hook: Option<Hook>,
}

impl FakeBackend {
    pub fn new(result: FakeResult) -> Self {
        Self {
            calls: Arc::new(Mutex::new(0)),
            result,
            hook: None,
        }
    }

    pub fn succeeding() -> Self {
        Self::new(FakeResult::Succeed)
    }

    pub fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Shared counter, still readable after the backend moved into a trigger.
    pub fn calls_handle(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl RebuildBackend for FakeBackend {
    fn perform_rebuild(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<RebuildReport>> + Send + '_>> {
        Box::pin(async move {
            *self.calls.lock().unwrap() += 1;
            if let Some(hook) = &self.hook {
                hook();
            }

            match self.result {
                FakeResult::Succeed => Ok(RebuildReport {
                    elapsed: Duration::from_millis(1),
                    artifact: PathBuf::from("fake/app.tgz"),
                    artifact_size: 0,
                    backup: None,
                    pruned: Vec::new(),
                }),
                FakeResult::Fail => Err(RebuildError::CommandFailed {
                    step: "build".to_string(),
                    code: Some(1),
                    stderr: "fake build failure".to_string(),
                }),
                FakeResult::TimeOut => Err(RebuildError::CommandTimeout {
                    step: "build".to_string(),
                    timeout: Duration::from_secs(600),
                }),
            }
        })
    }
}
