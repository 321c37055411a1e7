//! In-memory doubles for [`KeySink`] and [`TextSource`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{InjectError, KeySink, Keystroke, SinkFactory, TextSource};

type Hook = Arc<dyn Fn(usize) + Send + Sync>;

/// Records every emitted keystroke into a shared log.
///
/// All sinks opened from one factory append to the same log, so tests can
/// observe how consecutive jobs interleave.
#[derive(Clone, Default)]
pub struct RecordingSinkFactory {
    log: Arc<Mutex<Vec<Keystroke>>>,
    fail_at: Arc<Mutex<Option<usize>>>,
    fail_open: bool,
    hook: Option<Hook>,
    opens: Arc<AtomicUsize>,
}

impl RecordingSinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the emit call that would record the `index`-th keystroke
    /// (zero-based, counted across the whole log).  Fails once.
    pub fn failing_at(self, index: usize) -> Self {
        *self.fail_at.lock().unwrap() = Some(index);
        self
    }

    /// Refuse to open any sink.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Call `hook(n)` after the `n`-th keystroke has been recorded, on the
    /// emitting thread.
    pub fn with_hook(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn keys(&self) -> Vec<Keystroke> {
        self.log.lock().unwrap().clone()
    }

    pub fn text(&self) -> String {
        self.keys().into_iter().map(Keystroke::as_char).collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl SinkFactory for RecordingSinkFactory {
    fn open(&self) -> Result<Box<dyn KeySink>, InjectError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(InjectError::KeySimulation("no display".into()));
        }
        Ok(Box::new(RecordingSink {
            log: Arc::clone(&self.log),
            fail_at: Arc::clone(&self.fail_at),
            hook: self.hook.clone(),
        }))
    }
}

struct RecordingSink {
    log: Arc<Mutex<Vec<Keystroke>>>,
    fail_at: Arc<Mutex<Option<usize>>>,
    hook: Option<Hook>,
}

impl KeySink for RecordingSink {
    fn emit(&mut self, key: Keystroke) -> Result<(), InjectError> {
        let count = {
            let mut log = self.log.lock().unwrap();
            let mut fail_at = self.fail_at.lock().unwrap();
            if *fail_at == Some(log.len()) {
                *fail_at = None;
                return Err(InjectError::KeySimulation("focus lost".into()));
            }
            log.push(key);
            log.len()
        };
        if let Some(hook) = &self.hook {
            hook(count);
        }
        Ok(())
    }
}

/// Returns a fixed result on every read.
pub struct StaticSource {
    text: Option<String>,
    reads: AtomicUsize,
}

impl StaticSource {
    pub fn ok(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self {
            text: None,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl TextSource for StaticSource {
    fn read_text(&self) -> Result<String, InjectError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.text.clone().ok_or(InjectError::EmptyInput)
    }
}
