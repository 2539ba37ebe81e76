use std::sync::Mutex;

use crate::context::GenerationContext;
use crate::error::{GenerationError, Result};

/// Lifecycle state of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Uninitialized,
    Initialized,
    Closed,
}

/// Pull-based producer of values.
///
/// `generate` returns `Ok(None)` as the end-of-data signal. Once a generator
/// reports end-of-data it keeps doing so until `reset`.
pub trait Generator<T>: Send {
    /// Bind to the generation context. Must be called exactly once.
    fn init(&mut self, ctx: &GenerationContext) -> Result<()>;
    fn generate(&mut self) -> Result<Option<T>>;
    /// Rewind cursors and repopulate uniqueness bookkeeping.
    fn reset(&mut self) -> Result<()>;
    /// Release resources. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;
    fn state(&self) -> GeneratorState;

    /// Whether several threads may call `generate` on this same instance.
    fn is_thread_safe(&self) -> bool {
        false
    }

    /// Whether independent instances may run concurrently.
    fn is_parallelizable(&self) -> bool {
        true
    }
}

pub type BoxedGenerator<T> = Box<dyn Generator<T>>;

impl<T, G: Generator<T> + ?Sized> Generator<T> for Box<G> {
    fn init(&mut self, ctx: &GenerationContext) -> Result<()> {
        (**self).init(ctx)
    }

    fn generate(&mut self) -> Result<Option<T>> {
        (**self).generate()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn state(&self) -> GeneratorState {
        (**self).state()
    }

    fn is_thread_safe(&self) -> bool {
        (**self).is_thread_safe()
    }

    fn is_parallelizable(&self) -> bool {
        (**self).is_parallelizable()
    }
}

/// State machine embedded by generator implementations.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    name: String,
    state: GeneratorState,
}

impl Lifecycle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: GeneratorState::Uninitialized,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// Fails unless the generator has never been initialized.
    pub fn ensure_uninitialized(&self) -> Result<()> {
        match self.state {
            GeneratorState::Uninitialized => Ok(()),
            GeneratorState::Initialized => Err(GenerationError::IllegalState(format!(
                "generator '{}' is already initialized",
                self.name
            ))),
            GeneratorState::Closed => Err(GenerationError::IllegalState(format!(
                "generator '{}' is closed",
                self.name
            ))),
        }
    }

    pub fn mark_initialized(&mut self) {
        self.state = GeneratorState::Initialized;
    }

    /// Fails unless the generator is initialized and not yet closed.
    pub fn ensure_initialized(&self, operation: &str) -> Result<()> {
        match self.state {
            GeneratorState::Initialized => Ok(()),
            GeneratorState::Uninitialized => Err(GenerationError::IllegalState(format!(
                "{operation}() called on generator '{}' before init()",
                self.name
            ))),
            GeneratorState::Closed => Err(GenerationError::IllegalState(format!(
                "{operation}() called on generator '{}' after close()",
                self.name
            ))),
        }
    }

    /// Moves to `Closed`; returns false when already closed.
    pub fn close(&mut self) -> bool {
        if self.state == GeneratorState::Closed {
            return false;
        }
        self.state = GeneratorState::Closed;
        true
    }
}

/// Mutex-guarded generator that may be shared between threads.
#[derive(Debug)]
pub struct SynchronizedGenerator<G> {
    inner: Mutex<G>,
}

impl<G> SynchronizedGenerator<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Pull the next value through a shared reference.
    pub fn generate_shared<T>(&self) -> Result<Option<T>>
    where
        G: Generator<T>,
    {
        let mut inner = self.lock()?;
        inner.generate()
    }

    /// State of the wrapped generator; a poisoned mutex is an error.
    pub fn try_state<T>(&self) -> Result<GeneratorState>
    where
        G: Generator<T>,
    {
        Ok(self.lock()?.state())
    }

    pub fn into_inner(self) -> Result<G> {
        self.inner
            .into_inner()
            .map_err(|_| GenerationError::IllegalState("generator mutex poisoned".to_string()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, G>> {
        self.inner
            .lock()
            .map_err(|_| GenerationError::IllegalState("generator mutex poisoned".to_string()))
    }
}

impl<T, G> Generator<T> for SynchronizedGenerator<G>
where
    G: Generator<T>,
{
    fn init(&mut self, ctx: &GenerationContext) -> Result<()> {
        self.lock()?.init(ctx)
    }

    fn generate(&mut self) -> Result<Option<T>> {
        self.lock()?.generate()
    }

    fn reset(&mut self) -> Result<()> {
        self.lock()?.reset()
    }

    fn close(&mut self) -> Result<()> {
        self.lock()?.close()
    }

    /// A poisoned mutex reads as `Closed`.
    /// [`SynchronizedGenerator::try_state`] reports the poisoning instead.
    fn state(&self) -> GeneratorState {
        self.lock()
            .map(|inner| inner.state())
            .unwrap_or(GeneratorState::Closed)
    }

    fn is_thread_safe(&self) -> bool {
        true
    }

    fn is_parallelizable(&self) -> bool {
        self.lock()
            .map(|inner| inner.is_parallelizable())
            .unwrap_or(false)
    }
}
