use crate::context::GenerationContext;
use crate::error::Result;
use crate::lifecycle::{Generator, GeneratorState, Lifecycle};
use crate::value::{GeneratedValue, NumberRange};

/// Finite generator over a fixed list of values, in list order.
#[derive(Debug, Clone)]
pub struct IterGenerator<T> {
    lifecycle: Lifecycle,
    values: Vec<T>,
    cursor: usize,
}

impl<T> IterGenerator<T> {
    pub fn new(name: impl Into<String>, values: Vec<T>) -> Self {
        Self {
            lifecycle: Lifecycle::new(name),
            values,
            cursor: 0,
        }
    }
}

impl<T: Clone + Send> Generator<T> for IterGenerator<T> {
    fn init(&mut self, _ctx: &GenerationContext) -> Result<()> {
        self.lifecycle.ensure_uninitialized()?;
        self.lifecycle.mark_initialized();
        Ok(())
    }

    fn generate(&mut self) -> Result<Option<T>> {
        self.lifecycle.ensure_initialized("generate")?;
        let value = self.values.get(self.cursor).cloned();
        if value.is_some() {
            self.cursor += 1;
        }
        Ok(value)
    }

    fn reset(&mut self) -> Result<()> {
        self.lifecycle.ensure_initialized("reset")?;
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.lifecycle.close();
        Ok(())
    }

    fn state(&self) -> GeneratorState {
        self.lifecycle.state()
    }
}

/// Ascending walk over every grid point of a [`NumberRange`].
#[derive(Debug, Clone)]
pub struct NumberSequence {
    lifecycle: Lifecycle,
    range: NumberRange,
    cursor: usize,
}

impl NumberSequence {
    pub fn new(range: NumberRange) -> Self {
        Self {
            lifecycle: Lifecycle::new(format!(
                "numbers[{}..={}/{}]",
                range.min(),
                range.max(),
                range.granularity()
            )),
            range,
            cursor: 0,
        }
    }
}

impl Generator<GeneratedValue> for NumberSequence {
    fn init(&mut self, _ctx: &GenerationContext) -> Result<()> {
        self.lifecycle.ensure_uninitialized()?;
        self.lifecycle.mark_initialized();
        Ok(())
    }

    fn generate(&mut self) -> Result<Option<GeneratedValue>> {
        self.lifecycle.ensure_initialized("generate")?;
        if self.cursor >= self.range.point_count() {
            return Ok(None);
        }
        let value = self.range.value_at(self.cursor);
        self.cursor += 1;
        Ok(Some(value))
    }

    fn reset(&mut self) -> Result<()> {
        self.lifecycle.ensure_initialized("reset")?;
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.lifecycle.close();
        Ok(())
    }

    fn state(&self) -> GeneratorState {
        self.lifecycle.state()
    }
}
