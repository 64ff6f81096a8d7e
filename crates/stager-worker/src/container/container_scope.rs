// ContainerScope: RAII guard that makes every command issued through it run
// against a named build container.

use std::ops::{Deref, DerefMut};

use crate::execution_context::ExecutionContext;

/// Marks `name` as the active container of an [`ExecutionContext`] for as long
/// as the guard lives.
///
/// Commands issued through the guard (it derefs to the context) run against
/// the named container. The previous scope is restored when the guard is
/// dropped, so teardown happens on normal return, on `?` early return and
/// during unwinding alike.
pub struct ContainerScope<'a> {
    context: &'a mut ExecutionContext,
    name: String,
    previous: Option<String>,
}

impl<'a> ContainerScope<'a> {
    pub fn enter(context: &'a mut ExecutionContext, name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::debug!(container = %name, "Entering container scope");
        let previous = context.replace_container(Some(name.clone()));
        Self {
            context,
            name,
            previous,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Deref for ContainerScope<'_> {
    type Target = ExecutionContext;

    fn deref(&self) -> &ExecutionContext {
        self.context
    }
}

impl DerefMut for ContainerScope<'_> {
    fn deref_mut(&mut self) -> &mut ExecutionContext {
        self.context
    }
}

impl Drop for ContainerScope<'_> {
    fn drop(&mut self) {
        self.context.replace_container(self.previous.take());
        tracing::debug!(container = %self.name, "Left container scope");
    }
}
