use crate::state::QueryState;

/// Presentation hook, called once after every state mutation.
pub trait QueryObserver {
    fn on_update(&mut self, state: &QueryState);
}

impl<F> QueryObserver for F
where
    F: FnMut(&QueryState),
{
    fn on_update(&mut self, state: &QueryState) {
        self(state)
    }
}
