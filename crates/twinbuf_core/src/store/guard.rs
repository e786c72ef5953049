//! Scoped commit guard.

use std::ops::{Deref, DerefMut};

use super::DoubleBufferStore;
use crate::field::{FieldKey, Trackable};

/// Mutable view of one shadow value that commits the field when dropped.
///
/// The commit runs on every exit path, including early returns and
/// unwinding, so an edit can never be left uncommitted.
///
/// ```rust
/// use twinbuf_core::DoubleBufferStore;
///
/// #[derive(Clone, Default)]
/// struct Knobs { gain: f32 }
///
/// let mut store = DoubleBufferStore::new(&Knobs::default());
/// let gain = store.declare("gain", |k| &k.gain, |k| &mut k.gain);
/// {
///     let mut value = store.scoped(gain);
///     *value = 0.5;
/// }
/// assert!(store.is_changed(gain));
/// ```
#[must_use = "dropping the guard immediately commits without an edit"]
pub struct CommitGuard<'a, S: Send + 'static, T: Trackable> {
    store: &'a mut DoubleBufferStore<S>,
    key: FieldKey<S, T>,
}

impl<'a, S: Send + 'static, T: Trackable> CommitGuard<'a, S, T> {
    pub(super) fn new(store: &'a mut DoubleBufferStore<S>, key: FieldKey<S, T>) -> Self {
        Self { store, key }
    }
}

impl<S: Send + 'static, T: Trackable> Deref for CommitGuard<'_, S, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.key.read(self.store.shadow())
    }
}

impl<S: Send + 'static, T: Trackable> DerefMut for CommitGuard<'_, S, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.key.write(self.store.shadow_mut())
    }
}

impl<S: Send + 'static, T: Trackable> Drop for CommitGuard<'_, S, T> {
    fn drop(&mut self) {
        self.store.commit(self.key);
    }
}
