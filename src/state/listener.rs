// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-slot change observer.

/// Boxed change callback receiving the whole changed value.
pub type Listener<T> = Box<dyn FnMut(&T) + Send>;

/// Holds at most one change listener.
///
/// Setting a listener replaces the previous one. This is an observer slot,
/// not a multicast list.
pub struct ChangeListener<T: ?Sized> {
    slot: Option<Listener<T>>,
}

impl<T: ?Sized> ChangeListener<T> {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Installs `listener`, replacing any previous one.
    pub fn set(&mut self, listener: impl FnMut(&T) + Send + 'static) {
        self.slot = Some(Box::new(listener));
    }

    /// Installs an already boxed listener.
    pub fn set_boxed(&mut self, listener: Listener<T>) {
        self.slot = Some(listener);
    }

    /// Removes the listener.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Returns `true` if a listener is installed.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.slot.is_some()
    }

    /// Takes the listener out of the slot so it can be called with a borrow of
    /// its owner; pair with [`restore`](Self::restore).
    pub(crate) fn take(&mut self) -> Option<Listener<T>> {
        self.slot.take()
    }

    /// Puts a taken listener back unless a new one was installed meanwhile.
    pub(crate) fn restore(&mut self, listener: Listener<T>) {
        if self.slot.is_none() {
            self.slot = Some(listener);
        }
    }
}

impl<T: ?Sized> Default for ChangeListener<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for ChangeListener<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeListener")
            .field("set", &self.is_set())
            .finish()
    }
}

/// Notifies the listener stored in `$owner.$field` with `&$owner`.
macro_rules! notify {
    ($owner:expr, $field:ident) => {
        if let Some(mut listener) = $owner.$field.take() {
            listener(&*$owner);
            $owner.$field.restore(listener);
        }
    };
}

pub(crate) use notify;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Owner {
        value: u32,
        listener: ChangeListener<Owner>,
    }

    impl Owner {
        fn bump(&mut self) {
            self.value += 1;
            notify!(self, listener);
        }
    }

    #[test]
    fn notify_passes_owner() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);
        let mut owner = Owner {
            value: 0,
            listener: ChangeListener::new(),
        };
        owner.listener.set(move |o: &Owner| {
            seen_clone.store(o.value, Ordering::SeqCst);
        });

        owner.bump();
        owner.bump();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(owner.listener.is_set());
    }

    #[test]
    fn set_replaces_previous_listener() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let (f, s) = (Arc::clone(&first), Arc::clone(&second));

        let mut owner = Owner {
            value: 0,
            listener: ChangeListener::new(),
        };
        owner.listener.set(move |_: &Owner| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        owner.listener.set(move |_: &Owner| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        owner.bump();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_slot_is_silent() {
        let mut owner = Owner {
            value: 0,
            listener: ChangeListener::default(),
        };
        owner.bump();
        owner.listener.clear();
        assert!(!owner.listener.is_set());
    }
}
