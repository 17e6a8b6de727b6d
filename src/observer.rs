//! Diagnostic observers for dependency resolution.
//!
//! Observers receive a callback for every class the container starts to
//! resolve, finishes resolving or fails to resolve. They are registered on the
//! [`DependencyCollection`](crate::DependencyCollection) before it is built.

use std::sync::Arc;
use std::time::Duration;

use crate::DiError;

/// Observer trait for resolution events.
///
/// Observer calls are made synchronously during resolution, nested
/// resolutions included. Keep implementations lightweight.
///
/// # Examples
///
/// ```
/// use ferrous_dispatch::{DiObserver, DependencyCollection};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Trail(Mutex<Vec<String>>);
///
/// impl DiObserver for Trail {
///     fn resolving(&self, class: &str) {
///         self.0.lock().unwrap().push(format!("> {}", class));
///     }
///
///     fn resolved(&self, class: &str, _duration: Duration) {
///         self.0.lock().unwrap().push(format!("< {}", class));
///     }
/// }
///
/// let mut collection = DependencyCollection::new();
/// collection.add_observer(Arc::new(Trail::default()));
/// ```
pub trait DiObserver: Send + Sync {
    /// Called before a class definition is loaded and constructed.
    fn resolving(&self, class: &str);

    /// Called after the instance is constructed and all injections applied.
    fn resolved(&self, class: &str, duration: Duration);

    /// Called when resolution of `class` fails. The error still propagates.
    fn failed(&self, class: &str, error: &DiError) {
        let _ = (class, error);
    }
}

/// Container for registered observers.
///
/// Designed to have minimal overhead when no observers are registered.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, class: &str) {
        for observer in &self.observers {
            observer.resolving(class);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, class: &str, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(class, duration);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, class: &str, error: &DiError) {
        for observer in &self.observers {
            observer.failed(class, error);
        }
    }
}

/// Observer that emits `tracing` events for every resolution.
///
/// Resolutions are logged at debug level, failures at warn level.
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "[di]".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, class: &str) {
        tracing::debug!(prefix = %self.prefix, class, "resolving");
    }

    fn resolved(&self, class: &str, duration: Duration) {
        tracing::debug!(prefix = %self.prefix, class, elapsed_us = duration.as_micros() as u64, "resolved");
    }

    fn failed(&self, class: &str, error: &DiError) {
        tracing::warn!(prefix = %self.prefix, class, %error, "resolution failed");
    }
}
