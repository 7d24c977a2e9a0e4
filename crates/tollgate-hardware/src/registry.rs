//! Reference-counted guard for a shared hardware subsystem.
//!
//! Several ports can sit on one subsystem (all GPIO ports share the GPIO
//! controller). The subsystem is initialized when the first port registers
//! and cleaned up when the last one unregisters, no matter how many ports
//! come and go in between.
//!
//! # Examples
//!
//! ```
//! use tollgate_hardware::gpio::{GpioChip, SimulatedGpio};
//! use tollgate_hardware::registry::HardwareRegistry;
//!
//! let sim = SimulatedGpio::new();
//! let registry = HardwareRegistry::new(GpioChip::new(sim.clone()));
//!
//! let button = registry.allocate_id();
//! let relay = registry.allocate_id();
//!
//! registry.register(button).unwrap();
//! registry.register(relay).unwrap();
//! assert_eq!(sim.init_count(), 1);
//!
//! registry.unregister(button).unwrap();
//! assert_eq!(sim.cleanup_count(), 0);
//! registry.unregister(relay).unwrap();
//! assert_eq!(sim.cleanup_count(), 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::error::Result;

/// A process-wide subsystem with one-time setup and teardown.
pub trait Subsystem: Send + Sync {
    fn name(&self) -> &str;

    fn initialize(&self) -> Result<()>;

    fn cleanup(&self) -> Result<()>;
}

/// Identifier of a port registered with a [`HardwareRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(u64);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port#{}", self.0)
    }
}

/// Registry of open ports sharing one subsystem.
#[derive(Debug)]
pub struct HardwareRegistry<S: Subsystem> {
    subsystem: S,
    ports: Mutex<Vec<PortId>>,
    next_id: AtomicU64,
}

impl<S: Subsystem> HardwareRegistry<S> {
    pub fn new(subsystem: S) -> Self {
        Self {
            subsystem,
            ports: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subsystem(&self) -> &S {
        &self.subsystem
    }

    /// Hand out a fresh id. Does not register it.
    pub fn allocate_id(&self) -> PortId {
        PortId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Add a port, initializing the subsystem if it is the first one.
    ///
    /// Registering an id twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the subsystem error if initialization fails; the port is not
    /// added in that case.
    pub fn register(&self, id: PortId) -> Result<()> {
        let mut ports = self.ports.lock().unwrap_or_else(PoisonError::into_inner);

        if ports.contains(&id) {
            debug!(port = %id, "Port already registered");
            return Ok(());
        }

        if ports.is_empty() {
            info!(subsystem = self.subsystem.name(), "Initializing subsystem");
            self.subsystem.initialize()?;
        }

        ports.push(id);
        debug!(port = %id, active = ports.len(), "Port registered");
        Ok(())
    }

    /// Remove a port, cleaning the subsystem up if it was the last one.
    ///
    /// An unknown id is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns the subsystem error if cleanup fails.
    pub fn unregister(&self, id: PortId) -> Result<()> {
        let mut ports = self.ports.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(index) = ports.iter().position(|p| *p == id) else {
            warn!(port = %id, "Unregistering a port that is not registered");
            return Ok(());
        };
        ports.remove(index);
        debug!(port = %id, active = ports.len(), "Port unregistered");

        if ports.is_empty() {
            info!(subsystem = self.subsystem.name(), "Cleaning up subsystem");
            self.subsystem.cleanup()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ports.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HardwareError;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingSubsystem {
        inits: AtomicUsize,
        cleanups: AtomicUsize,
        fail_init: bool,
    }

    impl Subsystem for CountingSubsystem {
        fn name(&self) -> &str {
            "counting"
        }

        fn initialize(&self) -> Result<()> {
            if self.fail_init {
                return Err(HardwareError::initialization_failed("no controller"));
            }
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn cleanup(&self) -> Result<()> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counts(registry: &HardwareRegistry<CountingSubsystem>) -> (usize, usize) {
        let s = registry.subsystem();
        (
            s.inits.load(Ordering::SeqCst),
            s.cleanups.load(Ordering::SeqCst),
        )
    }

    #[test]
    fn test_init_once_cleanup_once() {
        let registry = HardwareRegistry::new(CountingSubsystem::default());
        let a = registry.allocate_id();
        let b = registry.allocate_id();

        registry.register(a).unwrap();
        registry.register(b).unwrap();
        assert_eq!(counts(&registry), (1, 0));
        assert_eq!(registry.len(), 2);

        registry.unregister(a).unwrap();
        assert_eq!(counts(&registry), (1, 0));

        registry.unregister(b).unwrap();
        assert_eq!(counts(&registry), (1, 1));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reinitializes_after_cleanup() {
        let registry = HardwareRegistry::new(CountingSubsystem::default());
        let a = registry.allocate_id();

        registry.register(a).unwrap();
        registry.unregister(a).unwrap();
        registry.register(a).unwrap();
        assert_eq!(counts(&registry), (2, 1));
    }

    #[test]
    fn test_unknown_port_is_ignored() {
        let registry = HardwareRegistry::new(CountingSubsystem::default());
        let a = registry.allocate_id();
        let stranger = registry.allocate_id();

        registry.register(a).unwrap();
        registry.unregister(stranger).unwrap();
        assert_eq!(counts(&registry), (1, 0));
        assert_eq!(registry.len(), 1);

        // Empty registry: still no cleanup for an unknown id
        registry.unregister(a).unwrap();
        registry.unregister(a).unwrap();
        assert_eq!(counts(&registry), (1, 1));
    }

    #[test]
    fn test_double_register_is_noop() {
        let registry = HardwareRegistry::new(CountingSubsystem::default());
        let a = registry.allocate_id();

        registry.register(a).unwrap();
        registry.register(a).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(counts(&registry), (1, 0));
    }

    #[test]
    fn test_failed_init_does_not_register() {
        let registry = HardwareRegistry::new(CountingSubsystem {
            fail_init: true,
            ..Default::default()
        });
        let a = registry.allocate_id();

        assert!(registry.register(a).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = HardwareRegistry::new(CountingSubsystem::default());
        assert_ne!(registry.allocate_id(), registry.allocate_id());
    }
}
