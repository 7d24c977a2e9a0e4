//! Trait for entities with temporal validity periods
//!
//! The validation algorithm is defined once in [`TemporalValidity::is_valid_at`];
//! implementors only expose their activation flag and validity window.
//!
//! ```
//! use chrono::{DateTime, Duration, Utc};
//! use tollgate_storage::models::TemporalValidity;
//!
//! struct Pass {
//!     until: DateTime<Utc>,
//! }
//!
//! impl TemporalValidity for Pass {
//!     fn is_active(&self) -> bool {
//!         true
//!     }
//!
//!     fn validity_start(&self) -> Option<DateTime<Utc>> {
//!         None
//!     }
//!
//!     fn validity_end(&self) -> Option<DateTime<Utc>> {
//!         Some(self.until)
//!     }
//! }
//!
//! let pass = Pass { until: Utc::now() + Duration::hours(2) };
//! assert!(pass.is_valid());
//! assert!(!pass.is_valid_at(pass.until + Duration::seconds(1)));
//! ```

use chrono::{DateTime, Utc};

/// Entities with an active flag and an optional validity window.
pub trait TemporalValidity {
    /// Returns whether the entity is currently active
    ///
    /// Inactive entities are always considered invalid regardless of date ranges.
    fn is_active(&self) -> bool;

    /// Returns the validity start date (if any)
    ///
    /// If set, the entity cannot be used before this date.
    fn validity_start(&self) -> Option<DateTime<Utc>>;

    /// Returns the validity end date (if any)
    ///
    /// If set, the entity cannot be used after this date.
    fn validity_end(&self) -> Option<DateTime<Utc>>;

    /// Check validity at `now`.
    ///
    /// Valid when active, not before the start and not after the end. Both
    /// bounds are inclusive.
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }

        if let Some(start) = self.validity_start()
            && now < start
        {
            return false;
        }

        if let Some(end) = self.validity_end()
            && now > end
        {
            return false;
        }

        true
    }

    /// Check validity right now.
    fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}
