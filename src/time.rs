//! Virtual time — the simulator's logical clock.
//!
//! Virtual time only advances via event dispatch or a forced jump to a chunk
//! boundary (`Engine::advance`). It is a plain `f64` under the hood, but raw
//! `f64` has no total order, and the event queue needs one to break ties
//! deterministically, so this newtype orders via `f64::total_cmp`.

use std::ops::Add;

/// A point in virtual time, or a duration measured in the same units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualTime(f64);

impl VirtualTime {
    /// The origin of virtual time.
    pub const ZERO: VirtualTime = VirtualTime(0.0);

    /// Construct a virtual time from a raw scalar.
    #[must_use]
    pub fn new(t: f64) -> Self {
        Self(t)
    }

    /// The underlying scalar.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl Eq for VirtualTime {}

impl PartialOrd for VirtualTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add<f64> for VirtualTime {
    type Output = VirtualTime;

    fn add(self, rhs: f64) -> VirtualTime {
        VirtualTime(self.0 + rhs)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<f64> for VirtualTime {
    fn from(t: f64) -> Self {
        Self(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_value() {
        assert!(VirtualTime::new(1.0) < VirtualTime::new(2.0));
        assert_eq!(VirtualTime::new(1.0), VirtualTime::new(1.0));
    }

    #[test]
    fn add_advances_time() {
        let t = VirtualTime::new(10.0) + 5.5;
        assert_eq!(t.as_f64(), 15.5);
    }
}
