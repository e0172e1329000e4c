//! Capacity-bounded storage devices

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{TranschedError, TranschedResult};

/// Index of a device inside a [`crate::TransferGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub usize);

impl DeviceId {
    /// Position of the device in the graph's device list
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// Role a device plays in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceRole {
    /// Regular storage device holding data to transfer
    #[default]
    Normal,
    /// Auxiliary capacity-1 staging device used to relay one transfer
    BypassRelay,
}

impl std::fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceRole::Normal => write!(f, "normal"),
            DeviceRole::BypassRelay => write!(f, "bypass-relay"),
        }
    }
}

/// A storage device with a bounded number of simultaneous transfers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device identity
    pub id: DeviceId,
    /// Maximum simultaneous transfers (cv)
    capacity: u32,
    /// Units not yet acquired in the current round
    available: u32,
    /// Device role
    pub role: DeviceRole,
}

impl Device {
    /// Create a normal device with full availability
    pub fn new(id: DeviceId, capacity: u32) -> TranschedResult<Self> {
        Self::with_available(id, capacity, capacity)
    }

    /// Create a device with an explicit initial availability
    pub fn with_available(id: DeviceId, capacity: u32, available: u32) -> TranschedResult<Self> {
        if capacity < 1 {
            return Err(TranschedError::InvalidCapacity(format!(
                "device {} has capacity {}, expected at least 1",
                id, capacity
            )));
        }
        if available > capacity {
            return Err(TranschedError::InvalidCapacity(format!(
                "device {} has availability {} above its capacity {}",
                id, available, capacity
            )));
        }

        Ok(Self {
            id,
            capacity,
            available,
            role: DeviceRole::Normal,
        })
    }

    /// Create a capacity-1 bypass relay
    pub fn relay(id: DeviceId) -> Self {
        Self {
            id,
            capacity: 1,
            available: 1,
            role: DeviceRole::BypassRelay,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn is_available(&self) -> bool {
        self.available > 0
    }

    pub fn is_relay(&self) -> bool {
        self.role == DeviceRole::BypassRelay
    }

    /// Consume one capacity unit
    ///
    /// Returns `false` when the device is exhausted; the caller defers the
    /// transfer rather than treating this as an error.
    pub fn acquire(&mut self) -> bool {
        if self.available > 0 {
            self.available -= 1;
            true
        } else {
            false
        }
    }

    /// Make every unit available again; returns whether anything changed
    pub fn reset(&mut self) -> bool {
        let changed = self.available != self.capacity;
        self.available = self.capacity;
        changed
    }

    /// Return one capacity unit acquired earlier in the round
    pub fn release(&mut self) {
        if self.available < self.capacity {
            self.available += 1;
        } else {
            warn!(device = %self.id, "Release without matching acquire ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_until_exhausted() {
        let mut device = Device::new(DeviceId(0), 2).unwrap();
        assert!(device.acquire());
        assert!(device.acquire());
        assert!(!device.acquire());
        assert_eq!(device.available(), 0);
    }

    #[test]
    fn test_release_restores_unit() {
        let mut device = Device::new(DeviceId(0), 1).unwrap();
        assert!(device.acquire());
        device.release();
        assert_eq!(device.available(), 1);
        assert!(device.acquire());
    }

    #[test]
    fn test_release_never_exceeds_capacity() {
        let mut device = Device::new(DeviceId(0), 1).unwrap();
        device.release();
        assert_eq!(device.available(), 1);
    }

    #[test]
    fn test_reset_restores_full_capacity() {
        let mut device = Device::with_available(DeviceId(0), 3, 0).unwrap();
        assert!(!device.is_available());
        assert!(device.reset());
        assert_eq!(device.available(), 3);
        assert!(!device.reset());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = Device::new(DeviceId(4), 0);
        assert!(matches!(result, Err(TranschedError::InvalidCapacity(_))));
    }

    #[test]
    fn test_availability_above_capacity_rejected() {
        assert!(Device::with_available(DeviceId(0), 2, 3).is_err());
        let partial = Device::with_available(DeviceId(0), 3, 1).unwrap();
        assert_eq!(partial.available(), 1);
    }

    #[test]
    fn test_relay_device() {
        let relay = Device::relay(DeviceId(9));
        assert!(relay.is_relay());
        assert_eq!(relay.capacity(), 1);
        assert_eq!(relay.role.to_string(), "bypass-relay");
    }
}
