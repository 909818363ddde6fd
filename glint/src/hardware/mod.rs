//! Output drivers for the three channels on every node.
//!
//! The engines never touch pins directly. Everything goes through
//! [`ChannelDriver`], which has two implementations:
//!
//! - [`MemoryDriver`] keeps levels in memory and journals every write
//! - [`SysfsGpioDriver`] drives Linux GPIO lines through `/sys/class/gpio`

use glint_core::config::{DriverKind, HardwareConfig};
use glint_core::{Channel, Level, Result};
use tracing::info;

pub mod memory;
pub mod sysfs;

pub use memory::MemoryDriver;
pub use sysfs::SysfsGpioDriver;

/// Abstract output driver
///
/// Implement this trait to support a different board. Writes are cheap and
/// synchronous; pacing is the caller's job.
pub trait ChannelDriver: Send {
    /// Drive a channel to a level
    fn set(&mut self, channel: Channel, level: Level) -> Result<()>;

    /// Current level of a channel
    fn read(&self, channel: Channel) -> Result<Level>;

    /// Flip a channel and return the level it now has
    fn toggle(&mut self, channel: Channel) -> Result<Level> {
        let level = self.read(channel)?.inverted();
        self.set(channel, level)?;
        Ok(level)
    }

    /// Force every channel off
    fn all_off(&mut self) -> Result<()> {
        for channel in Channel::ALL {
            self.set(channel, Level::Off)?;
        }
        Ok(())
    }
}

/// Open the driver a configuration asks for, with every channel off.
pub fn open(config: &HardwareConfig) -> Result<Box<dyn ChannelDriver>> {
    let mut driver: Box<dyn ChannelDriver> = match config.driver {
        DriverKind::Memory => Box::new(MemoryDriver::new()),
        DriverKind::Sysfs => Box::new(SysfsGpioDriver::open(
            &config.sysfs_root,
            [config.red_line, config.green_line, config.blue_line],
            config.active_low,
        )?),
    };
    driver.all_off()?;
    info!("Opened {:?} output driver", config.driver);
    Ok(driver)
}

#[cfg(test)]
impl std::fmt::Debug for dyn ChannelDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ChannelDriver")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_memory_driver_is_dark() {
        let driver = open(&HardwareConfig::default()).unwrap();
        for channel in Channel::ALL {
            assert_eq!(driver.read(channel).unwrap(), Level::Off);
        }
    }

    #[test]
    fn test_open_sysfs_without_lines_fails() {
        let root = TempDir::new().unwrap();
        let config = HardwareConfig {
            driver: DriverKind::Sysfs,
            sysfs_root: root.path().to_path_buf(),
            ..HardwareConfig::default()
        };
        assert!(open(&config).unwrap_err().is_hardware());
    }
}
