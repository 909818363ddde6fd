//! Linux sysfs GPIO driver.
//!
//! Each channel is one exported GPIO line configured as an output. The
//! reference boards wire common-anode LEDs, so by default a channel is lit by
//! driving its line low.

use super::ChannelDriver;
use glint_core::{Channel, GlintError, Level, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
struct Line {
    number: u32,
    value: PathBuf,
}

/// GPIO lines under a sysfs root such as `/sys/class/gpio`.
#[derive(Debug)]
pub struct SysfsGpioDriver {
    /// Red, green, blue
    lines: [Line; 3],
    active_low: bool,
}

impl SysfsGpioDriver {
    /// Export (if needed) and configure the red, green and blue lines.
    ///
    /// Any failure here is a hardware initialisation error.
    pub fn open(root: &Path, lines: [u32; 3], active_low: bool) -> Result<Self> {
        let [red, green, blue] = lines;
        Ok(Self {
            lines: [
                Self::prepare(root, red)?,
                Self::prepare(root, green)?,
                Self::prepare(root, blue)?,
            ],
            active_low,
        })
    }

    fn prepare(root: &Path, number: u32) -> Result<Line> {
        let dir = root.join(format!("gpio{}", number));

        if !dir.exists() {
            debug!("Exporting gpio{}", number);
            fs::write(root.join("export"), number.to_string())
                .map_err(|e| GlintError::hardware(format!("export gpio{}: {}", number, e)))?;
        }

        fs::write(dir.join("direction"), "out")
            .map_err(|e| GlintError::hardware(format!("gpio{} direction: {}", number, e)))?;

        Ok(Line {
            number,
            value: dir.join("value"),
        })
    }

    fn line(&self, channel: Channel) -> &Line {
        match channel {
            Channel::Red => &self.lines[0],
            Channel::Green => &self.lines[1],
            Channel::Blue => &self.lines[2],
        }
    }

    fn raw(&self, level: Level) -> &'static str {
        match (level.is_on(), self.active_low) {
            (true, true) | (false, false) => "0",
            _ => "1",
        }
    }
}

impl ChannelDriver for SysfsGpioDriver {
    fn set(&mut self, channel: Channel, level: Level) -> Result<()> {
        let line = self.line(channel);
        fs::write(&line.value, self.raw(level))
            .map_err(|e| GlintError::hardware(format!("write gpio{}: {}", line.number, e)))
    }

    fn read(&self, channel: Channel) -> Result<Level> {
        let line = self.line(channel);
        let raw = fs::read_to_string(&line.value)
            .map_err(|e| GlintError::hardware(format!("read gpio{}: {}", line.number, e)))?;

        let on = match raw.trim() {
            "0" => self.active_low,
            "1" => !self.active_low,
            other => {
                return Err(GlintError::hardware(format!(
                    "gpio{} reported '{}'",
                    line.number, other
                )));
            }
        };
        Ok(if on { Level::On } else { Level::Off })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_sysfs(lines: &[u32]) -> TempDir {
        let root = TempDir::new().unwrap();
        for n in lines {
            fs::create_dir(root.path().join(format!("gpio{}", n))).unwrap();
        }
        root
    }

    #[test]
    fn test_active_low_writes() {
        let root = fake_sysfs(&[17, 4, 18]);
        let mut driver = SysfsGpioDriver::open(root.path(), [17, 4, 18], true).unwrap();

        let direction = fs::read_to_string(root.path().join("gpio4/direction")).unwrap();
        assert_eq!(direction, "out");

        driver.set(Channel::Red, Level::On).unwrap();
        let value = fs::read_to_string(root.path().join("gpio17/value")).unwrap();
        assert_eq!(value, "0");
        assert_eq!(driver.read(Channel::Red).unwrap(), Level::On);

        assert_eq!(driver.toggle(Channel::Red).unwrap(), Level::Off);
        let value = fs::read_to_string(root.path().join("gpio17/value")).unwrap();
        assert_eq!(value, "1");
    }

    #[test]
    fn test_active_high_writes() {
        let root = fake_sysfs(&[1, 2, 3]);
        let mut driver = SysfsGpioDriver::open(root.path(), [1, 2, 3], false).unwrap();

        driver.all_off().unwrap();
        for n in [1, 2, 3] {
            let value = fs::read_to_string(root.path().join(format!("gpio{}/value", n))).unwrap();
            assert_eq!(value, "0");
        }
        driver.set(Channel::Blue, Level::On).unwrap();
        assert_eq!(driver.read(Channel::Blue).unwrap(), Level::On);
    }

    #[test]
    fn test_missing_line_is_hardware_error() {
        // Export succeeds as a plain file write but the line directory never appears.
        let root = fake_sysfs(&[17, 4]);
        let err = SysfsGpioDriver::open(root.path(), [17, 4, 18], true).unwrap_err();
        assert!(err.is_hardware());
        let export = fs::read_to_string(root.path().join("export")).unwrap();
        assert_eq!(export, "18");
    }
}
