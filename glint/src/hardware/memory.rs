//! In-memory driver used by the simulator and the tests.

use super::ChannelDriver;
use glint_core::{Channel, Level, Result};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
struct MemoryState {
    levels: [Level; 3],
    pulses: [usize; 3],
    /// `None` when the driver only counts
    journal: Option<Vec<(Channel, Level)>>,
}

/// Outputs held in memory.
///
/// Clones share state, so a test can keep a handle while the follower owns
/// the driver.
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    /// Driver that journals every write.
    pub fn new() -> Self {
        Self::with_journal(Some(Vec::new()))
    }

    /// Driver that only keeps levels and pulse counts, for runs with no end.
    pub fn counting() -> Self {
        Self::with_journal(None)
    }

    fn with_journal(journal: Option<Vec<(Channel, Level)>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                levels: [Level::Off; 3],
                pulses: [0; 3],
                journal,
            })),
        }
    }

    /// Every write so far, in order. Empty for a counting driver.
    pub fn journal(&self) -> Vec<(Channel, Level)> {
        self.state.lock().journal.clone().unwrap_or_default()
    }

    /// How many times a channel was switched on.
    pub fn pulses(&self, channel: Channel) -> usize {
        self.state.lock().pulses[slot(channel)]
    }

    pub fn level(&self, channel: Channel) -> Level {
        self.state.lock().levels[slot(channel)]
    }

    /// Whether every channel is currently off.
    pub fn is_dark(&self) -> bool {
        self.state.lock().levels.iter().all(|l| !l.is_on())
    }
}

fn slot(channel: Channel) -> usize {
    match channel {
        Channel::Red => 0,
        Channel::Green => 1,
        Channel::Blue => 2,
    }
}

impl ChannelDriver for MemoryDriver {
    fn set(&mut self, channel: Channel, level: Level) -> Result<()> {
        let mut state = self.state.lock();
        state.levels[slot(channel)] = level;
        if level.is_on() {
            state.pulses[slot(channel)] += 1;
        }
        if let Some(journal) = state.journal.as_mut() {
            journal.push((channel, level));
        }
        Ok(())
    }

    fn read(&self, channel: Channel) -> Result<Level> {
        Ok(self.level(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let handle = MemoryDriver::new();
        let mut driver = handle.clone();

        driver.set(Channel::Green, Level::On).unwrap();
        assert_eq!(handle.level(Channel::Green), Level::On);
        assert!(!handle.is_dark());
        assert_eq!(handle.pulses(Channel::Green), 1);
    }

    #[test]
    fn test_toggle_and_all_off() {
        let mut driver = MemoryDriver::new();
        assert_eq!(driver.toggle(Channel::Red).unwrap(), Level::On);
        assert_eq!(driver.toggle(Channel::Red).unwrap(), Level::Off);
        assert_eq!(driver.toggle(Channel::Blue).unwrap(), Level::On);

        driver.all_off().unwrap();
        assert!(driver.is_dark());
        assert_eq!(driver.pulses(Channel::Red), 1);
        assert_eq!(driver.journal().len(), 6);
    }

    #[test]
    fn test_counting_driver_keeps_no_journal() {
        let handle = MemoryDriver::counting();
        let mut driver = handle.clone();

        for _ in 0..1000 {
            driver.set(Channel::Blue, Level::On).unwrap();
            driver.set(Channel::Blue, Level::Off).unwrap();
        }

        assert_eq!(handle.pulses(Channel::Blue), 1000);
        assert!(handle.journal().is_empty());
        assert!(handle.is_dark());
    }
}
