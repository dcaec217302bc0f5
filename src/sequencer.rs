//! Service ID sequencing.

/// Generates the Service ID tagged onto each outgoing command.
///
/// The counter starts at 0 and is incremented before use, so the first SID
/// issued is 1. It wraps from 255 to 0.
///
/// # Example
///
/// ```
/// use fins_udp::SidSequencer;
///
/// let mut seq = SidSequencer::new();
/// assert_eq!(seq.next_sid(), 1);
/// assert_eq!(seq.next_sid(), 2);
/// assert_eq!(seq.current(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidSequencer {
    counter: u8,
}

impl SidSequencer {
    /// Creates a sequencer with the counter at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the counter and returns the new SID.
    pub fn next_sid(&mut self) -> u8 {
        self.counter = self.counter.wrapping_add(1);
        self.counter
    }

    /// Returns the most recently issued SID (0 before the first call).
    pub fn current(&self) -> u8 {
        self.counter
    }
}
