//! Measurement events
//!
//! Events emitted by a processing backend and republished to listeners:
//! - `dataavailable` carries one loudness value for one mode
//! - `start` / `pause` / `resume` / `stop` acknowledge lifecycle messages

use serde::{Deserialize, Serialize};
use std::fmt;

/// Loudness measurement window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// 400 ms window
    Momentary,
    /// 3 s window
    ShortTerm,
    /// Gated average over the whole session
    Integrated,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Momentary, Mode::ShortTerm, Mode::Integrated];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Momentary => "momentary",
            Self::ShortTerm => "short_term",
            Self::Integrated => "integrated",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::Momentary => 0b001,
            Self::ShortTerm => 0b010,
            Self::Integrated => 0b100,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "momentary" | "m" => Ok(Self::Momentary),
            "short_term" | "shortterm" | "s" => Ok(Self::ShortTerm),
            "integrated" | "i" => Ok(Self::Integrated),
            other => Err(format!("unknown loudness mode '{}'", other)),
        }
    }
}

/// Set of requested measurement modes
///
/// Serialized as a list, e.g. `["momentary", "integrated"]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Mode>", into = "Vec<Mode>")]
pub struct ModeSet(u8);

impl ModeSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Mode::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, mode: Mode) {
        self.0 |= mode.bit();
    }

    pub fn contains(&self, mode: Mode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Modes in canonical order (momentary, short-term, integrated)
    pub fn iter(&self) -> impl Iterator<Item = Mode> + '_ {
        Mode::ALL.into_iter().filter(|mode| self.contains(*mode))
    }
}

impl FromIterator<Mode> for ModeSet {
    fn from_iter<I: IntoIterator<Item = Mode>>(iter: I) -> Self {
        let mut set = Self::empty();
        for mode in iter {
            set.insert(mode);
        }
        set
    }
}

impl From<Vec<Mode>> for ModeSet {
    fn from(modes: Vec<Mode>) -> Self {
        modes.into_iter().collect()
    }
}

impl From<ModeSet> for Vec<Mode> {
    fn from(set: ModeSet) -> Self {
        set.iter().collect()
    }
}

impl<const N: usize> From<[Mode; N]> for ModeSet {
    fn from(modes: [Mode; N]) -> Self {
        modes.into_iter().collect()
    }
}

impl fmt::Debug for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Kind of event a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    DataAvailable,
    Start,
    Pause,
    Resume,
    Stop,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::DataAvailable,
        EventKind::Start,
        EventKind::Pause,
        EventKind::Resume,
        EventKind::Stop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataAvailable => "dataavailable",
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event produced by a processing backend
///
/// `mode` and `value` are only present on `DataAvailable` events; use the
/// constructors to keep it that way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementEvent {
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
}

impl MeasurementEvent {
    /// A loudness value (LUFS) for `mode`
    pub fn data(mode: Mode, value: f64) -> Self {
        Self {
            kind: EventKind::DataAvailable,
            mode: Some(mode),
            value: Some(value),
        }
    }

    pub fn start() -> Self {
        Self::lifecycle(EventKind::Start)
    }

    pub fn pause() -> Self {
        Self::lifecycle(EventKind::Pause)
    }

    pub fn resume() -> Self {
        Self::lifecycle(EventKind::Resume)
    }

    pub fn stop() -> Self {
        Self::lifecycle(EventKind::Stop)
    }

    fn lifecycle(kind: EventKind) -> Self {
        Self {
            kind,
            mode: None,
            value: None,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// `(mode, value)` for data events
    pub fn measurement(&self) -> Option<(Mode, f64)> {
        self.mode.zip(self.value)
    }
}
