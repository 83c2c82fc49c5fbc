//! Host-facing result types

use serde::{Deserialize, Serialize};

/// Per-frame output of the beat network
///
/// Produced at 50 Hz on the BPM pipeline. Both activations are softmax
/// probabilities in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    /// Beat likelihood for this frame
    pub beat_activation: f32,

    /// Downbeat likelihood for this frame
    pub downbeat_activation: f32,
}

/// Number of key classes (12 minor + 12 major)
pub const NUM_KEY_CLASSES: usize = 24;

/// Camelot labels in classifier output order
///
/// The key classifier emits indices in Camelot wheel order, NOT chromatic
/// order: 0-11 are the minor keys 1A through 12A, 12-23 are the major keys
/// 1B through 12B. Adjacent wheel positions are harmonically compatible.
const CAMELOT_LABELS: [&str; NUM_KEY_CLASSES] = [
    "1A", "2A", "3A", "4A", "5A", "6A", "7A", "8A", "9A", "10A", "11A", "12A",
    "1B", "2B", "3B", "4B", "5B", "6B", "7B", "8B", "9B", "10B", "11B", "12B",
];

/// Conventional key names in classifier output order
const NOTATION_LABELS: [&str; NUM_KEY_CLASSES] = [
    // Minor keys, Camelot 1A..12A
    "G#m", "Ebm", "Bbm", "Fm", "Cm", "Gm", "Dm", "Am", "Em", "Bm", "F#m", "C#m",
    // Major keys, Camelot 1B..12B
    "B", "F#", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E",
];

/// One of the 24 major/minor key classes, in classifier output order
///
/// # Example
///
/// ```
/// use pulsekey::KeyClass;
///
/// let key = KeyClass::from_index(7).unwrap();
/// assert_eq!(key.camelot(), "8A");
/// assert_eq!(key.notation(), "Am");
/// assert!(key.is_minor());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyClass(usize);

impl KeyClass {
    /// Create from a classifier output index (0-23)
    ///
    /// Returns `None` for indices outside the class range.
    pub fn from_index(index: usize) -> Option<Self> {
        if index < NUM_KEY_CLASSES {
            Some(KeyClass(index))
        } else {
            None
        }
    }

    /// Classifier output index (0-23)
    pub fn index(&self) -> usize {
        self.0
    }

    /// Camelot wheel label ("1A" - "12B")
    pub fn camelot(&self) -> &'static str {
        CAMELOT_LABELS[self.0]
    }

    /// Conventional key name (e.g. "Am", "C", "F#m")
    pub fn notation(&self) -> &'static str {
        NOTATION_LABELS[self.0]
    }

    /// True for the minor keys (indices 0-11, Camelot "A" half)
    pub fn is_minor(&self) -> bool {
        self.0 < 12
    }

    /// Look up a key class by its Camelot label (e.g. "8A", "12B")
    ///
    /// Returns `None` if the label is not one of the 24 wheel positions.
    pub fn from_camelot(label: &str) -> Option<Self> {
        CAMELOT_LABELS
            .iter()
            .position(|&l| l == label)
            .map(KeyClass)
    }
}

/// Latest key detection result
///
/// Starts out invalid; becomes valid after the first successful key
/// inference (~20 seconds of audio) and is then updated in place every
/// ~5 seconds. An invalid result carries empty labels and zero confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyResult {
    /// Detected key class, `None` until the first successful inference
    pub key: Option<KeyClass>,

    /// Camelot notation ("1A" - "12B"), empty while invalid
    pub camelot: String,

    /// Conventional notation ("Am", "C", ...), empty while invalid
    pub notation: String,

    /// Softmax probability of the predicted class (0.0-1.0)
    pub confidence: f32,

    /// True once a key has been detected
    pub valid: bool,
}
