//! Structured voice records: the durable, JSON-compatible representation
//! the codec produces and consumes. Field nesting and key names match the
//! persisted document format; everything is lowercase.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Manufacturer tag carried by every structured voice.
pub const MANUFACTURER: &str = "yamaha";

/// Model tag carried by every structured voice.
pub const MODEL: &str = "dx7";

pub const OPERATOR_COUNT: usize = 6;

/// Four-stage envelope generator rates and levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeGenerator {
    pub rates: [u8; 4],
    pub levels: [u8; 4],
}

/// Keyboard level scaling around a break point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelScaling {
    pub break_point: u8,  // 0...99, C3 = 39
    pub left_depth: u8,
    pub left_curve: String,
    pub right_depth: u8,
    pub right_curve: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub level_scaling: LevelScaling,
    pub rate_scaling: u8,         // 0...7
    pub velocity_sensitivity: u8, // 0...7
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    pub coarse: u8, // 0...31
    pub fine: u8,   // 0...99
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oscillator {
    pub detune: i8, // -7...+7, stored bias-7 on the wire
    pub frequency: Frequency,
    pub mode: String, // "ratio" or "fixed"
}

/// One of the six sound-generating operators of a voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub envelope_generator: EnvelopeGenerator,
    pub keyboard: Keyboard,
    pub oscillator: Oscillator,
    pub amp_mod_sensitivity: u8, // 0...3
    pub output_level: u8,        // 0...99
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lfo {
    pub speed: u8,
    pub delay: u8,
    pub pitch_mod_depth: u8,
    pub amp_mod_depth: u8,
    pub key_sync: bool,
    pub waveform: String,
}

/// A complete DX7 voice. Operator index 0 is OP1; the wire order
/// (OP6 first) is undone during transcoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub operators: [Operator; OPERATOR_COUNT],
    pub pitch_envelope_generator: EnvelopeGenerator,
    pub algorithm: u8, // 1...32
    pub feedback: u8,  // 0...7
    pub oscillator_key_sync: bool,
    pub lfo: Lfo,
    pub pitch_mod_sensitivity: u8, // 0...7
    pub transpose: u8,             // 0...48, 24 = no transpose
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    #[serde(default)]
    pub signature: String,
}

impl Operator {
    /// Creates a new operator with the DX7 voice init defaults.
    pub fn new() -> Self {
        Self {
            envelope_generator: EnvelopeGenerator {
                rates: [99, 99, 99, 99],
                levels: [99, 99, 99, 0],
            },
            keyboard: Keyboard {
                level_scaling: LevelScaling {
                    break_point: 39, // C3
                    left_depth: 0,
                    left_curve: "-LIN".to_string(),
                    right_depth: 0,
                    right_curve: "-LIN".to_string(),
                },
                rate_scaling: 0,
                velocity_sensitivity: 0,
            },
            oscillator: Oscillator {
                detune: 0,
                frequency: Frequency { coarse: 1, fine: 0 },
                mode: "ratio".to_string(),
            },
            amp_mod_sensitivity: 0,
            output_level: 0,
        }
    }
}

impl Default for Operator {
    fn default() -> Operator {
        Operator::new()
    }
}

impl Lfo {
    /// Creates a new LFO with the DX7 voice init defaults.
    pub fn new() -> Self {
        Self {
            speed: 35,
            delay: 0,
            pitch_mod_depth: 0,
            amp_mod_depth: 0,
            key_sync: true,
            waveform: "triangle".to_string(),
        }
    }
}

impl Default for Lfo {
    fn default() -> Lfo {
        Lfo::new()
    }
}

impl Voice {
    /// Creates a new voice with the DX7 voice init defaults and a
    /// freshly computed signature.
    pub fn new() -> Self {
        let mut voice = Self {
            operators: Default::default(),
            pitch_envelope_generator: EnvelopeGenerator {
                rates: [99, 99, 99, 99],
                levels: [50, 50, 50, 50],
            },
            algorithm: 1,
            feedback: 0,
            oscillator_key_sync: true,
            lfo: Lfo::new(),
            pitch_mod_sensitivity: 0,
            transpose: 24,
            name: "INIT VOICE".to_string(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
            signature: String::new(),
        };
        voice.signature = voice.compute_signature();
        voice
    }

    /// Content hash identifying this voice regardless of what it is called:
    /// SHA-1 over the canonical (sorted-key) JSON serialization with the
    /// `name` and `signature` fields removed.
    pub fn compute_signature(&self) -> String {
        let mut value = serde_json::to_value(self).expect("voice serializes to JSON");
        if let serde_json::Value::Object(map) = &mut value {
            map.remove("name");
            map.remove("signature");
        }
        hex::encode(Sha1::digest(value.to_string().as_bytes()))
    }

    /// Recomputes and stores the signature after edits.
    pub fn refresh_signature(&mut self) {
        self.signature = self.compute_signature();
    }
}

impl Default for Voice {
    fn default() -> Voice {
        Voice::new()
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (algorithm {}, feedback {}, transpose {})",
            self.name, self.algorithm, self.feedback, self.transpose as i32 - 24)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_ignores_name() {
        let mut voice = Voice::new();
        let original = voice.compute_signature();
        voice.name = "SOMETHING".to_string();
        assert_eq!(voice.compute_signature(), original);
    }

    #[test]
    fn test_signature_tracks_content() {
        let mut voice = Voice::new();
        let original = voice.compute_signature();
        voice.algorithm = 2;
        assert_ne!(voice.compute_signature(), original);
    }

    #[test]
    fn test_signature_ignores_stale_signature_field() {
        let mut voice = Voice::new();
        let original = voice.compute_signature();
        voice.signature = "garbage".to_string();
        assert_eq!(voice.compute_signature(), original);
    }

    #[test]
    fn test_json_round_trip() {
        let voice = Voice::new();
        let json = serde_json::to_string(&voice).unwrap();
        let back: Voice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, voice);
    }

    #[test]
    fn test_json_load_tolerates_provenance_fields() {
        let voice = Voice::new();
        let mut value = serde_json::to_value(&voice).unwrap();
        // the batch tool annotates stored voices; those keys must not
        // break loading and must not reach the signature
        value["author"] = serde_json::json!("someone");
        value["bank"] = serde_json::json!("rom1a");
        let back: Voice = serde_json::from_value(value).unwrap();
        assert_eq!(back.compute_signature(), voice.compute_signature());
    }

    #[test]
    fn test_json_load_without_signature_field() {
        let mut value = serde_json::to_value(Voice::new()).unwrap();
        value.as_object_mut().unwrap().remove("signature");
        let back: Voice = serde_json::from_value(value).unwrap();
        assert_eq!(back.signature, "");
    }

    #[test]
    fn test_init_voice_defaults() {
        let voice = Voice::new();
        assert_eq!(voice.name, "INIT VOICE");
        assert_eq!(voice.algorithm, 1);
        assert_eq!(voice.operators[0].oscillator.frequency.coarse, 1);
        assert_eq!(voice.lfo.waveform, "triangle");
        assert!(!voice.signature.is_empty());
    }
}
