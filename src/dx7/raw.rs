//! Transient schema-shaped records bridging the bit-layout engine and the
//! structured voice types. One raw type serves both the expanded and the
//! packed layout of the same logical record, since the field names match.
//! Instances live only for the duration of a single decode or encode call.

use crate::layout::{RecordSink, RecordSource, Value};
use crate::dx7::voice::{
    EnvelopeGenerator, Frequency, Keyboard, Lfo, LevelScaling, Operator,
    Oscillator, Voice, MANUFACTURER, MODEL,
};
use crate::Error;

fn four(values: &[u64]) -> [u8; 4] {
    std::array::from_fn(|i| values[i] as u8)
}

#[derive(Debug, Default, Clone)]
pub struct RawOperator {
    pub eg_rates: Vec<u64>,
    pub eg_levels: Vec<u64>,
    pub kls_break_point: u64,
    pub kls_left_depth: u64,
    pub kls_right_depth: u64,
    pub kls_left_curve: String,
    pub kls_right_curve: String,
    pub kbd_rate_scaling: u64,
    pub amp_mod_sens: u64,
    pub key_vel_sens: u64,
    pub output_level: u64,
    pub osc_mode: String,
    pub osc_coarse: u64,
    pub osc_fine: u64,
    pub osc_detune: i64,
}

impl RawOperator {
    pub fn to_structured(&self) -> Operator {
        Operator {
            envelope_generator: EnvelopeGenerator {
                rates: four(&self.eg_rates),
                levels: four(&self.eg_levels),
            },
            keyboard: Keyboard {
                level_scaling: LevelScaling {
                    break_point: self.kls_break_point as u8,
                    left_depth: self.kls_left_depth as u8,
                    left_curve: self.kls_left_curve.clone(),
                    right_depth: self.kls_right_depth as u8,
                    right_curve: self.kls_right_curve.clone(),
                },
                rate_scaling: self.kbd_rate_scaling as u8,
                velocity_sensitivity: self.key_vel_sens as u8,
            },
            oscillator: Oscillator {
                detune: self.osc_detune as i8,
                frequency: Frequency {
                    coarse: self.osc_coarse as u8,
                    fine: self.osc_fine as u8,
                },
                mode: self.osc_mode.clone(),
            },
            amp_mod_sensitivity: self.amp_mod_sens as u8,
            output_level: self.output_level as u8,
        }
    }

    pub fn from_structured(operator: &Operator) -> Self {
        Self {
            eg_rates: operator.envelope_generator.rates.iter().map(|r| u64::from(*r)).collect(),
            eg_levels: operator.envelope_generator.levels.iter().map(|l| u64::from(*l)).collect(),
            kls_break_point: operator.keyboard.level_scaling.break_point.into(),
            kls_left_depth: operator.keyboard.level_scaling.left_depth.into(),
            kls_right_depth: operator.keyboard.level_scaling.right_depth.into(),
            kls_left_curve: operator.keyboard.level_scaling.left_curve.clone(),
            kls_right_curve: operator.keyboard.level_scaling.right_curve.clone(),
            kbd_rate_scaling: operator.keyboard.rate_scaling.into(),
            amp_mod_sens: operator.amp_mod_sensitivity.into(),
            key_vel_sens: operator.keyboard.velocity_sensitivity.into(),
            output_level: operator.output_level.into(),
            osc_mode: operator.oscillator.mode.clone(),
            osc_coarse: operator.oscillator.frequency.coarse.into(),
            osc_fine: operator.oscillator.frequency.fine.into(),
            osc_detune: operator.oscillator.detune.into(),
        }
    }
}

impl RecordSink for RawOperator {
    fn set(&mut self, name: &'static str, value: Value) -> Result<(), Error> {
        match (name, value) {
            ("eg_rates", Value::Seq(v)) => self.eg_rates = v,
            ("eg_levels", Value::Seq(v)) => self.eg_levels = v,
            ("kls_break_point", Value::Uint(v)) => self.kls_break_point = v,
            ("kls_left_depth", Value::Uint(v)) => self.kls_left_depth = v,
            ("kls_right_depth", Value::Uint(v)) => self.kls_right_depth = v,
            ("kls_left_curve", Value::Label(v)) => self.kls_left_curve = v,
            ("kls_right_curve", Value::Label(v)) => self.kls_right_curve = v,
            ("kbd_rate_scaling", Value::Uint(v)) => self.kbd_rate_scaling = v,
            ("amp_mod_sens", Value::Uint(v)) => self.amp_mod_sens = v,
            ("key_vel_sens", Value::Uint(v)) => self.key_vel_sens = v,
            ("output_level", Value::Uint(v)) => self.output_level = v,
            ("osc_mode", Value::Label(v)) => self.osc_mode = v,
            ("osc_coarse", Value::Uint(v)) => self.osc_coarse = v,
            ("osc_fine", Value::Uint(v)) => self.osc_fine = v,
            ("osc_detune", Value::Int(v)) => self.osc_detune = v,
            _ => return Err(Error::UnknownField(name)),
        }
        Ok(())
    }

    fn child(&mut self, name: &'static str, _index: usize) -> Result<&mut dyn RecordSink, Error> {
        Err(Error::UnknownField(name))
    }
}

impl RecordSource for RawOperator {
    fn get(&self, name: &'static str) -> Result<Value, Error> {
        Ok(match name {
            "eg_rates" => Value::Seq(self.eg_rates.clone()),
            "eg_levels" => Value::Seq(self.eg_levels.clone()),
            "kls_break_point" => Value::Uint(self.kls_break_point),
            "kls_left_depth" => Value::Uint(self.kls_left_depth),
            "kls_right_depth" => Value::Uint(self.kls_right_depth),
            "kls_left_curve" => Value::Label(self.kls_left_curve.clone()),
            "kls_right_curve" => Value::Label(self.kls_right_curve.clone()),
            "kbd_rate_scaling" => Value::Uint(self.kbd_rate_scaling),
            "amp_mod_sens" => Value::Uint(self.amp_mod_sens),
            "key_vel_sens" => Value::Uint(self.key_vel_sens),
            "output_level" => Value::Uint(self.output_level),
            "osc_mode" => Value::Label(self.osc_mode.clone()),
            "osc_coarse" => Value::Uint(self.osc_coarse),
            "osc_fine" => Value::Uint(self.osc_fine),
            "osc_detune" => Value::Int(self.osc_detune),
            _ => return Err(Error::UnknownField(name)),
        })
    }

    fn child(&self, name: &'static str, _index: usize) -> Result<&dyn RecordSource, Error> {
        Err(Error::UnknownField(name))
    }
}

#[derive(Debug, Default, Clone)]
pub struct RawVoice {
    pub operators: [RawOperator; 6],
    pub pitch_eg_rates: Vec<u64>,
    pub pitch_eg_levels: Vec<u64>,
    pub algorithm: i64,
    pub feedback: u64,
    pub osc_sync: u64,
    pub lfo_speed: u64,
    pub lfo_delay: u64,
    pub lfo_pmd: u64,
    pub lfo_amd: u64,
    pub lfo_sync: u64,
    pub lfo_waveform: String,
    pub pitch_mod_sens: u64,
    pub transpose: u64,
    pub name: String,
}

impl RawVoice {
    /// Builds the durable record: undoes the OP6-first wire order, turns
    /// sync bits into booleans, trims name padding and fills the signature.
    pub fn to_structured(&self) -> Voice {
        let mut voice = Voice {
            operators: std::array::from_fn(|i| self.operators[5 - i].to_structured()),
            pitch_envelope_generator: EnvelopeGenerator {
                rates: four(&self.pitch_eg_rates),
                levels: four(&self.pitch_eg_levels),
            },
            algorithm: self.algorithm as u8,
            feedback: self.feedback as u8,
            oscillator_key_sync: self.osc_sync != 0,
            lfo: Lfo {
                speed: self.lfo_speed as u8,
                delay: self.lfo_delay as u8,
                pitch_mod_depth: self.lfo_pmd as u8,
                amp_mod_depth: self.lfo_amd as u8,
                key_sync: self.lfo_sync != 0,
                waveform: self.lfo_waveform.clone(),
            },
            pitch_mod_sensitivity: self.pitch_mod_sens as u8,
            transpose: self.transpose as u8,
            name: self.name.trim_end_matches(' ').to_string(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
            signature: String::new(),
        };
        voice.signature = voice.compute_signature();
        voice
    }

    pub fn from_structured(voice: &Voice) -> Self {
        let mut operators: [RawOperator; 6] = Default::default();
        for (i, operator) in voice.operators.iter().rev().enumerate() {
            operators[i] = RawOperator::from_structured(operator);
        }
        Self {
            operators,
            pitch_eg_rates: voice.pitch_envelope_generator.rates.iter().map(|r| u64::from(*r)).collect(),
            pitch_eg_levels: voice.pitch_envelope_generator.levels.iter().map(|l| u64::from(*l)).collect(),
            algorithm: voice.algorithm.into(),
            feedback: voice.feedback.into(),
            osc_sync: voice.oscillator_key_sync.into(),
            lfo_speed: voice.lfo.speed.into(),
            lfo_delay: voice.lfo.delay.into(),
            lfo_pmd: voice.lfo.pitch_mod_depth.into(),
            lfo_amd: voice.lfo.amp_mod_depth.into(),
            lfo_sync: voice.lfo.key_sync.into(),
            lfo_waveform: voice.lfo.waveform.clone(),
            pitch_mod_sens: voice.pitch_mod_sensitivity.into(),
            transpose: voice.transpose.into(),
            name: voice.name.clone(),
        }
    }
}

impl RecordSink for RawVoice {
    fn set(&mut self, name: &'static str, value: Value) -> Result<(), Error> {
        match (name, value) {
            ("pitch_eg_rates", Value::Seq(v)) => self.pitch_eg_rates = v,
            ("pitch_eg_levels", Value::Seq(v)) => self.pitch_eg_levels = v,
            ("algorithm", Value::Int(v)) => self.algorithm = v,
            ("feedback", Value::Uint(v)) => self.feedback = v,
            ("osc_sync", Value::Uint(v)) => self.osc_sync = v,
            ("lfo_speed", Value::Uint(v)) => self.lfo_speed = v,
            ("lfo_delay", Value::Uint(v)) => self.lfo_delay = v,
            ("lfo_pmd", Value::Uint(v)) => self.lfo_pmd = v,
            ("lfo_amd", Value::Uint(v)) => self.lfo_amd = v,
            ("lfo_sync", Value::Uint(v)) => self.lfo_sync = v,
            ("lfo_waveform", Value::Label(v)) => self.lfo_waveform = v,
            ("pitch_mod_sens", Value::Uint(v)) => self.pitch_mod_sens = v,
            ("transpose", Value::Uint(v)) => self.transpose = v,
            ("name", Value::Text(v)) => self.name = v,
            _ => return Err(Error::UnknownField(name)),
        }
        Ok(())
    }

    fn child(&mut self, name: &'static str, index: usize) -> Result<&mut dyn RecordSink, Error> {
        match name {
            "operators" if index < self.operators.len() => Ok(&mut self.operators[index]),
            _ => Err(Error::UnknownField(name)),
        }
    }
}

impl RecordSource for RawVoice {
    fn get(&self, name: &'static str) -> Result<Value, Error> {
        Ok(match name {
            "pitch_eg_rates" => Value::Seq(self.pitch_eg_rates.clone()),
            "pitch_eg_levels" => Value::Seq(self.pitch_eg_levels.clone()),
            "algorithm" => Value::Int(self.algorithm),
            "feedback" => Value::Uint(self.feedback),
            "osc_sync" => Value::Uint(self.osc_sync),
            "lfo_speed" => Value::Uint(self.lfo_speed),
            "lfo_delay" => Value::Uint(self.lfo_delay),
            "lfo_pmd" => Value::Uint(self.lfo_pmd),
            "lfo_amd" => Value::Uint(self.lfo_amd),
            "lfo_sync" => Value::Uint(self.lfo_sync),
            "lfo_waveform" => Value::Label(self.lfo_waveform.clone()),
            "pitch_mod_sens" => Value::Uint(self.pitch_mod_sens),
            "transpose" => Value::Uint(self.transpose),
            "name" => Value::Text(self.name.clone()),
            _ => return Err(Error::UnknownField(name)),
        })
    }

    fn child(&self, name: &'static str, index: usize) -> Result<&dyn RecordSource, Error> {
        match name {
            "operators" if index < self.operators.len() => Ok(&self.operators[index]),
            _ => Err(Error::UnknownField(name)),
        }
    }
}

#[derive(Debug, Default)]
pub struct RawDump {
    pub sub_status: u64,
    pub channel: i64,
    pub format: u64,
    pub byte_count: u64,
    pub voices: Vec<RawVoice>,
    pub checksum: u64,
}

impl RecordSink for RawDump {
    fn set(&mut self, name: &'static str, value: Value) -> Result<(), Error> {
        match (name, value) {
            ("sub_status", Value::Uint(v)) => self.sub_status = v,
            ("channel", Value::Int(v)) => self.channel = v,
            ("format", Value::Uint(v)) => self.format = v,
            ("byte_count", Value::Uint(v)) => self.byte_count = v,
            ("checksum", Value::Uint(v)) => self.checksum = v,
            _ => return Err(Error::UnknownField(name)),
        }
        Ok(())
    }

    fn child(&mut self, name: &'static str, index: usize) -> Result<&mut dyn RecordSink, Error> {
        if name != "voices" {
            return Err(Error::UnknownField(name));
        }
        debug_assert_eq!(index, self.voices.len());
        self.voices.push(RawVoice::default());
        Ok(self.voices.last_mut().expect("just pushed"))
    }
}

impl RecordSource for RawDump {
    fn get(&self, name: &'static str) -> Result<Value, Error> {
        Ok(match name {
            "sub_status" => Value::Uint(self.sub_status),
            "channel" => Value::Int(self.channel),
            "format" => Value::Uint(self.format),
            "byte_count" => Value::Uint(self.byte_count),
            "checksum" => Value::Uint(self.checksum),
            _ => return Err(Error::UnknownField(name)),
        })
    }

    fn child(&self, name: &'static str, index: usize) -> Result<&dyn RecordSource, Error> {
        match name {
            "voices" if index < self.voices.len() => Ok(&self.voices[index]),
            _ => Err(Error::UnknownField(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcoding_reverses_operator_order() {
        let mut raw = RawVoice::default();
        for (i, operator) in raw.operators.iter_mut().enumerate() {
            operator.eg_rates = vec![99; 4];
            operator.eg_levels = vec![99, 99, 99, 0];
            operator.kls_left_curve = "-LIN".to_string();
            operator.kls_right_curve = "-LIN".to_string();
            operator.osc_mode = "ratio".to_string();
            // first wire slot is OP6; give each slot a recognizable level
            operator.output_level = 60 + i as u64;
        }
        raw.pitch_eg_rates = vec![99; 4];
        raw.pitch_eg_levels = vec![50; 4];
        raw.algorithm = 1;
        raw.lfo_waveform = "triangle".to_string();
        raw.name = "TEST      ".to_string();

        let voice = raw.to_structured();
        // structured index 0 (OP1) came from the last wire slot
        assert_eq!(voice.operators[0].output_level, 65);
        assert_eq!(voice.operators[5].output_level, 60);

        let back = RawVoice::from_structured(&voice);
        assert_eq!(back.operators[0].output_level, 60);
        assert_eq!(back.operators[5].output_level, 65);
    }

    #[test]
    fn test_transcoding_trims_and_tags() {
        let mut raw = RawVoice::default();
        for operator in raw.operators.iter_mut() {
            operator.eg_rates = vec![0; 4];
            operator.eg_levels = vec![0; 4];
            operator.kls_left_curve = "-LIN".to_string();
            operator.kls_right_curve = "-LIN".to_string();
            operator.osc_mode = "ratio".to_string();
        }
        raw.pitch_eg_rates = vec![0; 4];
        raw.pitch_eg_levels = vec![0; 4];
        raw.algorithm = 3;
        raw.osc_sync = 1;
        raw.lfo_waveform = "sine".to_string();
        raw.name = "BRASS 1   ".to_string();

        let voice = raw.to_structured();
        assert_eq!(voice.name, "BRASS 1");
        assert_eq!(voice.manufacturer, "yamaha");
        assert_eq!(voice.model, "dx7");
        assert!(voice.oscillator_key_sync);
        assert_eq!(voice.signature, voice.compute_signature());
    }
}
