//! Declarative wire layouts for DX7 voice dumps.
//!
//! Two layout families cover the same logical voice: the expanded form
//! (one byte per parameter, used when a single voice is transmitted) and
//! the packed form (several parameters per byte, used inside a 32-voice
//! bank). The dump message itself selects between them with its format
//! number byte. Nothing here executes; the engine in [`crate::layout`]
//! interprets these statics.

use crate::layout::{Arm, EnumValues, FieldSpec, Layout, LayoutItem};

/// Size of the dump header: sub-status/channel byte, format number,
/// two byte-count bytes.
pub const HEADER_SIZE: usize = 4;

/// An expanded single voice on the wire.
pub const VOICE_BYTES: usize = 155;

/// A packed voice inside a bank.
pub const PACKED_VOICE_BYTES: usize = 128;

/// Voices in a bank dump; partial banks do not exist.
pub const BANK_VOICES: usize = 32;

/// Declared byte count of a single-voice dump (format 0).
pub const VOICE_BYTE_COUNT: u16 = 0x011b;

/// Declared byte count of a bank dump (format 9).
pub const BANK_BYTE_COUNT: u16 = 0x2000;

/// Keyboard level scaling curve shapes.
pub static CURVES: EnumValues = EnumValues {
    entries: &[
        (&[0], "-LIN"),
        (&[1], "-EXP"),
        (&[2], "+EXP"),
        (&[3], "+LIN"),
    ],
};

/// Oscillator frequency mode.
pub static OSC_MODES: EnumValues = EnumValues {
    entries: &[
        (&[0], "ratio"),
        (&[1], "fixed"),
    ],
};

/// LFO waveforms. The service manual gives 5 for sample-and-hold, but
/// real dumps (and parsers like Dexed) also carry 6 and 7 for it.
pub static WAVEFORMS: EnumValues = EnumValues {
    entries: &[
        (&[0], "triangle"),
        (&[1], "saw down"),
        (&[2], "saw up"),
        (&[3], "square"),
        (&[4], "sine"),
        (&[5, 6, 7], "sample and hold"),
    ],
};

/// Expanded operator: 21 bytes, one parameter per byte.
pub static OPERATOR: Layout = Layout {
    name: "operator",
    items: &[
        LayoutItem::Scalar(FieldSpec::seq("eg_rates", 4, 8)),
        LayoutItem::Scalar(FieldSpec::seq("eg_levels", 4, 8)),
        LayoutItem::Scalar(FieldSpec::uint("kls_break_point", 8)),
        LayoutItem::Scalar(FieldSpec::uint("kls_left_depth", 8)),
        LayoutItem::Scalar(FieldSpec::uint("kls_right_depth", 8)),
        LayoutItem::Scalar(FieldSpec::enumeration("kls_left_curve", 8, &CURVES)),
        LayoutItem::Scalar(FieldSpec::enumeration("kls_right_curve", 8, &CURVES)),
        LayoutItem::Scalar(FieldSpec::uint("kbd_rate_scaling", 8)),
        LayoutItem::Scalar(FieldSpec::uint("amp_mod_sens", 8)),
        LayoutItem::Scalar(FieldSpec::uint("key_vel_sens", 8)),
        LayoutItem::Scalar(FieldSpec::uint("output_level", 8)),
        LayoutItem::Scalar(FieldSpec::enumeration("osc_mode", 8, &OSC_MODES)),
        LayoutItem::Scalar(FieldSpec::uint("osc_coarse", 8)),
        LayoutItem::Scalar(FieldSpec::uint("osc_fine", 8)),
        LayoutItem::Scalar(FieldSpec::int("osc_detune", 8, -7)),
    ],
};

/// Expanded voice: 155 bytes, operators transmitted OP6 first.
pub static VOICE: Layout = Layout {
    name: "voice",
    items: &[
        LayoutItem::Records { name: "operators", count: 6, layout: &OPERATOR },
        LayoutItem::Scalar(FieldSpec::seq("pitch_eg_rates", 4, 8)),
        LayoutItem::Scalar(FieldSpec::seq("pitch_eg_levels", 4, 8)),
        LayoutItem::Scalar(FieldSpec::int("algorithm", 8, 1)),
        LayoutItem::Scalar(FieldSpec::uint("feedback", 8)),
        LayoutItem::Scalar(FieldSpec::uint("osc_sync", 8)),
        LayoutItem::Scalar(FieldSpec::uint("lfo_speed", 8)),
        LayoutItem::Scalar(FieldSpec::uint("lfo_delay", 8)),
        LayoutItem::Scalar(FieldSpec::uint("lfo_pmd", 8)),
        LayoutItem::Scalar(FieldSpec::uint("lfo_amd", 8)),
        LayoutItem::Scalar(FieldSpec::uint("lfo_sync", 8)),
        LayoutItem::Scalar(FieldSpec::enumeration("lfo_waveform", 8, &WAVEFORMS)),
        LayoutItem::Scalar(FieldSpec::uint("pitch_mod_sens", 8)),
        LayoutItem::Scalar(FieldSpec::uint("transpose", 8)),
        LayoutItem::Scalar(FieldSpec::text("name", 10)),
    ],
};

/// Packed operator: 17 bytes, bit-packed from byte 11 onward.
pub static PACKED_OPERATOR: Layout = Layout {
    name: "packed_operator",
    items: &[
        LayoutItem::Scalar(FieldSpec::seq("eg_rates", 4, 8)),
        LayoutItem::Scalar(FieldSpec::seq("eg_levels", 4, 8)),
        LayoutItem::Scalar(FieldSpec::uint("kls_break_point", 8)),
        LayoutItem::Scalar(FieldSpec::uint("kls_left_depth", 8)),
        LayoutItem::Scalar(FieldSpec::uint("kls_right_depth", 8)),
        // byte 11
        LayoutItem::Scalar(FieldSpec::padding(4)),
        LayoutItem::Scalar(FieldSpec::enumeration("kls_right_curve", 2, &CURVES)),
        LayoutItem::Scalar(FieldSpec::enumeration("kls_left_curve", 2, &CURVES)),
        // byte 12
        LayoutItem::Scalar(FieldSpec::padding(1)),
        LayoutItem::Scalar(FieldSpec::int("osc_detune", 4, -7)),
        LayoutItem::Scalar(FieldSpec::uint("kbd_rate_scaling", 3)),
        // byte 13
        LayoutItem::Scalar(FieldSpec::padding(3)),
        LayoutItem::Scalar(FieldSpec::uint("key_vel_sens", 3)),
        LayoutItem::Scalar(FieldSpec::uint("amp_mod_sens", 2)),
        // byte 14
        LayoutItem::Scalar(FieldSpec::uint("output_level", 8)),
        // byte 15
        LayoutItem::Scalar(FieldSpec::padding(2)),
        LayoutItem::Scalar(FieldSpec::uint("osc_coarse", 5)),
        LayoutItem::Scalar(FieldSpec::enumeration("osc_mode", 1, &OSC_MODES)),
        // byte 16
        LayoutItem::Scalar(FieldSpec::uint("osc_fine", 8)),
    ],
};

/// Packed voice: 128 bytes inside a bank, operators OP6 first.
///
/// Byte 116 deviates from the service manual on purpose: pitch mod
/// sensitivity ranges over 0...7, so it takes 3 bits, not the documented 2.
/// The third bit comes out of the reserved padding, which pushes the LFO
/// waveform one bit along. Real hardware dumps only round-trip with this
/// allocation.
pub static PACKED_VOICE: Layout = Layout {
    name: "packed_voice",
    items: &[
        LayoutItem::Records { name: "operators", count: 6, layout: &PACKED_OPERATOR },
        LayoutItem::Scalar(FieldSpec::seq("pitch_eg_rates", 4, 8)),
        LayoutItem::Scalar(FieldSpec::seq("pitch_eg_levels", 4, 8)),
        // byte 110
        LayoutItem::Scalar(FieldSpec::padding(3)),
        LayoutItem::Scalar(FieldSpec::int("algorithm", 5, 1)),
        // byte 111
        LayoutItem::Scalar(FieldSpec::padding(4)),
        LayoutItem::Scalar(FieldSpec::uint("osc_sync", 1)),
        LayoutItem::Scalar(FieldSpec::uint("feedback", 3)),
        LayoutItem::Scalar(FieldSpec::uint("lfo_speed", 8)),
        LayoutItem::Scalar(FieldSpec::uint("lfo_delay", 8)),
        LayoutItem::Scalar(FieldSpec::uint("lfo_pmd", 8)),
        LayoutItem::Scalar(FieldSpec::uint("lfo_amd", 8)),
        // byte 116, see above
        LayoutItem::Scalar(FieldSpec::padding(1)),
        LayoutItem::Scalar(FieldSpec::uint("pitch_mod_sens", 3)),
        LayoutItem::Scalar(FieldSpec::enumeration("lfo_waveform", 3, &WAVEFORMS)),
        LayoutItem::Scalar(FieldSpec::uint("lfo_sync", 1)),
        // byte 117
        LayoutItem::Scalar(FieldSpec::uint("transpose", 8)),
        LayoutItem::Scalar(FieldSpec::text("name", 10)),
    ],
};

/// A complete dump payload: header, voice body chosen by the format
/// number, trailing checksum.
pub static DUMP: Layout = Layout {
    name: "dump",
    items: &[
        LayoutItem::Scalar(FieldSpec::padding(1)),
        LayoutItem::Scalar(FieldSpec::uint("sub_status", 3)),
        LayoutItem::Scalar(FieldSpec::int("channel", 4, 1)),
        LayoutItem::Scalar(FieldSpec::uint("format", 8)),
        LayoutItem::Scalar(FieldSpec::uint("byte_count", 16)),
        LayoutItem::Conditional {
            discriminant: "format",
            arms: &[
                Arm { value: 0, name: "voices", count: 1, layout: &VOICE },
                Arm { value: 9, name: "voices", count: BANK_VOICES, layout: &PACKED_VOICE },
            ],
        },
        LayoutItem::Scalar(FieldSpec::uint("checksum", 8)),
    ],
};
