//! Generic bit-level layout engine.
//!
//! A wire format is declared as a [`Layout`]: an ordered list of field
//! descriptors with explicit bit widths, plus nested records and at most one
//! conditional branch keyed on an earlier field. Decoding walks the declared
//! list against a [`BitReader`] and hands one named, typed [`Value`] per
//! field to a [`RecordSink`]; encoding pulls values back out of a
//! [`RecordSource`] and serializes them with a [`BitWriter`]. Fields never
//! need to start on a byte boundary, but a completed layout must.

use bit::BitIndex;

use crate::Error;

/// A decoded or to-be-encoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint(u64),
    Int(i64),
    Label(String),
    Seq(Vec<u64>),
    Text(String),
}

/// Mapping between raw codes and labels for an enumerated field.
/// Several codes may share one label; the lowest code is canonical.
#[derive(Debug)]
pub struct EnumValues {
    pub entries: &'static [(&'static [u64], &'static str)],
}

impl EnumValues {
    pub fn label(&self, code: u64) -> Option<&'static str> {
        self.entries.iter()
            .find(|(codes, _)| codes.contains(&code))
            .map(|(_, label)| *label)
    }

    /// The canonical (lowest) code for a label.
    pub fn code(&self, label: &str) -> Option<u64> {
        self.entries.iter()
            .find(|(_, l)| *l == label)
            .and_then(|(codes, _)| codes.iter().copied().min())
    }
}

/// The semantic kind of a field, with its width in bits.
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    /// Unsigned integer.
    Uint { bits: u32 },
    /// Unsigned on the wire, offset added to make the logical value.
    Int { bits: u32, offset: i64 },
    /// Raw code translated through an [`EnumValues`] table.
    Enum { bits: u32, values: &'static EnumValues },
    /// Fixed-count sequence of unsigned integers.
    Seq { count: usize, bits: u32 },
    /// Fixed-length text, one byte per character, space padded.
    Text { len: usize },
    /// Reserved bits; decodes to nothing, encodes as zeros.
    Padding { bits: u32 },
}

impl Kind {
    fn bit_len(&self) -> usize {
        match *self {
            Kind::Uint { bits } => bits as usize,
            Kind::Int { bits, .. } => bits as usize,
            Kind::Enum { bits, .. } => bits as usize,
            Kind::Seq { count, bits } => count * bits as usize,
            Kind::Text { len } => len * 8,
            Kind::Padding { bits } => bits as usize,
        }
    }
}

/// One named field in a layout.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: Kind,
}

impl FieldSpec {
    pub const fn uint(name: &'static str, bits: u32) -> Self {
        Self { name, kind: Kind::Uint { bits } }
    }

    pub const fn int(name: &'static str, bits: u32, offset: i64) -> Self {
        Self { name, kind: Kind::Int { bits, offset } }
    }

    pub const fn enumeration(name: &'static str, bits: u32, values: &'static EnumValues) -> Self {
        Self { name, kind: Kind::Enum { bits, values } }
    }

    pub const fn seq(name: &'static str, count: usize, bits: u32) -> Self {
        Self { name, kind: Kind::Seq { count, bits } }
    }

    pub const fn text(name: &'static str, len: usize) -> Self {
        Self { name, kind: Kind::Text { len } }
    }

    pub const fn padding(bits: u32) -> Self {
        Self { name: "padding", kind: Kind::Padding { bits } }
    }
}

/// One alternative body of a conditional layout.
#[derive(Debug, Clone, Copy)]
pub struct Arm {
    /// Discriminant value selecting this arm.
    pub value: u64,
    /// Record name the arm's instances are filed under.
    pub name: &'static str,
    pub count: usize,
    pub layout: &'static Layout,
}

/// An item in a layout: a scalar field, a run of nested records, or a
/// conditional branch dispatching on a previously decoded field.
#[derive(Debug, Clone, Copy)]
pub enum LayoutItem {
    Scalar(FieldSpec),
    Records { name: &'static str, count: usize, layout: &'static Layout },
    Conditional { discriminant: &'static str, arms: &'static [Arm] },
}

/// An ordered, declarative description of a binary record.
#[derive(Debug)]
pub struct Layout {
    pub name: &'static str,
    pub items: &'static [LayoutItem],
}

/// Receives decoded fields in declaration order. Nested records are
/// requested through [`RecordSink::child`].
pub trait RecordSink {
    fn set(&mut self, name: &'static str, value: Value) -> Result<(), Error>;
    fn child(&mut self, name: &'static str, index: usize) -> Result<&mut dyn RecordSink, Error>;
}

/// Supplies field values during encoding, mirror image of [`RecordSink`].
pub trait RecordSource {
    fn get(&self, name: &'static str) -> Result<Value, Error>;
    fn child(&self, name: &'static str, index: usize) -> Result<&dyn RecordSource, Error>;
}

impl Layout {
    /// Total width in bits, if the layout has no conditional branch.
    pub fn bit_len(&self) -> Option<usize> {
        let mut total = 0;
        for item in self.items {
            match item {
                LayoutItem::Scalar(field) => total += field.kind.bit_len(),
                LayoutItem::Records { count, layout, .. } => {
                    total += count * layout.bit_len()?;
                }
                LayoutItem::Conditional { .. } => return None,
            }
        }
        Some(total)
    }

    /// Total width in bytes. Panics if the declared widths do not add up
    /// to whole bytes; that is a schema authoring error, not a runtime one.
    pub fn byte_len(&self) -> Option<usize> {
        self.bit_len().map(|bits| {
            assert!(bits % 8 == 0, "layout '{}' is {} bits, not whole bytes", self.name, bits);
            bits / 8
        })
    }

    /// Decodes one record according to this layout, feeding the sink one
    /// value per non-padding field.
    pub fn decode(&self, r: &mut BitReader, sink: &mut dyn RecordSink) -> Result<(), Error> {
        // Unsigned scalars already decoded at this level, kept for
        // conditional dispatch.
        let mut seen: Vec<(&'static str, u64)> = Vec::new();

        for item in self.items {
            match *item {
                LayoutItem::Scalar(field) => self.decode_scalar(&field, r, sink, &mut seen)?,
                LayoutItem::Records { name, count, layout } => {
                    for i in 0..count {
                        layout.decode(r, sink.child(name, i)?)?;
                        debug_assert!(r.position() % 8 == 0,
                            "record '{}' left the cursor mid-byte", layout.name);
                    }
                }
                LayoutItem::Conditional { discriminant, arms } => {
                    let value = seen.iter().rev()
                        .find(|(name, _)| *name == discriminant)
                        .map(|(_, value)| *value)
                        .expect("discriminant must precede the conditional in its layout");
                    let arm = arms.iter()
                        .find(|arm| arm.value == value)
                        .ok_or(Error::UnsupportedFormat(value))?;
                    for i in 0..arm.count {
                        arm.layout.decode(r, sink.child(arm.name, i)?)?;
                        debug_assert!(r.position() % 8 == 0,
                            "record '{}' left the cursor mid-byte", arm.layout.name);
                    }
                }
            }
        }
        Ok(())
    }

    fn decode_scalar(
        &self,
        field: &FieldSpec,
        r: &mut BitReader,
        sink: &mut dyn RecordSink,
        seen: &mut Vec<(&'static str, u64)>,
    ) -> Result<(), Error> {
        match field.kind {
            Kind::Uint { bits } => {
                let value = r.take(field.name, bits)?;
                seen.push((field.name, value));
                sink.set(field.name, Value::Uint(value))?;
            }
            Kind::Int { bits, offset } => {
                let raw = r.take(field.name, bits)?;
                sink.set(field.name, Value::Int(raw as i64 + offset))?;
            }
            Kind::Enum { bits, values } => {
                let code = r.take(field.name, bits)?;
                let label = values.label(code)
                    .ok_or(Error::UnmappedCode { field: field.name, code })?;
                sink.set(field.name, Value::Label(label.to_string()))?;
            }
            Kind::Seq { count, bits } => {
                let mut elements = Vec::with_capacity(count);
                for _ in 0..count {
                    elements.push(r.take(field.name, bits)?);
                }
                sink.set(field.name, Value::Seq(elements))?;
            }
            Kind::Text { len } => {
                let mut bytes = Vec::with_capacity(len);
                for _ in 0..len {
                    bytes.push(r.take(field.name, 8)? as u8);
                }
                sink.set(field.name, Value::Text(String::from_utf8_lossy(&bytes).into_owned()))?;
            }
            Kind::Padding { bits } => {
                r.take(field.name, bits)?;
            }
        }
        Ok(())
    }

    /// Encodes one record according to this layout, pulling one value per
    /// non-padding field from the source.
    pub fn encode(&self, w: &mut BitWriter, source: &dyn RecordSource) -> Result<(), Error> {
        for item in self.items {
            match *item {
                LayoutItem::Scalar(field) => self.encode_scalar(&field, w, source)?,
                LayoutItem::Records { name, count, layout } => {
                    for i in 0..count {
                        layout.encode(w, source.child(name, i)?)?;
                    }
                }
                LayoutItem::Conditional { discriminant, arms } => {
                    let Value::Uint(value) = source.get(discriminant)? else {
                        panic!("discriminant '{}' must be an unsigned field", discriminant);
                    };
                    let arm = arms.iter()
                        .find(|arm| arm.value == value)
                        .ok_or(Error::UnsupportedFormat(value))?;
                    for i in 0..arm.count {
                        arm.layout.encode(w, source.child(arm.name, i)?)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn encode_scalar(
        &self,
        field: &FieldSpec,
        w: &mut BitWriter,
        source: &dyn RecordSource,
    ) -> Result<(), Error> {
        match field.kind {
            Kind::Uint { bits } => {
                let Value::Uint(value) = source.get(field.name)? else {
                    panic!("field '{}' expects an unsigned value", field.name);
                };
                w.put(field.name, bits, value)?;
            }
            Kind::Int { bits, offset } => {
                let Value::Int(value) = source.get(field.name)? else {
                    panic!("field '{}' expects a signed value", field.name);
                };
                let raw = value - offset;
                if raw < 0 || (bits < 64 && (raw as u64) >> bits != 0) {
                    return Err(Error::OutOfRange { field: field.name, value });
                }
                w.put(field.name, bits, raw as u64)?;
            }
            Kind::Enum { bits, values } => {
                let Value::Label(label) = source.get(field.name)? else {
                    panic!("field '{}' expects a label", field.name);
                };
                match values.code(&label) {
                    Some(code) => w.put(field.name, bits, code)?,
                    None => return Err(Error::UnmappedLabel { field: field.name, label }),
                }
            }
            Kind::Seq { count, bits } => {
                let Value::Seq(elements) = source.get(field.name)? else {
                    panic!("field '{}' expects a sequence", field.name);
                };
                if elements.len() != count {
                    return Err(Error::SeqLength {
                        field: field.name,
                        expected: count,
                        actual: elements.len(),
                    });
                }
                for value in elements {
                    w.put(field.name, bits, value)?;
                }
            }
            Kind::Text { len } => {
                let Value::Text(text) = source.get(field.name)? else {
                    panic!("field '{}' expects text", field.name);
                };
                let bytes = text.as_bytes();
                if bytes.len() > len {
                    return Err(Error::TextLength {
                        field: field.name,
                        max: len,
                        actual: bytes.len(),
                    });
                }
                for i in 0..len {
                    w.put(field.name, 8, u64::from(*bytes.get(i).unwrap_or(&b' ')))?;
                }
            }
            Kind::Padding { bits } => {
                w.put(field.name, bits, 0)?;
            }
        }
        Ok(())
    }
}

/// A monotonically advancing bit cursor over a byte buffer.
/// The first declared field occupies the most significant bits of a byte.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bits not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    /// Current bit offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Reads `width` bits MSB-first, possibly crossing byte boundaries.
    pub fn take(&mut self, field: &'static str, width: u32) -> Result<u64, Error> {
        if width as usize > self.remaining() {
            return Err(Error::OutOfData {
                field,
                needed: width,
                available: self.remaining(),
            });
        }

        let mut out = 0u64;
        let mut left = width;
        while left > 0 {
            let byte = self.data[self.pos / 8];
            let avail = 8 - (self.pos % 8) as u32;
            let n = left.min(avail);
            let hi = avail as usize;
            let lo = hi - n as usize;
            let chunk = if n == 8 { byte } else { byte.bit_range(lo..hi) };
            out = (out << n) | u64::from(chunk);
            self.pos += n as usize;
            left -= n;
        }
        Ok(out)
    }
}

/// Growable byte buffer written through a bit cursor, MSB-first.
pub struct BitWriter {
    data: Vec<u8>,
    pos: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self { data: Vec::new(), pos: 0 }
    }

    /// Current bit offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Writes the low `width` bits of `value`, MSB-first.
    pub fn put(&mut self, field: &'static str, width: u32, value: u64) -> Result<(), Error> {
        if width < 64 && value >> width != 0 {
            return Err(Error::OutOfRange { field, value: value as i64 });
        }

        let mut left = width;
        while left > 0 {
            if self.pos / 8 == self.data.len() {
                self.data.push(0);
            }
            let avail = 8 - (self.pos % 8) as u32;
            let n = left.min(avail);
            let hi = avail as usize;
            let lo = hi - n as usize;
            let chunk = ((value >> (left - n)) & ((1u64 << n) - 1)) as u8;
            if n == 8 {
                self.data[self.pos / 8] = chunk;
            } else {
                self.data[self.pos / 8].set_bit_range(lo..hi, chunk);
            }
            self.pos += n as usize;
            left -= n;
        }
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        BitWriter::new()
    }
}

#[cfg(test)]
mod tests {
    // Note this useful idiom: importing names from outer (for mod tests) scope.
    use super::*;

    /// Order-preserving name/value record for exercising the engine.
    #[derive(Debug, Default)]
    struct MapRecord {
        values: Vec<(&'static str, Value)>,
        children: Vec<(&'static str, MapRecord)>,
    }

    impl MapRecord {
        fn value(&self, name: &str) -> &Value {
            &self.values.iter().find(|(n, _)| *n == name).unwrap().1
        }
    }

    impl RecordSink for MapRecord {
        fn set(&mut self, name: &'static str, value: Value) -> Result<(), Error> {
            self.values.push((name, value));
            Ok(())
        }

        fn child(&mut self, name: &'static str, _index: usize) -> Result<&mut dyn RecordSink, Error> {
            self.children.push((name, MapRecord::default()));
            Ok(&mut self.children.last_mut().unwrap().1)
        }
    }

    impl RecordSource for MapRecord {
        fn get(&self, name: &'static str) -> Result<Value, Error> {
            self.values.iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .ok_or(Error::UnknownField(name))
        }

        fn child(&self, name: &'static str, index: usize) -> Result<&dyn RecordSource, Error> {
            self.children.iter()
                .filter(|(n, _)| *n == name)
                .nth(index)
                .map(|(_, r)| r as &dyn RecordSource)
                .ok_or(Error::UnknownField(name))
        }
    }

    #[test]
    fn test_reader_is_msb_first() {
        let mut r = BitReader::new(&[0b1011_0110]);
        assert_eq!(r.take("a", 3).unwrap(), 0b101);
        assert_eq!(r.take("b", 5).unwrap(), 0b10110);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_reader_crosses_byte_boundary() {
        let mut r = BitReader::new(&[0xAB, 0xCD]);
        assert_eq!(r.take("a", 12).unwrap(), 0xABC);
        assert_eq!(r.take("b", 4).unwrap(), 0xD);
    }

    #[test]
    fn test_reader_big_endian_uint16() {
        let mut r = BitReader::new(&[0x01, 0x1B]);
        assert_eq!(r.take("byte_count", 16).unwrap(), 0x011B);
    }

    #[test]
    fn test_reader_out_of_data() {
        let mut r = BitReader::new(&[0xFF]);
        r.take("a", 6).unwrap();
        let err = r.take("b", 4).unwrap_err();
        assert_eq!(err, Error::OutOfData { field: "b", needed: 4, available: 2 });
    }

    #[test]
    fn test_writer_mirrors_reader() {
        let mut w = BitWriter::new();
        w.put("a", 3, 0b101).unwrap();
        w.put("b", 5, 0b10110).unwrap();
        assert_eq!(w.into_bytes(), vec![0b1011_0110]);
    }

    #[test]
    fn test_writer_rejects_oversized_value() {
        let mut w = BitWriter::new();
        let err = w.put("a", 3, 8).unwrap_err();
        assert_eq!(err, Error::OutOfRange { field: "a", value: 8 });
    }

    static DETUNE_TEST: Layout = Layout {
        name: "detune_test",
        items: &[
            LayoutItem::Scalar(FieldSpec::int("detune", 4, -7)),
            LayoutItem::Scalar(FieldSpec::padding(4)),
        ],
    };

    #[test]
    fn test_int_field_applies_offset() {
        let mut record = MapRecord::default();
        DETUNE_TEST.decode(&mut BitReader::new(&[0x00]), &mut record).unwrap();
        assert_eq!(*record.value("detune"), Value::Int(-7));
    }

    #[test]
    fn test_int_field_encodes_inverse_offset() {
        let mut record = MapRecord::default();
        record.set("detune", Value::Int(7)).unwrap();
        let mut w = BitWriter::new();
        DETUNE_TEST.encode(&mut w, &record).unwrap();
        // logical +7 is raw code 14 in the high nybble
        assert_eq!(w.into_bytes(), vec![0xE0]);
    }

    #[test]
    fn test_int_field_rejects_value_below_offset() {
        let mut record = MapRecord::default();
        record.set("detune", Value::Int(-8)).unwrap();
        let mut w = BitWriter::new();
        let err = DETUNE_TEST.encode(&mut w, &record).unwrap_err();
        assert_eq!(err, Error::OutOfRange { field: "detune", value: -8 });
    }

    static COLORS: EnumValues = EnumValues {
        entries: &[(&[0], "red"), (&[1, 2, 3], "green")],
    };

    static ENUM_TEST: Layout = Layout {
        name: "enum_test",
        items: &[LayoutItem::Scalar(FieldSpec::enumeration("color", 8, &COLORS))],
    };

    #[test]
    fn test_enum_aliases_share_label() {
        for code in 1..=3u8 {
            let mut record = MapRecord::default();
            ENUM_TEST.decode(&mut BitReader::new(&[code]), &mut record).unwrap();
            assert_eq!(*record.value("color"), Value::Label("green".to_string()));
        }
    }

    #[test]
    fn test_enum_encodes_canonical_code() {
        let mut record = MapRecord::default();
        record.set("color", Value::Label("green".to_string())).unwrap();
        let mut w = BitWriter::new();
        ENUM_TEST.encode(&mut w, &record).unwrap();
        assert_eq!(w.into_bytes(), vec![1]);
    }

    #[test]
    fn test_enum_unmapped_code_is_an_error() {
        let mut record = MapRecord::default();
        let err = ENUM_TEST.decode(&mut BitReader::new(&[9]), &mut record).unwrap_err();
        assert_eq!(err, Error::UnmappedCode { field: "color", code: 9 });
    }

    static TEXT_TEST: Layout = Layout {
        name: "text_test",
        items: &[LayoutItem::Scalar(FieldSpec::text("name", 10))],
    };

    #[test]
    fn test_text_pads_with_spaces() {
        let mut record = MapRecord::default();
        record.set("name", Value::Text("EPIANO".to_string())).unwrap();
        let mut w = BitWriter::new();
        TEXT_TEST.encode(&mut w, &record).unwrap();
        assert_eq!(w.into_bytes(), b"EPIANO    ".to_vec());
    }

    #[test]
    fn test_text_rejects_overlong_string() {
        let mut record = MapRecord::default();
        record.set("name", Value::Text("TOO LONG NAME".to_string())).unwrap();
        let mut w = BitWriter::new();
        let err = TEXT_TEST.encode(&mut w, &record).unwrap_err();
        assert_eq!(err, Error::TextLength { field: "name", max: 10, actual: 13 });
    }

    static SEQ_TEST: Layout = Layout {
        name: "seq_test",
        items: &[LayoutItem::Scalar(FieldSpec::seq("rates", 4, 8))],
    };

    #[test]
    fn test_seq_length_checked_on_encode() {
        let mut record = MapRecord::default();
        record.set("rates", Value::Seq(vec![99, 99])).unwrap();
        let mut w = BitWriter::new();
        let err = SEQ_TEST.encode(&mut w, &record).unwrap_err();
        assert_eq!(err, Error::SeqLength { field: "rates", expected: 4, actual: 2 });
    }

    static INNER_TEST: Layout = Layout {
        name: "inner_test",
        items: &[LayoutItem::Scalar(FieldSpec::uint("x", 8))],
    };

    static COND_TEST: Layout = Layout {
        name: "cond_test",
        items: &[
            LayoutItem::Scalar(FieldSpec::uint("format", 8)),
            LayoutItem::Conditional {
                discriminant: "format",
                arms: &[
                    Arm { value: 0, name: "one", count: 1, layout: &INNER_TEST },
                    Arm { value: 9, name: "many", count: 3, layout: &INNER_TEST },
                ],
            },
        ],
    };

    #[test]
    fn test_conditional_selects_arm_by_value() {
        let mut record = MapRecord::default();
        COND_TEST.decode(&mut BitReader::new(&[9, 1, 2, 3]), &mut record).unwrap();
        assert_eq!(record.children.len(), 3);
        assert_eq!(*record.children[2].1.value("x"), Value::Uint(3));
    }

    #[test]
    fn test_conditional_unknown_discriminant() {
        let mut record = MapRecord::default();
        let err = COND_TEST.decode(&mut BitReader::new(&[5, 1]), &mut record).unwrap_err();
        assert_eq!(err, Error::UnsupportedFormat(5));
    }

    #[test]
    fn test_bit_len_sums_fields() {
        assert_eq!(DETUNE_TEST.bit_len(), Some(8));
        assert_eq!(TEXT_TEST.bit_len(), Some(80));
        assert_eq!(SEQ_TEST.bit_len(), Some(32));
        assert_eq!(COND_TEST.bit_len(), None);
    }
}
