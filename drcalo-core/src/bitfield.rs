//! Encoding-string bit-field coder.
//!
//! An encoding string describes the packed layout of a 64-bit identifier as
//! a comma-separated list of fields, each `name:width` (placed directly
//! after the previous field) or `name:offset:width` (placed explicitly).
//! The string is parsed once into a schema table; queries then resolve a
//! field name to a [`FieldHandle`] once and extract bits with plain
//! shift/mask operations, with no per-query string lookup.

use crate::{Error, Result};

/// Resolved position of one field inside the packed word.
///
/// Handles stay valid for the lifetime of the coder that produced them and
/// are cheap to copy around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHandle {
    offset: u8,
    width: u8,
}

impl FieldHandle {
    /// Bit offset of the field (least significant bit).
    #[inline]
    pub fn offset(&self) -> u8 {
        self.offset
    }

    /// Width of the field in bits.
    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Maximum value representable in this field.
    #[inline]
    pub fn max_value(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Extracts this field from a packed word.
    #[inline]
    pub fn get(&self, word: u64) -> u64 {
        (word >> self.offset) & self.max_value()
    }

    /// Returns `word` with this field replaced by `value`.
    ///
    /// The caller is responsible for range-checking `value`; use
    /// [`BitFieldCoder::set`] for the checked form. Out-of-range bits are
    /// masked off here to keep neighbouring fields intact.
    #[inline]
    pub fn put(&self, word: u64, value: u64) -> u64 {
        let mask = self.max_value() << self.offset;
        (word & !mask) | ((value << self.offset) & mask)
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    handle: FieldHandle,
}

/// Schema table mapping field names to bit ranges of a 64-bit word.
#[derive(Debug, Clone)]
pub struct BitFieldCoder {
    descriptor: String,
    fields: Vec<Field>,
}

impl BitFieldCoder {
    /// Parses an encoding string into a coder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] on malformed field entries,
    /// duplicate names, zero widths, fields extending past bit 63, or
    /// overlapping bit ranges.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut fields: Vec<Field> = Vec::new();
        let mut next_offset: u32 = 0;

        for entry in descriptor.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(Error::InvalidEncoding(format!(
                    "empty field entry in '{descriptor}'"
                )));
            }
            let parts: Vec<&str> = entry.split(':').collect();
            let (name, offset, width) = match parts.as_slice() {
                [name, width] => (*name, next_offset, parse_number(entry, width)?),
                [name, offset, width] => (
                    *name,
                    parse_number(entry, offset)?,
                    parse_number(entry, width)?,
                ),
                _ => {
                    return Err(Error::InvalidEncoding(format!(
                        "expected 'name:width' or 'name:offset:width', got '{entry}'"
                    )))
                }
            };

            if name.is_empty() {
                return Err(Error::InvalidEncoding(format!(
                    "missing field name in '{entry}'"
                )));
            }
            if width == 0 || width > 64 {
                return Err(Error::InvalidEncoding(format!(
                    "field '{name}' has invalid width {width}"
                )));
            }
            if offset + width > 64 {
                return Err(Error::InvalidEncoding(format!(
                    "field '{name}' extends past bit 63"
                )));
            }
            if fields.iter().any(|f| f.name == name) {
                return Err(Error::InvalidEncoding(format!(
                    "duplicate field name '{name}'"
                )));
            }
            let lo = offset;
            let hi = offset + width;
            for f in &fields {
                let flo = u32::from(f.handle.offset);
                let fhi = flo + u32::from(f.handle.width);
                if lo < fhi && flo < hi {
                    return Err(Error::InvalidEncoding(format!(
                        "field '{name}' overlaps field '{}'",
                        f.name
                    )));
                }
            }

            fields.push(Field {
                name: name.to_owned(),
                handle: FieldHandle {
                    offset: offset as u8,
                    width: width as u8,
                },
            });
            next_offset = hi;
        }

        if fields.is_empty() {
            return Err(Error::InvalidEncoding("no fields defined".to_owned()));
        }

        Ok(Self {
            descriptor: descriptor.to_owned(),
            fields,
        })
    }

    /// Returns the encoding string this coder was parsed from.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Resolves a field name to its handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if no field has that name.
    pub fn handle(&self, name: &str) -> Result<FieldHandle> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.handle)
            .ok_or_else(|| Error::UnknownField(name.to_owned()))
    }

    /// Extracts a named field from a packed word.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if no field has that name.
    pub fn get(&self, word: u64, name: &str) -> Result<u64> {
        Ok(self.handle(name)?.get(word))
    }

    /// Returns `word` with a named field replaced by `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] for an unknown name and
    /// [`Error::FieldOverflow`] if `value` does not fit the field width.
    pub fn set(&self, word: u64, name: &str, value: u64) -> Result<u64> {
        let handle = self.handle(name)?;
        if value > handle.max_value() {
            return Err(Error::FieldOverflow {
                field: name.to_owned(),
                value,
                width: handle.width,
            });
        }
        Ok(handle.put(word, value))
    }

    /// Returns the field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

fn parse_number(entry: &str, text: &str) -> Result<u32> {
    text.trim().parse::<u32>().map_err(|_| {
        Error::InvalidEncoding(format!("invalid number '{text}' in '{entry}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sequential_offsets() {
        let coder = BitFieldCoder::parse("a:4,b:8,c:4").unwrap();
        assert_eq!(coder.handle("a").unwrap().offset(), 0);
        assert_eq!(coder.handle("b").unwrap().offset(), 4);
        assert_eq!(coder.handle("c").unwrap().offset(), 12);
    }

    #[test]
    fn test_parse_explicit_offsets() {
        let coder = BitFieldCoder::parse("lo:8,hi:32:8").unwrap();
        let hi = coder.handle("hi").unwrap();
        assert_eq!(hi.offset(), 32);
        assert_eq!(hi.width(), 8);
        assert_eq!(hi.max_value(), 0xFF);
    }

    #[test]
    fn test_get_put_roundtrip() {
        let coder = BitFieldCoder::parse("a:4,b:8,c:52").unwrap();
        let mut word = 0u64;
        word = coder.set(word, "a", 0xF).unwrap();
        word = coder.set(word, "b", 0xA5).unwrap();
        word = coder.set(word, "c", 0xFFFF_FFFF).unwrap();
        assert_eq!(coder.get(word, "a").unwrap(), 0xF);
        assert_eq!(coder.get(word, "b").unwrap(), 0xA5);
        assert_eq!(coder.get(word, "c").unwrap(), 0xFFFF_FFFF);

        // overwriting a field leaves its neighbours intact
        word = coder.set(word, "b", 0).unwrap();
        assert_eq!(coder.get(word, "a").unwrap(), 0xF);
        assert_eq!(coder.get(word, "c").unwrap(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let coder = BitFieldCoder::parse("a:4").unwrap();
        let err = coder.set(0, "a", 16).unwrap_err();
        assert!(matches!(err, Error::FieldOverflow { .. }));
    }

    #[test]
    fn test_unknown_field() {
        let coder = BitFieldCoder::parse("a:4").unwrap();
        assert!(matches!(
            coder.get(0, "nope").unwrap_err(),
            Error::UnknownField(_)
        ));
    }

    #[test]
    fn test_malformed_strings() {
        for bad in [
            "",
            "a",
            "a:0",
            "a:65",
            "a:4,a:4",
            "a:60:8",
            "a:8,b:4:8",
            "a:x",
            "a:1:2:3",
        ] {
            assert!(
                matches!(
                    BitFieldCoder::parse(bad),
                    Err(Error::InvalidEncoding(_))
                ),
                "'{bad}' should not parse"
            );
        }
    }
}
