//! Fixed-width little-endian field encoding
//!
//! Record layouts are described as a static table of [`FieldSpec`] rows and
//! rendered by the single [`pack`] routine, so every field of every width goes
//! through the same path.

/// Integer that can be written as `WIDTH` little-endian bytes.
pub trait Scalar: Copy {
    const WIDTH: usize;

    fn put_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const WIDTH: usize = core::mem::size_of::<$ty>();

                fn put_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_scalar!(u8, i8, u16, i16, u32);

/// Encode `values` into exactly `T::WIDTH * values.len()` bytes.
pub fn encode<T: Scalar>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(T::WIDTH * values.len());
    put_all(values, &mut out);
    out
}

/// Append `values` to `out`, little-endian.
pub fn put_all<T: Scalar>(values: &[T], out: &mut Vec<u8>) {
    for value in values {
        value.put_le(out);
    }
}

/// Encode text one byte per character.
///
/// Each character's code point is truncated to its low byte; no terminator is
/// written.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars().map(|c| c as u32 as u8).collect()
}

/// Number of elements a field carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// Always `count` elements of `width` bytes
    Fixed(usize),
    /// Length decided by the value (trailing text)
    Variable,
}

/// One row of a layout schema.
pub struct FieldSpec<R> {
    pub name: &'static str,
    /// Bytes per element
    pub width: usize,
    pub extent: Extent,
    /// Appends the field's bytes for `R`
    pub emit: fn(&R, &mut Vec<u8>),
}

impl<R> FieldSpec<R> {
    /// Encoded size, if fixed.
    pub fn fixed_len(&self) -> Option<usize> {
        match self.extent {
            Extent::Fixed(count) => Some(self.width * count),
            Extent::Variable => None,
        }
    }
}

/// Render `source` by walking `schema` in order.
pub fn pack<R>(schema: &[FieldSpec<R>], source: &R) -> Vec<u8> {
    let mut out = Vec::with_capacity(fixed_size(schema));
    pack_into(schema, source, &mut out);
    out
}

/// Append `source` rendered by `schema` to `out`.
pub fn pack_into<R>(schema: &[FieldSpec<R>], source: &R, out: &mut Vec<u8>) {
    for field in schema {
        let start = out.len();
        (field.emit)(source, out);
        if let Some(expected) = field.fixed_len() {
            debug_assert_eq!(
                out.len() - start,
                expected,
                "field `{}` emitted the wrong number of bytes",
                field.name
            );
        }
    }
}

/// Sum of all fixed-extent field sizes in `schema`.
pub fn fixed_size<R>(schema: &[FieldSpec<R>]) -> usize {
    schema.iter().filter_map(FieldSpec::fixed_len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        a: u16,
        b: [u32; 2],
        c: [i8; 3],
        name: &'static str,
    }

    const SAMPLE_SCHEMA: &[FieldSpec<Sample>] = &[
        FieldSpec {
            name: "a",
            width: 2,
            extent: Extent::Fixed(1),
            emit: |s, out| s.a.put_le(out),
        },
        FieldSpec {
            name: "b",
            width: 4,
            extent: Extent::Fixed(2),
            emit: |s, out| put_all(&s.b, out),
        },
        FieldSpec {
            name: "c",
            width: 1,
            extent: Extent::Fixed(3),
            emit: |s, out| put_all(&s.c, out),
        },
        FieldSpec {
            name: "name",
            width: 1,
            extent: Extent::Variable,
            emit: |s, out| out.extend_from_slice(&encode_text(s.name)),
        },
    ];

    #[test]
    fn test_encode_widths() {
        assert_eq!(encode(&[0x1234u16]), vec![0x34, 0x12]);
        assert_eq!(encode(&[0x0102_0304u32]), vec![0x04, 0x03, 0x02, 0x01]);
        assert_eq!(encode(&[-1i8, 5]), vec![0xFF, 0x05]);
        assert_eq!(encode::<u32>(&[0; 5]).len(), 20);
    }

    #[test]
    fn test_encode_text_truncates_code_points() {
        assert_eq!(encode_text("Esp"), b"Esp".to_vec());
        // U+0141 keeps only its low byte
        assert_eq!(encode_text("\u{0141}"), vec![0x41]);
        assert!(encode_text("").is_empty());
    }

    #[test]
    fn test_pack_follows_schema_order() {
        let sample = Sample {
            a: 0xBEEF,
            b: [1, 0x8000_0000],
            c: [-40, 0, 50],
            name: "ab",
        };

        let bytes = pack(SAMPLE_SCHEMA, &sample);
        assert_eq!(
            bytes,
            vec![
                0xEF, 0xBE, // a
                0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, // b
                0xD8, 0x00, 0x32, // c
                b'a', b'b', // name
            ]
        );
    }

    #[test]
    fn test_fixed_size_ignores_variable_fields() {
        assert_eq!(fixed_size(SAMPLE_SCHEMA), 2 + 8 + 3);
    }
}
