//! Minimal NumPy `.npy` codec for floating-point arrays.
//!
//! Writes version 1.0 files with a little-endian `<f8` payload in C
//! order, matching what `numpy.save` produces for float64 arrays. The
//! reader also accepts version 2.0/3.0 headers, `f4` payloads,
//! big-endian data and Fortran-ordered 2-D arrays.

use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Header plus preamble length is padded to a multiple of this.
const HEADER_ALIGN: usize = 64;

/// Errors decoding or encoding `.npy` data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NpyError {
    #[error("missing .npy magic string")]
    BadMagic,
    #[error("unsupported .npy format version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },
    #[error("file truncated")]
    Truncated,
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("unsupported dtype {0}")]
    UnsupportedDtype(String),
    #[error("payload holds {found} bytes, shape requires {expected}")]
    PayloadSize { expected: usize, found: usize },
    #[error("fortran order is only supported up to 2 dimensions")]
    UnsupportedOrder,
}

/// A decoded array: shape plus row-major values.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    F4Le,
    F4Be,
    F8Le,
    F8Be,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self, NpyError> {
        match descr {
            "<f8" | "=f8" | "f8" => Ok(Dtype::F8Le),
            ">f8" => Ok(Dtype::F8Be),
            "<f4" | "=f4" | "f4" => Ok(Dtype::F4Le),
            ">f4" => Ok(Dtype::F4Be),
            other => Err(NpyError::UnsupportedDtype(other.to_string())),
        }
    }

    fn item_size(self) -> usize {
        match self {
            Dtype::F4Le | Dtype::F4Be => 4,
            Dtype::F8Le | Dtype::F8Be => 8,
        }
    }

    fn read(self, bytes: &[u8]) -> f64 {
        match self {
            Dtype::F8Le => f64::from_le_bytes(bytes.try_into().unwrap_or([0; 8])),
            Dtype::F8Be => f64::from_be_bytes(bytes.try_into().unwrap_or([0; 8])),
            Dtype::F4Le => f32::from_le_bytes(bytes.try_into().unwrap_or([0; 4])) as f64,
            Dtype::F4Be => f32::from_be_bytes(bytes.try_into().unwrap_or([0; 4])) as f64,
        }
    }
}

/// Encodes `data` with the given shape as a float64 `.npy` file.
///
/// `data.len()` must equal the product of `shape`; callers hold that
/// invariant through [`Sequence`](crate::sequence::Sequence).
pub fn encode(shape: &[usize], data: &[f64]) -> Vec<u8> {
    let dims = match shape {
        [single] => format!("({},)", single),
        _ => format!(
            "({})",
            shape
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': {}, }}",
        dims
    );

    // magic(6) + version(2) + length(2) + header + '\n'
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(unpadded + padding + data.len() * 8);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Decodes a `.npy` file into an [`NpyArray`].
pub fn decode(bytes: &[u8]) -> Result<NpyArray, NpyError> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(NpyError::BadMagic);
    }

    let (major, minor) = (bytes[6], bytes[7]);
    let (header_len, header_start) = match major {
        1 => {
            let raw = bytes.get(8..10).ok_or(NpyError::Truncated)?;
            (u16::from_le_bytes([raw[0], raw[1]]) as usize, 10)
        }
        2 | 3 => {
            let raw = bytes.get(8..12).ok_or(NpyError::Truncated)?;
            (
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize,
                12,
            )
        }
        _ => return Err(NpyError::UnsupportedVersion { major, minor }),
    };

    let header_end = header_start + header_len;
    let header = bytes
        .get(header_start..header_end)
        .ok_or(NpyError::Truncated)?;
    let header = std::str::from_utf8(header)
        .map_err(|_| NpyError::MalformedHeader("header is not valid text".into()))?;

    let dtype = Dtype::parse(&quoted_value(header, "descr")?)?;
    let fortran_order = bool_value(header, "fortran_order")?;
    let shape = shape_value(header)?;

    let expected = shape
        .iter()
        .try_fold(dtype.item_size(), |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| NpyError::MalformedHeader(format!("shape {:?} overflows", shape)))?;
    let payload = &bytes[header_end..];
    if payload.len() != expected {
        return Err(NpyError::PayloadSize {
            expected,
            found: payload.len(),
        });
    }

    let values: Vec<f64> = payload
        .chunks_exact(dtype.item_size())
        .map(|chunk| dtype.read(chunk))
        .collect();

    let data = if fortran_order && shape.len() == 2 {
        let (rows, cols) = (shape[0], shape[1]);
        let mut row_major = vec![0.0; values.len()];
        for r in 0..rows {
            for c in 0..cols {
                row_major[r * cols + c] = values[c * rows + r];
            }
        }
        row_major
    } else if fortran_order && shape.len() > 2 {
        return Err(NpyError::UnsupportedOrder);
    } else {
        values
    };

    Ok(NpyArray { shape, data })
}

/// Returns the raw text following `'key':` in the header dict.
fn raw_value<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let needle = format!("'{}'", key);
    let start = header
        .find(&needle)
        .ok_or_else(|| NpyError::MalformedHeader(format!("missing key {}", key)))?;
    let rest = &header[start + needle.len()..];
    let rest = rest
        .trim_start()
        .strip_prefix(':')
        .ok_or_else(|| NpyError::MalformedHeader(format!("no value for {}", key)))?;
    Ok(rest.trim_start())
}

fn quoted_value(header: &str, key: &str) -> Result<String, NpyError> {
    let rest = raw_value(header, key)?;
    let quote = rest
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| NpyError::MalformedHeader(format!("{} is not a string", key)))?;
    let body = &rest[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| NpyError::MalformedHeader(format!("unterminated {}", key)))?;
    Ok(body[..end].to_string())
}

fn bool_value(header: &str, key: &str) -> Result<bool, NpyError> {
    let rest = raw_value(header, key)?;
    if rest.starts_with("True") {
        Ok(true)
    } else if rest.starts_with("False") {
        Ok(false)
    } else {
        Err(NpyError::MalformedHeader(format!("{} is not a bool", key)))
    }
}

fn shape_value(header: &str) -> Result<Vec<usize>, NpyError> {
    let rest = raw_value(header, "shape")?;
    let inner = rest
        .strip_prefix('(')
        .and_then(|r| r.find(')').map(|end| &r[..end]))
        .ok_or_else(|| NpyError::MalformedHeader("shape is not a tuple".into()))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| NpyError::MalformedHeader(format!("bad dimension {}", part)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_text(bytes: &[u8]) -> &str {
        let len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        std::str::from_utf8(&bytes[10..10 + len]).unwrap()
    }

    #[test]
    fn test_encode_matches_numpy_header() {
        let bytes = encode(&[2, 3], &[0.0; 6]);
        let header = header_text(&bytes);

        assert!(header.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (2, 3), }"));
        assert!(header.ends_with('\n'));
        assert_eq!((10 + header.len()) % 64, 0);
        assert_eq!(bytes.len(), 10 + header.len() + 6 * 8);
    }

    #[test]
    fn test_one_dimensional_shape_has_trailing_comma() {
        let bytes = encode(&[63], &[0.0; 63]);
        assert!(header_text(&bytes).contains("'shape': (63,)"));

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.shape, vec![63]);
    }

    #[test]
    fn test_decode_preserves_bits() {
        let data = vec![0.1, -2.5e-7, f64::MIN_POSITIVE, 1.0 / 3.0, 0.0, -0.0];
        let decoded = decode(&encode(&[3, 2], &data)).unwrap();

        assert_eq!(decoded.shape, vec![3, 2]);
        let original: Vec<u64> = data.iter().map(|v| v.to_bits()).collect();
        let roundtrip: Vec<u64> = decoded.data.iter().map(|v| v.to_bits()).collect();
        assert_eq!(original, roundtrip);
    }

    fn raw_npy(header: &str, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&((header.len() + 1) as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.push(b'\n');
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_decode_float32_payload() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&0.5f32.to_le_bytes());
        payload.extend_from_slice(&(-1.25f32).to_le_bytes());
        let bytes = raw_npy(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (2,), }",
            &payload,
        );

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.data, vec![0.5, -1.25]);
    }

    #[test]
    fn test_decode_fortran_order_transposes() {
        // column-major storage of [[1, 2, 3], [4, 5, 6]]
        let payload: Vec<u8> = [1.0f64, 4.0, 2.0, 5.0, 3.0, 6.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let bytes = raw_npy(
            "{'descr': '<f8', 'fortran_order': True, 'shape': (2, 3), }",
            &payload,
        );

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_integer_dtype_rejected() {
        let bytes = raw_npy(
            "{'descr': '<i8', 'fortran_order': False, 'shape': (1,), }",
            &1i64.to_le_bytes(),
        );
        assert!(matches!(
            decode(&bytes),
            Err(NpyError::UnsupportedDtype(_))
        ));
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        let bytes = raw_npy(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (4611686018427387904, 8), }",
            &[0u8; 16],
        );
        assert!(matches!(
            decode(&bytes),
            Err(NpyError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let mut bytes = encode(&[4], &[1.0, 2.0, 3.0, 4.0]);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(decode(&bytes), Err(NpyError::PayloadSize { .. })));
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(decode(b"not an array"), Err(NpyError::BadMagic));
    }
}
