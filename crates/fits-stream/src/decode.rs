//! Streaming FITS deserializer.
//!
//! [`decode`] wraps any [`Read`] in a [`Decoder`], an iterator that decodes
//! one header-data unit per call to `next`. Nothing is read ahead, so a
//! caller may stop after the primary unit of a very large file without
//! touching the rest of it.
//!
//! Every unit consists of a header region (80-byte cards up to and
//! including `END`, padded to a 2880-byte block) followed by `GCOUNT`
//! payload groups. Each group is `NAXIS1 * ... * NAXISn` big-endian
//! elements followed by `PCOUNT` elements of heap, the pair padded together
//! to the next block boundary.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;

use tracing::{debug, trace};

use crate::array::{element_count, ArrayData, DataArray, ElementType};
use crate::block::{padding_len, CARD_SIZE};
use crate::endian::decode_be;
use crate::error::{Error, Result};
use crate::header::{parse_card, Header};
use crate::unit::{Unit, UnitKind};

/// Keyword that must open the primary header.
const PRIMARY_MARKER: &str = "SIMPLE";

/// Decode a FITS stream lazily.
///
/// The first item is either the primary unit or the error explaining why the
/// stream is not FITS. After any error the iterator is exhausted.
pub fn decode<R: Read>(reader: R) -> Decoder<R> {
    Decoder::new(reader)
}

/// Decode every unit of an in-memory FITS buffer.
pub fn decode_bytes(data: &[u8]) -> Result<Vec<Unit>> {
    decode(data).collect()
}

/// Open `path` and decode all of its units.
///
/// The file is closed before this returns, whether decoding succeeded or not.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn decode_file(path: impl AsRef<Path>) -> Result<Vec<Unit>> {
    let file = File::open(path.as_ref())?;
    decode(BufReader::new(file)).collect()
}

/// Pull-based iterator over the units of a FITS stream.
#[derive(Debug)]
pub struct Decoder<R> {
    reader: R,
    units_read: usize,
    finished: bool,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Decoder {
            reader,
            units_read: 0,
            finished: false,
        }
    }

    /// Number of units yielded so far.
    pub fn units_read(&self) -> usize {
        self.units_read
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn next_unit(&mut self) -> Result<Option<Unit>> {
        let is_primary = self.units_read == 0;

        let first_card = match read_card_or_eof(&mut self.reader)? {
            Some(card) => card,
            None if is_primary => return Err(Error::InvalidHeader("stream has no primary unit")),
            None => return Ok(None),
        };

        let header = self.read_header(first_card, is_primary)?;

        let kind = if is_primary {
            UnitKind::Primary
        } else {
            header
                .get("XTENSION")
                .map(|v| UnitKind::from_xtension(v.value()))
                .unwrap_or(UnitKind::Unknown)
        };

        let groups = self.read_groups(&header, kind)?;
        Ok(Some(Unit::new(header, kind, groups)))
    }

    /// Read cards up to `END`, then skip the rest of the final header block.
    fn read_header(&mut self, first_card: [u8; CARD_SIZE], is_primary: bool) -> Result<Header> {
        let mut header = Header::new();
        let mut card_bytes = first_card;
        let mut header_len = 0usize;

        loop {
            let card = parse_card(&card_bytes);
            if is_primary && header_len == 0 && card.keyword != PRIMARY_MARKER {
                return Err(Error::MissingKeyword("SIMPLE"));
            }
            header_len += CARD_SIZE;

            if card.is_end() {
                break;
            }
            trace!(keyword = %card.keyword, value = card.value.value(), "header card");
            header.insert(card.keyword, card.value);

            self.reader.read_exact(&mut card_bytes)?;
        }

        let padding = padding_len(header_len);
        trace!(header_len, padding, "skipping header padding");
        skip_bytes(&mut self.reader, padding)?;
        Ok(header)
    }

    fn read_groups(&mut self, header: &Header, kind: UnitKind) -> Result<Vec<ArrayData>> {
        let bitpix = header.integer_or("BITPIX", 8)?;
        let element_type = ElementType::from_bitpix(bitpix)?;
        let width = element_type.byte_width();

        let naxis = header.count_or("NAXIS", 0)?;
        let pcount = header.count_or("PCOUNT", 0)?;
        let gcount = header.count_or("GCOUNT", 1)?;

        if naxis == 0 {
            debug!(unit = self.units_read, %kind, bitpix, "unit has no payload");
            return Ok(Vec::new());
        }

        let mut extents = Vec::with_capacity(naxis);
        for axis in 1..=naxis {
            let mut extent = header.count_or(&format!("NAXIS{axis}"), 0)?;
            // Binary tables declare NAXIS1 in bytes per row.
            if kind == UnitKind::BinaryTable && axis == 1 {
                extent = extent.div_ceil(width);
            }
            extents.push(extent);
        }

        let overflow = || Error::InvalidValue {
            keyword: "NAXIS".into(),
            value: format!("{extents:?}"),
        };
        let data_len = element_count(&extents)
            .and_then(|n| n.checked_mul(width))
            .ok_or_else(overflow)?;
        let heap_len = pcount
            .checked_mul(width)
            .ok_or_else(|| Error::InvalidValue {
                keyword: "PCOUNT".into(),
                value: pcount.to_string(),
            })?;
        let group_len = data_len.checked_add(heap_len).ok_or_else(overflow)?;

        debug!(
            unit = self.units_read,
            %kind,
            bitpix,
            shape = ?extents,
            gcount,
            pcount,
            "decoding payload"
        );

        let mut groups = Vec::new();
        for group in 0..gcount {
            let data = read_array(&mut self.reader, element_type, &extents, data_len)?;
            // The heap is opaque: read and discard.
            skip_bytes(&mut self.reader, heap_len)?;
            let padding = padding_len(group_len);
            trace!(group, data_len, heap_len, padding, "skipping group heap and padding");
            skip_bytes(&mut self.reader, padding)?;
            groups.push(data);
        }
        Ok(groups)
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<Unit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_unit() {
            Ok(Some(unit)) => {
                debug!(
                    unit = self.units_read,
                    kind = %unit.kind(),
                    keywords = unit.header().len(),
                    groups = unit.groups().len(),
                    "decoded unit"
                );
                self.units_read += 1;
                Some(Ok(unit))
            }
            Ok(None) => {
                debug!(units = self.units_read, "end of stream");
                self.finished = true;
                None
            }
            Err(e) => {
                debug!(unit = self.units_read, error = %e, "decode failed");
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> FusedIterator for Decoder<R> {}

/// Read one card, returning `None` on a clean end of stream.
///
/// A stream ending partway through a card is truncated.
fn read_card_or_eof<R: Read>(reader: &mut R) -> Result<Option<[u8; CARD_SIZE]>> {
    let mut card = [0u8; CARD_SIZE];
    let mut filled = 0;
    while filled < CARD_SIZE {
        match reader.read(&mut card[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(None),
        CARD_SIZE => Ok(Some(card)),
        _ => Err(Error::UnexpectedEof),
    }
}

/// Consume exactly `len` bytes.
fn skip_bytes<R: Read>(reader: &mut R, len: usize) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    let skipped = io::copy(&mut reader.by_ref().take(len as u64), &mut io::sink())?;
    if skipped < len as u64 {
        return Err(Error::UnexpectedEof);
    }
    Ok(())
}

/// Read one payload group of `byte_len` bytes and decode it.
fn read_array<R: Read>(
    reader: &mut R,
    element_type: ElementType,
    extents: &[usize],
    byte_len: usize,
) -> Result<ArrayData> {
    // Grow incrementally rather than trusting the header with one allocation.
    let mut raw = Vec::new();
    reader.by_ref().take(byte_len as u64).read_to_end(&mut raw)?;
    if raw.len() < byte_len {
        return Err(Error::UnexpectedEof);
    }

    let extents = extents.to_vec();
    let data = match element_type {
        ElementType::U8 => ArrayData::U8(DataArray::from_vec(extents, raw)?),
        ElementType::I16 => ArrayData::I16(DataArray::from_vec(extents, decode_be(&raw))?),
        ElementType::I32 => ArrayData::I32(DataArray::from_vec(extents, decode_be(&raw))?),
        ElementType::I64 => ArrayData::I64(DataArray::from_vec(extents, decode_be(&raw))?),
        ElementType::F32 => ArrayData::F32(DataArray::from_vec(extents, decode_be(&raw))?),
        ElementType::F64 => ArrayData::F64(DataArray::from_vec(extents, decode_be(&raw))?),
    };
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLOCK_SIZE;
    use std::io::Cursor;

    fn make_card(s: &str) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        let bytes = s.as_bytes();
        let len = bytes.len().min(CARD_SIZE);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Header cards plus END, padded with spaces to a whole block.
    fn header_bytes(cards: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for c in cards.iter().chain(core::iter::once(&"END")) {
            out.extend_from_slice(&make_card(c));
        }
        out.resize(out.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, b' ');
        out
    }

    fn padded(mut data: Vec<u8>) -> Vec<u8> {
        data.resize(data.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);
        data
    }

    fn primary_2x2_u8() -> Vec<u8> {
        let mut out = header_bytes(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    2",
            "NAXIS1  =                    2",
            "NAXIS2  =                    2",
        ]);
        out.extend(padded(vec![10, 20, 30, 40]));
        out
    }

    #[test]
    fn minimal_primary_unit() {
        let units = decode_bytes(&primary_2x2_u8()).unwrap();
        assert_eq!(units.len(), 1);
        let unit = &units[0];
        assert_eq!(unit.kind(), UnitKind::Primary);
        assert_eq!(unit.groups().len(), 1);
        match unit.data().unwrap() {
            ArrayData::U8(arr) => {
                assert_eq!(arr.extents(), &[2, 2]);
                assert_eq!(arr.as_slice(), &[10, 20, 30, 40]);
                assert_eq!(arr[&[1, 0][..]], 20);
                assert_eq!(arr[&[0, 1][..]], 30);
            }
            other => panic!("expected U8 data, got {other:?}"),
        }
    }

    #[test]
    fn end_card_is_not_stored() {
        let units = decode_bytes(&primary_2x2_u8()).unwrap();
        let header = units[0].header();
        assert!(!header.contains_key("END"));
        let keys: Vec<&str> = header.keywords().collect();
        assert_eq!(keys, ["SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2"]);
    }

    #[test]
    fn empty_stream_is_format_error() {
        let mut decoder = decode(&[0u8; 0][..]);
        let first = decoder.next().unwrap();
        assert!(matches!(first, Err(Error::InvalidHeader(_))));
        assert!(first.unwrap_err().is_format());
        assert!(decoder.next().is_none());
        assert_eq!(decoder.units_read(), 0);
    }

    #[test]
    fn missing_simple_is_format_error() {
        let data = header_bytes(&["BITPIX  =                    8", "NAXIS   =                    0"]);
        let err = decode_bytes(&data).unwrap_err();
        assert!(matches!(err, Error::MissingKeyword("SIMPLE")));
    }

    #[test]
    fn invalid_bitpix_is_format_error() {
        let data = header_bytes(&[
            "SIMPLE  =                    T",
            "BITPIX  =                   24",
            "NAXIS   =                    1",
            "NAXIS1  =                    1",
        ]);
        assert!(matches!(
            decode_bytes(&data),
            Err(Error::InvalidBitpix(24))
        ));
    }

    #[test]
    fn non_integer_naxis_is_format_error() {
        let data = header_bytes(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                  two",
        ]);
        let err = decode_bytes(&data).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref keyword, .. } if keyword == "NAXIS"));
    }

    #[test]
    fn truncated_header_is_eof() {
        let data = header_bytes(&["SIMPLE  =                    T"]);
        assert!(matches!(
            decode_bytes(&data[..160]),
            Err(Error::UnexpectedEof)
        ));
        assert!(matches!(
            decode_bytes(&data[..40]),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn truncated_payload_is_eof() {
        let data = primary_2x2_u8();
        assert!(matches!(
            decode_bytes(&data[..BLOCK_SIZE + 3]),
            Err(Error::UnexpectedEof)
        ));
        // Missing trailing padding is also a truncation.
        assert!(matches!(
            decode_bytes(&data[..BLOCK_SIZE + 4]),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn defaults_when_keywords_absent() {
        // No BITPIX (defaults to 8) and no NAXIS (defaults to 0).
        let data = header_bytes(&["SIMPLE  =                    T"]);
        let units = decode_bytes(&data).unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].groups().is_empty());
    }

    #[test]
    fn pull_based_stops_after_first_unit() {
        let mut data = primary_2x2_u8();
        data.extend_from_slice(b"this is not a FITS header and would fail to decode");
        let mut decoder = decode(Cursor::new(data));
        let primary = decoder.next().unwrap().unwrap();
        assert_eq!(primary.kind(), UnitKind::Primary);
        assert_eq!(decoder.get_ref().position(), 2 * BLOCK_SIZE as u64);
        assert_eq!(decoder.units_read(), 1);
    }

    #[test]
    fn repeated_groups_are_block_aligned() {
        let mut data = header_bytes(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
        ]);
        data.extend(header_bytes(&[
            "XTENSION= 'IMAGE   '",
            "BITPIX  =                   16",
            "NAXIS   =                    1",
            "NAXIS1  =                    3",
            "PCOUNT  =                    2",
            "GCOUNT  =                    3",
        ]));
        for g in 0..3i16 {
            let mut group = Vec::new();
            for v in [g, g * 10, -g] {
                group.extend_from_slice(&v.to_be_bytes());
            }
            // Two heap elements of garbage, discarded by the decoder.
            group.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
            data.extend(padded(group));
        }

        let mut decoder = decode(Cursor::new(data));
        decoder.next().unwrap().unwrap();
        assert_eq!(decoder.get_ref().position(), BLOCK_SIZE as u64);

        let ext = decoder.next().unwrap().unwrap();
        assert_eq!(decoder.get_ref().position(), 5 * BLOCK_SIZE as u64);
        assert_eq!(ext.kind(), UnitKind::Image);
        assert_eq!(ext.groups().len(), 3);
        for (g, group) in ext.groups().iter().enumerate() {
            let g = g as i16;
            match group {
                ArrayData::I16(arr) => {
                    assert_eq!(arr.extents(), &[3]);
                    assert_eq!(arr.as_slice(), &[g, g * 10, -g]);
                }
                other => panic!("expected I16 data, got {other:?}"),
            }
        }
        assert!(decoder.next().is_none());
    }

    #[test]
    fn error_after_yielded_unit_keeps_earlier_unit() {
        let mut data = primary_2x2_u8();
        data.extend(header_bytes(&[
            "XTENSION= 'IMAGE   '",
            "BITPIX  =                   32",
            "NAXIS   =                    1",
            "NAXIS1  =                   10",
        ]));
        data.extend_from_slice(&[0u8; 8]);

        let mut decoder = decode(&data[..]);
        let primary = decoder.next().unwrap().unwrap();
        assert!(matches!(decoder.next(), Some(Err(Error::UnexpectedEof))));
        assert!(decoder.next().is_none());
        assert_eq!(primary.data().unwrap().len(), 4);
    }
}
