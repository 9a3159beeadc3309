//
// Copyright 2024 The Timesignature Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Presentation encodings for fingerprints and publication strings.
//!
//! Publication strings and key fingerprints are base32 with `=` padding
//! to 40-bit blocks and optional dash grouping, so people can read them
//! from paper. A CRC32 trailer is appended before encoding so a typo in
//! a hand-copied string is caught before any cryptography runs.

use der::asn1::OctetString;

use crate::asn1::{int_to_u64, u64_to_int, PublishedData};
use crate::errors::{Result, TimeSignatureError};
use crate::hash::{check_data_imprint, HashAlgorithm};

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Group size used for publication strings and key fingerprints.
pub(crate) const PUBLICATION_GROUP_LEN: usize = 6;

/// Group size used for base32 certificate dumps.
pub(crate) const CERTIFICATE_GROUP_LEN: usize = 8;

fn read_symbol(data: &[u8], bit_pos: usize) -> u8 {
    let byte = bit_pos / 8;
    let offset = bit_pos % 8;
    let take = (8 - offset).min(5);
    let shift = 8 - offset - take;
    let mut value = (data[byte] >> shift) & ((1u8 << take) - 1);
    if take < 5 {
        let rest = 5 - take;
        value <<= rest;
        if byte + 1 < data.len() {
            value |= data[byte + 1] >> (8 - rest);
        }
    }
    value
}

/// Encodes `data` in base32, padded with `=` to a 40-bit boundary.
/// A dash is inserted after every `group_len` symbols; pass 0 for an
/// ungrouped string.
pub fn base32_encode(data: &[u8], group_len: usize) -> String {
    let total_bits = data.len() * 8;
    let mut out = String::new();
    let mut bits_read = 0;
    while bits_read < total_bits {
        out.push(BASE32_ALPHABET[read_symbol(data, bits_read) as usize] as char);
        if group_len > 0
            && out.len() % (group_len + 1) == group_len
            && bits_read + 5 < total_bits
        {
            out.push('-');
        }
        bits_read += 5;
    }
    while bits_read % 40 != 0 {
        out.push('=');
        if group_len > 0 && out.len() % (group_len + 1) == group_len && bits_read % 40 != 35 {
            out.push('-');
        }
        bits_read += 5;
    }
    out
}

/// Decodes a base32 string. Case-insensitive; separators and other
/// non-alphabet characters are skipped, decoding stops at the first `=`,
/// and trailing bits that do not fill a byte are dropped.
pub fn base32_decode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8 + 1);
    let mut acc: u32 = 0;
    let mut acc_bits = 0u32;
    for c in text.bytes() {
        let value = match c {
            b'=' => break,
            b'2'..=b'7' => (c - b'2' + 26) as u32,
            b'A'..=b'Z' => (c - b'A') as u32,
            b'a'..=b'z' => (c - b'a') as u32,
            _ => continue,
        };
        acc = acc << 5 | value;
        acc_bits += 5;
        if acc_bits >= 8 {
            acc_bits -= 8;
            out.push((acc >> acc_bits) as u8);
        }
    }
    out
}

/// Formats bytes as colon-separated lowercase hex pairs.
pub(crate) fn hex_colon(data: &[u8]) -> String {
    data.iter()
        .map(|b| hex::encode([*b]))
        .collect::<Vec<_>>()
        .join(":")
}

/// Renders published data as a human-readable publication string:
/// base32 over `identifier (8 bytes) || imprint || crc32 (4 bytes)`.
pub fn published_data_to_base32(published_data: &PublishedData) -> Result<String> {
    check_data_imprint(published_data.publication_imprint.as_bytes())?;
    let identifier = int_to_u64(&published_data.publication_identifier)?;
    let imprint = published_data.publication_imprint.as_bytes();
    let mut raw = Vec::with_capacity(8 + imprint.len() + 4);
    raw.extend_from_slice(&identifier.to_be_bytes());
    raw.extend_from_slice(imprint);
    let crc = crc32fast::hash(&raw);
    raw.extend_from_slice(&crc.to_be_bytes());
    Ok(base32_encode(&raw, PUBLICATION_GROUP_LEN))
}

/// Parses a publication string back into published data, verifying the
/// CRC32 trailer and the imprint layout.
pub fn base32_to_published_data(publication: &str) -> Result<PublishedData> {
    let raw = base32_decode(publication);
    if raw.len() < 13 {
        return Err(TimeSignatureError::InvalidFormat(
            "publication string is too short".into(),
        ));
    }
    let (body, crc_bytes) = raw.split_at(raw.len() - 4);
    let mut crc = [0u8; 4];
    crc.copy_from_slice(crc_bytes);
    if crc32fast::hash(body) != u32::from_be_bytes(crc) {
        return Err(TimeSignatureError::InvalidFormat(
            "publication string checksum mismatch".into(),
        ));
    }
    let mut identifier = [0u8; 8];
    identifier.copy_from_slice(&body[..8]);
    let algorithm_id = body[8];
    let algorithm = HashAlgorithm::from_id(algorithm_id).ok_or_else(|| {
        TimeSignatureError::UntrustedHashAlgorithm(format!("id {algorithm_id}"))
    })?;
    if body.len() != 8 + 1 + algorithm.digest_len() {
        return Err(TimeSignatureError::InvalidFormat(
            "publication string imprint length mismatch".into(),
        ));
    }
    Ok(PublishedData {
        publication_identifier: u64_to_int(u64::from_be_bytes(identifier))?,
        publication_imprint: OctetString::new(&body[8..])?,
    })
}
