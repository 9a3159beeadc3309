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

//! The hash chain primitive.
//!
//! A chain is a byte string of steps, each
//! `algorithm (1) || direction (1) || sibling-algorithm (1) ||
//! sibling-digest || level (1)`. Folding a chain combines a running data
//! imprint with each step's sibling imprint under the step's algorithm;
//! the shape (the direction bits alone) encodes the position of the
//! chain's origin in the aggregation tree.

use crate::asn1::{int_to_u64, TimeSignature};
use crate::errors::{Result, TimeSignatureError};
use crate::hash::{data_imprint, HashAlgorithm};

/// One decoded hash chain step. Algorithm bytes are kept raw: chains with
/// unknown identifiers must still be representable for display, and the
/// checks that require known algorithms make that decision themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashStep<'a> {
    /// Algorithm the step is folded with.
    pub algorithm: u8,
    /// 0 puts the running imprint left of the sibling, 1 right of it.
    pub direction: u8,
    /// Algorithm of the sibling imprint; fixes the digest length.
    pub sibling_algorithm: u8,
    pub sibling_digest: &'a [u8],
    /// Ceiling on the number of steps allowed to precede this one.
    pub level: u8,
}

/// Whether the level byte of each step participates in the fold.
/// Location chains hash it; history chains do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelBytes {
    Hashed,
    Omitted,
}

/// Consumes one step from the front of `rest`.
pub(crate) fn take_step<'a>(rest: &mut &'a [u8]) -> Result<HashStep<'a>> {
    let chain = *rest;
    if chain.len() < 3 {
        return Err(TimeSignatureError::InvalidLinkingInfo);
    }
    let sibling_algorithm = chain[2];
    let digest_len = HashAlgorithm::from_id(sibling_algorithm)
        .ok_or(TimeSignatureError::InvalidLinkingInfo)?
        .digest_len();
    if chain.len() < 3 + digest_len + 1 {
        return Err(TimeSignatureError::InvalidLinkingInfo);
    }
    let step = HashStep {
        algorithm: chain[0],
        direction: chain[1],
        sibling_algorithm,
        sibling_digest: &chain[3..3 + digest_len],
        level: chain[3 + digest_len],
    };
    *rest = &chain[3 + digest_len + 1..];
    Ok(step)
}

/// Decodes a whole chain into steps.
pub fn parse_steps(chain: &[u8]) -> Result<Vec<HashStep<'_>>> {
    let mut rest = chain;
    let mut steps = Vec::new();
    while !rest.is_empty() {
        steps.push(take_step(&mut rest)?);
    }
    Ok(steps)
}

/// Folds `input_imprint` through the chain and returns the resulting
/// data imprint. The computation is pure; malformed chains fail with
/// `INVALID_FORMAT` and unknown fold algorithms with
/// `UNTRUSTED_HASH_ALGORITHM`.
///
/// When `first_step_algorithm` is given, the step that consumes
/// `input_imprint` hashes under it instead of its own encoded algorithm
/// byte. Location chains fold this way, under the client digest
/// algorithm; history chains pass `None` and every step uses its own
/// byte.
pub fn fold(
    chain: &[u8],
    input_imprint: &[u8],
    level_bytes: LevelBytes,
    first_step_algorithm: Option<HashAlgorithm>,
) -> Result<Vec<u8>> {
    let steps = parse_steps(chain).map_err(|_| {
        TimeSignatureError::InvalidFormat("malformed hash chain".into())
    })?;
    let mut imprint = input_imprint.to_vec();
    for (index, step) in steps.into_iter().enumerate() {
        if step.direction > 1 {
            return Err(TimeSignatureError::InvalidFormat(
                "hash chain direction byte out of range".into(),
            ));
        }
        let algorithm = match first_step_algorithm {
            Some(algorithm) if index == 0 => algorithm,
            _ => HashAlgorithm::from_id(step.algorithm).ok_or_else(|| {
                TimeSignatureError::UntrustedHashAlgorithm(format!("id {}", step.algorithm))
            })?,
        };
        let mut message =
            Vec::with_capacity(imprint.len() + 1 + step.sibling_digest.len() + 1);
        if step.direction == 0 {
            message.extend_from_slice(&imprint);
            message.push(step.sibling_algorithm);
            message.extend_from_slice(step.sibling_digest);
        } else {
            message.push(step.sibling_algorithm);
            message.extend_from_slice(step.sibling_digest);
            message.extend_from_slice(&imprint);
        }
        if level_bytes == LevelBytes::Hashed {
            message.push(step.level);
        }
        imprint = data_imprint(algorithm, &message);
    }
    Ok(imprint)
}

/// The shape of a chain: its direction bits in chain order.
pub fn shape(chain: &[u8]) -> Result<Vec<u8>> {
    parse_steps(chain)?
        .iter()
        .map(|step| match step.direction {
            dir @ (0 | 1) => Ok(dir),
            _ => Err(TimeSignatureError::InvalidLinkingInfo),
        })
        .collect()
}

fn high_bit(value: u64) -> u64 {
    1u64 << (63 - value.leading_zeros())
}

/// Recovers the history identifier (the registration second) of the
/// aggregation round from the publication identifier and the shape of
/// the history chain.
///
/// The calendar tree anchored at publication time `P` covers the seconds
/// `0..=P`; descending from the root, a direction-1 step (sibling on the
/// left, a frozen past root) skips the complete left subtree, while a
/// direction-0 step descends into it. A shape that exhausts the tree
/// early or leaves part of it unconsumed cannot have come from that
/// calendar and is rejected.
pub fn history_identifier(publication_identifier: u64, shape: &[u8]) -> Result<u64> {
    let mut remaining = publication_identifier;
    let mut identifier = 0u64;
    for &direction in shape.iter().rev() {
        if remaining == 0 {
            return Err(TimeSignatureError::InvalidLinkingInfo);
        }
        let h = high_bit(remaining);
        if direction == 1 {
            identifier += h;
            remaining -= h;
        } else {
            remaining = h - 1;
        }
    }
    if remaining != 0 {
        return Err(TimeSignatureError::InvalidLinkingInfo);
    }
    Ok(identifier)
}

/// Registration time of a time signature, recovered from its history
/// chain shape and publication identifier.
pub(crate) fn registered_time(time_signature: &TimeSignature) -> Result<u64> {
    let publication_identifier =
        int_to_u64(&time_signature.published_data.publication_identifier)?;
    let shape = shape(time_signature.history.as_bytes())?;
    history_identifier(publication_identifier, &shape)
}

/// Compares the historical imprints of two history chains: the sibling
/// imprints of direction-1 steps, which are roots frozen before the
/// chains' shared round and so must agree between a timestamp and any
/// extension of it.
pub(crate) fn compare_history_imprints(a: &[u8], b: &[u8]) -> Result<()> {
    let historical = |chain: &'_ [u8]| -> Result<Vec<(u8, Vec<u8>)>> {
        Ok(parse_steps(chain)?
            .iter()
            .filter(|step| step.direction == 1)
            .map(|step| (step.sibling_algorithm, step.sibling_digest.to_vec()))
            .collect())
    };
    if historical(a)? != historical(b)? {
        return Err(TimeSignatureError::CannotExtend);
    }
    Ok(())
}
