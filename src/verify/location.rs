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

//! Recovering the issuer location from the location hash chain.
//!
//! The chain climbs from the client through local, state and national
//! aggregators to the core hashers. Nothing in it names the issuer
//! directly: the address is the sequence of direction bits, cut into
//! fields wherever the step level crosses one of the architectural
//! boundaries, and aggregators may additionally tag their name into a
//! step by disguising it as a SHA-224 sibling.

use crate::chain::{take_step, HashStep};
use crate::errors::{Result, TimeSignatureError};
use crate::hash::HashAlgorithm;

// Aggregation layer geometry. A layer's boundary level is its tree depth
// plus the address bits it contributes, minus the two levels shared with
// its neighbours.
const HASHER_LEVEL: i32 = 80;
const GDEPTH_TOP: i32 = 60;
const GDEPTH_NATIONAL: i32 = 39;
const GDEPTH_STATE: i32 = 19;

const SLOT_BITS_TOP: usize = 3;
const AB_BITS_TOP: usize = 3;
const SLOT_BITS_NATIONAL: usize = 2;
const AB_BITS_NATIONAL: usize = 3;
const SLOT_BITS_STATE: usize = 2;
const AB_BITS_STATE: usize = 2;

const TOP_LEVEL: i32 = GDEPTH_TOP + (SLOT_BITS_TOP + AB_BITS_TOP) as i32 - 2;
const NATIONAL_LEVEL: i32 = GDEPTH_NATIONAL + (SLOT_BITS_NATIONAL + AB_BITS_NATIONAL) as i32 - 2;
const STATE_LEVEL: i32 = GDEPTH_STATE + (SLOT_BITS_STATE + AB_BITS_STATE) as i32 - 2;

/// The recovered issuer position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Location {
    /// Four 16-bit fields packed `national | state | local | client`.
    pub id: u64,
    /// Human-readable issuer name, when any aggregator tagged one.
    pub name: Option<String>,
}

#[derive(Default)]
struct Fields<'a> {
    hasher: u64,
    national_cluster: u64,
    national_machine: u64,
    national_slot: u64,
    national_name: Option<&'a [u8]>,
    state_cluster: u64,
    state_machine: u64,
    state_slot: u64,
    state_name: Option<&'a [u8]>,
    local_cluster: u64,
    local_machine: u64,
    local_slot: u64,
    local_name: Option<&'a [u8]>,
    client_id: u64,
    client_name: Option<&'a [u8]>,
}

/// The steps scanned so far paired with their address bits. Consuming a
/// bit consumes its step too, so name recovery always inspects the step
/// of the most recent unconsumed bit.
type BitStack<'a> = Vec<(HashStep<'a>, u8)>;

/// Pops the last `count` bits, most recent first becoming the least
/// significant. When fewer bits remain the result simply comes up short;
/// region boundaries consume whatever their region collected.
fn collect_bits(stack: &mut BitStack<'_>, count: usize) -> u64 {
    let mut value = 0u64;
    for _ in 0..count {
        match stack.pop() {
            Some((_, bit)) => value = value << 1 | bit as u64,
            None => break,
        }
    }
    value
}

/// If the most recent unconsumed step embeds a name tag, extracts the
/// name and consumes the step so it is not used as an address bit.
/// A name tag is a SHA-224 sibling on the right whose value is
/// `0x00 || len || name || zero padding`.
fn check_name<'a>(stack: &mut BitStack<'a>) -> Option<&'a [u8]> {
    let (step, _) = stack.last()?;
    if step.direction != 1 {
        return None;
    }
    if step.sibling_algorithm != HashAlgorithm::Sha224.id() {
        return None;
    }
    let sibling = step.sibling_digest;
    if sibling[0] != 0 {
        return None;
    }
    let name_len = sibling[1] as usize;
    if name_len + 2 > sibling.len() {
        return None;
    }
    if sibling[2 + name_len..].iter().any(|&b| b != 0) {
        return None;
    }
    let name = &sibling[2..2 + name_len];
    stack.pop();
    Some(name)
}

fn name_or_cluster(name: Option<&[u8]>, cluster: u64) -> String {
    match name {
        Some(name) if !name.is_empty() => String::from_utf8_lossy(name).into_owned(),
        _ => format!("[{cluster}]"),
    }
}

/// Walks the location chain once and recovers the issuer address and
/// name. Steps after the hasher boundary are ignored, as the id lives
/// entirely below it.
pub(crate) fn extract_location(chain: &[u8]) -> Result<Location> {
    let mut rest = chain;
    let mut stack: BitStack<'_> = Vec::new();
    let mut fields = Fields::default();
    let mut last_level: i32 = -1;

    loop {
        let step = take_step(&mut rest)?;
        if step.direction > 1 {
            return Err(TimeSignatureError::InvalidLinkingInfo);
        }
        let bit = 1 - step.direction;
        let level = step.level as i32;

        if level > HASHER_LEVEL && last_level <= HASHER_LEVEL {
            fields.hasher = if step.level == 0xff {
                // 2007-2011 cores ran exactly two hashers; the direction
                // bit of the final step tells them apart.
                1 + bit as u64
            } else {
                // 2011+ cores number hashers by level offset.
                (level - HASHER_LEVEL) as u64
            };
            let remaining = stack.len();
            fields.national_cluster = collect_bits(&mut stack, remaining);
            break;
        }
        if level > TOP_LEVEL && last_level <= TOP_LEVEL {
            fields.national_machine = collect_bits(&mut stack, AB_BITS_TOP);
            fields.national_slot = collect_bits(&mut stack, SLOT_BITS_TOP);
            fields.national_name = check_name(&mut stack);
            let remaining = stack.len();
            fields.state_cluster = collect_bits(&mut stack, remaining);
        }
        if level > NATIONAL_LEVEL && last_level <= NATIONAL_LEVEL {
            fields.state_machine = collect_bits(&mut stack, AB_BITS_NATIONAL);
            fields.state_slot = collect_bits(&mut stack, SLOT_BITS_NATIONAL);
            fields.state_name = check_name(&mut stack);
            let remaining = stack.len();
            fields.local_cluster = collect_bits(&mut stack, remaining);
        }
        if level > STATE_LEVEL && last_level <= STATE_LEVEL {
            fields.local_machine = collect_bits(&mut stack, AB_BITS_STATE);
            fields.local_slot = collect_bits(&mut stack, SLOT_BITS_STATE);
            fields.local_name = check_name(&mut stack);
            let remaining = stack.len();
            fields.client_id = collect_bits(&mut stack, remaining);
        }
        if level > 1 && last_level <= 1 {
            fields.client_name = check_name(&mut stack);
        }

        last_level = level;
        stack.push((step, bit));
    }

    // The machine, slot and hasher fields identify hardware within a
    // cluster; only the cluster path makes up the packed address.
    let _ = (
        fields.national_machine,
        fields.national_slot,
        fields.state_machine,
        fields.state_slot,
        fields.local_machine,
        fields.local_slot,
        fields.hasher,
    );

    let id = fields.national_cluster << 48
        | fields.state_cluster << 32
        | fields.local_cluster << 16
        | fields.client_id;

    let has_name = [
        fields.national_name,
        fields.state_name,
        fields.local_name,
        fields.client_name,
    ]
    .iter()
    .any(|name| name.is_some_and(|n| !n.is_empty()));

    let name = has_name.then(|| {
        let mut name = format!(
            "{} : {} : {}",
            name_or_cluster(fields.national_name, fields.national_cluster),
            name_or_cluster(fields.state_name, fields.state_cluster),
            name_or_cluster(fields.local_name, fields.local_cluster),
        );
        if let Some(client) = fields.client_name.filter(|n| !n.is_empty()) {
            name.push_str(" : ");
            name.push_str(&String::from_utf8_lossy(client));
        }
        name
    });

    Ok(Location { id, name })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(direction: u8, sibling: &[u8], level: u8) -> Vec<u8> {
        let sibling_algorithm = match sibling.len() {
            32 => 1,
            28 => 3,
            len => panic!("no algorithm with digest length {len}"),
        };
        let mut out = vec![1u8, direction, sibling_algorithm];
        out.extend_from_slice(sibling);
        out.push(level);
        out
    }

    fn name_sibling(name: &[u8]) -> Vec<u8> {
        let mut sibling = vec![0u8, name.len() as u8];
        sibling.extend_from_slice(name);
        sibling.resize(28, 0);
        sibling
    }

    #[test]
    fn address_bits_are_cut_at_region_boundaries() {
        let mut chain = Vec::new();
        chain.extend(step(1, &[0xaa; 32], 1)); // bit 0
        chain.extend(step(0, &[0xab; 32], 2)); // bit 1
        chain.extend(step(0, &[0xac; 32], 23)); // local boundary, bit 1
        chain.extend(step(1, &[0xad; 32], 43)); // state boundary, bit 0
        chain.extend(step(0, &[0xae; 32], 65)); // national boundary, bit 1
        chain.extend(step(0, &[0xaf; 32], 0xff)); // hasher boundary

        // The two low bits are eaten by the local machine field, and the
        // single bit pushed at each boundary is eaten by the next
        // region's machine field, except the last one which becomes the
        // national cluster.
        let location = extract_location(&chain).unwrap();
        assert_eq!(location.id, 1 << 48);
        assert_eq!(location.name, None);
    }

    #[test]
    fn client_id_survives_the_machine_and_slot_fields() {
        let mut chain = Vec::new();
        // Five low steps: address bits 1,1,0,1,1 (oldest first).
        for (direction, level) in [(0u8, 1u8), (0, 2), (1, 3), (0, 4), (0, 5)] {
            chain.extend(step(direction, &[direction; 32], level));
        }
        chain.extend(step(0, &[0x11; 32], 23)); // local boundary
        chain.extend(step(0, &[0x12; 32], 43)); // state boundary
        chain.extend(step(0, &[0x13; 32], 65)); // national boundary
        chain.extend(step(0, &[0x14; 32], 90)); // hasher, new convention

        // Machine bits take 1,1 (most recent), slot bits 0,1, and the
        // remaining oldest bit 1 is the client id. The lone boundary
        // bits are consumed as machine bits of the next region, leaving
        // empty cluster fields until the hasher cut.
        let location = extract_location(&chain).unwrap();
        assert_eq!(location.id, 1 << 48 | 1);
        assert_eq!(location.name, None);
    }

    #[test]
    fn name_tags_are_extracted_and_not_counted_as_bits() {
        let mut chain = Vec::new();
        chain.extend(step(0, &[0x21; 32], 1)); // client bit 1
        chain.extend(step(1, &name_sibling(b"Acme West"), 2)); // name tag
        chain.extend(step(0, &[0x22; 32], 3)); // machine/slot filler
        chain.extend(step(0, &[0x23; 32], 4));
        chain.extend(step(0, &[0x24; 32], 5));
        chain.extend(step(0, &[0x25; 32], 6));
        chain.extend(step(0, &[0x26; 32], 23)); // local boundary
        chain.extend(step(0, &[0x27; 32], 43));
        chain.extend(step(0, &[0x28; 32], 65));
        chain.extend(step(0, &[0x29; 32], 0xff));

        let location = extract_location(&chain).unwrap();
        let name = location.name.expect("local name should be recovered");
        assert_eq!(name, "[1] : [0] : Acme West");
        // The tag step contributed no address bit: after the machine and
        // slot fields take the four filler bits, the client id is the
        // single bit below the tag.
        assert_eq!(location.id & 0xffff, 1);
    }

    #[test]
    fn missing_names_render_as_bracketed_clusters() {
        let mut chain = Vec::new();
        chain.extend(step(1, &name_sibling(b"client-7"), 1)); // client name tag
        chain.extend(step(0, &[0x31; 32], 2)); // first step above level 1
        chain.extend(step(0, &[0x32; 32], 23));
        chain.extend(step(0, &[0x33; 32], 43));
        chain.extend(step(0, &[0x34; 32], 65));
        chain.extend(step(0, &[0x35; 32], 0xff));

        let location = extract_location(&chain).unwrap();
        let name = location.name.expect("client name should be recovered");
        assert_eq!(name, "[1] : [0] : [0] : client-7");
    }

    #[test]
    fn sha224_sibling_without_the_tag_marker_is_an_ordinary_step() {
        let mut sibling = name_sibling(b"not-a-name");
        sibling[0] = 1; // wrong marker byte
        let mut chain = Vec::new();
        chain.extend(step(1, &sibling, 1));
        chain.extend(step(0, &[0x41; 32], 2));
        chain.extend(step(0, &[0x42; 32], 23));
        chain.extend(step(0, &[0x43; 32], 43));
        chain.extend(step(0, &[0x44; 32], 65));
        chain.extend(step(0, &[0x45; 32], 0xff));
        let location = extract_location(&chain).unwrap();
        assert_eq!(location.name, None);
    }

    #[test]
    fn unpadded_name_tag_is_rejected() {
        let mut sibling = name_sibling(b"name");
        *sibling.last_mut().unwrap() = 0x55; // padding must be zero
        let mut chain = Vec::new();
        chain.extend(step(1, &sibling, 1)); // would-be name tag
        chain.extend(step(0, &[0x51; 32], 2)); // machine/slot filler
        chain.extend(step(0, &[0x52; 32], 3));
        chain.extend(step(0, &[0x53; 32], 4));
        chain.extend(step(0, &[0x54; 32], 5));
        chain.extend(step(0, &[0x55; 32], 23));
        chain.extend(step(0, &[0x56; 32], 43));
        chain.extend(step(0, &[0x57; 32], 65));
        chain.extend(step(0, &[0x58; 32], 0xff));
        // The malformed tag is treated as a plain step: no name, and its
        // direction bit 0 becomes the client id.
        let location = extract_location(&chain).unwrap();
        assert_eq!(location.name, None);
        assert_eq!(location.id & 0xffff, 0);
    }

    #[test]
    fn truncated_chain_is_invalid_linking_info() {
        let mut chain = step(0, &[0x61; 32], 1);
        chain.extend(step(0, &[0x62; 32], 23));
        // No hasher step ever arrives.
        assert!(matches!(
            extract_location(&chain),
            Err(TimeSignatureError::InvalidLinkingInfo)
        ));
    }

    #[test]
    fn bad_direction_byte_is_invalid_linking_info() {
        let mut chain = vec![1u8, 7, 1];
        chain.extend_from_slice(&[0u8; 32]);
        chain.push(1);
        assert!(matches!(
            extract_location(&chain),
            Err(TimeSignatureError::InvalidLinkingInfo)
        ));
    }

    #[test]
    fn both_hasher_conventions_decode() {
        for hasher_level in [0xffu8, 90] {
            let mut chain = Vec::new();
            chain.extend(step(0, &[0x71; 32], 1));
            chain.extend(step(0, &[0x72; 32], hasher_level));
            let location = extract_location(&chain).unwrap();
            assert_eq!(location.id, 1 << 48, "hasher level {hasher_level}");
        }
    }
}
