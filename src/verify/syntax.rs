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

//! Structural checks over a decoded timestamp.
//!
//! Most of the syntax is already enforced by decoding; what remains are
//! the version pins, extension handling, imprint and chain shapes, and
//! the two mandatory signed attributes.

use cms::content_info::CmsVersion;
use cms::signed_data::SignerInfo;
use der::asn1::OctetString;
use der::oid::ObjectIdentifier;
use der::{Decode, Encode};

use crate::asn1::{check_unhandled_extensions, ID_CONTENT_TYPE, ID_CT_TST_INFO, ID_MESSAGE_DIGEST};
use crate::chain::parse_steps;
use crate::errors::{Result, TimeSignatureError};
use crate::hash::{check_data_imprint, HashAlgorithm};
use crate::timestamp::Timestamp;

/// Runs the structural checks in a fixed order, failing on the first
/// violation.
pub(crate) fn check_timestamp_syntax(timestamp: &Timestamp) -> Result<()> {
    let token = timestamp.token();
    let signer_info = timestamp.signer_info();
    let time_signature = timestamp.time_signature();

    // Versions.
    if token.version != CmsVersion::V3 {
        return Err(TimeSignatureError::UnsupportedFormat(
            "unsupported SignedData version".into(),
        ));
    }
    if timestamp.tst_info().version != 1 {
        return Err(TimeSignatureError::UnsupportedFormat(
            "unsupported TSTInfo version".into(),
        ));
    }
    if signer_info.version != CmsVersion::V1 {
        return Err(TimeSignatureError::UnsupportedFormat(
            "unsupported SignerInfo version".into(),
        ));
    }

    // Unknown critical extensions.
    check_unhandled_extensions(timestamp.tst_info().extensions.as_ref())?;

    // The publication imprint must be a well-formed data imprint.
    check_data_imprint(time_signature.published_data.publication_imprint.as_bytes())?;

    // Both chains must be well-formed.
    check_hash_chain(time_signature.location.as_bytes())?;
    check_hash_chain(time_signature.history.as_bytes())?;

    // Location chain levels must never decrease.
    check_level_bytes(time_signature.location.as_bytes())?;

    // Signed attributes: contentType must name TSTInfo and a
    // messageDigest octet string must be present. Its value is compared
    // against TSTInfo during the hash chain check.
    let content_type: ObjectIdentifier = signed_attribute(signer_info, &ID_CONTENT_TYPE)
        .ok_or_else(|| {
            TimeSignatureError::InvalidFormat("missing contentType signed attribute".into())
        })
        .and_then(|any| Ok(any.decode_as()?))?;
    if content_type != ID_CT_TST_INFO {
        return Err(TimeSignatureError::InvalidFormat(
            "contentType signed attribute does not name TSTInfo".into(),
        ));
    }
    signed_attribute(signer_info, &ID_MESSAGE_DIGEST)
        .ok_or_else(|| {
            TimeSignatureError::InvalidFormat("missing messageDigest signed attribute".into())
        })
        .and_then(|any| Ok(any.decode_as::<OctetString>()?))?;

    Ok(())
}

/// Every step must parse, use known algorithms, and carry a 0/1
/// direction byte.
pub(crate) fn check_hash_chain(chain: &[u8]) -> Result<()> {
    for step in parse_steps(chain)? {
        if step.direction > 1 {
            return Err(TimeSignatureError::InvalidLinkingInfo);
        }
        if HashAlgorithm::from_id(step.algorithm).is_none() {
            return Err(TimeSignatureError::InvalidLinkingInfo);
        }
    }
    Ok(())
}

fn check_level_bytes(chain: &[u8]) -> Result<()> {
    let mut previous = 0u8;
    for step in parse_steps(chain)? {
        if step.level < previous {
            return Err(TimeSignatureError::InvalidLengthBytes);
        }
        previous = step.level;
    }
    Ok(())
}

/// The first value of the signed attribute with the given OID, re-encoded
/// so callers can decode it as the expected type.
pub(crate) fn signed_attribute(
    signer_info: &SignerInfo,
    oid: &ObjectIdentifier,
) -> Option<der::Any> {
    let attributes = signer_info.signed_attrs.as_ref()?;
    let attribute = attributes.iter().find(|attr| attr.oid == *oid)?;
    attribute.values.iter().next().cloned()
}

/// The digest bytes carried by the messageDigest signed attribute.
pub(crate) fn message_digest_attribute(signer_info: &SignerInfo) -> Result<Vec<u8>> {
    let value = signed_attribute(signer_info, &ID_MESSAGE_DIGEST).ok_or_else(|| {
        TimeSignatureError::InvalidFormat("missing messageDigest signed attribute".into())
    })?;
    let der = value
        .to_der()
        .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
    Ok(OctetString::from_der(&der)?.as_bytes().to_vec())
}
