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

//! The Guardtime ASN.1 dialect.
//!
//! Structurally these follow RFC 3161, but the protocol carries a few
//! non-standard pieces that keep us from reusing the stock TSP crates:
//! version fields must decode as plain integers (wrong versions are a
//! verification-time condition, not a parse error), `PKIFailureInfo` uses
//! private bit positions above the standard range, and the extension
//! protocol structures (`CertToken` and friends) exist only in this
//! dialect.

use cms::content_info::ContentInfo;
use der::asn1::{Any, BitString, GeneralizedTime, Int, OctetString, SetOfVec};
use der::{Sequence, Tag, Tagged, ValueOrd};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::Extensions;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::errors::{Result, TimeSignatureError};

pub mod time;

/// CMS SignedData content type.
pub const ID_SIGNED_DATA: der::oid::ObjectIdentifier =
    der::oid::ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

/// PKCS#9 TSP TSTInfo content type.
pub const ID_CT_TST_INFO: der::oid::ObjectIdentifier =
    der::oid::ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");

/// Guardtime TimeSignature signature algorithm.
pub const ID_GT_TIME_SIGNATURE_ALG: der::oid::ObjectIdentifier =
    der::oid::ObjectIdentifier::new_unwrap("1.3.6.1.4.1.27868.4.1");

/// PKCS#9 contentType signed attribute.
pub const ID_CONTENT_TYPE: der::oid::ObjectIdentifier =
    der::oid::ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");

/// PKCS#9 messageDigest signed attribute.
pub const ID_MESSAGE_DIGEST: der::oid::ObjectIdentifier =
    der::oid::ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// `PKIStatus` values that indicate success.
pub mod pki_status {
    pub const GRANTED: u32 = 0;
    pub const GRANTED_WITH_MODS: u32 = 1;
}

/// Bit positions inside `PKIStatusInfo.failInfo`. The first group is
/// RFC 3161; the `extendLater`/`extensionOverdue` bits are Guardtime
/// extender responses outside the standard range.
pub mod pki_failure {
    pub const BAD_ALG: usize = 0;
    pub const BAD_REQUEST: usize = 2;
    pub const BAD_DATA_FORMAT: usize = 5;
    pub const UNACCEPTED_POLICY: usize = 15;
    pub const UNACCEPTED_EXTENSION: usize = 16;
    pub const SYSTEM_FAILURE: usize = 25;
    pub const EXTEND_LATER: usize = 100;
    pub const EXTENSION_OVERDUE: usize = 101;
}

/// RFC 3161 `MessageImprint`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct MessageImprint {
    pub hash_algorithm: AlgorithmIdentifierOwned,
    pub hashed_message: OctetString,
}

/// RFC 3161 `TimeStampReq`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampReq {
    pub version: u8,
    pub message_imprint: MessageImprint,
    #[asn1(optional = "true")]
    pub req_policy: Option<der::oid::ObjectIdentifier>,
    #[asn1(optional = "true")]
    pub nonce: Option<Int>,
    #[asn1(default = "bool::default")]
    pub cert_req: bool,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub extensions: Option<Extensions>,
}

/// RFC 3161 `Accuracy`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Accuracy {
    #[asn1(optional = "true")]
    pub seconds: Option<u32>,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub millis: Option<u16>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub micros: Option<u16>,
}

/// RFC 3161 `TSTInfo`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TstInfo {
    pub version: u8,
    pub policy: der::oid::ObjectIdentifier,
    pub message_imprint: MessageImprint,
    pub serial_number: Int,
    pub gen_time: GeneralizedTime,
    #[asn1(optional = "true")]
    pub accuracy: Option<Accuracy>,
    #[asn1(default = "bool::default")]
    pub ordering: bool,
    #[asn1(optional = "true")]
    pub nonce: Option<Int>,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub tsa: Option<GeneralName>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub extensions: Option<Extensions>,
}

/// RFC 3161 `PKIStatusInfo` with the failure info kept as a raw
/// BIT STRING so private bit positions survive.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PkiStatusInfo {
    pub status: u32,
    #[asn1(optional = "true")]
    pub status_string: Option<Vec<String>>,
    #[asn1(optional = "true")]
    pub fail_info: Option<BitString>,
}

/// RFC 3161 `TimeStampResp`.
#[derive(Clone, Debug, Sequence)]
pub struct TimeStampResp {
    pub status: PkiStatusInfo,
    #[asn1(optional = "true")]
    pub time_stamp_token: Option<ContentInfo>,
}

/// A `(publicationIdentifier, publicationImprint)` pair. Equality is
/// structural on both fields.
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct PublishedData {
    pub publication_identifier: Int,
    pub publication_imprint: OctetString,
}

/// The optional PKI signature inside a `TimeSignature`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SignatureInfo {
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature_value: OctetString,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub key_commitment_ref: Option<SetOfVec<OctetString>>,
}

/// The Guardtime signature payload carried as the `encryptedDigest` of
/// the single signer info. `pk_signature` is absent exactly when the
/// timestamp is extended.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeSignature {
    pub location: OctetString,
    pub history: OctetString,
    pub published_data: PublishedData,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub pk_signature: Option<SignatureInfo>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub pub_reference: Option<SetOfVec<OctetString>>,
}

/// Extension (cert token) request.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CertTokenRequest {
    pub version: u8,
    pub history_identifier: Int,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub extensions: Option<Extensions>,
}

/// The long-term material returned by the extender.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CertToken {
    pub version: u8,
    pub history: OctetString,
    pub published_data: PublishedData,
    pub pub_reference: SetOfVec<OctetString>,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub extensions: Option<Extensions>,
}

/// Extension (cert token) response.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CertTokenResponse {
    pub status: PkiStatusInfo,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub cert_token: Option<CertToken>,
}

/// Reads a non-negative ASN.1 integer that must fit into 64 bits.
pub(crate) fn int_to_u64(value: &Int) -> Result<u64> {
    let bytes = value.as_bytes();
    if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        return Err(TimeSignatureError::InvalidFormat(
            "negative integer where a non-negative one is required".into(),
        ));
    }
    let significant: Vec<u8> = bytes.iter().copied().skip_while(|&b| b == 0).collect();
    if significant.len() > 8 {
        return Err(TimeSignatureError::InvalidFormat(
            "integer does not fit into 64 bits".into(),
        ));
    }
    Ok(significant.iter().fold(0u64, |acc, &b| acc << 8 | b as u64))
}

/// Encodes a `u64` as a minimal ASN.1 integer.
pub(crate) fn u64_to_int(value: u64) -> Result<Int> {
    let all = value.to_be_bytes();
    let start = all.iter().position(|&b| b != 0).unwrap_or(7);
    let mut bytes = Vec::with_capacity(9);
    if all[start] & 0x80 != 0 {
        bytes.push(0);
    }
    bytes.extend_from_slice(&all[start..]);
    Ok(Int::new(&bytes)?)
}

/// Algorithm parameters must either be absent or an explicit NULL.
pub(crate) fn params_absent_or_null(parameters: &Option<Any>) -> bool {
    match parameters {
        None => true,
        Some(any) => any.tag() == Tag::Null,
    }
}

/// Reads bit `index` of a BIT STRING, counting from the most significant
/// bit of the first byte, as `ASN1_BIT_STRING_get_bit` does.
pub(crate) fn bit_string_bit(bits: &BitString, index: usize) -> bool {
    bits.raw_bytes()
        .get(index / 8)
        .is_some_and(|byte| byte & (0x80 >> (index % 8)) != 0)
}

/// Fails on any critical extension: none are recognized by this client.
pub(crate) fn check_unhandled_extensions(extensions: Option<&Extensions>) -> Result<()> {
    if let Some(extensions) = extensions {
        if extensions.iter().any(|ext| ext.critical) {
            return Err(TimeSignatureError::UnsupportedFormat(
                "unrecognized critical extension".into(),
            ));
        }
    }
    Ok(())
}
