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

//! The timestamp token and its codec.

use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerInfo};
use der::asn1::Any;
use der::{Decode, Encode, Tagged};

use crate::asn1::{
    params_absent_or_null, TimeSignature, TstInfo, ID_CT_TST_INFO, ID_GT_TIME_SIGNATURE_ALG,
    ID_SIGNED_DATA,
};
use crate::chain;
use crate::errors::{Result, TimeSignatureError};
use crate::hash::HashAlgorithm;

pub mod extend;
pub mod request;
pub mod response;

/// A decoded timestamp.
///
/// Holds the CMS `SignedData` token together with the two projections
/// every operation needs: the RFC 3161 `TSTInfo` body and the Guardtime
/// `TimeSignature` carried in the signer info. All three are decoded
/// once, at construction, and frozen; operations that change a timestamp
/// (extension) produce a new value.
#[derive(Debug, Clone)]
pub struct Timestamp {
    token: SignedData,
    signer_info: SignerInfo,
    tst_info: TstInfo,
    time_signature: TimeSignature,
}

impl Timestamp {
    /// Decodes a DER timestamp token.
    pub fn from_der(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(TimeSignatureError::InvalidArgument("empty timestamp data"));
        }
        let content_info = ContentInfo::from_der(data)?;
        if content_info.content_type != ID_SIGNED_DATA {
            return Err(TimeSignatureError::InvalidFormat(
                "timestamp token is not CMS SignedData".into(),
            ));
        }
        let token: SignedData = content_info.content.decode_as()?;
        Self::from_signed_data(token)
    }

    /// Builds a timestamp around an already decoded token, deriving the
    /// cached projections and checking the token's timestamp shape.
    pub(crate) fn from_signed_data(token: SignedData) -> Result<Self> {
        let tst_info = decode_tst_info(&token)?;
        let (signer_info, time_signature) = decode_time_signature(&token)?;
        Ok(Self {
            token,
            signer_info,
            tst_info,
            time_signature,
        })
    }

    /// Re-emits the canonical DER encoding of the token.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let content = Any::encode_from(&self.token)
            .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
        let content_info = ContentInfo {
            content_type: ID_SIGNED_DATA,
            content,
        };
        content_info
            .to_der()
            .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))
    }

    /// The hash algorithm the timestamped document was hashed with.
    pub fn hash_algorithm(&self) -> Result<HashAlgorithm> {
        let imprint = &self.tst_info.message_imprint;
        let algorithm = HashAlgorithm::from_oid(&imprint.hash_algorithm.oid).ok_or_else(|| {
            TimeSignatureError::UntrustedHashAlgorithm(imprint.hash_algorithm.oid.to_string())
        })?;
        if !params_absent_or_null(&imprint.hash_algorithm.parameters) {
            return Err(TimeSignatureError::UntrustedHashAlgorithm(
                "unexpected hash algorithm parameters".into(),
            ));
        }
        Ok(algorithm)
    }

    /// Whether the timestamp has been extended into a long-term,
    /// hash-linked one. Extended timestamps carry no PKI signature.
    pub fn is_extended(&self) -> bool {
        self.time_signature.pk_signature.is_none()
    }

    /// Whether this timestamp's aggregation round provably closed before
    /// `that` timestamp's. `Ok(false)` means the order could not be
    /// shown, not that the opposite order holds.
    pub fn is_earlier_than(&self, that: &Timestamp) -> Result<bool> {
        let this_round = chain::registered_time(&self.time_signature)?;
        let that_round = chain::registered_time(&that.time_signature)?;
        Ok(this_round < that_round)
    }

    pub(crate) fn token(&self) -> &SignedData {
        &self.token
    }

    pub(crate) fn signer_info(&self) -> &SignerInfo {
        &self.signer_info
    }

    /// The decoded RFC 3161 body of the timestamp.
    pub fn tst_info(&self) -> &TstInfo {
        &self.tst_info
    }

    /// The decoded Guardtime signature payload.
    pub fn time_signature(&self) -> &TimeSignature {
        &self.time_signature
    }
}

fn decode_tst_info(token: &SignedData) -> Result<TstInfo> {
    if token.encap_content_info.econtent_type != ID_CT_TST_INFO {
        return Err(TimeSignatureError::InvalidFormat(
            "encapsulated content is not TSTInfo".into(),
        ));
    }
    let content = token
        .encap_content_info
        .econtent
        .as_ref()
        .ok_or_else(|| TimeSignatureError::InvalidFormat("detached content".into()))?;
    if content.tag() != der::Tag::OctetString {
        return Err(TimeSignatureError::InvalidFormat(
            "encapsulated content is not an octet string".into(),
        ));
    }
    Ok(TstInfo::from_der(content.value())?)
}

fn decode_time_signature(token: &SignedData) -> Result<(SignerInfo, TimeSignature)> {
    let signer_infos = token.signer_infos.0.as_slice();
    // Exactly one signature must be present per RFC 3161.
    let [signer_info] = signer_infos else {
        return Err(TimeSignatureError::InvalidFormat(
            "timestamp must contain exactly one signer info".into(),
        ));
    };
    if signer_info.signature_algorithm.oid != ID_GT_TIME_SIGNATURE_ALG
        || !params_absent_or_null(&signer_info.signature_algorithm.parameters)
    {
        return Err(TimeSignatureError::InvalidFormat(
            "signer info does not carry a Guardtime time signature".into(),
        ));
    }
    let time_signature = TimeSignature::from_der(signer_info.signature.as_bytes())?;
    Ok((signer_info.clone(), time_signature))
}
