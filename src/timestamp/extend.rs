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

//! Extending a short-term timestamp into a long-term one.

use der::asn1::{OctetString, SetOfVec};
use der::{Decode, Encode};

use crate::asn1::{
    check_unhandled_extensions, int_to_u64, CertToken, CertTokenResponse, TimeSignature,
};
use crate::chain;
use crate::errors::{Result, TimeSignatureError};
use crate::timestamp::response::analyse_response_status;
use crate::timestamp::Timestamp;

/// Folds an extension response into an existing short-term timestamp,
/// producing a fresh long-term one. The operation is transactional: on
/// any failure the input is untouched and nothing is returned.
///
/// The cert token's history must describe the same aggregation round as
/// the timestamp (`CANNOT_EXTEND` otherwise), and a timestamp that
/// already lacks a PKI signature needs no extension
/// (`ALREADY_EXTENDED`).
pub fn create_extended_timestamp(timestamp: &Timestamp, response: &[u8]) -> Result<Timestamp> {
    if response.is_empty() {
        return Err(TimeSignatureError::InvalidArgument("empty response"));
    }
    if timestamp.is_extended() {
        return Err(TimeSignatureError::AlreadyExtended);
    }
    let response = CertTokenResponse::from_der(response)?;
    analyse_response_status(&response.status)?;
    let cert_token = response.cert_token.ok_or_else(|| {
        TimeSignatureError::InvalidFormat(
            "response status is granted but the cert token is missing".into(),
        )
    })?;
    if cert_token.version != 1 {
        return Err(TimeSignatureError::UnsupportedFormat(
            "unsupported cert token version".into(),
        ));
    }
    check_unhandled_extensions(cert_token.extensions.as_ref())?;

    extend_consistency_check(timestamp.time_signature(), &cert_token)?;
    let extended = extend_time_signature(timestamp.time_signature(), &cert_token);

    // Splice the new time signature into a duplicate of the token and
    // drop the certificate bag: a hash-linked timestamp needs no key.
    let mut signer_info = timestamp.signer_info().clone();
    let extended_der = extended
        .to_der()
        .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
    signer_info.signature = OctetString::new(extended_der)?;
    let mut token = timestamp.token().clone();
    token.signer_infos = cms::signed_data::SignerInfos(SetOfVec::try_from(vec![signer_info])?);
    token.certificates = None;

    tracing::debug!("spliced extended time signature into the token");
    Timestamp::from_signed_data(token)
}

/// Checks that the cert token's chain belongs to the same aggregation
/// round as the existing time signature: both histories must decode to
/// the same round and agree on every frozen historical imprint.
fn extend_consistency_check(
    time_signature: &TimeSignature,
    cert_token: &CertToken,
) -> Result<()> {
    let signature_round = chain::registered_time(time_signature)?;
    let token_publication = int_to_u64(&cert_token.published_data.publication_identifier)?;
    let token_shape = chain::shape(cert_token.history.as_bytes())?;
    let token_round = chain::history_identifier(token_publication, &token_shape)?;
    if signature_round != token_round {
        return Err(TimeSignatureError::CannotExtend);
    }
    chain::compare_history_imprints(
        cert_token.history.as_bytes(),
        time_signature.history.as_bytes(),
    )
}

/// The extended signature keeps the location chain and takes the cert
/// token's history, published data and publication references; the PKI
/// signature is dropped.
fn extend_time_signature(time_signature: &TimeSignature, cert_token: &CertToken) -> TimeSignature {
    let pub_reference = if cert_token.pub_reference.is_empty() {
        None
    } else {
        Some(cert_token.pub_reference.clone())
    };
    TimeSignature {
        location: time_signature.location.clone(),
        history: cert_token.history.clone(),
        published_data: cert_token.published_data.clone(),
        pk_signature: None,
        pub_reference,
    }
}
