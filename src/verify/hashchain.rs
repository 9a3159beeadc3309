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

//! Recomputing the published imprint from scratch.

use der::Encode;

use crate::asn1::params_absent_or_null;
use crate::chain::{fold, LevelBytes};
use crate::errors::{Result, TimeSignatureError};
use crate::hash::{data_imprint, HashAlgorithm};
use crate::timestamp::Timestamp;
use crate::verify::syntax::message_digest_attribute;

/// Recomputes the aggregation from the signed attributes through both
/// hash chains and compares the result with the published imprint.
pub(crate) fn check_hash_chain_computation(timestamp: &Timestamp) -> Result<()> {
    let time_signature = timestamp.time_signature();
    let signer_info = timestamp.signer_info();

    let published = time_signature.published_data.publication_imprint.as_bytes();
    let Some(&server_id) = published.first() else {
        return Err(TimeSignatureError::InvalidFormat(
            "empty publication imprint".into(),
        ));
    };
    let alg_server = HashAlgorithm::from_id(server_id)
        .ok_or_else(|| TimeSignatureError::UntrustedHashAlgorithm(format!("id {server_id}")))?;

    let alg_client = HashAlgorithm::from_oid(&signer_info.digest_alg.oid).ok_or_else(|| {
        TimeSignatureError::UntrustedHashAlgorithm(signer_info.digest_alg.oid.to_string())
    })?;
    if !params_absent_or_null(&signer_info.digest_alg.parameters) {
        return Err(TimeSignatureError::InvalidFormat(
            "unexpected digest algorithm parameters".into(),
        ));
    }

    // The messageDigest attribute must hold the digest of the DER-encoded
    // TSTInfo under the client algorithm.
    let tst_info_der = timestamp
        .tst_info()
        .to_der()
        .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
    let tst_info_imprint = data_imprint(alg_client, &tst_info_der);
    let message_digest = message_digest_attribute(signer_info)?;
    if message_digest.len() + 1 != tst_info_imprint.len()
        || message_digest != tst_info_imprint[1..]
    {
        return Err(TimeSignatureError::WrongSignedData);
    }

    // The aggregation input is the digest of the signed attributes,
    // re-encoded in their SET OF form as CMS signing does.
    let signed_attrs = signer_info.signed_attrs.as_ref().ok_or_else(|| {
        TimeSignatureError::InvalidFormat("missing signed attributes".into())
    })?;
    let signed_attrs_der = signed_attrs
        .to_der()
        .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
    let input = data_imprint(alg_client, &signed_attrs_der);

    // The first location step folds the aggregation input under the
    // client algorithm; only the steps after it use their own bytes.
    let location_output = fold(
        time_signature.location.as_bytes(),
        &input,
        LevelBytes::Hashed,
        Some(alg_client),
    )?;
    let history_output = fold(
        time_signature.history.as_bytes(),
        &location_output,
        LevelBytes::Omitted,
        None,
    )?;
    let output = data_imprint(alg_server, &history_output);

    if output != published {
        return Err(TimeSignatureError::InvalidAggregation);
    }
    Ok(())
}
