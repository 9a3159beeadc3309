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

//! Request builders for the stamping and extension gateways.

use der::asn1::OctetString;
use der::Encode;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::asn1::{u64_to_int, CertTokenRequest, MessageImprint, TimeStampReq};
use crate::chain;
use crate::errors::{Result, TimeSignatureError};
use crate::hash::DataHash;
use crate::timestamp::Timestamp;

/// Builds a DER `TimeStampReq` over the given document hash. The request
/// carries only the version and the message imprint; policy, nonce and
/// extensions stay empty.
pub fn prepare_timestamp_request(document_hash: &DataHash) -> Result<Vec<u8>> {
    if document_hash.digest.is_empty() {
        return Err(TimeSignatureError::InvalidArgument("empty document digest"));
    }
    if document_hash.digest.len() != document_hash.algorithm.digest_len() {
        return Err(TimeSignatureError::InvalidArgument(
            "digest length does not match the hash algorithm",
        ));
    }
    let request = TimeStampReq {
        version: 1,
        message_imprint: MessageImprint {
            hash_algorithm: AlgorithmIdentifierOwned {
                oid: document_hash.algorithm.oid(),
                parameters: None,
            },
            hashed_message: OctetString::new(document_hash.digest.as_slice())?,
        },
        req_policy: None,
        nonce: None,
        cert_req: false,
        extensions: None,
    };
    request
        .to_der()
        .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))
}

/// Builds a DER `CertTokenRequest` asking the extender for the long-term
/// material of the round this timestamp was registered in. The round is
/// identified by the shape of the history chain together with the
/// publication identifier.
pub fn prepare_extension_request(timestamp: &Timestamp) -> Result<Vec<u8>> {
    if timestamp.is_extended() {
        return Err(TimeSignatureError::AlreadyExtended);
    }
    let history_identifier = chain::registered_time(timestamp.time_signature())?;
    let request = CertTokenRequest {
        version: 1,
        history_identifier: u64_to_int(history_identifier)?,
        extensions: None,
    };
    request
        .to_der()
        .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))
}
