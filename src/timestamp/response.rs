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

//! Gateway response handling.

use cms::signed_data::SignedData;
use der::Decode;

use crate::asn1::{bit_string_bit, pki_failure, pki_status, PkiStatusInfo, TimeStampResp,
    ID_SIGNED_DATA};
use crate::errors::{Result, TimeSignatureError};
use crate::timestamp::Timestamp;

/// Decodes a stamping gateway response into a short-term timestamp.
/// The enclosed token is adopted by move; no signature verification
/// happens here — that is the verify path's job.
pub fn create_timestamp(response: &[u8]) -> Result<Timestamp> {
    if response.is_empty() {
        return Err(TimeSignatureError::InvalidArgument("empty response"));
    }
    let response = TimeStampResp::from_der(response)?;
    analyse_response_status(&response.status)?;
    let token = response.time_stamp_token.ok_or_else(|| {
        TimeSignatureError::InvalidFormat(
            "response status is granted but the timestamp token is missing".into(),
        )
    })?;
    if token.content_type != ID_SIGNED_DATA {
        return Err(TimeSignatureError::InvalidFormat(
            "timestamp token is not CMS SignedData".into(),
        ));
    }
    let signed_data: SignedData = token.content.decode_as()?;
    Timestamp::from_signed_data(signed_data)
}

/// Maps a gateway `PKIStatusInfo` to success or a protocol error.
/// `granted` and `grantedWithMods` both succeed; otherwise the first set
/// failure-info bit decides the error kind.
pub(crate) fn analyse_response_status(status: &PkiStatusInfo) -> Result<()> {
    if status.status == pki_status::GRANTED || status.status == pki_status::GRANTED_WITH_MODS {
        return Ok(());
    }
    tracing::debug!(status = status.status, "gateway refused the request");
    if let Some(fail_info) = &status.fail_info {
        let mapping = [
            (pki_failure::BAD_ALG, TimeSignatureError::PkiBadAlg),
            (pki_failure::BAD_REQUEST, TimeSignatureError::PkiBadRequest),
            (
                pki_failure::BAD_DATA_FORMAT,
                TimeSignatureError::PkiBadDataFormat,
            ),
            (
                pki_failure::UNACCEPTED_POLICY,
                TimeSignatureError::UnacceptedPolicy,
            ),
            (
                pki_failure::UNACCEPTED_EXTENSION,
                TimeSignatureError::ProtocolMismatch,
            ),
            (
                pki_failure::SYSTEM_FAILURE,
                TimeSignatureError::PkiSystemFailure,
            ),
            (
                pki_failure::EXTEND_LATER,
                TimeSignatureError::NonstdExtendLater,
            ),
            (
                pki_failure::EXTENSION_OVERDUE,
                TimeSignatureError::NonstdExtensionOverdue,
            ),
        ];
        for (bit, error) in mapping {
            if bit_string_bit(fail_info, bit) {
                return Err(error);
            }
        }
    }
    Err(TimeSignatureError::Unknown)
}
