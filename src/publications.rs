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

//! The publications lookup consumed by verification.
//!
//! Parsing and authenticating the publications file itself (including
//! tracing its signing key to a CA) is the embedding application's job;
//! verification only ever asks it for published data by identifier and
//! for the published key hashes.

use crate::asn1::PublishedData;

/// A published hash of a gateway signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHash {
    /// Data imprint of the key: algorithm id byte followed by the digest
    /// of the DER-encoded subject public key info.
    pub imprint: Vec<u8>,
    /// The moment the key was published, in epoch seconds.
    pub publication_time: i64,
}

/// Read access to an already verified publications file.
pub trait PublicationsOracle {
    /// Published data recorded for the given publication identifier, or
    /// `None` when the file holds no such trust point.
    fn published_data(&self, publication_identifier: u64) -> Option<PublishedData>;

    /// All published key hashes.
    fn key_hashes(&self) -> Vec<KeyHash>;
}
