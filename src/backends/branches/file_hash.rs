// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::backends::branches::no_payload;
use crate::config::{HashAlgorithm, HashEncoding};
use crate::traits::Branch;
use crate::types::{BranchItem, PartialResult};

enum Hasher {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(hasher) => hasher.update(data),
            Hasher::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finish(self, encoding: HashEncoding) -> String {
        match (self, encoding) {
            (Hasher::Sha256(hasher), HashEncoding::Hex) => format!("{:x}", hasher.finalize()),
            (Hasher::Sha256(hasher), HashEncoding::Base64) => STANDARD.encode(hasher.finalize()),
            (Hasher::Blake3(hasher), HashEncoding::Hex) => hasher.finalize().to_hex().to_string(),
            (Hasher::Blake3(hasher), HashEncoding::Base64) => STANDARD.encode(hasher.finalize().as_bytes()),
        }
    }
}

/// Digest of the whole payload, stored under the algorithm's name.
pub struct FileHashBranch {
    algorithm: HashAlgorithm,
    encoding: HashEncoding,
}

impl FileHashBranch {
    pub fn new(algorithm: HashAlgorithm, encoding: HashEncoding) -> Self {
        Self {
            algorithm,
            encoding,
        }
    }
}

#[async_trait]
impl Branch for FileHashBranch {
    async fn process(&self, item: BranchItem) -> PartialResult {
        let Some(mut reader) = item.payload else {
            return PartialResult::with_error(no_payload(self.name()));
        };

        let mut hasher = Hasher::new(self.algorithm);
        loop {
            match reader.next_chunk().await {
                Ok(Some(chunk)) => hasher.update(&chunk),
                Ok(None) => break,
                Err(_) => return PartialResult::empty(),
            }
        }

        let digest = hasher.finish(self.encoding);
        PartialResult::with_metadata([(self.algorithm.as_str(), json!(digest))].into_iter().collect())
    }

    fn name(&self) -> &'static str {
        "file_hash"
    }
}
