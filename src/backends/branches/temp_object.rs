// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use object_store::path::Path as ObjectPath;
use object_store::WriteMultipart;
use serde_json::json;
use uuid::Uuid;

use crate::backends::branches::no_payload;
use crate::backends::object::{join_key, NamedStore};
use crate::errors::{ErrorKind, StructuredError};
use crate::traits::Branch;
use crate::types::{fields, BranchItem, PartialResult};

/// Parts uploaded concurrently per item.
const MAX_PARTS_IN_FLIGHT: usize = 4;

/// Streams the payload into a temporary object at `<path>/<uuid>` and references
/// it as `objectTempBucket` + `objectTempKey`.
pub struct TempObjectBranch {
    target: NamedStore,
    prefix: String,
}

impl TempObjectBranch {
    pub fn new(target: NamedStore, prefix: impl Into<String>) -> Self {
        Self {
            target,
            prefix: prefix.into(),
        }
    }

    fn upload_failure(&self, key: &str, error: impl std::fmt::Display) -> PartialResult {
        PartialResult::with_error(StructuredError::new(
            ErrorKind::UpstreamUploadFailure,
            format!(
                "Failed to upload temporary object '{}/{}': {}",
                self.target.bucket, key, error
            ),
        ))
    }
}

#[async_trait]
impl Branch for TempObjectBranch {
    async fn process(&self, item: BranchItem) -> PartialResult {
        let Some(mut reader) = item.payload else {
            return PartialResult::with_error(no_payload(self.name()));
        };

        let key = join_key(&self.prefix, &Uuid::new_v4().to_string());
        let location = ObjectPath::from(key.as_str());

        let upload = match self.target.store.put_multipart(&location).await {
            Ok(upload) => upload,
            Err(error) => {
                reader.abandon();
                return self.upload_failure(&key, error);
            }
        };
        let mut writer = WriteMultipart::new(upload);

        loop {
            match reader.next_chunk().await {
                Ok(Some(chunk)) => {
                    if let Err(error) = writer.wait_for_capacity(MAX_PARTS_IN_FLIGHT).await {
                        reader.abandon();
                        let _ = writer.abort().await;
                        return self.upload_failure(&key, error);
                    }
                    writer.write(&chunk);
                }
                Ok(None) => break,
                Err(_) => {
                    // Nothing was committed, so there is nothing to hand off.
                    let _ = writer.abort().await;
                    return PartialResult::empty();
                }
            }
        }

        match writer.finish().await {
            Ok(_) => PartialResult::with_metadata(
                [
                    (fields::OBJECT_TEMP_BUCKET, json!(self.target.bucket)),
                    (fields::OBJECT_TEMP_KEY, json!(key)),
                ]
                .into_iter()
                .collect(),
            ),
            Err(error) => self.upload_failure(&key, error),
        }
    }

    fn name(&self) -> &'static str {
        "storage_temp_object"
    }
}
