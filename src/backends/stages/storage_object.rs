// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use futures::StreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, PutMultipartOpts, WriteMultipart};
use serde_json::json;
use std::borrow::Cow;

use crate::backends::object::{join_key, NamedStore, ObjectStores};
use crate::backends::stages::{required_str, FilenamePolicy};
use crate::errors::{ErrorKind, StorageError, StructuredError};
use crate::traits::PostStage;
use crate::types::{fields, Metadata};
use crate::utils::{attribute_value, kebab_case};

/// Parts copied concurrently per record.
const MAX_PARTS_IN_FLIGHT: usize = 4;

/// Copies the temporary object written by `storage_temp_object` to
/// `<path>/<filename>` in the target store, then deletes the temporary object.
pub struct ObjectStorageStage {
    target: NamedStore,
    temp_stores: ObjectStores,
    path: String,
    save_metadata: bool,
    skip_delete_temp: bool,
    policy: FilenamePolicy,
}

impl ObjectStorageStage {
    pub fn new(target: NamedStore, temp_stores: ObjectStores, path: impl Into<String>, policy: FilenamePolicy) -> Self {
        Self {
            target,
            temp_stores,
            path: path.into(),
            save_metadata: false,
            skip_delete_temp: false,
            policy,
        }
    }

    pub fn with_save_metadata(mut self, save_metadata: bool) -> Self {
        self.save_metadata = save_metadata;
        self
    }

    pub fn with_skip_delete_temp(mut self, skip_delete_temp: bool) -> Self {
        self.skip_delete_temp = skip_delete_temp;
        self
    }

    fn temp_location<'a>(&'a self, metadata: &'a Metadata) -> Result<(&'a NamedStore, &'a str), StructuredError> {
        let bucket = required_str(self.name(), metadata, fields::OBJECT_TEMP_BUCKET)?;
        let key = required_str(self.name(), metadata, fields::OBJECT_TEMP_KEY)?;
        let store = self.temp_stores.by_bucket(bucket).ok_or_else(|| {
            StorageError::UnknownBucket(bucket.to_string())
                .into_record_error(self.name(), ErrorKind::UpstreamCopyFailure)
        })?;
        Ok((store, key))
    }

    fn attributes(&self, metadata: &Metadata) -> Attributes {
        let mut attributes = Attributes::new();
        if let Some(content_type) = metadata.content_type() {
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
        }
        if self.save_metadata {
            for (key, value) in metadata.iter() {
                attributes.insert(
                    Attribute::Metadata(Cow::Owned(kebab_case(key))),
                    attribute_value(value).into(),
                );
            }
        }
        attributes
    }

    async fn copy(&self, source: &NamedStore, from: &str, to: &str, attributes: Attributes) -> Result<(), StorageError> {
        let object_error = |action: &'static str, bucket: &str, key: &str| {
            let (bucket, key) = (bucket.to_string(), key.to_string());
            move |source: object_store::Error| StorageError::Object {
                action,
                bucket,
                key,
                source,
            }
        };

        let mut chunks = source
            .store
            .get(&ObjectPath::from(from))
            .await
            .map_err(object_error("Read", &source.bucket, from))?
            .into_stream();

        let upload = self
            .target
            .store
            .put_multipart_opts(
                &ObjectPath::from(to),
                PutMultipartOpts {
                    attributes,
                    ..Default::default()
                },
            )
            .await
            .map_err(object_error("Write", &self.target.bucket, to))?;
        let mut writer = WriteMultipart::new(upload);

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(error) => {
                    let _ = writer.abort().await;
                    return Err(object_error("Read", &source.bucket, from)(error));
                }
            };
            if let Err(error) = writer.wait_for_capacity(MAX_PARTS_IN_FLIGHT).await {
                let _ = writer.abort().await;
                return Err(object_error("Write", &self.target.bucket, to)(error));
            }
            writer.write(&chunk);
        }

        writer
            .finish()
            .await
            .map_err(object_error("Write", &self.target.bucket, to))?;
        Ok(())
    }
}

#[async_trait]
impl PostStage for ObjectStorageStage {
    fn name(&self) -> &'static str {
        "storage_object"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &[
            fields::FILENAME,
            fields::CONTENT_TYPE,
            fields::OBJECT_TEMP_BUCKET,
            fields::OBJECT_TEMP_KEY,
        ]
    }

    fn temp_fields(&self) -> &'static [&'static str] {
        &[fields::OBJECT_TEMP_BUCKET, fields::OBJECT_TEMP_KEY]
    }

    async fn promote(&self, metadata: &Metadata) -> Result<Metadata, StructuredError> {
        let (source, temp_key) = self.temp_location(metadata)?;
        let key = join_key(&self.path, &self.policy.filename_for(metadata));

        self.copy(source, temp_key, &key, self.attributes(metadata))
            .await
            .map_err(|e| e.into_record_error(self.name(), ErrorKind::UpstreamCopyFailure))?;

        Ok([
            (fields::OBJECT_BUCKET, json!(self.target.bucket)),
            (fields::OBJECT_KEY, json!(key)),
        ]
        .into_iter()
        .collect())
    }

    async fn release(&self, metadata: &Metadata) -> Result<(), StructuredError> {
        let delete_failure = |e: StorageError| e.into_record_error(self.name(), ErrorKind::UpstreamDeleteFailure);

        let bucket = required_str(self.name(), metadata, fields::OBJECT_TEMP_BUCKET)?;
        let key = required_str(self.name(), metadata, fields::OBJECT_TEMP_KEY)?;
        let store = self
            .temp_stores
            .by_bucket(bucket)
            .ok_or_else(|| delete_failure(StorageError::UnknownBucket(bucket.to_string())))?;

        match store.store.delete(&ObjectPath::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(source) => Err(delete_failure(StorageError::Object {
                action: "Delete",
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            })),
        }
    }

    fn keeps_temp(&self) -> bool {
        self.skip_delete_temp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionCase;
    use crate::engine::chain::run_stage;
    use crate::types::Record;
    use object_store::memory::InMemory;
    use object_store::{ObjectStore, PutPayload};
    use std::sync::Arc;

    struct Fixture {
        temp: Arc<InMemory>,
        permanent: Arc<InMemory>,
        stores: ObjectStores,
    }

    async fn fixture() -> Fixture {
        let temp = Arc::new(InMemory::new());
        let permanent = Arc::new(InMemory::new());
        temp.put(&ObjectPath::from("tmp/abc"), PutPayload::from_static(b"object bytes"))
            .await
            .unwrap();

        let mut stores = ObjectStores::new();
        stores.insert("scratch", "temp-bucket", temp.clone());
        stores.insert("uploads", "perm-bucket", permanent.clone());
        Fixture {
            temp,
            permanent,
            stores,
        }
    }

    fn stage(fixture: &Fixture) -> ObjectStorageStage {
        let target = fixture.stores.get("uploads").unwrap().clone();
        ObjectStorageStage::new(
            target,
            fixture.stores.clone(),
            "files",
            FilenamePolicy::new(Some("id".into()), ExtensionCase::Preserve),
        )
    }

    fn record() -> Record {
        Record::new(
            0,
            [
                (fields::FILENAME, json!("cat.png")),
                (fields::CONTENT_TYPE, json!("image/png")),
                (fields::OBJECT_TEMP_BUCKET, json!("temp-bucket")),
                (fields::OBJECT_TEMP_KEY, json!("tmp/abc")),
                ("id", json!("u-1")),
                ("sizeBytes", json!(12)),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[tokio::test]
    async fn temp_object_is_copied_then_deleted() {
        let fixture = fixture().await;
        let out = run_stage(&stage(&fixture), record()).await;

        assert!(out.errors.is_none());
        let metadata = out.metadata.unwrap();
        assert_eq!(metadata.get_str(fields::OBJECT_BUCKET), Some("perm-bucket"));
        assert_eq!(metadata.get_str(fields::OBJECT_KEY), Some("files/u-1.png"));
        assert!(!metadata.contains(fields::OBJECT_TEMP_KEY));
        assert!(!metadata.contains(fields::OBJECT_TEMP_BUCKET));

        let stored = fixture.permanent.get(&ObjectPath::from("files/u-1.png")).await.unwrap();
        assert_eq!(stored.attributes.get(&Attribute::ContentType).map(|v| v.as_ref()), Some("image/png"));
        assert_eq!(stored.bytes().await.unwrap().as_ref(), b"object bytes");
        assert!(matches!(
            fixture.temp.head(&ObjectPath::from("tmp/abc")).await,
            Err(object_store::Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn metadata_is_saved_with_kebab_case_names() {
        let fixture = fixture().await;
        run_stage(&stage(&fixture).with_save_metadata(true), record()).await;

        let stored = fixture.permanent.get(&ObjectPath::from("files/u-1.png")).await.unwrap();
        let saved = |name: &'static str| {
            stored
                .attributes
                .get(&Attribute::Metadata(Cow::Borrowed(name)))
                .map(|v| v.as_ref().to_string())
        };
        assert_eq!(saved("size-bytes").as_deref(), Some("12"));
        assert_eq!(saved("content-type").as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn skip_delete_keeps_the_temp_object_and_fields() {
        let fixture = fixture().await;
        let out = run_stage(&stage(&fixture).with_skip_delete_temp(true), record()).await;

        assert!(out.errors.is_none());
        assert!(out.metadata.unwrap().contains(fields::OBJECT_TEMP_KEY));
        assert!(fixture.temp.head(&ObjectPath::from("tmp/abc")).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_temp_bucket_fails_both_calls() {
        let fixture = fixture().await;
        let mut record = record();
        record
            .metadata_mut()
            .insert(fields::OBJECT_TEMP_BUCKET, json!("nobody-has-this"));

        let out = run_stage(&stage(&fixture), record).await;

        let kinds: Vec<ErrorKind> = out.errors.unwrap().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![ErrorKind::UpstreamCopyFailure, ErrorKind::UpstreamDeleteFailure]);
    }

    #[tokio::test]
    async fn missing_temp_object_is_a_copy_failure() {
        let fixture = fixture().await;
        fixture.temp.delete(&ObjectPath::from("tmp/abc")).await.unwrap();

        let out = run_stage(&stage(&fixture), record()).await;

        let errors = out.errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::UpstreamCopyFailure);
        assert!(errors[0].message().contains("temp-bucket/tmp/abc"));
    }
}
