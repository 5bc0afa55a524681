//! Image sources.
//!
//! Images are read from a URL, a local file or an S3 bucket. Loading only fetches the raw bytes;
//! validation happens in [`crate::detect`].
use std::path::PathBuf;

use aws_sdk_s3::error::DisplayErrorContext;
use reqwest::Client;

use crate::error::{AnnotateError, Result};

/// Bucket key that selects every object in the bucket.
pub const ALL_KEYS: &str = "all";

/// Publicly available images to try the tool with.
pub const SAMPLE_IMAGES: [(&str, &str); 3] = [
    (
        "People in a meeting",
        "https://images.unsplash.com/photo-1552664730-d307ca884978?w=800&h=600&fit=crop",
    ),
    (
        "Person with objects",
        "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=800&h=600&fit=crop",
    ),
    (
        "Office scene",
        "https://images.unsplash.com/photo-1497366216548-37526070297c?w=800&h=600&fit=crop",
    ),
];

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ImageSource {
    Url { name: String, url: String },
    File(PathBuf),
    Bucket { bucket: String, key: String },
}

impl ImageSource {
    /// Sources for the built-in sample images.
    pub fn samples() -> Vec<Self> {
        SAMPLE_IMAGES
            .iter()
            .map(|(name, url)| ImageSource::Url {
                name: (*name).to_owned(),
                url: (*url).to_owned(),
            })
            .collect()
    }

    /// Human readable name, also used to derive output file names.
    ///
    /// Files and objects are named by their full path or key, so sources sharing a file name
    /// in different directories get distinct outputs.
    pub fn name(&self) -> String {
        match self {
            ImageSource::Url { name, .. } => name.clone(),
            ImageSource::File(path) => path.display().to_string(),
            ImageSource::Bucket { key, .. } => key.clone(),
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Url { name, url } => write!(f, "{name} ({url})"),
            ImageSource::File(path) => write!(f, "{}", path.display()),
            ImageSource::Bucket { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

/// Fetches the raw bytes of an [`ImageSource`].
pub struct SourceLoader {
    http: Client,
    s3: Option<aws_sdk_s3::Client>,
}

impl SourceLoader {
    /// Create a loader. Without an S3 client, bucket sources fail with
    /// [`AnnotateError::InvalidInput`].
    pub fn new(http: Client, s3: Option<aws_sdk_s3::Client>) -> Self {
        Self { http, s3 }
    }

    pub async fn load(&self, source: &ImageSource) -> Result<Vec<u8>> {
        match source {
            ImageSource::Url { url, .. } => download_bytes(&self.http, url).await,
            ImageSource::File(path) => std::fs::read(path).map_err(|err| {
                AnnotateError::InvalidInput(format!("cannot read {}: {err}", path.display()))
            }),
            ImageSource::Bucket { bucket, key } => self.get_object(bucket, key).await,
        }
    }

    /// Expand a bucket selection into sources. The key [`ALL_KEYS`] lists the whole bucket.
    pub async fn bucket_sources(&self, bucket: &str, key: &str) -> Result<Vec<ImageSource>> {
        if !key.eq_ignore_ascii_case(ALL_KEYS) {
            return Ok(vec![ImageSource::Bucket {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            }]);
        }

        let keys = self.list_keys(bucket).await?;
        if keys.is_empty() {
            return Err(AnnotateError::InvalidInput(format!(
                "no objects found in bucket {bucket}"
            )));
        }

        Ok(keys
            .into_iter()
            .map(|key| ImageSource::Bucket {
                bucket: bucket.to_owned(),
                key,
            })
            .collect())
    }

    fn s3(&self) -> Result<&aws_sdk_s3::Client> {
        self.s3
            .as_ref()
            .ok_or_else(|| AnnotateError::InvalidInput("no bucket client configured".into()))
    }

    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>> {
        let s3 = self.s3()?;
        let mut keys = vec![];
        let mut continuation_token: Option<String> = None;

        loop {
            let output = s3
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|err| {
                    match err.as_service_error().map(|e| e.is_no_such_bucket()) {
                        Some(true) => {
                            AnnotateError::InvalidInput(format!("bucket {bucket} does not exist"))
                        }
                        _ => AnnotateError::RemoteService(format!(
                            "listing bucket {bucket}: {}",
                            DisplayErrorContext(&err)
                        )),
                    }
                })?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_owned),
            );
            log::debug!("Listed {} objects in bucket {}", keys.len(), bucket);

            match output.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_owned()),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = self
            .s3()?
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err.as_service_error().map(|e| e.is_no_such_key()) {
                Some(true) => {
                    AnnotateError::InvalidInput(format!("s3://{bucket}/{key} does not exist"))
                }
                _ => AnnotateError::RemoteService(format!(
                    "fetching s3://{bucket}/{key}: {}",
                    DisplayErrorContext(&err)
                )),
            })?;

        let data = output.body.collect().await.map_err(|err| {
            AnnotateError::RemoteService(format!("reading s3://{bucket}/{key}: {err}"))
        })?;

        Ok(data.into_bytes().to_vec())
    }
}

/// Download the content behind a URL.
pub async fn download_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let bad_url = |err: reqwest::Error| AnnotateError::InvalidInput(format!("{url}: {err}"));

    let resp = client
        .get(url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(bad_url)?;
    let content = resp.bytes().await.map_err(bad_url)?;
    log::debug!("Downloaded {} bytes from {}", content.len(), url);

    Ok(content.to_vec())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_of_sources() {
        let file = ImageSource::File(PathBuf::from("pictures/holiday.jpg"));
        assert_eq!(file.name(), "pictures/holiday.jpg");

        let object = ImageSource::Bucket {
            bucket: "photos".into(),
            key: "2024/team photo.png".into(),
        };
        assert_eq!(object.name(), "2024/team photo.png");
        assert_eq!(object.to_string(), "s3://photos/2024/team photo.png");

        let samples = ImageSource::samples();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].name(), "People in a meeting");
    }

    #[test]
    fn same_file_name_in_different_directories_gets_distinct_outputs() {
        let bucket = |key: &str| ImageSource::Bucket {
            bucket: "photos".into(),
            key: key.into(),
        };
        let sources = [
            ImageSource::File(PathBuf::from("2024/team.png")),
            ImageSource::File(PathBuf::from("2025/team.jpg")),
            bucket("2024/team.png"),
            bucket("2025/team.png"),
        ];

        let mut stems: Vec<String> = sources
            .iter()
            .map(|source| crate::output::clean_filename(&source.name()))
            .collect();
        assert_eq!(stems[0], "2024teampng");
        stems.sort();
        stems.dedup();
        // File and object with the same path share a name, everything else is distinct
        assert_eq!(stems, vec!["2024teampng", "2025teamjpg", "2025teampng"]);
    }

    #[tokio::test]
    async fn load_file_source() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bytes.bin");
        std::fs::write(&path, [1_u8, 2, 3])?;

        let loader = SourceLoader::new(Client::new(), None);
        assert_eq!(loader.load(&ImageSource::File(path)).await?, vec![1, 2, 3]);

        Ok(())
    }

    #[tokio::test]
    async fn missing_file_is_invalid_input() {
        let loader = SourceLoader::new(Client::new(), None);
        let result = loader
            .load(&ImageSource::File(PathBuf::from("/does/not/exist.jpg")))
            .await;

        assert!(matches!(result, Err(AnnotateError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn bucket_without_client_is_invalid_input() -> Result<()> {
        let loader = SourceLoader::new(Client::new(), None);

        // A single key needs no listing
        let sources = loader.bucket_sources("photos", "cat.jpg").await?;
        assert_eq!(sources.len(), 1);

        let result = loader.load(&sources[0]).await;
        assert!(matches!(result, Err(AnnotateError::InvalidInput(_))));

        let result = loader.bucket_sources("photos", "ALL").await;
        assert!(matches!(result, Err(AnnotateError::InvalidInput(_))));

        Ok(())
    }
}
