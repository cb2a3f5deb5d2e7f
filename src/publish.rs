// File: ./src/publish.rs
//! Uploads the rendered lockscreen to object storage, publicly readable.
//!
//! `publish` never fails: every problem becomes a logged reason and `false`.
//! The local image is left untouched either way.
use crate::config::AwsConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use std::future::Future;
use std::path::{Path, PathBuf};

pub const PUBLIC_READ_ACL: &str = "public-read";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    FileMissing(PathBuf),
    /// Credentials absent from the config, or rejected by the service.
    MissingCredentials,
    NoSuchBucket(String),
    AccessDenied,
    Service { code: String, message: String },
    Transport(String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::FileMissing(path) => write!(f, "File not found: {}", path.display()),
            UploadError::MissingCredentials => write!(f, "AWS credentials not found or invalid"),
            UploadError::NoSuchBucket(bucket) => write!(f, "Bucket '{}' does not exist", bucket),
            UploadError::AccessDenied => write!(f, "Access denied. Check your AWS permissions"),
            UploadError::Service { code, message } => {
                write!(f, "S3 error ({}): {}", code, message)
            }
            UploadError::Transport(msg) => write!(f, "Upload failed: {}", msg),
        }
    }
}

impl std::error::Error for UploadError {}

/// One object write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRequest {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub acl: String,
    pub cache_control: String,
}

/// Anything that can store an object under a bucket/key.
pub trait ObjectStore {
    fn put_object(&self, req: &PutRequest) -> impl Future<Output = Result<(), UploadError>> + Send;
}

/// Amazon S3 (or a compatible endpoint) with static credentials from the config.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn from_config(aws: &AwsConfig) -> Result<Self, UploadError> {
        if aws.access_key_id.trim().is_empty() || aws.secret_access_key.trim().is_empty() {
            return Err(UploadError::MissingCredentials);
        }

        let credentials = Credentials::new(
            aws.access_key_id.clone(),
            aws.secret_access_key.clone(),
            None,
            None,
            "lockcal-config",
        );
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(aws.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = aws.endpoint_url.as_deref().filter(|e| !e.trim().is_empty()) {
            log::debug!("Using S3 endpoint override {}", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
        })
    }
}

impl ObjectStore for S3Store {
    async fn put_object(&self, req: &PutRequest) -> Result<(), UploadError> {
        let result = self
            .client
            .put_object()
            .bucket(&req.bucket)
            .key(&req.key)
            .body(ByteStream::from(req.body.clone()))
            .content_type(&req.content_type)
            .acl(ObjectCannedAcl::from(req.acl.as_str()))
            .cache_control(&req.cache_control)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => Err(classify_sdk_error(&req.bucket, err)),
        }
    }
}

fn classify_sdk_error<E, R>(bucket: &str, err: SdkError<E, R>) -> UploadError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.as_service_error() {
        Some(service) => classify_code(
            bucket,
            service.code().unwrap_or("Unknown"),
            service.message().unwrap_or_default(),
        ),
        None => UploadError::Transport(DisplayErrorContext(&err).to_string()),
    }
}

/// Map an S3 error code onto the failure taxonomy.
pub fn classify_code(bucket: &str, code: &str, message: &str) -> UploadError {
    match code {
        "NoSuchBucket" => UploadError::NoSuchBucket(bucket.to_string()),
        "AccessDenied" | "AllAccessDisabled" | "AccessControlListNotSupported" => {
            UploadError::AccessDenied
        }
        "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken" => {
            UploadError::MissingCredentials
        }
        _ => UploadError::Service {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

pub fn public_url(bucket: &str, key: &str) -> String {
    format!("https://{}.s3.amazonaws.com/{}", bucket, key)
}

/// Upload `local_path` as `bucket/key`. Returns the public URL.
pub async fn try_publish<S: ObjectStore>(
    store: &S,
    bucket: &str,
    local_path: &Path,
    key: &str,
    cache_max_age_secs: u32,
) -> Result<String, UploadError> {
    if !local_path.is_file() {
        return Err(UploadError::FileMissing(local_path.to_path_buf()));
    }
    let body = tokio::fs::read(local_path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => UploadError::FileMissing(local_path.to_path_buf()),
        _ => UploadError::Transport(format!("Failed to read {}: {}", local_path.display(), e)),
    })?;

    let req = PutRequest {
        bucket: bucket.to_string(),
        key: key.to_string(),
        body,
        content_type: content_type_for(local_path).to_string(),
        acl: PUBLIC_READ_ACL.to_string(),
        cache_control: format!("max-age={}", cache_max_age_secs),
    };
    log::debug!(
        "PUT s3://{}/{} ({} bytes, {})",
        req.bucket,
        req.key,
        req.body.len(),
        req.content_type
    );
    store.put_object(&req).await?;
    Ok(public_url(bucket, key))
}

/// Upload to S3 and log the outcome. `key` defaults to the configured object key.
pub async fn publish(aws: &AwsConfig, local_path: &Path, key: Option<&str>) -> bool {
    let key = key.unwrap_or(&aws.object_key);

    if !local_path.is_file() {
        log::error!("{}", UploadError::FileMissing(local_path.to_path_buf()));
        return false;
    }

    let store = match S3Store::from_config(aws) {
        Ok(store) => store,
        Err(e) => {
            log::error!("{}", e);
            return false;
        }
    };

    log::info!("Uploading {} to s3://{}/{}", local_path.display(), aws.bucket_name, key);
    match try_publish(&store, &aws.bucket_name, local_path, key, aws.cache_max_age_secs).await {
        Ok(url) => {
            log::info!("Successfully uploaded to S3: {}", url);
            true
        }
        Err(e) => {
            log::error!("{}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_codes() {
        assert_eq!(
            classify_code("b", "NoSuchBucket", ""),
            UploadError::NoSuchBucket("b".to_string())
        );
        assert_eq!(classify_code("b", "AccessDenied", ""), UploadError::AccessDenied);
        assert_eq!(
            classify_code("b", "InvalidAccessKeyId", ""),
            UploadError::MissingCredentials
        );
        assert!(matches!(
            classify_code("b", "SlowDown", "Reduce your request rate"),
            UploadError::Service { ref code, .. } if code == "SlowDown"
        ));
    }

    #[test]
    fn test_content_type_and_url() {
        assert_eq!(content_type_for(Path::new("out/lockscreen.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("lockscreen.png")), "image/png");
        assert_eq!(content_type_for(Path::new("lockscreen")), "application/octet-stream");
        assert_eq!(
            public_url("my-bucket", "lockscreen.jpg"),
            "https://my-bucket.s3.amazonaws.com/lockscreen.jpg"
        );
    }

    #[test]
    fn test_blank_credentials_rejected() {
        let aws = crate::config::Config::default().aws;
        assert_eq!(S3Store::from_config(&aws).unwrap_err(), UploadError::MissingCredentials);
    }
}
