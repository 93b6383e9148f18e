//! Cloud provider selection and client construction.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Region used when none is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Supported object-store providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    #[default]
    Gcp,
    Aws,
    Azure,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gcp => "gcp",
            Self::Aws => "aws",
            Self::Azure => "azure",
        }
    }

    /// Build a client for `settings.bucket` on this provider.
    ///
    /// No network traffic happens here; bad credentials surface on first use.
    pub fn build_store(self, settings: &CloudSettings) -> StoreResult<Arc<dyn ObjectStore>> {
        let bucket = settings.bucket_name()?;

        let store: Arc<dyn ObjectStore> = match self {
            Self::Gcp => Arc::new(gcp_builder(bucket, settings).build()?),
            Self::Aws => Arc::new(aws_builder(bucket, settings).build()?),
            Self::Azure => Arc::new(azure_builder(bucket, settings)?.build()?),
        };

        debug!(provider = self.as_str(), bucket, "Built object store client");
        Ok(store)
    }
}

impl FromStr for CloudProvider {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gcp" | "google" => Ok(Self::Gcp),
            "aws" | "s3" => Ok(Self::Aws),
            "azure" => Ok(Self::Azure),
            other => Err(StoreError::config(format!(
                "Unsupported cloud provider: {}. Supported providers: gcp, aws, azure",
                other
            ))),
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings shared by all providers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloudSettings {
    pub provider: CloudProvider,
    pub bucket: Option<String>,
    pub project_id: Option<String>,
    /// Service-account path (GCP), `key:secret` (AWS) or connection string (Azure)
    #[serde(skip_serializing)]
    pub credentials: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

impl CloudSettings {
    /// The configured bucket, rejecting missing and blank names
    pub fn bucket_name(&self) -> StoreResult<&str> {
        self.bucket
            .as_deref()
            .map(str::trim)
            .filter(|bucket| !bucket.is_empty())
            .ok_or_else(|| StoreError::config("BUCKET_NAME is required for cloud storage"))
    }
}

fn gcp_builder(bucket: &str, settings: &CloudSettings) -> GoogleCloudStorageBuilder {
    let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);

    if let Some(path) = &settings.credentials {
        builder = builder.with_service_account_path(path);
    }
    if let Some(project) = &settings.project_id {
        debug!(project = %project, "GCP project configured");
    }

    builder
}

fn aws_builder(bucket: &str, settings: &CloudSettings) -> AmazonS3Builder {
    let region = settings.region.as_deref().unwrap_or(DEFAULT_AWS_REGION);
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_region(region);

    if let Some((key, secret)) = settings
        .credentials
        .as_deref()
        .and_then(|credentials| credentials.split_once(':'))
    {
        builder = builder
            .with_access_key_id(key)
            .with_secret_access_key(secret);
    }

    if let Some(endpoint) = &settings.endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(endpoint.starts_with("http://"));
    }

    builder
}

fn azure_builder(bucket: &str, settings: &CloudSettings) -> StoreResult<MicrosoftAzureBuilder> {
    let mut builder = MicrosoftAzureBuilder::from_env().with_container_name(bucket);

    if let Some(connection_string) = &settings.credentials {
        let parsed = AzureConnectionString::parse(connection_string)?;
        builder = builder
            .with_account(parsed.account_name)
            .with_access_key(parsed.account_key);
        if let Some(endpoint) = parsed.blob_endpoint {
            builder = builder
                .with_allow_http(endpoint.starts_with("http://"))
                .with_endpoint(endpoint);
        }
    }

    if let Some(endpoint) = &settings.endpoint {
        builder = builder
            .with_allow_http(endpoint.starts_with("http://"))
            .with_endpoint(endpoint.clone());
    }

    Ok(builder)
}

/// The parts of an Azure storage connection string we use
#[derive(Debug, PartialEq)]
struct AzureConnectionString {
    account_name: String,
    account_key: String,
    blob_endpoint: Option<String>,
}

impl AzureConnectionString {
    fn parse(value: &str) -> StoreResult<Self> {
        let mut account_name = None;
        let mut account_key = None;
        let mut blob_endpoint = None;

        for pair in value.split(';').filter(|pair| !pair.trim().is_empty()) {
            // Keys are base64 and may end in '=', so split on the first one only
            let Some((name, val)) = pair.split_once('=') else {
                continue;
            };
            match name.trim() {
                "AccountName" => account_name = Some(val.trim().to_string()),
                "AccountKey" => account_key = Some(val.trim().to_string()),
                "BlobEndpoint" => blob_endpoint = Some(val.trim().to_string()),
                _ => {}
            }
        }

        match (account_name, account_key) {
            (Some(account_name), Some(account_key)) => Ok(Self {
                account_name,
                account_key,
                blob_endpoint,
            }),
            _ => Err(StoreError::config(
                "Azure connection string must contain AccountName and AccountKey",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AZURITE_KEY: &str =
        "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

    fn settings(provider: CloudProvider) -> CloudSettings {
        CloudSettings {
            provider,
            bucket: Some("h5p-content".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_provider_aliases() {
        assert_eq!("gcp".parse::<CloudProvider>().unwrap(), CloudProvider::Gcp);
        assert_eq!("Google".parse::<CloudProvider>().unwrap(), CloudProvider::Gcp);
        assert_eq!("s3".parse::<CloudProvider>().unwrap(), CloudProvider::Aws);
        assert_eq!("AWS".parse::<CloudProvider>().unwrap(), CloudProvider::Aws);
        assert_eq!("azure".parse::<CloudProvider>().unwrap(), CloudProvider::Azure);
        assert_eq!(CloudProvider::default(), CloudProvider::Gcp);
    }

    #[test]
    fn test_unknown_provider_lists_supported() {
        let err = "dropbox".parse::<CloudProvider>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("dropbox"));
        assert!(message.contains("gcp, aws, azure"));
    }

    #[test]
    fn test_bucket_required() {
        let mut cloud = settings(CloudProvider::Aws);
        cloud.bucket = Some("   ".to_string());
        assert!(matches!(cloud.bucket_name(), Err(StoreError::Config(_))));

        cloud.bucket = None;
        assert!(CloudProvider::Aws.build_store(&cloud).is_err());
    }

    #[test]
    fn test_build_aws_with_static_credentials() {
        let mut cloud = settings(CloudProvider::Aws);
        cloud.credentials = Some("AKIDEXAMPLE:secret".to_string());
        cloud.region = Some("eu-west-1".to_string());
        cloud.endpoint = Some("http://localhost:9000".to_string());

        assert!(CloudProvider::Aws.build_store(&cloud).is_ok());
    }

    #[test]
    fn test_build_azure_from_connection_string() {
        let mut cloud = settings(CloudProvider::Azure);
        cloud.credentials = Some(format!(
            "DefaultEndpointsProtocol=http;AccountName=devstoreaccount1;AccountKey={};BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1;",
            AZURITE_KEY
        ));

        assert!(CloudProvider::Azure.build_store(&cloud).is_ok());
    }

    #[test]
    fn test_parse_connection_string_keeps_key_padding() {
        let parsed = AzureConnectionString::parse(&format!(
            "AccountName=acct;AccountKey={};EndpointSuffix=core.windows.net",
            AZURITE_KEY
        ))
        .unwrap();

        assert_eq!(parsed.account_name, "acct");
        assert_eq!(parsed.account_key, AZURITE_KEY);
        assert_eq!(parsed.blob_endpoint, None);
    }

    #[test]
    fn test_parse_connection_string_requires_account() {
        assert!(AzureConnectionString::parse("AccountKey=abc").is_err());
        assert!(AzureConnectionString::parse("").is_err());
    }
}
