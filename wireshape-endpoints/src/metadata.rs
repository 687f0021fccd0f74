//! Per-service endpoint metadata and resolution.
//!
//! A [`ServiceEndpointMetadata`] holds a service's endpoint prefix and its
//! override tables, built once at startup and shared read-only. Both
//! resolver functions are pure: an override-table hit returns the
//! override verbatim, a miss computes the deterministic default.

use std::collections::HashMap;

use http::Uri;
use serde::{Deserialize, Serialize};

use crate::error::EndpointError;
use crate::partition::partition_for;
use crate::region::Region;

/// Endpoint and signing-region metadata for one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpointMetadata {
    endpoint_prefix: String,
    #[serde(default)]
    region_overridden_endpoints: HashMap<Region, String>,
    #[serde(default)]
    signing_region_overrides: HashMap<Region, Region>,
    #[serde(default)]
    regions: Vec<Region>,
}

impl ServiceEndpointMetadata {
    /// Start building metadata for the service with the given endpoint
    /// prefix (e.g. `sts`, `streams.dynamodb`).
    pub fn builder<S: Into<String>>(endpoint_prefix: S) -> ServiceEndpointMetadataBuilder {
        ServiceEndpointMetadataBuilder {
            endpoint_prefix: endpoint_prefix.into(),
            region_overridden_endpoints: HashMap::new(),
            signing_region_overrides: HashMap::new(),
            regions: Vec::new(),
        }
    }

    pub fn endpoint_prefix(&self) -> &str {
        &self.endpoint_prefix
    }

    /// Regions this service is known to operate in.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// The HTTP endpoint for a region.
    ///
    /// An override-table entry is returned exactly as configured;
    /// otherwise the endpoint is `{prefix}.{region}.{dns_suffix}` with the
    /// DNS suffix taken from the region's partition.
    ///
    /// # Errors
    /// Fails only when the configured or composed host is not a valid URI.
    pub fn endpoint_for(&self, region: &Region) -> Result<Uri, EndpointError> {
        let host = match self.region_overridden_endpoints.get(region) {
            Some(host) => host.clone(),
            None => format!(
                "{}.{}.{}",
                self.endpoint_prefix,
                region,
                partition_for(region).dns_suffix()
            ),
        };

        host.parse::<Uri>()
            .map_err(|source| EndpointError::InvalidEndpoint { host, source })
    }

    /// The region requests should be signed for.
    ///
    /// An override-table entry is returned; otherwise the region is
    /// returned unchanged.
    pub fn signing_region_for(&self, region: &Region) -> Region {
        self.signing_region_overrides
            .get(region)
            .cloned()
            .unwrap_or_else(|| region.clone())
    }
}

/// Builder for [`ServiceEndpointMetadata`].
#[derive(Debug)]
pub struct ServiceEndpointMetadataBuilder {
    endpoint_prefix: String,
    region_overridden_endpoints: HashMap<Region, String>,
    signing_region_overrides: HashMap<Region, Region>,
    regions: Vec<Region>,
}

impl ServiceEndpointMetadataBuilder {
    /// Register a region this service operates in.
    pub fn region(mut self, region: Region) -> Self {
        self.regions.push(region);
        self
    }

    /// Override the endpoint host for one region.
    pub fn endpoint_override<S: Into<String>>(mut self, region: Region, host: S) -> Self {
        self.region_overridden_endpoints.insert(region, host.into());
        self
    }

    /// Override the signing region for one region.
    pub fn signing_region_override(mut self, region: Region, signing_region: Region) -> Self {
        self.signing_region_overrides.insert(region, signing_region);
        self
    }

    pub fn build(self) -> ServiceEndpointMetadata {
        ServiceEndpointMetadata {
            endpoint_prefix: self.endpoint_prefix,
            region_overridden_endpoints: self.region_overridden_endpoints,
            signing_region_overrides: self.signing_region_overrides,
            regions: self.regions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::regions;

    fn iam_like_metadata() -> ServiceEndpointMetadata {
        ServiceEndpointMetadata::builder("iam")
            .region(regions::US_EAST_1)
            .region(regions::CN_NORTH_1)
            .endpoint_override(regions::US_EAST_1, "iam.amazonaws.com")
            .signing_region_override(regions::US_EAST_1, Region::new("us-east-1"))
            .build()
    }

    #[test]
    fn test_endpoint_override_returned_exactly() {
        let metadata = iam_like_metadata();
        let uri = metadata.endpoint_for(&regions::US_EAST_1).unwrap();
        assert_eq!(uri.to_string(), "iam.amazonaws.com");
    }

    #[test]
    fn test_endpoint_computed_default() {
        let metadata = iam_like_metadata();
        let uri = metadata.endpoint_for(&regions::US_WEST_2).unwrap();
        assert_eq!(uri.to_string(), "iam.us-west-2.amazonaws.com");
    }

    #[test]
    fn test_endpoint_uses_partition_dns_suffix() {
        let metadata = iam_like_metadata();
        let uri = metadata.endpoint_for(&regions::CN_NORTH_1).unwrap();
        assert_eq!(uri.to_string(), "iam.cn-north-1.amazonaws.com.cn");
    }

    #[test]
    fn test_signing_region_override() {
        let metadata = ServiceEndpointMetadata::builder("cloudfront")
            .endpoint_override(Region::new("aws-global"), "cloudfront.amazonaws.com")
            .signing_region_override(Region::new("aws-global"), regions::US_EAST_1)
            .build();

        assert_eq!(
            metadata.signing_region_for(&Region::new("aws-global")),
            regions::US_EAST_1
        );
    }

    #[test]
    fn test_signing_region_passthrough() {
        let metadata = iam_like_metadata();
        assert_eq!(
            metadata.signing_region_for(&regions::EU_WEST_1),
            regions::EU_WEST_1
        );
    }

    #[test]
    fn test_deserialize_from_partition_document() {
        let metadata: ServiceEndpointMetadata = serde_json::from_str(
            r#"{
                "endpoint_prefix": "sts",
                "region_overridden_endpoints": { "us-gov-west-1": "sts.us-gov-west-1.amazonaws.com" },
                "signing_region_overrides": {},
                "regions": ["us-east-1", "us-gov-west-1"]
            }"#,
        )
        .unwrap();

        assert_eq!(metadata.endpoint_prefix(), "sts");
        assert_eq!(metadata.regions().len(), 2);
        let uri = metadata.endpoint_for(&regions::US_GOV_WEST_1).unwrap();
        assert_eq!(uri.to_string(), "sts.us-gov-west-1.amazonaws.com");
    }
}
