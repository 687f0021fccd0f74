//! Partitions: region groups sharing a DNS suffix.

use crate::region::Region;

/// A partition groups regions that share a DNS suffix for computed
/// endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    id: &'static str,
    dns_suffix: &'static str,
    region_prefixes: &'static [&'static str],
}

impl Partition {
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// DNS suffix appended to computed endpoints, e.g. `amazonaws.com`.
    pub fn dns_suffix(&self) -> &'static str {
        self.dns_suffix
    }

    fn matches(&self, region: &Region) -> bool {
        self.region_prefixes
            .iter()
            .any(|prefix| region.as_str().starts_with(prefix))
    }
}

/// The commercial partition; also the fallback for unrecognized regions.
pub const AWS: Partition = Partition {
    id: "aws",
    dns_suffix: "amazonaws.com",
    region_prefixes: &["us-", "eu-", "ap-", "sa-", "ca-", "me-", "af-", "il-"],
};

pub const AWS_CN: Partition = Partition {
    id: "aws-cn",
    dns_suffix: "amazonaws.com.cn",
    region_prefixes: &["cn-"],
};

pub const AWS_US_GOV: Partition = Partition {
    id: "aws-us-gov",
    dns_suffix: "amazonaws.com",
    region_prefixes: &["us-gov-"],
};

/// All known partitions, most specific prefix first.
const PARTITIONS: &[Partition] = &[AWS_US_GOV, AWS_CN, AWS];

/// The partition a region belongs to; unrecognized regions fall back to
/// the commercial partition.
pub fn partition_for(region: &Region) -> &'static Partition {
    PARTITIONS
        .iter()
        .find(|p| p.matches(region))
        .unwrap_or(&AWS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::regions;

    #[test]
    fn test_commercial_regions() {
        assert_eq!(partition_for(&regions::US_EAST_1).id(), "aws");
        assert_eq!(partition_for(&regions::EU_CENTRAL_1).id(), "aws");
    }

    #[test]
    fn test_china_partition() {
        let partition = partition_for(&regions::CN_NORTH_1);
        assert_eq!(partition.id(), "aws-cn");
        assert_eq!(partition.dns_suffix(), "amazonaws.com.cn");
    }

    #[test]
    fn test_gov_partition_wins_over_us_prefix() {
        assert_eq!(partition_for(&regions::US_GOV_WEST_1).id(), "aws-us-gov");
    }

    #[test]
    fn test_unknown_region_falls_back() {
        assert_eq!(partition_for(&Region::new("xx-mystery-1")).id(), "aws");
    }
}
