//! Logical region identifiers.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A logical region, e.g. `us-east-1`.
///
/// Cheap to clone; well-known regions are available as constants in
/// [`regions`] without allocating.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region(Cow<'static, str>);

impl Region {
    /// A region from a static identifier, usable in constants.
    pub const fn from_static(id: &'static str) -> Self {
        Region(Cow::Borrowed(id))
    }

    pub fn new<S: Into<String>>(id: S) -> Self {
        Region(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Region {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Region::new(s))
    }
}

impl From<&str> for Region {
    fn from(s: &str) -> Self {
        Region::new(s)
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Region::new)
    }
}

/// Well-known region constants.
pub mod regions {
    use super::Region;

    pub const US_EAST_1: Region = Region::from_static("us-east-1");
    pub const US_EAST_2: Region = Region::from_static("us-east-2");
    pub const US_WEST_1: Region = Region::from_static("us-west-1");
    pub const US_WEST_2: Region = Region::from_static("us-west-2");
    pub const EU_WEST_1: Region = Region::from_static("eu-west-1");
    pub const EU_CENTRAL_1: Region = Region::from_static("eu-central-1");
    pub const AP_NORTHEAST_1: Region = Region::from_static("ap-northeast-1");
    pub const AP_SOUTHEAST_1: Region = Region::from_static("ap-southeast-1");
    pub const CN_NORTH_1: Region = Region::from_static("cn-north-1");
    pub const US_GOV_WEST_1: Region = Region::from_static("us-gov-west-1");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_compare_with_owned() {
        assert_eq!(regions::US_EAST_1, Region::new("us-east-1"));
        assert_ne!(regions::US_EAST_1, regions::US_WEST_2);
    }

    #[test]
    fn test_display_and_parse() {
        let region: Region = "eu-west-3".parse().unwrap();
        assert_eq!(region.to_string(), "eu-west-3");
    }
}
