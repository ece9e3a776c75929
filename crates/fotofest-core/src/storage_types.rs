use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage tiers, ranked by priority.
///
/// `Object` is the primary tier, `Drive` the secondary tier (and the
/// archival destination), `Local` the last-resort tier on the application
/// host. The enum is defined in core because configuration and persisted
/// upload results both reference it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    Object,
    Drive,
    Local,
}

impl StorageTier {
    /// The fixed fallback order a failed write cascades through.
    pub const fn cascade_order() -> [StorageTier; 3] {
        [StorageTier::Object, StorageTier::Drive, StorageTier::Local]
    }
}

impl FromStr for StorageTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "object" => Ok(StorageTier::Object),
            "drive" => Ok(StorageTier::Drive),
            "local" => Ok(StorageTier::Local),
            _ => Err(anyhow::anyhow!("Invalid storage tier: {}", s)),
        }
    }
}

impl Display for StorageTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageTier::Object => write!(f, "object"),
            StorageTier::Drive => write!(f, "drive"),
            StorageTier::Local => write!(f, "local"),
        }
    }
}

/// Named quality/dimension profile applied before a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionClass {
    Premium,
    Standard,
    Thumbnail,
}

impl FromStr for CompressionClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "premium" => Ok(CompressionClass::Premium),
            "standard" => Ok(CompressionClass::Standard),
            "thumbnail" => Ok(CompressionClass::Thumbnail),
            _ => Err(anyhow::anyhow!("Invalid compression class: {}", s)),
        }
    }
}

impl Display for CompressionClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CompressionClass::Premium => write!(f, "premium"),
            CompressionClass::Standard => write!(f, "standard"),
            CompressionClass::Thumbnail => write!(f, "thumbnail"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_str() {
        assert_eq!("object".parse::<StorageTier>().unwrap(), StorageTier::Object);
        assert_eq!("DRIVE".parse::<StorageTier>().unwrap(), StorageTier::Drive);
        assert_eq!("local".parse::<StorageTier>().unwrap(), StorageTier::Local);
        assert!("nfs".parse::<StorageTier>().is_err());
    }

    #[test]
    fn test_cascade_order_is_priority_order() {
        assert_eq!(
            StorageTier::cascade_order(),
            [StorageTier::Object, StorageTier::Drive, StorageTier::Local]
        );
    }

    #[test]
    fn test_compression_class_round_trip() {
        for class in [
            CompressionClass::Premium,
            CompressionClass::Standard,
            CompressionClass::Thumbnail,
        ] {
            assert_eq!(class.to_string().parse::<CompressionClass>().unwrap(), class);
        }
    }
}
