//! Serde support, (de)serializing as the short format name.

use crate::Compression;
use ::serde::de::{Deserialize, Deserializer, Error as DeError};
use ::serde::ser::{Serialize, Serializer};

impl Serialize for Compression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Compression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(|_| D::Error::custom(format!("unsupported compression format `{name}`")))
    }
}
