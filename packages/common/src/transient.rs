use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Value filled in by an external collaborator (layout, computed style) that
/// is not part of a node's identity: it never serializes and always compares
/// equal.
#[derive(Debug, Clone)]
pub struct Transient<T>(pub Option<T>);

impl<T> Transient<T> {
    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn set(&mut self, value: T) {
        self.0 = Some(value);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

impl<T> Default for Transient<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> PartialEq for Transient<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Serialize for Transient<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

impl<'de, T> Deserialize<'de> for Transient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(Self(None))
    }
}
