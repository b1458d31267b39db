use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Frame dimensions of a media file.
///
/// Serialized as `[width, height]`, or `[]` when no video stream was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    Frame {
        width: u32,
        height: u32,
    },
    #[default]
    Empty,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Resolution::Frame { width, height }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Resolution::Empty)
    }

    /// Returns `(width, height)` if a frame size is known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Resolution::Frame { width, height } => Some((*width, *height)),
            Resolution::Empty => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Frame { width, height } => write!(f, "{}x{}", width, height),
            Resolution::Empty => f.write_str("-"),
        }
    }
}

impl Serialize for Resolution {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Resolution::Frame { width, height } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(width)?;
                seq.serialize_element(height)?;
                seq.end()
            }
            Resolution::Empty => serializer.serialize_seq(Some(0))?.end(),
        }
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ResolutionVisitor)
    }
}

struct ResolutionVisitor;

impl<'de> Visitor<'de> for ResolutionVisitor {
    type Value = Resolution;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an empty list or a [width, height] pair")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        // Les anciens fichiers peuvent contenir des flottants (ex: 1920.0)
        let mut values: Vec<f64> = Vec::with_capacity(2);
        while let Some(value) = seq.next_element::<f64>()? {
            values.push(value);
        }

        match values.as_slice() {
            [] => Ok(Resolution::Empty),
            [width, height] if *width >= 0.0 && *height >= 0.0 => {
                Ok(Resolution::new(*width as u32, *height as u32))
            }
            _ => Err(de::Error::invalid_length(values.len(), &self)),
        }
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if value.is_empty() {
            Ok(Resolution::Empty)
        } else {
            Err(de::Error::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Resolution::Empty)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Resolution::Empty)
    }
}
