//! Weight readings and the wire record they arrive in

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// One decoded weight value from the scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub weight: f64,
}

impl Reading {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

/// Record published by the scale. Only `weight` is interpreted; other
/// fields the firmware adds are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ScaleMessage {
    #[serde(alias = "Weight")]
    pub weight: WeightValue,
}

/// Scales publish the weight either as a JSON number or as a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WeightValue {
    Number(f64),
    Text(String),
}

impl WeightValue {
    pub fn to_f64(&self) -> Result<f64, DecodeError> {
        let value = match self {
            WeightValue::Number(n) => *n,
            WeightValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| DecodeError::NotANumber(s.clone()))?,
        };
        if !value.is_finite() {
            return Err(DecodeError::NonFinite(value));
        }
        Ok(value)
    }
}

impl TryFrom<ScaleMessage> for Reading {
    type Error = DecodeError;

    fn try_from(message: ScaleMessage) -> Result<Self, Self::Error> {
        Ok(Reading::new(message.weight.to_f64()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_string_weight() {
        assert_eq!(WeightValue::Text(" 12.5 ".into()).to_f64().unwrap(), 12.5);
    }

    #[test]
    fn test_garbage_string_weight() {
        let err = WeightValue::Text("heavy".into()).to_f64().unwrap_err();
        assert!(matches!(err, DecodeError::NotANumber(s) if s == "heavy"));
    }

    #[test]
    fn test_nan_string_rejected() {
        let err = WeightValue::Text("NaN".into()).to_f64().unwrap_err();
        assert!(matches!(err, DecodeError::NonFinite(_)));
    }

    #[test]
    fn test_negative_weight_allowed() {
        // tare drift
        assert_eq!(WeightValue::Number(-0.3).to_f64().unwrap(), -0.3);
    }
}
