use serde::{Deserialize, Serialize};

/// A single QR payment received by the merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender label as shown by the portal
    #[serde(default)]
    pub from: String,
    /// Decimal amount, kept as the portal formats it
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub amount: String,
    #[serde(default)]
    pub time: String,
    /// Retrieval reference number, absent for some payment networks
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub rrn: Option<String>,
}

// Transaction listing response. `status` is carried but not validated:
// the portal has been seen returning lists regardless of it.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionListResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub message: Option<String>,
}

// Helper to deserialize string or number as String
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct StringOrNumberVisitor;

    impl<'de> de::Visitor<'de> for StringOrNumberVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StringOrNumberVisitor)
}

// Empty strings and nulls both mean "no value"
fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn deserialize_null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Transaction>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<Vec<Transaction>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
