use serde::{Deserialize, Deserializer};

/// Deserialize an `f64` from either a JSON number or a numeric string.
pub fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(value) => Ok(value),
        NumOrStr::Str(value) => value.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Deserialize an `i64` from a JSON integer, float, or numeric string.
///
/// Providers report epoch timestamps in all three shapes.
pub fn flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntShape {
        Int(i64),
        Float(f64),
        Str(String),
    }

    match IntShape::deserialize(deserializer)? {
        IntShape::Int(value) => Ok(value),
        IntShape::Float(value) => Ok(value as i64),
        IntShape::Str(value) => value.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "super::flexible_f64")]
        price: f64,
        #[serde(deserialize_with = "super::flexible_i64")]
        time: i64,
    }

    #[test]
    fn test_flexible_numbers() {
        struct TestCase {
            input: &'static str,
            expected: Probe,
        }

        let tests = vec![
            // TC0: native number shapes
            TestCase {
                input: r#"{ "price": 0.55, "time": 1700000000 }"#,
                expected: Probe {
                    price: 0.55,
                    time: 1700000000,
                },
            },
            // TC1: string shapes
            TestCase {
                input: r#"{ "price": "0.55", "time": "1700000000" }"#,
                expected: Probe {
                    price: 0.55,
                    time: 1700000000,
                },
            },
            // TC2: float epoch truncates
            TestCase {
                input: r#"{ "price": "1", "time": 1700000000.9 }"#,
                expected: Probe {
                    price: 1.0,
                    time: 1700000000,
                },
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = serde_json::from_str::<Probe>(test.input).unwrap();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
