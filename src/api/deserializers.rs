use serde::{Deserialize, Deserializer};

/// Deserialize a field that can be either a single item or a vector, but can also be null/missing
pub fn single_or_vec_or_null<'de, T, D>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SingleOrVecOrNull<T> {
        Null,
        Single(T),
        Multiple(Vec<T>),
    }

    match SingleOrVecOrNull::deserialize(deserializer)? {
        SingleOrVecOrNull::Null => Ok(None),
        SingleOrVecOrNull::Single(val) => Ok(Some(vec![val])),
        SingleOrVecOrNull::Multiple(vec) => Ok(Some(vec)),
    }
}

/// Deserialize a scalar into a string; the search tool sends ids and counts
/// as either strings or numbers depending on the backend version
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|s| match s {
        Scalar::Str(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}
