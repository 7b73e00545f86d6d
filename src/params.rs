use serde_json::{Map, Value as JsonValue};

/// Named arguments for a remote procedure call.
///
/// Serialized as a single JSON object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RpcArgs(pub Vec<(String, JsonValue)>);

impl RpcArgs {
    /// Builds named arguments.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<JsonValue>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn to_body(&self) -> JsonValue {
        let map: Map<String, JsonValue> = self.0.iter().cloned().collect();
        JsonValue::Object(map)
    }
}

impl From<()> for RpcArgs {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Vec<(String, JsonValue)>> for RpcArgs {
    fn from(pairs: Vec<(String, JsonValue)>) -> Self {
        Self(pairs)
    }
}

impl<K: Into<String>, V: Into<JsonValue>, const N: usize> From<[(K, V); N]> for RpcArgs {
    fn from(pairs: [(K, V); N]) -> Self {
        Self::named(pairs)
    }
}

/// Equality filter on a named field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

/// Filtered read against a named collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    /// Collection (table or view) name.
    pub collection: String,
    /// Column list passed as `select`.
    pub columns: String,
    /// Equality filters, all of which must match.
    pub filters: Vec<Filter>,
}

impl Query {
    /// Reads every column of `collection` with no filters.
    pub fn table(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            columns: "*".to_owned(),
            filters: Vec::new(),
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Adds a `field = value` filter.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Query string pairs in PostgREST syntax (`field=eq.value`).
    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 1);
        pairs.push(("select".to_owned(), self.columns.clone()));
        for filter in &self.filters {
            pairs.push((filter.field.clone(), format!("eq.{}", filter.value)));
        }
        pairs
    }
}

/// Request descriptor for a single probe.
#[derive(Clone, Debug, PartialEq)]
pub enum ProbeRequest {
    /// Named procedure invocation.
    Rpc { function: String, args: RpcArgs },
    /// Collection read.
    Query(Query),
}
