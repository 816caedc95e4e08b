//! Request bodies, in the exact bytes a token is signed over.
//!
//! The verifying side must rebuild the body byte for byte, so GraphQL bodies
//! are produced in one canonical shape:
//!
//! ```text
//! {"query":"<query, newlines replaced by spaces>","variables":{...}}
//! ```

use serde::Serialize;

use crate::KsError;

/// The serialized body of one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestBody(Vec<u8>);

#[derive(Serialize)]
struct GraphqlEnvelope<'a, V> {
    query: &'a str,
    variables: &'a V,
}

impl RequestBody {
    /// A body that is already serialized.
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// A GraphQL operation and its variables.
    ///
    /// Variables serialize in their own field order; a `serde_json::Value`
    /// object serializes with sorted keys.
    pub fn graphql<V: Serialize>(query: &str, variables: &V) -> Result<Self, KsError> {
        let query = normalize_query(query);
        let envelope = GraphqlEnvelope {
            query: &query,
            variables,
        };
        serde_json::to_vec(&envelope)
            .map(Self)
            .map_err(KsError::PayloadError)
    }

    /// A GraphQL operation without variables.
    pub fn graphql_query(query: &str) -> Result<Self, KsError> {
        Self::graphql(query, &serde_json::Map::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

fn normalize_query(query: &str) -> String {
    query.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

impl AsRef<[u8]> for RequestBody {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<&[u8]> for RequestBody {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn graphql_envelope() {
        let body = RequestBody::graphql(
            "query product($id: ID!) {\n  product(id: $id) {\r\n    id\n  }\n}",
            &json!({ "id": "p-1" }),
        )
        .unwrap();
        assert_eq!(
            std::str::from_utf8(body.as_bytes()).unwrap(),
            r#"{"query":"query product($id: ID!) {   product(id: $id) {     id   } }","variables":{"id":"p-1"}}"#
        );
    }

    #[test]
    fn variables_have_a_stable_order() {
        let a = RequestBody::graphql("q", &json!({ "b": 1, "a": { "d": 2, "c": 3 } })).unwrap();
        let b = RequestBody::graphql("q", &json!({ "a": { "c": 3, "d": 2 }, "b": 1 })).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.as_bytes(),
            br#"{"query":"q","variables":{"a":{"c":3,"d":2},"b":1}}"#
        );
    }

    #[test]
    fn query_without_variables() {
        let body = RequestBody::graphql_query("{ healthCheck }").unwrap();
        assert_eq!(
            body.as_bytes(),
            br#"{"query":"{ healthCheck }","variables":{}}"#
        );
    }

    #[test]
    fn unserializable_variables() {
        let mut variables = std::collections::HashMap::new();
        variables.insert(vec![1u8], 1);
        assert!(matches!(
            RequestBody::graphql("q", &variables),
            Err(KsError::PayloadError(_))
        ));
    }
}
