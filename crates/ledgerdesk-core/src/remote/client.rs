//! GraphQL over HTTP.

use super::decode::{decode_list_page, decode_record};
use super::{graphql, RemoteService, Variables};
use crate::error::RemoteError;
use crate::interceptor::RequestInterceptor;
use crate::models::{ListPage, RecordSnapshot};
use crate::schema::ResourceSchema;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: &'a Variables,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
    #[serde(default)]
    extensions: Option<Value>,
}

/// [`RemoteService`] backed by a GraphQL endpoint. Every request goes
/// through the interceptor, so the session credential is always current.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http: Client,
    endpoint: Url,
    interceptor: RequestInterceptor,
}

impl GraphqlClient {
    pub fn new(endpoint: Url, interceptor: RequestInterceptor) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            interceptor,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Run one document and return its `data` object.
    pub async fn execute(&self, query: &str, variables: &Variables) -> Result<Value, RemoteError> {
        let request = self
            .interceptor
            .decorate(self.http.post(self.endpoint.clone()))
            .json(&GraphqlRequest { query, variables });

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        tracing::debug!("GraphQL response {} ({} bytes)", status, body.len());
        interpret_response(status, &body)
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Transport("request timed out".to_string())
    } else {
        RemoteError::Transport(err.to_string())
    }
}

/// Classify an HTTP status and body into data or a [`RemoteError`].
pub fn interpret_response(status: u16, body: &str) -> Result<Value, RemoteError> {
    let parsed = serde_json::from_str::<GraphqlResponse>(body);

    if status == 401 || status == 403 {
        let message = parsed
            .ok()
            .and_then(|p| p.errors.into_iter().next())
            .map(|e| e.message)
            .unwrap_or_else(|| "Unauthorized".to_string());
        return Err(RemoteError::Unauthenticated(message));
    }

    let success = (200..300).contains(&status);
    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(err) if success => return Err(RemoteError::Decode(err.to_string())),
        Err(_) => return Err(RemoteError::Transport(format!("service returned HTTP {status}"))),
    };

    if let Some(error) = parsed.errors.into_iter().next() {
        return Err(classify(error));
    }
    if !success {
        return Err(RemoteError::Transport(format!("service returned HTTP {status}")));
    }

    parsed
        .data
        .filter(|data| !data.is_null())
        .ok_or_else(|| RemoteError::Decode("response carried no data".to_string()))
}

fn classify(error: GraphqlError) -> RemoteError {
    let code = error
        .extensions
        .as_ref()
        .and_then(|ext| ext.get("code"))
        .and_then(Value::as_str);

    if matches!(code, Some("UNAUTHENTICATED") | Some("FORBIDDEN"))
        || error.message.eq_ignore_ascii_case("unauthorized")
    {
        RemoteError::Unauthenticated(error.message)
    } else {
        RemoteError::Rejected(error.message)
    }
}

fn field<'a>(data: &'a Value, operation: &str) -> Result<&'a Value, RemoteError> {
    data.get(operation)
        .ok_or_else(|| RemoteError::Decode(format!("response is missing {operation}")))
}

#[async_trait]
impl RemoteService for GraphqlClient {
    async fn list(&self, schema: &'static ResourceSchema) -> Result<ListPage, RemoteError> {
        let data = self.execute(&graphql::list_query(schema), &Variables::new()).await?;
        decode_list_page(schema, &data)
    }

    async fn create(
        &self,
        schema: &'static ResourceSchema,
        variables: Variables,
    ) -> Result<RecordSnapshot, RemoteError> {
        let data = self.execute(&graphql::create_mutation(schema), &variables).await?;
        decode_record(schema, field(&data, schema.create_mutation)?)
    }

    async fn update(
        &self,
        schema: &'static ResourceSchema,
        id: &str,
        mut variables: Variables,
    ) -> Result<RecordSnapshot, RemoteError> {
        let (Some(operation), Some(document)) = (schema.update_mutation, graphql::update_mutation(schema)) else {
            return Err(RemoteError::Rejected(format!("{} records cannot be edited", schema.label)));
        };
        variables.insert("id".to_string(), Value::String(id.to_string()));
        let data = self.execute(&document, &variables).await?;
        decode_record(schema, field(&data, operation)?)
    }

    async fn delete(&self, schema: &'static ResourceSchema, id: &str) -> Result<(), RemoteError> {
        let (Some(operation), Some(document)) = (schema.delete_mutation, graphql::delete_mutation(schema)) else {
            return Err(RemoteError::Rejected(format!("{} records cannot be deleted", schema.label)));
        };
        let mut variables = Variables::new();
        variables.insert("id".to_string(), Value::String(id.to_string()));

        let data = self.execute(&document, &variables).await?;
        match field(&data, operation)? {
            Value::Bool(false) => Err(RemoteError::Rejected(format!(
                "The service refused to delete this {}",
                schema.label.to_lowercase()
            ))),
            _ => Ok(()),
        }
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, RemoteError> {
        let mut variables = Variables::new();
        variables.insert("username".to_string(), Value::String(username.to_string()));
        variables.insert("password".to_string(), Value::String(password.to_string()));

        let data = self.execute(graphql::LOGIN, &variables).await?;
        field(&data, "login")?
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Decode("login response carried no access_token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_is_returned_on_success() {
        let data = interpret_response(200, r#"{"data":{"getWorkers":[]}}"#).unwrap();
        assert_eq!(data, json!({ "getWorkers": [] }));
    }

    #[test]
    fn graphql_errors_are_rejections_verbatim() {
        let body = r#"{"data":null,"errors":[{"message":"Category has expenses","extensions":{"code":"BAD_REQUEST"}}]}"#;
        assert_eq!(
            interpret_response(200, body),
            Err(RemoteError::Rejected("Category has expenses".to_string()))
        );
    }

    #[test]
    fn unauthenticated_is_recognised_in_body_and_status() {
        let body = r#"{"errors":[{"message":"Unauthorized","extensions":{"code":"UNAUTHENTICATED"}}]}"#;
        assert_eq!(
            interpret_response(200, body),
            Err(RemoteError::Unauthenticated("Unauthorized".to_string()))
        );
        assert_eq!(
            interpret_response(401, "nope"),
            Err(RemoteError::Unauthenticated("Unauthorized".to_string()))
        );
    }

    #[test]
    fn garbage_bodies() {
        assert!(matches!(interpret_response(200, "<html>"), Err(RemoteError::Decode(_))));
        assert_eq!(
            interpret_response(502, "<html>"),
            Err(RemoteError::Transport("service returned HTTP 502".to_string()))
        );
        assert!(matches!(interpret_response(500, r#"{"data":null}"#), Err(RemoteError::Transport(_))));
        assert!(matches!(interpret_response(200, r#"{"data":null}"#), Err(RemoteError::Decode(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        use crate::session::MemorySessionStore;
        use std::sync::Arc;

        let interceptor = RequestInterceptor::new(Arc::new(MemorySessionStore::new()));
        // Port 9 (discard) on localhost is not expected to speak HTTP.
        let client = GraphqlClient::new(Url::parse("http://127.0.0.1:9/graphql").unwrap(), interceptor);
        let err = client.list(&crate::schema::WORKER).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
