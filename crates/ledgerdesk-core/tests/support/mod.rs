//! In-memory stand-in for the bookkeeping service.
//!
//! Rows are kept as JSON objects with references stored as identifiers and
//! expanded to `{ id, <label field> }` on the way out, the same shape the
//! GraphQL service answers with, so responses go through the real decoders.

#![allow(dead_code)]

use async_trait::async_trait;
use ledgerdesk_core::remote::{decode_list_page, decode_record};
use ledgerdesk_core::schema::FieldKind;
use ledgerdesk_core::{ListPage, RecordSnapshot, RemoteError, RemoteService, Resource, ResourceSchema, Variables};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(Resource),
    Create(Resource, Variables),
    Update(Resource, String, Variables),
    Delete(Resource, String),
    Login(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Call::Create(..) | Call::Update(..) | Call::Delete(..))
    }
}

#[derive(Default)]
struct State {
    rows: BTreeMap<Resource, Vec<Map<String, Value>>>,
    next_id: usize,
    calls: Vec<Call>,
    fail_list: Option<RemoteError>,
    fail_mutation: Option<RemoteError>,
    session_expired: bool,
}

pub struct FakeService {
    state: Mutex<State>,
    username: String,
    password: String,
}

pub const TOKEN: &str = "fake-token";

impl FakeService {
    /// Seeded with two categories, one worker and one project.
    pub fn new() -> Self {
        let service = Self {
            state: Mutex::new(State::default()),
            username: "admin".to_string(),
            password: "secret".to_string(),
        };
        service.seed(Resource::ExpenseCategory, "c1", json!({ "name": "Fuel", "description": "Diesel and petrol", "expense_amount": 0.0 }));
        service.seed(Resource::ExpenseCategory, "c2", json!({ "name": "Food", "description": "Meals", "expense_amount": 0.0 }));
        service.seed(Resource::Worker, "w1", json!({ "name": "Aziz", "role": "Driver", "salary": 900.0 }));
        service.seed(Resource::Project, "p1", json!({ "name": "Depot", "description": "New depot", "income_amount": 0.0 }));
        service
    }

    pub fn seed(&self, resource: Resource, id: &str, row: Value) {
        let mut row = match row {
            Value::Object(map) => map,
            other => panic!("seed row must be an object, got {other}"),
        };
        row.insert("id".to_string(), Value::String(id.to_string()));
        row.entry("created_at").or_insert_with(|| json!("2024-01-01T00:00:00.000Z"));
        self.lock().rows.entry(resource).or_default().push(row);
    }

    pub fn fail_next_list(&self, err: RemoteError) {
        self.lock().fail_list = Some(err);
    }

    pub fn fail_next_mutation(&self, err: RemoteError) {
        self.lock().fail_mutation = Some(err);
    }

    /// Answer every later non-login call as if the token had been revoked.
    pub fn expire_session(&self) {
        self.lock().session_expired = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn row_count(&self, resource: Resource) -> usize {
        self.lock().rows.get(&resource).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

impl State {
    fn expand(&self, schema: &ResourceSchema, row: &Map<String, Value>) -> Value {
        let mut out = row.clone();
        for field in schema.fields {
            let FieldKind::Reference(target) = field.kind else {
                continue;
            };
            let Some(Value::String(id)) = row.get(field.name) else {
                continue;
            };
            let label_field = target.schema().label_field;
            let label = self
                .find(target, id)
                .and_then(|r| r.get(label_field).cloned())
                .unwrap_or(Value::Null);
            out.insert(field.name.to_string(), json!({ "id": id, label_field: label }));
        }
        Value::Object(out)
    }

    fn find(&self, resource: Resource, id: &str) -> Option<&Map<String, Value>> {
        self.rows
            .get(&resource)?
            .iter()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
    }

    fn check_references(&self, schema: &ResourceSchema, variables: &Variables) -> Result<(), RemoteError> {
        for field in schema.fields {
            let FieldKind::Reference(target) = field.kind else {
                continue;
            };
            match variables.get(field.name) {
                Some(Value::String(id)) if self.find(target, id).is_none() => {
                    return Err(RemoteError::Rejected(format!("{} {} not found", field.name, id)));
                }
                Some(Value::String(_)) | Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(RemoteError::Rejected(format!("{} must be an id, got {}", field.name, other)));
                }
            }
        }
        Ok(())
    }

    fn referenced_by(&self, resource: Resource, id: &str) -> Option<Resource> {
        Resource::ALL.into_iter().find(|owner| {
            let schema = owner.schema();
            let fields: Vec<_> = schema.fields.iter().filter(|f| f.target() == Some(resource)).collect();
            self.rows.get(owner).is_some_and(|rows| {
                rows.iter()
                    .any(|row| fields.iter().any(|f| row.get(f.name).and_then(Value::as_str) == Some(id)))
            })
        })
    }

    fn check_session(&self) -> Result<(), RemoteError> {
        if self.session_expired {
            Err(RemoteError::Unauthenticated("Unauthorized".to_string()))
        } else {
            Ok(())
        }
    }

    fn take_mutation_failure(&mut self) -> Result<(), RemoteError> {
        self.check_session()?;
        match self.fail_mutation.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteService for FakeService {
    async fn list(&self, schema: &'static ResourceSchema) -> Result<ListPage, RemoteError> {
        let mut state = self.lock();
        state.calls.push(Call::List(schema.resource));
        state.check_session()?;
        if let Some(err) = state.fail_list.take() {
            return Err(err);
        }

        let mut data = Map::new();
        let rows: Vec<Value> = state
            .rows
            .get(&schema.resource)
            .map(|rows| rows.iter().map(|r| state.expand(schema, r)).collect())
            .unwrap_or_default();
        data.insert(schema.list_query.to_string(), Value::Array(rows));

        for target in schema.referenced_resources() {
            let target_schema = target.schema();
            let options: Vec<Value> = state
                .rows
                .get(&target)
                .map(|rows| {
                    rows.iter()
                        .map(|r| json!({ "id": r["id"], target_schema.label_field: r[target_schema.label_field] }))
                        .collect()
                })
                .unwrap_or_default();
            data.insert(target_schema.list_query.to_string(), Value::Array(options));
        }

        decode_list_page(schema, &Value::Object(data))
    }

    async fn create(&self, schema: &'static ResourceSchema, variables: Variables) -> Result<RecordSnapshot, RemoteError> {
        let mut state = self.lock();
        state.calls.push(Call::Create(schema.resource, variables.clone()));
        state.take_mutation_failure()?;

        for field in schema.required_fields() {
            if variables.get(field.name).map_or(true, Value::is_null) {
                return Err(RemoteError::Rejected(format!("{} should not be empty", field.name)));
            }
        }
        state.check_references(schema, &variables)?;

        state.next_id += 1;
        let mut row = variables;
        row.insert("id".to_string(), Value::String(format!("n{}", state.next_id)));
        row.insert("created_at".to_string(), json!("2024-03-02T09:00:00.000Z"));
        let record = state.expand(schema, &row);
        state.rows.entry(schema.resource).or_default().push(row);
        decode_record(schema, &record)
    }

    async fn update(&self, schema: &'static ResourceSchema, id: &str, variables: Variables) -> Result<RecordSnapshot, RemoteError> {
        let mut state = self.lock();
        state.calls.push(Call::Update(schema.resource, id.to_string(), variables.clone()));
        state.take_mutation_failure()?;
        state.check_references(schema, &variables)?;

        let row = state
            .rows
            .get_mut(&schema.resource)
            .and_then(|rows| rows.iter_mut().find(|r| r.get("id").and_then(Value::as_str) == Some(id)))
            .ok_or_else(|| RemoteError::Rejected(format!("{} {} not found", schema.label, id)))?;
        for (key, value) in variables {
            row.insert(key, value);
        }
        let row = row.clone();
        decode_record(schema, &state.expand(schema, &row))
    }

    async fn delete(&self, schema: &'static ResourceSchema, id: &str) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.calls.push(Call::Delete(schema.resource, id.to_string()));
        state.take_mutation_failure()?;

        if let Some(owner) = state.referenced_by(schema.resource, id) {
            return Err(RemoteError::Rejected(format!(
                "Cannot delete {}: it is used by existing {}",
                schema.label.to_lowercase(),
                owner.plural_label().to_lowercase()
            )));
        }
        let rows = state.rows.entry(schema.resource).or_default();
        let before = rows.len();
        rows.retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
        if rows.len() == before {
            return Err(RemoteError::Rejected(format!("{} {} not found", schema.label, id)));
        }
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, RemoteError> {
        self.lock().calls.push(Call::Login(username.to_string()));
        if username == self.username && password == self.password {
            Ok(TOKEN.to_string())
        } else {
            Err(RemoteError::Rejected("Invalid credentials".to_string()))
        }
    }
}
