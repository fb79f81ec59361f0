//! Generic resource controller.
//!
//! One controller per resource page. It owns the cached record list, the
//! dialog draft and the in-flight status, and decides every transition.
//! Transitions that need the network do not perform I/O themselves: they
//! return a [`Command`], the caller runs it with [`execute`] (on whatever
//! task it likes) and feeds the [`Outcome`] back through
//! [`ResourceController::apply`]. [`ResourceController::sync`] does that
//! loop inline for callers that can simply await.
//!
//! ```text
//! Listing --open_create/open_edit--> DialogOpen --submit/request_delete--> Submitting
//!    ^                                   |  ^                                   |
//!    |                                dismiss  `-------- mutation failed -------'
//!    |                                   v                                      |
//!    `------- list refreshed ------ Refreshing <------- mutation ok ------------'
//! ```

use crate::error::{DraftError, RemoteError, ValidationError};
use crate::models::{Draft, FieldValue, ListPage, RecordSnapshot, ReferenceOption, ReferenceValue};
use crate::notify::{Notice, Notifier};
use crate::remote::{RemoteService, Variables};
use crate::schema::{FieldDef, FieldKind, Resource, ResourceSchema, ScalarType};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The only date shape accepted from the operator.
const INPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Dialog mode. `Closed` means no draft exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Closed,
    Create,
    Edit,
}

/// The kind of mutation a submit issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    fn past_tense(self) -> &'static str {
        match self {
            MutationKind::Create => "created",
            MutationKind::Update => "updated",
            MutationKind::Delete => "deleted",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            MutationKind::Create => "creation",
            MutationKind::Update => "edit",
            MutationKind::Delete => "deletion",
        }
    }
}

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// A list query not caused by a mutation is in flight.
    Loading,
    /// Steady state: list shown, dialog closed.
    Listing,
    /// Dialog open on a draft.
    DialogOpen(Mode),
    /// Mutation in flight.
    Submitting(MutationKind),
    /// List re-query in flight after an acknowledged mutation.
    Refreshing(MutationKind),
}

/// I/O a transition asks the caller to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load,
    Create { variables: Variables },
    Update { id: String, variables: Variables },
    Delete { id: String },
}

/// Result of running a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Loaded(Result<ListPage, RemoteError>),
    Created(Result<RecordSnapshot, RemoteError>),
    Updated(Result<RecordSnapshot, RemoteError>),
    Deleted(Result<(), RemoteError>),
}

/// Run `command` against `service`.
pub async fn execute(
    service: &dyn RemoteService,
    schema: &'static ResourceSchema,
    command: Command,
) -> Outcome {
    match command {
        Command::Load => Outcome::Loaded(service.list(schema).await),
        Command::Create { variables } => Outcome::Created(service.create(schema, variables).await),
        Command::Update { id, variables } => {
            Outcome::Updated(service.update(schema, &id, variables).await)
        }
        Command::Delete { id } => Outcome::Deleted(service.delete(schema, &id).await),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Idle,
    Loading,
    Submitting(MutationKind),
    Refreshing(MutationKind),
}

#[derive(Debug, Clone)]
enum DialogMode {
    Create,
    Edit { target: RecordSnapshot },
}

#[derive(Debug, Clone)]
struct Dialog {
    mode: DialogMode,
    draft: Draft,
}

/// State machine for one resource page.
pub struct ResourceController {
    schema: &'static ResourceSchema,
    records: Vec<RecordSnapshot>,
    options: BTreeMap<Resource, Vec<ReferenceOption>>,
    dialog: Option<Dialog>,
    activity: Activity,
    loaded: bool,
    stale: bool,
    notifier: Arc<dyn Notifier>,
}

impl ResourceController {
    pub fn new(schema: &'static ResourceSchema, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            schema,
            records: Vec::new(),
            options: BTreeMap::new(),
            dialog: None,
            activity: Activity::Idle,
            loaded: false,
            stale: false,
            notifier,
        }
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        self.schema
    }

    pub fn resource(&self) -> Resource {
        self.schema.resource
    }

    /// Cached records, exactly as returned by the last successful list query.
    pub fn records(&self) -> &[RecordSnapshot] {
        &self.records
    }

    pub fn record(&self, id: &str) -> Option<&RecordSnapshot> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Choices for reference fields pointing at `target`.
    pub fn options(&self, target: Resource) -> &[ReferenceOption] {
        self.options.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn state(&self) -> ControllerState {
        match self.activity {
            Activity::Loading => ControllerState::Loading,
            Activity::Submitting(kind) => ControllerState::Submitting(kind),
            Activity::Refreshing(kind) => ControllerState::Refreshing(kind),
            Activity::Idle if self.dialog.is_some() => ControllerState::DialogOpen(self.mode()),
            Activity::Idle => ControllerState::Listing,
        }
    }

    pub fn mode(&self) -> Mode {
        match &self.dialog {
            None => Mode::Closed,
            Some(Dialog { mode: DialogMode::Create, .. }) => Mode::Create,
            Some(Dialog { mode: DialogMode::Edit { .. }, .. }) => Mode::Edit,
        }
    }

    /// The draft, while the dialog is open.
    pub fn draft(&self) -> Option<&Draft> {
        self.dialog.as_ref().map(|d| &d.draft)
    }

    /// The record under edit, in edit mode.
    pub fn edit_target(&self) -> Option<&RecordSnapshot> {
        match &self.dialog {
            Some(Dialog { mode: DialogMode::Edit { target }, .. }) => Some(target),
            _ => None,
        }
    }

    /// A request is in flight; submit and edits are refused.
    pub fn is_busy(&self) -> bool {
        self.activity != Activity::Idle
    }

    /// At least one list query has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The last refresh failed, so the list may lag the service.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Start a list query.
    pub fn load(&mut self) -> Option<Command> {
        if self.is_busy() {
            tracing::debug!("{}: load ignored, request in flight", self.schema.label);
            return None;
        }
        self.activity = Activity::Loading;
        Some(Command::Load)
    }

    /// Open the dialog on an empty draft.
    pub fn open_create(&mut self) -> bool {
        if self.is_busy() || self.dialog.is_some() {
            tracing::debug!("{}: open_create ignored in {:?}", self.schema.label, self.state());
            return false;
        }
        self.dialog = Some(Dialog {
            mode: DialogMode::Create,
            draft: Draft::empty(self.schema),
        });
        tracing::debug!("{}: dialog opened for a new record", self.schema.label);
        true
    }

    /// Open the dialog on a copy of the cached record `id`.
    pub fn open_edit(&mut self, id: &str) -> bool {
        if self.is_busy() || self.dialog.is_some() {
            tracing::debug!("{}: open_edit ignored in {:?}", self.schema.label, self.state());
            return false;
        }
        let Some(target) = self.record(id).cloned() else {
            tracing::warn!("{}: no cached record {}", self.schema.label, id);
            return false;
        };
        self.dialog = Some(Dialog {
            draft: Draft::from_snapshot(&target),
            mode: DialogMode::Edit { target },
        });
        tracing::debug!("{}: dialog opened on {}", self.schema.label, id);
        true
    }

    /// Close the dialog without submitting. Refused while a request is in
    /// flight, since a failed mutation returns to the dialog.
    pub fn dismiss(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.dialog.take().is_some()
    }

    /// Store `value` in the draft as is.
    pub fn set_value(&mut self, field: &str, value: FieldValue) -> Result<(), DraftError> {
        let def = self.editable_field(field)?;
        self.draft_mut()?.set(def.name, value);
        Ok(())
    }

    /// Parse operator text for `field` and store it. Blank input clears the
    /// field. For a reference field the text is matched against the option
    /// labels; an unmatched label is kept but will not pass validation.
    pub fn set_input(&mut self, field: &str, input: &str) -> Result<(), DraftError> {
        let def = self.editable_field(field)?;
        let value = self.parse_input(def, input)?;
        self.draft_mut()?.set(def.name, value);
        Ok(())
    }

    /// Point the reference field `field` at the option `id`.
    pub fn choose_reference(&mut self, field: &str, id: &str) -> Result<(), DraftError> {
        let def = self.editable_field(field)?;
        let target = def.target().ok_or(DraftError::NotAReference(def.label))?;
        let option = self
            .options(target)
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| DraftError::UnknownOption {
                field: def.label,
                id: id.to_string(),
            })?;
        self.draft_mut()?.set(
            def.name,
            FieldValue::Reference(ReferenceValue {
                id: Some(option.id),
                label: option.label,
            }),
        );
        Ok(())
    }

    pub fn clear_field(&mut self, field: &str) -> Result<(), DraftError> {
        self.set_value(field, FieldValue::Empty)
    }

    /// Check `draft` against the schema. Every failing field is collected
    /// into a single error.
    pub fn validate_draft(&self, draft: &Draft) -> Result<(), ValidationError> {
        let mut err = ValidationError::default();
        for field in self.schema.editable_fields() {
            let value = draft.get(field.name);
            if self.field_is_valid(field, value) {
                continue;
            }
            match value {
                FieldValue::Reference(_) => err.unresolved.push(field.label),
                _ => err.fields.push(field.label),
            }
        }

        if err.fields.is_empty() && err.unresolved.is_empty() {
            Ok(())
        } else {
            Err(err)
        }
    }

    /// Validate the draft and, if it passes, start the create or update.
    /// Returns `None` (and changes nothing) while a request is in flight.
    pub fn submit(&mut self) -> Option<Command> {
        if self.is_busy() {
            tracing::debug!("{}: submit ignored, request in flight", self.schema.label);
            return None;
        }
        let dialog = self.dialog.as_ref()?;

        if let Err(err) = self.validate_draft(&dialog.draft) {
            tracing::debug!("{}: draft rejected: {}", self.schema.label, err);
            self.notifier.notify(Notice::warning(err.to_string()));
            return None;
        }

        let variables = self.variables(&dialog.draft);
        let (kind, command) = match &dialog.mode {
            DialogMode::Create => (MutationKind::Create, Command::Create { variables }),
            DialogMode::Edit { target } => {
                if !self.schema.supports_update() {
                    self.notifier.notify(Notice::warning(format!(
                        "{} records cannot be edited.",
                        self.schema.label
                    )));
                    return None;
                }
                (
                    MutationKind::Update,
                    Command::Update {
                        id: target.id.clone(),
                        variables,
                    },
                )
            }
        };

        tracing::info!("{}: submitting {:?}", self.schema.label, kind);
        self.activity = Activity::Submitting(kind);
        Some(command)
    }

    /// Start deleting the record under edit. No validation is applied.
    pub fn request_delete(&mut self) -> Option<Command> {
        if self.is_busy() {
            tracing::debug!("{}: delete ignored, request in flight", self.schema.label);
            return None;
        }
        let id = self.edit_target()?.id.clone();

        if !self.schema.supports_delete() {
            self.notifier.notify(Notice::warning(format!(
                "{} records cannot be deleted.",
                self.schema.label
            )));
            return None;
        }

        tracing::info!("{}: deleting {}", self.schema.label, id);
        self.activity = Activity::Submitting(MutationKind::Delete);
        Some(Command::Delete { id })
    }

    /// Feed back the result of a command. May return the follow-up command
    /// (the list refresh after a successful mutation).
    pub fn apply(&mut self, outcome: Outcome) -> Option<Command> {
        match outcome {
            Outcome::Loaded(result) => {
                self.finish_load(result);
                None
            }
            Outcome::Created(result) => self.finish_mutation(MutationKind::Create, result.map(Some)),
            Outcome::Updated(result) => self.finish_mutation(MutationKind::Update, result.map(Some)),
            Outcome::Deleted(result) => self.finish_mutation(MutationKind::Delete, result.map(|()| None)),
        }
    }

    /// Run `command` and every follow-up it produces.
    pub async fn sync(&mut self, service: &dyn RemoteService, command: Option<Command>) {
        let mut next = command;
        while let Some(command) = next {
            let outcome = execute(service, self.schema, command).await;
            next = self.apply(outcome);
        }
    }

    fn finish_mutation(
        &mut self,
        kind: MutationKind,
        result: Result<Option<RecordSnapshot>, RemoteError>,
    ) -> Option<Command> {
        if self.activity != Activity::Submitting(kind) {
            tracing::warn!(
                "{}: ignoring {:?} outcome in {:?}",
                self.schema.label,
                kind,
                self.state()
            );
            return None;
        }

        match result {
            Ok(record) => {
                if let Some(record) = record {
                    tracing::debug!("{}: service acknowledged {}", self.schema.label, record.id);
                }
                self.activity = Activity::Refreshing(kind);
                Some(Command::Load)
            }
            Err(err) => {
                tracing::error!("{}: {:?} failed: {}", self.schema.label, kind, err);
                self.activity = Activity::Idle;
                let action = format!("{} {}", self.schema.label.to_lowercase(), kind.noun());
                self.notifier.notify(Notice::error(failure_message(&action, &err)));
                None
            }
        }
    }

    fn finish_load(&mut self, result: Result<ListPage, RemoteError>) {
        match (self.activity, result) {
            (Activity::Loading, Ok(page)) => {
                self.activity = Activity::Idle;
                self.replace_list(page);
            }
            (Activity::Loading, Err(err)) => {
                tracing::error!("{}: list query failed: {}", self.schema.label, err);
                self.activity = Activity::Idle;
                self.stale = self.loaded;
                let action = format!("{} loading", self.schema.label.to_lowercase());
                self.notifier.notify(Notice::error(failure_message(&action, &err)));
            }
            (Activity::Refreshing(kind), Ok(page)) => {
                self.activity = Activity::Idle;
                self.replace_list(page);
                self.dialog = None;
                self.notifier.notify(Notice::success(format!(
                    "{} is successfully {}!",
                    self.schema.label,
                    kind.past_tense()
                )));
            }
            (Activity::Refreshing(kind), Err(err)) => {
                // The mutation itself went through, so the dialog closes.
                tracing::error!("{}: refresh after {:?} failed: {}", self.schema.label, kind, err);
                self.activity = Activity::Idle;
                self.dialog = None;
                self.stale = true;
                self.notifier.notify(Notice::error(format!(
                    "{} was {} but the list could not be refreshed: {}",
                    self.schema.label,
                    kind.past_tense(),
                    err
                )));
            }
            (activity, _) => {
                tracing::warn!("{}: ignoring list result in {:?}", self.schema.label, activity);
            }
        }
    }

    fn replace_list(&mut self, page: ListPage) {
        tracing::debug!("{}: list replaced with {} records", self.schema.label, page.records.len());
        self.records = page.records;
        self.options = page.options;
        self.loaded = true;
        self.stale = false;
    }

    fn editable_field(&self, name: &str) -> Result<&'static FieldDef, DraftError> {
        if self.is_busy() {
            return Err(DraftError::Busy);
        }
        if self.dialog.is_none() {
            return Err(DraftError::NoDialog);
        }
        let def = self
            .schema
            .field(name)
            .ok_or_else(|| DraftError::UnknownField(name.to_string()))?;
        if !def.editable {
            return Err(DraftError::ReadOnly(def.label));
        }
        Ok(def)
    }

    fn draft_mut(&mut self) -> Result<&mut Draft, DraftError> {
        self.dialog
            .as_mut()
            .map(|d| &mut d.draft)
            .ok_or(DraftError::NoDialog)
    }

    fn parse_input(&self, def: &'static FieldDef, input: &str) -> Result<FieldValue, DraftError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(FieldValue::Empty);
        }

        let parse_err = |expected| DraftError::Parse {
            field: def.label,
            input: input.to_string(),
            expected,
        };

        match def.kind {
            FieldKind::Scalar(ScalarType::Float) => trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Number)
                .ok_or_else(|| parse_err(ScalarType::Float.describe())),
            FieldKind::Scalar(ScalarType::String) => Ok(FieldValue::Text(input.to_string())),
            FieldKind::Scalar(ScalarType::DateTime) => NaiveDate::parse_from_str(trimmed, INPUT_DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| parse_err(ScalarType::DateTime.describe())),
            FieldKind::Reference(target) => {
                let reference = match self
                    .options(target)
                    .iter()
                    .find(|o| o.label.eq_ignore_ascii_case(trimmed))
                {
                    Some(option) => ReferenceValue {
                        id: Some(option.id.clone()),
                        label: option.label.clone(),
                    },
                    None => ReferenceValue {
                        id: None,
                        label: trimmed.to_string(),
                    },
                };
                Ok(FieldValue::Reference(reference))
            }
        }
    }

    fn field_is_valid(&self, def: &FieldDef, value: &FieldValue) -> bool {
        if value.is_empty() {
            return !def.required;
        }
        match (def.kind, value) {
            (FieldKind::Scalar(ScalarType::Float), FieldValue::Number(n)) => {
                n.is_finite() && !(def.required && *n == 0.0)
            }
            (FieldKind::Scalar(ScalarType::String), FieldValue::Text(_)) => true,
            (FieldKind::Scalar(ScalarType::DateTime), FieldValue::Date(_)) => true,
            (FieldKind::Reference(target), FieldValue::Reference(reference)) => reference
                .id
                .as_deref()
                .is_some_and(|id| self.options(target).iter().any(|o| o.id == id)),
            _ => false,
        }
    }

    /// Mutation arguments for every editable field. References are sent as
    /// identifiers in both create and edit mode.
    fn variables(&self, draft: &Draft) -> Variables {
        self.schema
            .editable_fields()
            .map(|f| (f.name.to_string(), to_json(draft.get(f.name))))
            .collect()
    }
}

fn to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Empty => Value::Null,
        FieldValue::Text(s) if s.trim().is_empty() => Value::Null,
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Date(d) => Value::String(format!("{}T00:00:00.000Z", d.format("%Y-%m-%d"))),
        FieldValue::Reference(r) => r.id.clone().map(Value::String).unwrap_or(Value::Null),
    }
}

fn failure_message(action: &str, err: &RemoteError) -> String {
    match err {
        RemoteError::Rejected(message) => message.clone(),
        RemoteError::Unauthenticated(_) => {
            "The service rejected your session. Log out and sign in again.".to_string()
        }
        RemoteError::Transport(_) | RemoteError::Decode(_) => format!("Error during {action}!"),
    }
}

impl std::fmt::Debug for ResourceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceController")
            .field("resource", &self.schema.resource)
            .field("state", &self.state())
            .field("records", &self.records.len())
            .field("stale", &self.stale)
            .finish()
    }
}
