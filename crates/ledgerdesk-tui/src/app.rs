//! Application state management.

use crate::picker::Picker;
use ledgerdesk_core::{
    execute, Authenticator, Command, FieldDef, FieldKind, Notice, NoticeBuffer, Notifier, Outcome,
    RecordSnapshot, RemoteService, Resource, ResourceController, Route, RouteGuard, SessionStore,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// No session; the login form is shown.
    Login,
    /// Signed in, browsing a resource page.
    Main,
    /// Application should quit.
    Quit,
}

/// Input mode for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Login,
    /// List navigation.
    Normal,
    /// Editing the dialog draft.
    Dialog,
    /// Choosing a reference with the fuzzy picker.
    Picker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
}

/// Results sent back by background tasks.
#[derive(Debug)]
pub enum AppEvent {
    /// `generation` is the session generation the command was issued in.
    Outcome {
        generation: u64,
        resource: Resource,
        outcome: Outcome,
    },
    LoginFinished(bool),
}

/// External dependencies the app is built from.
pub struct Services {
    pub service: Arc<dyn RemoteService>,
    pub session: Arc<dyn SessionStore>,
    pub notices: NoticeBuffer,
    pub runtime: Handle,
    /// Path requested at startup, e.g. `/expenses`.
    pub start_route: String,
}

/// Main application model.
pub struct App {
    pub state: AppState,
    pub input_mode: InputMode,

    // Login form
    pub username: String,
    pub password: String,
    pub login_field: LoginField,
    /// A login request is in flight.
    pub logging_in: bool,

    // Resource pages
    pub active: Resource,
    pub selected_row: usize,
    /// One controller per resource, in [`Resource::ALL`] order.
    controllers: Vec<ResourceController>,
    /// Bumped on logout; outcomes from an older generation are dropped.
    generation: u64,

    // Dialog
    /// Index into the active schema's editable fields.
    pub field_index: usize,
    /// Text being typed for the focused field.
    pub field_input: String,
    pub picker: Option<Picker>,

    pub notices: NoticeBuffer,
    /// Where to go after a successful login.
    requested_route: String,

    service: Arc<dyn RemoteService>,
    guard: RouteGuard,
    auth: Authenticator,
    runtime: Handle,
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
}

fn fresh_controllers(notices: &NoticeBuffer) -> Vec<ResourceController> {
    Resource::ALL
        .into_iter()
        .map(|r| ResourceController::new(r.schema(), Arc::new(notices.clone())))
        .collect()
}

impl App {
    /// Create the app and route to `start_route` (or the login form).
    pub fn new(services: Services) -> Self {
        let Services {
            service,
            session,
            notices,
            runtime,
            start_route,
        } = services;
        let (tx, rx) = unbounded_channel();

        let mut app = Self {
            state: AppState::Login,
            input_mode: InputMode::Login,
            username: String::new(),
            password: String::new(),
            login_field: LoginField::Username,
            logging_in: false,
            active: Resource::Expense,
            selected_row: 0,
            controllers: fresh_controllers(&notices),
            generation: 0,
            field_index: 0,
            field_input: String::new(),
            picker: None,
            requested_route: start_route.clone(),
            guard: RouteGuard::new(session.clone())
                .with_landing(Resource::from_route(&start_route).unwrap_or(Resource::Expense)),
            auth: Authenticator::new(service.clone(), session, Arc::new(notices.clone())),
            notices,
            service,
            runtime,
            tx,
            rx,
        };
        app.navigate(&start_route);
        app
    }

    /// Controller of the page on screen.
    pub fn controller(&self) -> &ResourceController {
        &self.controllers[self.active.index()]
    }

    fn controller_mut(&mut self) -> &mut ResourceController {
        &mut self.controllers[self.active.index()]
    }

    /// Go to `path`, or to the login form when there is no session.
    pub fn navigate(&mut self, path: &str) {
        self.requested_route = path.to_string();
        match self.guard.resolve(path) {
            Route::Login => {
                tracing::debug!("No session, showing login for {}", path);
                self.state = AppState::Login;
                self.input_mode = InputMode::Login;
            }
            Route::Resource(resource) => {
                self.state = AppState::Main;
                self.input_mode = InputMode::Normal;
                self.switch_to(resource);
            }
        }
    }

    /// Show `resource`'s page, loading it on first visit.
    pub fn switch_to(&mut self, resource: Resource) {
        if self.input_mode != InputMode::Normal {
            return;
        }
        self.active = resource;
        self.selected_row = 0;
        self.requested_route = resource.route().to_string();
        if !self.controller().is_loaded() && !self.controller().is_busy() {
            self.reload();
        }
    }

    pub fn next_resource(&mut self) {
        let next = Resource::ALL[(self.active.index() + 1) % Resource::ALL.len()];
        self.switch_to(next);
    }

    pub fn prev_resource(&mut self) {
        let len = Resource::ALL.len();
        let prev = Resource::ALL[(self.active.index() + len - 1) % len];
        self.switch_to(prev);
    }

    pub fn reload(&mut self) {
        let command = self.controller_mut().load();
        self.dispatch(self.active, command);
    }

    /// Run `command` on the runtime; its outcome comes back as an event.
    fn dispatch(&self, resource: Resource, command: Option<Command>) {
        let Some(command) = command else {
            return;
        };
        let service = self.service.clone();
        let tx = self.tx.clone();
        let generation = self.generation;
        self.runtime.spawn(async move {
            let outcome = execute(service.as_ref(), resource.schema(), command).await;
            let event = AppEvent::Outcome {
                generation,
                resource,
                outcome,
            };
            if tx.send(event).is_err() {
                tracing::debug!("App closed before {:?} outcome arrived", resource);
            }
        });
    }

    /// Apply every event that has arrived since the last tick.
    pub fn pump_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Outcome {
                generation,
                resource,
                outcome,
            } => {
                if generation != self.generation {
                    tracing::debug!(
                        "Dropping {:?} outcome from session generation {} (now {})",
                        resource,
                        generation,
                        self.generation
                    );
                    return;
                }
                let next = self.controllers[resource.index()].apply(outcome);
                self.dispatch(resource, next);
                self.sync_dialog();
            }
            AppEvent::LoginFinished(ok) => {
                self.logging_in = false;
                self.password.clear();
                if ok {
                    let route = self.requested_route.clone();
                    self.navigate(&route);
                }
            }
        }
    }

    /// Leave dialog input once the controller has closed the dialog, and
    /// keep the row cursor inside the list.
    fn sync_dialog(&mut self) {
        if matches!(self.input_mode, InputMode::Dialog | InputMode::Picker)
            && self.controller().draft().is_none()
        {
            self.input_mode = InputMode::Normal;
            self.picker = None;
        }
        let len = self.controller().records().len();
        if self.selected_row >= len {
            self.selected_row = len.saturating_sub(1);
        }
    }

    // Login

    pub fn toggle_login_field(&mut self) {
        self.login_field = match self.login_field {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }

    pub fn login_input(&mut self) -> &mut String {
        match self.login_field {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    /// Start a login with the typed credentials.
    pub fn login(&mut self) {
        if self.logging_in {
            return;
        }
        self.logging_in = true;
        let auth = self.auth.clone();
        let tx = self.tx.clone();
        let (username, password) = (self.username.clone(), self.password.clone());
        self.runtime.spawn(async move {
            let ok = auth.login(&username, &password).await;
            if tx.send(AppEvent::LoginFinished(ok)).is_err() {
                tracing::debug!("App closed before login finished");
            }
        });
    }

    /// Drop the session and every cached page.
    pub fn logout(&mut self) {
        self.auth.logout();
        self.generation += 1;
        self.controllers = fresh_controllers(&self.notices);
        self.picker = None;
        self.password.clear();
        self.login_field = LoginField::Password;
        self.requested_route = self.active.route().to_string();
        self.state = AppState::Login;
        self.input_mode = InputMode::Login;
    }

    // List

    pub fn selected_record(&self) -> Option<&RecordSnapshot> {
        self.controller().records().get(self.selected_row)
    }

    pub fn move_up(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected_row + 1 < self.controller().records().len() {
            self.selected_row += 1;
        }
    }

    pub fn open_create(&mut self) {
        if self.controller_mut().open_create() {
            self.enter_dialog();
        }
    }

    pub fn open_selected(&mut self) {
        let Some(id) = self.selected_record().map(|r| r.id.clone()) else {
            return;
        };
        if self.controller_mut().open_edit(&id) {
            self.enter_dialog();
        }
    }

    fn enter_dialog(&mut self) {
        self.input_mode = InputMode::Dialog;
        self.field_index = 0;
        self.load_field_input();
    }

    // Dialog

    /// Editable fields of the active resource, in form order.
    pub fn form_fields(&self) -> Vec<&'static FieldDef> {
        self.active.schema().editable_fields().collect()
    }

    pub fn current_field(&self) -> Option<&'static FieldDef> {
        self.form_fields().get(self.field_index).copied()
    }

    fn load_field_input(&mut self) {
        let text = match (self.current_field(), self.controller().draft()) {
            (Some(field), Some(draft)) => draft.get(field.name).display(),
            _ => String::new(),
        };
        self.field_input = text;
    }

    /// Write the typed text into the draft. Returns false (after telling the
    /// operator why) when the text does not parse.
    fn commit_field_input(&mut self) -> bool {
        let Some(field) = self.current_field() else {
            return true;
        };
        let unchanged = self
            .controller()
            .draft()
            .is_some_and(|d| d.get(field.name).display() == self.field_input);
        if unchanged {
            return true;
        }

        let input = self.field_input.clone();
        match self.controller_mut().set_input(field.name, &input) {
            Ok(()) => true,
            Err(err) => {
                self.notices.notify(Notice::warning(err.to_string()));
                false
            }
        }
    }

    pub fn next_field(&mut self) {
        if self.commit_field_input() {
            self.field_index = (self.field_index + 1) % self.form_fields().len().max(1);
            self.load_field_input();
        }
    }

    pub fn prev_field(&mut self) {
        if self.commit_field_input() {
            let len = self.form_fields().len().max(1);
            self.field_index = (self.field_index + len - 1) % len;
            self.load_field_input();
        }
    }

    pub fn clear_current_field(&mut self) {
        let Some(field) = self.current_field() else {
            return;
        };
        if let Err(err) = self.controller_mut().clear_field(field.name) {
            self.notices.notify(Notice::warning(err.to_string()));
        }
        self.field_input.clear();
    }

    pub fn submit(&mut self) {
        if self.controller().is_busy() || !self.commit_field_input() {
            return;
        }
        let command = self.controller_mut().submit();
        self.dispatch(self.active, command);
    }

    pub fn request_delete(&mut self) {
        let command = self.controller_mut().request_delete();
        self.dispatch(self.active, command);
    }

    pub fn dismiss(&mut self) {
        if self.controller_mut().dismiss() {
            self.input_mode = InputMode::Normal;
        }
    }

    // Picker

    pub fn open_picker(&mut self) {
        let Some(field) = self.current_field() else {
            return;
        };
        let FieldKind::Reference(target) = field.kind else {
            return;
        };
        self.picker = Some(Picker::new(field.name, target, self.controller().options(target)));
        self.input_mode = InputMode::Picker;
    }

    pub fn close_picker(&mut self) {
        self.picker = None;
        self.input_mode = InputMode::Dialog;
    }

    /// Re-run the picker filter after its query changed.
    pub fn refilter_picker(&mut self) {
        if let Some(mut picker) = self.picker.take() {
            picker.refilter(self.controller().options(picker.target));
            self.picker = Some(picker);
        }
    }

    pub fn choose_picked(&mut self) {
        let Some(picker) = self.picker.take() else {
            return;
        };
        if let Some(option) = picker.current() {
            if let Err(err) = self.controller_mut().choose_reference(picker.field, &option.id) {
                self.notices.notify(Notice::warning(err.to_string()));
            }
        }
        self.input_mode = InputMode::Dialog;
        self.load_field_input();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledgerdesk_core::{
        ControllerState, FieldValue, ListPage, MemorySessionStore, Mode, RecordSnapshot, RemoteError,
        ResourceSchema, Variables,
    };
    use std::collections::BTreeMap;
    use tokio::runtime::Runtime;

    struct EmptyService;

    #[async_trait]
    impl RemoteService for EmptyService {
        async fn list(&self, _: &'static ResourceSchema) -> Result<ListPage, RemoteError> {
            Ok(ListPage::default())
        }
        async fn create(&self, _: &'static ResourceSchema, _: Variables) -> Result<RecordSnapshot, RemoteError> {
            Err(RemoteError::Rejected("read only".into()))
        }
        async fn update(&self, _: &'static ResourceSchema, _: &str, _: Variables) -> Result<RecordSnapshot, RemoteError> {
            Err(RemoteError::Rejected("read only".into()))
        }
        async fn delete(&self, _: &'static ResourceSchema, _: &str) -> Result<(), RemoteError> {
            Err(RemoteError::Rejected("read only".into()))
        }
        async fn login(&self, _: &str, password: &str) -> Result<String, RemoteError> {
            if password == "pw" {
                Ok("token".to_string())
            } else {
                Err(RemoteError::Rejected("nope".into()))
            }
        }
    }

    fn app(runtime: &Runtime, session: Arc<dyn SessionStore>, start_route: &str) -> App {
        App::new(Services {
            service: Arc::new(EmptyService),
            session,
            notices: NoticeBuffer::new(),
            runtime: runtime.handle().clone(),
            start_route: start_route.to_string(),
        })
    }

    fn page_with_worker() -> ListPage {
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), FieldValue::Text("Ghost".into()));
        ListPage {
            records: vec![RecordSnapshot {
                id: "w9".to_string(),
                values,
            }],
            options: BTreeMap::new(),
        }
    }

    fn next_event(app: &mut App) {
        let event = app.rx.blocking_recv().expect("event");
        app.handle_event(event);
    }

    #[test]
    fn without_session_every_route_shows_login() {
        let runtime = Runtime::new().unwrap();
        for route in ["/expenses", "/workers", "/"] {
            let app = app(&runtime, Arc::new(MemorySessionStore::new()), route);
            assert_eq!(app.state, AppState::Login);
            assert_eq!(app.input_mode, InputMode::Login);
        }
    }

    #[test]
    fn with_session_start_route_is_loaded() {
        let runtime = Runtime::new().unwrap();
        let mut app = app(&runtime, Arc::new(MemorySessionStore::with_token("t")), "/workers");

        assert_eq!(app.state, AppState::Main);
        assert_eq!(app.active, Resource::Worker);
        assert_eq!(app.controller().state(), ControllerState::Loading);

        next_event(&mut app);
        assert_eq!(app.controller().state(), ControllerState::Listing);
        assert!(app.controller().is_loaded());
    }

    #[test]
    fn login_then_logout() {
        let runtime = Runtime::new().unwrap();
        let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let mut app = app(&runtime, session.clone(), "/projects");

        app.username = "admin".to_string();
        app.password = "pw".to_string();
        app.login();
        assert!(app.logging_in);
        next_event(&mut app);

        assert_eq!(app.state, AppState::Main);
        assert_eq!(app.active, Resource::Project);
        assert!(session.is_active());
        assert!(app.password.is_empty());

        app.logout();
        assert_eq!(app.state, AppState::Login);
        assert!(!session.is_active());
    }

    #[test]
    fn dialog_field_navigation_commits_input() {
        let runtime = Runtime::new().unwrap();
        let mut app = app(&runtime, Arc::new(MemorySessionStore::with_token("t")), "/workers");
        next_event(&mut app);

        app.open_create();
        assert_eq!(app.input_mode, InputMode::Dialog);
        assert_eq!(app.current_field().unwrap().name, "name");

        app.field_input = "Aziz".to_string();
        app.next_field();
        assert_eq!(app.current_field().unwrap().name, "role");
        assert_eq!(app.controller().draft().unwrap().get("name").display(), "Aziz");

        // Unparseable salary keeps the cursor where it is.
        app.next_field();
        app.field_input = "lots".to_string();
        app.next_field();
        assert_eq!(app.current_field().unwrap().name, "salary");

        app.dismiss();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.controller().mode(), Mode::Closed);
    }

    #[test]
    fn outcomes_from_before_logout_are_dropped() {
        let runtime = Runtime::new().unwrap();
        let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::with_token("t"));
        let mut app = app(&runtime, session.clone(), "/workers");
        assert_eq!(app.controller().state(), ControllerState::Loading);

        app.logout();
        session.set("t2").unwrap();
        app.navigate("/workers");
        assert_eq!(app.controller().state(), ControllerState::Loading);

        // A late answer to the first session's load must not fill the new page.
        app.handle_event(AppEvent::Outcome {
            generation: 0,
            resource: Resource::Worker,
            outcome: Outcome::Loaded(Ok(page_with_worker())),
        });
        assert_eq!(app.controller().state(), ControllerState::Loading);
        assert!(app.controller().records().is_empty());

        // Both real loads arrive; only the current one is applied.
        next_event(&mut app);
        next_event(&mut app);
        assert_eq!(app.controller().state(), ControllerState::Listing);
        assert!(app.controller().records().is_empty());
    }
}
