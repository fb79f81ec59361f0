//! Static descriptions of the five bookkeeping resources.
//!
//! A schema lists a resource's fields in display order, says which of them
//! are required, which point at another resource, and names the GraphQL
//! operations the service exposes for it. The controller consumes nothing
//! else, so adding a resource means adding a schema here.

/// The resource types the console manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Expense,
    Income,
    Worker,
    Project,
    ExpenseCategory,
}

impl Resource {
    /// Every resource, in sidebar order.
    pub const ALL: [Resource; 5] = [
        Resource::Expense,
        Resource::Income,
        Resource::Worker,
        Resource::Project,
        Resource::ExpenseCategory,
    ];

    /// Position in [`Resource::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The schema describing this resource.
    pub fn schema(self) -> &'static ResourceSchema {
        match self {
            Resource::Expense => &EXPENSE,
            Resource::Income => &INCOME,
            Resource::Worker => &WORKER,
            Resource::Project => &PROJECT,
            Resource::ExpenseCategory => &EXPENSE_CATEGORY,
        }
    }

    /// Route path of the page listing this resource.
    pub fn route(self) -> &'static str {
        match self {
            Resource::Expense => "/expenses",
            Resource::Income => "/incomes",
            Resource::Worker => "/workers",
            Resource::Project => "/projects",
            Resource::ExpenseCategory => "/expense-categories",
        }
    }

    /// Resource whose page lives at `path`, if any.
    pub fn from_route(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        Self::ALL.into_iter().find(|r| r.route() == path)
    }

    /// Singular display name, e.g. "Expense Category".
    pub fn label(self) -> &'static str {
        self.schema().label
    }

    /// Plural display name used for page titles.
    pub fn plural_label(self) -> &'static str {
        match self {
            Resource::Expense => "Expenses",
            Resource::Income => "Incomes",
            Resource::Worker => "Workers",
            Resource::Project => "Projects",
            Resource::ExpenseCategory => "Expense Categories",
        }
    }
}

/// Wire type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Float,
    String,
    DateTime,
}

impl ScalarType {
    /// Name of the GraphQL scalar.
    pub fn graphql_name(self) -> &'static str {
        match self {
            ScalarType::Float => "Float",
            ScalarType::String => "String",
            ScalarType::DateTime => "DateTime",
        }
    }

    /// Human description used in parse errors.
    pub fn describe(self) -> &'static str {
        match self {
            ScalarType::Float => "number",
            ScalarType::String => "text",
            ScalarType::DateTime => "date (YYYY-MM-DD)",
        }
    }
}

/// Whether a field holds a plain value or points at another resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ScalarType),
    Reference(Resource),
}

/// One field of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Wire name, also the key in snapshots and drafts.
    pub name: &'static str,
    /// Display label.
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Read-only fields are listed and displayed but never submitted.
    pub editable: bool,
}

impl FieldDef {
    const fn scalar(name: &'static str, label: &'static str, ty: ScalarType) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Scalar(ty),
            required: false,
            editable: true,
        }
    }

    const fn reference(name: &'static str, label: &'static str, target: Resource) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Reference(target),
            required: false,
            editable: true,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Target resource when this is a reference field.
    pub fn target(&self) -> Option<Resource> {
        match self.kind {
            FieldKind::Reference(target) => Some(target),
            FieldKind::Scalar(_) => None,
        }
    }

    /// GraphQL type of the variable carrying this field in a mutation.
    /// References travel as the target's identifier.
    pub fn variable_type(&self, allow_required: bool) -> String {
        let base = match self.kind {
            FieldKind::Scalar(ty) => ty.graphql_name(),
            FieldKind::Reference(_) => "String",
        };
        if allow_required && self.required {
            format!("{base}!")
        } else {
            base.to_string()
        }
    }
}

/// Static description of a resource type.
#[derive(Debug, PartialEq, Eq)]
pub struct ResourceSchema {
    pub resource: Resource,
    /// Singular display name.
    pub label: &'static str,
    /// Fields in display order.
    pub fields: &'static [FieldDef],
    /// Field shown when another resource references this one.
    pub label_field: &'static str,
    /// Query returning every record, e.g. `getExpenses`.
    pub list_query: &'static str,
    pub create_mutation: &'static str,
    pub update_mutation: Option<&'static str>,
    pub delete_mutation: Option<&'static str>,
}

impl ResourceSchema {
    /// Look up a field by wire name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields the operator edits and mutations carry.
    pub fn editable_fields(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.fields.iter().filter(|f| f.editable)
    }

    /// Fields that must be filled before a create or update.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Distinct resources this schema references, in field order.
    pub fn referenced_resources(&self) -> Vec<Resource> {
        let mut targets = Vec::new();
        for target in self.fields.iter().filter_map(FieldDef::target) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }

    pub fn supports_update(&self) -> bool {
        self.update_mutation.is_some()
    }

    pub fn supports_delete(&self) -> bool {
        self.delete_mutation.is_some()
    }
}

pub static EXPENSE: ResourceSchema = ResourceSchema {
    resource: Resource::Expense,
    label: "Expense",
    fields: &[
        FieldDef::scalar("amount", "Amount", ScalarType::Float).required(),
        FieldDef::reference("category", "Category", Resource::ExpenseCategory).required(),
        FieldDef::reference("worker", "Worker", Resource::Worker),
        FieldDef::reference("project", "Project", Resource::Project),
        FieldDef::scalar("description", "Description", ScalarType::String),
        FieldDef::scalar("expense_date", "Expense date", ScalarType::DateTime).required(),
        FieldDef::scalar("created_at", "Created", ScalarType::DateTime).read_only(),
    ],
    label_field: "description",
    list_query: "getExpenses",
    create_mutation: "createExpense",
    update_mutation: Some("updateExpense"),
    delete_mutation: None,
};

pub static INCOME: ResourceSchema = ResourceSchema {
    resource: Resource::Income,
    label: "Income",
    fields: &[
        FieldDef::scalar("amount", "Amount", ScalarType::Float).required(),
        FieldDef::reference("project", "Project", Resource::Project).required(),
        FieldDef::scalar("description", "Description", ScalarType::String),
        FieldDef::scalar("income_date", "Income date", ScalarType::DateTime).required(),
        FieldDef::scalar("created_at", "Created", ScalarType::DateTime).read_only(),
    ],
    label_field: "description",
    list_query: "getIncomes",
    create_mutation: "createIncome",
    update_mutation: None,
    delete_mutation: None,
};

pub static WORKER: ResourceSchema = ResourceSchema {
    resource: Resource::Worker,
    label: "Worker",
    fields: &[
        FieldDef::scalar("name", "Name", ScalarType::String).required(),
        FieldDef::scalar("role", "Role", ScalarType::String).required(),
        FieldDef::scalar("salary", "Salary", ScalarType::Float).required(),
        FieldDef::scalar("created_at", "Created", ScalarType::DateTime).read_only(),
    ],
    label_field: "name",
    list_query: "getWorkers",
    create_mutation: "createWorker",
    update_mutation: None,
    delete_mutation: None,
};

pub static PROJECT: ResourceSchema = ResourceSchema {
    resource: Resource::Project,
    label: "Project",
    fields: &[
        FieldDef::scalar("name", "Name", ScalarType::String).required(),
        FieldDef::scalar("description", "Description", ScalarType::String).required(),
        FieldDef::scalar("income_amount", "Income total", ScalarType::Float).read_only(),
        FieldDef::scalar("created_at", "Created", ScalarType::DateTime).read_only(),
    ],
    label_field: "name",
    list_query: "getProjects",
    create_mutation: "createProject",
    update_mutation: None,
    delete_mutation: Some("deleteProject"),
};

pub static EXPENSE_CATEGORY: ResourceSchema = ResourceSchema {
    resource: Resource::ExpenseCategory,
    label: "Expense Category",
    fields: &[
        FieldDef::scalar("name", "Name", ScalarType::String).required(),
        FieldDef::scalar("description", "Description", ScalarType::String).required(),
        FieldDef::scalar("expense_amount", "Expense total", ScalarType::Float).read_only(),
        FieldDef::scalar("created_at", "Created", ScalarType::DateTime).read_only(),
    ],
    label_field: "name",
    list_query: "getExpenseCategories",
    create_mutation: "createExpenseCategory",
    update_mutation: None,
    delete_mutation: Some("deleteExpenseCategory"),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_match_resource_definitions() {
        let names = |r: Resource| r.schema().required_fields().map(|f| f.name).collect::<Vec<_>>();

        assert_eq!(names(Resource::Expense), ["amount", "category", "expense_date"]);
        assert_eq!(names(Resource::Income), ["amount", "project", "income_date"]);
        assert_eq!(names(Resource::Worker), ["name", "role", "salary"]);
        assert_eq!(names(Resource::Project), ["name", "description"]);
        assert_eq!(names(Resource::ExpenseCategory), ["name", "description"]);
    }

    #[test]
    fn expense_references_three_resources() {
        assert_eq!(
            EXPENSE.referenced_resources(),
            vec![Resource::ExpenseCategory, Resource::Worker, Resource::Project]
        );
        assert_eq!(INCOME.referenced_resources(), vec![Resource::Project]);
        assert!(WORKER.referenced_resources().is_empty());
    }

    #[test]
    fn read_only_fields_are_not_editable() {
        assert!(PROJECT.editable_fields().all(|f| f.name != "income_amount"));
        assert!(EXPENSE.editable_fields().all(|f| f.name != "created_at"));
        assert_eq!(EXPENSE.editable_fields().count(), 6);
    }

    #[test]
    fn routes_round_trip() {
        for (i, resource) in Resource::ALL.into_iter().enumerate() {
            assert_eq!(resource.index(), i);
            assert_eq!(Resource::from_route(resource.route()), Some(resource));
            assert!(std::ptr::eq(resource.schema().resource.schema(), resource.schema()));
        }
        assert_eq!(Resource::from_route("/expenses/"), Some(Resource::Expense));
        assert_eq!(Resource::from_route("/nowhere"), None);
    }

    #[test]
    fn variable_types_follow_requiredness() {
        let category = EXPENSE.field("category").unwrap();
        assert_eq!(category.variable_type(true), "String!");
        assert_eq!(category.variable_type(false), "String");
        let date = EXPENSE.field("expense_date").unwrap();
        assert_eq!(date.variable_type(true), "DateTime!");
    }
}
