//! GraphQL documents derived from the resource schemas.

use crate::schema::{FieldDef, FieldKind, ResourceSchema};

/// Credential exchange. Returns the new session token.
pub const LOGIN: &str = "mutation Login($username: String!, $password: String!) {
  login(loginInput: { username: $username, password: $password }) {
    access_token
  }
}";

/// Query for every record of `schema` plus the options of each resource it
/// references.
pub fn list_query(schema: &ResourceSchema) -> String {
    let mut doc = String::from("query {\n");
    doc.push_str(&format!("  {} {{\n", schema.list_query));
    doc.push_str(&record_selection(schema, "    "));
    doc.push_str("  }\n");
    for target in schema.referenced_resources() {
        let target = target.schema();
        doc.push_str(&format!(
            "  {} {{\n    id\n    {}\n  }}\n",
            target.list_query, target.label_field
        ));
    }
    doc.push('}');
    doc
}

/// Create mutation taking every editable field.
pub fn create_mutation(schema: &ResourceSchema) -> String {
    let fields: Vec<&FieldDef> = schema.editable_fields().collect();
    let declarations: Vec<String> = fields
        .iter()
        .map(|f| format!("${}: {}", f.name, f.variable_type(true)))
        .collect();
    let arguments: Vec<String> = fields.iter().map(|f| format!("{0}: ${0}", f.name)).collect();

    mutation_document(schema, schema.create_mutation, &declarations, &arguments)
}

/// Update mutation taking the identifier plus any subset of the editable
/// fields. `None` when the service offers no update for this resource.
pub fn update_mutation(schema: &ResourceSchema) -> Option<String> {
    let operation = schema.update_mutation?;
    let mut declarations = vec!["$id: String!".to_string()];
    let mut arguments = vec!["id: $id".to_string()];
    for field in schema.editable_fields() {
        declarations.push(format!("${}: {}", field.name, field.variable_type(false)));
        arguments.push(format!("{0}: ${0}", field.name));
    }

    Some(mutation_document(schema, operation, &declarations, &arguments))
}

/// Delete mutation keyed by identifier. The service answers with a boolean.
pub fn delete_mutation(schema: &ResourceSchema) -> Option<String> {
    let operation = schema.delete_mutation?;
    Some(format!(
        "mutation {}($id: String!) {{\n  {}(id: $id)\n}}",
        operation_name(operation),
        operation
    ))
}

fn mutation_document(
    schema: &ResourceSchema,
    operation: &str,
    declarations: &[String],
    arguments: &[String],
) -> String {
    format!(
        "mutation {}({}) {{\n  {}({}) {{\n{}  }}\n}}",
        operation_name(operation),
        declarations.join(", "),
        operation,
        arguments.join(", "),
        record_selection(schema, "    ")
    )
}

fn record_selection(schema: &ResourceSchema, indent: &str) -> String {
    let mut selection = format!("{indent}id\n");
    for field in schema.fields {
        match field.kind {
            FieldKind::Scalar(_) => selection.push_str(&format!("{indent}{}\n", field.name)),
            FieldKind::Reference(target) => selection.push_str(&format!(
                "{indent}{} {{ id {} }}\n",
                field.name,
                target.schema().label_field
            )),
        }
    }
    selection
}

/// `createExpense` -> `CreateExpense`.
fn operation_name(operation: &str) -> String {
    let mut chars = operation.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EXPENSE, EXPENSE_CATEGORY, INCOME, PROJECT, WORKER};

    #[test]
    fn list_query_pulls_reference_options() {
        let doc = list_query(&EXPENSE);
        assert!(doc.starts_with("query {\n  getExpenses {\n    id\n"));
        assert!(doc.contains("    category { id name }\n"));
        assert!(doc.contains("  getExpenseCategories {\n    id\n    name\n  }\n"));
        assert!(doc.contains("  getWorkers {"));
        assert!(doc.contains("  getProjects {"));
        assert!(doc.ends_with('}'));
    }

    #[test]
    fn create_mutation_marks_required_variables() {
        let doc = create_mutation(&EXPENSE);
        assert!(doc.starts_with("mutation CreateExpense($amount: Float!, $category: String!, $worker: String, $project: String, $description: String, $expense_date: DateTime!)"));
        assert!(doc.contains("createExpense(amount: $amount, category: $category"));
        assert!(!doc.contains("$created_at"));
    }

    #[test]
    fn update_mutation_makes_everything_optional() {
        let doc = update_mutation(&EXPENSE).unwrap();
        assert!(doc.starts_with("mutation UpdateExpense($id: String!, $amount: Float, $category: String, $worker: String, $project: String, $description: String, $expense_date: DateTime)"));
        assert!(doc.contains("updateExpense(id: $id, amount: $amount"));
    }

    #[test]
    fn only_expenses_can_be_updated() {
        for schema in [&INCOME, &WORKER, &PROJECT, &EXPENSE_CATEGORY] {
            assert!(update_mutation(schema).is_none(), "{}", schema.label);
        }
    }

    #[test]
    fn delete_mutation_only_where_supported() {
        assert_eq!(
            delete_mutation(&EXPENSE_CATEGORY).unwrap(),
            "mutation DeleteExpenseCategory($id: String!) {\n  deleteExpenseCategory(id: $id)\n}"
        );
        assert!(delete_mutation(&EXPENSE).is_none());
    }
}
