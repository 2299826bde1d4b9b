//! Builders turning cached collections and form state into page views.

use crudboard_api_types::{Product, Role, User};

use crate::application::{
    collection::{FormSnapshot, Resource},
    products::Products,
    routes::Route,
    users::Users,
};
use crate::cache::QueryEntry;
use crate::domain::forms::{ProductDraft, UserDraft};

use super::views::{CollectionView, FieldView, FormView, RowView, SelectOptionView};

pub fn users_view(
    entry: &QueryEntry<Vec<User>>,
    form: &FormSnapshot<UserDraft>,
) -> CollectionView {
    let draft = &form.draft;
    let role_options = [Role::User, Role::Admin]
        .into_iter()
        .map(|role| SelectOptionView {
            value: role.as_str(),
            label: role_label(role),
            selected: draft.role == role,
        })
        .collect();
    let fields = vec![
        FieldView::input("name", "Name", "text", &draft.name),
        FieldView::input("email", "Email", "email", &draft.email),
        FieldView::select("role", "Role", role_options),
    ];

    collection_view::<Users, _>(
        entry,
        "Users",
        vec!["Name", "Email", "Role"],
        |user| RowView {
            key: user.id.to_string(),
            cells: vec![
                user.name.clone(),
                user.email.clone(),
                user.role.as_str().to_string(),
            ],
        },
        FormView::new(form, Route::Users, "Add User", "Create User", fields),
    )
}

pub fn products_view(
    entry: &QueryEntry<Vec<Product>>,
    form: &FormSnapshot<ProductDraft>,
) -> CollectionView {
    let draft = &form.draft;
    let fields = vec![
        FieldView::input("name", "Name", "text", &draft.name),
        FieldView::number("price", "Price", "0.01", &draft.price),
        FieldView::input("category", "Category", "text", &draft.category),
    ];

    collection_view::<Products, _>(
        entry,
        "Products",
        vec!["Name", "Price", "Category"],
        |product| RowView {
            key: product.id.to_string(),
            cells: vec![
                product.name.clone(),
                format!("${}", product.price),
                product.category.clone(),
            ],
        },
        FormView::new(form, Route::Products, "Add Product", "Create Product", fields),
    )
}

fn collection_view<R, F>(
    entry: &QueryEntry<Vec<R::Record>>,
    heading: &'static str,
    columns: Vec<&'static str>,
    row: F,
    form: FormView,
) -> CollectionView
where
    R: Resource,
    F: Fn(&R::Record) -> RowView,
{
    let rows: Vec<RowView> = entry
        .data
        .as_deref()
        .map(|records| records.iter().map(&row).collect())
        .unwrap_or_default();

    CollectionView {
        heading,
        is_loading: entry.is_loading(),
        is_error: entry.is_error(),
        is_refreshing: entry.is_fetching && !entry.is_loading(),
        error_message: R::LOAD_FAILED_MESSAGE,
        empty_message: "Nothing here yet.",
        columns,
        rows,
        form,
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Admin => "Admin",
        Role::User | Role::Other => "User",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crudboard_api_types::RecordId;

    use super::*;
    use crate::application::forms::FormPhase;
    use crate::cache::{QueryKey, QueryStatus};

    fn entry<T>(data: Option<T>, status: QueryStatus) -> QueryEntry<T> {
        QueryEntry {
            key: QueryKey::from("products"),
            data: data.map(Arc::new),
            status,
            error: None,
            is_fetching: false,
            last_fetched_at: None,
            stale_after: Duration::from_secs(300),
            invalidated: false,
        }
    }

    fn closed<D: Default>() -> FormSnapshot<D> {
        FormSnapshot {
            phase: FormPhase::Closed,
            draft: D::default(),
        }
    }

    #[test]
    fn product_prices_are_shown_in_dollars() {
        let products = vec![Product {
            id: RecordId::Int(1),
            name: "Widget".into(),
            price: "9.99".into(),
            category: "Tools".into(),
        }];
        let view = products_view(&entry(Some(products), QueryStatus::Success), &closed());

        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].cells, vec!["Widget", "$9.99", "Tools"]);
        assert_eq!(view.form.toggle_label, "Add Product");
        assert!(!view.form.is_open);
    }

    #[test]
    fn price_field_is_a_cent_step_number_input() {
        let view = products_view(&entry(Some(Vec::new()), QueryStatus::Success), &closed());
        let price = &view.form.fields[1];

        assert_eq!(price.name, "price");
        assert_eq!(price.input_type, "number");
        assert_eq!(price.step, Some("0.01"));
        assert_eq!(view.form.fields[0].step, None);
    }

    #[test]
    fn read_failure_uses_inline_message() {
        let view = users_view(&entry(None, QueryStatus::Error), &closed());
        assert!(view.is_error);
        assert_eq!(view.error_message, "Error loading users");
        assert!(view.rows.is_empty());
    }

    #[test]
    fn open_form_keeps_draft_values() {
        let form = FormSnapshot {
            phase: FormPhase::Editing,
            draft: UserDraft {
                name: "Ann".into(),
                email: "ann@example.com".into(),
                role: Role::Admin,
            },
        };
        let view = users_view(&entry(Some(Vec::new()), QueryStatus::Success), &form);

        assert!(view.form.is_open);
        assert_eq!(view.form.toggle_label, "Cancel");
        assert_eq!(view.form.fields[0].value, "Ann");
        let role = &view.form.fields[2];
        assert!(role.is_select);
        assert!(role.options.iter().any(|option| option.value == "admin" && option.selected));
    }
}
