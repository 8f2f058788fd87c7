use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::contacts::types::ContactInput;

#[derive(Debug, Clone)]
pub struct ContactRowView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct CategoryOptionView {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

#[derive(Debug, Clone)]
pub struct ContactDetailView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub category: String,
}

#[derive(Debug, Clone)]
pub enum WebBody {
    ContactList {
        flash_error: Option<String>,
        contacts: Vec<ContactRowView>,
        categories: Vec<CategoryOptionView>,
    },
    ContactDetail(ContactDetailView),
    NewContact {
        errors: Vec<String>,
        form: ContactInput,
        categories: Vec<CategoryOptionView>,
    },
    EditContact {
        id: i64,
        errors: Vec<String>,
        form: ContactInput,
        categories: Vec<CategoryOptionView>,
    },
    NotFound,
    ServerError {
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct WebPage {
    pub title: String,
    pub path: String,
    pub body: WebBody,
}

pub fn render_page(page: &WebPage) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (page.title) " | Contacts" }
                style { (PreEscaped(styles())) }
            }
            body {
                div class="ct-app" {
                    (topbar(&page.path))
                    main id="ct-main" class="ct-main" {
                        (render_body(&page.body))
                    }
                }
            }
        }
    };

    markup.into_string()
}

fn topbar(path: &str) -> Markup {
    let nav = [("/contacts", "Contacts"), ("/contacts/new", "New contact")];

    html! {
        header class="ct-topbar" {
            div class="ct-brand" { "Contacts" }
            nav class="ct-nav" {
                @for (href, label) in nav {
                    a class={(if path == href { "ct-nav-link active" } else { "ct-nav-link" })} href=(href) { (label) }
                }
            }
        }
    }
}

fn render_body(body: &WebBody) -> Markup {
    match body {
        WebBody::ContactList {
            flash_error,
            contacts,
            categories,
        } => contact_list_panel(flash_error.as_deref(), contacts, categories),
        WebBody::ContactDetail(detail) => contact_detail_panel(detail),
        WebBody::NewContact {
            errors,
            form,
            categories,
        } => contact_form_panel(
            "New contact",
            "/contacts/new",
            "Add contact",
            errors,
            form,
            categories,
        ),
        WebBody::EditContact {
            id,
            errors,
            form,
            categories,
        } => contact_form_panel(
            "Edit contact",
            &format!("/contacts/{id}/edit"),
            "Save changes",
            errors,
            form,
            categories,
        ),
        WebBody::NotFound => html! {
            section class="ct-card" {
                h1 { "Page not found" }
                p class="ct-muted" { "The page you asked for does not exist." }
                a class="ct-btn" href="/contacts" { "Back to contacts" }
            }
        },
        WebBody::ServerError { message } => html! {
            section class="ct-card" {
                h1 { "Something went wrong" }
                div class="ct-notice error" { (message) }
                a class="ct-btn" href="/contacts" { "Back to contacts" }
            }
        },
    }
}

fn contact_list_panel(
    flash_error: Option<&str>,
    contacts: &[ContactRowView],
    categories: &[CategoryOptionView],
) -> Markup {
    html! {
        section class="ct-card" {
            h1 { "Contacts" }
            @if let Some(message) = flash_error {
                div class="ct-notice error" { (message) }
            }
            form method="post" action="/contacts" class="ct-filter" {
                @for option in categories {
                    label class="ct-radio" {
                        input type="radio" name="category" value=(option.value) checked[option.checked];
                        (option.label)
                    }
                }
                button type="submit" class="ct-btn" { "Filter" }
            }
            @if contacts.is_empty() {
                p class="ct-muted" { "No contacts yet." }
            } @else {
                table class="ct-table" {
                    thead {
                        tr {
                            th { "Name" }
                            th { "Email" }
                            th { "Phone" }
                            th { "Category" }
                            th {}
                        }
                    }
                    tbody {
                        @for contact in contacts {
                            tr {
                                td { a href={(format!("/contacts/{}", contact.id))} { (contact.name) } }
                                td { (contact.email) }
                                td { (contact.phone) }
                                td { (contact.category) }
                                td class="ct-actions" {
                                    a class="ct-btn subtle" href={(format!("/contacts/{}/edit", contact.id))} { "Edit" }
                                    form method="post" action={(format!("/contacts/{}/delete", contact.id))} {
                                        button type="submit" class="ct-btn danger" { "Delete" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
            a class="ct-btn primary" href="/contacts/new" { "New contact" }
        }
    }
}

fn contact_detail_panel(detail: &ContactDetailView) -> Markup {
    html! {
        section class="ct-card" {
            h1 { (detail.name) }
            dl class="ct-detail" {
                dt { "Name" } dd { (detail.name) }
                dt { "Email" } dd { (detail.email) }
                dt { "Phone" } dd { (detail.phone) }
                @if !detail.category.is_empty() {
                    dt { "Category" } dd { (detail.category) }
                }
            }
            div class="ct-actions" {
                a class="ct-btn" href={(format!("/contacts/{}/edit", detail.id))} { "Edit" }
                form method="post" action={(format!("/contacts/{}/delete", detail.id))} {
                    button type="submit" class="ct-btn danger" { "Delete" }
                }
                a class="ct-btn subtle" href="/contacts" { "All contacts" }
            }
        }
    }
}

fn contact_form_panel(
    heading: &str,
    action: &str,
    submit_label: &str,
    errors: &[String],
    form: &ContactInput,
    categories: &[CategoryOptionView],
) -> Markup {
    html! {
        section class="ct-card" {
            h1 { (heading) }
            @if !errors.is_empty() {
                ul class="ct-notice error" {
                    @for error in errors {
                        li { (error) }
                    }
                }
            }
            form method="post" action=(action) class="ct-form" {
                label for="first_name" { "First name" }
                input id="first_name" type="text" name="first_name" value=(form.first_name);
                label for="last_name" { "Last name" }
                input id="last_name" type="text" name="last_name" value=(form.last_name);
                label for="email" { "Email" }
                input id="email" type="text" name="email" value=(form.email);
                label for="phone" { "Phone" }
                input id="phone" type="text" name="phone" value=(form.phone);
                fieldset class="ct-categories" {
                    legend { "Category" }
                    @for option in categories {
                        label class="ct-radio" {
                            input type="radio" name="category" value=(option.value) checked[option.checked];
                            (option.label)
                        }
                    }
                }
                button type="submit" class="ct-btn primary" { (submit_label) }
            }
        }
    }
}

fn styles() -> &'static str {
    r#"
:root {
  --bg: #f5f6f8;
  --panel: #ffffff;
  --panel-border: #d9dde4;
  --text: #1d2330;
  --muted: #5f6b7f;
  --accent: #1f6feb;
  --danger: #c62f3f;
}
* { box-sizing: border-box; }
html, body { margin: 0; min-height: 100%; background: var(--bg); color: var(--text); }
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; }
.ct-topbar { display: flex; gap: 1rem; align-items: center; padding: 0.8rem 1rem; border-bottom: 1px solid var(--panel-border); background: var(--panel); }
.ct-brand { font-weight: 700; text-transform: uppercase; letter-spacing: 0.04em; font-size: 0.85rem; }
.ct-nav { display: flex; gap: 0.4rem; }
.ct-nav-link { text-decoration: none; color: var(--muted); padding: 0.35rem 0.6rem; border-radius: 8px; }
.ct-nav-link.active { color: var(--accent); background: rgba(31, 111, 235, 0.08); }
.ct-main { padding: 1rem; max-width: 960px; margin: 0 auto; }
.ct-card { border: 1px solid var(--panel-border); border-radius: 12px; background: var(--panel); padding: 1rem 1.2rem; }
.ct-card h1 { margin-top: 0; }
.ct-btn { display: inline-block; border: 1px solid var(--panel-border); border-radius: 8px; background: var(--panel); color: var(--text); padding: 0.4rem 0.7rem; font: inherit; text-decoration: none; cursor: pointer; }
.ct-btn.primary { background: var(--accent); border-color: var(--accent); color: #fff; margin-top: 0.8rem; }
.ct-btn.subtle { color: var(--muted); }
.ct-btn.danger { color: var(--danger); }
.ct-filter { display: flex; flex-wrap: wrap; gap: 0.6rem; align-items: center; margin-bottom: 1rem; }
.ct-radio { display: inline-flex; gap: 0.3rem; align-items: center; }
.ct-table { width: 100%; border-collapse: collapse; }
.ct-table th, .ct-table td { text-align: left; padding: 0.45rem; border-bottom: 1px solid var(--panel-border); }
.ct-actions { display: flex; gap: 0.4rem; align-items: center; }
.ct-actions form { margin: 0; }
.ct-form { display: grid; gap: 0.5rem; max-width: 420px; }
.ct-form input[type=text] { padding: 0.45rem 0.55rem; border: 1px solid var(--panel-border); border-radius: 8px; font: inherit; }
.ct-categories { border: 1px solid var(--panel-border); border-radius: 8px; display: flex; flex-wrap: wrap; gap: 0.6rem; }
.ct-detail { display: grid; grid-template-columns: max-content 1fr; gap: 0.35rem 1rem; }
.ct-detail dt { color: var(--muted); }
.ct-detail dd { margin: 0; }
.ct-notice { border-radius: 8px; padding: 0.6rem 0.8rem; margin: 0 0 1rem; }
.ct-notice.error { border: 1px solid rgba(198, 47, 63, 0.45); background: rgba(198, 47, 63, 0.08); color: var(--danger); }
ul.ct-notice { padding-left: 1.6rem; }
.ct-muted { color: var(--muted); }
"#
}

#[cfg(test)]
mod tests {
    use super::{CategoryOptionView, ContactRowView, WebBody, WebPage, render_page};
    use crate::contacts::types::ContactInput;

    fn option(value: &str, checked: bool) -> CategoryOptionView {
        CategoryOptionView {
            value: value.to_string(),
            label: value.to_string(),
            checked,
        }
    }

    #[test]
    fn contact_list_renders_rows_and_checked_filter() {
        let page = WebPage {
            title: "Contacts".to_string(),
            path: "/contacts".to_string(),
            body: WebBody::ContactList {
                flash_error: Some("The specified contact was not found.".to_string()),
                contacts: vec![ContactRowView {
                    id: 3,
                    name: "Jo Lee".to_string(),
                    email: "jo@lee.com".to_string(),
                    phone: "555 123 4567".to_string(),
                    category: "work".to_string(),
                }],
                categories: vec![option("work", true), option("family", false)],
            },
        };

        let html = render_page(&page);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("href=\"/contacts/3\""));
        assert!(html.contains("action=\"/contacts/3/delete\""));
        assert!(html.contains("Jo Lee"));
        assert!(html.contains("The specified contact was not found."));
        assert!(html.contains("value=\"work\" checked"));
        assert!(!html.contains("value=\"family\" checked"));
        assert!(html.contains("class=\"ct-nav-link active\" href=\"/contacts\""));
    }

    #[test]
    fn form_escapes_submitted_values_and_lists_errors() {
        let page = WebPage {
            title: "New contact".to_string(),
            path: "/contacts/new".to_string(),
            body: WebBody::NewContact {
                errors: vec!["Email Input Wrong, example@info.com format".to_string()],
                form: ContactInput {
                    first_name: "<script>".to_string(),
                    ..ContactInput::default()
                },
                categories: Vec::new(),
            },
        };

        let html = render_page(&page);
        assert!(html.contains("<li>Email Input Wrong, example@info.com format</li>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("value=\"<script>\""));
        assert!(html.contains("action=\"/contacts/new\""));
    }
}
