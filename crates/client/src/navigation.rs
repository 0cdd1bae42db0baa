//! Role-dependent navigation menu.
//!
//! Tenants get a fixed route list. Staff get a categorized menu built from a
//! static map, extended with whatever extra forms the backend grants them.

use serde::{Deserialize, Serialize};

use arkedia_auth::UserRecord;
use arkedia_core::UserId;

use crate::error::ClientError;
use crate::http::{ApiClient, ApiRequest};
use crate::payload::data_array;
use crate::routes;

const FORMS_PATH: &str = "/permissions/forms";

pub const FALLBACK_ICON: &str = "circle";
pub const FALLBACK_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Security,
    Masters,
    Transactions,
    Accounts,
    Finance,
    Other,
}

impl Category {
    /// Display order.
    pub const ALL: [Category; 6] = [
        Category::Security,
        Category::Masters,
        Category::Transactions,
        Category::Accounts,
        Category::Finance,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Security => "Security",
            Category::Masters => "Masters",
            Category::Transactions => "Transactions",
            Category::Accounts => "Accounts",
            Category::Finance => "Finance",
            Category::Other => "Other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }

    fn expanded_by_default(self) -> bool {
        self == Category::Masters
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub page_name: String,
    pub page_url: String,
}

impl PageLink {
    pub fn new(page_name: impl Into<String>, page_url: impl Into<String>) -> Self {
        Self {
            page_name: page_name.into(),
            page_url: page_url.into(),
        }
    }

    pub fn icon(&self) -> &'static str {
        icon_for(&self.page_name)
    }
}

/// A form the backend lets the user reach (`GET /permissions/forms`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormEntry {
    #[serde(default)]
    pub page_name: String,
    #[serde(default)]
    pub page_url: String,
    #[serde(default)]
    pub page_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuCategory {
    pub category: Category,
    pub pages: Vec<PageLink>,
    pub expanded: bool,
}

impl MenuCategory {
    pub fn color(&self) -> &'static str {
        category_color(self.category.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationMenu {
    /// Nobody is logged in.
    Empty,
    Tenant { items: Vec<PageLink> },
    Staff {
        dashboard: PageLink,
        categories: Vec<MenuCategory>,
    },
}

impl NavigationMenu {
    pub fn category(&self, category: Category) -> Option<&MenuCategory> {
        match self {
            NavigationMenu::Staff { categories, .. } => {
                categories.iter().find(|c| c.category == category)
            }
            _ => None,
        }
    }

    pub fn is_expanded(&self, category: Category) -> bool {
        self.category(category).is_some_and(|c| c.expanded)
    }

    /// Flip a category open or closed. Returns the new state.
    pub fn toggle(&mut self, category: Category) -> Option<bool> {
        let NavigationMenu::Staff { categories, .. } = self else {
            return None;
        };
        let entry = categories.iter_mut().find(|c| c.category == category)?;
        entry.expanded = !entry.expanded;
        Some(entry.expanded)
    }

    /// Every link in display order.
    pub fn links(&self) -> Vec<&PageLink> {
        match self {
            NavigationMenu::Empty => Vec::new(),
            NavigationMenu::Tenant { items } => items.iter().collect(),
            NavigationMenu::Staff {
                dashboard,
                categories,
            } => std::iter::once(dashboard)
                .chain(categories.iter().flat_map(|c| c.pages.iter()))
                .collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Static menus
// ─────────────────────────────────────────────────────────────────────────────

fn static_pages(category: Category) -> Vec<PageLink> {
    let pages: &[(&str, &str)] = match category {
        Category::Security => &[
            ("Users", "/admin/users"),
            ("User Permissions", "/admin/user-permissions"),
        ],
        Category::Masters => &[
            ("Properties", "/admin/properties"),
            ("Rooms", "/admin/rooms"),
            ("Tenants", "/admin/tenants"),
            ("Employees", "/admin/employees"),
            ("Vendors", "/admin/vendors"),
        ],
        Category::Transactions => &[
            ("Bookings", "/admin/bookings"),
            ("Maintenance Requests", "/admin/maintenance"),
            ("Complaints", "/admin/complaints"),
        ],
        Category::Accounts => &[
            ("Payments", "/admin/payments"),
            ("Expenses", "/admin/expenses"),
        ],
        Category::Finance => &[
            ("Invoices", "/admin/invoices"),
            ("Deposits", "/admin/deposits"),
        ],
        Category::Other => &[],
    };
    pages
        .iter()
        .map(|(name, url)| PageLink::new(*name, *url))
        .collect()
}

pub fn tenant_menu() -> Vec<PageLink> {
    vec![
        PageLink::new("Dashboard", routes::TENANT_DASHBOARD),
        PageLink::new("My Room", "/tenant/room"),
        PageLink::new("Payments", "/tenant/payments"),
        PageLink::new("Maintenance", "/tenant/maintenance"),
        PageLink::new("Profile", "/tenant/profile"),
        PageLink::new("Change Password", routes::CHANGE_PASSWORD),
    ]
}

/// Dashboards and the password page never go in the categorized menu.
pub fn is_excluded_form(form: &FormEntry) -> bool {
    let name = form.page_name.to_ascii_lowercase();
    name.contains("dashboard")
        || name.contains("change password")
        || form.page_url.trim() == routes::CHANGE_PASSWORD
}

/// Build the staff menu from the static map plus the fetched forms.
pub fn compose_staff_menu(forms: &[FormEntry]) -> NavigationMenu {
    let mut categories: Vec<MenuCategory> = Category::ALL
        .into_iter()
        .map(|category| MenuCategory {
            category,
            pages: static_pages(category),
            expanded: category.expanded_by_default(),
        })
        .collect();

    for form in forms {
        let known = categories
            .iter()
            .flat_map(|c| c.pages.iter())
            .any(|p| p.page_url == form.page_url);
        if known || form.page_url.trim().is_empty() || is_excluded_form(form) {
            continue;
        }
        if let Some(other) = categories.iter_mut().find(|c| c.category == Category::Other) {
            other.pages.push(PageLink::new(&form.page_name, &form.page_url));
        }
    }

    for form in forms {
        let Some(category) = form.page_category.as_deref().and_then(Category::from_label) else {
            continue;
        };
        if let Some(entry) = categories.iter_mut().find(|c| c.category == category) {
            entry.expanded = true;
        }
    }

    NavigationMenu::Staff {
        dashboard: PageLink::new("Dashboard", routes::ADMIN_DASHBOARD),
        categories,
    }
}

pub fn static_staff_menu() -> NavigationMenu {
    compose_staff_menu(&[])
}

// ─────────────────────────────────────────────────────────────────────────────
// Icons and colours
// ─────────────────────────────────────────────────────────────────────────────

pub fn icon_for(page_name: &str) -> &'static str {
    match page_name.trim().to_ascii_lowercase().as_str() {
        "dashboard" => "layout-dashboard",
        "users" => "users",
        "user permissions" => "shield-check",
        "properties" => "building",
        "rooms" | "my room" => "door-open",
        "tenants" => "user-round",
        "employees" => "briefcase",
        "vendors" => "truck",
        "bookings" => "calendar",
        "maintenance" | "maintenance requests" => "wrench",
        "complaints" => "message-square-warning",
        "payments" => "credit-card",
        "expenses" => "receipt",
        "invoices" => "file-text",
        "deposits" => "piggy-bank",
        "profile" => "user",
        "change password" => "key-round",
        _ => FALLBACK_ICON,
    }
}

pub fn category_color(category: &str) -> &'static str {
    match Category::from_label(category) {
        Some(Category::Security) => "#dc2626",
        Some(Category::Masters) => "#2563eb",
        Some(Category::Transactions) => "#16a34a",
        Some(Category::Accounts) => "#d97706",
        Some(Category::Finance) => "#7c3aed",
        Some(Category::Other) | None => FALLBACK_COLOR,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Composer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NavigationComposer {
    client: ApiClient,
}

impl NavigationComposer {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn fetch_forms(&self, user_id: &UserId) -> Result<Vec<FormEntry>, ClientError> {
        let request = ApiRequest::get(FORMS_PATH).query("userId", user_id.to_string());
        let body = self.client.send(request).await?;
        data_array(&body)
    }

    /// Build the menu for `user`. Only staff trigger a backend call; if it
    /// fails the static staff menu is returned.
    pub async fn compose(&self, user: Option<&UserRecord>) -> NavigationMenu {
        let Some(user) = user else {
            return NavigationMenu::Empty;
        };

        match &user.role {
            Some(role) if role.is_staff() => match self.fetch_forms(&user.id).await {
                Ok(forms) => compose_staff_menu(&forms),
                Err(e) => {
                    tracing::warn!(user_id = %user.id, "could not load permitted forms: {e}");
                    static_staff_menu()
                }
            },
            _ => NavigationMenu::Tenant {
                items: tenant_menu(),
            },
        }
    }
}
