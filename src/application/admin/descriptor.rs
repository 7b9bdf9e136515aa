//! Declarative admin configuration for categories.
//!
//! The descriptor is static data: which columns the change list renders,
//! which filters and search fields it offers, how it is ordered and grouped,
//! and how the edit form is laid out. The only dynamic piece, the published
//! post count, is computed by [`AdminCategoryService`].
//!
//! [`AdminCategoryService`]: crate::application::admin::categories::AdminCategoryService

use serde::Serialize;

use crate::domain::categories::PostsStatus;

/// Column rendered for each change-list row.
pub const PUBLISHED_POSTS_COUNT: &str = "published_posts_count";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListFilter {
    /// Custom lookup filter over the related posts.
    Lookup {
        parameter: &'static str,
        title: &'static str,
    },
    /// Equality filter on a stored boolean field.
    Field { field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fieldset {
    pub name: Option<&'static str>,
    pub fields: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComputedField {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelAdmin {
    pub model: &'static str,
    pub admin_priority: u8,
    pub list_display: &'static [&'static str],
    pub computed_fields: &'static [ComputedField],
    pub list_filter: &'static [ListFilter],
    pub search_fields: &'static [&'static str],
    pub date_hierarchy: &'static str,
    pub ordering: &'static [&'static str],
    pub save_on_top: bool,
    pub fieldsets: &'static [Fieldset],
    pub readonly_fields: &'static [&'static str],
}

pub const CATEGORY_ADMIN: ModelAdmin = ModelAdmin {
    model: "category",
    admin_priority: 1,
    list_display: &[
        "title",
        "slug",
        "is_published",
        PUBLISHED_POSTS_COUNT,
        "modified_at",
    ],
    computed_fields: &[ComputedField {
        name: PUBLISHED_POSTS_COUNT,
        description: "Published Posts",
    }],
    list_filter: &[
        ListFilter::Lookup {
            parameter: PostsStatus::PARAMETER,
            title: PostsStatus::TITLE,
        },
        ListFilter::Field {
            field: "is_published",
        },
    ],
    search_fields: &["title"],
    date_hierarchy: "created_at",
    ordering: &["title"],
    save_on_top: true,
    fieldsets: &[
        Fieldset {
            name: None,
            fields: &["title", "slug", "is_published"],
        },
        Fieldset {
            name: Some("Timestamps"),
            fields: &["created_at", "modified_at"],
        },
    ],
    readonly_fields: &["created_at", "modified_at", "slug"],
};

impl ModelAdmin {
    pub fn is_readonly(&self, field: &str) -> bool {
        self.readonly_fields.contains(&field)
    }

    /// Form fields, in fieldset order, that a submission may change.
    pub fn editable_fields(&self) -> Vec<&'static str> {
        self.fieldsets
            .iter()
            .flat_map(|set| set.fields.iter().copied())
            .filter(|field| !self.is_readonly(field))
            .collect()
    }

    /// Names in `submitted` that are read-only, in submission order.
    pub fn reject_readonly<'a, I>(&self, submitted: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        submitted
            .into_iter()
            .filter(|field| self.is_readonly(field))
            .map(str::to_string)
            .collect()
    }

    pub fn is_computed(&self, column: &str) -> bool {
        self.computed_fields.iter().any(|field| field.name == column)
    }
}

/// Field a change list may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    Title,
    CreatedAt,
    ModifiedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListOrdering {
    pub field: OrderField,
    pub descending: bool,
}

impl Default for ListOrdering {
    /// The descriptor's `ordering`: title ascending.
    fn default() -> Self {
        Self {
            field: OrderField::Title,
            descending: false,
        }
    }
}

impl ListOrdering {
    /// Parse an explicit override such as `-created_at`. Returns `None` for
    /// anything that is not an orderable column.
    pub fn parse(value: &str) -> Option<Self> {
        let (descending, name) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };

        let field = match name {
            "title" => OrderField::Title,
            "created_at" => OrderField::CreatedAt,
            "modified_at" => OrderField::ModifiedAt,
            _ => return None,
        };

        Some(Self { field, descending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_columns_are_in_display_order() {
        assert_eq!(
            CATEGORY_ADMIN.list_display,
            &[
                "title",
                "slug",
                "is_published",
                "published_posts_count",
                "modified_at"
            ]
        );
        assert!(CATEGORY_ADMIN.is_computed("published_posts_count"));
        assert!(!CATEGORY_ADMIN.is_computed("title"));
    }

    #[test]
    fn filters_search_and_hierarchy() {
        assert_eq!(CATEGORY_ADMIN.list_filter.len(), 2);
        assert!(matches!(
            CATEGORY_ADMIN.list_filter[0],
            ListFilter::Lookup {
                parameter: "posts_status",
                ..
            }
        ));
        assert_eq!(
            CATEGORY_ADMIN.list_filter[1],
            ListFilter::Field {
                field: "is_published"
            }
        );
        assert_eq!(CATEGORY_ADMIN.search_fields, &["title"]);
        assert_eq!(CATEGORY_ADMIN.date_hierarchy, "created_at");
        assert_eq!(CATEGORY_ADMIN.ordering, &["title"]);
    }

    #[test]
    fn fieldsets_group_timestamps_separately() {
        let [main, timestamps] = CATEGORY_ADMIN.fieldsets else {
            panic!("expected two fieldsets");
        };
        assert_eq!(main.name, None);
        assert_eq!(main.fields, &["title", "slug", "is_published"]);
        assert_eq!(timestamps.name, Some("Timestamps"));
        assert_eq!(timestamps.fields, &["created_at", "modified_at"]);
    }

    #[test]
    fn only_title_and_flag_are_editable() {
        assert_eq!(CATEGORY_ADMIN.editable_fields(), vec!["title", "is_published"]);
        assert_eq!(
            CATEGORY_ADMIN.reject_readonly(["title", "slug", "modified_at"]),
            vec!["slug".to_string(), "modified_at".to_string()]
        );
        assert!(CATEGORY_ADMIN.reject_readonly(["title"]).is_empty());
    }

    #[test]
    fn ordering_overrides() {
        assert_eq!(ListOrdering::parse("title"), Some(ListOrdering::default()));
        assert_eq!(
            ListOrdering::parse("-created_at"),
            Some(ListOrdering {
                field: OrderField::CreatedAt,
                descending: true,
            })
        );
        assert_eq!(ListOrdering::parse("slug"), None);
        assert_eq!(ListOrdering::parse("-"), None);
    }
}
