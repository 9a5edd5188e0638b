//! Macros for reducing boilerplate when defining documents

/// Implement [`Entity`](crate::core::entity::Entity) for a struct
///
/// The struct must carry `id: Uuid`, `created_at: DateTime<Utc>` and
/// `updated_at: DateTime<Utc>` fields. Store both timestamps through
/// [`timestamp`](crate::core::entity::timestamp) so they sort as strings.
///
/// # Example
/// ```rust,ignore
/// #[derive(Clone, Debug, Serialize, Deserialize)]
/// pub struct Hub {
///     pub id: Uuid,
///     pub name: String,
///     #[serde(with = "crate::core::entity::timestamp")]
///     pub created_at: DateTime<Utc>,
///     #[serde(with = "crate::core::entity::timestamp")]
///     pub updated_at: DateTime<Utc>,
/// }
///
/// impl_entity!(Hub, "hub", "hubs");
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($type:ident, $singular:expr, $plural:expr) => {
        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }

            fn touch(&mut self) {
                self.updated_at = ::chrono::Utc::now();
            }
        }
    };
}

/// Implement the audit accessors shared by aggregates created and
/// edited by staff (`created_by` / `updated_by`)
#[macro_export]
macro_rules! impl_audited {
    ($type:ident) => {
        impl $type {
            /// Record `caller` as the last editor
            pub fn stamp_updated_by(&mut self, caller: &$crate::core::auth::Caller) {
                self.updated_by = Some(caller.id.clone());
            }
        }
    };
}
