//! Metadata lookups against the business-application server.
//!
//! [`MetadataSource`] is the seam between reference resolution and the
//! remote server. Every lookup returns a typed [`LookupError`] so callers
//! can log the root cause; the resolver treats all of them as not found.

mod rpc;

pub use rpc::OdooRpc;

use crate::reference::{FieldText, MenuText};
use thiserror::Error;

/// Why a lookup produced no value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("no such record")]
    NotFound,

    #[error("{0} records match, expected one")]
    Ambiguous(usize),

    #[error("server error: {0}")]
    Remote(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

pub type Lookup<T = String> = Result<T, LookupError>;

/// Documentation of one model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDoc {
    pub name: String,
    pub label: Option<String>,
    pub help: Option<String>,
}

/// An installed module and the modules it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub depends: Vec<String>,
}

/// Audit fields never listed in field documentation.
pub const AUDIT_FIELDS: &[&str] = &["create_uid", "create_date", "write_uid", "write_date"];

/// Read-only access to model, field and menu metadata.
///
/// Implementations must not have observable side effects; lookups may be
/// issued in any order and any number of times.
pub trait MetadataSource {
    /// Label or help text of `model.field`, localized to `locale`.
    fn lookup_field(&self, model: &str, field: &str, text: FieldText, locale: &str) -> Lookup;

    /// Breadcrumb (`A/B/C`) or name of the menu with xml id `module.menu`.
    fn lookup_menu(&self, module: &str, menu: &str, text: MenuText, locale: &str) -> Lookup;

    /// Human-readable name of `model`.
    fn lookup_model(&self, model: &str, locale: &str) -> Lookup;

    /// Documentation of the given fields of `model`, in the given order, or
    /// of every field when `fields` is `None`. Audit fields are left out.
    fn lookup_field_docs(
        &self,
        model: &str,
        fields: Option<&[String]>,
        locale: &str,
    ) -> Lookup<Vec<FieldDoc>>;
}

/// Deployment facts the build orchestrator needs besides reference lookups.
pub trait Deployment {
    /// Modules in state `installed`.
    fn installed_modules(&self) -> Lookup<Vec<ModuleInfo>>;

    /// Decoded logo of the current user's company, if it has one.
    fn company_logo(&self) -> Lookup<Option<Vec<u8>>>;
}

#[cfg(test)]
pub mod stub {
    //! In-memory metadata source for tests.

    use super::*;
    use std::{cell::Cell, collections::HashMap};

    #[derive(Default)]
    pub struct StubSource {
        pub labels: HashMap<(String, String), String>,
        pub helps: HashMap<(String, String), String>,
        pub menus: HashMap<(String, String), (String, String)>,
        pub models: HashMap<String, String>,
        pub modules: Vec<ModuleInfo>,
        pub logo: Option<Vec<u8>>,
        pub calls: Cell<usize>,
    }

    fn key(a: &str, b: &str) -> (String, String) {
        (a.to_owned(), b.to_owned())
    }

    impl StubSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn field(mut self, model: &str, field: &str, label: &str, help: Option<&str>) -> Self {
            self.labels.insert(key(model, field), label.to_owned());
            if let Some(help) = help {
                self.helps.insert(key(model, field), help.to_owned());
            }
            self
        }

        /// Register a menu by its breadcrumb; the name is the last segment.
        pub fn menu(mut self, module: &str, menu: &str, breadcrumb: &str) -> Self {
            let name = breadcrumb.rsplit('/').next().unwrap_or(breadcrumb);
            self.menus
                .insert(key(module, menu), (breadcrumb.to_owned(), name.to_owned()));
            self
        }

        pub fn model(mut self, model: &str, name: &str) -> Self {
            self.models.insert(model.to_owned(), name.to_owned());
            self
        }

        fn hit(&self) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    impl MetadataSource for StubSource {
        fn lookup_field(&self, model: &str, field: &str, text: FieldText, _: &str) -> Lookup {
            self.hit();
            let table = match text {
                FieldText::Label => &self.labels,
                FieldText::Help => &self.helps,
            };
            table.get(&key(model, field)).cloned().ok_or(LookupError::NotFound)
        }

        fn lookup_menu(&self, module: &str, menu: &str, text: MenuText, _: &str) -> Lookup {
            self.hit();
            let (breadcrumb, name) = self.menus.get(&key(module, menu)).ok_or(LookupError::NotFound)?;
            Ok(match text {
                MenuText::Breadcrumb => breadcrumb.clone(),
                MenuText::NameOnly => name.clone(),
            })
        }

        fn lookup_model(&self, model: &str, _: &str) -> Lookup {
            self.hit();
            self.models.get(model).cloned().ok_or(LookupError::NotFound)
        }

        fn lookup_field_docs(
            &self,
            model: &str,
            fields: Option<&[String]>,
            _: &str,
        ) -> Lookup<Vec<FieldDoc>> {
            self.hit();
            if !self.models.contains_key(model) {
                return Err(LookupError::NotFound);
            }
            let mut names: Vec<String> = match fields {
                Some(fields) => fields.to_vec(),
                None => {
                    let mut all: Vec<String> = self
                        .labels
                        .keys()
                        .filter(|(m, _)| m == model)
                        .map(|(_, f)| f.clone())
                        .collect();
                    all.sort();
                    all
                }
            };
            names.retain(|name| !AUDIT_FIELDS.contains(&name.as_str()));
            Ok(names
                .into_iter()
                .filter(|name| self.labels.contains_key(&key(model, name)))
                .map(|name| FieldDoc {
                    label: self.labels.get(&key(model, &name)).cloned(),
                    help: self.helps.get(&key(model, &name)).cloned(),
                    name,
                })
                .collect())
        }
    }

    impl Deployment for StubSource {
        fn installed_modules(&self) -> Lookup<Vec<ModuleInfo>> {
            Ok(self.modules.clone())
        }

        fn company_logo(&self) -> Lookup<Option<Vec<u8>>> {
            Ok(self.logo.clone())
        }
    }
}
