//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [base] Section Defaults
// ============================================================================

pub mod base {
    pub fn project() -> String {
        "Innubo".into()
    }

    pub fn version() -> String {
        "1.0".into()
    }
}

// ============================================================================
// [odoo] Section Defaults
// ============================================================================

pub mod odoo {
    pub fn server() -> String {
        "http://localhost:8069".into()
    }

    pub fn lang() -> String {
        "es_ES".into()
    }

    pub fn timeout() -> u64 {
        30
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn lang() -> String {
        "es".into()
    }

    pub fn format() -> String {
        "html".into()
    }

    pub fn output() -> PathBuf {
        "build/html".into()
    }

    pub fn template() -> PathBuf {
        "conf.py.template".into()
    }

    pub fn static_dir() -> PathBuf {
        "_static".into()
    }

    pub fn command() -> Vec<String> {
        vec!["sphinx-build".into()]
    }

    pub mod source {
        pub fn branch() -> String {
            "8.0".into()
        }
    }
}

// ============================================================================
// [reference] Section Defaults
// ============================================================================

pub mod reference {
    pub fn pattern() -> String {
        "@(.|[^@]+)@".into()
    }

    pub fn menu_separator() -> String {
        " \u{2023} ".into()
    }

    pub fn menu_class() -> String {
        "odoodocmenu".into()
    }

    pub fn field_class() -> String {
        "odoodocfield".into()
    }

    pub fn model_class() -> String {
        "odoodocmodel".into()
    }

    pub fn fieldlist_class() -> String {
        "odoodocfieldlist".into()
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        8070
    }

    pub fn prefix() -> String {
        "/dochelp".into()
    }

    pub fn max_age() -> u32 {
        10
    }
}
