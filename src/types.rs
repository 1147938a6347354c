//! Type-safe configuration and navigation types
//!
//! Closed enums for everything that used to be a free-form string:
//! backend selection, button alignment, navigation codes and package checks.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Exit code attached to a dialog button and returned by `DialogBackend::run`
pub type ExitCode = i32;

/// Exit code of the "Prev" button
pub const PREV_PAGE_CODE: ExitCode = -1;
/// Exit code of the "Next" button
pub const NEXT_PAGE_CODE: ExitCode = 1;
/// Exit code of the "Cancel" button
pub const CANCEL_PAGE_CODE: ExitCode = 2;
/// Exit code of the "OK" button
pub const FINISH_PAGE_CODE: ExitCode = 0;

/// Dialog rendering backend, chosen once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Full-screen ratatui renderer with its own event loop
    #[default]
    #[strum(serialize = "tui")]
    Tui,
    /// External `dialog(1)` program driven as a subprocess
    #[strum(serialize = "dialog")]
    Dialog,
}

/// Horizontal alignment of a dialog's button row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ButtonAlign {
    Left,
    Center,
    #[default]
    Right,
}

/// Navigation intent produced by a page run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavCode {
    Prev,
    Next,
    Cancel,
    Finish,
    /// The page has no dialog to show
    NoOp,
}

impl NavCode {
    /// Map a button exit code to a navigation intent.
    ///
    /// Returns `None` for codes that are not one of the four wizard buttons.
    pub fn from_exit_code(code: ExitCode) -> Option<Self> {
        match code {
            PREV_PAGE_CODE => Some(Self::Prev),
            NEXT_PAGE_CODE => Some(Self::Next),
            CANCEL_PAGE_CODE => Some(Self::Cancel),
            FINISH_PAGE_CODE => Some(Self::Finish),
            _ => None,
        }
    }

    /// The button exit code for this intent (`None` for `NoOp`)
    pub fn exit_code(self) -> Option<ExitCode> {
        match self {
            Self::Prev => Some(PREV_PAGE_CODE),
            Self::Next => Some(NEXT_PAGE_CODE),
            Self::Cancel => Some(CANCEL_PAGE_CODE),
            Self::Finish => Some(FINISH_PAGE_CODE),
            Self::NoOp => None,
        }
    }
}

/// How a prerequisite package is looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PackageKind {
    /// Debian package queried through dpkg-query
    #[default]
    Deb,
    /// Executable that must be present on PATH
    Bin,
}

/// Version comparison operator for prerequisite checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum VersionCompare {
    #[default]
    #[serde(rename = "==")]
    #[strum(serialize = "==")]
    Eq,
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    Ge,
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    Le,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Gt,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Lt,
}

impl VersionCompare {
    /// Whether `ordering` (installed compared to required) satisfies this operator
    pub fn accepts(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Eq => ordering == Equal,
            Self::Ge => ordering != Less,
            Self::Le => ordering != Greater,
            Self::Gt => ordering == Greater,
            Self::Lt => ordering == Less,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("tui".parse::<BackendKind>().unwrap(), BackendKind::Tui);
        assert_eq!("dialog".parse::<BackendKind>().unwrap(), BackendKind::Dialog);
        assert!("urwid".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::default(), BackendKind::Tui);
    }

    #[test]
    fn test_nav_code_exit_code_mapping() {
        for nav in [NavCode::Prev, NavCode::Next, NavCode::Cancel, NavCode::Finish] {
            let code = nav.exit_code().unwrap();
            assert_eq!(NavCode::from_exit_code(code), Some(nav));
        }
        assert_eq!(NavCode::NoOp.exit_code(), None);
        assert_eq!(NavCode::from_exit_code(42), None);
    }

    #[test]
    fn test_version_compare_parse_and_accept() {
        let ge: VersionCompare = ">=".parse().unwrap();
        assert!(ge.accepts(Ordering::Equal));
        assert!(ge.accepts(Ordering::Greater));
        assert!(!ge.accepts(Ordering::Less));
        assert!(VersionCompare::Eq.accepts(Ordering::Equal));
        assert!(!VersionCompare::Lt.accepts(Ordering::Equal));
    }

    #[test]
    fn test_package_kind_serde() {
        let kind: PackageKind = serde_json::from_str("\"bin\"").unwrap();
        assert_eq!(kind, PackageKind::Bin);
        assert_eq!(PackageKind::Deb.to_string(), "deb");
    }
}
