//! Device mode resolution.
//!
//! Each mode needs a fixed set of port roles:
//!
//! | Mode | Roles |
//! |------|-------|
//! | `both` | button, relay, printer, scanner |
//! | `print` | button, relay, printer |
//! | `scan` | relay, scanner |
//!
//! An explicitly requested mode must have all of its roles available. `auto`
//! picks the most capable mode that the available ports satisfy.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use tollgate_core::{Mode, Role};

use crate::error::ResolveError;

/// Mode asked for by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestedMode {
    #[default]
    Auto,
    Fixed(Mode),
}

impl RequestedMode {
    /// Parse a configured mode, falling back to `auto` for unknown names.
    pub fn from_config(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Auto;
        };
        value.parse().unwrap_or_else(|e| {
            warn!(mode = value, error = %e, "Unknown mode, falling back to auto");
            Self::Auto
        })
    }
}

impl FromStr for RequestedMode {
    type Err = tollgate_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse().map(Self::Fixed)
    }
}

impl fmt::Display for RequestedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(mode) => mode.fmt(f),
        }
    }
}

/// Roles `mode` cannot run without.
pub fn dependencies(mode: Mode) -> &'static [Role] {
    match mode {
        Mode::Both => &[Role::Button, Role::Relay, Role::Printer, Role::Scanner],
        Mode::Print => &[Role::Button, Role::Relay, Role::Printer],
        Mode::Scan => &[Role::Relay, Role::Scanner],
    }
}

/// Whether `mode` runs the ticket printing workflow.
pub fn prints(mode: Mode) -> bool {
    matches!(mode, Mode::Print | Mode::Both)
}

/// Whether `mode` runs the ticket scanning workflow.
pub fn scans(mode: Mode) -> bool {
    matches!(mode, Mode::Scan | Mode::Both)
}

fn missing(mode: Mode, available: &[Role]) -> Vec<Role> {
    dependencies(mode)
        .iter()
        .copied()
        .filter(|role| !available.contains(role))
        .collect()
}

/// Pick the mode to run with the given ports.
///
/// # Errors
///
/// `MissingPorts` when a fixed mode lacks a role, `NoSatisfiableMode` when
/// no mode fits in `auto`.
///
/// # Example
///
/// ```
/// use tollgate_core::{Mode, Role};
/// use tollgate_terminal::mode::{RequestedMode, resolve};
///
/// let mode = resolve(RequestedMode::Auto, &[Role::Scanner, Role::Relay]).unwrap();
/// assert_eq!(mode, Mode::Scan);
/// ```
pub fn resolve(requested: RequestedMode, available: &[Role]) -> Result<Mode, ResolveError> {
    match requested {
        RequestedMode::Fixed(mode) => {
            let missing = missing(mode, available);
            if missing.is_empty() {
                Ok(mode)
            } else {
                Err(ResolveError::MissingPorts { mode, missing })
            }
        }
        RequestedMode::Auto => {
            let mut candidates = [Mode::Both, Mode::Print, Mode::Scan];
            candidates.sort_by_key(|mode| Reverse(dependencies(*mode).len()));

            for mode in candidates {
                let missing = missing(mode, available);
                if missing.is_empty() {
                    return Ok(mode);
                }
                debug!(%mode, ?missing, "Mode not satisfiable");
            }
            Err(ResolveError::NoSatisfiableMode {
                available: available.to_vec(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ALL: &[Role] = &Role::ALL;

    #[rstest]
    #[case(&[Role::Scanner, Role::Relay], Mode::Scan)]
    #[case(ALL, Mode::Both)]
    #[case(&[Role::Button, Role::Relay, Role::Printer], Mode::Print)]
    #[case(&[Role::Button, Role::Relay, Role::Scanner], Mode::Scan)]
    fn test_auto_resolution(#[case] available: &[Role], #[case] expected: Mode) {
        assert_eq!(resolve(RequestedMode::Auto, available).unwrap(), expected);
    }

    #[rstest]
    #[case(&[])]
    #[case(&[Role::Relay])]
    #[case(&[Role::Button, Role::Printer, Role::Scanner])]
    fn test_auto_unsatisfiable(#[case] available: &[Role]) {
        assert!(matches!(
            resolve(RequestedMode::Auto, available),
            Err(ResolveError::NoSatisfiableMode { .. })
        ));
    }

    #[test]
    fn test_fixed_mode_reports_missing_roles() {
        let result = resolve(RequestedMode::Fixed(Mode::Both), &[Role::Relay, Role::Scanner]);
        match result {
            Err(ResolveError::MissingPorts { mode, missing }) => {
                assert_eq!(mode, Mode::Both);
                assert_eq!(missing, vec![Role::Button, Role::Printer]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_fixed_mode_ignores_extra_ports() {
        assert_eq!(
            resolve(RequestedMode::Fixed(Mode::Scan), ALL).unwrap(),
            Mode::Scan
        );
    }

    #[rstest]
    #[case(None, RequestedMode::Auto)]
    #[case(Some(""), RequestedMode::Auto)]
    #[case(Some("AUTO"), RequestedMode::Auto)]
    #[case(Some("print"), RequestedMode::Fixed(Mode::Print))]
    #[case(Some(" both "), RequestedMode::Fixed(Mode::Both))]
    #[case(Some("teleport"), RequestedMode::Auto)]
    fn test_requested_mode_from_config(#[case] value: Option<&str>, #[case] expected: RequestedMode) {
        assert_eq!(RequestedMode::from_config(value), expected);
    }

    #[test]
    fn test_workflows_per_mode() {
        assert!(prints(Mode::Both) && scans(Mode::Both));
        assert!(prints(Mode::Print) && !scans(Mode::Print));
        assert!(!prints(Mode::Scan) && scans(Mode::Scan));
    }
}
