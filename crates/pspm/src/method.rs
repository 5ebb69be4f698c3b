use std::{fmt, str::FromStr};

#[cfg(feature = "serde-derive")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Discretization of the trait axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-derive", derive(Serialize, Deserialize))]
pub enum Method {
    /// Fixed-mesh upwind finite volumes.
    Fmu,
    /// Escalator boxcar train.
    Ebt,
    /// Characteristic method with scheduled cohort introduction.
    Cm,
}

impl Method {
    /// Names of the state variables every species record starts with.
    ///
    /// FMU keeps trait values on a fixed mesh, so only the density is state.
    #[must_use]
    pub fn core_variables(self) -> &'static [&'static str] {
        match self {
            Method::Fmu => &["u"],
            Method::Ebt | Method::Cm => &["X", "u"],
        }
    }

    /// Minimum number of initial trait values a species needs.
    #[must_use]
    pub(crate) fn min_traits(self) -> usize {
        match self {
            Method::Fmu => 2,
            Method::Ebt | Method::Cm => 1,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Fmu => "FMU",
            Method::Ebt => "EBT",
            Method::Cm => "CM",
        };
        f.write_str(name)
    }
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FMU" => Ok(Method::Fmu),
            "EBT" => Ok(Method::Ebt),
            "CM" => Ok(Method::Cm),
            _ => Err(ConfigError::UnknownMethod(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("ebt".parse::<Method>().unwrap(), Method::Ebt);
        assert_eq!("FMU".parse::<Method>().unwrap(), Method::Fmu);
        assert_eq!("Cm".parse::<Method>().unwrap(), Method::Cm);
        assert!(matches!(
            "ifmu".parse::<Method>(),
            Err(ConfigError::UnknownMethod(name)) if name == "ifmu"
        ));
    }

    #[test]
    fn display_round_trips() {
        for method in [Method::Fmu, Method::Ebt, Method::Cm] {
            assert_eq!(method.to_string().parse::<Method>().unwrap(), method);
        }
    }

    #[test]
    fn fmu_has_no_trait_variable() {
        assert_eq!(Method::Fmu.core_variables(), &["u"]);
        assert_eq!(Method::Cm.core_variables(), &["X", "u"]);
    }
}
