use std::{fmt, str::FromStr};

/// A label string that is not part of the expected set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} label '{label}'")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub label: String,
}

macro_rules! label_enum {
    (
        $(#[$meta:meta])* $name:ident, $kind:literal
        { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownLabel {
                        kind: $kind,
                        label: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_enum! {
    /// Phase label of a phase-current measurement.
    CurrentPhase, "current phase" {
        IA => "IA",
        IB => "IB",
        IC => "IC",
        IN => "IN",
    }
}

label_enum! {
    /// Phase label of a phase-voltage measurement.
    VoltagePhase, "voltage phase" {
        VA => "VA",
        VB => "VB",
        VC => "VC",
        VN => "VN",
    }
}

label_enum! {
    /// Zero/positive/negative sequence component of currents (`I*`) or voltages (`V*`).
    SequenceLabel, "sequence component" {
        I0 => "I0",
        I1 => "I1",
        I2 => "I2",
        V0 => "V0",
        V1 => "V1",
        V2 => "V2",
    }
}
