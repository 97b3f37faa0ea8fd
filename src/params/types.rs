//! Enumerated parameter values.
//!
//! Every enum parses case-insensitively from the text written in parameter
//! files and displays back as that same canonical text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Accepted spellings, in declaration order.
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err(format!("expected one of {}", Self::NAMES.join(", ")))
            }
        }
    };
}

text_enum! {
    /// Layout of a recorded signal file.
    pub enum SignalFormat {
        /// One amplitude per line
        Ascii => "Ascii",
        /// SESAME ASCII data format, three components
        Saf => "Saf",
        /// MiniShark export, three tab-separated components
        MiniShark => "MiniShark",
        /// PEER strong-motion record, one component
        Peer => "Peer",
    }
}

text_enum! {
    /// How a FROM/TO time boundary is interpreted.
    pub enum TimeBoundaryType {
        /// Start or end of the signal itself
        Signal => "Signal",
        /// The time text is an absolute time
        Absolute => "Absolute",
        /// The time text is an offset from the other boundary
        Delta => "Delta",
    }
}

text_enum! {
    /// Policy for choosing window lengths.
    pub enum WindowLengthType {
        Exactly => "Exactly",
        AtLeast => "AtLeast",
        FrequencyDependent => "FrequencyDependent",
    }
}

text_enum! {
    /// Amplitude threshold for flagging bad samples.
    pub enum BadSampleThresholdType {
        NoSampleThreshold => "NoSampleThreshold",
        /// Percent of the maximum absolute amplitude
        RelativeSampleThreshold => "RelativeSampleThreshold",
        /// Absolute amplitude value
        AbsoluteSampleThreshold => "AbsoluteSampleThreshold",
    }
}

text_enum! {
    pub enum SmoothingMethod {
        Function => "Function",
        Window => "Window",
    }
}

text_enum! {
    pub enum SmoothingType {
        KonnoOhmachi => "KonnoOhmachi",
        Constant => "Constant",
        Proportional => "Proportional",
        NoSmoothing => "NoSmoothing",
    }
}

text_enum! {
    /// Taper applied to each window before spectral analysis.
    pub enum WindowShape {
        Tukey => "Tukey",
        Hann => "Hann",
        Hamming => "Hamming",
        Cosine => "Cosine",
        Rectangular => "Rectangular",
    }
}

text_enum! {
    pub enum FrequencySampling {
        Log => "Log",
        Linear => "Linear",
    }
}

text_enum! {
    /// How the two horizontal components are combined.
    pub enum HorizontalComponents {
        Squared => "Squared",
        Energy => "Energy",
        GeometricMean => "GeometricMean",
        Total => "Total",
        Azimuth => "Azimuth",
    }
}

/// Parse a boolean-like flag: `y`/`n`, `yes`/`no`, `true`/`false`.
pub fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Some(true),
        "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Render a flag the way parameter files write it.
pub fn format_flag(value: bool) -> &'static str {
    if value {
        "y"
    } else {
        "n"
    }
}
