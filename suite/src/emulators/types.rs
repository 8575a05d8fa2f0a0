//! Identifiers and endpoint records for the emulated services.

use std::fmt;
use std::str::FromStr;

/// The kinds of emulated services the suite can run. Used as the registry
/// key; a kind appears at most once in the registry at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmulatorKind {
    /// Functions runtime (an externally provided binary).
    Functions,
    /// Firestore emulator.
    Firestore,
    /// Container-backed service proxy target.
    Run,
    /// Hosting dev server(s).
    Hosting,
    /// Suite GUI.
    Gui,
}

/// Fixed startup order. Proxy targets come before hosting so a hosting
/// server can resolve its rewrite backends from the registry; the GUI starts
/// last since it observes everything else. Shutdown runs in reverse.
pub const START_ORDER: [EmulatorKind; 5] = [
    EmulatorKind::Functions,
    EmulatorKind::Firestore,
    EmulatorKind::Run,
    EmulatorKind::Hosting,
    EmulatorKind::Gui,
];

impl fmt::Display for EmulatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Functions => "functions",
            Self::Firestore => "firestore",
            Self::Run => "run",
            Self::Hosting => "hosting",
            Self::Gui => "gui",
        };
        f.write_str(name)
    }
}

impl FromStr for EmulatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "functions" => Ok(Self::Functions),
            "firestore" => Ok(Self::Firestore),
            "run" => Ok(Self::Run),
            "hosting" => Ok(Self::Hosting),
            "gui" => Ok(Self::Gui),
            other => Err(format!(
                "unknown emulator '{other}' (expected one of: functions, firestore, run, hosting, gui)"
            )),
        }
    }
}

/// Connection endpoint of a running emulator, as stored in the registry.
/// The live handle (child process or bound servers) stays with the
/// controller; readers only ever see this record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorInfo {
    pub kind: EmulatorKind,
    pub host: String,
    pub port: u16,
}
