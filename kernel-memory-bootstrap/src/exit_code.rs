// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Exit Codes
//!
//! Follows the BSD `sysexits.h` convention so a supervisor (systemd,
//! a container orchestrator, a shell script) can distinguish "config is
//! wrong" from "transient I/O failure" from "we were asked to stop"
//! without parsing log output.

use std::fmt;

/// Process exit code, convertible to the `i32` the process actually exits
/// with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Everything completed normally.
    Success,
    /// Unspecified error.
    Error,
    /// Command line usage error.
    UsageError,
    /// Input data was incorrect in some way.
    DataError,
    /// Input file did not exist or was not readable.
    NoInput,
    /// User specified did not exist.
    NoUser,
    /// Host specified did not exist.
    NoHost,
    /// A service is unavailable (queue unreachable, memory db down).
    Unavailable,
    /// An internal software error has been detected.
    Software,
    /// An operating system error has been detected.
    OsError,
    /// Some system file did not exist, could not be opened, or had some
    /// other kind of error.
    OsFile,
    /// A (user specified) output file could not be created.
    CantCreate,
    /// An error occurred while doing I/O on some file.
    IoError,
    /// Temp failure, indicating something not really an error, retry.
    TempFail,
    /// Remote error in protocol.
    Protocol,
    /// Permission denied.
    NoPermission,
    /// Configuration error.
    Config,
    /// Process was interrupted (SIGINT).
    Interrupted,
    /// Process was terminated (SIGTERM).
    Terminated,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::Error => 1,
            ExitCode::UsageError => 64,
            ExitCode::DataError => 65,
            ExitCode::NoInput => 66,
            ExitCode::NoUser => 67,
            ExitCode::NoHost => 68,
            ExitCode::Unavailable => 69,
            ExitCode::Software => 70,
            ExitCode::OsError => 71,
            ExitCode::OsFile => 72,
            ExitCode::CantCreate => 73,
            ExitCode::IoError => 74,
            ExitCode::TempFail => 75,
            ExitCode::Protocol => 76,
            ExitCode::NoPermission => 77,
            ExitCode::Config => 78,
            ExitCode::Interrupted => 130,
            ExitCode::Terminated => 143,
        }
    }

    /// Heuristically classifies an error by inspecting its rendered
    /// message. Used at the very top of `main()`, where the concrete
    /// error type has already been flattened to `Box<dyn Error>` or
    /// similar by the `?` operator.
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        let message = error.to_string().to_lowercase();

        if message.contains("config") || message.contains("configuration") {
            ExitCode::Config
        } else if message.contains("permission") || message.contains("denied") {
            ExitCode::NoPermission
        } else if message.contains("not found") || message.contains("no such file") {
            ExitCode::NoInput
        } else if message.contains("timed out") || message.contains("timeout") {
            ExitCode::TempFail
        } else if message.contains("unavailable") || message.contains("connection") {
            ExitCode::Unavailable
        } else if message.contains("io error") || message.contains("i/o") {
            ExitCode::IoError
        } else if message.contains("invalid") || message.contains("validation") {
            ExitCode::DataError
        } else {
            ExitCode::Error
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "success",
            ExitCode::Error => "unspecified error",
            ExitCode::UsageError => "usage error",
            ExitCode::DataError => "data format error",
            ExitCode::NoInput => "input not found",
            ExitCode::NoUser => "user does not exist",
            ExitCode::NoHost => "host does not exist",
            ExitCode::Unavailable => "service unavailable",
            ExitCode::Software => "internal software error",
            ExitCode::OsError => "operating system error",
            ExitCode::OsFile => "system file error",
            ExitCode::CantCreate => "cannot create output",
            ExitCode::IoError => "I/O error",
            ExitCode::TempFail => "temporary failure, retry",
            ExitCode::Protocol => "protocol error",
            ExitCode::NoPermission => "permission denied",
            ExitCode::Config => "configuration error",
            ExitCode::Interrupted => "interrupted",
            ExitCode::Terminated => "terminated",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    pub fn is_error(self) -> bool {
        !self.is_success() && !self.is_signal()
    }

    pub fn is_signal(self) -> bool {
        matches!(self, ExitCode::Interrupted | ExitCode::Terminated)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.description())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}
