//! Native result codes reported by the spatial runtime.

use std::fmt;

/// Result of a native call or of an asynchronous operation.
///
/// Only the codes the engine reacts to get their own variant; anything else is
/// carried verbatim in [`ResultCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success,
    ValidationFailure,
    RuntimeFailure,
    FunctionUnsupported,
    SizeInsufficient,
    HandleInvalid,
    ComponentNotSupported,
    ComponentNotEnabled,
    ComponentStatusPending,
    ComponentStatusAlreadySet,
    Other(i32),
}

impl ResultCode {
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Success,
            -1 => Self::ValidationFailure,
            -2 => Self::RuntimeFailure,
            -7 => Self::FunctionUnsupported,
            -11 => Self::SizeInsufficient,
            -12 => Self::HandleInvalid,
            -1_000_113_000 => Self::ComponentNotSupported,
            -1_000_113_001 => Self::ComponentNotEnabled,
            -1_000_113_002 => Self::ComponentStatusPending,
            -1_000_113_003 => Self::ComponentStatusAlreadySet,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn raw(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ValidationFailure => -1,
            Self::RuntimeFailure => -2,
            Self::FunctionUnsupported => -7,
            Self::SizeInsufficient => -11,
            Self::HandleInvalid => -12,
            Self::ComponentNotSupported => -1_000_113_000,
            Self::ComponentNotEnabled => -1_000_113_001,
            Self::ComponentStatusPending => -1_000_113_002,
            Self::ComponentStatusAlreadySet => -1_000_113_003,
            Self::Other(raw) => raw,
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// `AlreadySet` means the component is already in the requested state,
    /// which callers treat exactly like success.
    #[must_use]
    pub const fn is_success_equivalent(self) -> bool {
        matches!(self, Self::Success | Self::ComponentStatusAlreadySet)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "XR_SUCCESS",
            Self::ValidationFailure => "XR_ERROR_VALIDATION_FAILURE",
            Self::RuntimeFailure => "XR_ERROR_RUNTIME_FAILURE",
            Self::FunctionUnsupported => "XR_ERROR_FUNCTION_UNSUPPORTED",
            Self::SizeInsufficient => "XR_ERROR_SIZE_INSUFFICIENT",
            Self::HandleInvalid => "XR_ERROR_HANDLE_INVALID",
            Self::ComponentNotSupported => "XR_ERROR_SPACE_COMPONENT_NOT_SUPPORTED_FB",
            Self::ComponentNotEnabled => "XR_ERROR_SPACE_COMPONENT_NOT_ENABLED_FB",
            Self::ComponentStatusPending => "XR_ERROR_SPACE_COMPONENT_STATUS_PENDING_FB",
            Self::ComponentStatusAlreadySet => "XR_ERROR_SPACE_COMPONENT_STATUS_ALREADY_SET_FB",
            Self::Other(raw) => return write!(f, "XrResult({raw})"),
        };
        f.write_str(name)
    }
}
