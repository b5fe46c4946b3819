use thiserror::Error;

/// Everything that can go wrong between invoking nvme-cli and rendering.
///
/// Only the unit/number variants are hard failures; the rest are logged and
/// the report is rendered from whatever data survived.
#[derive(Debug, Error, PartialEq)]
pub enum NvmeError {
    #[error("nvme-cli is not installed or not executable")]
    ToolUnavailable,

    #[error("nvme exited with {status}; it probably needs to run as root")]
    Privilege { status: String },

    #[error("unrecognized `nvme {source_cmd}` output at line {line_no}: {line:?} (unsupported nvme-cli version?)")]
    FormatDrift {
        source_cmd: String,
        line_no:    usize,
        line:       String,
    },

    #[error("unknown size unit in {0:?}")]
    UnknownUnit(String),

    #[error("invalid number in {0:?}")]
    InvalidNumber(String),
}
