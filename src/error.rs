//! Error types shared by the container, the document codec and the engines.

use crate::block_position::BlockPosition;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using SchematicError.
pub type Result<T> = std::result::Result<T, SchematicError>;

/// Main error type for schematic operations.
///
/// Every variant is recoverable at the operation boundary; the engines report
/// them per region (or per chunk increment) instead of aborting the whole job.
#[derive(Error, Debug)]
pub enum SchematicError {
    /// Malformed or truncated document data.
    #[error("Corrupt schematic data: {0}")]
    CorruptData(String),

    /// The document declares a `Version` outside the supported range.
    #[error("Unsupported schematic version: {0}")]
    UnsupportedVersion(i32),

    /// The document has no `Version` tag at all.
    #[error("Schematic has no version information")]
    MissingVersion,

    /// A selection box with a zero-sized dimension.
    #[error("Empty selection for region '{0}'")]
    EmptySelection(String),

    /// The transformed region would leave the world limits.
    #[error("Region '{region}' is outside the world bounds ({min} .. {max})")]
    OutOfWorldBounds {
        region: String,
        min: BlockPosition,
        max: BlockPosition,
    },

    /// Internal coordinate math produced a position outside a container.
    #[error("Position {pos} is out of bounds for size {size}{}", .context.as_deref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    OutOfBounds {
        pos: BlockPosition,
        size: BlockPosition,
        context: Option<String>,
    },

    /// A block entity record could not be re-applied to a placed block.
    #[error("Failed to apply block entity data for {state} @ {pos}: {reason}")]
    MetadataApplyFailure {
        state: String,
        pos: BlockPosition,
        reason: String,
    },

    /// Refusing to overwrite an existing file.
    #[error("File already exists: {}", .0.display())]
    FileExists(PathBuf),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode or encode the NBT tree.
    #[error("NBT error: {0}")]
    Nbt(#[from] quartz_nbt::io::NbtIoError),

    /// Engine configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl SchematicError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        SchematicError::CorruptData(msg.into())
    }

    /// Stable translation key for the calling layer's message display.
    pub fn message_key(&self) -> &'static str {
        match self {
            SchematicError::CorruptData(_) | SchematicError::Nbt(_) => {
                "error.schematic_load.corrupt_data"
            }
            SchematicError::UnsupportedVersion(_) => {
                "error.schematic_load.unsupported_schematic_version"
            }
            SchematicError::MissingVersion => {
                "error.schematic_load.no_schematic_version_information"
            }
            SchematicError::EmptySelection(_) => "error.schematic.create.empty_selection",
            SchematicError::OutOfWorldBounds { .. } => "error.schematic_paste.outside_world",
            SchematicError::OutOfBounds { .. } => "error.internal.out_of_bounds",
            SchematicError::MetadataApplyFailure { .. } => {
                "error.schematic_paste.block_entity_data_failed"
            }
            SchematicError::FileExists(_) => "error.schematic_write_to_file_failed.exists",
            SchematicError::Io(_) => "error.schematic_file_io_failed",
            SchematicError::Config(_) => "error.config.invalid",
        }
    }

    /// Whether the error invalidates a whole document load.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            SchematicError::CorruptData(_)
                | SchematicError::UnsupportedVersion(_)
                | SchematicError::MissingVersion
                | SchematicError::Nbt(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_keys_are_distinct_per_category() {
        let corrupt = SchematicError::corrupt("bad");
        let version = SchematicError::UnsupportedVersion(9);
        let empty = SchematicError::EmptySelection("a".to_string());

        assert_ne!(corrupt.message_key(), version.message_key());
        assert_ne!(version.message_key(), empty.message_key());
        assert!(corrupt.is_load_failure());
        assert!(version.is_load_failure());
        assert!(!empty.is_load_failure());
    }

    #[test]
    fn test_out_of_bounds_display() {
        let err = SchematicError::OutOfBounds {
            pos: BlockPosition::new(4, 0, 0),
            size: BlockPosition::new(2, 2, 2),
            context: Some("chunk 0,0".to_string()),
        };
        let text = err.to_string();
        assert!(text.contains("(4, 0, 0)"));
        assert!(text.contains("chunk 0,0"));
    }
}
