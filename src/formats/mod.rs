pub mod litematic;

pub use litematic::{
    from_litematic, is_litematic, read_from_file, to_litematic, write_to_file, FILE_EXTENSION,
    LITEMATIC_VERSION,
};
