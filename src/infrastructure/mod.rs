pub mod audio;
pub mod external;
