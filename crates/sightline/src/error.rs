#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid option `{name}`: {message}")]
    InvalidOption { name: &'static str, message: String },

    #[error("arena half-width {arena_size} leaves no room for a lane of disks with radius {radius}")]
    ArenaTooSmall { arena_size: f64, radius: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
