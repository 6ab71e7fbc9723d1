pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate entity code: {code}")]
    DuplicateCode { code: String },

    #[error("Unknown entity: {reference}")]
    UnknownEntity { reference: String },

    #[error("Entity `{code}` cannot contain other entities: it is not a group")]
    ParentNotGroup { code: String },

    #[error("Invalid link length {length}: links span at least one rank")]
    InvalidLinkLength { length: u32 },

    #[error("Invalid diagram JSON: {0}")]
    Json(#[from] serde_json::Error),
}
