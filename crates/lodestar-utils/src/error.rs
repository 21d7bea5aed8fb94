//! Error type shared by the utility modules

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum UtilsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Invalid hex in key file {name}: {source}")]
	KeyEncoding {
		name: String,
		#[source]
		source: hex::FromHexError,
	},

	#[error("Key {0} is missing and cannot be generated")]
	MissingKey(String),

	#[error("Unknown key kind: {0}")]
	UnknownKeyKind(String),

	#[error("Invalid cache key material")]
	InvalidCacheKey,
}

pub type UtilsResult<T> = Result<T, UtilsError>;
