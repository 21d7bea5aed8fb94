//! Random identifiers

use rand::Rng;
use rand::distributions::Alphanumeric;

/// A random hex identifier of `bytes` bytes
pub fn hex_id(bytes: usize) -> String {
	let mut buf = vec![0u8; bytes];
	rand::thread_rng().fill(buf.as_mut_slice());
	hex::encode(buf)
}

/// A random lowercase alphanumeric token
pub fn token(len: usize) -> String {
	rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(len)
		.map(|b| char::from(b).to_ascii_lowercase())
		.collect()
}
