/// Authentication primitives for Taskipline
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`token`]: one-time opaque secrets (verification / password reset) and
///   signed session tokens (access / refresh)
///
/// Every secret comparison in this module tree is constant-time, and session
/// token verification fails closed: a bad signature, the wrong key, and an
/// expired token are indistinguishable to callers.

pub mod password;
pub mod token;
