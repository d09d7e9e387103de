//! Password hashing, verification and strength checking.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::Error;

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Create Argon2 instance with these parameters.
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    /// Secure defaults for production (Argon2id RFC recommendations)
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Rules a new password must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

/// Outcome of [`CredentialHasher::check_strength`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordStrength {
    pub is_strong: bool,
    /// Every violated rule, in a fixed order
    pub reasons: Vec<String>,
}

/// Salted one-way password hashing plus the strength policy for new passwords.
#[derive(Debug, Clone, Default)]
pub struct CredentialHasher {
    params: Argon2Params,
    policy: PasswordPolicy,
}

impl CredentialHasher {
    pub fn new(params: Argon2Params, policy: PasswordPolicy) -> Self {
        Self { params, policy }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Hash a password with a fresh random salt. The result is a PHC string embedding
    /// algorithm, parameters and salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, Error> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = self.params.to_argon2()?;

        let hash = argon2.hash_password(plaintext.as_bytes(), &salt).map_err(|e| Error::Internal {
            operation: format!("hash password: {e}"),
        })?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash.
    ///
    /// Verification uses the parameters embedded in the hash itself. A hash that cannot be
    /// parsed never matches.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            tracing::warn!("Stored password hash could not be parsed");
            return false;
        };

        Argon2::default().verify_password(plaintext.as_bytes(), &parsed_hash).is_ok()
    }

    pub fn check_strength(&self, plaintext: &str) -> PasswordStrength {
        let policy = &self.policy;
        let length = plaintext.chars().count();
        let mut reasons = Vec::new();

        if length < policy.min_length {
            reasons.push(format!("Password must be at least {} characters long", policy.min_length));
        }
        if length > policy.max_length {
            reasons.push(format!("Password must be no more than {} characters", policy.max_length));
        }
        if policy.require_uppercase && !plaintext.chars().any(|c| c.is_uppercase()) {
            reasons.push("Password must contain at least one uppercase letter".to_string());
        }
        if policy.require_lowercase && !plaintext.chars().any(|c| c.is_lowercase()) {
            reasons.push("Password must contain at least one lowercase letter".to_string());
        }
        if policy.require_digit && !plaintext.chars().any(|c| c.is_ascii_digit()) {
            reasons.push("Password must contain at least one number".to_string());
        }
        if policy.require_special && !plaintext.chars().any(is_special) {
            reasons.push("Password must contain at least one special character".to_string());
        }

        PasswordStrength {
            is_strong: reasons.is_empty(),
            reasons,
        }
    }
}

// Any printable non-alphanumeric character
fn is_special(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control()
}
