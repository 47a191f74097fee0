use log::error;
use pbkdf2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Pbkdf2,
};
use uuid::Uuid;

// verification reads the round count back out of the stored hash, so lowering
// this for tests doesn't affect hashes created by a release build
#[cfg(not(test))]
const ROUNDS: u32 = 600_000;
#[cfg(test)]
const ROUNDS: u32 = 1_000;

/// Hash `password` into a PHC string: `$pbkdf2-sha256$i=..,l=32$<salt>$<hash>`
pub fn hash_password(password: &str) -> Result<String, ()> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(|e| {
        error!("couldn't encode salt: {e}");
    })?;

    let params = Params {
        rounds: ROUNDS,
        output_length: 32,
    };

    Pbkdf2
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("couldn't hash password: {e}");
        })
}

pub fn verify_password(password: &str, pwhash: &str) -> bool {
    let hash = match PasswordHash::new(pwhash) {
        Ok(hash) => hash,
        Err(e) => {
            error!("stored password hash is malformed: {e}");
            return false;
        }
    };

    Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verifies_only_the_right_password() {
        let hash = hash_password("password").unwrap();

        assert!(hash.starts_with("$pbkdf2-sha256$"), "{hash}");
        assert!(verify_password("password", &hash));
        assert!(!verify_password("Password", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn salted() {
        let a = hash_password("password").unwrap();
        let b = hash_password("password").unwrap();

        assert_ne!(a, b);
        assert!(verify_password("password", &a));
        assert!(verify_password("password", &b));
    }

    #[test]
    fn rejects_malformed_hash() {
        assert!(!verify_password("password", "sha256$abc$def"));
        assert!(!verify_password("password", ""));
    }
}
