use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha512};

/// The expensive one-way transformation applied to every submitted value.
///
/// Implementations must be deterministic: the same input always yields the
/// same encoded digest.
pub trait Transform: Send + Sync + 'static {
    fn digest(&self, value: &[u8]) -> String;
}

/// SHA-512 of the raw value, encoded as standard padded base64.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha512Base64;

impl Transform for Sha512Base64 {
    fn digest(&self, value: &[u8]) -> String {
        STANDARD.encode(Sha512::digest(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-512 of `angryMonkey`, standard base64 with padding.
    const ANGRY_MONKEY: &str =
        "ZEHhWB65gUlzdVwtDQArEyx+KVLzp/aTaRaPlBzYRIFj6vjFdqEb0Q5B8zVKCZ0vKbZPZklJz0Fd7su2A+gf7Q==";

    #[test]
    fn angry_monkey_golden() {
        assert_eq!(Sha512Base64.digest(b"angryMonkey"), ANGRY_MONKEY);
    }

    #[test]
    fn digest_is_stable_and_fixed_width() {
        let a = Sha512Base64.digest(b"hunter2");
        let b = Sha512Base64.digest(b"hunter2");
        assert_eq!(a, b);
        // 64 digest bytes -> 88 base64 characters with padding
        assert_eq!(a.len(), 88);
        assert_ne!(a, Sha512Base64.digest(b"hunter3"));
    }
}
