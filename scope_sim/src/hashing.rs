use std::hash::Hasher;

/// A deterministic FNV-1a 64-bit hasher.
///
/// Used to replace `DefaultHasher` (which is randomized) for generating
/// deterministic noise-stream seeds from layout names.
#[derive(Debug)]
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Hash a string identifier deterministically.
pub fn fnv1a(input: &str) -> u64 {
    let mut hasher = FnvHasher::new();
    hasher.write(input.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_is_stable_and_distinct() {
        assert_eq!(fnv1a("RTX 4090"), fnv1a("RTX 4090"));
        assert_ne!(fnv1a("RTX 4090"), fnv1a("RTX 4080"));
    }

    #[test]
    fn default_hasher_starts_from_the_offset_basis() {
        let mut a = FnvHasher::default();
        let mut b = FnvHasher::new();
        a.write(b"Compact");
        b.write(b"Compact");
        assert_eq!(a.finish(), b.finish());
        assert_eq!(a.finish(), fnv1a("Compact"));
    }
}
