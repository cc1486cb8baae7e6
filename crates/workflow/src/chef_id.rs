//! Chef identifiers: `chef-` followed by a uniform random integer in
//! `[1000, 9999]`.
//!
//! Uniqueness across accounts is best effort only. No collision check is made
//! against existing accounts, so two chefs can draw the same suffix.

use rand::Rng;

pub const CHEF_ID_PREFIX: &str = "chef-";

pub fn generate_chef_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{}{}", CHEF_ID_PREFIX, rng.gen_range(1000..=9999))
}

/// True iff `s` is `chef-` followed by exactly four ASCII digits.
pub fn is_valid_chef_id(s: &str) -> bool {
    s.strip_prefix(CHEF_ID_PREFIX)
        .is_some_and(|digits| digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_ids_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let id = generate_chef_id(&mut rng);
            assert!(is_valid_chef_id(&id), "{id}");
            let n: u32 = id[CHEF_ID_PREFIX.len()..].parse().unwrap();
            assert!((1000..=9999).contains(&n), "{id}");
        }
    }

    #[test]
    fn validation_rejects_malformed_ids() {
        for bad in ["chef-123", "chef-12345", "chef-12a4", "cook-1234", "chef1234", ""] {
            assert!(!is_valid_chef_id(bad), "{bad}");
        }
        assert!(is_valid_chef_id("chef-0042"));
    }
}
