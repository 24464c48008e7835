//! Human-friendly lobby codes such as `COSMIC-OTTER-DANCES`.

use rand::{Rng, distr::Alphanumeric, seq::IndexedRandom};

const ADJECTIVES: &[&str] = &[
    "brave", "happy", "rapid", "silent", "mighty", "wild", "tipsy", "rowdy", "sparkly", "neon",
    "funky", "groovy", "cheery", "bubbly", "jolly", "lively", "epic", "legendary", "electric",
    "wildcard", "cosmic", "midnight", "sunny", "glittery",
];

const ANIMALS: &[&str] = &[
    "otter", "panda", "falcon", "tiger", "rabbit", "wolf", "llama", "gecko", "koala", "badger",
    "raven", "shark", "fox", "penguin", "lemur", "buffalo", "panther", "moose", "beaver",
    "cougar", "lynx", "orca",
];

const VERBS: &[&str] = &[
    "jumps", "dances", "drifts", "runs", "spins", "glows", "drinks", "parties", "cheers",
    "toasts", "vibes", "shuffles", "bounces", "blasts", "sparkles", "slides", "chants", "laughs",
    "rages", "celebrates", "mingles",
];

/// Draws a random `ADJECTIVE-ANIMAL-VERB` code.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    format!(
        "{}-{}-{}",
        pick(ADJECTIVES, &mut rng),
        pick(ANIMALS, &mut rng),
        pick(VERBS, &mut rng)
    )
    .to_uppercase()
}

fn pick(words: &[&'static str], rng: &mut impl Rng) -> &'static str {
    words.choose(rng).copied().unwrap_or("bus")
}

/// Canonical form clients' codes are looked up by.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Display name for a host that didn't pick one.
pub fn random_host_name() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("Host_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        for _ in 0..50 {
            let code = generate_code();
            let parts: Vec<_> = code.split('-').collect();
            assert_eq!(parts.len(), 3);
            assert_eq!(code, code.to_uppercase());
            assert!(ADJECTIVES.contains(&parts[0].to_lowercase().as_str()));
            assert!(ANIMALS.contains(&parts[1].to_lowercase().as_str()));
            assert!(VERBS.contains(&parts[2].to_lowercase().as_str()));
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  brave-otter-jumps "), "BRAVE-OTTER-JUMPS");
    }

    #[test]
    fn test_random_host_name() {
        let name = random_host_name();
        assert!(name.starts_with("Host_"));
        assert_eq!(name.len(), 21);
        assert_ne!(name, random_host_name());
    }
}
