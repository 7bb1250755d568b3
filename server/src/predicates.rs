use rand::seq::SliceRandom;

/// How many predicate levels a node activates. Level 0 only for now.
pub const DIFFICULTY: usize = 1;

/// One rule a code must satisfy, grouped into difficulty levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    FirstCharEquals(char),
    EndsWith(&'static str),
}

/// Candidate predicates per difficulty level, drawn from at construction.
pub const PREDICATE_LEVELS: [&[Predicate]; 2] = [
    &[
        Predicate::FirstCharEquals('G'),
        Predicate::FirstCharEquals('U'),
        Predicate::FirstCharEquals('A'),
        Predicate::FirstCharEquals('C'),
    ],
    &[
        Predicate::EndsWith("GCC"),
        Predicate::EndsWith("GCU"),
        Predicate::EndsWith("UGC"),
        Predicate::EndsWith("CCC"),
    ],
];

impl Predicate {
    pub fn accepts(self, code: &str) -> bool {
        match self {
            Predicate::FirstCharEquals(ch) => code.chars().next() == Some(ch),
            Predicate::EndsWith(suffix) => code.ends_with(suffix),
        }
    }
}

/// An ordered sequence of predicates, one per active difficulty level. A
/// code infects a node iff every slot accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateSystem {
    slots: Vec<Predicate>,
}

impl PredicateSystem {
    pub fn new(slots: Vec<Predicate>) -> PredicateSystem {
        PredicateSystem { slots }
    }

    /// Uniformly chooses one candidate per active level.
    pub fn random(difficulty: usize) -> PredicateSystem {
        let mut rng = rand::thread_rng();
        let slots = PREDICATE_LEVELS[..difficulty]
            .iter()
            .map(|level| *level.choose(&mut rng).expect("empty predicate level"))
            .collect();
        PredicateSystem { slots }
    }

    pub fn evaluate(&self, code: &str) -> bool {
        self.slots.iter().all(|predicate| predicate.accepts(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_char_predicate() {
        let predicate = Predicate::FirstCharEquals('G');
        assert!(predicate.accepts("GUGCAUGC"));
        assert!(!predicate.accepts("UGGCAUGC"));
        assert!(!predicate.accepts(""));
    }

    #[test]
    fn ends_with_predicate() {
        let predicate = Predicate::EndsWith("GCC");
        assert!(predicate.accepts("UUUUUGCC"));
        assert!(!predicate.accepts("UUUUUGCU"));
        assert!(!predicate.accepts("GC"));
    }

    #[test]
    fn evaluation_is_the_conjunction_of_all_slots() {
        let system = PredicateSystem::new(vec![
            Predicate::FirstCharEquals('G'),
            Predicate::EndsWith("CCC"),
        ]);
        assert!(system.evaluate("GUGCACCC"));
        assert!(!system.evaluate("GUGCAUGC"));
        assert!(!system.evaluate("UUGCACCC"));
    }

    #[test]
    fn evaluation_is_pure() {
        let system = PredicateSystem::random(DIFFICULTY);
        let code = "GUGCAUGC";
        assert_eq!(system.evaluate(code), system.evaluate(code));
    }

    #[test]
    fn malformed_codes_never_panic() {
        let system = PredicateSystem::new(vec![
            Predicate::FirstCharEquals('G'),
            Predicate::EndsWith("GCC"),
        ]);
        system.evaluate("");
        system.evaluate("G");
        system.evaluate("nonsense not in the alphabet");
    }

    #[test]
    fn random_system_draws_from_the_candidate_tables() {
        for _ in 0..20 {
            let system = PredicateSystem::random(2);
            assert_eq!(system.slots.len(), 2);
            assert!(PREDICATE_LEVELS[0].contains(&system.slots[0]));
            assert!(PREDICATE_LEVELS[1].contains(&system.slots[1]));
        }
    }
}
