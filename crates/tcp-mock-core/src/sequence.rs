use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tcp_mock_abstract::{SEQUENCE_LIMIT, SequenceSource};

/// Uniform pseudo-random initial sequence numbers in `0..SEQUENCE_LIMIT`.
pub struct RandomSequence {
    rng: StdRng,
}

impl RandomSequence {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seeded when `seed` is given, OS entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_os_rng(),
        }
    }
}

impl SequenceSource for RandomSequence {
    fn next_sequence(&mut self) -> u32 {
        self.rng.random::<u32>() % SEQUENCE_LIMIT
    }
}

/// Hands out a scripted list of sequence numbers, then keeps repeating the last one.
#[derive(Debug, Clone)]
pub struct FixedSequence {
    values: Vec<u32>,
    next: usize,
}

impl FixedSequence {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            next: 0,
        }
    }

    pub fn constant(value: u32) -> Self {
        Self::new(vec![value])
    }
}

impl SequenceSource for FixedSequence {
    fn next_sequence(&mut self) -> u32 {
        let idx = self.next.min(self.values.len().saturating_sub(1));
        self.next += 1;
        self.values.get(idx).copied().unwrap_or_default()
    }
}
