use hashchain_core::Transaction;
use rand::{rngs::StdRng, Rng};

pub fn random_batch(rng: &mut StdRng, len: usize) -> Vec<Transaction> {
    (0..len)
        .map(|i| {
            Transaction::new(
                format!("user-{}", rng.gen_range(0..100)),
                format!("user-{i}"),
                rng.gen_range(-1_000..1_000),
            )
        })
        .collect()
}
