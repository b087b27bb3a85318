use rand::{
    Rng,
    distributions::{Bernoulli, Distribution},
};

use crate::{
    batch::SentenceBatch,
    error::{Error, Result},
    vocab::Vocab,
};

/// Returns a copy of `batch` where every interior token of each sentence is
/// replaced by `<unk>` with probability `drop_prob`. The first and last valid
/// token of a sentence and all padding positions are left as they are.
pub fn word_dropout<R: Rng + ?Sized>(
    batch: &SentenceBatch,
    vocab: &Vocab,
    drop_prob: f64,
    rng: &mut R,
) -> Result<SentenceBatch> {
    let coin = Bernoulli::new(drop_prob).map_err(|_| Error::InvalidProbability(drop_prob))?;
    let width = batch.max_length();
    let spans = (0..batch.batch_size())
        .map(|i| batch.valid_span(i))
        .collect::<Result<Vec<_>>>()?;

    let mut dropped = batch.clone();
    let tokens = dropped.tokens_mut();
    for (i, span) in spans.into_iter().enumerate() {
        if span.len() < 3 {
            continue;
        }
        let row = &mut tokens[i * width..(i + 1) * width];
        for token in &mut row[span.start + 1..span.end - 1] {
            if coin.sample(rng) {
                *token = vocab.unk_index();
            }
        }
    }
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Alignment;
    use rand::{SeedableRng, rngs::StdRng};

    fn vocab() -> Vocab {
        Vocab::from_tokens(["a", "b", "c", "d", "e"])
    }

    fn batch(alignment: Alignment) -> SentenceBatch {
        SentenceBatch::from_sentences(
            &[vec![3, 4, 5, 6, 7, 2], vec![4, 5, 2], vec![6, 2], vec![]],
            alignment,
            0,
        )
    }

    #[test]
    fn test_zero_probability_is_identity() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let input = batch(Alignment::Left);
        let output = word_dropout(&input, &vocab(), 0.0, &mut rng)?;
        assert_eq!(output, input);
        Ok(())
    }

    #[test]
    fn test_full_probability_drops_every_interior_token() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let input = batch(Alignment::Left);
        let output = word_dropout(&input, &vocab(), 1.0, &mut rng)?;
        assert_eq!(output.shape(), input.shape());
        assert_eq!(output.row(0), &[3, 1, 1, 1, 1, 2]);
        assert_eq!(output.row(1), &[4, 1, 2, 0, 0, 0]);
        assert_eq!(output.row(2), &[6, 2, 0, 0, 0, 0]);
        assert_eq!(output.row(3), &[0, 0, 0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_right_aligned_protects_boundaries() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let input = batch(Alignment::Right);
        let output = word_dropout(&input, &vocab(), 1.0, &mut rng)?;
        assert_eq!(output.row(0), &[3, 1, 1, 1, 1, 2]);
        assert_eq!(output.row(1), &[0, 0, 0, 4, 1, 2]);
        assert_eq!(output.row(2), &[0, 0, 0, 0, 6, 2]);
        Ok(())
    }

    #[test]
    fn test_input_is_not_mutated() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let input = batch(Alignment::Left);
        let snapshot = input.clone();
        let _ = word_dropout(&input, &vocab(), 1.0, &mut rng)?;
        assert_eq!(input, snapshot);
        Ok(())
    }

    #[test]
    fn test_partial_probability_invariants() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(42);
        let vocab = vocab();
        let input = batch(Alignment::Left);
        let mut total_dropped = 0;
        for _ in 0..200 {
            let output = word_dropout(&input, &vocab, 0.5, &mut rng)?;
            for (i, (before, after)) in input.rows().zip(output.rows()).enumerate() {
                let length = input.lengths()[i];
                for (j, (&b, &a)) in before.iter().zip(after).enumerate() {
                    let interior = j >= 1 && j + 1 < length;
                    if interior {
                        assert!(a == b || a == vocab.unk_index());
                        total_dropped += usize::from(a != b);
                    } else {
                        assert_eq!(a, b, "row {i} position {j} must not change");
                    }
                }
            }
        }
        // 5 interior positions over 200 trials at p = 0.5.
        assert!((300..700).contains(&total_dropped), "dropped {total_dropped}");
        Ok(())
    }

    #[test]
    fn test_length_beyond_width_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let input =
            SentenceBatch::from_parts(vec![3, 4, 5, 2, 0, 0], vec![3, 4], 3, Alignment::Left)
                .unwrap();
        let result = word_dropout(&input, &vocab(), 0.5, &mut rng);
        assert!(matches!(
            result,
            Err(Error::LengthOutOfBounds { row: 1, length: 4, width: 3 })
        ));
    }

    #[test]
    fn test_invalid_probability_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let input = batch(Alignment::Left);
        for p in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                word_dropout(&input, &vocab(), p, &mut rng),
                Err(Error::InvalidProbability(_))
            ));
        }
    }
}
